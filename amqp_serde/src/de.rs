use serde::de::{self, DeserializeSeed, SeqAccess, Visitor};
use serde::Deserialize;

use crate::Error;

/// Deserialize a `T` from the front of `buf`, returning the value and the
/// number of bytes consumed. Callers (the frame decoder) use the consumed
/// count to advance their own cursor; nothing here mutates `buf` itself, so
/// a caller can retry against a longer slice once more bytes have arrived.
pub fn from_bytes<'de, T: Deserialize<'de>>(buf: &'de [u8]) -> Result<(T, usize), Error> {
    let mut de = Deserializer { buf, pos: 0 };
    let value = T::deserialize(&mut de)?;
    Ok((value, de.pos))
}

pub struct Deserializer<'de> {
    buf: &'de [u8],
    pos: usize,
}

impl<'de> Deserializer<'de> {
    fn take(&mut self, n: usize) -> Result<&'de [u8], Error> {
        if self.buf.len() < self.pos + n {
            return Err(Error::Eof { needed: self.pos + n - self.buf.len() });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

macro_rules! deserialize_be {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes: [u8; N] = self.take(N)?.try_into().unwrap();
            visitor.$visit(<$ty>::from_be_bytes(bytes))
        }
    };
}

impl<'de, 'a> serde::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("deserialize_any: AMQP wire types are not self-describing"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let b = self.take(1)?[0];
        visitor.visit_bool(b != 0)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let b = self.take(1)?[0];
        visitor.visit_i8(b as i8)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let b = self.take(1)?[0];
        visitor.visit_u8(b)
    }

    deserialize_be!(deserialize_i16, visit_i16, i16);
    deserialize_be!(deserialize_u16, visit_u16, u16);
    deserialize_be!(deserialize_i32, visit_i32, i32);
    deserialize_be!(deserialize_u32, visit_u32, u32);
    deserialize_be!(deserialize_i64, visit_i64, i64);
    deserialize_be!(deserialize_u64, visit_u64, u64);
    deserialize_be!(deserialize_f32, visit_f32, f32);
    deserialize_be!(deserialize_f64, visit_f64, f64);

    fn deserialize_char<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("char"))
    }

    /// Short-string framing: one length octet, then that many UTF-8 bytes.
    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let len = self.take(1)?[0] as usize;
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes)?.to_owned();
        visitor.visit_string(s)
    }

    /// Long-string / field-table framing: a 4-octet length prefix, then raw
    /// bytes. [`crate::types::LongStr`] and [`crate::types::FieldTable`]
    /// both route through here and reparse the slice themselves.
    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let declared = u32::from_be_bytes(self.take(4)?.try_into().unwrap()) as usize;
        if self.remaining() < declared {
            return Err(Error::StringLengthOverrun { declared, available: self.remaining() });
        }
        let bytes = self.take(declared)?;
        visitor.visit_byte_buf(bytes.to_vec())
    }

    fn deserialize_option<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("Option"))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("sequence"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Error> {
        Err(Error::Unsupported("tuple struct"))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("map (use FieldTable)"))
    }

    /// Method argument structs derive `Deserialize` and rely on this:
    /// fields are read back in declared order via [`StructSeq`].
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_seq(StructSeq { de: self, remaining: fields.len() })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Error> {
        Err(Error::Unsupported("enum"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("identifier"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unsupported("ignored_any"))
    }
}

struct StructSeq<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de> SeqAccess<'de> for StructSeq<'a, 'de> {
    type Error = Error;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, Error> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}
