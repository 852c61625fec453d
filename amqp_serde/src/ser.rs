use bytes::BytesMut;
use serde::{ser, Serialize};

use crate::Error;

/// Serialize `value` onto the end of `buf`, returning the number of bytes
/// appended. Mirrors the teacher's `to_buffer` call site: frame headers and
/// method argument structs are both just `impl Serialize`.
pub fn to_buffer<T: Serialize + ?Sized>(value: &T, buf: &mut BytesMut) -> Result<usize, Error> {
    let start = buf.len();
    value.serialize(&mut Serializer { buf })?;
    Ok(buf.len() - start)
}

pub struct Serializer<'a> {
    pub(crate) buf: &'a mut BytesMut,
}

macro_rules! serialize_be {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> Result<(), Error> {
            self.buf.extend_from_slice(&v.to_be_bytes());
            Ok(())
        }
    };
}

impl<'a, 'b> ser::Serializer for &'a mut Serializer<'b> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = ser::Impossible<(), Error>;
    type SerializeTuple = ser::Impossible<(), Error>;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = ser::Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    fn serialize_bool(self, v: bool) -> Result<(), Error> {
        self.buf.extend_from_slice(&[if v { 1 } else { 0 }]);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), Error> {
        self.buf.extend_from_slice(&v.to_be_bytes());
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), Error> {
        self.buf.extend_from_slice(&[v]);
        Ok(())
    }

    serialize_be!(serialize_i16, i16);
    serialize_be!(serialize_u16, u16);
    serialize_be!(serialize_i32, i32);
    serialize_be!(serialize_u32, u32);
    serialize_be!(serialize_i64, i64);
    serialize_be!(serialize_u64, u64);
    serialize_be!(serialize_f32, f32);
    serialize_be!(serialize_f64, f64);

    fn serialize_char(self, _v: char) -> Result<(), Error> {
        Err(Error::Unsupported("char"))
    }

    /// Short-string framing: a single length octet followed by UTF-8 bytes.
    fn serialize_str(self, v: &str) -> Result<(), Error> {
        if v.len() > u8::MAX as usize {
            return Err(Error::ShortStringTooLong(v.len()));
        }
        self.buf.extend_from_slice(&[v.len() as u8]);
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    /// Long-string/field-table framing: a 4-octet length prefix followed by
    /// raw bytes. [`crate::types::LongStr`] and [`crate::types::FieldTable`]
    /// both route through here.
    fn serialize_bytes(self, v: &[u8]) -> Result<(), Error> {
        self.buf.extend_from_slice(&(v.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Error> {
        Err(Error::Unsupported("Option::None"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<(), Error> {
        Err(Error::Unsupported("Option::Some"))
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), Error> {
        Err(Error::Unsupported("enum variant"))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), Error> {
        Err(Error::Unsupported("enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(Error::Unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(Error::Unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(Error::Unsupported("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(Error::Unsupported("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(Error::Unsupported("map (use FieldTable)"))
    }

    /// Method argument structs derive `Serialize` and rely on this: each
    /// field is written in declared order with no name/tag overhead, which
    /// is exactly the AMQP method-argument wire layout.
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(Error::Unsupported("struct variant"))
    }
}

impl<'a, 'b> ser::SerializeStruct for &'a mut Serializer<'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}
