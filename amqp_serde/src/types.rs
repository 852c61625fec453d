//! AMQP 0-9-1 primitive wire types.
//!
//! Each type here maps onto exactly one entry of the AMQP 0-9-1 type table
//! (octet, short, long, long-long, short-string, long-string, field-table,
//! bit, timestamp). Plain Rust integers (`u8`, `u16`, `u32`, `u64`, `i16`,
//! `i32`, `i64`) are used directly for the fixed-width numeric types; the
//! newtypes below exist only where the wire framing needs extra behaviour
//! (a length prefix, a tagged union, packed bits).

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

pub type AmqpChannelId = u16;
pub type AmqpClassId = u16;
pub type AmqpMethodId = u16;
pub type AmqpFrameType = u8;
pub type AmqpReplyCode = u16;

/// Length-prefixed (1 octet), UTF-8 string. Maximum 255 bytes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortStr(String);

impl ShortStr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for ShortStr {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self, Error> {
        if value.len() > u8::MAX as usize {
            return Err(Error::ShortStringTooLong(value.len()));
        }
        Ok(ShortStr(value.to_owned()))
    }
}

impl TryFrom<String> for ShortStr {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Error> {
        if value.len() > u8::MAX as usize {
            return Err(Error::ShortStringTooLong(value.len()));
        }
        Ok(ShortStr(value))
    }
}

impl Serialize for ShortStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShortStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = ShortStr;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an AMQP short string")
            }
            fn visit_string<E: de::Error>(self, v: String) -> Result<ShortStr, E> {
                Ok(ShortStr(v))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<ShortStr, E> {
                Ok(ShortStr(v.to_owned()))
            }
        }
        deserializer.deserialize_string(V)
    }
}

/// Length-prefixed (4 octets), raw-byte string. Not required to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LongStr(Vec<u8>);

impl LongStr {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for LongStr {
    fn from(v: Vec<u8>) -> Self {
        LongStr(v)
    }
}

impl TryFrom<&str> for LongStr {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self, Error> {
        Ok(LongStr(value.as_bytes().to_vec()))
    }
}

impl TryFrom<String> for LongStr {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Error> {
        Ok(LongStr(value.into_bytes()))
    }
}

impl Serialize for LongStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for LongStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = LongStr;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an AMQP long string")
            }
            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<LongStr, E> {
                Ok(LongStr(v))
            }
            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<LongStr, E> {
                Ok(LongStr(v.to_vec()))
            }
        }
        deserializer.deserialize_byte_buf(V)
    }
}

/// Seconds since the Unix epoch, UTC, second resolution. Sub-second detail
/// must never be observable: constructors truncate towards zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmqpTimeStamp(i64);

impl AmqpTimeStamp {
    pub fn from_epoch_seconds(secs: i64) -> Self {
        AmqpTimeStamp(secs)
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.0
    }
}

impl Serialize for AmqpTimeStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0 as u64)
    }
}

impl<'de> Deserialize<'de> for AmqpTimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = AmqpTimeStamp;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an AMQP timestamp")
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AmqpTimeStamp, E> {
                Ok(AmqpTimeStamp(v as i64))
            }
        }
        deserializer.deserialize_u64(V)
    }
}

/// Up to eight LSB-first packed booleans, as AMQP method argument tables
/// pack consecutive `bit` fields into a single octet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedBits(u8);

impl PackedBits {
    pub fn new(bits: &[bool]) -> Self {
        let mut byte = 0u8;
        for (i, b) in bits.iter().enumerate().take(8) {
            if *b {
                byte |= 1 << i;
            }
        }
        PackedBits(byte)
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < 8);
        (self.0 >> index) & 1 == 1
    }

    pub fn raw(&self) -> u8 {
        self.0
    }
}

impl Serialize for PackedBits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for PackedBits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PackedBits(u8::deserialize(deserializer)?))
    }
}

/// Pack up to eight consecutive booleans into a single LSB-first octet.
pub fn pack_bools(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8).map(|chunk| PackedBits::new(chunk).raw()).collect()
}

/// Inverse of [`pack_bools`]: expand `n` octets into `n * 8` booleans,
/// LSB-first.
pub fn unpack_bools(bytes: &[u8], count: usize) -> Vec<bool> {
    let mut out = Vec::with_capacity(count);
    'outer: for byte in bytes {
        for i in 0..8 {
            if out.len() == count {
                break 'outer;
            }
            out.push((byte >> i) & 1 == 1);
        }
    }
    out
}

/// A single AMQP field-table value, tagged by its wire type code.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    ShortShortInt(i8),
    ShortShortUint(u8),
    ShortInt(i16),
    ShortUint(u16),
    LongInt(i32),
    LongUint(u32),
    LongLongInt(i64),
    LongLongUint(u64),
    Float(f32),
    Double(f64),
    ShortString(String),
    LongString(Vec<u8>),
    FieldTable(FieldTable),
    Timestamp(AmqpTimeStamp),
    Void,
}

impl FieldValue {
    fn tag(&self) -> u8 {
        match self {
            FieldValue::Boolean(_) => b't',
            FieldValue::ShortShortInt(_) => b'b',
            FieldValue::ShortShortUint(_) => b'B',
            FieldValue::ShortInt(_) => b'U',
            FieldValue::ShortUint(_) => b'u',
            FieldValue::LongInt(_) => b'I',
            FieldValue::LongUint(_) => b'i',
            FieldValue::LongLongInt(_) => b'L',
            FieldValue::LongLongUint(_) => b'l',
            FieldValue::Float(_) => b'f',
            FieldValue::Double(_) => b'd',
            FieldValue::ShortString(_) => b's',
            FieldValue::LongString(_) => b'S',
            FieldValue::FieldTable(_) => b'F',
            FieldValue::Timestamp(_) => b'T',
            FieldValue::Void => b'V',
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        match self {
            FieldValue::Boolean(b) => out.push(if *b { 1 } else { 0 }),
            FieldValue::ShortShortInt(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::ShortShortUint(v) => out.push(*v),
            FieldValue::ShortInt(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::ShortUint(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::LongInt(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::LongUint(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::LongLongInt(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::LongLongUint(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::ShortString(s) => {
                out.push(s.len() as u8);
                out.extend_from_slice(s.as_bytes());
            }
            FieldValue::LongString(b) => {
                out.extend_from_slice(&(b.len() as u32).to_be_bytes());
                out.extend_from_slice(b);
            }
            FieldValue::FieldTable(t) => {
                let entries = t.encode_entries();
                out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
                out.extend_from_slice(&entries);
            }
            FieldValue::Timestamp(ts) => out.extend_from_slice(&(ts.epoch_seconds() as u64).to_be_bytes()),
            FieldValue::Void => {}
        }
    }

    fn decode_from(tag: u8, buf: &[u8], pos: &mut usize) -> Result<Self, Error> {
        fn need(buf: &[u8], pos: usize, n: usize) -> Result<(), Error> {
            if buf.len() < pos + n {
                Err(Error::Eof { needed: pos + n - buf.len() })
            } else {
                Ok(())
            }
        }
        Ok(match tag {
            b't' => {
                need(buf, *pos, 1)?;
                let v = buf[*pos] != 0;
                *pos += 1;
                FieldValue::Boolean(v)
            }
            b'b' => {
                need(buf, *pos, 1)?;
                let v = buf[*pos] as i8;
                *pos += 1;
                FieldValue::ShortShortInt(v)
            }
            b'B' => {
                need(buf, *pos, 1)?;
                let v = buf[*pos];
                *pos += 1;
                FieldValue::ShortShortUint(v)
            }
            b'U' => {
                need(buf, *pos, 2)?;
                let v = i16::from_be_bytes(buf[*pos..*pos + 2].try_into().unwrap());
                *pos += 2;
                FieldValue::ShortInt(v)
            }
            b'u' => {
                need(buf, *pos, 2)?;
                let v = u16::from_be_bytes(buf[*pos..*pos + 2].try_into().unwrap());
                *pos += 2;
                FieldValue::ShortUint(v)
            }
            b'I' => {
                need(buf, *pos, 4)?;
                let v = i32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap());
                *pos += 4;
                FieldValue::LongInt(v)
            }
            b'i' => {
                need(buf, *pos, 4)?;
                let v = u32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap());
                *pos += 4;
                FieldValue::LongUint(v)
            }
            b'L' => {
                need(buf, *pos, 8)?;
                let v = i64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
                *pos += 8;
                FieldValue::LongLongInt(v)
            }
            b'l' => {
                need(buf, *pos, 8)?;
                let v = u64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
                *pos += 8;
                FieldValue::LongLongUint(v)
            }
            b'f' => {
                need(buf, *pos, 4)?;
                let v = f32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap());
                *pos += 4;
                FieldValue::Float(v)
            }
            b'd' => {
                need(buf, *pos, 8)?;
                let v = f64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
                *pos += 8;
                FieldValue::Double(v)
            }
            b's' => {
                need(buf, *pos, 1)?;
                let len = buf[*pos] as usize;
                *pos += 1;
                need(buf, *pos, len)?;
                let s = std::str::from_utf8(&buf[*pos..*pos + len])?.to_owned();
                *pos += len;
                FieldValue::ShortString(s)
            }
            b'S' => {
                need(buf, *pos, 4)?;
                let len = u32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap()) as usize;
                *pos += 4;
                if buf.len() < *pos + len {
                    return Err(Error::StringLengthOverrun { declared: len, available: buf.len() - *pos });
                }
                let v = buf[*pos..*pos + len].to_vec();
                *pos += len;
                FieldValue::LongString(v)
            }
            b'F' => {
                need(buf, *pos, 4)?;
                let len = u32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap()) as usize;
                *pos += 4;
                if buf.len() < *pos + len {
                    return Err(Error::TableLengthOverrun { declared: len, available: buf.len() - *pos });
                }
                let table = FieldTable::decode_entries(&buf[*pos..*pos + len])?;
                *pos += len;
                FieldValue::FieldTable(table)
            }
            b'T' => {
                need(buf, *pos, 8)?;
                let v = u64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
                *pos += 8;
                FieldValue::Timestamp(AmqpTimeStamp::from_epoch_seconds(v as i64))
            }
            b'V' => FieldValue::Void,
            other => return Err(Error::UnknownFieldValueTag(other)),
        })
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}
impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::LongString(v.as_bytes().to_vec())
    }
}
impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::LongString(v.into_bytes())
    }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::LongLongInt(v)
    }
}

/// A `key -> tagged value` map. Keys are unique short-strings; the wire
/// representation is a 4-octet byte length followed by that many bytes of
/// `(key, tag, value)` triples. `BTreeMap` gives a canonical, deterministic
/// encoding order since AMQP does not make insertion order observable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable(BTreeMap<String, FieldValue>);

/// Client/server properties table: same wire shape as [`FieldTable`].
pub type AmqpPeerProperties = FieldTable;

impl FieldTable {
    pub fn new() -> Self {
        FieldTable(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    fn encode_entries(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (k, v) in &self.0 {
            out.push(k.len() as u8);
            out.extend_from_slice(k.as_bytes());
            v.encode_into(&mut out);
        }
        out
    }

    fn decode_entries(buf: &[u8]) -> Result<Self, Error> {
        let mut pos = 0usize;
        let mut map = BTreeMap::new();
        while pos < buf.len() {
            if buf.len() < pos + 1 {
                return Err(Error::Eof { needed: 1 });
            }
            let klen = buf[pos] as usize;
            pos += 1;
            if buf.len() < pos + klen {
                return Err(Error::Eof { needed: pos + klen - buf.len() });
            }
            let key = std::str::from_utf8(&buf[pos..pos + klen])?.to_owned();
            pos += klen;
            if buf.len() < pos + 1 {
                return Err(Error::Eof { needed: 1 });
            }
            let tag = buf[pos];
            pos += 1;
            let value = FieldValue::decode_from(tag, buf, &mut pos)?;
            map.insert(key, value);
        }
        Ok(FieldTable(map))
    }
}

impl FromIterator<(String, FieldValue)> for FieldTable {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        FieldTable(iter.into_iter().collect())
    }
}

impl Serialize for FieldTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.encode_entries())
    }
}

impl<'de> Deserialize<'de> for FieldTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = FieldTable;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an AMQP field table")
            }
            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<FieldTable, E> {
                FieldTable::decode_entries(&v).map_err(de::Error::custom)
            }
            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<FieldTable, E> {
                FieldTable::decode_entries(v).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_byte_buf(V)
    }
}
