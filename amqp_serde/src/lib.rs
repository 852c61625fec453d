//! Serde implementation for AMQP 0-9-1 wire types.
//!
//! This crate provides the byte-exact codec the `amqprs` crate builds on:
//! fixed-width integers, length-prefixed short/long strings, field tables,
//! packed booleans and timestamps, plus the `Serializer`/`Deserializer`
//! pair that drives `#[derive(Serialize, Deserialize)]` method-argument
//! structs in declared-field order.

mod de;
mod error;
mod ser;
pub mod types;

pub use de::{from_bytes, Deserializer};
pub use error::Error;
pub use ser::{to_buffer, Serializer};

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use types::{pack_bools, unpack_bools, FieldTable, FieldValue};

    #[test]
    fn field_table_round_trip_literal() {
        let mut table = FieldTable::new();
        table.insert("key1", FieldValue::Boolean(false));
        table.insert("key2", FieldValue::Boolean(true));

        let mut buf = BytesMut::new();
        to_buffer(&table, &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            b"\x00\x00\x00\x0E\x04key1t\x00\x04key2t\x01".as_slice()
        );

        let (decoded, consumed): (FieldTable, usize) = from_bytes(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, table);
    }

    #[test]
    fn field_table_round_trip_is_identity_for_every_tag() {
        let mut table = FieldTable::new();
        table.insert("a", FieldValue::ShortShortInt(-12));
        table.insert("b", FieldValue::ShortShortUint(200));
        table.insert("c", FieldValue::ShortInt(-1000));
        table.insert("d", FieldValue::ShortUint(60000));
        table.insert("e", FieldValue::LongInt(-100_000));
        table.insert("f", FieldValue::LongUint(4_000_000_000));
        table.insert("g", FieldValue::LongLongInt(-5_000_000_000));
        table.insert("h", FieldValue::LongLongUint(10_000_000_000));
        table.insert("i", FieldValue::Float(1.5));
        table.insert("j", FieldValue::Double(2.25));
        table.insert("k", FieldValue::ShortString("hi".into()));
        table.insert("l", FieldValue::LongString(b"a long string".to_vec()));
        table.insert("m", FieldValue::Timestamp(types::AmqpTimeStamp::from_epoch_seconds(1_700_000_000)));
        table.insert("n", FieldValue::Void);
        let mut nested = FieldTable::new();
        nested.insert("inner", FieldValue::Boolean(true));
        table.insert("o", FieldValue::FieldTable(nested));

        let mut buf = BytesMut::new();
        to_buffer(&table, &mut buf).unwrap();
        let (decoded, consumed): (FieldTable, usize) = from_bytes(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, table);
    }

    #[test]
    fn malformed_field_table_errors_and_does_not_overrun() {
        // declares 100 bytes of content but only 2 are present
        let raw = [0x00u8, 0x00, 0x00, 0x64, 0x01, 0x02];
        let result: Result<(FieldTable, usize), Error> = from_bytes(&raw);
        assert!(result.is_err());

        // unknown tag byte 'Z'
        let raw2 = b"\x00\x00\x00\x03\x01aZ";
        let result2: Result<(FieldTable, usize), Error> = from_bytes(raw2);
        assert!(matches!(result2, Err(Error::UnknownFieldValueTag(b'Z'))));
    }

    #[test]
    fn bit_packing_matches_literal_examples() {
        assert_eq!(pack_bools(&[true, false, true]), vec![0x05]);
        assert_eq!(
            pack_bools(&[true, true, true, true, true, true, true, true]),
            vec![0xFF]
        );
    }

    #[test]
    fn bit_unpacking_is_inverse_of_packing_for_arbitrary_sequences() {
        let bits = [
            true, false, false, true, true, false, true, false, true, true, false,
        ];
        let packed = pack_bools(&bits);
        let unpacked = unpack_bools(&packed, bits.len());
        assert_eq!(unpacked, bits);
    }

    #[test]
    fn timestamp_round_trips_at_second_resolution() {
        let ts = types::AmqpTimeStamp::from_epoch_seconds(1_735_689_600);
        let mut buf = BytesMut::new();
        to_buffer(&ts, &mut buf).unwrap();
        let (decoded, consumed): (types::AmqpTimeStamp, usize) = from_bytes(&buf).unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(decoded.epoch_seconds(), ts.epoch_seconds());
    }

    #[test]
    fn short_string_round_trips() {
        use types::ShortStr;
        let s: ShortStr = "hello".try_into().unwrap();
        let mut buf = BytesMut::new();
        to_buffer(&s, &mut buf).unwrap();
        assert_eq!(&buf[..], b"\x05hello".as_slice());
        let (decoded, consumed): (ShortStr, usize) = from_bytes(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded.as_str(), "hello");
    }

    #[test]
    fn long_string_round_trips() {
        use types::LongStr;
        let s: LongStr = "a longer payload".try_into().unwrap();
        let mut buf = BytesMut::new();
        to_buffer(&s, &mut buf).unwrap();
        let (decoded, consumed): (LongStr, usize) = from_bytes(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded.as_bytes(), s.as_bytes());
    }
}
