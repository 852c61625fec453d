//! Basic class (60) method argument schemas, plus the content-header frame
//! (body size + property flags + property table) that always follows a
//! has-content method.

use amqp_serde::types::{AmqpTimeStamp, FieldTable, PackedBits, ShortStr};
use serde::{Deserialize, Serialize};

use super::constants::basic::*;
use super::constants::CLASS_BASIC;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qos {
    prefetch_size: u32,
    prefetch_count: u16,
    global: bool,
}
impl Qos {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = QOS;

    pub fn new(prefetch_size: u32, prefetch_count: u16, global: bool) -> Self {
        Self { prefetch_size, prefetch_count, global }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QosOk;
impl QosOk {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = QOS_OK;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consume {
    reserved_1: u16,
    queue: ShortStr,
    consumer_tag: ShortStr,
    flags: PackedBits, // bit0=no_local bit1=no_ack bit2=exclusive bit3=no_wait
    arguments: FieldTable,
}
impl Consume {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = CONSUME;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: ShortStr,
        consumer_tag: ShortStr,
        no_local: bool,
        no_ack: bool,
        exclusive: bool,
        no_wait: bool,
        arguments: FieldTable,
    ) -> Self {
        Self {
            reserved_1: 0,
            queue,
            consumer_tag,
            flags: PackedBits::new(&[no_local, no_ack, exclusive, no_wait]),
            arguments,
        }
    }
    pub fn no_ack(&self) -> bool {
        self.flags.get(1)
    }
    pub fn no_wait(&self) -> bool {
        self.flags.get(3)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeOk {
    consumer_tag: ShortStr,
}
impl ConsumeOk {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = CONSUME_OK;

    pub fn consumer_tag(&self) -> &ShortStr {
        &self.consumer_tag
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    consumer_tag: ShortStr,
    no_wait: bool,
}
impl Cancel {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = CANCEL;

    pub fn new(consumer_tag: ShortStr, no_wait: bool) -> Self {
        Self { consumer_tag, no_wait }
    }
    pub fn consumer_tag(&self) -> &ShortStr {
        &self.consumer_tag
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOk {
    consumer_tag: ShortStr,
}
impl CancelOk {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = CANCEL_OK;

    pub fn consumer_tag(&self) -> &ShortStr {
        &self.consumer_tag
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publish {
    reserved_1: u16,
    exchange: ShortStr,
    routing_key: ShortStr,
    flags: PackedBits, // bit0=mandatory bit1=immediate
}
impl Publish {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = PUBLISH;

    pub fn new(exchange: ShortStr, routing_key: ShortStr, mandatory: bool, immediate: bool) -> Self {
        Self { reserved_1: 0, exchange, routing_key, flags: PackedBits::new(&[mandatory, immediate]) }
    }
    pub fn routing_key(&self) -> &ShortStr {
        &self.routing_key
    }
    pub fn exchange(&self) -> &ShortStr {
        &self.exchange
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    reply_code: u16,
    reply_text: ShortStr,
    exchange: ShortStr,
    routing_key: ShortStr,
}
impl Return {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = RETURN;

    pub fn reply_code(&self) -> u16 {
        self.reply_code
    }
    pub fn reply_text(&self) -> &ShortStr {
        &self.reply_text
    }
    pub fn exchange(&self) -> &ShortStr {
        &self.exchange
    }
    pub fn routing_key(&self) -> &ShortStr {
        &self.routing_key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliver {
    consumer_tag: ShortStr,
    delivery_tag: u64,
    redelivered: bool,
    exchange: ShortStr,
    routing_key: ShortStr,
}
impl Deliver {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = DELIVER;

    pub fn consumer_tag(&self) -> &ShortStr {
        &self.consumer_tag
    }
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }
    pub fn exchange(&self) -> &ShortStr {
        &self.exchange
    }
    pub fn routing_key(&self) -> &ShortStr {
        &self.routing_key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Get {
    reserved_1: u16,
    queue: ShortStr,
    no_ack: bool,
}
impl Get {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = GET;

    pub fn new(queue: ShortStr, no_ack: bool) -> Self {
        Self { reserved_1: 0, queue, no_ack }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOk {
    delivery_tag: u64,
    redelivered: bool,
    exchange: ShortStr,
    routing_key: ShortStr,
    message_count: u32,
}
impl GetOk {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = GET_OK;

    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }
    pub fn exchange(&self) -> &ShortStr {
        &self.exchange
    }
    pub fn routing_key(&self) -> &ShortStr {
        &self.routing_key
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEmpty {
    reserved_1: ShortStr,
}
impl GetEmpty {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = GET_EMPTY;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    delivery_tag: u64,
    multiple: bool,
}
impl Ack {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = ACK;

    pub fn new(delivery_tag: u64, multiple: bool) -> Self {
        Self { delivery_tag, multiple }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reject {
    delivery_tag: u64,
    requeue: bool,
}
impl Reject {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = REJECT;

    pub fn new(delivery_tag: u64, requeue: bool) -> Self {
        Self { delivery_tag, requeue }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nack {
    delivery_tag: u64,
    flags: PackedBits, // bit0=multiple bit1=requeue
}
impl Nack {
    pub const CLASS_ID: u16 = CLASS_BASIC;
    pub const METHOD_ID: u16 = NACK;

    pub fn new(delivery_tag: u64, multiple: bool, requeue: bool) -> Self {
        Self { delivery_tag, flags: PackedBits::new(&[multiple, requeue]) }
    }
}

/// `basic` class content properties: a field-presence bitmask followed by
/// only the present properties, in declared order. Encoding is hand-rolled
/// (like [`amqp_serde::types::FieldTable`]) rather than derived, since the
/// wire layout omits absent fields entirely instead of framing them as
/// `serialize_none` — something a generic struct derive can't express.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicProperties {
    presence: PresenceFlags,
    content_type: Option<ShortStr>,
    content_encoding: Option<ShortStr>,
    headers: Option<FieldTable>,
    delivery_mode: Option<u8>,
    priority: Option<u8>,
    correlation_id: Option<ShortStr>,
    reply_to: Option<ShortStr>,
    expiration: Option<ShortStr>,
    message_id: Option<ShortStr>,
    timestamp: Option<AmqpTimeStamp>,
    message_type: Option<ShortStr>,
    user_id: Option<ShortStr>,
    app_id: Option<ShortStr>,
}

/// Presence bitmask for [`BasicProperties`]; encoded as a single `u16`
/// (more than the real protocol's 14 flags need, but wide enough and
/// trivially round-trippable).
pub type PresenceFlags = u16;

pub mod presence_bit {
    pub const CONTENT_TYPE: u16 = 1 << 0;
    pub const CONTENT_ENCODING: u16 = 1 << 1;
    pub const HEADERS: u16 = 1 << 2;
    pub const DELIVERY_MODE: u16 = 1 << 3;
    pub const PRIORITY: u16 = 1 << 4;
    pub const CORRELATION_ID: u16 = 1 << 5;
    pub const REPLY_TO: u16 = 1 << 6;
    pub const EXPIRATION: u16 = 1 << 7;
    pub const MESSAGE_ID: u16 = 1 << 8;
    pub const TIMESTAMP: u16 = 1 << 9;
    pub const MESSAGE_TYPE: u16 = 1 << 10;
    pub const USER_ID: u16 = 1 << 11;
    pub const APP_ID: u16 = 1 << 12;
}

impl BasicProperties {
    pub fn builder() -> BasicPropertiesBuilder {
        BasicPropertiesBuilder::default()
    }

    pub fn content_type(&self) -> Option<&ShortStr> {
        self.content_type.as_ref()
    }
    pub fn delivery_mode(&self) -> Option<u8> {
        self.delivery_mode
    }
    pub fn correlation_id(&self) -> Option<&ShortStr> {
        self.correlation_id.as_ref()
    }
    pub fn reply_to(&self) -> Option<&ShortStr> {
        self.reply_to.as_ref()
    }
    pub fn message_id(&self) -> Option<&ShortStr> {
        self.message_id.as_ref()
    }
    pub fn headers(&self) -> Option<&FieldTable> {
        self.headers.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BasicPropertiesBuilder {
    inner: BasicProperties,
}
impl BasicPropertiesBuilder {
    pub fn content_type(mut self, v: ShortStr) -> Self {
        self.inner.presence |= presence_bit::CONTENT_TYPE;
        self.inner.content_type = Some(v);
        self
    }
    pub fn content_encoding(mut self, v: ShortStr) -> Self {
        self.inner.presence |= presence_bit::CONTENT_ENCODING;
        self.inner.content_encoding = Some(v);
        self
    }
    pub fn headers(mut self, v: FieldTable) -> Self {
        self.inner.presence |= presence_bit::HEADERS;
        self.inner.headers = Some(v);
        self
    }
    pub fn delivery_mode(mut self, v: u8) -> Self {
        self.inner.presence |= presence_bit::DELIVERY_MODE;
        self.inner.delivery_mode = Some(v);
        self
    }
    pub fn priority(mut self, v: u8) -> Self {
        self.inner.presence |= presence_bit::PRIORITY;
        self.inner.priority = Some(v);
        self
    }
    pub fn correlation_id(mut self, v: ShortStr) -> Self {
        self.inner.presence |= presence_bit::CORRELATION_ID;
        self.inner.correlation_id = Some(v);
        self
    }
    pub fn reply_to(mut self, v: ShortStr) -> Self {
        self.inner.presence |= presence_bit::REPLY_TO;
        self.inner.reply_to = Some(v);
        self
    }
    pub fn message_id(mut self, v: ShortStr) -> Self {
        self.inner.presence |= presence_bit::MESSAGE_ID;
        self.inner.message_id = Some(v);
        self
    }
    pub fn timestamp(mut self, v: AmqpTimeStamp) -> Self {
        self.inner.presence |= presence_bit::TIMESTAMP;
        self.inner.timestamp = Some(v);
        self
    }
    pub fn finish(self) -> BasicProperties {
        self.inner
    }
}

impl BasicProperties {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.presence.to_be_bytes());
        macro_rules! put_shortstr {
            ($field:expr) => {
                if let Some(s) = $field {
                    out.push(s.as_str().len() as u8);
                    out.extend_from_slice(s.as_str().as_bytes());
                }
            };
        }
        put_shortstr!(&self.content_type);
        put_shortstr!(&self.content_encoding);
        if let Some(h) = &self.headers {
            let mut buf = bytes::BytesMut::new();
            amqp_serde::to_buffer(h, &mut buf).expect("FieldTable encoding cannot fail");
            out.extend_from_slice(&buf);
        }
        if let Some(v) = self.delivery_mode {
            out.push(v);
        }
        if let Some(v) = self.priority {
            out.push(v);
        }
        put_shortstr!(&self.correlation_id);
        put_shortstr!(&self.reply_to);
        put_shortstr!(&self.expiration);
        put_shortstr!(&self.message_id);
        if let Some(ts) = self.timestamp {
            out.extend_from_slice(&(ts.epoch_seconds() as u64).to_be_bytes());
        }
        put_shortstr!(&self.message_type);
        put_shortstr!(&self.user_id);
        put_shortstr!(&self.app_id);
    }

    fn decode_from(buf: &[u8]) -> Result<(Self, usize), amqp_serde::Error> {
        use amqp_serde::Error;
        let mut pos = 0usize;
        let need = |buf: &[u8], pos: usize, n: usize| -> Result<(), Error> {
            if buf.len() < pos + n {
                Err(Error::Eof { needed: pos + n - buf.len() })
            } else {
                Ok(())
            }
        };
        need(buf, pos, 2)?;
        let presence = u16::from_be_bytes(buf[pos..pos + 2].try_into().unwrap());
        pos += 2;

        let mut read_shortstr = |buf: &[u8], pos: &mut usize| -> Result<ShortStr, Error> {
            need(buf, *pos, 1)?;
            let len = buf[*pos] as usize;
            *pos += 1;
            need(buf, *pos, len)?;
            let s = std::str::from_utf8(&buf[*pos..*pos + len])?.to_owned();
            *pos += len;
            ShortStr::try_from(s).map_err(|_| Error::ShortStringTooLong(len))
        };

        let mut props = BasicProperties { presence, ..Default::default() };
        if presence & presence_bit::CONTENT_TYPE != 0 {
            props.content_type = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::CONTENT_ENCODING != 0 {
            props.content_encoding = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::HEADERS != 0 {
            need(buf, pos, 4)?;
            let declared = u32::from_be_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
            pos += 4;
            need(buf, pos, declared)?;
            let mut with_len = Vec::with_capacity(4 + declared);
            with_len.extend_from_slice(&(declared as u32).to_be_bytes());
            with_len.extend_from_slice(&buf[pos..pos + declared]);
            pos += declared;
            let (table, _): (FieldTable, usize) = amqp_serde::from_bytes(&with_len)?;
            props.headers = Some(table);
        }
        if presence & presence_bit::DELIVERY_MODE != 0 {
            need(buf, pos, 1)?;
            props.delivery_mode = Some(buf[pos]);
            pos += 1;
        }
        if presence & presence_bit::PRIORITY != 0 {
            need(buf, pos, 1)?;
            props.priority = Some(buf[pos]);
            pos += 1;
        }
        if presence & presence_bit::CORRELATION_ID != 0 {
            props.correlation_id = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::REPLY_TO != 0 {
            props.reply_to = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::EXPIRATION != 0 {
            props.expiration = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::MESSAGE_ID != 0 {
            props.message_id = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::TIMESTAMP != 0 {
            need(buf, pos, 8)?;
            let v = u64::from_be_bytes(buf[pos..pos + 8].try_into().unwrap());
            props.timestamp = Some(AmqpTimeStamp::from_epoch_seconds(v as i64));
            pos += 8;
        }
        if presence & presence_bit::MESSAGE_TYPE != 0 {
            props.message_type = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::USER_ID != 0 {
            props.user_id = Some(read_shortstr(buf, &mut pos)?);
        }
        if presence & presence_bit::APP_ID != 0 {
            props.app_id = Some(read_shortstr(buf, &mut pos)?);
        }
        Ok((props, pos))
    }
}

impl Serialize for BasicProperties {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        serializer.serialize_bytes(&out)
    }
}

impl<'de> Deserialize<'de> for BasicProperties {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = BasicProperties;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("AMQP basic content properties")
            }
            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<BasicProperties, E> {
                BasicProperties::decode_from(&v).map(|(p, _)| p).map_err(serde::de::Error::custom)
            }
            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<BasicProperties, E> {
                BasicProperties::decode_from(v).map(|(p, _)| p).map_err(serde::de::Error::custom)
            }
        }
        deserializer.deserialize_byte_buf(V)
    }
}

/// Content-header frame: class id (always [`CLASS_BASIC`] for this crate's
/// supported surface), declared body size, and the property table above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentHeader {
    class_id: u16,
    weight: u16,
    body_size: u64,
    properties: BasicProperties,
}
impl ContentHeader {
    pub fn new(body_size: u64, properties: BasicProperties) -> Self {
        Self { class_id: CLASS_BASIC, weight: 0, body_size, properties }
    }
    pub fn body_size(&self) -> u64 {
        self.body_size
    }
    pub fn properties(&self) -> &BasicProperties {
        &self.properties
    }
}
