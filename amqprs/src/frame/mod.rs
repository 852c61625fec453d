//! The AMQP 0-9-1 frame layer: wire framing (`type | channel | length |
//! payload | frame-end`), the protocol header sent at connection start, and
//! the `Frame` enum every other layer of the crate operates on.

pub mod basic;
pub mod channel;
pub mod connection;
pub mod constants;
pub mod exchange;
pub mod queue;

use std::fmt;

use amqp_serde::types::{AmqpChannelId, AmqpClassId, AmqpFrameType, AmqpMethodId};
use serde::ser::SerializeStruct;
use serde::Serialize;

use crate::error::Error;
use constants::{
    CLASS_BASIC, CLASS_CHANNEL, CLASS_CONNECTION, CLASS_EXCHANGE, CLASS_QUEUE, FRAME_BODY,
    FRAME_END, FRAME_HEADER, FRAME_HEARTBEAT, FRAME_METHOD,
};

/// The 8 bytes sent by the client before any other frame: `AMQP\0\0\x09\x01`.
/// Written as raw octets with no length prefix, unlike every other type in
/// this crate, so it gets a hand-rolled `Serialize` rather than a derive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolHeader;

impl ProtocolHeader {
    pub const BYTES: [u8; 8] = *b"AMQP\x00\x00\x09\x01";
}

impl Serialize for ProtocolHeader {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_raw_bytes(serializer, &Self::BYTES)
    }
}

/// Writes `bytes` with no length prefix by treating each octet as one
/// positional struct field. The codec's `serialize_struct` never frames its
/// fields, unlike `serialize_bytes`, which is what
/// [`amqp_serde::types::LongStr`]/[`amqp_serde::types::FieldTable`] want.
fn serialize_raw_bytes<S: serde::Serializer>(serializer: S, bytes: &[u8]) -> Result<S::Ok, S::Error> {
    let mut st = serializer.serialize_struct("RawBytes", bytes.len())?;
    for b in bytes {
        st.serialize_field("b", b)?;
    }
    st.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct FrameHeader {
    pub frame_type: AmqpFrameType,
    pub channel: AmqpChannelId,
    pub payload_size: u32,
}

/// Every AMQP method this crate supports. Generated mechanically from the
/// class files in this module: one arm per `(class_id, method_id)` pair,
/// matching the dispatch a frame router does on an inbound method frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    ConnectionStart(connection::Start),
    ConnectionStartOk(connection::StartOk),
    ConnectionTune(connection::Tune),
    ConnectionTuneOk(connection::TuneOk),
    ConnectionOpen(connection::Open),
    ConnectionOpenOk(connection::OpenOk),
    ConnectionClose(connection::Close),
    ConnectionCloseOk(connection::CloseOk),

    ChannelOpen(channel::Open),
    ChannelOpenOk(channel::OpenOk),
    ChannelFlow(channel::Flow),
    ChannelFlowOk(channel::FlowOk),
    ChannelClose(channel::Close),
    ChannelCloseOk(channel::CloseOk),

    ExchangeDeclare(exchange::Declare),
    ExchangeDeclareOk(exchange::DeclareOk),
    ExchangeDelete(exchange::Delete),
    ExchangeDeleteOk(exchange::DeleteOk),

    QueueDeclare(queue::Declare),
    QueueDeclareOk(queue::DeclareOk),
    QueueBind(queue::Bind),
    QueueBindOk(queue::BindOk),
    QueueUnbind(queue::Unbind),
    QueueUnbindOk(queue::UnbindOk),
    QueuePurge(queue::Purge),
    QueuePurgeOk(queue::PurgeOk),
    QueueDelete(queue::Delete),
    QueueDeleteOk(queue::DeleteOk),

    BasicQos(basic::Qos),
    BasicQosOk(basic::QosOk),
    BasicConsume(basic::Consume),
    BasicConsumeOk(basic::ConsumeOk),
    BasicCancel(basic::Cancel),
    BasicCancelOk(basic::CancelOk),
    BasicPublish(basic::Publish),
    BasicReturn(basic::Return),
    BasicDeliver(basic::Deliver),
    BasicGet(basic::Get),
    BasicGetOk(basic::GetOk),
    BasicGetEmpty(basic::GetEmpty),
    BasicAck(basic::Ack),
    BasicReject(basic::Reject),
    BasicNack(basic::Nack),
}

macro_rules! method_ids {
    ($self:expr, $($variant:ident => $ty:path),* $(,)?) => {
        match $self {
            $(Method::$variant(_) => (<$ty>::CLASS_ID, <$ty>::METHOD_ID),)*
        }
    };
}

impl Method {
    pub fn class_method_id(&self) -> (AmqpClassId, AmqpMethodId) {
        method_ids!(self,
            ConnectionStart => connection::Start,
            ConnectionStartOk => connection::StartOk,
            ConnectionTune => connection::Tune,
            ConnectionTuneOk => connection::TuneOk,
            ConnectionOpen => connection::Open,
            ConnectionOpenOk => connection::OpenOk,
            ConnectionClose => connection::Close,
            ConnectionCloseOk => connection::CloseOk,
            ChannelOpen => channel::Open,
            ChannelOpenOk => channel::OpenOk,
            ChannelFlow => channel::Flow,
            ChannelFlowOk => channel::FlowOk,
            ChannelClose => channel::Close,
            ChannelCloseOk => channel::CloseOk,
            ExchangeDeclare => exchange::Declare,
            ExchangeDeclareOk => exchange::DeclareOk,
            ExchangeDelete => exchange::Delete,
            ExchangeDeleteOk => exchange::DeleteOk,
            QueueDeclare => queue::Declare,
            QueueDeclareOk => queue::DeclareOk,
            QueueBind => queue::Bind,
            QueueBindOk => queue::BindOk,
            QueueUnbind => queue::Unbind,
            QueueUnbindOk => queue::UnbindOk,
            QueuePurge => queue::Purge,
            QueuePurgeOk => queue::PurgeOk,
            QueueDelete => queue::Delete,
            QueueDeleteOk => queue::DeleteOk,
            BasicQos => basic::Qos,
            BasicQosOk => basic::QosOk,
            BasicConsume => basic::Consume,
            BasicConsumeOk => basic::ConsumeOk,
            BasicCancel => basic::Cancel,
            BasicCancelOk => basic::CancelOk,
            BasicPublish => basic::Publish,
            BasicReturn => basic::Return,
            BasicDeliver => basic::Deliver,
            BasicGet => basic::Get,
            BasicGetOk => basic::GetOk,
            BasicGetEmpty => basic::GetEmpty,
            BasicAck => basic::Ack,
            BasicReject => basic::Reject,
            BasicNack => basic::Nack,
        )
    }

    pub fn into_frame(self) -> Frame {
        Frame::Method(self)
    }

    fn decode_args(class_id: AmqpClassId, method_id: AmqpMethodId, buf: &[u8]) -> Result<Self, Error> {
        macro_rules! dec {
            ($variant:ident) => {{
                let (v, _) = amqp_serde::from_bytes(buf)?;
                Method::$variant(v)
            }};
        }
        use constants::{basic as b, channel as ch, connection as conn, exchange as ex, queue as q};
        Ok(match (class_id, method_id) {
            (CLASS_CONNECTION, conn::START) => dec!(ConnectionStart),
            (CLASS_CONNECTION, conn::START_OK) => dec!(ConnectionStartOk),
            (CLASS_CONNECTION, conn::TUNE) => dec!(ConnectionTune),
            (CLASS_CONNECTION, conn::TUNE_OK) => dec!(ConnectionTuneOk),
            (CLASS_CONNECTION, conn::OPEN) => dec!(ConnectionOpen),
            (CLASS_CONNECTION, conn::OPEN_OK) => dec!(ConnectionOpenOk),
            (CLASS_CONNECTION, conn::CLOSE) => dec!(ConnectionClose),
            (CLASS_CONNECTION, conn::CLOSE_OK) => dec!(ConnectionCloseOk),
            (CLASS_CHANNEL, ch::OPEN) => dec!(ChannelOpen),
            (CLASS_CHANNEL, ch::OPEN_OK) => dec!(ChannelOpenOk),
            (CLASS_CHANNEL, ch::FLOW) => dec!(ChannelFlow),
            (CLASS_CHANNEL, ch::FLOW_OK) => dec!(ChannelFlowOk),
            (CLASS_CHANNEL, ch::CLOSE) => dec!(ChannelClose),
            (CLASS_CHANNEL, ch::CLOSE_OK) => dec!(ChannelCloseOk),
            (CLASS_EXCHANGE, ex::DECLARE) => dec!(ExchangeDeclare),
            (CLASS_EXCHANGE, ex::DECLARE_OK) => dec!(ExchangeDeclareOk),
            (CLASS_EXCHANGE, ex::DELETE) => dec!(ExchangeDelete),
            (CLASS_EXCHANGE, ex::DELETE_OK) => dec!(ExchangeDeleteOk),
            (CLASS_QUEUE, q::DECLARE) => dec!(QueueDeclare),
            (CLASS_QUEUE, q::DECLARE_OK) => dec!(QueueDeclareOk),
            (CLASS_QUEUE, q::BIND) => dec!(QueueBind),
            (CLASS_QUEUE, q::BIND_OK) => dec!(QueueBindOk),
            (CLASS_QUEUE, q::UNBIND) => dec!(QueueUnbind),
            (CLASS_QUEUE, q::UNBIND_OK) => dec!(QueueUnbindOk),
            (CLASS_QUEUE, q::PURGE) => dec!(QueuePurge),
            (CLASS_QUEUE, q::PURGE_OK) => dec!(QueuePurgeOk),
            (CLASS_QUEUE, q::DELETE) => dec!(QueueDelete),
            (CLASS_QUEUE, q::DELETE_OK) => dec!(QueueDeleteOk),
            (CLASS_BASIC, b::QOS) => dec!(BasicQos),
            (CLASS_BASIC, b::QOS_OK) => dec!(BasicQosOk),
            (CLASS_BASIC, b::CONSUME) => dec!(BasicConsume),
            (CLASS_BASIC, b::CONSUME_OK) => dec!(BasicConsumeOk),
            (CLASS_BASIC, b::CANCEL) => dec!(BasicCancel),
            (CLASS_BASIC, b::CANCEL_OK) => dec!(BasicCancelOk),
            (CLASS_BASIC, b::PUBLISH) => dec!(BasicPublish),
            (CLASS_BASIC, b::RETURN) => dec!(BasicReturn),
            (CLASS_BASIC, b::DELIVER) => dec!(BasicDeliver),
            (CLASS_BASIC, b::GET) => dec!(BasicGet),
            (CLASS_BASIC, b::GET_OK) => dec!(BasicGetOk),
            (CLASS_BASIC, b::GET_EMPTY) => dec!(BasicGetEmpty),
            (CLASS_BASIC, b::ACK) => dec!(BasicAck),
            (CLASS_BASIC, b::REJECT) => dec!(BasicReject),
            (CLASS_BASIC, b::NACK) => dec!(BasicNack),
            (c, m) => return Err(Error::Protocol(format!("unknown method (class {c}, method {m})"))),
        })
    }
}

impl Serialize for Method {
    /// Forwards straight to the wrapped struct's own derived `Serialize`;
    /// the class/method id pair is written separately by `Frame`'s impl.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Method::ConnectionStart(v) => v.serialize(serializer),
            Method::ConnectionStartOk(v) => v.serialize(serializer),
            Method::ConnectionTune(v) => v.serialize(serializer),
            Method::ConnectionTuneOk(v) => v.serialize(serializer),
            Method::ConnectionOpen(v) => v.serialize(serializer),
            Method::ConnectionOpenOk(v) => v.serialize(serializer),
            Method::ConnectionClose(v) => v.serialize(serializer),
            Method::ConnectionCloseOk(v) => v.serialize(serializer),
            Method::ChannelOpen(v) => v.serialize(serializer),
            Method::ChannelOpenOk(v) => v.serialize(serializer),
            Method::ChannelFlow(v) => v.serialize(serializer),
            Method::ChannelFlowOk(v) => v.serialize(serializer),
            Method::ChannelClose(v) => v.serialize(serializer),
            Method::ChannelCloseOk(v) => v.serialize(serializer),
            Method::ExchangeDeclare(v) => v.serialize(serializer),
            Method::ExchangeDeclareOk(v) => v.serialize(serializer),
            Method::ExchangeDelete(v) => v.serialize(serializer),
            Method::ExchangeDeleteOk(v) => v.serialize(serializer),
            Method::QueueDeclare(v) => v.serialize(serializer),
            Method::QueueDeclareOk(v) => v.serialize(serializer),
            Method::QueueBind(v) => v.serialize(serializer),
            Method::QueueBindOk(v) => v.serialize(serializer),
            Method::QueueUnbind(v) => v.serialize(serializer),
            Method::QueueUnbindOk(v) => v.serialize(serializer),
            Method::QueuePurge(v) => v.serialize(serializer),
            Method::QueuePurgeOk(v) => v.serialize(serializer),
            Method::QueueDelete(v) => v.serialize(serializer),
            Method::QueueDeleteOk(v) => v.serialize(serializer),
            Method::BasicQos(v) => v.serialize(serializer),
            Method::BasicQosOk(v) => v.serialize(serializer),
            Method::BasicConsume(v) => v.serialize(serializer),
            Method::BasicConsumeOk(v) => v.serialize(serializer),
            Method::BasicCancel(v) => v.serialize(serializer),
            Method::BasicCancelOk(v) => v.serialize(serializer),
            Method::BasicPublish(v) => v.serialize(serializer),
            Method::BasicReturn(v) => v.serialize(serializer),
            Method::BasicDeliver(v) => v.serialize(serializer),
            Method::BasicGet(v) => v.serialize(serializer),
            Method::BasicGetOk(v) => v.serialize(serializer),
            Method::BasicGetEmpty(v) => v.serialize(serializer),
            Method::BasicAck(v) => v.serialize(serializer),
            Method::BasicReject(v) => v.serialize(serializer),
            Method::BasicNack(v) => v.serialize(serializer),
        }
    }
}

/// The variant of [`Method`] with no payload, used as the key the
/// synchroniser correlates awaits and notifications by. `Method` itself
/// can't be the key (it carries the decoded arguments), and its field data
/// isn't needed for correlation — only which method arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    ConnectionStart,
    ConnectionStartOk,
    ConnectionTune,
    ConnectionTuneOk,
    ConnectionOpen,
    ConnectionOpenOk,
    ConnectionClose,
    ConnectionCloseOk,
    ChannelOpen,
    ChannelOpenOk,
    ChannelFlow,
    ChannelFlowOk,
    ChannelClose,
    ChannelCloseOk,
    ExchangeDeclare,
    ExchangeDeclareOk,
    ExchangeDelete,
    ExchangeDeleteOk,
    QueueDeclare,
    QueueDeclareOk,
    QueueBind,
    QueueBindOk,
    QueueUnbind,
    QueueUnbindOk,
    QueuePurge,
    QueuePurgeOk,
    QueueDelete,
    QueueDeleteOk,
    BasicQos,
    BasicQosOk,
    BasicConsume,
    BasicConsumeOk,
    BasicCancel,
    BasicCancelOk,
    BasicPublish,
    BasicReturn,
    BasicDeliver,
    BasicGet,
    BasicGetOk,
    BasicGetEmpty,
    BasicAck,
    BasicReject,
    BasicNack,
}

impl From<&Method> for MethodKind {
    fn from(method: &Method) -> Self {
        match method {
            Method::ConnectionStart(_) => MethodKind::ConnectionStart,
            Method::ConnectionStartOk(_) => MethodKind::ConnectionStartOk,
            Method::ConnectionTune(_) => MethodKind::ConnectionTune,
            Method::ConnectionTuneOk(_) => MethodKind::ConnectionTuneOk,
            Method::ConnectionOpen(_) => MethodKind::ConnectionOpen,
            Method::ConnectionOpenOk(_) => MethodKind::ConnectionOpenOk,
            Method::ConnectionClose(_) => MethodKind::ConnectionClose,
            Method::ConnectionCloseOk(_) => MethodKind::ConnectionCloseOk,
            Method::ChannelOpen(_) => MethodKind::ChannelOpen,
            Method::ChannelOpenOk(_) => MethodKind::ChannelOpenOk,
            Method::ChannelFlow(_) => MethodKind::ChannelFlow,
            Method::ChannelFlowOk(_) => MethodKind::ChannelFlowOk,
            Method::ChannelClose(_) => MethodKind::ChannelClose,
            Method::ChannelCloseOk(_) => MethodKind::ChannelCloseOk,
            Method::ExchangeDeclare(_) => MethodKind::ExchangeDeclare,
            Method::ExchangeDeclareOk(_) => MethodKind::ExchangeDeclareOk,
            Method::ExchangeDelete(_) => MethodKind::ExchangeDelete,
            Method::ExchangeDeleteOk(_) => MethodKind::ExchangeDeleteOk,
            Method::QueueDeclare(_) => MethodKind::QueueDeclare,
            Method::QueueDeclareOk(_) => MethodKind::QueueDeclareOk,
            Method::QueueBind(_) => MethodKind::QueueBind,
            Method::QueueBindOk(_) => MethodKind::QueueBindOk,
            Method::QueueUnbind(_) => MethodKind::QueueUnbind,
            Method::QueueUnbindOk(_) => MethodKind::QueueUnbindOk,
            Method::QueuePurge(_) => MethodKind::QueuePurge,
            Method::QueuePurgeOk(_) => MethodKind::QueuePurgeOk,
            Method::QueueDelete(_) => MethodKind::QueueDelete,
            Method::QueueDeleteOk(_) => MethodKind::QueueDeleteOk,
            Method::BasicQos(_) => MethodKind::BasicQos,
            Method::BasicQosOk(_) => MethodKind::BasicQosOk,
            Method::BasicConsume(_) => MethodKind::BasicConsume,
            Method::BasicConsumeOk(_) => MethodKind::BasicConsumeOk,
            Method::BasicCancel(_) => MethodKind::BasicCancel,
            Method::BasicCancelOk(_) => MethodKind::BasicCancelOk,
            Method::BasicPublish(_) => MethodKind::BasicPublish,
            Method::BasicReturn(_) => MethodKind::BasicReturn,
            Method::BasicDeliver(_) => MethodKind::BasicDeliver,
            Method::BasicGet(_) => MethodKind::BasicGet,
            Method::BasicGetOk(_) => MethodKind::BasicGetOk,
            Method::BasicGetEmpty(_) => MethodKind::BasicGetEmpty,
            Method::BasicAck(_) => MethodKind::BasicAck,
            Method::BasicReject(_) => MethodKind::BasicReject,
            Method::BasicNack(_) => MethodKind::BasicNack,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (c, m) = self.class_method_id();
        write!(f, "{self:?} (class={c}, method={m})")
    }
}

/// One AMQP frame, without the channel id it travels on. Callers pair a
/// `Frame` with its `AmqpChannelId` externally — e.g. `(channel, frame)`
/// tuples on the queues between the socket tasks and the rest of the
/// client — matching how `Frame::decode` hands both back together.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Method(Method),
    ContentHeader(basic::ContentHeader),
    ContentBody(Vec<u8>),
    Heartbeat,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Method(m) => write!(f, "{m}"),
            Frame::ContentHeader(h) => write!(f, "ContentHeader(body_size={})", h.body_size()),
            Frame::ContentBody(b) => write!(f, "ContentBody({} bytes)", b.len()),
            Frame::Heartbeat => write!(f, "Heartbeat"),
        }
    }
}

impl Frame {
    pub fn get_frame_type(&self) -> AmqpFrameType {
        match self {
            Frame::Method(..) => FRAME_METHOD,
            Frame::ContentHeader(..) => FRAME_HEADER,
            Frame::ContentBody(..) => FRAME_BODY,
            Frame::Heartbeat => FRAME_HEARTBEAT,
        }
    }

    /// Attempt to decode one complete frame from the front of `buf`.
    /// Returns `Ok(None)` if `buf` holds an incomplete frame (the caller
    /// should read more bytes and retry); never consumes partial data.
    pub fn decode(buf: &[u8]) -> Result<Option<(usize, AmqpChannelId, Frame)>, Error> {
        const HEADER_LEN: usize = 7; // 1 (type) + 2 (channel) + 4 (length)
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let frame_type = buf[0];
        let channel = u16::from_be_bytes([buf[1], buf[2]]);
        let payload_size = u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]) as usize;
        let total_len = HEADER_LEN + payload_size + 1; // + frame-end octet
        if buf.len() < total_len {
            return Ok(None);
        }
        let payload = &buf[HEADER_LEN..HEADER_LEN + payload_size];
        let frame_end = buf[HEADER_LEN + payload_size];
        if frame_end != FRAME_END {
            return Err(Error::Protocol(format!(
                "expected frame-end octet {FRAME_END:#04x}, got {frame_end:#04x}"
            )));
        }

        let frame = match frame_type {
            FRAME_METHOD => {
                if payload.len() < 4 {
                    return Err(Error::Protocol("method frame payload shorter than class/method id".into()));
                }
                let class_id = u16::from_be_bytes([payload[0], payload[1]]);
                let method_id = u16::from_be_bytes([payload[2], payload[3]]);
                let method = Method::decode_args(class_id, method_id, &payload[4..])?;
                Frame::Method(method)
            }
            FRAME_HEADER => {
                let (header, _): (basic::ContentHeader, usize) = amqp_serde::from_bytes(payload)?;
                Frame::ContentHeader(header)
            }
            FRAME_BODY => Frame::ContentBody(payload.to_vec()),
            FRAME_HEARTBEAT => Frame::Heartbeat,
            other => return Err(Error::Protocol(format!("unknown frame type {other:#04x}"))),
        };

        Ok(Some((total_len, channel, frame)))
    }
}

impl Serialize for Frame {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Frame::Method(method) => {
                let (class_id, method_id) = method.class_method_id();
                let mut st = serializer.serialize_struct("Frame", 3)?;
                st.serialize_field("class_id", &class_id)?;
                st.serialize_field("method_id", &method_id)?;
                st.serialize_field("args", method)?;
                st.end()
            }
            Frame::ContentHeader(header) => header.serialize(serializer),
            Frame::ContentBody(body) => serialize_raw_bytes(serializer, body),
            Frame::Heartbeat => {
                let st = serializer.serialize_struct("Frame", 0)?;
                st.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    /// Mirrors `SplitConnection`'s own `write_frame`: header, serialized
    /// payload, frame-end octet, back to back.
    fn encode_frame(channel: AmqpChannelId, frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let header = FrameHeader { frame_type: frame.get_frame_type(), channel, payload_size: 0 };
        amqp_serde::to_buffer(&header, &mut buf).unwrap();
        let header_len = buf.len();
        let payload_size = amqp_serde::to_buffer(frame, &mut buf).unwrap();
        buf[3..7].copy_from_slice(&(payload_size as u32).to_be_bytes());
        amqp_serde::to_buffer(&FRAME_END, &mut buf).unwrap();
        let _ = header_len;
        buf.to_vec()
    }

    #[test]
    fn decode_handles_arbitrary_chunk_boundaries() {
        let original = Method::BasicAck(basic::Ack::new(42, false)).into_frame();
        let bytes = encode_frame(7, &original);

        // Every prefix shorter than the full frame must report "need more
        // data"; the full frame must decode to exactly the original value
        // and report having consumed every byte.
        for split in 0..bytes.len() {
            let prefix = &bytes[..split];
            assert_eq!(Frame::decode(prefix).unwrap(), None, "prefix of {split} bytes must not decode");
        }
        let (consumed, channel, decoded) = Frame::decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(channel, 7);
        assert_eq!(decoded, original);

        // Trailing garbage after one full frame must be left untouched.
        let mut with_trailer = bytes.clone();
        with_trailer.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        let (consumed, _, decoded) = Frame::decode(&with_trailer).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_bad_frame_end() {
        let original = Method::ChannelOpen(channel::Open::default()).into_frame();
        let mut bytes = encode_frame(1, &original);
        let last = bytes.len() - 1;
        bytes[last] = 0x00; // anything but FRAME_END

        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "expected a protocol error, got {err:?}");
    }

    #[test]
    fn decode_rejects_unknown_frame_type() {
        let original = Method::ChannelOpen(channel::Open::default()).into_frame();
        let mut bytes = encode_frame(1, &original);
        bytes[0] = 0x05; // not method/header/body/heartbeat

        let err = Frame::decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "expected a protocol error, got {err:?}");
    }
}
