//! Crate-wide error type. Every fallible operation in `amqprs` returns
//! [`Result<T>`], and every variant here is something a caller can usefully
//! branch on: codec failures, protocol violations, server-initiated closes,
//! and the named AMQP reply codes a broker sends back on a channel/connection
//! `Close`.

use std::sync::Arc;

use thiserror::Error;

use crate::frame::constants::REPLY_CODES;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("wire codec error: {0}")]
    Codec(#[from] amqp_serde::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("connection closed by server ({reply_code}): {reply_text}")]
    ServerClosedConnection { reply_code: u16, reply_text: String },

    #[error("channel {channel_id} closed by server ({reply_code}): {reply_text}")]
    ServerClosedChannel { channel_id: u16, reply_code: u16, reply_text: String },

    #[error("connection is already closed")]
    ClientConnectionClosed,

    #[error("channel is already closed")]
    ClientChannelClosed,

    #[error("connection lost: {cause}")]
    ConnectionLostError { cause: String },

    #[error("message published with mandatory/immediate flag was returned undeliverable: {reply_text}")]
    UndeliverableMessage { reply_code: u16, reply_text: String },

    #[error("queue or exchange was deleted")]
    Deleted,

    #[error("consumer was cancelled")]
    ConsumerCancelled,

    // The channel/connection-level reply codes a broker can send back in a
    // `Close` method, named after `frame::constants::REPLY_CODES`.
    #[error("CONTENT_TOO_LARGE: {0}")]
    ContentTooLarge(String),
    #[error("NO_ROUTE: {0}")]
    NoRoute(String),
    #[error("NO_CONSUMERS: {0}")]
    NoConsumers(String),
    #[error("CONNECTION_FORCED: {0}")]
    ConnectionForced(String),
    #[error("INVALID_PATH: {0}")]
    InvalidPath(String),
    #[error("ACCESS_REFUSED: {0}")]
    AccessRefused(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("RESOURCE_LOCKED: {0}")]
    ResourceLocked(String),
    #[error("PRECONDITION_FAILED: {0}")]
    PreconditionFailed(String),
    #[error("FRAME_ERROR: {0}")]
    FrameError(String),
    #[error("SYNTAX_ERROR: {0}")]
    SyntaxError(String),
    #[error("COMMAND_INVALID: {0}")]
    CommandInvalid(String),
    #[error("CHANNEL_ERROR: {0}")]
    ChannelError(String),
    #[error("UNEXPECTED_FRAME: {0}")]
    UnexpectedFrame(String),
    #[error("RESOURCE_ERROR: {0}")]
    ResourceError(String),
    #[error("NOT_ALLOWED: {0}")]
    NotAllowed(String),
    #[error("NOT_IMPLEMENTED: {0}")]
    NotImplemented(String),
    #[error("INTERNAL_ERROR: {0}")]
    InternalError(String),

    #[error("server reply {reply_code}: {reply_text}")]
    ServerReply { reply_code: u16, reply_text: String },

    // A connection- or channel-level failure that has already been recorded
    // by a `Synchroniser` and is being handed out to every waiter it fans
    // out to. Wrapped in `Arc` since the same failure resolves an unbounded
    // number of pending and future awaits.
    #[error("{0}")]
    Sticky(Arc<Error>),
}

impl Error {
    /// Turn a `(reply_code, reply_text)` pair off a `connection.close` or
    /// `channel.close` method into the matching named variant, falling back
    /// to the catch-all [`Error::ServerReply`] for codes this crate does not
    /// enumerate in [`REPLY_CODES`].
    pub fn from_reply(reply_code: u16, reply_text: impl Into<String>) -> Self {
        let reply_text = reply_text.into();
        let name = REPLY_CODES.iter().find(|(code, _)| *code == reply_code).map(|(_, name)| *name);
        match name {
            Some("CONTENT_TOO_LARGE") => Error::ContentTooLarge(reply_text),
            Some("NO_ROUTE") => Error::NoRoute(reply_text),
            Some("NO_CONSUMERS") => Error::NoConsumers(reply_text),
            Some("CONNECTION_FORCED") => Error::ConnectionForced(reply_text),
            Some("INVALID_PATH") => Error::InvalidPath(reply_text),
            Some("ACCESS_REFUSED") => Error::AccessRefused(reply_text),
            Some("NOT_FOUND") => Error::NotFound(reply_text),
            Some("RESOURCE_LOCKED") => Error::ResourceLocked(reply_text),
            Some("PRECONDITION_FAILED") => Error::PreconditionFailed(reply_text),
            Some("FRAME_ERROR") => Error::FrameError(reply_text),
            Some("SYNTAX_ERROR") => Error::SyntaxError(reply_text),
            Some("COMMAND_INVALID") => Error::CommandInvalid(reply_text),
            Some("CHANNEL_ERROR") => Error::ChannelError(reply_text),
            Some("UNEXPECTED_FRAME") => Error::UnexpectedFrame(reply_text),
            Some("RESOURCE_ERROR") => Error::ResourceError(reply_text),
            Some("NOT_ALLOWED") => Error::NotAllowed(reply_text),
            Some("NOT_IMPLEMENTED") => Error::NotImplemented(reply_text),
            Some("INTERNAL_ERROR") => Error::InternalError(reply_text),
            _ => Error::ServerReply { reply_code, reply_text },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_code_maps_to_named_variant() {
        assert!(matches!(Error::from_reply(404, "no queue"), Error::NotFound(_)));
        assert!(matches!(Error::from_reply(403, "denied"), Error::AccessRefused(_)));
    }

    #[test]
    fn unknown_reply_code_falls_back_to_server_reply() {
        assert!(matches!(Error::from_reply(999, "?"), Error::ServerReply { reply_code: 999, .. }));
    }
}
