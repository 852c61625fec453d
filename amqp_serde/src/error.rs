use std::fmt;

/// Failure while encoding or decoding an AMQP 0-9-1 wire value.
///
/// Every variant keeps enough context (byte offset where relevant, the tag
/// or length that was read) for the `amqprs` crate to classify the failure
/// as a codec error vs. a protocol error, per the connection's error
/// taxonomy.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unexpected end of buffer, needed {needed} more byte(s)")]
    Eof { needed: usize },

    #[error("field table length {declared} exceeds remaining buffer of {available} byte(s)")]
    TableLengthOverrun { declared: usize, available: usize },

    #[error("unknown field-table value tag {0:#04x}")]
    UnknownFieldValueTag(u8),

    #[error("long-string length {declared} exceeds remaining buffer of {available} byte(s)")]
    StringLengthOverrun { declared: usize, available: usize },

    #[error("short-string of {0} bytes exceeds the 255-byte wire limit")]
    ShortStringTooLong(usize),

    #[error("invalid utf-8 in short/long string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("unsupported serde operation for the AMQP wire format: {0}")]
    Unsupported(&'static str),

    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
