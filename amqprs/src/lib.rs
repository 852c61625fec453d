//! An async AMQP 0-9-1 client for RabbitMQ, built directly on `tokio`.
//!
//! [`api::Connection::open`] drives the handshake and hands back a
//! connection whose actor task owns the socket; [`api::Channel`] is opened
//! from it and exposes the exchange/queue/basic operations. Everything
//! below `api` (`frame`, `net`) is crate-private wire machinery.

pub mod api;
pub mod error;
pub(crate) mod frame;
pub(crate) mod net;

pub use error::{Error, Result};

/// Sent as the `version` entry of `Connection.StartOk`'s client-properties
/// table. A real version rather than a guess at an upstream placeholder.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
