//! Public surface: everything an application using this crate touches
//! directly. Everything below `api` (`frame`, `net`) is wire machinery the
//! types here wrap.

mod callback;
mod channel;
mod connection;
mod consumer;

pub use callback::{ChannelCallback, ConnectionCallback};
pub use channel::Channel;
pub use connection::{Connection, OpenConnectionArguments};
pub use consumer::{AsyncConsumer, Delivery, QueuedConsumer, ReturnedMessage};
