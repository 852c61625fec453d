//! Everything that owns or talks to the TCP transport: the split
//! reader/writer halves, the connection-level protocol engine (handshake +
//! read/write tasks + heartbeat), the per-channel frame router, and the
//! synchroniser that correlates outbound requests with inbound replies.

mod channel_manager;
mod connection_manager;
mod heartbeat;
mod split_connection;
mod synchroniser;

pub(crate) use channel_manager::{ChannelManager, Incoming};
pub(crate) use connection_manager::{connect, ConnectionCommand, ConnectionHandle, OpenedChannel};
pub(crate) use heartbeat::HeartbeatMonitor;
pub(crate) use split_connection::SplitConnection;
pub(crate) use synchroniser::{Completion, Synchroniser};

pub(crate) use crate::error::Error;
