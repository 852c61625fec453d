//! Frame Router: demultiplexes inbound frames by channel id to whichever
//! actor registered that channel, and fans out the poison-pill on transport
//! loss to every registered actor at once.

use std::collections::HashMap;
use std::sync::Arc;

use amqp_serde::types::AmqpChannelId;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::frame::Frame;

/// What a registered actor receives: either a frame addressed to its
/// channel, or the synthetic poison-pill fanned out to everyone on
/// transport loss.
#[derive(Debug, Clone)]
pub(crate) enum Incoming {
    Frame(Frame),
    PoisonPill(Arc<Error>),
}

#[derive(Default)]
pub(crate) struct ChannelManager {
    handlers: HashMap<AmqpChannelId, mpsc::UnboundedSender<Incoming>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `channel_id` as a handler and returns the receiving end.
    /// Re-registering an id (e.g. after it is released and reused) silently
    /// replaces the previous handler.
    pub fn register(&mut self, channel_id: AmqpChannelId) -> mpsc::UnboundedReceiver<Incoming> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.handlers.insert(channel_id, tx);
        rx
    }

    pub fn deregister(&mut self, channel_id: AmqpChannelId) {
        self.handlers.remove(&channel_id);
    }

    pub fn is_registered(&self, channel_id: AmqpChannelId) -> bool {
        self.handlers.contains_key(&channel_id)
    }

    /// Routes `frame` to `channel_id`'s handler. An unknown channel id is a
    /// protocol error: the caller should close the connection.
    pub fn dispatch(&self, channel_id: AmqpChannelId, frame: Frame) -> Result<(), Error> {
        match self.handlers.get(&channel_id) {
            Some(tx) => {
                let _ = tx.send(Incoming::Frame(frame));
                Ok(())
            }
            None => Err(Error::Protocol(format!("frame received on unregistered channel {channel_id}"))),
        }
    }

    /// Fans the poison-pill out to every registered handler, channel 0
    /// included, and drops every handler afterwards — nothing more will
    /// ever be routed once the transport is gone.
    pub fn dispatch_all(&mut self, cause: Arc<Error>) {
        for (_, tx) in self.handlers.drain() {
            let _ = tx.send(Incoming::PoisonPill(cause.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[tokio::test]
    async fn dispatch_routes_to_the_registered_channel_only() {
        let mut router = ChannelManager::new();
        let mut rx0 = router.register(0);
        let mut rx1 = router.register(1);

        router.dispatch(1, Frame::Heartbeat).unwrap();
        assert!(matches!(rx1.recv().await.unwrap(), Incoming::Frame(Frame::Heartbeat)));
        assert!(rx0.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_to_unknown_channel_is_a_protocol_error() {
        let router = ChannelManager::new();
        let err = router.dispatch(7, Frame::Heartbeat).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn dispatch_all_reaches_every_handler_including_channel_zero() {
        let mut router = ChannelManager::new();
        let mut rx0 = router.register(0);
        let mut rx1 = router.register(1);

        router.dispatch_all(Arc::new(Error::ClientConnectionClosed));

        assert!(matches!(rx0.recv().await.unwrap(), Incoming::PoisonPill(_)));
        assert!(matches!(rx1.recv().await.unwrap(), Incoming::PoisonPill(_)));
    }
}
