//! Consumer-facing types: the message a subscription hands back, the
//! push-mode callback trait, and the pull-mode queued consumer (spec §4.7).

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::channel::Channel;
use crate::error::{Error, Result};
use crate::frame::basic::BasicProperties;

/// One delivered message, whether it arrived via push consumer, queued
/// consumer, or `basic_get`. Carries a cheap handle back to its channel so
/// it can be acked/rejected without the caller having to keep one around
/// separately.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
    pub(crate) channel: Channel,
}

impl Delivery {
    pub async fn ack(&self, multiple: bool) -> Result<()> {
        self.channel.basic_ack(self.delivery_tag, multiple).await
    }

    pub async fn nack(&self, multiple: bool, requeue: bool) -> Result<()> {
        self.channel.basic_nack(self.delivery_tag, multiple, requeue).await
    }

    pub async fn reject(&self, requeue: bool) -> Result<()> {
        self.channel.basic_reject(self.delivery_tag, requeue).await
    }
}

/// A publish the broker could not route, bounced back by `basic.return`
/// (spec §7's `UndeliverableMessage`, surfaced here with its content so a
/// [`ChannelCallback`](super::callback::ChannelCallback) can inspect it).
#[derive(Debug, Clone)]
pub struct ReturnedMessage {
    pub reply_code: u16,
    pub reply_text: String,
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

/// Push-mode consumer: `consume` runs in the dedicated task `basic_consume`
/// spawns for this consumer, in arrival order. A panicking implementation
/// unwinds only that task, never the channel actor or another consumer's
/// task (spec §4.7) — but nothing acks, rejects, or requeues the delivery on
/// the application's behalf; that stays an explicit call on `Delivery`.
#[async_trait]
pub trait AsyncConsumer: Send {
    async fn consume(&mut self, delivery: Delivery);
}

/// What the channel actor pushes into a queued consumer's buffer, including
/// the terminal conditions `get`/`getmany` must surface.
#[derive(Debug)]
pub(crate) enum ConsumerMessage {
    Delivery(Delivery),
    Cancelled,
    ConnectionLost { drain_buffered: bool },
}

/// Pull-mode consumer (spec §4.7): an unbounded FIFO of deliveries backed by
/// `tokio::sync::mpsc`, so `get`/`getmany` suspension and `empty`'s
/// synchronous check map directly onto `recv`/`try_recv`.
pub struct QueuedConsumer {
    pub(crate) channel: Channel,
    pub(crate) consumer_tag: String,
    rx: mpsc::UnboundedReceiver<ConsumerMessage>,
    buffer: std::collections::VecDeque<Delivery>,
    terminal: Option<Error>,
}

impl QueuedConsumer {
    pub(crate) fn new(channel: Channel, consumer_tag: String, rx: mpsc::UnboundedReceiver<ConsumerMessage>) -> Self {
        Self { channel, consumer_tag, rx, buffer: std::collections::VecDeque::new(), terminal: None }
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Drains everything currently queued on the channel into `buffer`
    /// without suspending.
    fn drain_available(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.absorb(msg);
        }
    }

    fn absorb(&mut self, msg: ConsumerMessage) {
        match msg {
            ConsumerMessage::Delivery(d) => self.buffer.push_back(d),
            ConsumerMessage::Cancelled => {
                self.terminal.get_or_insert(Error::ConsumerCancelled);
            }
            ConsumerMessage::ConnectionLost { drain_buffered } => {
                if !drain_buffered {
                    self.buffer.clear();
                }
                self.terminal.get_or_insert(Error::ClientConnectionClosed);
            }
        }
    }

    /// Returns the next delivery, suspending if the buffer is empty until
    /// one arrives, the consumer is cancelled, or the connection is lost.
    pub async fn get(&mut self) -> Result<Delivery> {
        self.drain_available();
        loop {
            if let Some(d) = self.buffer.pop_front() {
                return Ok(d);
            }
            if let Some(err) = self.terminal_error() {
                return Err(err);
            }
            match self.rx.recv().await {
                Some(msg) => self.absorb(msg),
                None => {
                    self.terminal.get_or_insert(Error::ClientConnectionClosed);
                }
            }
        }
    }

    /// Returns the entire current buffer as an ordered sequence, suspending
    /// if empty with the same termination conditions as [`get`](Self::get).
    pub async fn getmany(&mut self) -> Result<Vec<Delivery>> {
        let first = self.get().await?;
        self.drain_available();
        let mut out = vec![first];
        out.extend(self.buffer.drain(..));
        Ok(out)
    }

    pub fn empty(&mut self) -> bool {
        self.drain_available();
        self.buffer.is_empty()
    }

    fn terminal_error(&self) -> Option<Error> {
        match &self.terminal {
            Some(Error::ConsumerCancelled) => Some(Error::ConsumerCancelled),
            Some(Error::ClientConnectionClosed) => Some(Error::ClientConnectionClosed),
            Some(_) | None => None,
        }
    }

    /// Transitions to `ClientCancelled`, sends `Basic.Cancel`, awaits
    /// `Basic.Cancel-Ok`. Buffered deliveries remain retrievable; once the
    /// buffer drains, further calls raise `ConsumerCancelled`.
    pub async fn cancel(mut self) -> Result<()> {
        self.channel.basic_cancel(&self.consumer_tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::channel::ChannelCommand;

    fn test_delivery(delivery_tag: u64, channel: &Channel) -> Delivery {
        Delivery {
            delivery_tag,
            redelivered: false,
            exchange: String::new(),
            routing_key: "rk".into(),
            properties: BasicProperties::default(),
            body: b"payload".to_vec(),
            channel: channel.clone(),
        }
    }

    /// A `Channel` handle whose command queue nothing ever drains — fine for
    /// these tests, which only exercise `QueuedConsumer`'s own buffering and
    /// never call a method that awaits a reply from the (nonexistent) actor.
    fn dummy_channel() -> Channel {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel::<ChannelCommand>();
        Channel { channel_id: 1, cmd_tx, frame_max: 131072 }
    }

    fn queued_consumer() -> (QueuedConsumer, mpsc::UnboundedSender<ConsumerMessage>) {
        let channel = dummy_channel();
        let (tx, rx) = mpsc::unbounded_channel();
        (QueuedConsumer::new(channel, "ctag".into(), rx), tx)
    }

    #[tokio::test]
    async fn get_returns_deliveries_in_order_before_surfacing_a_terminal_error() {
        let (mut consumer, tx) = queued_consumer();
        let channel = consumer.channel.clone();
        tx.send(ConsumerMessage::Delivery(test_delivery(1, &channel))).unwrap();
        tx.send(ConsumerMessage::Delivery(test_delivery(2, &channel))).unwrap();
        tx.send(ConsumerMessage::Cancelled).unwrap();

        assert_eq!(consumer.get().await.unwrap().delivery_tag, 1);
        assert_eq!(consumer.get().await.unwrap().delivery_tag, 2);
        assert!(matches!(consumer.get().await, Err(Error::ConsumerCancelled)));
        // The terminal condition is sticky: further calls keep raising it.
        assert!(matches!(consumer.get().await, Err(Error::ConsumerCancelled)));
    }

    /// Server-initiated `basic.cancel` (spec §4.7): once the buffer empties,
    /// `get`/`empty` must surface `ConsumerCancelled` instead of hanging.
    #[tokio::test]
    async fn cancelled_with_empty_buffer_surfaces_immediately() {
        let (mut consumer, tx) = queued_consumer();
        tx.send(ConsumerMessage::Cancelled).unwrap();

        assert!(matches!(consumer.get().await, Err(Error::ConsumerCancelled)));
        assert!(consumer.empty());
    }

    #[tokio::test]
    async fn connection_lost_with_drain_buffered_keeps_already_queued_deliveries() {
        let (mut consumer, tx) = queued_consumer();
        let channel = consumer.channel.clone();
        tx.send(ConsumerMessage::Delivery(test_delivery(1, &channel))).unwrap();
        tx.send(ConsumerMessage::Delivery(test_delivery(2, &channel))).unwrap();
        tx.send(ConsumerMessage::ConnectionLost { drain_buffered: true }).unwrap();

        let drained = consumer.getmany().await.unwrap();
        assert_eq!(drained.iter().map(|d| d.delivery_tag).collect::<Vec<_>>(), vec![1, 2]);
        assert!(matches!(consumer.get().await, Err(Error::ClientConnectionClosed)));
    }

    #[tokio::test]
    async fn connection_lost_without_drain_buffered_discards_queued_deliveries() {
        let (mut consumer, tx) = queued_consumer();
        let channel = consumer.channel.clone();
        tx.send(ConsumerMessage::Delivery(test_delivery(1, &channel))).unwrap();
        tx.send(ConsumerMessage::ConnectionLost { drain_buffered: false }).unwrap();

        assert!(matches!(consumer.get().await, Err(Error::ClientConnectionClosed)));
        assert!(consumer.empty());
    }
}
