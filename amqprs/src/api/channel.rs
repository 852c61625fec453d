//! Channel actor (spec §4.6): per-channel request/reply plumbing, the
//! message assembler for inbound content, and the consumer table.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use amqp_serde::types::{AmqpChannelId, FieldTable};
use tokio::sync::{mpsc, oneshot};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use super::callback::ChannelCallback;
use super::consumer::{AsyncConsumer, ConsumerMessage, Delivery, QueuedConsumer, ReturnedMessage};
use crate::error::{Error, Result};
use crate::frame::basic::{BasicProperties, ContentHeader};
use crate::frame::{basic, channel as chan, exchange, queue, Frame, Method, MethodKind};
use crate::net::{Completion, ConnectionCommand, Incoming, Synchroniser};

/// Per-frame overhead outside the payload: 1-byte type + 2-byte channel +
/// 4-byte length header, plus the 1-byte `FRAME_END` trailer (spec §4.6/§9).
const CONTENT_FRAME_OVERHEAD: usize = 8;

/// Requests a [`Channel`] handle sends to its own actor task.
pub(crate) enum ChannelCommand {
    Send(Frame),
    Register { accepts: Vec<MethodKind>, reply: oneshot::Sender<Completion> },
    RegisterConsumer { tag: String, no_ack: bool, tx: mpsc::UnboundedSender<ConsumerMessage> },
    DeregisterConsumer { tag: String },
    Get { reply: oneshot::Sender<Result<Option<Delivery>>> },
    SetCallback(Arc<dyn ChannelCallback>),
    Close { reply: oneshot::Sender<Result<()>> },
}

#[derive(Clone)]
pub struct Channel {
    pub(crate) channel_id: AmqpChannelId,
    pub(crate) cmd_tx: mpsc::UnboundedSender<ChannelCommand>,
    pub(crate) frame_max: u32,
}

impl Channel {
    pub fn channel_id(&self) -> AmqpChannelId {
        self.channel_id
    }

    async fn call(&self, accepts: Vec<MethodKind>, frame: Frame) -> Result<Method> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(ChannelCommand::Register { accepts, reply: tx }).map_err(|_| Error::ClientChannelClosed)?;
        let completion = rx.await.map_err(|_| Error::ClientChannelClosed)?;
        self.cmd_tx.send(ChannelCommand::Send(frame)).map_err(|_| Error::ClientChannelClosed)?;
        completion.await.map_err(|_| Error::ClientChannelClosed)?
    }

    fn cast(&self, frame: Frame) -> Result<()> {
        self.cmd_tx.send(ChannelCommand::Send(frame)).map_err(|_| Error::ClientChannelClosed)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn declare_exchange(
        &self,
        exchange: &str,
        exchange_type: &str,
        passive: bool,
        durable: bool,
        auto_delete: bool,
        internal: bool,
        arguments: FieldTable,
    ) -> Result<()> {
        let method = exchange::Declare::new(
            exchange.try_into()?,
            exchange_type.try_into()?,
            passive,
            durable,
            auto_delete,
            internal,
            false,
            arguments,
        );
        self.call(vec![MethodKind::ExchangeDeclareOk], Method::ExchangeDeclare(method).into_frame()).await?;
        Ok(())
    }

    pub async fn delete_exchange(&self, exchange: &str, if_unused: bool) -> Result<()> {
        let method = exchange::Delete::new(exchange.try_into()?, if_unused, false);
        self.call(vec![MethodKind::ExchangeDeleteOk], Method::ExchangeDelete(method).into_frame()).await?;
        Ok(())
    }

    /// Returns `(queue_name, message_count, consumer_count)`, the name
    /// mattering when `queue` is empty and the broker assigns one.
    #[allow(clippy::too_many_arguments)]
    pub async fn declare_queue(
        &self,
        queue: &str,
        passive: bool,
        durable: bool,
        exclusive: bool,
        auto_delete: bool,
        arguments: FieldTable,
    ) -> Result<(String, u32, u32)> {
        let method = queue::Declare::new(queue.try_into()?, passive, durable, exclusive, auto_delete, false, arguments);
        let reply = self.call(vec![MethodKind::QueueDeclareOk], Method::QueueDeclare(method).into_frame()).await?;
        let Method::QueueDeclareOk(ok) = reply else { unreachable!("await_methods guarantees the matched kind") };
        Ok((ok.queue().as_str().to_owned(), ok.message_count(), ok.consumer_count()))
    }

    pub async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str, arguments: FieldTable) -> Result<()> {
        let method = queue::Bind::new(queue.try_into()?, exchange.try_into()?, routing_key.try_into()?, false, arguments);
        self.call(vec![MethodKind::QueueBindOk], Method::QueueBind(method).into_frame()).await?;
        Ok(())
    }

    pub async fn unbind_queue(&self, queue: &str, exchange: &str, routing_key: &str, arguments: FieldTable) -> Result<()> {
        let method = queue::Unbind::new(queue.try_into()?, exchange.try_into()?, routing_key.try_into()?, arguments);
        self.call(vec![MethodKind::QueueUnbindOk], Method::QueueUnbind(method).into_frame()).await?;
        Ok(())
    }

    pub async fn purge_queue(&self, queue: &str) -> Result<u32> {
        let method = queue::Purge::new(queue.try_into()?, false);
        let reply = self.call(vec![MethodKind::QueuePurgeOk], Method::QueuePurge(method).into_frame()).await?;
        let Method::QueuePurgeOk(ok) = reply else { unreachable!() };
        Ok(ok.message_count())
    }

    pub async fn delete_queue(&self, queue: &str, if_unused: bool, if_empty: bool) -> Result<u32> {
        let method = queue::Delete::new(queue.try_into()?, if_unused, if_empty, false);
        let reply = self.call(vec![MethodKind::QueueDeleteOk], Method::QueueDelete(method).into_frame()).await?;
        let Method::QueueDeleteOk(ok) = reply else { unreachable!() };
        Ok(ok.message_count())
    }

    pub async fn basic_qos(&self, prefetch_count: u16, global: bool) -> Result<()> {
        let method = basic::Qos::new(0, prefetch_count, global);
        self.call(vec![MethodKind::BasicQosOk], Method::BasicQos(method).into_frame()).await?;
        Ok(())
    }

    /// Publishes `body` with `properties` to `exchange`/`routing_key`,
    /// emitting Publish + ContentHeader + the body's ContentBody chunks
    /// contiguously so they cannot interleave with another publish on this
    /// channel (spec §5's ordering guarantee).
    pub fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        mandatory: bool,
        immediate: bool,
        properties: BasicProperties,
        body: Vec<u8>,
    ) -> Result<()> {
        let publish = basic::Publish::new(exchange.try_into()?, routing_key.try_into()?, mandatory, immediate);
        self.cast(Method::BasicPublish(publish).into_frame())?;
        self.cast(Frame::ContentHeader(ContentHeader::new(body.len() as u64, properties)))?;
        if body.is_empty() {
            return self.cast(Frame::ContentBody(body));
        }
        // frame_max == 0 means the peer places no limit (spec §9); anything
        // else bounds the payload to frame_max minus the frame's own overhead.
        let max_chunk = if self.frame_max == 0 { body.len() } else { (self.frame_max as usize).saturating_sub(CONTENT_FRAME_OVERHEAD).max(1) };
        for chunk in body.chunks(max_chunk) {
            self.cast(Frame::ContentBody(chunk.to_vec()))?;
        }
        Ok(())
    }

    /// Sends `Basic.Get`, awaiting either `Basic.Get-Ok` (followed by
    /// content frames the message assembler collects) or `Basic.Get-Empty`.
    pub async fn basic_get(&self, queue: &str, no_ack: bool) -> Result<Option<Delivery>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(ChannelCommand::Get { reply: tx }).map_err(|_| Error::ClientChannelClosed)?;
        let method = basic::Get::new(queue.try_into()?, no_ack);
        self.cast(Method::BasicGet(method).into_frame())?;
        rx.await.map_err(|_| Error::ClientChannelClosed)?
    }

    /// Registers a push-mode consumer: every delivery invokes `consumer.consume`
    /// synchronously in the channel actor's task, in arrival order.
    pub async fn basic_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        no_local: bool,
        no_ack: bool,
        exclusive: bool,
        mut consumer: Box<dyn AsyncConsumer>,
        arguments: FieldTable,
    ) -> Result<String> {
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ConsumerMessage>();
        let tag = self.start_consume(queue, consumer_tag, no_local, no_ack, exclusive, msg_tx, arguments).await?;
        tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                match msg {
                    ConsumerMessage::Delivery(d) => consumer.consume(d).await,
                    ConsumerMessage::Cancelled | ConsumerMessage::ConnectionLost { .. } => break,
                }
            }
        });
        Ok(tag)
    }

    /// Registers a pull-mode consumer backed by an unbounded buffer (spec §4.7).
    pub async fn basic_consume_queued(
        &self,
        queue: &str,
        consumer_tag: &str,
        no_local: bool,
        no_ack: bool,
        exclusive: bool,
        arguments: FieldTable,
    ) -> Result<QueuedConsumer> {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel::<ConsumerMessage>();
        let tag = self.start_consume(queue, consumer_tag, no_local, no_ack, exclusive, msg_tx, arguments).await?;
        Ok(QueuedConsumer::new(self.clone(), tag, msg_rx))
    }

    #[allow(clippy::too_many_arguments)]
    async fn start_consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        no_local: bool,
        no_ack: bool,
        exclusive: bool,
        msg_tx: mpsc::UnboundedSender<ConsumerMessage>,
        arguments: FieldTable,
    ) -> Result<String> {
        let method = basic::Consume::new(queue.try_into()?, consumer_tag.try_into()?, no_local, no_ack, exclusive, false, arguments);
        let reply = self.call(vec![MethodKind::BasicConsumeOk], Method::BasicConsume(method).into_frame()).await?;
        let Method::BasicConsumeOk(ok) = reply else { unreachable!() };
        let tag = ok.consumer_tag().as_str().to_owned();
        self.cmd_tx
            .send(ChannelCommand::RegisterConsumer { tag: tag.clone(), no_ack, tx: msg_tx })
            .map_err(|_| Error::ClientChannelClosed)?;
        Ok(tag)
    }

    /// Transitions the consumer to `ClientCancelled`, sends `Basic.Cancel`,
    /// awaits `Basic.Cancel-Ok`.
    pub async fn basic_cancel(&self, consumer_tag: &str) -> Result<()> {
        let method = basic::Cancel::new(consumer_tag.try_into()?, false);
        self.call(vec![MethodKind::BasicCancelOk], Method::BasicCancel(method).into_frame()).await?;
        let _ = self.cmd_tx.send(ChannelCommand::DeregisterConsumer { tag: consumer_tag.to_owned() });
        Ok(())
    }

    pub async fn basic_ack(&self, delivery_tag: u64, multiple: bool) -> Result<()> {
        self.cast(Method::BasicAck(basic::Ack::new(delivery_tag, multiple)).into_frame())
    }

    pub async fn basic_nack(&self, delivery_tag: u64, multiple: bool, requeue: bool) -> Result<()> {
        self.cast(Method::BasicNack(basic::Nack::new(delivery_tag, multiple, requeue)).into_frame())
    }

    pub async fn basic_reject(&self, delivery_tag: u64, requeue: bool) -> Result<()> {
        self.cast(Method::BasicReject(basic::Reject::new(delivery_tag, requeue)).into_frame())
    }

    /// Registers the callback invoked for `basic.return` and server-initiated
    /// `basic.cancel`/`channel.close` (ADDED, teacher pattern).
    pub fn register_callback(&self, callback: impl ChannelCallback + 'static) -> Result<()> {
        self.cmd_tx.send(ChannelCommand::SetCallback(Arc::new(callback))).map_err(|_| Error::ClientChannelClosed)
    }

    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(ChannelCommand::Close { reply: tx }).map_err(|_| Error::ClientChannelClosed)?;
        rx.await.map_err(|_| Error::ClientChannelClosed)?
    }
}

/// What the message assembler is waiting on content frames for.
enum PendingContent {
    Deliver { consumer_tag: String, delivery_tag: u64, redelivered: bool, exchange: String, routing_key: String },
    Get { delivery_tag: u64, redelivered: bool, exchange: String, routing_key: String },
    Return { reply_code: u16, reply_text: String, exchange: String, routing_key: String },
}

/// A [`Delivery`] minus the `Channel` handle, which only `Running` (holding
/// its own handle) can stamp on.
struct RawDelivery {
    delivery_tag: u64,
    redelivered: bool,
    exchange: String,
    routing_key: String,
    properties: BasicProperties,
    body: Vec<u8>,
}

impl RawDelivery {
    fn into_delivery(self, channel: Channel) -> Delivery {
        Delivery {
            delivery_tag: self.delivery_tag,
            redelivered: self.redelivered,
            exchange: self.exchange,
            routing_key: self.routing_key,
            properties: self.properties,
            body: self.body,
            channel,
        }
    }
}

#[derive(Default)]
struct Assembler {
    pending: Option<(PendingContent, Option<ContentHeader>, Vec<u8>)>,
}

enum Assembled {
    Delivery { consumer_tag: String, raw: RawDelivery },
    Get(RawDelivery),
    Return { returned: ReturnedMessage },
}

impl Assembler {
    fn start(&mut self, pending: PendingContent) {
        self.pending = Some((pending, None, Vec::new()));
    }

    fn header(&mut self, header: ContentHeader) -> Result<Option<Assembled>> {
        let Some((_, header_slot, body)) = &mut self.pending else {
            return Err(Error::Protocol("content header with no pending has-content method".into()));
        };
        let body_size = header.body_size();
        *header_slot = Some(header);
        if body_size == 0 {
            return Ok(Some(self.finish()));
        }
        let _ = body;
        Ok(None)
    }

    fn body(&mut self, chunk: Vec<u8>) -> Result<Option<Assembled>> {
        let Some((_, header, body)) = &mut self.pending else {
            return Err(Error::Protocol("content body with no pending has-content method".into()));
        };
        body.extend_from_slice(&chunk);
        let Some(header) = header else {
            return Err(Error::Protocol("content body arrived before its header".into()));
        };
        if body.len() as u64 >= header.body_size() {
            return Ok(Some(self.finish()));
        }
        Ok(None)
    }

    fn finish(&mut self) -> Assembled {
        let (pending, header, body) = self.pending.take().expect("finish only called with a pending assembly");
        let properties = header.map(|h| h.properties().clone()).unwrap_or_default();
        match pending {
            PendingContent::Deliver { consumer_tag, delivery_tag, redelivered, exchange, routing_key } => Assembled::Delivery {
                consumer_tag,
                raw: RawDelivery { delivery_tag, redelivered, exchange, routing_key, properties, body },
            },
            PendingContent::Get { delivery_tag, redelivered, exchange, routing_key } => {
                Assembled::Get(RawDelivery { delivery_tag, redelivered, exchange, routing_key, properties, body })
            }
            PendingContent::Return { reply_code, reply_text, exchange, routing_key } => {
                Assembled::Return { returned: ReturnedMessage { reply_code, reply_text, exchange, routing_key, properties, body } }
            }
        }
    }
}

struct Running {
    channel_id: AmqpChannelId,
    handle: Channel,
    conn_cmd_tx: mpsc::UnboundedSender<ConnectionCommand>,
    sync: Synchroniser,
    consumers: HashMap<String, (bool, mpsc::UnboundedSender<ConsumerMessage>)>,
    pending_gets: VecDeque<oneshot::Sender<Result<Option<Delivery>>>>,
    assembler: Assembler,
    callback: Option<Arc<dyn ChannelCallback>>,
    closing: bool,
    pending_close: Option<oneshot::Sender<Result<()>>>,
}

/// Spawns the actor task for a freshly opened channel, sends `Channel.Open`,
/// and waits for `Channel.Open-Ok` before returning the public handle.
pub(crate) async fn open(
    channel_id: AmqpChannelId,
    incoming: mpsc::UnboundedReceiver<Incoming>,
    conn_cmd_tx: mpsc::UnboundedSender<ConnectionCommand>,
    frame_max: u32,
) -> Result<Channel> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let handle = Channel { channel_id, cmd_tx: cmd_tx.clone(), frame_max };

    let running = Running {
        channel_id,
        handle: handle.clone(),
        conn_cmd_tx,
        sync: Synchroniser::new(),
        consumers: HashMap::new(),
        pending_gets: VecDeque::new(),
        assembler: Assembler::default(),
        callback: None,
        closing: false,
        pending_close: None,
    };
    tokio::spawn(run_actor(running, incoming, cmd_rx));

    // Register the waiter before sending Channel.Open: both travel through
    // the same `cmd_tx` queue, so registering first guarantees the waiter
    // exists by the time Open-Ok could possibly come back.
    let (tx, rx) = oneshot::channel();
    handle.cmd_tx.send(ChannelCommand::Register { accepts: vec![MethodKind::ChannelOpenOk], reply: tx }).map_err(|_| Error::ClientChannelClosed)?;
    let completion = rx.await.map_err(|_| Error::ClientChannelClosed)?;
    let open_method = Method::ChannelOpen(chan::Open::default());
    handle.cast(open_method.into_frame())?;
    completion.await.map_err(|_| Error::ClientChannelClosed)??;
    Ok(handle)
}

async fn run_actor(mut st: Running, mut incoming: mpsc::UnboundedReceiver<Incoming>, mut cmd_rx: mpsc::UnboundedReceiver<ChannelCommand>) {
    loop {
        tokio::select! {
            Some(msg) = incoming.recv() => {
                match msg {
                    Incoming::Frame(frame) => st.handle_frame(frame).await,
                    Incoming::PoisonPill(cause) => { st.handle_poison_pill(cause).await; break; }
                }
            }
            Some(cmd) = cmd_rx.recv() => st.handle_command(cmd).await,
            else => break,
        }
        if st.closing && st.sync.is_killed() {
            break;
        }
    }
    #[cfg(feature = "tracing")]
    debug!("channel {} actor exiting", st.channel_id);
}

impl Running {
    async fn handle_command(&mut self, cmd: ChannelCommand) {
        match cmd {
            ChannelCommand::Send(frame) => {
                let _ = self.conn_cmd_tx.send(ConnectionCommand::Send { channel: self.channel_id, frame });
            }
            ChannelCommand::Register { accepts, reply } => {
                let _ = reply.send(self.sync.await_methods(accepts));
            }
            ChannelCommand::RegisterConsumer { tag, no_ack, tx } => {
                self.consumers.insert(tag, (no_ack, tx));
            }
            ChannelCommand::DeregisterConsumer { tag } => {
                self.consumers.remove(&tag);
            }
            ChannelCommand::Get { reply } => self.pending_gets.push_back(reply),
            ChannelCommand::SetCallback(cb) => self.callback = Some(cb),
            ChannelCommand::Close { reply } => self.initiate_close(reply).await,
        }
    }

    async fn initiate_close(&mut self, reply: oneshot::Sender<Result<()>>) {
        if self.closing || self.sync.is_killed() {
            let _ = reply.send(Ok(()));
            return;
        }
        self.closing = true;
        let close = chan::Close::new(0, "Channel closed by application".try_into().unwrap_or_default(), 0, 0);
        let _ = self.conn_cmd_tx.send(ConnectionCommand::Send { channel: self.channel_id, frame: Method::ChannelClose(close).into_frame() });
        self.pending_close = Some(reply);
    }

    async fn handle_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Method(Method::ChannelClose(close)) => {
                let _ = self
                    .conn_cmd_tx
                    .send(ConnectionCommand::Send { channel: self.channel_id, frame: Method::ChannelCloseOk(Default::default()).into_frame() });
                self.closing = true;
                let reply_code = close.reply_code();
                let reply_text = close.reply_text().as_str().to_owned();
                if let Some(cb) = self.callback.clone() {
                    cb.close(reply_code, &reply_text).await;
                }
                let exc = Error::ServerClosedChannel { channel_id: self.channel_id, reply_code, reply_text };
                self.kill(exc);
                // A client-initiated close already in flight races this
                // frame rather than failing it: the channel is closed either
                // way.
                if let Some(reply) = self.pending_close.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            Frame::Method(Method::ChannelCloseOk(_)) => {
                self.closing = true;
                self.kill(Error::ClientChannelClosed);
                if let Some(reply) = self.pending_close.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            Frame::Method(Method::BasicDeliver(d)) => {
                self.assembler.start(PendingContent::Deliver {
                    consumer_tag: d.consumer_tag().as_str().to_owned(),
                    delivery_tag: d.delivery_tag(),
                    redelivered: d.redelivered(),
                    exchange: d.exchange().as_str().to_owned(),
                    routing_key: d.routing_key().as_str().to_owned(),
                });
            }
            Frame::Method(Method::BasicGetOk(ok)) => {
                self.assembler.start(PendingContent::Get {
                    delivery_tag: ok.delivery_tag(),
                    redelivered: ok.redelivered(),
                    exchange: ok.exchange().as_str().to_owned(),
                    routing_key: ok.routing_key().as_str().to_owned(),
                });
            }
            Frame::Method(Method::BasicGetEmpty(_)) => {
                if let Some(reply) = self.pending_gets.pop_front() {
                    let _ = reply.send(Ok(None));
                }
            }
            Frame::Method(Method::BasicReturn(r)) => {
                self.assembler.start(PendingContent::Return {
                    reply_code: r.reply_code(),
                    reply_text: r.reply_text().as_str().to_owned(),
                    exchange: r.exchange().as_str().to_owned(),
                    routing_key: r.routing_key().as_str().to_owned(),
                });
            }
            Frame::Method(Method::BasicCancel(c)) => {
                let tag = c.consumer_tag().as_str().to_owned();
                self.cancel_consumer(&tag, ConsumerMessage::Cancelled).await;
                if let Some(cb) = self.callback.clone() {
                    cb.basic_cancel(&tag).await;
                }
            }
            Frame::ContentHeader(header) => match self.assembler.header(header) {
                Ok(Some(assembled)) => self.dispatch_assembled(assembled).await,
                Ok(None) => {}
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    warn!("{_e}");
                    self.fatal(_e);
                }
            },
            Frame::ContentBody(chunk) => match self.assembler.body(chunk) {
                Ok(Some(assembled)) => self.dispatch_assembled(assembled).await,
                Ok(None) => {}
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    warn!("{_e}");
                    self.fatal(_e);
                }
            },
            Frame::Method(m) => {
                let kind = MethodKind::from(&m);
                if let Err(_e) = self.sync.notify(kind, m) {
                    #[cfg(feature = "tracing")]
                    warn!("{_e}");
                    self.fatal(_e);
                }
            }
            Frame::Heartbeat => {}
        }
    }

    async fn dispatch_assembled(&mut self, assembled: Assembled) {
        match assembled {
            Assembled::Delivery { consumer_tag, raw } => {
                let delivery = raw.into_delivery(self.handle.clone());
                match self.consumers.get(&consumer_tag) {
                    Some((_, tx)) => {
                        let _ = tx.send(ConsumerMessage::Delivery(delivery));
                    }
                    None => {
                        #[cfg(feature = "tracing")]
                        warn!("delivery for unknown consumer tag {consumer_tag}, dropping");
                    }
                }
            }
            Assembled::Get(raw) => {
                let delivery = raw.into_delivery(self.handle.clone());
                if let Some(reply) = self.pending_gets.pop_front() {
                    let _ = reply.send(Ok(Some(delivery)));
                }
            }
            Assembled::Return { returned } => {
                if let Some(cb) = self.callback.clone() {
                    cb.basic_return(returned).await;
                }
            }
        }
    }

    async fn cancel_consumer(&mut self, tag: &str, msg: ConsumerMessage) {
        if let Some((_, tx)) = self.consumers.remove(tag) {
            let _ = tx.send(msg);
        }
    }

    /// A `no_ack` consumer has nothing left to acknowledge, so its buffered
    /// deliveries stay retrievable; a consumer that still owes acks must
    /// discard what's buffered and raise immediately (spec §4.7).
    fn kill(&mut self, exc: Error) {
        self.sync.killall(exc);
        for reply in self.pending_gets.drain(..) {
            let _ = reply.send(Err(Error::ClientChannelClosed));
        }
        for (_, (no_ack, tx)) in self.consumers.drain() {
            let _ = tx.send(ConsumerMessage::ConnectionLost { drain_buffered: no_ack });
        }
    }

    fn fatal(&mut self, exc: Error) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.kill(exc);
    }

    async fn handle_poison_pill(&mut self, _cause: Arc<Error>) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.kill(Error::ConnectionLostError { cause: "connection lost".into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_running() -> Running {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let (conn_cmd_tx, _conn_cmd_rx) = mpsc::unbounded_channel();
        let handle = Channel { channel_id: 1, cmd_tx, frame_max: 131072 };
        Running {
            channel_id: 1,
            handle,
            conn_cmd_tx,
            sync: Synchroniser::new(),
            consumers: HashMap::new(),
            pending_gets: VecDeque::new(),
            assembler: Assembler::default(),
            callback: None,
            closing: false,
            pending_close: None,
        }
    }

    /// Connection loss must discard a still-acking consumer's buffered
    /// deliveries and raise immediately, while a `no_ack` consumer (nothing
    /// left to acknowledge) keeps its buffer retrievable (spec §4.7). Drives
    /// the real `kill()` path via `handle_poison_pill`, not just
    /// `QueuedConsumer::absorb` in isolation.
    #[tokio::test]
    async fn kill_conditions_drain_buffered_on_each_consumers_own_no_ack() {
        let mut running = test_running();

        let (acking_tx, mut acking_rx) = mpsc::unbounded_channel();
        let (no_ack_tx, mut no_ack_rx) = mpsc::unbounded_channel();
        running.handle_command(ChannelCommand::RegisterConsumer { tag: "acking".into(), no_ack: false, tx: acking_tx }).await;
        running.handle_command(ChannelCommand::RegisterConsumer { tag: "no-ack".into(), no_ack: true, tx: no_ack_tx }).await;

        running.handle_poison_pill(Arc::new(Error::ConnectionLostError { cause: "transport lost".into() })).await;

        assert!(matches!(acking_rx.try_recv().unwrap(), ConsumerMessage::ConnectionLost { drain_buffered: false }));
        assert!(matches!(no_ack_rx.try_recv().unwrap(), ConsumerMessage::ConnectionLost { drain_buffered: true }));
    }

    /// `basic_publish` must fragment a body larger than `frame_max - 8` bytes
    /// into multiple `ContentBody` frames rather than emitting one oversized
    /// frame (spec §4.6/§9).
    #[tokio::test]
    async fn basic_publish_chunks_body_to_frame_max() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let channel = Channel { channel_id: 1, cmd_tx, frame_max: 16 };

        let body = vec![7u8; 30];
        channel.basic_publish("ex", "rk", false, false, BasicProperties::default(), body.clone()).unwrap();

        let mut bodies = Vec::new();
        while let Ok(cmd) = cmd_rx.try_recv() {
            if let ChannelCommand::Send(Frame::ContentBody(chunk)) = cmd {
                bodies.push(chunk);
            }
        }
        assert_eq!(bodies.len(), 4); // ceil(30 / (16 - 8)) == 4
        assert!(bodies.iter().all(|c| c.len() <= 8));
        assert_eq!(bodies.concat(), body);
    }
}
