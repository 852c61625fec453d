//! Protocol Engine + Connection Actor (spec §4.2 / §4.5): drives the
//! handshake, then runs the steady-state event loop that is channel 0's
//! handler — routing frames for every other channel through the
//! [`ChannelManager`](super::channel_manager::ChannelManager), driving the
//! heartbeat monitor, and reacting to client- or server-initiated close and
//! to transport loss.

use std::sync::Arc;

use amqp_serde::types::{AmqpChannelId, FieldTable, FieldValue};
use tokio::sync::{mpsc, oneshot};
#[cfg(feature = "tracing")]
use tracing::{debug, error, warn};

use super::channel_manager::{ChannelManager, Incoming};
use super::heartbeat::{HeartbeatAction, HeartbeatMonitor};
use super::split_connection::{BufReader, BufWriter, SplitConnection};
use super::synchroniser::{Completion, Synchroniser};
use crate::error::Error;
use crate::frame::constants::DEFAULT_CONN_CHANNEL;
use crate::frame::{connection, Frame, Method, MethodKind, ProtocolHeader};

/// Requests the public API layer sends to a running [`ConnectionManager`].
pub(crate) enum ConnectionCommand {
    Send { channel: AmqpChannelId, frame: Frame },
    OpenChannel { reply: oneshot::Sender<Result<OpenedChannel, Error>> },
    CloseChannel { channel_id: AmqpChannelId },
    /// Registers an await against the channel-0 (connection-level)
    /// synchroniser; mirrors what a per-channel actor does against its own.
    Register0 { accepts: Vec<MethodKind>, reply: oneshot::Sender<Completion> },
    Close { reply: oneshot::Sender<Result<(), Error>> },
}

pub(crate) struct OpenedChannel {
    pub channel_id: AmqpChannelId,
    pub incoming: mpsc::UnboundedReceiver<Incoming>,
}

/// What a caller holds after [`connect`] succeeds: a way to talk to the
/// manager task plus the negotiated limits it needs to respect locally
/// (content-body fragmentation, channel allocation bounds).
#[derive(Clone)]
pub(crate) struct ConnectionHandle {
    pub cmd_tx: mpsc::UnboundedSender<ConnectionCommand>,
    pub channel_max: u16,
    pub frame_max: u32,
}

enum ReaderEvent {
    Frame(AmqpChannelId, Frame),
    TransportLost(Error),
}

async fn run_reader(mut reader: BufReader, tx: mpsc::UnboundedSender<ReaderEvent>) {
    loop {
        match reader.read_frame().await {
            Ok((channel_id, frame)) => {
                if tx.send(ReaderEvent::Frame(channel_id, frame)).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(ReaderEvent::TransportLost(e));
                return;
            }
        }
    }
}

/// Client properties sent in `Connection.StartOk`. The version string is a
/// build-time constant rather than a guess at the original's placeholder
/// `"0.1"` (spec §9 open question 1).
fn client_properties() -> FieldTable {
    let mut props = FieldTable::new();
    props.insert("product", FieldValue::LongString(b"amqprs".to_vec()));
    props.insert("version", FieldValue::LongString(crate::CLIENT_VERSION.as_bytes().to_vec()));
    props.insert("platform", FieldValue::LongString(b"rust".to_vec()));
    props
}

/// Drives the straight-line handshake of spec §4.5 steps 1-4, then spawns
/// the reader task and the manager's own event-loop task.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    virtual_host: &str,
    username: &str,
    password: &str,
) -> Result<ConnectionHandle, Error> {
    let mut conn = SplitConnection::open(host, port).await?;
    conn.write(&ProtocolHeader::default()).await?;

    let (_, start_frame) = conn.read_frame().await?;
    if !matches!(start_frame, Frame::Method(Method::ConnectionStart(_))) {
        return Err(Error::Protocol(format!("expected Connection.Start, got {start_frame}")));
    }

    let mut response = FieldTable::new();
    response.insert("LOGIN", FieldValue::LongString(username.as_bytes().to_vec()));
    response.insert("PASSWORD", FieldValue::LongString(password.as_bytes().to_vec()));
    let start_ok = connection::StartOk::new(client_properties(), "AMQPLAIN".try_into()?, response, "en_US".try_into()?);
    conn.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionStartOk(start_ok).into_frame()).await?;

    let (_, tune_frame) = conn.read_frame().await?;
    let Frame::Method(Method::ConnectionTune(tune)) = tune_frame else {
        return Err(Error::Protocol(format!("expected Connection.Tune, got {tune_frame}")));
    };
    let (channel_max, frame_max, heartbeat) = (tune.channel_max(), tune.frame_max(), tune.heartbeat());
    let tune_ok = connection::TuneOk::new(channel_max, frame_max, heartbeat);
    conn.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionTuneOk(tune_ok).into_frame()).await?;

    let open = connection::Open::new(virtual_host.try_into()?, "".try_into()?, false);
    conn.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionOpen(open).into_frame()).await?;
    let (_, open_ok_frame) = conn.read_frame().await?;
    if !matches!(open_ok_frame, Frame::Method(Method::ConnectionOpenOk(_))) {
        return Err(Error::Protocol(format!("expected Connection.Open-Ok, got {open_ok_frame}")));
    }

    let (reader, writer) = conn.into_split();
    let (reader_tx, reader_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_reader(reader, reader_tx));

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager {
        writer,
        reader_rx,
        cmd_rx,
        sync: Synchroniser::new(),
        channels: ChannelManager::new(),
        heartbeat: HeartbeatMonitor::new(heartbeat),
        next_channel_id: 1,
        channel_max: if channel_max == 0 { AmqpChannelId::MAX } else { channel_max },
        closing: false,
        pending_close: None,
    };
    tokio::spawn(manager.run());

    Ok(ConnectionHandle { cmd_tx, channel_max, frame_max })
}

struct ConnectionManager {
    writer: BufWriter,
    reader_rx: mpsc::UnboundedReceiver<ReaderEvent>,
    cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    sync: Synchroniser,
    channels: ChannelManager,
    heartbeat: Option<HeartbeatMonitor>,
    next_channel_id: AmqpChannelId,
    channel_max: AmqpChannelId,
    closing: bool,
    pending_close: Option<oneshot::Sender<Result<(), Error>>>,
}

impl ConnectionManager {
    async fn run(mut self) {
        loop {
            let heartbeat_action = Self::next_heartbeat_action(&mut self.heartbeat);
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break, // every handle dropped; nothing left to do
                    }
                }
                event = self.reader_rx.recv() => {
                    match event {
                        Some(event) => self.handle_reader_event(event).await,
                        None => break,
                    }
                }
                action = heartbeat_action => self.handle_heartbeat(action).await,
            }
            if self.closing && self.sync.is_killed() {
                break;
            }
        }
    }

    async fn next_heartbeat_action(heartbeat: &mut Option<HeartbeatMonitor>) -> HeartbeatAction {
        match heartbeat {
            Some(monitor) => monitor.wait_action().await,
            None => std::future::pending().await,
        }
    }

    async fn handle_command(&mut self, cmd: ConnectionCommand) {
        match cmd {
            ConnectionCommand::Send { channel, frame } => {
                if let Some(hb) = &mut self.heartbeat {
                    hb.note_frame_sent();
                }
                if let Err(_e) = self.writer.write_frame(channel, frame).await {
                    #[cfg(feature = "tracing")]
                    error!("failed to write frame on channel {channel}: {_e}");
                }
            }
            ConnectionCommand::OpenChannel { reply } => self.open_channel(reply),
            ConnectionCommand::CloseChannel { channel_id } => self.channels.deregister(channel_id),
            ConnectionCommand::Register0 { accepts, reply } => {
                let _ = reply.send(self.sync.await_methods(accepts));
            }
            ConnectionCommand::Close { reply } => self.initiate_close(reply).await,
        }
    }

    fn open_channel(&mut self, reply: oneshot::Sender<Result<OpenedChannel, Error>>) {
        if self.closing {
            let _ = reply.send(Err(Error::ClientConnectionClosed));
            return;
        }
        let start = self.next_channel_id;
        let mut id = start;
        let channel_id = loop {
            if !self.channels.is_registered(id) {
                break Some(id);
            }
            id = if id >= self.channel_max { 1 } else { id + 1 };
            if id == start {
                break None;
            }
        };
        let Some(channel_id) = channel_id else {
            let _ = reply.send(Err(Error::Protocol("no free channel id available (channel_max exhausted)".into())));
            return;
        };
        self.next_channel_id = if channel_id >= self.channel_max { 1 } else { channel_id + 1 };
        let incoming = self.channels.register(channel_id);
        let _ = reply.send(Ok(OpenedChannel { channel_id, incoming }));
    }

    async fn initiate_close(&mut self, reply: oneshot::Sender<Result<(), Error>>) {
        if self.closing || self.sync.is_killed() {
            let _ = reply.send(Ok(()));
            return;
        }
        self.closing = true;
        let close = connection::Close::new(0, "Connection closed by application".try_into().unwrap_or_default(), 0, 0);
        let _ = self.writer.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionClose(close).into_frame()).await;
        self.pending_close = Some(reply);
    }

    async fn handle_reader_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Frame(channel_id, frame) => self.handle_frame(channel_id, frame).await,
            ReaderEvent::TransportLost(cause) => self.handle_transport_lost(cause).await,
        }
    }

    async fn handle_frame(&mut self, channel_id: AmqpChannelId, frame: Frame) {
        if let Some(hb) = &mut self.heartbeat {
            hb.note_frame_received();
        }
        if channel_id != DEFAULT_CONN_CHANNEL {
            if let Err(_e) = self.channels.dispatch(channel_id, frame) {
                #[cfg(feature = "tracing")]
                warn!("{_e}");
                self.fatal_protocol_error(_e).await;
            }
            return;
        }

        match frame {
            Frame::Heartbeat => {}
            Frame::Method(Method::ConnectionClose(close)) => {
                let _ = self.writer.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionCloseOk(Default::default()).into_frame()).await;
                self.closing = true;
                if let Some(hb) = &mut self.heartbeat {
                    hb.stop();
                }
                let exc = Error::ServerClosedConnection {
                    reply_code: close.reply_code(),
                    reply_text: close.reply_text().to_string(),
                };
                self.sync.killall(exc);
                self.channels.dispatch_all(Arc::new(Error::ClientConnectionClosed));
                // A client-initiated close already in flight races this frame
                // rather than failing it: the connection is closed either way.
                if let Some(reply) = self.pending_close.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            Frame::Method(Method::ConnectionCloseOk(_)) => {
                self.closing = true;
                self.sync.killall(Error::ClientConnectionClosed);
                self.channels.dispatch_all(Arc::new(Error::ClientConnectionClosed));
                if let Some(reply) = self.pending_close.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            Frame::Method(m) => {
                let kind = MethodKind::from(&m);
                if let Err(e) = self.sync.notify(kind, m) {
                    self.fatal_protocol_error(e).await;
                }
            }
            other => {
                self.fatal_protocol_error(Error::Protocol(format!("unexpected {other} on channel 0"))).await;
            }
        }
    }

    async fn fatal_protocol_error(&mut self, e: Error) {
        if self.closing {
            return;
        }
        self.closing = true;
        if let Some(hb) = &mut self.heartbeat {
            hb.stop();
        }
        let msg = e.to_string();
        self.sync.killall(e);
        self.channels.dispatch_all(Arc::new(Error::Protocol(msg)));
        if let Some(reply) = self.pending_close.take() {
            let _ = reply.send(Err(Error::ClientConnectionClosed));
        }
    }

    async fn handle_transport_lost(&mut self, cause: Error) {
        if self.closing {
            return;
        }
        self.closing = true;
        if let Some(hb) = &mut self.heartbeat {
            hb.stop();
        }
        let cause_text = cause.to_string();
        self.sync.killall(Error::ConnectionLostError { cause: cause_text.clone() });
        self.channels.dispatch_all(Arc::new(Error::ConnectionLostError { cause: cause_text }));
        if let Some(reply) = self.pending_close.take() {
            let _ = reply.send(Err(Error::ConnectionLostError { cause: "transport lost while closing".into() }));
        }
    }

    async fn handle_heartbeat(&mut self, action: HeartbeatAction) {
        match action {
            HeartbeatAction::SendHeartbeat => {
                let _ = self.writer.write_frame(DEFAULT_CONN_CHANNEL, Frame::Heartbeat).await;
            }
            HeartbeatAction::PeerTimedOut => {
                self.handle_transport_lost(Error::Protocol("heartbeat timeout: no frame received from peer".into())).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::frame::connection as conn;

    /// Drives the server side of spec §4.5's handshake against a real
    /// loopback socket, no running broker required — matching
    /// `split_connection`'s own loopback test style.
    #[tokio::test]
    async fn connect_drives_the_full_handshake_then_closes_cleanly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let broker = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 8];
            stream.read_exact(&mut header).await.unwrap();
            assert_eq!(header, ProtocolHeader::BYTES);

            let mut server = SplitConnection::from_stream(stream);
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionStart(conn::Start::new(FieldTable::new())).into_frame())
                .await
                .unwrap();
            let (_, start_ok) = server.read_frame().await.unwrap();
            assert!(matches!(start_ok, Frame::Method(Method::ConnectionStartOk(_))));

            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionTune(conn::Tune::new(16, 131072, 0)).into_frame())
                .await
                .unwrap();
            let (_, tune_ok) = server.read_frame().await.unwrap();
            assert!(matches!(tune_ok, Frame::Method(Method::ConnectionTuneOk(_))));

            let (_, open) = server.read_frame().await.unwrap();
            assert!(matches!(open, Frame::Method(Method::ConnectionOpen(_))));
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionOpenOk(conn::OpenOk::default()).into_frame())
                .await
                .unwrap();

            let (_, close_frame) = server.read_frame().await.unwrap();
            assert!(matches!(close_frame, Frame::Method(Method::ConnectionClose(_))));
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionCloseOk(conn::CloseOk::default()).into_frame())
                .await
                .unwrap();
        });

        let handle = connect(&addr.ip().to_string(), addr.port(), "/", "guest", "guest").await.unwrap();
        assert_eq!(handle.channel_max, 16);
        assert_eq!(handle.frame_max, 131072);

        let (reply, rx) = oneshot::channel();
        handle.cmd_tx.send(ConnectionCommand::Close { reply }).unwrap();
        assert!(rx.await.unwrap().is_ok());

        broker.await.unwrap();
    }

    /// A `Connection.Close` arriving from the broker at the same moment the
    /// client asked to close must still resolve the client's own close
    /// future, rather than hang waiting for a `Close-Ok` that now races
    /// against the server-initiated close already in flight.
    #[tokio::test]
    async fn simultaneous_close_resolves_the_clients_close_call() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let broker = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 8];
            stream.read_exact(&mut header).await.unwrap();

            let mut server = SplitConnection::from_stream(stream);
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionStart(conn::Start::new(FieldTable::new())).into_frame())
                .await
                .unwrap();
            server.read_frame().await.unwrap();
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionTune(conn::Tune::new(16, 131072, 0)).into_frame())
                .await
                .unwrap();
            server.read_frame().await.unwrap();
            server.read_frame().await.unwrap(); // Connection.Open
            server
                .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionOpenOk(conn::OpenOk::default()).into_frame())
                .await
                .unwrap();

            // Server-initiated close, racing the client's own close below.
            // Depending on which the manager's select! picks up first, the
            // next frame off the wire is either the client's own
            // Connection.Close (needing an Ok back) or its answer to ours.
            let close = conn::Close::new(320, "shutting down".try_into().unwrap(), 0, 0);
            server.write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionClose(close).into_frame()).await.unwrap();
            let (_, reply) = server.read_frame().await.unwrap();
            match reply {
                Frame::Method(Method::ConnectionCloseOk(_)) => {}
                Frame::Method(Method::ConnectionClose(_)) => {
                    server
                        .write_frame(DEFAULT_CONN_CHANNEL, Method::ConnectionCloseOk(conn::CloseOk::default()).into_frame())
                        .await
                        .unwrap();
                }
                other => panic!("unexpected frame racing the close: {other}"),
            }
        });

        let handle = connect(&addr.ip().to_string(), addr.port(), "/", "guest", "guest").await.unwrap();

        let (reply, rx) = oneshot::channel();
        handle.cmd_tx.send(ConnectionCommand::Close { reply }).unwrap();
        // Whichever frame the manager's select! picks up first, a close
        // already in flight on either side must resolve successfully, never
        // fail or hang.
        assert!(rx.await.unwrap().is_ok());

        broker.await.unwrap();
    }
}
