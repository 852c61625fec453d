use crate::frame::{Frame, FrameHeader, FRAME_END};

use amqp_serde::{to_buffer, types::AmqpChannelId};
use bytes::{Buf, BytesMut};
use serde::Serialize;
use std::io;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
#[cfg(feature = "tracing")]
use tracing::trace;

use super::Error;
type Result<T> = std::result::Result<T, Error>;
const DEFAULT_BUFFER_SIZE: usize = 8192;

pub(crate) struct SplitConnection {
    reader: BufReader,
    writer: BufWriter,
}
pub(crate) struct BufReader {
    stream: OwnedReadHalf,
    buffer: BytesMut,
}
pub(crate) struct BufWriter {
    stream: OwnedWriteHalf,
    buffer: BytesMut,
}

// Support to split socket connection into reader half and wirter half, which can be run in different tasks cocurrently
// Same interfaces to read/write packet before and after split.
impl SplitConnection {
    pub async fn open(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self::from_stream(stream))
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();

        let read_buffer = BytesMut::with_capacity(DEFAULT_BUFFER_SIZE);
        let write_buffer = BytesMut::with_capacity(DEFAULT_BUFFER_SIZE);

        Self {
            reader: BufReader {
                stream: reader,
                buffer: read_buffer,
            },
            writer: BufWriter {
                stream: writer,
                buffer: write_buffer,
            },
        }
    }

    /// split connection into reader half and writer half
    pub(crate) fn into_split(self) -> (BufReader, BufWriter) {
        (self.reader, self.writer)
    }

    /// to keep same read/write interfaces before and after connection split
    /// below interfaces are forwarded to `BufferReader` and `BufferWriter` internally
    #[allow(dead_code, /*used for testing only*/)]
    pub async fn close(self) -> Result<()> {
        self.reader.close().await;
        self.writer.close().await
    }

    pub async fn write<T: Serialize>(&mut self, value: &T) -> Result<usize> {
        self.writer.write(value).await
    }

    pub async fn write_frame(&mut self, channel: AmqpChannelId, frame: Frame) -> Result<usize> {
        self.writer.write_frame(channel, frame).await
    }

    pub async fn read_frame(&mut self) -> Result<ChannelFrame> {
        self.reader.read_frame().await
    }
}

impl BufWriter {
    // write any serializable value to socket
    pub async fn write<T: Serialize>(&mut self, value: &T) -> Result<usize> {
        to_buffer(value, &mut self.buffer)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let len = self.buffer.len();
        self.stream.write_all(&self.buffer).await?;
        self.buffer.advance(len);
        Ok(len)
    }

    // write a AMQP frame over a specific channel
    pub async fn write_frame(&mut self, channel: AmqpChannelId, frame: Frame) -> Result<usize> {
        // TODO: tracing
        #[cfg(feature = "tracing")]
        trace!("SENT on channel {}: {}", channel, frame);

        // reserve bytes for frame header, which to be updated after encoding payload
        let header = FrameHeader {
            frame_type: frame.get_frame_type(),
            channel,
            payload_size: 0,
        };
        to_buffer(&header, &mut self.buffer).unwrap();

        // encode payload
        let payload_size = to_buffer(&frame, &mut self.buffer)?;

        // update frame's payload size
        for (i, v) in (payload_size as u32).to_be_bytes().iter().enumerate() {
            let p = self.buffer.get_mut(i + 3).unwrap();
            *p = *v;
        }

        // encode frame end byte
        to_buffer(&FRAME_END, &mut self.buffer).unwrap();

        // flush whole buffer
        self.stream.write_all(&self.buffer).await?;

        // discard sent data in write buffer
        let len = self.buffer.len();
        self.buffer.advance(len);

        Ok(len)
    }

    // // The socket connection will be shutdown if writer half is shutdown
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

type ChannelFrame = (AmqpChannelId, Frame);

impl BufReader {
    // try to decode a whole frame from the bufferred data.
    // If it is incomplete data, return None;
    // If the frame syntax is corrupted, return Error.
    fn decode(&mut self) -> Result<Option<ChannelFrame>> {
        match Frame::decode(&self.buffer)? {
            Some((len, channel_id, frame)) => {
                // discard parsed data in read buffer
                self.buffer.advance(len);
                // TODO: tracing
                #[cfg(feature = "tracing")]
                trace!("RECV on channel {}: {}", channel_id, frame);
                Ok(Some((channel_id, frame)))
            }
            None => Ok(None),
        }
    }

    // Read a complete frame from socket connection, return channel id and decoded frame.
    pub async fn read_frame(&mut self) -> Result<ChannelFrame> {
        // check if there is remaining data in buffer to decode first
        let result = self.decode()?;
        if let Some(frame) = result {
            return Ok(frame);
        }
        // incomplete frame data remains in buffer, read until a complete frame
        loop {
            let len = self.stream.read_buf(&mut self.buffer).await?;
            if len == 0 {
                return if self.buffer.is_empty() {
                    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed the connection").into())
                } else {
                    Err(Error::Protocol("peer closed the connection with a partial frame buffered".into()))
                };
            }
            // TODO:  tracing
            #[cfg(feature = "tracing")]
            trace!("{len} bytes read from network");
            let result = self.decode()?;
            match result {
                Some(frame) => return Ok(frame),
                None => continue,
            }
        }
    }

    // do nothing except consume the reader itself
    pub async fn close(self) {}
}

/////////////////////////////////////////////////////////////////////////////

/////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod test {
    use super::SplitConnection;
    use crate::frame::connection::{Close, Open};
    use crate::frame::constants::DEFAULT_CONN_CHANNEL;
    use crate::frame::{Frame, Method, ProtocolHeader};
    use tokio::net::TcpListener;

    // These tests open a loopback TCP pair on an ephemeral port and drive
    // both ends directly, so no running broker is required.

    #[tokio::test]
    async fn protocol_header_round_trips_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 8];
            use tokio::io::AsyncReadExt;
            let mut stream = stream;
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut client = SplitConnection::open(&addr.ip().to_string(), addr.port()).await.unwrap();
        client.write(&ProtocolHeader::default()).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, ProtocolHeader::BYTES);
    }

    #[tokio::test]
    async fn write_frame_then_read_frame_round_trips_a_method() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let mut client = SplitConnection::open(&addr.ip().to_string(), addr.port()).await.unwrap();
        let server_stream = accept.await.unwrap();
        let mut server = SplitConnection::from_stream(server_stream);

        let open = Method::ConnectionOpen(Open::default()).into_frame();
        client.write_frame(DEFAULT_CONN_CHANNEL, open.clone()).await.unwrap();

        let (channel_id, frame) = server.read_frame().await.unwrap();
        assert_eq!(channel_id, DEFAULT_CONN_CHANNEL);
        assert_eq!(frame, open);

        let close = Method::ConnectionClose(Close::default()).into_frame();
        server.write_frame(DEFAULT_CONN_CHANNEL, close.clone()).await.unwrap();
        let (channel_id, frame) = client.read_frame().await.unwrap();
        assert_eq!(channel_id, DEFAULT_CONN_CHANNEL);
        assert_eq!(frame, close);
    }

    #[tokio::test]
    async fn split_halves_behave_like_the_unsplit_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let (mut reader, mut writer) =
            SplitConnection::open(&addr.ip().to_string(), addr.port()).await.unwrap().into_split();
        let mut server = SplitConnection::from_stream(accept.await.unwrap());

        writer.write_frame(DEFAULT_CONN_CHANNEL, Frame::Heartbeat).await.unwrap();
        let (channel_id, frame) = server.read_frame().await.unwrap();
        assert_eq!(channel_id, DEFAULT_CONN_CHANNEL);
        assert_eq!(frame, Frame::Heartbeat);

        reader.close().await;
        writer.close().await.unwrap();
    }
}
