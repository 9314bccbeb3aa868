//! Bus master over TCP.
//!
//! Talks to a node exposed by [`UartBridge`](crate::uart_server::UartBridge)
//! (or any byte pipe onto a real bus): sends one request and waits for the
//! matching reply.

use std::time::Duration;

use labibus_codec::RequestKind;
use labibus_master::{encode_request, Reply, ReplyCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::error::SimResult;

/// A master connected to a bus over TCP.
#[derive(Debug)]
pub struct BusClient {
    stream: TcpStream,
    codec: ReplyCodec,
}

impl BusClient {
    /// Connect to a bridged bus.
    pub async fn connect(addr: impl ToSocketAddrs) -> SimResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(BusClient {
            stream,
            codec: ReplyCodec::new(),
        })
    }

    /// Send a request and wait up to `timeout` for its reply.
    ///
    /// Slaves stay silent rather than report errors, so `Ok(None)` means
    /// nobody answered in time: unknown device, or nothing new to report.
    pub async fn request(
        &mut self,
        device_id: u8,
        kind: RequestKind,
        timeout: Duration,
    ) -> SimResult<Option<Reply>> {
        self.codec.clear();
        let frame = encode_request(device_id, kind);
        debug!("request {}", hex::encode(&frame));
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 256];
        loop {
            if let Some(reply) = self.codec.decode()? {
                return Ok(Some(reply.ensure_answers(device_id, kind)?));
            }
            let n = match timeout_at(deadline, self.stream.read(&mut buf)).await {
                Ok(read) => read?,
                Err(_) => return Ok(None),
            };
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            debug!("reply bytes {}", hex::encode(&buf[..n]));
            self.codec.push(&buf[..n]);
        }
    }

    /// Discovery request.
    pub async fn discover(&mut self, device_id: u8, timeout: Duration) -> SimResult<Option<Reply>> {
        self.request(device_id, RequestKind::Discover, timeout).await
    }

    /// Poll request.
    pub async fn poll(&mut self, device_id: u8, timeout: Duration) -> SimResult<Option<Reply>> {
        self.request(device_id, RequestKind::Poll, timeout).await
    }
}
