//! UART TCP bridge.
//!
//! Exposes a simulated node's UART on a TCP port so a master (the `labibus`
//! client commands, or any serial tool speaking raw TCP) can drive it. Bytes
//! read from the socket go onto the node's receive line; bytes the node
//! transmits are written back to the socket. One client at a time.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::node::NodeLink;

/// Transmitted-byte chunks buffered for the client.
const TX_QUEUE_DEPTH: usize = 256;

/// How often the transmit pump checks whether the bridge is gone.
const PUMP_POLL: Duration = Duration::from_millis(50);

/// A TCP listener bound to one node's UART.
pub struct UartBridge {
    listener: TcpListener,
    link: NodeLink,
}

impl UartBridge {
    /// Bind the listener.
    pub async fn bind(addr: impl ToSocketAddrs, link: NodeLink) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(UartBridge { listener, link })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve clients until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        let (tx_sender, mut tx_receiver) = mpsc::channel::<Vec<u8>>(TX_QUEUE_DEPTH);
        let pump_link = self.link.clone();
        let pump = tokio::task::spawn_blocking(move || pump_transmitted(pump_link, tx_sender));

        let result = self.accept_loop(&mut tx_receiver).await;
        // Closing the receiver stops the pump.
        drop(tx_receiver);
        if pump.await.is_err() {
            warn!(node = %self.link.name(), "transmit pump panicked");
        }
        result
    }

    async fn accept_loop(&self, tx_receiver: &mut mpsc::Receiver<Vec<u8>>) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!(node = %self.link.name(), %peer, "UART client connected");

            // Whatever the node sent while nobody was listening is gone.
            while tx_receiver.try_recv().is_ok() {}

            if let Err(e) = handle_uart_connection(stream, &self.link, tx_receiver).await {
                warn!(node = %self.link.name(), %peer, "UART connection error: {}", e);
            }
            info!(node = %self.link.name(), %peer, "UART client disconnected");
        }
    }
}

/// Move transmitted bytes from the node's channel onto the async side,
/// batching whatever is already queued.
fn pump_transmitted(link: NodeLink, tx_sender: mpsc::Sender<Vec<u8>>) {
    let transmitted = link.transmitted();
    loop {
        match transmitted.recv_timeout(PUMP_POLL) {
            Ok(first) => {
                let mut chunk = vec![first];
                chunk.extend(transmitted.try_iter());
                match tx_sender.try_send(chunk) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(chunk)) => {
                        warn!(node = %link.name(), "TX queue full, dropping {} bytes", chunk.len());
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if tx_sender.is_closed() {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Handle a single UART TCP connection.
async fn handle_uart_connection(
    mut stream: TcpStream,
    link: &NodeLink,
    tx_receiver: &mut mpsc::Receiver<Vec<u8>>,
) -> io::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let mut read_buf = [0u8; 1024];

    loop {
        tokio::select! {
            // TCP client -> node RX
            result = reader.read(&mut read_buf) => {
                let n = result?;
                if n == 0 {
                    return Ok(());
                }
                debug!(node = %link.name(), "rx {}", hex::encode(&read_buf[..n]));
                if link.feed(&read_buf[..n]).is_err() {
                    return Ok(());
                }
            }

            // node TX -> TCP client
            Some(data) = tx_receiver.recv() => {
                debug!(node = %link.name(), "tx {}", hex::encode(&data));
                writer.write_all(&data).await?;
                writer.flush().await?;
            }
        }
    }
}
