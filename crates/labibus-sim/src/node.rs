//! Threaded simulated node.
//!
//! A [`SimNode`] runs one slave on a [`SimHal`]. The receive interrupt side
//! lives on its own thread and is fed received bytes over a channel; each byte
//! is latched into the simulated receive register and the interrupt handler
//! runs, exactly as the UART would trigger it. Bytes the slave transmits come
//! back out on a second channel.
//!
//! ## Key Types
//!
//! - [`SimNode`]: owns the slave and its interrupt thread
//! - [`NodeLink`]: cloneable byte-level access to a running node
//! - [`NodeCommand`]: messages to the interrupt thread

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use labibus_slave::sim::SimHal;
use labibus_slave::{InterruptGuard, RxHandler, Slave};
use tracing::{debug, trace, warn};

use crate::config::NodeConfig;
use crate::error::{SimError, SimResult};

// ============================================================================
// Commands
// ============================================================================

/// Messages sent to a node's interrupt thread.
#[derive(Debug)]
pub enum NodeCommand {
    /// Bytes arriving on the bus, in order.
    Rx(Vec<u8>),

    /// Stop the interrupt thread.
    Shutdown,
}

// ============================================================================
// Link
// ============================================================================

/// Byte-level access to a running node: what goes onto its receive line and
/// what comes off its transmit line.
#[derive(Debug, Clone)]
pub struct NodeLink {
    name: String,
    cmd_tx: Sender<NodeCommand>,
    tx_rx: Receiver<u8>,
}

impl NodeLink {
    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Put bytes on the node's receive line.
    pub fn feed(&self, data: &[u8]) -> SimResult<()> {
        self.cmd_tx
            .send(NodeCommand::Rx(data.to_vec()))
            .map_err(|_| SimError::NodeStopped(self.name.clone()))
    }

    /// Receiver for bytes the node transmits.
    pub fn transmitted(&self) -> &Receiver<u8> {
        &self.tx_rx
    }

    /// Wait up to `timeout` for the next transmitted byte.
    pub fn recv_tx_timeout(&self, timeout: Duration) -> Option<u8> {
        self.tx_rx.recv_timeout(timeout).ok()
    }

    /// Collect transmitted bytes up to and including the next `\n`.
    ///
    /// Returns whatever arrived if `timeout` elapses first; an empty vector
    /// means the node stayed silent.
    pub fn recv_line(&self, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.tx_rx.recv_timeout(remaining) {
                Ok(b) => {
                    line.push(b);
                    if b == b'\n' {
                        return line;
                    }
                }
                Err(_) => return line,
            }
        }
    }

    /// Take every byte transmitted so far.
    pub fn drain_tx(&self) -> Vec<u8> {
        self.tx_rx.try_iter().collect()
    }
}

// ============================================================================
// Node
// ============================================================================

/// A simulated slave node with its interrupt thread.
pub struct SimNode {
    link: NodeLink,
    slave: Arc<Slave<SimHal>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SimNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimNode")
            .field("name", &self.link.name)
            .field("devices", &self.slave.device_count())
            .finish()
    }
}

impl SimNode {
    /// Start a node with no devices configured.
    ///
    /// Until the first device is configured the bus is not set up and the
    /// node ignores everything it receives.
    pub fn spawn(name: impl Into<String>) -> SimResult<Self> {
        let name = name.into();
        let (tx_tx, tx_rx) = crossbeam_channel::unbounded();
        let hal = SimHal::new()
            .with_tx_sink(move |b| {
                // Nobody listening; the byte is lost on the wire.
                let _ = tx_tx.send(b);
            })
            .without_event_log();
        let slave = Arc::new(Slave::new(hal));

        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let handler = RxHandler::new(slave.clone());
        let thread_name = name.clone();
        let thread = thread::Builder::new()
            .name(format!("node-{}", name))
            .spawn(move || node_thread_main(&thread_name, handler, cmd_rx))?;

        debug!(node = %name, "node started");
        Ok(SimNode {
            link: NodeLink {
                name,
                cmd_tx,
                tx_rx,
            },
            slave,
            thread: Some(thread),
        })
    }

    /// Start a node and configure it from a node file.
    pub fn from_config(config: &NodeConfig) -> SimResult<Self> {
        let node = Self::spawn(config.name.clone())?;
        config.apply(&node.slave)?;
        Ok(node)
    }

    /// Node name.
    pub fn name(&self) -> &str {
        self.link.name()
    }

    /// The slave running on this node, for the mainline API.
    pub fn slave(&self) -> &Arc<Slave<SimHal>> {
        &self.slave
    }

    /// Byte-level access to the node.
    pub fn link(&self) -> NodeLink {
        self.link.clone()
    }

    /// Put bytes on the node's receive line.
    pub fn feed(&self, data: &[u8]) -> SimResult<()> {
        self.link.feed(data)
    }

    /// Collect transmitted bytes up to and including the next `\n`.
    pub fn recv_line(&self, timeout: Duration) -> Vec<u8> {
        self.link.recv_line(timeout)
    }

    /// Take every byte transmitted so far.
    pub fn drain_tx(&self) -> Vec<u8> {
        self.link.drain_tx()
    }

    /// Advance every drifting sensor by its drift and mark the new reading
    /// pending. Returns the number of sensors updated.
    pub fn apply_drift(&self, config: &NodeConfig) -> usize {
        let mut updated = 0;
        for device in &config.devices {
            let Some(drift) = device.drift else { continue };
            let Some(slot) = self.slave.device(device.id) else {
                continue;
            };
            if self.slave.set_value(device.id, slot.sensor_value + drift) {
                updated += 1;
            }
        }
        trace!(node = %self.name(), updated, "sensor drift applied");
        updated
    }

    /// Stop the interrupt thread and wait for it to exit.
    pub fn shutdown(mut self) -> SimResult<()> {
        self.stop()
    }

    fn stop(&mut self) -> SimResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // Already gone if the send fails; join reports how.
        let _ = self.link.cmd_tx.send(NodeCommand::Shutdown);
        thread
            .join()
            .map_err(|_| SimError::NodeStopped(self.link.name.clone()))
    }
}

impl Drop for SimNode {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}", e);
        }
    }
}

/// Interrupt thread body: one receive interrupt per byte, until shut down.
fn node_thread_main(name: &str, mut handler: RxHandler<SimHal>, cmd_rx: Receiver<NodeCommand>) {
    loop {
        match cmd_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(NodeCommand::Rx(data)) => {
                for b in data {
                    deliver(&mut handler, b);
                }
            }
            Ok(NodeCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    debug!(node = %name, "node stopped");
}

fn deliver(handler: &mut RxHandler<SimHal>, byte: u8) {
    let slave = handler.slave().clone();
    let hal = slave.hal();
    if !hal.rx_interrupt_enabled() {
        trace!(byte, "receive interrupt disabled, byte dropped");
        return;
    }
    hal.latch_rx(byte);
    // Interrupt entry masks, return restores.
    let _isr = InterruptGuard::new(hal);
    handler.on_rx_interrupt();
}
