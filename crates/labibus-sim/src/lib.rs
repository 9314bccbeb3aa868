//! Labibus host simulator
//!
//! Runs Labibus slave nodes on the host: a node file describes the sensors,
//! [`SimNode`] runs the slave engine with its receive interrupt on a dedicated
//! thread, [`UartBridge`] exposes the node's UART over TCP, and [`BusClient`]
//! plays the master on the other end.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use labibus_sim::{load_config_from_str, BusClient, SimNode, UartBridge};
//!
//! # async fn run() -> labibus_sim::SimResult<()> {
//! let config = load_config_from_str("devices:\n  - id: 9\n    description: Temp\n")?;
//! let node = SimNode::from_config(&config)?;
//! let bridge = UartBridge::bind("127.0.0.1:0", node.link()).await?;
//! let addr = bridge.local_addr()?;
//! tokio::spawn(bridge.run());
//!
//! let mut client = BusClient::connect(addr).await?;
//! let reply = client.discover(9, Duration::from_millis(500)).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod error;
pub mod node;
pub mod uart_server;

pub use client::BusClient;
pub use config::{load_config, load_config_from_str, DeviceConfig, NodeConfig};
pub use error::*;
pub use node::{NodeCommand, NodeLink, SimNode};
pub use uart_server::UartBridge;
