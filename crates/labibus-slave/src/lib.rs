//! Labibus slave engine
//!
//! The device side of the Labibus RS485 sensor bus: one master polls many
//! low-power sensor nodes by address, and each node answers for up to
//! [`MAX_DEVICES`] sensors.
//!
//! # Structure
//!
//! - [`hal`]: the register-level capability the engine runs on, plus the scoped
//!   interrupt guards
//! - [`direction`]: RS485 transceiver receive/transmit switching
//! - [`registry`]: fixed-capacity table of configured sensors
//! - [`assembler`]: receive-interrupt byte stream to request line
//! - [`request`]: request validation
//! - [`response`]: reply bodies and the transmit sequence
//! - [`slave`]: the context tying it together, and its interrupt handler
//! - [`sim`]: a memory-backed controller for running off-target
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use labibus_slave::{sim::SimHal, RxHandler, Slave};
//!
//! let slave = Arc::new(Slave::new(SimHal::new()));
//! slave.configure(9, 10, "Temperature room 2", "degree C")?;
//! slave.set_value(9, 23.5);
//!
//! // Wire the handler to the UART receive interrupt.
//! let mut handler = RxHandler::new(slave.clone());
//! for &b in b"?09:P|" {
//!     handler.on_byte(b);
//! }
//! # Ok::<(), labibus_slave::RegistryError>(())
//! ```

pub mod assembler;
pub mod direction;
mod error;
pub mod hal;
pub mod registry;
pub mod request;
pub mod response;
pub mod sim;
pub mod slave;

pub use assembler::{AssemblerState, FrameAssembler};
pub use direction::{BusDirection, DirectionPins};
pub use error::*;
pub use hal::{BusHal, InterruptGuard, Level, Pin, RxMaskGuard, UartConfig};
pub use registry::{DeviceSlot, PendingValue, Registry, MAX_DEVICES};
pub use request::{parse_request, Request};
pub use response::{encode_discovery, encode_poll, ResponseBuffer, Transmitter};
pub use slave::{RxHandler, Slave};
