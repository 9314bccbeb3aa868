//! The slave context and its receive-interrupt handler.
//!
//! [`Slave`] owns the hardware handle and the device registry and is shared
//! between two contexts:
//!
//! - **mainline**: the application calls [`Slave::configure`] and
//!   [`Slave::set_value`];
//! - **receive interrupt**: a single [`RxHandler`] owns the frame assembler and
//!   runs validation, lookup and the reply for every completed line.
//!
//! Registry access goes through `Exclusive`, which masks interrupts and locks
//! the table for one short critical section. Replies are transmitted outside of
//! it, so a slow transmission never blocks the application.

use std::borrow::Cow;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Once};

use labibus_codec::RequestKind;
use parking_lot::{Mutex, MutexGuard};

use crate::assembler::FrameAssembler;
use crate::direction::{BusDirection, DirectionPins};
use crate::error::RegistryResult;
use crate::hal::{BusHal, InterruptGuard, RxMaskGuard, UartConfig};
use crate::registry::{DeviceSlot, Registry};
use crate::request::parse_request;
use crate::response::{encode_discovery, encode_poll, Transmitter};

/// Registry access with interrupts masked.
///
/// The lock is released before interrupts are restored.
pub(crate) struct Exclusive<'a, H: BusHal> {
    registry: MutexGuard<'a, Registry>,
    _irq: InterruptGuard<'a, H>,
}

impl<H: BusHal> Deref for Exclusive<'_, H> {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.registry
    }
}

impl<H: BusHal> DerefMut for Exclusive<'_, H> {
    fn deref_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

/// Slave-side protocol engine for one node.
///
/// The registry is only reachable through [`Slave::configure`] and
/// [`Slave::set_value`]; the table itself stays private so that the first
/// configure always sets up the bus and only a poll consumes a pending value.
///
/// ```compile_fail
/// use labibus_slave::{sim::SimHal, Slave};
///
/// let slave = Slave::new(SimHal::new());
/// let _ = slave.exclusive().configure(9, 10, "Temp".into(), "C".into());
/// ```
///
/// ```compile_fail
/// use labibus_slave::{sim::SimHal, Slave};
///
/// let slave = Slave::new(SimHal::new());
/// let _ = slave.exclusive().take_pending(9);
/// ```
pub struct Slave<H: BusHal> {
    hal: H,
    pins: DirectionPins,
    uart: UartConfig,
    registry: Mutex<Registry>,
    bus_setup: Once,
}

impl<H: BusHal> Slave<H> {
    /// Create a slave on the default direction pins and bus framing.
    ///
    /// Nothing touches the hardware until the first device is configured.
    pub fn new(hal: H) -> Self {
        Self::with_pins(hal, DirectionPins::default())
    }

    /// Create a slave using custom transceiver control pins.
    pub fn with_pins(hal: H, pins: DirectionPins) -> Self {
        Slave {
            hal,
            pins,
            uart: UartConfig::LABIBUS,
            registry: Mutex::new(Registry::new()),
            bus_setup: Once::new(),
        }
    }

    /// The hardware handle.
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Lock the registry inside a critical section.
    pub(crate) fn exclusive(&self) -> Exclusive<'_, H> {
        let irq = InterruptGuard::new(&self.hal);
        Exclusive {
            registry: self.registry.lock(),
            _irq: irq,
        }
    }

    /// Configure a sensor device.
    ///
    /// Reconfiguring an existing id replaces it in place. The first successful
    /// call also sets up the UART and the transceiver and starts listening.
    pub fn configure(
        &self,
        device_id: u8,
        poll_interval: u16,
        description: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
    ) -> RegistryResult<usize> {
        let mut registry = self.exclusive();
        let result = registry.configure(device_id, poll_interval, description.into(), unit.into());
        match &result {
            Ok(index) => {
                log::debug!("device 0x{:02x} configured in slot {}", device_id, index);
                self.bus_setup.call_once(|| self.setup_bus());
            }
            Err(e) => log::debug!("configure ignored: {}", e),
        }
        result
    }

    /// Supply a new reading; it goes out on the next poll. Unknown ids are ignored.
    pub fn set_value(&self, device_id: u8, value: f32) -> bool {
        self.exclusive().set_value(device_id, value)
    }

    /// Number of configured devices.
    pub fn device_count(&self) -> usize {
        self.exclusive().device_count()
    }

    /// Snapshot of a configured device.
    pub fn device(&self, device_id: u8) -> Option<DeviceSlot> {
        self.exclusive().lookup(device_id).cloned()
    }

    /// Validate a complete request line and answer it if it is ours.
    pub fn handle_frame(&self, frame: &[u8]) {
        let Some(request) = parse_request(frame) else {
            return;
        };
        match request.kind {
            RequestKind::Discover => self.discover(request.device_id),
            RequestKind::Poll => self.poll(request.device_id),
        }
    }

    fn discover(&self, device_id: u8) {
        let Some(slot) = self.device(device_id) else {
            log::trace!("discover 0x{:02x}: not ours", device_id);
            return;
        };
        let body = encode_discovery(&slot);
        self.transmitter().send_reply(body.as_slice());
        log::debug!("discover 0x{:02x}: replied", device_id);
    }

    fn poll(&self, device_id: u8) {
        let Some(pending) = self.exclusive().take_pending(device_id) else {
            log::trace!("poll 0x{:02x}: unknown device or nothing new", device_id);
            return;
        };
        let body = encode_poll(&pending);
        self.transmitter().send_reply(body.as_slice());
        log::debug!("poll 0x{:02x}: sent {}", device_id, pending.value);
    }

    fn transmitter(&self) -> Transmitter<'_, H> {
        Transmitter::new(&self.hal, self.pins)
    }

    fn setup_bus(&self) {
        self.hal.configure_uart(&self.uart);
        let direction = BusDirection::new(&self.hal, self.pins);
        direction.setup_pins();
        direction.receive_mode();
        self.hal.set_rx_interrupt(true);
        log::debug!("bus set up at {} baud", self.uart.baud);
    }
}

/// Receive-interrupt side of a [`Slave`].
///
/// Exactly one handler should exist per slave; it owns the partial request line.
pub struct RxHandler<H: BusHal> {
    slave: Arc<Slave<H>>,
    assembler: FrameAssembler,
}

impl<H: BusHal> RxHandler<H> {
    /// Create the handler for a slave.
    pub fn new(slave: Arc<Slave<H>>) -> Self {
        RxHandler {
            slave,
            assembler: FrameAssembler::new(),
        }
    }

    /// The slave this handler serves.
    pub fn slave(&self) -> &Arc<Slave<H>> {
        &self.slave
    }

    /// Interrupt entry point: read the received byte and process it.
    pub fn on_rx_interrupt(&mut self) {
        let byte = self.slave.hal().read_byte();
        self.on_byte(byte);
    }

    /// Process one received byte.
    ///
    /// A completed line is handled with this interrupt masked but every other
    /// interrupt source live, since answering includes a full transmission.
    pub fn on_byte(&mut self, byte: u8) {
        let slave = &self.slave;
        self.assembler.push(byte, |frame| {
            let _mask = RxMaskGuard::new(slave.hal());
            slave.handle_frame(frame);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Level, PIN_DE, PIN_RE};
    use crate::sim::{HalEvent, SimHal};
    use labibus_codec::{crc16_of, encode_hex_u16, SYNC_BYTE};

    fn request_line(id: u8, kind: u8) -> Vec<u8> {
        let mut line = format!("?{:02x}:{}|", id, kind as char).into_bytes();
        let crc = crc16_of(&line);
        line.extend_from_slice(&encode_hex_u16(crc));
        line.extend_from_slice(b"\r\n");
        line
    }

    fn expected_reply(body: &[u8]) -> Vec<u8> {
        let mut out = vec![SYNC_BYTE];
        out.extend_from_slice(body);
        out.extend_from_slice(&encode_hex_u16(crc16_of(body)));
        out.extend_from_slice(b"\r\n");
        out
    }

    fn node() -> (Arc<Slave<SimHal>>, RxHandler<SimHal>) {
        let slave = Arc::new(Slave::new(SimHal::new()));
        let handler = RxHandler::new(slave.clone());
        (slave, handler)
    }

    fn send(handler: &mut RxHandler<SimHal>, bytes: &[u8]) {
        for &b in bytes {
            handler.slave().hal().latch_rx(b);
            handler.on_rx_interrupt();
        }
    }

    #[test]
    fn test_first_configure_sets_up_bus_once() {
        let (slave, _) = node();
        assert!(slave.hal().uart_config().is_none());
        assert!(slave.configure(1, 10, "", "x").is_err());
        assert!(slave.hal().uart_config().is_none());

        slave.configure(1, 10, "a", "x").unwrap();
        slave.configure(2, 10, "b", "x").unwrap();
        slave.configure(1, 10, "c", "x").unwrap();

        let uart_setups = slave
            .hal()
            .events()
            .iter()
            .filter(|e| matches!(e, HalEvent::UartConfigured(_)))
            .count();
        assert_eq!(uart_setups, 1);
        assert_eq!(slave.hal().uart_config(), Some(UartConfig::LABIBUS));
        assert!(slave.hal().rx_interrupt_enabled());
        assert_eq!(slave.hal().pin_level(PIN_DE), Some(Level::Low));
        assert_eq!(slave.hal().pin_level(PIN_RE), Some(Level::Low));
        assert_eq!(slave.device_count(), 2);
    }

    #[test]
    fn test_mainline_value_survives_until_polled() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "Temp", "C").unwrap();
        assert!(slave.hal().rx_interrupt_enabled());
        assert_eq!(slave.hal().uart_config(), Some(UartConfig::LABIBUS));

        slave.set_value(9, 23.5);
        // Inspecting the device from mainline leaves the value pending.
        assert!(slave.device(9).unwrap().have_value);
        assert_eq!(slave.device_count(), 1);

        send(&mut handler, &request_line(9, b'P'));
        assert_eq!(slave.hal().take_wire(), expected_reply(b"!09:P23.500000|"));
    }

    #[test]
    fn test_mainline_calls_run_with_interrupts_masked() {
        let (slave, _) = node();
        slave.configure(1, 10, "a", "x").unwrap();
        slave.hal().clear_events();
        slave.set_value(1, 2.0);
        assert_eq!(
            slave.hal().events(),
            vec![HalEvent::Interrupts(false), HalEvent::Interrupts(true)]
        );
        assert!(slave.hal().interrupts_enabled());
    }

    #[test]
    fn test_discovery_round() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "Temperature room 2", "degree C").unwrap();
        send(&mut handler, &request_line(9, b'D'));
        assert_eq!(
            slave.hal().take_wire(),
            expected_reply(b"!09:D10|Temperature room 2|degree C|")
        );
    }

    #[test]
    fn test_poll_delivers_value_once() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "Temperature room 2", "degree C").unwrap();

        send(&mut handler, &request_line(9, b'P'));
        assert!(slave.hal().take_wire().is_empty());

        slave.set_value(9, 23.5);
        send(&mut handler, &request_line(9, b'P'));
        assert_eq!(slave.hal().take_wire(), expected_reply(b"!09:P23.500000|"));

        send(&mut handler, &request_line(9, b'P'));
        assert!(slave.hal().take_wire().is_empty());
        assert!(!slave.device(9).unwrap().have_value);
    }

    #[test]
    fn test_other_devices_stay_silent() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "a", "b").unwrap();
        slave.set_value(9, 1.0);
        send(&mut handler, &request_line(0x7f, b'D'));
        send(&mut handler, &request_line(0x7f, b'P'));
        assert!(slave.hal().take_wire().is_empty());
    }

    #[test]
    fn test_corrupted_crc_stays_silent() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "a", "b").unwrap();
        let mut line = request_line(9, b'D');
        line[7] = if line[7] == b'0' { b'1' } else { b'0' };
        send(&mut handler, &line);
        assert!(slave.hal().take_wire().is_empty());
    }

    #[test]
    fn test_receive_interrupt_masked_while_replying() {
        let (slave, mut handler) = node();
        slave.configure(9, 10, "a", "b").unwrap();
        slave.hal().disable_interrupts();
        slave.hal().clear_events();

        send(&mut handler, &request_line(9, b'D'));

        let events = slave.hal().events();
        let first_write = events
            .iter()
            .position(|e| matches!(e, HalEvent::Write(_)))
            .unwrap();
        let masked = events
            .iter()
            .position(|e| *e == HalEvent::RxInterrupt(false))
            .unwrap();
        let rearmed = events
            .iter()
            .rposition(|e| *e == HalEvent::RxInterrupt(true))
            .unwrap();
        assert!(masked < first_write);
        assert_eq!(rearmed, events.len() - 1);
        assert!(slave.hal().rx_interrupt_enabled());
        assert!(!slave.hal().interrupts_enabled());
    }
}
