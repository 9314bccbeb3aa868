//! A simulated microcontroller for running the slave engine off-target.
//!
//! [`SimHal`] implements [`BusHal`] over plain memory. It models just enough of
//! the AVR UART to make the transmit-complete handshake meaningful: a written
//! byte stays "in flight" until the next write or the next status poll, at
//! which point it lands on the wire and the transmit-complete flag is set.
//! Every register access can be recorded as a [`HalEvent`] for tests to
//! inspect.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::hal::{BusHal, Level, Pin, UartConfig};

/// Callback receiving each byte as it leaves the UART.
pub type TxSink = Box<dyn Fn(u8) + Send + Sync>;

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalEvent {
    /// Pin configured as output.
    PinMode(Pin),
    /// Pin driven.
    Pin(Pin, Level),
    /// UART configured.
    UartConfigured(UartConfig),
    /// Receive interrupt enabled or disabled.
    RxInterrupt(bool),
    /// Global interrupts enabled or disabled.
    Interrupts(bool),
    /// Byte written to the transmit data register.
    Write(u8),
    /// Transmit-complete flag cleared.
    ClearTxComplete,
    /// Busy-wait, in microseconds.
    Delay(u32),
}

#[derive(Debug)]
struct SimState {
    record: bool,
    events: Vec<HalEvent>,
    pins: HashMap<Pin, Level>,
    uart: Option<UartConfig>,
    rx_interrupt: bool,
    interrupts: bool,
    rx_data: u8,
    in_flight: Option<u8>,
    tx_complete: bool,
    wire: Vec<u8>,
    delayed_us: u64,
}

impl SimState {
    fn log(&mut self, event: HalEvent) {
        if self.record {
            self.events.push(event);
        }
    }

    /// Finish shifting out the in-flight byte, if any.
    fn complete_in_flight(&mut self) -> Option<u8> {
        let byte = self.in_flight.take()?;
        self.tx_complete = true;
        Some(byte)
    }
}

/// Memory-backed [`BusHal`].
pub struct SimHal {
    state: Mutex<SimState>,
    tx_sink: Option<TxSink>,
}

impl std::fmt::Debug for SimHal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHal")
            .field("state", &*self.state.lock())
            .field("tx_sink", &self.tx_sink.is_some())
            .finish()
    }
}

impl Default for SimHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHal {
    /// Create a simulated controller that records every register access and
    /// keeps transmitted bytes for [`SimHal::wire`].
    ///
    /// Global interrupts start enabled, as after Arduino startup.
    pub fn new() -> Self {
        SimHal {
            state: Mutex::new(SimState {
                record: true,
                events: Vec::new(),
                pins: HashMap::new(),
                uart: None,
                rx_interrupt: false,
                interrupts: true,
                rx_data: 0,
                in_flight: None,
                tx_complete: false,
                wire: Vec::new(),
                delayed_us: 0,
            }),
            tx_sink: None,
        }
    }

    /// Send transmitted bytes to `sink` instead of keeping them.
    pub fn with_tx_sink(mut self, sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.tx_sink = Some(Box::new(sink));
        self
    }

    /// Stop recording register accesses (for long-running simulations).
    pub fn without_event_log(self) -> Self {
        self.state.lock().record = false;
        self
    }

    /// Latch a received byte into the receive data register.
    pub fn latch_rx(&self, byte: u8) {
        self.state.lock().rx_data = byte;
    }

    /// Recorded register accesses, oldest first.
    pub fn events(&self) -> Vec<HalEvent> {
        self.state.lock().events.clone()
    }

    /// Forget recorded register accesses.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Bytes that have fully left the UART (when no sink is installed).
    pub fn wire(&self) -> Vec<u8> {
        self.state.lock().wire.clone()
    }

    /// Take the bytes that have left the UART.
    pub fn take_wire(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().wire)
    }

    /// Current level of a pin, if it was ever driven.
    pub fn pin_level(&self, pin: Pin) -> Option<Level> {
        self.state.lock().pins.get(&pin).copied()
    }

    /// Last UART configuration applied.
    pub fn uart_config(&self) -> Option<UartConfig> {
        self.state.lock().uart
    }

    /// Whether the receive interrupt is enabled.
    pub fn rx_interrupt_enabled(&self) -> bool {
        self.state.lock().rx_interrupt
    }

    /// Whether global interrupts are enabled.
    pub fn interrupts_enabled(&self) -> bool {
        self.state.lock().interrupts
    }

    /// Total busy-wait time requested, in microseconds.
    pub fn delayed_us(&self) -> u64 {
        self.state.lock().delayed_us
    }

    fn emit(&self, byte: Option<u8>) {
        let Some(byte) = byte else { return };
        match &self.tx_sink {
            Some(sink) => sink(byte),
            None => self.state.lock().wire.push(byte),
        }
    }
}

impl BusHal for SimHal {
    fn pin_mode_output(&self, pin: Pin) {
        self.state.lock().log(HalEvent::PinMode(pin));
    }

    fn set_pin(&self, pin: Pin, level: Level) {
        let mut state = self.state.lock();
        state.pins.insert(pin, level);
        state.log(HalEvent::Pin(pin, level));
    }

    fn configure_uart(&self, config: &UartConfig) {
        let mut state = self.state.lock();
        state.uart = Some(*config);
        state.log(HalEvent::UartConfigured(*config));
    }

    fn set_rx_interrupt(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.rx_interrupt = enabled;
        state.log(HalEvent::RxInterrupt(enabled));
    }

    fn disable_interrupts(&self) -> bool {
        let mut state = self.state.lock();
        let was = state.interrupts;
        state.interrupts = false;
        state.log(HalEvent::Interrupts(false));
        was
    }

    fn enable_interrupts(&self) {
        let mut state = self.state.lock();
        state.interrupts = true;
        state.log(HalEvent::Interrupts(true));
    }

    fn tx_ready(&self) -> bool {
        true
    }

    fn write_byte(&self, byte: u8) {
        let done = {
            let mut state = self.state.lock();
            let done = state.complete_in_flight();
            state.in_flight = Some(byte);
            state.log(HalEvent::Write(byte));
            done
        };
        self.emit(done);
    }

    fn read_byte(&self) -> u8 {
        self.state.lock().rx_data
    }

    fn tx_complete(&self) -> bool {
        let (done, flag) = {
            let mut state = self.state.lock();
            let done = state.complete_in_flight();
            (done, state.tx_complete)
        };
        self.emit(done);
        flag
    }

    fn clear_tx_complete(&self) {
        let mut state = self.state.lock();
        state.tx_complete = false;
        state.log(HalEvent::ClearTxComplete);
    }

    fn delay_us(&self, us: u32) {
        let mut state = self.state.lock();
        state.delayed_us += u64::from(us);
        state.log(HalEvent::Delay(us));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_byte_lands_on_completion_poll() {
        let hal = SimHal::new();
        hal.write_byte(b'a');
        hal.clear_tx_complete();
        assert!(hal.wire().is_empty());
        assert!(hal.tx_complete());
        assert_eq!(hal.wire(), b"a");
    }

    #[test]
    fn test_previous_byte_completes_on_next_write() {
        let hal = SimHal::new();
        hal.write_byte(b'a');
        hal.clear_tx_complete();
        hal.write_byte(b'b');
        hal.clear_tx_complete();
        // 'a' finished when 'b' was written, but its completion was cleared.
        assert_eq!(hal.wire(), b"a");
        assert!(hal.tx_complete());
        assert_eq!(hal.wire(), b"ab");
    }

    #[test]
    fn test_tx_sink_receives_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let hal = SimHal::new()
            .with_tx_sink(move |b| sink_seen.lock().push(b))
            .without_event_log();
        hal.write_byte(1);
        hal.write_byte(2);
        hal.tx_complete();
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert!(hal.wire().is_empty());
        assert!(hal.events().is_empty());
    }

    #[test]
    fn test_rx_latch() {
        let hal = SimHal::new();
        hal.latch_rx(b'?');
        assert_eq!(hal.read_byte(), b'?');
    }
}
