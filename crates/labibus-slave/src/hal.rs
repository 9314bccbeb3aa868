//! Hardware capability used by the slave engine.
//!
//! The engine never touches registers directly. Everything it needs from the
//! microcontroller (output pins, UART setup, interrupt masking, the UART data
//! and status registers, busy-wait delays) goes through [`BusHal`]. Methods take
//! `&self` because they stand for register accesses that are valid from both
//! mainline code and the receive interrupt.
//!
//! Interrupt masking is only ever done through the scoped guards in this
//! module, so every disable has a matching, deterministic restore.

/// A digital output pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(pub u8);

/// Driver enable pin of the RS485 transceiver.
pub const PIN_DE: Pin = Pin(7);

/// Receiver enable pin of the RS485 transceiver (active low).
pub const PIN_RE: Pin = Pin(6);

/// Output level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Driven low.
    Low,
    /// Driven high.
    High,
}

/// UART parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// UART baud rate and framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UartConfig {
    /// Bits per second.
    pub baud: u32,
    /// Data bits per character.
    pub data_bits: u8,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: u8,
    /// Double-speed (8x oversampling) mode.
    pub double_speed: bool,
}

impl UartConfig {
    /// The only framing the bus uses: 115200 baud, 8N1, double speed.
    pub const LABIBUS: UartConfig = UartConfig {
        baud: 115_200,
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
        double_speed: true,
    };

    /// Baud rate register value for a given CPU clock, rounded to nearest.
    ///
    /// Returns `None` when the clock is too slow for the baud rate.
    pub fn baud_divisor(&self, cpu_hz: u32) -> Option<u16> {
        let oversample: u64 = if self.double_speed { 8 } else { 16 };
        let denom = oversample * u64::from(self.baud);
        let ratio = (u64::from(cpu_hz) + denom / 2) / denom;
        ratio.checked_sub(1).and_then(|d| u16::try_from(d).ok())
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        UartConfig::LABIBUS
    }
}

/// Register-level capability the slave engine runs on.
pub trait BusHal {
    /// Configure a pin as a push-pull output.
    fn pin_mode_output(&self, pin: Pin);

    /// Drive an output pin.
    fn set_pin(&self, pin: Pin, level: Level);

    /// Configure baud rate and framing, and enable transmitter and receiver.
    fn configure_uart(&self, config: &UartConfig);

    /// Enable or disable the byte-received interrupt.
    fn set_rx_interrupt(&self, enabled: bool);

    /// Mask global interrupt delivery. Returns whether it was enabled before.
    fn disable_interrupts(&self) -> bool;

    /// Unmask global interrupt delivery.
    fn enable_interrupts(&self);

    /// Whether the transmit data register can accept another byte.
    fn tx_ready(&self) -> bool;

    /// Queue a byte in the transmit data register.
    fn write_byte(&self, byte: u8);

    /// Read the receive data register.
    fn read_byte(&self) -> u8;

    /// Whether the transmit-complete flag is set.
    fn tx_complete(&self) -> bool;

    /// Clear the transmit-complete flag.
    fn clear_tx_complete(&self);

    /// Busy-wait for the given number of microseconds.
    fn delay_us(&self, us: u32);

    /// Busy-wait for the given number of milliseconds.
    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

// ============================================================================
// Scoped Guards
// ============================================================================

/// Critical section: global interrupts masked until dropped.
///
/// Restores the previous state on drop, so guards nest.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct InterruptGuard<'a, H: BusHal + ?Sized> {
    hal: &'a H,
    was_enabled: bool,
}

impl<'a, H: BusHal + ?Sized> InterruptGuard<'a, H> {
    /// Mask interrupts.
    pub fn new(hal: &'a H) -> Self {
        let was_enabled = hal.disable_interrupts();
        InterruptGuard { hal, was_enabled }
    }
}

impl<H: BusHal + ?Sized> Drop for InterruptGuard<'_, H> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.hal.enable_interrupts();
        }
    }
}

/// Receive-interrupt mask for the duration of request processing.
///
/// Taken from inside the receive interrupt: masks the receive interrupt itself
/// and re-enables every other interrupt source. On drop, global interrupts are
/// masked again (as they are on interrupt entry) and the receive interrupt is
/// re-armed.
#[must_use = "the receive interrupt is re-armed as soon as the guard is dropped"]
pub struct RxMaskGuard<'a, H: BusHal + ?Sized> {
    hal: &'a H,
}

impl<'a, H: BusHal + ?Sized> RxMaskGuard<'a, H> {
    /// Mask the receive interrupt and let everything else through.
    pub fn new(hal: &'a H) -> Self {
        hal.set_rx_interrupt(false);
        hal.enable_interrupts();
        RxMaskGuard { hal }
    }
}

impl<H: BusHal + ?Sized> Drop for RxMaskGuard<'_, H> {
    fn drop(&mut self) {
        self.hal.disable_interrupts();
        self.hal.set_rx_interrupt(true);
    }
}
