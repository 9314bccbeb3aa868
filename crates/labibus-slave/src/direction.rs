//! RS485 transceiver direction control.
//!
//! The transceiver either listens (receiver enabled, driver off) or drives the
//! bus (driver on, receiver disabled), never both. Receive mode is the resting
//! state; transmit mode is only held for the lifetime of a [`TransmitWindow`].

use crate::hal::{BusHal, Level, Pin, PIN_DE, PIN_RE};

/// The two transceiver control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionPins {
    /// Driver enable (high drives the bus).
    pub de: Pin,
    /// Receiver enable, active low.
    pub re: Pin,
}

impl Default for DirectionPins {
    fn default() -> Self {
        DirectionPins {
            de: PIN_DE,
            re: PIN_RE,
        }
    }
}

/// Switches the transceiver between receive and transmit.
#[derive(Debug)]
pub struct BusDirection<'a, H: BusHal + ?Sized> {
    hal: &'a H,
    pins: DirectionPins,
}

impl<'a, H: BusHal + ?Sized> BusDirection<'a, H> {
    /// Create a controller for the given pins.
    pub fn new(hal: &'a H, pins: DirectionPins) -> Self {
        BusDirection { hal, pins }
    }

    /// Configure both control pins as outputs.
    pub fn setup_pins(&self) {
        self.hal.pin_mode_output(self.pins.re);
        self.hal.pin_mode_output(self.pins.de);
    }

    /// Release the bus and listen. Driver goes off before the receiver comes on.
    pub fn receive_mode(&self) {
        self.hal.set_pin(self.pins.de, Level::Low);
        self.hal.set_pin(self.pins.re, Level::Low);
    }

    /// Drive the bus. Receiver goes off before the driver comes on.
    pub fn transmit_mode(&self) {
        self.hal.set_pin(self.pins.re, Level::High);
        self.hal.set_pin(self.pins.de, Level::High);
    }

    /// Enter transmit mode until the returned window is dropped.
    pub fn transmit(&self) -> TransmitWindow<'a, H> {
        self.transmit_mode();
        TransmitWindow {
            direction: BusDirection {
                hal: self.hal,
                pins: self.pins,
            },
        }
    }
}

/// Transmit mode held open; dropping it returns the transceiver to receive mode.
#[must_use = "the transceiver returns to receive mode as soon as the window is dropped"]
pub struct TransmitWindow<'a, H: BusHal + ?Sized> {
    direction: BusDirection<'a, H>,
}

impl<H: BusHal + ?Sized> Drop for TransmitWindow<'_, H> {
    fn drop(&mut self) {
        self.direction.receive_mode();
    }
}
