//! Reply construction and transmission.
//!
//! Reply bodies are built into a bounded buffer and then clocked out by the
//! [`Transmitter`], which owns the whole bus turnaround: switch to transmit,
//! send the sync byte, the body and its CRC, wait for the last stop bit, and
//! switch back to receive.

use core::fmt::Write;

use labibus_codec::{
    encode_hex_u16, BoundedBuf, Crc16, RequestKind, FIELD_SEPARATOR, MAX_REQ, REPLY_MARKER,
    SYNC_BYTE,
};

use crate::direction::{BusDirection, DirectionPins};
use crate::hal::{BusHal, InterruptGuard};
use crate::registry::{DeviceSlot, PendingValue};

/// Maximum reply body length. Longer bodies are truncated.
pub const MAX_REPLY: usize = MAX_REQ - 1;

/// A reply body under construction.
pub type ResponseBuffer = BoundedBuf<MAX_REPLY>;

/// Delay before driving the bus, so the master has turned its transceiver around.
pub const TURNAROUND_DELAY_MS: u32 = 1;

/// Driver enable settle time. The transceiver needs about 200 ns.
pub const DRIVER_SETTLE_US: u32 = 1;

fn push_header(buf: &mut ResponseBuffer, device_id: u8, kind: RequestKind) {
    buf.push(REPLY_MARKER);
    let _ = write!(buf, "{:02x}:", device_id);
    buf.push(kind.marker());
}

/// Body of a discovery reply: `!II:D<interval>|<description>|<unit>|`.
pub fn encode_discovery(slot: &DeviceSlot) -> ResponseBuffer {
    let mut buf = ResponseBuffer::new();
    push_header(&mut buf, slot.device_id, RequestKind::Discover);
    let _ = write!(buf, "{}", slot.poll_interval);
    buf.push(FIELD_SEPARATOR);
    buf.push_quoted_str(&slot.description);
    buf.push(FIELD_SEPARATOR);
    buf.push_quoted_str(&slot.unit);
    buf.push(FIELD_SEPARATOR);
    buf
}

/// Body of a poll reply: `!II:P<value>|`, value with six fraction digits.
pub fn encode_poll(pending: &PendingValue) -> ResponseBuffer {
    let mut value = BoundedBuf::<64>::new();
    let _ = write!(value, "{:.6}", pending.value);

    let mut buf = ResponseBuffer::new();
    push_header(&mut buf, pending.device_id, RequestKind::Poll);
    for &b in value.as_slice() {
        buf.push_quoted(b);
    }
    buf.push(FIELD_SEPARATOR);
    buf
}

/// Drives a reply out through the UART and the transceiver.
pub struct Transmitter<'a, H: BusHal + ?Sized> {
    hal: &'a H,
    direction: BusDirection<'a, H>,
}

impl<'a, H: BusHal + ?Sized> Transmitter<'a, H> {
    /// Create a transmitter using the given direction pins.
    pub fn new(hal: &'a H, pins: DirectionPins) -> Self {
        Transmitter {
            hal,
            direction: BusDirection::new(hal, pins),
        }
    }

    /// Send one reply: sync byte, body, CRC, line end.
    ///
    /// Blocks until the last byte has fully left the UART; the transceiver is
    /// back in receive mode on return.
    pub fn send_reply(&self, body: &[u8]) {
        self.hal.delay_ms(TURNAROUND_DELAY_MS);
        let _window = self.direction.transmit();
        self.hal.delay_us(DRIVER_SETTLE_US);

        // All-ones byte: no start bit for a whole character time, so the
        // master UART can lock onto the next byte boundary.
        self.putc(SYNC_BYTE);

        let mut crc = Crc16::new();
        for &b in body {
            crc.update(b);
            self.putc(b);
        }
        for digit in encode_hex_u16(crc.value()) {
            self.putc(digit);
        }
        self.putc(b'\r');
        self.putc(b'\n');

        self.wait_for_tx_complete();
    }

    /// Write one byte.
    ///
    /// The transmit-complete flag only clears on a write or an explicit clear,
    /// so it is cleared right after queueing each byte. Both happen with
    /// interrupts masked: an interrupt between the two could push the clear past
    /// the point where this very byte completes, and the completion would be
    /// lost.
    fn putc(&self, byte: u8) {
        while !self.hal.tx_ready() {
            core::hint::spin_loop();
        }
        let _cs = InterruptGuard::new(self.hal);
        self.hal.write_byte(byte);
        self.hal.clear_tx_complete();
    }

    fn wait_for_tx_complete(&self) {
        while !self.hal.tx_complete() {
            core::hint::spin_loop();
        }
    }
}
