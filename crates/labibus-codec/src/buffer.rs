//! Fixed-capacity byte buffers.
//!
//! The slave runs with a few hundred bytes of RAM, so request and reply buffers
//! have a hard upper bound. Every append primitive here silently stops once the
//! bound is reached: a reply with an over-long description goes out truncated
//! rather than failing.

use crate::quote::quote_append;

/// A byte buffer holding at most `N` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedBuf<const N: usize> {
    bytes: heapless::Vec<u8, N>,
}

impl<const N: usize> BoundedBuf<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        BoundedBuf {
            bytes: heapless::Vec::new(),
        }
    }

    /// Maximum number of bytes the buffer can hold.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether another byte would be dropped.
    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// Append one byte. Returns `false` if it was dropped.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    /// Append bytes verbatim, stopping at capacity.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if !self.push(b) {
                break;
            }
        }
    }

    /// Append a string verbatim, stopping at capacity.
    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Append one byte using the quoted encoding.
    pub fn push_quoted(&mut self, byte: u8) {
        quote_append(self, byte);
    }

    /// Append a string using the quoted encoding, stopping at capacity.
    pub fn push_quoted_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.push_quoted(b);
        }
    }

    /// Drop all content.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// View the content.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl<const N: usize> AsRef<[u8]> for BoundedBuf<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<const N: usize> core::fmt::Write for BoundedBuf<N> {
    /// Formatting into a full buffer truncates instead of failing.
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn test_push_stops_at_capacity() {
        let mut buf = BoundedBuf::<4>::new();
        assert!(buf.push(b'a'));
        buf.push_str("bcdef");
        assert_eq!(buf.as_slice(), b"abcd");
        assert!(buf.is_full());
        assert!(!buf.push(b'x'));
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_write_fmt_truncates() {
        let mut buf = BoundedBuf::<6>::new();
        write!(buf, "!{:02x}:D{}|", 9u8, 12345u16).unwrap();
        assert_eq!(buf.as_slice(), b"!09:D1");
    }

    #[test]
    fn test_quoted_escape_is_cut_mid_sequence() {
        let mut buf = BoundedBuf::<3>::new();
        buf.push(b'a');
        buf.push_quoted(b'|');
        assert_eq!(buf.as_slice(), b"a\\7");
    }

    #[test]
    fn test_clear() {
        let mut buf = BoundedBuf::<8>::new();
        buf.push_str("hello");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 8);
    }
}
