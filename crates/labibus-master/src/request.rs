//! Request encoding.

use labibus_codec::{
    crc16_of, encode_hex_u16, encode_hex_u8, RequestKind, FIELD_SEPARATOR, REQUEST_MARKER,
};

/// Encode a request line, terminator included.
///
/// ```rust
/// use labibus_codec::RequestKind;
/// use labibus_master::encode_request;
///
/// let line = encode_request(9, RequestKind::Discover);
/// assert!(line.starts_with(b"?09:D|"));
/// assert_eq!(line.len(), 11);
/// ```
pub fn encode_request(device_id: u8, kind: RequestKind) -> Vec<u8> {
    let mut line = Vec::with_capacity(11);
    line.push(REQUEST_MARKER);
    line.extend_from_slice(&encode_hex_u8(device_id));
    line.push(b':');
    line.push(kind.marker());
    line.push(FIELD_SEPARATOR);
    let crc = crc16_of(&line);
    line.extend_from_slice(&encode_hex_u16(crc));
    line.push(b'\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_poll() {
        let line = encode_request(0x7f, RequestKind::Poll);
        assert_eq!(&line[..6], b"?7f:P|");
        assert_eq!(
            &line[6..10],
            &encode_hex_u16(crc16_of(b"?7f:P|"))
        );
        assert_eq!(line[10], b'\n');
    }
}
