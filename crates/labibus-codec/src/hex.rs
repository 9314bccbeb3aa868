//! Hex digit conversion.
//!
//! Device ids and CRCs travel as ASCII hex digits, big nibble first. Decoding is
//! deliberately forgiving: any byte that is not a hex digit decodes as 0, and a
//! frame carrying such a byte simply fails its CRC check later on.

use crate::CodecError;

/// Value of a single ASCII hex digit. Non-hex bytes yield 0.
#[inline]
pub fn hex_digit_to_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => 0,
    }
}

/// ASCII hex digit for a nibble value, lowercase for 10..=15.
///
/// Only the low nibble of `value` is used.
#[inline]
pub fn value_to_hex_digit(value: u8) -> u8 {
    let v = value & 0x0f;
    if v <= 9 {
        b'0' + v
    } else {
        b'a' + (v - 10)
    }
}

/// Decode two hex digits into a byte (forgiving, see [`hex_digit_to_value`]).
pub fn decode_hex_u8(digits: [u8; 2]) -> u8 {
    (hex_digit_to_value(digits[0]) << 4) | hex_digit_to_value(digits[1])
}

/// Decode four hex digits into a 16-bit value (forgiving).
pub fn decode_hex_u16(digits: [u8; 4]) -> u16 {
    digits
        .iter()
        .fold(0u16, |acc, &d| (acc << 4) | u16::from(hex_digit_to_value(d)))
}

/// Encode a byte as two lowercase hex digits.
pub fn encode_hex_u8(value: u8) -> [u8; 2] {
    [value_to_hex_digit(value >> 4), value_to_hex_digit(value)]
}

/// Encode a 16-bit value as four lowercase hex digits.
pub fn encode_hex_u16(value: u16) -> [u8; 4] {
    [
        value_to_hex_digit((value >> 12) as u8),
        value_to_hex_digit((value >> 8) as u8),
        value_to_hex_digit((value >> 4) as u8),
        value_to_hex_digit(value as u8),
    ]
}

/// Strict hex digit decoding, for the master side where garbage must be reported.
pub fn parse_hex_digit(c: u8) -> Result<u8, CodecError> {
    if c.is_ascii_hexdigit() {
        Ok(hex_digit_to_value(c))
    } else {
        Err(CodecError::InvalidHexDigit(c))
    }
}

/// Strict decoding of four hex digits.
pub fn parse_hex_u16(digits: &[u8]) -> Result<u16, CodecError> {
    if digits.len() != 4 {
        return Err(CodecError::WrongLength {
            expected: 4,
            actual: digits.len(),
        });
    }
    digits
        .iter()
        .try_fold(0u16, |acc, &d| Ok((acc << 4) | u16::from(parse_hex_digit(d)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_digit_values() {
        assert_eq!(hex_digit_to_value(b'0'), 0);
        assert_eq!(hex_digit_to_value(b'9'), 9);
        assert_eq!(hex_digit_to_value(b'A'), 10);
        assert_eq!(hex_digit_to_value(b'f'), 15);
        assert_eq!(hex_digit_to_value(b'g'), 0);
        assert_eq!(hex_digit_to_value(b':'), 0);
    }

    #[test]
    fn test_lowercase_output() {
        assert_eq!(value_to_hex_digit(10), b'a');
        assert_eq!(value_to_hex_digit(15), b'f');
        assert_eq!(encode_hex_u16(0xbb3d), *b"bb3d");
        assert_eq!(encode_hex_u8(0x09), *b"09");
    }

    #[test]
    fn test_decode_mixed_case() {
        assert_eq!(decode_hex_u16(*b"BB3d"), 0xbb3d);
        assert_eq!(decode_hex_u8(*b"7F"), 0x7f);
    }

    #[test]
    fn test_strict_parse_rejects_garbage() {
        assert_eq!(parse_hex_u16(b"12z4"), Err(CodecError::InvalidHexDigit(b'z')));
        assert!(parse_hex_u16(b"123").is_err());
        assert_eq!(parse_hex_u16(b"a0F1"), Ok(0xa0f1));
    }

    proptest! {
        #[test]
        fn prop_byte_round_trip(b in any::<u8>()) {
            let hi = hex_digit_to_value(value_to_hex_digit(b >> 4));
            let lo = hex_digit_to_value(value_to_hex_digit(b & 0xf));
            prop_assert_eq!((hi << 4) | lo, b);
        }

        #[test]
        fn prop_u16_round_trip(v in any::<u16>()) {
            prop_assert_eq!(decode_hex_u16(encode_hex_u16(v)), v);
        }
    }
}
