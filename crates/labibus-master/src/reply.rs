//! Reply decoding.
//!
//! A reply line (sync byte and line end already stripped) is a body followed by
//! four hex CRC digits:
//!
//! ```text
//! !09:D10|Temperature room 2|degree C|cccc
//! !09:P23.500000|cccc
//! ```

use labibus_codec::{
    crc16_of, decode_hex_u8, parse_hex_u16, unquote, RequestKind, FIELD_SEPARATOR, REPLY_MARKER,
};

use crate::error::{MasterError, MasterResult};

/// Header `!II:X` length.
const HEADER_LEN: usize = 5;

/// CRC digit count.
const CRC_LEN: usize = 4;

/// Answer to a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReply {
    /// Device that answered.
    pub device_id: u8,
    /// Suggested poll interval, seconds.
    pub poll_interval: u16,
    /// Device description.
    pub description: String,
    /// Unit of the readings.
    pub unit: String,
}

/// Answer to a poll request.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReply {
    /// Device that answered.
    pub device_id: u8,
    /// The reading.
    pub value: f32,
    /// The reading as transmitted.
    pub text: String,
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Discovery answer.
    Discovery(DiscoveryReply),
    /// Poll answer.
    Poll(PollReply),
}

impl Reply {
    /// Device that answered.
    pub fn device_id(&self) -> u8 {
        match self {
            Reply::Discovery(r) => r.device_id,
            Reply::Poll(r) => r.device_id,
        }
    }

    /// Which request this answers.
    pub fn kind(&self) -> RequestKind {
        match self {
            Reply::Discovery(_) => RequestKind::Discover,
            Reply::Poll(_) => RequestKind::Poll,
        }
    }

    /// Check that this is the answer to the given request.
    pub fn ensure_answers(self, device_id: u8, kind: RequestKind) -> MasterResult<Self> {
        if self.device_id() == device_id && self.kind() == kind {
            Ok(self)
        } else {
            Err(MasterError::Unexpected {
                expected: format!("{} of 0x{:02x}", kind, device_id),
                actual: format!("{} of 0x{:02x}", self.kind(), self.device_id()),
            })
        }
    }

    /// Decode a reply line.
    pub fn decode(line: &[u8]) -> MasterResult<Self> {
        if line.first() != Some(&REPLY_MARKER) {
            return Err(MasterError::MissingMarker);
        }
        if line.len() < HEADER_LEN + 1 + CRC_LEN {
            return Err(MasterError::TooShort(line.len()));
        }

        let (body, crc_digits) = line.split_at(line.len() - CRC_LEN);
        let received = parse_hex_u16(crc_digits)?;
        let computed = crc16_of(body);
        if computed != received {
            return Err(MasterError::CrcMismatch { computed, received });
        }

        let device_id = decode_hex_u8([body[1], body[2]]);
        if !body[1].is_ascii_hexdigit() || !body[2].is_ascii_hexdigit() || body[3] != b':' {
            return Err(MasterError::MalformedBody("bad header".to_string()));
        }
        let fields = split_fields(&body[HEADER_LEN..])?;

        match RequestKind::from_marker(body[4]) {
            Some(RequestKind::Discover) => {
                let [interval, description, unit] = fields.as_slice() else {
                    return Err(MasterError::MalformedBody(format!(
                        "discovery reply has {} fields",
                        fields.len()
                    )));
                };
                let interval = text_field(interval, "poll interval")?;
                let poll_interval = interval
                    .parse()
                    .map_err(|_| MasterError::InvalidNumber(interval))?;
                Ok(Reply::Discovery(DiscoveryReply {
                    device_id,
                    poll_interval,
                    description: text_field(description, "description")?,
                    unit: text_field(unit, "unit")?,
                }))
            }
            Some(RequestKind::Poll) => {
                let [value] = fields.as_slice() else {
                    return Err(MasterError::MalformedBody(format!(
                        "poll reply has {} fields",
                        fields.len()
                    )));
                };
                let text = text_field(value, "value")?;
                let value = text
                    .parse()
                    .map_err(|_| MasterError::InvalidNumber(text.clone()))?;
                Ok(Reply::Poll(PollReply {
                    device_id,
                    value,
                    text,
                }))
            }
            None => Err(MasterError::UnknownKind(body[4])),
        }
    }
}

/// Split `a|b|c|` into its fields; the trailing separator is mandatory.
fn split_fields(rest: &[u8]) -> MasterResult<Vec<&[u8]>> {
    let Some((&FIELD_SEPARATOR, content)) = rest.split_last() else {
        return Err(MasterError::MalformedBody(
            "missing trailing separator".to_string(),
        ));
    };
    Ok(content.split(|&b| b == FIELD_SEPARATOR).collect())
}

fn text_field(raw: &[u8], name: &'static str) -> MasterResult<String> {
    String::from_utf8(unquote(raw)?).map_err(|_| MasterError::InvalidUtf8(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use labibus_codec::encode_hex_u16;

    fn line(body: &[u8]) -> Vec<u8> {
        let mut out = body.to_vec();
        out.extend_from_slice(&encode_hex_u16(crc16_of(body)));
        out
    }

    #[test]
    fn test_decode_discovery() {
        let reply = Reply::decode(&line(b"!09:D10|Temperature room 2|degree C|")).unwrap();
        assert_eq!(
            reply,
            Reply::Discovery(DiscoveryReply {
                device_id: 9,
                poll_interval: 10,
                description: "Temperature room 2".to_string(),
                unit: "degree C".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_escaped_fields() {
        let reply = Reply::decode(&line(b"!09:D5|a\\7cb|\\c2\\b0C|")).unwrap();
        match reply {
            Reply::Discovery(d) => {
                assert_eq!(d.description, "a|b");
                assert_eq!(d.unit, "\u{b0}C");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_poll() {
        let reply = Reply::decode(&line(b"!7f:P-1.250000|")).unwrap();
        assert_eq!(reply.device_id(), 0x7f);
        assert_eq!(reply.kind(), RequestKind::Poll);
        match reply {
            Reply::Poll(p) => {
                assert_eq!(p.value, -1.25);
                assert_eq!(p.text, "-1.250000");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_crc() {
        let mut l = line(b"!09:P1.000000|");
        let last = l.len() - 1;
        l[last] = if l[last] == b'0' { b'1' } else { b'0' };
        assert!(matches!(
            Reply::decode(&l),
            Err(MasterError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(Reply::decode(b"?09:P|0000"), Err(MasterError::MissingMarker));
        assert_eq!(Reply::decode(b"!09:P"), Err(MasterError::TooShort(5)));
        assert!(matches!(
            Reply::decode(&line(b"!09:P1|2|")),
            Err(MasterError::MalformedBody(_))
        ));
        assert!(matches!(
            Reply::decode(&line(b"!09:P1.0")),
            Err(MasterError::MalformedBody(_))
        ));
        assert_eq!(
            Reply::decode(&line(b"!09:X1|")),
            Err(MasterError::UnknownKind(b'X'))
        );
        assert!(matches!(
            Reply::decode(&line(b"!09:Pabc|")),
            Err(MasterError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_ensure_answers() {
        let reply = Reply::decode(&line(b"!09:P1.000000|")).unwrap();
        assert!(reply.clone().ensure_answers(9, RequestKind::Poll).is_ok());
        assert!(reply.clone().ensure_answers(8, RequestKind::Poll).is_err());
        assert!(reply.ensure_answers(9, RequestKind::Discover).is_err());
    }
}
