//! Request kinds shared by both ends of the bus.

/// What a master asks of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `D`: describe yourself (poll interval, description, unit).
    Discover,
    /// `P`: report the latest sensor value, if there is a new one.
    Poll,
}

impl RequestKind {
    /// Parse the kind marker byte.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'D' => Some(RequestKind::Discover),
            b'P' => Some(RequestKind::Poll),
            _ => None,
        }
    }

    /// The kind marker byte.
    pub const fn marker(self) -> u8 {
        match self {
            RequestKind::Discover => b'D',
            RequestKind::Poll => b'P',
        }
    }
}

impl core::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequestKind::Discover => write!(f, "discover"),
            RequestKind::Poll => write!(f, "poll"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        for kind in [RequestKind::Discover, RequestKind::Poll] {
            assert_eq!(RequestKind::from_marker(kind.marker()), Some(kind));
        }
        assert_eq!(RequestKind::from_marker(b'd'), None);
        assert_eq!(RequestKind::from_marker(b'X'), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(RequestKind::Discover.to_string(), "discover");
        assert_eq!(RequestKind::Poll.to_string(), "poll");
    }
}
