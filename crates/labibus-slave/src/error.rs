//! Error types for the slave engine.
//!
//! Nothing on the bus side ever reports an error: malformed, corrupted or
//! misaddressed traffic is dropped without a reply. These errors only reach the
//! embedding application through the configuration call, and leave the
//! registry untouched.

use thiserror::Error;

/// Reasons a device could not be configured.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The description was empty; such a slot would read as free.
    #[error("device 0x{0:02x} has no description")]
    MissingDescription(u8),

    /// Every slot is taken by another device id.
    #[error("device table full ({capacity} slots), cannot add device 0x{device_id:02x}")]
    Full {
        /// Device that did not fit.
        device_id: u8,
        /// Number of slots.
        capacity: usize,
    },
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
