//! Device registry.
//!
//! A fixed-capacity table of the sensors this node answers for. Slots are
//! allocated first-fit from index 0 and are never removed, so occupied slots are
//! always contiguous and every scan can stop at the first free one.

use std::borrow::Cow;

use crate::error::{RegistryError, RegistryResult};

/// Number of device slots per node.
pub const MAX_DEVICES: usize = 10;

/// One configured sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSlot {
    /// Bus address, unique on the bus.
    pub device_id: u8,
    /// How often the master should poll, in seconds. Only reported, never enforced.
    pub poll_interval: u16,
    /// Free-text description.
    pub description: Cow<'static, str>,
    /// Free-text unit.
    pub unit: Cow<'static, str>,
    /// Latest reading.
    pub sensor_value: f32,
    /// Whether `sensor_value` has not yet been delivered to the master.
    pub have_value: bool,
}

/// A value handed out for one poll reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingValue {
    /// Device the value belongs to.
    pub device_id: u8,
    /// The reading.
    pub value: f32,
}

/// Fixed-capacity device table.
#[derive(Debug, Default)]
pub struct Registry {
    slots: heapless::Vec<DeviceSlot, MAX_DEVICES>,
}

impl Registry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Registry {
            slots: heapless::Vec::new(),
        }
    }

    /// Configure (or reconfigure) a device.
    ///
    /// Reconfiguring an existing id overwrites its slot in place and drops any
    /// pending value. Returns the slot index.
    pub fn configure(
        &mut self,
        device_id: u8,
        poll_interval: u16,
        description: Cow<'static, str>,
        unit: Cow<'static, str>,
    ) -> RegistryResult<usize> {
        if description.is_empty() {
            return Err(RegistryError::MissingDescription(device_id));
        }

        let slot = DeviceSlot {
            device_id,
            poll_interval,
            description,
            unit,
            sensor_value: 0.0,
            have_value: false,
        };

        if let Some(index) = self.position(device_id) {
            self.slots[index] = slot;
            return Ok(index);
        }

        let index = self.slots.len();
        self.slots.push(slot).map_err(|_| RegistryError::Full {
            device_id,
            capacity: MAX_DEVICES,
        })?;
        Ok(index)
    }

    /// Store a new reading. Unknown ids are ignored; returns whether it was stored.
    pub fn set_value(&mut self, device_id: u8, value: f32) -> bool {
        match self.slots.iter_mut().find(|s| s.device_id == device_id) {
            Some(slot) => {
                slot.sensor_value = value;
                slot.have_value = true;
                true
            }
            None => false,
        }
    }

    /// Find a configured device.
    pub fn lookup(&self, device_id: u8) -> Option<&DeviceSlot> {
        self.slots.iter().find(|s| s.device_id == device_id)
    }

    /// Hand out the pending value of a device and mark it delivered.
    ///
    /// Returns `None` for unknown devices and for devices with nothing new.
    pub fn take_pending(&mut self, device_id: u8) -> Option<PendingValue> {
        let slot = self.slots.iter_mut().find(|s| s.device_id == device_id)?;
        if !slot.have_value {
            return None;
        }
        slot.have_value = false;
        Some(PendingValue {
            device_id,
            value: slot.sensor_value,
        })
    }

    /// Number of occupied slots.
    pub fn device_count(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceSlot> {
        self.slots.iter()
    }

    fn position(&self, device_id: u8) -> Option<usize> {
        self.slots.iter().position(|s| s.device_id == device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configure(reg: &mut Registry, id: u8, desc: &'static str) -> RegistryResult<usize> {
        reg.configure(id, 10, desc.into(), "unit".into())
    }

    #[test]
    fn test_first_fit_allocation() {
        let mut reg = Registry::new();
        assert_eq!(configure(&mut reg, 9, "a"), Ok(0));
        assert_eq!(configure(&mut reg, 3, "b"), Ok(1));
        assert_eq!(reg.device_count(), 2);
        let ids: Vec<u8> = reg.iter().map(|s| s.device_id).collect();
        assert_eq!(ids, vec![9, 3]);
    }

    #[test]
    fn test_reconfigure_is_idempotent() {
        let mut reg = Registry::new();
        configure(&mut reg, 9, "first").unwrap();
        configure(&mut reg, 4, "other").unwrap();
        reg.set_value(9, 1.5);

        assert_eq!(configure(&mut reg, 9, "second"), Ok(0));
        assert_eq!(configure(&mut reg, 9, "second"), Ok(0));
        assert_eq!(reg.device_count(), 2);

        let slot = reg.lookup(9).unwrap();
        assert_eq!(slot.description, "second");
        assert_eq!(slot.sensor_value, 0.0);
        assert!(!slot.have_value);
    }

    #[test]
    fn test_missing_description_is_rejected() {
        let mut reg = Registry::new();
        assert_eq!(
            configure(&mut reg, 9, ""),
            Err(RegistryError::MissingDescription(9))
        );
        assert_eq!(reg.device_count(), 0);
        assert!(reg.lookup(9).is_none());
    }

    #[test]
    fn test_full_table() {
        let mut reg = Registry::new();
        for id in 0..MAX_DEVICES as u8 {
            configure(&mut reg, id, "x").unwrap();
        }
        assert_eq!(
            configure(&mut reg, 100, "x"),
            Err(RegistryError::Full {
                device_id: 100,
                capacity: MAX_DEVICES
            })
        );
        // Existing ids can still be reconfigured.
        assert_eq!(configure(&mut reg, 5, "y"), Ok(5));
        assert_eq!(reg.device_count(), MAX_DEVICES);
    }

    #[test]
    fn test_set_value_unknown_id_ignored() {
        let mut reg = Registry::new();
        configure(&mut reg, 9, "a").unwrap();
        assert!(!reg.set_value(10, 3.0));
        assert!(reg.set_value(9, 3.0));
        assert!(reg.lookup(9).unwrap().have_value);
    }

    #[test]
    fn test_take_pending_delivers_once() {
        let mut reg = Registry::new();
        configure(&mut reg, 9, "a").unwrap();
        assert_eq!(reg.take_pending(9), None);

        reg.set_value(9, 23.5);
        assert_eq!(
            reg.take_pending(9),
            Some(PendingValue {
                device_id: 9,
                value: 23.5
            })
        );
        assert_eq!(reg.take_pending(9), None);
        assert_eq!(reg.take_pending(42), None);

        // The value itself stays for discovery and inspection.
        assert_eq!(reg.lookup(9).unwrap().sensor_value, 23.5);
    }
}
