//! Node files.
//!
//! A simulated node is described in YAML: a name and the sensors it answers
//! for, each optionally with a starting reading.
//!
//! ```yaml
//! name: kitchen
//! devices:
//!   - id: 9
//!     poll_interval: 10
//!     description: Temperature room 2
//!     unit: degree C
//!     value: 21.5
//!     drift: 0.1
//! ```

use std::collections::HashSet;
use std::path::Path;

use labibus_slave::{BusHal, Slave, MAX_DEVICES};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// One sensor on a simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Bus address.
    pub id: u8,
    /// Suggested poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u16,
    /// Description reported on discovery.
    pub description: String,
    /// Unit reported on discovery.
    #[serde(default)]
    pub unit: String,
    /// Reading set at startup.
    #[serde(default)]
    pub value: Option<f32>,
    /// Added to the reading at every sensor update.
    #[serde(default)]
    pub drift: Option<f32>,
}

fn default_poll_interval() -> u16 {
    10
}

/// A simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name, used in logs.
    #[serde(default = "default_node_name")]
    pub name: String,
    /// Sensors on this node.
    pub devices: Vec<DeviceConfig>,
}

fn default_node_name() -> String {
    "node".to_string()
}

impl NodeConfig {
    /// Check ids and table size.
    pub fn validate(&self) -> SimResult<()> {
        if self.devices.len() > MAX_DEVICES {
            return Err(SimError::Config(format!(
                "{} devices configured, a node holds at most {}",
                self.devices.len(),
                MAX_DEVICES
            )));
        }
        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id > 0x7f {
                return Err(SimError::Config(format!(
                    "device id 0x{:02x} out of range 0..=0x7f",
                    device.id
                )));
            }
            if !seen.insert(device.id) {
                return Err(SimError::Config(format!(
                    "device id 0x{:02x} configured twice",
                    device.id
                )));
            }
        }
        Ok(())
    }

    /// Configure every device on a slave and set the starting readings.
    pub fn apply<H: BusHal>(&self, slave: &Slave<H>) -> SimResult<()> {
        for device in &self.devices {
            slave.configure(
                device.id,
                device.poll_interval,
                device.description.clone(),
                device.unit.clone(),
            )?;
            if let Some(value) = device.value {
                slave.set_value(device.id, value);
            }
        }
        Ok(())
    }
}

/// Parse a node file from a string.
pub fn load_config_from_str(yaml: &str) -> SimResult<NodeConfig> {
    let config: NodeConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

/// Load a node file.
pub fn load_config(path: &Path) -> SimResult<NodeConfig> {
    let text = std::fs::read_to_string(path)?;
    load_config_from_str(&text)
}
