//! Error types for the simulator.

use labibus_master::MasterError;
use labibus_slave::RegistryError;
use thiserror::Error;

/// Errors that can occur while running a simulated node or talking to one.
#[derive(Debug, Error)]
pub enum SimError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Node file could not be parsed.
    #[error("invalid node file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Node file parsed but describes something impossible.
    #[error("invalid node configuration: {0}")]
    Config(String),

    /// A device was rejected by the registry.
    #[error("device rejected: {0}")]
    Registry(#[from] RegistryError),

    /// A reply could not be decoded.
    #[error("bad reply: {0}")]
    Master(#[from] MasterError),

    /// Signal handler could not be installed.
    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// The node's interrupt thread is gone.
    #[error("node {0} has stopped")]
    NodeStopped(String),
}

/// Result type alias for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
