//! Error types for netsim-vis.

use thiserror::Error;

/// Result type for simulator and server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration value that could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but does not parse or is out of range
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Errors surfaced by the simulator and the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Refused by the topology engine
    #[error(transparent)]
    Topology(#[from] netsim_topology::Error),

    /// Bad configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
