//! Error types for netsim-topology.

use thiserror::Error;

use crate::{DeviceId, LinkId};

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a topology operation was refused.
///
/// None of these are fatal: the engine leaves its state untouched whenever it
/// returns one, and the caller decides whether to surface it.
#[derive(Debug, Error)]
pub enum Error {
    /// No device with this id is tracked.
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// No link with this id is tracked.
    #[error("unknown link: {0}")]
    UnknownLink(LinkId),

    /// Both endpoints of a requested link are the same device.
    #[error("cannot link device {0} to itself")]
    SelfLink(DeviceId),

    /// A link already joins this unordered pair.
    #[error("link already exists between {0} and {1}")]
    DuplicateLink(DeviceId, DeviceId),

    /// The two devices exist but no link joins them.
    #[error("no link between {0} and {1}")]
    NoLink(DeviceId, DeviceId),

    /// Protocol label outside TCP/UDP/ICMP/HTTP.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Device kind outside the five supported kinds.
    #[error("unknown device kind: {0}")]
    UnknownKind(String),

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
