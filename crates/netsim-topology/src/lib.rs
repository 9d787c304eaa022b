//! Netsim Topology
//!
//! Entity model and engine for the interactive network simulator.
//!
//! # Model
//!
//! - **Devices** live in an id-keyed arena ([`DeviceId`] → [`Device`]) and keep
//!   their id for the whole session; ids are never handed out twice.
//! - **Links** store the ids of their two endpoints, never the devices
//!   themselves, and are resolved against the arena on lookup. At most one
//!   link exists per unordered device pair.
//! - **Packets** are animation state owned by their link. Each tick moves a
//!   packet a fixed fraction of the link; arrived packets are dropped.
//!
//! # Snapshots
//!
//! [`Topology::export_snapshot`] and [`Topology::import_snapshot`] convert to
//! and from the JSON interchange format (see [`snapshot`]).

mod device;
mod error;
mod link;
mod packet;
mod point;
pub mod snapshot;
mod topology;

pub use device::{ConfigOverrides, Device, DeviceConfig, DeviceId, DeviceKind, DeviceStatus, Ports};
pub use error::{Error, Result};
pub use link::{Link, LinkId, LinkKind, LinkStatus};
pub use packet::{Direction, Packet, Protocol, DEFAULT_PACKET_RATE};
pub use point::Point;
pub use snapshot::{ConnectionRecord, DeviceRecord, ImportReport, SkippedConnection, Snapshot};
pub use topology::{Selection, Topology, TopologyConfig, TopologyStats};

/// Side length of the square hit box around every device.
pub const DEVICE_SIZE: f64 = 40.0;
