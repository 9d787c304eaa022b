//! Snapshot export and import.
//!
//! The JSON layout is the interchange format shared with saved topology
//! files:
//!
//! ```text
//! {
//!   "devices":     [ { "id", "type", "x", "y", "config": { "name", "ip", "ports", "status", ... } } ],
//!   "connections": [ { "device1", "device2", "type", "status" } ]
//! }
//! ```
//!
//! Selection, drag state and in-flight packets are never written.

use serde::{Deserialize, Serialize};

use crate::device::{ConfigOverrides, Device, DeviceConfig, DeviceId, DeviceKind};
use crate::error::Result;
use crate::link::{LinkKind, LinkStatus};
use crate::topology::Topology;
use crate::Point;

/// A device as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub x: f64,
    pub y: f64,
    /// Missing fields fall back to the kind defaults on import
    #[serde(default)]
    pub config: ConfigOverrides,
}

/// A link as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub device1: DeviceId,
    pub device2: DeviceId,
    #[serde(rename = "type", default)]
    pub kind: LinkKind,
    #[serde(default)]
    pub status: LinkStatus,
}

/// Everything needed to rebuild a topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A connection record that could not be restored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedConnection {
    pub device1: DeviceId,
    pub device2: DeviceId,
    pub reason: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Devices present after the import
    pub devices: usize,
    /// Links restored
    pub connections: usize,
    /// Connection records that were dropped
    pub skipped: Vec<SkippedConnection>,
}

impl Topology {
    /// Capture every device and link.
    pub fn export_snapshot(&self) -> Snapshot {
        let devices = self
            .devices()
            .map(|device| DeviceRecord {
                id: device.id.clone(),
                kind: device.kind,
                x: device.position.x,
                y: device.position.y,
                config: ConfigOverrides::from(device.config.clone()),
            })
            .collect();

        let connections = self
            .links()
            .iter()
            .map(|link| ConnectionRecord {
                device1: link.a().clone(),
                device2: link.b().clone(),
                kind: link.kind,
                status: link.status,
            })
            .collect();

        Snapshot {
            devices,
            connections,
        }
    }

    /// Replace the whole topology with `snapshot`.
    ///
    /// Devices keep their recorded ids. Connections whose endpoints do not
    /// resolve, that loop back on one device or that repeat an earlier pair
    /// are skipped; the rest still import.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> ImportReport {
        self.clear();

        for record in snapshot.devices {
            let config =
                DeviceConfig::resolve(&record.id, record.kind, record.config, self.rng_mut());
            let position = Point::new(record.x, record.y);
            self.insert_device(Device::new(record.id, record.kind, position, config));
        }

        let mut report = ImportReport {
            devices: self.device_count(),
            ..ImportReport::default()
        };

        for record in snapshot.connections {
            match self.add_connection(&record.device1, &record.device2, record.kind) {
                Ok(link) => {
                    // The link was created a moment ago, so the status update cannot miss.
                    let _ = self.set_link_status(link, record.status);
                    report.connections += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping connection {} <-> {}: {}",
                        record.device1,
                        record.device2,
                        e
                    );
                    report.skipped.push(SkippedConnection {
                        device1: record.device1,
                        device2: record.device2,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Imported {} devices, {} connections ({} skipped)",
            report.devices,
            report.connections,
            report.skipped.len()
        );
        report
    }
}
