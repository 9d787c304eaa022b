//! Devices placed on the canvas and their configuration records.

use std::borrow::Borrow;
use std::str::FromStr;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Point, DEVICE_SIZE};

/// Ordered port-type → port-count mapping.
pub type Ports = IndexMap<String, u32>;

/// Stable device identifier.
///
/// Assigned once when the device is created and kept across renames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five kinds of device a learner can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Router,
    Switch,
    Firewall,
    Server,
    Workstation,
}

impl DeviceKind {
    /// Every kind, in palette order.
    pub const ALL: [Self; 5] = [
        Self::Router,
        Self::Switch,
        Self::Firewall,
        Self::Server,
        Self::Workstation,
    ];

    /// Lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Router => "router",
            DeviceKind::Switch => "switch",
            DeviceKind::Firewall => "firewall",
            DeviceKind::Server => "server",
            DeviceKind::Workstation => "workstation",
        }
    }

    /// Port layout a fresh device of this kind starts with.
    pub fn default_ports(&self) -> Ports {
        let layout: &[(&str, u32)] = match self {
            DeviceKind::Router => &[("ethernet", 4), ("serial", 2)],
            DeviceKind::Switch => &[("ethernet", 24)],
            DeviceKind::Firewall => &[("ethernet", 3), ("management", 1)],
            DeviceKind::Server => &[("ethernet", 1)],
            DeviceKind::Workstation => &[("ethernet", 1)],
        };
        layout
            .iter()
            .map(|(port, count)| (port.to_string(), *count))
            .collect()
    }

    /// Address a fresh device of this kind starts with.
    ///
    /// Workstations draw a host number from `20..100` so several of them do
    /// not all share one address.
    pub fn default_ip<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self {
            DeviceKind::Router => "192.168.1.1".to_string(),
            DeviceKind::Switch => "192.168.1.2".to_string(),
            DeviceKind::Firewall => "192.168.1.3".to_string(),
            DeviceKind::Server => "192.168.1.10".to_string(),
            DeviceKind::Workstation => format!("192.168.1.{}", 20 + rng.gen_range(0..80)),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status shown by the status dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

/// Fully resolved configuration of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name
    pub name: String,
    /// IP address, kept as free text
    pub ip: String,
    /// Port counts per port type
    pub ports: Ports,
    /// Operational status
    pub status: DeviceStatus,
    /// Keys we do not interpret, carried through export untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial configuration: every field that is `None` falls back to a default
/// (on creation) or keeps its current value (on update).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigOverrides {
    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the IP address.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Override the port map.
    pub fn with_ports(mut self, ports: Ports) -> Self {
        self.ports = Some(ports);
        self
    }

    /// Override the status.
    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<DeviceConfig> for ConfigOverrides {
    fn from(config: DeviceConfig) -> Self {
        Self {
            name: Some(config.name),
            ip: Some(config.ip),
            ports: Some(config.ports),
            status: Some(config.status),
            extra: config.extra,
        }
    }
}

impl DeviceConfig {
    /// Resolve overrides against the defaults for `kind`.
    ///
    /// The display name defaults to the device id.
    pub fn resolve<R: Rng + ?Sized>(
        id: &DeviceId,
        kind: DeviceKind,
        overrides: ConfigOverrides,
        rng: &mut R,
    ) -> Self {
        Self {
            name: overrides.name.unwrap_or_else(|| id.to_string()),
            ip: overrides.ip.unwrap_or_else(|| kind.default_ip(rng)),
            ports: overrides.ports.unwrap_or_else(|| kind.default_ports()),
            status: overrides.status.unwrap_or_default(),
            extra: overrides.extra,
        }
    }

    /// Merge an edit into this configuration.
    ///
    /// Port counts merge per port type, so an edit that names only
    /// `ethernet` leaves the other port types alone.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(name) = overrides.name {
            self.name = name;
        }
        if let Some(ip) = overrides.ip {
            self.ip = ip;
        }
        if let Some(ports) = overrides.ports {
            for (port, count) in ports {
                self.ports.insert(port, count);
            }
        }
        if let Some(status) = overrides.status {
            self.status = status;
        }
        self.extra.extend(overrides.extra);
    }
}

/// A node of the simulated network.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Stable identifier
    pub id: DeviceId,
    /// What the device is
    pub kind: DeviceKind,
    /// Centre of the device on the canvas
    pub position: Point,
    /// Configuration record
    pub config: DeviceConfig,
    /// Highlighted as the current selection (transient)
    pub selected: bool,
    /// Currently being dragged (transient)
    pub dragging: bool,
}

impl Device {
    /// Create a device that is neither selected nor dragged.
    pub fn new(id: DeviceId, kind: DeviceKind, position: Point, config: DeviceConfig) -> Self {
        Self {
            id,
            kind,
            position,
            config,
            selected: false,
            dragging: false,
        }
    }

    /// Whether `point` falls within this device's hit box.
    pub fn contains(&self, point: Point) -> bool {
        point.within_square(&self.position, DEVICE_SIZE)
    }

    /// Move the device centre.
    pub fn move_to(&mut self, position: Point) {
        self.position = position;
    }

    /// Counted as online by the statistics panel.
    pub fn is_online(&self) -> bool {
        self.config.status == DeviceStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_ports_match_kind_table() {
        let router = DeviceKind::Router.default_ports();
        assert_eq!(router.get("ethernet"), Some(&4));
        assert_eq!(router.get("serial"), Some(&2));
        assert_eq!(router.len(), 2);

        assert_eq!(DeviceKind::Switch.default_ports().get("ethernet"), Some(&24));

        let firewall: Vec<_> = DeviceKind::Firewall.default_ports().into_iter().collect();
        assert_eq!(
            firewall,
            vec![("ethernet".to_string(), 3), ("management".to_string(), 1)]
        );
    }

    #[test]
    fn workstation_ip_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let ip = DeviceKind::Workstation.default_ip(&mut rng);
            let host: u32 = ip.strip_prefix("192.168.1.").unwrap().parse().unwrap();
            assert!((20..100).contains(&host), "host {} out of range", host);
        }
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Router".parse::<DeviceKind>().unwrap(), DeviceKind::Router);
        assert_eq!("workstation".parse::<DeviceKind>().unwrap(), DeviceKind::Workstation);
        assert!(matches!("hub".parse::<DeviceKind>(), Err(Error::UnknownKind(_))));
    }

    #[test]
    fn resolve_prefers_overrides() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = DeviceId::new("server_1");
        let config = DeviceConfig::resolve(
            &id,
            DeviceKind::Server,
            ConfigOverrides::default().with_name("Web Server"),
            &mut rng,
        );

        assert_eq!(config.name, "Web Server");
        assert_eq!(config.ip, "192.168.1.10");
        assert_eq!(config.status, DeviceStatus::Active);
    }

    #[test]
    fn apply_merges_ports() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = DeviceId::new("router_1");
        let mut config =
            DeviceConfig::resolve(&id, DeviceKind::Router, ConfigOverrides::default(), &mut rng);

        let mut ports = Ports::new();
        ports.insert("ethernet".to_string(), 8);
        config.apply(
            ConfigOverrides::default()
                .with_ports(ports)
                .with_status(DeviceStatus::Error),
        );

        assert_eq!(config.ports.get("ethernet"), Some(&8));
        assert_eq!(config.ports.get("serial"), Some(&2));
        assert_eq!(config.status, DeviceStatus::Error);
        assert_eq!(config.name, "router_1");
    }

    #[test]
    fn config_keeps_unknown_keys() {
        let json = r#"{"name":"r","ip":"1.2.3.4","ports":{"ethernet":2},"status":"inactive","vlan":12}"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.status, DeviceStatus::Inactive);
        assert_eq!(config.extra.get("vlan"), Some(&Value::from(12)));

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["vlan"], Value::from(12));
    }
}
