//! Links between devices.
//!
//! Links refer to their endpoints by [`DeviceId`] only; the topology resolves
//! ids to live devices when positions are needed.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, Direction, Packet};

/// Session-unique link identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Physical medium of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Ethernet,
    Serial,
    Wireless,
}

impl LinkKind {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Ethernet => "ethernet",
            LinkKind::Serial => "serial",
            LinkKind::Wireless => "wireless",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a link is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Active,
    Inactive,
}

/// An undirected connection between two devices.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    id: LinkId,
    a: DeviceId,
    b: DeviceId,
    /// Physical medium
    pub kind: LinkKind,
    /// Up or down
    pub status: LinkStatus,
    packets: Vec<Packet>,
}

impl Link {
    pub(crate) fn new(id: LinkId, a: DeviceId, b: DeviceId, kind: LinkKind) -> Self {
        Self {
            id,
            a,
            b,
            kind,
            status: LinkStatus::Active,
            packets: Vec::new(),
        }
    }

    /// Identifier of this link.
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// First endpoint.
    pub fn a(&self) -> &DeviceId {
        &self.a
    }

    /// Second endpoint.
    pub fn b(&self) -> &DeviceId {
        &self.b
    }

    /// Whether `device` is one of the endpoints.
    pub fn touches(&self, device: &DeviceId) -> bool {
        self.a == *device || self.b == *device
    }

    /// Whether this link joins `x` and `y`, in either orientation.
    pub fn joins(&self, x: &DeviceId, y: &DeviceId) -> bool {
        (self.a == *x && self.b == *y) || (self.a == *y && self.b == *x)
    }

    /// Direction of travel for a packet leaving `from`.
    pub fn direction_from(&self, from: &DeviceId) -> Option<Direction> {
        if self.a == *from {
            Some(Direction::Forward)
        } else if self.b == *from {
            Some(Direction::Reverse)
        } else {
            None
        }
    }

    /// Packets currently in flight, oldest first.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub(crate) fn push_packet(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    /// Advance every packet one tick and drop the ones that arrived.
    /// Returns the number dropped.
    pub(crate) fn advance_packets(&mut self) -> usize {
        for packet in &mut self.packets {
            packet.advance();
        }
        let before = self.packets.len();
        self.packets.retain(|p| !p.is_complete());
        before - self.packets.len()
    }
}
