//! The topology engine: an id-keyed arena of devices plus an ordered list of
//! links, with the single selection and the traffic counters.

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::device::{ConfigOverrides, Device, DeviceConfig, DeviceId, DeviceKind};
use crate::error::{Error, Result};
use crate::link::{Link, LinkId, LinkKind, LinkStatus};
use crate::packet::{Packet, Protocol, DEFAULT_PACKET_RATE};
use crate::Point;

/// Configuration for a topology.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Seed for the address generator
    pub seed: u64,
    /// Fraction of a hop each packet covers per tick
    pub packet_rate: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            packet_rate: DEFAULT_PACKET_RATE,
        }
    }
}

/// What is currently selected. At most one thing at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    Device(DeviceId),
    Link(LinkId),
}

/// Counters shown by the monitoring panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopologyStats {
    /// Packets accepted by `send_packet`
    pub packets_sent: u64,
    /// Packets that reached the far end
    pub packets_delivered: u64,
    /// Packets currently on a link
    pub packets_in_flight: usize,
    /// Links present
    pub links: usize,
    /// Devices present
    pub devices: usize,
    /// Devices whose status is active
    pub devices_online: usize,
}

/// Devices, links and the selection.
pub struct Topology {
    devices: IndexMap<DeviceId, Device>,
    links: Vec<Link>,
    selection: Selection,
    /// Every id that has been present this session; never handed out again.
    issued: HashSet<DeviceId>,
    next_device: u64,
    next_link: u64,
    packet_rate: f64,
    packets_sent: u64,
    packets_delivered: u64,
    rng: StdRng,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(TopologyConfig::default())
    }
}

impl Topology {
    /// Create an empty topology.
    pub fn new(config: TopologyConfig) -> Self {
        let packet_rate = if config.packet_rate.is_finite() && config.packet_rate > 0.0 {
            config.packet_rate
        } else {
            tracing::warn!(
                "Ignoring packet rate {}, using {}",
                config.packet_rate,
                DEFAULT_PACKET_RATE
            );
            DEFAULT_PACKET_RATE
        };

        Self {
            devices: IndexMap::new(),
            links: Vec::new(),
            selection: Selection::None,
            issued: HashSet::new(),
            next_device: 0,
            next_link: 0,
            packet_rate,
            packets_sent: 0,
            packets_delivered: 0,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    // --- Devices ---

    /// Place a device with default configuration.
    pub fn add_device(&mut self, kind: DeviceKind, position: Point) -> DeviceId {
        self.add_device_with(kind, position, ConfigOverrides::default())
    }

    /// Place a device, taking any configuration fields present in `overrides`.
    pub fn add_device_with(
        &mut self,
        kind: DeviceKind,
        position: Point,
        overrides: ConfigOverrides,
    ) -> DeviceId {
        let id = self.fresh_id(kind);
        let config = DeviceConfig::resolve(&id, kind, overrides, &mut self.rng);
        tracing::debug!("Added {} {} at {}", kind, id, position);
        self.insert_device(Device::new(id.clone(), kind, position, config));
        id
    }

    /// Insert a device under its own id, bypassing id generation.
    pub(crate) fn insert_device(&mut self, device: Device) {
        self.issued.insert(device.id.clone());
        self.devices.insert(device.id.clone(), device);
    }

    fn fresh_id(&mut self, kind: DeviceKind) -> DeviceId {
        loop {
            self.next_device += 1;
            let id = DeviceId::new(format!("{}_{}", kind, self.next_device));
            if !self.issued.contains(&id) {
                return id;
            }
        }
    }

    /// Remove a device and every link touching it.
    pub fn remove_device(&mut self, id: &DeviceId) -> Option<Device> {
        let device = self.devices.shift_remove(id)?;
        let before = self.links.len();
        self.links.retain(|link| !link.touches(id));
        tracing::debug!(
            "Removed device {} and {} link(s)",
            id,
            before - self.links.len()
        );
        self.forget_stale_selection();
        Some(device)
    }

    /// Look up a device.
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Iterate devices in insertion order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Whether a device with this id exists.
    pub fn contains_device(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    /// Move a device. Returns false if it does not exist.
    pub fn move_device(&mut self, id: &DeviceId, position: Point) -> bool {
        match self.devices.get_mut(id) {
            Some(device) => {
                device.move_to(position);
                true
            }
            None => false,
        }
    }

    /// Merge a configuration edit into a device.
    pub fn update_device_config(&mut self, id: &DeviceId, overrides: ConfigOverrides) -> Result<()> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| Error::UnknownDevice(id.clone()))?;
        device.config.apply(overrides);
        Ok(())
    }

    /// First device, in insertion order, whose hit box contains `point`.
    pub fn device_at(&self, point: Point) -> Option<DeviceId> {
        self.devices
            .values()
            .find(|device| device.contains(point))
            .map(|device| device.id.clone())
    }

    // --- Links ---

    /// Link two devices. The pair is unordered and the kind is not part of
    /// the duplicate check.
    pub fn add_connection(&mut self, a: &DeviceId, b: &DeviceId, kind: LinkKind) -> Result<LinkId> {
        if a == b {
            return Err(Error::SelfLink(a.clone()));
        }
        for endpoint in [a, b] {
            if !self.devices.contains_key(endpoint) {
                return Err(Error::UnknownDevice(endpoint.clone()));
            }
        }
        if self.links.iter().any(|link| link.joins(a, b)) {
            return Err(Error::DuplicateLink(a.clone(), b.clone()));
        }

        self.next_link += 1;
        let id = LinkId(self.next_link);
        self.links.push(Link::new(id, a.clone(), b.clone(), kind));
        tracing::debug!("Linked {} <-> {} ({}) as {}", a, b, kind, id);
        Ok(id)
    }

    /// Remove a link by identity.
    pub fn remove_connection(&mut self, id: LinkId) -> Option<Link> {
        let index = self.links.iter().position(|link| link.id() == id)?;
        let link = self.links.remove(index);
        self.forget_stale_selection();
        Some(link)
    }

    /// Look up a link.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|link| link.id() == id)
    }

    /// The link joining two devices, in either orientation.
    pub fn link_between(&self, a: &DeviceId, b: &DeviceId) -> Option<&Link> {
        self.links.iter().find(|link| link.joins(a, b))
    }

    /// All links in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Bring a link up or down.
    pub fn set_link_status(&mut self, id: LinkId, status: LinkStatus) -> Result<()> {
        let link = self
            .links
            .iter_mut()
            .find(|link| link.id() == id)
            .ok_or(Error::UnknownLink(id))?;
        link.status = status;
        Ok(())
    }

    /// Live positions of a link's endpoints (a, b).
    pub fn endpoints(&self, link: &Link) -> Option<(Point, Point)> {
        let a = self.devices.get(link.a())?;
        let b = self.devices.get(link.b())?;
        Some((a.position, b.position))
    }

    /// Where a packet on `link` currently is.
    pub fn packet_position(&self, link: &Link, packet: &Packet) -> Option<Point> {
        let (a, b) = self.endpoints(link)?;
        Some(a.lerp(&b, packet.position_along_link()))
    }

    /// First link whose segment passes within `tolerance` of `point`.
    pub fn link_at(&self, point: Point, tolerance: f64) -> Option<LinkId> {
        self.links
            .iter()
            .find(|link| {
                self.endpoints(link)
                    .is_some_and(|(a, b)| point.distance_to_segment(&a, &b) <= tolerance)
            })
            .map(|link| link.id())
    }

    // --- Packets ---

    /// Put a packet on the link joining `from` and `to`, heading for `to`.
    pub fn send_packet(&mut self, from: &DeviceId, to: &DeviceId, protocol: Protocol) -> Result<LinkId> {
        for endpoint in [from, to] {
            if !self.devices.contains_key(endpoint) {
                return Err(Error::UnknownDevice(endpoint.clone()));
            }
        }

        let rate = self.packet_rate;
        let link = self
            .links
            .iter_mut()
            .find(|link| link.joins(from, to))
            .ok_or_else(|| Error::NoLink(from.clone(), to.clone()))?;
        let direction = link
            .direction_from(from)
            .ok_or_else(|| Error::NoLink(from.clone(), to.clone()))?;

        link.push_packet(Packet::new(direction, protocol, rate));
        self.packets_sent += 1;
        Ok(link.id())
    }

    /// Advance every packet one tick, dropping arrived ones.
    /// Returns how many arrived.
    pub fn tick(&mut self) -> usize {
        let delivered: usize = self.links.iter_mut().map(Link::advance_packets).sum();
        self.packets_delivered += delivered as u64;
        delivered
    }

    /// Packets currently on any link.
    pub fn packets_in_flight(&self) -> usize {
        self.links.iter().map(|link| link.packets().len()).sum()
    }

    // --- Selection ---

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected device, if the selection is a device.
    pub fn selected_device(&self) -> Option<&DeviceId> {
        match &self.selection {
            Selection::Device(id) => Some(id),
            _ => None,
        }
    }

    /// Select exactly this device. Returns false (and selects nothing) if it
    /// does not exist.
    pub fn select_device(&mut self, id: &DeviceId) -> bool {
        self.deselect_all();
        match self.devices.get_mut(id) {
            Some(device) => {
                device.selected = true;
                self.selection = Selection::Device(id.clone());
                true
            }
            None => false,
        }
    }

    /// Select exactly this link.
    pub fn select_link(&mut self, id: LinkId) -> bool {
        self.deselect_all();
        if self.link(id).is_some() {
            self.selection = Selection::Link(id);
            true
        } else {
            false
        }
    }

    /// Whether `id` is the selected link.
    pub fn is_link_selected(&self, id: LinkId) -> bool {
        self.selection == Selection::Link(id)
    }

    /// Clear the selection and every device's selected flag.
    pub fn deselect_all(&mut self) {
        for device in self.devices.values_mut() {
            device.selected = false;
        }
        self.selection = Selection::None;
    }

    fn forget_stale_selection(&mut self) {
        let stale = match &self.selection {
            Selection::None => false,
            Selection::Device(id) => !self.devices.contains_key(id),
            Selection::Link(id) => self.link(*id).is_none(),
        };
        if stale {
            self.selection = Selection::None;
        }
    }

    // --- Dragging ---

    /// Mark a device as being dragged.
    pub fn begin_drag(&mut self, id: &DeviceId) -> bool {
        match self.devices.get_mut(id) {
            Some(device) => {
                device.dragging = true;
                true
            }
            None => false,
        }
    }

    /// Clear every drag flag.
    pub fn end_drag(&mut self) {
        for device in self.devices.values_mut() {
            device.dragging = false;
        }
    }

    // --- Whole topology ---

    /// Remove all devices and links and clear the selection.
    ///
    /// Traffic counters and issued ids survive.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.links.clear();
        self.selection = Selection::None;
    }

    /// Counters for the monitoring panel.
    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            packets_sent: self.packets_sent,
            packets_delivered: self.packets_delivered,
            packets_in_flight: self.packets_in_flight(),
            links: self.links.len(),
            devices: self.devices.len(),
            devices_online: self.devices.values().filter(|d| d.is_online()).count(),
        }
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
