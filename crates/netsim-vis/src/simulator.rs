//! The simulator: topology, interaction state, event log and traffic
//! generator behind one command API.
//!
//! Every mutation of the simulation goes through a `&mut Simulator` method.
//! Shared use wraps it in [`SharedSimulator`]; each command, pointer event and
//! frame holds the write lock for its whole duration.

use std::sync::Arc;

use netsim_topology::{
    ConfigOverrides, Device, DeviceId, DeviceKind, Error as TopologyError, ImportReport, Link,
    LinkId, LinkKind, Point, Protocol, Selection, Snapshot, Topology, TopologyStats,
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::VisConfig;
use crate::error::Result;
use crate::events::EventLog;
use crate::interaction::{InteractionState, Mode, Outcome, PointerEvent};
use crate::render::{self, DrawList};
use crate::traffic::{SentPacket, TrafficGenerator};

/// Simulator shared between the server and the recurring tasks.
pub type SharedSimulator = Arc<RwLock<Simulator>>;

/// One rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Frames rendered so far, this one included
    pub number: u64,
    /// Packets that arrived while this frame was drawn
    pub delivered: usize,
    #[serde(flatten)]
    pub draw: DrawList,
}

/// Owned simulation engine.
pub struct Simulator {
    topology: Topology,
    interaction: InteractionState,
    log: EventLog,
    traffic: TrafficGenerator,
    frames: u64,
    canvas: (f64, f64),
}

impl Simulator {
    pub fn new(config: &VisConfig) -> Self {
        Self {
            topology: Topology::new(config.topology()),
            interaction: InteractionState::new(),
            log: EventLog::new(config.event_log_capacity),
            // Distinct stream from the address generator
            traffic: TrafficGenerator::new(config.seed.wrapping_add(1)),
            frames: 0,
            canvas: (config.canvas_width, config.canvas_height),
        }
    }

    /// Wrap for sharing between tasks.
    pub fn into_shared(self) -> SharedSimulator {
        Arc::new(RwLock::new(self))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> TopologyStats {
        self.topology.stats()
    }

    /// Frames rendered so far.
    pub fn frame_number(&self) -> u64 {
        self.frames
    }

    /// Record a free-form event.
    pub fn log(&mut self, message: impl Into<String>) {
        self.log.push(message);
    }

    // --- Interaction ---

    /// Switch editing mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.interaction.set_mode(&mut self.topology, mode);
        tracing::debug!("Mode: {}", mode);
    }

    /// Feed one pointer event through the interaction state machine.
    pub fn pointer(&mut self, event: PointerEvent) -> Outcome {
        let outcome = self.interaction.handle(&mut self.topology, event);
        match &outcome {
            Outcome::Placed { device, kind } => {
                let name = self.name_of(device);
                self.log.push(format!("{} {} added", kind, name));
            }
            Outcome::Linked { a, b, .. } => {
                self.log.push(format!("Connection created between {} and {}", a, b));
            }
            Outcome::LinkRefused { reason, .. } => {
                self.log.push(format!("Connection refused: {}", reason));
            }
            Outcome::DragEnded { device } => {
                tracing::debug!("Device {} moved", device);
            }
            _ => {}
        }
        outcome
    }

    // --- Devices ---

    /// Place a device, optionally overriding its default configuration.
    pub fn add_device(&mut self, kind: DeviceKind, at: Point, overrides: ConfigOverrides) -> DeviceId {
        let id = self.topology.add_device_with(kind, at, overrides);
        let name = self.name_of(&id);
        self.log.push(format!("{} {} added", kind, name));
        id
    }

    /// Delete a device together with its links.
    pub fn remove_device(&mut self, id: &DeviceId) -> Result<Device> {
        let device = self
            .topology
            .remove_device(id)
            .ok_or_else(|| TopologyError::UnknownDevice(id.clone()))?;
        self.interaction.forget(id);
        self.log.push(format!("Device {} deleted", device.config.name));
        Ok(device)
    }

    /// Merge new configuration values into a device.
    pub fn update_device_config(&mut self, id: &DeviceId, overrides: ConfigOverrides) -> Result<()> {
        self.topology.update_device_config(id, overrides)?;
        let name = self.name_of(id);
        self.log.push(format!("Device {} configuration updated", name));
        Ok(())
    }

    // --- Links ---

    pub fn add_connection(&mut self, a: &DeviceId, b: &DeviceId, kind: LinkKind) -> Result<LinkId> {
        let link = self.topology.add_connection(a, b, kind)?;
        self.log
            .push(format!("Connection created between {} and {}", a, b));
        Ok(link)
    }

    pub fn remove_connection(&mut self, id: LinkId) -> Result<Link> {
        let link = self
            .topology
            .remove_connection(id)
            .ok_or(TopologyError::UnknownLink(id))?;
        self.log
            .push(format!("Connection between {} and {} removed", link.a(), link.b()));
        Ok(link)
    }

    /// Delete whatever is selected. Returns false if nothing was.
    pub fn delete_selection(&mut self) -> bool {
        match self.topology.selection().clone() {
            Selection::None => false,
            Selection::Device(id) => self.remove_device(&id).is_ok(),
            Selection::Link(id) => self.remove_connection(id).is_ok(),
        }
    }

    // --- Traffic ---

    /// Send one packet over the direct link between two devices.
    pub fn send_packet(&mut self, from: &DeviceId, to: &DeviceId, protocol: Protocol) -> Result<LinkId> {
        let link = self.topology.send_packet(from, to, protocol)?;
        self.log
            .push(format!("{} packet sent from {} to {}", protocol, from, to));
        Ok(link)
    }

    /// One burst of random background traffic.
    pub fn spawn_random_traffic(&mut self) -> Vec<SentPacket> {
        let sent = self.traffic.burst(&mut self.topology);
        tracing::debug!("Random traffic: {} packets", sent.len());
        sent
    }

    // --- Whole topology ---

    /// Remove every device and link.
    pub fn clear(&mut self) {
        self.interaction.reset(&mut self.topology);
        self.topology.clear();
        self.log.push("Topology cleared");
    }

    pub fn export_snapshot(&mut self) -> Snapshot {
        let snapshot = self.topology.export_snapshot();
        self.log.push("Topology exported");
        snapshot
    }

    /// Replace the topology. Any gesture in progress is dropped.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> ImportReport {
        self.interaction.reset(&mut self.topology);
        let report = self.topology.import_snapshot(snapshot);
        self.log.push(format!(
            "Topology imported ({} devices, {} connections)",
            report.devices, report.connections
        ));
        report
    }

    // --- Rendering ---

    /// Draw the next frame and advance all packets one step.
    pub fn render_frame(&mut self) -> Frame {
        let (width, height) = self.canvas;
        let mut draw = DrawList::new(width, height);
        let delivered = render::render_frame(&mut draw, &mut self.topology, &self.interaction.mode());
        self.frames += 1;

        Frame {
            number: self.frames,
            delivered,
            draw,
        }
    }

    fn name_of(&self, id: &DeviceId) -> String {
        self.topology
            .device(id)
            .map(|d| d.config.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sim() -> Simulator {
        Simulator::new(&VisConfig::default())
    }

    fn latest(sim: &Simulator) -> String {
        sim.events()
            .latest()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    #[test]
    fn click_to_place_then_link() {
        let mut sim = sim();
        sim.set_mode(Mode::PlaceDevice(DeviceKind::Router));
        let placed = sim.pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        let Outcome::Placed { device: a, .. } = placed else {
            panic!("expected placement, got {:?}", placed);
        };
        assert_eq!(latest(&sim), format!("router {} added", a));

        sim.set_mode(Mode::PlaceDevice(DeviceKind::Server));
        sim.pointer(PointerEvent::Down { x: 300.0, y: 100.0 });

        sim.set_mode(Mode::PlaceLink);
        sim.pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        let linked = sim.pointer(PointerEvent::Down { x: 300.0, y: 100.0 });

        assert!(matches!(linked, Outcome::Linked { .. }));
        assert_eq!(sim.mode(), Mode::Select);
        assert_eq!(sim.topology().link_count(), 1);
        assert!(latest(&sim).starts_with("Connection created between"));
    }

    #[test]
    fn remove_unknown_device_is_error() {
        let mut sim = sim();
        let err = sim.remove_device(&DeviceId::from("ghost")).unwrap_err();
        assert!(matches!(err, Error::Topology(TopologyError::UnknownDevice(_))));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn removing_pending_endpoint_drops_gesture() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        sim.set_mode(Mode::PlaceLink);
        sim.pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        assert_eq!(sim.interaction().pending_endpoint(), Some(&a));

        sim.remove_device(&a).unwrap();
        assert_eq!(sim.interaction().pending_endpoint(), None);
        assert_eq!(latest(&sim), format!("Device {} deleted", a));
    }

    #[test]
    fn delete_selection_removes_link() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        let b = sim.add_device(DeviceKind::Switch, Point::new(200.0, 0.0), ConfigOverrides::default());
        sim.add_connection(&a, &b, LinkKind::Ethernet).unwrap();

        sim.pointer(PointerEvent::Down { x: 100.0, y: 2.0 });
        assert!(matches!(sim.topology().selection(), Selection::Link(_)));

        assert!(sim.delete_selection());
        assert_eq!(sim.topology().link_count(), 0);
        assert_eq!(sim.topology().device_count(), 2);
        assert!(!sim.delete_selection());
    }

    #[test]
    fn send_packet_logs_and_counts() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        let b = sim.add_device(DeviceKind::Switch, Point::new(200.0, 0.0), ConfigOverrides::default());

        assert!(sim.send_packet(&a, &b, Protocol::Icmp).is_err());
        sim.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        sim.send_packet(&a, &b, Protocol::Icmp).unwrap();

        assert_eq!(latest(&sim), format!("ICMP packet sent from {} to {}", a, b));
        assert_eq!(sim.stats().packets_sent, 1);
        assert_eq!(sim.stats().packets_in_flight, 1);
    }

    #[test]
    fn frames_are_numbered_and_deliver() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        let b = sim.add_device(DeviceKind::Switch, Point::new(200.0, 0.0), ConfigOverrides::default());
        sim.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        sim.send_packet(&a, &b, Protocol::Tcp).unwrap();

        let frames: Vec<Frame> = (0..50).map(|_| sim.render_frame()).collect();
        assert_eq!(frames[0].number, 1);
        assert_eq!(frames[49].number, 50);
        assert_eq!(frames.iter().map(|f| f.delivered).sum::<usize>(), 1);
        assert_eq!(frames[49].delivered, 1);
        assert_eq!(sim.stats().packets_delivered, 1);
        assert_eq!(frames[0].draw.width, 800.0);
    }

    #[test]
    fn frame_serializes_flat() {
        let mut sim = sim();
        let json = serde_json::to_value(sim.render_frame()).unwrap();
        assert_eq!(json["number"], 1);
        assert!(json["commands"].is_array());
        assert_eq!(json["width"], 800.0);
    }

    #[test]
    fn import_resets_gesture_and_logs() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        let b = sim.add_device(DeviceKind::Switch, Point::new(200.0, 0.0), ConfigOverrides::default());
        sim.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        let snapshot = sim.export_snapshot();

        sim.set_mode(Mode::PlaceLink);
        sim.pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        let report = sim.import_snapshot(snapshot);

        assert_eq!((report.devices, report.connections), (2, 1));
        assert_eq!(sim.interaction().pending_endpoint(), None);
        assert_eq!(latest(&sim), "Topology imported (2 devices, 1 connections)");
    }

    #[test]
    fn clear_logs() {
        let mut sim = sim();
        sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        sim.clear();
        assert_eq!(sim.topology().device_count(), 0);
        assert_eq!(latest(&sim), "Topology cleared");
    }

    #[test]
    fn random_traffic_is_not_logged() {
        let mut sim = sim();
        let a = sim.add_device(DeviceKind::Router, Point::new(0.0, 0.0), ConfigOverrides::default());
        let b = sim.add_device(DeviceKind::Switch, Point::new(200.0, 0.0), ConfigOverrides::default());
        sim.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        let before = sim.events().len();

        let sent = sim.spawn_random_traffic();
        assert!(!sent.is_empty());
        assert_eq!(sim.events().len(), before);
    }
}
