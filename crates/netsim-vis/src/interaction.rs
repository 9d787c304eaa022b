//! Pointer-driven editing modes.
//!
//! Three modes decide what a pointer-down does:
//!
//! | mode | pointer-down on device | pointer-down on empty space |
//! |---|---|---|
//! | `Select` | select it and start dragging | select the link under the pointer, else deselect |
//! | `PlaceDevice(kind)` | place a new device | place a new device |
//! | `PlaceLink` | pick first endpoint, or link to it and return to `Select` | drop the pending endpoint |
//!
//! Pointer-up ends a drag in every mode.

use netsim_topology::{DeviceId, DeviceKind, LinkId, LinkKind, Point, Topology};
use serde::{Deserialize, Serialize};

/// How far from a link's centre line a click still selects it.
pub const LINK_HIT_TOLERANCE: f64 = 6.0;

/// Current editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "kind", rename_all = "snake_case")]
pub enum Mode {
    /// Select and move devices
    #[default]
    Select,
    /// Every click places a device of this kind
    PlaceDevice(DeviceKind),
    /// Two clicks link two devices
    PlaceLink,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Select => f.write_str("Select/Move"),
            Mode::PlaceDevice(kind) => write!(f, "Add {}", kind),
            Mode::PlaceLink => f.write_str("Add Connection"),
        }
    }
}

/// Pointer input, already in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
}

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing changed
    Nothing,
    /// A device was placed
    Placed { device: DeviceId, kind: DeviceKind },
    /// A device was selected and grabbed
    Selected { device: DeviceId },
    /// A link was selected
    SelectedLink { link: LinkId },
    /// The selection was cleared
    Deselected,
    /// The dragged device moved
    Moved { device: DeviceId, position: Point },
    /// A drag ended
    DragEnded { device: DeviceId },
    /// First endpoint of a new link chosen
    PendingEndpoint { device: DeviceId },
    /// Second endpoint chosen and the link created
    Linked { link: LinkId, a: DeviceId, b: DeviceId },
    /// Second endpoint chosen but the engine refused the link
    LinkRefused { a: DeviceId, b: DeviceId, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Drag {
    device: DeviceId,
    offset: Point,
}

/// Mode plus the transient state a gesture carries between events.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    mode: Mode,
    pending: Option<DeviceId>,
    drag: Option<Drag>,
}

impl InteractionState {
    /// Start in `Select` with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// First endpoint picked in `PlaceLink`, if any.
    pub fn pending_endpoint(&self) -> Option<&DeviceId> {
        self.pending.as_ref()
    }

    /// Device being dragged, if any.
    pub fn dragging(&self) -> Option<&DeviceId> {
        self.drag.as_ref().map(|d| &d.device)
    }

    /// Switch mode. Drops any gesture in progress and clears the selection.
    pub fn set_mode(&mut self, topology: &mut Topology, mode: Mode) {
        self.mode = mode;
        self.reset(topology);
    }

    /// Drop pending endpoint and drag without changing mode.
    pub fn reset(&mut self, topology: &mut Topology) {
        self.pending = None;
        self.drag = None;
        topology.end_drag();
        topology.deselect_all();
    }

    /// Dispatch a pointer event.
    pub fn handle(&mut self, topology: &mut Topology, event: PointerEvent) -> Outcome {
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(topology, Point::new(x, y)),
            PointerEvent::Move { x, y } => self.pointer_move(topology, Point::new(x, y)),
            PointerEvent::Up => self.pointer_up(topology),
        }
    }

    /// Pointer pressed at `at`.
    pub fn pointer_down(&mut self, topology: &mut Topology, at: Point) -> Outcome {
        match self.mode {
            Mode::PlaceDevice(kind) => {
                let device = topology.add_device(kind, at);
                Outcome::Placed { device, kind }
            }
            Mode::Select => self.select_at(topology, at),
            Mode::PlaceLink => self.link_at(topology, at),
        }
    }

    fn select_at(&mut self, topology: &mut Topology, at: Point) -> Outcome {
        if let Some(device) = topology.device_at(at) {
            let Some(position) = topology.device(&device).map(|d| d.position) else {
                return Outcome::Nothing;
            };
            // A lost pointer-up must not leave an earlier device grabbed
            topology.end_drag();
            topology.select_device(&device);
            topology.begin_drag(&device);
            self.drag = Some(Drag {
                device: device.clone(),
                offset: at - position,
            });
            return Outcome::Selected { device };
        }

        match topology.link_at(at, LINK_HIT_TOLERANCE) {
            Some(link) => {
                topology.select_link(link);
                Outcome::SelectedLink { link }
            }
            None => {
                topology.deselect_all();
                Outcome::Deselected
            }
        }
    }

    fn link_at(&mut self, topology: &mut Topology, at: Point) -> Outcome {
        let Some(clicked) = topology.device_at(at) else {
            self.pending = None;
            topology.deselect_all();
            return Outcome::Deselected;
        };

        match self.pending.take() {
            None => {
                topology.select_device(&clicked);
                self.pending = Some(clicked.clone());
                Outcome::PendingEndpoint { device: clicked }
            }
            Some(first) if first == clicked => {
                self.pending = Some(first);
                Outcome::Nothing
            }
            Some(first) => {
                let result = topology.add_connection(&first, &clicked, LinkKind::Ethernet);
                topology.deselect_all();
                self.mode = Mode::Select;
                match result {
                    Ok(link) => Outcome::Linked {
                        link,
                        a: first,
                        b: clicked,
                    },
                    Err(e) => Outcome::LinkRefused {
                        a: first,
                        b: clicked,
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Pointer moved to `at`.
    pub fn pointer_move(&mut self, topology: &mut Topology, at: Point) -> Outcome {
        let Some(drag) = &self.drag else {
            return Outcome::Nothing;
        };
        let position = at - drag.offset;
        let device = drag.device.clone();
        if topology.move_device(&device, position) {
            Outcome::Moved { device, position }
        } else {
            // Deleted mid-drag
            self.drag = None;
            Outcome::Nothing
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self, topology: &mut Topology) -> Outcome {
        topology.end_drag();
        match self.drag.take() {
            Some(drag) => Outcome::DragEnded {
                device: drag.device,
            },
            None => Outcome::Nothing,
        }
    }

    /// Forget any gesture that refers to a device that is gone.
    pub fn forget(&mut self, device: &DeviceId) {
        if self.pending.as_ref() == Some(device) {
            self.pending = None;
        }
        if self.drag.as_ref().is_some_and(|d| d.device == *device) {
            self.drag = None;
        }
    }
}
