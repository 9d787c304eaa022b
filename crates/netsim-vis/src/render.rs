//! Frame drawing.
//!
//! A frame is drawn into anything implementing [`Canvas`]. [`DrawList`] is the
//! recording canvas: it keeps the commands so they can be shipped to the
//! browser, which replays them on a real 2D context.
//!
//! Draw order per frame: background, grid, links with their packets, packet
//! advance, devices, mode overlay. Packets are drawn before they advance, so a
//! packet that arrives this frame is pruned without ever being drawn at
//! progress ≥ 1.

use netsim_topology::{
    Device, DeviceKind, DeviceStatus, Link, LinkStatus, Point, Protocol, Topology, DEVICE_SIZE,
};
use serde::Serialize;

use crate::interaction::Mode;

/// CSS colour string.
pub type Color = &'static str;

/// Colours used by the renderer.
pub mod palette {
    use super::Color;

    pub const BACKGROUND: Color = "#07111f";
    pub const GRID: Color = "#0e1420";
    pub const DEVICE_FILL: Color = "#0f1b2d";
    pub const DEVICE_STROKE: Color = "#1e2a40";
    pub const SELECTED_FILL: Color = "#00e5a8";
    pub const SELECTED_STROKE: Color = "#00b38f";
    pub const ACCENT: Color = "#00e5a8";
    pub const TEXT: Color = "#e8f0ff";
    pub const ONLINE: Color = "#23d18b";
    pub const OFFLINE: Color = "#ff5c7a";
    pub const LINK: Color = "#1e2a40";
    pub const LINK_LABEL: Color = "#ffb020";
    pub const FIREWALL: Color = "#ff9800";
    pub const SERVER: Color = "#2196f3";
    pub const WORKSTATION: Color = "#9c27b0";
}

/// Grid spacing in canvas units.
pub const GRID_SPACING: f64 = 20.0;

/// Radius of a drawn packet.
pub const PACKET_RADIUS: f64 = 6.0;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Fill the whole surface
    Clear { color: Color },
    /// Straight line
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
    },
    /// Axis-aligned (optionally rounded) rectangle
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        radius: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        fill: Option<Color>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stroke: Option<Color>,
        line_width: f64,
    },
    /// Filled circle
    Circle {
        center: Point,
        radius: f64,
        fill: Color,
    },
    /// Filled closed polygon
    Polygon { points: Vec<Point>, fill: Color },
    /// Text label
    Text {
        at: Point,
        text: String,
        color: Color,
        size: f64,
        align: Align,
    },
}

/// Drawing surface.
pub trait Canvas {
    /// Width and height in canvas units.
    fn size(&self) -> (f64, f64);

    /// Draw one primitive.
    fn draw(&mut self, command: DrawCommand);
}

/// Canvas that records commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawList {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Empty list for a surface of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }
}

impl Canvas for DrawList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn draw(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

/// Draw one full frame and advance the packets one tick.
/// Returns the number of packets that arrived during this frame.
pub fn render_frame<C: Canvas + ?Sized>(canvas: &mut C, topology: &mut Topology, mode: &Mode) -> usize {
    draw_background(canvas);
    draw_grid(canvas);

    for link in topology.links() {
        draw_link(canvas, topology, link);
    }
    let delivered = topology.tick();

    for device in topology.devices() {
        draw_device(canvas, device);
    }

    draw_mode_overlay(canvas, mode);
    delivered
}

fn draw_background<C: Canvas + ?Sized>(canvas: &mut C) {
    canvas.draw(DrawCommand::Clear {
        color: palette::BACKGROUND,
    });
}

fn draw_grid<C: Canvas + ?Sized>(canvas: &mut C) {
    let (width, height) = canvas.size();

    let mut x = 0.0;
    while x < width {
        canvas.draw(DrawCommand::Line {
            from: Point::new(x, 0.0),
            to: Point::new(x, height),
            color: palette::GRID,
            width: 1.0,
        });
        x += GRID_SPACING;
    }

    let mut y = 0.0;
    while y < height {
        canvas.draw(DrawCommand::Line {
            from: Point::new(0.0, y),
            to: Point::new(width, y),
            color: palette::GRID,
            width: 1.0,
        });
        y += GRID_SPACING;
    }
}

fn draw_link<C: Canvas + ?Sized>(canvas: &mut C, topology: &Topology, link: &Link) {
    let Some((a, b)) = topology.endpoints(link) else {
        return;
    };
    let selected = topology.is_link_selected(link.id());

    let color = if selected {
        palette::ACCENT
    } else if link.status == LinkStatus::Active {
        palette::LINK
    } else {
        palette::OFFLINE
    };
    canvas.draw(DrawCommand::Line {
        from: a,
        to: b,
        color,
        width: if selected { 3.0 } else { 2.0 },
    });

    let mid = a.midpoint(&b);
    canvas.draw(DrawCommand::Text {
        at: Point::new(mid.x, mid.y - 5.0),
        text: link.kind.to_string(),
        color: palette::LINK_LABEL,
        size: 10.0,
        align: Align::Center,
    });

    for packet in link.packets() {
        canvas.draw(DrawCommand::Circle {
            center: a.lerp(&b, packet.position_along_link()),
            radius: PACKET_RADIUS,
            fill: protocol_color(packet.protocol()),
        });
    }
}

fn protocol_color(protocol: Protocol) -> Color {
    match protocol {
        Protocol::Tcp => palette::ONLINE,
        Protocol::Udp => palette::LINK_LABEL,
        Protocol::Icmp => palette::OFFLINE,
        Protocol::Http => palette::SERVER,
    }
}

fn draw_device<C: Canvas + ?Sized>(canvas: &mut C, device: &Device) {
    let half = DEVICE_SIZE / 2.0;
    let p = device.position;

    let (fill, stroke) = if device.selected {
        (palette::SELECTED_FILL, palette::SELECTED_STROKE)
    } else {
        (palette::DEVICE_FILL, palette::DEVICE_STROKE)
    };
    let radius = match device.kind {
        DeviceKind::Router => 8.0,
        DeviceKind::Firewall => 4.0,
        DeviceKind::Workstation => 12.0,
        DeviceKind::Switch | DeviceKind::Server => 0.0,
    };
    canvas.draw(DrawCommand::Rect {
        origin: Point::new(p.x - half, p.y - half),
        width: DEVICE_SIZE,
        height: DEVICE_SIZE,
        radius,
        fill: Some(fill),
        stroke: Some(stroke),
        line_width: 2.0,
    });

    draw_icon(canvas, device.kind, p);

    canvas.draw(DrawCommand::Text {
        at: Point::new(p.x, p.y + half + 15.0),
        text: device.config.name.clone(),
        color: palette::TEXT,
        size: 12.0,
        align: Align::Center,
    });

    let status = if device.config.status == DeviceStatus::Active {
        palette::ONLINE
    } else {
        palette::OFFLINE
    };
    canvas.draw(DrawCommand::Circle {
        center: Point::new(p.x + half - 5.0, p.y - half + 5.0),
        radius: 4.0,
        fill: status,
    });
}

fn draw_icon<C: Canvas + ?Sized>(canvas: &mut C, kind: DeviceKind, p: Point) {
    let line = |from: Point, to: Point, width: f64| DrawCommand::Line {
        from,
        to,
        color: palette::ACCENT,
        width,
    };
    let bar = |x: f64, y: f64, w: f64, h: f64, fill: Color| DrawCommand::Rect {
        origin: Point::new(x, y),
        width: w,
        height: h,
        radius: 0.0,
        fill: Some(fill),
        stroke: None,
        line_width: 0.0,
    };

    match kind {
        DeviceKind::Router => {
            canvas.draw(line(Point::new(p.x - 10.0, p.y - 5.0), Point::new(p.x + 10.0, p.y - 5.0), 2.0));
            canvas.draw(line(Point::new(p.x - 5.0, p.y), Point::new(p.x + 5.0, p.y), 2.0));
        }
        DeviceKind::Switch => {
            for dx in [-10.0, 0.0, 10.0] {
                canvas.draw(line(
                    Point::new(p.x + dx, p.y - 10.0),
                    Point::new(p.x + dx, p.y + 10.0),
                    1.0,
                ));
            }
        }
        DeviceKind::Firewall => {
            canvas.draw(DrawCommand::Polygon {
                points: vec![
                    Point::new(p.x, p.y - 10.0),
                    Point::new(p.x - 8.0, p.y),
                    Point::new(p.x, p.y + 10.0),
                    Point::new(p.x + 8.0, p.y),
                ],
                fill: palette::FIREWALL,
            });
        }
        DeviceKind::Server => {
            for i in 0..3 {
                canvas.draw(bar(p.x - 12.0, p.y - 8.0 + i as f64 * 6.0, 24.0, 4.0, palette::SERVER));
            }
        }
        DeviceKind::Workstation => {
            canvas.draw(bar(p.x - 8.0, p.y - 6.0, 16.0, 10.0, palette::WORKSTATION));
            canvas.draw(bar(p.x - 2.0, p.y + 4.0, 4.0, 6.0, palette::WORKSTATION));
        }
    }
}

fn draw_mode_overlay<C: Canvas + ?Sized>(canvas: &mut C, mode: &Mode) {
    canvas.draw(DrawCommand::Rect {
        origin: Point::new(10.0, 10.0),
        width: 200.0,
        height: 30.0,
        radius: 0.0,
        fill: Some(palette::DEVICE_FILL),
        stroke: Some(palette::DEVICE_STROKE),
        line_width: 1.0,
    });
    canvas.draw(DrawCommand::Text {
        at: Point::new(15.0, 28.0),
        text: format!("Mode: {}", mode),
        color: palette::TEXT,
        size: 12.0,
        align: Align::Left,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_topology::LinkKind;

    fn circles(list: &DrawList, fill: Color) -> Vec<Point> {
        list.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { center, fill: f, radius } if *f == fill && *radius == PACKET_RADIUS => {
                    Some(*center)
                }
                _ => None,
            })
            .collect()
    }

    fn texts(list: &DrawList) -> Vec<&str> {
        list.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_frame_has_background_grid_and_overlay() {
        let mut topo = Topology::default();
        let mut list = DrawList::new(100.0, 40.0);
        render_frame(&mut list, &mut topo, &Mode::Select);

        assert_eq!(list.commands[0], DrawCommand::Clear { color: palette::BACKGROUND });
        let grid_lines = list
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { color, .. } if *color == palette::GRID))
            .count();
        // x = 0,20,40,60,80 and y = 0,20
        assert_eq!(grid_lines, 7);
        assert_eq!(texts(&list), vec!["Mode: Select/Move"]);
    }

    #[test]
    fn links_drawn_before_devices() {
        let mut topo = Topology::default();
        let a = topo.add_device(DeviceKind::Router, Point::new(50.0, 50.0));
        let b = topo.add_device(DeviceKind::Server, Point::new(150.0, 50.0));
        topo.add_connection(&a, &b, LinkKind::Serial).unwrap();

        let mut list = DrawList::new(0.0, 0.0);
        render_frame(&mut list, &mut topo, &Mode::PlaceLink);

        let labels = texts(&list);
        assert_eq!(labels, vec!["serial", a.as_str(), b.as_str(), "Mode: Add Connection"]);
    }

    #[test]
    fn packet_interpolates_and_is_never_drawn_complete() {
        let mut topo = Topology::default();
        let a = topo.add_device(DeviceKind::Router, Point::new(0.0, 0.0));
        let b = topo.add_device(DeviceKind::Workstation, Point::new(100.0, 0.0));
        topo.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        topo.send_packet(&b, &a, Protocol::Tcp).unwrap();

        let mut drawn = Vec::new();
        let mut delivered = 0;
        for _ in 0..60 {
            let mut list = DrawList::new(0.0, 0.0);
            delivered += render_frame(&mut list, &mut topo, &Mode::Select);
            drawn.extend(circles(&list, palette::ONLINE));
        }

        assert_eq!(delivered, 1);
        // 0.00, 0.02, ..., 0.98
        assert_eq!(drawn.len(), 50);
        // Travels from b back towards a
        assert_eq!(drawn[0], Point::new(100.0, 0.0));
        assert!(drawn.iter().all(|p| p.x > 0.0 && p.x <= 100.0));
        assert!(drawn.windows(2).all(|w| w[1].x < w[0].x));
    }

    #[test]
    fn dragged_device_moves_its_packets() {
        let mut topo = Topology::default();
        let a = topo.add_device(DeviceKind::Router, Point::new(0.0, 0.0));
        let b = topo.add_device(DeviceKind::Switch, Point::new(100.0, 0.0));
        topo.add_connection(&a, &b, LinkKind::Ethernet).unwrap();
        topo.send_packet(&a, &b, Protocol::Udp).unwrap();

        let mut list = DrawList::new(0.0, 0.0);
        render_frame(&mut list, &mut topo, &Mode::Select);
        topo.move_device(&b, Point::new(100.0, 100.0));

        let mut list = DrawList::new(0.0, 0.0);
        render_frame(&mut list, &mut topo, &Mode::Select);
        let packet = circles(&list, palette::LINK_LABEL)[0];

        assert!((packet.x - 2.0).abs() < 1e-9);
        assert!((packet.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn selection_highlights_device() {
        let mut topo = Topology::default();
        let a = topo.add_device(DeviceKind::Firewall, Point::new(50.0, 50.0));
        topo.select_device(&a);

        let mut list = DrawList::new(0.0, 0.0);
        render_frame(&mut list, &mut topo, &Mode::Select);

        assert!(list.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Rect { fill: Some(f), radius, .. } if *f == palette::SELECTED_FILL && *radius == 4.0
        )));
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let json = serde_json::to_value(DrawCommand::Clear { color: palette::BACKGROUND }).unwrap();
        assert_eq!(json["op"], "clear");
        assert_eq!(json["color"], "#07111f");
    }
}
