//! In-flight packets.
//!
//! A packet is pure animation state: it belongs to exactly one link, moves a
//! fixed fraction of the link per tick and disappears once it arrives.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Advance per tick used when nothing else is configured (50 ticks per hop).
pub const DEFAULT_PACKET_RATE: f64 = 0.02;

/// Protocol label; only affects how the packet is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
    Http,
}

impl Protocol {
    /// Every protocol label.
    pub const ALL: [Self; 4] = [Self::Tcp, Self::Udp, Self::Icmp, Self::Http];

    /// Uppercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Http => "HTTP",
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProtocol(s.to_string()))
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way along its link a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From endpoint a to endpoint b
    Forward,
    /// From endpoint b to endpoint a
    Reverse,
}

/// A packet travelling along a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    direction: Direction,
    progress: f64,
    rate: f64,
    protocol: Protocol,
}

impl Packet {
    /// A packet at the start of its hop.
    pub fn new(direction: Direction, protocol: Protocol, rate: f64) -> Self {
        Self {
            direction,
            progress: 0.0,
            rate,
            protocol,
        }
    }

    /// Travel direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Fraction of the hop covered so far.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Fraction of the hop covered per tick.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Protocol label.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Move one tick further along the hop.
    pub fn advance(&mut self) {
        self.progress += self.rate;
    }

    /// Check if the packet has arrived.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Progress measured from endpoint a, whichever way the packet travels.
    pub fn position_along_link(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.progress,
            Direction::Reverse => 1.0 - self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_rate() {
        let mut packet = Packet::new(Direction::Forward, Protocol::Udp, 0.25);
        packet.advance();
        packet.advance();

        assert_eq!(packet.progress(), 0.5);
        assert!(!packet.is_complete());

        packet.advance();
        packet.advance();
        assert!(packet.is_complete());
    }

    #[test]
    fn default_rate_takes_fifty_ticks() {
        let mut packet = Packet::new(Direction::Forward, Protocol::Tcp, DEFAULT_PACKET_RATE);
        let mut ticks = 0;
        while !packet.is_complete() {
            packet.advance();
            ticks += 1;
        }
        assert_eq!(ticks, 50);
    }

    #[test]
    fn reverse_measures_from_b() {
        let mut packet = Packet::new(Direction::Reverse, Protocol::Icmp, 0.25);
        assert_eq!(packet.position_along_link(), 1.0);
        packet.advance();
        assert_eq!(packet.position_along_link(), 0.75);
    }

    #[test]
    fn protocol_labels() {
        assert_eq!("http".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!(Protocol::Icmp.to_string(), "ICMP");
        assert!(matches!("SCTP".parse::<Protocol>(), Err(Error::UnknownProtocol(_))));
        assert_eq!(serde_json::to_string(&Protocol::Udp).unwrap(), "\"UDP\"");
    }
}
