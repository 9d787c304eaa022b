//! Runtime configuration read from `NETSIM_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use netsim_topology::{TopologyConfig, DEFAULT_PACKET_RATE};

use crate::animation::DEFAULT_FRAME_INTERVAL;
use crate::error::ConfigError;
use crate::events::DEFAULT_LOG_CAPACITY;
use crate::traffic::DEFAULT_TRAFFIC_INTERVAL;

/// Largest canvas side accepted; the grid is redrawn every frame.
pub const MAX_CANVAS_DIMENSION: f64 = 16_384.0;

/// Configuration for the simulator and its server.
#[derive(Debug, Clone, PartialEq)]
pub struct VisConfig {
    /// HTTP listen port
    pub port: u16,

    /// Time between rendered frames
    pub frame_interval: Duration,

    /// Time between random traffic bursts
    pub traffic_interval: Duration,

    /// Canvas width in canvas units
    pub canvas_width: f64,

    /// Canvas height in canvas units
    pub canvas_height: f64,

    /// Fraction of a link each packet covers per frame
    pub packet_rate: f64,

    /// Seed for address and traffic generation
    pub seed: u64,

    /// Entries kept in the event log
    pub event_log_capacity: usize,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            traffic_interval: DEFAULT_TRAFFIC_INTERVAL,
            canvas_width: 800.0,
            canvas_height: 600.0,
            packet_rate: DEFAULT_PACKET_RATE,
            seed: 42,
            event_log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl VisConfig {
    /// Read the process environment, falling back to defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse(&lookup, "NETSIM_PORT")?.unwrap_or(defaults.port);

        let frame_interval = parse::<u64, _>(&lookup, "NETSIM_FRAME_MS")?
            .map(|ms| positive("NETSIM_FRAME_MS", ms))
            .transpose()?
            .map(Duration::from_millis)
            .unwrap_or(defaults.frame_interval);

        let traffic_interval = parse::<u64, _>(&lookup, "NETSIM_TRAFFIC_MS")?
            .map(|ms| positive("NETSIM_TRAFFIC_MS", ms))
            .transpose()?
            .map(Duration::from_millis)
            .unwrap_or(defaults.traffic_interval);

        let canvas_width = parse(&lookup, "NETSIM_CANVAS_WIDTH")?
            .map(|w| dimension("NETSIM_CANVAS_WIDTH", w))
            .transpose()?
            .unwrap_or(defaults.canvas_width);

        let canvas_height = parse(&lookup, "NETSIM_CANVAS_HEIGHT")?
            .map(|h| dimension("NETSIM_CANVAS_HEIGHT", h))
            .transpose()?
            .unwrap_or(defaults.canvas_height);

        let packet_rate = parse(&lookup, "NETSIM_PACKET_RATE")?
            .map(|r: f64| {
                if r.is_finite() && r > 0.0 && r <= 1.0 {
                    Ok(r)
                } else {
                    Err(invalid("NETSIM_PACKET_RATE", r.to_string(), "must be in (0, 1]"))
                }
            })
            .transpose()?
            .unwrap_or(defaults.packet_rate);

        let seed = parse(&lookup, "NETSIM_SEED")?.unwrap_or(defaults.seed);

        let event_log_capacity = parse::<usize, _>(&lookup, "NETSIM_EVENT_LOG")?
            .map(|n| {
                if n > 0 {
                    Ok(n)
                } else {
                    Err(invalid("NETSIM_EVENT_LOG", n.to_string(), "must be at least 1"))
                }
            })
            .transpose()?
            .unwrap_or(defaults.event_log_capacity);

        Ok(Self {
            port,
            frame_interval,
            traffic_interval,
            canvas_width,
            canvas_height,
            packet_rate,
            seed,
            event_log_capacity,
        })
    }

    /// Settings for the topology engine.
    pub fn topology(&self) -> TopologyConfig {
        TopologyConfig {
            seed: self.seed,
            packet_rate: self.packet_rate,
        }
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, raw, "not a valid number")),
    }
}

fn positive(key: &'static str, ms: u64) -> Result<u64, ConfigError> {
    if ms > 0 {
        Ok(ms)
    } else {
        Err(invalid(key, ms.to_string(), "must be at least 1"))
    }
}

fn dimension(key: &'static str, v: f64) -> Result<f64, ConfigError> {
    if !(v.is_finite() && v > 0.0) {
        Err(invalid(key, v.to_string(), "must be positive"))
    } else if v > MAX_CANVAS_DIMENSION {
        Err(invalid(key, v.to_string(), "must be at most 16384"))
    } else {
        Ok(v)
    }
}

fn invalid(key: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { key, value, reason }
}
