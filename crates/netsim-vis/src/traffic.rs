//! Random background traffic.
//!
//! While the simulation runs, every interval sends one to three packets
//! between random distinct device pairs. Pairs without a direct link are
//! skipped.

use std::time::Duration;

use netsim_topology::{DeviceId, Error, LinkId, Protocol, Topology};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::animation::RecurringTask;
use crate::simulator::SharedSimulator;

/// Default time between bursts.
pub const DEFAULT_TRAFFIC_INTERVAL: Duration = Duration::from_secs(2);

/// Most packets attempted per burst.
pub const MAX_BURST: usize = 3;

/// A packet the generator managed to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentPacket {
    pub from: DeviceId,
    pub to: DeviceId,
    pub protocol: Protocol,
    pub link: LinkId,
}

/// Picks random endpoints and protocols.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    rng: StdRng,
}

impl TrafficGenerator {
    /// Create a generator with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Attempt one burst of one to three packets.
    pub fn burst(&mut self, topology: &mut Topology) -> Vec<SentPacket> {
        let ids: Vec<DeviceId> = topology.devices().map(|d| d.id.clone()).collect();
        if ids.len() < 2 {
            return Vec::new();
        }

        let count = self.rng.gen_range(1..=MAX_BURST);
        let mut sent = Vec::with_capacity(count);

        for _ in 0..count {
            let i = self.rng.gen_range(0..ids.len());
            let mut j = self.rng.gen_range(0..ids.len() - 1);
            if j >= i {
                j += 1;
            }
            let protocol = Protocol::ALL[self.rng.gen_range(0..Protocol::ALL.len())];
            let (from, to) = (&ids[i], &ids[j]);

            match topology.send_packet(from, to, protocol) {
                Ok(link) => sent.push(SentPacket {
                    from: from.clone(),
                    to: to.clone(),
                    protocol,
                    link,
                }),
                Err(Error::NoLink(..)) => {}
                Err(e) => tracing::debug!("Random packet {} -> {} dropped: {}", from, to, e),
            }
        }

        sent
    }
}

/// Recurring task that asks the simulator for a burst every interval.
pub struct TrafficLoop {
    simulator: SharedSimulator,
    task: RecurringTask,
}

impl TrafficLoop {
    pub fn new(simulator: SharedSimulator, interval: Duration) -> Self {
        Self {
            simulator,
            task: RecurringTask::new("traffic", interval),
        }
    }

    /// Start generating traffic. Returns false if already running.
    pub fn start(&mut self) -> bool {
        let simulator = self.simulator.clone();
        self.task.start(move || {
            let simulator = simulator.clone();
            async move {
                simulator.write().await.spawn_random_traffic();
            }
        })
    }

    /// Stop generating traffic. Returns false if it was not running.
    pub async fn stop(&mut self) -> bool {
        self.task.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}
