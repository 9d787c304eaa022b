//! Netsim Visualization
//!
//! Interactive canvas editor and packet animation for the network simulator.
//!
//! # Architecture
//!
//! - **Interaction**: Select / place-device / place-link state machine fed
//!   with pointer events
//! - **Render**: Draws a frame into a [`Canvas`]; [`DrawList`] records it
//! - **Animation**: Cancellable recurring frame loop on the tokio runtime
//! - **Simulator**: Owns the topology and exposes the command API
//! - **Server**: REST endpoints plus a WebSocket streaming frames
//!
//! # Usage
//!
//! ```ignore
//! let config = VisConfig::from_env()?;
//! let server = VisServer::new(Simulator::new(&config), &config);
//! server.start_animation().await;
//! server.serve(config.port).await?;
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
pub mod interaction;
pub mod render;
pub mod server;
pub mod simulator;
pub mod traffic;

pub use animation::{AnimationLoop, FrameReceiver, RecurringTask, DEFAULT_FRAME_INTERVAL};
pub use config::VisConfig;
pub use error::{ConfigError, Error, Result};
pub use events::{EventLog, LogEntry};
pub use interaction::{InteractionState, Mode, Outcome, PointerEvent};
pub use render::{render_frame, Canvas, DrawCommand, DrawList};
pub use server::VisServer;
pub use simulator::{Frame, SharedSimulator, Simulator};
pub use traffic::{TrafficGenerator, TrafficLoop};
