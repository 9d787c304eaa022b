//! Recurring tasks on the tokio runtime.
//!
//! [`RecurringTask`] is the start/stop handle shared by the frame loop and the
//! traffic generator: at most one task runs per handle, and once `stop`
//! returns the task has finished and will not run its body again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::simulator::{Frame, SharedSimulator};

/// Default time between frames (about 60 per second).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Latest rendered frame, if any.
pub type FrameReceiver = watch::Receiver<Option<Arc<Frame>>>;

/// Cancellable task that runs a closure at a fixed interval.
pub struct RecurringTask {
    name: &'static str,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTask {
    /// Create a stopped task. A zero period is raised to one millisecond.
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period: period.max(Duration::from_millis(1)),
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the task. The first run happens immediately.
    ///
    /// Returns false and leaves the running task alone if one is active.
    pub fn start<F, Fut>(&mut self, mut body: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            tracing::debug!("{} loop already running", self.name);
            return false;
        }

        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                body().await;
            }
        }));

        tracing::info!("{} loop started ({:?} interval)", self.name, period);
        true
    }

    /// Cancel the task and wait until it has finished.
    ///
    /// Returns false if nothing was running.
    pub async fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.abort();
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                tracing::warn!("{} loop ended abnormally: {}", self.name, e);
            }
        }
        tracing::info!("{} loop stopped", self.name);
        true
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Frame loop: renders the shared simulator once per interval and publishes
/// the result to every subscriber.
pub struct AnimationLoop {
    simulator: SharedSimulator,
    frames: Arc<watch::Sender<Option<Arc<Frame>>>>,
    task: RecurringTask,
}

impl AnimationLoop {
    pub fn new(simulator: SharedSimulator, interval: Duration) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            simulator,
            frames: Arc::new(frames),
            task: RecurringTask::new("animation", interval),
        }
    }

    /// Receiver that always holds the most recent frame.
    pub fn subscribe(&self) -> FrameReceiver {
        self.frames.subscribe()
    }

    /// Start rendering. Returns false if already running.
    pub fn start(&mut self) -> bool {
        let simulator = self.simulator.clone();
        let frames = self.frames.clone();
        self.task.start(move || {
            let simulator = simulator.clone();
            let frames = frames.clone();
            async move {
                let frame = simulator.write().await.render_frame();
                frames.send_replace(Some(Arc::new(frame)));
            }
        })
    }

    /// Stop rendering. No frame is produced after this returns.
    pub async fn stop(&mut self) -> bool {
        self.task.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}
