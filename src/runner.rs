// ==============================================================================
// runner.rs — THE TWO LOOPS
// ------------------------------------------------------------------------------
// Simulation loop (sole writer):
//   drain commands -> dt from the clock -> world.step(dt)
//   -> trail segments into a bounded channel (dropped when full)
//   -> Arc<Snapshot> published on a watch channel (latest wins)
//
// Presentation loop (read-only):
//   every interval: take the latest snapshot + all queued trail segments
//   and hand them to a RenderSink.
//
// Both stop when the shutdown watch flips to true.
// ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::clock::SimulationClock;
use crate::physics::RaceWorld;
use crate::state::{Command, Snapshot};
use crate::trail::TrailSegment;

/// Where presentation frames end up (renderer, socket, log).
pub trait RenderSink: Send {
    fn present(&mut self, frame: &Snapshot, trails: &[TrailSegment]);
}

impl<T: RenderSink + ?Sized> RenderSink for Box<T> {
    fn present(&mut self, frame: &Snapshot, trails: &[TrailSegment]) {
        (**self).present(frame, trails);
    }
}

/// Headless sink: a debug line every `every` frames.
#[derive(Debug)]
pub struct LogSink {
    every: u64,
    presented: u64,
}

impl LogSink {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            presented: 0,
        }
    }
}

impl RenderSink for LogSink {
    fn present(&mut self, frame: &Snapshot, trails: &[TrailSegment]) {
        self.presented += 1;
        if self.presented % self.every == 0 {
            debug!(
                tick = frame.tick,
                rate = format!("{:.0}", frame.sim_rate),
                vehicles = frame.vehicles.len(),
                trails = trails.len(),
                "frame"
            );
        }
    }
}

// ---------------------------------------------
// SIMULATION
// ---------------------------------------------
pub struct SimulationLoop {
    world: RaceWorld,
    clock: SimulationClock,
    commands: mpsc::UnboundedReceiver<Command>,
    frames: watch::Sender<Arc<Snapshot>>,
    trails: mpsc::Sender<TrailSegment>,
    shutdown: watch::Receiver<bool>,
    idle: Duration,
    max_ticks: Option<u64>,
}

impl SimulationLoop {
    pub fn new(
        world: RaceWorld,
        clock: SimulationClock,
        commands: mpsc::UnboundedReceiver<Command>,
        frames: watch::Sender<Arc<Snapshot>>,
        trails: mpsc::Sender<TrailSegment>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            world,
            clock,
            commands,
            frames,
            trails,
            shutdown,
            idle: Duration::ZERO,
            max_ticks: None,
        }
    }

    /// Pause between ticks. Zero just yields to the scheduler.
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Stop on its own after `ticks` world ticks (headless runs).
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Runs until shutdown (or the tick limit) and hands the world back.
    pub async fn run(mut self) -> RaceWorld {
        info!("🚀 Simulation loop running");
        let mut dropped: u64 = 0;

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            if self.max_ticks.is_some_and(|max| self.world.tick() >= max) {
                break;
            }

            while let Ok(command) = self.commands.try_recv() {
                if let Err(e) = self.world.apply_command(command) {
                    warn!("⚠️ Rejected command: {e}");
                }
            }

            let dt = self.clock.tick();
            let report = self.world.step(dt);

            for segment in report.trails {
                match self.trails.try_send(segment) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => dropped += 1,
                    // nobody presenting; segments are display-only
                    Err(TrySendError::Closed(_)) => {}
                }
            }

            self.frames
                .send_replace(Arc::new(self.world.snapshot(self.clock.average_rate())));

            if self.idle.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.idle).await;
            }
        }

        if dropped > 0 {
            warn!(dropped, "trail segments dropped, presentation fell behind");
        }
        info!(
            "🛑 Simulation stopped at tick {} ({:.1}s simulated, ~{:.0} ticks/s)",
            self.world.tick(),
            self.clock.elapsed(),
            self.clock.average_rate()
        );
        self.world
    }
}

// ---------------------------------------------
// PRESENTATION
// ---------------------------------------------
pub struct PresentationLoop<S: RenderSink> {
    sink: S,
    frames: watch::Receiver<Arc<Snapshot>>,
    trails: mpsc::Receiver<TrailSegment>,
    shutdown: watch::Receiver<bool>,
    period: Duration,
}

impl<S: RenderSink> PresentationLoop<S> {
    pub fn new(
        sink: S,
        frames: watch::Receiver<Arc<Snapshot>>,
        trails: mpsc::Receiver<TrailSegment>,
        shutdown: watch::Receiver<bool>,
        period: Duration,
    ) -> Self {
        Self {
            sink,
            frames,
            trails,
            shutdown,
            period,
        }
    }

    pub async fn run(mut self) -> S {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut batch = Vec::new();

        while !*self.shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            batch.clear();
            while let Ok(segment) = self.trails.try_recv() {
                batch.push(segment);
            }
            // clone the Arc so the watch lock isn't held while presenting
            let frame = Arc::clone(&self.frames.borrow());
            self.sink.present(&frame, &batch);
        }

        debug!("presentation loop stopped");
        self.sink
    }
}
