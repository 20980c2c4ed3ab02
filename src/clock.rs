// ==============================================================================
// clock.rs — ELAPSED TIME SOURCE
// ------------------------------------------------------------------------------
// The simulation integrates with whatever dt the TickSource reports:
// - WallClock: measured time since the previous tick (variable, so replays
//   are frame-rate dependent and not bit-reproducible)
// - FixedStep: constant dt, used by tests and headless deterministic runs
//
// RateTracker keeps the last N instantaneous rates (1/dt) in a ring buffer
// and reports their mean for display.
// ==============================================================================

use tokio::time::Instant;

pub trait TickSource: Send {
    /// Seconds since the previous call (>= 0).
    fn next_dt(&mut self) -> f64;
}

#[derive(Debug)]
pub struct WallClock {
    last: Instant,
    max_dt: f64,
}

impl WallClock {
    /// `max_dt` caps a single step after a stall (debugger, suspend).
    pub fn new(max_dt: f64) -> Self {
        Self {
            last: Instant::now(),
            max_dt,
        }
    }
}

impl TickSource for WallClock {
    fn next_dt(&mut self) -> f64 {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        dt.min(self.max_dt)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedStep(pub f64);

impl TickSource for FixedStep {
    fn next_dt(&mut self) -> f64 {
        self.0.max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct RateTracker {
    samples: Vec<f64>,
    capacity: usize,
    cursor: usize,
}

impl RateTracker {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Records 1/dt. Zero-length ticks carry no rate and are skipped.
    pub fn record(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        let rate = 1.0 / dt;
        if self.samples.len() < self.capacity {
            self.samples.push(rate);
        } else {
            self.samples[self.cursor] = rate;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Tick source + rate bookkeeping: the one place dt comes from.
pub struct SimulationClock {
    source: Box<dyn TickSource>,
    rates: RateTracker,
    elapsed: f64,
}

impl SimulationClock {
    pub fn new(source: impl TickSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            rates: RateTracker::default(),
            elapsed: 0.0,
        }
    }

    pub fn wall(max_dt: f64) -> Self {
        Self::new(WallClock::new(max_dt))
    }

    pub fn fixed(dt: f64) -> Self {
        Self::new(FixedStep(dt))
    }

    pub fn tick(&mut self) -> f64 {
        let dt = self.source.next_dt();
        self.rates.record(dt);
        self.elapsed += dt;
        dt
    }

    pub fn average_rate(&self) -> f64 {
        self.rates.average()
    }

    /// Simulated seconds so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
