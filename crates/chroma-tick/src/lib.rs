//! Broadcast tick scheduler for Chroma.
//!
//! Fires at a fixed period with budget monitoring and pause/resume
//! support. The schedule is self-rescheduling: the next tick is due one
//! full `period` after the current tick *finishes*, so a slow tick pushes
//! later ticks back instead of letting them pile up.
//!
//! # Integration
//!
//! The scheduler sits inside the coordinator's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = scheduler.wait_for_tick() => {
//!             broadcast_all_games();
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between the end of one tick and the start of the next.
    /// Default: 500 ms.
    pub period: Duration,
    /// Budget warning threshold (0.0–1.0). Default: 0.80.
    /// A tracing warning is emitted when a tick's work takes more than
    /// this fraction of the period.
    pub budget_warn_threshold: f64,
    /// Enable per-tick timing metrics.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            budget_warn_threshold: 0.80,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// The broadcast period used when none is configured.
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(500);

    /// Shortest accepted period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Create a config for a specific period with default settings.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`TickScheduler::new`]. A period below
    /// [`Self::MIN_PERIOD`] is raised to it, and the warning threshold is
    /// clamped to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_secs_f64() * 1000.0,
                "tick period below minimum, clamping to 1 ms"
            );
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// How long after its deadline the tick actually woke.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// Timing values cover the work done between [`TickScheduler::wait_for_tick`]
/// returning and [`TickScheduler::record_tick_end`] being called.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Ticks whose work took at least a full period.
    pub total_overruns: u64,
    /// Exponential moving average of tick work time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Longest tick work time observed.
    pub max_tick_time: Duration,
    /// Work time of the last tick as a fraction of the period.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Self-rescheduling tick scheduler. One per coordinator.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick is due.
    next_tick: Instant,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a scheduler whose first tick is due one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            next_tick: Instant::now() + config.period,
            config,
            tick_count: 0,
            tick_start: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific period with default settings.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Wait until the next tick is due.
    ///
    /// While paused this future pends forever; `tokio::select!` keeps
    /// servicing its other branches. The future is cancel-safe: dropping
    /// it before the deadline leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            return std::future::pending().await;
        }

        let deadline = self.next_tick;
        time::sleep_until(deadline).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);
        // Provisional; replaced by `record_tick_end` once the work is done.
        self.next_tick = now + self.config.period;
        self.metrics.total_ticks += 1;

        let late_by = now.saturating_duration_since(deadline);
        trace!(tick = self.tick_count, late_us = late_by.as_micros() as u64, "tick fired");

        TickInfo {
            tick: self.tick_count,
            late_by,
        }
    }

    /// Record that the work for the current tick has finished and schedule
    /// the next tick one period from now.
    ///
    /// Without a preceding [`wait_for_tick`](Self::wait_for_tick) this is a
    /// no-op.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let end = Instant::now();
        let elapsed = end.saturating_duration_since(start);
        self.next_tick = end + self.config.period;

        let period = self.config.period;
        let utilization = elapsed.as_secs_f64() / period.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if elapsed >= period {
            self.metrics.total_overruns += 1;
        }
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                period_ms = period.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "broadcast tick approaching period"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Pause the schedule. `wait_for_tick` pends until [`resume`](Self::resume).
    ///
    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resume after a pause. The next tick is due one period from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.config.period;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// When the next tick is due.
    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
