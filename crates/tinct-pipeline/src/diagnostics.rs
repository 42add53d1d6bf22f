//! Recompute instrumentation: which stages ran, over how many pixels,
//! and for how long.
//!
//! These diagnostics are permanent instrumentation for parameter
//! experimentation: every recompute the scheduler executes appends a
//! [`StageRun`] to the pipeline's [`ChainDiagnostics`]. Superseded and
//! no-op tasks record nothing -- the log shows work actually done.
//!
//! Durations use [`std::time::Duration`]; timestamps are captured
//! through the [`Clock`] trait so tests can supply a deterministic
//! clock. The default [`SystemClock`] uses the `web-time` crate, which
//! is `std::time::Instant` on native and `performance.now()` on WASM.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::Serialize;

use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }
}

/// Abstracts time measurement so recompute timing works on any target
/// and can be made deterministic in tests.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// One completed stage recompute.
#[derive(Debug, Clone, Serialize)]
pub struct StageRun {
    /// Chain index of the stage that ran.
    pub stage: usize,
    /// Label of the filter that was applied.
    pub filter: &'static str,
    /// Dimensions of the raster that was produced.
    pub dimensions: Dimensions,
    /// Number of pixels transformed.
    pub pixel_count: u64,
    /// Wall-clock duration of the recompute (seconds in JSON).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Accumulated stage runs, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainDiagnostics {
    runs: Vec<StageRun>,
}

impl ChainDiagnostics {
    pub(crate) fn record(&mut self, run: StageRun) {
        self.runs.push(run);
    }

    /// All recorded runs, oldest first.
    #[must_use]
    pub fn runs(&self) -> &[StageRun] {
        &self.runs
    }

    /// Whether anything has run since the last drain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total wall-clock time across all recorded runs.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.runs.iter().map(|run| run.duration).sum()
    }

    /// Drain the recorded runs, leaving the log empty.
    pub fn take(&mut self) -> Vec<StageRun> {
        std::mem::take(&mut self.runs)
    }

    /// Format the recorded runs as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Recompute Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "{:<7} {:<14} {:>11} {:>10} {:>8}",
            "Stage", "Filter", "Size", "Duration", "% Total",
        ));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration());
        for run in &self.runs {
            let ms = duration_ms(run.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<7} {:<14} {:>11} {:>8.3}ms {:>7.1}%",
                run.stage,
                run.filter,
                format!("{}x{}", run.dimensions.width, run.dimensions.height),
                ms,
                pct,
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Runs: {}  |  Total: {total_ms:.3}ms",
            self.runs.len(),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
