use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub port: u16,
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    /// Probes per second since the session started.
    pub rate: f64,
    /// Estimated seconds left at the current rate.
    pub eta: f64,
}

impl ProgressSnapshot {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// Turns a processed-count sample into rate and ETA figures for one session.
#[derive(Clone, Debug)]
pub struct ProgressMonitor {
    port: u16,
    total: usize,
    started_at: Instant,
}

impl ProgressMonitor {
    pub fn new(port: u16, total: usize) -> Self {
        Self {
            port,
            total,
            started_at: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn sample(&self, processed: usize) -> ProgressSnapshot {
        self.sample_at(processed, self.started_at.elapsed())
    }

    pub fn sample_at(&self, processed: usize, elapsed: Duration) -> ProgressSnapshot {
        let completed = processed.min(self.total);
        let remaining = self.total - completed;
        let elapsed = elapsed.as_secs_f64();
        let rate = if elapsed > f64::EPSILON {
            completed as f64 / elapsed
        } else {
            0.0
        };
        let eta = if rate > 0.0 {
            remaining as f64 / rate
        } else {
            0.0
        };
        let percent = if self.total == 0 {
            100.0
        } else {
            completed as f64 * 100.0 / self.total as f64
        };
        ProgressSnapshot {
            port: self.port,
            completed,
            total: self.total,
            percent,
            rate,
            eta,
        }
    }
}
