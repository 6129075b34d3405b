//! Time-windowed rolling statistics
//!
//! A [`RollingWindow`] keeps `(timestamp, value)` samples and drops the ones
//! older than its window whenever it is read, so results depend only on
//! sample times and never on how often the engine ticks.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Summary of the samples currently inside a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow<T> {
    window: TimeDelta,
    samples: VecDeque<(DateTime<Utc>, T)>,
}

impl<T: Copy> RollingWindow<T> {
    #[must_use]
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Build a window pre-filled with previously exported samples.
    /// Out-of-order entries in the seed are sorted; pruning still happens on
    /// the first read.
    #[must_use]
    pub fn with_seed(window: TimeDelta, mut seed: Vec<(DateTime<Utc>, T)>) -> Self {
        seed.sort_by_key(|(ts, _)| *ts);
        Self {
            window,
            samples: seed.into(),
        }
    }

    /// Append a sample. Samples older than the newest one are ignored so the
    /// buffer stays ordered by time.
    pub fn push(&mut self, at: DateTime<Utc>, value: T) -> bool {
        if let Some((last, _)) = self.samples.back() {
            if at < *last {
                return false;
            }
        }
        self.samples.push_back((at, value));
        true
    }

    /// Drop everything older than `now - window`
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        while self.samples.front().is_some_and(|(ts, _)| *ts < cutoff) {
            self.samples.pop_front();
        }
    }

    /// Samples still inside the window at `now`
    pub fn values(&mut self, now: DateTime<Utc>) -> Vec<(DateTime<Utc>, T)> {
        self.prune(now);
        self.samples.iter().copied().collect()
    }

    /// Samples with a timestamp at or after `since`
    pub fn values_since(&mut self, now: DateTime<Utc>, since: DateTime<Utc>) -> Vec<T> {
        self.prune(now);
        self.samples
            .iter()
            .filter(|(ts, _)| *ts >= since)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Raw contents for the state seed
    #[must_use]
    pub fn export(&self) -> Vec<(DateTime<Utc>, T)> {
        self.samples.iter().copied().collect()
    }
}

impl<T: Copy + Into<f64>> RollingWindow<T> {
    /// Min/max/avg of the samples inside the window at `now`
    pub fn stats(&mut self, now: DateTime<Utc>) -> Option<WindowStats> {
        self.prune(now);
        let mut iter = self.samples.iter().map(|(_, v)| (*v).into());
        let first = iter.next()?;
        let (mut min, mut max, mut sum, mut count) = (first, first, first, 1usize);
        for v in iter {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        Some(WindowStats {
            min,
            max,
            avg: sum / count as f64,
            count,
        })
    }

    /// Max-only read, used for gusts
    pub fn max(&mut self, now: DateTime<Utc>) -> Option<f64> {
        self.stats(now).map(|s| s.max)
    }
}
