//! Rain rate extraction and smoothing
//!
//! The gauge reports a cumulative total. Rate is the positive delta over
//! elapsed hours, capped at [`MAX_RAIN_RATE_MM_H`], then smoothed by a 1-D
//! Kalman filter. A decreasing total is a counter reset and re-baselines
//! instead of producing a negative rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Just above the highest tipping-bucket rates ever recorded
pub const MAX_RAIN_RATE_MM_H: f64 = 500.0;
/// Filtered rate at or above which it counts as raining
pub const RAIN_DETECTION_MM_H: f64 = 0.05;
pub const INITIAL_ERROR_VARIANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterQuality {
    Excellent,
    Good,
    Fair,
    Uncertain,
}

impl fmt::Display for FilterQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FilterQuality::Excellent => "excellent",
            FilterQuality::Good => "good",
            FilterQuality::Fair => "fair",
            FilterQuality::Uncertain => "uncertain",
        };
        f.write_str(label)
    }
}

/// Scalar Kalman filter with a constant-state process model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanFilter1D {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub estimate: f64,
    pub error_variance: f64,
}

impl KalmanFilter1D {
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: 0.0,
            error_variance: INITIAL_ERROR_VARIANCE,
        }
    }

    /// Fold in one measurement and return the non-negative estimate
    pub fn update(&mut self, measurement: f64) -> f64 {
        let predicted = self.error_variance + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_variance = (1.0 - gain) * predicted;
        self.current()
    }

    #[must_use]
    pub fn current(&self) -> f64 {
        self.estimate.max(0.0)
    }

    pub fn reset_to(&mut self, value: f64) {
        self.estimate = value;
        self.error_variance = INITIAL_ERROR_VARIANCE;
    }

    #[must_use]
    pub fn quality(&self) -> FilterQuality {
        match self.error_variance {
            p if p < 0.1 => FilterQuality::Excellent,
            p if p < 0.3 => FilterQuality::Good,
            p if p < 0.6 => FilterQuality::Fair,
            _ => FilterQuality::Uncertain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainIntensity {
    Dry,
    Drizzle,
    Light,
    Moderate,
    Heavy,
}

impl RainIntensity {
    #[must_use]
    pub fn from_rate(rate_mm_h: f64) -> Self {
        match rate_mm_h {
            r if r > 10.0 => RainIntensity::Heavy,
            r if r > 2.0 => RainIntensity::Moderate,
            r if r > 0.5 => RainIntensity::Light,
            r if r > 0.0 => RainIntensity::Drizzle,
            _ => RainIntensity::Dry,
        }
    }
}

impl fmt::Display for RainIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RainIntensity::Dry => "Dry",
            RainIntensity::Drizzle => "Drizzle",
            RainIntensity::Light => "Light",
            RainIntensity::Moderate => "Moderate",
            RainIntensity::Heavy => "Heavy",
        };
        f.write_str(label)
    }
}

/// Outcome of feeding one cumulative total to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainSample {
    pub raw_rate_mm_h: f64,
    pub filtered_rate_mm_h: f64,
    pub counter_reset: bool,
}

/// Persisted part of a [`RainTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RainSeed {
    pub baseline: Option<f64>,
    pub last_total: Option<f64>,
    pub last_at: Option<DateTime<Utc>>,
    pub last_raw_rate: f64,
    pub last_rain_at: Option<DateTime<Utc>>,
    pub estimate: f64,
    pub error_variance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RainTracker {
    baseline: Option<f64>,
    last_total: Option<f64>,
    last_at: Option<DateTime<Utc>>,
    last_raw_rate: f64,
    last_rain_at: Option<DateTime<Utc>>,
    filter: KalmanFilter1D,
}

impl RainTracker {
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            baseline: None,
            last_total: None,
            last_at: None,
            last_raw_rate: 0.0,
            last_rain_at: None,
            filter: KalmanFilter1D::new(process_noise, measurement_noise),
        }
    }

    /// Restore tracker state; noise parameters always come from config
    #[must_use]
    pub fn with_seed(process_noise: f64, measurement_noise: f64, seed: RainSeed) -> Self {
        let mut filter = KalmanFilter1D::new(process_noise, measurement_noise);
        filter.estimate = seed.estimate;
        if seed.error_variance > 0.0 {
            filter.error_variance = seed.error_variance;
        }
        Self {
            baseline: seed.baseline,
            last_total: seed.last_total,
            last_at: seed.last_at,
            last_raw_rate: seed.last_raw_rate,
            last_rain_at: seed.last_rain_at,
            filter,
        }
    }

    /// Feed the cumulative total observed at `at`
    pub fn update(&mut self, total_mm: f64, at: DateTime<Utc>) -> RainSample {
        let (Some(last_total), Some(last_at)) = (self.last_total, self.last_at) else {
            self.baseline = Some(total_mm);
            self.last_total = Some(total_mm);
            self.last_at = Some(at);
            self.last_raw_rate = 0.0;
            return RainSample {
                raw_rate_mm_h: 0.0,
                filtered_rate_mm_h: self.filter.current(),
                counter_reset: false,
            };
        };

        if total_mm < last_total {
            warn!(
                previous_mm = last_total,
                current_mm = total_mm,
                "Rain counter decreased, re-baselining"
            );
            self.baseline = Some(total_mm);
            self.last_total = Some(total_mm);
            self.last_at = Some(at);
            self.last_raw_rate = 0.0;
            let filtered = self.filter.update(0.0);
            self.mark_rain(filtered, at);
            return RainSample {
                raw_rate_mm_h: 0.0,
                filtered_rate_mm_h: filtered,
                counter_reset: true,
            };
        }

        let elapsed_hours = (at - last_at).num_milliseconds() as f64 / 3_600_000.0;
        if elapsed_hours <= 0.0 {
            return RainSample {
                raw_rate_mm_h: 0.0,
                filtered_rate_mm_h: self.filter.current(),
                counter_reset: false,
            };
        }

        let raw = ((total_mm - last_total) / elapsed_hours).clamp(0.0, MAX_RAIN_RATE_MM_H);
        let filtered = self.filter.update(raw);

        self.last_total = Some(total_mm);
        self.last_at = Some(at);
        self.last_raw_rate = raw;
        self.mark_rain(filtered, at);

        RainSample {
            raw_rate_mm_h: raw,
            filtered_rate_mm_h: filtered,
            counter_reset: false,
        }
    }

    fn mark_rain(&mut self, filtered: f64, at: DateTime<Utc>) {
        if filtered >= RAIN_DETECTION_MM_H {
            self.last_rain_at = Some(at);
        }
    }

    /// Treat the current total as zero and restart the filter from the last
    /// raw rate. Used after the physical counter was cleared externally.
    pub fn reset_baseline(&mut self) {
        self.baseline = self.last_total;
        self.filter.reset_to(self.last_raw_rate);
        info!(baseline_mm = ?self.baseline, "Rain baseline reset");
    }

    /// Rain counted since the current baseline
    #[must_use]
    pub fn since_baseline(&self) -> Option<f64> {
        Some(self.last_total? - self.baseline?)
    }

    #[must_use]
    pub fn last_rain_at(&self) -> Option<DateTime<Utc>> {
        self.last_rain_at
    }

    #[must_use]
    pub fn filter(&self) -> &KalmanFilter1D {
        &self.filter
    }

    #[must_use]
    pub fn export(&self) -> RainSeed {
        RainSeed {
            baseline: self.baseline,
            last_total: self.last_total,
            last_at: self.last_at,
            last_raw_rate: self.last_raw_rate,
            last_rain_at: self.last_rain_at,
            estimate: self.filter.estimate,
            error_variance: self.filter.error_variance,
        }
    }
}

/// Rain fallen across a run of cumulative totals; drops (counter resets)
/// contribute nothing.
#[must_use]
pub fn accumulation(totals: &[f64]) -> f64 {
    totals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 3, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_first_sample_has_zero_rate() {
        let mut tracker = RainTracker::new(0.01, 0.5);
        let sample = tracker.update(42.0, t0());
        assert_eq!(sample.raw_rate_mm_h, 0.0);
        assert_eq!(tracker.filter().error_variance, INITIAL_ERROR_VARIANCE);
    }

    #[test]
    fn test_counter_reset_never_goes_negative() {
        let mut tracker = RainTracker::new(0.01, 0.5);
        let rates: Vec<RainSample> = [100.0, 105.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, total)| tracker.update(*total, t0() + TimeDelta::minutes(30 * i as i64)))
            .collect();

        assert!(rates.iter().all(|s| s.raw_rate_mm_h >= 0.0));
        assert!((rates[1].raw_rate_mm_h - 10.0).abs() < 1e-9);
        assert_eq!(rates[2].raw_rate_mm_h, 0.0);
        assert!(rates[2].counter_reset);
        assert_eq!(tracker.since_baseline(), Some(0.0));
    }

    #[test]
    fn test_raw_rate_is_capped() {
        let mut tracker = RainTracker::new(0.01, 0.5);
        tracker.update(0.0, t0());
        let sample = tracker.update(200.0, t0() + TimeDelta::minutes(1));
        assert_eq!(sample.raw_rate_mm_h, MAX_RAIN_RATE_MM_H);
    }

    #[test]
    fn test_kalman_converges_on_constant_input() {
        let mut filter = KalmanFilter1D::new(0.01, 0.5);
        let mut out = 0.0;
        for _ in 0..100 {
            out = filter.update(4.0);
        }
        assert!((out - 4.0).abs() < 1e-3, "got {out}");
        assert_eq!(filter.quality(), FilterQuality::Excellent);
    }

    #[test]
    fn test_reset_baseline_restarts_filter_from_last_raw() {
        let mut tracker = RainTracker::new(0.01, 0.5);
        tracker.update(10.0, t0());
        tracker.update(11.0, t0() + TimeDelta::hours(1));
        tracker.reset_baseline();

        assert_eq!(tracker.since_baseline(), Some(0.0));
        assert_eq!(tracker.filter().estimate, 1.0);
        assert_eq!(tracker.filter().error_variance, INITIAL_ERROR_VARIANCE);
    }

    #[test]
    fn test_seed_round_trip_keeps_filter_state() {
        let mut tracker = RainTracker::new(0.01, 0.5);
        tracker.update(1.0, t0());
        tracker.update(3.0, t0() + TimeDelta::minutes(30));
        let restored = RainTracker::with_seed(0.01, 0.5, tracker.export());
        assert_eq!(restored, tracker);
    }

    #[test]
    fn test_accumulation_ignores_drops() {
        assert_eq!(accumulation(&[1.0, 2.0, 0.5, 1.5]), 2.0);
        assert_eq!(accumulation(&[3.0]), 0.0);
    }

    #[rstest]
    #[case(0.0, RainIntensity::Dry)]
    #[case(0.2, RainIntensity::Drizzle)]
    #[case(1.0, RainIntensity::Light)]
    #[case(5.0, RainIntensity::Moderate)]
    #[case(12.0, RainIntensity::Heavy)]
    fn test_intensity(#[case] rate: f64, #[case] expected: RainIntensity) {
        assert_eq!(RainIntensity::from_rate(rate), expected);
    }
}
