//! Sea-level reduction and pressure tendency
//!
//! MSLP uses the hypsometric reduction with the instantaneous air
//! temperature (not the 12 h mean), so accuracy falls off with elevation:
//! roughly ±0.3 hPa below 500 m and ±1 hPa at 2000 m.
//!
//! The tendency is an ordinary least-squares fit of station pressure against
//! elapsed seconds over a throttled, time-windowed history, scaled to
//! hPa per 3 hours.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// g / R_d, in the form used by the hypsometric reduction
pub const SLP_GAS_CONSTANT_RATIO: f64 = 29.263;

pub const TREND_RISING_RAPIDLY: f64 = 1.6;
pub const TREND_RISING: f64 = 0.8;
pub const TREND_FALLING: f64 = -0.8;
pub const TREND_FALLING_RAPIDLY: f64 = -1.6;

const SECONDS_PER_3H: f64 = 3.0 * 3600.0;

/// Reduce station pressure to mean sea level
#[must_use]
pub fn sea_level_pressure(station_hpa: f64, elevation_m: f64, temp_c: f64) -> f64 {
    // absolute zero guard
    let temp_k = (temp_c + 273.15).max(1.0);
    station_hpa * (elevation_m / (temp_k * SLP_GAS_CONSTANT_RATIO)).exp()
}

/// WMO-aligned 3-hour tendency classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureTrend {
    RisingRapidly,
    Rising,
    Steady,
    Falling,
    FallingRapidly,
}

impl PressureTrend {
    /// Classify a slope in hPa/3h.
    ///
    /// Exactly ±0.8 is already Rising/Falling; only values strictly beyond
    /// ±1.6 count as rapid.
    #[must_use]
    pub fn classify(slope_hpa_3h: f64) -> Self {
        if slope_hpa_3h > TREND_RISING_RAPIDLY {
            PressureTrend::RisingRapidly
        } else if slope_hpa_3h >= TREND_RISING {
            PressureTrend::Rising
        } else if slope_hpa_3h > TREND_FALLING {
            PressureTrend::Steady
        } else if slope_hpa_3h >= TREND_FALLING_RAPIDLY {
            PressureTrend::Falling
        } else {
            PressureTrend::FallingRapidly
        }
    }

    #[must_use]
    pub fn arrow(self) -> &'static str {
        match self {
            PressureTrend::RisingRapidly => "↑↑",
            PressureTrend::Rising => "↑",
            PressureTrend::Steady => "→",
            PressureTrend::Falling => "↓",
            PressureTrend::FallingRapidly => "↓↓",
        }
    }
}

impl fmt::Display for PressureTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PressureTrend::RisingRapidly => "Rising Rapidly",
            PressureTrend::Rising => "Rising",
            PressureTrend::Steady => "Steady",
            PressureTrend::Falling => "Falling",
            PressureTrend::FallingRapidly => "Falling Rapidly",
        };
        f.write_str(label)
    }
}

/// History length and throttling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendParams {
    pub window: TimeDelta,
    pub min_spacing: TimeDelta,
    pub min_span: TimeDelta,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window: TimeDelta::hours(3),
            min_spacing: TimeDelta::minutes(15),
            min_span: TimeDelta::minutes(40),
        }
    }
}

/// Fitted tendency; `slope_hpa_3h` is `None` while the history is too short
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub slope_hpa_3h: Option<f64>,
    pub trend: PressureTrend,
}

/// Station pressure samples, strictly increasing in time and all inside the
/// configured window.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureHistory {
    params: TrendParams,
    samples: VecDeque<(DateTime<Utc>, f64)>,
}

impl PressureHistory {
    #[must_use]
    pub fn new(params: TrendParams) -> Self {
        Self {
            params,
            samples: VecDeque::new(),
        }
    }

    /// Restore from exported samples; anything out of order is dropped
    #[must_use]
    pub fn with_seed(params: TrendParams, seed: Vec<(DateTime<Utc>, f64)>) -> Self {
        let mut history = Self::new(params);
        for (at, hpa) in seed {
            if history.samples.back().is_none_or(|(last, _)| at > *last) {
                history.samples.push_back((at, hpa));
            }
        }
        history
    }

    /// Offer a sample. It is kept only if at least `min_spacing` has passed
    /// since the last retained one; the window is pruned either way.
    pub fn record(&mut self, at: DateTime<Utc>, station_hpa: f64) -> bool {
        let accepted = match self.samples.back() {
            None => true,
            Some((last, _)) => at > *last && at - *last >= self.params.min_spacing,
        };
        if accepted {
            self.samples.push_back((at, station_hpa));
        }
        self.prune(at);
        accepted
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.params.window;
        while self.samples.front().is_some_and(|(ts, _)| *ts < cutoff) {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time between oldest and newest retained sample
    #[must_use]
    pub fn span(&self) -> TimeDelta {
        match (self.samples.front(), self.samples.back()) {
            (Some((first, _)), Some((last, _))) => *last - *first,
            _ => TimeDelta::zero(),
        }
    }

    /// Newest minus oldest retained pressure
    #[must_use]
    pub fn change_over_window(&self) -> Option<f64> {
        match (self.samples.front(), self.samples.back()) {
            (Some((_, first)), Some((_, last))) if self.samples.len() >= 2 => Some(last - first),
            _ => None,
        }
    }

    /// Least-squares tendency in hPa/3h; indeterminate histories read Steady
    #[must_use]
    pub fn trend(&self) -> TrendReading {
        let slope_hpa_3h = if self.samples.len() < 2 || self.span() < self.params.min_span {
            None
        } else {
            self.ols_slope_per_second().map(|s| s * SECONDS_PER_3H)
        };

        TrendReading {
            slope_hpa_3h,
            trend: slope_hpa_3h.map_or(PressureTrend::Steady, PressureTrend::classify),
        }
    }

    fn ols_slope_per_second(&self) -> Option<f64> {
        let (origin, _) = *self.samples.front()?;
        let points: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|(ts, p)| ((*ts - origin).num_milliseconds() as f64 / 1000.0, *p))
            .collect();

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });

        if den == 0.0 { None } else { Some(num / den) }
    }

    #[must_use]
    pub fn export(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_mslp_identity_at_sea_level() {
        assert_eq!(sea_level_pressure(1013.25, 0.0, 15.0), 1013.25);
    }

    #[test]
    fn test_mslp_increases_with_elevation() {
        let mslp = sea_level_pressure(950.0, 500.0, 10.0);
        // ~6.2% per 500m at 10 °C
        assert!(mslp > 1007.0 && mslp < 1010.0, "got {mslp}");
    }

    #[rstest]
    #[case(0.8, PressureTrend::Rising)]
    #[case(1.6, PressureTrend::Rising)]
    #[case(1.600_000_1, PressureTrend::RisingRapidly)]
    #[case(0.799_999, PressureTrend::Steady)]
    #[case(0.0, PressureTrend::Steady)]
    #[case(-0.8, PressureTrend::Falling)]
    #[case(-1.6, PressureTrend::Falling)]
    #[case(-1.600_000_1, PressureTrend::FallingRapidly)]
    fn test_trend_boundaries(#[case] slope: f64, #[case] expected: PressureTrend) {
        assert_eq!(PressureTrend::classify(slope), expected);
    }

    #[test]
    fn test_spacing_throttles_inserts() {
        let mut history = PressureHistory::new(TrendParams::default());
        assert!(history.record(t0(), 1010.0));
        assert!(!history.record(t0() + TimeDelta::minutes(1), 1010.1));
        assert!(!history.record(t0() + TimeDelta::minutes(14), 1010.1));
        assert!(history.record(t0() + TimeDelta::minutes(15), 1010.2));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_window_prunes_old_samples() {
        let mut history = PressureHistory::new(TrendParams::default());
        for i in 0..20 {
            history.record(t0() + TimeDelta::minutes(15 * i), 1000.0);
        }
        assert!(history.span() <= TimeDelta::hours(3));
        assert_eq!(history.len(), 13);
    }

    #[test]
    fn test_trend_indeterminate_when_span_short() {
        let mut history = PressureHistory::new(TrendParams::default());
        history.record(t0(), 1000.0);
        history.record(t0() + TimeDelta::minutes(15), 1002.0);
        let reading = history.trend();
        assert!(reading.slope_hpa_3h.is_none());
        assert_eq!(reading.trend, PressureTrend::Steady);
    }

    #[test]
    fn test_linear_fall_is_recovered() {
        let mut history = PressureHistory::new(TrendParams::default());
        // -0.25 hPa every 15 min = -3 hPa/3h
        for i in 0..9 {
            history.record(t0() + TimeDelta::minutes(15 * i), 1012.0 - 0.25 * i as f64);
        }
        let reading = history.trend();
        let slope = reading.slope_hpa_3h.unwrap();
        assert!((slope + 3.0).abs() < 1e-9, "got {slope}");
        assert_eq!(reading.trend, PressureTrend::FallingRapidly);
        assert!((history.change_over_window().unwrap() + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_irregular_spacing_uses_elapsed_time() {
        let mut history = PressureHistory::new(TrendParams::default());
        history.record(t0(), 1000.0);
        history.record(t0() + TimeDelta::minutes(20), 1000.2);
        history.record(t0() + TimeDelta::minutes(90), 1000.9);
        let slope = history.trend().slope_hpa_3h.unwrap();
        assert!((slope - 1.8).abs() < 1e-9, "got {slope}");
    }
}
