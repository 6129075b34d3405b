//! The immutable per-tick output

use super::{ForecastTile, NormalizedReadings};
use crate::activity::{FireRisk, LaundryScore, RunningScore, Stargazing, UvLevel};
use crate::agro::{DegreeDays, Et0Method};
use crate::alerts::AlertSummary;
use crate::astro::{Daylight, MoonInfo};
use crate::forecast::{Condition, Severity, ZambrettiForecast};
use crate::pressure::PressureTrend;
use crate::psychro::{ComfortLevel, HumidityLevel, WetBulb};
use crate::quality::{HealthStatus, QualityFlag};
use crate::rain::{FilterQuality, RainIntensity};
use crate::rolling::WindowStats;
use crate::wind::{Beaufort, Quadrant};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Psychrometrics {
    pub dew_point_c: f64,
    /// Physically meaningful only below 0 °C
    pub frost_point_c: f64,
    pub wet_bulb: Option<WetBulb>,
    pub apparent_temperature_c: Option<f64>,
    pub comfort: Option<ComfortLevel>,
    pub humidity_level: HumidityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureOutputs {
    pub station_hpa: f64,
    /// Needs air temperature
    pub mslp_hpa: Option<f64>,
    /// `None` while the history spans too little time
    pub trend_hpa_3h: Option<f64>,
    pub trend: PressureTrend,
    pub trend_arrow: &'static str,
    pub change_over_window_hpa: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainOutputs {
    pub raw_rate_mm_h: f64,
    pub filtered_rate_mm_h: f64,
    pub intensity: RainIntensity,
    pub last_hour_mm: f64,
    pub last_24h_mm: f64,
    pub since_baseline_mm: Option<f64>,
    pub last_rain_at: Option<DateTime<Utc>>,
    pub filter_quality: FilterQuality,
    pub counter_reset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindOutputs {
    pub speed_ms: Option<f64>,
    pub gust_ms: Option<f64>,
    pub beaufort: Option<Beaufort>,
    pub direction_deg: Option<f64>,
    pub smoothed_direction_deg: Option<f64>,
    pub quadrant: Option<Quadrant>,
    pub cardinal: Option<&'static str>,
    pub gust_max_24h_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOutputs {
    pub condition: Condition,
    pub severity: Severity,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ForecastOutputs {
    pub zambretti: Option<ZambrettiForecast>,
    pub rain_probability_local: Option<u8>,
    pub rain_probability_combined: Option<u8>,
    pub condition: Option<ConditionOutputs>,
    pub tiles: Vec<ForecastTile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UvOutputs {
    pub index: f64,
    pub level: UvLevel,
    pub recommendation: &'static str,
    pub burn_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evapotranspiration {
    pub daily_mm: f64,
    pub hourly_mm: f64,
    pub method: Et0Method,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActivityScores {
    pub laundry: Option<LaundryScore>,
    pub stargazing: Option<Stargazing>,
    pub fire_risk: Option<FireRisk>,
    pub running: Option<RunningScore>,
}

/// Everything derived in one tick from one frozen reading set.
///
/// Sections that depend on a missing input are `None`; the snapshot itself
/// is always produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSnapshot {
    pub station_id: String,
    pub computed_at: DateTime<Utc>,
    pub health: HealthStatus,
    pub quality_flags: Vec<QualityFlag>,
    pub readings: NormalizedReadings,
    pub psychrometrics: Option<Psychrometrics>,
    pub pressure: Option<PressureOutputs>,
    pub rain: Option<RainOutputs>,
    pub wind: WindOutputs,
    pub temperature_24h: Option<WindowStats>,
    pub uv: Option<UvOutputs>,
    pub forecast: ForecastOutputs,
    pub alerts: AlertSummary,
    pub degree_days: Option<DegreeDays>,
    pub evapotranspiration: Option<Evapotranspiration>,
    pub moon: MoonInfo,
    pub daylight: Daylight,
    pub activities: ActivityScores,
}
