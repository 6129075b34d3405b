//! Configuration management for ws-core
//!
//! Handles loading configuration from files and environment variables and
//! validates every station before an engine is built from it.

use crate::forecast::{ClimateRegion, Hemisphere};
use crate::models::{Location, MetricKind};
use crate::pressure::TrendParams;
use crate::WsCoreError;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WsCoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// External forecast fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_forecast_base_url")]
    pub base_url: String,
    /// Per-fetch timeout in seconds
    #[serde(default = "default_forecast_timeout")]
    pub timeout_seconds: u32,
    /// Transient retries inside one fetch
    #[serde(default = "default_forecast_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_forecast_interval")]
    pub interval_minutes: u32,
    /// Backoff after the first failed refresh, doubled per further failure
    #[serde(default = "default_min_retry")]
    pub min_retry_seconds: u32,
    #[serde(default = "default_max_retry")]
    pub max_retry_seconds: u32,
}

/// Unit assumed when a reading does not carry one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// Canonical metric units, as most station firmware reports
    #[default]
    Auto,
    Metric,
    Imperial,
}

/// Additive offsets applied after unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOffsets {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub wind_speed_ms: f64,
    pub wind_gust_ms: f64,
}

impl CalibrationOffsets {
    #[must_use]
    pub fn offset_for(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Temperature => self.temperature_c,
            MetricKind::Humidity => self.humidity_pct,
            MetricKind::Pressure => self.pressure_hpa,
            MetricKind::WindSpeed => self.wind_speed_ms,
            MetricKind::WindGust => self.wind_gust_ms,
            _ => 0.0,
        }
    }
}

/// Smoothing and trend fitting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kalman_process_noise: f64,
    pub kalman_measurement_noise: f64,
    /// Weight of the newest wind direction, in (0, 1]
    pub wind_smoothing_alpha: f64,
    pub trend_window_minutes: u32,
    pub trend_min_spacing_minutes: u32,
    pub trend_min_span_minutes: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kalman_process_noise: 0.01,
            kalman_measurement_noise: 0.5,
            wind_smoothing_alpha: crate::wind::DEFAULT_SMOOTHING_ALPHA,
            trend_window_minutes: 180,
            trend_min_spacing_minutes: 15,
            trend_min_span_minutes: 40,
        }
    }
}

impl FilterConfig {
    #[must_use]
    pub fn trend_params(&self) -> TrendParams {
        TrendParams {
            window: TimeDelta::minutes(i64::from(self.trend_window_minutes)),
            min_spacing: TimeDelta::minutes(i64::from(self.trend_min_spacing_minutes)),
            min_span: TimeDelta::minutes(i64::from(self.trend_min_span_minutes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub wind_gust_ms: f64,
    pub rain_rate_mm_h: f64,
    pub freeze_c: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            wind_gust_ms: 17.0,
            rain_rate_mm_h: 20.0,
            freeze_c: 0.0,
        }
    }
}

/// Local hours, inclusive at both ends, where station data and the forecast
/// weigh equally in the rain blend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvectiveHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for ConvectiveHours {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 18,
        }
    }
}

impl ConvectiveHours {
    #[must_use]
    pub fn contains(self, hour: u32) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunningConfig {
    pub light_rain_mm_h: f64,
    pub heavy_rain_mm_h: f64,
}

impl Default for RunningConfig {
    fn default() -> Self {
        Self {
            light_rain_mm_h: 0.2,
            heavy_rain_mm_h: 5.0,
        }
    }
}

/// Optional outputs; each one left off is simply absent from the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub zambretti: bool,
    pub laundry: bool,
    pub stargazing: bool,
    pub fire_risk: bool,
    pub running: bool,
    pub degree_days: bool,
    pub evapotranspiration: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            zambretti: true,
            laundry: false,
            stargazing: false,
            fire_risk: false,
            running: false,
            degree_days: false,
            evapotranspiration: false,
        }
    }
}

/// Everything one station instance needs; replaced wholesale on reconfigure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elevation_m: f64,
    #[serde(default)]
    pub location: Option<Location>,
    /// IANA zone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub climate_region: ClimateRegion,
    #[serde(default)]
    pub hemisphere: Hemisphere,
    #[serde(default)]
    pub unit_mode: UnitMode,
    #[serde(default = "default_staleness")]
    pub staleness_seconds: u64,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub alerts: AlertThresholds,
    #[serde(default)]
    pub calibration: CalibrationOffsets,
    /// Optional metrics whose absence degrades health
    #[serde(default = "default_expected_optional")]
    pub expected_optional: Vec<MetricKind>,
    #[serde(default)]
    pub convective_hours: ConvectiveHours,
    #[serde(default)]
    pub features: FeatureToggles,
    #[serde(default = "default_degree_day_base")]
    pub degree_day_base_c: f64,
    #[serde(default)]
    pub running: RunningConfig,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_forecast_timeout() -> u32 {
    20
}

fn default_forecast_max_retries() -> u32 {
    3
}

fn default_forecast_interval() -> u32 {
    30
}

fn default_min_retry() -> u32 {
    300
}

fn default_max_retry() -> u32 {
    3600
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_staleness() -> u64 {
    900
}

fn default_expected_optional() -> Vec<MetricKind> {
    vec![MetricKind::RainTotal]
}

fn default_degree_day_base() -> f64 {
    18.0
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_forecast_base_url(),
            timeout_seconds: default_forecast_timeout(),
            max_retries: default_forecast_max_retries(),
            interval_minutes: default_forecast_interval(),
            min_retry_seconds: default_min_retry(),
            max_retry_seconds: default_max_retry(),
        }
    }
}

impl StationConfig {
    /// A station with every option at its default
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            elevation_m: 0.0,
            location: None,
            timezone: default_timezone(),
            climate_region: ClimateRegion::default(),
            hemisphere: Hemisphere::default(),
            unit_mode: UnitMode::default(),
            staleness_seconds: default_staleness(),
            filters: FilterConfig::default(),
            alerts: AlertThresholds::default(),
            calibration: CalibrationOffsets::default(),
            expected_optional: default_expected_optional(),
            convective_hours: ConvectiveHours::default(),
            features: FeatureToggles::default(),
            degree_day_base_c: default_degree_day_base(),
            running: RunningConfig::default(),
        }
    }

    pub fn tz(&self) -> crate::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            WsCoreError::config(format!(
                "Station '{}': unknown timezone '{}': {e}",
                self.id, self.timezone
            ))
        })
    }

    #[must_use]
    pub fn staleness(&self) -> TimeDelta {
        TimeDelta::seconds(i64::try_from(self.staleness_seconds).unwrap_or(i64::MAX))
    }

    /// Validate this station; an engine is never built from an invalid one
    pub fn validate(&self) -> crate::Result<()> {
        let fail = |msg: String| Err(WsCoreError::config(format!("Station '{}': {msg}", self.id)));

        if self.id.trim().is_empty() {
            return Err(WsCoreError::config("Station id cannot be empty"));
        }
        if !(-500.0..=9000.0).contains(&self.elevation_m) {
            return fail(format!(
                "elevation {} m must be within -500..=9000 m",
                self.elevation_m
            ));
        }
        if !(60..=86_400).contains(&self.staleness_seconds) {
            return fail("staleness threshold must be within 60..=86400 seconds".to_string());
        }

        let f = &self.filters;
        if !(f.kalman_process_noise > 0.0) || !(f.kalman_measurement_noise > 0.0) {
            return fail("Kalman noise parameters must be greater than zero".to_string());
        }
        if !(f.wind_smoothing_alpha > 0.0 && f.wind_smoothing_alpha <= 1.0) {
            return fail("wind smoothing alpha must be within (0, 1]".to_string());
        }
        if f.trend_window_minutes < f.trend_min_span_minutes {
            return fail("trend window cannot be shorter than the minimum trend span".to_string());
        }
        if f.trend_window_minutes <= f.trend_min_spacing_minutes {
            return fail("trend window must exceed the trend sample spacing".to_string());
        }

        let hours = self.convective_hours;
        if hours.end_hour > 23 || hours.start_hour > hours.end_hour {
            return fail(format!(
                "convective hours {}..={} must be ordered and within 0..=23",
                hours.start_hour, hours.end_hour
            ));
        }

        if let Some(location) = &self.location
            && !location.is_valid()
        {
            return fail(format!(
                "coordinates {} are out of range",
                location.format_coordinates()
            ));
        }

        if !self.degree_day_base_c.is_finite() {
            return fail("degree-day base temperature must be finite".to_string());
        }
        if self.running.light_rain_mm_h > self.running.heavy_rain_mm_h {
            return fail("light rain penalty cannot exceed the heavy rain penalty".to_string());
        }

        self.tz()?;
        Ok(())
    }
}

impl WsCoreConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WSCORE_FORECAST__TIMEOUT_SECONDS=10 and the like
        builder = builder.add_source(
            Environment::with_prefix("WSCORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| format!("Failed to build configuration from {}", config_file.display()))?;

        let mut config: WsCoreConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ws-core").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.forecast.base_url.is_empty() {
            self.forecast.base_url = default_forecast_base_url();
        }
        if self.forecast.timeout_seconds == 0 {
            self.forecast.timeout_seconds = default_forecast_timeout();
        }
        if self.forecast.interval_minutes == 0 {
            self.forecast.interval_minutes = default_forecast_interval();
        }
        for station in &mut self.stations {
            if station.name.is_empty() {
                station.name.clone_from(&station.id);
            }
            if station.timezone.is_empty() {
                station.timezone = default_timezone();
            }
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_stations()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.forecast.timeout_seconds > 300 {
            return Err(WsCoreError::config("Forecast timeout cannot exceed 300 seconds").into());
        }

        if self.forecast.max_retries > 10 {
            return Err(WsCoreError::config("Forecast max retries cannot exceed 10").into());
        }

        if self.forecast.min_retry_seconds == 0
            || self.forecast.min_retry_seconds > self.forecast.max_retry_seconds
        {
            return Err(WsCoreError::config(format!(
                "Forecast retry bounds must satisfy 0 < min ({}) <= max ({})",
                self.forecast.min_retry_seconds, self.forecast.max_retry_seconds
            ))
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WsCoreError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WsCoreError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.forecast.base_url.starts_with("http://")
            && !self.forecast.base_url.starts_with("https://")
        {
            return Err(
                WsCoreError::config("Forecast base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }

    fn validate_stations(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for station in &self.stations {
            station.validate()?;
            if !seen.insert(station.id.as_str()) {
                return Err(
                    WsCoreError::config(format!("Duplicate station id '{}'", station.id)).into(),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = WsCoreConfig::default();
        assert_eq!(config.forecast.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.forecast.timeout_seconds, 20);
        assert_eq!(config.forecast.interval_minutes, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.stations.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_station_is_valid() {
        let station = StationConfig::new("garden");
        assert!(station.validate().is_ok());
        assert_eq!(station.expected_optional, vec![MetricKind::RainTotal]);
        assert!(station.features.zambretti);
        assert!(!station.features.laundry);
        assert_eq!(station.staleness(), TimeDelta::minutes(15));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = WsCoreConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = WsCoreConfig::default();
        config.forecast.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = WsCoreConfig::default();
        config.forecast.min_retry_seconds = 7200;
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case::elevation(|s: &mut StationConfig| s.elevation_m = 9500.0)]
    #[case::staleness(|s: &mut StationConfig| s.staleness_seconds = 10)]
    #[case::kalman(|s: &mut StationConfig| s.filters.kalman_process_noise = 0.0)]
    #[case::alpha_zero(|s: &mut StationConfig| s.filters.wind_smoothing_alpha = 0.0)]
    #[case::alpha_above_one(|s: &mut StationConfig| s.filters.wind_smoothing_alpha = 1.5)]
    #[case::trend_window(|s: &mut StationConfig| s.filters.trend_window_minutes = 30)]
    #[case::convective(|s: &mut StationConfig| s.convective_hours = ConvectiveHours { start_hour: 19, end_hour: 6 })]
    #[case::coordinates(|s: &mut StationConfig| s.location = Some(Location::new(95.0, 0.0)))]
    #[case::timezone(|s: &mut StationConfig| s.timezone = "Mars/Olympus".to_string())]
    #[case::empty_id(|s: &mut StationConfig| s.id = String::new())]
    fn test_station_validation_rejects(#[case] mutate: fn(&mut StationConfig)) {
        let mut station = StationConfig::new("garden");
        mutate(&mut station);
        let err = station.validate().unwrap_err();
        assert!(matches!(err, WsCoreError::Config { .. }));
    }

    #[test]
    fn test_duplicate_station_ids() {
        let config = WsCoreConfig {
            stations: vec![StationConfig::new("a"), StationConfig::new("a")],
            ..WsCoreConfig::default()
        };
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Duplicate station id"));
    }

    #[test]
    fn test_convective_hours_inclusive() {
        let hours = ConvectiveHours::default();
        assert!(hours.contains(6));
        assert!(hours.contains(18));
        assert!(!hours.contains(19));
        assert!(!hours.contains(5));
    }

    #[test]
    fn test_calibration_offset_lookup() {
        let offsets = CalibrationOffsets {
            pressure_hpa: 1.5,
            ..CalibrationOffsets::default()
        };
        assert_eq!(offsets.offset_for(MetricKind::Pressure), 1.5);
        assert_eq!(offsets.offset_for(MetricKind::Illuminance), 0.0);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("ws-core-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"

[[stations]]
id = "roof"
elevation_m = 350.0
timezone = "Europe/Zurich"
climate_region = "continental_europe"
location = {{ latitude = 47.37, longitude = 8.54 }}

[stations.features]
laundry = true
"#
        )
        .unwrap();

        let config = WsCoreConfig::load_from_path(Some(path)).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.stations.len(), 1);
        let station = &config.stations[0];
        assert_eq!(station.name, "roof");
        assert_eq!(station.climate_region, ClimateRegion::ContinentalEurope);
        assert!(station.features.laundry);
        assert!(station.features.zambretti);
        assert_eq!(station.tz().unwrap(), chrono_tz::Europe::Zurich);
    }

    #[test]
    fn test_config_path_generation() {
        let path = WsCoreConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("ws-core"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
