//! Sensor readings before and after normalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every sensor kind the engine knows how to ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
    WindGust,
    WindDirection,
    RainTotal,
    Illuminance,
    UvIndex,
    DewPoint,
    Battery,
    #[serde(rename = "pm2_5")]
    Pm25,
    Pm10,
}

impl MetricKind {
    /// The six metrics whose freshness decides station health
    pub const CORE: [MetricKind; 6] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Pressure,
        MetricKind::WindSpeed,
        MetricKind::WindGust,
        MetricKind::WindDirection,
    ];

    pub const ALL: [MetricKind; 13] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Pressure,
        MetricKind::WindSpeed,
        MetricKind::WindGust,
        MetricKind::WindDirection,
        MetricKind::RainTotal,
        MetricKind::Illuminance,
        MetricKind::UvIndex,
        MetricKind::DewPoint,
        MetricKind::Battery,
        MetricKind::Pm25,
        MetricKind::Pm10,
    ];

    #[must_use]
    pub fn is_core(self) -> bool {
        Self::CORE.contains(&self)
    }

    /// Rain totals, UV, battery and the like can sit unchanged for hours
    /// without the sensor being faulty, so only core metrics go stale.
    #[must_use]
    pub fn checks_staleness(self) -> bool {
        self.is_core()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
            MetricKind::Pressure => "pressure",
            MetricKind::WindSpeed => "wind_speed",
            MetricKind::WindGust => "wind_gust",
            MetricKind::WindDirection => "wind_direction",
            MetricKind::RainTotal => "rain_total",
            MetricKind::Illuminance => "illuminance",
            MetricKind::UvIndex => "uv_index",
            MetricKind::DewPoint => "dew_point",
            MetricKind::Battery => "battery",
            MetricKind::Pm25 => "pm2_5",
            MetricKind::Pm10 => "pm10",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_present() -> bool {
    true
}

/// One reading as delivered by the host, in whatever unit the sensor reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub kind: MetricKind,
    #[serde(default)]
    pub value: f64,
    /// Unit label as reported by the source ("°F", "km/h", "inHg", ...)
    #[serde(default)]
    pub unit: Option<String>,
    /// When the source last updated this value
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_present")]
    pub present: bool,
}

impl RawReading {
    #[must_use]
    pub fn new(kind: MetricKind, value: f64, unit: Option<&str>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            value,
            unit: unit.map(str::to_string),
            timestamp,
            present: true,
        }
    }

    /// A sensor that is wired up but currently reports nothing
    #[must_use]
    pub fn absent(kind: MetricKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            value: 0.0,
            unit: None,
            timestamp,
            present: false,
        }
    }
}

/// A canonical-unit value, or the explicit marker that there is none
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Measurement {
    Available {
        value: f64,
        updated_at: DateTime<Utc>,
    },
    Unavailable,
}

impl Measurement {
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            Measurement::Available { value, .. } => Some(*value),
            Measurement::Unavailable => None,
        }
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Measurement::Available { updated_at, .. } => Some(*updated_at),
            Measurement::Unavailable => None,
        }
    }
}

/// The frozen, canonical-unit reading set every stage of a tick reads from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReadings {
    readings: BTreeMap<MetricKind, Measurement>,
}

impl NormalizedReadings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: MetricKind, measurement: Measurement) {
        self.readings.insert(kind, measurement);
    }

    /// Metrics never delivered at all read as unavailable
    #[must_use]
    pub fn get(&self, kind: MetricKind) -> Measurement {
        self.readings
            .get(&kind)
            .copied()
            .unwrap_or(Measurement::Unavailable)
    }

    #[must_use]
    pub fn value(&self, kind: MetricKind) -> Option<f64> {
        self.get(kind).value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, Measurement)> + '_ {
        self.readings.iter().map(|(k, m)| (*k, *m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metric_reads_unavailable() {
        let readings = NormalizedReadings::new();
        assert_eq!(readings.get(MetricKind::Humidity), Measurement::Unavailable);
        assert!(readings.value(MetricKind::Humidity).is_none());
    }

    #[test]
    fn test_core_metrics() {
        assert!(MetricKind::WindDirection.is_core());
        assert!(!MetricKind::RainTotal.is_core());
        assert!(!MetricKind::UvIndex.checks_staleness());
    }

    #[test]
    fn test_raw_reading_deserializes_with_defaults() {
        let json = r#"{"kind":"pm2_5","value":12.0,"timestamp":"2026-01-01T00:00:00Z"}"#;
        let reading: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.kind, MetricKind::Pm25);
        assert!(reading.present);
        assert!(reading.unit.is_none());
    }
}
