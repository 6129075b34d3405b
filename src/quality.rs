//! Freshness, physical-range and cross-field checks
//!
//! Every violation becomes a [`QualityFlag`]; values are never discarded
//! here. Health is derived from the flags and the core-metric freshness.

use crate::models::{Measurement, MetricKind, NormalizedReadings};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed slack before dew point above air temperature is flagged
pub const DEW_POINT_TOLERANCE_C: f64 = 0.5;
/// Gusts may read slightly under the mean speed on some anemometers
pub const GUST_TOLERANCE_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityFlag {
    Missing {
        metric: MetricKind,
    },
    Stale {
        metric: MetricKind,
        age_seconds: i64,
    },
    OutOfRange {
        metric: MetricKind,
        value: f64,
        min: f64,
        max: f64,
    },
    DewPointAboveTemperature {
        dew_point_c: f64,
        temperature_c: f64,
    },
    GustBelowSpeed {
        gust_ms: f64,
        speed_ms: f64,
    },
    UnitMismatch {
        metric: MetricKind,
        unit: String,
    },
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityFlag::Missing { metric } => write!(f, "{metric} missing"),
            QualityFlag::Stale {
                metric,
                age_seconds,
            } => write!(f, "{metric} stale ({age_seconds}s)"),
            QualityFlag::OutOfRange {
                metric,
                value,
                min,
                max,
            } => write!(f, "{metric} {value:.1} outside {min}..{max}"),
            QualityFlag::DewPointAboveTemperature {
                dew_point_c,
                temperature_c,
            } => write!(
                f,
                "dew point {dew_point_c:.1}°C above temperature {temperature_c:.1}°C"
            ),
            QualityFlag::GustBelowSpeed { gust_ms, speed_ms } => {
                write!(f, "gust {gust_ms:.1} m/s below wind speed {speed_ms:.1} m/s")
            }
            QualityFlag::UnitMismatch { metric, unit } => {
                write!(f, "{metric} reported in unusable unit '{unit}'")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Online,
    Degraded,
    Stale,
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Online => "online",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Stale => "stale",
            HealthStatus::Offline => "offline",
        };
        f.write_str(label)
    }
}

/// Physically plausible bounds per metric, inclusive
#[must_use]
pub fn physical_range(kind: MetricKind) -> Option<(f64, f64)> {
    match kind {
        MetricKind::Temperature | MetricKind::DewPoint => Some((-60.0, 60.0)),
        MetricKind::Humidity => Some((0.0, 100.0)),
        MetricKind::Pressure => Some((870.0, 1085.0)),
        MetricKind::WindSpeed | MetricKind::WindGust => Some((0.0, 113.0)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub health: HealthStatus,
    pub flags: Vec<QualityFlag>,
    pub stale: Vec<MetricKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityMonitor {
    staleness: TimeDelta,
    expected_optional: Vec<MetricKind>,
}

impl QualityMonitor {
    #[must_use]
    pub fn new(staleness: TimeDelta, expected_optional: Vec<MetricKind>) -> Self {
        Self {
            staleness,
            expected_optional,
        }
    }

    /// Check one tick's readings.
    ///
    /// `dew_point_c` is the dew point used for the cross-check (sensor or
    /// computed); `upstream` carries flags raised during normalization.
    #[must_use]
    pub fn assess(
        &self,
        readings: &NormalizedReadings,
        now: DateTime<Utc>,
        dew_point_c: Option<f64>,
        upstream: Vec<QualityFlag>,
    ) -> QualityReport {
        let mut flags = upstream;
        let mut stale = Vec::new();
        let mut absent_core = 0usize;

        for kind in MetricKind::CORE {
            match readings.get(kind) {
                Measurement::Unavailable => {
                    absent_core += 1;
                    flags.push(QualityFlag::Missing { metric: kind });
                }
                Measurement::Available { updated_at, .. } => {
                    let age = now - updated_at;
                    if kind.checks_staleness() && age > self.staleness {
                        stale.push(kind);
                        flags.push(QualityFlag::Stale {
                            metric: kind,
                            age_seconds: age.num_seconds(),
                        });
                    }
                }
            }
        }

        for (kind, measurement) in readings.iter() {
            if let (Some(value), Some((min, max))) = (measurement.value(), physical_range(kind)) {
                if !(min..=max).contains(&value) {
                    flags.push(QualityFlag::OutOfRange {
                        metric: kind,
                        value,
                        min,
                        max,
                    });
                }
            }
        }

        if let (Some(dew_point_c), Some(temperature_c)) =
            (dew_point_c, readings.value(MetricKind::Temperature))
        {
            if dew_point_c > temperature_c + DEW_POINT_TOLERANCE_C {
                flags.push(QualityFlag::DewPointAboveTemperature {
                    dew_point_c,
                    temperature_c,
                });
            }
        }

        if let (Some(gust_ms), Some(speed_ms)) = (
            readings.value(MetricKind::WindGust),
            readings.value(MetricKind::WindSpeed),
        ) {
            if gust_ms < speed_ms * GUST_TOLERANCE_RATIO {
                flags.push(QualityFlag::GustBelowSpeed { gust_ms, speed_ms });
            }
        }

        let optional_missing = self
            .expected_optional
            .iter()
            .any(|kind| readings.value(*kind).is_none());

        let health = if absent_core + stale.len() == MetricKind::CORE.len() {
            HealthStatus::Offline
        } else if !stale.is_empty() {
            HealthStatus::Stale
        } else if optional_missing || !flags.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Online
        };

        QualityReport {
            health,
            flags,
            stale,
        }
    }
}

/// METAR observations older than this are not compared
pub const METAR_MAX_AGE_MINUTES: f64 = 90.0;
const METAR_MATCH_TEMP_C: f64 = 2.5;
const METAR_MATCH_PRESSURE_HPA: f64 = 3.0;
const METAR_PLAUSIBLE_TEMP_C: f64 = 5.0;
const METAR_PLAUSIBLE_PRESSURE_HPA: f64 = 6.0;

/// Agreement of the station with a nearby airport METAR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetarAgreement {
    Match,
    Plausible,
    CheckSensor,
    StaleMetar,
    NoData,
}

impl fmt::Display for MetarAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetarAgreement::Match => "Match",
            MetarAgreement::Plausible => "Plausible",
            MetarAgreement::CheckSensor => "Check sensor",
            MetarAgreement::StaleMetar => "Stale METAR",
            MetarAgreement::NoData => "No data",
        })
    }
}

/// Classify local-minus-METAR deltas. A missing delta counts as agreeing,
/// so one comparable field is enough.
#[must_use]
pub fn metar_agreement(
    delta_temp_c: Option<f64>,
    delta_pressure_hpa: Option<f64>,
    age_minutes: Option<f64>,
) -> MetarAgreement {
    if delta_temp_c.is_none() && delta_pressure_hpa.is_none() {
        return MetarAgreement::NoData;
    }
    if age_minutes.is_some_and(|age| age > METAR_MAX_AGE_MINUTES) {
        return MetarAgreement::StaleMetar;
    }

    let within = |delta: Option<f64>, limit: f64| delta.is_none_or(|d| d.abs() <= limit);
    if within(delta_temp_c, METAR_MATCH_TEMP_C)
        && within(delta_pressure_hpa, METAR_MATCH_PRESSURE_HPA)
    {
        MetarAgreement::Match
    } else if within(delta_temp_c, METAR_PLAUSIBLE_TEMP_C)
        && within(delta_pressure_hpa, METAR_PLAUSIBLE_PRESSURE_HPA)
    {
        MetarAgreement::Plausible
    } else {
        MetarAgreement::CheckSensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn fresh(value: f64) -> Measurement {
        Measurement::Available {
            value,
            updated_at: now() - TimeDelta::seconds(30),
        }
    }

    fn full_set() -> NormalizedReadings {
        let mut readings = NormalizedReadings::new();
        readings.insert(MetricKind::Temperature, fresh(18.0));
        readings.insert(MetricKind::Humidity, fresh(60.0));
        readings.insert(MetricKind::Pressure, fresh(1012.0));
        readings.insert(MetricKind::WindSpeed, fresh(3.0));
        readings.insert(MetricKind::WindGust, fresh(5.0));
        readings.insert(MetricKind::WindDirection, fresh(220.0));
        readings.insert(MetricKind::RainTotal, fresh(12.0));
        readings
    }

    fn monitor() -> QualityMonitor {
        QualityMonitor::new(TimeDelta::seconds(900), vec![MetricKind::RainTotal])
    }

    #[test]
    fn test_all_fresh_is_online() {
        let report = monitor().assess(&full_set(), now(), Some(10.0), vec![]);
        assert_eq!(report.health, HealthStatus::Online);
        assert!(report.flags.is_empty());
    }

    #[test]
    fn test_missing_direction_is_degraded() {
        let mut readings = full_set();
        readings.insert(MetricKind::WindDirection, Measurement::Unavailable);
        let report = monitor().assess(&readings, now(), Some(10.0), vec![]);
        assert_eq!(report.health, HealthStatus::Degraded);
        assert!(report.flags.contains(&QualityFlag::Missing {
            metric: MetricKind::WindDirection
        }));
    }

    #[test]
    fn test_stale_temperature_is_stale() {
        let mut readings = full_set();
        readings.insert(
            MetricKind::Temperature,
            Measurement::Available {
                value: 18.0,
                updated_at: now() - TimeDelta::seconds(1200),
            },
        );
        let report = monitor().assess(&readings, now(), Some(10.0), vec![]);
        assert_eq!(report.health, HealthStatus::Stale);
        assert_eq!(report.stale, vec![MetricKind::Temperature]);
    }

    #[test]
    fn test_everything_stale_or_absent_is_offline() {
        let old = Measurement::Available {
            value: 1.0,
            updated_at: now() - TimeDelta::hours(2),
        };
        let mut readings = NormalizedReadings::new();
        readings.insert(MetricKind::Temperature, old);
        readings.insert(MetricKind::Humidity, old);
        readings.insert(MetricKind::Pressure, Measurement::Unavailable);
        let report = monitor().assess(&readings, now(), None, vec![]);
        assert_eq!(report.health, HealthStatus::Offline);
    }

    #[test]
    fn test_static_rain_total_never_goes_stale() {
        let mut readings = full_set();
        readings.insert(
            MetricKind::RainTotal,
            Measurement::Available {
                value: 12.0,
                updated_at: now() - TimeDelta::days(3),
            },
        );
        let report = monitor().assess(&readings, now(), Some(10.0), vec![]);
        assert_eq!(report.health, HealthStatus::Online);
    }

    #[test]
    fn test_out_of_range_and_cross_checks_flagged() {
        let mut readings = full_set();
        readings.insert(MetricKind::Pressure, fresh(1100.0));
        readings.insert(MetricKind::WindGust, fresh(1.0));
        let report = monitor().assess(&readings, now(), Some(19.0), vec![]);

        assert_eq!(report.health, HealthStatus::Degraded);
        assert!(report.flags.iter().any(|f| matches!(
            f,
            QualityFlag::OutOfRange {
                metric: MetricKind::Pressure,
                ..
            }
        )));
        assert!(report
            .flags
            .iter()
            .any(|f| matches!(f, QualityFlag::GustBelowSpeed { .. })));
        assert!(report
            .flags
            .iter()
            .any(|f| matches!(f, QualityFlag::DewPointAboveTemperature { .. })));
    }

    #[test]
    fn test_dew_point_within_tolerance_not_flagged() {
        let report = monitor().assess(&full_set(), now(), Some(18.4), vec![]);
        assert_eq!(report.health, HealthStatus::Online);
    }

    #[rstest::rstest]
    #[case(None, None, Some(10.0), MetarAgreement::NoData)]
    #[case(Some(0.5), None, Some(120.0), MetarAgreement::StaleMetar)]
    #[case(Some(1.0), Some(-2.0), Some(30.0), MetarAgreement::Match)]
    #[case(None, Some(2.9), None, MetarAgreement::Match)]
    #[case(Some(-4.0), Some(1.0), Some(30.0), MetarAgreement::Plausible)]
    #[case(Some(1.0), Some(5.5), None, MetarAgreement::Plausible)]
    #[case(Some(7.0), Some(0.0), Some(30.0), MetarAgreement::CheckSensor)]
    #[case(None, Some(-9.0), Some(90.0), MetarAgreement::CheckSensor)]
    fn test_metar_agreement(
        #[case] delta_temp: Option<f64>,
        #[case] delta_pressure: Option<f64>,
        #[case] age: Option<f64>,
        #[case] expected: MetarAgreement,
    ) {
        assert_eq!(metar_agreement(delta_temp, delta_pressure, age), expected);
    }

    #[test]
    fn test_metar_labels() {
        assert_eq!(MetarAgreement::CheckSensor.to_string(), "Check sensor");
        assert_eq!(MetarAgreement::StaleMetar.to_string(), "Stale METAR");
    }
}
