//! Addressable outputs for the presentation layer
//!
//! Every snapshot field is exposed through a [`SensorDescriptor`]: a stable
//! key, a display name, a unit and an accessor. The engine never consults
//! this table; hosts call [`render`] on finished snapshots.

use crate::models::{DerivedSnapshot, MetricKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(f64),
    Integer(i64),
    Flag(bool),
    Time(DateTime<Utc>),
    Text(String),
}

pub struct SensorDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub value: fn(&DerivedSnapshot) -> Option<OutputValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedOutput {
    pub value: Option<OutputValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

fn num(v: f64) -> OutputValue {
    OutputValue::Number(v)
}

fn int(v: impl Into<i64>) -> OutputValue {
    OutputValue::Integer(v.into())
}

fn text(v: impl Display) -> OutputValue {
    OutputValue::Text(v.to_string())
}

fn reading(s: &DerivedSnapshot, kind: MetricKind) -> Option<OutputValue> {
    s.readings.value(kind).map(num)
}

pub static DESCRIPTORS: &[SensorDescriptor] = &[
    // station
    SensorDescriptor {
        key: "health",
        name: "Station health",
        unit: None,
        value: |s| Some(text(s.health)),
    },
    SensorDescriptor {
        key: "quality_flags",
        name: "Quality flags",
        unit: None,
        value: |s| {
            Some(text(
                s.quality_flags
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ))
        },
    },
    SensorDescriptor {
        key: "computed_at",
        name: "Last computed",
        unit: None,
        value: |s| Some(OutputValue::Time(s.computed_at)),
    },
    // normalized readings
    SensorDescriptor {
        key: "temperature",
        name: "Temperature",
        unit: Some("°C"),
        value: |s| reading(s, MetricKind::Temperature),
    },
    SensorDescriptor {
        key: "humidity",
        name: "Humidity",
        unit: Some("%"),
        value: |s| reading(s, MetricKind::Humidity),
    },
    SensorDescriptor {
        key: "station_pressure",
        name: "Station pressure",
        unit: Some("hPa"),
        value: |s| reading(s, MetricKind::Pressure),
    },
    SensorDescriptor {
        key: "illuminance",
        name: "Illuminance",
        unit: Some("lx"),
        value: |s| reading(s, MetricKind::Illuminance),
    },
    SensorDescriptor {
        key: "battery",
        name: "Battery",
        unit: Some("%"),
        value: |s| reading(s, MetricKind::Battery),
    },
    SensorDescriptor {
        key: "pm2_5",
        name: "PM2.5",
        unit: Some("µg/m³"),
        value: |s| reading(s, MetricKind::Pm25),
    },
    SensorDescriptor {
        key: "pm10",
        name: "PM10",
        unit: Some("µg/m³"),
        value: |s| reading(s, MetricKind::Pm10),
    },
    // psychrometrics
    SensorDescriptor {
        key: "dew_point",
        name: "Dew point",
        unit: Some("°C"),
        value: |s| s.psychrometrics.as_ref().map(|p| num(p.dew_point_c)),
    },
    SensorDescriptor {
        key: "frost_point",
        name: "Frost point",
        unit: Some("°C"),
        value: |s| s.psychrometrics.as_ref().map(|p| num(p.frost_point_c)),
    },
    SensorDescriptor {
        key: "wet_bulb",
        name: "Wet-bulb temperature",
        unit: Some("°C"),
        value: |s| {
            s.psychrometrics
                .as_ref()
                .and_then(|p| p.wet_bulb)
                .map(|w| num(w.value_c))
        },
    },
    SensorDescriptor {
        key: "wet_bulb_validated",
        name: "Wet-bulb within validated range",
        unit: None,
        value: |s| {
            s.psychrometrics
                .as_ref()
                .and_then(|p| p.wet_bulb)
                .map(|w| OutputValue::Flag(w.in_validated_range))
        },
    },
    SensorDescriptor {
        key: "feels_like",
        name: "Feels like",
        unit: Some("°C"),
        value: |s| {
            s.psychrometrics
                .as_ref()
                .and_then(|p| p.apparent_temperature_c)
                .map(num)
        },
    },
    SensorDescriptor {
        key: "comfort",
        name: "Comfort",
        unit: None,
        value: |s| s.psychrometrics.as_ref().and_then(|p| p.comfort).map(text),
    },
    SensorDescriptor {
        key: "humidity_level",
        name: "Humidity level",
        unit: None,
        value: |s| s.psychrometrics.as_ref().map(|p| text(p.humidity_level)),
    },
    // temperature window
    SensorDescriptor {
        key: "temperature_high_24h",
        name: "Temperature high (24h)",
        unit: Some("°C"),
        value: |s| s.temperature_24h.map(|t| num(t.max)),
    },
    SensorDescriptor {
        key: "temperature_low_24h",
        name: "Temperature low (24h)",
        unit: Some("°C"),
        value: |s| s.temperature_24h.map(|t| num(t.min)),
    },
    SensorDescriptor {
        key: "temperature_avg_24h",
        name: "Temperature average (24h)",
        unit: Some("°C"),
        value: |s| s.temperature_24h.map(|t| num(t.avg)),
    },
    // pressure
    SensorDescriptor {
        key: "sea_level_pressure",
        name: "Sea-level pressure",
        unit: Some("hPa"),
        value: |s| s.pressure.as_ref().and_then(|p| p.mslp_hpa).map(num),
    },
    SensorDescriptor {
        key: "pressure_trend_rate",
        name: "Pressure tendency",
        unit: Some("hPa/3h"),
        value: |s| s.pressure.as_ref().and_then(|p| p.trend_hpa_3h).map(num),
    },
    SensorDescriptor {
        key: "pressure_trend",
        name: "Pressure trend",
        unit: None,
        value: |s| {
            s.pressure
                .as_ref()
                .map(|p| text(format!("{} {}", p.trend_arrow, p.trend)))
        },
    },
    SensorDescriptor {
        key: "pressure_change_window",
        name: "Pressure change over window",
        unit: Some("hPa"),
        value: |s| {
            s.pressure
                .as_ref()
                .and_then(|p| p.change_over_window_hpa)
                .map(num)
        },
    },
    SensorDescriptor {
        key: "pressure_samples",
        name: "Pressure samples",
        unit: None,
        value: |s| {
            s.pressure
                .as_ref()
                .map(|p| int(i64::try_from(p.samples).unwrap_or(i64::MAX)))
        },
    },
    // rain
    SensorDescriptor {
        key: "rain_rate",
        name: "Rain rate",
        unit: Some("mm/h"),
        value: |s| s.rain.as_ref().map(|r| num(r.filtered_rate_mm_h)),
    },
    SensorDescriptor {
        key: "rain_rate_raw",
        name: "Rain rate (raw)",
        unit: Some("mm/h"),
        value: |s| s.rain.as_ref().map(|r| num(r.raw_rate_mm_h)),
    },
    SensorDescriptor {
        key: "rain_intensity",
        name: "Rain intensity",
        unit: None,
        value: |s| s.rain.as_ref().map(|r| text(r.intensity)),
    },
    SensorDescriptor {
        key: "rain_last_hour",
        name: "Rain (last hour)",
        unit: Some("mm"),
        value: |s| s.rain.as_ref().map(|r| num(r.last_hour_mm)),
    },
    SensorDescriptor {
        key: "rain_last_24h",
        name: "Rain (24h)",
        unit: Some("mm"),
        value: |s| s.rain.as_ref().map(|r| num(r.last_24h_mm)),
    },
    SensorDescriptor {
        key: "rain_since_reset",
        name: "Rain since reset",
        unit: Some("mm"),
        value: |s| s.rain.as_ref().and_then(|r| r.since_baseline_mm).map(num),
    },
    SensorDescriptor {
        key: "last_rain",
        name: "Last rain",
        unit: None,
        value: |s| {
            s.rain
                .as_ref()
                .and_then(|r| r.last_rain_at)
                .map(OutputValue::Time)
        },
    },
    SensorDescriptor {
        key: "rain_filter_quality",
        name: "Rain filter quality",
        unit: None,
        value: |s| s.rain.as_ref().map(|r| text(r.filter_quality)),
    },
    SensorDescriptor {
        key: "rain_counter_reset",
        name: "Rain counter reset",
        unit: None,
        value: |s| s.rain.as_ref().map(|r| OutputValue::Flag(r.counter_reset)),
    },
    // wind
    SensorDescriptor {
        key: "wind_speed",
        name: "Wind speed",
        unit: Some("m/s"),
        value: |s| s.wind.speed_ms.map(num),
    },
    SensorDescriptor {
        key: "wind_gust",
        name: "Wind gust",
        unit: Some("m/s"),
        value: |s| s.wind.gust_ms.map(num),
    },
    SensorDescriptor {
        key: "wind_gust_max_24h",
        name: "Max gust (24h)",
        unit: Some("m/s"),
        value: |s| s.wind.gust_max_24h_ms.map(num),
    },
    SensorDescriptor {
        key: "beaufort",
        name: "Beaufort force",
        unit: None,
        value: |s| s.wind.beaufort.map(|b| int(b.force)),
    },
    SensorDescriptor {
        key: "beaufort_description",
        name: "Beaufort description",
        unit: None,
        value: |s| s.wind.beaufort.map(|b| text(b.description)),
    },
    SensorDescriptor {
        key: "wind_direction",
        name: "Wind direction",
        unit: Some("°"),
        value: |s| s.wind.direction_deg.map(num),
    },
    SensorDescriptor {
        key: "wind_direction_smoothed",
        name: "Wind direction (smoothed)",
        unit: Some("°"),
        value: |s| s.wind.smoothed_direction_deg.map(num),
    },
    SensorDescriptor {
        key: "wind_cardinal",
        name: "Wind cardinal",
        unit: None,
        value: |s| s.wind.cardinal.map(text),
    },
    SensorDescriptor {
        key: "wind_quadrant",
        name: "Wind quadrant",
        unit: None,
        value: |s| s.wind.quadrant.map(text),
    },
    // uv
    SensorDescriptor {
        key: "uv_index",
        name: "UV index",
        unit: Some("index"),
        value: |s| s.uv.as_ref().map(|u| num(u.index)),
    },
    SensorDescriptor {
        key: "uv_level",
        name: "UV level",
        unit: None,
        value: |s| s.uv.as_ref().map(|u| text(u.level)),
    },
    SensorDescriptor {
        key: "uv_recommendation",
        name: "UV recommendation",
        unit: None,
        value: |s| s.uv.as_ref().map(|u| text(u.recommendation)),
    },
    SensorDescriptor {
        key: "uv_burn_time",
        name: "Time to sunburn",
        unit: Some("min"),
        value: |s| s.uv.as_ref().map(|u| int(u.burn_minutes)),
    },
    // forecast
    SensorDescriptor {
        key: "zambretti_forecast",
        name: "Zambretti forecast",
        unit: None,
        value: |s| s.forecast.zambretti.map(|z| text(z.text)),
    },
    SensorDescriptor {
        key: "zambretti_index",
        name: "Zambretti index",
        unit: None,
        value: |s| s.forecast.zambretti.map(|z| int(z.index)),
    },
    SensorDescriptor {
        key: "zambretti_pressure_clamped",
        name: "Zambretti pressure clamped",
        unit: None,
        value: |s| {
            s.forecast
                .zambretti
                .map(|z| OutputValue::Flag(z.pressure_clamped))
        },
    },
    SensorDescriptor {
        key: "rain_probability_local",
        name: "Rain probability (local)",
        unit: Some("%"),
        value: |s| s.forecast.rain_probability_local.map(int),
    },
    SensorDescriptor {
        key: "rain_probability",
        name: "Rain probability",
        unit: Some("%"),
        value: |s| s.forecast.rain_probability_combined.map(int),
    },
    SensorDescriptor {
        key: "condition",
        name: "Current condition",
        unit: None,
        value: |s| s.forecast.condition.as_ref().map(|c| text(c.condition)),
    },
    SensorDescriptor {
        key: "condition_description",
        name: "Condition description",
        unit: None,
        value: |s| s.forecast.condition.as_ref().map(|c| text(c.description)),
    },
    SensorDescriptor {
        key: "condition_severity",
        name: "Condition severity",
        unit: None,
        value: |s| {
            s.forecast
                .condition
                .as_ref()
                .map(|c| text(format!("{:?}", c.severity).to_lowercase()))
        },
    },
    SensorDescriptor {
        key: "forecast_days",
        name: "Forecast",
        unit: None,
        value: |s| {
            if s.forecast.tiles.is_empty() {
                return None;
            }
            Some(text(
                s.forecast
                    .tiles
                    .iter()
                    .map(|t| format!("{}: {}", t.label, t.condition))
                    .collect::<Vec<_>>()
                    .join(", "),
            ))
        },
    },
    // alerts
    SensorDescriptor {
        key: "alert_level",
        name: "Alert level",
        unit: None,
        value: |s| Some(text(s.alerts.level)),
    },
    SensorDescriptor {
        key: "active_alerts",
        name: "Active alerts",
        unit: None,
        value: |s| {
            Some(text(
                s.alerts
                    .active
                    .iter()
                    .map(|a| a.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ))
        },
    },
    // agro
    SensorDescriptor {
        key: "heating_degree_days",
        name: "Heating degree days (today)",
        unit: Some("°C·d"),
        value: |s| s.degree_days.map(|d| num(d.heating_today)),
    },
    SensorDescriptor {
        key: "cooling_degree_days",
        name: "Cooling degree days (today)",
        unit: Some("°C·d"),
        value: |s| s.degree_days.map(|d| num(d.cooling_today)),
    },
    SensorDescriptor {
        key: "et0_daily",
        name: "Reference evapotranspiration",
        unit: Some("mm/d"),
        value: |s| s.evapotranspiration.as_ref().map(|e| num(e.daily_mm)),
    },
    SensorDescriptor {
        key: "et0_hourly",
        name: "Reference evapotranspiration (hour)",
        unit: Some("mm/h"),
        value: |s| s.evapotranspiration.as_ref().map(|e| num(e.hourly_mm)),
    },
    SensorDescriptor {
        key: "et0_method",
        name: "Evapotranspiration model",
        unit: None,
        value: |s| s.evapotranspiration.as_ref().map(|e| text(e.method)),
    },
    // astronomy
    SensorDescriptor {
        key: "moon_phase",
        name: "Moon phase",
        unit: None,
        value: |s| Some(text(s.moon.phase)),
    },
    SensorDescriptor {
        key: "moon_illumination",
        name: "Moon illumination",
        unit: Some("%"),
        value: |s| Some(num(s.moon.illumination_pct)),
    },
    SensorDescriptor {
        key: "moon_age",
        name: "Moon age",
        unit: Some("d"),
        value: |s| Some(num(s.moon.age_days)),
    },
    SensorDescriptor {
        key: "days_to_new_moon",
        name: "Days to new moon",
        unit: Some("d"),
        value: |s| Some(num(s.moon.days_to_new_moon)),
    },
    SensorDescriptor {
        key: "days_to_full_moon",
        name: "Days to full moon",
        unit: Some("d"),
        value: |s| Some(num(s.moon.days_to_full_moon)),
    },
    SensorDescriptor {
        key: "sunrise",
        name: "Sunrise",
        unit: None,
        value: |s| Some(OutputValue::Time(s.daylight.sunrise)),
    },
    SensorDescriptor {
        key: "sunset",
        name: "Sunset",
        unit: None,
        value: |s| Some(OutputValue::Time(s.daylight.sunset)),
    },
    // activities
    SensorDescriptor {
        key: "laundry_score",
        name: "Laundry drying",
        unit: Some("%"),
        value: |s| s.activities.laundry.as_ref().map(|l| int(l.score)),
    },
    SensorDescriptor {
        key: "laundry_dry_time",
        name: "Laundry dry time",
        unit: None,
        value: |s| s.activities.laundry.as_ref().map(|l| text(l.dry_time)),
    },
    SensorDescriptor {
        key: "stargazing_score",
        name: "Stargazing",
        unit: Some("%"),
        value: |s| s.activities.stargazing.as_ref().map(|g| int(g.score)),
    },
    SensorDescriptor {
        key: "stargazing_label",
        name: "Stargazing quality",
        unit: None,
        value: |s| s.activities.stargazing.as_ref().map(|g| text(g.label)),
    },
    SensorDescriptor {
        key: "fire_risk",
        name: "Fire risk",
        unit: None,
        value: |s| s.activities.fire_risk.as_ref().map(|f| num(f.score)),
    },
    SensorDescriptor {
        key: "fire_danger",
        name: "Fire danger",
        unit: None,
        value: |s| s.activities.fire_risk.as_ref().map(|f| text(f.danger)),
    },
    SensorDescriptor {
        key: "running_score",
        name: "Running conditions",
        unit: Some("%"),
        value: |s| s.activities.running.as_ref().map(|r| int(r.score)),
    },
    SensorDescriptor {
        key: "running_recommendation",
        name: "Running recommendation",
        unit: None,
        value: |s| s.activities.running.as_ref().map(|r| text(r.recommendation)),
    },
];

#[must_use]
pub fn descriptor(key: &str) -> Option<&'static SensorDescriptor> {
    DESCRIPTORS.iter().find(|d| d.key == key)
}

/// Flat key to value/unit map of one snapshot
#[must_use]
pub fn render(snapshot: &DerivedSnapshot) -> BTreeMap<&'static str, RenderedOutput> {
    DESCRIPTORS
        .iter()
        .map(|d| {
            (
                d.key,
                RenderedOutput {
                    value: (d.value)(snapshot),
                    unit: d.unit,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;
    use crate::engine::StationEngine;
    use crate::models::RawReading;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let mut seen = HashSet::new();
        for d in DESCRIPTORS {
            assert!(seen.insert(d.key), "duplicate key {}", d.key);
        }
    }

    #[test]
    fn test_render_snapshot() {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        let mut engine = StationEngine::new(StationConfig::new("porch")).unwrap();
        let snapshot = engine.tick(
            &[
                RawReading::new(MetricKind::Temperature, 68.0, Some("°F"), at),
                RawReading::new(MetricKind::Humidity, 55.0, None, at),
            ],
            at,
            None,
        );
        let rendered = render(&snapshot);

        assert_eq!(rendered.len(), DESCRIPTORS.len());
        assert_eq!(rendered["temperature"].unit, Some("°C"));
        match &rendered["temperature"].value {
            Some(OutputValue::Number(v)) => assert!((v - 20.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rendered["wind_speed"].value, None);
        assert_eq!(
            rendered["health"].value,
            Some(OutputValue::Text("degraded".to_string()))
        );
        assert!(descriptor("dew_point").is_some());
        assert!(descriptor("nonsense").is_none());
    }
}
