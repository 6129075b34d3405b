//! Threshold alerts for wind, rain and frost

use crate::config::AlertThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    Clear,
    Advisory,
    Warning,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Clear => "clear",
            AlertLevel::Advisory => "advisory",
            AlertLevel::Warning => "warning",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighWind,
    HeavyRain,
    Freeze,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertSummary {
    pub level: AlertLevel,
    pub active: Vec<Alert>,
}

/// Evaluate the configured thresholds. Missing inputs never raise an alert.
#[must_use]
pub fn evaluate(
    thresholds: &AlertThresholds,
    gust_ms: Option<f64>,
    rain_rate_mm_h: Option<f64>,
    temperature_c: Option<f64>,
) -> AlertSummary {
    let mut active = Vec::new();

    if let Some(gust) = gust_ms.filter(|g| *g >= thresholds.wind_gust_ms) {
        active.push(Alert {
            kind: AlertKind::HighWind,
            level: AlertLevel::Warning,
            message: format!("Wind gusts of {gust:.1} m/s"),
        });
    }
    if let Some(rate) = rain_rate_mm_h.filter(|r| *r >= thresholds.rain_rate_mm_h) {
        active.push(Alert {
            kind: AlertKind::HeavyRain,
            level: AlertLevel::Warning,
            message: format!("Rain falling at {rate:.1} mm/h"),
        });
    }
    if let Some(temp) = temperature_c.filter(|t| *t <= thresholds.freeze_c) {
        active.push(Alert {
            kind: AlertKind::Freeze,
            level: AlertLevel::Advisory,
            message: format!("Temperature at {temp:.1} °C"),
        });
    }

    AlertSummary {
        level: active
            .iter()
            .map(|a| a.level)
            .max()
            .unwrap_or(AlertLevel::Clear),
        active,
    }
}
