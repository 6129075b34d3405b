//! Unit & calibration normalization
//!
//! Converts each raw reading to its canonical unit (°C, %, hPa, m/s, mm, lx,
//! degrees, index, µg/m³) and only then adds the configured calibration
//! offset. Absent or unusable readings become [`Measurement::Unavailable`];
//! nothing is defaulted to zero or to a previous value here.

use crate::config::{CalibrationOffsets, UnitMode};
use crate::error::WsCoreError;
use crate::models::{Measurement, MetricKind, NormalizedReadings, RawReading};
use crate::quality::QualityFlag;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Physical dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Temperature,
    Ratio,
    Pressure,
    Speed,
    Length,
    Illuminance,
    Angle,
    Index,
    Concentration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Kelvin,
    Percent,
    Hectopascal,
    Pascal,
    Kilopascal,
    InchesOfMercury,
    MillimetersOfMercury,
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Knots,
    FeetPerSecond,
    Millimeters,
    Inches,
    Lux,
    Degrees,
    Index,
    MicrogramsPerCubicMeter,
}

impl Unit {
    #[must_use]
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => Dimension::Temperature,
            Unit::Percent => Dimension::Ratio,
            Unit::Hectopascal
            | Unit::Pascal
            | Unit::Kilopascal
            | Unit::InchesOfMercury
            | Unit::MillimetersOfMercury => Dimension::Pressure,
            Unit::MetersPerSecond
            | Unit::KilometersPerHour
            | Unit::MilesPerHour
            | Unit::Knots
            | Unit::FeetPerSecond => Dimension::Speed,
            Unit::Millimeters | Unit::Inches => Dimension::Length,
            Unit::Lux => Dimension::Illuminance,
            Unit::Degrees => Dimension::Angle,
            Unit::Index => Dimension::Index,
            Unit::MicrogramsPerCubicMeter => Dimension::Concentration,
        }
    }

    /// Convert a value in this unit to the canonical unit of its dimension
    #[must_use]
    pub fn to_canonical(self, value: f64) -> f64 {
        match self {
            Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Unit::Kelvin => value - 273.15,
            Unit::Pascal => value / 100.0,
            Unit::Kilopascal => value * 10.0,
            Unit::InchesOfMercury => value * 33.863_886_666_7,
            Unit::MillimetersOfMercury => value * 1.333_22,
            Unit::KilometersPerHour => value / 3.6,
            Unit::MilesPerHour => value * 0.447_04,
            Unit::Knots => value * 0.514_444,
            Unit::FeetPerSecond => value * 0.3048,
            Unit::Inches => value * 25.4,
            Unit::Celsius
            | Unit::Percent
            | Unit::Hectopascal
            | Unit::MetersPerSecond
            | Unit::Millimeters
            | Unit::Lux
            | Unit::Degrees
            | Unit::Index
            | Unit::MicrogramsPerCubicMeter => value,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::Percent => "%",
            Unit::Hectopascal => "hPa",
            Unit::Pascal => "Pa",
            Unit::Kilopascal => "kPa",
            Unit::InchesOfMercury => "inHg",
            Unit::MillimetersOfMercury => "mmHg",
            Unit::MetersPerSecond => "m/s",
            Unit::KilometersPerHour => "km/h",
            Unit::MilesPerHour => "mph",
            Unit::Knots => "kn",
            Unit::FeetPerSecond => "ft/s",
            Unit::Millimeters => "mm",
            Unit::Inches => "in",
            Unit::Lux => "lx",
            Unit::Degrees => "°",
            Unit::Index => "index",
            Unit::MicrogramsPerCubicMeter => "µg/m³",
        }
    }
}

impl FromStr for Unit {
    type Err = WsCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                'µ' | 'μ' => 'u',
                '³' => '3',
                other => other,
            })
            .collect::<String>()
            .to_lowercase();

        let unit = match label.as_str() {
            "°c" | "c" | "degc" | "celsius" => Unit::Celsius,
            "°f" | "f" | "degf" | "fahrenheit" => Unit::Fahrenheit,
            "k" | "kelvin" => Unit::Kelvin,
            "%" | "pct" | "percent" => Unit::Percent,
            "hpa" | "mbar" | "mb" | "millibar" => Unit::Hectopascal,
            "pa" => Unit::Pascal,
            "kpa" => Unit::Kilopascal,
            "inhg" => Unit::InchesOfMercury,
            "mmhg" | "torr" => Unit::MillimetersOfMercury,
            "m/s" | "ms" | "mps" => Unit::MetersPerSecond,
            "km/h" | "kmh" | "kph" => Unit::KilometersPerHour,
            "mph" => Unit::MilesPerHour,
            "kn" | "kt" | "kts" | "knot" | "knots" => Unit::Knots,
            "ft/s" | "fps" => Unit::FeetPerSecond,
            "mm" => Unit::Millimeters,
            "in" | "inch" | "inches" => Unit::Inches,
            "lx" | "lux" => Unit::Lux,
            "°" | "deg" | "degrees" => Unit::Degrees,
            "index" | "uv" | "uvi" | "uvindex" => Unit::Index,
            "ug/m3" => Unit::MicrogramsPerCubicMeter,
            _ => {
                return Err(WsCoreError::validation(format!(
                    "unrecognised unit '{s}'"
                )));
            }
        };
        Ok(unit)
    }
}

/// Canonical unit of a metric
#[must_use]
pub fn canonical_unit(kind: MetricKind) -> Unit {
    match kind {
        MetricKind::Temperature | MetricKind::DewPoint => Unit::Celsius,
        MetricKind::Humidity | MetricKind::Battery => Unit::Percent,
        MetricKind::Pressure => Unit::Hectopascal,
        MetricKind::WindSpeed | MetricKind::WindGust => Unit::MetersPerSecond,
        MetricKind::WindDirection => Unit::Degrees,
        MetricKind::RainTotal => Unit::Millimeters,
        MetricKind::Illuminance => Unit::Lux,
        MetricKind::UvIndex => Unit::Index,
        MetricKind::Pm25 | MetricKind::Pm10 => Unit::MicrogramsPerCubicMeter,
    }
}

/// Unit assumed for a reading that arrives without a unit label
#[must_use]
pub fn assumed_unit(kind: MetricKind, mode: UnitMode) -> Unit {
    match (mode, kind) {
        (UnitMode::Imperial, MetricKind::Temperature | MetricKind::DewPoint) => Unit::Fahrenheit,
        (UnitMode::Imperial, MetricKind::Pressure) => Unit::InchesOfMercury,
        (UnitMode::Imperial, MetricKind::WindSpeed | MetricKind::WindGust) => Unit::MilesPerHour,
        (UnitMode::Imperial, MetricKind::RainTotal) => Unit::Inches,
        _ => canonical_unit(kind),
    }
}

/// Result of normalizing one tick's raw readings
#[derive(Debug, Clone, Default)]
pub struct Normalization {
    pub readings: NormalizedReadings,
    pub flags: Vec<QualityFlag>,
}

/// Normalize a raw reading set into canonical units with calibration applied
#[must_use]
pub fn normalize(
    raw: &[RawReading],
    mode: UnitMode,
    offsets: &CalibrationOffsets,
) -> Normalization {
    let mut out = Normalization::default();

    for reading in raw {
        let measurement = match normalize_one(reading, mode, offsets) {
            Ok(measurement) => measurement,
            Err(flag) => {
                debug!(metric = %reading.kind, "Reading rejected during normalization");
                out.flags.push(flag);
                Measurement::Unavailable
            }
        };
        out.readings.insert(reading.kind, measurement);
    }

    out
}

fn normalize_one(
    reading: &RawReading,
    mode: UnitMode,
    offsets: &CalibrationOffsets,
) -> Result<Measurement, QualityFlag> {
    if !reading.present || !reading.value.is_finite() {
        return Ok(Measurement::Unavailable);
    }

    let unit = match reading.unit.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => {
            label.parse::<Unit>().map_err(|_| QualityFlag::UnitMismatch {
                metric: reading.kind,
                unit: label.to_string(),
            })?
        }
        _ => assumed_unit(reading.kind, mode),
    };

    if unit.dimension() != canonical_unit(reading.kind).dimension() {
        return Err(QualityFlag::UnitMismatch {
            metric: reading.kind,
            unit: unit.symbol().to_string(),
        });
    }

    let value = unit.to_canonical(reading.value) + offsets.offset_for(reading.kind);
    Ok(Measurement::Available {
        value,
        updated_at: reading.timestamp,
    })
}
