//! Dew point, frost point, wet-bulb and apparent temperature
//!
//! Dew point uses the August-Roche-Magnus form with water constants at or
//! above 0 °C and ice constants below. Frost point always uses the ice
//! constants; above freezing it is informational only. Wet-bulb follows
//! Stull (2011) and is computed everywhere, with the result tagged when it
//! falls outside the formula's validated domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnus constants over water
pub const MAGNUS_WATER: MagnusConstants = MagnusConstants { a: 17.62, b: 243.12 };
/// Magnus constants over ice (Buck 1981)
pub const MAGNUS_ICE: MagnusConstants = MagnusConstants { a: 22.587, b: 273.86 };

/// Validated domain of the Stull wet-bulb fit
pub const WET_BULB_RH_RANGE: (f64, f64) = (5.0, 99.0);
pub const WET_BULB_TEMP_RANGE_C: (f64, f64) = (-20.0, 50.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnusConstants {
    pub a: f64,
    pub b: f64,
}

fn magnus(temp_c: f64, humidity: f64, k: MagnusConstants) -> f64 {
    let rh = humidity.clamp(1.0, 100.0);
    let gamma = (k.a * temp_c) / (k.b + temp_c) + (rh / 100.0).ln();
    (k.b * gamma) / (k.a - gamma)
}

/// Dew point in °C; constants follow the sign of the air temperature
#[must_use]
pub fn dew_point(temp_c: f64, humidity: f64) -> f64 {
    let constants = if temp_c >= 0.0 { MAGNUS_WATER } else { MAGNUS_ICE };
    magnus(temp_c, humidity, constants)
}

/// Frost point in °C, ice constants regardless of temperature
#[must_use]
pub fn frost_point(temp_c: f64, humidity: f64) -> f64 {
    magnus(temp_c, humidity, MAGNUS_ICE)
}

/// Wet-bulb result with its domain tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WetBulb {
    pub value_c: f64,
    pub in_validated_range: bool,
}

/// Stull (2011) wet-bulb temperature.
///
/// Returns `None` only when the polynomial is undefined (humidity far below
/// zero); any other out-of-domain input is computed and tagged.
#[must_use]
pub fn wet_bulb(temp_c: f64, humidity: f64) -> Option<WetBulb> {
    let rh = humidity;
    let tw = temp_c * (0.151_977 * (rh + 8.313_659).sqrt()).atan() + (temp_c + rh).atan()
        - (rh - 1.676_331).atan()
        + 0.003_918_38 * rh.powf(1.5) * (0.023_101 * rh).atan()
        - 4.686_035;

    if !tw.is_finite() {
        return None;
    }

    let in_validated_range = (WET_BULB_RH_RANGE.0..=WET_BULB_RH_RANGE.1).contains(&rh)
        && (WET_BULB_TEMP_RANGE_C.0..=WET_BULB_TEMP_RANGE_C.1).contains(&temp_c);

    Some(WetBulb {
        value_c: tw,
        in_validated_range,
    })
}

/// Australian BOM apparent temperature (Steadman 1994), valid at any
/// temperature.
#[must_use]
pub fn apparent_temperature(temp_c: f64, humidity: f64, wind_speed_ms: f64) -> f64 {
    let vapour_pressure = (humidity / 100.0) * 6.105 * ((17.27 * temp_c) / (237.7 + temp_c)).exp();
    temp_c + 0.33 * vapour_pressure - 0.70 * wind_speed_ms - 4.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComfortLevel {
    DangerousCold,
    Freezing,
    VeryCold,
    Cold,
    Cool,
    Comfortable,
    Warm,
    Hot,
    VeryHot,
    DangerousHeat,
}

impl ComfortLevel {
    #[must_use]
    pub fn from_feels_like(feels_like_c: f64) -> Self {
        match feels_like_c {
            t if t < -10.0 => ComfortLevel::DangerousCold,
            t if t < 0.0 => ComfortLevel::Freezing,
            t if t < 10.0 => ComfortLevel::VeryCold,
            t if t < 15.0 => ComfortLevel::Cold,
            t if t < 20.0 => ComfortLevel::Cool,
            t if t < 25.0 => ComfortLevel::Comfortable,
            t if t < 30.0 => ComfortLevel::Warm,
            t if t < 35.0 => ComfortLevel::Hot,
            t if t < 40.0 => ComfortLevel::VeryHot,
            _ => ComfortLevel::DangerousHeat,
        }
    }
}

impl fmt::Display for ComfortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComfortLevel::DangerousCold => "Dangerous Cold",
            ComfortLevel::Freezing => "Freezing",
            ComfortLevel::VeryCold => "Very Cold",
            ComfortLevel::Cold => "Cold",
            ComfortLevel::Cool => "Cool",
            ComfortLevel::Comfortable => "Comfortable",
            ComfortLevel::Warm => "Warm",
            ComfortLevel::Hot => "Hot",
            ComfortLevel::VeryHot => "Very Hot",
            ComfortLevel::DangerousHeat => "Dangerous Heat",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumidityLevel {
    VeryDry,
    Dry,
    SlightlyDry,
    Comfortable,
    SlightlyHumid,
    Humid,
    VeryHumid,
}

impl HumidityLevel {
    #[must_use]
    pub fn from_humidity(humidity: f64) -> Self {
        match humidity {
            h if h > 80.0 => HumidityLevel::VeryHumid,
            h if h > 70.0 => HumidityLevel::Humid,
            h if h > 60.0 => HumidityLevel::SlightlyHumid,
            h if h > 40.0 => HumidityLevel::Comfortable,
            h if h > 30.0 => HumidityLevel::SlightlyDry,
            h if h > 20.0 => HumidityLevel::Dry,
            _ => HumidityLevel::VeryDry,
        }
    }
}

impl fmt::Display for HumidityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HumidityLevel::VeryDry => "Very Dry",
            HumidityLevel::Dry => "Dry",
            HumidityLevel::SlightlyDry => "Slightly Dry",
            HumidityLevel::Comfortable => "Comfortable",
            HumidityLevel::SlightlyHumid => "Slightly Humid",
            HumidityLevel::Humid => "Humid",
            HumidityLevel::VeryHumid => "Very Humid",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_dew_point_reference_value() {
        // 25 °C at 60 % is roughly 16.7 °C
        let dp = dew_point(25.0, 60.0);
        assert!((dp - 16.7).abs() < 0.1, "got {dp}");
    }

    #[test]
    fn test_dew_point_saturated_equals_temperature() {
        assert!((dew_point(12.0, 100.0) - 12.0).abs() < 1e-9);
        assert!((dew_point(-8.0, 100.0) - -8.0).abs() < 1e-9);
    }

    #[test]
    fn test_frost_point_uses_ice_constants_above_zero() {
        let fp = frost_point(10.0, 50.0);
        assert_eq!(fp, magnus(10.0, 50.0, MAGNUS_ICE));
        assert_ne!(fp, dew_point(10.0, 50.0));
    }

    #[test]
    fn test_frost_point_matches_dew_point_below_zero() {
        assert_eq!(frost_point(-5.0, 70.0), dew_point(-5.0, 70.0));
    }

    #[test]
    fn test_wet_bulb_stull_reference() {
        // Stull's paper: 20 °C, 50 % gives about 13.7 °C
        let wb = wet_bulb(20.0, 50.0).unwrap();
        assert!((wb.value_c - 13.7).abs() < 0.1, "got {}", wb.value_c);
        assert!(wb.in_validated_range);
    }

    #[rstest]
    #[case(25.0, 2.0)]
    #[case(55.0, 40.0)]
    #[case(-30.0, 60.0)]
    fn test_wet_bulb_out_of_domain_is_tagged_not_clamped(#[case] t: f64, #[case] rh: f64) {
        let wb = wet_bulb(t, rh).unwrap();
        assert!(!wb.in_validated_range);
        assert!(wb.value_c.is_finite());
    }

    #[test]
    fn test_apparent_temperature_wind_cools() {
        let calm = apparent_temperature(20.0, 50.0, 0.0);
        let windy = apparent_temperature(20.0, 50.0, 10.0);
        assert!((calm - windy - 7.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(-15.0, ComfortLevel::DangerousCold)]
    #[case(22.0, ComfortLevel::Comfortable)]
    #[case(41.0, ComfortLevel::DangerousHeat)]
    fn test_comfort_levels(#[case] feels_like: f64, #[case] expected: ComfortLevel) {
        assert_eq!(ComfortLevel::from_feels_like(feels_like), expected);
    }

    #[test]
    fn test_humidity_level_labels() {
        assert_eq!(HumidityLevel::from_humidity(85.0).to_string(), "Very Humid");
        assert_eq!(HumidityLevel::from_humidity(50.0).to_string(), "Comfortable");
        assert_eq!(HumidityLevel::from_humidity(10.0).to_string(), "Very Dry");
    }
}
