//! Negretti & Zambra barometric forecaster
//!
//! MSLP maps linearly onto Z 1..=26 (1050 hPa is fair, 950 hPa stormy).
//! Trend, regional wind bias, season and humidity shift the number before
//! it is rounded and looked up in the historical text table.

use super::regions::{ClimateRegion, Hemisphere};
use crate::wind::Quadrant;
use serde::Serialize;

pub const ZAMBRETTI_MIN_HPA: f64 = 950.0;
pub const ZAMBRETTI_MAX_HPA: f64 = 1050.0;
/// First index whose text is a storm forecast
pub const STORMY_INDEX: u8 = 25;

const ZAMBRETTI_TEXTS: [&str; 26] = [
    "Settled fine",
    "Fine weather",
    "Becoming fine",
    "Fine, becoming less settled",
    "Fine, possible showers",
    "Fairly fine, improving",
    "Fairly fine, possible showers early",
    "Fairly fine, showery later",
    "Showery early, improving",
    "Changeable, mending",
    "Fairly fine, possible showers",
    "Rather unsettled clearing later",
    "Unsettled, probably improving",
    "Showery, bright intervals",
    "Showery, becoming rather unsettled",
    "Changeable, some rain",
    "Unsettled, short fine intervals",
    "Unsettled, rain later",
    "Unsettled, some rain",
    "Mostly very unsettled",
    "Occasional rain, worsening",
    "Rain at times, very unsettled",
    "Rain at frequent intervals",
    "Rain, very unsettled",
    "Stormy, may improve",
    "Stormy, much rain",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZambrettiInput {
    pub mslp_hpa: f64,
    pub trend_hpa_3h: f64,
    /// Missing direction drops the wind correction
    pub quadrant: Option<Quadrant>,
    /// Missing humidity drops the humidity correction
    pub humidity: Option<f64>,
    pub month: u32,
    pub hemisphere: Hemisphere,
    pub region: ClimateRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZambrettiForecast {
    pub index: u8,
    pub text: &'static str,
    /// MSLP was outside the calibrated 950..=1050 hPa scale
    pub pressure_clamped: bool,
}

impl ZambrettiForecast {
    #[must_use]
    pub fn is_stormy(&self) -> bool {
        self.index >= STORMY_INDEX
    }
}

fn trend_adjustment(trend: f64) -> f64 {
    match trend {
        t if t > 1.6 => -4.0,
        t if t > 0.8 => -2.0,
        t if t > 0.1 => -1.0,
        t if t < -1.6 => 4.0,
        t if t < -0.8 => 2.0,
        t if t < -0.1 => 1.0,
        _ => 0.0,
    }
}

fn humidity_adjustment(humidity: f64) -> f64 {
    if humidity > 85.0 {
        1.0
    } else if humidity < 40.0 {
        -0.5
    } else {
        0.0
    }
}

#[must_use]
pub fn zambretti(input: &ZambrettiInput) -> ZambrettiForecast {
    let pressure = input.mslp_hpa.clamp(ZAMBRETTI_MIN_HPA, ZAMBRETTI_MAX_HPA);
    let pressure_clamped = pressure != input.mslp_hpa;

    let base = 26.0 - (pressure - ZAMBRETTI_MIN_HPA) / 100.0 * 25.0;
    let season = if input.hemisphere.is_winter(input.month) {
        1.0
    } else {
        -1.0
    };
    let wind = input
        .quadrant
        .map_or(0.0, |q| f64::from(input.region.wind_pattern().bias(q)));
    let humidity = input.humidity.map_or(0.0, humidity_adjustment);

    let z = base + trend_adjustment(input.trend_hpa_3h) + wind + season + humidity;
    let index = z.round_ties_even().clamp(1.0, 26.0) as u8;

    ZambrettiForecast {
        index,
        text: ZAMBRETTI_TEXTS[usize::from(index - 1)],
        pressure_clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn input(mslp: f64, trend: f64) -> ZambrettiInput {
        ZambrettiInput {
            mslp_hpa: mslp,
            trend_hpa_3h: trend,
            quadrant: None,
            humidity: Some(60.0),
            month: 7,
            hemisphere: Hemisphere::Northern,
            region: ClimateRegion::Mediterranean,
        }
    }

    #[test]
    fn test_high_rising_pressure_is_settled() {
        let forecast = zambretti(&input(1045.0, 2.0));
        assert_eq!(forecast.index, 1);
        assert_eq!(forecast.text, "Settled fine");
    }

    #[test]
    fn test_deep_low_falling_is_stormy() {
        let mut deep = input(955.0, -3.0);
        deep.month = 1;
        deep.humidity = Some(95.0);
        deep.quadrant = Some(Quadrant::S);
        let forecast = zambretti(&deep);
        assert_eq!(forecast.index, 26);
        assert_eq!(forecast.text, "Stormy, much rain");
        assert!(forecast.is_stormy());
    }

    #[test]
    fn test_mid_pressure_steady_summer() {
        // base 26 - 12.5 = 13.5, summer -1 -> 12.5, ties to even -> 12
        let forecast = zambretti(&input(1000.0, 0.0));
        assert_eq!(forecast.index, 12);
        assert_eq!(forecast.text, "Rather unsettled clearing later");
    }

    #[rstest]
    #[case(900.0)]
    #[case(1080.0)]
    fn test_out_of_scale_pressure_is_clamped_and_tagged(#[case] mslp: f64) {
        let forecast = zambretti(&input(mslp, 0.0));
        assert!(forecast.pressure_clamped);
        assert!((1..=26).contains(&forecast.index));
    }

    #[test]
    fn test_regional_wind_bias_applies() {
        let mut north = input(1000.0, 0.0);
        north.quadrant = Some(Quadrant::N);
        let mut south = north;
        south.quadrant = Some(Quadrant::S);
        assert!(zambretti(&north).index < zambretti(&south).index);
    }

    #[test]
    fn test_table_entries_are_verbatim() {
        assert_eq!(ZAMBRETTI_TEXTS[11], "Rather unsettled clearing later");
        assert_eq!(ZAMBRETTI_TEXTS[16], "Unsettled, short fine intervals");
        assert_eq!(ZAMBRETTI_TEXTS.len(), 26);
    }
}
