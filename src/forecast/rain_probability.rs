//! Local rain-likelihood index and its blend with an external forecast
//!
//! This is a heuristic 0-100 index, not a calibrated probability.

use super::regions::ClimateRegion;
use crate::config::ConvectiveHours;
use crate::wind::Quadrant;

fn pressure_points(mslp_hpa: f64, region: ClimateRegion) -> i32 {
    let profile = region.pressure_profile();
    if mslp_hpa < profile.low {
        35
    } else if mslp_hpa < profile.medium {
        20
    } else if mslp_hpa < profile.high {
        10
    } else {
        0
    }
}

fn trend_points(trend_hpa_3h: f64) -> i32 {
    match trend_hpa_3h {
        t if t < -3.0 => 40,
        t if t < -1.6 => 25,
        t if t < -0.8 => 15,
        t if t > 1.6 => -15,
        _ => 0,
    }
}

fn humidity_points(humidity: f64) -> i32 {
    match humidity {
        h if h > 85.0 => 25,
        h if h > 75.0 => 15,
        h if h > 65.0 => 5,
        h if h < 50.0 => -10,
        _ => 0,
    }
}

/// Composite of MSLP level, trend, humidity and regional wind bias.
/// Onshore (foul) quadrants add 10 points, offshore (fair) ones remove 10.
#[must_use]
pub fn local_rain_probability(
    mslp_hpa: f64,
    trend_hpa_3h: f64,
    humidity: f64,
    quadrant: Option<Quadrant>,
    region: ClimateRegion,
) -> u8 {
    let wind = quadrant.map_or(0, |q| i32::from(region.wind_pattern().bias(q)) * 10);
    let total = pressure_points(mslp_hpa, region)
        + trend_points(trend_hpa_3h)
        + humidity_points(humidity)
        + wind;
    total.clamp(0, 100) as u8
}

/// Blend the local index with the external forecast's probability.
///
/// Inside the convective hours local sensors and the forecast count equally
/// (0.5 each); outside them the local index carries 30 %. Without an
/// external value the local index is returned as is.
#[must_use]
pub fn combined_rain_probability(
    local: u8,
    external: Option<f64>,
    local_hour: u32,
    convective: ConvectiveHours,
) -> u8 {
    let Some(external) = external.filter(|v| v.is_finite()) else {
        return local;
    };
    let local_weight = if convective.contains(local_hour) {
        0.5
    } else {
        0.3
    };
    let blended = f64::from(local) * local_weight + external.clamp(0.0, 100.0) * (1.0 - local_weight);
    blended.round_ties_even().clamp(0.0, 100.0) as u8
}
