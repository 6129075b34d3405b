//! Activity scores
//!
//! Simple composites over the derived values. None of them are calibrated
//! models; the fire score in particular borrows the shape of the Canadian
//! FWI without its daily moisture codes.

use crate::astro::MoonInfo;
use crate::config::RunningConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Illuminance treated as UV-equivalent when no UV sensor is fitted
const LUX_PER_UV_POINT: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    #[must_use]
    pub fn from_index(uv: f64) -> Self {
        match uv {
            u if u >= 11.0 => UvLevel::Extreme,
            u if u >= 8.0 => UvLevel::VeryHigh,
            u if u >= 6.0 => UvLevel::High,
            u if u >= 3.0 => UvLevel::Moderate,
            _ => UvLevel::Low,
        }
    }

    #[must_use]
    pub fn recommendation(self) -> &'static str {
        match self {
            UvLevel::VeryHigh | UvLevel::Extreme => "Avoid sun exposure",
            UvLevel::High => "Seek shade, wear sunscreen",
            UvLevel::Moderate => "Sunscreen recommended",
            UvLevel::Low => "No protection needed",
        }
    }
}

impl fmt::Display for UvLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UvLevel::Low => "Low",
            UvLevel::Moderate => "Moderate",
            UvLevel::High => "High",
            UvLevel::VeryHigh => "Very High",
            UvLevel::Extreme => "Extreme",
        };
        f.write_str(label)
    }
}

/// Minutes to sunburn for fair skin (Fitzpatrick type II), capped at 200
#[must_use]
pub fn uv_burn_minutes(uv: f64) -> u32 {
    if uv <= 0.0 {
        return 200;
    }
    (100.0 / (uv * 3.0)).round().min(200.0) as u32
}

fn bounded_points(value: f64, full_scale: f64, max_points: f64) -> u8 {
    (value / full_scale * max_points).round().clamp(0.0, max_points) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaundryScore {
    pub score: u8,
    pub recommendation: &'static str,
    pub dry_time: &'static str,
}

#[must_use]
pub fn laundry(
    temp_c: f64,
    humidity: f64,
    wind_speed_ms: f64,
    uv_index: Option<f64>,
    illuminance_lx: Option<f64>,
    rain_rate_mm_h: f64,
    rain_probability: Option<u8>,
) -> LaundryScore {
    if rain_rate_mm_h > 0.0 {
        return LaundryScore {
            score: 0,
            recommendation: "Currently raining - hang indoors!",
            dry_time: "N/A (raining)",
        };
    }
    if rain_probability.is_some_and(|p| p > 50) {
        return LaundryScore {
            score: 0,
            recommendation: "Rain expected - hang indoors or wait",
            dry_time: "6+ hours (use dryer)",
        };
    }

    let sun = uv_index
        .or_else(|| illuminance_lx.map(|lx| lx / LUX_PER_UV_POINT))
        .unwrap_or(0.0);
    let score = bounded_points(temp_c, 35.0, 30.0)
        + bounded_points(100.0 - humidity, 100.0, 30.0)
        + bounded_points(wind_speed_ms, 5.0, 20.0)
        + bounded_points(sun, 10.0, 20.0);

    let (recommendation, dry_time) = match score {
        s if s >= 75 => ("Excellent conditions! Hang outside now.", "1.5-2.5 hours"),
        s if s >= 50 => ("Good drying weather. Hang outside.", "2.5-4 hours"),
        s if s >= 25 => ("Fair conditions. Will dry slowly outside.", "4-6 hours"),
        _ => (
            "Poor conditions. Better to use dryer or wait.",
            "6+ hours (use dryer)",
        ),
    };

    LaundryScore {
        score,
        recommendation,
        dry_time,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunningScore {
    pub score: u8,
    pub level: &'static str,
    pub recommendation: &'static str,
    /// Points removed for current rain
    pub rain_penalty: u8,
}

#[must_use]
pub fn running(
    feels_like_c: f64,
    uv_index: Option<f64>,
    rain_rate_mm_h: f64,
    penalties: &RunningConfig,
) -> RunningScore {
    let uv = uv_index.unwrap_or(0.0);
    let temp_score = (100.0 - (feels_like_c - 15.0).powi(2) / 4.0).clamp(0.0, 100.0);
    let uv_score = (100.0 - uv * 10.0).clamp(0.0, 100.0);
    let base = (temp_score * 0.7 + uv_score * 0.3).round() as u8;

    let score = if rain_rate_mm_h >= penalties.heavy_rain_mm_h {
        base.min(10)
    } else if rain_rate_mm_h >= penalties.light_rain_mm_h {
        base.saturating_sub(25)
    } else {
        base
    };

    let level = match score {
        s if s >= 80 => "Excellent",
        s if s >= 60 => "Good",
        s if s >= 40 => "Fair",
        _ => "Poor",
    };

    let recommendation = if rain_rate_mm_h >= penalties.heavy_rain_mm_h {
        "Heavy rain. Consider a treadmill today."
    } else if feels_like_c < 10.0 {
        "Too cold for comfortable running. Dress warmly."
    } else if feels_like_c < 15.0 {
        "Cool but good running weather. Light layers recommended."
    } else if feels_like_c < 22.0 && uv < 5.0 {
        "Perfect running conditions!"
    } else if feels_like_c < 28.0 && uv < 7.0 {
        "Warm but manageable. Stay hydrated."
    } else if feels_like_c < 32.0 {
        "Hot conditions. Run early morning or evening."
    } else {
        "Too hot for safe running. Avoid midday."
    };

    RunningScore {
        score,
        level,
        recommendation,
        rain_penalty: base - score,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireDanger {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl FireDanger {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 5.0 => FireDanger::Low,
            s if s < 12.0 => FireDanger::Moderate,
            s if s < 24.0 => FireDanger::High,
            s if s < 38.0 => FireDanger::VeryHigh,
            _ => FireDanger::Extreme,
        }
    }
}

impl fmt::Display for FireDanger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FireDanger::Low => "Low",
            FireDanger::Moderate => "Moderate",
            FireDanger::High => "High",
            FireDanger::VeryHigh => "Very High",
            FireDanger::Extreme => "Extreme",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireRisk {
    /// 0..=50, one decimal
    pub score: f64,
    pub danger: FireDanger,
}

#[must_use]
pub fn fire_risk(temp_c: f64, humidity: f64, wind_speed_ms: f64, rain_24h_mm: f64) -> FireRisk {
    let wind_kmh = wind_speed_ms * 3.6;
    let fine_fuel = (85.0 + (temp_c - 20.0) * 2.0 - (humidity - 50.0) / 2.0)
        .round()
        .clamp(40.0, 100.0);
    let wind_factor = if wind_kmh < 40.0 {
        0.208 * wind_kmh
    } else {
        12.0 - 60.0 / wind_kmh
    };
    let spread = 0.208 * wind_factor * ((fine_fuel - 40.0) / 20.0);
    let drought = 1.0 + 7.0 / (rain_24h_mm + 1.0).max(1.0);

    let score = ((spread * drought * 10.0).round() / 10.0).clamp(0.0, 50.0);
    FireRisk {
        score,
        danger: FireDanger::from_score(score),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stargazing {
    pub score: u8,
    pub label: &'static str,
    pub moon_impact: &'static str,
}

fn moon_impact(illumination_pct: f64) -> &'static str {
    match illumination_pct {
        i if i <= 10.0 => "excellent",
        i if i <= 25.0 => "good",
        i if i <= 50.0 => "fair",
        i if i <= 75.0 => "poor",
        _ => "bad",
    }
}

/// Sky quality for stargazing. Cloud cover comes from the forecast; without
/// it humidity stands in as a haze proxy. Strong wind degrades seeing.
#[must_use]
pub fn stargazing(
    cloud_cover_pct: Option<f64>,
    humidity: f64,
    wind_speed_ms: f64,
    rain_rate_mm_h: f64,
    moon: &MoonInfo,
) -> Stargazing {
    let moon_impact = moon_impact(moon.illumination_pct);
    if rain_rate_mm_h > 0.0 {
        return Stargazing {
            score: 0,
            label: "Poor",
            moon_impact,
        };
    }

    let cloud = cloud_cover_pct.unwrap_or(if humidity > 90.0 {
        80.0
    } else if humidity > 70.0 {
        50.0
    } else {
        20.0
    });
    let base = match cloud {
        c if c < 20.0 => 90.0,
        c if c < 50.0 => 60.0,
        c if c < 80.0 => 30.0,
        _ => 10.0,
    };
    let seeing = match wind_speed_ms {
        w if w > 8.0 => 15.0,
        w if w > 5.0 => 5.0,
        _ => 0.0,
    };
    let score = (base - moon.illumination_pct / 100.0 * 40.0 - seeing)
        .round()
        .clamp(0.0, 100.0) as u8;

    let label = match score {
        s if s >= 70 => "Excellent",
        s if s >= 50 => "Good",
        s if s >= 30 => "Fair",
        _ => "Poor",
    };

    Stargazing {
        score,
        label,
        moon_impact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::MoonPhase;
    use rstest::rstest;

    fn moon(illumination_pct: f64) -> MoonInfo {
        MoonInfo {
            phase: MoonPhase::WaxingGibbous,
            illumination_pct,
            age_days: 10.0,
            days_to_new_moon: 19.5,
            days_to_full_moon: 4.8,
        }
    }

    #[test]
    fn test_laundry_perfect_day() {
        let score = laundry(35.0, 0.0, 5.0, Some(10.0), None, 0.0, Some(10));
        assert_eq!(score.score, 100);
        assert_eq!(score.dry_time, "1.5-2.5 hours");
    }

    #[test]
    fn test_laundry_zero_when_rain_likely() {
        assert_eq!(laundry(25.0, 40.0, 3.0, None, None, 0.0, Some(60)).score, 0);
        assert_eq!(laundry(25.0, 40.0, 3.0, None, None, 0.4, None).score, 0);
    }

    #[test]
    fn test_laundry_uses_lux_when_uv_missing() {
        let with_lux = laundry(20.0, 50.0, 2.0, None, Some(100_000.0), 0.0, None);
        let without = laundry(20.0, 50.0, 2.0, None, None, 0.0, None);
        assert_eq!(with_lux.score - without.score, 20);
    }

    #[test]
    fn test_running_rain_penalties() {
        let config = RunningConfig::default();
        let dry = running(15.0, Some(0.0), 0.0, &config);
        assert_eq!(dry.score, 100);
        let light = running(15.0, Some(0.0), 1.0, &config);
        assert_eq!(light.score, 75);
        assert_eq!(light.rain_penalty, 25);
        let heavy = running(15.0, Some(0.0), 8.0, &config);
        assert_eq!(heavy.score, 10);
    }

    #[rstest]
    #[case(4.9, FireDanger::Low)]
    #[case(11.9, FireDanger::Moderate)]
    #[case(23.0, FireDanger::High)]
    #[case(37.9, FireDanger::VeryHigh)]
    #[case(38.0, FireDanger::Extreme)]
    fn test_fire_danger_levels(#[case] score: f64, #[case] expected: FireDanger) {
        assert_eq!(FireDanger::from_score(score), expected);
    }

    #[test]
    fn test_fire_risk_rain_suppresses() {
        let dry = fire_risk(35.0, 15.0, 10.0, 0.0);
        let wet = fire_risk(35.0, 15.0, 10.0, 20.0);
        assert!(dry.score > wet.score);
        assert!(dry.score <= 50.0);
        assert_eq!(fire_risk(-5.0, 100.0, 0.0, 0.0).score, 0.0);
    }

    #[test]
    fn test_stargazing_full_moon_penalty() {
        let dark = stargazing(Some(5.0), 40.0, 1.0, 0.0, &moon(0.0));
        let bright = stargazing(Some(5.0), 40.0, 1.0, 0.0, &moon(100.0));
        assert_eq!(dark.score, 90);
        assert_eq!(bright.score, 50);
        assert_eq!(bright.moon_impact, "bad");

        let gusty = stargazing(Some(5.0), 40.0, 10.0, 0.0, &moon(0.0));
        assert_eq!(gusty.score, 75);
    }

    #[test]
    fn test_stargazing_humidity_proxy() {
        let hazy = stargazing(None, 95.0, 1.0, 0.0, &moon(0.0));
        assert_eq!(hazy.score, 10);
        assert_eq!(hazy.label, "Poor");
    }

    #[test]
    fn test_uv_helpers() {
        assert_eq!(UvLevel::from_index(7.0), UvLevel::High);
        assert_eq!(UvLevel::from_index(11.0).to_string(), "Extreme");
        assert_eq!(uv_burn_minutes(0.0), 200);
        assert_eq!(uv_burn_minutes(10.0), 3);
    }
}
