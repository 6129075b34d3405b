//! Current-condition classifier
//!
//! A fixed priority table: severe weather, precipitation, ice, visibility,
//! air quality, wind, temperature, sun events, then cloud cover estimated
//! from illuminance. Illuminance is not corrected for solar elevation, so
//! the cloud estimate is rough near sunrise and sunset.

use crate::astro::SunEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Advisory,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Hurricane,
    SevereStorm,
    Thunderstorm,
    PreStorm,
    SnowAccumulation,
    Snowy,
    Sleet,
    HeavyRain,
    Rainy,
    Drizzle,
    IcyConditions,
    Frost,
    MistyMorning,
    Fog,
    Sandstorm,
    AfricanDust,
    Smoke,
    HazySun,
    Windy,
    WindyNight,
    Breezy,
    Hot,
    Muggy,
    Cold,
    BitterCold,
    Sunrise,
    Sunset,
    GoldenHour,
    ClearingAfterRain,
    ClearNight,
    OvercastNight,
    Overcast,
    Cloudy,
    PartlyCloudy,
    MostlySunny,
    Sunny,
}

impl Condition {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Condition::Hurricane | Condition::SevereStorm => Severity::Critical,
            Condition::Thunderstorm
            | Condition::HeavyRain
            | Condition::IcyConditions
            | Condition::Sandstorm
            | Condition::BitterCold => Severity::Warning,
            Condition::PreStorm
            | Condition::Sleet
            | Condition::SnowAccumulation
            | Condition::Hot
            | Condition::Smoke
            | Condition::Frost => Severity::Advisory,
            _ => Severity::Normal,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Hurricane => "hurricane",
            Condition::SevereStorm => "severe-storm",
            Condition::Thunderstorm => "thunderstorm",
            Condition::PreStorm => "pre-storm",
            Condition::SnowAccumulation => "snow-accumulation",
            Condition::Snowy => "snowy",
            Condition::Sleet => "sleet",
            Condition::HeavyRain => "heavy-rain",
            Condition::Rainy => "rainy",
            Condition::Drizzle => "drizzle",
            Condition::IcyConditions => "icy-conditions",
            Condition::Frost => "frost",
            Condition::MistyMorning => "misty-morning",
            Condition::Fog => "fog",
            Condition::Sandstorm => "sandstorm",
            Condition::AfricanDust => "african-dust",
            Condition::Smoke => "smoke",
            Condition::HazySun => "hazy-sun",
            Condition::Windy => "windy",
            Condition::WindyNight => "windy-night",
            Condition::Breezy => "breezy",
            Condition::Hot => "hot",
            Condition::Muggy => "muggy",
            Condition::Cold => "cold",
            Condition::BitterCold => "bitter-cold",
            Condition::Sunrise => "sunrise",
            Condition::Sunset => "sunset",
            Condition::GoldenHour => "golden-hour",
            Condition::ClearingAfterRain => "clearing-after-rain",
            Condition::ClearNight => "clear-night",
            Condition::OvercastNight => "overcast-night",
            Condition::Overcast => "overcast",
            Condition::Cloudy => "cloudy",
            Condition::PartlyCloudy => "partly-cloudy",
            Condition::MostlySunny => "mostly-sunny",
            Condition::Sunny => "sunny",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Condition::Hurricane => "Hurricane conditions - seek shelter",
            Condition::SevereStorm => "Severe storm - dangerous winds",
            Condition::Thunderstorm => "Thunderstorm in progress",
            Condition::PreStorm => "Storm approaching",
            Condition::SnowAccumulation => "Heavy snowfall",
            Condition::Snowy => "Snow",
            Condition::Sleet => "Sleet/freezing rain",
            Condition::HeavyRain => "Heavy rainfall",
            Condition::Rainy => "Rain",
            Condition::Drizzle => "Light drizzle",
            Condition::IcyConditions => "Icy conditions - use caution",
            Condition::Frost => "Frost",
            Condition::MistyMorning => "Misty morning",
            Condition::Fog => "Foggy",
            Condition::Sandstorm => "Sandstorm",
            Condition::AfricanDust => "Saharan dust event",
            Condition::Smoke => "Smoky conditions",
            Condition::HazySun => "Hazy sunshine",
            Condition::Windy => "Windy",
            Condition::WindyNight => "Windy night",
            Condition::Breezy => "Breezy",
            Condition::Hot => "Extreme heat",
            Condition::Muggy => "Hot and humid",
            Condition::Cold => "Cold",
            Condition::BitterCold => "Bitterly cold",
            Condition::Sunrise => "Sunrise",
            Condition::Sunset => "Sunset",
            Condition::GoldenHour => "Golden hour",
            Condition::ClearingAfterRain => "Clearing after rain",
            Condition::ClearNight => "Clear night",
            Condition::OvercastNight => "Overcast night",
            Condition::Overcast => "Overcast",
            Condition::Cloudy => "Cloudy",
            Condition::PartlyCloudy => "Partly cloudy",
            Condition::MostlySunny => "Mostly sunny",
            Condition::Sunny => "Sunny",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the classifier reads, taken from one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionInputs {
    pub temperature_c: f64,
    pub humidity: f64,
    pub dew_point_c: f64,
    pub wind_speed_ms: f64,
    pub wind_gust_ms: f64,
    pub rain_rate_mm_h: f64,
    pub trend_hpa_3h: f64,
    pub zambretti_stormy: bool,
    pub illuminance_lx: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub is_day: bool,
    pub sun_event: Option<SunEvent>,
    pub local_hour: u32,
    pub minutes_since_rain: Option<i64>,
    /// Forecast cloud cover for the current hour, used without a light sensor
    pub forecast_cloud_cover_pct: Option<f64>,
}

/// Cloud cover bucket from illuminance, or from forecast cloud cover when
/// there is no light sensor
#[must_use]
pub fn cloud_condition(illuminance_lx: Option<f64>, forecast_cloud_pct: Option<f64>) -> Condition {
    if let Some(lx) = illuminance_lx {
        return match lx {
            l if l < 5_000.0 => Condition::Overcast,
            l if l < 20_000.0 => Condition::Cloudy,
            l if l < 45_000.0 => Condition::PartlyCloudy,
            l if l < 60_000.0 => Condition::MostlySunny,
            _ => Condition::Sunny,
        };
    }
    match forecast_cloud_pct {
        Some(c) if c >= 90.0 => Condition::Overcast,
        Some(c) if c >= 60.0 => Condition::Cloudy,
        Some(c) if c >= 30.0 => Condition::PartlyCloudy,
        Some(c) if c >= 10.0 => Condition::MostlySunny,
        Some(_) => Condition::Sunny,
        None => Condition::PartlyCloudy,
    }
}

#[must_use]
pub fn classify(c: &ConditionInputs) -> Condition {
    let raining = c.rain_rate_mm_h > 0.0;
    let night = !c.is_day;

    if c.wind_gust_ms > 32.0 {
        return Condition::Hurricane;
    }
    if c.wind_gust_ms > 25.0 && c.trend_hpa_3h < -3.0 {
        return Condition::SevereStorm;
    }
    if c.zambretti_stormy && c.rain_rate_mm_h > 10.0 {
        return Condition::Thunderstorm;
    }
    if c.zambretti_stormy || (c.rain_rate_mm_h > 5.0 && c.wind_gust_ms > 15.0) {
        return Condition::PreStorm;
    }

    if c.temperature_c < 0.0 && raining {
        return if c.wind_speed_ms > 8.0 && c.rain_rate_mm_h > 2.0 {
            Condition::SnowAccumulation
        } else {
            Condition::Snowy
        };
    }
    if (0.0..2.0).contains(&c.temperature_c) && raining && c.humidity > 85.0 {
        return Condition::Sleet;
    }

    if c.rain_rate_mm_h > 10.0 {
        return Condition::HeavyRain;
    }
    if c.rain_rate_mm_h > 2.0 {
        return Condition::Rainy;
    }
    if raining {
        return Condition::Drizzle;
    }

    if c.temperature_c < -5.0 && c.wind_speed_ms > 10.0 {
        return Condition::IcyConditions;
    }

    if c.humidity > 95.0 && c.temperature_c - c.dew_point_c < 1.0 && c.wind_speed_ms < 1.5 {
        let morning = (5..9).contains(&c.local_hour) || c.sun_event == Some(SunEvent::Sunrise);
        return if morning {
            Condition::MistyMorning
        } else {
            Condition::Fog
        };
    }

    let pm10 = c.pm10.unwrap_or(0.0);
    let pm2_5 = c.pm2_5.unwrap_or(0.0);
    if pm10 > 150.0 && c.illuminance_lx.unwrap_or(0.0) < 50_000.0 {
        return Condition::Sandstorm;
    }
    if pm10 > 80.0 {
        return Condition::AfricanDust;
    }
    if pm2_5 > 55.0 {
        return Condition::Smoke;
    }
    if pm2_5 > 35.0 && c.is_day {
        return Condition::HazySun;
    }

    if c.wind_gust_ms > 17.2 {
        return if c.is_day {
            Condition::Windy
        } else {
            Condition::WindyNight
        };
    }
    if c.wind_gust_ms > 10.8 {
        return Condition::Breezy;
    }

    if c.temperature_c >= 38.0 {
        return Condition::Hot;
    }
    if c.dew_point_c >= 20.0 && c.temperature_c >= 25.0 {
        return Condition::Muggy;
    }
    if c.temperature_c < -20.0 {
        return Condition::BitterCold;
    }
    if c.temperature_c < -10.0 && night {
        return Condition::Cold;
    }
    if c.temperature_c <= 0.0 && c.humidity > 90.0 && night {
        return Condition::Frost;
    }

    match c.sun_event {
        Some(SunEvent::Sunrise) => return Condition::Sunrise,
        Some(SunEvent::Sunset) => return Condition::Sunset,
        Some(SunEvent::GoldenHour) => return Condition::GoldenHour,
        None => {}
    }

    let lux = c.illuminance_lx.unwrap_or(0.0);
    if c.minutes_since_rain.is_some_and(|m| m <= 120) && c.humidity > 80.0 && lux > 30_000.0 {
        return Condition::ClearingAfterRain;
    }

    if night {
        let clear = match (c.illuminance_lx, c.forecast_cloud_cover_pct) {
            (Some(lx), _) => c.humidity < 50.0 && lx < 100.0,
            (None, Some(cloud)) => cloud < 30.0,
            (None, None) => c.humidity < 50.0,
        };
        return if clear {
            Condition::ClearNight
        } else {
            Condition::OvercastNight
        };
    }

    cloud_condition(c.illuminance_lx, c.forecast_cloud_cover_pct)
}
