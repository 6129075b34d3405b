//! External multi-day forecast payload and the tiles derived from it

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Number of daily tiles exposed to the presentation layer
pub const FORECAST_TILE_DAYS: usize = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub weather_code: Option<u8>,
    /// Maximum precipitation probability of the day, percent
    pub precipitation_probability: Option<f64>,
    pub temperature_max_c: Option<f64>,
    pub temperature_min_c: Option<f64>,
    pub wind_gust_max_ms: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub weather_code: Option<u8>,
    pub apparent_temperature_c: Option<f64>,
    pub dew_point_c: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub precipitation_probability: Option<f64>,
}

/// Provider-neutral forecast, already in canonical units
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExternalForecast {
    pub provider: String,
    pub latitude: f64,
    pub longitude: f64,
    pub retrieved_at: DateTime<Utc>,
    pub daily: Vec<DailyForecast>,
    /// Sorted by `time`
    pub hourly: Vec<HourlyForecast>,
}

impl ExternalForecast {
    #[must_use]
    pub fn daily_for(&self, date: NaiveDate) -> Option<&DailyForecast> {
        self.daily.iter().find(|d| d.date == date)
    }

    /// The hourly slot containing `now`
    #[must_use]
    pub fn hourly_at(&self, now: DateTime<Utc>) -> Option<&HourlyForecast> {
        self.hourly
            .iter()
            .rev()
            .find(|h| h.time <= now && now - h.time < TimeDelta::hours(1))
    }

    /// Up to five daily tiles starting at `today`
    #[must_use]
    pub fn tiles(&self, today: NaiveDate) -> Vec<ForecastTile> {
        self.daily
            .iter()
            .filter(|d| d.date >= today)
            .take(FORECAST_TILE_DAYS)
            .map(|d| ForecastTile::from_daily(d, (d.date - today).num_days()))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastTile {
    pub label: String,
    pub date: NaiveDate,
    pub condition: String,
    pub temperature_max_c: Option<f64>,
    pub temperature_min_c: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_gust_max_ms: Option<f64>,
}

impl ForecastTile {
    fn from_daily(day: &DailyForecast, offset_days: i64) -> Self {
        let label = match offset_days {
            0 => "Today".to_string(),
            1 => "Tomorrow".to_string(),
            n => format!("Day {}", n + 1),
        };
        Self {
            label,
            date: day.date,
            condition: day
                .weather_code
                .map_or("Unknown", weather_code_to_description)
                .to_string(),
            temperature_max_c: day.temperature_max_c,
            temperature_min_c: day.temperature_min_c,
            precipitation_probability: day.precipitation_probability,
            wind_gust_max_ms: day.wind_gust_max_ms,
        }
    }
}

/// WMO weather interpretation code to text
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(offset: i64, code: u8) -> DailyForecast {
        DailyForecast {
            date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap() + TimeDelta::days(offset),
            weather_code: Some(code),
            precipitation_probability: Some(10.0 * offset as f64),
            temperature_max_c: Some(18.0),
            temperature_min_c: Some(8.0),
            wind_gust_max_ms: Some(9.0),
            precipitation_mm: Some(0.0),
        }
    }

    fn forecast() -> ExternalForecast {
        let start = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        ExternalForecast {
            provider: "test".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            retrieved_at: start,
            daily: (0..7).map(|i| day(i, if i == 2 { 61 } else { 1 })).collect(),
            hourly: (0..48)
                .map(|h| HourlyForecast {
                    time: start + TimeDelta::hours(h),
                    weather_code: Some(3),
                    apparent_temperature_c: None,
                    dew_point_c: None,
                    wind_gust_ms: None,
                    cloud_cover_pct: Some(h as f64),
                    precipitation_probability: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_tiles_are_labelled_from_today() {
        let tiles = forecast().tiles(NaiveDate::from_ymd_opt(2026, 4, 2).unwrap());
        assert_eq!(tiles.len(), 5);
        assert_eq!(tiles[0].label, "Today");
        assert_eq!(tiles[1].label, "Tomorrow");
        assert_eq!(tiles[1].condition, "Slight rain");
        assert_eq!(tiles[4].label, "Day 5");
    }

    #[test]
    fn test_hourly_slot_lookup() {
        let f = forecast();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 5, 42, 0).unwrap();
        assert_eq!(f.hourly_at(now).and_then(|h| h.cloud_cover_pct), Some(5.0));
        let beyond = Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap();
        assert!(f.hourly_at(beyond).is_none());
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(weather_code_to_description(42), "Unknown");
    }
}
