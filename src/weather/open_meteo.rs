//! Open-Meteo forecast client

use super::ForecastProvider;
use crate::config::ForecastConfig;
use crate::models::{DailyForecast, ExternalForecast, HourlyForecast, Location};
use crate::WsCoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,precipitation_probability_max,wind_gusts_10m_max";
const HOURLY_FIELDS: &str = "weather_code,apparent_temperature,dew_point_2m,wind_gusts_10m,cloud_cover,precipitation_probability";
pub const FORECAST_DAYS: u32 = 7;

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoClient {
    /// Build a client whose requests retry transient failures
    pub fn new(config: &ForecastConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("ws-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn forecast_url(&self, location: Location) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&daily={DAILY_FIELDS}&hourly={HOURLY_FIELDS}&forecast_days={FORECAST_DAYS}&timezone=auto&wind_speed_unit=ms",
            self.base_url, location.latitude, location.longitude
        )
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    fn name(&self) -> &str {
        "open-meteo"
    }

    #[instrument(name = "open_meteo_fetch", level = "debug", skip(self))]
    async fn fetch_forecast(&self, location: Location) -> Result<ExternalForecast> {
        let url = self.forecast_url(location);
        debug!(%url, "Requesting forecast");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Forecast request failed")?
            .error_for_status()
            .context("Forecast service returned an error status")?;

        let body: ForecastResponse = response
            .json()
            .await
            .context("Failed to parse Open-Meteo forecast response")?;

        Ok(body.into_forecast(self.name(), Utc::now())?)
    }
}

/// Forecast response from Open-Meteo. Times are local to the requested
/// location; `utc_offset_seconds` converts them back to UTC.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub utc_offset_seconds: i64,
    pub daily: Option<DailyData>,
    pub hourly: Option<HourlyData>,
}

#[derive(Debug, Deserialize)]
pub struct DailyData {
    pub time: Vec<String>,
    pub weather_code: Option<Vec<Option<u8>>>,
    #[serde(rename = "temperature_2m_max")]
    pub temperature_max: Option<Vec<Option<f64>>>,
    #[serde(rename = "temperature_2m_min")]
    pub temperature_min: Option<Vec<Option<f64>>>,
    #[serde(rename = "precipitation_sum")]
    pub precipitation: Option<Vec<Option<f64>>>,
    #[serde(rename = "precipitation_probability_max")]
    pub precipitation_probability: Option<Vec<Option<f64>>>,
    #[serde(rename = "wind_gusts_10m_max")]
    pub wind_gusts_max: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    pub weather_code: Option<Vec<Option<u8>>>,
    pub apparent_temperature: Option<Vec<Option<f64>>>,
    #[serde(rename = "dew_point_2m")]
    pub dew_point: Option<Vec<Option<f64>>>,
    #[serde(rename = "wind_gusts_10m")]
    pub wind_gusts: Option<Vec<Option<f64>>>,
    pub cloud_cover: Option<Vec<Option<f64>>>,
    pub precipitation_probability: Option<Vec<Option<f64>>>,
}

/// Value `i` of an optional column; short or missing columns read as `None`
fn column<T: Copy>(values: Option<&Vec<Option<T>>>, i: usize) -> Option<T> {
    values.and_then(|v| v.get(i).copied().flatten())
}

impl ForecastResponse {
    pub fn into_forecast(
        self,
        provider: &str,
        retrieved_at: DateTime<Utc>,
    ) -> crate::Result<ExternalForecast> {
        let offset = TimeDelta::seconds(self.utc_offset_seconds);

        let daily = match &self.daily {
            Some(d) => d
                .time
                .iter()
                .enumerate()
                .map(|(i, day)| {
                    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                        WsCoreError::forecast(format!("Invalid daily date '{day}': {e}"))
                    })?;
                    Ok(DailyForecast {
                        date,
                        weather_code: column(d.weather_code.as_ref(), i),
                        precipitation_probability: column(d.precipitation_probability.as_ref(), i),
                        temperature_max_c: column(d.temperature_max.as_ref(), i),
                        temperature_min_c: column(d.temperature_min.as_ref(), i),
                        wind_gust_max_ms: column(d.wind_gusts_max.as_ref(), i),
                        precipitation_mm: column(d.precipitation.as_ref(), i),
                    })
                })
                .collect::<crate::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut hourly = match &self.hourly {
            Some(h) => h
                .time
                .iter()
                .enumerate()
                .map(|(i, stamp)| {
                    let local = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M").map_err(
                        |e| WsCoreError::forecast(format!("Invalid hourly time '{stamp}': {e}")),
                    )?;
                    Ok(HourlyForecast {
                        time: (local - offset).and_utc(),
                        weather_code: column(h.weather_code.as_ref(), i),
                        apparent_temperature_c: column(h.apparent_temperature.as_ref(), i),
                        dew_point_c: column(h.dew_point.as_ref(), i),
                        wind_gust_ms: column(h.wind_gusts.as_ref(), i),
                        cloud_cover_pct: column(h.cloud_cover.as_ref(), i),
                        precipitation_probability: column(h.precipitation_probability.as_ref(), i),
                    })
                })
                .collect::<crate::Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        hourly.sort_by_key(|h| h.time);

        if daily.is_empty() && hourly.is_empty() {
            return Err(WsCoreError::forecast(
                "Forecast response carries neither daily nor hourly data",
            ));
        }

        Ok(ExternalForecast {
            provider: provider.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            retrieved_at,
            daily,
            hourly,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
        "latitude": 47.38,
        "longitude": 8.54,
        "utc_offset_seconds": 7200,
        "timezone": "Europe/Zurich",
        "daily": {
            "time": ["2026-05-10", "2026-05-11"],
            "weather_code": [61, 2],
            "temperature_2m_max": [17.5, 21.0],
            "temperature_2m_min": [9.1, null],
            "precipitation_sum": [4.2, 0.0],
            "precipitation_probability_max": [80, 10],
            "wind_gusts_10m_max": [12.3, 7.0]
        },
        "hourly": {
            "time": ["2026-05-10T00:00", "2026-05-10T01:00"],
            "weather_code": [3, 61],
            "apparent_temperature": [8.0, 7.5],
            "dew_point_2m": [6.1, 6.0],
            "wind_gusts_10m": [5.0, 6.5],
            "cloud_cover": [100, 95],
            "precipitation_probability": [40, 70]
        }
    }"#;

    fn retrieved() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 9, 22, 5, 0).unwrap()
    }

    #[test]
    fn test_parse_sample_response() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let forecast = response.into_forecast("open-meteo", retrieved()).unwrap();

        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.daily[0].weather_code, Some(61));
        assert_eq!(forecast.daily[0].precipitation_probability, Some(80.0));
        assert_eq!(forecast.daily[1].temperature_min_c, None);

        // local midnight at UTC+2 is 22:00 UTC the evening before
        assert_eq!(
            forecast.hourly[0].time,
            Utc.with_ymd_and_hms(2026, 5, 9, 22, 0, 0).unwrap()
        );
        assert_eq!(forecast.hourly[1].cloud_cover_pct, Some(95.0));
        assert_eq!(
            forecast.hourly_at(retrieved()).and_then(|h| h.weather_code),
            Some(3)
        );
    }

    #[test]
    fn test_malformed_time_is_a_forecast_error() {
        let json = r#"{"latitude":0,"longitude":0,"hourly":{"time":["yesterday"]}}"#;
        let response: ForecastResponse = serde_json::from_str(json).unwrap();
        let err = response.into_forecast("open-meteo", retrieved()).unwrap_err();
        assert!(matches!(err, WsCoreError::Forecast { .. }));
    }

    #[test]
    fn test_empty_response_is_rejected() {
        let json = r#"{"latitude":0,"longitude":0}"#;
        let response: ForecastResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_forecast("open-meteo", retrieved()).is_err());
    }

    #[test]
    fn test_forecast_url() {
        let client = OpenMeteoClient::new(&ForecastConfig::default()).unwrap();
        let url = client.forecast_url(Location::new(47.38, 8.54));
        assert!(url.starts_with("https://api.open-meteo.com/v1/forecast?latitude=47.38&longitude=8.54"));
        assert!(url.contains("forecast_days=7"));
        assert!(url.contains("wind_speed_unit=ms"));
        assert!(url.contains("precipitation_probability_max"));
    }
}
