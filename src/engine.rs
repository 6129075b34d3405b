//! Per-station compute pass
//!
//! A [`StationEngine`] owns the configuration and every mutable buffer of one
//! station. [`StationEngine::tick`] is synchronous and reads nothing but its
//! arguments and that state, so two engines with equal state fed equal input
//! produce equal snapshots.

use crate::activity::{self, UvLevel};
use crate::agro::{self, DegreeDayAccumulator, DegreeDaySeed, Et0Method};
use crate::alerts;
use crate::astro::{self, Daylight};
use crate::config::StationConfig;
use crate::forecast::{
    self, ConditionInputs, ZambrettiForecast, ZambrettiInput, combined_rain_probability,
    local_rain_probability,
};
use crate::models::{
    ActivityScores, ConditionOutputs, DerivedSnapshot, Evapotranspiration, ExternalForecast,
    ForecastOutputs, HourlyForecast, Measurement, MetricKind, NormalizedReadings, PressureOutputs,
    Psychrometrics, RainOutputs, RawReading, UvOutputs, WindOutputs,
};
use crate::normalize::normalize;
use crate::pressure::{self, PressureHistory, TrendReading};
use crate::psychro::{self, ComfortLevel, HumidityLevel};
use crate::quality::{QualityFlag, QualityMonitor, QualityReport};
use crate::rain::{self, RainIntensity, RainSeed, RainTracker};
use crate::rolling::RollingWindow;
use crate::wind::{self, Beaufort, Quadrant, WindSmoother, WindVector};
use crate::{Result, WsCoreError};
use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Length of the temperature, gust and rain-total windows, in hours
pub const ROLLING_WINDOW_HOURS: i64 = 24;

/// Buffer contents carried across restarts and reconfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSeed {
    pub pressure: Vec<(DateTime<Utc>, f64)>,
    pub temperature: Vec<(DateTime<Utc>, f64)>,
    pub gusts: Vec<(DateTime<Utc>, f64)>,
    pub rain_totals: Vec<(DateTime<Utc>, f64)>,
    pub rain: RainSeed,
    pub wind: Option<WindVector>,
    pub degree_days: DegreeDaySeed,
}

impl StateSeed {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self)
            .map_err(|e| WsCoreError::state(format!("Failed to encode state seed: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes)
            .map_err(|e| WsCoreError::state(format!("Failed to decode state seed: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct StationEngine {
    config: StationConfig,
    tz: Tz,
    monitor: QualityMonitor,
    pressure: PressureHistory,
    rain: RainTracker,
    rain_totals: RollingWindow<f64>,
    wind: WindSmoother,
    temperatures: RollingWindow<f64>,
    gusts: RollingWindow<f64>,
    degree_days: DegreeDayAccumulator,
}

impl StationEngine {
    /// Build a cold engine. Fails only on invalid configuration.
    pub fn new(config: StationConfig) -> Result<Self> {
        Self::with_seed(config, StateSeed::default())
    }

    /// Build an engine whose buffers start from `seed`
    pub fn with_seed(config: StationConfig, seed: StateSeed) -> Result<Self> {
        config.validate()?;
        let tz = config.tz()?;
        let filters = config.filters;
        let window = TimeDelta::hours(ROLLING_WINDOW_HOURS);

        Ok(Self {
            tz,
            monitor: QualityMonitor::new(config.staleness(), config.expected_optional.clone()),
            pressure: PressureHistory::with_seed(filters.trend_params(), seed.pressure),
            rain: RainTracker::with_seed(
                filters.kalman_process_noise,
                filters.kalman_measurement_noise,
                seed.rain,
            ),
            rain_totals: RollingWindow::with_seed(window, seed.rain_totals),
            wind: WindSmoother::with_seed(filters.wind_smoothing_alpha, seed.wind),
            temperatures: RollingWindow::with_seed(window, seed.temperature),
            gusts: RollingWindow::with_seed(window, seed.gusts),
            degree_days: DegreeDayAccumulator::with_seed(
                config.degree_day_base_c,
                seed.degree_days,
            ),
            config,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    #[must_use]
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    #[must_use]
    pub fn export_state(&self) -> StateSeed {
        StateSeed {
            pressure: self.pressure.export(),
            temperature: self.temperatures.export(),
            gusts: self.gusts.export(),
            rain_totals: self.rain_totals.export(),
            rain: self.rain.export(),
            wind: self.wind.export(),
            degree_days: self.degree_days.export(),
        }
    }

    /// Replace the configuration, keeping buffer contents. On error the
    /// engine is left untouched.
    pub fn reconfigure(&mut self, config: StationConfig) -> Result<()> {
        let seed = self.export_state();
        *self = Self::with_seed(config, seed)?;
        info!(station = %self.config.id, "Station reconfigured");
        Ok(())
    }

    pub fn reset_rain_baseline(&mut self) {
        self.rain.reset_baseline();
        info!(station = %self.config.id, "Rain baseline reset");
    }

    /// One compute pass over a frozen reading set.
    ///
    /// Never fails: bad or missing inputs become quality flags and leave the
    /// dependent sections `None`.
    #[instrument(
        name = "station_tick",
        level = "debug",
        skip(self, raw, forecast),
        fields(station = %self.config.id, readings = raw.len())
    )]
    pub fn tick(
        &mut self,
        raw: &[RawReading],
        now: DateTime<Utc>,
        forecast: Option<&ExternalForecast>,
    ) -> DerivedSnapshot {
        let normalized = normalize(raw, self.config.unit_mode, &self.config.calibration);
        let readings = normalized.readings;

        let computed_dew_point = match (
            readings.value(MetricKind::Temperature),
            readings.value(MetricKind::Humidity),
        ) {
            (Some(t), Some(rh)) => Some(psychro::dew_point(t, rh)),
            _ => None,
        };
        let reference_dew_point = readings.value(MetricKind::DewPoint).or(computed_dew_point);

        let report = self
            .monitor
            .assess(&readings, now, reference_dew_point, normalized.flags);
        let usable = usable_readings(&readings, &report);
        debug!(health = %report.health, flags = report.flags.len(), "Quality assessed");

        let local = now.with_timezone(&self.tz);
        let local_date = local.date_naive();
        let local_hour = local.hour();

        let temperature = usable.value(MetricKind::Temperature);
        let humidity = usable.value(MetricKind::Humidity);
        let wind_speed = usable.value(MetricKind::WindSpeed);
        let wind_gust = usable.value(MetricKind::WindGust);
        let illuminance = usable.value(MetricKind::Illuminance);
        let uv_index = usable.value(MetricKind::UvIndex);

        let hourly = forecast.and_then(|f| f.hourly_at(now));
        let daily = forecast.and_then(|f| f.daily_for(local_date));

        let psychrometrics = psychrometrics(temperature, humidity, wind_speed, hourly);
        let dew_point = usable
            .value(MetricKind::DewPoint)
            .or(psychrometrics.as_ref().map(|p| p.dew_point_c));

        let (pressure_outputs, trend) = self.pressure_stage(&usable, temperature, now);
        let rain_outputs = self.rain_stage(&usable, now);
        let wind_outputs = self.wind_stage(&usable, now);

        if let Some(t) = temperature {
            self.temperatures.push(now, t);
        }
        let temperature_24h = self.temperatures.stats(now);

        let quadrant = wind_outputs.quadrant;
        let mslp = pressure_outputs.as_ref().and_then(|p| p.mslp_hpa);
        let slope = trend.and_then(|t| t.slope_hpa_3h).unwrap_or(0.0);

        let zambretti = mslp
            .filter(|_| self.config.features.zambretti)
            .map(|mslp_hpa| {
                forecast::zambretti(&ZambrettiInput {
                    mslp_hpa,
                    trend_hpa_3h: slope,
                    quadrant,
                    humidity,
                    month: local.month(),
                    hemisphere: self.config.hemisphere,
                    region: self.config.climate_region,
                })
            });

        let rain_probability_local = match (mslp, humidity) {
            (Some(mslp_hpa), Some(rh)) => Some(local_rain_probability(
                mslp_hpa,
                slope,
                rh,
                quadrant,
                self.config.climate_region,
            )),
            _ => None,
        };
        let external_probability = hourly
            .and_then(|h| h.precipitation_probability)
            .or(daily.and_then(|d| d.precipitation_probability));
        let rain_probability_combined = rain_probability_local.map(|local| {
            combined_rain_probability(
                local,
                external_probability,
                local_hour,
                self.config.convective_hours,
            )
        });

        let daylight = Daylight::for_date(self.config.location.as_ref(), local_date, self.tz);
        let moon = astro::moon_info(local_date);
        let rain_rate = rain_outputs.as_ref().map(|r| r.filtered_rate_mm_h);

        let condition = match (temperature, humidity) {
            (Some(t), Some(rh)) => {
                let inputs = ConditionInputs {
                    temperature_c: t,
                    humidity: rh,
                    dew_point_c: dew_point.unwrap_or_else(|| psychro::dew_point(t, rh)),
                    wind_speed_ms: wind_speed.unwrap_or(0.0),
                    wind_gust_ms: wind_gust.or(wind_speed).unwrap_or(0.0),
                    rain_rate_mm_h: rain_rate.unwrap_or(0.0),
                    trend_hpa_3h: slope,
                    zambretti_stormy: zambretti.as_ref().is_some_and(ZambrettiForecast::is_stormy),
                    illuminance_lx: illuminance,
                    pm2_5: usable.value(MetricKind::Pm25),
                    pm10: usable.value(MetricKind::Pm10),
                    is_day: daylight.is_day(now),
                    sun_event: daylight.sun_event(now),
                    local_hour,
                    minutes_since_rain: self
                        .rain
                        .last_rain_at()
                        .map(|at| (now - at).num_minutes()),
                    forecast_cloud_cover_pct: hourly.and_then(|h| h.cloud_cover_pct),
                };
                let condition = forecast::classify(&inputs);
                Some(ConditionOutputs {
                    condition,
                    severity: condition.severity(),
                    description: condition.description(),
                })
            }
            _ => None,
        };

        let forecast_outputs = ForecastOutputs {
            zambretti,
            rain_probability_local,
            rain_probability_combined,
            condition,
            tiles: forecast.map(|f| f.tiles(local_date)).unwrap_or_default(),
        };

        let uv = uv_index.map(|index| {
            let level = UvLevel::from_index(index);
            UvOutputs {
                index,
                level,
                recommendation: level.recommendation(),
                burn_minutes: activity::uv_burn_minutes(index),
            }
        });

        let alerts = alerts::evaluate(&self.config.alerts, wind_gust, rain_rate, temperature);

        let features = self.config.features;
        let degree_days = temperature
            .filter(|_| features.degree_days)
            .map(|t| self.degree_days.update(t, now, local_date));

        let evapotranspiration = match (self.config.location, temperature_24h, temperature) {
            (Some(location), Some(stats), Some(t)) if features.evapotranspiration => {
                let day_of_year = local.ordinal();
                let pressure_kpa = usable.value(MetricKind::Pressure).map_or_else(
                    || agro::standard_pressure_kpa(self.config.elevation_m),
                    |hpa| hpa / 10.0,
                );
                let penman = match (humidity, wind_speed) {
                    (Some(rh), Some(wind)) => agro::et0_penman_monteith(&agro::PenmanMonteithInput {
                        t_mean_c: t,
                        t_max_c: stats.max,
                        t_min_c: stats.min,
                        humidity: rh,
                        wind_speed_ms: wind,
                        solar_radiation_mj: None,
                        pressure_kpa,
                        elevation_m: self.config.elevation_m,
                        latitude_deg: location.latitude,
                        day_of_year,
                    })
                    .map(|mm| (mm, Et0Method::PenmanMonteith)),
                    _ => None,
                };
                penman
                    .or_else(|| {
                        agro::et0_hargreaves(stats.max, stats.min, t, location.latitude, day_of_year)
                            .map(|mm| (mm, Et0Method::Hargreaves))
                    })
                    .map(|(daily_mm, method)| Evapotranspiration {
                        daily_mm,
                        hourly_mm: agro::et0_hourly_share(daily_mm, local_hour),
                        method,
                    })
            }
            _ => None,
        };

        let current_rain = rain_rate.unwrap_or(0.0);
        let rain_24h = rain_outputs.as_ref().map_or(0.0, |r| r.last_24h_mm);
        let feels_like = psychrometrics
            .as_ref()
            .and_then(|p| p.apparent_temperature_c)
            .or(temperature);

        let activities = ActivityScores {
            laundry: match (temperature, humidity) {
                (Some(t), Some(rh)) if features.laundry => Some(activity::laundry(
                    t,
                    rh,
                    wind_speed.unwrap_or(0.0),
                    uv_index,
                    illuminance,
                    current_rain,
                    rain_probability_combined,
                )),
                _ => None,
            },
            stargazing: humidity.filter(|_| features.stargazing).map(|rh| {
                activity::stargazing(
                    hourly.and_then(|h| h.cloud_cover_pct),
                    rh,
                    wind_speed.unwrap_or(0.0),
                    current_rain,
                    &moon,
                )
            }),
            fire_risk: match (temperature, humidity) {
                (Some(t), Some(rh)) if features.fire_risk => Some(activity::fire_risk(
                    t,
                    rh,
                    wind_speed.unwrap_or(0.0),
                    rain_24h,
                )),
                _ => None,
            },
            running: feels_like.filter(|_| features.running).map(|fl| {
                activity::running(fl, uv_index, current_rain, &self.config.running)
            }),
        };

        DerivedSnapshot {
            station_id: self.config.id.clone(),
            computed_at: now,
            health: report.health,
            quality_flags: report.flags,
            readings,
            psychrometrics,
            pressure: pressure_outputs,
            rain: rain_outputs,
            wind: wind_outputs,
            temperature_24h,
            uv,
            forecast: forecast_outputs,
            alerts,
            degree_days,
            evapotranspiration,
            moon,
            daylight,
            activities,
        }
    }

    fn pressure_stage(
        &mut self,
        usable: &NormalizedReadings,
        temperature: Option<f64>,
        now: DateTime<Utc>,
    ) -> (Option<PressureOutputs>, Option<TrendReading>) {
        let Some(station_hpa) = usable.value(MetricKind::Pressure) else {
            self.pressure.prune(now);
            return (None, None);
        };

        self.pressure.record(now, station_hpa);
        let trend = self.pressure.trend();
        let mslp_hpa = temperature
            .map(|t| pressure::sea_level_pressure(station_hpa, self.config.elevation_m, t));
        debug!(station_hpa, ?mslp_hpa, slope = ?trend.slope_hpa_3h, "Pressure stage");

        let outputs = PressureOutputs {
            station_hpa,
            mslp_hpa,
            trend_hpa_3h: trend.slope_hpa_3h,
            trend: trend.trend,
            trend_arrow: trend.trend.arrow(),
            change_over_window_hpa: self.pressure.change_over_window(),
            samples: self.pressure.len(),
        };
        (Some(outputs), Some(trend))
    }

    fn rain_stage(&mut self, usable: &NormalizedReadings, now: DateTime<Utc>) -> Option<RainOutputs> {
        let total = usable.value(MetricKind::RainTotal)?;
        let sample = self.rain.update(total, now);
        self.rain_totals.push(now, total);

        let last_hour = self.rain_totals.values_since(now, now - TimeDelta::hours(1));
        let last_day: Vec<f64> = self
            .rain_totals
            .values(now)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        debug!(
            raw = sample.raw_rate_mm_h,
            filtered = sample.filtered_rate_mm_h,
            "Rain stage"
        );

        Some(RainOutputs {
            raw_rate_mm_h: sample.raw_rate_mm_h,
            filtered_rate_mm_h: sample.filtered_rate_mm_h,
            intensity: RainIntensity::from_rate(sample.filtered_rate_mm_h),
            last_hour_mm: rain::accumulation(&last_hour),
            last_24h_mm: rain::accumulation(&last_day),
            since_baseline_mm: self.rain.since_baseline(),
            last_rain_at: self.rain.last_rain_at(),
            filter_quality: self.rain.filter().quality(),
            counter_reset: sample.counter_reset,
        })
    }

    fn wind_stage(&mut self, usable: &NormalizedReadings, now: DateTime<Utc>) -> WindOutputs {
        let speed_ms = usable.value(MetricKind::WindSpeed);
        let gust_ms = usable.value(MetricKind::WindGust);
        let direction_deg = usable.value(MetricKind::WindDirection);

        let smoothed_direction_deg = direction_deg.map(|deg| self.wind.update(deg));
        if let Some(gust) = gust_ms {
            self.gusts.push(now, gust);
        }

        WindOutputs {
            speed_ms,
            gust_ms,
            beaufort: speed_ms.map(Beaufort::from_speed),
            direction_deg,
            smoothed_direction_deg,
            quadrant: smoothed_direction_deg.map(Quadrant::from_direction),
            cardinal: smoothed_direction_deg.map(wind::cardinal16),
            gust_max_24h_ms: self.gusts.max(now),
        }
    }
}

fn psychrometrics(
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    hourly: Option<&HourlyForecast>,
) -> Option<Psychrometrics> {
    let (t, rh) = (temperature?, humidity?);
    let apparent = wind_speed
        .map(|ws| psychro::apparent_temperature(t, rh, ws))
        .or(hourly.and_then(|h| h.apparent_temperature_c));

    Some(Psychrometrics {
        dew_point_c: psychro::dew_point(t, rh),
        frost_point_c: psychro::frost_point(t, rh),
        wet_bulb: psychro::wet_bulb(t, rh),
        apparent_temperature_c: apparent,
        comfort: apparent.map(ComfortLevel::from_feels_like),
        humidity_level: HumidityLevel::from_humidity(rh),
    })
}

/// Readings the derivation stages may use: stale and implausible values are
/// reported in the snapshot but feed nothing.
fn usable_readings(readings: &NormalizedReadings, report: &QualityReport) -> NormalizedReadings {
    let mut usable = readings.clone();
    for flag in &report.flags {
        if let QualityFlag::OutOfRange { metric, .. } = flag {
            usable.insert(*metric, Measurement::Unavailable);
        }
    }
    for metric in &report.stale {
        usable.insert(*metric, Measurement::Unavailable);
    }
    usable
}
