//! Degree days and reference evapotranspiration
//!
//! ET₀ prefers FAO-56 Penman-Monteith when wind is measured and falls back
//! to Hargreaves-Samani, which only needs the temperature range.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Longest gap between ticks credited to the accumulator
pub const MAX_DEGREE_HOUR_STEP: f64 = 1.5;
const SOLAR_CONSTANT_MJ_PER_MIN: f64 = 0.0820;
/// MJ/m² of radiation per mm of evaporated water
const LATENT_HEAT_MJ_PER_MM: f64 = 2.45;
/// Stefan-Boltzmann constant in MJ K⁻⁴ m⁻² day⁻¹
const STEFAN_BOLTZMANN_MJ: f64 = 4.903e-9;
const GRASS_ALBEDO: f64 = 0.23;
/// Anemometers are assumed to sit at the WMO standard height
pub const WIND_SENSOR_HEIGHT_M: f64 = 10.0;
/// Hargreaves radiation coefficient for interior locations (FAO-56 eq. 50)
const K_RS_INTERIOR: f64 = 0.16;

/// Which ET₀ model produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Et0Method {
    PenmanMonteith,
    Hargreaves,
}

impl fmt::Display for Et0Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Et0Method::PenmanMonteith => "penman_monteith",
            Et0Method::Hargreaves => "hargreaves",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeDays {
    pub heating_today: f64,
    pub cooling_today: f64,
    /// Instantaneous degree-hour rates
    pub heating_rate: f64,
    pub cooling_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DegreeDaySeed {
    pub day: Option<NaiveDate>,
    pub heating_degree_hours: f64,
    pub cooling_degree_hours: f64,
    pub last_at: Option<DateTime<Utc>>,
}

/// Integrates degree-hours over the local day
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeDayAccumulator {
    base_c: f64,
    state: DegreeDaySeed,
}

impl DegreeDayAccumulator {
    #[must_use]
    pub fn new(base_c: f64) -> Self {
        Self::with_seed(base_c, DegreeDaySeed::default())
    }

    #[must_use]
    pub fn with_seed(base_c: f64, seed: DegreeDaySeed) -> Self {
        Self { base_c, state: seed }
    }

    /// Credit the time since the previous update at the current temperature.
    /// Totals restart when `local_date` moves past the stored day.
    pub fn update(&mut self, temp_c: f64, now: DateTime<Utc>, local_date: NaiveDate) -> DegreeDays {
        if self.state.day != Some(local_date) {
            self.state.day = Some(local_date);
            self.state.heating_degree_hours = 0.0;
            self.state.cooling_degree_hours = 0.0;
        }

        let heating_rate = (self.base_c - temp_c).max(0.0);
        let cooling_rate = (temp_c - self.base_c).max(0.0);

        if let Some(last) = self.state.last_at {
            let hours = ((now - last).num_seconds() as f64 / 3600.0).min(MAX_DEGREE_HOUR_STEP);
            if hours > 0.0 {
                self.state.heating_degree_hours += heating_rate * hours;
                self.state.cooling_degree_hours += cooling_rate * hours;
            }
        }
        if self.state.last_at.is_none_or(|last| now > last) {
            self.state.last_at = Some(now);
        }

        DegreeDays {
            heating_today: self.state.heating_degree_hours / 24.0,
            cooling_today: self.state.cooling_degree_hours / 24.0,
            heating_rate,
            cooling_rate,
        }
    }

    #[must_use]
    pub fn export(&self) -> DegreeDaySeed {
        self.state
    }
}

/// Extraterrestrial radiation Ra in MJ/m²/day (FAO-56 eq. 21-25)
#[must_use]
pub fn extraterrestrial_radiation(latitude_deg: f64, day_of_year: u32) -> f64 {
    let phi = latitude_deg.to_radians();
    let j = f64::from(day_of_year);
    let inverse_distance = 1.0 + 0.033 * (2.0 * PI * j / 365.0).cos();
    let declination = 0.409 * (2.0 * PI * j / 365.0 - 1.39).sin();
    // clamped for polar day and night
    let sunset_angle = (-phi.tan() * declination.tan()).clamp(-1.0, 1.0).acos();

    let ra = (24.0 * 60.0 / PI)
        * SOLAR_CONSTANT_MJ_PER_MIN
        * inverse_distance
        * (sunset_angle * phi.sin() * declination.sin()
            + phi.cos() * declination.cos() * sunset_angle.sin());
    ra.max(0.0)
}

/// Hargreaves-Samani ET₀ in mm/day. Needs a positive diurnal range.
#[must_use]
pub fn et0_hargreaves(
    t_max_c: f64,
    t_min_c: f64,
    t_mean_c: f64,
    latitude_deg: f64,
    day_of_year: u32,
) -> Option<f64> {
    if t_max_c <= t_min_c {
        return None;
    }
    let ra_mm = extraterrestrial_radiation(latitude_deg, day_of_year) / LATENT_HEAT_MJ_PER_MM;
    let et0 = 0.0023 * ra_mm * (t_mean_c + 17.8) * (t_max_c - t_min_c).sqrt();
    Some(et0.max(0.0))
}

/// Inputs of the FAO-56 Penman-Monteith grass reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenmanMonteithInput {
    pub t_mean_c: f64,
    pub t_max_c: f64,
    pub t_min_c: f64,
    /// Mean relative humidity, %
    pub humidity: f64,
    /// Wind speed at [`WIND_SENSOR_HEIGHT_M`]
    pub wind_speed_ms: f64,
    /// Daily incoming shortwave, MJ/m²/day. Estimated from the diurnal
    /// range when the station has no pyranometer.
    pub solar_radiation_mj: Option<f64>,
    pub pressure_kpa: f64,
    pub elevation_m: f64,
    pub latitude_deg: f64,
    pub day_of_year: u32,
}

/// Atmospheric pressure in kPa from elevation alone (FAO-56 eq. 7)
#[must_use]
pub fn standard_pressure_kpa(elevation_m: f64) -> f64 {
    101.3 * ((293.0 - 0.0065 * elevation_m) / 293.0).powf(5.26)
}

fn saturation_vapour_pressure_kpa(temp_c: f64) -> f64 {
    0.6108 * ((17.27 * temp_c) / (temp_c + 237.3)).exp()
}

/// Penman-Monteith ET₀ in mm/day (FAO-56 eq. 6). `None` when the daily
/// high sits below the low or an input is not finite.
#[must_use]
pub fn et0_penman_monteith(input: &PenmanMonteithInput) -> Option<f64> {
    let PenmanMonteithInput {
        t_mean_c: t,
        t_max_c,
        t_min_c,
        humidity,
        wind_speed_ms,
        solar_radiation_mj,
        pressure_kpa,
        elevation_m,
        latitude_deg,
        day_of_year,
    } = *input;
    let finite = [t, t_max_c, t_min_c, humidity, wind_speed_ms, pressure_kpa]
        .iter()
        .all(|v| v.is_finite());
    if !finite || t_max_c < t_min_c {
        return None;
    }

    let gamma = 0.000_665 * pressure_kpa;
    let delta = 4098.0 * saturation_vapour_pressure_kpa(t) / (t + 237.3).powi(2);
    let es = (saturation_vapour_pressure_kpa(t_max_c) + saturation_vapour_pressure_kpa(t_min_c))
        / 2.0;
    let ea = es * humidity.clamp(0.0, 100.0) / 100.0;

    let ra = extraterrestrial_radiation(latitude_deg, day_of_year);
    let rso = (0.75 + 2e-5 * elevation_m) * ra;
    let rs = solar_radiation_mj
        .filter(|v| v.is_finite())
        .unwrap_or_else(|| K_RS_INTERIOR * (t_max_c - t_min_c).sqrt() * ra)
        .clamp(0.0, rso.max(0.0));
    let relative_shortwave = if rso > 0.0 { (rs / rso).min(1.0) } else { 1.0 };

    let net_shortwave = (1.0 - GRASS_ALBEDO) * rs;
    let net_longwave = STEFAN_BOLTZMANN_MJ
        * ((t_max_c + 273.16).powi(4) + (t_min_c + 273.16).powi(4))
        / 2.0
        * (0.34 - 0.14 * ea.max(0.0).sqrt())
        * (1.35 * relative_shortwave - 0.35);
    let net_radiation = net_shortwave - net_longwave;

    // log wind profile down to 2 m (FAO-56 eq. 47)
    let u2 = wind_speed_ms.max(0.0) * 4.87 / (67.8 * WIND_SENSOR_HEIGHT_M - 5.42).ln();

    let numerator =
        0.408 * delta * net_radiation + gamma * (900.0 / (t + 273.0)) * u2 * (es - ea);
    let denominator = delta + gamma * (1.0 + 0.34 * u2);
    Some((numerator / denominator).max(0.0))
}

/// Share of the daily ET₀ falling in a local hour: 80 % of the total spread
/// on a sine over 06:00-18:00
#[must_use]
pub fn et0_hourly_share(et0_daily_mm: f64, local_hour: u32) -> f64 {
    if et0_daily_mm <= 0.0 || !(6..=18).contains(&local_hour) {
        return 0.0;
    }
    let angle = PI * f64::from(local_hour - 6) / 13.0;
    et0_daily_mm * 0.8 * angle.sin() / 6.37
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_degree_hours_accumulate_and_reset_at_midnight() {
        let mut acc = DegreeDayAccumulator::new(18.0);
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 10, 0, 0).unwrap();

        acc.update(8.0, t0, day1);
        let dd = acc.update(8.0, t0 + TimeDelta::hours(1), day1);
        assert!((dd.heating_today - 10.0 / 24.0).abs() < 1e-9);
        assert_eq!(dd.cooling_today, 0.0);
        assert_eq!(dd.heating_rate, 10.0);

        let day2 = day1.succ_opt().unwrap();
        let dd = acc.update(8.0, t0 + TimeDelta::hours(2), day2);
        assert!((dd.heating_today - 10.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_gap_is_capped() {
        let mut acc = DegreeDayAccumulator::new(18.0);
        let day = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 7, 10, 8, 0, 0).unwrap();
        acc.update(28.0, t0, day);
        let dd = acc.update(28.0, t0 + TimeDelta::hours(6), day);
        assert!((dd.cooling_today - 15.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_radiation_mid_latitude_summer() {
        // FAO-56 example 8: 20°S on 3 September gives 32.2 MJ/m²/day
        let ra = extraterrestrial_radiation(-20.0, 246);
        assert!((ra - 32.2).abs() < 0.2, "got {ra}");
    }

    #[test]
    fn test_polar_night_has_no_radiation() {
        assert_eq!(extraterrestrial_radiation(80.0, 355), 0.0);
    }

    #[test]
    fn test_et0_requires_range() {
        assert!(et0_hargreaves(20.0, 20.0, 20.0, 45.0, 180).is_none());
        let et0 = et0_hargreaves(30.0, 15.0, 22.5, 45.0, 180).unwrap();
        assert!(et0 > 3.0 && et0 < 8.0, "got {et0}");
    }

    fn uccle_july() -> PenmanMonteithInput {
        PenmanMonteithInput {
            t_mean_c: 16.9,
            t_max_c: 21.5,
            t_min_c: 12.3,
            humidity: 70.55,
            wind_speed_ms: 2.78,
            solar_radiation_mj: Some(22.07),
            pressure_kpa: standard_pressure_kpa(100.0),
            elevation_m: 100.0,
            latitude_deg: 50.8,
            day_of_year: 187,
        }
    }

    #[test]
    fn test_penman_monteith_reference_day() {
        // FAO-56 example 18: Uccle on 6 July gives 3.9 mm/day
        let et0 = et0_penman_monteith(&uccle_july()).unwrap();
        assert!((et0 - 3.9).abs() < 0.1, "got {et0}");
    }

    #[test]
    fn test_penman_monteith_responds_to_wind_and_dryness() {
        let base = et0_penman_monteith(&uccle_july()).unwrap();
        let windy = et0_penman_monteith(&PenmanMonteithInput {
            wind_speed_ms: 8.0,
            ..uccle_july()
        })
        .unwrap();
        let humid = et0_penman_monteith(&PenmanMonteithInput {
            humidity: 98.0,
            ..uccle_july()
        })
        .unwrap();
        assert!(windy > base);
        assert!(humid < base);
    }

    #[test]
    fn test_penman_monteith_estimates_missing_radiation() {
        let estimated = et0_penman_monteith(&PenmanMonteithInput {
            solar_radiation_mj: None,
            ..uccle_july()
        })
        .unwrap();
        assert!(estimated > 3.0 && estimated < 4.5, "got {estimated}");
        assert!(et0_penman_monteith(&PenmanMonteithInput {
            t_max_c: 10.0,
            ..uccle_july()
        })
        .is_none());
    }

    #[test]
    fn test_standard_pressure_at_sea_level() {
        assert!((standard_pressure_kpa(0.0) - 101.3).abs() < 1e-9);
        assert!((standard_pressure_kpa(1800.0) - 81.8).abs() < 0.1);
    }

    #[test]
    fn test_hourly_share_outside_day_is_zero() {
        assert_eq!(et0_hourly_share(5.0, 3), 0.0);
        assert!(et0_hourly_share(5.0, 12) > et0_hourly_share(5.0, 7));
    }
}
