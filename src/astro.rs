//! Sun and moon
//!
//! Sunrise/sunset come from the `sunrise` crate; moon illumination and age
//! use the truncated Meeus series (about 1 % accuracy on illumination).

use crate::models::Location;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::debug;

pub const SYNODIC_MONTH_DAYS: f64 = 29.530_588_67;
/// 2000-01-06 18:14 UTC
const REFERENCE_NEW_MOON_JD: f64 = 2_451_550.259;
const J2000_JD: f64 = 2_451_545.0;

/// Within this many minutes of sunrise/sunset the sky reads as that event
pub const SUN_EVENT_MINUTES: i64 = 45;
pub const GOLDEN_HOUR_MINUTES: i64 = 90;

/// Julian Day at 0h UT of a Gregorian date
#[must_use]
pub fn julian_day(date: NaiveDate) -> f64 {
    let (mut y, mut m) = (date.year(), date.month() as i32);
    if m <= 2 {
        y -= 1;
        m += 12;
    }
    let a = y.div_euclid(100);
    let b = 2 - a + a.div_euclid(4);
    (365.25 * f64::from(y + 4716)).floor() + (30.6001 * f64::from(m + 1)).floor()
        + f64::from(date.day())
        + f64::from(b)
        - 1524.5
}

/// Illuminated fraction of the disk (0..=1) at noon UT
#[must_use]
pub fn moon_illumination(date: NaiveDate) -> f64 {
    let jd = julian_day(date) + 0.5;
    let t = (jd - J2000_JD) / 36_525.0;

    let sun_mean_lon = 280.466_46 + 36_000.769_83 * t;
    let sun_anomaly = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).to_radians();
    let sun_centre = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * sun_anomaly.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * sun_anomaly).sin()
        + 0.000_289 * (3.0 * sun_anomaly).sin();
    let sun_lon = sun_mean_lon + sun_centre;

    let moon_mean_lon = 218.316_5 + 481_267.881_3 * t;
    let moon_anomaly = (134.963_4 + 477_198.867_6 * t).to_radians();
    let moon_latitude_arg = (93.272_1 + 483_202.017_5 * t).to_radians();
    let l = moon_mean_lon.to_radians();

    let moon_lon = moon_mean_lon + 6.288_6 * moon_anomaly.sin()
        + 1.274_0 * (2.0 * l - moon_anomaly).sin()
        + 0.658_3 * (2.0 * l).sin()
        + 0.213_6 * (2.0 * moon_anomaly).sin()
        - 0.185_1 * sun_anomaly.sin()
        - 0.114_3 * (2.0 * moon_latitude_arg).sin();

    let elongation = (moon_lon - sun_lon).rem_euclid(360.0).to_radians();
    ((1.0 - elongation.cos()) / 2.0).clamp(0.0, 1.0)
}

/// Days since the last new moon
#[must_use]
pub fn moon_age_days(date: NaiveDate) -> f64 {
    (julian_day(date) + 0.5 - REFERENCE_NEW_MOON_JD).rem_euclid(SYNODIC_MONTH_DAYS)
}

/// Days until the synodic age next reaches `target_age` (0 = new moon)
#[must_use]
pub fn days_until_moon_age(age_days: f64, target_age: f64) -> f64 {
    let days = (target_age - age_days).rem_euclid(SYNODIC_MONTH_DAYS);
    if days >= SYNODIC_MONTH_DAYS { 0.0 } else { days }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    #[must_use]
    pub fn from_age(age_days: f64) -> Self {
        let pct = age_days / SYNODIC_MONTH_DAYS;
        match pct {
            p if !(0.035..0.965).contains(&p) => MoonPhase::NewMoon,
            p if p < 0.215 => MoonPhase::WaxingCrescent,
            p if p < 0.285 => MoonPhase::FirstQuarter,
            p if p < 0.465 => MoonPhase::WaxingGibbous,
            p if p < 0.535 => MoonPhase::FullMoon,
            p if p < 0.715 => MoonPhase::WaningGibbous,
            p if p < 0.785 => MoonPhase::LastQuarter,
            _ => MoonPhase::WaningCrescent,
        }
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonInfo {
    pub phase: MoonPhase,
    /// Percent of the disk lit
    pub illumination_pct: f64,
    pub age_days: f64,
    pub days_to_new_moon: f64,
    pub days_to_full_moon: f64,
}

#[must_use]
pub fn moon_info(date: NaiveDate) -> MoonInfo {
    let age_days = moon_age_days(date);
    MoonInfo {
        phase: MoonPhase::from_age(age_days),
        illumination_pct: moon_illumination(date) * 100.0,
        age_days,
        days_to_new_moon: days_until_moon_age(age_days, 0.0),
        days_to_full_moon: days_until_moon_age(age_days, SYNODIC_MONTH_DAYS / 2.0),
    }
}

/// Position of `now` relative to sunrise/sunset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunEvent {
    Sunrise,
    Sunset,
    GoldenHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Daylight {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// Times are the 06:00/20:00 local fallback, not a solar calculation
    pub estimated: bool,
}

fn local_to_utc(tz: Tz, date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(hour));
    tz.from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}

impl Daylight {
    /// Sunrise and sunset for a local calendar date. Without coordinates, or
    /// during polar day/night, falls back to 06:00-20:00 local time.
    #[must_use]
    pub fn for_date(location: Option<&Location>, date: NaiveDate, tz: Tz) -> Self {
        let solar = location
            .and_then(|loc| Coordinates::new(loc.latitude, loc.longitude))
            .and_then(|coordinates| {
                let day = SolarDay::new(coordinates, date);
                Some((
                    day.event_time(SolarEvent::Sunrise)?,
                    day.event_time(SolarEvent::Sunset)?,
                ))
            });

        match solar {
            Some((sunrise, sunset)) => Self {
                sunrise,
                sunset,
                estimated: false,
            },
            None => {
                debug!(%date, "No solar times available, using fixed daylight window");
                Self {
                    sunrise: local_to_utc(tz, date, 6),
                    sunset: local_to_utc(tz, date, 20),
                    estimated: true,
                }
            }
        }
    }

    #[must_use]
    pub fn is_day(&self, now: DateTime<Utc>) -> bool {
        now >= self.sunrise && now < self.sunset
    }

    #[must_use]
    pub fn sun_event(&self, now: DateTime<Utc>) -> Option<SunEvent> {
        let from_sunrise = (now - self.sunrise).num_minutes().abs();
        let from_sunset = (now - self.sunset).num_minutes().abs();
        if from_sunrise <= SUN_EVENT_MINUTES {
            Some(SunEvent::Sunrise)
        } else if from_sunset <= SUN_EVENT_MINUTES {
            Some(SunEvent::Sunset)
        } else if from_sunrise <= GOLDEN_HOUR_MINUTES || from_sunset <= GOLDEN_HOUR_MINUTES {
            Some(SunEvent::GoldenHour)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_julian_day_j2000() {
        assert_eq!(julian_day(date(2000, 1, 1)), 2_451_544.5);
    }

    #[test]
    fn test_known_full_moon() {
        // Full moon on 2024-04-23
        let info = moon_info(date(2024, 4, 23));
        assert!(info.illumination_pct > 95.0, "{}", info.illumination_pct);
        assert_eq!(info.phase, MoonPhase::FullMoon);
        // next new moon on 2024-05-08
        assert!((info.days_to_new_moon - 15.0).abs() < 1.5, "{}", info.days_to_new_moon);
    }

    #[test]
    fn test_known_new_moon() {
        // New moon on 2024-04-08 (the total eclipse)
        let info = moon_info(date(2024, 4, 8));
        assert!(info.illumination_pct < 5.0, "{}", info.illumination_pct);
        assert_eq!(info.phase, MoonPhase::NewMoon);
        assert!((info.days_to_full_moon - 15.0).abs() < 1.5, "{}", info.days_to_full_moon);
    }

    #[rstest]
    #[case(0.0, 0.0, 0.0)]
    #[case(10.0, 0.0, SYNODIC_MONTH_DAYS - 10.0)]
    #[case(10.0, 14.765, 4.765)]
    #[case(20.0, 14.765, SYNODIC_MONTH_DAYS - 5.235)]
    fn test_days_until_moon_age(#[case] age: f64, #[case] target: f64, #[case] expected: f64) {
        let days = days_until_moon_age(age, target);
        assert!((days - expected).abs() < 1e-9, "{days}");
        assert!((0.0..SYNODIC_MONTH_DAYS).contains(&days));
    }

    #[rstest]
    #[case(0.5, MoonPhase::NewMoon)]
    #[case(4.0, MoonPhase::WaxingCrescent)]
    #[case(7.4, MoonPhase::FirstQuarter)]
    #[case(14.8, MoonPhase::FullMoon)]
    #[case(22.1, MoonPhase::LastQuarter)]
    #[case(29.0, MoonPhase::NewMoon)]
    fn test_phase_from_age(#[case] age: f64, #[case] expected: MoonPhase) {
        assert_eq!(MoonPhase::from_age(age), expected);
    }

    #[test]
    fn test_fallback_daylight_without_location() {
        let daylight = Daylight::for_date(None, date(2026, 6, 1), chrono_tz::UTC);
        assert!(daylight.estimated);
        assert_eq!(daylight.sunrise, Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap());
        assert!(daylight.is_day(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()));
        assert!(!daylight.is_day(Utc.with_ymd_and_hms(2026, 6, 1, 21, 0, 0).unwrap()));
    }

    #[test]
    fn test_solar_daylight_for_location() {
        let london = Location::new(51.5, -0.12);
        let daylight = Daylight::for_date(Some(&london), date(2026, 6, 21), chrono_tz::Europe::London);
        assert!(!daylight.estimated);
        // midsummer sunrise is just before 04:00 UTC
        assert_eq!(daylight.sunrise.date_naive(), date(2026, 6, 21));
        assert!(daylight.sunset - daylight.sunrise > TimeDelta::hours(16));
    }

    #[test]
    fn test_sun_event_windows() {
        let daylight = Daylight::for_date(None, date(2026, 6, 1), chrono_tz::UTC);
        let at = |h, m| Utc.with_ymd_and_hms(2026, 6, 1, h, m, 0).unwrap();
        assert_eq!(daylight.sun_event(at(6, 30)), Some(SunEvent::Sunrise));
        assert_eq!(daylight.sun_event(at(7, 15)), Some(SunEvent::GoldenHour));
        assert_eq!(daylight.sun_event(at(19, 40)), Some(SunEvent::Sunset));
        assert_eq!(daylight.sun_event(at(12, 0)), None);
    }
}
