//! Last-known-good forecast with refresh scheduling
//!
//! A refresh is a no-op unless due. Only one fetch runs at a time; a refresh
//! that times out, fails or is dropped mid-flight leaves the cached forecast
//! untouched. Consecutive failures back off exponentially with jitter.

use super::ForecastProvider;
use crate::config::ForecastConfig;
use crate::models::{ExternalForecast, Location};
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{info, instrument, warn};

const JITTER: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub interval: TimeDelta,
    pub timeout: Duration,
    pub min_retry: TimeDelta,
    pub max_retry: TimeDelta,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl RefreshPolicy {
    #[must_use]
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            interval: TimeDelta::minutes(config.interval_minutes.into()),
            timeout: Duration::from_secs(config.timeout_seconds.into()),
            min_retry: TimeDelta::seconds(config.min_retry_seconds.into()),
            max_retry: TimeDelta::seconds(config.max_retry_seconds.into()),
        }
    }

    /// Un-jittered wait after `failures` consecutive failures (at least one)
    #[must_use]
    pub fn backoff(&self, failures: u32) -> TimeDelta {
        let doublings = failures.saturating_sub(1).min(16);
        let seconds = self.min_retry.num_seconds().saturating_mul(1 << doublings);
        TimeDelta::seconds(seconds).min(self.max_retry)
    }
}

fn jittered(delay: TimeDelta) -> TimeDelta {
    let factor = rand::rng().random_range((1.0 - JITTER)..(1.0 + JITTER));
    TimeDelta::milliseconds((delay.num_milliseconds() as f64 * factor) as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    NotDue,
    /// Another refresh of this cache is still running
    InFlight,
    Failed,
    TimedOut,
}

#[derive(Debug, Default)]
struct CacheState {
    forecast: Option<Arc<ExternalForecast>>,
    next_due: Option<DateTime<Utc>>,
    failures: u32,
    last_error: Option<String>,
}

/// Clears the in-flight flag however the refresh ends, including when the
/// refresh future is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ForecastCache {
    provider: Arc<dyn ForecastProvider>,
    location: Location,
    policy: RefreshPolicy,
    in_flight: AtomicBool,
    state: RwLock<CacheState>,
}

impl ForecastCache {
    #[must_use]
    pub fn new(provider: Arc<dyn ForecastProvider>, location: Location, policy: RefreshPolicy) -> Self {
        Self {
            provider,
            location,
            policy,
            in_flight: AtomicBool::new(false),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Last successfully fetched forecast, if any
    #[must_use]
    pub fn current(&self) -> Option<Arc<ExternalForecast>> {
        self.read().forecast.clone()
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.read().next_due.is_none_or(|due| now >= due)
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.read().failures
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Fetch a new forecast when one is due
    #[instrument(
        name = "forecast_refresh",
        level = "debug",
        skip(self),
        fields(provider = self.provider.name())
    )]
    pub async fn refresh(&self, now: DateTime<Utc>) -> RefreshOutcome {
        if !self.is_due(now) {
            return RefreshOutcome::NotDue;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return RefreshOutcome::InFlight;
        };

        let fetched =
            tokio::time::timeout(self.policy.timeout, self.provider.fetch_forecast(self.location))
                .await;

        match fetched {
            Ok(Ok(forecast)) => {
                let mut state = self.write();
                info!(
                    daily = forecast.daily.len(),
                    hourly = forecast.hourly.len(),
                    "Forecast updated"
                );
                state.forecast = Some(Arc::new(forecast));
                state.failures = 0;
                state.last_error = None;
                state.next_due = Some(now + self.policy.interval);
                RefreshOutcome::Updated
            }
            Ok(Err(e)) => {
                self.record_failure(now, format!("{e:#}"));
                RefreshOutcome::Failed
            }
            Err(_) => {
                self.record_failure(
                    now,
                    format!("timed out after {}s", self.policy.timeout.as_secs()),
                );
                RefreshOutcome::TimedOut
            }
        }
    }

    fn record_failure(&self, now: DateTime<Utc>, error: String) {
        let mut state = self.write();
        state.failures = state.failures.saturating_add(1);
        let delay = jittered(self.policy.backoff(state.failures));
        warn!(
            failures = state.failures,
            retry_in_s = delay.num_seconds(),
            error = %error,
            "Forecast refresh failed, keeping last good forecast"
        );
        state.next_due = Some(now + delay);
        state.last_error = Some(error);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 300)]
    #[case(2, 600)]
    #[case(3, 1200)]
    #[case(4, 2400)]
    #[case(5, 3600)]
    #[case(40, 3600)]
    fn test_backoff_doubles_up_to_cap(#[case] failures: u32, #[case] expected_s: i64) {
        let policy = RefreshPolicy::default();
        assert_eq!(policy.backoff(failures), TimeDelta::seconds(expected_s));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        for _ in 0..100 {
            let d = jittered(TimeDelta::seconds(300)).num_milliseconds();
            assert!((270_000..=330_000).contains(&d));
        }
    }

    #[test]
    fn test_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = InFlightGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
