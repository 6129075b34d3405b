//! Station instances and the operations that span them
//!
//! Each station is an independent [`StationHandle`]. Ticks on one handle are
//! serialized by its engine mutex: a tick that finds the engine busy is
//! skipped, never queued.

use crate::config::{StationConfig, WsCoreConfig};
use crate::engine::{StateSeed, StationEngine};
use crate::models::{DerivedSnapshot, RawReading};
use crate::weather::{ForecastCache, ForecastProvider, RefreshOutcome, RefreshPolicy};
use crate::{Result, WsCoreError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use tracing::{info, warn};

/// Which stations a baseline reset applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTarget {
    Station(String),
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed(Arc<DerivedSnapshot>),
    /// The previous tick on this station was still running
    Skipped,
}

pub struct StationHandle {
    id: String,
    engine: Mutex<StationEngine>,
    forecast: Option<Arc<ForecastCache>>,
    latest: RwLock<Option<Arc<DerivedSnapshot>>>,
}

impl StationHandle {
    #[must_use]
    pub fn new(engine: StationEngine, forecast: Option<Arc<ForecastCache>>) -> Self {
        Self {
            id: engine.id().to_string(),
            engine: Mutex::new(engine),
            forecast,
            latest: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn forecast(&self) -> Option<&Arc<ForecastCache>> {
        self.forecast.as_ref()
    }

    /// Snapshot of the most recent completed tick
    #[must_use]
    pub fn latest(&self) -> Option<Arc<DerivedSnapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a tick with the cached forecast, unless one is already running
    pub fn try_tick(&self, raw: &[RawReading], now: DateTime<Utc>) -> TickOutcome {
        let mut engine = match self.engine.try_lock() {
            Ok(engine) => engine,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!(station = %self.id, "Previous tick still running, skipping");
                return TickOutcome::Skipped;
            }
        };

        let forecast = self.forecast.as_ref().and_then(|cache| cache.current());
        let snapshot = Arc::new(engine.tick(raw, now, forecast.as_deref()));
        drop(engine);

        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        TickOutcome::Completed(snapshot)
    }

    /// Waits for a running tick to finish
    #[must_use]
    pub fn export_state(&self) -> StateSeed {
        self.lock_engine().export_state()
    }

    pub fn reconfigure(&self, config: StationConfig) -> Result<()> {
        if config.id != self.id {
            return Err(WsCoreError::config(format!(
                "Cannot reconfigure station '{}' with config for '{}'",
                self.id, config.id
            )));
        }
        self.lock_engine().reconfigure(config)
    }

    fn lock_engine(&self) -> MutexGuard<'_, StationEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct StationRegistry {
    stations: BTreeMap<String, Arc<StationHandle>>,
}

impl StationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One handle per configured station. Stations with coordinates get a
    /// forecast cache when forecasting is enabled and a provider is given.
    pub fn from_config(
        config: &WsCoreConfig,
        provider: Option<Arc<dyn ForecastProvider>>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        let policy = RefreshPolicy::from_config(&config.forecast);

        for station in &config.stations {
            let cache = match (&provider, station.location) {
                (Some(provider), Some(location)) if config.forecast.enabled => Some(Arc::new(
                    ForecastCache::new(Arc::clone(provider), location, policy),
                )),
                _ => None,
            };
            registry.register(StationEngine::new(station.clone())?, cache)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        engine: StationEngine,
        forecast: Option<Arc<ForecastCache>>,
    ) -> Result<Arc<StationHandle>> {
        let id = engine.id().to_string();
        if self.stations.contains_key(&id) {
            return Err(WsCoreError::config(format!("Duplicate station id '{id}'")));
        }
        let handle = Arc::new(StationHandle::new(engine, forecast));
        self.stations.insert(id.clone(), Arc::clone(&handle));
        info!(station = %id, forecast = handle.forecast.is_some(), "Station registered");
        Ok(handle)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<StationHandle>> {
        self.stations.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn try_tick(&self, id: &str, raw: &[RawReading], now: DateTime<Utc>) -> Result<TickOutcome> {
        Ok(self.handle(id)?.try_tick(raw, now))
    }

    pub fn reconfigure(&self, config: StationConfig) -> Result<()> {
        self.handle(&config.id)?.reconfigure(config)
    }

    /// Reset the rain baseline of the targeted stations.
    ///
    /// Every targeted engine is locked before any is reset, so no tick can
    /// observe a partially applied reset. Locks are taken in id order.
    pub fn reset_rain_baseline(&self, target: &ResetTarget) -> Result<usize> {
        let handles: Vec<Arc<StationHandle>> = match target {
            ResetTarget::Station(id) => vec![self.handle(id)?],
            ResetTarget::All => self.stations.values().cloned().collect(),
        };

        let mut engines: Vec<MutexGuard<'_, StationEngine>> =
            handles.iter().map(|h| h.lock_engine()).collect();
        for engine in &mut engines {
            engine.reset_rain_baseline();
        }
        info!(stations = engines.len(), "Rain baselines reset");
        Ok(engines.len())
    }

    /// Refresh every due forecast cache concurrently
    pub async fn refresh_forecasts(&self, now: DateTime<Utc>) -> Vec<(String, RefreshOutcome)> {
        let refreshes = self.stations.values().filter_map(|handle| {
            let cache = Arc::clone(handle.forecast.as_ref()?);
            let id = handle.id.clone();
            Some(async move { (id, cache.refresh(now).await) })
        });
        join_all(refreshes).await
    }

    fn handle(&self, id: &str) -> Result<Arc<StationHandle>> {
        self.get(id)
            .ok_or_else(|| WsCoreError::validation(format!("Unknown station '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 2, 6, 30, 0).unwrap()
    }

    fn handle() -> StationHandle {
        StationHandle::new(StationEngine::new(StationConfig::new("roof")).unwrap(), None)
    }

    #[test]
    fn test_overlapping_tick_is_skipped() {
        let handle = handle();
        let raw = [RawReading::new(MetricKind::Temperature, 21.0, None, at())];

        let busy = handle.lock_engine();
        assert_eq!(handle.try_tick(&raw, at()), TickOutcome::Skipped);
        assert!(handle.latest().is_none());
        drop(busy);

        assert!(matches!(handle.try_tick(&raw, at()), TickOutcome::Completed(_)));
        assert_eq!(handle.latest().unwrap().computed_at, at());
    }

    #[test]
    fn test_reconfigure_rejects_foreign_id() {
        let handle = handle();
        let err = handle.reconfigure(StationConfig::new("cellar")).unwrap_err();
        assert!(matches!(err, WsCoreError::Config { .. }));
    }
}
