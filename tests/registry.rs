//! Multi-station behaviour of the registry

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::sync::Arc;
use std::thread;
use ws_core::config::{StationConfig, WsCoreConfig};
use ws_core::models::{MetricKind, RawReading};
use ws_core::{ResetTarget, StationEngine, StationRegistry, TickOutcome, WsCoreError};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 3, 14, 0, 0).unwrap() + TimeDelta::minutes(minutes)
}

fn rain(total: f64, when: DateTime<Utc>) -> Vec<RawReading> {
    vec![
        RawReading::new(MetricKind::Temperature, 9.0, None, when),
        RawReading::new(MetricKind::Humidity, 92.0, None, when),
        RawReading::new(MetricKind::RainTotal, total, Some("mm"), when),
    ]
}

fn registry(ids: &[&str]) -> StationRegistry {
    let config = WsCoreConfig {
        stations: ids.iter().map(|id| StationConfig::new(*id)).collect(),
        ..WsCoreConfig::default()
    };
    StationRegistry::from_config(&config, None).unwrap()
}

fn since_baseline(outcome: TickOutcome) -> Option<f64> {
    match outcome {
        TickOutcome::Completed(snapshot) => snapshot.rain.as_ref()?.since_baseline_mm,
        TickOutcome::Skipped => None,
    }
}

#[test]
fn test_stations_without_location_get_no_forecast() {
    let registry = registry(&["north", "south"]);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["north", "south"]);
    assert!(registry.get("north").unwrap().forecast().is_none());
}

#[test]
fn test_duplicate_registration_fails() {
    let mut registry = registry(&["north"]);
    let engine = StationEngine::new(StationConfig::new("north")).unwrap();
    assert!(matches!(
        registry.register(engine, None),
        Err(WsCoreError::Config { .. })
    ));
}

#[test]
fn test_unknown_station_is_a_validation_error() {
    let registry = registry(&["north"]);
    assert!(matches!(
        registry.try_tick("west", &[], at(0)),
        Err(WsCoreError::Validation { .. })
    ));
    assert!(registry
        .reset_rain_baseline(&ResetTarget::Station("west".to_string()))
        .is_err());
}

#[test]
fn test_reset_targets_one_station() {
    let registry = registry(&["north", "south"]);
    for id in ["north", "south"] {
        registry.try_tick(id, &rain(10.0, at(0)), at(0)).unwrap();
        registry.try_tick(id, &rain(12.5, at(10)), at(10)).unwrap();
    }

    let reset = registry
        .reset_rain_baseline(&ResetTarget::Station("north".to_string()))
        .unwrap();
    assert_eq!(reset, 1);

    let north = registry.try_tick("north", &rain(12.5, at(20)), at(20)).unwrap();
    let south = registry.try_tick("south", &rain(12.5, at(20)), at(20)).unwrap();
    assert_eq!(since_baseline(north), Some(0.0));
    assert_eq!(since_baseline(south), Some(2.5));
}

#[test]
fn test_reset_all_stations() {
    let registry = registry(&["a", "b", "c"]);
    for id in ["a", "b", "c"] {
        registry.try_tick(id, &rain(1.0, at(0)), at(0)).unwrap();
        registry.try_tick(id, &rain(4.0, at(10)), at(10)).unwrap();
    }

    assert_eq!(registry.reset_rain_baseline(&ResetTarget::All).unwrap(), 3);
    for id in ["a", "b", "c"] {
        let outcome = registry.try_tick(id, &rain(4.0, at(20)), at(20)).unwrap();
        assert_eq!(since_baseline(outcome), Some(0.0));
    }
}

#[test]
fn test_reconfigure_through_registry() {
    let registry = registry(&["north"]);
    registry.try_tick("north", &rain(1.0, at(0)), at(0)).unwrap();

    let mut config = StationConfig::new("north");
    config.features.fire_risk = true;
    registry.reconfigure(config).unwrap();

    let handle = registry.get("north").unwrap();
    assert_eq!(handle.export_state().rain.last_total, Some(1.0));
    match handle.try_tick(&rain(1.0, at(10)), at(10)) {
        TickOutcome::Completed(snapshot) => assert!(snapshot.activities.fire_risk.is_some()),
        TickOutcome::Skipped => panic!("nothing else was ticking"),
    }

    assert!(registry.reconfigure(StationConfig::new("nowhere")).is_err());
}

#[test]
fn test_stations_tick_in_parallel() {
    let registry = Arc::new(registry(&["a", "b", "c", "d"]));
    let workers: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..20 {
                    let when = at(i);
                    registry.try_tick(id, &rain(i as f64, when), when).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for id in ["a", "b", "c", "d"] {
        let latest = registry.get(id).unwrap().latest().unwrap();
        assert_eq!(latest.station_id, id);
        assert_eq!(latest.computed_at, at(19));
    }
}
