//! `ws-core` - derived metrics engine for personal weather stations
//!
//! Raw sensor readings go in, one immutable [`DerivedSnapshot`] per station
//! comes out every tick: psychrometrics, barometric trend and Zambretti
//! forecast, filtered rain rate, smoothed wind, condition, alerts, astronomy
//! and activity scores, optionally blended with an external forecast.

pub mod activity;
pub mod agro;
pub mod alerts;
pub mod astro;
pub mod config;
pub mod descriptors;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod pressure;
pub mod psychro;
pub mod quality;
pub mod rain;
pub mod registry;
pub mod rolling;
pub mod weather;
pub mod wind;

// Re-export core types for public API
pub use config::{StationConfig, WsCoreConfig};
pub use descriptors::{render, OutputValue, RenderedOutput, SensorDescriptor};
pub use engine::{StateSeed, StationEngine};
pub use error::WsCoreError;
pub use models::{DerivedSnapshot, ExternalForecast, Location, MetricKind, RawReading};
pub use registry::{ResetTarget, StationHandle, StationRegistry, TickOutcome};
pub use weather::{ForecastCache, ForecastProvider, OpenMeteoClient, RefreshOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WsCoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
