//! Data models shared across the engine
//!
//! - Reading: raw sensor input and its normalized, canonical-unit form
//! - Forecast: the external multi-day forecast payload and daily tiles
//! - Snapshot: the immutable per-tick output
//! - Location: station coordinates

pub mod forecast;
pub mod location;
pub mod reading;
pub mod snapshot;

pub use forecast::{
    weather_code_to_description, DailyForecast, ExternalForecast, ForecastTile, HourlyForecast,
};
pub use location::Location;
pub use reading::{Measurement, MetricKind, NormalizedReadings, RawReading};
pub use snapshot::{
    ActivityScores, ConditionOutputs, DerivedSnapshot, Evapotranspiration, ForecastOutputs,
    PressureOutputs, Psychrometrics, RainOutputs, UvOutputs, WindOutputs,
};
