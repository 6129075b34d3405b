//! Barometric forecast, rain likelihood and condition classification

pub mod condition;
pub mod rain_probability;
pub mod regions;
pub mod zambretti;

pub use condition::{classify, cloud_condition, Condition, ConditionInputs, Severity};
pub use rain_probability::{combined_rain_probability, local_rain_probability};
pub use regions::{ClimateRegion, Hemisphere, PressureProfile, WindPattern};
pub use zambretti::{zambretti, ZambrettiForecast, ZambrettiInput};
