//! External multi-day forecast: provider seam, Open-Meteo client and the
//! per-station refresh cache feeding read-only forecasts into ticks.

use crate::models::{ExternalForecast, Location};
use anyhow::Result;
use async_trait::async_trait;

pub mod cache;
pub mod open_meteo;

pub use cache::{ForecastCache, RefreshOutcome, RefreshPolicy};
pub use open_meteo::OpenMeteoClient;

/// Source of external forecasts
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Short provider name, recorded on every forecast
    fn name(&self) -> &str;

    async fn fetch_forecast(&self, location: Location) -> Result<ExternalForecast>;
}
