use async_trait::async_trait;

use crate::{core::series::PriceSeries, prelude::*};

/// Source of today's hourly prices for the configured zone.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_today(&self) -> Result<PriceSeries>;
}

/// Source of the one weather fact the scheduler cares about.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Whether today's mean temperature falls below the configured threshold.
    async fn is_cold_today(&self) -> Result<bool>;
}
