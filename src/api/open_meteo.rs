//! [Open-Meteo](https://open-meteo.com/en/docs) forecast client, reduced to
//! the single question the scheduler asks: is today a cold day?

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    api::{client, provider::WeatherProvider},
    config::{TemperatureKind, WeatherSettings},
    prelude::*,
};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

pub struct Api {
    client: Client,
    settings: WeatherSettings,
}

impl Api {
    pub fn try_new(settings: &WeatherSettings) -> Result<Self> {
        Ok(Self { client: client::try_new()?, settings: settings.clone() })
    }
}

#[async_trait]
impl WeatherProvider for Api {
    #[instrument(skip_all)]
    async fn is_cold_today(&self) -> Result<bool> {
        let temperature = &self.settings.temperature;
        let query = [
            ("latitude", self.settings.coordinates.latitude.to_string()),
            ("longitude", self.settings.coordinates.longitude.to_string()),
            ("hourly", temperature.kind.forecast_variable().to_string()),
            ("temperature_unit", temperature.unit.query_value().to_string()),
            ("forecast_days", "1".to_string()),
        ];
        let forecast = self
            .client
            .get(FORECAST_URL)
            .query(&query)
            .send()
            .await
            .context("failed to call the forecast API")?
            .error_for_status()
            .context("the forecast request failed")?
            .json::<Forecast>()
            .await
            .context("failed to deserialize the forecast response")?;

        let temperatures = match temperature.kind {
            TemperatureKind::Real => forecast.hourly.temperature_2m,
            TemperatureKind::Apparent => forecast.hourly.apparent_temperature,
        };
        ensure!(!temperatures.is_empty(), "the forecast contains no temperature points");

        #[allow(clippy::cast_precision_loss)]
        let mean = temperatures.iter().sum::<f64>() / temperatures.len() as f64;
        debug!(mean, threshold = temperature.threshold, "computed today's mean temperature");
        Ok(mean < temperature.threshold)
    }
}

#[derive(Deserialize)]
struct Forecast {
    hourly: Hourly,
}

/// Only the requested variable is present in the response; the other one
/// stays empty.
#[derive(Deserialize)]
struct Hourly {
    #[serde(default)]
    temperature_2m: Vec<f64>,

    #[serde(default)]
    apparent_temperature: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Coordinates, TemperatureSettings, TemperatureUnit};
    use crate::retry::RetryPolicy;

    #[test]
    fn deserializes_only_the_requested_variable() {
        let forecast: Forecast = serde_json::from_str(
            r#"{"hourly": {"apparent_temperature": [10.2, 11.9, 13.0]}}"#,
        )
        .unwrap();
        assert!(forecast.hourly.temperature_2m.is_empty());
        assert_eq!(forecast.hourly.apparent_temperature, vec![10.2, 11.9, 13.0]);
    }

    #[tokio::test]
    #[ignore = "online test"]
    async fn test_is_cold_today_ok() -> Result {
        let settings = WeatherSettings {
            coordinates: Coordinates { latitude: 28.0930, longitude: -16.6357 },
            temperature: TemperatureSettings {
                kind: TemperatureKind::Apparent,
                unit: TemperatureUnit::Celsius,
                threshold: 18.0,
            },
            retry: RetryPolicy::default(),
        };
        Api::try_new(&settings)?.is_cold_today().await?;
        Ok(())
    }
}
