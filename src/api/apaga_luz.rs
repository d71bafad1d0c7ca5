//! [ApagaLuz](https://apaga-luz.com/) PVPC price feed client.
//!
//! The feed republishes the official ESIOS day-ahead prices as a static JSON
//! file per zone, refreshed daily. Prices are €/MWh, days are dd/mm/yyyy.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Deserializer, de};

use crate::{
    api::{client, provider::PriceProvider},
    core::series::{HourRate, HourSample, PriceSeries},
    prelude::*,
};

const MAINLAND_FEED_URL: &str =
    "https://raw.githubusercontent.com/jorgeatgu/apaga-luz/main/public/data/today_price.json";
const CANARY_FEED_URL: &str =
    "https://raw.githubusercontent.com/jorgeatgu/apaga-luz/main/public/data/canary_price.json";

/// PVPC pricing zone. The Canary Islands publish their own curve.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceZone {
    Mainland,
    CanaryIslands,
}

impl PriceZone {
    const fn feed_url(self) -> &'static str {
        match self {
            Self::Mainland => MAINLAND_FEED_URL,
            Self::CanaryIslands => CANARY_FEED_URL,
        }
    }
}

pub struct Api {
    client: Client,
    zone: PriceZone,
}

impl Api {
    pub fn try_new(zone: PriceZone) -> Result<Self> {
        Ok(Self { client: client::try_new()?, zone })
    }
}

#[async_trait]
impl PriceProvider for Api {
    #[instrument(skip_all, fields(zone = ?self.zone))]
    async fn fetch_today(&self) -> Result<PriceSeries> {
        let entries = self
            .client
            .get(self.zone.feed_url())
            .send()
            .await
            .context("failed to call the price feed")?
            .error_for_status()
            .context("the price feed request failed")?
            .json::<Vec<HourlyPrice>>()
            .await
            .context("failed to deserialize the price feed response")?;
        info!(n_entries = entries.len(), "fetched today's prices");

        let samples = entries
            .into_iter()
            .map(|entry| HourSample {
                day: entry.day,
                hour: entry.hour,
                price: entry.price,
                zone: entry.zone,
            })
            .collect();
        PriceSeries::try_new(samples).context("the price feed returned a malformed series")
    }
}

#[derive(Deserialize)]
struct HourlyPrice {
    #[serde(deserialize_with = "HourlyPrice::deserialize_day")]
    day: NaiveDate,

    hour: u32,

    /// €/MWh.
    price: HourRate,

    zone: String,
}

impl HourlyPrice {
    fn deserialize_day<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let day = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&day, "%d/%m/%Y")
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&day), &"a dd/mm/yyyy date"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_feed_entry() {
        let entries: Vec<HourlyPrice> = serde_json::from_str(
            r#"[
                {"day": "15/06/2024", "hour": 0, "price": 107.52, "zone": "PENINSULA"},
                {"day": "15/06/2024", "hour": 1, "price": 96.3, "zone": "PENINSULA"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].day, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(entries[0].hour, 0);
        assert_eq!(entries[0].price, HourRate(107.52));
        assert_eq!(entries[1].zone, "PENINSULA");
    }

    #[test]
    fn rejects_a_bad_day_format() {
        let result: Result<HourlyPrice, _> = serde_json::from_str(
            r#"{"day": "2024-06-15", "hour": 0, "price": 107.52, "zone": "PENINSULA"}"#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "online test"]
    async fn test_fetch_today_ok() -> Result {
        let series = Api::try_new(PriceZone::Mainland)?.fetch_today().await?;
        assert!(series.len() <= 24);
        Ok(())
    }
}
