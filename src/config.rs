//! Settings are read once at startup from a TOML file and stay immutable for
//! the process lifetime. Integration and weather sections are plain
//! [`Option`]s: absence of the section means the feature is off, there are no
//! enabled flags and no guessing from empty fields.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    api::apaga_luz::PriceZone, core::weather::DevicePolarity, prelude::*, retry::RetryPolicy,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("device.active_hours must be between 1 and 24, got {0}")]
    ActiveHoursOutOfRange(u32),

    #[error("weather.temperature.threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("weather.coordinates must be within -90..90 latitude and -180..180 longitude")]
    CoordinatesOutOfRange,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Instance name, reported in webhook payloads.
    #[serde(default = "Settings::default_name")]
    pub name: String,

    /// Drop today's already-passed hour slots before planning.
    #[serde(default)]
    pub ignore_passed_hours: bool,

    pub device: DeviceSettings,
    pub price: PriceSettings,
    pub weather: Option<WeatherSettings>,
}

impl Settings {
    fn default_name() -> String {
        "caldera".to_string()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read the config file {path:?}"))?;
        let settings: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse the config file {path:?}"))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Eager validation: a broken config aborts startup, it never surfaces
    /// halfway through a scheduling cycle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=24).contains(&self.device.active_hours) {
            return Err(ConfigError::ActiveHoursOutOfRange(self.device.active_hours));
        }
        if let Some(weather) = &self.weather {
            if !weather.temperature.threshold.is_finite() {
                return Err(ConfigError::NonFiniteThreshold);
            }
            let coordinates = &weather.coordinates;
            if !(-90.0..=90.0).contains(&coordinates.latitude)
                || !(-180.0..=180.0).contains(&coordinates.longitude)
            {
                return Err(ConfigError::CoordinatesOutOfRange);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSettings {
    pub polarity: DevicePolarity,

    /// How many hours per day the device should be powered.
    pub active_hours: u32,

    pub smart_plug: Option<SmartPlugSettings>,
    pub webhook: Option<WebhookSettings>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmartPlugSettings {
    /// Base URL of the plug, for example `http://192.168.1.40`.
    pub url: String,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSettings {
    pub url: String,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceSettings {
    pub zone: PriceZone,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherSettings {
    pub coordinates: Coordinates,
    pub temperature: TemperatureSettings,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemperatureSettings {
    #[serde(default)]
    pub kind: TemperatureKind,

    #[serde(default)]
    pub unit: TemperatureUnit,

    /// A day whose mean temperature is below this is a cold day.
    pub threshold: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureKind {
    /// Feels-like temperature.
    #[default]
    Apparent,
    Real,
}

impl TemperatureKind {
    pub const fn forecast_variable(self) -> &'static str {
        match self {
            Self::Apparent => "apparent_temperature",
            Self::Real => "temperature_2m",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub const fn query_value(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }
}
