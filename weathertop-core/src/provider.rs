use crate::{
    Config,
    model::{Coordinates, CurrentConditions, ForecastResponse},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Source of live weather data for station coordinates.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, at: Coordinates) -> anyhow::Result<CurrentConditions>;

    /// 3-hourly forecast for the next few days.
    async fn forecast(&self, at: Coordinates) -> anyhow::Result<ForecastResponse>;

    /// Best match for a place name, if any.
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<Coordinates>>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for OpenWeather.\n\
                 Hint: run `weathertop configure` or set {}.",
            Config::API_KEY_ENV
        )
    })?;

    let provider = OpenWeatherProvider::new(api_key.to_owned())?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No API key configured for OpenWeather"));
        assert!(msg.contains("OPENWEATHER_KEY"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
