use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::model::{Coordinates, CurrentConditions, ForecastEntry, ForecastResponse};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at another host, e.g. a mock server.
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "OpenWeather {what} request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse OpenWeather {what} JSON"))
    }

    fn metric_query(at: Coordinates) -> [(&'static str, String); 3] {
        [
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("units", "metric".to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: Option<i64>,
    #[serde(default)]
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    timezone: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
    city: Option<OwCity>,
}

#[derive(Debug, Deserialize)]
struct OwGeoHit {
    lat: f64,
    lon: f64,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, at: Coordinates) -> Result<CurrentConditions> {
        let parsed: OwCurrentResponse = self
            .get_json("/data/2.5/weather", &Self::metric_query(at), "current weather")
            .await?;

        let weather = parsed.weather.into_iter().next();
        let observed_at = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        Ok(CurrentConditions {
            code: weather.as_ref().and_then(|w| w.id),
            description: weather.as_ref().map(|w| w.description.clone()).unwrap_or_default(),
            icon: weather.and_then(|w| w.icon),
            temp: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            pressure: parsed.main.pressure,
            humidity: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            wind_deg: parsed.wind.deg,
            observed_at,
        })
    }

    async fn forecast(&self, at: Coordinates) -> Result<ForecastResponse> {
        let parsed: OwForecastResponse = self
            .get_json("/data/2.5/forecast", &Self::metric_query(at), "forecast")
            .await?;

        let entries = parsed
            .list
            .into_iter()
            .filter_map(|entry| {
                let time = unix_to_utc(entry.dt)?;
                let weather = entry.weather.into_iter().next();
                Some(ForecastEntry {
                    time,
                    temp: entry.main.temp,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    pop: entry.pop,
                    icon: weather.as_ref().and_then(|w| w.icon.clone()),
                    description: weather.map(|w| w.description).unwrap_or_default(),
                })
            })
            .collect();

        Ok(ForecastResponse {
            timezone_offset: parsed.city.and_then(|c| c.timezone),
            entries,
        })
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let hits: Vec<OwGeoHit> = self
            .get_json(
                "/geo/1.0/direct",
                &[("q", query.to_string()), ("limit", "1".to_string())],
                "geocoding",
            )
            .await?;

        Ok(hits
            .into_iter()
            .next()
            .map(|hit| Coordinates { lat: hit.lat, lon: hit.lon }))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
