//! Account, station and report operations behind the dashboard.

use std::sync::Arc;

use serde::Serialize;

use crate::classify::ms_to_kmh;
use crate::forecast::{self, CurrentView, ForecastView};
use crate::model::{
    Coordinates, NewReport, NewStation, NewUser, Station, User, UserUpdate, WeatherReport,
};
use crate::provider::WeatherProvider;
use crate::store::{Database, ReportStore, StationStore, StoreError, UserStore};
use crate::summary::{LatestView, StationSummary, compute_summary};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Email already registered.")]
    EmailTaken,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("No weather provider configured.")]
    ProviderNotConfigured,

    #[error("Could not find a location for station '{0}'.")]
    Unlocated(String),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Weather provider error: {0:#}")]
    Provider(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => ServiceError::EmailTaken,
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One station as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StationCard {
    pub station: Station,
    pub summary: StationSummary,
    pub latest: Option<LatestView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub first_name: String,
    pub stations: Vec<StationCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub station: Station,
    pub summary: StationSummary,
    pub latest: Option<LatestView>,
    /// Newest first.
    pub reports: Vec<WeatherReport>,
}

/// A manually entered reading.
#[derive(Debug, Clone, Default)]
pub struct Reading {
    pub code: Option<i64>,
    pub temp: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_dir: Option<f64>,
    pub pressure: Option<f64>,
}

#[derive(Clone)]
pub struct WeatherTop {
    users: Arc<dyn UserStore>,
    stations: Arc<dyn StationStore>,
    reports: Arc<dyn ReportStore>,
    provider: Option<Arc<dyn WeatherProvider>>,
}

impl WeatherTop {
    pub fn new(
        users: Arc<dyn UserStore>,
        stations: Arc<dyn StationStore>,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            users,
            stations,
            reports,
            provider: None,
        }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(
            Arc::new(db.users()),
            Arc::new(db.stations()),
            Arc::new(db.reports()),
        )
    }

    pub fn with_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn provider(&self) -> ServiceResult<&Arc<dyn WeatherProvider>> {
        self.provider.as_ref().ok_or(ServiceError::ProviderNotConfigured)
    }

    // -- accounts

    pub fn signup(&self, user: NewUser) -> ServiceResult<User> {
        if user.email.trim().is_empty() {
            return Err(ServiceError::Invalid("Email is required.".into()));
        }
        if user.password.is_empty() {
            return Err(ServiceError::Invalid("Password is required.".into()));
        }

        let user = self.users.create(user)?;
        tracing::info!(user = %user.id, "account created");
        Ok(user)
    }

    pub fn login(&self, email: &str, password: &str) -> ServiceResult<User> {
        match self.users.find_by_email(email)? {
            Some(user) if user.verify_password(password) => Ok(user),
            _ => {
                tracing::debug!("rejected login");
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    pub fn account(&self, user_id: &str) -> ServiceResult<User> {
        self.users
            .find_by_id(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub fn update_account(&self, user_id: &str, update: UserUpdate) -> ServiceResult<User> {
        if update.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ServiceError::Invalid("Email cannot be empty.".into()));
        }

        self.users
            .update(user_id, update)?
            .ok_or(ServiceError::NotFound("User"))
    }

    // -- dashboard and stations

    pub fn dashboard(&self, user: &User) -> ServiceResult<Dashboard> {
        let stations = self
            .stations
            .find_by_user(&user.id)?
            .into_iter()
            .map(|station| -> ServiceResult<StationCard> {
                let reports = self.reports.find_by_station_id(&station.id)?;
                let summary = compute_summary(&reports);
                let latest = summary.latest_view();
                Ok(StationCard {
                    station,
                    summary,
                    latest,
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let first_name = if user.first_name.is_empty() {
            "User".to_string()
        } else {
            user.first_name.clone()
        };

        Ok(Dashboard {
            first_name,
            stations,
        })
    }

    /// Stations of other users are indistinguishable from missing ones.
    fn owned_station(&self, user: &User, station_id: &str) -> ServiceResult<Station> {
        self.stations
            .find_by_id(station_id)?
            .filter(|station| station.user_id == user.id)
            .ok_or(ServiceError::NotFound("Station"))
    }

    /// Create a station. Missing coordinates are looked up by name when a
    /// provider is available, and an initial report is fetched. Neither step
    /// failing prevents the station from being created.
    pub async fn create_station(
        &self,
        user: &User,
        name: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> ServiceResult<Station> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Invalid("Name is required.".into()));
        }

        let (mut lat, mut lng) = (lat, lng);
        if lat.is_none() || lng.is_none() {
            if let Some(provider) = &self.provider {
                match provider.geocode(name).await {
                    Ok(Some(found)) => {
                        lat = Some(found.lat);
                        lng = Some(found.lon);
                    }
                    Ok(None) => tracing::debug!(%name, "no geocoding match"),
                    Err(err) => tracing::warn!(%name, "geocoding failed: {err:#}"),
                }
            }
        }

        let station = self.stations.create(NewStation {
            user_id: user.id.clone(),
            name: name.to_string(),
            lat,
            lng,
        })?;
        tracing::info!(station = %station.id, %name, "station created");

        if self.provider.is_some() {
            if let Err(err) = self.generate_report(&station).await {
                tracing::warn!(station = %station.id, "initial report skipped: {err}");
            }
        }

        Ok(station)
    }

    pub fn station_view(&self, user: &User, station_id: &str) -> ServiceResult<StationView> {
        let station = self.owned_station(user, station_id)?;
        let reports = self.reports.find_by_station_id(&station.id)?;
        let summary = compute_summary(&reports);
        let latest = summary.latest_view();

        Ok(StationView {
            station,
            summary,
            latest,
            reports,
        })
    }

    /// Delete a station together with all of its reports.
    pub fn delete_station(&self, user: &User, station_id: &str) -> ServiceResult<()> {
        let station = self.owned_station(user, station_id)?;
        self.reports.delete_by_station(&station.id)?;
        self.stations.delete(&station.id)?;
        tracing::info!(station = %station.id, "station deleted");
        Ok(())
    }

    // -- reports

    pub fn add_report(
        &self,
        user: &User,
        station_id: &str,
        reading: Reading,
    ) -> ServiceResult<WeatherReport> {
        let station = self.owned_station(user, station_id)?;
        let report = self.reports.create(NewReport {
            station_id: station.id,
            code: reading.code,
            temp: reading.temp,
            wind_speed: reading.wind_speed,
            wind_dir: reading.wind_dir,
            pressure: reading.pressure,
            icon: None,
            time: None,
        })?;
        Ok(report)
    }

    pub fn delete_report(&self, user: &User, station_id: &str, report_id: &str) -> ServiceResult<()> {
        let station = self.owned_station(user, station_id)?;
        let report = self
            .reports
            .find_by_id(report_id)?
            .filter(|report| report.station_id == station.id)
            .ok_or(ServiceError::NotFound("Report"))?;

        self.reports.delete(&report.id)?;
        Ok(())
    }

    /// Record the provider's current conditions as a new report.
    pub async fn auto_generate_report(
        &self,
        user: &User,
        station_id: &str,
    ) -> ServiceResult<WeatherReport> {
        let station = self.owned_station(user, station_id)?;
        self.generate_report(&station).await
    }

    async fn generate_report(&self, station: &Station) -> ServiceResult<WeatherReport> {
        let provider = self.provider()?;
        let at = match station.coordinates() {
            Some(at) => at,
            None => self.locate(provider.as_ref(), station).await?,
        };

        let current = provider.current(at).await?;
        let report = self.reports.create(NewReport {
            station_id: station.id.clone(),
            code: current.code,
            temp: current.temp,
            wind_speed: current.wind_speed_mps.map(ms_to_kmh),
            wind_dir: current.wind_deg,
            pressure: current.pressure,
            icon: current.icon,
            time: None,
        })?;
        tracing::info!(station = %station.id, report = %report.id, "report generated");
        Ok(report)
    }

    /// Geocode a station without coordinates. Lookups are biased to Ireland.
    async fn locate(
        &self,
        provider: &dyn WeatherProvider,
        station: &Station,
    ) -> ServiceResult<Coordinates> {
        let query = format!("{},IE", station.name);
        provider
            .geocode(&query)
            .await?
            .ok_or_else(|| ServiceError::Unlocated(station.name.clone()))
    }

    // -- forecast

    pub async fn forecast(&self, user: &User, station_id: &str) -> ServiceResult<ForecastView> {
        let station = self.owned_station(user, station_id)?;
        let provider = self.provider()?;
        let at = station
            .coordinates()
            .ok_or_else(|| ServiceError::Invalid("Missing station coordinates.".into()))?;

        let current = provider.current(at).await?;
        let response = provider.forecast(at).await?;

        Ok(ForecastView {
            current: CurrentView::from_conditions(&current),
            hourly: forecast::hourly(&response.entries),
            daily: forecast::daily(&response.entries),
            timezone_offset: response.timezone_offset,
            station,
        })
    }
}
