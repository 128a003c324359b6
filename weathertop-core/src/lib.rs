//! Core library for the WeatherTop station dashboard.
//!
//! This crate defines:
//! - Weather classification (labels, icons, Beaufort scale, compass points)
//! - Station summaries over recorded weather reports
//! - Injectable storage for users, stations and reports
//! - Abstraction over the live weather provider and forecast shaping
//! - The account/station/report operations used by `weathertop-cli`

pub mod classify;
pub mod config;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;
pub mod summary;

pub use classify::{IconRef, WeatherLabel};
pub use config::{Config, ProviderConfig};
pub use model::{
    Coordinates, CurrentConditions, NewReport, NewStation, NewUser, Station, User, UserUpdate,
    WeatherReport,
};
pub use provider::WeatherProvider;
pub use service::{ServiceError, WeatherTop};
pub use store::{Database, ReportStore, StationStore, StoreError, UserStore};
pub use summary::{LatestView, MinMax, StationSummary};
