use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A single timestamped weather observation for a station.
///
/// Reports are immutable once created. Numeric fields are either finite or
/// `None`; the store enforces this on ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub id: String,
    pub station_id: String,
    pub code: Option<i64>,
    /// Celsius.
    pub temp: Option<f64>,
    /// km/h.
    pub wind_speed: Option<f64>,
    /// Compass bearing in degrees.
    pub wind_dir: Option<f64>,
    /// hPa.
    pub pressure: Option<f64>,
    /// Raw icon token from the provider, e.g. "10d".
    pub icon: Option<String>,
    pub time: DateTime<Utc>,
}

/// Input for [`crate::store::ReportStore::create`].
#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub station_id: String,
    pub code: Option<i64>,
    pub temp: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_dir: Option<f64>,
    pub pressure: Option<f64>,
    pub icon: Option<String>,
    /// Defaults to the creation time when absent.
    pub time: Option<DateTime<Utc>>,
}

impl NewReport {
    pub fn for_station(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            ..Self::default()
        }
    }

    /// Build the stored record, dropping non-finite numbers and blank icons.
    pub(crate) fn into_report(self, id: String, now: DateTime<Utc>) -> WeatherReport {
        WeatherReport {
            id,
            station_id: self.station_id,
            code: self.code,
            temp: finite(self.temp),
            wind_speed: finite(self.wind_speed),
            wind_dir: finite(self.wind_dir),
            pressure: finite(self.pressure),
            icon: self.icon.filter(|icon| !icon.trim().is_empty()),
            time: self.time.unwrap_or(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Station {
    /// Both coordinates, if the station has them.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewStation {
    pub user_id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash
            .split_once('$')
            .is_some_and(|(salt, hash)| salted_digest(salt, password) == hash)
    }
}

/// Salted SHA-256 in the form `salt$hexdigest`.
pub(crate) fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let hash = salted_digest(&salt, password);
    format!("{salt}${hash}")
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Partial account update. `None` leaves a field untouched; an empty password
/// is ignored.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Current conditions as reported by a [`crate::provider::WeatherProvider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub code: Option<i64>,
    pub description: String,
    pub icon: Option<String>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_deg: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// One 3-hourly slot of a provider forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Probability of precipitation in [0, 1].
    pub pop: Option<f64>,
    pub icon: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Shift in seconds from UTC for the forecast location.
    pub timezone_offset: Option<i64>,
    pub entries: Vec<ForecastEntry>,
}

/// Parse free-form numeric input. Blank, unparsable and non-finite input
/// yields `None`.
pub fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    finite(trimmed.parse::<f64>().ok())
}

/// Parse a weather code. Only whole numbers are accepted.
pub fn parse_code(input: &str) -> Option<i64> {
    parse_number(input)
        .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
        .map(|n| n as i64)
}

pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_handles_blank_and_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
    }

    #[test]
    fn parse_code_requires_whole_numbers() {
        assert_eq!(parse_code("500"), Some(500));
        assert_eq!(parse_code("500.0"), Some(500));
        assert_eq!(parse_code("500.5"), None);
        assert_eq!(parse_code("rain"), None);
    }

    #[test]
    fn into_report_sanitizes_fields() {
        let now = Utc::now();
        let new = NewReport {
            station_id: "s1".into(),
            temp: Some(f64::NAN),
            wind_speed: Some(f64::INFINITY),
            pressure: Some(1012.0),
            icon: Some("  ".into()),
            ..NewReport::default()
        };

        let report = new.into_report("r1".into(), now);
        assert_eq!(report.temp, None);
        assert_eq!(report.wind_speed, None);
        assert_eq!(report.pressure, Some(1012.0));
        assert_eq!(report.icon, None);
        assert_eq!(report.time, now);
    }

    #[test]
    fn password_hash_verifies_only_the_same_password() {
        let user = User {
            id: "u1".into(),
            first_name: "Ada".into(),
            last_name: "Byrne".into(),
            email: "ada@example.com".into(),
            password_hash: hash_password("secret"),
        };

        assert!(user.verify_password("secret"));
        assert!(!user.verify_password("Secret"));
        assert!(!user.verify_password(""));
        assert_ne!(hash_password("secret"), hash_password("secret"));
    }

    #[test]
    fn station_coordinates_need_both_values() {
        let mut station = Station {
            id: "s1".into(),
            user_id: "u1".into(),
            name: "Tramore".into(),
            lat: Some(52.16),
            lng: None,
            created_at: Utc::now(),
        };
        assert!(station.coordinates().is_none());

        station.lng = Some(-7.15);
        let coords = station.coordinates().expect("both coordinates set");
        assert_eq!(coords.lat, 52.16);
        assert_eq!(coords.lon, -7.15);
    }
}
