//! Record storage for users, stations and weather reports.
//!
//! The stores are plain traits so callers decide where records live. The
//! bundled [`Database`] keeps everything in memory and can optionally mirror
//! it to a pretty-printed JSON file after every change.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    NewReport, NewStation, NewUser, Station, User, UserUpdate, WeatherReport, finite,
    hash_password,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access data file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse data file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait ReportStore: Send + Sync {
    fn create(&self, report: NewReport) -> StoreResult<WeatherReport>;

    /// All reports of a station, newest first.
    fn find_by_station_id(&self, station_id: &str) -> StoreResult<Vec<WeatherReport>>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<WeatherReport>>;

    /// Removing an unknown id is not an error.
    fn delete(&self, id: &str) -> StoreResult<()>;

    fn delete_by_station(&self, station_id: &str) -> StoreResult<()>;
}

pub trait StationStore: Send + Sync {
    fn create(&self, station: NewStation) -> StoreResult<Station>;

    /// Stations owned by `user_id`, sorted by name.
    fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Station>>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Station>>;

    fn delete(&self, id: &str) -> StoreResult<()>;

    fn all(&self) -> StoreResult<Vec<Station>>;
}

pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    fn create(&self, user: NewUser) -> StoreResult<User>;

    fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Returns `None` if no such user exists.
    fn update(&self, id: &str, update: UserUpdate) -> StoreResult<Option<User>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    stations: Vec<Station>,
    #[serde(default)]
    reports: Vec<WeatherReport>,
}

#[derive(Debug)]
struct Shared {
    data: RwLock<Collections>,
    path: Option<PathBuf>,
}

impl Shared {
    /// Apply `change` under the write lock. File-backed stores change a copy
    /// and only publish it once it is on disk.
    fn mutate<T>(&self, change: impl FnOnce(&mut Collections) -> StoreResult<T>) -> StoreResult<T> {
        let mut data = self.data.write();
        let Some(path) = &self.path else {
            return change(&mut *data);
        };

        let mut next = data.clone();
        let out = change(&mut next)?;
        write_collections(path, &next)?;
        *data = next;
        Ok(out)
    }
}

/// Shared record storage. Cloning is cheap and clones see the same data.
#[derive(Debug, Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            shared: Arc::new(Shared {
                data: RwLock::new(Collections::default()),
                path: None,
            }),
        }
    }

    /// Open a JSON-backed database, creating an empty file on first use.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::info!(path = %path.display(), "creating new data file");
            let empty = Collections::default();
            write_collections(&path, &empty)?;
            empty
        };

        Ok(Self {
            shared: Arc::new(Shared {
                data: RwLock::new(data),
                path: Some(path),
            }),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.shared.path.as_deref()
    }

    pub fn users(&self) -> Users {
        Users(self.shared.clone())
    }

    pub fn stations(&self) -> Stations {
        Stations(self.shared.clone())
    }

    pub fn reports(&self) -> Reports {
        Reports(self.shared.clone())
    }
}

fn write_collections(path: &Path, data: &Collections) -> StoreResult<()> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let json = serde_json::to_string_pretty(data)?;

    // rename over the target; the file is never half-written
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Report table of a [`Database`].
#[derive(Debug, Clone)]
pub struct Reports(Arc<Shared>);

impl ReportStore for Reports {
    fn create(&self, report: NewReport) -> StoreResult<WeatherReport> {
        let report = report.into_report(new_id(), Utc::now());
        self.0.mutate(|data| {
            data.reports.push(report.clone());
            Ok(())
        })?;
        tracing::debug!(id = %report.id, station = %report.station_id, "report created");
        Ok(report)
    }

    fn find_by_station_id(&self, station_id: &str) -> StoreResult<Vec<WeatherReport>> {
        let data = self.0.data.read();
        let mut reports: Vec<_> = data
            .reports
            .iter()
            .filter(|r| r.station_id == station_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(reports)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<WeatherReport>> {
        Ok(self.0.data.read().reports.iter().find(|r| r.id == id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.0.mutate(|data| {
            data.reports.retain(|r| r.id != id);
            Ok(())
        })
    }

    fn delete_by_station(&self, station_id: &str) -> StoreResult<()> {
        self.0.mutate(|data| {
            data.reports.retain(|r| r.station_id != station_id);
            Ok(())
        })
    }
}

/// Station table of a [`Database`].
#[derive(Debug, Clone)]
pub struct Stations(Arc<Shared>);

impl StationStore for Stations {
    fn create(&self, station: NewStation) -> StoreResult<Station> {
        let station = Station {
            id: new_id(),
            user_id: station.user_id,
            name: station.name.trim().to_string(),
            lat: finite(station.lat),
            lng: finite(station.lng),
            created_at: Utc::now(),
        };
        self.0.mutate(|data| {
            data.stations.push(station.clone());
            Ok(())
        })?;
        tracing::debug!(id = %station.id, name = %station.name, "station created");
        Ok(station)
    }

    fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Station>> {
        let data = self.0.data.read();
        let mut stations: Vec<_> = data
            .stations
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        stations.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(stations)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Station>> {
        Ok(self.0.data.read().stations.iter().find(|s| s.id == id).cloned())
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.0.mutate(|data| {
            data.stations.retain(|s| s.id != id);
            Ok(())
        })
    }

    fn all(&self) -> StoreResult<Vec<Station>> {
        Ok(self.0.data.read().stations.clone())
    }
}

/// User table of a [`Database`].
#[derive(Debug, Clone)]
pub struct Users(Arc<Shared>);

impl UserStore for Users {
    fn create(&self, user: NewUser) -> StoreResult<User> {
        let email = normalize_email(&user.email);
        let user = User {
            id: new_id(),
            first_name: user.first_name.trim().to_string(),
            last_name: user.last_name.trim().to_string(),
            email: email.clone(),
            password_hash: hash_password(&user.password),
        };

        self.0.mutate(|data| {
            if data.users.iter().any(|u| u.email == email) {
                return Err(StoreError::DuplicateEmail(email));
            }
            data.users.push(user.clone());
            Ok(())
        })?;
        tracing::debug!(id = %user.id, "user created");
        Ok(user)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self.0.data.read().users.iter().find(|u| u.email == email).cloned())
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.0.data.read().users.iter().find(|u| u.id == id).cloned())
    }

    fn update(&self, id: &str, update: UserUpdate) -> StoreResult<Option<User>> {
        self.0.mutate(|data| {
            if let Some(email) = &update.email {
                let email = normalize_email(email);
                if data.users.iter().any(|u| u.email == email && u.id != id) {
                    return Err(StoreError::DuplicateEmail(email));
                }
            }

            let Some(user) = data.users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };

            if let Some(first_name) = update.first_name {
                user.first_name = first_name.trim().to_string();
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name.trim().to_string();
            }
            if let Some(email) = update.email {
                user.email = normalize_email(&email);
            }
            if let Some(password) = update.password.filter(|p| !p.is_empty()) {
                user.password_hash = hash_password(&password);
            }

            Ok(Some(user.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: " Ada ".into(),
            last_name: "Byrne".into(),
            email: email.into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn reports_are_returned_newest_first() {
        let db = Database::in_memory();
        let reports = db.reports();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        for hours in [2, 0, 5] {
            reports
                .create(NewReport {
                    time: Some(base + Duration::hours(hours)),
                    ..NewReport::for_station("s1")
                })
                .unwrap();
        }
        reports.create(NewReport::for_station("s2")).unwrap();

        let found = reports.find_by_station_id("s1").unwrap();
        let times: Vec<_> = found.iter().map(|r| r.time).collect();
        assert_eq!(
            times,
            [base + Duration::hours(5), base + Duration::hours(2), base]
        );
    }

    #[test]
    fn report_time_defaults_to_now() {
        let db = Database::in_memory();
        let before = Utc::now();
        let report = db.reports().create(NewReport::for_station("s1")).unwrap();
        assert!(report.time >= before);
        assert!(!report.id.is_empty());
    }

    #[test]
    fn delete_report_and_delete_by_station() {
        let db = Database::in_memory();
        let reports = db.reports();
        let a = reports.create(NewReport::for_station("s1")).unwrap();
        let b = reports.create(NewReport::for_station("s1")).unwrap();
        let c = reports.create(NewReport::for_station("s2")).unwrap();

        reports.delete(&a.id).unwrap();
        assert!(reports.find_by_id(&a.id).unwrap().is_none());
        assert_eq!(reports.find_by_id(&b.id).unwrap(), Some(b));

        // unknown ids are ignored
        reports.delete("missing").unwrap();

        reports.delete_by_station("s1").unwrap();
        assert!(reports.find_by_station_id("s1").unwrap().is_empty());
        assert_eq!(reports.find_by_station_id("s2").unwrap(), vec![c]);
    }

    #[test]
    fn stations_are_filtered_by_user_and_sorted() {
        let db = Database::in_memory();
        let stations = db.stations();
        for (user, name) in [("u1", "tramore"), ("u1", " Athlone "), ("u2", "Cork"), ("u1", "Dublin")] {
            stations
                .create(NewStation {
                    user_id: user.into(),
                    name: name.into(),
                    ..NewStation::default()
                })
                .unwrap();
        }

        let names: Vec<_> = stations
            .find_by_user("u1")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["Athlone", "Dublin", "tramore"]);
        assert_eq!(stations.all().unwrap().len(), 4);
    }

    #[test]
    fn station_drops_non_finite_coordinates() {
        let db = Database::in_memory();
        let station = db
            .stations()
            .create(NewStation {
                user_id: "u1".into(),
                name: "Galway".into(),
                lat: Some(f64::NAN),
                lng: Some(-9.05),
            })
            .unwrap();

        assert_eq!(station.lat, None);
        assert_eq!(station.lng, Some(-9.05));
        assert!(station.coordinates().is_none());

        db.stations().delete(&station.id).unwrap();
        assert!(db.stations().find_by_id(&station.id).unwrap().is_none());
    }

    #[test]
    fn users_are_unique_by_normalized_email() {
        let db = Database::in_memory();
        let users = db.users();

        let user = users.create(new_user("Ada@Example.com ")).unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.first_name, "Ada");
        assert!(user.verify_password("secret"));

        let err = users.create(new_user("ada@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));

        let found = users.find_by_email("  ADA@example.COM").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn update_touches_only_provided_fields() {
        let db = Database::in_memory();
        let users = db.users();
        let user = users.create(new_user("ada@example.com")).unwrap();

        let updated = users
            .update(
                &user.id,
                UserUpdate {
                    last_name: Some("Lovelace".into()),
                    password: Some(String::new()),
                    ..UserUpdate::default()
                },
            )
            .unwrap()
            .expect("user exists");

        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Lovelace");
        assert!(updated.verify_password("secret"));

        let updated = users
            .update(
                &user.id,
                UserUpdate {
                    password: Some("changed".into()),
                    ..UserUpdate::default()
                },
            )
            .unwrap()
            .expect("user exists");
        assert!(updated.verify_password("changed"));

        assert!(users.update("nobody", UserUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn update_rejects_taken_email() {
        let db = Database::in_memory();
        let users = db.users();
        users.create(new_user("a@example.com")).unwrap();
        let b = users.create(new_user("b@example.com")).unwrap();

        let err = users
            .update(
                &b.id,
                UserUpdate {
                    email: Some("A@example.com".into()),
                    ..UserUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("db.json");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        let station = db
            .stations()
            .create(NewStation {
                user_id: "u1".into(),
                name: "Kilkenny".into(),
                lat: Some(52.65),
                lng: Some(-7.25),
            })
            .unwrap();
        db.reports()
            .create(NewReport {
                temp: Some(14.0),
                ..NewReport::for_station(station.id.clone())
            })
            .unwrap();

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.stations().find_by_id(&station.id).unwrap(), Some(station.clone()));
        let reports = reopened.reports().find_by_station_id(&station.id).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].temp, Some(14.0));
    }

    #[test]
    fn failed_write_leaves_records_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let db = Database::open(&path).unwrap();
        let kept = db.reports().create(NewReport::for_station("s1")).unwrap();

        // a directory in place of the data file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = db.reports().create(NewReport::for_station("s1")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(db.reports().find_by_station_id("s1").unwrap(), vec![kept.clone()]);

        assert!(db.users().create(new_user("ada@example.com")).is_err());
        assert!(db.users().find_by_email("ada@example.com").unwrap().is_none());

        assert!(db.reports().delete(&kept.id).is_err());
        assert!(db.reports().find_by_id(&kept.id).unwrap().is_some());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["db.json"]);
    }

    #[test]
    fn rewrite_replaces_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let db = Database::open(&path).unwrap();

        let report = db.reports().create(NewReport::for_station("s1")).unwrap();
        db.reports().delete(&report.id).unwrap();

        let reopened = Database::open(&path).unwrap();
        assert!(reopened.reports().find_by_id(&report.id).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Database::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().contains("db.json"));
    }
}
