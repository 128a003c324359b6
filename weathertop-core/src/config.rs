use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Configuration for the weather provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where station data is kept. Defaults to `db.json` in the platform data
    /// directory.
    pub data_file: Option<PathBuf>,

    /// Example TOML:
    /// [openweather]
    /// api_key = "..."
    pub openweather: Option<ProviderConfig>,
}

impl Config {
    /// Environment variable that overrides the stored API key.
    pub const API_KEY_ENV: &'static str = "OPENWEATHER_KEY";

    /// Load config from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Apply overrides looked up by variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(Self::API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.set_api_key(key.trim().to_string());
        }
        self
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weathertop", "weathertop")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// The configured data file, or the platform default.
    pub fn data_file_path(&self) -> Result<PathBuf> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("db.json")),
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather = Some(ProviderConfig { api_key });
    }

    /// Returns the OpenWeather API key, if present.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather
            .as_ref()
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert!(cfg.api_key().is_none());
        assert!(cfg.data_file.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.data_file = Some(dir.path().join("db.json"));
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("OPEN_KEY"));
        assert_eq!(loaded.data_file_path().unwrap(), dir.path().join("db.json"));
    }

    #[test]
    fn parses_hand_written_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "data_file = \"/tmp/wt.json\"\n\n[openweather]\napi_key = \"abc\"\n")
            .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.api_key(), Some("abc"));
        assert_eq!(cfg.data_file, Some(PathBuf::from("/tmp/wt.json")));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "openweather = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn environment_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        let cfg = cfg.with_overrides(|name| {
            (name == Config::API_KEY_ENV).then(|| "FROM_ENV".to_string())
        });
        assert_eq!(cfg.api_key(), Some("FROM_ENV"));
    }

    #[test]
    fn blank_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        let cfg = cfg.with_overrides(|_| Some("   ".to_string()));
        assert_eq!(cfg.api_key(), Some("FROM_FILE"));
    }

    #[test]
    fn empty_key_counts_as_unconfigured() {
        let mut cfg = Config::default();
        cfg.set_api_key(String::new());
        assert!(cfg.api_key().is_none());
    }
}
