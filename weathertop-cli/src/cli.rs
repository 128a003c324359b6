use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use serde::Serialize;
use weathertop_core::{
    Config, Database, NewUser, User, UserUpdate, WeatherTop, provider::provider_from_config,
    service::Reading,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathertop", version, about = "WeatherTop station dashboard")]
pub struct Cli {
    /// Account email.
    #[arg(long, global = true, env = "WEATHERTOP_EMAIL")]
    pub email: Option<String>,

    /// Account password; prompted for when missing.
    #[arg(long, global = true, env = "WEATHERTOP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use this data file instead of the configured one.
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and data file location.
    Configure,

    /// Create an account with --email and --password.
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },

    /// Show or change account details.
    Account {
        #[command(subcommand)]
        action: AccountCommand,
    },

    /// Summaries of all your stations.
    Dashboard,

    /// Manage stations.
    Station {
        #[command(subcommand)]
        action: StationCommand,
    },

    /// Manage weather reports of a station.
    Report {
        #[command(subcommand)]
        action: ReportCommand,
    },

    /// Current conditions and forecast for a station.
    Forecast {
        /// Station id.
        station: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    Show,
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        new_email: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum StationCommand {
    /// Add a station; coordinates are looked up by name when omitted.
    Add {
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Show a station's summary and reports.
    Show { id: String },
    /// Delete a station and all of its reports.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Record a reading by hand.
    Add {
        /// Station id.
        station: String,
        /// Weather condition code, e.g. 500 for light rain.
        #[arg(long)]
        code: Option<i64>,
        /// Temperature in Celsius.
        #[arg(long, allow_negative_numbers = true)]
        temp: Option<f64>,
        /// Wind speed in km/h.
        #[arg(long)]
        wind_speed: Option<f64>,
        /// Wind direction in degrees.
        #[arg(long)]
        wind_dir: Option<f64>,
        /// Pressure in hPa.
        #[arg(long)]
        pressure: Option<f64>,
    },
    /// Delete one report.
    Delete { station: String, report: String },
    /// Record the current live conditions.
    Auto { station: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        if let Command::Configure = self.command {
            // env overrides must not end up in the saved file
            let stored = Config::load_from(&Config::config_file_path()?)?;
            return configure(stored);
        }

        let config = Config::load()?;

        let data_file = match &self.data_file {
            Some(path) => path.clone(),
            None => config.data_file_path()?,
        };
        let db = Database::open(&data_file)
            .with_context(|| format!("Failed to open data file {}", data_file.display()))?;
        tracing::debug!(path = %data_file.display(), "data file opened");

        let mut app = WeatherTop::from_database(&db);
        match provider_from_config(&config) {
            Ok(provider) => app = app.with_provider(provider),
            Err(err) => tracing::debug!("running without weather provider: {err:#}"),
        }

        match &self.command {
            Command::Configure => Ok(()),
            Command::Signup {
                first_name,
                last_name,
            } => {
                let email = self.require_email()?;
                let password = self.password_or_prompt()?;
                let user = app.signup(NewUser {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    email: email.to_string(),
                    password,
                })?;
                println!("Welcome, {}! Account created for {}.", user.first_name, user.email);
                Ok(())
            }
            Command::Account { action } => {
                let user = self.login(&app)?;
                match action {
                    AccountCommand::Show => self.output(&render::Account::from(&user), || {
                        render::account(&user)
                    }),
                    AccountCommand::Update {
                        first_name,
                        last_name,
                        new_email,
                        new_password,
                    } => {
                        let updated = app.update_account(
                            &user.id,
                            UserUpdate {
                                first_name: first_name.clone(),
                                last_name: last_name.clone(),
                                email: new_email.clone(),
                                password: new_password.clone(),
                            },
                        )?;
                        self.output(&render::Account::from(&updated), || {
                            format!("Account updated.\n{}", render::account(&updated))
                        })
                    }
                }
            }
            Command::Dashboard => {
                let user = self.login(&app)?;
                let dashboard = app.dashboard(&user)?;
                self.output(&dashboard, || render::dashboard(&dashboard))
            }
            Command::Station { action } => {
                let user = self.login(&app)?;
                match action {
                    StationCommand::Add { name, lat, lng } => {
                        let station = app.create_station(&user, name, *lat, *lng).await?;
                        println!("Created station {} ({}).", station.name, station.id);
                        Ok(())
                    }
                    StationCommand::Show { id } => {
                        let view = app.station_view(&user, id)?;
                        self.output(&view, || render::station(&view))
                    }
                    StationCommand::Delete { id } => {
                        app.delete_station(&user, id)?;
                        println!("Deleted station {id}.");
                        Ok(())
                    }
                }
            }
            Command::Report { action } => {
                let user = self.login(&app)?;
                match action {
                    ReportCommand::Add {
                        station,
                        code,
                        temp,
                        wind_speed,
                        wind_dir,
                        pressure,
                    } => {
                        let reading = Reading {
                            code: *code,
                            temp: *temp,
                            wind_speed: *wind_speed,
                            wind_dir: *wind_dir,
                            pressure: *pressure,
                        };
                        let report = app.add_report(&user, station, reading)?;
                        println!("Recorded report {}.", report.id);
                        Ok(())
                    }
                    ReportCommand::Delete { station, report } => {
                        app.delete_report(&user, station, report)?;
                        println!("Deleted report {report}.");
                        Ok(())
                    }
                    ReportCommand::Auto { station } => {
                        let report = app.auto_generate_report(&user, station).await?;
                        println!("Recorded live report {}.", report.id);
                        print!("{}", render::report_line(&report));
                        Ok(())
                    }
                }
            }
            Command::Forecast { station } => {
                let user = self.login(&app)?;
                let view = app.forecast(&user, station).await?;
                self.output(&view, || render::forecast(&view))
            }
        }
    }

    fn require_email(&self) -> anyhow::Result<&str> {
        self.email
            .as_deref()
            .ok_or_else(|| anyhow!("Missing --email (or WEATHERTOP_EMAIL)."))
    }

    fn password_or_prompt(&self) -> anyhow::Result<String> {
        match &self.password {
            Some(password) => Ok(password.clone()),
            None => Password::new("Password:")
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .prompt()
                .context("Failed to read password"),
        }
    }

    fn login(&self, app: &WeatherTop) -> anyhow::Result<User> {
        let email = self.require_email()?;
        let password = self.password_or_prompt()?;
        Ok(app.login(email, &password)?)
    }

    fn output<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        print!("{}", formatted(self.json, value, text)?);
        Ok(())
    }
}

/// JSON for `--json`, otherwise the text rendering.
fn formatted<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<String> {
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
    } else {
        Ok(text())
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let mut prompt = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked);
    if config.api_key().is_some() {
        prompt = prompt.with_help_message("Leave empty to keep the current key");
    }
    let api_key = prompt.prompt().context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current = config.data_file_path()?;
    let current = current.display().to_string();
    let data_file = Text::new("Data file:")
        .with_default(&current)
        .prompt()
        .context("Failed to read data file path")?;
    config.data_file = Some(PathBuf::from(data_file));

    config.save()?;
    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".into(),
            first_name: "Ada".into(),
            last_name: "Byrne".into(),
            email: "ada@example.com".into(),
            password_hash: "salt$abc123".into(),
        }
    }

    #[test]
    fn json_flag_applies_to_account_update() {
        let cli = Cli::try_parse_from([
            "weathertop",
            "account",
            "update",
            "--first-name",
            "Augusta",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Command::Account {
                action: AccountCommand::Update { .. }
            }
        ));
    }

    #[test]
    fn json_output_is_the_account_view() {
        let user = user();
        let out = formatted(true, &render::Account::from(&user), || unreachable!()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["first_name"], "Ada");
        assert!(value.get("password_hash").is_none());
        assert!(!out.contains("abc123"));
    }

    #[test]
    fn text_output_uses_renderer() {
        let user = user();
        let out = formatted(false, &render::Account::from(&user), || {
            format!("Account updated.\n{}", render::account(&user))
        })
        .unwrap();

        assert!(out.starts_with("Account updated.\n"));
        assert!(out.contains("Ada Byrne <ada@example.com>"));
    }
}
