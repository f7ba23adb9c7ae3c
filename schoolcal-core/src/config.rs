//! Layered server configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `schoolcal.toml` (or the file named by `SCHOOLCAL_CONFIG`), `SCHOOLCAL_*`
//! environment variables, and finally `PORT`.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

static DEFAULT_CONFIG_FILE: &str = "schoolcal.toml";
static DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 3000;
static DEFAULT_DATA_FILE: &str = "events.json";
static DEFAULT_PUBLIC_DIR: &str = "public";
static DEFAULT_INDEX_FILE: &str = "index.html";
static DEFAULT_CALENDAR_NAME: &str = "My School Stuff";
static DEFAULT_TIMEZONE: &str = "Europe/Berlin";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// JSON document holding the event list
    pub data_file: PathBuf,
    /// Directory served for static assets
    pub public_dir: PathBuf,
    /// Landing page served at `/`
    pub index_file: PathBuf,
    pub calendar_name: String,
    /// IANA zone used for naive timestamps and advertised in the feed
    pub timezone: String,
}

impl Settings {
    /// Load settings from all sources, including the process environment.
    pub fn load() -> StoreResult<Self> {
        let config_path = std::env::var("SCHOOLCAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let builder = defaults()?
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix("SCHOOLCAL"))
            .set_override_option("port", std::env::var("PORT").ok())
            .map_err(config_error)?;

        Self::build(builder)
    }

    /// Load settings from defaults plus a single TOML file, ignoring the environment.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let builder = defaults()?.add_source(File::from(path.to_path_buf()).required(true));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> StoreResult<Self> {
        let mut settings: Settings = builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        settings.data_file = expand(&settings.data_file);
        settings.public_dir = expand(&settings.public_dir);
        settings.index_file = expand(&settings.index_file);
        settings.tz()?;

        Ok(settings)
    }

    pub fn tz(&self) -> StoreResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| StoreError::Config(format!("Unknown timezone: {}", self.timezone)))
    }
}

fn defaults() -> StoreResult<ConfigBuilder<DefaultState>> {
    Config::builder()
        .set_default("host", DEFAULT_HOST)
        .and_then(|b| b.set_default("port", DEFAULT_PORT))
        .and_then(|b| b.set_default("data_file", DEFAULT_DATA_FILE))
        .and_then(|b| b.set_default("public_dir", DEFAULT_PUBLIC_DIR))
        .and_then(|b| b.set_default("index_file", DEFAULT_INDEX_FILE))
        .and_then(|b| b.set_default("calendar_name", DEFAULT_CALENDAR_NAME))
        .and_then(|b| b.set_default("timezone", DEFAULT_TIMEZONE))
        .map_err(config_error)
}

fn config_error(e: config::ConfigError) -> StoreError {
    StoreError::Config(e.to_string())
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schoolcal.toml");
        std::fs::write(&path, contents).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::build(defaults().unwrap()).unwrap();

        assert_eq!(settings.port, 3000);
        assert_eq!(settings.data_file, PathBuf::from("events.json"));
        assert_eq!(settings.calendar_name, "My School Stuff");
        assert_eq!(settings.tz().unwrap(), chrono_tz::Europe::Berlin);
    }

    // The only test that touches the process environment; every step runs in sequence.
    #[test]
    fn test_load_layers_environment_over_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let missing_config = temp_dir.path().join("missing.toml");
        let data_file = temp_dir.path().join("data/events.json");

        unsafe {
            std::env::set_var("SCHOOLCAL_CONFIG", &missing_config);
            std::env::set_var("SCHOOLCAL_DATA_FILE", &data_file);
            std::env::set_var("PORT", "8081");
        }
        let layered = Settings::load();

        unsafe {
            std::env::set_var("PORT", "notaport");
        }
        let bad_port = Settings::load();

        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("SCHOOLCAL_DATA_FILE");
        }
        let defaulted = Settings::load();

        unsafe {
            std::env::remove_var("SCHOOLCAL_CONFIG");
        }

        let layered = layered.unwrap();
        assert_eq!(layered.port, 8081);
        assert_eq!(layered.data_file, data_file);
        assert_eq!(layered.host, "127.0.0.1");
        assert_eq!(layered.calendar_name, "My School Stuff");

        assert!(matches!(bad_port, Err(StoreError::Config(_))));

        let defaulted = defaulted.unwrap();
        assert_eq!(defaulted.port, 3000);
        assert_eq!(defaulted.data_file, PathBuf::from("events.json"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let (_temp_dir, path) = write_config(
            r#"
port = 8080
data_file = "/var/lib/schoolcal/events.json"
calendar_name = "Uni"
"#,
        );

        let settings = Settings::from_file(&path).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(
            settings.data_file,
            PathBuf::from("/var/lib/schoolcal/events.json")
        );
        assert_eq!(settings.calendar_name, "Uni");
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let (_temp_dir, path) = write_config("timezone = \"Germany/Berlin\"\n");

        let result = Settings::from_file(&path);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let (_temp_dir, path) = write_config("data_file = \"~/schoolcal/events.json\"\n");

        let settings = Settings::from_file(&path).unwrap();
        assert!(!settings.data_file.to_string_lossy().starts_with('~'));
    }
}
