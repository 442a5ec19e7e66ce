use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

pub const APP_DIR_NAME: &str = "drop-catcher";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Extra glob patterns matched against entry names in the input directory.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub stability: StabilitySettings,
    #[serde(default)]
    pub naming: NamingSettings,
}

/// Tunables for the size-polling stability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    pub base_interval_ms: u64,
    pub backoff_factor: f64,
    /// The poll interval never grows past `base_interval_ms * max_interval_factor`.
    pub max_interval_factor: u32,
    pub required_unchanged: u32,
    pub max_checks: u32,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            base_interval_ms: 100,
            backoff_factor: 1.5,
            max_interval_factor: 10,
            required_unchanged: 3,
            max_checks: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_content_chars: usize,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_secs: 60,
            max_content_chars: 4000,
        }
    }
}

impl StabilitySettings {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    /// Longest sleep between polls, `None` when it does not fit a `Duration`.
    pub fn max_interval(&self) -> Option<Duration> {
        self.base_interval().checked_mul(self.max_interval_factor)
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("drop_catcher.db")
}

/// Directory holding the user-level `config.toml`, e.g. `~/.config/drop-catcher`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Load configuration from the user config dir, `Config.toml` in the working
/// directory and `DROP_CATCHER_*` environment variables, in increasing priority.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let mut builder = Config::builder();
    if let Some(dir) = config_dir() {
        builder = builder.add_source(ConfigFile::from(dir.join(CONFIG_FILE_NAME)).required(false));
    }
    let settings = builder
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("DROP_CATCHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<AppConfig>()?.resolved()
}

impl AppConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            database_path: default_database_path(),
            ignore_patterns: Vec::new(),
            stability: StabilitySettings::default(),
            naming: NamingSettings::default(),
        }
    }

    /// Expand `~` and make every path absolute, then validate.
    pub fn resolved(mut self) -> Result<Self, Error> {
        self.input_dir = expand_path(&self.input_dir);
        self.output_dir = expand_path(&self.output_dir);
        self.database_path = expand_path(&self.database_path);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.input_dir == self.output_dir {
            return Err(invalid(format!(
                "input_dir and output_dir must differ, both are {}",
                self.input_dir.display()
            )));
        }
        let stability = &self.stability;
        if !(stability.backoff_factor.is_finite() && stability.backoff_factor >= 1.0) {
            return Err(invalid(format!(
                "stability.backoff_factor must be a finite number of at least 1.0, got {}",
                stability.backoff_factor
            )));
        }
        if stability.required_unchanged == 0 || stability.max_checks <= stability.required_unchanged {
            return Err(invalid(format!(
                "stability.max_checks ({}) must exceed stability.required_unchanged ({}), which must be positive",
                stability.max_checks, stability.required_unchanged
            )));
        }
        if stability.max_interval_factor == 0 {
            return Err(invalid("stability.max_interval_factor must be positive".to_string()));
        }
        if stability.max_interval().is_none() {
            return Err(invalid(format!(
                "stability.base_interval_ms ({}) times stability.max_interval_factor ({}) is out of range",
                stability.base_interval_ms, stability.max_interval_factor
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}

/// Replace a leading `~` component with the home directory and anchor relative
/// paths at the current working directory.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        return expanded;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded)
}
