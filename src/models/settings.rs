use crate::game::rules::RuleOrder;
use crate::utils::errors::SettingsError;
use crate::utils::logger::Level;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings. Keys are lower case (`log_level`) in the `settings`
/// file; the environment uses the upper-case names (`LOG_LEVEL`), which
/// `config` folds to lower case before they reach this struct.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub user_server: String,
    pub deck_server: String,
    #[serde(default = "default_timeout")]
    pub battle_timeout_secs: u64,
    #[serde(default = "default_log_dir")]
    pub battle_log_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub rule_order: RuleOrder,
}

fn default_timeout() -> u64 {
    30
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./battle_logs")
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Settings {
    /// Reads `settings.{toml,json,yaml}` if present, then lets the environment override it.
    pub fn load() -> Result<Self, SettingsError> {
        Settings::from_sources(
            config::File::with_name("settings").required(false),
            config::Environment::default(),
        )
    }

    /// Layers `environment` over `file` and validates the result.
    ///
    /// # Arguments
    /// * `file` - The base settings source.
    /// * `environment` - Variables that override keys of the same name in `file`.
    ///
    /// # Returns
    /// * `Ok(Settings)` - The merged and validated settings.
    /// * `Err(SettingsError)` - A source could not be read, a required key is missing or a value is invalid.
    pub fn from_sources<S>(file: S, environment: config::Environment) -> Result<Self, SettingsError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.battle_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "BATTLE_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level, SettingsError> {
        self.log_level
            .parse::<Level>()
            .map_err(|reason| SettingsError::Invalid { key: "LOG_LEVEL", reason })
    }

    pub fn battle_timeout(&self) -> Duration {
        Duration::from_secs(self.battle_timeout_secs)
    }
}
