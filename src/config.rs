use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

/// Application settings.
///
/// Sources, lowest priority first: built-in defaults, `billbook.toml` (or the
/// file given with `--config`), then `BILLBOOK_*` environment variables.
/// Command-line flags override all of them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub save_timeout_secs: u64,
    pub default_currency: String,
    pub log_filter: String,
    /// Recorded as creator / last editor of saved records.
    pub operator: String,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("billbook").required(false),
        };
        Self::layered(file, Environment::with_prefix("BILLBOOK"))
    }

    fn layered<F>(file: F, env: Environment) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("database_url", "sqlite://billbook.db?mode=rwc")?
            .set_default("save_timeout_secs", 60)?
            .set_default("default_currency", "USD")?
            .set_default("log_filter", "info")?
            .set_default("operator", "system")?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }
}
