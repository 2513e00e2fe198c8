//! # configs
//!
//! Layered application settings. Sources, lowest precedence first:
//! built-in defaults, `config/default.toml`, `config/local.toml`, then
//! `NEWSBOARD__SECTION__KEY` environment variables (a `.env` file is
//! loaded into the environment first).
//!
//! The captcha secret and token signing key have no defaults and must be
//! supplied by the deployment.

use std::path::PathBuf;
use std::time::Duration;

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub captcha: CaptchaSettings,
    pub auth: AuthSettings,
    pub accounts: AccountSettings,
    pub news: NewsSettings,
    pub log: LogSettings,
    /// The `.env` file that was loaded, if any. Filled by [`Settings::load`]
    /// so the caller can report it once logging is up.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. `sqlite://newsboard.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct CaptchaSettings {
    pub secret_key: SecretString,
    pub verify_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AccountSettings {
    /// Group that self-registered users are enrolled into.
    pub default_group_name: String,
    /// Permission codenames granted to that group when it is first created.
    pub default_group_permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsSettings {
    /// Posts shown on the public home page.
    pub home_limit: u32,
    /// Posts shown on the members listing.
    pub list_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CaptchaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://newsboard.db")?
        .set_default("database.max_connections", 5)?
        .set_default("captcha.verify_url", "https://www.google.com/recaptcha/api/siteverify")?
        .set_default("captcha.timeout_secs", 5)?
        .set_default("auth.token_ttl_secs", 60 * 60 * 24)?
        .set_default("accounts.default_group_name", "Average")?
        .set_default(
            "accounts.default_group_permissions",
            vec!["add_comment", "view_comment", "view_newspost"],
        )?
        .set_default("news.home_limit", 3)?
        .set_default("news.list_limit", 10)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = dotenvy::dotenv().ok();

        let builder = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("NEWSBOARD")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("accounts.default_group_permissions")
                    .try_parsing(true),
            );
        let mut settings = Self::from_builder(builder)?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Builds settings from the defaults plus one extra source. Used by tests
    /// and tools that carry their own configuration text.
    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Self::from_builder(defaults()?.add_source(source))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.captcha.timeout_secs == 0 {
            return Err(ConfigError::Invalid("captcha.timeout_secs must be positive".into()));
        }
        if self.news.home_limit == 0 || self.news.list_limit == 0 {
            return Err(ConfigError::Invalid("news limits must be positive".into()));
        }
        if self.accounts.default_group_name.trim().is_empty() {
            return Err(ConfigError::Invalid("accounts.default_group_name is empty".into()));
        }
        Ok(())
    }
}
