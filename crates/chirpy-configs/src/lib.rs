//! # chirpy-configs
//!
//! Layered settings for the Chirpy process.
//!
//! Precedence, lowest first: built-in defaults, `chirpy.toml` (optional),
//! `CHIRPY__SECTION__KEY` environment variables, then the legacy `JWT_SECRET`
//! and `POLKA_KEY` variables. A `.env` file is loaded into the environment first.

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    /// Bearer tokens cannot be signed without a secret.
    #[error("auth.jwt_secret (or JWT_SECRET) must be set")]
    MissingSecret,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Snapshot file, created empty on first use.
    pub path: PathBuf,
}

/// Argon2 cost knobs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Option<SecretString>,
    pub issuer: String,
    pub access_token_ttl_secs: u64,
    /// Shared secret the payment provider presents on webhooks.
    pub webhook_api_key: Option<SecretString>,
    pub password: PasswordSettings,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info,chirpy_db_json=debug`.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Loads settings from `.env`, `chirpy.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let builder = defaults()?
            .add_source(File::with_name("chirpy").required(false))
            .add_source(Environment::with_prefix("CHIRPY").separator("__"))
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("auth.webhook_api_key", std::env::var("POLKA_KEY").ok())?;

        finish(builder)
    }

    /// Builds settings from defaults plus an inline TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    pub fn jwt_secret(&self) -> Result<&SecretString, ConfigError> {
        self.auth.jwt_secret.as_ref().ok_or(ConfigError::MissingSecret)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.access_token_ttl_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        match &self.auth.jwt_secret {
            Some(secret) if !secret.expose_secret().is_empty() => {}
            _ => return Err(ConfigError::MissingSecret),
        }
        if self.auth.access_token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("auth.access_token_ttl_secs must be positive".into()));
        }
        if self.auth.issuer.is_empty() {
            return Err(ConfigError::Invalid("auth.issuer must not be empty".into()));
        }
        Ok(self)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("database.path", "database.json")?
        .set_default("auth.issuer", "chirpy")?
        .set_default("auth.access_token_ttl_secs", 3600)?
        .set_default("auth.password.memory_kib", 19_456)?
        .set_default("auth.password.iterations", 2)?
        .set_default("auth.password.parallelism", 1)?
        .set_default("log.filter", "info")?
        .set_default("log.format", "pretty")?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_everything_but_secret() {
        let settings = Settings::from_toml("[auth]\njwt_secret = \"s3cret\"\n").unwrap();

        assert_eq!(settings.database.path, PathBuf::from("database.json"));
        assert_eq!(settings.auth.issuer, "chirpy");
        assert_eq!(settings.access_token_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.auth.password.memory_kib, 19_456);
        assert!(settings.auth.webhook_api_key.is_none());
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert_eq!(settings.jwt_secret().unwrap().expose_secret(), "s3cret");
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(matches!(Settings::from_toml(""), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            Settings::from_toml("[auth]\njwt_secret = \"\"\n"),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_overrides_and_validation() {
        let settings = Settings::from_toml(
            r#"
[database]
path = "/tmp/chirpy/db.json"

[auth]
jwt_secret = "s3cret"
webhook_api_key = "f271c81ff7084ee5b99a5091b42d486e"
access_token_ttl_secs = 60

[log]
format = "json"
"#,
        )
        .unwrap();

        assert_eq!(settings.database.path, PathBuf::from("/tmp/chirpy/db.json"));
        assert_eq!(settings.access_token_ttl(), Duration::from_secs(60));
        assert_eq!(settings.log.format, LogFormat::Json);
        assert!(settings.auth.webhook_api_key.is_some());

        let zero_ttl = Settings::from_toml("[auth]\njwt_secret = \"s\"\naccess_token_ttl_secs = 0\n");
        assert!(matches!(zero_ttl, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let settings = Settings::from_toml("[auth]\njwt_secret = \"s3cret\"\n").unwrap();
        assert!(!format!("{settings:?}").contains("s3cret"));
    }
}
