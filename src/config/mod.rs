//! Environment-driven configuration.
//!
//! | Variable        | Default      |
//! |-----------------|--------------|
//! | `HOST`          | `0.0.0.0`    |
//! | `PORT`          | `5000`       |
//! | `APP_ENV`       | `production` |
//! | `VERCEL_ENV`    | unset        |
//! | `VERCEL_REGION` | unset        |
//!
//! `APP_ENV=development` turns on debug logging.

use std::num::ParseIntError;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Largest request the server buffers (16 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Runtime settings for the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Application environment name, e.g. `development` or `production`.
    pub app_env: String,
    /// Deployment environment reported by the platform, if any.
    pub vercel_env: Option<String>,
    pub vercel_region: Option<String>,
    pub max_content_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            app_env: "production".to_owned(),
            vercel_env: None,
            vercel_region: None,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if `PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating empty values as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if `PORT` is set but is not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => defaults.port,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            app_env: var("APP_ENV").unwrap_or(defaults.app_env),
            vercel_env: var("VERCEL_ENV"),
            vercel_region: var("VERCEL_REGION"),
            max_content_length: defaults.max_content_length,
        })
    }

    /// `true` when running in the development environment.
    pub fn debug(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }

    /// `host:port` for [`Server::bind`](crate::Server::bind).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert!(!config.debug());
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("APP_ENV", "development"),
            ("VERCEL_ENV", "preview"),
            ("VERCEL_REGION", "fra1"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert!(config.debug());
        assert_eq!(config.vercel_env.as_deref(), Some("preview"));
        assert_eq!(config.vercel_region.as_deref(), Some("fra1"));
    }

    #[test]
    fn blank_values_fall_back() {
        let config = config(&[("PORT", "  "), ("HOST", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { ref value, .. } if value == "eighty"));
        assert!(config(&[("PORT", "70000")]).is_err());
    }
}
