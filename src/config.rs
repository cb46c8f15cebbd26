//! Configuration management for AmaChecker using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scrapers::{DelayRange, ACCEPT_LANGUAGE_VALUE};
use crate::services::check::{
    CheckConfig, ProductUrl, DEFAULT_BASE_URL, DEFAULT_CHALLENGE_MARKER, DEFAULT_PRICE_SELECTOR,
    DEFAULT_QUERY, DEFAULT_WORKERS,
};
use crate::services::DEFAULT_COLUMN_NEEDLE;

/// Default pattern: a price per unit such as `9,99€ / meter`.
pub const DEFAULT_PATTERN: &str = r"\d+,\d{2}€ / [A-Za-z]+";
/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
/// Default lower bound of the post-request delay.
pub const DEFAULT_DELAY_MIN_MS: u64 = 3_000;
/// Default upper bound of the post-request delay.
pub const DEFAULT_DELAY_MAX_MS: u64 = 10_000;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Product page base URL; identifiers are appended as a path segment.
    pub base_url: String,
    /// Query string appended to every product URL.
    pub query: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Lower bound of the post-request delay in milliseconds.
    pub delay_min_ms: u64,
    /// Upper bound of the post-request delay in milliseconds.
    pub delay_max_ms: u64,
    pub fetch_workers: usize,
    pub verify_workers: usize,
    /// Phrase identifying the bot-challenge page (case-insensitive).
    pub challenge_marker: String,
    /// CSS selector of the price-per-unit element.
    pub price_selector: String,
    /// Regular expression the price element must match.
    pub pattern: String,
    /// Column name fragment identifying the identifier column in imports.
    pub identifier_column: String,
    pub accept_language: String,
    /// Directory exports are written to when no output path is given.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            delay_min_ms: DEFAULT_DELAY_MIN_MS,
            delay_max_ms: DEFAULT_DELAY_MAX_MS,
            fetch_workers: DEFAULT_WORKERS,
            verify_workers: DEFAULT_WORKERS,
            challenge_marker: DEFAULT_CHALLENGE_MARKER.to_string(),
            price_selector: DEFAULT_PRICE_SELECTOR.to_string(),
            pattern: DEFAULT_PATTERN.to_string(),
            identifier_column: DEFAULT_COLUMN_NEEDLE.to_string(),
            accept_language: ACCEPT_LANGUAGE_VALUE.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn delay_range(&self) -> DelayRange {
        DelayRange::from_millis(self.delay_min_ms, self.delay_max_ms)
    }

    /// Validate the settings and build the check service configuration.
    pub fn check_config(&self) -> Result<CheckConfig, ConfigError> {
        if self.fetch_workers == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.verify_workers == 0 {
            return Err(ConfigError::Invalid {
                key: "verify_workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout",
                message: "must be at least 1 second".to_string(),
            });
        }
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::Invalid {
                key: "delay_min_ms",
                message: format!(
                    "{} is larger than delay_max_ms ({})",
                    self.delay_min_ms, self.delay_max_ms
                ),
            });
        }

        let target =
            ProductUrl::new(&self.base_url, &self.query).map_err(|e| ConfigError::Invalid {
                key: "base_url",
                message: e.to_string(),
            })?;

        Ok(CheckConfig {
            target,
            delay: self.delay_range(),
            fetch_workers: self.fetch_workers,
            verify_workers: self.verify_workers,
            challenge_marker: self.challenge_marker.clone(),
            price_selector: self.price_selector.clone(),
        })
    }

    /// Apply `AMACHECKER_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = get("AMACHECKER_BASE_URL") {
            tracing::debug!("Using AMACHECKER_BASE_URL from environment: {}", base_url);
            self.base_url = base_url;
        }
        if let Some(timeout) = get("AMACHECKER_REQUEST_TIMEOUT") {
            self.request_timeout = parse_number("request_timeout", &timeout)?;
        }
        if let Some(workers) = get("AMACHECKER_FETCH_WORKERS") {
            self.fetch_workers = parse_number("fetch_workers", &workers)?;
        }
        if let Some(workers) = get("AMACHECKER_VERIFY_WORKERS") {
            self.verify_workers = parse_number("verify_workers", &workers)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{}': {}", value, e),
    })
}

/// Configuration file structure. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_min_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_max_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found.
    pub async fn load() -> Self {
        match prefer::load("amachecker").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            _ => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(ref query) = self.query {
            settings.query = query.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(min) = self.delay_min_ms {
            settings.delay_min_ms = min;
        }
        if let Some(max) = self.delay_max_ms {
            settings.delay_max_ms = max;
        }
        if let Some(workers) = self.fetch_workers {
            settings.fetch_workers = workers;
        }
        if let Some(workers) = self.verify_workers {
            settings.verify_workers = workers;
        }
        if let Some(ref marker) = self.challenge_marker {
            settings.challenge_marker = marker.clone();
        }
        if let Some(ref selector) = self.price_selector {
            settings.price_selector = selector.clone();
        }
        if let Some(ref pattern) = self.pattern {
            settings.pattern = pattern.clone();
        }
        if let Some(ref column) = self.identifier_column {
            settings.identifier_column = column.clone();
        }
        if let Some(ref language) = self.accept_language {
            settings.accept_language = language.clone();
        }
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = self.resolve_path(dir, base_dir);
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings: defaults, then config file, then environment.
pub async fn load_settings(options: LoadOptions) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides()?;

    Ok((settings, config))
}
