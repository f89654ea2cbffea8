//! Configuration management for Wayfare.
//!
//! Loads configuration from ${WAYFARE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present,
/// user values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for Wayfare configuration and data files.
    //!
    //! WAYFARE_HOME resolution order:
    //! 1. WAYFARE_HOME environment variable (if set)
    //! 2. ~/.config/wayfare (default)

    use std::path::PathBuf;

    /// Returns the Wayfare home directory.
    pub fn wayfare_home() -> PathBuf {
        if let Ok(home) = std::env::var("WAYFARE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".wayfare"),
            |h| h.join(".config").join("wayfare"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        wayfare_home().join("config.toml")
    }

    /// Returns the path to the cookie jar holding the session tokens.
    pub fn cookie_jar_path() -> PathBuf {
        wayfare_home().join("cookies.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        wayfare_home().join("logs")
    }
}

/// Environment variable overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "WAYFARE_BASE_URL";
/// Environment variable overriding `auth.access_token_cookie`.
pub const ACCESS_COOKIE_ENV: &str = "WAYFARE_ACCESS_TOKEN_COOKIE";
/// Environment variable overriding `auth.refresh_token_cookie`.
pub const REFRESH_COOKIE_ENV: &str = "WAYFARE_REFRESH_TOKEN_COOKIE";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Timeout for a single request in seconds (0 disables)
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Config::DEFAULT_BASE_URL.to_string(),
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Token cookie naming and session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token_cookie: String,
    pub refresh_token_cookie: String,
    pub permissions_stale_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_cookie: "access_token".to_string(),
            refresh_token_cookie: "refresh_token".to_string(),
            permissions_stale_minutes: 10,
        }
    }
}

/// List view settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: u32,
    pub popular_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: Config::DEFAULT_PAGE_SIZE,
            popular_limit: 6,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub listing: ListingConfig,
}

/// Cookie names resolved from config and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub access: String,
    pub refresh: String,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:3002";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 180;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Loads config from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads config from a path. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Creates a config file from the template. Fails if it already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        Self::write_config(path, default_config_template())
    }

    /// Persists a new base URL, keeping the template comments and other values.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        let trimmed = base_url.trim();
        validate_url(trimmed)?;

        let existing = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            String::new()
        };

        let merged = merge_with_template(&existing)?;
        let mut doc: toml_edit::DocumentMut =
            merged.parse().context("Failed to parse merged config")?;
        doc["api"]["base_url"] = toml_edit::value(trimmed);

        Self::write_config(path, &doc.to_string())
    }

    /// Base URL with precedence: `WAYFARE_BASE_URL` > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn effective_base_url(&self) -> Result<String> {
        let env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(env.as_deref(), Some(&self.api.base_url))
    }

    /// Cookie names with env overrides applied.
    pub fn cookie_names(&self) -> CookieNames {
        let pick = |env_var: &str, configured: &str| {
            std::env::var(env_var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| configured.to_string())
        };
        CookieNames {
            access: pick(ACCESS_COOKIE_ENV, &self.auth.access_token_cookie),
            refresh: pick(REFRESH_COOKIE_ENV, &self.auth.refresh_token_cookie),
        }
    }

    /// Request timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.api.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.api.timeout_secs))
        }
    }

    /// Page size clamped to the backend's accepted range.
    pub fn page_size(&self) -> u32 {
        self.listing.page_size.clamp(1, 100)
    }

    /// How long a fetched permission list stays fresh.
    pub fn permissions_stale_time(&self) -> Duration {
        Duration::from_secs(self.auth.permissions_stale_minutes.saturating_mul(60))
    }

    /// Writes config content atomically (temp file + rename).
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Resolves a base URL with precedence: env > config > default.
///
/// Blank values are treated as unset.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(env_value: Option<&str>, config_value: Option<&str>) -> Result<String> {
    for candidate in [env_value, config_value].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }
    Ok(Config::DEFAULT_BASE_URL.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}
