//! Configuration management for gatepass.
//!
//! Loads configuration from ${GATEPASS_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Production API base URL used when neither env nor config override it.
pub const DEFAULT_BASE_URL: &str = "https://phplaravel-1494556-5705857.cloudwaysapps.com/v1";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "GATEPASS_API_BASE_URL";

pub mod paths {
    //! Path resolution for gatepass configuration and data files.
    //!
    //! GATEPASS_HOME resolution order:
    //! 1. GATEPASS_HOME environment variable (if set)
    //! 2. ~/.config/gatepass (default)

    use std::path::PathBuf;

    /// Returns the gatepass home directory.
    ///
    /// Falls back to `./.gatepass` when no home directory can be determined.
    pub fn gatepass_home() -> PathBuf {
        if let Ok(home) = std::env::var("GATEPASS_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".gatepass"),
            |h| h.join(".config").join("gatepass"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        gatepass_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        gatepass_home().join("session.json")
    }
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL override (env `GATEPASS_API_BASE_URL` still wins)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    /// Request timeout. Zero is never a usable bound, so it reads as the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("api.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Resolves the base URL with precedence: env > config > default.
    pub fn resolve_base_url(&self) -> Result<String> {
        let env_value = std::env::var(BASE_URL_ENV).ok();
        pick_base_url(env_value.as_deref(), self.base_url.as_deref())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn pick_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    for candidate in [env_url, config_url].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }
    Ok(DEFAULT_BASE_URL.to_string())
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?;
            config
                .api
                .validate()
                .with_context(|| format!("Invalid config in {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only `api.base_url` to the config file.
    ///
    /// Preserves existing fields and comments using `toml_edit`.
    pub fn save_base_url(base_url: &str) -> Result<()> {
        Self::save_base_url_to(&paths::config_path(), base_url)
    }

    /// Saves only `api.base_url` to a specific config file path.
    ///
    /// Creates the file from the default template if it doesn't exist.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, Item, Table, value};

        validate_url(base_url.trim())?;

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        if !doc.contains_table("api") {
            doc["api"] = Item::Table(Table::new());
        }
        doc["api"]["base_url"] = value(base_url.trim());

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync. Comments in the embedded template are preserved.
    pub fn generate() -> Result<String> {
        use toml_edit::{DocumentMut, Item};

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        for (section, item) in generated_doc.iter() {
            let Item::Table(source) = item else {
                doc[section] = item.clone();
                continue;
            };
            if let Some(Item::Table(target)) = doc.get_mut(section) {
                for (key, value) in source.iter() {
                    target[key] = value.clone();
                }
            } else {
                doc[section] = Item::Table(source.clone());
            }
        }

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
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
