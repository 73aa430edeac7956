//! Configuration file management for mealplan.
//!
//! Provides a TOML-based config file at `~/.config/mealplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mealplan_core::GenerationSettings;
use mealplan_core::model::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use mealplan_core::model::{ProviderConfig, ReasoningEffort};

use crate::rate_limit::{LimitPolicy, RateLimits};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

/// On-disk configuration. Every section and key is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub model: ModelSection,
    pub rate_limit: RateLimitSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_window_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_window_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mealplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mealplan` or
/// `~/.config/mealplan`, never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mealplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mealplan")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file, or `None` if it does not exist.
///
/// A file that exists but does not parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct MealPlanConfig {
    pub bind: String,
    pub port: u16,
    pub provider: ProviderConfig,
    pub generation: GenerationSettings,
    pub limits: RateLimits,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{name}={raw:?} is invalid: {e}")),
        None => Ok(None),
    }
}

impl MealPlanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Bind: `cli_bind` > `MEALPLAN_BIND` > `server.bind` > `127.0.0.1`
    /// - Port: `cli_port` > `MEALPLAN_PORT` > `server.port` > `3001`
    /// - API key: `MEALPLAN_API_KEY` > `OPENAI_API_KEY` > `model.api_key` > none
    ///
    /// A missing API key is not an error here; generation reports it.
    pub fn resolve(cli_bind: Option<&str>, cli_port: Option<u16>) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();

        let bind = cli_bind
            .map(str::to_string)
            .or_else(|| env_var("MEALPLAN_BIND"))
            .or(file.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match cli_port {
            Some(p) => p,
            None => env_parsed::<u16>("MEALPLAN_PORT")?
                .or(file.server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let model = file.model;
        let timeout_secs = env_parsed::<u64>("MEALPLAN_MODEL_TIMEOUT_SECS")?
            .or(model.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let provider = ProviderConfig {
            base_url: env_var("MEALPLAN_MODEL_BASE_URL")
                .or(model.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: env_var("MEALPLAN_API_KEY")
                .or_else(|| env_var("OPENAI_API_KEY"))
                .or(model.api_key),
            model: env_var("MEALPLAN_MODEL")
                .or(model.name)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let defaults = GenerationSettings::default();
        let generation = GenerationSettings {
            max_output_tokens: model.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            repair_max_output_tokens: model
                .repair_max_output_tokens
                .unwrap_or(defaults.repair_max_output_tokens),
            reasoning_effort: model.reasoning_effort.unwrap_or(defaults.reasoning_effort),
        };

        let rl = file.rate_limit;
        let default_limits = RateLimits::default();
        let limits = RateLimits {
            strict: LimitPolicy {
                max_requests: rl.strict_max.unwrap_or(default_limits.strict.max_requests),
                window: rl
                    .strict_window_secs
                    .map(Duration::from_secs)
                    .unwrap_or(default_limits.strict.window),
            },
            general: LimitPolicy {
                max_requests: rl.general_max.unwrap_or(default_limits.general.max_requests),
                window: rl
                    .general_window_secs
                    .map(Duration::from_secs)
                    .unwrap_or(default_limits.general.window),
            },
        };

        Ok(Self {
            bind,
            port,
            provider,
            generation,
            limits,
        })
    }

    /// Address to listen on. `bind` must be an IP literal (v4 or v6).
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .trim()
            .parse()
            .with_context(|| format!("bind address {:?} is not an IP address", self.bind))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Base URL a local client should use to reach this server.
    pub fn server_url(&self) -> String {
        let host = match self.bind.as_str() {
            "0.0.0.0" | "::" => "127.0.0.1",
            other => other,
        };
        format!("http://{host}:{}", self.port)
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
