//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** - `MCP_AUTH_TOKEN`, `DEVICE_IP`,
//!    `DEVICE_PORT`, `PORT`, `HOST`, `DEVICE_TIMEOUT_MS`,
//!    `MCP_SAFETY_MAX_POWER_0_100`, `MCP_CONTEXT_DESCRIPTION`,
//!    `TOOL_DESC_<TOOL>`, `LOG_LEVEL`
//! 2. **Config file** - path via `--config <path>`, or `fancy-gateway.toml` in CWD
//! 3. **Compiled defaults** - see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! max_concurrent_requests = 64
//!
//! [auth]
//! token = "your-secret-token"
//!
//! [device]
//! ip = "192.168.4.1"
//! port = 80
//! timeout_ms = 5000
//!
//! [safety]
//! max_power = 50          # optional, 0-100
//!
//! [tools]
//! context_description = "Lab unit"
//!
//! [tools.descriptions]
//! shock = "Custom shock description"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! The loaded [`Config`] is immutable for the lifetime of the process.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::tools::ToolName;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "fancy-gateway.toml";

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default `0.0.0.0`). Override with `HOST`.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (default 8000). Override with `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on requests handled at once (default 64).
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Static bearer token. Required. Override with `MCP_AUTH_TOKEN`.
    #[serde(default)]
    pub token: String,
}

/// Downstream device address.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device IP or hostname. Required. Override with `DEVICE_IP`.
    #[serde(default)]
    pub ip: String,
    /// Device HTTP port (default 80). Override with `DEVICE_PORT`.
    #[serde(default = "default_device_port")]
    pub port: u16,
    /// Per-request timeout in milliseconds (default 5000). Override with `DEVICE_TIMEOUT_MS`.
    #[serde(default = "default_device_timeout_ms")]
    pub timeout_ms: u64,
}

/// Safety limits applied to power-valued arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyConfig {
    /// Optional power ceiling in `0..=100`. Override with `MCP_SAFETY_MAX_POWER_0_100`.
    pub max_power: Option<u8>,
}

/// Tool description overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    /// Prefix shown as `[context] ` before every tool description.
    #[serde(default)]
    pub context_description: Option<String>,
    /// Per-tool description overrides, keyed by tool name.
    #[serde(default)]
    pub descriptions: HashMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Errors raised while loading configuration. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: String, value: String },
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_concurrent_requests() -> usize {
    64
}
fn default_device_port() -> u16 {
    80
}
fn default_device_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ip: String::new(),
            port: default_device_port(),
            timeout_ms: default_device_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// `host:port` socket address string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", bracket_ipv6(&self.host), self.port)
    }
}

impl DeviceConfig {
    /// `http://{ip}:{port}`, with IPv6 literals bracketed.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", bracket_ipv6(&self.ip), self.port)
    }
}

fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults,
    /// then validate it.
    ///
    /// If `path` is `Some`, that file must exist. Otherwise `fancy-gateway.toml`
    /// in the current directory is used when present.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file without applying env overrides.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlay environment variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("MCP_AUTH_TOKEN") {
            self.auth.token = token;
        }
        if let Some(ip) = lookup("DEVICE_IP") {
            self.device.ip = ip;
        }
        if let Some(port) = lookup("DEVICE_PORT") {
            self.device.port = parse_var("DEVICE_PORT", &port)?;
        }
        if let Some(timeout) = lookup("DEVICE_TIMEOUT_MS") {
            self.device.timeout_ms = parse_var("DEVICE_TIMEOUT_MS", &timeout)?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(max) = lookup("MCP_SAFETY_MAX_POWER_0_100") {
            if !max.trim().is_empty() {
                let value: i64 = parse_var("MCP_SAFETY_MAX_POWER_0_100", &max)?;
                self.safety.max_power = Some(clamp_ceiling(value));
            }
        }
        if let Some(context) = lookup("MCP_CONTEXT_DESCRIPTION") {
            self.tools.context_description = Some(context);
        }
        for tool in ToolName::ALL {
            if let Some(desc) = lookup(&tool.description_env_var()) {
                self.tools.descriptions.insert(tool.as_str().to_string(), desc);
            }
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check required fields and normalize optional ones.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.auth.token.trim().is_empty() {
            return Err(ConfigError::Missing("MCP_AUTH_TOKEN (auth.token)"));
        }
        if self.device.ip.trim().is_empty() {
            return Err(ConfigError::Missing("DEVICE_IP (device.ip)"));
        }
        if self.device.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "device.timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid {
                name: "server.max_concurrent_requests".to_string(),
                value: "0".to_string(),
            });
        }
        if let Some(max) = self.safety.max_power {
            self.safety.max_power = Some(clamp_ceiling(i64::from(max)));
        }
        if self
            .tools
            .context_description
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            self.tools.context_description = None;
        }
        Ok(())
    }

    /// Keys of `[tools.descriptions]` that don't name a known tool. They are
    /// ignored; the caller logs them once tracing is up.
    pub fn unknown_description_overrides(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .tools
            .descriptions
            .keys()
            .map(String::as_str)
            .filter(|name| ToolName::from_name(name).is_none())
            .collect();
        unknown.sort_unstable();
        unknown
    }

    /// Description override for `tool`, if one is configured and non-blank.
    pub fn description_override(&self, tool: ToolName) -> Option<&str> {
        self.tools
            .descriptions
            .get(tool.as_str())
            .map(String::as_str)
            .filter(|d| !d.trim().is_empty())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Bring a configured ceiling into `0..=100`.
fn clamp_ceiling(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}
