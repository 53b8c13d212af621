//! Configuration for the launch bridge server
//!
//! Settings are read from an optional TOML file (`LAUNCH_BRIDGE_CONFIG_FILE`,
//! default `config.toml`) and then from environment variables prefixed with
//! `LAUNCH_BRIDGE`, using `__` for nesting, e.g.
//! `LAUNCH_BRIDGE__PROVIDER__CLIENT_ID`. Environment variables win.

use anyhow::{Context, Result};
use chrono::Duration;
use config::{Config as ConfigBuilder, Environment, File};
use launch_bridge_core::{
    BridgeConfig, DEFAULT_STATE_COOKIE_NAME, DEFAULT_STATE_TTL_SECONDS, ProviderConfig,
    RouteConfig, StateCookieConfig,
};
use launch_bridge_session::{DEFAULT_SESSION_COOKIE_NAME, SessionConfig};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

const CONFIG_FILE_VAR: &str = "LAUNCH_BRIDGE_CONFIG_FILE";
const ENV_PREFIX: &str = "LAUNCH_BRIDGE";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub security: SecuritySettings,
    pub state_cookie: StateCookieSettings,
    pub session: SessionSettings,
    pub routes: RouteConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Application secret the state and session keys are derived from
    pub signing_secret: String,
    /// Mark cookies `Secure` even when the request did not arrive over https
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateCookieSettings {
    pub name: String,
    pub ttl_seconds: u64,
    pub replay_ledger: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level or full filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// pretty, compact or json
    pub format: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            cookie_secure: true,
        }
    }
}

impl Default for StateCookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_STATE_COOKIE_NAME.to_string(),
            ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
            replay_ledger: false,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            ttl_seconds: 8 * 60 * 60,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// Config file named by `LAUNCH_BRIDGE_CONFIG_FILE`, default `config.toml`
    pub fn config_path() -> PathBuf {
        config_path_from(std::env::var_os(CONFIG_FILE_VAR))
    }

    /// Load settings from the configured file and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path` (if it exists) and the environment.
    ///
    /// Runs before the subscriber exists, so nothing is logged here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("provider.scopes")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        self.bridge_config()
            .validate()
            .context("Invalid bridge configuration")?;
        self.provider
            .validate()
            .context("Invalid provider configuration")?;
        self.session_config()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        if !self.is_filter_directive() && !valid_levels.contains(&level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let valid_formats = ["pretty", "json", "compact"];
        let format = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            signing_secret: self.security.signing_secret.clone(),
            state_cookie: StateCookieConfig {
                name: self.state_cookie.name.clone(),
                ttl_seconds: self.state_cookie.ttl_seconds,
                secure: self.security.cookie_secure,
                replay_ledger: self.state_cookie.replay_ledger,
            },
            routes: self.routes.clone(),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        if self.session.cookie_name.trim().is_empty() {
            anyhow::bail!("Session cookie name cannot be empty");
        }
        if self.session.ttl_seconds <= 0 {
            anyhow::bail!("Session TTL must be positive");
        }
        let ttl = Duration::try_seconds(self.session.ttl_seconds)
            .context("Session TTL is out of range")?;

        Ok(SessionConfig {
            cookie_name: self.session.cookie_name.clone(),
            ttl,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    /// Filter string for `tracing_subscriber::EnvFilter`
    pub fn log_filter(&self) -> String {
        if self.is_filter_directive() {
            self.logging.level.clone()
        } else {
            format!(
                "launch_bridge_server={level},launch_bridge_gate={level},launch_bridge_oidc={level},launch_bridge_session={level},tower_http={level},warn",
                level = self.logging.level
            )
        }
    }

    fn is_filter_directive(&self) -> bool {
        self.logging.level.contains('=') || self.logging.level.contains(',')
    }
}

fn config_path_from(var: Option<OsString>) -> PathBuf {
    var.filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
