//! Shared configuration for the GoPark CLI.
//!
//! TOML file + environment layering via figment, translation to the runtime
//! types in `gopark-core`, and keyring-backed session storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use gopark_core::{FeedConfig, ReconnectPolicy, Session, TransportConfig, User};

const KEYRING_SERVICE: &str = "gopark";
const KEYRING_SESSION_USER: &str = "session";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("stored session is unreadable: {0}")]
    SessionFormat(#[from] serde_json::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Gate used when a command does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_gate: Option<String>,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub live: LiveSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiveSettings {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_ws_url() -> String {
    "ws://localhost:3000/api/v1/ws".into()
}
fn default_max_reconnect_attempts() -> u32 {
    3
}
fn default_reconnect_delay_ms() -> u64 {
    2000
}

// ── Translation to runtime types ────────────────────────────────────

impl Config {
    /// REST base URL, validated.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api.base_url).map_err(|e| ConfigError::Validation {
            field: "api.base_url".into(),
            reason: format!("{e}: {}", self.api.base_url),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Validation {
                field: "api.base_url".into(),
                reason: format!("expected http or https, got '{other}'"),
            }),
        }
    }

    /// Live feed URL, validated.
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.live.ws_url).map_err(|e| ConfigError::Validation {
            field: "live.ws_url".into(),
            reason: format!("{e}: {}", self.live.ws_url),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConfigError::Validation {
                field: "live.ws_url".into(),
                reason: format!("expected ws or wss, got '{other}'"),
            }),
        }
    }

    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.api.timeout_secs),
            ..TransportConfig::default()
        }
    }

    pub fn to_feed_config(&self) -> Result<FeedConfig, ConfigError> {
        Ok(FeedConfig::new(self.ws_url()?).with_reconnect(ReconnectPolicy {
            max_attempts: self.live.max_reconnect_attempts,
            delay: Duration::from_millis(self.live.reconnect_delay_ms),
        }))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "gopark", "gopark").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gopark");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered providers: defaults, the TOML file at `path`, `GOPARK_*` env
/// vars (nested with `__`), then the `GOPARK_API_URL` / `GOPARK_WS_URL`
/// shortcuts.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GOPARK_").split("__"))
        .merge(
            Env::raw()
                .only(&["GOPARK_API_URL"])
                .map(|_| "api.base_url".into()),
        )
        .merge(
            Env::raw()
                .only(&["GOPARK_WS_URL"])
                .map(|_| "live.ws_url".into()),
        )
}

/// Load config from `path` + environment.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&config_path())
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

// ── Session storage ─────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct StoredSession {
    user: User,
    token: String,
}

fn session_entry() -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, KEYRING_SESSION_USER)?)
}

/// Persist the session (user + token) in the system keyring.
pub fn save_session(session: &Session) -> Result<(), ConfigError> {
    let stored = StoredSession {
        user: session.user.clone(),
        token: session.token.expose_secret().to_owned(),
    };
    session_entry()?.set_password(&serde_json::to_string(&stored)?)?;
    Ok(())
}

/// Restore the stored session, if any.
pub fn load_session() -> Result<Option<Session>, ConfigError> {
    let raw = match session_entry()?.get_password() {
        Ok(raw) => raw,
        Err(keyring::Error::NoEntry) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let stored: StoredSession = serde_json::from_str(&raw)?;
    Ok(Some(Session::new(
        stored.user,
        SecretString::from(stored.token),
    )))
}

/// Remove the stored session. Succeeds if none was stored.
pub fn clear_session() -> Result<(), ConfigError> {
    match session_entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_server() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "http://localhost:3000/api/v1");
        assert_eq!(cfg.api.timeout_secs, 20);
        assert_eq!(cfg.live.ws_url, "ws://localhost:3000/api/v1/ws");

        let feed = cfg.to_feed_config().unwrap();
        assert_eq!(feed.reconnect, ReconnectPolicy::default());
        assert_eq!(cfg.to_transport_config().timeout, Duration::from_secs(20));
    }

    #[test]
    fn file_overrides_only_what_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_gate = "gate_2"

[live]
ws_url = "wss://parking.example.com/api/v1/ws"
max_reconnect_attempts = 5
"#,
        )
        .unwrap();

        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap();

        assert_eq!(cfg.default_gate.as_deref(), Some("gate_2"));
        assert_eq!(cfg.live.max_reconnect_attempts, 5);
        assert_eq!(cfg.live.reconnect_delay_ms, 2000);
        assert_eq!(cfg.api.timeout_secs, 20);
        assert_eq!(cfg.ws_url().unwrap().scheme(), "wss");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.default_gate = Some("gate_1".into());
        cfg.api.timeout_secs = 7;
        save_to(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded.default_gate.as_deref(), Some("gate_1"));
        assert_eq!(loaded.api.timeout_secs, 7);
    }

    #[test]
    fn rejects_http_feed_url() {
        let mut cfg = Config::default();
        cfg.live.ws_url = "http://localhost:3000/api/v1/ws".into();
        let err = cfg.to_feed_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "live.ws_url"));
    }

    #[test]
    fn rejects_unparseable_api_url() {
        let mut cfg = Config::default();
        cfg.api.base_url = "not a url".into();
        assert!(cfg.api_url().is_err());
    }
}
