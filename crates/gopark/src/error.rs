//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use gopark_config::ConfigError;
use gopark_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(gopark::connection_failed),
        help(
            "Check that the GoPark server is running and reachable.\n\
             Override the address with --api-url / --ws-url or: gopark config init"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(gopark::auth_failed),
        help("Check your username and password, then run: gopark login")
    )]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(code(gopark::not_logged_in), help("Run: gopark login"))]
    NotLoggedIn,

    #[error("{message}")]
    #[diagnostic(
        code(gopark::forbidden),
        help("This command needs an admin account.")
    )]
    Forbidden { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(gopark::not_found),
        help("Run: gopark gates / gopark zones --gate <id> to see what exists")
    )]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(gopark::no_slots),
        help("Pick another zone; `gopark zones` shows current availability.")
    )]
    NoAvailableSlots { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(gopark::api_error))]
    ApiError { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gopark::validation))]
    Validation { field: String, reason: String },

    #[error("No gate selected")]
    #[diagnostic(
        code(gopark::no_gate),
        help("Pass --gate <id> or set default_gate with: gopark config init")
    )]
    NoGate,

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(gopark::config),
        help("Inspect the effective settings with: gopark config show")
    )]
    Config { message: String },

    #[error("Could not access the system keyring: {message}")]
    #[diagnostic(
        code(gopark::keyring),
        help("Session storage needs a running secret service (or macOS Keychain / Windows Credential Manager).")
    )]
    Keyring { message: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(gopark::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Internal / IO / Serialization ────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(gopark::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(gopark::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NoAvailableSlots { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoGate => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::PermissionDenied { message } => Self::Forbidden { message },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::NotAuthenticated => Self::NotLoggedIn,

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound { message } => Self::NotFound { message },
            CoreError::NoAvailableSlots { message } => Self::NoAvailableSlots { message },

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, status } => Self::ApiError { message, status },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::NotAuthenticated, exit_code::AUTH),
            (
                CoreError::NoAvailableSlots {
                    message: "zone_a has no free slots".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::NotFound {
                    message: "Ticket not found".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (CoreError::Timeout { timeout_secs: 20 }, exit_code::TIMEOUT),
            (
                CoreError::PermissionDenied {
                    message: "emp1 is not an admin".into(),
                },
                exit_code::PERMISSION,
            ),
            (
                CoreError::Api {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn api_error_shows_status_when_known() {
        let with = CliError::ApiError {
            message: "boom".into(),
            status: Some(500),
        };
        let without = CliError::ApiError {
            message: "boom".into(),
            status: None,
        };
        assert_eq!(with.to_string(), "API error (500): boom");
        assert_eq!(without.to_string(), "API error: boom");
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "live.ws_url".into(),
            reason: "expected ws or wss, got 'http'".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
