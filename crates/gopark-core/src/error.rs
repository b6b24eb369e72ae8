// ── Core error types ──
//
// User-facing errors from gopark-core. Consumers never see raw HTTP bodies
// or JSON parse failures; the `From<gopark_api::Error>` impl translates
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach GoPark server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {message}")]
    NotFound { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("No available slots: {message}")]
    NoAvailableSlots { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<gopark_api::Error> for CoreError {
    fn from(err: gopark_api::Error) -> Self {
        match err {
            gopark_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            gopark_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            gopark_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            gopark_api::Error::Api {
                status, message, ..
            } => match status {
                401 => CoreError::AuthenticationFailed { message },
                403 => CoreError::PermissionDenied { message },
                404 => CoreError::NotFound { message },
                409 => CoreError::NoAvailableSlots { message },
                _ => CoreError::Api {
                    message,
                    status: Some(status),
                },
            },
            gopark_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            gopark_api::Error::Decode(message) => {
                CoreError::Internal(format!("Malformed live message: {message}"))
            }
            gopark_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
