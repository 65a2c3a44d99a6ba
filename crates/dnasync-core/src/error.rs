// ── Core error types ──
//
// Domain-facing errors from dnasync-core. Consumers never see raw HTTP
// status codes or JSON parse failures; `From<dnasync_api::Error>` maps
// transport-layer errors into domain variants. Destination-store failures
// carry their own `StoreError` so the reconciler can capture them per
// record instead of aborting a run.

use thiserror::Error;

use crate::model::EntityKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Cannot map {what}: {message}")]
    Mapping { what: String, message: String },

    // ── Destination errors ───────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),

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

impl CoreError {
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }
}

/// Failure reported by a destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    /// Uniqueness or referential-integrity violation.
    #[error("{kind} conflict: {message}")]
    Conflict { kind: EntityKind, message: String },

    #[error("Destination backend error: {0}")]
    Backend(#[from] dnasync_api::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Backend(e) => e.is_not_found(),
            Self::Conflict { .. } => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dnasync_api::Error> for CoreError {
    fn from(err: dnasync_api::Error) -> Self {
        match err {
            dnasync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            dnasync_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            dnasync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dnasync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            dnasync_api::Error::Dnac { status, message }
            | dnasync_api::Error::NetBox { status, message } => {
                if status == 401 || status == 403 {
                    CoreError::AuthenticationFailed { message }
                } else if status == 404 {
                    CoreError::NotFound {
                        entity_type: "resource".into(),
                        identifier: message,
                    }
                } else {
                    CoreError::Api {
                        message,
                        status: Some(status),
                    }
                }
            }
            dnasync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_maps_to_authentication_failed() {
        let err: CoreError = dnasync_api::Error::Dnac {
            status: 401,
            message: "bad token".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn server_error_keeps_status() {
        let err: CoreError = dnasync_api::Error::NetBox {
            status: 503,
            message: "maintenance".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(503), .. }));
    }

    #[test]
    fn store_not_found_is_detected() {
        let err = StoreError::NotFound {
            kind: EntityKind::Site,
            key: "abc".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "site not found: abc");
    }
}
