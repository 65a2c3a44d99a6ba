//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use dnasync_config::ConfigError;
use dnasync_core::{CoreError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(dnasync::connection_failed),
        help(
            "Check that the host is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(dnasync::auth_failed),
        help("Verify the controller credentials or the NetBox API token.")
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for '{target}'")]
    #[diagnostic(
        code(dnasync::no_credentials),
        help(
            "Set `password` / `token` in the config file, name an env var with\n\
             `password_env` / `token_env`, or store it in the system keyring\n\
             under service `dnasync`."
        )
    )]
    NoCredentials { target: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(dnasync::not_found),
        help("Run: dnasync {list_command}")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Conflict: {message}")]
    #[diagnostic(code(dnasync::conflict))]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(dnasync::api_error))]
    ApiError { message: String },

    // ── Sync ─────────────────────────────────────────────────────────
    #[error("Sync finished with {failures} problem(s)")]
    #[diagnostic(
        code(dnasync::sync_incomplete),
        help("See the report above; rerun after fixing the listed tenants or devices.")
    )]
    SyncIncomplete { failures: usize },

    #[error("Job {id} {status}: {message}")]
    #[diagnostic(code(dnasync::job_failed))]
    JobFailed {
        id: String,
        status: String,
        message: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dnasync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found")]
    #[diagnostic(
        code(dnasync::no_config),
        help(
            "Create one, or point at one with --config.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No NetBox destination configured")]
    #[diagnostic(
        code(dnasync::no_destination),
        help("Add a [destination] section with `url` and `token`, or use --dry-run.")
    )]
    NoDestination,

    #[error("Configuration error: {message}")]
    #[diagnostic(code(dnasync::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dnasync::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(dnasync::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let list_command = match entity_type.as_str() {
                    "Tenant" => "status",
                    "Site" => "sites list",
                    _ => "--help",
                };
                Self::NotFound {
                    resource_type: entity_type,
                    identifier,
                    list_command: list_command.into(),
                }
            }

            CoreError::Store(StoreError::Conflict { kind, message }) => Self::Conflict {
                message: format!("{kind}: {message}"),
            },

            CoreError::Store(StoreError::NotFound { kind, key }) => Self::NotFound {
                resource_type: kind.to_string(),
                identifier: key,
                list_command: "status".into(),
            },

            CoreError::Store(StoreError::Backend(e)) => CoreError::from(e).into(),

            CoreError::Mapping { what, message } => Self::Validation {
                field: what,
                reason: message,
            },

            CoreError::Api { message, .. } => Self::ApiError { message },

            CoreError::Config { message } => Self::Config { message },

            CoreError::Internal(message) => Self::ApiError {
                message: format!("internal: {message}"),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { target } => Self::NoCredentials { target },
            ConfigError::NoDestination => Self::NoDestination,
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let not_found: CliError = CoreError::not_found("Tenant", "42").into();
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let auth: CliError = CoreError::AuthenticationFailed {
            message: "bad password".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let conflict: CliError = CoreError::Store(StoreError::Conflict {
            kind: dnasync_core::EntityKind::Site,
            message: "still referenced".into(),
        })
        .into();
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let missing: CliError = ConfigError::NoDestination.into();
        assert_eq!(missing.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn tenant_not_found_points_at_status() {
        let err: CliError = CoreError::not_found("Tenant", "7").into();
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "status"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
