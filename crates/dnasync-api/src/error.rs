use thiserror::Error;

/// Top-level error type for the `dnasync-api` crate.
///
/// Covers every failure mode across both API surfaces: authentication,
/// transport, DNA Center intent API, NetBox REST API and payload decoding.
/// `dnasync-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token request rejected (wrong credentials, locked account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── DNA Center ──────────────────────────────────────────────────
    /// Non-success response from the DNA Center intent API.
    #[error("DNA Center API error (HTTP {status}): {message}")]
    Dnac { status: u16, message: String },

    // ── NetBox ──────────────────────────────────────────────────────
    /// Non-success response from the NetBox REST API.
    #[error("NetBox API error (HTTP {status}): {message}")]
    NetBox { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the remote side rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Dnac { status, .. } | Self::NetBox { status, .. } => {
                *status == 401 || *status == 403
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Dnac { status, .. } | Self::NetBox { status, .. } => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Dnac { status: 404, .. } | Self::NetBox { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Build a `Deserialization` error carrying a short preview of the body.
    pub(crate) fn decode(err: &serde_json::Error, body: String) -> Self {
        let preview = body
            .char_indices()
            .nth(200)
            .map_or(body.as_str(), |(idx, _)| &body[..idx]);
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body,
        }
    }
}
