// DNA Center HTTP client
//
// Wraps `reqwest::Client` with intent API URL construction, envelope
// unwrapping and error translation. Endpoint groups (sites, devices) are
// implemented as inherent methods in sibling files to keep this module
// focused on transport mechanics.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{Envelope, ErrorResponse};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the session token on every intent API request.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Async client for one DNA Center controller.
///
/// Built from a session token; [`login`](Self::login) obtains the token
/// first. All public methods return the unwrapped `response` payload.
pub struct DnacClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DnacClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Authenticate with username/password and return a ready client.
    ///
    /// Requests a token from `/dna/system/api/v1/auth/token`, then builds
    /// an HTTP client that injects it as `X-Auth-Token`.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let http = transport.build_client()?;
        let token = Self::request_token(&http, &base_url, username, password).await?;
        Self::from_parts(base_url, &token, transport)
    }

    /// Build a client from an already issued session token.
    pub fn with_token(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Self::from_parts(base_url, token, transport)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    fn from_parts(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value =
            HeaderValue::from_str(token.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTH_TOKEN_HEADER, value);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self { http, base_url })
    }

    /// Parse the controller root and make sure it ends with `/` so that
    /// relative joins keep any path prefix.
    pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the `{ response }` envelope.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        let envelope: Envelope<T> = handle_response(resp).await?;
        Ok(envelope.response)
    }

    /// Send a GET request for an endpoint that is not wrapped in an envelope.
    pub(crate) async fn get_raw<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::decode(&e, body))
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: format!("token rejected (HTTP {status})"),
        };
    }

    let message = serde_json::from_str::<ErrorResponse>(&raw)
        .ok()
        .and_then(|err| {
            let detail = err.response.and_then(|r| {
                r.detail
                    .or(r.message)
                    .map(|msg| match r.error_code {
                        Some(code) => format!("{code}: {msg}"),
                        None => msg,
                    })
            });
            detail.or(err.detail).or(err.message)
        })
        .unwrap_or_else(|| {
            if raw.is_empty() {
                status.to_string()
            } else {
                raw
            }
        });

    Error::Dnac {
        status: status.as_u16(),
        message,
    }
}
