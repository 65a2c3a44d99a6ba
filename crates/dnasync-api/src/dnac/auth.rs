// DNA Center authentication
//
// Token-based: HTTP basic credentials are exchanged for a session token,
// which every later intent API request carries in `X-Auth-Token`.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::client::{DnacClient, handle_response};
use super::models::TokenResponse;
use crate::error::Error;

/// Path of the token issuing endpoint, relative to the controller root.
pub const TOKEN_PATH: &str = "dna/system/api/v1/auth/token";

impl DnacClient {
    /// Exchange username/password for a session token.
    ///
    /// `POST /dna/system/api/v1/auth/token` with basic auth returns
    /// `{"Token": "..."}`. A 401 is reported as [`Error::Authentication`].
    pub async fn request_token(
        http: &reqwest::Client,
        base_url: &Url,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, Error> {
        let url = base_url.join(TOKEN_PATH)?;
        debug!("requesting token at {url}");

        let resp = http
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let token: TokenResponse = handle_response(resp).await?;
        if token.token.is_empty() {
            return Err(Error::Authentication {
                message: "controller returned an empty token".into(),
            });
        }

        debug!("token issued");
        Ok(SecretString::from(token.token))
    }
}
