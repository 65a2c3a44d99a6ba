// Async HTTP client for the NetBox REST API.
//
// List endpoints are paginated with `limit`/`offset` and return a `next`
// URL; `list` follows it until exhausted. Writes use POST for creates and
// PATCH for partial updates.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::Page;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Default page size requested from list endpoints.
pub const DEFAULT_PAGE_SIZE: usize = 500;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one NetBox instance.
pub struct NetBoxClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: usize,
}

impl NetBoxClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API token; injects `Authorization: Token ...` on
    /// every request.
    pub fn from_token(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size used by [`list`](Self::list).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// `https://netbox.example.com` becomes `https://netbox.example.com/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an endpoint such as `"dcim/sites/"` onto the API root.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn object_url(&self, endpoint: &str, id: u64) -> Result<Url, Error> {
        self.url(&format!("{}/{id}/", endpoint.trim_end_matches('/')))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// Fetch every object matching `params`, following `next` links.
    pub async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let mut url = self.url(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("limit", &self.page_size.to_string());
        }

        let mut all = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            debug!("GET {url}");
            let resp = self.http.get(url).send().await?;
            let page: Page<T> = handle_response(resp).await?;
            all.extend(page.results);
            next = page.next.as_deref().map(Url::parse).transpose()?;
        }

        Ok(all)
    }

    /// First object matching `params`, if any.
    pub async fn find<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let url = self.url(endpoint)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        let page: Page<T> = handle_response(resp).await?;
        Ok(page.results.into_iter().next())
    }

    /// Number of objects matching `params` (`?limit=1`, reads `count`).
    pub async fn count(&self, endpoint: &str, params: &[(&str, String)]) -> Result<u64, Error> {
        let url = self.url(endpoint)?;
        debug!("GET {url} (count) params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .query(&[("limit", "1")])
            .send()
            .await?;
        let page: Page<serde_json::Value> = handle_response(resp).await?;
        Ok(page.count)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, id: u64) -> Result<T, Error> {
        let url = self.object_url(endpoint, id)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(endpoint)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// Partial update: only fields present in `body` are changed.
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        id: u64,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.object_url(endpoint, id)?;
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        handle_response(resp).await
    }

    pub async fn delete(&self, endpoint: &str, id: u64) -> Result<(), Error> {
        let url = self.object_url(endpoint, id)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_error(status, resp).await)
        }
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::decode(&e, body))
}

/// NetBox errors come back as `{"detail": "..."}` or as a field map
/// (`{"slug": ["site with this slug already exists."]}`).
async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Error::Authentication {
            message: format!("NetBox rejected the token (HTTP {status})"),
        };
    }

    let message = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => {
            if let Some(detail) = map.get("detail").and_then(serde_json::Value::as_str) {
                detail.to_owned()
            } else {
                map.iter()
                    .map(|(field, errors)| format!("{field}: {}", flatten_errors(errors)))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
        _ if raw.is_empty() => status.to_string(),
        _ => raw,
    };

    Error::NetBox {
        status: status.as_u16(),
        message,
    }
}

fn flatten_errors(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_errors)
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_api_suffix() {
        let client =
            NetBoxClient::from_reqwest("https://netbox.example.com", reqwest::Client::new())
                .unwrap();
        assert_eq!(client.base_url().as_str(), "https://netbox.example.com/api/");
    }

    #[test]
    fn base_url_keeps_existing_api_suffix() {
        let client =
            NetBoxClient::from_reqwest("https://nb.example.com/netbox/api/", reqwest::Client::new())
                .unwrap();
        assert_eq!(client.base_url().as_str(), "https://nb.example.com/netbox/api/");
    }

    #[test]
    fn field_errors_are_flattened() {
        let value = serde_json::json!(["a", ["b", "c"]]);
        assert_eq!(flatten_errors(&value), "a, b, c");
    }
}
