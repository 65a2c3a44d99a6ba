// DNA Center response types
//
// Wire models for the intent API. Fields use `#[serde(default)]` liberally
// because DNA Center omits or nulls attributes depending on device family
// and software release.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Envelope ─────────────────────────────────────────────────────────

/// Standard intent API envelope: `{ "response": ..., "version": "1.0" }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
    #[serde(default)]
    pub version: Option<String>,
}

/// Body returned by `POST /dna/system/api/v1/auth/token`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "Token")]
    pub token: String,
}

/// Error body shape used by most intent endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub response: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

// ── Site ─────────────────────────────────────────────────────────────

/// Site object from `GET /dna/intent/api/v1/site`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnacSite {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site_name_hierarchy: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub additional_info: Vec<AdditionalInfo>,
}

/// One namespaced attribute bag attached to a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    #[serde(default)]
    pub name_space: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl AdditionalInfo {
    /// Read an attribute as text. Numbers are rendered, nulls and
    /// empty strings are treated as absent.
    pub fn attribute(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl DnacSite {
    /// The `Location` namespace entry, if the site carries one.
    pub fn location(&self) -> Option<&AdditionalInfo> {
        self.additional_info
            .iter()
            .find(|info| info.name_space.contains("Location"))
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// Network device from `GET /dna/intent/api/v1/network-device`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnacDevice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub management_ip_address: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub reachability_status: Option<String>,
    #[serde(default)]
    pub device_support_level: Option<String>,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
}

// ── Membership ───────────────────────────────────────────────────────

/// Body of `GET /dna/intent/api/v1/membership/{siteId}`.
///
/// Devices are grouped; each group carries its own `response` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Membership {
    #[serde(default)]
    pub device: Option<Vec<MembershipGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipGroup {
    #[serde(default)]
    pub response: Vec<DnacDevice>,
    #[serde(default)]
    pub site_id: Option<String>,
}

impl Membership {
    /// Iterate every device across all membership groups.
    pub fn devices(&self) -> impl Iterator<Item = &DnacDevice> {
        self.device
            .iter()
            .flatten()
            .flat_map(|group| group.response.iter())
    }
}
