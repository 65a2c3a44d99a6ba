// NetBox wire models
//
// Read types mirror the brief/nested representations NetBox returns.
// Write types serialize only the fields that are set, so the same struct
// serves POST (create) and PATCH (partial update).

use serde::{Deserialize, Serialize};

// ── Endpoints ────────────────────────────────────────────────────────

pub mod endpoint {
    pub const TAGS: &str = "extras/tags/";
    pub const TENANTS: &str = "tenancy/tenants/";
    pub const SITES: &str = "dcim/sites/";
    pub const MANUFACTURERS: &str = "dcim/manufacturers/";
    pub const DEVICE_TYPES: &str = "dcim/device-types/";
    pub const DEVICE_ROLES: &str = "dcim/device-roles/";
    pub const DEVICES: &str = "dcim/devices/";
    pub const IP_ADDRESSES: &str = "ipam/ip-addresses/";
}

// ── Shared shapes ────────────────────────────────────────────────────

/// Paginated list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Brief representation of a related object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedTag {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub slug: String,
}

/// Choice field: `{"value": "active", "label": "Active"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChoice {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

/// Tag reference accepted on writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRef {
    pub slug: String,
}

impl TagRef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }
}

// ── Read types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NbTag {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbTenant {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbSite {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub status: Option<StatusChoice>,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub physical_address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbManufacturer {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbDeviceType {
    pub id: u64,
    pub manufacturer: NestedRef,
    pub model: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbDeviceRole {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbIpAddress {
    pub id: u64,
    pub address: String,
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub status: Option<StatusChoice>,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbDevice {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial: String,
    pub device_type: NestedRef,
    /// `role` since NetBox 3.6, `device_role` before.
    #[serde(alias = "device_role")]
    pub role: NestedRef,
    pub site: NestedRef,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<StatusChoice>,
    #[serde(default)]
    pub primary_ip4: Option<NestedRef>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

// ── Write types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct TagWrite {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TenantWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ManufacturerWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceTypeWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceRoleWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IpAddressWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

/// Body used to replace an object's tag list.
#[derive(Debug, Clone, Serialize)]
pub struct TagsPatch {
    pub tags: Vec<TagRef>,
}
