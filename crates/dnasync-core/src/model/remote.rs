// ── Controller-side inventory ──

use serde::{Deserialize, Serialize};

/// Support level a device must report to take part in sync.
pub const SUPPORTED_LEVEL: &str = "Supported";

/// Postal and geographic attributes from a site's `Location` namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `area`, `building` or `floor`.
    pub location_type: Option<String>,
    pub country: Option<String>,
}

/// A site from the controller's network design hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSite {
    /// Controller-assigned UUID; stable across renames.
    pub id: String,
    pub name: String,
    /// Slash-separated path, e.g. `Global/France/Paris`.
    pub hierarchy: String,
    pub location: Option<Location>,
}

/// A device from the controller inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDevice {
    pub serial: String,
    pub hostname: String,
    pub management_ip: Option<String>,
    /// Device family, used as the destination device-type model.
    pub family: String,
    /// Full product type, e.g. `Cisco Catalyst 9300 Switch`.
    pub device_type: String,
    pub role: String,
    pub reachability: String,
    pub support_level: String,
    pub platform: Option<String>,
    pub software_version: Option<String>,
}

impl RemoteDevice {
    pub fn is_supported(&self) -> bool {
        self.support_level == SUPPORTED_LEVEL
    }
}
