// ── API-to-domain type conversions ──
//
// Bridges raw `dnasync_api::dnac` response types into the controller-side
// domain model. Missing optional data becomes empty strings or `None`;
// coordinates are parsed from the string attributes DNA Center reports.

use dnasync_api::dnac::models::{AdditionalInfo, DnacDevice, DnacSite};

use crate::model::{Location, RemoteDevice, RemoteSite};

/// Decimal places NetBox stores for latitude/longitude.
const COORDINATE_SCALE: f64 = 1_000_000.0;

fn parse_coordinate(raw: Option<String>) -> Option<f64> {
    let value: f64 = raw?.trim().parse().ok()?;
    value
        .is_finite()
        .then(|| (value * COORDINATE_SCALE).round() / COORDINATE_SCALE)
}

impl From<&AdditionalInfo> for Location {
    fn from(info: &AdditionalInfo) -> Self {
        Self {
            address: info.attribute("address"),
            latitude: parse_coordinate(info.attribute("latitude")),
            longitude: parse_coordinate(info.attribute("longitude")),
            location_type: info.attribute("type"),
            country: info.attribute("country"),
        }
    }
}

impl From<DnacSite> for RemoteSite {
    fn from(site: DnacSite) -> Self {
        let location = site.location().map(Location::from);
        Self {
            id: site.id,
            name: site.name,
            hierarchy: site.site_name_hierarchy,
            location,
        }
    }
}

impl From<DnacDevice> for RemoteDevice {
    fn from(device: DnacDevice) -> Self {
        Self {
            serial: device.serial_number.unwrap_or_default(),
            hostname: device.hostname.unwrap_or_default(),
            management_ip: device.management_ip_address.filter(|ip| !ip.is_empty()),
            family: device.family.unwrap_or_default(),
            device_type: device.device_type.unwrap_or_default(),
            role: device.role.unwrap_or_default(),
            reachability: device.reachability_status.unwrap_or_default(),
            support_level: device.device_support_level.unwrap_or_default(),
            platform: device.platform_id,
            software_version: device.software_version,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_location_is_extracted() {
        let site: DnacSite = serde_json::from_value(json!({
            "id": "abc-123",
            "name": "Paris",
            "siteNameHierarchy": "Global/France/Paris",
            "additionalInfo": [
                { "nameSpace": "System Settings", "attributes": {} },
                { "nameSpace": "Location", "attributes": {
                    "address": "1 Rue de Rivoli",
                    "latitude": "48.8566141",
                    "longitude": "2.3522219",
                    "type": "building",
                    "country": "France"
                }}
            ]
        }))
        .unwrap();

        let remote = RemoteSite::from(site);
        let location = remote.location.unwrap();
        assert_eq!(location.latitude, Some(48.856_614));
        assert_eq!(location.longitude, Some(2.352_222));
        assert_eq!(location.location_type.as_deref(), Some("building"));
    }

    #[test]
    fn site_without_location_has_none() {
        let site: DnacSite = serde_json::from_value(json!({
            "id": "abc-123",
            "name": "Global",
            "siteNameHierarchy": "Global"
        }))
        .unwrap();
        assert!(RemoteSite::from(site).location.is_none());
    }

    #[test]
    fn garbage_coordinates_are_dropped() {
        assert_eq!(parse_coordinate(Some("north".into())), None);
        assert_eq!(parse_coordinate(Some("NaN".into())), None);
        assert_eq!(parse_coordinate(None), None);
    }

    #[test]
    fn device_defaults_missing_fields() {
        let device: DnacDevice = serde_json::from_value(json!({
            "serialNumber": "SN1",
            "managementIpAddress": ""
        }))
        .unwrap();
        let remote = RemoteDevice::from(device);
        assert_eq!(remote.serial, "SN1");
        assert!(remote.management_ip.is_none());
        assert!(!remote.is_supported());
    }
}
