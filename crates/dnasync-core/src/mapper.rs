// ── Controller-to-destination mapping ──
//
// Pure functions, no I/O. Everything the reconciler derives from a remote
// site or device (names, slugs, statuses, drafts) goes through here.

use std::net::IpAddr;

use crate::error::CoreError;
use crate::model::{
    DeviceRoleDraft, DeviceTypeDraft, IpAddressDraft, ManufacturerDraft, RecordId, RecordStatus,
    RemoteDevice, RemoteSite, SiteDraft, TenantDraft,
};

/// Hierarchy name of the controller's root site.
pub const GLOBAL_SITE: &str = "Global";
/// Reachability value that maps to an active device.
pub const REACHABLE: &str = "Reachable";
/// Color given to device roles (material blue).
pub const ROLE_COLOR: &str = "2196f3";

// ── Primitives ───────────────────────────────────────────────────────

/// First whitespace-delimited token of a product type string.
///
/// `"Cisco Catalyst 9300 Switch"` → `"Cisco"`.
pub fn manufacturer_from_type(device_type: &str) -> String {
    device_type
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_owned()
}

/// Lowercase, with every run of whitespace or `/` collapsed to one hyphen.
///
/// `"Switches and Hubs"` → `"switches-and-hubs"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() || ch == '/' {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.extend(ch.to_lowercase());
    }
    slug
}

/// Reachable devices are active, everything else is failed.
pub fn device_status(reachability: &str) -> RecordStatus {
    if reachability == REACHABLE {
        RecordStatus::Active
    } else {
        RecordStatus::Failed
    }
}

/// Destination display name for a site.
///
/// Every controller reports its root as `Global`; the first segment of
/// the site id is appended so roots from different tenants stay distinct.
pub fn site_display_name(site: &RemoteSite) -> String {
    if site.hierarchy == GLOBAL_SITE {
        let suffix = site.id.split('-').next().unwrap_or_default();
        format!("{GLOBAL_SITE} {suffix}")
    } else {
        site.hierarchy.clone()
    }
}

/// Destination tenant slug: the hostname with dots replaced.
pub fn tenant_slug(hostname: &str) -> String {
    hostname.replace('.', "-")
}

/// `Managed by <hostname>`, stamped on every record a tenant writes.
pub fn managed_by(hostname: &str) -> String {
    format!("Managed by {hostname}")
}

/// Management address in host-prefix form: `/32` for IPv4, `/128` for IPv6.
pub fn host_prefix(address: &str) -> Result<String, CoreError> {
    let ip: IpAddr = address.trim().parse().map_err(|_| CoreError::Mapping {
        what: "management address".into(),
        message: format!("{address:?} is not an IP address"),
    })?;
    Ok(match ip {
        IpAddr::V4(v4) => format!("{v4}/32"),
        IpAddr::V6(v6) => format!("{v6}/128"),
    })
}

// ── Drafts ───────────────────────────────────────────────────────────

pub fn tenant_draft(hostname: &str) -> TenantDraft {
    TenantDraft {
        name: hostname.to_owned(),
        slug: tenant_slug(hostname),
        description: managed_by(hostname),
    }
}

pub fn site_draft(site: &RemoteSite, hostname: &str, tenant: RecordId) -> SiteDraft {
    let location = site.location.clone().unwrap_or_default();
    SiteDraft {
        name: site_display_name(site),
        slug: site.id.clone(),
        status: RecordStatus::Active,
        tenant: Some(tenant),
        physical_address: location.address,
        latitude: location.latitude,
        longitude: location.longitude,
        description: managed_by(hostname),
        comments: site.id.clone(),
    }
}

pub fn manufacturer_draft(device: &RemoteDevice, hostname: &str) -> ManufacturerDraft {
    let name = manufacturer_from_type(&device.device_type);
    ManufacturerDraft {
        slug: slugify(&name),
        name,
        description: managed_by(hostname),
    }
}

pub fn device_type_draft(
    device: &RemoteDevice,
    manufacturer: RecordId,
    hostname: &str,
) -> DeviceTypeDraft {
    DeviceTypeDraft {
        manufacturer,
        model: device.family.clone(),
        slug: slugify(&device.family),
        description: managed_by(hostname),
    }
}

pub fn device_role_draft(device: &RemoteDevice, hostname: &str) -> DeviceRoleDraft {
    DeviceRoleDraft {
        name: device.role.clone(),
        slug: slugify(&device.role),
        color: ROLE_COLOR.to_owned(),
        description: managed_by(hostname),
    }
}

pub fn ip_address_draft(
    device: &RemoteDevice,
    hostname: &str,
    tenant: RecordId,
) -> Result<IpAddressDraft, CoreError> {
    let raw = device
        .management_ip
        .as_deref()
        .ok_or_else(|| CoreError::Mapping {
            what: "management address".into(),
            message: format!("device {} reports none", device.serial),
        })?;

    Ok(IpAddressDraft {
        address: host_prefix(raw)?,
        dns_name: device.hostname.clone(),
        status: RecordStatus::Active,
        tenant: Some(tenant),
        description: managed_by(hostname),
    })
}
