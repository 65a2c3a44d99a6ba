// ── Destination inventory records ──
//
// Each record kind pairs a stored shape (`*Record`) with the attributes the
// reconciler writes (`*Draft`). Optional draft fields mean "leave as is",
// so an update only touches what the controller actually reported.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::store::Record;

/// Destination-side primary key.
pub type RecordId = u64;

/// Record kinds managed in the destination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Tag,
    Tenant,
    Site,
    Manufacturer,
    DeviceType,
    DeviceRole,
    IpAddress,
    Device,
}

/// Operational status stored on sites, devices and IP addresses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Failed,
    Offline,
    Planned,
    Unknown,
}

impl RecordStatus {
    /// Parse a backend status value; anything unrecognized becomes `Unknown`.
    pub fn from_value(value: &str) -> Self {
        value.parse().unwrap_or(Self::Unknown)
    }

    /// Presentation hint used by report rows.
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "success",
            Self::Failed => "danger",
            Self::Offline | Self::Planned => "warning",
            Self::Unknown => "secondary",
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// `true` when the draft sets an optional field to something new.
/// `None` in the draft means "leave as is" and never counts as a change.
fn overrides<T: PartialEq>(stored: Option<&T>, wanted: Option<&T>) -> bool {
    wanted.is_some_and(|w| stored != Some(w))
}

fn insert_slug(tags: &mut Vec<String>, slug: &str) -> bool {
    if tags.iter().any(|t| t == slug) {
        return false;
    }
    tags.push(slug.to_owned());
    tags.sort();
    true
}

// ── Tag ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
}

impl Record for TagRecord {
    const KIND: EntityKind = EntityKind::Tag;
    type Key = String;
    type Draft = TagDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn draft_key(draft: &TagDraft) -> String {
        draft.slug.clone()
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn matches(&self, draft: &TagDraft) -> bool {
        self.name == draft.name
            && self.color == draft.color
            && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: TagDraft) -> Self {
        Self {
            id,
            name: draft.name,
            slug: draft.slug,
            color: draft.color,
            description: draft.description,
        }
    }

    fn apply(&mut self, draft: TagDraft) {
        self.name = draft.name;
        self.color = draft.color;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, _slug: &str) -> bool {
        false
    }
}

// ── Tenant ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRecord {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Record for TenantRecord {
    const KIND: EntityKind = EntityKind::Tenant;
    type Key = String;
    type Draft = TenantDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn draft_key(draft: &TenantDraft) -> String {
        draft.name.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn matches(&self, draft: &TenantDraft) -> bool {
        self.slug == draft.slug && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: TenantDraft) -> Self {
        Self {
            id,
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
            created: Some(Utc::now()),
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: TenantDraft) {
        self.slug = draft.slug;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── Site ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    pub status: RecordStatus,
    pub tenant: Option<RecordId>,
    pub physical_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub comments: String,
    pub tags: Vec<String>,
}

/// Site attributes. The address and coordinates are optional: `None`
/// leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDraft {
    pub name: String,
    pub slug: String,
    pub status: RecordStatus,
    pub tenant: Option<RecordId>,
    pub physical_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub comments: String,
}

impl SiteRecord {
    /// `true` when any optional location attribute in `draft` differs.
    pub fn location_differs(&self, draft: &SiteDraft) -> bool {
        overrides(self.physical_address.as_ref(), draft.physical_address.as_ref())
            || overrides(self.latitude.as_ref(), draft.latitude.as_ref())
            || overrides(self.longitude.as_ref(), draft.longitude.as_ref())
    }
}

impl Record for SiteRecord {
    const KIND: EntityKind = EntityKind::Site;
    type Key = String;
    type Draft = SiteDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn draft_key(draft: &SiteDraft) -> String {
        draft.slug.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn tenant(&self) -> Option<RecordId> {
        self.tenant
    }

    fn matches(&self, draft: &SiteDraft) -> bool {
        self.name == draft.name
            && self.status == draft.status
            && self.tenant == draft.tenant
            && self.description == draft.description
            && self.comments == draft.comments
            && !self.location_differs(draft)
    }

    fn from_draft(id: RecordId, draft: SiteDraft) -> Self {
        Self {
            id,
            name: draft.name,
            slug: draft.slug,
            status: draft.status,
            tenant: draft.tenant,
            physical_address: draft.physical_address,
            latitude: draft.latitude,
            longitude: draft.longitude,
            description: draft.description,
            comments: draft.comments,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: SiteDraft) {
        self.name = draft.name;
        self.status = draft.status;
        self.tenant = draft.tenant;
        self.description = draft.description;
        self.comments = draft.comments;
        if draft.physical_address.is_some() {
            self.physical_address = draft.physical_address;
        }
        if draft.latitude.is_some() {
            self.latitude = draft.latitude;
        }
        if draft.longitude.is_some() {
            self.longitude = draft.longitude;
        }
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── Manufacturer ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManufacturerRecord {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Record for ManufacturerRecord {
    const KIND: EntityKind = EntityKind::Manufacturer;
    type Key = String;
    type Draft = ManufacturerDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn draft_key(draft: &ManufacturerDraft) -> String {
        draft.name.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn matches(&self, draft: &ManufacturerDraft) -> bool {
        self.slug == draft.slug && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: ManufacturerDraft) -> Self {
        Self {
            id,
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: ManufacturerDraft) {
        self.slug = draft.slug;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── Device type ──────────────────────────────────────────────────────

/// Device types are unique per manufacturer and model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceTypeKey {
    pub manufacturer: RecordId,
    pub model: String,
}

impl fmt::Display for DeviceTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (manufacturer {})", self.model, self.manufacturer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceTypeRecord {
    pub id: RecordId,
    pub manufacturer: RecordId,
    pub model: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTypeDraft {
    pub manufacturer: RecordId,
    pub model: String,
    pub slug: String,
    pub description: String,
}

impl Record for DeviceTypeRecord {
    const KIND: EntityKind = EntityKind::DeviceType;
    type Key = DeviceTypeKey;
    type Draft = DeviceTypeDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> DeviceTypeKey {
        DeviceTypeKey {
            manufacturer: self.manufacturer,
            model: self.model.clone(),
        }
    }

    fn draft_key(draft: &DeviceTypeDraft) -> DeviceTypeKey {
        DeviceTypeKey {
            manufacturer: draft.manufacturer,
            model: draft.model.clone(),
        }
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn matches(&self, draft: &DeviceTypeDraft) -> bool {
        self.slug == draft.slug && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: DeviceTypeDraft) -> Self {
        Self {
            id,
            manufacturer: draft.manufacturer,
            model: draft.model,
            slug: draft.slug,
            description: draft.description,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: DeviceTypeDraft) {
        self.slug = draft.slug;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── Device role ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRoleRecord {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRoleDraft {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
}

impl Record for DeviceRoleRecord {
    const KIND: EntityKind = EntityKind::DeviceRole;
    type Key = String;
    type Draft = DeviceRoleDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn draft_key(draft: &DeviceRoleDraft) -> String {
        draft.name.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn matches(&self, draft: &DeviceRoleDraft) -> bool {
        self.slug == draft.slug
            && self.color == draft.color
            && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: DeviceRoleDraft) -> Self {
        Self {
            id,
            name: draft.name,
            slug: draft.slug,
            color: draft.color,
            description: draft.description,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: DeviceRoleDraft) {
        self.slug = draft.slug;
        self.color = draft.color;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── IP address ───────────────────────────────────────────────────────

/// IP addresses are unique per destination tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpKey {
    /// Host-prefix form, e.g. `10.0.0.1/32`.
    pub address: String,
    pub tenant: Option<RecordId>,
}

impl fmt::Display for IpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tenant {
            Some(tenant) => write!(f, "{} (tenant {tenant})", self.address),
            None => f.write_str(&self.address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpAddressRecord {
    pub id: RecordId,
    pub address: String,
    pub dns_name: String,
    pub status: RecordStatus,
    pub tenant: Option<RecordId>,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddressDraft {
    pub address: String,
    pub dns_name: String,
    pub status: RecordStatus,
    pub tenant: Option<RecordId>,
    pub description: String,
}

impl Record for IpAddressRecord {
    const KIND: EntityKind = EntityKind::IpAddress;
    type Key = IpKey;
    type Draft = IpAddressDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> IpKey {
        IpKey {
            address: self.address.clone(),
            tenant: self.tenant,
        }
    }

    fn draft_key(draft: &IpAddressDraft) -> IpKey {
        IpKey {
            address: draft.address.clone(),
            tenant: draft.tenant,
        }
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn tenant(&self) -> Option<RecordId> {
        self.tenant
    }

    fn matches(&self, draft: &IpAddressDraft) -> bool {
        self.dns_name == draft.dns_name
            && self.status == draft.status
            && self.description == draft.description
    }

    fn from_draft(id: RecordId, draft: IpAddressDraft) -> Self {
        Self {
            id,
            address: draft.address,
            dns_name: draft.dns_name,
            status: draft.status,
            tenant: draft.tenant,
            description: draft.description,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: IpAddressDraft) {
        self.dns_name = draft.dns_name;
        self.status = draft.status;
        self.description = draft.description;
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

// ── Device ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub id: RecordId,
    pub name: String,
    pub serial: String,
    pub device_type: RecordId,
    pub role: RecordId,
    pub site: RecordId,
    pub tenant: Option<RecordId>,
    pub status: RecordStatus,
    pub primary_ip: Option<RecordId>,
    pub comments: String,
    pub tags: Vec<String>,
}

/// Device attributes. `primary_ip: None` leaves the current assignment
/// alone; this is how a conflicting address is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDraft {
    pub name: String,
    pub serial: String,
    pub device_type: RecordId,
    pub role: RecordId,
    pub site: RecordId,
    pub tenant: Option<RecordId>,
    pub status: RecordStatus,
    pub primary_ip: Option<RecordId>,
    pub comments: String,
}

impl Record for DeviceRecord {
    const KIND: EntityKind = EntityKind::Device;
    type Key = String;
    type Draft = DeviceDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.serial.clone()
    }

    fn draft_key(draft: &DeviceDraft) -> String {
        draft.serial.clone()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn tenant(&self) -> Option<RecordId> {
        self.tenant
    }

    fn primary_ip(&self) -> Option<RecordId> {
        self.primary_ip
    }

    fn matches(&self, draft: &DeviceDraft) -> bool {
        self.name == draft.name
            && self.device_type == draft.device_type
            && self.role == draft.role
            && self.site == draft.site
            && self.tenant == draft.tenant
            && self.status == draft.status
            && self.comments == draft.comments
            && !overrides(self.primary_ip.as_ref(), draft.primary_ip.as_ref())
    }

    fn from_draft(id: RecordId, draft: DeviceDraft) -> Self {
        Self {
            id,
            name: draft.name,
            serial: draft.serial,
            device_type: draft.device_type,
            role: draft.role,
            site: draft.site,
            tenant: draft.tenant,
            status: draft.status,
            primary_ip: draft.primary_ip,
            comments: draft.comments,
            tags: Vec::new(),
        }
    }

    fn apply(&mut self, draft: DeviceDraft) {
        self.name = draft.name;
        self.device_type = draft.device_type;
        self.role = draft.role;
        self.site = draft.site;
        self.tenant = draft.tenant;
        self.status = draft.status;
        self.comments = draft.comments;
        if draft.primary_ip.is_some() {
            self.primary_ip = draft.primary_ip;
        }
    }

    fn insert_tag(&mut self, slug: &str) -> bool {
        insert_slug(&mut self.tags, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_draft() -> SiteDraft {
        SiteDraft {
            name: "Global/France/Paris".into(),
            slug: "site-1".into(),
            status: RecordStatus::Active,
            tenant: Some(1),
            physical_address: None,
            latitude: Some(48.85),
            longitude: None,
            description: "Managed by dnac1".into(),
            comments: "site-1".into(),
        }
    }

    #[test]
    fn absent_location_fields_do_not_count_as_changes() {
        let mut site = SiteRecord::from_draft(7, site_draft());
        site.physical_address = Some("1 Rue de Rivoli".into());
        site.longitude = Some(2.35);

        assert!(site.matches(&site_draft()));

        let mut moved = site_draft();
        moved.latitude = Some(48.86);
        assert!(site.location_differs(&moved));
        assert!(!site.matches(&moved));
    }

    #[test]
    fn apply_keeps_untouched_location() {
        let mut site = SiteRecord::from_draft(7, site_draft());
        site.physical_address = Some("kept".into());
        site.apply(site_draft());
        assert_eq!(site.physical_address.as_deref(), Some("kept"));
    }

    #[test]
    fn device_without_ip_in_draft_keeps_assignment() {
        let draft = DeviceDraft {
            name: "sw1".into(),
            serial: "SN1".into(),
            device_type: 1,
            role: 2,
            site: 3,
            tenant: Some(4),
            status: RecordStatus::Active,
            primary_ip: Some(9),
            comments: String::new(),
        };
        let mut device = DeviceRecord::from_draft(1, draft.clone());

        let skipped = DeviceDraft {
            primary_ip: None,
            ..draft
        };
        assert!(device.matches(&skipped));
        device.apply(skipped);
        assert_eq!(device.primary_ip, Some(9));
    }

    #[test]
    fn tags_are_inserted_once() {
        let mut device = DeviceRecord::from_draft(
            1,
            DeviceDraft {
                name: "sw1".into(),
                serial: "SN1".into(),
                device_type: 1,
                role: 2,
                site: 3,
                tenant: None,
                status: RecordStatus::Failed,
                primary_ip: None,
                comments: String::new(),
            },
        );
        assert!(device.insert_tag("cisco-dna-center"));
        assert!(!device.insert_tag("cisco-dna-center"));
        assert!(device.has_tag("cisco-dna-center"));
    }

    #[test]
    fn unknown_status_values_fall_back() {
        assert_eq!(RecordStatus::from_value("active"), RecordStatus::Active);
        assert_eq!(RecordStatus::from_value("inventory"), RecordStatus::Unknown);
        assert_eq!(RecordStatus::Failed.label(), "danger");
    }
}
