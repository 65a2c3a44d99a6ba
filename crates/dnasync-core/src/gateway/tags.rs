// ── Provenance tagging ──

use serde::Serialize;

use super::upsert::Upserted;
use crate::model::{DeviceTypeKey, EntityKind, IpKey, TagDraft, TagRecord};

pub const PROVENANCE_NAME: &str = "Cisco DNA Center";
pub const PROVENANCE_SLUG: &str = "cisco-dna-center";
pub const PROVENANCE_COLOR: &str = "2196f3";
pub const PROVENANCE_DESCRIPTION: &str = "Managed by dnasync";

pub fn provenance_draft() -> TagDraft {
    TagDraft {
        name: PROVENANCE_NAME.to_owned(),
        slug: PROVENANCE_SLUG.to_owned(),
        color: PROVENANCE_COLOR.to_owned(),
        description: PROVENANCE_DESCRIPTION.to_owned(),
    }
}

/// Matching key of a record to tag, by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "kebab-case")]
pub enum MatchKey {
    Tenant(String),
    /// Site slug (controller site id).
    Site(String),
    Manufacturer(String),
    #[serde(skip)]
    DeviceType(DeviceTypeKey),
    DeviceRole(String),
    #[serde(skip)]
    IpAddress(IpKey),
    /// Device serial number.
    Device(String),
}

impl MatchKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Tenant(_) => EntityKind::Tenant,
            Self::Site(_) => EntityKind::Site,
            Self::Manufacturer(_) => EntityKind::Manufacturer,
            Self::DeviceType(_) => EntityKind::DeviceType,
            Self::DeviceRole(_) => EntityKind::DeviceRole,
            Self::IpAddress(_) => EntityKind::IpAddress,
            Self::Device(_) => EntityKind::Device,
        }
    }
}

/// Tag work the gateway performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOperation {
    /// Create or refresh the provenance tag itself.
    EnsureProvenance,
    /// Attach the provenance tag to the record with this key.
    Attach(MatchKey),
}

#[derive(Debug, Clone)]
pub enum TagOutcome {
    Ensured(Upserted<TagRecord>),
    Added,
    AlreadyPresent,
}
