// ── Destination store seam ──
//
// The reconciler talks to the destination inventory through one
// `Repository<R>` per record kind. `MemoryStore` backs tests and dry runs;
// `NetBoxStore` talks to a live NetBox instance.

mod memory;
mod netbox;

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    DeviceRecord, DeviceRoleRecord, DeviceTypeRecord, EntityKind, IpAddressRecord,
    ManufacturerRecord, RecordId, SiteRecord, TagRecord, TenantRecord,
};

pub use memory::{ChangeAction, ChangeEntry, MemoryStore, Stored, Table};
pub use netbox::NetBoxStore;

// ── Record ───────────────────────────────────────────────────────────

/// A destination record kind: its matching key, the attributes written
/// on create/update, and the relations used for filtering.
pub trait Record: fmt::Debug + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Matching key deciding create-vs-update and purge membership.
    type Key: fmt::Debug + fmt::Display + Clone + Eq + Hash + Send + Sync + 'static;
    type Draft: fmt::Debug + Clone + Send + Sync + 'static;

    fn id(&self) -> RecordId;
    fn key(&self) -> Self::Key;
    fn draft_key(draft: &Self::Draft) -> Self::Key;
    fn tags(&self) -> &[String];

    fn tenant(&self) -> Option<RecordId> {
        None
    }

    fn primary_ip(&self) -> Option<RecordId> {
        None
    }

    /// `true` when writing `draft` would leave the record unchanged.
    fn matches(&self, draft: &Self::Draft) -> bool;

    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;

    /// Apply `draft` in place. The matching key is never changed.
    fn apply(&mut self, draft: Self::Draft);

    /// Add a tag slug; returns `false` if it was already present.
    fn insert_tag(&mut self, slug: &str) -> bool;

    fn has_tag(&self, slug: &str) -> bool {
        self.tags().iter().any(|t| t == slug)
    }
}

// ── Filter ───────────────────────────────────────────────────────────

/// Listing filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub tenant: Option<RecordId>,
    /// Tag slug.
    pub tag: Option<String>,
    pub primary_ip: Option<RecordId>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tenant(id: RecordId) -> Self {
        Self {
            tenant: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn tagged(mut self, slug: impl Into<String>) -> Self {
        self.tag = Some(slug.into());
        self
    }

    #[must_use]
    pub fn with_primary_ip(mut self, id: RecordId) -> Self {
        self.primary_ip = Some(id);
        self
    }

    pub fn admits<R: Record>(&self, record: &R) -> bool {
        self.tenant.is_none_or(|t| record.tenant() == Some(t))
            && self.tag.as_deref().is_none_or(|slug| record.has_tag(slug))
            && self.primary_ip.is_none_or(|ip| record.primary_ip() == Some(ip))
    }
}

// ── Repository ───────────────────────────────────────────────────────

/// CRUD access to one record kind.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    async fn find(&self, key: &R::Key) -> Result<Option<R>, StoreError>;

    async fn get(&self, id: RecordId) -> Result<Option<R>, StoreError>;

    async fn list(&self, filter: &Filter) -> Result<Vec<R>, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.list(filter).await?.len())
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError>;

    async fn update(&self, id: RecordId, draft: R::Draft) -> Result<R, StoreError>;

    async fn delete(&self, id: RecordId) -> Result<(), StoreError>;

    async fn add_tag(&self, id: RecordId, slug: &str) -> Result<R, StoreError>;
}

/// Every repository the reconciler needs, behind one object.
pub trait DestinationStore:
    Repository<TagRecord>
    + Repository<TenantRecord>
    + Repository<SiteRecord>
    + Repository<ManufacturerRecord>
    + Repository<DeviceTypeRecord>
    + Repository<DeviceRoleRecord>
    + Repository<IpAddressRecord>
    + Repository<DeviceRecord>
{
}

impl<T> DestinationStore for T where
    T: Repository<TagRecord>
        + Repository<TenantRecord>
        + Repository<SiteRecord>
        + Repository<ManufacturerRecord>
        + Repository<DeviceTypeRecord>
        + Repository<DeviceRoleRecord>
        + Repository<IpAddressRecord>
        + Repository<DeviceRecord>
{
}
