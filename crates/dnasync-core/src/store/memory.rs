// ── In-memory destination store ──
//
// DashMap-backed tables with a secondary key index, following the same
// shape as a reactive entity collection: O(1) lookups by id and by
// matching key. Deletes honour the references devices and device types
// hold, and every persisted write is appended to a changelog so callers
// can tell a no-op sync from one that touched records.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tracing::debug;

use super::{Filter, Record, Repository};
use crate::error::StoreError;
use crate::model::{
    DeviceRecord, DeviceRoleRecord, DeviceTypeRecord, EntityKind, IpAddressRecord,
    ManufacturerRecord, RecordId, SiteRecord, TagRecord, TenantRecord,
};

// ── Changelog ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    Tag,
}

/// One persisted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub seq: u64,
    pub kind: EntityKind,
    pub id: RecordId,
    pub action: ChangeAction,
    pub at: DateTime<Utc>,
}

// ── Table ────────────────────────────────────────────────────────────

pub struct Table<R: Record> {
    rows: DashMap<RecordId, R>,
    by_key: DashMap<R::Key, RecordId>,
}

impl<R: Record> Table<R> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            by_key: DashMap::new(),
        }
    }

    fn count_where(&self, pred: impl Fn(&R) -> bool) -> usize {
        self.rows.iter().filter(|r| pred(r.value())).count()
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Destination store held entirely in memory.
pub struct MemoryStore {
    next_id: AtomicU64,
    next_seq: AtomicU64,
    tags: Table<TagRecord>,
    tenants: Table<TenantRecord>,
    sites: Table<SiteRecord>,
    manufacturers: Table<ManufacturerRecord>,
    device_types: Table<DeviceTypeRecord>,
    device_roles: Table<DeviceRoleRecord>,
    ip_addresses: Table<IpAddressRecord>,
    devices: Table<DeviceRecord>,
    changelog: DashMap<u64, ChangeEntry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(1),
            tags: Table::new(),
            tenants: Table::new(),
            sites: Table::new(),
            manufacturers: Table::new(),
            device_types: Table::new(),
            device_roles: Table::new(),
            ip_addresses: Table::new(),
            devices: Table::new(),
            changelog: DashMap::new(),
        }
    }

    /// Every persisted write, oldest first.
    pub fn changelog(&self) -> Vec<ChangeEntry> {
        let mut entries: Vec<ChangeEntry> =
            self.changelog.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    pub fn change_count(&self) -> usize {
        self.changelog.len()
    }

    /// Number of stored records of kind `R`.
    pub fn count_of<R: Stored>(&self) -> usize {
        R::table(self).rows.len()
    }

    fn log(&self, kind: EntityKind, id: RecordId, action: ChangeAction) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        debug!(%kind, id, ?action, "memory store write");
        self.changelog.insert(
            seq,
            ChangeEntry {
                seq,
                kind,
                id,
                action,
                at: Utc::now(),
            },
        );
    }
}

// ── Per-kind wiring ──────────────────────────────────────────────────

/// Binds a record kind to its table and reports how many stored records
/// still reference a given id.
pub trait Stored: Record {
    fn table(store: &MemoryStore) -> &Table<Self>;

    fn references(_store: &MemoryStore, _id: RecordId) -> usize {
        0
    }
}

impl Stored for TagRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.tags
    }
}

impl Stored for TenantRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.tenants
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.sites.count_where(|s| s.tenant == Some(id))
            + store.devices.count_where(|d| d.tenant == Some(id))
            + store.ip_addresses.count_where(|ip| ip.tenant == Some(id))
    }
}

impl Stored for SiteRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.sites
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.devices.count_where(|d| d.site == id)
    }
}

impl Stored for ManufacturerRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.manufacturers
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.device_types.count_where(|t| t.manufacturer == id)
    }
}

impl Stored for DeviceTypeRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.device_types
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.devices.count_where(|d| d.device_type == id)
    }
}

impl Stored for DeviceRoleRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.device_roles
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.devices.count_where(|d| d.role == id)
    }
}

impl Stored for IpAddressRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.ip_addresses
    }

    fn references(store: &MemoryStore, id: RecordId) -> usize {
        store.devices.count_where(|d| d.primary_ip == Some(id))
    }
}

impl Stored for DeviceRecord {
    fn table(store: &MemoryStore) -> &Table<Self> {
        &store.devices
    }
}

// ── Repository ───────────────────────────────────────────────────────

fn not_found<R: Record>(id: RecordId) -> StoreError {
    StoreError::NotFound {
        kind: R::KIND,
        key: id.to_string(),
    }
}

#[async_trait]
impl<R: Stored> Repository<R> for MemoryStore {
    async fn find(&self, key: &R::Key) -> Result<Option<R>, StoreError> {
        let table = R::table(self);
        Ok(table
            .by_key
            .get(key)
            .and_then(|id| table.rows.get(id.value()).map(|r| r.value().clone())))
    }

    async fn get(&self, id: RecordId) -> Result<Option<R>, StoreError> {
        Ok(R::table(self).rows.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self, filter: &Filter) -> Result<Vec<R>, StoreError> {
        let mut records: Vec<R> = R::table(self)
            .rows
            .iter()
            .filter(|r| filter.admits(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let table = R::table(self);
        let key = R::draft_key(&draft);

        let record = match table.by_key.entry(key) {
            Entry::Occupied(slot) => {
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    message: format!("{} already exists", slot.key()),
                });
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let record = R::from_draft(id, draft);
                table.rows.insert(id, record.clone());
                slot.insert(id);
                record
            }
        };

        self.log(R::KIND, record.id(), ChangeAction::Create);
        Ok(record)
    }

    async fn update(&self, id: RecordId, draft: R::Draft) -> Result<R, StoreError> {
        let table = R::table(self);
        let (old_key, updated) = {
            let mut row = table.rows.get_mut(&id).ok_or_else(|| not_found::<R>(id))?;
            let old_key = row.value().key();
            row.apply(draft);
            (old_key, row.clone())
        };

        let new_key = updated.key();
        if old_key != new_key {
            table.by_key.remove(&old_key);
            table.by_key.insert(new_key, id);
        }

        self.log(R::KIND, id, ChangeAction::Update);
        Ok(updated)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let references = R::references(self, id);
        if references > 0 {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                message: format!("{} {id} is still referenced by {references} record(s)", R::KIND),
            });
        }

        let table = R::table(self);
        let (_, record) = table.rows.remove(&id).ok_or_else(|| not_found::<R>(id))?;
        table.by_key.remove(&record.key());

        self.log(R::KIND, id, ChangeAction::Delete);
        Ok(())
    }

    async fn add_tag(&self, id: RecordId, slug: &str) -> Result<R, StoreError> {
        let (record, added) = {
            let mut row = R::table(self)
                .rows
                .get_mut(&id)
                .ok_or_else(|| not_found::<R>(id))?;
            let added = row.insert_tag(slug);
            (row.clone(), added)
        };

        if added {
            self.log(R::KIND, id, ChangeAction::Tag);
        }
        Ok(record)
    }
}
