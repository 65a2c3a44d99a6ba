// ── Destination gateway ──
//
// Typed create-or-update operations over a `DestinationStore`, one per
// record kind, plus provenance tagging and the purge policy. The gateway
// owns no state beyond the store handle; everything it knows about
// "unchanged" comes from comparing drafts against stored records.

mod purge;
mod tags;
mod upsert;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::mapper;
use crate::model::{
    DeviceDraft, DeviceRecord, DeviceRoleDraft, DeviceRoleRecord, DeviceTypeDraft,
    DeviceTypeRecord, IpAddressDraft, IpAddressRecord, ManufacturerDraft, ManufacturerRecord,
    RecordId, SiteDraft, SiteRecord, TagRecord, TenantRecord,
};
use crate::store::{DestinationStore, Filter, Record, Repository};

pub use purge::{PurgeFailure, PurgeOutcome, purge_set, purge_stale};
pub use tags::{
    MatchKey, PROVENANCE_COLOR, PROVENANCE_DESCRIPTION, PROVENANCE_NAME, PROVENANCE_SLUG,
    TagOperation, TagOutcome, provenance_draft,
};
pub use upsert::{Upserted, WriteOutcome, upsert};

/// Result of a device upsert.
///
/// `ip_conflict` is set when the candidate primary address already
/// belonged to another device of the same tenant; the device was then
/// written without touching its primary address.
#[derive(Debug, Clone)]
pub struct DeviceSync {
    pub record: DeviceRecord,
    pub outcome: WriteOutcome,
    pub ip_conflict: bool,
}

#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn DestinationStore>,
}

impl Gateway {
    pub fn new(store: Arc<dyn DestinationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn DestinationStore {
        &*self.store
    }

    // ── Upserts ──────────────────────────────────────────────────────

    /// Tenant named after the controller hostname.
    pub async fn sync_tenant(&self, hostname: &str) -> Result<Upserted<TenantRecord>, StoreError> {
        upsert(self.store(), mapper::tenant_draft(hostname)).await
    }

    pub async fn sync_site(&self, draft: SiteDraft) -> Result<Upserted<SiteRecord>, StoreError> {
        upsert(self.store(), draft).await
    }

    pub async fn sync_manufacturer(
        &self,
        draft: ManufacturerDraft,
    ) -> Result<Upserted<ManufacturerRecord>, StoreError> {
        upsert(self.store(), draft).await
    }

    pub async fn sync_device_type(
        &self,
        draft: DeviceTypeDraft,
    ) -> Result<Upserted<DeviceTypeRecord>, StoreError> {
        upsert(self.store(), draft).await
    }

    pub async fn sync_device_role(
        &self,
        draft: DeviceRoleDraft,
    ) -> Result<Upserted<DeviceRoleRecord>, StoreError> {
        upsert(self.store(), draft).await
    }

    pub async fn sync_ip_address(
        &self,
        draft: IpAddressDraft,
    ) -> Result<Upserted<IpAddressRecord>, StoreError> {
        upsert(self.store(), draft).await
    }

    /// Upsert the candidate primary address of the device `serial`.
    ///
    /// If another device of the tenant already holds the address, the
    /// stored record is returned as is so the holder's DNS name survives.
    pub async fn sync_device_ip(
        &self,
        draft: IpAddressDraft,
        serial: &str,
    ) -> Result<Upserted<IpAddressRecord>, StoreError> {
        let key = IpAddressRecord::draft_key(&draft);
        let existing = Repository::<IpAddressRecord>::find(self.store(), &key).await?;

        if let (Some(existing), Some(tenant)) = (existing, draft.tenant) {
            if self.primary_ip_owner(tenant, existing.id, serial).await?.is_some() {
                return Ok(Upserted {
                    record: existing,
                    outcome: WriteOutcome::Unchanged,
                });
            }
        }
        upsert(self.store(), draft).await
    }

    /// Upsert a device by serial, guarding its primary address.
    ///
    /// When another device of the same tenant already holds the candidate
    /// address, the draft's primary address is dropped so the existing
    /// assignment stays where it is.
    pub async fn sync_device(&self, mut draft: DeviceDraft) -> Result<DeviceSync, StoreError> {
        let mut ip_conflict = false;

        if let (Some(ip), Some(tenant)) = (draft.primary_ip, draft.tenant) {
            if let Some(owner) = self.primary_ip_owner(tenant, ip, &draft.serial).await? {
                warn!(
                    serial = %draft.serial,
                    owner = %owner.serial,
                    ip,
                    "primary address already assigned to another device"
                );
                draft.primary_ip = None;
                ip_conflict = true;
            }
        }

        let Upserted { record, outcome } = upsert(self.store(), draft).await?;
        Ok(DeviceSync {
            record,
            outcome,
            ip_conflict,
        })
    }

    /// Another device of `tenant` whose primary address is `ip`.
    async fn primary_ip_owner(
        &self,
        tenant: RecordId,
        ip: RecordId,
        serial: &str,
    ) -> Result<Option<DeviceRecord>, StoreError> {
        let holders: Vec<DeviceRecord> =
            Repository::<DeviceRecord>::list(self.store(), &Filter::tenant(tenant).with_primary_ip(ip))
                .await?;
        Ok(holders.into_iter().find(|d| d.serial != serial))
    }

    // ── Tags ─────────────────────────────────────────────────────────

    pub async fn apply_tag(&self, operation: TagOperation) -> Result<TagOutcome, StoreError> {
        match operation {
            TagOperation::EnsureProvenance => {
                let ensured = upsert::<TagRecord, _>(self.store(), provenance_draft()).await?;
                Ok(TagOutcome::Ensured(ensured))
            }
            TagOperation::Attach(key) => match key {
                MatchKey::Tenant(name) => attach::<TenantRecord, _>(self.store(), &name).await,
                MatchKey::Site(slug) => attach::<SiteRecord, _>(self.store(), &slug).await,
                MatchKey::Manufacturer(name) => {
                    attach::<ManufacturerRecord, _>(self.store(), &name).await
                }
                MatchKey::DeviceType(key) => {
                    attach::<DeviceTypeRecord, _>(self.store(), &key).await
                }
                MatchKey::DeviceRole(name) => {
                    attach::<DeviceRoleRecord, _>(self.store(), &name).await
                }
                MatchKey::IpAddress(key) => attach::<IpAddressRecord, _>(self.store(), &key).await,
                MatchKey::Device(serial) => attach::<DeviceRecord, _>(self.store(), &serial).await,
            },
        }
    }

    /// The provenance tag, if it exists. Never creates it.
    pub async fn provenance_tag(&self) -> Result<Option<TagRecord>, StoreError> {
        Repository::<TagRecord>::find(self.store(), &PROVENANCE_SLUG.to_owned()).await
    }

    // ── Purge ────────────────────────────────────────────────────────

    pub async fn purge_sites(
        &self,
        tenant: RecordId,
        observed: &HashSet<String>,
    ) -> PurgeOutcome {
        purge_stale::<SiteRecord, _>(self.store(), tenant, observed).await
    }

    pub async fn purge_devices(
        &self,
        tenant: RecordId,
        observed: &HashSet<String>,
    ) -> PurgeOutcome {
        purge_stale::<DeviceRecord, _>(self.store(), tenant, observed).await
    }

    /// Delete every record of kind `R` owned by `tenant`; returns the count.
    pub async fn delete_owned<R>(&self, tenant: RecordId) -> Result<usize, StoreError>
    where
        R: Record,
        dyn DestinationStore: Repository<R>,
    {
        let store = &*self.store;
        let records = Repository::<R>::list(store, &Filter::tenant(tenant)).await?;
        for record in &records {
            Repository::<R>::delete(store, record.id()).await?;
        }
        debug!(kind = %R::KIND, tenant, deleted = records.len(), "deleted tenant records");
        Ok(records.len())
    }
}

async fn attach<R, S>(store: &S, key: &R::Key) -> Result<TagOutcome, StoreError>
where
    R: Record,
    S: Repository<R> + ?Sized,
{
    let record = store.find(key).await?.ok_or_else(|| StoreError::NotFound {
        kind: R::KIND,
        key: key.to_string(),
    })?;

    if record.has_tag(PROVENANCE_SLUG) {
        return Ok(TagOutcome::AlreadyPresent);
    }
    store.add_tag(record.id(), PROVENANCE_SLUG).await?;
    debug!(kind = %R::KIND, %key, "tagged");
    Ok(TagOutcome::Added)
}
