// ── NetBox destination store ──
//
// Maps each record kind onto its NetBox endpoint. Lookups go through the
// list endpoints with filter parameters and are re-checked against the
// matching key locally, since NetBox name filters are case-insensitive.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use dnasync_api::{NetBoxClient, TlsMode, TransportConfig};
use dnasync_api::netbox::models::{
    DeviceRoleWrite, DeviceTypeWrite, DeviceWrite, IpAddressWrite, ManufacturerWrite, NbDevice,
    NbDeviceRole, NbDeviceType, NbIpAddress, NbManufacturer, NbSite, NbTag, NbTenant, NestedTag,
    SiteWrite, TagRef, TagWrite, TagsPatch, TenantWrite, endpoint,
};

use super::{Filter, Record, Repository};
use crate::error::{CoreError, StoreError};
use crate::model::{
    DeviceDraft, DeviceRecord, DeviceRoleDraft, DeviceRoleRecord, DeviceTypeDraft,
    DeviceTypeKey, DeviceTypeRecord, IpAddressDraft, IpAddressRecord, IpKey, ManufacturerDraft,
    ManufacturerRecord, RecordId, RecordStatus, SiteDraft, SiteRecord, TagDraft, TagRecord,
    TenantDraft, TenantRecord,
};

/// Height given to device types created by the reconciler.
const DEFAULT_U_HEIGHT: u32 = 1;

/// Destination store backed by the NetBox REST API.
pub struct NetBoxStore {
    client: NetBoxClient,
}

impl NetBoxStore {
    pub fn new(client: NetBoxClient) -> Self {
        Self { client }
    }

    /// Token-authenticated store for the NetBox at `url`.
    pub fn connect(
        url: &str,
        token: &SecretString,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig::new(TlsMode::from_verify(verify_tls), timeout);
        let client = NetBoxClient::from_token(url, token, &transport)?;
        debug!(url = %client.base_url(), "netbox store ready");
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &NetBoxClient {
        &self.client
    }

    fn filter_params<R: NetBoxMapped>(filter: &Filter) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if R::TENANT_SCOPED {
            if let Some(tenant) = filter.tenant {
                params.push(("tenant_id", tenant.to_string()));
            }
        }
        if let Some(tag) = &filter.tag {
            params.push(("tag", tag.clone()));
        }
        params
    }
}

// ── Mapping ──────────────────────────────────────────────────────────

/// Binds a record kind to its NetBox endpoint and wire shapes.
pub trait NetBoxMapped: Record {
    const ENDPOINT: &'static str;
    /// Whether the endpoint accepts a `tenant_id` filter.
    const TENANT_SCOPED: bool = false;

    type Wire: DeserializeOwned + Send + 'static;
    type Write: Serialize + Send + Sync;

    fn key_params(key: &Self::Key) -> Vec<(&'static str, String)>;
    fn from_wire(wire: Self::Wire) -> Self;
    fn to_write(draft: Self::Draft, creating: bool) -> Self::Write;
}

fn tag_slugs(tags: Vec<NestedTag>) -> Vec<String> {
    let mut slugs: Vec<String> = tags.into_iter().map(|t| t.slug).collect();
    slugs.sort();
    slugs
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn status_of(choice: Option<dnasync_api::netbox::models::StatusChoice>) -> RecordStatus {
    choice.map_or(RecordStatus::Unknown, |c| RecordStatus::from_value(&c.value))
}

impl NetBoxMapped for TagRecord {
    const ENDPOINT: &'static str = endpoint::TAGS;
    type Wire = NbTag;
    type Write = TagWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn from_wire(wire: NbTag) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            slug: wire.slug,
            color: wire.color,
            description: wire.description,
        }
    }

    fn to_write(draft: TagDraft, _creating: bool) -> TagWrite {
        TagWrite {
            name: draft.name,
            slug: draft.slug,
            color: draft.color,
            description: draft.description,
        }
    }
}

impl NetBoxMapped for TenantRecord {
    const ENDPOINT: &'static str = endpoint::TENANTS;
    type Wire = NbTenant;
    type Write = TenantWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("name", key.clone())]
    }

    fn from_wire(wire: NbTenant) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            slug: wire.slug,
            description: wire.description,
            created: wire
                .created
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: TenantDraft, _creating: bool) -> TenantWrite {
        TenantWrite {
            name: Some(draft.name),
            slug: Some(draft.slug),
            description: Some(draft.description),
            tags: None,
        }
    }
}

impl NetBoxMapped for SiteRecord {
    const ENDPOINT: &'static str = endpoint::SITES;
    const TENANT_SCOPED: bool = true;
    type Wire = NbSite;
    type Write = SiteWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn from_wire(wire: NbSite) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            slug: wire.slug,
            status: status_of(wire.status),
            tenant: wire.tenant.map(|t| t.id),
            physical_address: non_empty(wire.physical_address),
            latitude: wire.latitude,
            longitude: wire.longitude,
            description: wire.description,
            comments: wire.comments,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: SiteDraft, _creating: bool) -> SiteWrite {
        SiteWrite {
            name: Some(draft.name),
            slug: Some(draft.slug),
            status: Some(draft.status.to_string()),
            tenant: draft.tenant,
            physical_address: draft.physical_address,
            latitude: draft.latitude,
            longitude: draft.longitude,
            description: Some(draft.description),
            comments: Some(draft.comments),
            tags: None,
        }
    }
}

impl NetBoxMapped for ManufacturerRecord {
    const ENDPOINT: &'static str = endpoint::MANUFACTURERS;
    type Wire = NbManufacturer;
    type Write = ManufacturerWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("name", key.clone())]
    }

    fn from_wire(wire: NbManufacturer) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            slug: wire.slug,
            description: wire.description,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: ManufacturerDraft, _creating: bool) -> ManufacturerWrite {
        ManufacturerWrite {
            name: Some(draft.name),
            slug: Some(draft.slug),
            description: Some(draft.description),
            tags: None,
        }
    }
}

impl NetBoxMapped for DeviceTypeRecord {
    const ENDPOINT: &'static str = endpoint::DEVICE_TYPES;
    type Wire = NbDeviceType;
    type Write = DeviceTypeWrite;

    fn key_params(key: &DeviceTypeKey) -> Vec<(&'static str, String)> {
        vec![
            ("manufacturer_id", key.manufacturer.to_string()),
            ("model", key.model.clone()),
        ]
    }

    fn from_wire(wire: NbDeviceType) -> Self {
        Self {
            id: wire.id,
            manufacturer: wire.manufacturer.id,
            model: wire.model,
            slug: wire.slug,
            description: wire.description,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: DeviceTypeDraft, creating: bool) -> DeviceTypeWrite {
        DeviceTypeWrite {
            manufacturer: Some(draft.manufacturer),
            model: Some(draft.model),
            slug: Some(draft.slug),
            u_height: creating.then_some(DEFAULT_U_HEIGHT),
            description: Some(draft.description),
            tags: None,
        }
    }
}

impl NetBoxMapped for DeviceRoleRecord {
    const ENDPOINT: &'static str = endpoint::DEVICE_ROLES;
    type Wire = NbDeviceRole;
    type Write = DeviceRoleWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("name", key.clone())]
    }

    fn from_wire(wire: NbDeviceRole) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            slug: wire.slug,
            color: wire.color,
            description: wire.description,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: DeviceRoleDraft, _creating: bool) -> DeviceRoleWrite {
        DeviceRoleWrite {
            name: Some(draft.name),
            slug: Some(draft.slug),
            color: Some(draft.color),
            description: Some(draft.description),
            tags: None,
        }
    }
}

impl NetBoxMapped for IpAddressRecord {
    const ENDPOINT: &'static str = endpoint::IP_ADDRESSES;
    const TENANT_SCOPED: bool = true;
    type Wire = NbIpAddress;
    type Write = IpAddressWrite;

    fn key_params(key: &IpKey) -> Vec<(&'static str, String)> {
        vec![
            ("address", key.address.clone()),
            (
                "tenant_id",
                key.tenant.map_or_else(|| "null".to_owned(), |t| t.to_string()),
            ),
        ]
    }

    fn from_wire(wire: NbIpAddress) -> Self {
        Self {
            id: wire.id,
            address: wire.address,
            dns_name: wire.dns_name,
            status: status_of(wire.status),
            tenant: wire.tenant.map(|t| t.id),
            description: wire.description,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: IpAddressDraft, _creating: bool) -> IpAddressWrite {
        IpAddressWrite {
            address: Some(draft.address),
            dns_name: Some(draft.dns_name),
            status: Some(draft.status.to_string()),
            tenant: draft.tenant,
            description: Some(draft.description),
            tags: None,
        }
    }
}

impl NetBoxMapped for DeviceRecord {
    const ENDPOINT: &'static str = endpoint::DEVICES;
    const TENANT_SCOPED: bool = true;
    type Wire = NbDevice;
    type Write = DeviceWrite;

    fn key_params(key: &String) -> Vec<(&'static str, String)> {
        vec![("serial", key.clone())]
    }

    fn from_wire(wire: NbDevice) -> Self {
        Self {
            id: wire.id,
            name: wire.name.unwrap_or_default(),
            serial: wire.serial,
            device_type: wire.device_type.id,
            role: wire.role.id,
            site: wire.site.id,
            tenant: wire.tenant.map(|t| t.id),
            status: status_of(wire.status),
            primary_ip: wire.primary_ip4.map(|ip| ip.id),
            comments: wire.comments,
            tags: tag_slugs(wire.tags),
        }
    }

    fn to_write(draft: DeviceDraft, _creating: bool) -> DeviceWrite {
        DeviceWrite {
            name: Some(draft.name),
            serial: Some(draft.serial),
            device_type: Some(draft.device_type),
            role: Some(draft.role),
            site: Some(draft.site),
            tenant: draft.tenant,
            status: Some(draft.status.to_string()),
            primary_ip4: draft.primary_ip,
            comments: Some(draft.comments),
            tags: None,
        }
    }
}

// ── Repository ───────────────────────────────────────────────────────

#[async_trait]
impl<R: NetBoxMapped> Repository<R> for NetBoxStore {
    async fn find(&self, key: &R::Key) -> Result<Option<R>, StoreError> {
        let wires: Vec<R::Wire> = self.client.list(R::ENDPOINT, &R::key_params(key)).await?;
        Ok(wires
            .into_iter()
            .map(R::from_wire)
            .find(|record| record.key() == *key))
    }

    async fn get(&self, id: RecordId) -> Result<Option<R>, StoreError> {
        match self.client.get::<R::Wire>(R::ENDPOINT, id).await {
            Ok(wire) => Ok(Some(R::from_wire(wire))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, filter: &Filter) -> Result<Vec<R>, StoreError> {
        let params = Self::filter_params::<R>(filter);
        let wires: Vec<R::Wire> = self.client.list(R::ENDPOINT, &params).await?;
        Ok(wires
            .into_iter()
            .map(R::from_wire)
            .filter(|record| filter.admits(record))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<usize, StoreError> {
        if filter.primary_ip.is_some() || (filter.tenant.is_some() && !R::TENANT_SCOPED) {
            let records: Vec<R> = self.list(filter).await?;
            return Ok(records.len());
        }
        let params = Self::filter_params::<R>(filter);
        let count = self.client.count(R::ENDPOINT, &params).await?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        debug!(kind = %R::KIND, key = %R::draft_key(&draft), "creating");
        let wire: R::Wire = self
            .client
            .create(R::ENDPOINT, &R::to_write(draft, true))
            .await?;
        Ok(R::from_wire(wire))
    }

    async fn update(&self, id: RecordId, draft: R::Draft) -> Result<R, StoreError> {
        debug!(kind = %R::KIND, id, "updating");
        let wire: R::Wire = self
            .client
            .update(R::ENDPOINT, id, &R::to_write(draft, false))
            .await?;
        Ok(R::from_wire(wire))
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        debug!(kind = %R::KIND, id, "deleting");
        self.client.delete(R::ENDPOINT, id).await?;
        Ok(())
    }

    async fn add_tag(&self, id: RecordId, slug: &str) -> Result<R, StoreError> {
        let current = R::from_wire(self.client.get::<R::Wire>(R::ENDPOINT, id).await?);
        if current.has_tag(slug) {
            return Ok(current);
        }

        let mut tags: Vec<TagRef> = current.tags().iter().map(TagRef::new).collect();
        tags.push(TagRef::new(slug));
        let wire: R::Wire = self
            .client
            .update(R::ENDPOINT, id, &TagsPatch { tags })
            .await?;
        Ok(R::from_wire(wire))
    }
}
