// ── Reconciler ──
//
// Drives one sync run: fetch controller inventory per tenant, map it to
// destination drafts, upsert through the gateway, then purge what the
// controller no longer reports. Tenants are processed one after another;
// a tenant that fails is recorded in the report and the run moves on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::controller::ControllerSource;
use crate::error::{CoreError, StoreError};
use crate::gateway::{Gateway, MatchKey, PROVENANCE_SLUG, PurgeOutcome, TagOperation};
use crate::mapper;
use crate::model::{
    DeviceDraft, DeviceRecord, IpAddressRecord, RecordId, RecordStatus, RemoteDevice, SiteDraft,
    SiteRecord, TenantRecord,
};
use crate::registry::{AuthStatus, ControllerSession, Scope, TenantRegistry};
use crate::report::{
    DestinationTenant, DeviceRow, FullSyncReport, SiteRow, SiteSummary, StatusReport,
    SyncOutcome, SyncReport, TenantListing, TenantPurgeReport, TenantResult, TenantStatus,
};
use crate::store::{Filter, Record, Repository};

/// Reason recorded when devices are synced for a tenant with no sites.
pub const SYNC_SITES_FIRST: &str = "sync sites first";

/// Where the current run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    FetchingRemote,
    Mapping,
    Upserting,
    Purging,
    Done,
}

pub struct Reconciler {
    registry: TenantRegistry,
    gateway: Gateway,
    phase: watch::Sender<SyncPhase>,
}

impl Reconciler {
    pub fn new(registry: TenantRegistry, gateway: Gateway) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            registry,
            gateway,
            phase,
        }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Subscribe to phase transitions.
    pub fn phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: SyncPhase) {
        debug!(%phase, "sync phase");
        self.phase.send_replace(phase);
    }

    // ── Sites ────────────────────────────────────────────────────────

    pub async fn sync_sites(&self, scope: &Scope) -> Result<SyncReport<SiteRow>, CoreError> {
        let report = self.site_pass(scope).await?;
        self.enter(SyncPhase::Done);
        Ok(report)
    }

    async fn site_pass(&self, scope: &Scope) -> Result<SyncReport<SiteRow>, CoreError> {
        self.gateway.apply_tag(TagOperation::EnsureProvenance).await?;
        let sessions = self.registry.open(scope).await?;

        let mut report = SyncReport::default();
        for session in &sessions {
            let hostname = &session.tenant.hostname;
            let result = match usable(session) {
                Ok(client) => self
                    .sync_tenant_sites(hostname, client.as_ref())
                    .await
                    .unwrap_or_else(|e| skipped(hostname, &e)),
                Err(reason) => TenantResult::Skipped { reason },
            };
            report.insert(hostname.clone(), result);
        }

        info!(
            %scope,
            synced = report.synced_count(),
            failed = report.failure_count(),
            "site sync finished"
        );
        Ok(report)
    }

    async fn sync_tenant_sites(
        &self,
        hostname: &str,
        client: &dyn ControllerSource,
    ) -> Result<TenantResult<SiteRow>, CoreError> {
        let tenant = self.prepare_tenant(hostname).await?;

        self.enter(SyncPhase::FetchingRemote);
        let sites = client.list_sites().await?;

        self.enter(SyncPhase::Mapping);
        let drafts: Vec<SiteDraft> = sites
            .iter()
            .map(|site| mapper::site_draft(site, hostname, tenant.id))
            .collect();

        self.enter(SyncPhase::Upserting);
        let mut observed = HashSet::with_capacity(drafts.len());
        let mut rows = Vec::with_capacity(drafts.len());
        for draft in drafts {
            observed.insert(draft.slug.clone());
            let name = draft.name.clone();
            let slug = draft.slug.clone();
            let row = match self.upsert_site(draft).await {
                Ok(row) => row,
                Err(e) => {
                    warn!(tenant = hostname, site = %slug, error = %e, "site sync failed");
                    SiteRow {
                        name,
                        status: RecordStatus::Active,
                        status_label: RecordStatus::Active.label().to_owned(),
                        slug,
                        outcome: SyncOutcome::Failed(e.to_string()),
                    }
                }
            };
            rows.push(row);
        }

        self.enter(SyncPhase::Purging);
        let purge = self.gateway.purge_sites(tenant.id, &observed).await;

        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(TenantResult::Synced { rows, purge })
    }

    async fn upsert_site(&self, draft: SiteDraft) -> Result<SiteRow, CoreError> {
        if let Some(existing) =
            Repository::<SiteRecord>::find(self.gateway.store(), &draft.slug).await?
        {
            if existing.tenant != draft.tenant {
                return Err(CoreError::Mapping {
                    what: "site".into(),
                    message: format!("slug {} belongs to another tenant", draft.slug),
                });
            }
        }

        let synced = self.gateway.sync_site(draft).await?;
        let site = synced.record;
        self.gateway
            .apply_tag(TagOperation::Attach(MatchKey::Site(site.slug.clone())))
            .await?;

        Ok(SiteRow {
            status_label: site.status.label().to_owned(),
            status: site.status,
            name: site.name,
            slug: site.slug,
            outcome: synced.outcome.into(),
        })
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn sync_devices(&self, scope: &Scope) -> Result<SyncReport<DeviceRow>, CoreError> {
        let report = self.device_pass(scope).await?;
        self.enter(SyncPhase::Done);
        Ok(report)
    }

    async fn device_pass(&self, scope: &Scope) -> Result<SyncReport<DeviceRow>, CoreError> {
        self.gateway.apply_tag(TagOperation::EnsureProvenance).await?;
        let sessions = self.registry.open(scope).await?;

        let mut report = SyncReport::default();
        for session in &sessions {
            let hostname = &session.tenant.hostname;
            let result = match usable(session) {
                Ok(client) => self
                    .sync_tenant_devices(hostname, client.as_ref())
                    .await
                    .unwrap_or_else(|e| skipped(hostname, &e)),
                Err(reason) => TenantResult::Skipped { reason },
            };
            report.insert(hostname.clone(), result);
        }

        info!(
            %scope,
            synced = report.synced_count(),
            failed = report.failure_count(),
            "device sync finished"
        );
        Ok(report)
    }

    async fn sync_tenant_devices(
        &self,
        hostname: &str,
        client: &dyn ControllerSource,
    ) -> Result<TenantResult<DeviceRow>, CoreError> {
        let tenant = self.prepare_tenant(hostname).await?;

        let sites =
            Repository::<SiteRecord>::count(self.gateway.store(), &Filter::tenant(tenant.id))
                .await?;
        if sites == 0 {
            warn!(tenant = hostname, "no destination sites, skipping devices");
            return Ok(TenantResult::Synced {
                rows: vec![precondition_row()],
                purge: PurgeOutcome::NoChange,
            });
        }

        self.enter(SyncPhase::FetchingRemote);
        let devices: Vec<RemoteDevice> = client
            .list_devices()
            .await?
            .into_iter()
            .filter(RemoteDevice::is_supported)
            .collect();

        self.enter(SyncPhase::Mapping);
        let site_map = client.map_devices_to_sites().await?;

        self.enter(SyncPhase::Upserting);
        let mut observed = HashSet::with_capacity(devices.len());
        let mut rows = Vec::with_capacity(devices.len());
        for device in &devices {
            if !device.serial.is_empty() {
                observed.insert(device.serial.clone());
            }
            let row = match self
                .upsert_device(hostname, tenant.id, device, &site_map)
                .await
            {
                Ok(row) => row,
                Err(e) => {
                    warn!(
                        tenant = hostname,
                        serial = %device.serial,
                        error = %e,
                        "device sync failed"
                    );
                    failed_device_row(device, &e)
                }
            };
            rows.push(row);
        }

        self.enter(SyncPhase::Purging);
        let purge = self.gateway.purge_devices(tenant.id, &observed).await;

        rows.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        Ok(TenantResult::Synced { rows, purge })
    }

    async fn upsert_device(
        &self,
        hostname: &str,
        tenant: RecordId,
        device: &RemoteDevice,
        site_map: &HashMap<String, String>,
    ) -> Result<DeviceRow, CoreError> {
        if device.serial.is_empty() {
            return Err(CoreError::Mapping {
                what: "device".into(),
                message: format!("{} reports no serial number", device.hostname),
            });
        }

        let manufacturer = self
            .gateway
            .sync_manufacturer(mapper::manufacturer_draft(device, hostname))
            .await?
            .record;

        let device_type = self
            .gateway
            .sync_device_type(mapper::device_type_draft(device, manufacturer.id, hostname))
            .await?
            .record;
        self.gateway
            .apply_tag(TagOperation::Attach(MatchKey::DeviceType(device_type.key())))
            .await?;

        let role = self
            .gateway
            .sync_device_role(mapper::device_role_draft(device, hostname))
            .await?
            .record;

        let ip = self
            .gateway
            .sync_device_ip(
                mapper::ip_address_draft(device, hostname, tenant)?,
                &device.serial,
            )
            .await?
            .record;
        self.gateway
            .apply_tag(TagOperation::Attach(MatchKey::IpAddress(ip.key())))
            .await?;

        let site = self.resolve_site(tenant, device, site_map).await?;

        let status = mapper::device_status(&device.reachability);
        let synced = self
            .gateway
            .sync_device(DeviceDraft {
                name: device.hostname.clone(),
                serial: device.serial.clone(),
                device_type: device_type.id,
                role: role.id,
                site: site.id,
                tenant: Some(tenant),
                status,
                primary_ip: Some(ip.id),
                comments: mapper::managed_by(hostname),
            })
            .await?;
        self.gateway
            .apply_tag(TagOperation::Attach(MatchKey::Device(device.serial.clone())))
            .await?;

        // A conflicting device keeps whatever address it already had.
        let primary_ip = if synced.ip_conflict {
            self.address_of(synced.record.primary_ip).await?
        } else {
            Some(ip.address)
        };

        Ok(DeviceRow {
            hostname: synced.record.name.clone(),
            status,
            status_label: status.label().to_owned(),
            role: role.name,
            device_type: device_type.model,
            site: site.name,
            primary_ip,
            serial: synced.record.serial.clone(),
            outcome: SyncOutcome::from(&synced),
        })
    }

    async fn address_of(&self, ip: Option<RecordId>) -> Result<Option<String>, CoreError> {
        let Some(id) = ip else {
            return Ok(None);
        };
        let record = Repository::<IpAddressRecord>::get(self.gateway.store(), id).await?;
        Ok(record.map(|r| r.address))
    }

    /// Destination site of a device, via the controller's membership map.
    async fn resolve_site(
        &self,
        tenant: RecordId,
        device: &RemoteDevice,
        site_map: &HashMap<String, String>,
    ) -> Result<SiteRecord, CoreError> {
        let site_id = site_map
            .get(&device.serial)
            .ok_or_else(|| CoreError::Mapping {
                what: "device site".into(),
                message: format!("{} is not a member of any site", device.serial),
            })?;

        Repository::<SiteRecord>::find(self.gateway.store(), site_id)
            .await?
            .filter(|site| site.tenant == Some(tenant))
            .ok_or_else(|| CoreError::not_found("Site", site_id.clone()))
    }

    // ── Full sync ────────────────────────────────────────────────────

    /// Sites first, then devices; each kind is purged after its own pass.
    /// The phase only reaches `Done` once both passes are over.
    pub async fn sync_full(&self, scope: &Scope) -> Result<FullSyncReport, CoreError> {
        let sites = self.site_pass(scope).await?;
        let devices = self.device_pass(scope).await?;
        self.enter(SyncPhase::Done);
        let report = FullSyncReport::new(sites, devices);
        info!(
            %scope,
            sites = report.counts.sites,
            devices = report.counts.devices,
            "full sync finished"
        );
        Ok(report)
    }

    // ── Shared steps ─────────────────────────────────────────────────

    /// Upsert and tag the destination tenant for a controller.
    async fn prepare_tenant(&self, hostname: &str) -> Result<TenantRecord, CoreError> {
        let tenant = self.gateway.sync_tenant(hostname).await?.record;
        self.gateway
            .apply_tag(TagOperation::Attach(MatchKey::Tenant(tenant.name.clone())))
            .await?;
        Ok(tenant)
    }

    // ── Read-only ────────────────────────────────────────────────────

    /// Dashboard counts. Never writes to the destination.
    pub async fn status(&self, scope: &Scope) -> Result<StatusReport, CoreError> {
        let sessions = self.registry.open(scope).await?;
        let tag = self.gateway.provenance_tag().await?;

        let mut report = StatusReport::default();
        for session in &sessions {
            let (remote_site_count, remote_device_count) = match &session.client {
                Some(client) => remote_counts(&session.tenant.hostname, client.as_ref()).await,
                None => (None, None),
            };
            let (destination_site_count, destination_device_count) = if tag.is_some() {
                self.destination_counts(&session.tenant.hostname).await?
            } else {
                (0, 0)
            };

            report.tenants.insert(
                session.tenant.hostname.clone(),
                TenantStatus {
                    auth_status: session.status.clone(),
                    remote_site_count,
                    remote_device_count,
                    destination_site_count,
                    destination_device_count,
                },
            );
        }

        if tag.is_some() {
            let configured: HashSet<String> = self
                .registry
                .tenants(&Scope::All)?
                .into_iter()
                .map(|t| t.hostname)
                .collect();
            let mut tenants: Vec<TenantRecord> = Repository::<TenantRecord>::list(
                self.gateway.store(),
                &Filter::all().tagged(PROVENANCE_SLUG),
            )
            .await?;
            tenants.sort_by(|a, b| a.name.cmp(&b.name));

            report.destination_tenants = tenants
                .into_iter()
                .map(|t| DestinationTenant {
                    managed: configured.contains(&t.name),
                    id: t.id,
                    name: t.name,
                    description: t.description,
                    created: t.created,
                })
                .collect();
        }

        Ok(report)
    }

    async fn destination_counts(&self, hostname: &str) -> Result<(usize, usize), StoreError> {
        let store = self.gateway.store();
        let Some(tenant) = Repository::<TenantRecord>::find(store, &hostname.to_owned()).await?
        else {
            return Ok((0, 0));
        };

        let filter = Filter::tenant(tenant.id).tagged(PROVENANCE_SLUG);
        let sites = Repository::<SiteRecord>::count(store, &filter).await?;
        let devices = Repository::<DeviceRecord>::count(store, &filter).await?;
        Ok((sites, devices))
    }

    /// Raw controller inventory per tenant, every support level included.
    pub async fn list_devices(
        &self,
        scope: &Scope,
    ) -> Result<BTreeMap<String, TenantListing<RemoteDevice>>, CoreError> {
        let sessions = self.registry.open(scope).await?;
        let mut listings = BTreeMap::new();

        for session in &sessions {
            let listing = match usable(session) {
                Ok(client) => match client.list_devices().await {
                    Ok(items) => TenantListing::Listed { items },
                    Err(e) => TenantListing::Unavailable {
                        reason: e.to_string(),
                    },
                },
                Err(reason) => TenantListing::Unavailable { reason },
            };
            listings.insert(session.tenant.hostname.clone(), listing);
        }
        Ok(listings)
    }

    /// Controller sites per tenant, ordered by hierarchy.
    pub async fn list_sites(
        &self,
        scope: &Scope,
    ) -> Result<BTreeMap<String, TenantListing<SiteSummary>>, CoreError> {
        let sessions = self.registry.open(scope).await?;
        let mut listings = BTreeMap::new();

        for session in &sessions {
            let listing = match usable(session) {
                Ok(client) => match client.list_sites().await {
                    Ok(sites) => {
                        let mut items: Vec<SiteSummary> = sites
                            .into_iter()
                            .map(|site| {
                                let location = site.location.unwrap_or_default();
                                SiteSummary {
                                    name: site.name,
                                    hierarchy: site.hierarchy,
                                    location_type: location.location_type,
                                    country: location.country,
                                }
                            })
                            .collect();
                        items.sort_by(|a, b| a.hierarchy.cmp(&b.hierarchy));
                        TenantListing::Listed { items }
                    }
                    Err(e) => TenantListing::Unavailable {
                        reason: e.to_string(),
                    },
                },
                Err(reason) => TenantListing::Unavailable { reason },
            };
            listings.insert(session.tenant.hostname.clone(), listing);
        }
        Ok(listings)
    }

    // ── Tenant purge ─────────────────────────────────────────────────

    /// Delete a provenance-tagged destination tenant and everything it
    /// owns: devices, then IP addresses, then sites, then the tenant.
    pub async fn purge_tenant(&self, id: RecordId) -> Result<TenantPurgeReport, CoreError> {
        let tenant = Repository::<TenantRecord>::get(self.gateway.store(), id)
            .await?
            .filter(|t| t.has_tag(PROVENANCE_SLUG))
            .ok_or_else(|| CoreError::not_found("Tenant", id.to_string()))?;

        let devices = self.gateway.delete_owned::<DeviceRecord>(tenant.id).await?;
        let ip_addresses = self.gateway.delete_owned::<IpAddressRecord>(tenant.id).await?;
        let sites = self.gateway.delete_owned::<SiteRecord>(tenant.id).await?;
        Repository::<TenantRecord>::delete(self.gateway.store(), tenant.id).await?;

        info!(tenant = %tenant.name, devices, ip_addresses, sites, "purged tenant");
        Ok(TenantPurgeReport {
            tenant: tenant.name,
            devices,
            ip_addresses,
            sites,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// The session's controller, or why there is none.
fn usable(session: &ControllerSession) -> Result<&Arc<dyn ControllerSource>, String> {
    match (&session.client, &session.status) {
        (Some(client), _) => Ok(client),
        (None, AuthStatus::Disabled) => Err("tenant disabled".to_owned()),
        (None, AuthStatus::Failed(reason)) => Err(format!("authentication failed: {reason}")),
        (None, AuthStatus::Success) => Err("no controller session".to_owned()),
    }
}

fn skipped<Row>(hostname: &str, error: &CoreError) -> TenantResult<Row> {
    warn!(tenant = hostname, %error, "tenant sync aborted");
    TenantResult::Skipped {
        reason: error.to_string(),
    }
}

/// The single row reported for a tenant whose sites were never synced.
fn precondition_row() -> DeviceRow {
    DeviceRow {
        hostname: String::new(),
        status: RecordStatus::Unknown,
        status_label: RecordStatus::Unknown.label().to_owned(),
        role: String::new(),
        device_type: String::new(),
        site: String::new(),
        primary_ip: None,
        serial: String::new(),
        outcome: SyncOutcome::Failed(SYNC_SITES_FIRST.to_owned()),
    }
}

fn failed_device_row(device: &RemoteDevice, error: &CoreError) -> DeviceRow {
    let status = mapper::device_status(&device.reachability);
    DeviceRow {
        hostname: device.hostname.clone(),
        status,
        status_label: status.label().to_owned(),
        role: device.role.clone(),
        device_type: device.family.clone(),
        site: String::new(),
        primary_ip: device.management_ip.clone(),
        serial: device.serial.clone(),
        outcome: SyncOutcome::Failed(error.to_string()),
    }
}

/// Remote site count and supported-device count; `None` where the
/// controller call failed.
async fn remote_counts(
    hostname: &str,
    client: &dyn ControllerSource,
) -> (Option<u64>, Option<usize>) {
    let sites = client
        .count_sites()
        .await
        .inspect_err(|e| warn!(tenant = hostname, error = %e, "site count failed"))
        .ok();
    let devices = client
        .list_devices()
        .await
        .inspect_err(|e| warn!(tenant = hostname, error = %e, "device listing failed"))
        .ok()
        .map(|devices| devices.iter().filter(|d| d.is_supported()).count());
    (sites, devices)
}
