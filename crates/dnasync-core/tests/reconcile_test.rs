#![allow(clippy::unwrap_used)]
// End-to-end reconciliation tests against a fake controller and the
// in-memory destination store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::Semaphore;

use dnasync_core::gateway::{Gateway, PROVENANCE_SLUG, TagOperation};
use dnasync_core::model::{
    DeviceRecord, IpAddressRecord, Location, ManufacturerRecord, SiteRecord, TagRecord,
    TenantDraft, TenantRecord,
};
use dnasync_core::reconciler::SYNC_SITES_FIRST;
use dnasync_core::{
    Connector, ControllerSource, CoreError, DeviceRow, FullSyncService, JobStatus, MemoryStore,
    PurgeOutcome, Reconciler, RecordStatus, RemoteDevice, RemoteSite, Repository, Scope,
    SiteRow, StaticTenants, SyncOutcome, SyncPhase, SyncReport, Tenant, TenantRegistry,
    TenantResult,
};

// ── Fake controller ─────────────────────────────────────────────────

#[derive(Default)]
struct Inventory {
    sites: Vec<RemoteSite>,
    devices: Vec<RemoteDevice>,
    /// site id → member serials
    members: HashMap<String, Vec<String>>,
}

type Shared = Arc<Mutex<Inventory>>;

struct FakeController {
    inventory: Shared,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl ControllerSource for FakeController {
    async fn list_sites(&self) -> Result<Vec<RemoteSite>, CoreError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(self.inventory.lock().unwrap().sites.clone())
    }

    async fn count_sites(&self) -> Result<u64, CoreError> {
        Ok(self.inventory.lock().unwrap().sites.len() as u64)
    }

    async fn list_devices(&self) -> Result<Vec<RemoteDevice>, CoreError> {
        Ok(self.inventory.lock().unwrap().devices.clone())
    }

    async fn site_members(&self, site_id: &str) -> Result<Vec<RemoteDevice>, CoreError> {
        let inventory = self.inventory.lock().unwrap();
        let serials = inventory.members.get(site_id).cloned().unwrap_or_default();
        Ok(inventory
            .devices
            .iter()
            .filter(|d| serials.contains(&d.serial))
            .cloned()
            .collect())
    }
}

struct FakeConnector {
    inventories: HashMap<String, Shared>,
    rejected: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    /// One permit per login when set.
    login_gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn ControllerSource>, CoreError> {
        if let Some(gate) = &self.login_gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.rejected.contains(&tenant.hostname) {
            return Err(CoreError::AuthenticationFailed {
                message: "invalid credentials".into(),
            });
        }
        let inventory = self
            .inventories
            .get(&tenant.hostname)
            .cloned()
            .unwrap_or_default();
        Ok(Arc::new(FakeController {
            inventory,
            gate: self.gate.clone(),
        }))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const DNAC1: &str = "dnac1.example.com";
const DNAC2: &str = "dnac2.example.com";

struct Harness {
    store: Arc<MemoryStore>,
    reconciler: Arc<Reconciler>,
    inventories: HashMap<String, Shared>,
}

impl Harness {
    fn inventory(&self, host: &str) -> std::sync::MutexGuard<'_, Inventory> {
        self.inventories[host].lock().unwrap()
    }

    fn gateway(&self) -> &Gateway {
        self.reconciler.gateway()
    }

    async fn devices(&self) -> Vec<DeviceRecord> {
        Repository::<DeviceRecord>::list(&*self.store, &dnasync_core::Filter::all())
            .await
            .unwrap()
    }
}

fn tenant(hostname: &str) -> Tenant {
    Tenant {
        hostname: hostname.into(),
        username: "admin".into(),
        password: SecretString::from("password"),
        verify_tls: false,
        enabled: true,
    }
}

fn build(hosts: &[&str], rejected: &[&str], gate: Option<Arc<Semaphore>>) -> Harness {
    build_with_logins(hosts, rejected, gate, None)
}

fn build_with_logins(
    hosts: &[&str],
    rejected: &[&str],
    gate: Option<Arc<Semaphore>>,
    login_gate: Option<Arc<Semaphore>>,
) -> Harness {
    let inventories: HashMap<String, Shared> = hosts
        .iter()
        .map(|h| ((*h).to_owned(), Shared::default()))
        .collect();
    let connector = FakeConnector {
        inventories: inventories.clone(),
        rejected: rejected.iter().map(|h| (*h).to_owned()).collect(),
        gate,
        login_gate,
    };
    let tenants = StaticTenants(hosts.iter().map(|h| tenant(h)).collect());
    let registry = TenantRegistry::new(Arc::new(tenants), Arc::new(connector));

    let store = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(store.clone());
    Harness {
        store,
        reconciler: Arc::new(Reconciler::new(registry, gateway)),
        inventories,
    }
}

fn harness(hosts: &[&str]) -> Harness {
    build(hosts, &[], None)
}

fn site(id: &str, hierarchy: &str) -> RemoteSite {
    RemoteSite {
        id: id.into(),
        name: hierarchy.rsplit('/').next().unwrap().into(),
        hierarchy: hierarchy.into(),
        location: None,
    }
}

fn device(serial: &str, ip: &str) -> RemoteDevice {
    RemoteDevice {
        serial: serial.into(),
        hostname: format!("sw-{}", serial.to_lowercase()),
        management_ip: Some(ip.into()),
        family: "Switches and Hubs".into(),
        device_type: "Cisco Catalyst 9300 Switch".into(),
        role: "ACCESS".into(),
        reachability: "Reachable".into(),
        support_level: "Supported".into(),
        platform: Some("C9300-48P".into()),
        software_version: Some("17.9.4".into()),
    }
}

/// One site `Global` (`abc-123`) holding the given devices.
fn seed(h: &Harness, host: &str, devices: Vec<RemoteDevice>) {
    let mut inventory = h.inventory(host);
    inventory.sites = vec![site("abc-123", "Global")];
    inventory.members.insert(
        "abc-123".into(),
        devices.iter().map(|d| d.serial.clone()).collect(),
    );
    inventory.devices = devices;
}

fn rows<Row: Clone>(report: &SyncReport<Row>, host: &str) -> Vec<Row> {
    report.tenants[host].rows().to_vec()
}

fn site_rows_without_outcome(report: &SyncReport<SiteRow>) -> Vec<SiteRow> {
    report
        .tenants
        .values()
        .flat_map(TenantResult::rows)
        .map(|r| SiteRow {
            outcome: SyncOutcome::Unchanged,
            ..r.clone()
        })
        .collect()
}

fn device_rows_without_outcome(report: &SyncReport<DeviceRow>) -> Vec<DeviceRow> {
    report
        .tenants
        .values()
        .flat_map(TenantResult::rows)
        .map(|r| DeviceRow {
            outcome: SyncOutcome::Unchanged,
            ..r.clone()
        })
        .collect()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_sync_then_idempotent_rerun() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);

    let first = h.reconciler.sync_full(&Scope::All).await.unwrap();
    assert_eq!(first.counts.sites, 1);
    assert_eq!(first.counts.devices, 1);

    let sites = rows(&first.sites, DNAC1);
    assert_eq!(sites[0].name, "Global abc");
    assert_eq!(sites[0].slug, "abc-123");
    assert_eq!(sites[0].outcome, SyncOutcome::Created);

    let devices = rows(&first.devices, DNAC1);
    assert_eq!(devices[0].status, RecordStatus::Active);
    assert_eq!(devices[0].primary_ip.as_deref(), Some("10.0.0.1/32"));
    assert_eq!(devices[0].outcome, SyncOutcome::Created);

    assert_eq!(h.store.count_of::<SiteRecord>(), 1);
    assert_eq!(h.store.count_of::<DeviceRecord>(), 1);
    assert_eq!(h.store.count_of::<IpAddressRecord>(), 1);

    let writes = h.store.change_count();
    let second = h.reconciler.sync_full(&Scope::All).await.unwrap();

    assert_eq!(h.store.change_count(), writes, "second run must not write");
    assert_eq!(second.counts, first.counts);
    assert_eq!(
        site_rows_without_outcome(&second.sites),
        site_rows_without_outcome(&first.sites)
    );
    assert_eq!(
        device_rows_without_outcome(&second.devices),
        device_rows_without_outcome(&first.devices)
    );
    assert!(
        second
            .devices
            .tenants
            .values()
            .flat_map(TenantResult::rows)
            .all(|r| r.outcome == SyncOutcome::Unchanged)
    );
    assert!(matches!(
        second.devices.tenants[DNAC1],
        TenantResult::Synced {
            purge: PurgeOutcome::NoChange,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unreachable_device_is_updated_not_removed() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();

    h.inventory(DNAC1).devices[0].reachability = "Unreachable".into();
    let report = h.reconciler.sync_devices(&Scope::All).await.unwrap();

    let row = &rows(&report, DNAC1)[0];
    assert_eq!(row.outcome, SyncOutcome::Updated);
    assert_eq!(row.status, RecordStatus::Failed);
    assert_eq!(row.status_label, "danger");

    let devices = h.devices().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].status, RecordStatus::Failed);
}

#[tokio::test]
async fn test_vanished_device_is_purged_alone() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1"), device("SN2", "10.0.0.2")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();
    assert_eq!(h.store.count_of::<DeviceRecord>(), 2);

    h.inventory(DNAC1).devices.retain(|d| d.serial == "SN1");
    let report = h.reconciler.sync_devices(&Scope::All).await.unwrap();

    match &report.tenants[DNAC1] {
        TenantResult::Synced { purge, .. } => {
            assert_eq!(purge, &PurgeOutcome::Purged {
                deleted: vec!["SN2".into()]
            });
        }
        TenantResult::Skipped { reason } => panic!("skipped: {reason}"),
    }
    assert_eq!(h.store.count_of::<DeviceRecord>(), 1);
    assert_eq!(h.store.count_of::<SiteRecord>(), 1);
    assert_eq!(h.store.count_of::<ManufacturerRecord>(), 1);
    assert_eq!(h.store.count_of::<IpAddressRecord>(), 2);
}

#[tokio::test]
async fn test_unsupported_devices_are_excluded() {
    let h = harness(&[DNAC1]);
    let mut unsupported = device("SN9", "10.0.0.9");
    unsupported.support_level = "Third Party".into();
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1"), unsupported]);

    let report = h.reconciler.sync_full(&Scope::All).await.unwrap();
    let serials: Vec<String> = rows(&report.devices, DNAC1)
        .into_iter()
        .map(|r| r.serial)
        .collect();
    assert_eq!(serials, vec!["SN1".to_owned()]);
    assert_eq!(h.store.count_of::<DeviceRecord>(), 1);

    let status = h.reconciler.status(&Scope::All).await.unwrap();
    assert_eq!(status.tenants[DNAC1].remote_device_count, Some(1));
    assert_eq!(status.tenants[DNAC1].destination_device_count, 1);
}

#[tokio::test]
async fn test_global_roots_of_two_tenants_do_not_collide() {
    let h = harness(&[DNAC1, DNAC2]);
    h.inventory(DNAC1).sites = vec![site("abc-123", "Global")];
    h.inventory(DNAC2).sites = vec![site("def-456", "Global")];

    let report = h.reconciler.sync_sites(&Scope::All).await.unwrap();
    assert_eq!(rows(&report, DNAC1)[0].name, "Global abc");
    assert_eq!(rows(&report, DNAC2)[0].name, "Global def");
    assert_eq!(h.store.count_of::<SiteRecord>(), 2);
}

#[tokio::test]
async fn test_duplicate_management_ip_is_flagged() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1"), device("SN2", "10.0.0.1")]);

    let report = h.reconciler.sync_full(&Scope::All).await.unwrap();
    let outcomes: Vec<(String, SyncOutcome)> = rows(&report.devices, DNAC1)
        .into_iter()
        .map(|r| (r.serial, r.outcome))
        .collect();
    assert_eq!(outcomes, vec![
        ("SN1".to_owned(), SyncOutcome::Created),
        ("SN2".to_owned(), SyncOutcome::IpConflict),
    ]);

    // The conflicting device reports the address it actually holds: none.
    let addresses: Vec<Option<String>> = rows(&report.devices, DNAC1)
        .into_iter()
        .map(|r| r.primary_ip)
        .collect();
    assert_eq!(addresses, vec![Some("10.0.0.1/32".to_owned()), None]);

    let owners: Vec<String> = h
        .devices()
        .await
        .into_iter()
        .filter(|d| d.primary_ip.is_some())
        .map(|d| d.serial)
        .collect();
    assert_eq!(owners, vec!["SN1".to_owned()]);
    assert_eq!(h.store.count_of::<DeviceRecord>(), 2);

    // Re-running keeps the holder and writes nothing.
    let writes = h.store.change_count();
    h.reconciler.sync_devices(&Scope::All).await.unwrap();
    assert_eq!(h.store.change_count(), writes);
}

#[tokio::test]
async fn test_devices_before_sites_is_refused() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);

    let report = h.reconciler.sync_devices(&Scope::All).await.unwrap();
    let refused = rows(&report, DNAC1);
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0].outcome, SyncOutcome::Failed(SYNC_SITES_FIRST.into()));
    assert!(refused[0].hostname.is_empty());
    assert_eq!(refused[0].primary_ip, None);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(h.store.count_of::<DeviceRecord>(), 0);
}

#[tokio::test]
async fn test_auth_failure_skips_only_that_tenant() {
    let h = build(&[DNAC1, DNAC2], &[DNAC2], None);
    h.inventory(DNAC1).sites = vec![site("abc-123", "Global")];

    let report = h.reconciler.sync_sites(&Scope::All).await.unwrap();
    assert_eq!(rows(&report, DNAC1).len(), 1);
    match &report.tenants[DNAC2] {
        TenantResult::Skipped { reason } => assert!(reason.starts_with("authentication failed")),
        TenantResult::Synced { .. } => panic!("rejected tenant was synced"),
    }

    let status = h.reconciler.status(&Scope::All).await.unwrap();
    assert!(status.tenants[DNAC1].auth_status.is_success());
    assert!(!status.tenants[DNAC2].auth_status.is_success());
    assert_eq!(status.tenants[DNAC2].remote_site_count, None);
}

#[tokio::test]
async fn test_site_purge_is_tenant_scoped() {
    let h = harness(&[DNAC1, DNAC2]);
    h.inventory(DNAC1).sites = vec![site("a-1", "Global"), site("a-2", "Global/Paris")];
    h.inventory(DNAC2).sites = vec![site("b-1", "Global"), site("b-2", "Global/Paris")];
    h.reconciler.sync_sites(&Scope::All).await.unwrap();

    h.inventory(DNAC1).sites.truncate(1);
    let report = h
        .reconciler
        .sync_sites(&Scope::Tenant(DNAC1.into()))
        .await
        .unwrap();

    assert_eq!(report.tenants.len(), 1);
    match &report.tenants[DNAC1] {
        TenantResult::Synced { purge, .. } => assert_eq!(purge.deleted(), ["a-2".to_owned()]),
        TenantResult::Skipped { reason } => panic!("skipped: {reason}"),
    }

    let slugs: HashSet<String> =
        Repository::<SiteRecord>::list(&*h.store, &dnasync_core::Filter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.slug)
            .collect();
    assert_eq!(slugs, HashSet::from(["a-1", "b-1", "b-2"].map(String::from)));
}

#[tokio::test]
async fn test_site_location_change_is_an_update() {
    let h = harness(&[DNAC1]);
    h.inventory(DNAC1).sites = vec![site("abc-123", "Global/HQ")];
    h.reconciler.sync_sites(&Scope::All).await.unwrap();

    h.inventory(DNAC1).sites[0].location = Some(Location {
        address: Some("1 Main St".into()),
        latitude: Some(48.8566),
        longitude: Some(2.3522),
        location_type: Some("building".into()),
        country: Some("France".into()),
    });
    let report = h.reconciler.sync_sites(&Scope::All).await.unwrap();
    assert_eq!(rows(&report, DNAC1)[0].outcome, SyncOutcome::Updated);

    let report = h.reconciler.sync_sites(&Scope::All).await.unwrap();
    assert_eq!(rows(&report, DNAC1)[0].outcome, SyncOutcome::Unchanged);
}

#[tokio::test]
async fn test_device_without_site_membership_fails_but_is_kept() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();

    h.inventory(DNAC1).members.clear();
    let report = h.reconciler.sync_devices(&Scope::All).await.unwrap();

    let row = &rows(&report, DNAC1)[0];
    assert!(row.outcome.is_failure());
    assert_eq!(h.store.count_of::<DeviceRecord>(), 1);
}

#[tokio::test]
async fn test_rows_are_sorted() {
    let h = harness(&[DNAC1]);
    h.inventory(DNAC1).sites = vec![
        site("s-3", "Global/Zurich"),
        site("s-1", "Global/Amsterdam"),
        site("s-2", "Global/Lisbon"),
    ];
    let devices = vec![device("SN3", "10.0.0.3"), device("SN1", "10.0.0.1")];
    h.inventory(DNAC1)
        .members
        .insert("s-1".into(), devices.iter().map(|d| d.serial.clone()).collect());
    h.inventory(DNAC1).devices = devices;

    let report = h.reconciler.sync_full(&Scope::All).await.unwrap();
    let names: Vec<String> = rows(&report.sites, DNAC1).into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec![
        "Global/Amsterdam".to_owned(),
        "Global/Lisbon".to_owned(),
        "Global/Zurich".to_owned(),
    ]);
    let hosts: Vec<String> = rows(&report.devices, DNAC1)
        .into_iter()
        .map(|r| r.hostname)
        .collect();
    assert_eq!(hosts, vec!["sw-sn1".to_owned(), "sw-sn3".to_owned()]);

    let sites = h.reconciler.list_sites(&Scope::All).await.unwrap();
    match &sites[DNAC1] {
        dnasync_core::TenantListing::Listed { items } => {
            assert_eq!(items[0].hierarchy, "Global/Amsterdam");
        }
        dnasync_core::TenantListing::Unavailable { reason } => panic!("{reason}"),
    }
}

// ── Status and purge ────────────────────────────────────────────────

#[tokio::test]
async fn test_status_never_writes() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);

    let status = h.reconciler.status(&Scope::All).await.unwrap();
    assert_eq!(h.store.change_count(), 0);
    assert_eq!(h.store.count_of::<TagRecord>(), 0);

    let tenant = &status.tenants[DNAC1];
    assert_eq!(tenant.remote_site_count, Some(1));
    assert_eq!(tenant.destination_site_count, 0);
    assert!(status.destination_tenants.is_empty());
}

#[tokio::test]
async fn test_status_flags_orphaned_tenants() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();

    // A tenant left behind by a controller that is no longer configured.
    let orphan: TenantRecord = Repository::<TenantRecord>::create(&*h.store, TenantDraft {
        name: "old.example.com".into(),
        slug: "old-example-com".into(),
        description: "Managed by old.example.com".into(),
    })
    .await
    .unwrap();
    Repository::<TenantRecord>::add_tag(&*h.store, orphan.id, PROVENANCE_SLUG)
        .await
        .unwrap();

    let status = h.reconciler.status(&Scope::All).await.unwrap();
    assert_eq!(status.tenants[DNAC1].destination_site_count, 1);
    assert_eq!(status.tenants[DNAC1].destination_device_count, 1);

    let managed: Vec<(String, bool)> = status
        .destination_tenants
        .iter()
        .map(|t| (t.name.clone(), t.managed))
        .collect();
    assert_eq!(managed, vec![
        (DNAC1.to_owned(), true),
        ("old.example.com".to_owned(), false),
    ]);
    assert_eq!(status.orphans().count(), 1);
}

#[tokio::test]
async fn test_purge_tenant_cascades() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1"), device("SN2", "10.0.0.2")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();

    let tenant = Repository::<TenantRecord>::find(&*h.store, &DNAC1.to_owned())
        .await
        .unwrap()
        .unwrap();
    let report = h.reconciler.purge_tenant(tenant.id).await.unwrap();

    assert_eq!(report.tenant, DNAC1);
    assert_eq!((report.devices, report.ip_addresses, report.sites), (2, 2, 1));
    assert_eq!(h.store.count_of::<TenantRecord>(), 0);
    assert_eq!(h.store.count_of::<DeviceRecord>(), 0);
    // Shared catalog records stay.
    assert_eq!(h.store.count_of::<ManufacturerRecord>(), 1);
}

#[tokio::test]
async fn test_purge_tenant_requires_provenance() {
    let h = harness(&[DNAC1]);
    let foreign: TenantRecord = Repository::<TenantRecord>::create(&*h.store, TenantDraft {
        name: "hand-made".into(),
        slug: "hand-made".into(),
        description: String::new(),
    })
    .await
    .unwrap();

    let err = h.reconciler.purge_tenant(foreign.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    let err = h.reconciler.purge_tenant(9999).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert_eq!(h.store.count_of::<TenantRecord>(), 1);
}

#[tokio::test]
async fn test_list_devices_includes_every_support_level() {
    let h = harness(&[DNAC1]);
    let mut unsupported = device("SN9", "10.0.0.9");
    unsupported.support_level = "Third Party".into();
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1"), unsupported]);

    let listing = h.reconciler.list_devices(&Scope::All).await.unwrap();
    match &listing[DNAC1] {
        dnasync_core::TenantListing::Listed { items } => assert_eq!(items.len(), 2),
        dnasync_core::TenantListing::Unavailable { reason } => panic!("{reason}"),
    }
    assert_eq!(h.store.change_count(), 0);
}

#[tokio::test]
async fn test_phase_ends_done() {
    let h = harness(&[DNAC1]);
    let phase = h.reconciler.phase();
    assert_eq!(*phase.borrow(), SyncPhase::Idle);

    h.reconciler.sync_sites(&Scope::All).await.unwrap();
    assert_eq!(*phase.borrow(), SyncPhase::Done);
}

#[tokio::test]
async fn test_full_sync_is_not_done_between_passes() {
    let logins = Arc::new(Semaphore::new(1));
    let h = build_with_logins(&[DNAC1], &[], None, Some(logins.clone()));
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    let phase = h.reconciler.phase();

    let reconciler = Arc::clone(&h.reconciler);
    let run = tokio::spawn(async move { reconciler.sync_full(&Scope::All).await });

    // The site pass used the only login; the device pass now waits for one.
    while h.store.count_of::<SiteRecord>() == 0 {
        tokio::task::yield_now().await;
    }
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert_eq!(logins.available_permits(), 0);
    assert_ne!(*phase.borrow(), SyncPhase::Done);

    logins.add_permits(1);
    let report = run.await.unwrap().unwrap();
    assert_eq!(report.counts.devices, 1);
    assert_eq!(*phase.borrow(), SyncPhase::Done);
}

#[tokio::test]
async fn test_unknown_scope_tenant_is_not_found() {
    let h = harness(&[DNAC1]);
    let err = h
        .reconciler
        .sync_sites(&Scope::Tenant("nope.example.com".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_provenance_tag_marks_everything_written() {
    let h = harness(&[DNAC1]);
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    h.reconciler.sync_full(&Scope::All).await.unwrap();

    let tagged = dnasync_core::Filter::all().tagged(PROVENANCE_SLUG);
    assert_eq!(Repository::<SiteRecord>::count(&*h.store, &tagged).await.unwrap(), 1);
    assert_eq!(Repository::<DeviceRecord>::count(&*h.store, &tagged).await.unwrap(), 1);
    assert_eq!(Repository::<IpAddressRecord>::count(&*h.store, &tagged).await.unwrap(), 1);
    assert_eq!(Repository::<TenantRecord>::count(&*h.store, &tagged).await.unwrap(), 1);

    // Ensuring the tag again changes nothing.
    let writes = h.store.change_count();
    h.gateway().apply_tag(TagOperation::EnsureProvenance).await.unwrap();
    assert_eq!(h.store.change_count(), writes);
}

// ── Background full sync ────────────────────────────────────────────

#[tokio::test]
async fn test_full_sync_is_single_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let h = build(&[DNAC1], &[], Some(gate.clone()));
    seed(&h, DNAC1, vec![device("SN1", "10.0.0.1")]);
    let service = FullSyncService::new(h.reconciler.clone());

    let first = service.start(Scope::All).await;
    let second = service.start(Scope::All).await;
    assert!(!first.is_existing());
    assert!(second.is_existing());
    assert_eq!(first.handle().id, second.handle().id);

    gate.add_permits(16);
    let record = service.wait(first.handle().id).await.unwrap();
    assert_eq!(record.status, JobStatus::Finished);
    assert_eq!(record.result.unwrap().counts.devices, 1);

    let third = service.start(Scope::All).await;
    assert!(!third.is_existing());
    assert_ne!(third.handle().id, first.handle().id);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let h = harness(&[DNAC1]);
    let service = FullSyncService::new(h.reconciler.clone());
    let err = service.job_status(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
