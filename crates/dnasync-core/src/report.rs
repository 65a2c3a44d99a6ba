// ── Sync reports ──
//
// Serializable results of every reconciler operation. Tenants are keyed by
// hostname in `BTreeMap`s so two runs over the same state render the same.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::{DeviceSync, PurgeOutcome, WriteOutcome};
use crate::model::{RecordId, RecordStatus};
use crate::registry::AuthStatus;

// ── Row outcomes ─────────────────────────────────────────────────────

/// Per-row result of a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
    /// Written, but the primary address belonged to another device.
    IpConflict,
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::IpConflict => f.write_str("ip conflict"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl From<SyncOutcome> for String {
    fn from(outcome: SyncOutcome) -> Self {
        outcome.to_string()
    }
}

impl From<WriteOutcome> for SyncOutcome {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Created => Self::Created,
            WriteOutcome::Updated => Self::Updated,
            WriteOutcome::Unchanged => Self::Unchanged,
        }
    }
}

impl From<&DeviceSync> for SyncOutcome {
    fn from(synced: &DeviceSync) -> Self {
        if synced.ip_conflict {
            Self::IpConflict
        } else {
            synced.outcome.into()
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRow {
    pub name: String,
    pub status: RecordStatus,
    pub status_label: String,
    pub slug: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRow {
    pub hostname: String,
    pub status: RecordStatus,
    pub status_label: String,
    pub role: String,
    pub device_type: String,
    pub site: String,
    pub primary_ip: Option<String>,
    pub serial: String,
    pub outcome: SyncOutcome,
}

/// Rows that carry an outcome.
pub trait ReportRow {
    fn outcome(&self) -> &SyncOutcome;
}

impl ReportRow for SiteRow {
    fn outcome(&self) -> &SyncOutcome {
        &self.outcome
    }
}

impl ReportRow for DeviceRow {
    fn outcome(&self) -> &SyncOutcome {
        &self.outcome
    }
}

// ── Per-tenant results ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TenantResult<Row> {
    Synced { rows: Vec<Row>, purge: PurgeOutcome },
    /// The tenant was not synced at all (auth failure, precondition).
    Skipped { reason: String },
}

impl<Row> TenantResult<Row> {
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Synced { rows, .. } => rows,
            Self::Skipped { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport<Row> {
    pub tenants: BTreeMap<String, TenantResult<Row>>,
}

impl<Row> Default for SyncReport<Row> {
    fn default() -> Self {
        Self {
            tenants: BTreeMap::new(),
        }
    }
}

impl<Row: ReportRow> SyncReport<Row> {
    pub fn insert(&mut self, hostname: impl Into<String>, result: TenantResult<Row>) {
        self.tenants.insert(hostname.into(), result);
    }

    /// Rows written or confirmed, failures excluded.
    pub fn synced_count(&self) -> usize {
        self.tenants
            .values()
            .flat_map(TenantResult::rows)
            .filter(|row| !row.outcome().is_failure())
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.tenants
            .values()
            .flat_map(TenantResult::rows)
            .filter(|row| row.outcome().is_failure())
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tenants.iter().filter_map(|(host, result)| match result {
            TenantResult::Skipped { reason } => Some((host.as_str(), reason.as_str())),
            TenantResult::Synced { .. } => None,
        })
    }

    /// Failed rows, skipped tenants and failed purge deletes, summed.
    pub fn problem_count(&self) -> usize {
        let tenant_problems: usize = self
            .tenants
            .values()
            .map(|result| match result {
                TenantResult::Synced { purge, .. } => purge.failed().len(),
                TenantResult::Skipped { .. } => 1,
            })
            .sum();
        self.failure_count() + tenant_problems
    }

    /// True when nothing went wrong anywhere: no skipped tenant, no failed
    /// row, no purge error.
    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncCounts {
    pub sites: usize,
    pub devices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullSyncReport {
    pub sites: SyncReport<SiteRow>,
    pub devices: SyncReport<DeviceRow>,
    pub counts: SyncCounts,
}

impl FullSyncReport {
    pub fn new(sites: SyncReport<SiteRow>, devices: SyncReport<DeviceRow>) -> Self {
        let counts = SyncCounts {
            sites: sites.synced_count(),
            devices: devices.synced_count(),
        };
        Self {
            sites,
            devices,
            counts,
        }
    }
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantStatus {
    pub auth_status: AuthStatus,
    /// `None` when the controller could not be asked.
    pub remote_site_count: Option<u64>,
    /// Supported devices only.
    pub remote_device_count: Option<usize>,
    pub destination_site_count: usize,
    pub destination_device_count: usize,
}

/// A provenance-tagged tenant found in the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationTenant {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    /// Whether a configured tenant still has this hostname.
    pub managed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatusReport {
    pub tenants: BTreeMap<String, TenantStatus>,
    pub destination_tenants: Vec<DestinationTenant>,
}

impl StatusReport {
    /// Destination tenants no configured controller accounts for.
    pub fn orphans(&self) -> impl Iterator<Item = &DestinationTenant> {
        self.destination_tenants.iter().filter(|t| !t.managed)
    }
}

// ── Purge and listings ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantPurgeReport {
    pub tenant: String,
    pub devices: usize,
    pub ip_addresses: usize,
    pub sites: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
    pub name: String,
    pub hierarchy: String,
    pub location_type: Option<String>,
    pub country: Option<String>,
}

/// Per-tenant listing from a controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TenantListing<T> {
    Listed { items: Vec<T> },
    Unavailable { reason: String },
}
