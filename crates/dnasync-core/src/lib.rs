// dnasync-core: reconciliation engine between dnasync-api and consumers (CLI).

pub mod controller;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod mapper;
pub mod model;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use controller::{Connector, ControllerSource, DnacConnector, DnacSource};
pub use error::{CoreError, StoreError};
pub use gateway::{Gateway, MatchKey, PurgeOutcome, TagOperation, WriteOutcome};
pub use jobs::{Acquired, FullSyncService, JobHandle, JobQueue, JobRecord, JobStatus, SyncLease};
pub use reconciler::{Reconciler, SyncPhase};
pub use registry::{AuthStatus, Scope, StaticTenants, Tenant, TenantRegistry, TenantSource};
pub use store::{DestinationStore, Filter, MemoryStore, NetBoxStore, Record, Repository};

// Report types are what consumers render.
pub use report::{
    DestinationTenant, DeviceRow, FullSyncReport, ReportRow, SiteRow, SiteSummary, StatusReport,
    SyncCounts, SyncOutcome, SyncReport, TenantListing, TenantPurgeReport, TenantResult,
    TenantStatus,
};

pub use model::{EntityKind, RecordId, RecordStatus, RemoteDevice, RemoteSite};
