// ── Domain model ──
//
// `remote` holds controller-side inventory normalized from DNA Center;
// `destination` holds the inventory records the reconciler writes.

pub mod destination;
pub mod remote;

pub use destination::{
    DeviceDraft, DeviceRecord, DeviceRoleDraft, DeviceRoleRecord, DeviceTypeDraft,
    DeviceTypeKey, DeviceTypeRecord, EntityKind, IpAddressDraft, IpAddressRecord, IpKey,
    ManufacturerDraft, ManufacturerRecord, RecordId, RecordStatus, SiteDraft, SiteRecord,
    TagDraft, TagRecord, TenantDraft, TenantRecord,
};
pub use remote::{Location, RemoteDevice, RemoteSite, SUPPORTED_LEVEL};
