// ── Controller access ──
//
// `ControllerSource` is the read-only view of one authenticated DNA Center
// instance. `Connector` turns a configured tenant into a source; the real
// implementation logs in over HTTPS, tests substitute a fake.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use dnasync_api::dnac::devices::MAX_PAGE_SIZE;
use dnasync_api::{DnacClient, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::model::{RemoteDevice, RemoteSite};
use crate::registry::Tenant;

/// Read-only operations against one controller.
#[async_trait]
pub trait ControllerSource: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<RemoteSite>, CoreError>;

    async fn count_sites(&self) -> Result<u64, CoreError>;

    /// The full device inventory, every support level included.
    async fn list_devices(&self) -> Result<Vec<RemoteDevice>, CoreError>;

    /// Devices assigned to one site.
    async fn site_members(&self, site_id: &str) -> Result<Vec<RemoteDevice>, CoreError>;

    /// Serial number → controller site id, built site by site from the
    /// membership endpoint. A device listed under several sites keeps the
    /// last one seen.
    async fn map_devices_to_sites(&self) -> Result<HashMap<String, String>, CoreError> {
        let mut mapping = HashMap::new();
        for site in self.list_sites().await? {
            for device in self.site_members(&site.id).await? {
                if !device.serial.is_empty() {
                    mapping.insert(device.serial, site.id.clone());
                }
            }
        }
        debug!(devices = mapping.len(), "mapped devices to sites");
        Ok(mapping)
    }
}

/// Opens a `ControllerSource` for a tenant.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn ControllerSource>, CoreError>;
}

// ── DNA Center ───────────────────────────────────────────────────────

/// `ControllerSource` over the DNA Center intent API.
pub struct DnacSource {
    client: DnacClient,
    page_size: usize,
}

impl DnacSource {
    pub fn new(client: DnacClient, page_size: usize) -> Self {
        Self { client, page_size }
    }
}

#[async_trait]
impl ControllerSource for DnacSource {
    async fn list_sites(&self) -> Result<Vec<RemoteSite>, CoreError> {
        let sites = self.client.list_sites().await?;
        Ok(sites.into_iter().map(RemoteSite::from).collect())
    }

    async fn count_sites(&self) -> Result<u64, CoreError> {
        Ok(self.client.count_sites().await?)
    }

    async fn list_devices(&self) -> Result<Vec<RemoteDevice>, CoreError> {
        let devices = self.client.list_devices(self.page_size).await?;
        Ok(devices.into_iter().map(RemoteDevice::from).collect())
    }

    async fn site_members(&self, site_id: &str) -> Result<Vec<RemoteDevice>, CoreError> {
        let membership = self.client.site_membership(site_id).await?;
        Ok(membership
            .devices()
            .cloned()
            .map(RemoteDevice::from)
            .collect())
    }
}

/// Logs in to `https://<hostname>` with the tenant's credentials.
pub struct DnacConnector {
    timeout: Duration,
    page_size: usize,
}

impl DnacConnector {
    pub fn new(timeout: Duration, page_size: usize) -> Self {
        Self {
            timeout,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for DnacConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), MAX_PAGE_SIZE)
    }
}

#[async_trait]
impl Connector for DnacConnector {
    async fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn ControllerSource>, CoreError> {
        let transport = TransportConfig {
            tls: TlsMode::from_verify(tenant.verify_tls),
            timeout: self.timeout,
        };
        let client = DnacClient::login(
            &tenant.base_url(),
            &tenant.username,
            &tenant.password,
            &transport,
        )
        .await?;

        info!(tenant = %tenant.hostname, "authenticated");
        Ok(Arc::new(DnacSource::new(client, self.page_size)))
    }
}
