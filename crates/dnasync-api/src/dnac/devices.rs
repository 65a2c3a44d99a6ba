// DNA Center network-device endpoints

use tracing::debug;

use super::client::DnacClient;
use super::models::DnacDevice;
use crate::error::Error;

/// Largest page the network-device endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 500;

impl DnacClient {
    /// One page of the device inventory.
    ///
    /// `GET /dna/intent/api/v1/network-device?offset={offset}&limit={limit}`.
    /// DNA Center offsets are 1-based.
    pub async fn list_devices_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DnacDevice>, Error> {
        self.get(
            "dna/intent/api/v1/network-device",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// The complete device inventory, paging until a short page.
    pub async fn list_devices(&self, page_size: usize) -> Result<Vec<DnacDevice>, Error> {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut all = Vec::new();
        let mut offset = 1;

        loop {
            let page = self.list_devices_page(offset, limit).await?;
            let received = page.len();
            all.extend(page);
            debug!(offset, received, "fetched device page");

            if received < limit {
                break;
            }
            offset += received;
        }

        Ok(all)
    }
}
