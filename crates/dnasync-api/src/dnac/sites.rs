// DNA Center site endpoints

use tracing::debug;

use super::client::DnacClient;
use super::models::{DnacSite, Membership};
use crate::error::Error;

impl DnacClient {
    /// List every site in the network design hierarchy.
    ///
    /// `GET /dna/intent/api/v1/site`
    pub async fn list_sites(&self) -> Result<Vec<DnacSite>, Error> {
        debug!("listing sites");
        self.get("dna/intent/api/v1/site", &[]).await
    }

    /// Count sites without fetching them.
    ///
    /// `GET /dna/intent/api/v1/site/count`
    pub async fn count_sites(&self) -> Result<u64, Error> {
        debug!("counting sites");
        self.get("dna/intent/api/v1/site/count", &[]).await
    }

    /// Devices assigned to a site, grouped by membership.
    ///
    /// `GET /dna/intent/api/v1/membership/{siteId}`. This endpoint is not
    /// wrapped in the usual `{ response }` envelope.
    pub async fn site_membership(&self, site_id: &str) -> Result<Membership, Error> {
        debug!(site_id, "fetching site membership");
        self.get_raw(&format!("dna/intent/api/v1/membership/{site_id}"))
            .await
    }
}

