// ── Purge policy ──
//
// Destination records of a tenant whose matching key was not observed
// upstream are deleted one by one. A failed delete is logged and recorded;
// the remaining deletes still run.

use std::collections::HashSet;
use std::hash::Hash;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::RecordId;
use crate::store::{Filter, Record, Repository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PurgeOutcome {
    /// Nothing stale; no deletes issued.
    NoChange,
    Purged {
        deleted: Vec<String>,
    },
    CompletedWithErrors {
        deleted: Vec<String>,
        failed: Vec<PurgeFailure>,
    },
}

impl PurgeOutcome {
    pub fn deleted(&self) -> &[String] {
        match self {
            Self::NoChange => &[],
            Self::Purged { deleted } | Self::CompletedWithErrors { deleted, .. } => deleted,
        }
    }

    pub fn failed(&self) -> &[PurgeFailure] {
        match self {
            Self::CompletedWithErrors { failed, .. } => failed,
            Self::NoChange | Self::Purged { .. } => &[],
        }
    }

    pub fn has_errors(&self) -> bool {
        matches!(self, Self::CompletedWithErrors { .. })
    }
}

/// `destination − upstream`, in destination order.
pub fn purge_set<K: Eq + Hash + Clone>(destination: &[K], upstream: &HashSet<K>) -> Vec<K> {
    destination
        .iter()
        .filter(|key| !upstream.contains(key))
        .cloned()
        .collect()
}

/// Delete every record of `tenant` whose key is not in `upstream`.
pub async fn purge_stale<R, S>(store: &S, tenant: RecordId, upstream: &HashSet<R::Key>) -> PurgeOutcome
where
    R: Record,
    S: Repository<R> + ?Sized,
{
    let existing = match store.list(&Filter::tenant(tenant)).await {
        Ok(records) => records,
        Err(e) => {
            warn!(kind = %R::KIND, tenant, error = %e, "cannot list records to purge");
            return PurgeOutcome::CompletedWithErrors {
                deleted: Vec::new(),
                failed: vec![PurgeFailure {
                    key: format!("{} listing", R::KIND),
                    error: e.to_string(),
                }],
            };
        }
    };

    let keys: Vec<R::Key> = existing.iter().map(Record::key).collect();
    let stale: HashSet<R::Key> = purge_set(&keys, upstream).into_iter().collect();
    if stale.is_empty() {
        return PurgeOutcome::NoChange;
    }

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for record in existing.iter().filter(|r| stale.contains(&r.key())) {
        let key = record.key().to_string();
        match store.delete(record.id()).await {
            Ok(()) => {
                info!(kind = %R::KIND, %key, "purged");
                deleted.push(key);
            }
            Err(e) => {
                warn!(kind = %R::KIND, %key, error = %e, "purge delete failed");
                failed.push(PurgeFailure {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }

    if failed.is_empty() {
        PurgeOutcome::Purged { deleted }
    } else {
        PurgeOutcome::CompletedWithErrors { deleted, failed }
    }
}
