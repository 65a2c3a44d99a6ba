// ── Generic upsert ──
//
// One create-or-update routine for every record kind: look up by matching
// key, create when absent, write only when the stored record differs.

use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{Record, Repository};

/// What an upsert did to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Updated,
    /// Record already matched; nothing was written.
    Unchanged,
}

/// A record after upsert, with the outcome.
#[derive(Debug, Clone)]
pub struct Upserted<R> {
    pub record: R,
    pub outcome: WriteOutcome,
}

pub async fn upsert<R, S>(store: &S, draft: R::Draft) -> Result<Upserted<R>, StoreError>
where
    R: Record,
    S: Repository<R> + ?Sized,
{
    let key = R::draft_key(&draft);

    let (record, outcome) = match store.find(&key).await? {
        None => (store.create(draft).await?, WriteOutcome::Created),
        Some(existing) if existing.matches(&draft) => (existing, WriteOutcome::Unchanged),
        Some(existing) => (
            store.update(existing.id(), draft).await?,
            WriteOutcome::Updated,
        ),
    };

    debug!(kind = %R::KIND, %key, id = record.id(), %outcome, "upserted");
    Ok(Upserted { record, outcome })
}
