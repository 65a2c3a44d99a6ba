// ── Background jobs ──
//
// Full syncs run as background tasks. `JobQueue` spawns them on the tokio
// runtime and keeps a watchable record per job; `SyncLease` makes sure at
// most one full sync is in flight; `FullSyncService` ties both to the
// reconciler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::reconciler::Reconciler;
use crate::registry::Scope;
use crate::report::FullSyncReport;

// ── Job records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub id: Uuid,
    pub task: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord<T> {
    pub id: Uuid,
    pub task: String,
    pub status: JobStatus,
    pub result: Option<T>,
    pub error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl<T> JobRecord<T> {
    fn queued(id: Uuid, task: String) -> Self {
        Self {
            id,
            task,
            status: JobStatus::Queued,
            result: None,
            error: None,
            enqueued_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.is_terminal()
    }
}

// ── Queue ────────────────────────────────────────────────────────────

struct JobSlot<T> {
    state: watch::Sender<JobRecord<T>>,
    cancel: CancellationToken,
}

/// In-process job executor. Records are kept for the life of the queue.
pub struct JobQueue<T> {
    jobs: Arc<DashMap<Uuid, Arc<JobSlot<T>>>>,
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
        }
    }
}

impl<T> JobQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` as a named background job.
    pub fn enqueue<F>(&self, task: impl Into<String>, future: F) -> JobHandle
    where
        F: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let task = task.into();
        let (state, _) = watch::channel(JobRecord::queued(id, task.clone()));
        let slot = Arc::new(JobSlot {
            state,
            cancel: CancellationToken::new(),
        });
        self.jobs.insert(id, Arc::clone(&slot));
        debug!(%id, %task, "job queued");

        tokio::spawn(async move {
            slot.state.send_modify(|r| {
                r.status = JobStatus::Running;
                r.started_at = Some(Utc::now());
            });

            let outcome = tokio::select! {
                biased;
                () = slot.cancel.cancelled() => None,
                result = future => Some(result),
            };

            slot.state.send_modify(|r| {
                r.ended_at = Some(Utc::now());
                match outcome {
                    None => r.status = JobStatus::Cancelled,
                    Some(Ok(value)) => {
                        r.status = JobStatus::Finished;
                        r.result = Some(value);
                    }
                    Some(Err(e)) => {
                        warn!(id = %r.id, task = %r.task, error = %e, "job failed");
                        r.status = JobStatus::Failed;
                        r.error = Some(e.to_string());
                    }
                }
            });
        });

        JobHandle { id, task }
    }

    /// Snapshot of a job, `None` for unknown ids.
    pub fn fetch(&self, id: Uuid) -> Option<JobRecord<T>> {
        self.jobs.get(&id).map(|slot| slot.state.borrow().clone())
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.jobs.get(&id).map(|slot| slot.state.borrow().status)
    }

    /// Request cancellation. Returns `false` for unknown ids.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.jobs.get(&id) {
            Some(slot) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Wait until the job reaches a terminal status.
    pub async fn wait(&self, id: Uuid) -> Option<JobRecord<T>> {
        let slot = self.jobs.get(&id).map(|slot| Arc::clone(&slot))?;
        let mut rx = slot.state.subscribe();
        let record = rx.wait_for(JobRecord::is_done).await.ok()?.clone();
        Some(record)
    }
}

// ── Single-flight lease ──────────────────────────────────────────────

struct Lease {
    handle: JobHandle,
    expires_at: Instant,
}

/// Result of `SyncLease::acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// A live job already held the lease.
    Existing(JobHandle),
    Started(JobHandle),
}

impl Acquired {
    pub fn handle(&self) -> &JobHandle {
        match self {
            Self::Existing(handle) | Self::Started(handle) => handle,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }
}

/// Acquire-if-absent marker with expiry. A lease ends when its TTL runs
/// out or when the tracked job is seen finished.
pub struct SyncLease {
    ttl: Duration,
    current: Mutex<Option<Lease>>,
}

impl SyncLease {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    /// Return the live leased job, or call `start` and lease the new one.
    pub async fn acquire(
        &self,
        is_running: impl Fn(&JobHandle) -> bool,
        start: impl FnOnce() -> JobHandle,
    ) -> Acquired {
        let mut current = self.current.lock().await;

        if let Some(lease) = current.as_ref() {
            if lease.expires_at > Instant::now() && is_running(&lease.handle) {
                return Acquired::Existing(lease.handle.clone());
            }
            debug!(id = %lease.handle.id, "sync lease released");
        }

        let handle = start();
        *current = Some(Lease {
            handle: handle.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Acquired::Started(handle)
    }
}

impl Default for SyncLease {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

// ── Full sync service ────────────────────────────────────────────────

pub const FULL_SYNC_TASK: &str = "full-sync";

/// Background full syncs, at most one at a time.
pub struct FullSyncService {
    reconciler: Arc<Reconciler>,
    jobs: JobQueue<FullSyncReport>,
    lease: SyncLease,
}

impl FullSyncService {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self::with_lease(reconciler, SyncLease::default())
    }

    pub fn with_lease(reconciler: Arc<Reconciler>, lease: SyncLease) -> Self {
        Self {
            reconciler,
            jobs: JobQueue::new(),
            lease,
        }
    }

    /// Start a full sync, or return the one already running.
    pub async fn start(&self, scope: Scope) -> Acquired {
        let acquired = self
            .lease
            .acquire(
                |handle| {
                    self.jobs
                        .status(handle.id)
                        .is_some_and(|status| !status.is_terminal())
                },
                || {
                    let reconciler = Arc::clone(&self.reconciler);
                    self.jobs.enqueue(FULL_SYNC_TASK, async move {
                        reconciler.sync_full(&scope).await
                    })
                },
            )
            .await;

        match &acquired {
            Acquired::Existing(handle) => info!(id = %handle.id, "full sync already running"),
            Acquired::Started(handle) => info!(id = %handle.id, "full sync started"),
        }
        acquired
    }

    pub fn job_status(&self, id: Uuid) -> Result<JobRecord<FullSyncReport>, CoreError> {
        self.jobs
            .fetch(id)
            .ok_or_else(|| CoreError::not_found("Job", id.to_string()))
    }

    pub async fn wait(&self, id: Uuid) -> Result<JobRecord<FullSyncReport>, CoreError> {
        self.jobs
            .wait(id)
            .await
            .ok_or_else(|| CoreError::not_found("Job", id.to_string()))
    }

    pub fn cancel(&self, id: Uuid) -> Result<(), CoreError> {
        if self.jobs.cancel(id) {
            Ok(())
        } else {
            Err(CoreError::not_found("Job", id.to_string()))
        }
    }
}
