//! Disco reconciler: drives one DuckType key through the business hook and
//! writes the resulting status back.
//!
//! The reconciler owns no cache or client. Lookups, status writes and events
//! go through the [`Lister`], [`StatusWriter`] and [`EventSink`] seams so the
//! kube-backed implementations in `disco-kubehub` and in-memory fakes in
//! tests are interchangeable.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use disco_core::{split_meta_namespace_key, DuckType, DuckTypeStatus};
use metrics::{counter, histogram};
use tracing::{debug, error, warn};

pub mod event;
pub mod validate;

pub use event::{warn_internal, EventType, HookError, ReconcileKind, ReconcilerEvent};
pub use validate::SpecValidator;

/// Lookup failure reported by a [`Lister`].
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("ducktype {0:?} not found")]
    NotFound(String),
    #[error(transparent)]
    Other(anyhow::Error),
}

/// Read access to cached DuckType objects, by name.
pub trait Lister: Send + Sync {
    fn get(&self, name: &str) -> Result<Arc<DuckType>, LookupError>;
}

/// Writes the status subresource and returns the stored object.
#[async_trait::async_trait]
pub trait StatusWriter: Send + Sync {
    async fn update_status(&self, obj: &DuckType) -> anyhow::Result<DuckType>;
}

/// Fire-and-forget event publication.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, obj: &DuckType, event: &ReconcilerEvent);
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache lookup failed for a reason other than not-found.
    #[error(transparent)]
    Lookup(anyhow::Error),
    /// Writing the status failed. Takes precedence over a hook failure.
    #[error("status update failed: {0:#}")]
    StatusUpdate(anyhow::Error),
    #[error(transparent)]
    Hook(#[from] HookError),
}

pub struct Reconciler {
    lister: Arc<dyn Lister>,
    client: Arc<dyn StatusWriter>,
    recorder: Arc<dyn EventSink>,
    hook: Arc<dyn ReconcileKind>,
}

impl Reconciler {
    pub fn new(
        lister: Arc<dyn Lister>,
        client: Arc<dyn StatusWriter>,
        recorder: Arc<dyn EventSink>,
        hook: Arc<dyn ReconcileKind>,
    ) -> Self {
        Self { lister, client, recorder, hook }
    }

    /// Reconcile the object named by `key` (`name` or `namespace/name`).
    ///
    /// Malformed keys and objects that no longer exist return `Ok(())` so the
    /// caller does not retry them. Status is written back even when the hook
    /// fails; the hook error is still returned.
    pub async fn reconcile(&self, key: &str) -> Result<(), Error> {
        let _timer = LatencyTimer(Instant::now());
        counter!("reconcile_total", 1u64);

        let name = match split_meta_namespace_key(key) {
            Ok((_, name)) => name,
            Err(e) => {
                error!(key = %key, error = %e, "invalid resource key");
                counter!("reconcile_skipped_total", 1u64);
                return Ok(());
            }
        };

        let original = match self.lister.get(name) {
            Ok(obj) => obj,
            Err(LookupError::NotFound(_)) => {
                error!(key = %key, "resource no longer exists");
                counter!("reconcile_skipped_total", 1u64);
                return Ok(());
            }
            Err(LookupError::Other(e)) => {
                counter!("reconcile_errors_total", 1u64);
                return Err(Error::Lookup(e));
            }
        };
        // The cached object is shared with the informer; only the copy is touched.
        let mut resource = DuckType::clone(&original);

        let hook_result = self.hook.reconcile_kind(&mut resource).await;
        let generation = resource.metadata.generation;
        resource.status.get_or_insert_with(DuckTypeStatus::default).observed_generation = generation;

        if same_status(original.status.as_ref(), resource.status.as_ref()) {
            // The cached copy may be stale; writing an unchanged status could
            // clobber a newer one.
            debug!(key = %key, "status unchanged");
        } else if let Err(e) = self.update_status(&resource).await {
            let cause = format!("{:#}", e);
            warn!(key = %key, error = %cause, "failed to update resource status");
            let ev = ReconcilerEvent::new(
                EventType::Warning,
                "UpdateFailed",
                format!("Failed to update status for {:?}: {}", name, cause),
            );
            self.emit(&resource, &ev).await;
            counter!("reconcile_errors_total", 1u64);
            return Err(Error::StatusUpdate(e));
        }

        match hook_result {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(key = %key, error = %e, "ReconcileKind returned an error");
                self.emit(&resource, &e.to_event()).await;
                counter!("reconcile_errors_total", 1u64);
                Err(Error::Hook(e))
            }
        }
    }

    /// Write `desired.status` onto a fresh copy of the cached object.
    ///
    /// Skips the write when the cache already holds the desired status.
    pub async fn update_status(&self, desired: &DuckType) -> anyhow::Result<DuckType> {
        let name = desired
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| anyhow!("object missing metadata.name"))?;
        let actual = self.lister.get(name)?;
        if same_status(actual.status.as_ref(), desired.status.as_ref()) {
            counter!("status_update_skipped_total", 1u64);
            return Ok(DuckType::clone(&actual));
        }
        let mut existing = DuckType::clone(&actual);
        existing.status = desired.status.clone();
        let updated = self.client.update_status(&existing).await?;
        counter!("status_updates_total", 1u64);
        Ok(updated)
    }

    async fn emit(&self, obj: &DuckType, ev: &ReconcilerEvent) {
        self.recorder.record(obj, ev).await;
        counter!("events_emitted_total", 1u64);
    }
}

/// Records `reconcile_latency_ms` when dropped, on every return path.
struct LatencyTimer(Instant);

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!("reconcile_latency_ms", self.0.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Deep status equality; a missing status equals an empty one.
fn same_status(a: Option<&DuckTypeStatus>, b: Option<&DuckTypeStatus>) -> bool {
    let empty = DuckTypeStatus::default();
    a.unwrap_or(&empty) == b.unwrap_or(&empty)
}
