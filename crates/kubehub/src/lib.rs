//! Disco kubehub – kube-rs wiring for the DuckType reconciler.
//!
//! Provides the cache lister, status writer and event recorder backed by a
//! live cluster, and the controller loop that feeds queued keys into
//! [`Reconciler::reconcile`].

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use disco_core::{meta_namespace_key, DuckType};
use disco_reconciler::{
    EventSink, EventType, Lister, LookupError, ReconcileKind, Reconciler, ReconcilerEvent, StatusWriter,
};
use futures::StreamExt;
use kube::{
    api::{Api, PostParams},
    runtime::{
        controller::{self, Action, Controller},
        events::{self, Recorder, Reporter},
        reflector::{ObjectRef, Store},
        watcher,
    },
    Client, Resource, ResourceExt,
};
use metrics::counter;
use tracing::{debug, info, warn};

/// events.k8s.io rejects notes longer than this.
const MAX_NOTE_BYTES: usize = 1024;

pub async fn get_kube_client() -> Result<Client> {
    Client::try_default().await.context("building kube client from kubeconfig or in-cluster env")
}

/// [`Lister`] over a reflector store (the controller's informer cache).
#[derive(Clone)]
pub struct StoreLister {
    store: Store<DuckType>,
}

impl StoreLister {
    pub fn new(store: Store<DuckType>) -> Self { Self { store } }
}

impl Lister for StoreLister {
    fn get(&self, name: &str) -> std::result::Result<Arc<DuckType>, LookupError> {
        // DuckType is cluster-scoped: the ref carries no namespace.
        self.store
            .get(&ObjectRef::new(name))
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}

/// [`StatusWriter`] that replaces the `status` subresource.
#[derive(Clone)]
pub struct ApiStatusWriter {
    api: Api<DuckType>,
}

impl ApiStatusWriter {
    pub fn new(api: Api<DuckType>) -> Self { Self { api } }
}

#[async_trait::async_trait]
impl StatusWriter for ApiStatusWriter {
    async fn update_status(&self, obj: &DuckType) -> Result<DuckType> {
        let name = obj.metadata.name.as_deref().ok_or_else(|| anyhow!("object missing metadata.name"))?;
        // Full object so resourceVersion is checked server-side.
        let body = serde_json::to_vec(obj).context("serializing DuckType")?;
        let updated = self
            .api
            .replace_status(name, &PostParams::default(), body)
            .await
            .with_context(|| format!("replacing status of ducktype {}", name))?;
        debug!(name = %name, rv = ?updated.metadata.resource_version, "status replaced");
        Ok(updated)
    }
}

/// [`EventSink`] publishing through the events.k8s.io API.
#[derive(Clone)]
pub struct KubeRecorder {
    client: Client,
    reporter: Reporter,
}

impl KubeRecorder {
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self { client, reporter }
    }
}

#[async_trait::async_trait]
impl EventSink for KubeRecorder {
    async fn record(&self, obj: &DuckType, event: &ReconcilerEvent) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), obj.object_ref(&()));
        let ev = events::Event {
            type_: kube_event_type(event.event_type),
            reason: event.reason.clone(),
            note: Some(truncate_note(&event.message)),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = recorder.publish(ev).await {
            counter!("event_publish_failed_total", 1u64);
            warn!(name = %obj.name_any(), reason = %event.reason, error = %e, "failed to publish event");
        }
    }
}

fn kube_event_type(t: EventType) -> events::EventType {
    match t {
        EventType::Normal => events::EventType::Normal,
        EventType::Warning => events::EventType::Warning,
    }
}

fn truncate_note(msg: &str) -> String {
    if msg.len() <= MAX_NOTE_BYTES {
        return msg.to_string();
    }
    let mut end = MAX_NOTE_BYTES;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    msg[..end].to_string()
}

/// Controller runtime settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Reported as the event source.
    pub controller_name: String,
    /// Delay before a failed key is retried.
    pub requeue: Duration,
}

struct Ctx {
    reconciler: Reconciler,
    requeue: Duration,
}

/// Run the DuckType controller until SIGINT/SIGTERM.
pub async fn run(cfg: ControllerConfig, hook: Arc<dyn ReconcileKind>) -> Result<()> {
    let client = get_kube_client().await?;
    let api: Api<DuckType> = Api::all(client.clone());
    let controller = Controller::new(api.clone(), watcher::Config::default());

    let reconciler = Reconciler::new(
        Arc::new(StoreLister::new(controller.store())),
        Arc::new(ApiStatusWriter::new(api)),
        Arc::new(KubeRecorder::new(client, &cfg.controller_name)),
        hook,
    );
    let ctx = Arc::new(Ctx { reconciler, requeue: cfg.requeue });

    info!(controller = %cfg.controller_name, requeue_secs = cfg.requeue.as_secs(), "controller started");
    controller
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _action)) => debug!(name = %obj.name, "reconciled"),
                Err(controller::Error::ReconcilerFailed(e, obj)) => {
                    debug!(name = %obj.name, error = %e, "reconcile failed; requeued")
                }
                Err(e) => warn!(error = %e, "controller stream error"),
            }
        })
        .await;
    info!("controller stopped");
    Ok(())
}

async fn reconcile(obj: Arc<DuckType>, ctx: Arc<Ctx>) -> std::result::Result<Action, disco_reconciler::Error> {
    let key = meta_namespace_key(obj.namespace().as_deref(), &obj.name_any());
    ctx.reconciler.reconcile(&key).await?;
    Ok(Action::await_change())
}

fn error_policy(obj: Arc<DuckType>, err: &disco_reconciler::Error, ctx: Arc<Ctx>) -> Action {
    counter!("reconcile_requeued_total", 1u64);
    warn!(name = %obj.name_any(), error = %err, "reconcile error; requeue in {:?}", ctx.requeue);
    Action::requeue(ctx.requeue)
}
