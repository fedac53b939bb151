#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use disco_core::{Condition, ConditionStatus, DuckType, DuckTypeNames, DuckTypeSpec, DuckTypeStatus, DuckVersion};
use disco_reconciler::{
    EventSink, HookError, Lister, LookupError, ReconcileKind, Reconciler, ReconcilerEvent, StatusWriter,
};

pub fn spec() -> DuckTypeSpec {
    DuckTypeSpec {
        group: "duck.knative.dev".into(),
        names: DuckTypeNames { name: "Addressable".into(), plural: "addressables".into(), singular: None },
        selectors: vec![],
        versions: vec![DuckVersion { name: "v1".into() }],
    }
}

/// DuckType at `generation` whose status already observed `observed`.
pub fn ducktype(name: &str, generation: i64, observed: Option<i64>) -> DuckType {
    let mut d = DuckType::new(name, spec());
    d.metadata.generation = Some(generation);
    d.metadata.resource_version = Some("100".into());
    d.status = observed.map(|g| DuckTypeStatus {
        observed_generation: Some(g),
        conditions: vec![Condition {
            last_transition_time: Some("2020-01-01T00:00:00Z".into()),
            ..Condition::new("Ready", ConditionStatus::Unknown)
        }],
        ..Default::default()
    });
    d
}

#[derive(Default)]
pub struct FakeLister {
    objects: Mutex<HashMap<String, Arc<DuckType>>>,
    /// Served before `objects`, one per call.
    script: Mutex<VecDeque<Arc<DuckType>>>,
    fail: Mutex<Option<String>>,
    pub gets: AtomicUsize,
}

impl FakeLister {
    pub fn with(objs: impl IntoIterator<Item = DuckType>) -> Arc<Self> {
        let me = Self::default();
        for o in objs {
            let name = o.metadata.name.clone().unwrap_or_default();
            me.objects.lock().unwrap().insert(name, Arc::new(o));
        }
        Arc::new(me)
    }

    pub fn then_serve(&self, obj: DuckType) { self.script.lock().unwrap().push_back(Arc::new(obj)); }
    pub fn fail_with(&self, msg: &str) { *self.fail.lock().unwrap() = Some(msg.to_string()); }
    pub fn cached(&self, name: &str) -> Option<Arc<DuckType>> { self.objects.lock().unwrap().get(name).cloned() }
    pub fn put(&self, obj: DuckType) {
        let name = obj.metadata.name.clone().unwrap_or_default();
        self.objects.lock().unwrap().insert(name, Arc::new(obj));
    }
}

impl Lister for FakeLister {
    fn get(&self, name: &str) -> Result<Arc<DuckType>, LookupError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.fail.lock().unwrap().clone() {
            return Err(LookupError::Other(anyhow!(msg)));
        }
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return Ok(next);
        }
        self.objects.lock().unwrap().get(name).cloned().ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}

#[derive(Default)]
pub struct FakeWriter {
    pub updates: Mutex<Vec<DuckType>>,
    fail: Mutex<Option<String>>,
}

impl FakeWriter {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }
    pub fn failing(msg: &str) -> Arc<Self> {
        let me = Self::default();
        *me.fail.lock().unwrap() = Some(msg.to_string());
        Arc::new(me)
    }
    pub fn calls(&self) -> Vec<DuckType> { self.updates.lock().unwrap().clone() }
}

#[async_trait::async_trait]
impl StatusWriter for FakeWriter {
    async fn update_status(&self, obj: &DuckType) -> anyhow::Result<DuckType> {
        self.updates.lock().unwrap().push(obj.clone());
        if let Some(msg) = self.fail.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        let mut stored = obj.clone();
        stored.metadata.resource_version = Some("101".into());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct FakeRecorder {
    pub events: Mutex<Vec<(String, ReconcilerEvent)>>,
}

impl FakeRecorder {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }
    pub fn recorded(&self) -> Vec<(String, ReconcilerEvent)> { self.events.lock().unwrap().clone() }
}

#[async_trait::async_trait]
impl EventSink for FakeRecorder {
    async fn record(&self, obj: &DuckType, event: &ReconcilerEvent) {
        let name = obj.metadata.name.clone().unwrap_or_default();
        self.events.lock().unwrap().push((name, event.clone()));
    }
}

/// Hook backed by a plain function.
pub struct FnHook<F>(pub F);

#[async_trait::async_trait]
impl<F> ReconcileKind for FnHook<F>
where
    F: Fn(&mut DuckType) -> Result<(), HookError> + Send + Sync,
{
    async fn reconcile_kind(&self, resource: &mut DuckType) -> Result<(), HookError> { (self.0)(resource) }
}

pub fn noop_hook() -> Arc<dyn ReconcileKind> { Arc::new(FnHook(|_: &mut DuckType| Ok::<(), HookError>(()))) }

pub struct Harness {
    pub lister: Arc<FakeLister>,
    pub writer: Arc<FakeWriter>,
    pub recorder: Arc<FakeRecorder>,
    pub reconciler: Reconciler,
}

pub fn harness(lister: Arc<FakeLister>, writer: Arc<FakeWriter>, hook: Arc<dyn ReconcileKind>) -> Harness {
    let recorder = FakeRecorder::new();
    let reconciler = Reconciler::new(lister.clone(), writer.clone(), recorder.clone(), hook);
    Harness { lister, writer, recorder, reconciler }
}
