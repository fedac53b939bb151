//! Default hook: validates the DuckType spec and reports it on `Ready`.

use std::collections::HashSet;

use disco_core::{Condition, ConditionStatus, DuckType, DuckTypeSpec, DuckTypeStatus};
use tracing::debug;

use crate::event::{EventType, HookError, ReconcileKind, ReconcilerEvent};

pub const READY: &str = "Ready";

/// Marks well-formed DuckTypes `Ready=True` and rejects the rest with an
/// `InvalidSpec` warning. Never calls the API server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecValidator;

#[async_trait::async_trait]
impl ReconcileKind for SpecValidator {
    async fn reconcile_kind(&self, resource: &mut DuckType) -> Result<(), HookError> {
        let problems = spec_problems(&resource.spec);
        let status = resource.status.get_or_insert_with(DuckTypeStatus::default);
        if problems.is_empty() {
            status.set_condition(Condition::new(READY, ConditionStatus::True).with_reason("Validated"));
            return Ok(());
        }
        let msg = problems.join("; ");
        debug!(problems = problems.len(), "ducktype spec rejected");
        status.set_condition(
            Condition::new(READY, ConditionStatus::False)
                .with_reason("InvalidSpec")
                .with_message(msg.clone()),
        );
        Err(ReconcilerEvent::new(EventType::Warning, "InvalidSpec", msg).into())
    }
}

fn spec_problems(spec: &DuckTypeSpec) -> Vec<String> {
    let mut out = Vec::new();
    if spec.group.trim().is_empty() { out.push("spec.group must not be empty".to_string()); }
    if spec.names.name.trim().is_empty() { out.push("spec.names.name must not be empty".to_string()); }
    if spec.names.plural.trim().is_empty() { out.push("spec.names.plural must not be empty".to_string()); }
    if spec.versions.is_empty() {
        out.push("spec.versions must list at least one version".to_string());
    }
    let mut seen = HashSet::new();
    for v in &spec.versions {
        if v.name.trim().is_empty() {
            out.push("spec.versions[].name must not be empty".to_string());
        } else if !seen.insert(v.name.as_str()) {
            out.push(format!("duplicate version {:?}", v.name));
        }
    }
    out
}
