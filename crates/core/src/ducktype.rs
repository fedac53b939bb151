//! DuckType custom resource (`discovery.knative.dev/v1alpha1`).
//!
//! A DuckType names a duck-typed contract (for example `Addressable`) and the
//! label selectors used to find CRDs that claim to implement it. The resource
//! is cluster-scoped; controllers own everything under `status`.

use chrono::{SecondsFormat, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "discovery.knative.dev",
    version = "v1alpha1",
    kind = "DuckType",
    plural = "ducktypes",
    shortname = "duck",
    status = "DuckTypeStatus",
    printcolumn = r#"{"name":"Group", "type":"string", "jsonPath":".spec.group"}"#,
    printcolumn = r#"{"name":"Ducks", "type":"integer", "jsonPath":".status.duckCount"}"#,
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DuckTypeSpec {
    /// API group of the duck type, e.g. `duck.knative.dev`.
    pub group: String,

    pub names: DuckTypeNames,

    /// Selectors matched against CRD labels to find implementers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<CrdSelector>,

    /// Versions of the duck contract, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<DuckVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuckTypeNames {
    /// CamelCase name of the contract, e.g. `Addressable`.
    pub name: String,
    pub plural: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrdSelector {
    /// Label selector in the usual `key=value,key2` form.
    pub label_selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuckVersion {
    pub name: String,
}

/// Observed state written by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuckTypeStatus {
    /// Generation last processed by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Number of resources found implementing this duck type.
    #[serde(default)]
    pub duck_count: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ducks: Vec<DuckRef>,
}

/// A group/version/kind (+ resource) found implementing a duck type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuckRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 timestamp of the last status flip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self { type_: type_.into(), status, ..Default::default() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool { self.status == ConditionStatus::True }
}

impl DuckTypeStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Insert or replace a condition by type.
    ///
    /// The transition time only moves when the status actually flips, so
    /// setting the same condition twice leaves the status unchanged.
    pub fn set_condition(&mut self, mut cond: Condition) {
        match self.conditions.iter_mut().find(|c| c.type_ == cond.type_) {
            Some(existing) => {
                if existing.status == cond.status {
                    cond.last_transition_time = existing.last_transition_time.clone();
                } else if cond.last_transition_time.is_none() {
                    cond.last_transition_time = Some(now_rfc3339());
                }
                *existing = cond;
            }
            None => {
                if cond.last_transition_time.is_none() {
                    cond.last_transition_time = Some(now_rfc3339());
                }
                self.conditions.push(cond);
                self.conditions.sort_by(|a, b| a.type_.cmp(&b.type_));
            }
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
