//! Hook contract and the events it can surface.

use std::fmt;

use disco_core::DuckType;

/// Kubernetes event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// An event to attach to the reconciled object. Displays as its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerEvent {
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

impl ReconcilerEvent {
    pub fn new(event_type: EventType, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self { event_type, reason: reason.into(), message: message.into() }
    }
}

impl fmt::Display for ReconcilerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.message) }
}

/// Warning event with reason `InternalError`.
pub fn warn_internal(message: impl Into<String>) -> ReconcilerEvent {
    ReconcilerEvent::new(EventType::Warning, "InternalError", message)
}

/// Failure outcome of [`ReconcileKind::reconcile_kind`].
///
/// `Event` carries the type and reason the business logic wants operators to
/// see; `Internal` is a plain error reported as Warning/InternalError.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("{0}")]
    Event(ReconcilerEvent),
    #[error("{0}")]
    Internal(String),
}

impl HookError {
    /// The event to publish for this failure.
    pub fn to_event(&self) -> ReconcilerEvent {
        match self {
            HookError::Event(ev) => ev.clone(),
            HookError::Internal(msg) => warn_internal(msg.clone()),
        }
    }
}

impl From<ReconcilerEvent> for HookError {
    fn from(ev: ReconcilerEvent) -> Self { HookError::Event(ev) }
}

impl From<anyhow::Error> for HookError {
    fn from(e: anyhow::Error) -> Self { HookError::Internal(format!("{:#}", e)) }
}

/// Business logic for DuckType.
///
/// Changes made to `status` are written back by the reconciler, even when
/// the hook fails. Implementations should not update the object themselves.
#[async_trait::async_trait]
pub trait ReconcileKind: Send + Sync {
    async fn reconcile_kind(&self, resource: &mut DuckType) -> Result<(), HookError>;
}
