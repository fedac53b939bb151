//! Disco core types: reconcile keys, the DuckType resource and duck contracts.

#![forbid(unsafe_code)]

pub mod addressable;
pub mod duck;
pub mod ducktype;

pub use addressable::{AddressStatus, AddressUrl, Addressable, AddressableType, AddressableTypeList};
pub use duck::{ConversionError, Convertible, Implementable, Listable, Populatable};
pub use ducktype::{
    Condition, ConditionStatus, CrdSelector, DuckRef, DuckType, DuckTypeNames, DuckTypeSpec,
    DuckTypeStatus, DuckVersion,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("unexpected key format: {0:?}")]
    Malformed(String),
}

/// Split a work-queue key of the form `name` or `namespace/name`.
///
/// An empty namespace segment is reported as `None`, the same as a
/// cluster-scoped key.
pub fn split_meta_namespace_key(key: &str) -> Result<(Option<&str>, &str), KeyError> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [name] => Ok((None, *name)),
        [ns, name] => Ok(((!ns.is_empty()).then_some(*ns), *name)),
        _ => Err(KeyError::Malformed(key.to_string())),
    }
}

/// Inverse of [`split_meta_namespace_key`].
pub fn meta_namespace_key(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, name),
        _ => name.to_string(),
    }
}
