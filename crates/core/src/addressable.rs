//! `Addressable` duck type (`duck.knative.dev/v1`).
//!
//! Addressable is how a resource declares itself a destination for message
//! delivery. It is usually written by a controller into `status.address`.

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta};
use kube::core::TypeMeta;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::duck::{ConversionError, Convertible, Implementable, Listable, Populatable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<AddressUrl>,
}

/// URL kept byte-for-byte as written; relative references are allowed.
/// Use [`AddressUrl::parse`] for a normalized [`Url`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressUrl(String);

impl AddressUrl {
    pub fn as_str(&self) -> &str { &self.0 }

    /// Parse as an absolute URL.
    pub fn parse(&self) -> Result<Url, url::ParseError> { Url::parse(&self.0) }
}

impl fmt::Display for AddressUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for AddressUrl {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for AddressUrl {
    fn from(s: String) -> Self { Self(s) }
}

impl From<Url> for AddressUrl {
    fn from(u: Url) -> Self { Self(u.into()) }
}

/// How implementers are expected to embed [`Addressable`] in their status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
}

/// Skeleton resource wrapping [`Addressable`] the way implementers embed it.
/// Used to read the address out of arbitrary objects; not a served resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressableType {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: AddressStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressableTypeList {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Vec<AddressableType>,
}

impl Addressable {
    pub fn new(url: impl Into<AddressUrl>) -> Self { Self { url: Some(url.into()) } }
}

impl Implementable for Addressable {
    type Full = AddressableType;

    fn full_type(&self) -> AddressableType { AddressableType::default() }
}

impl Convertible for Addressable {
    fn convert_to(&self, to: &mut dyn Convertible) -> Result<(), ConversionError> {
        Err(ConversionError::HighestKnownVersion { got: to.type_name() })
    }

    fn convert_from(&mut self, from: &dyn Convertible) -> Result<(), ConversionError> {
        Err(ConversionError::HighestKnownVersion { got: from.type_name() })
    }
}

impl Populatable for AddressableType {
    fn populate(&mut self) {
        self.status = AddressStatus {
            address: Some(Addressable {
                // every field set
                url: Some(AddressUrl::from("http://foo.com")),
            }),
        };
    }
}

impl Listable for AddressableType {
    type List = AddressableTypeList;

    fn list_type(&self) -> AddressableTypeList { AddressableTypeList::default() }
}
