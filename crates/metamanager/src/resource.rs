//! # Resource Key Codec
//!
//! A resource path is a `/`-delimited string: an optional namespace, a resource type and an
//! optional instance name. Segments after the name belong to the instance identity.
//!
//! | Path | Namespace | Type | Name | Shape |
//! |------|-----------|------|------|-------|
//! | `PodStatus` | - | `PodStatus` | - | collection |
//! | `default/Pod` | `default` | `Pod` | - | collection |
//! | `default/Pod/web` | `default` | `Pod` | `web` | object |
//! | `node/n1/pod/uid` | `node` | `n1` | `pod/uid` | object |
//!
//! The full path is the store key, verbatim. Object paths filter on the exact key; collection
//! paths filter on the `namespace/type/` key prefix, or on the type segment of every key when
//! no namespace is given.

use crate::error::MetaError;

/// Store keys under this prefix belong to the function relay journal, not to the cache.
pub const JOURNAL_PREFIX: &str = "_relay/";

/// `true` for keys the engine keeps for its own bookkeeping.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(JOURNAL_PREFIX)
}

/// A parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    path: String,
    namespace: Option<String>,
    resource_type: String,
    name: Option<String>,
}

impl ResourceKey {
    pub fn parse(path: &str) -> Result<Self, MetaError> {
        if path.is_empty() {
            return Err(MetaError::Validation("resource path is empty".into()));
        }
        if is_reserved(path) {
            return Err(MetaError::Validation(format!(
                "resource path {path:?} uses the reserved prefix {JOURNAL_PREFIX:?}"
            )));
        }
        let segments: Vec<&str> = path.split('/').collect();
        let (namespace, resource_type, name) = match segments.as_slice() {
            [resource_type] => (None, *resource_type, None),
            [namespace, resource_type] => (Some(*namespace), *resource_type, None),
            [namespace, resource_type, rest @ ..] => {
                let name = rest.join("/");
                (Some(*namespace), *resource_type, Some(name).filter(|n| !n.is_empty()))
            }
            [] => unreachable!("split always yields a segment"),
        };
        if resource_type.is_empty() {
            return Err(MetaError::Validation(format!(
                "resource path {path:?} has an empty type segment"
            )));
        }
        Ok(Self {
            path: path.to_string(),
            namespace: namespace.map(str::to_string),
            resource_type: resource_type.to_string(),
            name,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_collection(&self) -> bool {
        self.name.is_none()
    }

    /// Filter selecting the rows this path addresses.
    pub fn filter(&self) -> KeyFilter {
        if self.is_collection() {
            self.collection_filter()
        } else {
            KeyFilter::Exact(self.path.clone())
        }
    }

    /// Filter selecting every row of this path's resource class.
    pub fn collection_filter(&self) -> KeyFilter {
        match &self.namespace {
            Some(namespace) => KeyFilter::Prefix(format!("{namespace}/{}/", self.resource_type)),
            None => KeyFilter::Type(self.resource_type.clone()),
        }
    }
}

/// Row selection understood by every [`MetaStore`](crate::store::MetaStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    Exact(String),
    Prefix(String),
    /// Every non-reserved key whose type segment equals the given type.
    Type(String),
}

impl KeyFilter {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::Exact(exact) => key == exact,
            KeyFilter::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyFilter::Type(resource_type) => {
                !is_reserved(key)
                    && ResourceKey::parse(key)
                        .map(|parsed| parsed.resource_type == *resource_type)
                        .unwrap_or(false)
            }
        }
    }

    /// The longest key prefix shared by every matching key.
    pub fn scan_prefix(&self) -> &str {
        match self {
            KeyFilter::Exact(exact) => exact,
            KeyFilter::Prefix(prefix) => prefix,
            KeyFilter::Type(_) => "",
        }
    }
}
