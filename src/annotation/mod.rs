//! `ssarg.io/` annotation collection
//!
//! Annotation keys have the shape `ssarg.io/<name>[_<qualifier>]`. The
//! collector strips the prefix and splits off the qualifier, producing an
//! [`AnnotationIndex`] that every mutation handler reads from.

pub mod qualifier;

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::{ANNOTATION_PREFIX, QUALIFIER_SEPARATOR};

pub use qualifier::{OrdinalMatcher, Qualifier, RangeQualifier};

/// Annotation name plus its optional ordinal qualifier
///
/// Ordered by name first so entries of one mutation kind sit together, with
/// the unqualified entry leading.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    /// Mutation kind, e.g. `mount-volume`
    pub name: String,
    /// Ordinal qualifier expression; empty applies to every replica
    pub qualifier: String,
}

impl QualifiedName {
    /// Create a qualified name
    pub fn new(name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Split an un-prefixed key on the last separator occurrence
    pub fn split(key: &str, separator: char) -> Self {
        match key.rsplit_once(separator) {
            Some((name, qualifier)) => Self::new(name, qualifier),
            None => Self::new(key, ""),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.qualifier.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.name, QUALIFIER_SEPARATOR, self.qualifier)
        }
    }
}

/// Raw annotation values keyed by [`QualifiedName`]
///
/// Built once per request and read-only afterwards, so every handler sees the
/// same entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationIndex {
    entries: BTreeMap<QualifiedName, String>,
}

impl AnnotationIndex {
    /// Number of recognized annotations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the pod carried no recognized annotation
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under an exact qualified name
    pub fn get(&self, key: &QualifiedName) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// First entry (in index order) whose name equals `name`
    pub fn find(&self, name: &str) -> Option<(&QualifiedName, &str)> {
        self.iter().find(|(k, _)| k.name == name)
    }

    /// All entries in index order
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl FromIterator<(QualifiedName, String)> for AnnotationIndex {
    fn from_iter<I: IntoIterator<Item = (QualifiedName, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Builds the annotation index for a pod
#[cfg_attr(test, automock)]
pub trait AnnotationCollector: Send + Sync {
    /// Collect all recognized annotations; never fails
    fn collect(&self, meta: &ObjectMeta) -> AnnotationIndex;
}

/// Collects annotations under a fixed key prefix
#[derive(Clone, Debug)]
pub struct PrefixCollector {
    prefix: String,
    separator: char,
}

impl PrefixCollector {
    /// Collector for a custom prefix and separator
    pub fn new(prefix: impl Into<String>, separator: char) -> Self {
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    /// The key prefix this collector filters on
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixCollector {
    fn default() -> Self {
        Self::new(ANNOTATION_PREFIX, QUALIFIER_SEPARATOR)
    }
}

impl AnnotationCollector for PrefixCollector {
    fn collect(&self, meta: &ObjectMeta) -> AnnotationIndex {
        let Some(annotations) = meta.annotations.as_ref() else {
            return AnnotationIndex::default();
        };

        annotations
            .iter()
            .filter_map(|(key, value)| {
                let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
                    debug!(key = %key, "skip irrelevant annotation");
                    return None;
                };
                let qualified = QualifiedName::split(rest, self.separator);
                if qualified.qualifier.is_empty() {
                    debug!(key = %key, "found ss-arg annotation for every replica");
                } else {
                    debug!(key = %key, qualifier = %qualified.qualifier, "found qualified ss-arg annotation");
                }
                Some((qualified, value.clone()))
            })
            .collect()
    }
}
