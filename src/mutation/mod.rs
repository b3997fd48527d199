//! Mutation handlers
//!
//! Each handler claims one annotation name, decodes its JSON value into a
//! typed payload and applies that payload to a pod spec when the annotation's
//! qualifier covers the pod's ordinal.
//!
//! | Annotation name    | Handler                | Effect                         |
//! |--------------------|------------------------|--------------------------------|
//! | `mount-volume`     | [`VolumeMountHandler`] | per-ordinal volumes + mounts   |
//! | `mount-env`        | [`EnvMountHandler`]    | per-ordinal `envFrom` sources  |
//! | `mount-configmap`  | [`ConfigMountHandler`] | none (legacy placeholder)      |
//!
//! Handlers are written against [`MutationHandler`], whose associated
//! `Payload` type ties parse and mutate together. The pipeline stores them as
//! [`RegisteredHandler`] trait objects, which run parse then mutate in one
//! call so a payload never leaves its handler.

mod configmap;
mod env;
mod volume;

use std::sync::Arc;

use k8s_openapi::api::core::v1::PodSpec;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::annotation::{AnnotationIndex, OrdinalMatcher, RangeQualifier};
use crate::{Error, Result};

pub use configmap::{ConfigMountHandler, ConfigMountPayload, MOUNT_CONFIGMAP};
pub use env::{ContainerEnvFrom, EnvMountHandler, EnvMountPayload, MOUNT_ENV};
pub use volume::{ContainerVolumeMounts, VolumeMountHandler, VolumeMountPayload, MOUNT_VOLUME};

/// A parsed payload together with the qualifier of the annotation it came from
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlerConfig<T> {
    /// Qualifier expression from the annotation key; empty for every replica
    pub qualifier: String,
    /// Decoded annotation value
    pub payload: T,
}

impl<T> HandlerConfig<T> {
    /// Create a config for the given qualifier
    pub fn new(qualifier: impl Into<String>, payload: T) -> Self {
        Self {
            qualifier: qualifier.into(),
            payload,
        }
    }
}

/// One kind of annotation-driven pod spec mutation
pub trait MutationHandler: Send + Sync {
    /// JSON shape of the annotation value
    type Payload: DeserializeOwned + Send;

    /// Annotation name this handler claims, e.g. `mount-volume`
    fn kind(&self) -> &'static str;

    /// Decode the first index entry named [`kind`](Self::kind)
    ///
    /// `Ok(None)` when the pod carries no such annotation.
    fn parse(&self, index: &AnnotationIndex) -> Result<Option<HandlerConfig<Self::Payload>>> {
        let Some((key, value)) = index.find(self.kind()) else {
            return Ok(None);
        };

        debug!(annotation = %key, value = %value, "parsing ss-arg configuration");
        let payload =
            serde_json::from_str(value).map_err(|e| Error::decode(self.kind(), e))?;
        Ok(Some(HandlerConfig::new(key.qualifier.clone(), payload)))
    }

    /// Apply the config to `spec` if its qualifier covers `ordinal`
    fn mutate(
        &self,
        spec: &mut PodSpec,
        ordinal: u32,
        config: HandlerConfig<Self::Payload>,
    ) -> Result<()>;
}

/// Type-erased handler as stored by the pipeline
pub trait RegisteredHandler: Send + Sync {
    /// Annotation name the handler claims
    fn name(&self) -> &'static str;

    /// Parse from `index` and, if configured, mutate `spec`
    ///
    /// Returns whether the handler found a configuration, independent of
    /// whether the qualifier let it change anything.
    fn apply(&self, spec: &mut PodSpec, ordinal: u32, index: &AnnotationIndex) -> Result<bool>;
}

impl<H: MutationHandler> RegisteredHandler for H {
    fn name(&self) -> &'static str {
        self.kind()
    }

    fn apply(&self, spec: &mut PodSpec, ordinal: u32, index: &AnnotationIndex) -> Result<bool> {
        match self.parse(index)? {
            Some(config) => {
                self.mutate(spec, ordinal, config)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Qualifier gate shared by the handlers
#[derive(Clone)]
pub struct Scope {
    matcher: Arc<dyn OrdinalMatcher>,
}

impl Scope {
    /// Gate using a custom matcher
    pub fn new(matcher: Arc<dyn OrdinalMatcher>) -> Self {
        Self { matcher }
    }

    /// Whether a config for `kind` with `qualifier` applies to `ordinal`
    pub fn includes(&self, kind: &str, ordinal: u32, qualifier: &str) -> bool {
        let included = self.matcher.matches(ordinal, qualifier);
        if !included {
            debug!(kind, ordinal, qualifier = %qualifier, "qualifier excludes this pod");
        }
        included
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(Arc::new(RangeQualifier))
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").finish_non_exhaustive()
    }
}

/// Appends `-<ordinal>` to a referenced object name
///
/// Implemented for both plain and optional names because the core/v1 types
/// use either depending on the field.
pub(crate) trait OrdinalSuffix {
    fn append_ordinal(&mut self, ordinal: u32);
}

impl OrdinalSuffix for String {
    fn append_ordinal(&mut self, ordinal: u32) {
        let renamed = format!("{}-{}", self, ordinal);
        debug!(origin = %self, new = %renamed, "overwrite referenced name");
        *self = renamed;
    }
}

impl OrdinalSuffix for Option<String> {
    fn append_ordinal(&mut self, ordinal: u32) {
        if let Some(name) = self {
            name.append_ordinal(ordinal);
        }
    }
}

/// Extend an optional list, leaving `None` alone when there is nothing to add
pub(crate) fn extend_optional<T>(target: &mut Option<Vec<T>>, items: impl IntoIterator<Item = T>) {
    let mut items = items.into_iter().peekable();
    if items.peek().is_some() {
        target.get_or_insert_with(Vec::new).extend(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::qualifier::MockOrdinalMatcher;
    use crate::annotation::QualifiedName;
    use mockall::predicate::*;

    #[test]
    fn string_names_gain_ordinal_suffix() {
        let mut name = "my-configmap".to_string();
        name.append_ordinal(3);
        assert_eq!(name, "my-configmap-3");
    }

    #[test]
    fn optional_names_gain_suffix_only_when_set() {
        let mut name = Some("my-secret".to_string());
        name.append_ordinal(0);
        assert_eq!(name.as_deref(), Some("my-secret-0"));

        let mut missing: Option<String> = None;
        missing.append_ordinal(0);
        assert!(missing.is_none());
    }

    #[test]
    fn extend_optional_keeps_none_for_empty_input() {
        let mut target: Option<Vec<u8>> = None;
        extend_optional(&mut target, Vec::new());
        assert!(target.is_none());

        extend_optional(&mut target, vec![1, 2]);
        extend_optional(&mut target, vec![3]);
        assert_eq!(target, Some(vec![1, 2, 3]));
    }

    #[test]
    fn scope_delegates_to_matcher() {
        let mut matcher = MockOrdinalMatcher::new();
        matcher
            .expect_matches()
            .with(eq(4), eq("0-3"))
            .times(1)
            .returning(|_, _| false);

        let scope = Scope::new(Arc::new(matcher));
        assert!(!scope.includes(MOUNT_VOLUME, 4, "0-3"));
    }

    // ==========================================================================
    // Story: Handlers only run when their annotation is present
    // ==========================================================================

    #[test]
    fn registered_handler_reports_absent_configuration() {
        let handler = VolumeMountHandler::default();
        let mut spec = PodSpec::default();

        let applied = handler
            .apply(&mut spec, 0, &AnnotationIndex::default())
            .unwrap();
        assert!(!applied);
        assert_eq!(spec, PodSpec::default());
    }

    #[test]
    fn registered_handler_reports_parsed_configuration_even_when_excluded() {
        let index: AnnotationIndex = [(
            QualifiedName::new(MOUNT_VOLUME, "5"),
            r#"{"volumes": [], "containers": []}"#.to_string(),
        )]
        .into_iter()
        .collect();

        let mut spec = PodSpec::default();
        let applied = VolumeMountHandler::default()
            .apply(&mut spec, 0, &index)
            .unwrap();
        assert!(applied);
        assert_eq!(spec, PodSpec::default());
    }

    #[test]
    fn registered_handler_surfaces_decode_errors() {
        let index: AnnotationIndex = [(
            QualifiedName::new(MOUNT_ENV, ""),
            "not json".to_string(),
        )]
        .into_iter()
        .collect();

        let err = EnvMountHandler::default()
            .apply(&mut PodSpec::default(), 0, &index)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { ref annotation, .. } if annotation == MOUNT_ENV));
    }

    #[test]
    fn registered_names_match_annotation_kinds() {
        let handlers: Vec<Box<dyn RegisteredHandler>> = vec![
            Box::new(VolumeMountHandler::default()),
            Box::new(EnvMountHandler::default()),
            Box::new(ConfigMountHandler),
        ];
        let names: Vec<_> = handlers.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["mount-volume", "mount-env", "mount-configmap"]);
    }
}
