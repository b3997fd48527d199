//! `mount-configmap`: legacy annotation, parsed but never applied
//!
//! Kept so pods that still carry the old annotation keep being admitted and
//! so a decode failure in it is still reported. New manifests should use
//! `mount-volume`.

use k8s_openapi::api::core::v1::{Container, PodSpec, Volume};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{HandlerConfig, MutationHandler};
use crate::Result;

/// Annotation name claimed by [`ConfigMountHandler`]
pub const MOUNT_CONFIGMAP: &str = "mount-configmap";

/// Value of a `mount-configmap` annotation
///
/// Older manifests wrote the field names capitalized; both spellings parse.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMountPayload {
    /// Volumes declared by the annotation
    #[serde(default, alias = "Volumes")]
    pub volumes: Vec<Volume>,
    /// Containers declared by the annotation
    #[serde(default, alias = "Containers")]
    pub containers: Vec<Container>,
}

/// Placeholder handler for `mount-configmap`
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigMountHandler;

impl MutationHandler for ConfigMountHandler {
    type Payload = ConfigMountPayload;

    fn kind(&self) -> &'static str {
        MOUNT_CONFIGMAP
    }

    fn mutate(
        &self,
        _spec: &mut PodSpec,
        ordinal: u32,
        config: HandlerConfig<ConfigMountPayload>,
    ) -> Result<()> {
        debug!(
            ordinal,
            qualifier = %config.qualifier,
            volumes = config.payload.volumes.len(),
            "mount-configmap is not applied; use mount-volume"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationIndex, QualifiedName};
    use serde_json::json;

    fn index(qualifier: &str, value: &str) -> AnnotationIndex {
        [(QualifiedName::new(MOUNT_CONFIGMAP, qualifier), value.to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn no_expected_annotation() {
        assert!(ConfigMountHandler
            .parse(&AnnotationIndex::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn parses_legacy_capitalized_fields() {
        let value = json!({
            "Volumes": [{"name": "dummy-vol", "configMap": {"name": "dummy-configmap"}}],
            "Containers": [{
                "name": "dummy-container",
                "volumeMounts": [{"name": "dummy-vol", "mountPath": "/etc/configmaps/dummy"}]
            }]
        });

        let config = ConfigMountHandler
            .parse(&index("1-2", &value.to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(config.qualifier, "1-2");
        assert_eq!(config.payload.volumes[0].name, "dummy-vol");
        assert_eq!(config.payload.containers[0].name, "dummy-container");
    }

    #[test]
    fn parses_camel_case_fields() {
        let config = ConfigMountHandler
            .parse(&index("", r#"{"volumes": [{"name": "v"}], "containers": []}"#))
            .unwrap()
            .unwrap();
        assert_eq!(config.payload.volumes.len(), 1);
    }

    #[test]
    fn mutate_leaves_spec_untouched() {
        let mut spec: PodSpec =
            serde_json::from_value(json!({"containers": [{"name": "dummy-container"}]})).unwrap();
        let before = spec.clone();

        let config = ConfigMountHandler
            .parse(&index("", r#"{"volumes": [{"name": "v", "configMap": {"name": "c"}}]}"#))
            .unwrap()
            .unwrap();
        ConfigMountHandler.mutate(&mut spec, 0, config).unwrap();

        assert_eq!(spec, before);
    }

    #[test]
    fn broken_legacy_annotation_is_reported() {
        assert!(ConfigMountHandler.parse(&index("", "[")).is_err());
    }
}
