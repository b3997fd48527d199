//! `mount-volume`: per-ordinal config map and secret volumes
//!
//! ```yaml
//! ssarg.io/mount-volume: |
//!   {"volumes": [{"name": "my-volume", "configMap": {"name": "my-configmap"}}],
//!    "containers": [{"name": "nginx",
//!                    "volumeMounts": [{"name": "my-volume", "mountPath": "/etc/my-volume"}]}]}
//! ```
//!
//! On replica 2 the pod gets volume `my-volume` backed by config map
//! `my-configmap-2`, mounted into container `nginx`.

use k8s_openapi::api::core::v1::{PodSpec, Volume, VolumeMount};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{extend_optional, HandlerConfig, MutationHandler, OrdinalSuffix, Scope};
use crate::Result;

/// Annotation name claimed by [`VolumeMountHandler`]
pub const MOUNT_VOLUME: &str = "mount-volume";

/// Value of a `mount-volume` annotation
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMountPayload {
    /// Volumes to add; config map and secret names are templates
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Mounts to add, per container name
    #[serde(default)]
    pub containers: Vec<ContainerVolumeMounts>,
}

/// Mounts for one container, matched by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerVolumeMounts {
    /// Name of the container in the pod spec
    pub name: String,
    /// Mounts appended to that container
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Adds ordinal-specific volumes and their mounts
#[derive(Clone, Debug, Default)]
pub struct VolumeMountHandler {
    scope: Scope,
}

impl VolumeMountHandler {
    /// Handler gated by a custom scope
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }
}

impl MutationHandler for VolumeMountHandler {
    type Payload = VolumeMountPayload;

    fn kind(&self) -> &'static str {
        MOUNT_VOLUME
    }

    fn mutate(
        &self,
        spec: &mut PodSpec,
        ordinal: u32,
        config: HandlerConfig<VolumeMountPayload>,
    ) -> Result<()> {
        if !self.scope.includes(MOUNT_VOLUME, ordinal, &config.qualifier) {
            return Ok(());
        }

        let VolumeMountPayload {
            mut volumes,
            containers,
        } = config.payload;

        for volume in &mut volumes {
            if let Some(config_map) = volume.config_map.as_mut() {
                config_map.name.append_ordinal(ordinal);
            }
            if let Some(secret) = volume.secret.as_mut() {
                secret.secret_name.append_ordinal(ordinal);
            }
        }
        info!(ordinal, count = volumes.len(), "adding volumes");
        extend_optional(&mut spec.volumes, volumes);

        for source in containers {
            for container in spec.containers.iter_mut().filter(|c| c.name == source.name) {
                info!(container = %container.name, count = source.volume_mounts.len(), "adding volume mounts");
                extend_optional(&mut container.volume_mounts, source.volume_mounts.iter().cloned());
            }
        }

        Ok(())
    }
}
