//! `mount-env`: per-ordinal `envFrom` sources
//!
//! The shared `envFrom` list is added to every named container. A container
//! entry may also carry its own `envFrom` list, appended after the shared one;
//! older releases ignored that per-container list and only applied the shared
//! one, so manifests written for them behave the same. In both lists
//! `configMapRef` and `secretRef` names get the `-<ordinal>` suffix.

use k8s_openapi::api::core::v1::{EnvFromSource, PodSpec};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{extend_optional, HandlerConfig, MutationHandler, OrdinalSuffix, Scope};
use crate::Result;

/// Annotation name claimed by [`EnvMountHandler`]
pub const MOUNT_ENV: &str = "mount-env";

/// Value of a `mount-env` annotation
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvMountPayload {
    /// Sources added to every listed container
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,
    /// Containers that receive the sources
    #[serde(default)]
    pub containers: Vec<ContainerEnvFrom>,
}

/// Target container, matched by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEnvFrom {
    /// Name of the container in the pod spec
    pub name: String,
    /// Extra sources for this container only
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,
}

/// Adds ordinal-specific `envFrom` sources
#[derive(Clone, Debug, Default)]
pub struct EnvMountHandler {
    scope: Scope,
}

impl EnvMountHandler {
    /// Handler gated by a custom scope
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }
}

fn rename_sources(sources: &mut [EnvFromSource], ordinal: u32) {
    for source in sources {
        if let Some(config_map) = source.config_map_ref.as_mut() {
            config_map.name.append_ordinal(ordinal);
        }
        if let Some(secret) = source.secret_ref.as_mut() {
            secret.name.append_ordinal(ordinal);
        }
    }
}

impl MutationHandler for EnvMountHandler {
    type Payload = EnvMountPayload;

    fn kind(&self) -> &'static str {
        MOUNT_ENV
    }

    fn mutate(
        &self,
        spec: &mut PodSpec,
        ordinal: u32,
        config: HandlerConfig<EnvMountPayload>,
    ) -> Result<()> {
        if !self.scope.includes(MOUNT_ENV, ordinal, &config.qualifier) {
            return Ok(());
        }

        let EnvMountPayload {
            mut env_from,
            containers,
        } = config.payload;
        rename_sources(&mut env_from, ordinal);

        for mut target in containers {
            rename_sources(&mut target.env_from, ordinal);
            for container in spec.containers.iter_mut().filter(|c| c.name == target.name) {
                info!(ordinal, container = %container.name, "add envFrom to container");
                extend_optional(
                    &mut container.env_from,
                    env_from.iter().chain(target.env_from.iter()).cloned(),
                );
            }
        }

        Ok(())
    }
}
