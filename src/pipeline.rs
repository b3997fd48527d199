//! Mutation pipeline
//!
//! Runs one pod through identity resolution, annotation collection and every
//! registered handler, in registration order. The pipeline is built once at
//! startup and shared read-only between requests.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info};

use crate::annotation::{AnnotationCollector, PrefixCollector};
use crate::identity::{LabelPodIdentifier, PodIdentifier, PodIdentity};
use crate::mutation::{ConfigMountHandler, EnvMountHandler, RegisteredHandler, VolumeMountHandler};
use crate::Result;

/// What the pipeline did with a pod
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The pod is not a StatefulSet replica (or has no spec); left untouched
    NotApplicable {
        /// Why the pod was skipped
        reason: String,
    },
    /// No handler found an annotation it recognizes; left untouched
    NoConfiguration,
    /// At least one handler parsed a configuration and ran
    ///
    /// A handler whose qualifier excluded this replica still counts: the pod
    /// may be unchanged.
    Mutated {
        /// Replica the mutations were computed for
        identity: PodIdentity,
        /// Kinds of the handlers that ran, in order
        applied: Vec<&'static str>,
    },
}

impl Outcome {
    /// Whether any handler ran
    pub fn is_mutated(&self) -> bool {
        matches!(self, Self::Mutated { .. })
    }
}

/// Orchestrates identity, collection and handlers for one pod at a time
pub struct MutationPipeline {
    identifier: Arc<dyn PodIdentifier>,
    collector: Arc<dyn AnnotationCollector>,
    handlers: Vec<Box<dyn RegisteredHandler>>,
}

impl MutationPipeline {
    /// Start building a pipeline with the label identifier, the `ssarg.io/`
    /// collector and no handlers
    pub fn builder() -> MutationPipelineBuilder {
        MutationPipelineBuilder::default()
    }

    /// Names of the registered handlers, in order
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Mutate `pod` in place
    ///
    /// Pods that are not StatefulSet replicas or carry no recognized
    /// annotation come back as [`Outcome::NotApplicable`] /
    /// [`Outcome::NoConfiguration`], never as errors.
    ///
    /// The first handler error stops the run. Mutations from handlers that
    /// already ran stay on `pod`; callers wanting all-or-nothing must work on
    /// a copy.
    ///
    /// Not idempotent: applying to an already-mutated pod appends the volumes,
    /// mounts and env sources a second time.
    pub fn apply(&self, pod: &mut Pod) -> Result<Outcome> {
        let identity = match self.identifier.extract(&pod.metadata) {
            Ok(identity) => identity,
            Err(e) if e.is_not_applicable() => {
                debug!(pod = ?pod.metadata.name, error = %e, "ignore non-statefulset pod");
                return Ok(Outcome::NotApplicable {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        info!(workload = %identity.workload_name, ordinal = identity.ordinal, "found statefulset pod");

        let Some(spec) = pod.spec.as_mut() else {
            return Ok(Outcome::NotApplicable {
                reason: format!("pod {} has no spec", identity),
            });
        };

        let index = self.collector.collect(&pod.metadata);
        if index.is_empty() {
            debug!(pod = %identity, "no ss-arg annotations");
            return Ok(Outcome::NoConfiguration);
        }

        let mut applied = Vec::new();
        for handler in &self.handlers {
            if handler.apply(spec, identity.ordinal, &index)? {
                info!(pod = %identity, handler = handler.name(), "applied ss-arg configuration");
                applied.push(handler.name());
            }
        }

        if applied.is_empty() {
            debug!(pod = %identity, annotations = index.len(), "no handler recognized the annotations");
            return Ok(Outcome::NoConfiguration);
        }

        Ok(Outcome::Mutated { identity, applied })
    }
}

impl Default for MutationPipeline {
    /// Label identity, `ssarg.io/` annotations, and the handlers
    /// `mount-volume`, `mount-env`, `mount-configmap` in that order
    fn default() -> Self {
        Self::builder()
            .register(VolumeMountHandler::default())
            .register(EnvMountHandler::default())
            .register(ConfigMountHandler)
            .build()
    }
}

impl std::fmt::Debug for MutationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationPipeline")
            .field("handlers", &self.handler_names())
            .finish_non_exhaustive()
    }
}

/// Builder for [`MutationPipeline`]; the handler list is fixed by `build`
pub struct MutationPipelineBuilder {
    identifier: Arc<dyn PodIdentifier>,
    collector: Arc<dyn AnnotationCollector>,
    handlers: Vec<Box<dyn RegisteredHandler>>,
}

impl Default for MutationPipelineBuilder {
    fn default() -> Self {
        Self {
            identifier: Arc::new(LabelPodIdentifier),
            collector: Arc::new(PrefixCollector::default()),
            handlers: Vec::new(),
        }
    }
}

impl MutationPipelineBuilder {
    /// Replace the identity resolver
    pub fn identifier(mut self, identifier: impl PodIdentifier + 'static) -> Self {
        self.identifier = Arc::new(identifier);
        self
    }

    /// Replace the annotation collector
    pub fn collector(mut self, collector: impl AnnotationCollector + 'static) -> Self {
        self.collector = Arc::new(collector);
        self
    }

    /// Append a handler; handlers run in registration order
    pub fn register(mut self, handler: impl RegisteredHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Finish the pipeline
    pub fn build(self) -> MutationPipeline {
        MutationPipeline {
            identifier: self.identifier,
            collector: self.collector,
            handlers: self.handlers,
        }
    }
}
