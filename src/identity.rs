//! StatefulSet replica identity
//!
//! The StatefulSet controller labels every pod it creates with
//! `statefulset.kubernetes.io/pod-name: <statefulset>-<ordinal>`. Identity is
//! derived purely from that label; whether the StatefulSet actually exists is
//! never checked.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::{Error, Result, STATEFULSET_POD_NAME_LABEL};

/// Logical identity of a StatefulSet replica
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodIdentity {
    /// Name of the owning StatefulSet
    pub workload_name: String,
    /// Zero-based replica index
    pub ordinal: u32,
}

impl PodIdentity {
    /// Parse `<name>-<ordinal>`, splitting on the last hyphen
    ///
    /// `<name>` must be non-empty and `<ordinal>` all ASCII digits.
    pub fn parse(pod_name: &str) -> Result<Self> {
        let (name, digits) = pod_name
            .rsplit_once('-')
            .ok_or_else(|| Error::identity(format!("pod name '{}' has no ordinal", pod_name)))?;

        if name.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::identity(format!(
                "pod name '{}' does not match <name>-<ordinal>",
                pod_name
            )));
        }

        let ordinal = digits.parse::<u32>().map_err(|e| {
            Error::identity(format!("ordinal in pod name '{}' out of range: {}", pod_name, e))
        })?;

        Ok(Self {
            workload_name: name.to_string(),
            ordinal,
        })
    }
}

impl std::fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.workload_name, self.ordinal)
    }
}

/// Resolves which StatefulSet replica a pod is
///
/// Abstracted so the pipeline can be tested with a fixed identity.
#[cfg_attr(test, automock)]
pub trait PodIdentifier: Send + Sync {
    /// Extract the replica identity from the pod's metadata
    fn extract(&self, meta: &ObjectMeta) -> Result<PodIdentity>;
}

/// Identity from the `statefulset.kubernetes.io/pod-name` label
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelPodIdentifier;

impl PodIdentifier for LabelPodIdentifier {
    fn extract(&self, meta: &ObjectMeta) -> Result<PodIdentity> {
        let Some(pod_name) = meta
            .labels
            .as_ref()
            .and_then(|l| l.get(STATEFULSET_POD_NAME_LABEL))
        else {
            debug!(label = STATEFULSET_POD_NAME_LABEL, "statefulset label not found");
            return Err(Error::identity(format!(
                "missing label {}",
                STATEFULSET_POD_NAME_LABEL
            )));
        };

        debug!(name = %pod_name, "stateful pod name");
        PodIdentity::parse(pod_name)
    }
}
