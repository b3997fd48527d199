//! Custom Resource Definitions for spoditor

mod argumentor;

pub use argumentor::{Argumentor, ArgumentorSpec, ArgumentorStatus};

use kube::CustomResourceExt;

/// YAML manifest of the Argumentor CRD, for `spoditor --crd | kubectl apply -f -`
pub fn crd_manifests() -> crate::Result<String> {
    serde_yaml::to_string(&Argumentor::crd())
        .map_err(|e| crate::Error::serialization(format!("failed to serialize CRD: {}", e)))
}
