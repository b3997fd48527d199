//! Argumentor Custom Resource Definition
//!
//! Reserved for cluster-wide ss-arg defaults. The webhook does not read it
//! yet; annotations remain the only source of configuration.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for an Argumentor
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "spoditor.io",
    version = "v1beta1",
    kind = "Argumentor",
    plural = "argumentors",
    status = "ArgumentorStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentorSpec {
    /// Example field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foo: Option<String>,
}

/// Observed state of an Argumentor
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ArgumentorStatus {}
