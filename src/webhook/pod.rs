//! Pod Mutation Webhook
//!
//! Handles AdmissionReview requests for Pods, running them through the
//! [`MutationPipeline`](crate::pipeline::MutationPipeline) and answering with
//! a JSON patch from the decoded pod to the mutated one.

use std::sync::Arc;

use axum::{extract::State, Json};
use k8s_openapi::api::core::v1::Pod;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
    DynamicObject,
};
use tracing::{debug, error, info, warn};

use crate::pipeline::Outcome;
use crate::{Error, Result};

use super::WebhookState;

/// Handle mutating admission review for Pods
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let req: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = review_pod(&state, &req);
    Json(response.into_review())
}

/// Decide on a single pod admission request
///
/// Only CREATE is mutated: an existing pod already carries its replica's
/// volumes, and running the pipeline again would append them twice. Pods that
/// are not StatefulSet replicas, carry no ss-arg annotation, or cannot be
/// decoded are always admitted unchanged. Pipeline failures admit unchanged
/// too unless the webhook runs fail-closed.
pub fn review_pod(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = request.uid.as_str();
    let allow = || AdmissionResponse::from(request);

    if !matches!(request.operation, Operation::Create) {
        debug!(uid = %uid, operation = ?request.operation, "Not a pod creation, allowing unchanged");
        return allow();
    }

    let Some(obj) = request.object.as_ref() else {
        debug!(uid = %uid, "No pod object in request, allowing unchanged");
        return allow();
    };

    let original = match decode_pod(obj) {
        Ok(pod) => pod,
        Err(e) => {
            warn!(uid = %uid, error = %e, "Failed to decode the input pod, allowing unchanged");
            return allow();
        }
    };

    let mut pod = original.clone();
    match state.pipeline.apply(&mut pod) {
        Ok(Outcome::Mutated { identity, applied }) => {
            let patch = match build_patch(&original, &pod) {
                Ok(patch) => patch,
                Err(e) => return on_failure(state, request, &e),
            };
            if patch.0.is_empty() {
                debug!(uid = %uid, pod = %identity, "Qualifiers excluded this replica, allowing unchanged");
                return allow();
            }

            info!(
                uid = %uid,
                pod = %identity,
                handlers = ?applied,
                patch_ops = patch.0.len(),
                "Applying patch to pod"
            );
            match allow().with_patch(patch) {
                Ok(response) => response,
                Err(e) => on_failure(state, request, &Error::serialization(e.to_string())),
            }
        }
        Ok(Outcome::NotApplicable { reason }) => {
            debug!(uid = %uid, reason = %reason, "Pod not applicable, allowing unchanged");
            allow()
        }
        Ok(Outcome::NoConfiguration) => {
            debug!(uid = %uid, name = %request.name, "No ss-arg configuration, allowing unchanged");
            allow()
        }
        Err(e) => on_failure(state, request, &e),
    }
}

fn on_failure(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
    err: &Error,
) -> AdmissionResponse {
    if state.fail_closed {
        error!(uid = %request.uid, error = %err, "Failed to mutate the pod, denying");
        AdmissionResponse::from(request).deny(format!("failed to mutate the pod: {}", err))
    } else {
        warn!(uid = %request.uid, error = %err, "Failed to mutate the pod, allowing unchanged");
        AdmissionResponse::from(request)
    }
}

/// Decode the review's raw object as a core/v1 Pod
fn decode_pod(obj: &DynamicObject) -> Result<Pod> {
    let value = serde_json::to_value(obj).map_err(|e| Error::serialization(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::serialization(e.to_string()))
}

/// JSON patch turning `original` into `mutated`
pub fn build_patch(original: &Pod, mutated: &Pod) -> Result<json_patch::Patch> {
    let before = serde_json::to_value(original).map_err(|e| Error::serialization(e.to_string()))?;
    let after = serde_json::to_value(mutated).map_err(|e| Error::serialization(e.to_string()))?;
    Ok(json_patch::diff(&before, &after))
}
