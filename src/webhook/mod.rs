//! Mutating Admission Webhook for spoditor
//!
//! Intercepts Pod create/update requests and applies the pod's ss-arg
//! annotations through the [`MutationPipeline`]. The webhook never calls the
//! Kubernetes API; everything it needs is in the admission request.

pub mod pod;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::config::ServerConfig;
use crate::pipeline::MutationPipeline;
use crate::{Error, Result, WEBHOOK_PATH};

/// Shared state for webhook handlers
#[derive(Clone, Debug)]
pub struct WebhookState {
    /// Pipeline applied to every admitted pod
    pub pipeline: Arc<MutationPipeline>,
    /// Deny pods whose annotations fail to apply
    pub fail_closed: bool,
}

impl WebhookState {
    /// Create a new webhook state around a built pipeline
    pub fn new(pipeline: Arc<MutationPipeline>, fail_closed: bool) -> Self {
        Self {
            pipeline,
            fail_closed,
        }
    }
}

/// Create the webhook router
///
/// - POST /mutate-v1-pod - Mutate StatefulSet pods from their annotations
/// - GET /healthz - Liveness probe
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(pod::mutate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the webhook until the listener fails
///
/// Uses rustls when TLS paths are configured, plain HTTP otherwise.
pub async fn serve(config: ServerConfig, state: Arc<WebhookState>) -> Result<()> {
    let app = webhook_router(state);

    match config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(|e| Error::config(format!("TLS config error: {}", e)))?;

            info!(addr = %config.addr, "Starting webhook server (TLS)");
            axum_server::bind_rustls(config.addr, tls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| Error::server(format!("webhook server error: {}", e)))
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.addr)
                .await
                .map_err(|e| Error::server(format!("failed to bind {}: {}", config.addr, e)))?;

            info!(addr = %config.addr, "Starting webhook server (plain HTTP)");
            axum::serve(listener, app)
                .await
                .map_err(|e| Error::server(format!("webhook server error: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        webhook_router(Arc::new(WebhookState::new(
            Arc::new(MutationPipeline::default()),
            false,
        )))
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let response = router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn review_without_request_is_answered_as_invalid() {
        let body = serde_json::json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        });
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let review: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(review["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn non_json_body_is_rejected() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn missing_tls_files_fail_startup() {
        let config = ServerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            tls: Some(crate::config::TlsPaths {
                cert: "/nonexistent/tls.crt".into(),
                key: "/nonexistent/tls.key".into(),
            }),
            fail_closed: false,
        };
        let state = Arc::new(WebhookState::new(Arc::new(MutationPipeline::default()), false));

        let err = serve(config, state).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
