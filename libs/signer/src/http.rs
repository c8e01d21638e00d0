//! HTTP front-end: route dispatch, body I/O, JSON shaping. Thin by
//! design — no policy decisions live here, only the mapping from
//! `OrchestratorError` to status code and body shape.

use crate::orchestrator::{OrchestratorError, SigningOrchestrator, StatusClass};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

pub fn build_router(orchestrator: Arc<SigningOrchestrator>) -> Router {
    Router::new()
        .route("/authorized_keys", get(authorized_keys))
        .route("/keys/:pkh", any(keys_dispatch))
        .fallback(not_found)
        .with_state(orchestrator)
}

async fn authorized_keys() -> impl IntoResponse {
    // Intentionally empty: the oracle does not advertise its roster.
    Json(json!({}))
}

async fn keys_dispatch(
    State(orchestrator): State<Arc<SigningOrchestrator>>,
    Path(pkh): Path<String>,
    method: Method,
    body: Bytes,
) -> Response {
    match method {
        Method::GET => keys_get(&orchestrator, &pkh).into_response(),
        Method::POST => keys_post(&orchestrator, &pkh, &body).into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "bad_verb"})),
        )
            .into_response(),
    }
}

fn keys_get(orchestrator: &SigningOrchestrator, pkh: &str) -> Response {
    match orchestrator.get_public_key(pkh) {
        Some(public_key) => Json(json!({"public_key": public_key})).into_response(),
        None => (StatusCode::NOT_FOUND, "Key not found").into_response(),
    }
}

fn keys_post(orchestrator: &SigningOrchestrator, pkh: &str, body: &[u8]) -> Response {
    match orchestrator.sign_request(body, pkh) {
        Ok(signature) => Json(json!({"signature": signature})).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}

fn error_response(err: &OrchestratorError) -> Response {
    log::warn!("request denied: {err}");
    let status = match err.status_class() {
        StatusClass::NotFound => StatusCode::NOT_FOUND,
        StatusClass::BadRequest => StatusCode::BAD_REQUEST,
        StatusClass::Forbidden => StatusCode::FORBIDDEN,
        StatusClass::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    };
    // Never echo the payload or leak internals; the taxonomy-specific
    // `err` Display is terse by construction (see OrchestratorError).
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodian::{Custodian, CustodianError};
    use crate::filter::{OperationFilter, OperationFilterConfig};
    use crate::wallet::{Key, KeyRegistry};
    use crate::watermark::SessionWatermark;
    use axum::body::Body;
    use axum::http::Request;
    use num_bigint::BigUint;
    use tower::ServiceExt;

    struct FixedCustodian(pub [u8; 64]);

    impl Custodian for FixedCustodian {
        fn sign(&self, _digest: &[u8; 32], _key: &Key) -> Result<[u8; 64], CustodianError> {
            Ok(self.0)
        }
    }

    fn test_orchestrator() -> Arc<SigningOrchestrator> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yaml");
        std::fs::write(
            &path,
            "- Name: baker\n  PublicKeyHash: tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m\n  PublicKey: sppkABC\n",
        )
        .unwrap();
        let keys = KeyRegistry::load(&path).unwrap();
        Arc::new(SigningOrchestrator::new(
            keys,
            Box::new(FixedCustodian([0u8; 64])),
            Box::new(SessionWatermark::new()),
            OperationFilter::new(OperationFilterConfig {
                enable_generic: true,
                enable_tx: true,
                enable_voting: true,
                tx_whitelist: vec![],
                tx_daily_max: BigUint::from(u64::MAX),
            }),
        ))
    }

    #[tokio::test]
    async fn authorized_keys_returns_empty_object() {
        let app = build_router(test_orchestrator());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/authorized_keys")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_key_get_is_404() {
        let app = build_router(test_orchestrator());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/keys/tz_unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let app = build_router(test_orchestrator());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_verb_on_keys_is_400() {
        let app = build_router(test_orchestrator());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/keys/tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_with_bad_payload_is_500() {
        let app = build_router(test_orchestrator());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/keys/tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m")
                    .body(Body::from("not-quoted-hex"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
