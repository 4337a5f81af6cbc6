//! HTTP API Module
//! Mission: Wire the credential vault behind an authenticated axum router

pub mod credentials;
pub mod identity;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::vault::CredentialStore;
use identity::{identity_middleware, IdentityVerifier};

/// Shared API state.
#[derive(Clone)]
pub struct VaultApiState {
    pub store: Arc<CredentialStore>,
    pub verifier: Arc<IdentityVerifier>,
}

impl VaultApiState {
    pub fn new(store: Arc<CredentialStore>, verifier: Arc<IdentityVerifier>) -> Self {
        Self { store, verifier }
    }
}

/// Build the API router. Everything under /api requires a valid bearer token;
/// /health does not.
pub fn create_router(state: VaultApiState) -> Router {
    let verifier = state.verifier.clone();

    let protected = Router::new()
        .route(
            "/api/exchanges",
            get(credentials::list_exchanges).post(credentials::create_exchange),
        )
        .route(
            "/api/keys",
            get(credentials::list_credentials).post(credentials::create_credential),
        )
        .route(
            "/api/keys/:id",
            put(credentials::rotate_credential)
                .patch(credentials::set_credential_active)
                .delete(credentials::delete_credential),
        )
        .route("/api/keys/:id/reveal", post(credentials::reveal_credential))
        .route_layer(middleware::from_fn_with_state(
            verifier,
            identity_middleware,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
}

/// GET /health - liveness probe, unauthenticated
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
