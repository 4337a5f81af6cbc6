//! Credential API Endpoints
//! Mission: Expose the vault's consumer boundary over HTTP
//!
//! Exactly the vault operations, nothing more: create, redacted list, reveal,
//! rotate, active flag, delete, plus exchange reference data. The reveal
//! response is returned once to the caller; it is never logged here and must
//! not be cached or persisted downstream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::identity::Caller;
use crate::api::VaultApiState;
use crate::vault::{CredentialSummary, Exchange, VaultError};

// ─── Requests / responses ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateExchangeRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    pub exchange_id: Uuid,
    pub name: String,
    pub api_key: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RotateCredentialRequest {
    pub api_key: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Plaintext credential pair. Never serialized anywhere but this one-shot
/// response body.
#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub api_key: String,
    pub secret_key: String,
    pub issued_at: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialListResponse {
    pub count: usize,
    pub data: Vec<CredentialSummary>,
}

// ─── Handlers ────────────────────────────────────────────────────────────

/// GET /api/exchanges
pub async fn list_exchanges(
    State(state): State<VaultApiState>,
) -> Result<Json<Vec<Exchange>>, ApiError> {
    Ok(Json(state.store.list_exchanges()?))
}

/// POST /api/exchanges
pub async fn create_exchange(
    State(state): State<VaultApiState>,
    Json(payload): Json<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<Exchange>), ApiError> {
    let exchange = state.store.create_exchange(&payload.name)?;
    Ok((StatusCode::CREATED, Json(exchange)))
}

/// GET /api/keys - redacted list for the caller
pub async fn list_credentials(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<CredentialListResponse>, ApiError> {
    let data = state.store.list(caller.user_id)?;
    Ok(Json(CredentialListResponse {
        count: data.len(),
        data,
    }))
}

/// POST /api/keys
pub async fn create_credential(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<CredentialSummary>), ApiError> {
    info!("🔑 Credential create request from user {}", caller.user_id);

    let record = state.store.create(
        caller.user_id,
        payload.exchange_id,
        &payload.name,
        &payload.api_key,
        &payload.secret_key,
    )?;

    Ok((StatusCode::CREATED, Json(record.summary())))
}

/// POST /api/keys/:id/reveal - plaintext returned once, to the owner only
pub async fn reveal_credential(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<RevealResponse>, ApiError> {
    let plaintext = state.store.reveal(caller.user_id, id)?;

    Ok(Json(RevealResponse {
        api_key: plaintext.api_key,
        secret_key: plaintext.secret_key,
        issued_at: plaintext.issued_at,
    }))
}

/// PUT /api/keys/:id - rotate to a new credential pair
pub async fn rotate_credential(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RotateCredentialRequest>,
) -> Result<Json<CredentialSummary>, ApiError> {
    let record = state
        .store
        .rotate(caller.user_id, id, &payload.api_key, &payload.secret_key)?;
    Ok(Json(record.summary()))
}

/// PATCH /api/keys/:id - flip the active flag
pub async fn set_credential_active(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<CredentialSummary>, ApiError> {
    let summary = state
        .store
        .set_active(caller.user_id, id, payload.is_active)?;
    Ok(Json(summary))
}

/// DELETE /api/keys/:id
pub async fn delete_credential(
    State(state): State<VaultApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(caller.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Error mapping ───────────────────────────────────────────────────────

/// HTTP wrapper over `VaultError`.
///
/// Server-side failures map to generic 500 bodies; the variant detail stays
/// in the logs, never in the response.
#[derive(Debug)]
pub struct ApiError(VaultError);

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            VaultError::DuplicateName(_) => (StatusCode::CONFLICT, self.0.to_string()),
            VaultError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            VaultError::Authentication => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Credential integrity check failed".to_string(),
            ),
            VaultError::MalformedPayload(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stored credential payload is invalid".to_string(),
            ),
            VaultError::Configuration(_) | VaultError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}
