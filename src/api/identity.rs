//! Caller Identity Middleware
//! Mission: Resolve the authenticated caller from an externally-minted JWT
//!
//! Session handling lives in a separate auth service; this layer only
//! validates HS256 bearer tokens against the shared secret and hands the
//! subject claim (the user id) to the handlers. No login, no passwords.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Token claims the vault consumes. Anything else in the token is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: usize,
}

/// The authenticated caller, available to handlers as an `Extension`.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
}

/// Validates bearer tokens from the external auth service.
pub struct IdentityVerifier {
    secret: String,
}

impl IdentityVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Validate a token and extract the caller.
    pub fn verify(&self, token: &str) -> Result<Caller, IdentityError> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| IdentityError::InvalidToken)?;

        let user_id =
            Uuid::parse_str(&decoded.claims.sub).map_err(|_| IdentityError::InvalidToken)?;

        Ok(Caller { user_id })
    }
}

/// Middleware that requires a valid `Authorization: Bearer` token.
pub async fn identity_middleware(
    State(verifier): State<Arc<IdentityVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, IdentityError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(IdentityError::MissingToken)?
        .to_string();

    let caller = verifier.verify(&token)?;
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

/// Identity errors.
#[derive(Debug)]
pub enum IdentityError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            IdentityError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "Missing authorization token")
            }
            IdentityError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
        };

        (status, message).into_response()
    }
}
