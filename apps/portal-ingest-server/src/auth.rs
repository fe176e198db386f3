//! Authentication gate
//!
//! Verifies the bearer tokens the portal's auth service issues. Tokens are
//! never minted here.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Claims carried by portal tokens
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Id of the authenticated portal user
    #[serde(rename = "_id")]
    pub user_id: String,
}

/// HS256 token verifier
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Portal tokens carry no expiry; `exp` is still checked when present
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}

/// Middleware guarding the upload routes
///
/// Verified claims are put in the request extensions for handlers to log.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let Some(verifier) = state.verifier() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let claims = verifier.verify(token).ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Token part of an `Authorization` value; the scheme is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
