use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;
use crate::store::OwnerContext;

/// Claims expected inside the session provider's JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the owner id every record is scoped to.
    pub sub: String,
    pub exp: usize,
}

/// Middleware to validate a Bearer JWT in the `Authorization` header.
///
/// On success an [`OwnerContext`] for the token subject is stored in the
/// request extensions; on failure a `401` is returned.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let ctx = owner_from_token(token, &state.jwt_secret).map_err(|e| {
        warn!("Rejected session token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Decodes an HS256 token and returns the owner it names.
pub fn owner_from_token(token: &str, secret: &str) -> Result<OwnerContext, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))?.claims;
    if claims.sub.trim().is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }
    Ok(OwnerContext::new(claims.sub))
}
