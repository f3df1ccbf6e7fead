//! Authentication Middleware
//! Mission: Protect API endpoints with bearer-token verification

use crate::auth::jwt::TokenService;
use crate::auth::models::UserRole;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Identity decoded from a verified token. This is the only identity a
/// protected handler may trust; anything in the request body is untrusted.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Auth middleware that verifies bearer tokens and attaches the decoded
/// identity to the request extensions for downstream handlers.
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AuthError::MissingToken)?;

    let claims = tokens.verify(&token).map_err(|e| {
        debug!("token rejected: {e}");
        AuthError::InvalidToken
    })?;

    // A well-formed signature over a non-UUID subject is still not a
    // usable identity.
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    req.extensions_mut().insert(AuthIdentity {
        user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

/// Auth middleware failures. Both kinds answer with the same body; the
/// distinction is for server-side logs only.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required" })),
        )
            .into_response()
    }
}
