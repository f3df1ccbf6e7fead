//! Authentication API Endpoints
//! Mission: Provide signup, login, verify and password-management endpoints

use crate::auth::{
    jwt::TokenService,
    middleware::{auth_middleware, AuthIdentity},
    models::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, SignupRequest,
        UserResponse, UserRole, VerifyResponse,
    },
    user_store::{PasswordChange, StoreError, UserStore},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub tokens: Arc<TokenService>,
}

impl AuthState {
    pub fn new(user_store: Arc<UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { user_store, tokens }
    }
}

/// Auth route table: public endpoints plus token-gated ones. Verify is
/// mounted for GET and POST so clients with mismatched methods still work.
pub fn router(state: AuthState) -> Router {
    let public = Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/api/auth/verify", get(verify).post(verify))
        .route("/api/auth/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

/// Signup endpoint - POST /api/auth/signup
pub async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthApiError> {
    let payload = json_body(payload)?;
    validate_email(&payload.email)?;
    require_field(&payload.password, "password")?;

    let role = payload.role.unwrap_or(UserRole::Employee);
    let store = state.user_store.clone();
    let user = run_blocking(move || store.create_user(&payload.email, &payload.password, role))
        .await?
        .map_err(|e| match e {
            StoreError::DuplicateEmail => AuthApiError::Conflict,
            StoreError::Internal(err) => {
                warn!("signup failed: {err}");
                AuthApiError::Internal
            }
        })?;

    let token = state.tokens.issue(&user).map_err(|e| {
        warn!("token issue failed: {e}");
        AuthApiError::Internal
    })?;

    info!("✅ Signup: {} ({})", user.email, user.role.as_str());

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from_user(&user),
            token,
        }),
    ))
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthApiError> {
    let payload = json_body(payload)?;
    require_field(&payload.email, "email")?;
    require_field(&payload.password, "password")?;

    let store = state.user_store.clone();
    let email = payload.email.clone();
    let user = run_blocking(move || store.authenticate(&payload.email, &payload.password))
        .await?
        .map_err(|e| {
            warn!("login lookup failed: {e}");
            AuthApiError::Internal
        })?;

    let Some(user) = user else {
        warn!("❌ Failed login attempt: {}", email);
        return Err(AuthApiError::InvalidCredentials);
    };

    let token = state.tokens.issue(&user).map_err(|e| {
        warn!("token issue failed: {e}");
        AuthApiError::Internal
    })?;

    info!("✅ Login: {} ({})", user.email, user.role.as_str());

    Ok(Json(AuthResponse {
        user: UserResponse::from_user(&user),
        token,
    }))
}

/// Verify endpoint - GET|POST /api/auth/verify
///
/// Runs behind the auth middleware; returns the current account for the
/// verified identity so clients can rebuild their session from a token.
pub async fn verify(
    State(state): State<AuthState>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<VerifyResponse>, AuthApiError> {
    let store = state.user_store.clone();
    let user = run_blocking(move || store.get_user_by_id(&identity.user_id))
        .await?
        .map_err(|e| {
            warn!("verify lookup failed: {e}");
            AuthApiError::Internal
        })?
        // A valid token for a deleted account is still not a session.
        .ok_or(AuthApiError::Unauthorized)?;

    Ok(Json(VerifyResponse {
        user: UserResponse::from_user(&user),
    }))
}

/// Change-password endpoint - POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AuthState>,
    Extension(identity): Extension<AuthIdentity>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AuthApiError> {
    let payload = json_body(payload)?;
    require_field(&payload.old_password, "oldPassword")?;
    require_field(&payload.new_password, "newPassword")?;

    let store = state.user_store.clone();
    let outcome = run_blocking(move || {
        store.change_password(&identity.user_id, &payload.old_password, &payload.new_password)
    })
    .await?
    .map_err(|e| {
        warn!("change-password failed: {e}");
        AuthApiError::Internal
    })?;

    match outcome {
        PasswordChange::Updated => Ok(Json(json!({ "message": "Password updated" }))),
        PasswordChange::WrongPassword => Err(AuthApiError::InvalidCredentials),
        PasswordChange::UnknownUser => Err(AuthApiError::Unauthorized),
    }
}

/// Forgot-password endpoint - POST /api/auth/forgot-password
///
/// Always answers 200 for a well-formed request; whether the account
/// exists is logged server-side only. Reset delivery is out-of-band.
pub async fn forgot_password(
    State(state): State<AuthState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AuthApiError> {
    let payload = json_body(payload)?;
    require_field(&payload.email, "email")?;

    let store = state.user_store.clone();
    let known = run_blocking(move || store.get_user_by_email(&payload.email))
        .await?
        .map_err(|e| {
            warn!("forgot-password lookup failed: {e}");
            AuthApiError::Internal
        })?
        .is_some();

    if known {
        info!("🔑 Password reset requested for a registered account");
    } else {
        info!("🔑 Password reset requested for an unknown account");
    }

    Ok(Json(json!({
        "message": "If the account exists, reset instructions have been issued"
    })))
}

async fn run_blocking<T, F>(f: F) -> Result<T, AuthApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        warn!("blocking task failed: {e}");
        AuthApiError::Internal
    })
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(_) => Err(AuthApiError::Validation("Invalid JSON payload".to_string())),
    }
}

fn require_field(value: &str, name: &str) -> Result<(), AuthApiError> {
    if value.trim().is_empty() {
        return Err(AuthApiError::Validation(format!("{name} is required")));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthApiError> {
    require_field(email, "email")?;
    if !email.contains('@') {
        return Err(AuthApiError::Validation("invalid email address".to_string()));
    }
    Ok(())
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    Validation(String),
    InvalidCredentials,
    Unauthorized,
    Conflict,
    Internal,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            // One message for every credential failure; no enumeration signal.
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AuthApiError::Conflict => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AuthApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
