//! Payroll API Server
//! Mission: Token-based authentication and role authorization for the
//! payroll platform

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payroll_backend::auth::{api, AuthState, TokenService, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("💼 Payroll API Starting");

    let db_path = resolve_data_path(env::var("AUTH_DB_PATH").ok(), "payroll_auth.db");

    let jwt_secret = match env::var("JWT_SECRET") {
        Ok(s) if !s.trim().is_empty() => s,
        _ => {
            warn!("⚠️  JWT_SECRET not set - falling back to a development secret");
            "dev-secret-change-in-production-minimum-32-characters".to_string()
        }
    };

    let ttl_hours = env::var("TOKEN_TTL_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(24);

    // bcrypt only accepts costs in 4..=31
    let bcrypt_cost = env::var("BCRYPT_COST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| (4..=31).contains(v))
        .unwrap_or(bcrypt::DEFAULT_COST);

    let user_store = Arc::new(UserStore::new(&db_path, bcrypt_cost)?);
    let tokens = Arc::new(TokenService::new(jwt_secret, ttl_hours));
    let auth_state = AuthState::new(user_store, tokens);

    info!("🔐 Authentication store at: {}", db_path);
    info!("⏳ Token TTL: {}h", ttl_hours);

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api::router(auth_state))
        .layer(CorsLayer::permissive());

    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn health_check() -> &'static str {
    "💼 Payroll API Operational"
}

/// Initialize tracing with env-filterable output
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payroll_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return base.join(default_filename).to_string_lossy().to_string();
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    // Treat relative paths as relative to the crate, not the caller's cwd.
    base.join(p).to_string_lossy().to_string()
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate directory (common when running with
    // --manifest-path from elsewhere)
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join(".env");
    if candidate.exists() {
        let _ = dotenv::from_path(&candidate);
    }
}
