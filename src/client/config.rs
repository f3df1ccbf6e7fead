//! Client Configuration
//! Mission: Resolve the API base URL and token slot from the environment

use std::env;
use std::path::PathBuf;

/// Client-side settings, env-overridable with sensible defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token_path: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let base_url =
            env::var("PAYROLL_API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());
        let token_path = resolve_token_path(env::var("PAYROLL_TOKEN_PATH").ok());

        Self {
            base_url,
            token_path,
        }
    }
}

fn resolve_token_path(env_value: Option<String>) -> PathBuf {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return base.join(".payroll_token");
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p;
    }

    // Treat relative paths as relative to the crate, not the caller's cwd.
    base.join(p)
}
