//! Client HTTP Transport
//! Mission: Talk to the auth API and classify its failures

use crate::client::session::{Role, SessionUser};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Client-side failure taxonomy. The split between `Network` and the rest
/// is what lets the UI say "cannot reach the server" instead of blaming
/// the user's credentials.
#[derive(Debug)]
pub enum ClientError {
    /// The server could not be reached (refused, DNS, timeout).
    Network(String),
    /// Definitive 401 from the server.
    Auth(String),
    /// The server rejected the input (400 validation, 409 conflict).
    Rejected(String),
    /// Anything else, including 5xx and undecodable responses.
    Server(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            ClientError::Rejected(msg) => write!(f, "request rejected: {msg}"),
            ClientError::Server(msg) => write!(f, "server error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Message suitable for direct display. Non-fatal in every case; the
    /// user can correct and resubmit without restarting.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Unable to reach the server. Please check if the backend is running.".to_string()
            }
            ClientError::Auth(msg) | ClientError::Rejected(msg) => msg.clone(),
            ClientError::Server(_) => "Server error. Please try again.".to_string(),
        }
    }
}

/// A successful login or signup: the account plus its bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSuccess {
    pub user: SessionUser,
    pub token: String,
}

/// The one call the session bootstrap needs. A trait seam so the state
/// machine is testable without a server.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SessionUser, ClientError>;
}

/// HTTP client for the auth endpoints
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl HttpAuthClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSuccess, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network)?;

        decode_success(resp).await
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<AuthSuccess, ClientError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(role) = role {
            body["role"] = json!(role);
        }

        let resp = self
            .http
            .post(self.url("/api/auth/signup"))
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        decode_success(resp).await
    }

    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/change-password"))
            .bearer_auth(token)
            .json(&json!({ "oldPassword": old_password, "newPassword": new_password }))
            .send()
            .await
            .map_err(network)?;

        let resp = check_status(resp).await?;
        let body: MessageBody = resp.json().await.map_err(undecodable)?;
        Ok(body.message.unwrap_or_else(|| "Password updated".to_string()))
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/forgot-password"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(network)?;

        let resp = check_status(resp).await?;
        let body: MessageBody = resp.json().await.map_err(undecodable)?;
        Ok(body
            .message
            .unwrap_or_else(|| "Reset instructions issued".to_string()))
    }
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn verify(&self, token: &str) -> Result<SessionUser, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/auth/verify"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network)?;

        let resp = check_status(resp).await?;
        let body: VerifyBody = resp.json().await.map_err(undecodable)?;
        Ok(body.user)
    }
}

fn network(e: reqwest::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

fn undecodable(e: reqwest::Error) -> ClientError {
    ClientError::Server(format!("undecodable response body: {e}"))
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(resp);
    }

    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("request failed with status {status}"));

    Err(match status {
        401 => ClientError::Auth(message),
        400 | 409 => ClientError::Rejected(message),
        _ => ClientError::Server(message),
    })
}

async fn decode_success(resp: reqwest::Response) -> Result<AuthSuccess, ClientError> {
    let resp = check_status(resp).await?;
    resp.json::<AuthSuccess>().await.map_err(undecodable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_distinguish_network_from_auth() {
        let network = ClientError::Network("connection refused".to_string());
        let auth = ClientError::Auth("Invalid credentials".to_string());

        assert!(network.user_message().contains("reach the server"));
        assert_eq!(auth.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpAuthClient::new("http://localhost:4000/").unwrap();
        assert_eq!(
            client.url("/api/auth/login"),
            "http://localhost:4000/api/auth/login"
        );
    }

    #[test]
    fn test_auth_success_decodes_server_shape() {
        let body = r#"{
            "user": {
                "id": "11111111-1111-1111-1111-111111111111",
                "email": "a@x.com",
                "role": "employee",
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
            },
            "token": "abc.def.ghi"
        }"#;

        let success: AuthSuccess = serde_json::from_str(body).unwrap();
        assert_eq!(success.user.role, Role::Employee);
        assert_eq!(success.token, "abc.def.ghi");
    }
}
