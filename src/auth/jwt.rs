//! JWT Token Service
//! Mission: Issue and verify self-contained signed tokens

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Why a token failed verification. Callers must not forward the kind to
/// the client; it exists for server-side logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    InvalidSignature,
    Expired,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::InvalidSignature => write!(f, "invalid token signature"),
            TokenError::Expired => write!(f, "token expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Token service for issue/verify operations (HS256, shared secret)
pub struct TokenService {
    secret: String,
    ttl_hours: i64,
}

impl TokenService {
    /// Create a new token service with a shared secret and fixed expiry window
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self { secret, ttl_hours }
    }

    /// Issue a signed token embedding the user's id and role
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.clone(),
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        debug!(
            "Issuing token for user {}, expires in {}h",
            user.id, self.ttl_hours
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;

        debug!("Verified token for user {}", decoded.claims.sub);

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::UserRole;
    use uuid::Uuid;

    fn create_test_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "testuser@x.com".to_string(),
            password_hash: "hash".to_string(),
            role,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);
        let user = create_test_user(UserRole::Employee);

        let token = service.issue(&user).unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::Employee);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);

        assert!(matches!(
            service.verify("not.a.token"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(service.verify(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_different_secrets_reject() {
        let issuer = TokenService::new("secret1".to_string(), 24);
        let verifier = TokenService::new("secret2".to_string(), 24);
        let user = create_test_user(UserRole::Admin);

        let token = issuer.issue(&user).unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative TTL puts exp comfortably past the default decode leeway.
        let service = TokenService::new("test-secret-key-12345".to_string(), -2);
        let user = create_test_user(UserRole::Employee);

        let token = service.issue(&user).unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_carries_role() {
        let service = TokenService::new("test-secret-key-12345".to_string(), 24);
        let admin = create_test_user(UserRole::Admin);

        let token = service.issue(&admin).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.exp > Utc::now().timestamp() as usize);
    }
}
