//! Client Session Context
//! Mission: Own the client's authentication state and its lifecycle

use crate::client::http::{AuthApi, ClientError};
use crate::client::storage::TokenStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Role as the client sees it. Used for UI gating only; the authoritative
/// role lives server-side in the verified token and is a different type on
/// purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "employee")]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    /// Where a signed-in user of this role lands by default.
    pub fn landing_page(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Employee => "/employee/dashboard",
        }
    }
}

/// The signed-in account as returned by the server (never includes the
/// password hash).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Client session state machine.
///
/// `Bootstrapping -> {Authenticated | Unauthenticated}` on startup;
/// `Unauthenticated -> Authenticated` on login;
/// `Authenticated -> Unauthenticated` on logout or a failed bootstrap.
/// There is no distinct expired state: expiry surfaces as a verify failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Bootstrapping,
    Authenticated(SessionUser),
    Unauthenticated,
}

struct Inner {
    state: SessionState,
    // Bumped by login/logout so an in-flight bootstrap result that lands
    // afterwards is discarded instead of clobbering newer state.
    generation: u64,
}

/// Owns the in-memory session and the persisted token. All transitions go
/// through `bootstrap`, `login` and `logout`; there are no other writers.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<RwLock<Inner>>,
    api: Arc<dyn AuthApi>,
    tokens: TokenStore,
}

impl SessionContext {
    pub fn new(api: Arc<dyn AuthApi>, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: SessionState::Bootstrapping,
                generation: 0,
            })),
            api,
            tokens,
        }
    }

    /// Current state (read accessor).
    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    /// Persist the token that a successful login/signup returned. The
    /// single well-known slot is overwritten; there is never more than one
    /// live client-held token.
    pub fn persist_token(&self, token: &str) -> anyhow::Result<()> {
        self.tokens.save(token)
    }

    /// Token currently persisted, if any. Protected calls attach this.
    pub fn persisted_token(&self) -> Option<String> {
        self.tokens.load()
    }

    /// Re-establish authentication state from the persisted token. Called
    /// once per application start; returns the settled state.
    pub async fn bootstrap(&self) -> SessionState {
        let generation = self.inner.read().generation;

        let Some(token) = self.tokens.load() else {
            // No persisted token: unauthenticated, no network call.
            return self.settle(generation, SessionState::Unauthenticated, false);
        };

        match self.api.verify(&token).await {
            Ok(user) => self.settle(generation, SessionState::Authenticated(user), false),
            Err(ClientError::Auth(_)) => {
                // Definitive rejection: drop the dead token so it is not
                // re-verified on every load.
                self.settle(generation, SessionState::Unauthenticated, true)
            }
            Err(e) => {
                // Transient failure: keep the token for a retry on the
                // next start.
                warn!("session bootstrap failed: {e}");
                self.settle(generation, SessionState::Unauthenticated, false)
            }
        }
    }

    /// Record a successful login. The caller persists the token first.
    pub fn login(&self, user: SessionUser) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = SessionState::Authenticated(user);
    }

    /// Clear both the in-memory session and the persisted token.
    pub fn logout(&self) -> anyhow::Result<()> {
        {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.state = SessionState::Unauthenticated;
        }
        self.tokens.clear()
    }

    /// Apply a bootstrap outcome unless a login/logout superseded it while
    /// the verify call was in flight. The token clear happens under the
    /// same generation check: a stale rejection of the old token must not
    /// delete a token a newer login just persisted.
    fn settle(&self, generation: u64, next: SessionState, drop_token: bool) -> SessionState {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            // Superseded while the verify call was in flight.
            return inner.state.clone();
        }
        if drop_token {
            if let Err(e) = self.tokens.clear() {
                warn!("failed to clear rejected token: {e}");
            }
        }
        inner.state = next;
        inner.state.clone()
    }
}
