//! Route Guard
//! Mission: Gate route subtrees by authentication and role membership

use crate::client::session::{Role, SessionState};

pub const LOGIN_PATH: &str = "/login";

/// What a guarded route should do for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Bootstrap still in flight: render nothing final yet.
    Pending,
    Allow,
    Redirect(&'static str),
}

/// Authentication gate: signed-in users pass, everyone else goes to the
/// login entry point.
pub fn authentication_gate(state: &SessionState) -> RouteDecision {
    match state {
        SessionState::Bootstrapping => RouteDecision::Pending,
        SessionState::Unauthenticated => RouteDecision::Redirect(LOGIN_PATH),
        SessionState::Authenticated(_) => RouteDecision::Allow,
    }
}

/// Role gate: composes the authentication gate, then checks membership in
/// the allowed set. A signed-in user with the wrong role is sent to their
/// own landing page, not to login.
pub fn role_gate(state: &SessionState, allowed: &[Role]) -> RouteDecision {
    match state {
        SessionState::Bootstrapping => RouteDecision::Pending,
        SessionState::Unauthenticated => RouteDecision::Redirect(LOGIN_PATH),
        SessionState::Authenticated(user) => {
            if allowed.contains(&user.role) {
                RouteDecision::Allow
            } else {
                RouteDecision::Redirect(user.role.landing_page())
            }
        }
    }
}
