//! Mock accounts, the single active session, and page access rules.

pub mod domain;
pub mod guard;
pub mod router;
pub mod service;

use serde::Serialize;

pub use domain::{LoginRequest, Session, SignupRequest, UserAccount};
pub use guard::{authorize, Access, AccessDenied, Route};
pub use router::{access_denied_response, auth_router};
pub use service::{AuthError, AuthService};

/// How logins for addresses that were never registered are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Demo behavior: any well-formed credentials sign in with a synthesized account.
    Demo,
    /// Only the reserved admin and registered accounts may sign in.
    Registered,
}

impl AuthMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" | "any" => Some(Self::Demo),
            "registered" => Some(Self::Registered),
            _ => None,
        }
    }
}
