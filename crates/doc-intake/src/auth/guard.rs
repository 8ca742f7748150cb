use serde::Serialize;

use super::domain::Session;

/// Client-side pages and who may open them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    Login,
    Signup,
    Form,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

impl Route {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Landing,
            Self::Login,
            Self::Signup,
            Self::Form,
            Self::Admin,
        ]
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::Form => "/form",
            Self::Admin => "/admin",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Self::ordered()
            .into_iter()
            .find(|route| route.path() == normalized)
    }

    pub const fn access(self) -> Access {
        match self {
            Self::Landing | Self::Login | Self::Signup => Access::Public,
            Self::Form => Access::Authenticated,
            Self::Admin => Access::Admin,
        }
    }
}

/// Navigation refused; the caller should send the user to [`AccessDenied::redirect`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Please sign in to continue")]
    Unauthenticated { route: Route },
    #[error("Access denied. Admin only.")]
    AdminOnly { route: Route },
}

impl AccessDenied {
    pub const fn redirect(&self) -> Route {
        Route::Login
    }

    pub const fn route(&self) -> Route {
        match self {
            Self::Unauthenticated { route } | Self::AdminOnly { route } => *route,
        }
    }
}

pub fn authorize(route: Route, session: Option<&Session>) -> Result<(), AccessDenied> {
    match (route.access(), session) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(AccessDenied::Unauthenticated { route }),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Admin, Some(session)) if session.is_admin() => Ok(()),
        (Access::Admin, Some(_)) => Err(AccessDenied::AdminOnly { route }),
    }
}
