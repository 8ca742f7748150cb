use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::ids::next_id;
use crate::store::{
    read_flag, read_json, write_json, KeyValueStore, StoreError, ADMIN_FLAG, AUTHENTICATED_FLAG,
    SESSION_KEY, USERS_KEY,
};
use crate::validation::{email, min_length, password_match, required, ValidationErrors};

use super::domain::{LoginRequest, Session, SignupRequest, UserAccount};
use super::AuthMode;

pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const NAME_MIN_LENGTH: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Email already exists")]
    EmailExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mock account and session handling over the key-value store.
///
/// Nothing here is a security control: passwords are only compared for the reserved admin
/// identity, and in [`AuthMode::Demo`] any well-formed credentials sign in.
pub struct AuthService<S> {
    store: Arc<S>,
    config: AuthConfig,
}

impl<S> AuthService<S>
where
    S: KeyValueStore + 'static,
{
    pub fn new(store: Arc<S>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    pub fn mode(&self) -> AuthMode {
        self.config.mode
    }

    pub fn simulated_latency(&self) -> Duration {
        self.config.simulated_latency
    }

    pub fn users(&self) -> Result<Vec<UserAccount>, AuthError> {
        Ok(read_json(self.store.as_ref(), USERS_KEY)?.unwrap_or_default())
    }

    pub fn signup(&self, request: &SignupRequest) -> Result<UserAccount, AuthError> {
        validate_signup(request)?;

        let mut users = self.users()?;
        if users.iter().any(|user| user.email == request.email) {
            warn!(email = %request.email, "signup rejected: email already registered");
            return Err(AuthError::EmailExists);
        }

        let account = UserAccount {
            id: next_id(),
            name: request.name.clone(),
            email: request.email.clone(),
            is_admin: false,
        };
        users.push(account.clone());
        write_json(self.store.as_ref(), USERS_KEY, &users)?;

        info!(user_id = %account.id, "account created");
        Ok(account)
    }

    pub fn login(&self, request: &LoginRequest) -> Result<Session, AuthError> {
        validate_login(request)?;

        let user = if request.email == self.config.admin_email
            && request.password == self.config.admin_password
        {
            UserAccount {
                id: "admin".to_string(),
                name: "Admin".to_string(),
                email: self.config.admin_email.clone(),
                is_admin: true,
            }
        } else if let Some(known) = self
            .users()?
            .into_iter()
            .find(|user| user.email == request.email)
        {
            UserAccount {
                is_admin: false,
                ..known
            }
        } else {
            match self.config.mode {
                AuthMode::Demo => synthesized_account(&request.email),
                AuthMode::Registered => {
                    warn!(email = %request.email, "login rejected: unknown account");
                    return Err(AuthError::InvalidCredentials);
                }
            }
        };

        let session = Session {
            id: next_id(),
            user,
            started_at: Utc::now(),
        };
        // The authenticated flag is written last; a partial failure leaves no live session.
        self.store.remove(AUTHENTICATED_FLAG)?;
        write_json(self.store.as_ref(), SESSION_KEY, &session)?;
        self.store
            .set(ADMIN_FLAG, session.user.is_admin.to_string())?;
        self.store.set(AUTHENTICATED_FLAG, "true".to_string())?;

        info!(
            session_id = %session.id,
            admin = session.user.is_admin,
            "session started"
        );
        Ok(session)
    }

    /// Clears the session flags, returning the session that ended if there was one.
    pub fn logout(&self) -> Result<Option<Session>, AuthError> {
        let ended = self.current_session()?;
        self.store.remove(AUTHENTICATED_FLAG)?;
        self.store.remove(ADMIN_FLAG)?;
        self.store.remove(SESSION_KEY)?;
        if let Some(session) = &ended {
            info!(session_id = %session.id, "session ended");
        }
        Ok(ended)
    }

    /// Admin rights need both the stored flag and the admin account.
    pub fn current_session(&self) -> Result<Option<Session>, AuthError> {
        if !read_flag(self.store.as_ref(), AUTHENTICATED_FLAG)? {
            return Ok(None);
        }
        let Some(mut session) = read_json::<_, Session>(self.store.as_ref(), SESSION_KEY)? else {
            return Ok(None);
        };
        session.user.is_admin =
            session.user.is_admin && read_flag(self.store.as_ref(), ADMIN_FLAG)?;
        Ok(Some(session))
    }
}

fn synthesized_account(email_address: &str) -> UserAccount {
    let name = email_address
        .split('@')
        .next()
        .unwrap_or(email_address)
        .to_string();
    UserAccount {
        id: next_id(),
        name,
        email: email_address.to_string(),
        is_admin: false,
    }
}

pub fn validate_login(request: &LoginRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(
        "email",
        [
            required(&request.email, "Please enter your email"),
            email(&request.email, "Please enter a valid email"),
        ],
    );
    errors.check(
        "password",
        [
            required(&request.password, "Please enter your password"),
            min_length(
                &request.password,
                PASSWORD_MIN_LENGTH,
                "Password must be at least 6 characters",
            ),
        ],
    );
    errors.into_result()
}

pub fn validate_signup(request: &SignupRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(
        "name",
        [
            required(&request.name, "Please enter your name"),
            min_length(
                request.name.trim(),
                NAME_MIN_LENGTH,
                "Name must be at least 2 characters",
            ),
        ],
    );
    errors.check(
        "email",
        [
            required(&request.email, "Please enter your email"),
            email(&request.email, "Please enter a valid email"),
        ],
    );
    errors.check(
        "password",
        [
            required(&request.password, "Please enter your password"),
            min_length(
                &request.password,
                PASSWORD_MIN_LENGTH,
                "Password must be at least 6 characters",
            ),
        ],
    );
    errors.check(
        "confirmPassword",
        [
            required(&request.confirm_password, "Please confirm your password"),
            password_match(
                &request.password,
                &request.confirm_password,
                "Passwords don't match",
            ),
        ],
    );
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Memory store that refuses writes to one key.
    struct FailingWrites {
        inner: MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            if key == self.key {
                return Err(StoreError::Io {
                    path: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn service(mode: AuthMode) -> (AuthService<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let config = AuthConfig {
            mode,
            ..AuthConfig::default()
        };
        (AuthService::new(store.clone(), config), store)
    }

    #[test]
    fn duplicate_signup_reports_existing_email() {
        let (auth, _) = service(AuthMode::Demo);
        auth.signup(&SignupRequest::new("Alice", "alice@x.com", "secret1"))
            .expect("first signup succeeds");

        match auth.signup(&SignupRequest::new("Alice Again", "alice@x.com", "other12")) {
            Err(AuthError::EmailExists) => {}
            other => panic!("expected email exists, got {other:?}"),
        }
        assert_eq!(auth.users().unwrap().len(), 1);
    }

    #[test]
    fn signup_validates_every_field() {
        let (auth, _) = service(AuthMode::Demo);
        let request = SignupRequest {
            name: "A".to_string(),
            email: "alice".to_string(),
            password: "123".to_string(),
            confirm_password: "1234".to_string(),
        };
        match auth.signup(&request) {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
                assert_eq!(errors.get("email"), Some("Please enter a valid email"));
                assert_eq!(
                    errors.get("password"),
                    Some("Password must be at least 6 characters")
                );
                assert_eq!(errors.get("confirmPassword"), Some("Passwords don't match"));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
        assert!(auth.users().unwrap().is_empty());
    }

    #[test]
    fn admin_pair_opens_admin_session() {
        let (auth, store) = service(AuthMode::Demo);
        let session = auth
            .login(&LoginRequest::new("admin@admin.com", "admin123"))
            .expect("admin login");
        assert!(session.is_admin());
        assert_eq!(store.get(ADMIN_FLAG).unwrap().as_deref(), Some("true"));
        assert_eq!(store.get(AUTHENTICATED_FLAG).unwrap().as_deref(), Some("true"));
        assert!(auth.current_session().unwrap().expect("session").is_admin());
    }

    #[test]
    fn admin_email_with_wrong_password_is_a_regular_session() {
        let (auth, _) = service(AuthMode::Demo);
        let session = auth
            .login(&LoginRequest::new("admin@admin.com", "not-admin"))
            .expect("demo login");
        assert!(!session.is_admin());
    }

    #[test]
    fn demo_mode_synthesizes_unknown_accounts() {
        let (auth, _) = service(AuthMode::Demo);
        let session = auth
            .login(&LoginRequest::new("jordan@example.com", "whatever"))
            .expect("demo login");
        assert_eq!(session.user.name, "jordan");
        assert!(!session.is_admin());
        assert!(auth.users().unwrap().is_empty(), "synthesized users are not stored");
    }

    #[test]
    fn registered_mode_rejects_unknown_accounts() {
        let (auth, store) = service(AuthMode::Registered);
        match auth.login(&LoginRequest::new("jordan@example.com", "whatever")) {
            Err(AuthError::InvalidCredentials) => {}
            other => panic!("expected invalid credentials, got {other:?}"),
        }
        assert!(store.get(AUTHENTICATED_FLAG).unwrap().is_none());

        auth.signup(&SignupRequest::new("Jordan", "jordan@example.com", "whatever"))
            .expect("signup");
        let session = auth
            .login(&LoginRequest::new("jordan@example.com", "whatever"))
            .expect("registered login");
        assert_eq!(session.user.name, "Jordan");
    }

    #[test]
    fn login_requires_well_formed_credentials() {
        let (auth, _) = service(AuthMode::Demo);
        match auth.login(&LoginRequest::new("", "")) {
            Err(AuthError::Validation(errors)) => {
                assert_eq!(errors.get("email"), Some("Please enter your email"));
                assert_eq!(errors.get("password"), Some("Please enter your password"));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn logout_clears_flags_and_session() {
        let (auth, store) = service(AuthMode::Demo);
        let session = auth
            .login(&LoginRequest::new("sam@example.com", "secret1"))
            .expect("login");
        let ended = auth.logout().expect("logout");
        assert_eq!(ended.map(|s| s.id), Some(session.id));
        assert!(auth.current_session().unwrap().is_none());
        assert!(store.keys().is_empty());
        assert!(auth.logout().unwrap().is_none());
    }

    #[test]
    fn cleared_admin_flag_downgrades_the_session() {
        let (auth, store) = service(AuthMode::Demo);
        auth.login(&LoginRequest::new("admin@admin.com", "admin123"))
            .expect("admin login");
        store.remove(ADMIN_FLAG).unwrap();
        let session = auth.current_session().unwrap().expect("still signed in");
        assert!(!session.is_admin());
    }

    #[test]
    fn failed_login_write_does_not_keep_the_previous_admin_session() {
        let inner = MemoryStore::default();
        inner.set(AUTHENTICATED_FLAG, "true".to_string()).unwrap();
        inner.set(ADMIN_FLAG, "true".to_string()).unwrap();
        let store = Arc::new(FailingWrites {
            inner,
            key: ADMIN_FLAG,
        });
        let auth = AuthService::new(store.clone(), AuthConfig::default());

        match auth.login(&LoginRequest::new("sam@example.com", "secret1")) {
            Err(AuthError::Store(StoreError::Io { .. })) => {}
            other => panic!("expected store failure, got {other:?}"),
        }
        assert!(auth.current_session().unwrap().is_none());
        assert!(store.get(AUTHENTICATED_FLAG).unwrap().is_none());
    }
}
