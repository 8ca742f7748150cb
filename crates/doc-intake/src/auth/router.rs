use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::store::KeyValueStore;

use super::domain::{LoginRequest, SignupRequest};
use super::guard::{authorize, AccessDenied, Route};
use super::service::{AuthError, AuthService};

/// Router exposing signup, login, logout, session lookup, and navigation checks.
pub fn auth_router<S>(service: Arc<AuthService<S>>) -> Router
where
    S: KeyValueStore + 'static,
{
    Router::new()
        .route("/api/v1/auth/signup", post(signup_handler::<S>))
        .route("/api/v1/auth/login", post(login_handler::<S>))
        .route("/api/v1/auth/logout", post(logout_handler::<S>))
        .route("/api/v1/auth/session", get(session_handler::<S>))
        .route("/api/v1/navigation", get(navigation_handler::<S>))
        .with_state(service)
}

/// 401 for a missing session, 403 for a non-admin; both point back at the login page.
pub fn access_denied_response(denied: &AccessDenied) -> Response {
    let status = match denied {
        AccessDenied::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        AccessDenied::AdminOnly { .. } => StatusCode::FORBIDDEN,
    };
    let payload = json!({
        "error": denied.to_string(),
        "redirect": denied.redirect().path(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn auth_error_response(error: AuthError) -> Response {
    match error {
        AuthError::Validation(errors) => {
            let payload = json!({
                "error": "validation failed",
                "fields": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        AuthError::EmailExists => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        AuthError::InvalidCredentials => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        AuthError::Store(_) => {
            tracing::error!(error = %error, "auth store failure");
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

async fn simulate_latency<S>(service: &AuthService<S>)
where
    S: KeyValueStore + 'static,
{
    let delay = service.simulated_latency();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub(crate) async fn signup_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    axum::Json(request): axum::Json<SignupRequest>,
) -> Response
where
    S: KeyValueStore + 'static,
{
    simulate_latency(&service).await;
    match service.signup(&request) {
        Ok(account) => {
            let payload = json!({
                "user": account,
                "message": "Account created successfully! Please login.",
                "redirect": Route::Login.path(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn login_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    S: KeyValueStore + 'static,
{
    simulate_latency(&service).await;
    match service.login(&request) {
        Ok(session) => {
            let (redirect, message) = if session.is_admin() {
                (Route::Admin, "Welcome Admin!")
            } else {
                (Route::Form, "Logged in successfully!")
            };
            let payload = json!({
                "session": session,
                "redirect": redirect.path(),
                "message": message,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn logout_handler<S>(State(service): State<Arc<AuthService<S>>>) -> Response
where
    S: KeyValueStore + 'static,
{
    match service.logout() {
        Ok(ended) => {
            let payload = json!({
                "loggedOut": ended.is_some(),
                "redirect": Route::Login.path(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn session_handler<S>(State(service): State<Arc<AuthService<S>>>) -> Response
where
    S: KeyValueStore + 'static,
{
    match service.current_session() {
        Ok(session) => {
            let payload = json!({
                "authenticated": session.is_some(),
                "isAdmin": session.as_ref().is_some_and(|s| s.is_admin()),
                "session": session,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => auth_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigationQuery {
    path: String,
}

pub(crate) async fn navigation_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    Query(query): Query<NavigationQuery>,
) -> Response
where
    S: KeyValueStore + 'static,
{
    let Some(route) = Route::from_path(&query.path) else {
        let payload = json!({ "error": format!("unknown page {}", query.path) });
        return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
    };

    let session = match service.current_session() {
        Ok(session) => session,
        Err(error) => return auth_error_response(error),
    };

    match authorize(route, session.as_ref()) {
        Ok(()) => {
            let payload = json!({
                "route": route,
                "path": route.path(),
                "allowed": true,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(denied) => access_denied_response(&denied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        let store = Arc::new(MemoryStore::default());
        auth_router(Arc::new(AuthService::new(store, AuthConfig::default())))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn second_signup_with_same_email_conflicts() {
        let router = router();
        let body = json!({
            "name": "Alice",
            "email": "alice@x.com",
            "password": "secret1",
            "confirmPassword": "secret1",
        });

        let first = router
            .clone()
            .oneshot(post_json("/api/v1/auth/signup", body.clone()))
            .await
            .expect("route executes");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = router
            .oneshot(post_json("/api/v1/auth/signup", body))
            .await
            .expect("route executes");
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let payload = read_json_body(second).await;
        assert_eq!(payload["error"], "Email already exists");
    }

    #[tokio::test]
    async fn signup_reports_field_errors() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/auth/signup",
                json!({ "name": "Al", "email": "al@x.com", "password": "secret1", "confirmPassword": "secret2" }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = read_json_body(response).await;
        assert_eq!(payload["fields"]["confirmPassword"], "Passwords don't match");
    }

    #[tokio::test]
    async fn admin_login_redirects_to_admin_page() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({ "email": "admin@admin.com", "password": "admin123" }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["redirect"], "/admin");
        assert_eq!(payload["message"], "Welcome Admin!");
        assert_eq!(payload["session"]["user"]["isAdmin"], true);
    }

    #[tokio::test]
    async fn navigation_reflects_the_session() {
        let router = router();

        let anonymous = router
            .clone()
            .oneshot(
                Request::get("/api/v1/navigation?path=/form")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_json_body(anonymous).await["redirect"], "/login");

        router
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({ "email": "pat@example.com", "password": "secret1" }),
            ))
            .await
            .expect("route executes");

        let form = router
            .clone()
            .oneshot(
                Request::get("/api/v1/navigation?path=/form")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(form.status(), StatusCode::OK);

        let admin = router
            .oneshot(
                Request::get("/api/v1/navigation?path=/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(admin.status(), StatusCode::FORBIDDEN);
        let payload = read_json_body(admin).await;
        assert_eq!(payload["error"], "Access denied. Admin only.");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let router = router();
        router
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({ "email": "pat@example.com", "password": "secret1" }),
            ))
            .await
            .expect("route executes");

        let logout = router
            .clone()
            .oneshot(Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(read_json_body(logout).await["loggedOut"], true);

        let session = router
            .oneshot(Request::get("/api/v1/auth/session").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        let payload = read_json_body(session).await;
        assert_eq!(payload["authenticated"], false);
        assert_eq!(payload["session"], Value::Null);
    }
}
