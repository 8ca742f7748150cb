use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{Local, NaiveDate};
use serde_json::json;

use crate::auth::router::{access_denied_response, auth_error_response};
use crate::auth::{authorize, AuthService, Route, Session};
use crate::store::KeyValueStore;

use super::documents::DocumentError;
use super::domain::{AddressDetails, FileHandle, PersonalDetails, SubmissionId};
use super::repository::{RepositoryError, SubmissionRepository};
use super::service::{DocumentSlotUpdate, IntakeService, IntakeServiceError, SubmissionQuery};
use super::wizard::WizardError;

/// Shared handler state: the intake service plus the auth service used to gate each route.
pub struct IntakeState<R, S> {
    pub intake: Arc<IntakeService<R>>,
    pub auth: Arc<AuthService<S>>,
}

impl<R, S> Clone for IntakeState<R, S> {
    fn clone(&self) -> Self {
        Self {
            intake: Arc::clone(&self.intake),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Router exposing the form wizard for signed-in users and the admin review list.
pub fn intake_router<R, S>(intake: Arc<IntakeService<R>>, auth: Arc<AuthService<S>>) -> Router
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/form",
            get(view_handler::<R, S>).delete(discard_handler::<R, S>),
        )
        .route("/api/v1/form/personal", put(personal_handler::<R, S>))
        .route("/api/v1/form/address", put(address_handler::<R, S>))
        .route("/api/v1/form/next", post(next_handler::<R, S>))
        .route("/api/v1/form/back", post(back_handler::<R, S>))
        .route("/api/v1/form/documents", post(add_document_handler::<R, S>))
        .route(
            "/api/v1/form/documents/:index",
            put(update_document_handler::<R, S>).delete(remove_document_handler::<R, S>),
        )
        .route(
            "/api/v1/form/documents/:index/file",
            put(attach_file_handler::<R, S>),
        )
        .route("/api/v1/form/submit", post(submit_handler::<R, S>))
        .route(
            "/api/v1/admin/submissions",
            get(list_submissions_handler::<R, S>),
        )
        .route(
            "/api/v1/admin/submissions/:submission_id",
            delete(delete_submission_handler::<R, S>),
        )
        .with_state(IntakeState { intake, auth })
}

fn require<R, S>(state: &IntakeState<R, S>, route: Route) -> Result<Session, Response>
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = state.auth.current_session().map_err(auth_error_response)?;
    authorize(route, session.as_ref()).map_err(|denied| access_denied_response(&denied))?;
    session.ok_or_else(|| {
        let payload = json!({ "error": "session missing", "redirect": Route::Login.path() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })
}

pub(crate) fn intake_error_response(error: IntakeServiceError) -> Response {
    match error {
        IntakeServiceError::Wizard(WizardError::Validation(errors)) => {
            let payload = json!({
                "error": "validation failed",
                "fields": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        IntakeServiceError::Wizard(WizardError::IncompleteDocuments { errors }) => {
            let payload = json!({
                "error": super::documents::INCOMPLETE_SLOT_MESSAGE,
                "documentErrors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        IntakeServiceError::Wizard(WizardError::Document(
            error @ DocumentError::SlotOutOfRange { .. },
        )) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        IntakeServiceError::Wizard(WizardError::Document(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        IntakeServiceError::Wizard(error @ WizardError::WrongStep { .. }) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        IntakeServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "submission not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => {
            tracing::error!(error = %other, "intake request failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn view_response(result: Result<super::wizard::WizardView, IntakeServiceError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

/// Date the age rule is checked against, both when leaving the personal step and on submit.
fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn view_handler<R, S>(State(state): State<IntakeState<R, S>>) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.view(&session.id))
}

pub(crate) async fn discard_handler<R, S>(State(state): State<IntakeState<R, S>>) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    match state.intake.discard(&session.id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn personal_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    axum::Json(personal): axum::Json<PersonalDetails>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.update_personal(&session.id, personal))
}

pub(crate) async fn address_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    axum::Json(address): axum::Json<AddressDetails>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.update_address(&session.id, address))
}

pub(crate) async fn next_handler<R, S>(State(state): State<IntakeState<R, S>>) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.advance(&session.id, local_today()))
}

pub(crate) async fn back_handler<R, S>(State(state): State<IntakeState<R, S>>) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.retreat(&session.id))
}

pub(crate) async fn add_document_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.add_document(&session.id))
}

pub(crate) async fn update_document_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    Path(index): Path<usize>,
    axum::Json(update): axum::Json<DocumentSlotUpdate>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.update_document(&session.id, index, update))
}

pub(crate) async fn remove_document_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    Path(index): Path<usize>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.remove_document(&session.id, index))
}

pub(crate) async fn attach_file_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    Path(index): Path<usize>,
    axum::Json(file): axum::Json<FileHandle>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };
    view_response(state.intake.attach_file(&session.id, index, file))
}

pub(crate) async fn submit_handler<R, S>(State(state): State<IntakeState<R, S>>) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    let session = match require(&state, Route::Form) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let delay = state.auth.simulated_latency();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match state.intake.submit(&session.id, local_today()) {
        Ok(submission) => {
            let payload = json!({
                "submission": submission,
                "message": "Form submitted successfully!",
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn list_submissions_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    Query(query): Query<SubmissionQuery>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    if let Err(response) = require(&state, Route::Admin) {
        return response;
    }
    match state.intake.list_submissions(&query) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn delete_submission_handler<R, S>(
    State(state): State<IntakeState<R, S>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: KeyValueStore + 'static,
{
    if let Err(response) = require(&state, Route::Admin) {
        return response;
    }
    match state.intake.delete_submission(&SubmissionId(submission_id)) {
        Ok(removed) => {
            let payload = json!({
                "submission": removed,
                "message": "Submission deleted successfully",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => intake_error_response(error),
    }
}
