use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::auth::{AuthService, LoginRequest, Session};
use crate::config::AuthConfig;
use crate::intake::domain::{
    AddressDetails, FileHandle, FileType, FormSubmission, PersonalDetails, SubmissionId,
};
use crate::intake::repository::{RepositoryError, SubmissionRepository};
use crate::intake::wizard::WizardState;
use crate::intake::{intake_router, IntakeService};
use crate::store::MemoryStore;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

pub(super) fn submitted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn personal() -> PersonalDetails {
    PersonalDetails {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "jane@example.com".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2),
    }
}

pub(super) fn mirrored_address() -> AddressDetails {
    AddressDetails {
        residential_street1: "12 Elm Street".to_string(),
        residential_street2: "Apt 4".to_string(),
        permanent_street1: "stale line".to_string(),
        permanent_street2: String::new(),
        same_as_residential: true,
    }
}

pub(super) fn separate_address() -> AddressDetails {
    AddressDetails {
        residential_street1: "12 Elm Street".to_string(),
        residential_street2: "Apt 4".to_string(),
        permanent_street1: "99 Oak Road".to_string(),
        permanent_street2: "Unit 7".to_string(),
        same_as_residential: false,
    }
}

/// Fills both default slots with complete documents.
pub(super) fn fill_documents(state: &mut WizardState) {
    state
        .rename_document(0, "Passport".to_string())
        .expect("slot 0");
    state
        .set_document_type(0, FileType::Image)
        .expect("slot 0");
    state
        .attach_file(0, FileHandle::new("passport.png"))
        .expect("png accepted");
    state
        .rename_document(1, "Lease".to_string())
        .expect("slot 1");
    state.set_document_type(1, FileType::Pdf).expect("slot 1");
    state
        .attach_file(1, FileHandle::new("lease.pdf"))
        .expect("pdf accepted");
}

/// A wizard sitting on the documents step with every field valid.
pub(super) fn ready_wizard() -> WizardState {
    let mut state = WizardState::new();
    state.update_personal(personal());
    state.advance(today()).expect("personal step valid");
    state.update_address(mirrored_address());
    state.advance(today()).expect("address step valid");
    fill_documents(&mut state);
    state
}

pub(super) fn stored_submission(id: &str, first: &str, last: &str, email: &str) -> FormSubmission {
    let mut state = ready_wizard();
    let mut submission = state
        .assemble(SubmissionId(id.to_string()), today(), submitted_at())
        .expect("ready wizard assembles");
    submission.first_name = first.to_string();
    submission.last_name = last.to_string();
    submission.email = email.to_string();
    submission
}

pub(super) fn build_service() -> (IntakeService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    (IntakeService::new(repository.clone()), repository)
}

pub(super) fn auth_service() -> Arc<AuthService<MemoryStore>> {
    Arc::new(AuthService::new(
        Arc::new(MemoryStore::default()),
        AuthConfig::default(),
    ))
}

pub(super) fn sign_in(auth: &AuthService<MemoryStore>, email: &str, password: &str) -> Session {
    auth.login(&LoginRequest::new(email, password))
        .expect("login succeeds")
}

pub(super) fn intake_router_with<R>(
    service: Arc<IntakeService<R>>,
    auth: Arc<AuthService<MemoryStore>>,
) -> axum::Router
where
    R: SubmissionRepository + 'static,
{
    intake_router(service, auth)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<Vec<FormSubmission>>>,
}

impl MemoryRepository {
    pub(super) fn seeded(records: Vec<FormSubmission>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub(super) fn snapshot(&self) -> Vec<FormSubmission> {
        self.records.lock().expect("repository mutex poisoned").clone()
    }
}

impl SubmissionRepository for MemoryRepository {
    fn append(&self, submission: FormSubmission) -> Result<FormSubmission, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.push(submission.clone());
        Ok(submission)
    }

    fn list(&self) -> Result<Vec<FormSubmission>, RepositoryError> {
        Ok(self.snapshot())
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<FormSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn delete(&self, id: &SubmissionId) -> Result<FormSubmission, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let position = guard
            .iter()
            .position(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(guard.remove(position))
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn append(&self, _submission: FormSubmission) -> Result<FormSubmission, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn list(&self) -> Result<Vec<FormSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<FormSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn delete(&self, _id: &SubmissionId) -> Result<FormSubmission, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = response.into_body();
    let bytes = axum::body::to_bytes(body, 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}
