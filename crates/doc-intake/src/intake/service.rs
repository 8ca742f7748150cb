use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ids::TimeOrderedIds;

use super::domain::{
    AddressDetails, FileHandle, FileType, FormSubmission, PersonalDetails, SubmissionId,
};
use super::repository::{RepositoryError, SubmissionRepository};
use super::wizard::{WizardError, WizardState, WizardView};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;

/// Partial edit of a document slot; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSlotUpdate {
    pub file_name: Option<String>,
    pub file_type: Option<FileType>,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionQuery {
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPage {
    /// Every stored submission, before filtering.
    pub total: usize,
    pub matched: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<FormSubmission>,
}

/// The wizard draft and the session it belongs to.
#[derive(Debug, Default)]
struct ActiveForm {
    session_id: Option<String>,
    state: WizardState,
}

/// Service composing the wizard state machine with the submission repository.
///
/// Only one form is in flight at a time. It is bound to the session id that last touched it;
/// a different session id starts from a blank form.
pub struct IntakeService<R> {
    repository: Arc<R>,
    form: Mutex<ActiveForm>,
    ids: TimeOrderedIds,
}

impl<R> IntakeService<R>
where
    R: SubmissionRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            form: Mutex::new(ActiveForm::default()),
            ids: TimeOrderedIds::new(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    fn with_form<T>(
        &self,
        session_id: &str,
        apply: impl FnOnce(&mut WizardState) -> Result<T, IntakeServiceError>,
    ) -> Result<T, IntakeServiceError> {
        let mut form = self
            .form
            .lock()
            .map_err(|_| IntakeServiceError::SessionUnavailable)?;
        if form.session_id.as_deref() != Some(session_id) {
            form.session_id = Some(session_id.to_string());
            form.state.reset();
        }
        apply(&mut form.state)
    }

    pub fn view(&self, session_id: &str) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| Ok(state.view()))
    }

    pub fn update_personal(
        &self,
        session_id: &str,
        personal: PersonalDetails,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.update_personal(personal);
            Ok(state.view())
        })
    }

    pub fn update_address(
        &self,
        session_id: &str,
        address: AddressDetails,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.update_address(address);
            Ok(state.view())
        })
    }

    pub fn advance(
        &self,
        session_id: &str,
        today: NaiveDate,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.advance(today)?;
            Ok(state.view())
        })
    }

    pub fn retreat(&self, session_id: &str) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.retreat();
            Ok(state.view())
        })
    }

    pub fn add_document(&self, session_id: &str) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.add_document();
            Ok(state.view())
        })
    }

    pub fn remove_document(
        &self,
        session_id: &str,
        index: usize,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.remove_document(index).inspect_err(|err| {
                warn!(index, error = %err, "document slot removal rejected");
            })?;
            Ok(state.view())
        })
    }

    pub fn update_document(
        &self,
        session_id: &str,
        index: usize,
        update: DocumentSlotUpdate,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            if let Some(file_type) = update.file_type {
                if let Some(dropped) = state.set_document_type(index, file_type)? {
                    info!(index, file = %dropped.name, "detached file that no longer matches slot type");
                }
            }
            if let Some(file_name) = update.file_name {
                state.rename_document(index, file_name)?;
            }
            Ok(state.view())
        })
    }

    pub fn attach_file(
        &self,
        session_id: &str,
        index: usize,
        file: FileHandle,
    ) -> Result<WizardView, IntakeServiceError> {
        self.with_form(session_id, |state| {
            state.attach_file(index, file).inspect_err(|err| {
                warn!(index, error = %err, "file rejected for document slot");
            })?;
            Ok(state.view())
        })
    }

    /// Abandons the in-flight form if it belongs to `session_id`.
    pub fn discard(&self, session_id: &str) -> Result<(), IntakeServiceError> {
        let mut form = self
            .form
            .lock()
            .map_err(|_| IntakeServiceError::SessionUnavailable)?;
        if form.session_id.as_deref() == Some(session_id) {
            form.session_id = None;
            form.state.reset();
        }
        Ok(())
    }

    /// `today` is the local calendar date, the same one passed to [`IntakeService::advance`].
    pub fn submit(
        &self,
        session_id: &str,
        today: NaiveDate,
    ) -> Result<FormSubmission, IntakeServiceError> {
        self.submit_at(session_id, today, Utc::now())
    }

    /// Validates the documents, stores the record, then resets the form. A storage failure
    /// leaves the draft as it was.
    pub fn submit_at(
        &self,
        session_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<FormSubmission, IntakeServiceError> {
        let stored = self.with_form(session_id, |state| {
            let id = SubmissionId(self.ids.next_at(now));
            let submission = state.assemble(id, today, now)?;
            let stored = self.repository.append(submission)?;
            state.reset();
            Ok(stored)
        })?;

        info!(
            submission_id = %stored.id,
            documents = stored.documents.len(),
            "form submission stored"
        );
        Ok(stored)
    }

    pub fn list_submissions(
        &self,
        query: &SubmissionQuery,
    ) -> Result<SubmissionPage, IntakeServiceError> {
        let submissions = self.repository.list()?;
        let total = submissions.len();
        let term = query.search.as_deref().unwrap_or_default();
        let matching: Vec<FormSubmission> = submissions
            .into_iter()
            .filter(|submission| submission.matches(term))
            .collect();

        let page_size = query
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let matched = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(SubmissionPage {
            total,
            matched,
            page,
            page_size,
            items,
        })
    }

    pub fn get_submission(&self, id: &SubmissionId) -> Result<FormSubmission, IntakeServiceError> {
        let submission = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(submission)
    }

    pub fn delete_submission(
        &self,
        id: &SubmissionId,
    ) -> Result<FormSubmission, IntakeServiceError> {
        let removed = self.repository.delete(id)?;
        info!(submission_id = %removed.id, "submission deleted");
        Ok(removed)
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("form session unavailable")]
    SessionUnavailable,
}
