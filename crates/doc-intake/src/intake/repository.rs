use std::sync::Arc;

use crate::store::{read_json, write_json, KeyValueStore, StoreError, SUBMISSIONS_KEY};

use super::domain::{FormSubmission, SubmissionId};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SubmissionRepository: Send + Sync {
    /// Appends without deduplicating; the same person may submit many times.
    fn append(&self, submission: FormSubmission) -> Result<FormSubmission, RepositoryError>;
    /// All submissions in insertion order.
    fn list(&self) -> Result<Vec<FormSubmission>, RepositoryError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<FormSubmission>, RepositoryError>;
    fn delete(&self, id: &SubmissionId) -> Result<FormSubmission, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("submission not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Keeps the whole collection as one JSON array under `formSubmissions`.
pub struct KvSubmissionRepository<S> {
    store: Arc<S>,
}

impl<S> KvSubmissionRepository<S>
where
    S: KeyValueStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn load(&self) -> Result<Vec<FormSubmission>, RepositoryError> {
        Ok(read_json(self.store.as_ref(), SUBMISSIONS_KEY)?.unwrap_or_default())
    }

    fn save(&self, submissions: &[FormSubmission]) -> Result<(), RepositoryError> {
        write_json(self.store.as_ref(), SUBMISSIONS_KEY, submissions)?;
        Ok(())
    }
}

impl<S> SubmissionRepository for KvSubmissionRepository<S>
where
    S: KeyValueStore,
{
    fn append(&self, submission: FormSubmission) -> Result<FormSubmission, RepositoryError> {
        let mut submissions = self.load()?;
        submissions.push(submission.clone());
        self.save(&submissions)?;
        Ok(submission)
    }

    fn list(&self) -> Result<Vec<FormSubmission>, RepositoryError> {
        self.load()
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<FormSubmission>, RepositoryError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|submission| &submission.id == id))
    }

    fn delete(&self, id: &SubmissionId) -> Result<FormSubmission, RepositoryError> {
        let mut submissions = self.load()?;
        let position = submissions
            .iter()
            .position(|submission| &submission.id == id)
            .ok_or(RepositoryError::NotFound)?;
        let removed = submissions.remove(position);
        self.save(&submissions)?;
        Ok(removed)
    }
}
