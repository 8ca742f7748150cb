//! Three step document submission form: personal details, address details, and document
//! uploads, plus the stored submission list reviewed by the admin.

pub mod documents;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use documents::{DocumentError, DocumentList, MIN_DOCUMENT_SLOTS};
pub use domain::{
    AddressDetails, DocumentReference, DocumentSlot, FileHandle, FileType, FormSubmission,
    PersonalDetails, SubmissionId,
};
pub use repository::{KvSubmissionRepository, RepositoryError, SubmissionRepository};
pub use router::{intake_router, IntakeState};
pub use service::{
    DocumentSlotUpdate, IntakeService, IntakeServiceError, SubmissionPage, SubmissionQuery,
};
pub use wizard::{StepStatus, WizardError, WizardState, WizardStep, WizardView};
