use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::documents::{DocumentError, DocumentList, INCOMPLETE_SLOT_MESSAGE};
use super::domain::{
    AddressDetails, DocumentSlot, FileHandle, FileType, FormSubmission, PersonalDetails,
    SubmissionId,
};
use crate::validation::{validate_address, validate_personal, ValidationErrors};

/// Linear wizard steps. Submission happens while on [`WizardStep::Documents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Personal,
    Address,
    Documents,
}

impl WizardStep {
    pub const fn ordered() -> [Self; 3] {
        [Self::Personal, Self::Address, Self::Documents]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Personal => 0,
            Self::Address => 1,
            Self::Documents => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Personal => "Personal Details",
            Self::Address => "Address Details",
            Self::Documents => "Upload Documents",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Personal => Some(Self::Address),
            Self::Address => Some(Self::Documents),
            Self::Documents => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Personal => None,
            Self::Address => Some(Self::Personal),
            Self::Documents => Some(Self::Address),
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{}", INCOMPLETE_SLOT_MESSAGE)]
    IncompleteDocuments { errors: Vec<String> },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("cannot {action} from the {step} step")]
    WrongStep { action: &'static str, step: WizardStep },
}

/// Progress marker for a step relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub index: usize,
    pub title: &'static str,
    pub status: StepStatus,
}

/// Snapshot handed to whatever renders the form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step_index: usize,
    pub step: WizardStep,
    pub steps: Vec<StepView>,
    pub personal: PersonalDetails,
    pub address: AddressDetails,
    pub documents: Vec<DocumentSlot>,
    pub document_errors: Vec<String>,
}

/// In-progress form for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    step: WizardStep,
    personal: PersonalDetails,
    address: AddressDetails,
    documents: DocumentList,
    document_errors: Vec<String>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Personal,
            personal: PersonalDetails::default(),
            address: AddressDetails::default(),
            documents: DocumentList::new(),
            document_errors: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn personal(&self) -> &PersonalDetails {
        &self.personal
    }

    pub fn address(&self) -> &AddressDetails {
        &self.address
    }

    pub fn documents(&self) -> &DocumentList {
        &self.documents
    }

    pub fn document_errors(&self) -> &[String] {
        &self.document_errors
    }

    pub fn update_personal(&mut self, personal: PersonalDetails) {
        self.personal = personal;
    }

    /// Replaces the address draft. With the mirroring flag on, the permanent lines are
    /// overwritten by the residential ones straight away.
    pub fn update_address(&mut self, address: AddressDetails) {
        self.address = address;
        if self.address.same_as_residential {
            self.address.mirror_residential();
        }
    }

    pub fn set_same_as_residential(&mut self, enabled: bool) {
        self.address.same_as_residential = enabled;
        if enabled {
            self.address.mirror_residential();
        }
    }

    pub fn add_document(&mut self) -> usize {
        self.document_errors.clear();
        self.documents.add_slot()
    }

    pub fn remove_document(&mut self, index: usize) -> Result<DocumentSlot, WizardError> {
        let removed = self.documents.remove_slot(index)?;
        self.document_errors.clear();
        Ok(removed)
    }

    pub fn rename_document(&mut self, index: usize, file_name: String) -> Result<(), WizardError> {
        self.documents.set_file_name(index, file_name)?;
        Ok(())
    }

    pub fn set_document_type(
        &mut self,
        index: usize,
        file_type: FileType,
    ) -> Result<Option<FileHandle>, WizardError> {
        Ok(self.documents.set_file_type(index, file_type)?)
    }

    pub fn attach_file(
        &mut self,
        index: usize,
        file: FileHandle,
    ) -> Result<Option<FileHandle>, WizardError> {
        Ok(self.documents.set_file(index, file)?)
    }

    /// Moves forward when the current step's fields pass validation.
    pub fn advance(&mut self, today: NaiveDate) -> Result<WizardStep, WizardError> {
        let next = self.step.next().ok_or(WizardError::WrongStep {
            action: "advance",
            step: self.step,
        })?;

        match self.step {
            WizardStep::Personal => validate_personal(&self.personal, today)?,
            WizardStep::Address => validate_address(&self.address)?,
            WizardStep::Documents => {}
        }

        debug!(from = self.step.index(), to = next.index(), "wizard advanced");
        self.step = next;
        Ok(next)
    }

    /// Steps back without validating; stays put on the first step.
    pub fn retreat(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Builds the record to store. Only the document errors change on failure; the caller
    /// resets the state once the record is persisted.
    ///
    /// `today` is the calendar date the age rule is checked against and must be the same
    /// one [`WizardState::advance`] used.
    pub fn assemble(
        &mut self,
        id: SubmissionId,
        today: NaiveDate,
        submitted_at: DateTime<Utc>,
    ) -> Result<FormSubmission, WizardError> {
        if self.step != WizardStep::Documents {
            return Err(WizardError::WrongStep {
                action: "submit",
                step: self.step,
            });
        }

        let errors = self.documents.validate_all();
        let complete = errors.iter().all(String::is_empty);
        self.document_errors = errors;
        let documents = match self.documents.references() {
            Some(documents) if complete => documents,
            _ => {
                return Err(WizardError::IncompleteDocuments {
                    errors: self.document_errors.clone(),
                })
            }
        };

        validate_personal(&self.personal, today)?;
        validate_address(&self.address)?;
        let Some(date_of_birth) = self.personal.date_of_birth else {
            let mut errors = ValidationErrors::new();
            errors.check("dateOfBirth", [Err("Date of birth is required".to_string())]);
            return Err(errors.into());
        };

        let (permanent_street1, permanent_street2) = self.address.resolved_permanent();

        Ok(FormSubmission {
            id,
            first_name: self.personal.first_name.clone(),
            last_name: self.personal.last_name.clone(),
            email: self.personal.email.clone(),
            date_of_birth,
            residential_street1: self.address.residential_street1.clone(),
            residential_street2: self.address.residential_street2.clone(),
            permanent_street1: permanent_street1.to_string(),
            permanent_street2: permanent_street2.to_string(),
            documents,
            submitted_at,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn view(&self) -> WizardView {
        let steps = WizardStep::ordered()
            .into_iter()
            .map(|step| StepView {
                index: step.index(),
                title: step.label(),
                status: match step.index().cmp(&self.step.index()) {
                    std::cmp::Ordering::Less => StepStatus::Complete,
                    std::cmp::Ordering::Equal => StepStatus::Active,
                    std::cmp::Ordering::Greater => StepStatus::Upcoming,
                },
            })
            .collect();

        WizardView {
            step_index: self.step.index(),
            step: self.step,
            steps,
            personal: self.personal.clone(),
            address: self.address.clone(),
            documents: self.documents.slots().to_vec(),
            document_errors: self.document_errors.clone(),
        }
    }
}
