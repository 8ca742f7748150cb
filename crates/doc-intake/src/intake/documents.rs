use serde::Serialize;

use super::domain::{DocumentReference, DocumentSlot, FileHandle, FileType};

pub const MIN_DOCUMENT_SLOTS: usize = 2;
pub const INCOMPLETE_SLOT_MESSAGE: &str = "All document fields are required";

/// Rejected document list edits. The list is left untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Minimum 2 documents are required")]
    BelowMinimum,
    #[error("Please upload a valid image file")]
    InvalidImage { file_name: String },
    #[error("Please upload a PDF file")]
    InvalidPdf { file_name: String },
    #[error("document slot {index} does not exist (list has {len})")]
    SlotOutOfRange { index: usize, len: usize },
}

/// Ordered upload slots. Never holds fewer than [`MIN_DOCUMENT_SLOTS`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DocumentList {
    slots: Vec<DocumentSlot>,
}

impl Default for DocumentList {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentList {
    pub fn new() -> Self {
        Self {
            slots: vec![DocumentSlot::default(); MIN_DOCUMENT_SLOTS],
        }
    }

    pub fn slots(&self) -> &[DocumentSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a blank slot and returns its index.
    pub fn add_slot(&mut self) -> usize {
        self.slots.push(DocumentSlot::default());
        self.slots.len() - 1
    }

    pub fn remove_slot(&mut self, index: usize) -> Result<DocumentSlot, DocumentError> {
        if self.slots.len() <= MIN_DOCUMENT_SLOTS {
            return Err(DocumentError::BelowMinimum);
        }
        self.ensure_index(index)?;
        Ok(self.slots.remove(index))
    }

    pub fn set_file_name(
        &mut self,
        index: usize,
        file_name: impl Into<String>,
    ) -> Result<(), DocumentError> {
        self.slot_mut(index)?.file_name = file_name.into();
        Ok(())
    }

    /// Declares the slot's type. An attached file whose extension does not fit the new type
    /// is detached and returned.
    pub fn set_file_type(
        &mut self,
        index: usize,
        file_type: FileType,
    ) -> Result<Option<FileHandle>, DocumentError> {
        let slot = self.slot_mut(index)?;
        slot.file_type = Some(file_type);
        let incompatible = slot
            .file
            .as_ref()
            .is_some_and(|file| !file_type.accepts(&file.name));
        Ok(if incompatible { slot.file.take() } else { None })
    }

    /// Attaches `file` when its extension matches the declared type (any file when the type is
    /// unset). Returns the file it replaced.
    pub fn set_file(
        &mut self,
        index: usize,
        file: FileHandle,
    ) -> Result<Option<FileHandle>, DocumentError> {
        let slot = self.slot_mut(index)?;
        match slot.file_type {
            Some(FileType::Image) if !FileType::Image.accepts(&file.name) => {
                return Err(DocumentError::InvalidImage {
                    file_name: file.name,
                })
            }
            Some(FileType::Pdf) if !FileType::Pdf.accepts(&file.name) => {
                return Err(DocumentError::InvalidPdf {
                    file_name: file.name,
                })
            }
            _ => {}
        }
        Ok(slot.file.replace(file))
    }

    /// Index-aligned messages; an empty string marks a complete slot.
    pub fn validate_all(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| {
                if slot.is_complete() {
                    String::new()
                } else {
                    INCOMPLETE_SLOT_MESSAGE.to_string()
                }
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(DocumentSlot::is_complete)
    }

    /// Name-only references for every slot, or `None` while any slot is incomplete.
    pub fn references(&self) -> Option<Vec<DocumentReference>> {
        self.slots.iter().map(DocumentSlot::reference).collect()
    }

    fn ensure_index(&self, index: usize) -> Result<(), DocumentError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(DocumentError::SlotOutOfRange {
                index,
                len: self.slots.len(),
            })
        }
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut DocumentSlot, DocumentError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(DocumentError::SlotOutOfRange { index, len })
    }
}
