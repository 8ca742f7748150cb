use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier wrapper for stored submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First step of the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub date_of_birth: Option<NaiveDate>,
}

/// Second step of the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressDetails {
    pub residential_street1: String,
    pub residential_street2: String,
    pub permanent_street1: String,
    pub permanent_street2: String,
    pub same_as_residential: bool,
}

impl AddressDetails {
    /// Permanent address as it will be submitted. Mirrors the residential lines when the
    /// flag is set, whatever the stored permanent values are.
    pub fn resolved_permanent(&self) -> (&str, &str) {
        if self.same_as_residential {
            (&self.residential_street1, &self.residential_street2)
        } else {
            (&self.permanent_street1, &self.permanent_street2)
        }
    }

    pub(crate) fn mirror_residential(&mut self) {
        self.permanent_street1 = self.residential_street1.clone();
        self.permanent_street2 = self.residential_street2.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

impl FileType {
    pub const fn label(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Pdf => "pdf",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            FileType::Image => &IMAGE_EXTENSIONS,
            FileType::Pdf => &["pdf"],
        }
    }

    pub fn accepts(self, file_name: &str) -> bool {
        let extension = file_extension(file_name);
        self.allowed_extensions().contains(&extension.as_str())
    }
}

/// Lower-cased text after the final dot. A name without a dot yields the whole name.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Picked file. Only the name is ever kept; contents are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub name: String,
}

impl FileHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One entry of the upload step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSlot {
    pub file_name: String,
    pub file_type: Option<FileType>,
    pub file: Option<FileHandle>,
}

impl DocumentSlot {
    pub fn is_complete(&self) -> bool {
        !self.file_name.trim().is_empty() && self.file_type.is_some() && self.file.is_some()
    }

    pub(crate) fn reference(&self) -> Option<DocumentReference> {
        if !self.is_complete() {
            return None;
        }
        Some(DocumentReference {
            file_name: self.file_name.clone(),
            file_type: self.file_type?,
            file: self.file.as_ref()?.name.clone(),
        })
    }
}

/// Stored form of a document: declared name, type, and the picked file's name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub file_name: String,
    pub file_type: FileType,
    #[serde(alias = "fileNameOnly")]
    pub file: String,
}

/// Immutable record appended to the submission collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: SubmissionId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub residential_street1: String,
    pub residential_street2: String,
    pub permanent_street1: String,
    pub permanent_street2: String,
    pub documents: Vec<DocumentReference>,
    pub submitted_at: DateTime<Utc>,
}

impl FormSubmission {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive match against first name, last name, or email.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.first_name, &self.last_name, &self.email]
            .iter()
            .any(|value| value.to_lowercase().contains(&needle))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Blank strings and nulls both mean "not picked yet".
pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
