use crate::infra::{open_store, SubmissionStore};
use clap::Args;
use doc_intake::config::AppConfig;
use doc_intake::error::AppError;
use doc_intake::intake::{FormSubmission, IntakeService, SubmissionId, SubmissionQuery};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    /// Case-insensitive filter on first name, last name, or email
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Emit CSV instead of a table
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DeleteArgs {
    /// Submission id as shown by `submissions list`
    pub(crate) id: String,
}

fn intake_service() -> Result<IntakeService<SubmissionStore>, AppError> {
    let config = AppConfig::load()?;
    let store = open_store(&config.storage)?;
    Ok(IntakeService::new(Arc::new(SubmissionStore::new(store))))
}

/// Every matching submission, across all pages.
fn matching_submissions(
    service: &IntakeService<SubmissionStore>,
    search: Option<String>,
) -> Result<Vec<FormSubmission>, AppError> {
    let mut query = SubmissionQuery {
        search,
        page: Some(1),
        page_size: Some(doc_intake::intake::service::MAX_PAGE_SIZE),
    };
    let mut collected = Vec::new();
    loop {
        let page = service.list_submissions(&query)?;
        let fetched = page.items.len();
        collected.extend(page.items);
        if fetched == 0 || collected.len() >= page.matched {
            break;
        }
        query.page = Some(page.page + 1);
    }
    Ok(collected)
}

pub(crate) fn run_list(args: ListArgs) -> Result<(), AppError> {
    let service = intake_service()?;
    let submissions = matching_submissions(&service, args.search)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.csv {
        write_csv(&mut out, &submissions)?;
    } else {
        write_table(&mut out, &submissions)?;
    }
    Ok(())
}

pub(crate) fn run_delete(args: DeleteArgs) -> Result<(), AppError> {
    let service = intake_service()?;
    let removed = service.delete_submission(&SubmissionId(args.id))?;
    println!(
        "Submission deleted successfully: {} ({})",
        removed.id,
        removed.full_name()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionRow<'a> {
    id: &'a str,
    submitted_at: String,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    date_of_birth: String,
    residential_street1: &'a str,
    residential_street2: &'a str,
    permanent_street1: &'a str,
    permanent_street2: &'a str,
    documents: String,
}

impl<'a> From<&'a FormSubmission> for SubmissionRow<'a> {
    fn from(submission: &'a FormSubmission) -> Self {
        let documents = submission
            .documents
            .iter()
            .map(|document| {
                format!(
                    "{} ({}: {})",
                    document.file_name,
                    document.file_type.label(),
                    document.file
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            id: &submission.id.0,
            submitted_at: submission.submitted_at.to_rfc3339(),
            first_name: &submission.first_name,
            last_name: &submission.last_name,
            email: &submission.email,
            date_of_birth: submission.date_of_birth.format("%Y-%m-%d").to_string(),
            residential_street1: &submission.residential_street1,
            residential_street2: &submission.residential_street2,
            permanent_street1: &submission.permanent_street1,
            permanent_street2: &submission.permanent_street2,
            documents,
        }
    }
}

pub(crate) fn write_csv<W: Write>(
    out: W,
    submissions: &[FormSubmission],
) -> Result<(), std::io::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for submission in submissions {
        writer.serialize(SubmissionRow::from(submission))?;
    }
    writer.flush()
}

pub(crate) fn write_table<W: Write>(
    mut out: W,
    submissions: &[FormSubmission],
) -> Result<(), std::io::Error> {
    if submissions.is_empty() {
        return writeln!(out, "No submissions found.");
    }
    writeln!(
        out,
        "{:<15} {:<24} {:<28} {:<11} {:>4}  Submitted",
        "ID", "Name", "Email", "Born", "Docs"
    )?;
    for submission in submissions {
        writeln!(
            out,
            "{:<15} {:<24} {:<28} {:<11} {:>4}  {}",
            submission.id.0,
            submission.full_name(),
            submission.email,
            submission.date_of_birth.to_string(),
            submission.documents.len(),
            submission.submitted_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    writeln!(out, "{} submission(s)", submissions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use doc_intake::intake::{DocumentReference, FileType};

    fn submission() -> FormSubmission {
        FormSubmission {
            id: SubmissionId("1760000000000".to_string()),
            first_name: "Robin".to_string(),
            last_name: "Hart".to_string(),
            email: "robin@example.com".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 9).expect("valid date"),
            residential_street1: "4 Quay Road".to_string(),
            residential_street2: "Harbour".to_string(),
            permanent_street1: "4 Quay Road".to_string(),
            permanent_street2: "Harbour".to_string(),
            documents: vec![DocumentReference {
                file_name: "Licence".to_string(),
                file_type: FileType::Image,
                file: "licence.png".to_string(),
            }],
            submitted_at: Utc
                .with_ymd_and_hms(2025, 10, 9, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn csv_export_has_header_and_one_row_per_submission() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[submission(), submission()]).expect("csv written");
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,submittedAt,firstName"));
        assert!(lines[1].contains("Licence (image: licence.png)"));
    }

    #[test]
    fn table_reports_empty_store() {
        let mut buffer = Vec::new();
        write_table(&mut buffer, &[]).expect("table written");
        assert_eq!(String::from_utf8(buffer).unwrap(), "No submissions found.\n");
    }

    #[test]
    fn table_lists_names() {
        let mut buffer = Vec::new();
        write_table(&mut buffer, &[submission()]).expect("table written");
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Robin Hart"));
        assert!(text.ends_with("1 submission(s)\n"));
    }
}
