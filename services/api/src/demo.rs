use crate::infra::Services;
use chrono::{Local, NaiveDate};
use clap::Args;
use doc_intake::auth::{AuthError, LoginRequest, SignupRequest};
use doc_intake::config::AuthConfig;
use doc_intake::error::AppError;
use doc_intake::intake::{
    AddressDetails, DocumentSlotUpdate, FileHandle, FileType, PersonalDetails, SubmissionQuery,
    WizardView,
};
use doc_intake::store::{MemoryStore, StoreBackend};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Display name used for the demo account
    #[arg(long, default_value = "Jane Doe")]
    pub(crate) name: String,
    /// Email used for the demo account
    #[arg(long, default_value = "jane.doe@example.com")]
    pub(crate) email: String,
    /// Date of birth entered on the personal step (YYYY-MM-DD)
    #[arg(long, default_value = "1990-04-02", value_parser = parse_date)]
    pub(crate) date_of_birth: NaiveDate,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        name,
        email,
        date_of_birth,
    } = args;

    let store = Arc::new(StoreBackend::Memory(MemoryStore::default()));
    let services = Services::with_store(store, AuthConfig::default());
    let today = Local::now().date_naive();
    let password = "demo-pass";

    println!("Document intake demo");
    let account = services
        .auth
        .signup(&SignupRequest::new(name.clone(), email.clone(), password))?;
    println!("- Signed up {} <{}>", account.name, account.email);

    match services
        .auth
        .signup(&SignupRequest::new(name.clone(), email.clone(), password))
    {
        Err(AuthError::EmailExists) => println!("- Second signup rejected: Email already exists"),
        other => println!("- Unexpected second signup result: {other:?}"),
    }

    let session = services.auth.login(&LoginRequest::new(email.clone(), password))?;
    println!("- Logged in successfully! (session {})", session.id);

    let (first_name, last_name) = name
        .split_once(' ')
        .map(|(first, last)| (first.to_string(), last.to_string()))
        .unwrap_or_else(|| (name.clone(), name.clone()));

    let intake = &services.intake;
    print_view(&intake.view(&session.id)?);

    intake.update_personal(
        &session.id,
        PersonalDetails {
            first_name,
            last_name,
            email: email.clone(),
            date_of_birth: Some(date_of_birth),
        },
    )?;
    let view = intake.advance(&session.id, today)?;
    print_view(&view);

    intake.update_address(
        &session.id,
        AddressDetails {
            residential_street1: "221B Baker Street".to_string(),
            residential_street2: "Marylebone".to_string(),
            same_as_residential: true,
            ..AddressDetails::default()
        },
    )?;
    let view = intake.advance(&session.id, today)?;
    print_view(&view);

    let documents = [
        ("Passport", FileType::Image, "passport.png"),
        ("Bank statement", FileType::Pdf, "statement.pdf"),
    ];
    for (index, (file_name, file_type, file)) in documents.into_iter().enumerate() {
        intake.update_document(
            &session.id,
            index,
            DocumentSlotUpdate {
                file_name: Some(file_name.to_string()),
                file_type: Some(file_type),
            },
        )?;
        intake.attach_file(&session.id, index, FileHandle::new(file))?;
    }
    if let Err(err) = intake.attach_file(&session.id, 1, FileHandle::new("notes.txt")) {
        println!("- Rejected notes.txt for slot 2: {err}");
    }

    let submission = intake.submit(&session.id, today)?;
    println!(
        "- Form submitted successfully! id={} documents={}",
        submission.id,
        submission.documents.len()
    );
    print_view(&intake.view(&session.id)?);

    services.auth.logout()?;
    let admin = services
        .auth
        .login(&LoginRequest::new("admin@admin.com", "admin123"))?;
    println!("- Welcome Admin! (admin={})", admin.is_admin());

    let page = intake.list_submissions(&SubmissionQuery::default())?;
    println!(
        "\nAdmin view: {} submission(s), page {} of size {}",
        page.total, page.page, page.page_size
    );
    for item in &page.items {
        println!(
            "  {} | {} | {} | {} -> {}",
            item.id,
            item.full_name(),
            item.email,
            item.residential_street1,
            item.permanent_street1
        );
        for document in &item.documents {
            println!(
                "      {} [{}] {}",
                document.file_name,
                document.file_type.label(),
                document.file
            );
        }
    }

    let removed = intake.delete_submission(&submission.id)?;
    let remaining = intake.list_submissions(&SubmissionQuery::default())?;
    println!(
        "- Submission deleted successfully ({}); {} remaining",
        removed.id, remaining.total
    );

    Ok(())
}

fn print_view(view: &WizardView) {
    let stepper = view
        .steps
        .iter()
        .map(|step| format!("{}:{:?}", step.title, step.status))
        .collect::<Vec<_>>()
        .join(" > ");
    println!(
        "  step {} of {} [{}] slots={}",
        view.step_index + 1,
        view.steps.len(),
        stepper,
        view.documents.len()
    );
}
