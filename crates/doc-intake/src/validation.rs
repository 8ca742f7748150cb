//! Field rules shared by the wizard steps and the account forms.
//!
//! Each rule is a pure function returning `Ok(())` or the message to show next to the field.
//! [`ValidationErrors`] keeps the first failing message per field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::intake::domain::{AddressDetails, PersonalDetails};

pub type RuleResult = Result<(), String>;

pub const NAME_MAX_LENGTH: usize = 50;
pub const MINIMUM_AGE_YEARS: u32 = 18;

pub fn required(value: &str, message: &str) -> RuleResult {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn max_length(value: &str, max: usize, message: &str) -> RuleResult {
    if value.chars().count() > max {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn min_length(value: &str, min: usize, message: &str) -> RuleResult {
    if value.chars().count() < min {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern compiles")
    })
}

/// Accepts `local@domain.tld` shaped values.
pub fn email(value: &str, message: &str) -> RuleResult {
    if email_pattern().is_match(value) {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Fails when the person is strictly younger than `years` on `today`.
pub fn minimum_age(
    date_of_birth: NaiveDate,
    today: NaiveDate,
    years: u32,
    message: &str,
) -> RuleResult {
    let latest_allowed = today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN);
    if date_of_birth > latest_allowed {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn min_age_18(date_of_birth: NaiveDate, today: NaiveDate, message: &str) -> RuleResult {
    minimum_age(date_of_birth, today, MINIMUM_AGE_YEARS, message)
}

pub fn password_match(password: &str, confirm: &str, message: &str) -> RuleResult {
    if password == confirm {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Field name to message, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first failing rule for `field`. Later checks of the same field are ignored
    /// once it has a message.
    pub fn check<I>(&mut self, field: &str, rules: I)
    where
        I: IntoIterator<Item = RuleResult>,
    {
        if self.fields.contains_key(field) {
            return;
        }
        if let Some(message) = rules.into_iter().find_map(Result::err) {
            self.fields.insert(field.to_string(), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (index, (field, message)) in self.fields().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_personal(
    personal: &PersonalDetails,
    today: NaiveDate,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    errors.check(
        "firstName",
        [
            required(&personal.first_name, "First name is required"),
            max_length(
                &personal.first_name,
                NAME_MAX_LENGTH,
                "First name must be less than 50 characters",
            ),
        ],
    );
    errors.check(
        "lastName",
        [
            required(&personal.last_name, "Last name is required"),
            max_length(
                &personal.last_name,
                NAME_MAX_LENGTH,
                "Last name must be less than 50 characters",
            ),
        ],
    );
    errors.check(
        "email",
        [
            required(&personal.email, "Email is required"),
            email(&personal.email, "Please enter a valid email"),
        ],
    );
    match personal.date_of_birth {
        Some(date_of_birth) => errors.check(
            "dateOfBirth",
            [min_age_18(
                date_of_birth,
                today,
                "Minimum age should be 18 years",
            )],
        ),
        None => errors.check(
            "dateOfBirth",
            [Err("Date of birth is required".to_string())],
        ),
    }

    errors.into_result()
}

pub fn validate_address(address: &AddressDetails) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    errors.check(
        "residentialStreet1",
        [required(&address.residential_street1, "Street 1 is required")],
    );
    errors.check(
        "residentialStreet2",
        [required(&address.residential_street2, "Street 2 is required")],
    );

    if !address.same_as_residential {
        errors.check(
            "permanentStreet1",
            [required(&address.permanent_street1, "Street 1 is required")],
        );
        errors.check(
            "permanentStreet2",
            [required(&address.permanent_street2, "Street 2 is required")],
        );
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn required_rejects_whitespace() {
        assert!(required("   ", "needed").is_err());
        assert!(required(" x ", "needed").is_ok());
    }

    #[test]
    fn length_rules_count_characters() {
        let fifty = "é".repeat(50);
        assert!(max_length(&fifty, 50, "too long").is_ok());
        assert_eq!(
            max_length(&format!("{fifty}a"), 50, "too long"),
            Err("too long".to_string())
        );
        assert!(min_length("abcde", 6, "too short").is_err());
        assert!(min_length("abcdef", 6, "too short").is_ok());
    }

    #[test]
    fn email_requires_domain_and_tld() {
        for valid in ["a@b.co", "first.last@mail.example.org", "x+tag@sub.domain.io"] {
            assert!(email(valid, "bad").is_ok(), "{valid} should pass");
        }
        for invalid in ["", "plain", "a@b", "@b.co", "a@.co", "a@b.", "a b@c.de", "a@b@c.de"] {
            assert!(email(invalid, "bad").is_err(), "{invalid} should fail");
        }
    }

    #[test]
    fn exactly_eighteen_passes_and_one_day_short_fails() {
        let today = date(2025, 6, 15);
        assert!(min_age_18(date(2007, 6, 15), today, "too young").is_ok());
        assert!(min_age_18(date(2007, 6, 16), today, "too young").is_err());
        assert!(min_age_18(date(1980, 1, 1), today, "too young").is_ok());
    }

    #[test]
    fn leap_day_birthdays_clamp_to_month_end() {
        let today = date(2026, 2, 28);
        assert!(min_age_18(date(2008, 2, 28), today, "too young").is_ok());
        assert!(min_age_18(date(2008, 2, 29), today, "too young").is_err());
    }

    #[test]
    fn password_match_compares_exactly() {
        assert!(password_match("secret1", "secret1", "mismatch").is_ok());
        assert!(password_match("secret1", "Secret1", "mismatch").is_err());
    }

    #[test]
    fn first_failing_rule_wins() {
        let mut errors = ValidationErrors::new();
        errors.check(
            "email",
            [required("", "Email is required"), email("", "Please enter a valid email")],
        );
        errors.check("email", [Err("ignored".to_string())]);
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.to_string(), "validation failed: email: Email is required");
    }

    #[test]
    fn personal_step_reports_every_missing_field() {
        let errors = validate_personal(&PersonalDetails::default(), date(2025, 1, 1))
            .expect_err("blank details fail");
        assert_eq!(errors.get("firstName"), Some("First name is required"));
        assert_eq!(errors.get("lastName"), Some("Last name is required"));
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("dateOfBirth"), Some("Date of birth is required"));
    }

    #[test]
    fn permanent_lines_skip_validation_when_mirrored() {
        let mut address = AddressDetails {
            residential_street1: "12 Harbour Road".to_string(),
            residential_street2: "Unit 4".to_string(),
            ..AddressDetails::default()
        };

        let errors = validate_address(&address).expect_err("permanent lines required");
        assert_eq!(errors.get("permanentStreet1"), Some("Street 1 is required"));
        assert!(errors.get("residentialStreet1").is_none());

        address.same_as_residential = true;
        assert!(validate_address(&address).is_ok());
    }
}
