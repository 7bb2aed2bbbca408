//! # Pension Applications
//!
//! The one persisted record of the platform.
//!
//! An application is submitted once, never edited, and informally owned by
//! the email address it was submitted with. Reads and deletes filter on
//! that email string.
//!
//! Validation mirrors the submission form: every rule failure produces one
//! `{ field, message }` entry and all failures are collected before the
//! payload is rejected, so the frontend can annotate the whole form in a
//! single round trip. The numeric fields arrive as JSON numbers or numeric
//! strings depending on the input widget, so both are accepted.

use mongodb::bson::{oid::ObjectId, serde_helpers::serialize_object_id_as_hex_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_PROCESSING: &str = "Processing";

/// Stored shape of an application. `_id` serializes back out as the plain
/// hex string the frontend keys its report list on.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(rename = "_id", serialize_with = "serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    pub dob: String,
    pub ni_number: String,
    pub years_of_service: f64,
    pub current_salary: f64,
    pub annuity_type: String,
    pub survivor_benefit: String,
    pub healthcare: String,
    pub retirement_date: String,
    pub terms_agreed: bool,
    pub submission_date: String,
    pub status: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Raw submission body. Every field defaults so that a missing field turns
/// into a validation entry instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationPayload {
    pub full_name: String,
    pub email: String,
    pub dob: String,
    pub ni_number: String,
    pub years_of_service: Value,
    pub current_salary: Value,
    pub annuity_type: String,
    pub survivor_benefit: String,
    pub healthcare: String,
    pub retirement_date: String,
    pub terms_agreed: Value,
}

/// A payload that passed every rule, with the numeric fields coerced.
#[derive(Debug)]
pub struct ValidApplication {
    pub full_name: String,
    pub email: String,
    pub dob: String,
    pub ni_number: String,
    pub years_of_service: f64,
    pub current_salary: f64,
    pub annuity_type: String,
    pub survivor_benefit: String,
    pub healthcare: String,
    pub retirement_date: String,
    pub terms_agreed: bool,
}

impl ApplicationPayload {
    pub fn validate(self) -> Result<ValidApplication, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("fullName", "Full name is required"));
        }

        if !is_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }

        if self.dob.trim().is_empty() {
            errors.push(FieldError::new("dob", "Date of birth is required"));
        }

        if self.ni_number.trim().is_empty() {
            errors.push(FieldError::new(
                "niNumber",
                "National Insurance Number is required",
            ));
        }

        let years_of_service = match coerce_number(&self.years_of_service) {
            Some(value) if value >= 0.0 => Some(value),
            Some(_) => {
                errors.push(FieldError::new(
                    "yearsOfService",
                    "Years of service cannot be negative",
                ));
                None
            }
            None => {
                errors.push(FieldError::new(
                    "yearsOfService",
                    "Years of service must be a number",
                ));
                None
            }
        };

        let current_salary = match coerce_number(&self.current_salary) {
            Some(value) if value >= 0.0 => Some(value),
            Some(_) => {
                errors.push(FieldError::new(
                    "currentSalary",
                    "Current salary cannot be negative",
                ));
                None
            }
            None => {
                errors.push(FieldError::new(
                    "currentSalary",
                    "Current salary must be a number",
                ));
                None
            }
        };

        if self.annuity_type.trim().is_empty() {
            errors.push(FieldError::new("annuityType", "Annuity type is required"));
        }

        if self.survivor_benefit.trim().is_empty() {
            errors.push(FieldError::new(
                "survivorBenefit",
                "Survivor benefit is required",
            ));
        }

        if self.healthcare.trim().is_empty() {
            errors.push(FieldError::new(
                "healthcare",
                "Healthcare option is required",
            ));
        }

        if self.retirement_date.trim().is_empty() {
            errors.push(FieldError::new(
                "retirementDate",
                "Retirement date is required",
            ));
        }

        // Anything that is not the boolean `true` fails the rule, so a
        // stringly-typed "true" from the form is a field error, not a
        // payload rejection.
        if !matches!(self.terms_agreed, Value::Bool(true)) {
            errors.push(FieldError::new(
                "termsAgreed",
                "You must agree to the terms",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidApplication {
            full_name: self.full_name,
            email: self.email,
            dob: self.dob,
            ni_number: self.ni_number,
            years_of_service: years_of_service.unwrap_or_default(),
            current_salary: current_salary.unwrap_or_default(),
            annuity_type: self.annuity_type,
            survivor_benefit: self.survivor_benefit,
            healthcare: self.healthcare,
            retirement_date: self.retirement_date,
            terms_agreed: true,
        })
    }
}

/// Accepts a JSON number or a numeric string, the two shapes the form sends.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_email(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !input.contains(char::is_whitespace)
        && !domain.contains('@')
}

#[cfg(test)]
mod tests {
    use serde_json::{from_value, json};

    use super::*;

    fn payload() -> Value {
        json!({
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "dob": "1960-12-10",
            "niNumber": "QQ123456C",
            "yearsOfService": 32,
            "currentSalary": 48500.0,
            "annuityType": "Fixed",
            "survivorBenefit": "50%",
            "healthcare": "Standard",
            "retirementDate": "2026-01-01",
            "termsAgreed": true
        })
    }

    fn validate(value: Value) -> Result<ValidApplication, Vec<FieldError>> {
        from_value::<ApplicationPayload>(value).unwrap().validate()
    }

    #[test]
    fn accepts_well_formed_payload() {
        let valid = validate(payload()).unwrap();

        assert_eq!(valid.full_name, "Ada Lovelace");
        assert_eq!(valid.years_of_service, 32.0);
        assert_eq!(valid.current_salary, 48500.0);
    }

    #[test]
    fn coerces_numeric_strings() {
        let mut body = payload();
        body["yearsOfService"] = json!("32");
        body["currentSalary"] = json!(" 48500.50 ");

        let valid = validate(body).unwrap();

        assert_eq!(valid.years_of_service, 32.0);
        assert_eq!(valid.current_salary, 48500.5);
    }

    #[test]
    fn one_error_entry_per_invalid_field() {
        let body = json!({ "email": "not-an-email", "termsAgreed": false });

        let errors = validate(body).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();

        assert_eq!(
            fields,
            vec![
                "fullName",
                "email",
                "dob",
                "niNumber",
                "yearsOfService",
                "currentSalary",
                "annuityType",
                "survivorBenefit",
                "healthcare",
                "retirementDate",
                "termsAgreed",
            ]
        );
    }

    #[test]
    fn rejects_negative_numbers() {
        let mut body = payload();
        body["yearsOfService"] = json!(-1);
        body["currentSalary"] = json!(-0.01);

        let errors = validate(body).unwrap_err();

        assert!(errors.contains(&FieldError {
            field: "yearsOfService",
            message: "Years of service cannot be negative",
        }));
        assert!(errors.contains(&FieldError {
            field: "currentSalary",
            message: "Current salary cannot be negative",
        }));
    }

    #[test]
    fn rejects_unagreed_terms() {
        let mut body = payload();
        body["termsAgreed"] = json!(false);

        let errors = validate(body).unwrap_err();

        assert_eq!(
            errors,
            vec![FieldError {
                field: "termsAgreed",
                message: "You must agree to the terms",
            }]
        );
    }

    #[test]
    fn non_boolean_terms_is_a_field_error() {
        for not_true in [json!("true"), json!(1), json!(null)] {
            let mut body = payload();
            body["termsAgreed"] = not_true;

            let errors = validate(body).unwrap_err();

            assert_eq!(
                errors,
                vec![FieldError {
                    field: "termsAgreed",
                    message: "You must agree to the terms",
                }]
            );
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["", "plain", "@example.com", "ada@", "a b@example.com"] {
            let mut body = payload();
            body["email"] = json!(bad);

            let errors = validate(body).unwrap_err();
            assert_eq!(errors[0].field, "email", "expected rejection of {bad:?}");
        }
    }

    #[test]
    fn record_id_serializes_as_hex_string() {
        let id = ObjectId::new();
        let record = ApplicationRecord {
            id,
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            dob: "1960-12-10".into(),
            ni_number: "QQ123456C".into(),
            years_of_service: 32.0,
            current_salary: 48500.0,
            annuity_type: "Fixed".into(),
            survivor_benefit: "50%".into(),
            healthcare: "Standard".into(),
            retirement_date: "2026-01-01".into(),
            terms_agreed: true,
            submission_date: "2026-08-30".into(),
            status: STATUS_PROCESSING.into(),
        };

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["fullName"], json!("Ada Lovelace"));
        assert_eq!(value["niNumber"], json!("QQ123456C"));
    }
}
