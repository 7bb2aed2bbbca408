//! # MongoDB
//!
//! Document store for application records.
//!
//! One collection, flat documents, no indexes beyond the default `_id`.
//! The dataset is small (one document per submitted application) and the
//! only query shapes are by `_id`, by `email`, and by the `_id` + `email`
//! pair used for owner-checked deletes, so everything rides on collection
//! scans and the primary key.

use chrono::Local;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Client, Collection,
};
use tracing::info;

use crate::{
    application::{ApplicationRecord, ValidApplication, STATUS_PROCESSING},
    error::AppError,
};

const APPLICATIONS_COLLECTION: &str = "applications";

pub async fn init_mongo(
    db_uri: &str,
    db_name: &str,
) -> Result<Collection<ApplicationRecord>, mongodb::error::Error> {
    let client = Client::with_uri_str(db_uri).await?;

    client
        .database(db_name)
        .run_command(doc! { "ping": 1 })
        .await?;
    info!("Connected to database {db_name}");

    Ok(client.database(db_name).collection(APPLICATIONS_COLLECTION))
}

pub async fn insert_application(
    applications: &Collection<ApplicationRecord>,
    valid: &ValidApplication,
) -> Result<ApplicationRecord, AppError> {
    let document = doc! {
        "fullName": &valid.full_name,
        "email": &valid.email,
        "dob": &valid.dob,
        "niNumber": &valid.ni_number,
        "yearsOfService": valid.years_of_service,
        "currentSalary": valid.current_salary,
        "annuityType": &valid.annuity_type,
        "survivorBenefit": &valid.survivor_benefit,
        "healthcare": &valid.healthcare,
        "retirementDate": &valid.retirement_date,
        "termsAgreed": valid.terms_agreed,
        "submissionDate": today_formatted(),
        "status": STATUS_PROCESSING,
    };

    let inserted = applications
        .clone_with_type::<Document>()
        .insert_one(document)
        .await?;

    // Read back the stored document so the response carries the canonical
    // record, id included.
    applications
        .find_one(doc! { "_id": inserted.inserted_id })
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn applications_by_email(
    applications: &Collection<ApplicationRecord>,
    email: &str,
) -> Result<Vec<ApplicationRecord>, AppError> {
    let mut cursor = applications.find(email_filter(email)).await?;
    let mut records = Vec::new();

    while let Some(record) = cursor.try_next().await? {
        records.push(record);
    }

    Ok(records)
}

pub async fn application_by_id(
    applications: &Collection<ApplicationRecord>,
    id: ObjectId,
) -> Result<Option<ApplicationRecord>, AppError> {
    Ok(applications.find_one(doc! { "_id": id }).await?)
}

/// Deletes only when both the id and the owning email match. A mismatched
/// email deletes nothing, which the caller surfaces as not-found.
pub async fn delete_application(
    applications: &Collection<ApplicationRecord>,
    id: ObjectId,
    email: &str,
) -> Result<u64, AppError> {
    let result = applications.delete_one(owner_filter(id, email)).await?;

    Ok(result.deleted_count)
}

/// Strict string equality on the owning email, nothing fuzzier.
fn email_filter(email: &str) -> Document {
    doc! { "email": email }
}

fn owner_filter(id: ObjectId, email: &str) -> Document {
    doc! { "_id": id, "email": email }
}

pub fn today_formatted() -> String {
    let today = Local::now().date_naive();
    today.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use mongodb::bson::Bson;

    use super::*;

    #[test]
    fn list_filter_is_email_equality() {
        let filter = email_filter("ada@example.com");

        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter.get("email"),
            Some(&Bson::String("ada@example.com".into()))
        );
    }

    #[test]
    fn delete_filter_requires_both_id_and_email() {
        let id = ObjectId::new();
        let filter = owner_filter(id, "ada@example.com");

        assert_eq!(filter.len(), 2);
        assert_eq!(filter.get("_id"), Some(&Bson::ObjectId(id)));
        assert_eq!(
            filter.get("email"),
            Some(&Bson::String("ada@example.com".into()))
        );
    }

    #[test]
    fn submission_date_is_iso_day() {
        let today = today_formatted();
        let parts: Vec<&str> = today.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 2);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())));
    }
}
