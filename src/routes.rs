use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::{
    application::{ApplicationPayload, ApplicationRecord},
    database::{
        application_by_id, applications_by_email, delete_application, insert_application,
    },
    error::AppError,
    pdf::render_report,
    state::AppState,
};

const SUMMARY_FALLBACK: &str = "Summary unavailable.";

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    file_content: String,
}

#[derive(Deserialize)]
pub struct AppendRequest {
    file_id: String,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    email: Option<String>,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    if request.message.is_empty() && request.file_content.is_empty() {
        return Err(AppError::BadRequest(
            "Missing 'message' or 'file_content' in request body",
        ));
    }

    let prompt = build_prompt(&request.message, &request.file_content);
    let reply = state.assistant.query(&prompt).await?;

    Ok(Json(json!({
        "response": { "value": reply, "annotations": [] }
    })))
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Malformed multipart payload"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::BadRequest("Malformed multipart payload"))?;

        let file = state.assistant.upload_file(filename, bytes.to_vec()).await?;
        return Ok(Json(json!({ "success": true, "file": file })));
    }

    Err(AppError::BadRequest("Missing 'file' field"))
}

pub async fn files_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let files = state.assistant.list_files().await?;

    Ok(Json(json!({ "files": files.data })))
}

pub async fn delete_file_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted = state.assistant.delete_file(&id).await?;

    Ok(Json(json!({ "success": deleted.deleted, "id": deleted.id })))
}

pub async fn append_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AppendRequest>,
) -> Result<Json<Value>, AppError> {
    let attached = state.assistant.attach_file(&request.file_id).await?;

    Ok(Json(json!({ "success": true, "attached": attached })))
}

pub async fn post_application_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let valid = payload.validate().map_err(AppError::Validation)?;
    let record = insert_application(&state.applications, &valid).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Application submitted successfully",
            "data": record,
        })),
    ))
}

pub async fn get_applications_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Value>, AppError> {
    let email = query
        .email
        .ok_or(AppError::BadRequest("Missing 'email' query parameter"))?;

    let records = applications_by_email(&state.applications, &email).await?;

    Ok(Json(json!(records)))
}

pub async fn delete_application_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Value>, AppError> {
    let email = query
        .email
        .ok_or(AppError::BadRequest("Missing 'email' query parameter"))?;

    let id = parse_object_id(&id)?;

    let deleted = delete_application(&state.applications, id, &email).await?;
    deletion_outcome(deleted)?;

    Ok(Json(json!({
        "success": true,
        "message": "Application deleted successfully",
    })))
}

pub async fn application_pdf_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_object_id(&id)?;

    let record = application_by_id(&state.applications, id)
        .await?
        .ok_or(AppError::NotFound)?;

    // A failed summary never fails the download.
    let summary = match state.assistant.query(&summary_prompt(&record)).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Summary generation failed, using placeholder: {e}");
            SUMMARY_FALLBACK.to_string()
        }
    };

    let bytes = render_report(&record, &summary)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"pension_application_{}.pdf\"",
                    id.to_hex()
                ),
            ),
        ],
        bytes,
    ))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn build_prompt(message: &str, file_content: &str) -> String {
    if file_content.is_empty() {
        return message.to_string();
    }

    format!("{message}\n\nFile content to analyze:\n```\n{file_content}\n```")
}

fn summary_prompt(record: &ApplicationRecord) -> String {
    format!(
        "Write a short plain-text summary of this pension application for the applicant.\n\
         Full name: {}\n\
         Years of service: {}\n\
         Current salary: {}\n\
         Annuity type: {}\n\
         Survivor benefit: {}\n\
         Healthcare: {}\n\
         Retirement date: {}",
        record.full_name,
        record.years_of_service,
        record.current_salary,
        record.annuity_type,
        record.survivor_benefit,
        record.healthcare,
        record.retirement_date,
    )
}

/// Ids come straight off the URL; anything that is not a well-formed
/// ObjectId cannot name a record, so it reads as not-found.
fn parse_object_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound)
}

/// Zero deletions means the id/email pair matched no record, whether the
/// id is unknown or the email belongs to someone else.
fn deletion_outcome(deleted_count: u64) -> Result<(), AppError> {
    if deleted_count == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_file_is_the_message() {
        assert_eq!(build_prompt("hello", ""), "hello");
    }

    #[test]
    fn prompt_fences_file_content() {
        let prompt = build_prompt("check this", "key: value");

        assert_eq!(
            prompt,
            "check this\n\nFile content to analyze:\n```\nkey: value\n```"
        );
    }

    #[test]
    fn unmatched_delete_reads_as_not_found() {
        assert!(matches!(deletion_outcome(0), Err(AppError::NotFound)));
        assert!(deletion_outcome(1).is_ok());
    }

    #[test]
    fn malformed_id_reads_as_not_found() {
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(AppError::NotFound)
        ));
        assert!(parse_object_id("65f1a2b3c4d5e6f7a8b9c0d1").is_ok());
    }
}
