use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::application::FieldError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Application not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Assistant request failed: {0}")]
    Assistant(#[from] reqwest::Error),

    #[error("Assistant API error: {0}")]
    AssistantApi(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })),
            )
                .into_response(),

            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),

            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "message": "Application not found" })),
            )
                .into_response(),

            other => {
                error!("{other}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
