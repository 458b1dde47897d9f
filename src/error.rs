use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the group was modified by someone else (current version {current_version})")]
    Conflict { current_version: i64 },
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl ApiError {
    pub fn group_not_found(id: &str) -> Self {
        ApiError::NotFound {
            kind: "group",
            id: id.to_owned(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Database(err) = self {
            tracing::error!(error = %err, "database request failed");
        }
        let body = match self {
            ApiError::Conflict { current_version } => {
                json!({ "error": self.to_string(), "currentVersion": current_version })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code())
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .json(body)
    }
}
