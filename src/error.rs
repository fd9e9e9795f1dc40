use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Value};

/// Request-level failure taxonomy. Validation failures carry the submitted
/// form values so the caller can redisplay them; storage and unknown
/// failures surface as a generic envelope without internal detail.
#[derive(Debug)]
pub enum ApiError {
    Validation { message: String, form: Option<Value> },
    NotFound,
    Storage(String),
    Unknown(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            form: None,
        }
    }

    pub fn validation<F: Serialize>(message: impl Into<String>, form: &F) -> Self {
        ApiError::Validation {
            message: message.into(),
            form: serde_json::to_value(form).ok(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation { message, .. } => write!(f, "{}", message),
            ApiError::NotFound => write!(f, "Product not found"),
            ApiError::Storage(detail) => write!(f, "storage failure: {}", detail),
            ApiError::Unknown(detail) => write!(f, "unknown failure: {}", detail),
        }
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation { message, form } => {
                let mut body = json!({ "success": false, "message": message });
                if let Some(form) = form {
                    body["formData"] = form.clone();
                }
                HttpResponse::BadRequest().json(body)
            }
            ApiError::NotFound => HttpResponse::NotFound()
                .json(json!({ "success": false, "message": "Product not found" })),
            ApiError::Storage(detail) | ApiError::Unknown(detail) => {
                log::error!("request failed: {}", detail);
                HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "message": "Server Error" }))
            }
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ApiError::NotFound,
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}
