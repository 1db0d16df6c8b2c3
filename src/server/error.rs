//! JSON failure responses

use crate::error::SplicerError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

/// Body of every failure response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    pub message: String,
    /// Error category, absent for routing failures
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

impl From<&SplicerError> for ErrorBody {
    fn from(err: &SplicerError) -> Self {
        Self {
            message: err.to_string(),
            error: Some(err.category().to_string()),
        }
    }
}

impl ResponseError for SplicerError {
    fn status_code(&self) -> StatusCode {
        match self {
            SplicerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::from(self))
    }
}
