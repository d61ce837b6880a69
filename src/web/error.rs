//! Response envelopes: `{"data": ...}` on success, `{"error": "..."}` on
//! failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::Error;

/// Successful payload, serialized as `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Body of delete responses.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Migration(_) | Error::Config(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            Error::Unauthorized(message) | Error::Validation(message) => message.clone(),
            Error::NotFound(_) => self.to_string(),
            _ => {
                log::error!("request failed: {self}");
                "Internal server error".to_string()
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
