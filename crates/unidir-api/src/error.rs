// Unidir
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the admin API
//!
//! Every failure is surfaced to the caller as `{"error": "<message>"}` with the
//! status code of its category.

use crate::store::StoreError;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// API error types following REST conventions
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Hyper error: {0}")]
    HyperError(#[from] hyper::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalServerError { message: message.into() }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::JwtError(_) => StatusCode::UNAUTHORIZED,
            ApiError::SerdeJsonError(_) => StatusCode::BAD_REQUEST,
            ApiError::HyperError(_) | ApiError::IoError(_) | ApiError::HttpError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::InternalServerError { .. } => "internal_server_error",
            ApiError::JwtError(_) => "jwt_error",
            ApiError::SerdeJsonError(_) => "json_error",
            ApiError::HyperError(_) => "http_error",
            ApiError::IoError(_) => "io_error",
            ApiError::HttpError(_) => "http_error",
        }
    }

    /// Caller-facing message, without the category prefix of `Display`
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::InternalServerError { message } => message.clone(),
            ApiError::JwtError(_) => "Unauthorized".to_string(),
            ApiError::SerdeJsonError(e) => format!("Invalid request body: {}", e),
            ApiError::HyperError(_) | ApiError::IoError(_) | ApiError::HttpError(_) => "An internal error occurred".to_string(),
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Convert ApiError to HTTP response
impl From<ApiError> for Response<Full<Bytes>> {
    fn from(error: ApiError) -> Self {
        let status_code = error.status_code();

        if status_code.is_server_error() {
            error!("API Error: {} [{}] - {}", status_code, error.error_type(), error);
        } else {
            warn!("API Error: {} [{}] - {}", status_code, error.error_type(), error);
        }

        let body = ErrorBody { error: error.message() };
        let json = serde_json::to_string(&body).unwrap_or_else(|e| {
            error!("Failed to serialize error response: {}", e);
            r#"{"error":"An internal error occurred"}"#.to_string()
        });

        let mut response = Response::new(Full::new(Bytes::from(json)));
        *response.status_mut() = status_code;
        response.headers_mut().insert(hyper::header::CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
        response.headers_mut().insert(hyper::header::CACHE_CONTROL, hyper::header::HeaderValue::from_static("no-cache"));
        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// From implementations for common errors
impl From<hyper::http::Error> for ApiError {
    fn from(err: hyper::http::Error) -> Self {
        ApiError::HttpError(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailExists { email } => ApiError::BadRequest {
                message: format!("A user with email '{}' is already registered", email),
            },
            StoreError::NotFound { entity, id } => ApiError::NotFound {
                message: format!("{} not found: {}", entity, id),
            },
            StoreError::InvalidData { message } => ApiError::BadRequest { message },
            StoreError::Credential { message } => ApiError::InternalServerError { message },
            StoreError::Backend { message } => ApiError::InternalServerError { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = StoreError::EmailExists { email: "a@b.c".to_string() }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = StoreError::NotFound {
            entity: "Role",
            id: "42".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = StoreError::Backend { message: "boom".to_string() }.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = Response::from(ApiError::forbidden("Out of scope"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().get("content-type").and_then(|v| v.to_str().ok()), Some("application/json"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error, "Out of scope");
    }
}
