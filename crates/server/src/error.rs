use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::DbErr;
use serde_json::{Value, json};
use services::services::error::ServiceError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Malformed request body: {0}")]
    Json(#[from] JsonRejection),
    #[error("Not found")]
    Path(#[from] PathRejection),
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Service(err) => match err {
                ServiceError::Validation { .. } => (StatusCode::BAD_REQUEST, "ValidationError"),
                ServiceError::Unauthenticated
                | ServiceError::InvalidCredentials
                | ServiceError::Token(_) => (StatusCode::UNAUTHORIZED, "AuthenticationError"),
                ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "AuthorizationError"),
                ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFoundError"),
                ServiceError::Database(DbErr::RecordNotFound(_)) => {
                    (StatusCode::NOT_FOUND, "NotFoundError")
                }
                ServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
                ServiceError::PasswordHash(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
                }
            },
            ApiError::Database(DbErr::RecordNotFound(_)) => {
                (StatusCode::NOT_FOUND, "NotFoundError")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::Json(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            // ids that do not parse cannot name an existing resource
            ApiError::Path(PathRejection::FailedToDeserializePathParams(_)) => {
                (StatusCode::NOT_FOUND, "NotFoundError")
            }
            ApiError::Path(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "AuthenticationError"),
        }
    }

    fn error_data(&self) -> Option<Value> {
        match self {
            ApiError::Service(ServiceError::Validation { field, message }) => {
                Some(json!({ *field: [message] }))
            }
            ApiError::Service(ServiceError::Forbidden(reason)) => {
                Some(json!({ "reason": reason }))
            }
            ApiError::Json(rejection) => {
                Some(json!({ "non_field_errors": [rejection.body_text()] }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_type();

        let error_message = if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let response = match self.error_data() {
            Some(data) => ApiResponse::<(), Value>::error_with_message_and_data(&error_message, data),
            None => ApiResponse::<(), Value>::error(&error_message),
        };
        (status_code, Json(response)).into_response()
    }
}
