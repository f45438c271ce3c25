//! Mapping of expense errors onto HTTP responses.
//!
//! Every error body has the shape `{"error": CODE, "message": text}`.
//! Server-side failures are logged with their cause and answered with a
//! generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use expensa_core::expense::ExpenseError;

/// Builds an error response body.
pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}

/// An expense error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub ExpenseError);

impl From<ExpenseError> for ApiError {
    fn from(err: ExpenseError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ExpenseError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ExpenseError::validation("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ExpenseError::validation("id", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            let cause = std::error::Error::source(&err).map(ToString::to_string);
            error!(error = %err, cause = ?cause, code = err.error_code(), "Request failed");
            return error_response(status, err.error_code(), "An internal error occurred");
        }

        error_response(status, err.error_code(), &err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expensa_core::expense::{Operation, StoreError};
    use expensa_shared::types::ExpenseId;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let response = ApiError(ExpenseError::NotFound(ExpenseId::new())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "EXPENSE_NOT_FOUND");
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_server_errors_hide_cause() {
        let response = ApiError(ExpenseError::OperationFailed {
            operation: Operation::Submit,
            source: StoreError::Backend("password authentication failed".to_string()),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "OPERATION_FAILED");
        assert!(!body["message"].as_str().unwrap().contains("password"));
    }
}
