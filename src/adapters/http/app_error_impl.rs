use crate::app_error::{AppError, ErrorCode, FieldError};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "Database operation failed",
            ),
            AppError::RateLimited => error_resp(
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimited,
                "Too many requests. Please try again later.",
            ),
            AppError::Unauthorized => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, "Unauthorized")
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, &msg)
            }
            AppError::Validation(errors) => validation_resp(&errors),
            AppError::DuplicateEmail => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::DuplicateEmail,
                "You are already on our waitlist!",
            ),
            AppError::InvalidReferralCode => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidReferralCode,
                "Invalid referral code",
            ),
            AppError::ReferralCodeExhausted => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ReferralCodeExhausted,
                "Could not allocate a referral code. Please try again.",
            ),
            AppError::NotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not found")
            }
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Internal server error",
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: &str) -> Response {
    let body = serde_json::json!({
        "success": false,
        "code": code.as_str(),
        "message": message,
    });
    (status, Json(body)).into_response()
}

fn validation_resp(errors: &[FieldError]) -> Response {
    let body = serde_json::json!({
        "success": false,
        "code": ErrorCode::ValidationFailed.as_str(),
        "errors": errors,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
