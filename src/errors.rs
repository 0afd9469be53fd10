use crate::services::storage_service::StorageError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{fmt, io};

/// Client-facing error: a status plus a short plain-text message.
///
/// The message never carries internal detail; callers log that separately.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// 405 for anything but POST on the upload route.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Invalid request method")
    }

    /// 400 for a missing `file` field or a malformed multipart body.
    pub fn invalid_input() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Error retrieving the file")
    }

    pub fn payload_too_large() -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "File exceeds the upload size limit",
        )
    }

    /// 500 when the object store rejected the upload or could not be reached.
    pub fn upload_failed() -> Self {
        Self::internal("Error uploading the file")
    }

    pub fn timed_out() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "Upload timed out")
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, format!("{}\n", self.message)).into_response()
    }
}

impl From<MultipartRejection> for AppError {
    fn from(_: MultipartRejection) -> Self {
        AppError::invalid_input()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::payload_too_large()
        } else {
            AppError::invalid_input()
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => AppError::payload_too_large(),
            StorageError::TimedOut(_) => AppError::timed_out(),
            StorageError::Body(source) if body_limit_exceeded(&source) => {
                AppError::payload_too_large()
            }
            StorageError::Body(_) => AppError::invalid_input(),
            StorageError::Io(_) | StorageError::Remote(_) => AppError::upload_failed(),
        }
    }
}

/// True when a body read failed because the router's size limit tripped.
fn body_limit_exceeded(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .is_some_and(|multipart| multipart.status() == StatusCode::PAYLOAD_TOO_LARGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (
                StorageError::TooLarge { limit: 10 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                StorageError::TimedOut(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                StorageError::Body(io::Error::other("reset")),
                StatusCode::BAD_REQUEST,
            ),
            (
                StorageError::Remote("AccessDenied: bucket policy".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn remote_detail_is_not_exposed() {
        let err = AppError::from(StorageError::Remote("InvalidAccessKeyId: AKIA...".into()));
        assert_eq!(err.message, "Error uploading the file");
    }
}
