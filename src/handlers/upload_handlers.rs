//! HTTP handler for `POST /upload`.
//! Streams the `file` field of a multipart form into `StorageService` without
//! buffering it in memory.

use crate::{
    errors::AppError,
    services::storage_service::{StorageError, StorageService},
};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use futures::TryStreamExt;
use std::io;
use tracing::{error, info, warn};

/// Multipart field that carries the upload.
pub const FILE_FIELD: &str = "file";

/// `POST /upload`
///
/// Takes the first `file` field that has a filename, stores it under
/// `{timestamp}-{basename}` and answers with the object's public URL.
pub async fn upload_file(
    State(service): State<StorageService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("rejecting upload: {}", rejection);
        AppError::from(rejection)
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("failed to read multipart form: {}", err);
                return Err(err.into());
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let key = service.keys().derive(&filename);
        let content_type = field.content_type().map(str::to_string);
        let stream = field.map_err(io::Error::other);

        return match service.store(key.clone(), content_type, stream).await {
            Ok(object) => {
                info!(
                    "File uploaded successfully: {} ({} bytes, {}, client name {:?})",
                    object.key,
                    object.size_bytes,
                    object.content_type.as_deref().unwrap_or("no content type"),
                    filename
                );
                Ok((
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("File uploaded successfully: {}\n", object.url),
                ))
            }
            Err(err) => {
                log_failure(key.as_str(), &err);
                Err(err.into())
            }
        };
    }

    warn!("multipart form has no `{}` file field", FILE_FIELD);
    Err(AppError::invalid_input())
}

/// Client-side problems are warnings; store failures carry full detail.
fn log_failure(key: &str, err: &StorageError) {
    match err {
        StorageError::TooLarge { .. } | StorageError::Body(_) => {
            warn!("rejected upload for {}: {}", key, err)
        }
        StorageError::TimedOut(_) | StorageError::Io(_) | StorageError::Remote(_) => {
            error!("Failed to upload file {}: {}", key, err)
        }
    }
}

/// Fallback for every method other than POST on `/upload`.
pub async fn method_not_allowed() -> impl IntoResponse {
    ([(header::ALLOW, "POST")], AppError::method_not_allowed())
}
