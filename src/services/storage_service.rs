//! src/services/storage_service.rs
//!
//! StorageService — relays one uploaded file into the object store. The body
//! stream is spooled to a temporary file under `spool_dir` (counting bytes and
//! hashing as it goes), then handed to an [`ObjectStore`] backend which streams
//! it from disk. Memory use stays flat regardless of file size.

use crate::models::{
    object::{StoredObject, object_url},
    object_key::{KeyGenerator, ObjectKey},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("upload did not complete within {0:?}")]
    TimedOut(Duration),
    #[error("reading request body: {0}")]
    Body(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("object store request failed: {0}")]
    Remote(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Backend that persists spooled uploads.
///
/// Implementations make a single attempt per call and never retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write the spooled file under its key.
    async fn put_object(&self, object: &SpooledObject) -> StorageResult<()>;

    /// Cheap reachability check used by `/readyz`.
    async fn check_ready(&self) -> StorageResult<()>;
}

/// Size and time bounds applied to every upload.
#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    pub max_upload_bytes: u64,
    pub request_timeout: Duration,
}

/// An upload fully written to local disk, ready to be sent to the backend.
///
/// Owns its temporary file; dropping it removes the file.
#[derive(Debug)]
pub struct SpooledObject {
    key: ObjectKey,
    temp: TempFile,
    size_bytes: u64,
    md5: [u8; 16],
    content_type: Option<String>,
}

impl SpooledObject {
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.temp.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Lowercase hex MD5, the etag S3 reports for a single-part put.
    pub fn etag(&self) -> String {
        format!("{:x}", md5::Digest(self.md5))
    }

    /// Base64 MD5 for the `Content-MD5` request header.
    pub fn content_md5(&self) -> String {
        general_purpose::STANDARD.encode(self.md5)
    }
}

/// Removes the spool file when the upload is finished, whatever the outcome.
#[derive(Debug)]
struct TempFile {
    path: PathBuf,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed spool file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove spool file {}: {}", self.path.display(), err),
        }
    }
}

/// Shared by every request; cloning is cheap.
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn ObjectStore>,
    keys: KeyGenerator,
    limits: UploadLimits,
    spool_dir: PathBuf,
    url_base: String,
}

impl StorageService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        url_base: impl Into<String>,
        spool_dir: impl Into<PathBuf>,
        keys: KeyGenerator,
        limits: UploadLimits,
    ) -> Self {
        Self {
            store,
            keys,
            limits,
            spool_dir: spool_dir.into(),
            url_base: url_base.into(),
        }
    }

    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    pub async fn check_ready(&self) -> StorageResult<()> {
        self.store.check_ready().await
    }

    /// Store the bytes of `stream` under `key` and return the public object.
    ///
    /// The stream is read once, to the end. The whole operation is bounded by
    /// the request timeout; on expiry the spool file is still removed.
    pub async fn store<S>(
        &self,
        key: ObjectKey,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<StoredObject>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let deadline = self.limits.request_timeout;
        match tokio::time::timeout(deadline, self.spool_and_put(key, content_type, stream)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::TimedOut(deadline)),
        }
    }

    async fn spool_and_put<S>(
        &self,
        key: ObjectKey,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<StoredObject>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let spooled = self.spool(key, content_type, stream).await?;
        self.store.put_object(&spooled).await?;

        let object = StoredObject {
            key: spooled.key().to_string(),
            url: object_url(&self.url_base, spooled.key()),
            size_bytes: spooled.size_bytes(),
            etag: spooled.etag(),
            content_type: spooled.content_type.clone(),
        };
        info!(
            key = %object.key,
            size_bytes = object.size_bytes,
            etag = %object.etag,
            "stored object"
        );
        Ok(object)
    }

    /// Write the stream to a temp file, enforcing the size ceiling.
    async fn spool<S>(
        &self,
        key: ObjectKey,
        content_type: Option<String>,
        stream: S,
    ) -> StorageResult<SpooledObject>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        fs::create_dir_all(&self.spool_dir).await?;
        let temp = TempFile {
            path: self.spool_dir.join(format!(".upload-{}", Uuid::new_v4())),
        };
        let mut file = File::create(&temp.path).await?;

        let limit = self.limits.max_upload_bytes;
        let mut size_bytes: u64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = chunk_res.map_err(StorageError::Body)?;
            size_bytes += chunk.len() as u64;
            if size_bytes > limit {
                return Err(StorageError::TooLarge { limit });
            }
            digest.consume(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        debug!(
            "spooled {} bytes for {} at {}",
            size_bytes,
            key,
            temp.path.display()
        );

        Ok(SpooledObject {
            key,
            temp,
            size_bytes,
            md5: digest.compute().0,
            content_type,
        })
    }
}
