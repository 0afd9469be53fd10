//! S3 backend for [`ObjectStore`], built on `aws-sdk-s3`.
//!
//! One `PutObject` per upload, body streamed from the spool file with an
//! explicit length and `Content-MD5`. Errors are flattened into
//! `StorageError::Remote` with the full SDK error chain.

use crate::{
    config::AppConfig,
    services::storage_service::{ObjectStore, SpooledObject, StorageError, StorageResult},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::{
    Client,
    config::{Builder, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use std::io;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS configuration.
    ///
    /// Credentials are resolved here, once, so a misconfigured process fails
    /// before it starts listening.
    pub async fn connect(cfg: &AppConfig) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .load()
            .await;

        let credentials = sdk_config
            .credentials_provider()
            .context("no AWS credentials provider in the default chain")?;
        credentials
            .provide_credentials()
            .await
            .context("resolving AWS credentials")?;

        let mut builder = Builder::from(&sdk_config);
        if let Some(endpoint) = &cfg.endpoint_url {
            debug!("using custom S3 endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::new(Client::from_conf(builder.build()), &cfg.bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, object: &SpooledObject) -> StorageResult<()> {
        let body = ByteStream::from_path(object.path())
            .await
            .map_err(|err| StorageError::Io(io::Error::other(err)))?;
        let size_bytes = i64::try_from(object.size_bytes())
            .map_err(|_| StorageError::TooLarge { limit: i64::MAX as u64 })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object.key().as_str())
            .body(body)
            .content_length(size_bytes)
            .content_md5(object.content_md5())
            .set_content_type(object.content_type().map(str::to_string))
            .send()
            .await
            .map_err(|err| StorageError::Remote(DisplayErrorContext(&err).to_string()))?;

        debug!("put s3://{}/{}", self.bucket, object.key());
        Ok(())
    }

    async fn check_ready(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| StorageError::Remote(DisplayErrorContext(&err).to_string()))?;
        Ok(())
    }
}
