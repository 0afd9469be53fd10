//! Represents an object that was relayed into the bucket.

use crate::models::object_key::ObjectKey;

/// Result of a successful upload.
///
/// Only describes the stored object; the payload itself lives in the bucket.
#[derive(Clone, Debug)]
pub struct StoredObject {
    /// Key the object was written under.
    pub key: String,

    /// Public URL of the object.
    pub url: String,

    /// Size in bytes.
    pub size_bytes: u64,

    /// Hex MD5 of the payload, as S3 reports it for single-part puts.
    pub etag: String,

    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
}

/// Base URL under which objects of `bucket` are publicly addressed.
///
/// Virtual-hosted AWS style unless a custom endpoint is configured, in which
/// case path style is used.
pub fn public_url_base(bucket: &str, region: &str, endpoint_url: Option<&str>) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Full URL of `key` below `base`.
pub fn object_url(base: &str, key: &ObjectKey) -> String {
    format!("{}/{}", base, urlencoding::encode(key.as_str()))
}
