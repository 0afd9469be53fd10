//! Data models for the upload relay.
//!
//! Everything here is per-request and transient: a key is derived when the
//! form is parsed and a `StoredObject` describes what landed in the bucket.

pub mod object;
pub mod object_key;
