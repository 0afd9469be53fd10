//! Object key derivation for uploaded files.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Basename used when the client-supplied filename has nothing usable left.
const FALLBACK_BASENAME: &str = "file";

/// Length of the random token added by [`KeyScheme::TimestampWithToken`].
const TOKEN_LEN: usize = 8;

/// A derived object key, unique per request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How keys are laid out in the bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyScheme {
    /// `{unix-seconds}-{basename}`. Same-second uploads of one filename collide.
    Timestamp,
    /// `{unix-seconds}-{token}-{basename}` with an 8 hex char random token.
    TimestampWithToken,
}

/// Builds object keys from client filenames.
///
/// The clock is a plain function pointer so tests can pin the timestamp.
#[derive(Clone, Copy, Debug)]
pub struct KeyGenerator {
    scheme: KeyScheme,
    clock: fn() -> DateTime<Utc>,
}

impl KeyGenerator {
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            scheme,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Derive the key for an upload named `filename`.
    pub fn derive(&self, filename: &str) -> ObjectKey {
        let timestamp = (self.clock)().timestamp();
        let basename = sanitize_filename(filename);

        let key = match self.scheme {
            KeyScheme::Timestamp => format!("{timestamp}-{basename}"),
            KeyScheme::TimestampWithToken => {
                let token = Uuid::new_v4().simple().to_string();
                format!("{timestamp}-{}-{basename}", &token[..TOKEN_LEN])
            }
        };
        ObjectKey(key)
    }
}

/// Reduce an untrusted filename to its last path component.
///
/// Both `/` and `\` count as separators, trailing separators are ignored and
/// control characters are dropped. `""`, `.` and `..` fall back to `file`.
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let basename = cleaned
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("");

    match basename {
        "" | "." | ".." => FALLBACK_BASENAME.to_string(),
        other => other.to_string(),
    }
}
