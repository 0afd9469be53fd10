use crate::models::object_key::KeyScheme;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Extra body allowance on top of the file ceiling for multipart framing
/// (boundaries, part headers, small text fields).
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub max_upload_bytes: u64,
    pub request_timeout_secs: u64,
    pub spool_dir: PathBuf,
    pub unique_suffix: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Relays multipart file uploads into an S3 bucket")]
pub struct Args {
    /// Host to bind to (overrides UPLOAD_RELAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOAD_RELAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Target bucket (overrides UPLOAD_RELAY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Bucket region (overrides UPLOAD_RELAY_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint, enables path-style addressing
    /// (overrides UPLOAD_RELAY_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Largest accepted file in bytes (overrides UPLOAD_RELAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Per-request deadline for the upload (overrides UPLOAD_RELAY_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Directory for temporary upload files (overrides UPLOAD_RELAY_SPOOL_DIR)
    #[arg(long)]
    pub spool_dir: Option<PathBuf>,

    /// Add a random token to every key so same-second uploads never collide
    /// (overrides UPLOAD_RELAY_UNIQUE_SUFFIX; `--unique-suffix=false` turns it off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub unique_suffix: Option<bool>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name))
    }

    /// Merge `args` over the variables returned by `lookup`, over defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = optional(&lookup, "UPLOAD_RELAY_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parsed(&lookup, "UPLOAD_RELAY_PORT")?.unwrap_or(8080);
        let env_bucket = optional(&lookup, "UPLOAD_RELAY_BUCKET")?
            .unwrap_or_else(|| "file-upload-project-dt".into());
        let env_region =
            optional(&lookup, "UPLOAD_RELAY_REGION")?.unwrap_or_else(|| "eu-central-1".into());
        let env_endpoint = optional(&lookup, "UPLOAD_RELAY_ENDPOINT_URL")?;
        let env_max = parsed(&lookup, "UPLOAD_RELAY_MAX_UPLOAD_BYTES")?.unwrap_or(10 << 20);
        let env_timeout = parsed(&lookup, "UPLOAD_RELAY_REQUEST_TIMEOUT_SECS")?.unwrap_or(60);
        let env_spool = optional(&lookup, "UPLOAD_RELAY_SPOOL_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let env_unique = flag(&lookup, "UPLOAD_RELAY_UNIQUE_SUFFIX")?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            bucket: args.bucket.unwrap_or(env_bucket),
            region: args.region.unwrap_or(env_region),
            endpoint_url: args.endpoint_url.or(env_endpoint),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max),
            request_timeout_secs: args.request_timeout_secs.unwrap_or(env_timeout),
            spool_dir: args.spool_dir.unwrap_or(env_spool),
            unique_suffix: args.unique_suffix.unwrap_or(env_unique),
        };
        cfg.validate()?;

        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            bail!("bucket name must not be empty");
        }
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        if self.max_upload_bytes == 0 {
            bail!("max upload size must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Router body limit: the file ceiling plus multipart framing.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }

    pub fn key_scheme(&self) -> KeyScheme {
        if self.unique_suffix {
            KeyScheme::TimestampWithToken
        } else {
            KeyScheme::Timestamp
        }
    }
}

/// Read a variable, treating "not set" as `None`.
fn optional<F>(lookup: &F, name: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn parsed<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    optional(lookup, name)?
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}

fn flag<F>(lookup: &F, name: &str) -> Result<bool>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match optional(lookup, name)?.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes") => {
            Ok(true)
        }
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("no") => {
            Ok(false)
        }
        Some(v) => bail!("parsing {} value `{}`: expected true or false", name, v),
    }
}
