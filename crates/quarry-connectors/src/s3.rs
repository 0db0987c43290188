//! S3 utilities for the warehouse backend
//!
//! Provides `S3Config` (credentials / endpoint), `parse_s3_location`
//! (bucket/prefix extraction) and `build_store`.

use anyhow::{Context, Result};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use url::Url;

/// Configuration for connecting to S3-compatible storage.
///
/// Secrets (`access_key_id`, `secret_access_key`) are redacted in `Debug`
/// output.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct S3Config {
    /// AWS region (e.g. "us-east-1")
    pub region: String,
    /// Access key id (redacted in Debug output)
    pub access_key_id: String,
    /// Secret access key (redacted in Debug output)
    pub secret_access_key: String,
    /// Optional custom endpoint URL (for MinIO / LocalStack)
    pub endpoint_url: Option<String>,
    /// Allow HTTP (non-TLS) connections, useful for local MinIO
    pub allow_http: bool,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("access_key_id", &"***")
            .field("secret_access_key", &"***")
            .field("endpoint_url", &self.endpoint_url)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

impl S3Config {
    /// Build an S3Config from environment variables:
    ///   AWS_REGION, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_ENDPOINT_URL
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID")
                .context("AWS_ACCESS_KEY_ID not set")?,
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY")
                .context("AWS_SECRET_ACCESS_KEY not set")?,
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            allow_http: std::env::var("AWS_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// Parse an `s3://bucket[/prefix]` location into (bucket, prefix).
///
/// Unlike an object URI the prefix may be empty: a dataset can live at the
/// bucket root.
pub fn parse_s3_location(uri: &str) -> Result<(String, String)> {
    let url = Url::parse(uri).context("invalid S3 URI")?;
    anyhow::ensure!(url.scheme() == "s3", "URI scheme must be s3://");
    let bucket = url
        .host_str()
        .filter(|b| !b.is_empty())
        .context("missing bucket in S3 URI")?
        .to_string();
    let prefix = url.path().trim_matches('/').to_string();
    Ok((bucket, prefix))
}

pub fn is_s3_location(uri: &str) -> bool {
    uri.starts_with("s3://")
}

pub fn build_store(config: &S3Config, bucket: &str) -> Result<AmazonS3> {
    let mut builder = AmazonS3Builder::new()
        .with_region(&config.region)
        .with_bucket_name(bucket)
        .with_access_key_id(&config.access_key_id)
        .with_secret_access_key(&config.secret_access_key);

    if let Some(ref endpoint) = config.endpoint_url {
        builder = builder.with_endpoint(endpoint);
    }
    if config.allow_http {
        builder = builder.with_allow_http(true);
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build S3 object store: {}", e))
}
