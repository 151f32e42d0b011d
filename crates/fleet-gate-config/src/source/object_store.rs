// crates/fleet-gate-config/src/source/object_store.rs
// ============================================================================
// Module: Object Store Policy Source
// Description: S3-compatible policy source.
// Purpose: List a bucket prefix and fetch matching policy objects.
// Dependencies: aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! `ObjectStoreSource` lists an `s3://bucket/prefix` location page by page,
//! filters keys by file name before fetching, and rejects objects past the
//! policy file size cap. The S3 client is opened on first use and shared by
//! every later source, whatever settings those sources carry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::sync::OnceLock;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use tokio::runtime::Builder;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::ObjectStoreConfig;
use crate::source::MAX_POLICY_FILE_BYTES;
use crate::source::PolicySource;
use crate::source::SourceError;
use crate::source::SourceFile;
use crate::source::SourceFiles;
use crate::source::file_name;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of keys listed under one prefix.
const MAX_LISTED_KEYS: usize = 100_000;

/// Process-wide S3 client, opened on first use.
static SHARED_CLIENT: OnceLock<Arc<S3ObjectStoreClient>> = OnceLock::new();

// ============================================================================
// SECTION: Object Store Client
// ============================================================================

/// Listing and fetching seam over an object store.
pub(crate) trait ObjectStoreClient: Send + Sync {
    /// Lists every key under a prefix.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, SourceError>;
    /// Reads a single object, failing past `max_bytes`.
    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, SourceError>;
}

/// S3 client driven by its own single-threaded runtime.
struct S3ObjectStoreClient {
    /// Underlying S3 client.
    client: Client,
    /// Runtime that drives every S3 request.
    runtime: Runtime,
}

impl S3ObjectStoreClient {
    /// Opens a client from the object store settings.
    fn open(config: &ObjectStoreConfig) -> Result<Self, SourceError> {
        config.validate().map_err(|err| SourceError::InvalidUri(err.to_string()))?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SourceError::Io(err.to_string()))?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = config.endpoint.clone() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = drive(&runtime, async { Ok(loader.load().await) })?;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();
        Ok(Self {
            client: Client::from_conf(s3_config),
            runtime,
        })
    }
}

impl ObjectStoreClient for S3ObjectStoreClient {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, SourceError> {
        drive(&self.runtime, async {
            let mut keys = Vec::new();
            let mut token: Option<String> = None;
            loop {
                let output = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(token.take())
                    .send()
                    .await
                    .map_err(|err| SourceError::Backend(err.to_string()))?;
                keys.extend(
                    output.contents().iter().filter_map(|object| object.key()).map(str::to_string),
                );
                if keys.len() > MAX_LISTED_KEYS {
                    return Err(SourceError::Io(format!(
                        "s3://{bucket}/{prefix} lists more than {MAX_LISTED_KEYS} keys"
                    )));
                }
                if output.is_truncated() != Some(true) {
                    break;
                }
                token = output.next_continuation_token().map(str::to_string);
                if token.is_none() {
                    break;
                }
            }
            Ok(keys)
        })
    }

    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, SourceError> {
        let path = format!("s3://{bucket}/{key}");
        let too_large = |actual_bytes: usize| SourceError::TooLarge {
            path: path.clone(),
            max_bytes,
            actual_bytes,
        };
        drive(&self.runtime, async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| SourceError::Backend(err.to_string()))?;
            let declared = output
                .content_length()
                .map_or(0, |length| usize::try_from(length).unwrap_or(usize::MAX));
            if declared > max_bytes {
                return Err(too_large(declared));
            }
            let body = output.body.collect().await.map_err(|err| SourceError::Io(err.to_string()))?;
            let bytes = body.into_bytes();
            if bytes.len() > max_bytes {
                return Err(too_large(bytes.len()));
            }
            Ok(bytes.to_vec())
        })
    }
}

/// Drives one future to completion on `runtime`.
///
/// Callers already inside a Tokio runtime block on a scoped thread instead.
fn drive<F, T>(runtime: &Runtime, future: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>> + Send,
    T: Send,
{
    if Handle::try_current().is_err() {
        return runtime.block_on(future);
    }
    std::thread::scope(|scope| {
        scope
            .spawn(|| runtime.block_on(future))
            .join()
            .unwrap_or_else(|_| Err(SourceError::Io("object store request panicked".to_string())))
    })
}

/// Returns the process-wide S3 client, opening it on first use.
fn shared_s3_client(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStoreClient>, SourceError> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(Arc::clone(client) as Arc<dyn ObjectStoreClient>);
    }
    let opened = Arc::new(S3ObjectStoreClient::open(config)?);
    debug!(
        region = config.region.as_deref().unwrap_or("default"),
        endpoint = config.endpoint.as_deref().unwrap_or("default"),
        "object store client opened"
    );
    let client = SHARED_CLIENT.get_or_init(|| opened);
    Ok(Arc::clone(client) as Arc<dyn ObjectStoreClient>)
}

// ============================================================================
// SECTION: Object Store Source
// ============================================================================

/// Policy source over an S3-compatible bucket prefix.
pub struct ObjectStoreSource {
    /// Bucket name.
    bucket: String,
    /// Key prefix.
    prefix: String,
    /// Settings used when the shared client is opened.
    config: ObjectStoreConfig,
    /// Client handle, resolved on first read.
    client: OnceLock<Arc<dyn ObjectStoreClient>>,
}

impl ObjectStoreSource {
    /// Creates a source for `s3://bucket/prefix`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, config: ObjectStoreConfig) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            config,
            client: OnceLock::new(),
        }
    }

    /// Creates a source over an explicit client.
    #[cfg(test)]
    pub(crate) fn with_client(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Self {
        let source = Self::new(bucket, prefix, ObjectStoreConfig::default());
        let _ = source.client.set(client);
        source
    }

    /// Returns the client, opening the shared one if needed.
    fn client(&self) -> Result<Arc<dyn ObjectStoreClient>, SourceError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }
        let shared = shared_s3_client(&self.config)?;
        Ok(Arc::clone(self.client.get_or_init(|| shared)))
    }
}

impl PolicySource for ObjectStoreSource {
    fn read_all<'a>(
        &'a self,
        predicate: &dyn Fn(&str) -> bool,
    ) -> Result<SourceFiles<'a>, SourceError> {
        let client = self.client()?;
        let mut keys: Vec<String> = client
            .list(&self.bucket, &self.prefix)?
            .into_iter()
            .filter(|key| !key.ends_with('/') && predicate(file_name(key)))
            .collect();
        keys.sort();
        Ok(Box::new(keys.into_iter().map(move |key| {
            let bytes = client.get(&self.bucket, &key, MAX_POLICY_FILE_BYTES)?;
            Ok(SourceFile {
                path: format!("s3://{}/{key}", self.bucket),
                bytes,
            })
        })))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
