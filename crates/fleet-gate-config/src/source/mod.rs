// crates/fleet-gate-config/src/source/mod.rs
// ============================================================================
// Module: Policy Sources
// Description: Uniform read-all access to local and object-store locations.
// Purpose: Enumerate policy files by name and read them with size caps.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! A [`PolicySource`] enumerates the files under one location and yields
//! them as `(path, bytes)` pairs. The name predicate is applied before any
//! bytes are read, so unrelated files are never fetched. Every read is capped
//! at [`MAX_POLICY_FILE_BYTES`].
//!
//! Security posture: locations and file contents are untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::config::ObjectStoreConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of one policy file or object.
pub const MAX_POLICY_FILE_BYTES: usize = 4 * 1024 * 1024;

/// URI scheme selecting the object-store backend.
const OBJECT_STORE_SCHEME: &str = "s3";

// ============================================================================
// SECTION: Source Files
// ============================================================================

/// One file read from a policy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path or URI the bytes were read from.
    pub path: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Finite, single-pass iterator over the files of one source.
pub type SourceFiles<'a> = Box<dyn Iterator<Item = Result<SourceFile, SourceError>> + 'a>;

// ============================================================================
// SECTION: Source Errors
// ============================================================================

/// Errors emitted by policy sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Unsupported URI scheme.
    #[error("unsupported uri scheme: {0}")]
    UnsupportedScheme(String),
    /// URI failed to parse or resolve.
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    /// Location was not found.
    #[error("location not found: {0}")]
    NotFound(String),
    /// Source reported an I/O failure.
    #[error("io failure: {0}")]
    Io(String),
    /// Object-store backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// File exceeded the size cap.
    #[error("file too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Offending path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
}

/// Returns an error when a file exceeds the size cap.
pub(crate) fn enforce_max_bytes(path: &str, actual_bytes: usize) -> Result<(), SourceError> {
    if actual_bytes > MAX_POLICY_FILE_BYTES {
        return Err(SourceError::TooLarge {
            path: path.to_string(),
            max_bytes: MAX_POLICY_FILE_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Source Trait
// ============================================================================

/// Reads every file under one location.
pub trait PolicySource: Send + Sync {
    /// Lists the location and yields each file whose name satisfies
    /// `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the location cannot be enumerated.
    /// Per-file read failures surface as `Err` items of the iterator.
    fn read_all<'a>(&'a self, predicate: &dyn Fn(&str) -> bool)
    -> Result<SourceFiles<'a>, SourceError>;
}

// ============================================================================
// SECTION: Locations
// ============================================================================

/// Parsed policy location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLocation {
    /// Local file or directory.
    Local(PathBuf),
    /// Object-store prefix.
    ObjectStore {
        /// Bucket name.
        bucket: String,
        /// Key prefix inside the bucket.
        prefix: String,
    },
}

impl PolicyLocation {
    /// Parses `s3://bucket/prefix` URIs and local paths.
    ///
    /// `file://` URIs resolve to local paths; other schemes are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when a URI is malformed or uses an
    /// unsupported scheme.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        if !raw.contains("://") {
            return Ok(Self::Local(PathBuf::from(raw)));
        }
        let url = Url::parse(raw).map_err(|err| SourceError::InvalidUri(err.to_string()))?;
        match url.scheme() {
            OBJECT_STORE_SCHEME => {
                let bucket = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| SourceError::InvalidUri(format!("{raw}: missing bucket")))?;
                Ok(Self::ObjectStore {
                    bucket: bucket.to_string(),
                    prefix: url.path().trim_start_matches('/').to_string(),
                })
            }
            "file" => url.to_file_path().map(Self::Local).map_err(|()| {
                SourceError::InvalidUri("failed to map file url to path".to_string())
            }),
            other => Err(SourceError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for PolicyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::ObjectStore {
                bucket,
                prefix,
            } => write!(f, "{OBJECT_STORE_SCHEME}://{bucket}/{prefix}"),
        }
    }
}

/// Opens the source backing a location.
#[must_use]
pub fn open_source(location: &PolicyLocation, store: &ObjectStoreConfig) -> Box<dyn PolicySource> {
    match location {
        PolicyLocation::Local(root) => Box::new(FileSource::new(root.clone())),
        PolicyLocation::ObjectStore {
            bucket,
            prefix,
        } => Box::new(ObjectStoreSource::new(bucket.clone(), prefix.clone(), store.clone())),
    }
}

/// Returns the final segment of a path or key.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod file;
pub mod object_store;

pub use file::FileSource;
pub use object_store::ObjectStoreSource;

// ============================================================================
// SECTION: Tests
// ============================================================================
