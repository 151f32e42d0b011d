// crates/fleet-gate-config/src/source/file.rs
// ============================================================================
// Module: File Policy Source
// Description: Filesystem-backed policy source.
// Purpose: Walk local policy trees and read matching files.
// Dependencies: std, walkdir
// ============================================================================

//! ## Overview
//! `FileSource` walks a local file or directory synchronously, sorted by
//! file name, and reads only the files whose names satisfy the predicate.
//! Symbolic links are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::source::MAX_POLICY_FILE_BYTES;
use crate::source::PolicySource;
use crate::source::SourceError;
use crate::source::SourceFile;
use crate::source::SourceFiles;
use crate::source::enforce_max_bytes;

// ============================================================================
// SECTION: File Source
// ============================================================================

/// Filesystem-backed policy source.
#[derive(Debug, Clone)]
pub struct FileSource {
    /// File or directory to walk.
    root: PathBuf,
}

impl FileSource {
    /// Creates a source rooted at a file or directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the walked root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists matching files under the root in walk order.
    fn list(&self, predicate: &dyn Fn(&str) -> bool) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::NotFound(self.root.display().to_string()));
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|err| SourceError::Io(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if predicate(&entry.file_name().to_string_lossy()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

impl PolicySource for FileSource {
    fn read_all<'a>(
        &'a self,
        predicate: &dyn Fn(&str) -> bool,
    ) -> Result<SourceFiles<'a>, SourceError> {
        let paths = self.list(predicate)?;
        Ok(Box::new(paths.into_iter().map(|path| {
            let bytes = read_with_limit(&path)?;
            Ok(SourceFile {
                path: path.to_string_lossy().into_owned(),
                bytes,
            })
        })))
    }
}

/// Reads one file, failing once it exceeds the size cap.
fn read_with_limit(path: &Path) -> Result<Vec<u8>, SourceError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            SourceError::NotFound(path.display().to_string())
        } else {
            SourceError::Io(err.to_string())
        }
    })?;
    let limit = u64::try_from(MAX_POLICY_FILE_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).map_err(|err| SourceError::Io(err.to_string()))?;
    enforce_max_bytes(&path.to_string_lossy(), bytes.len())?;
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
