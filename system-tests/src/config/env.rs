// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::path::PathBuf;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Worker counts swept by the parallel equivalence suites by default.
pub const DEFAULT_WORKER_COUNTS: [usize; 4] = [1, 2, 4, 8];

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional directory under which policy trees are created.
    RunRoot,
    /// Optional comma-separated worker counts for parallel sweeps.
    WorkerCounts,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "FLEET_GATE_SYSTEM_TEST_RUN_ROOT",
            Self::WorkerCounts => "FLEET_GATE_SYSTEM_TEST_WORKER_COUNTS",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Worker counts in ascending order, without duplicates.
    pub worker_counts: Vec<NonZeroUsize>,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            run_root: None,
            worker_counts: DEFAULT_WORKER_COUNTS.iter().copied().filter_map(NonZeroUsize::new).collect(),
        }
    }
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, a zero worker count).
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_nonempty(SystemTestEnv::RunRoot.as_str())?;
        let worker_counts = read_env_nonempty(SystemTestEnv::WorkerCounts.as_str())?;
        Self::from_values(run_root, worker_counts.as_deref())
    }

    /// Builds configuration from raw values as they would appear in the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the worker count list is malformed.
    pub fn from_values(run_root: Option<String>, worker_counts: Option<&str>) -> Result<Self, String> {
        let worker_counts = match worker_counts {
            Some(raw) => parse_worker_counts(SystemTestEnv::WorkerCounts.as_str(), raw)?,
            None => Self::default().worker_counts,
        };
        Ok(Self {
            run_root: run_root.map(PathBuf::from),
            worker_counts,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a comma-separated list of positive worker counts.
///
/// # Errors
///
/// Returns an error when the list is empty or an entry is non-numeric or zero.
pub(crate) fn parse_worker_counts(name: &str, raw: &str) -> Result<Vec<NonZeroUsize>, String> {
    let mut counts = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return Err(format!("{name} must not contain empty entries"));
        }
        let count: usize =
            trimmed.parse().map_err(|_| format!("{name} entries must be positive integers"))?;
        let count = NonZeroUsize::new(count).ok_or_else(|| format!("{name} entries must be greater than zero"))?;
        counts.push(count);
    }
    counts.sort_unstable();
    counts.dedup();
    Ok(counts)
}
