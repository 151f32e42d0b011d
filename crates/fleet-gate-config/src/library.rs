// crates/fleet-gate-config/src/library.rs
// ============================================================================
// Module: Policy Library Loader
// Description: Loads templates, constraints, and library modules.
// Purpose: Build a PolicyLibrary from configured locations.
// Dependencies: fleet-gate-core, tracing
// ============================================================================

//! ## Overview
//! The loader reads `.yaml`/`.yml` documents from every policy location and
//! `.rego` modules from the optional library location. Files are processed
//! in sorted path order so the resulting library is deterministic. Failures
//! accumulate across the whole library and come back as one
//! [`PolicyErrors`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use fleet_gate_core::LibraryModule;
use fleet_gate_core::PolicyError;
use fleet_gate_core::PolicyErrors;
use fleet_gate_core::PolicyLibrary;
use tracing::debug;
use tracing::info;

use crate::config::FleetGateConfig;
use crate::config::ObjectStoreConfig;
use crate::documents::DocumentParser;
use crate::documents::PolicyDocument;
use crate::source::PolicyLocation;
use crate::source::SourceFile;
use crate::source::open_source;

// ============================================================================
// SECTION: File Predicates
// ============================================================================

/// Accepts declarative policy documents.
fn is_document_file(name: &str) -> bool {
    name.ends_with(".yaml") || name.ends_with(".yml")
}

/// Accepts policy-language modules.
fn is_module_file(name: &str) -> bool {
    name.ends_with(".rego")
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads the policy library named by a validated configuration.
///
/// # Errors
///
/// Returns [`PolicyErrors`] when a location is malformed or any document
/// fails to load.
pub fn load_library_from_config(config: &FleetGateConfig) -> Result<PolicyLibrary, PolicyErrors> {
    let invalid = |err: crate::config::ConfigError| PolicyError::BadConfig {
        path: "policy".to_string(),
        reason: err.to_string(),
    };
    let paths = config.policy.locations().map_err(invalid)?;
    let library_path = config.policy.library_location().map_err(invalid)?;
    load_library(&paths, library_path.as_ref(), &config.object_store_or_default())
}

/// Loads templates and constraints from `paths` and modules from
/// `library_path`.
///
/// # Errors
///
/// Returns [`PolicyErrors`] listing every unreadable file and every failing
/// document.
pub fn load_library(
    paths: &[PolicyLocation],
    library_path: Option<&PolicyLocation>,
    store: &ObjectStoreConfig,
) -> Result<PolicyLibrary, PolicyErrors> {
    let mut errors = PolicyErrors::new();
    let parser = DocumentParser::new()?;

    let mut files = Vec::new();
    for location in paths {
        read_location(location, store, &is_document_file, &mut files, &mut errors);
    }
    files.sort_by(|left, right| left.path.cmp(&right.path));
    files.dedup_by(|left, right| left.path == right.path);

    let mut library = PolicyLibrary::default();
    for file in &files {
        let Some(text) = utf8(file, &mut errors) else {
            continue;
        };
        for document in parser.parse(&file.path, text, &mut errors) {
            match document {
                PolicyDocument::Template(template) => library.templates.push(template),
                PolicyDocument::Constraint(constraint) => library.constraints.push(constraint),
            }
        }
    }

    if let Some(location) = library_path {
        let mut modules = Vec::new();
        read_location(location, store, &is_module_file, &mut modules, &mut errors);
        modules.sort_by(|left, right| left.path.cmp(&right.path));
        for file in &modules {
            if let Some(text) = utf8(file, &mut errors) {
                library.modules.push(LibraryModule {
                    path: file.path.clone(),
                    source: text.to_string(),
                });
            }
        }
    }

    info!(
        files = files.len(),
        templates = library.templates.len(),
        constraints = library.constraints.len(),
        modules = library.modules.len(),
        errors = errors.len(),
        "policy library loaded"
    );
    errors.into_result(library)
}

/// Reads every matching file under a location into `files`.
fn read_location(
    location: &PolicyLocation,
    store: &ObjectStoreConfig,
    predicate: &dyn Fn(&str) -> bool,
    files: &mut Vec<SourceFile>,
    errors: &mut PolicyErrors,
) {
    let source = open_source(location, store);
    let entries = match source.read_all(predicate) {
        Ok(entries) => entries,
        Err(err) => {
            errors.push(PolicyError::BadConfig {
                path: location.to_string(),
                reason: err.to_string(),
            });
            return;
        }
    };
    let before = files.len();
    for entry in entries {
        match entry {
            Ok(file) => files.push(file),
            Err(err) => errors.push(PolicyError::BadConfig {
                path: location.to_string(),
                reason: err.to_string(),
            }),
        }
    }
    debug!(location = %location, files = files.len().saturating_sub(before), "policy location read");
}

/// Returns the file as UTF-8 text, recording a failure otherwise.
fn utf8<'a>(file: &'a SourceFile, errors: &mut PolicyErrors) -> Option<&'a str> {
    match std::str::from_utf8(&file.bytes) {
        Ok(text) => Some(text),
        Err(_) => {
            errors.push(PolicyError::BadConfig {
                path: file.path.clone(),
                reason: "policy file must be utf-8".to_string(),
            });
            None
        }
    }
}
