// crates/fleet-gate-config/src/lib.rs
// ============================================================================
// Module: Fleet Gate Config Library
// Description: Engine configuration, document schemas, and policy loading.
// Purpose: Turn fleet-gate.toml and policy trees into a validated library.
// Dependencies: fleet-gate-core, serde, toml, serde_yaml, jsonschema
// ============================================================================

//! ## Overview
//! `fleet-gate-config` owns everything that happens before an engine is
//! built: parsing `fleet-gate.toml`, reading policy files from local paths or
//! object storage, classifying YAML documents into templates and constraints,
//! and validating them against strict schemas. The result is a
//! [`fleet_gate_core::PolicyLibrary`] ready for
//! [`fleet_gate_core::ReviewEngine::new`].
//!
//! Security posture: config files and policy documents are untrusted; every
//! read is size capped and every document is schema validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod documents;
pub mod library;
pub mod schema;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use documents::DocumentParser;
pub use documents::PolicyDocument;
pub use documents::parse_documents;
pub use library::load_library;
pub use library::load_library_from_config;
pub use schema::config_schema;
pub use schema::constraint_document_schema;
pub use schema::template_document_schema;
pub use source::FileSource;
pub use source::MAX_POLICY_FILE_BYTES;
pub use source::ObjectStoreSource;
pub use source::PolicyLocation;
pub use source::PolicySource;
pub use source::SourceFiles;
pub use source::SourceError;
pub use source::SourceFile;
pub use source::open_source;
