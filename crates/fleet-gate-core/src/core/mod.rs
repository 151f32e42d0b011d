// crates/fleet-gate-core/src/core/mod.rs
// ============================================================================
// Module: Fleet Gate Core Types
// Description: Canonical assets, policy documents, and review results.
// Purpose: Provide stable types shared by the loader, runtime, and backends.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types define the asset envelope, the template and constraint model,
//! the ancestry grammar, and the violation forms emitted by review. Every
//! other crate in the workspace builds on these types.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod ancestry;
pub mod asset;
pub mod errors;
pub mod identifiers;
pub mod policy;
pub mod value;
pub mod violation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ancestry::AncestryGlob;
pub use ancestry::GlobSyntaxError;
pub use ancestry::ancestry_from_ancestors;
pub use ancestry::canonicalize_ancestry;
pub use asset::Asset;
pub use asset::AssetPayloadKind;
pub use errors::BatchError;
pub use errors::BatchFailure;
pub use errors::PolicyError;
pub use errors::PolicyErrors;
pub use errors::ReviewError;
pub use identifiers::ConstraintName;
pub use identifiers::TargetName;
pub use identifiers::TemplateKind;
pub use policy::CONSTRAINT_API_VERSIONS;
pub use policy::CONSTRAINT_TEMPLATE_KIND;
pub use policy::Constraint;
pub use policy::ConstraintMatch;
pub use policy::ConstraintSpec;
pub use policy::LibraryModule;
pub use policy::ORIGINAL_NAME_ANNOTATION;
pub use policy::ObjectMeta;
pub use policy::PolicyLibrary;
pub use policy::TEMPLATE_API_VERSIONS;
pub use policy::TargetBinding;
pub use policy::Template;
pub use value::PolicyMap;
pub use value::PolicyValue;
pub use violation::ConstraintViolation;
pub use violation::INSIGHT_CATEGORY;
pub use violation::Insight;
pub use violation::ReviewResult;
pub use violation::Violation;
