// crates/fleet-gate-core/src/lib.rs
// ============================================================================
// Module: Fleet Gate Core Library
// Description: Public API surface for the Fleet Gate policy engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Fleet Gate reviews cloud-infrastructure assets against a library of
//! policy templates and constraints. The core compiles templates through a
//! pluggable [`PolicyRuntime`], binds constraints to targets, and reviews
//! assets one at a time or in parallel batches. It holds no state beyond the
//! immutable engine built at construction.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CompileUnit;
pub use interfaces::ModuleRole;
pub use interfaces::PolicyModule;
pub use interfaces::PolicyRuntime;
pub use interfaces::RawResult;
pub use interfaces::RuntimeError;
pub use runtime::AdmissionTarget;
pub use runtime::BatchRequest;
pub use runtime::BatchResponse;
pub use runtime::BuiltinTarget;
pub use runtime::CancellationToken;
pub use runtime::CloudAssetTarget;
pub use runtime::MatchRule;
pub use runtime::PoolError;
pub use runtime::ReviewEngine;
pub use runtime::ReviewPool;
pub use runtime::Target;
pub use runtime::to_insights;
