// crates/fleet-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Fleet Gate Runtime
// Description: Engine construction, review, and batch orchestration.
// Purpose: Wire templates and constraints into per-target review engines.
// Dependencies: crate::{core, interfaces}, jsonschema, tokio-util, tracing
// ============================================================================

//! ## Overview
//! The runtime compiles templates ([`compiler`]), binds constraints
//! ([`binder`]), routes assets through the closed target set ([`target`]),
//! reviews single assets ([`engine`]), canonicalizes results
//! ([`canonical`]), and fans batches over a worker pool ([`pool`]).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admission;
pub mod binder;
pub mod canonical;
pub mod cloud_asset;
pub mod compiler;
pub mod engine;
pub mod pool;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use admission::ADMISSION_TARGET;
pub use admission::ANCESTRY_ANNOTATION;
pub use admission::AdmissionTarget;
pub use binder::BoundConstraint;
pub use binder::schema_messages;
pub use canonical::ANCESTRY_PATH_KEY;
pub use canonical::CONSTRAINT_KEY;
pub use canonical::to_insights;
pub use cloud_asset::CLOUD_ASSET_TARGET;
pub use cloud_asset::CloudAssetTarget;
pub use engine::ReviewEngine;
pub use pool::BatchRequest;
pub use pool::BatchResponse;
pub use pool::PoolError;
pub use pool::ReviewPool;
pub use pool::default_worker_count;
pub use target::BoundSet;
pub use target::BuiltinTarget;
pub use target::MatchRule;
pub use target::Target;
pub use tokio_util::sync::CancellationToken;
