// crates/fleet-gate-rego/src/lib.rs
// ============================================================================
// Module: Fleet Gate Rego Library
// Description: Rego policy runtime for the Fleet Gate engine.
// Purpose: Implement PolicyRuntime over the regorus interpreter.
// Dependencies: fleet-gate-core, regorus
// ============================================================================

//! ## Overview
//! `fleet-gate-rego` plugs the `regorus` Rego interpreter into
//! [`fleet_gate_core::ReviewEngine`]. Each compile unit becomes one
//! interpreter holding the target preamble, the library modules, and the
//! template source. Evaluation clones that interpreter so concurrent reviews
//! never share mutable interpreter state.
//!
//! Template sources are parsed as Rego v1 (`import rego.v1`, `contains`,
//! `if`) and report violations through a `violation` or `deny` set whose
//! elements are `{"msg": string, "details": object}`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod imports;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use imports::qualify_imports;
pub use runtime::CompiledRego;
pub use runtime::RegoError;
pub use runtime::RegoRuntime;
pub use runtime::VIOLATION_RULES;
