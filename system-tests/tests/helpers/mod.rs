// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for Fleet Gate system-tests.
// Purpose: Provide policy trees on disk, policy fixtures, and asset builders.
// Dependencies: system-tests, fleet-gate-config, fleet-gate-core, fleet-gate-rego
// ============================================================================

//! ## Overview
//! Shared helpers for Fleet Gate system-tests.
//! Invariants:
//! - Every scenario loads its policies from files through the config loader.
//! - Evaluation always runs through the Rego backend.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod fixtures;
pub mod tree;
