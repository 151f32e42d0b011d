// system-tests/src/lib.rs
// ============================================================================
// Module: Fleet Gate System Tests Library
// Description: Shared configuration for system test scenarios.
// Purpose: Provide common settings for Fleet Gate system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts the shared configuration used by the Fleet Gate
//! system-tests binaries in `system-tests/tests`. The binaries themselves
//! drive policy trees on disk through the config loader, the Rego backend,
//! and the review pool.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
