// system-tests/tests/suites/config_driven.rs
// ============================================================================
// Module: Config Driven Review
// Description: fleet-gate.toml to library to pool, end to end.
// Purpose: Validate that configuration alone is enough to stand up a review.
// Dependencies: system-tests helpers, fleet-gate-config, fleet-gate-core
// ============================================================================

//! ## Overview
//! Writes `fleet-gate.toml` next to a policy tree, loads it with
//! [`FleetGateConfig::load`], and builds the library, engine, and pool from
//! the loaded values.

use std::error::Error;
use std::sync::Arc;

use fleet_gate_config::ConfigError;
use fleet_gate_config::FleetGateConfig;
use fleet_gate_config::load_library_from_config;
use fleet_gate_core::BatchRequest;
use fleet_gate_core::CancellationToken;
use fleet_gate_core::PolicyError;
use fleet_gate_core::ReviewEngine;
use fleet_gate_core::ReviewPool;
use fleet_gate_rego::RegoRuntime;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::bucket;
use helpers::fixtures::constraint_yaml;
use helpers::tree::CONFIG_FILE;
use helpers::tree::LIB_DIR;
use helpers::tree::PolicyTree;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Writes a counter tree with its library module.
fn counter_tree() -> Result<PolicyTree, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    tree.constraint("min-counter.yaml", &constraint_yaml("Counter", "min-counter", "{min: 2}", &["**"], &[]))?;
    Ok(tree)
}

#[test]
fn config_file_drives_library_engine_and_pool() -> TestResult {
    let tree = counter_tree()?;
    let path = tree.write_config(Some(3))?;

    let config = FleetGateConfig::load(Some(&path))?;
    assert_eq!(config.engine.worker_count().get(), 3);
    let library = load_library_from_config(&config)?;
    assert_eq!(library.modules.len(), 1);

    let engine = Arc::new(ReviewEngine::new(RegoRuntime::new(), &library)?);
    let pool = ReviewPool::new(engine, config.engine.worker_count())?;
    assert_eq!(pool.worker_count(), 3);
    let response = pool.review_batch(
        BatchRequest {
            assets: vec![
                bucket("low", "organizations/1/projects/9", 1),
                bucket("ok", "organizations/1/projects/9", 2),
            ],
        },
        &CancellationToken::new(),
    );
    assert!(response.error.is_none());
    assert_eq!(response.violations.len(), 1);
    assert_eq!(response.violations[0].resource_name, "low");
    assert_eq!(response.violations[0].message, "counter 1 is below 2");
    Ok(())
}

#[test]
fn missing_library_path_is_reported_with_its_location() -> TestResult {
    let tree = counter_tree()?;
    let path = tree.write_config(None)?;
    std::fs::remove_dir_all(tree.root().join(LIB_DIR))?;

    let config = FleetGateConfig::load(Some(&path))?;
    let errors = load_library_from_config(&config).err().expect("library directory is gone");
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors.errors()[0], PolicyError::BadConfig { path, .. } if path.ends_with(LIB_DIR)));
    Ok(())
}

#[test]
fn config_without_policy_paths_is_rejected() -> TestResult {
    let tree = PolicyTree::new()?;
    let path = tree.write(CONFIG_FILE, "[engine]\nworker_count = 2\n")?;
    let err = FleetGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("policy.paths")));
    Ok(())
}

#[test]
fn out_of_range_worker_count_is_rejected() -> TestResult {
    let tree = counter_tree()?;
    let path = tree.write_config(Some(0))?;
    let err = FleetGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("worker_count")));
    Ok(())
}

#[test]
fn unsupported_location_scheme_is_rejected() -> TestResult {
    let tree = PolicyTree::new()?;
    let path = tree.write(CONFIG_FILE, "[policy]\npaths = ['gs://bucket/policies']\n")?;
    let err = FleetGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("policy.paths[0]")));
    Ok(())
}
