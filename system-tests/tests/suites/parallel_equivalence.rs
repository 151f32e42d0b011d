// system-tests/tests/suites/parallel_equivalence.rs
// ============================================================================
// Module: Parallel Equivalence Tests
// Description: Batch review across worker counts with the Rego backend.
// Purpose: Ensure worker count never changes what a batch reports.
// Dependencies: system-tests, helpers, fleet-gate-core, serde_json
// ============================================================================

//! ## Overview
//! One mixed batch of buckets and deployments is reviewed with every worker
//! count from [`SystemTestConfig`]; violations are compared as multisets
//! against the single-worker run.

use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::Arc;

use fleet_gate_core::BatchRequest;
use fleet_gate_core::BatchResponse;
use fleet_gate_core::CancellationToken;
use fleet_gate_core::ReviewEngine;
use fleet_gate_core::ReviewError;
use fleet_gate_core::ReviewPool;
use fleet_gate_core::Violation;
use fleet_gate_rego::RegoRuntime;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::REPLICAS_TEMPLATE;
use helpers::fixtures::constraint_yaml;
use helpers::fixtures::mixed_batch;
use helpers::tree::PolicyTree;
use serde_json::Value;
use serde_json::json;
use system_tests::config::SystemTestConfig;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Number of assets in the swept batch.
const BATCH_SIZE: usize = 48;

/// Builds the shared engine used by every sweep.
fn engine() -> Result<Arc<ReviewEngine<RegoRuntime>>, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    tree.template("replicas.yaml", REPLICAS_TEMPLATE)?;
    tree.constraint(
        "min-counter.yaml",
        &constraint_yaml("Counter", "min-counter", "{min: 2}", &["organizations/**"], &["organizations/1/folders/2/**"]),
    )?;
    tree.constraint("strict-counter.yaml", &constraint_yaml("Counter", "strict-counter", "{min: 3}", &["**"], &[]))?;
    tree.constraint("replicas.yaml", &constraint_yaml("MinReplicas", "replicas", "{min: 2}", &["**"], &[]))?;
    Ok(Arc::new(tree.engine()?))
}

/// Returns violations as sorted JSON strings.
fn multiset(violations: &[Violation]) -> Vec<String> {
    let mut keys: Vec<String> =
        violations.iter().map(|violation| serde_json::to_string(violation).unwrap_or_default()).collect();
    keys.sort();
    keys
}

/// Reviews the batch with `workers` threads.
fn run(
    engine: &Arc<ReviewEngine<RegoRuntime>>,
    workers: NonZeroUsize,
    assets: &[Value],
) -> Result<BatchResponse, Box<dyn Error>> {
    let pool = ReviewPool::new(Arc::clone(engine), workers)?;
    let response = pool.review_batch(
        BatchRequest {
            assets: assets.to_vec(),
        },
        &CancellationToken::new(),
    );
    pool.shutdown();
    Ok(response)
}

#[test]
fn violation_multiset_is_independent_of_worker_count() -> TestResult {
    let engine = engine()?;
    let assets = mixed_batch(BATCH_SIZE);
    let baseline = run(&engine, NonZeroUsize::MIN, &assets)?;
    assert!(baseline.error.is_none());
    assert!(!baseline.violations.is_empty());

    for workers in SystemTestConfig::load()?.worker_counts {
        let response = run(&engine, workers, &assets)?;
        assert_eq!(multiset(&response.violations), multiset(&baseline.violations), "workers = {workers}");
        assert_eq!(response.error, baseline.error, "workers = {workers}");
    }
    Ok(())
}

#[test]
fn violations_of_one_asset_stay_contiguous() -> TestResult {
    let engine = engine()?;
    let assets = mixed_batch(BATCH_SIZE);
    let response = run(&engine, NonZeroUsize::new(4).expect("nonzero"), &assets)?;

    let mut finished: Vec<&str> = Vec::new();
    for violation in &response.violations {
        let name = violation.resource_name.as_str();
        if finished.last() != Some(&name) {
            assert!(!finished.contains(&name), "violations of {name} are split");
            finished.push(name);
        }
    }

    let cancel = CancellationToken::new();
    for asset in &assets {
        let name = asset["name"].as_str().unwrap_or_default();
        let single = engine.review(asset, &cancel)?.to_violations();
        let batched: Vec<Violation> =
            response.violations.iter().filter(|violation| violation.resource_name == name).cloned().collect();
        assert_eq!(batched, single, "asset {name}");
    }
    Ok(())
}

#[test]
fn failures_are_identical_across_worker_counts() -> TestResult {
    let engine = engine()?;
    let mut assets = mixed_batch(12);
    assets.insert(3, json!({"name": "no-type", "ancestry_path": "organizations/1", "resource": {}}));
    assets.push(json!({"name": "no-ancestry", "asset_type": "storage.googleapis.com/Bucket", "resource": {}}));

    let baseline = run(&engine, NonZeroUsize::MIN, &assets)?;
    let failures = baseline.error.clone().expect("two assets fail");
    let indexes: Vec<usize> = failures.failures().iter().map(|failure| failure.index).collect();
    assert_eq!(indexes, vec![3, 13]);
    assert!(matches!(failures.failures()[0].error, ReviewError::MalformedAsset { .. }));
    assert!(matches!(failures.failures()[1].error, ReviewError::MissingAncestry { .. }));

    for workers in SystemTestConfig::load()?.worker_counts {
        let response = run(&engine, workers, &assets)?;
        assert_eq!(response.error, baseline.error, "workers = {workers}");
        assert_eq!(multiset(&response.violations), multiset(&baseline.violations), "workers = {workers}");
    }
    Ok(())
}

#[test]
fn cancelled_batch_reports_every_asset_as_cancelled() -> TestResult {
    let engine = engine()?;
    let assets = mixed_batch(10);
    let pool = ReviewPool::new(engine, NonZeroUsize::new(3).expect("nonzero"))?;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let response = pool.review_batch(
        BatchRequest {
            assets,
        },
        &cancel,
    );
    assert!(response.violations.is_empty());
    let error = response.error.expect("cancelled entries");
    assert_eq!(error.failures().len(), 10);
    assert!(error.failures().iter().all(|failure| matches!(failure.error, ReviewError::Cancelled { .. })));
    Ok(())
}
