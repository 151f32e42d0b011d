// system-tests/tests/suites/seed_scenarios.rs
// ============================================================================
// Module: Seed Scenarios
// Description: Trivial accept through partial batch failure, end to end.
// Purpose: Exercise loader, binder, Rego backend, and pool on real files.
// Dependencies: system-tests helpers, fleet-gate-core, fleet-gate-rego
// ============================================================================

//! ## Overview
//! Each scenario writes a policy tree, loads it through the config loader,
//! and reviews assets with the Rego backend.

use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::Arc;

use fleet_gate_core::BatchRequest;
use fleet_gate_core::CancellationToken;
use fleet_gate_core::PolicyError;
use fleet_gate_core::PolicyValue;
use fleet_gate_core::ReviewError;
use fleet_gate_core::ReviewPool;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::RESERVED_TEMPLATE;
use helpers::fixtures::bucket;
use helpers::fixtures::bucket_with_ancestors;
use helpers::fixtures::constraint_yaml;
use helpers::tree::PolicyTree;
use serde_json::json;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Writes the counter template, its library module, and one constraint.
fn counter_tree(target: &[&str], exclude: &[&str]) -> Result<PolicyTree, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    tree.constraint("min-counter.yaml", &constraint_yaml("Counter", "min-counter", "{min: 1}", target, exclude))?;
    Ok(tree)
}

#[test]
fn trivial_accept_reports_nothing() -> TestResult {
    let engine = counter_tree(&["**"], &[])?.engine()?;
    let result = engine.review(&bucket("b", "orgs/1/projects/9", 5), &CancellationToken::new())?;
    assert!(result.violations.is_empty());
    assert!(result.skipped.is_empty());
    assert_eq!(result.reviewed_resource["ancestry_path"], json!("organizations/1/projects/9"));
    Ok(())
}

#[test]
fn excluded_folder_is_not_reviewed() -> TestResult {
    let engine = counter_tree(&["**"], &["orgs/1/folders/2/**"])?.engine()?;
    let cancel = CancellationToken::new();
    let included = engine.review(&bucket("included", "orgs/1/projects/9", 0), &cancel)?;
    let excluded = engine.review(&bucket("excluded", "orgs/1/folders/2/projects/3", 0), &cancel)?;

    let violations = included.to_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].resource_name, "included");
    assert_eq!(violations[0].constraint_name.as_str(), "Counter.min-counter");
    assert_eq!(violations[0].message, "counter 0 is below 1");
    assert_eq!(violations[0].severity, "high");
    assert!(violations[0].metadata.contains_key("counter"));
    assert!(violations[0].metadata.contains_key("constraint"));
    assert!(excluded.violations.is_empty());
    Ok(())
}

#[test]
fn misordered_glob_fails_construction() -> TestResult {
    let Err(errors) = counter_tree(&["organizations/projects/123"], &[])?.engine() else {
        panic!("engine construction should fail");
    };
    assert_eq!(errors.len(), 1);
    match &errors.errors()[0] {
        PolicyError::InvalidGlob {
            constraint,
            field,
            index,
            ..
        } => {
            assert_eq!(constraint, "Counter.min-counter");
            assert_eq!(field, "target");
            assert_eq!(*index, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn reserved_metadata_key_is_skipped_and_reported() -> TestResult {
    let tree = counter_tree(&["**"], &[])?;
    tree.template("reserved.yaml", RESERVED_TEMPLATE)?;
    tree.constraint("reserved.yaml", &constraint_yaml("Reserved", "reserved", "{}", &["**"], &[]))?;
    let engine = tree.engine()?;

    let result = engine.review(&bucket("b", "orgs/1/projects/9", 0), &CancellationToken::new())?;
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].constraint_name.as_str(), "Counter.min-counter");
    assert_eq!(
        result.skipped,
        vec![ReviewError::ReservedKeyCollision {
            asset: "b".to_string(),
            constraint: "Reserved.reserved".to_string(),
            key: "constraint".to_string(),
        }]
    );

    let pool = ReviewPool::new(Arc::new(engine), NonZeroUsize::MIN)?;
    let response = pool.review_batch(
        BatchRequest {
            assets: vec![bucket("b", "orgs/1/projects/9", 5)],
        },
        &CancellationToken::new(),
    );
    assert!(response.violations.is_empty());
    let error = response.error.expect("collision should be aggregated");
    assert_eq!(error.failures().len(), 1);
    assert_eq!(error.failures()[0].asset, "b");
    assert!(matches!(error.failures()[0].error, ReviewError::ReservedKeyCollision { .. }));
    Ok(())
}

#[test]
fn ancestors_list_becomes_canonical_path() -> TestResult {
    let engine = counter_tree(&["organizations/1/folders/2/**"], &[])?.engine()?;
    let asset = bucket_with_ancestors("b", &["projects/9", "folders/2", "organizations/1"], 0);
    let result = engine.review(&asset, &CancellationToken::new())?;
    assert_eq!(result.reviewed_resource["ancestry_path"], json!("organizations/1/folders/2/projects/9"));
    assert_eq!(result.violations.len(), 1);
    assert_eq!(
        result.violations[0].metadata.get("ancestry_path").and_then(PolicyValue::as_str),
        Some("organizations/1/folders/2/projects/9")
    );
    Ok(())
}

#[test]
fn partial_failure_keeps_good_results() -> TestResult {
    let engine = counter_tree(&["**"], &[])?.engine()?;
    let pool = ReviewPool::new(Arc::new(engine), NonZeroUsize::new(2).expect("nonzero"))?;
    let malformed = json!({
        "name": "broken",
        "ancestry_path": "organizations/1/projects/9",
        "resource": {"data": {"counter": 0}}
    });
    let response = pool.review_batch(
        BatchRequest {
            assets: vec![malformed, bucket("violating", "orgs/1/projects/9", 0), bucket("clean", "orgs/1/projects/9", 3)],
        },
        &CancellationToken::new(),
    );

    assert_eq!(response.violations.len(), 1);
    assert_eq!(response.violations[0].resource_name, "violating");
    let error = response.error.expect("malformed asset should be reported");
    assert_eq!(error.failures().len(), 1);
    assert_eq!(error.failures()[0].index, 0);
    assert_eq!(error.failures()[0].asset, "broken");
    assert!(matches!(error.failures()[0].error, ReviewError::MalformedAsset { .. }));
    Ok(())
}
