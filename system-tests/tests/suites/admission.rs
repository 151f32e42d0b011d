// system-tests/tests/suites/admission.rs
// ============================================================================
// Module: Admission Target Scenarios
// Description: Kubernetes objects reviewed through the admission target.
// Purpose: Validate routing between targets and the admission request shape.
// Dependencies: system-tests helpers, fleet-gate-core
// ============================================================================

use std::error::Error;

use fleet_gate_core::CancellationToken;
use fleet_gate_core::ReviewError;
use fleet_gate_core::TargetName;
use fleet_gate_core::runtime::ADMISSION_TARGET;
use fleet_gate_core::runtime::ANCESTRY_ANNOTATION;
use fleet_gate_core::runtime::CLOUD_ASSET_TARGET;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::REPLICAS_TEMPLATE;
use helpers::fixtures::bucket;
use helpers::fixtures::constraint_yaml;
use helpers::fixtures::deployment;
use helpers::tree::PolicyTree;
use serde_json::json;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Writes counter and replica policies side by side.
fn two_target_tree() -> Result<PolicyTree, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    tree.template("replicas.yaml", REPLICAS_TEMPLATE)?;
    tree.constraint("min-counter.yaml", &constraint_yaml("Counter", "min-counter", "{min: 1}", &["**"], &[]))?;
    tree.constraint(
        "prod-replicas.yaml",
        &constraint_yaml("MinReplicas", "prod-replicas", "{min: 2}", &["organizations/1/**"], &[]),
    )?;
    Ok(tree)
}

#[test]
fn constraints_register_with_their_template_target() -> TestResult {
    let engine = two_target_tree()?.engine()?;
    let cloud: Vec<String> = engine
        .constraint_names(&TargetName::from(CLOUD_ASSET_TARGET))
        .iter()
        .map(ToString::to_string)
        .collect();
    let admission: Vec<String> =
        engine.constraint_names(&TargetName::from(ADMISSION_TARGET)).iter().map(ToString::to_string).collect();
    assert_eq!(cloud, vec!["Counter.min-counter"]);
    assert_eq!(admission, vec!["MinReplicas.prod-replicas"]);
    Ok(())
}

#[test]
fn deployment_is_wrapped_in_an_admission_request() -> TestResult {
    let engine = two_target_tree()?.engine()?;
    let result = engine.review(&deployment("web", "orgs/1/projects/9", 1), &CancellationToken::new())?;

    let review = &result.reviewed_resource;
    assert_eq!(review["kind"], json!({"group": "apps", "version": "v1", "kind": "Deployment"}));
    assert_eq!(review["name"], json!("web"));
    assert_eq!(review["namespace"], json!("prod"));
    assert_eq!(
        review["object"]["metadata"]["annotations"][ANCESTRY_ANNOTATION],
        json!("organizations/1/projects/9")
    );

    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].constraint_name.as_str(), "MinReplicas.prod-replicas");
    assert_eq!(result.violations[0].message, "deployment web has 1 replicas");
    Ok(())
}

#[test]
fn targets_only_see_their_own_assets() -> TestResult {
    let engine = two_target_tree()?.engine()?;
    let cancel = CancellationToken::new();
    let bucket_result = engine.review(&bucket("b", "organizations/1/projects/9", 0), &cancel)?;
    assert_eq!(bucket_result.violations.len(), 1);
    assert_eq!(bucket_result.violations[0].constraint_name.as_str(), "Counter.min-counter");

    let healthy = engine.review(&deployment("api", "organizations/1/projects/9", 3), &cancel)?;
    assert!(healthy.violations.is_empty());
    Ok(())
}

#[test]
fn deployment_outside_the_match_is_not_reviewed() -> TestResult {
    let engine = two_target_tree()?.engine()?;
    let result = engine.review(&deployment("web", "organizations/7/projects/9", 0), &CancellationToken::new())?;
    assert!(result.violations.is_empty());
    Ok(())
}

#[test]
fn non_kubernetes_payload_is_unroutable() -> TestResult {
    let engine = two_target_tree()?.engine()?;
    let asset = json!({
        "name": "thing",
        "asset_type": "example.com/Thing",
        "ancestry_path": "organizations/1",
        "resource": {"data": {"size": 3}}
    });
    let err = engine.review(&asset, &CancellationToken::new()).unwrap_err();
    assert_eq!(
        err,
        ReviewError::UnroutableAsset {
            asset: "thing".to_string(),
            asset_type: "example.com/Thing".to_string(),
        }
    );
    Ok(())
}
