// system-tests/tests/suites/replay.rs
// ============================================================================
// Module: Replay Determinism Tests
// Description: Identical policy trees and assets yield identical outcomes.
// Purpose: Ensure load order, evaluation order, and projections are stable.
// Dependencies: system-tests helpers, fleet-gate-core
// ============================================================================

use std::error::Error;

use fleet_gate_core::CancellationToken;
use fleet_gate_core::INSIGHT_CATEGORY;
use fleet_gate_core::to_insights;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::REPLICAS_TEMPLATE;
use helpers::fixtures::bucket;
use helpers::fixtures::constraint_yaml;
use helpers::fixtures::mixed_batch;
use helpers::tree::PolicyTree;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Constraint files written by every tree, as (file, kind, name, min).
const CONSTRAINTS: [(&str, &str, &str, u32); 3] = [
    ("c-counter-low.yaml", "Counter", "low", 1),
    ("a-counter-high.yaml", "Counter", "high", 4),
    ("b-replicas.yaml", "MinReplicas", "replicas", 2),
];

/// Writes the shared tree, emitting constraint files in the given order.
fn tree_with_order(order: &[usize]) -> Result<PolicyTree, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("replicas.yaml", REPLICAS_TEMPLATE)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    for index in order {
        let (file, kind, name, min) = CONSTRAINTS[*index];
        tree.constraint(file, &constraint_yaml(kind, name, &format!("{{min: {min}}}"), &["**"], &[]))?;
    }
    Ok(tree)
}

#[test]
fn write_order_does_not_change_the_library() -> TestResult {
    let forward = tree_with_order(&[0, 1, 2])?.load()?;
    let backward = tree_with_order(&[2, 1, 0])?.load()?;
    let names = |library: &fleet_gate_core::PolicyLibrary| -> Vec<String> {
        library.constraints.iter().map(|constraint| constraint.qualified_name().to_string()).collect()
    };
    assert_eq!(names(&forward), vec!["Counter.high", "MinReplicas.replicas", "Counter.low"]);
    assert_eq!(names(&forward), names(&backward));
    let kinds: Vec<&str> = forward.templates.iter().map(|template| template.generated_kind.as_str()).collect();
    assert_eq!(kinds, vec!["Counter", "MinReplicas"]);
    Ok(())
}

#[test]
fn reloaded_engines_review_identically() -> TestResult {
    let first = tree_with_order(&[0, 1, 2])?.engine()?;
    let second = tree_with_order(&[1, 2, 0])?.engine()?;
    let cancel = CancellationToken::new();
    for asset in mixed_batch(24) {
        let left = first.review(&asset, &cancel)?.to_violations();
        let right = second.review(&asset, &cancel)?.to_violations();
        assert_eq!(left, right);
    }
    Ok(())
}

#[test]
fn repeated_reviews_keep_constraint_order() -> TestResult {
    let engine = tree_with_order(&[0, 1, 2])?.engine()?;
    let cancel = CancellationToken::new();
    let asset = bucket("b", "organizations/1/projects/9", 0);
    let baseline = engine.review(&asset, &cancel)?;
    let order: Vec<&str> = baseline.violations.iter().map(|violation| violation.constraint_name.as_str()).collect();
    assert_eq!(order, vec!["Counter.high", "Counter.low"]);
    for _ in 0 .. 5 {
        assert_eq!(engine.review(&asset, &cancel)?, baseline);
    }
    Ok(())
}

#[test]
fn insights_mirror_violations() -> TestResult {
    let engine = tree_with_order(&[0, 1, 2])?.engine()?;
    let violations = engine.review(&bucket("b", "organizations/1/projects/9", 0), &CancellationToken::new())?.to_violations();
    let insights = to_insights(&violations);
    assert_eq!(insights.len(), violations.len());
    for (insight, violation) in insights.iter().zip(&violations) {
        assert_eq!(insight.description, violation.message);
        assert_eq!(insight.target_resources, vec![violation.resource_name.clone()]);
        assert_eq!(insight.subtype, violation.constraint_name.as_str());
        assert_eq!(insight.category, INSIGHT_CATEGORY);
    }
    Ok(())
}
