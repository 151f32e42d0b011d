// system-tests/tests/suites/construction.rs
// ============================================================================
// Module: Construction Failure Scenarios
// Description: Library and engine build failures on real policy trees.
// Purpose: Ensure every failing document is reported in one error list.
// Dependencies: system-tests helpers, fleet-gate-core
// ============================================================================

use std::error::Error;

use fleet_gate_core::PolicyError;
use fleet_gate_core::TargetName;
use fleet_gate_core::runtime::CLOUD_ASSET_TARGET;
use helpers::fixtures::BROKEN_TEMPLATE;
use helpers::fixtures::COUNTER_TEMPLATE;
use helpers::fixtures::FORMAT_LIB;
use helpers::fixtures::RESERVED_TEMPLATE;
use helpers::fixtures::constraint_yaml;
use helpers::fixtures::renamed_constraint_yaml;
use helpers::tree::PolicyTree;

use crate::helpers;

type TestResult = Result<(), Box<dyn Error>>;

/// Writes the counter template and its library module.
fn base_tree() -> Result<PolicyTree, Box<dyn Error>> {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    tree.template("counter.yaml", COUNTER_TEMPLATE)?;
    Ok(tree)
}

#[test]
fn rego_parse_failure_names_template_and_target() -> TestResult {
    let tree = base_tree()?;
    tree.template("broken.yaml", BROKEN_TEMPLATE)?;
    let Err(errors) = tree.engine() else {
        panic!("broken template should not compile");
    };
    assert_eq!(errors.len(), 1);
    match &errors.errors()[0] {
        PolicyError::CompileError {
            template,
            target,
            diagnostic,
        } => {
            assert_eq!(template, "Broken");
            assert_eq!(target, CLOUD_ASSET_TARGET);
            assert!(!diagnostic.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn constraint_for_unknown_kind_is_unbound() -> TestResult {
    let tree = base_tree()?;
    tree.constraint("ghost.yaml", &constraint_yaml("Ghost", "ghost", "{}", &["**"], &[]))?;
    let errors = tree.engine().err().expect("unbound constraint");
    assert_eq!(
        errors.errors(),
        &[PolicyError::UnboundConstraint {
            name: "ghost".to_string(),
            kind: "Ghost".to_string(),
        }]
    );
    Ok(())
}

#[test]
fn parameters_are_checked_against_the_template_schema() -> TestResult {
    let tree = base_tree()?;
    tree.constraint("typo.yaml", &constraint_yaml("Counter", "typo", "{min: 1, mni: 2}", &["**"], &[]))?;
    tree.constraint("wrong-type.yaml", &constraint_yaml("Counter", "wrong-type", "{min: five}", &["**"], &[]))?;
    let errors = tree.engine().err().expect("invalid parameters");
    assert_eq!(errors.len(), 2);
    assert!(errors.errors().iter().all(|error| matches!(error, PolicyError::SchemaViolation { .. })));
    Ok(())
}

#[test]
fn colliding_display_names_are_rejected() -> TestResult {
    let tree = base_tree()?;
    tree.constraint("a.yaml", &renamed_constraint_yaml("Counter", "first", "shared"))?;
    tree.constraint("b.yaml", &renamed_constraint_yaml("Counter", "second", "shared"))?;
    let errors = tree.engine().err().expect("duplicate display name");
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors.errors()[0], PolicyError::BadConfig { reason, .. } if reason.contains("Counter.shared")));
    Ok(())
}

#[test]
fn loader_errors_accumulate_across_files() -> TestResult {
    let tree = base_tree()?;
    tree.constraint("unknown-group.yaml", "apiVersion: example.com/v1\nkind: Counter\nmetadata:\n  name: x\n")?;
    tree.constraint("extra-field.yaml", "apiVersion: constraints.gatekeeper.sh/v1beta1\nkind: Counter\nmetadata:\n  name: y\nspec:\n  colour: red\n")?;
    tree.constraint("ok.yaml", &constraint_yaml("Counter", "ok", "{min: 1}", &["**"], &[]))?;
    tree.constraint("notes.txt", "ignored: true")?;

    let errors = tree.load().err().expect("bad documents");
    assert_eq!(errors.len(), 2);
    assert!(matches!(&errors.errors()[0], PolicyError::SchemaViolation { path, .. } if path.ends_with("extra-field.yaml")));
    assert!(matches!(&errors.errors()[1], PolicyError::BadConfig { path, .. } if path.ends_with("unknown-group.yaml")));
    Ok(())
}

#[test]
fn multi_document_files_and_both_target_shapes_load() -> TestResult {
    let tree = base_tree()?;
    let combined = format!(
        "{}---\n{}\n---\n",
        constraint_yaml("Counter", "one", "{min: 1}", &["**"], &[]),
        constraint_yaml("Counter", "two", "{min: 2}", &["organizations/1/**"], &[]),
    );
    tree.constraint("pair.yaml", &combined)?;
    tree.template("reserved.yaml", RESERVED_TEMPLATE)?;

    let library = tree.load()?;
    let names: Vec<&str> = library.constraints.iter().map(|constraint| constraint.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    let kinds: Vec<&str> = library.templates.iter().map(|template| template.generated_kind.as_str()).collect();
    assert_eq!(kinds, vec!["Counter", "Reserved"]);
    assert!(library.templates.iter().all(|template| template.targets[0].target.as_str() == CLOUD_ASSET_TARGET));
    assert_eq!(library.modules.len(), 1);
    Ok(())
}

#[test]
fn schema_violations_name_the_failing_field() -> TestResult {
    let tree = base_tree()?;
    tree.constraint(
        "bogus-match.yaml",
        "apiVersion: constraints.gatekeeper.sh/v1beta1\nkind: Counter\nmetadata:\n  name: z\nspec:\n  match:\n    bogus: true\n",
    )?;
    let errors = tree.load().err().expect("unknown match field");
    let [PolicyError::SchemaViolation { messages, .. }] = errors.errors() else {
        panic!("unexpected errors: {errors:?}");
    };
    assert!(messages.iter().any(|message| message.starts_with("/spec/match: ")), "{messages:?}");
    Ok(())
}

#[test]
fn templates_declaring_plural_names_load() -> TestResult {
    let tree = PolicyTree::new()?;
    tree.module("fleet.rego", FORMAT_LIB)?;
    let named = COUNTER_TEMPLATE.replace(
        "        kind: Counter\n",
        "        kind: Counter\n        plural: counters\n        shortNames: [ctr]\n",
    );
    tree.template("counter.yaml", &named)?;
    tree.constraint("ok.yaml", &constraint_yaml("Counter", "ok", "{min: 1}", &["**"], &[]))?;
    let engine = tree.engine()?;
    assert_eq!(engine.constraint_names(&TargetName::from(CLOUD_ASSET_TARGET)).len(), 1);
    Ok(())
}
