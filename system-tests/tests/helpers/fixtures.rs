// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Policy Fixtures
// Description: Template and constraint documents plus asset builders.
// Purpose: Share realistic Rego policies across system-test suites.
// Dependencies: serde_json
// ============================================================================

use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Rego Modules
// ============================================================================

/// Shared library module imported by the counter template.
pub const FORMAT_LIB: &str = r#"package lib.fleet

import rego.v1

describe(counter, min) := sprintf("counter %v is below %v", [counter, min])
"#;

/// Cloud asset template: reports when `counter < parameters.min`.
pub const COUNTER_TEMPLATE: &str = r#"apiVersion: templates.gatekeeper.sh/v1beta1
kind: ConstraintTemplate
metadata:
  name: counter
spec:
  crd:
    spec:
      names:
        kind: Counter
      validation:
        openAPIV3Schema:
          properties:
            min:
              type: integer
  targets:
    - target: validation.gcp.forsetisecurity.org
      rego: |
        package templates.gcp.Counter

        import rego.v1

        import data.lib.fleet

        violation contains {"msg": msg, "details": {"counter": counter}} if {
          counter := input.review.resource.data.counter
          counter < input.parameters.min
          msg := fleet.describe(counter, input.parameters.min)
        }
"#;

/// Cloud asset template in the map shape whose details collide with the
/// synthesized `constraint` key.
pub const RESERVED_TEMPLATE: &str = r#"apiVersion: templates.gatekeeper.sh/v1alpha1
kind: ConstraintTemplate
metadata:
  name: reserved
spec:
  crd:
    spec:
      names:
        kind: Reserved
      validation:
        openAPIV3Schema:
          type: object
  targets:
    validation.gcp.forsetisecurity.org:
      rego: |
        package templates.gcp.Reserved

        import rego.v1

        violation contains {"msg": "reserved metadata", "details": {"constraint": "oops"}} if {
          input.review.name
        }
"#;

/// Admission template: reports deployments below `parameters.min` replicas.
pub const REPLICAS_TEMPLATE: &str = r#"apiVersion: templates.gatekeeper.sh/v1beta1
kind: ConstraintTemplate
metadata:
  name: minreplicas
spec:
  crd:
    spec:
      names:
        kind: MinReplicas
      validation:
        openAPIV3Schema:
          properties:
            min:
              type: integer
  targets:
    - target: admission.k8s.gatekeeper.sh
      libs:
        - |
          package lib.k8s

          import rego.v1

          is_deployment(review) if review.kind.kind == "Deployment"
      rego: |
        package templates.k8s.MinReplicas

        import rego.v1

        import data.lib.k8s

        violation contains {"msg": msg, "details": {"replicas": replicas}} if {
          k8s.is_deployment(input.review)
          replicas := input.review.object.spec.replicas
          replicas < input.parameters.min
          msg := sprintf("deployment %v has %v replicas", [input.review.name, replicas])
        }
"#;

/// Template whose Rego does not parse.
pub const BROKEN_TEMPLATE: &str = r#"apiVersion: templates.gatekeeper.sh/v1beta1
kind: ConstraintTemplate
metadata:
  name: broken
spec:
  crd:
    spec:
      names:
        kind: Broken
      validation:
        openAPIV3Schema:
          type: object
  targets:
    - target: validation.gcp.forsetisecurity.org
      rego: |
        package templates.gcp.Broken

        violation contains {"msg": msg} if {
"#;

// ============================================================================
// SECTION: Constraint Documents
// ============================================================================

/// Builds a constraint document.
///
/// `parameters` is an inline YAML mapping such as `{min: 1}`.
pub fn constraint_yaml(kind: &str, name: &str, parameters: &str, target: &[&str], exclude: &[&str]) -> String {
    format!(
        r#"apiVersion: constraints.gatekeeper.sh/v1alpha1
kind: {kind}
metadata:
  name: {name}
spec:
  severity: high
  match:
    target: [{target}]
    exclude: [{exclude}]
  parameters: {parameters}
"#,
        target = quoted(target),
        exclude = quoted(exclude),
    )
}

/// Builds a constraint document carrying an `original-name` annotation.
pub fn renamed_constraint_yaml(kind: &str, name: &str, original: &str) -> String {
    format!(
        r#"apiVersion: constraints.gatekeeper.sh/v1beta1
kind: {kind}
metadata:
  name: {name}
  annotations:
    original-name: {original}
spec:
  parameters: {{min: 1}}
"#
    )
}

/// Joins patterns as a YAML flow sequence body.
fn quoted(patterns: &[&str]) -> String {
    patterns.iter().map(|pattern| format!("\"{pattern}\"")).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Assets
// ============================================================================

/// Builds a storage bucket asset with a counter payload.
pub fn bucket(name: &str, ancestry_path: &str, counter: i64) -> Value {
    json!({
        "name": name,
        "asset_type": "storage.googleapis.com/Bucket",
        "ancestry_path": ancestry_path,
        "resource": {"data": {"counter": counter}}
    })
}

/// Builds a storage bucket asset located by its ancestors list.
pub fn bucket_with_ancestors(name: &str, ancestors: &[&str], counter: i64) -> Value {
    json!({
        "name": name,
        "asset_type": "storage.googleapis.com/Bucket",
        "ancestors": ancestors,
        "resource": {"data": {"counter": counter}}
    })
}

/// Builds a Kubernetes deployment asset.
pub fn deployment(name: &str, ancestry_path: &str, replicas: i64) -> Value {
    json!({
        "name": format!("//container.googleapis.com/deployments/{name}"),
        "asset_type": "apps/Deployment",
        "ancestry_path": ancestry_path,
        "resource": {
            "data": {
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": name, "namespace": "prod"},
                "spec": {"replicas": replicas}
            }
        }
    })
}

/// Builds a mixed batch of buckets and deployments.
///
/// Every third bucket sits under the excluded folder `folders/2`.
pub fn mixed_batch(size: usize) -> Vec<Value> {
    (0 .. size)
        .map(|index| {
            let counter = i64::try_from(index % 4).unwrap_or(0);
            match index % 3 {
                0 => bucket(&format!("bucket-{index}"), "organizations/1/folders/2/projects/3", counter),
                1 => bucket(&format!("bucket-{index}"), "organizations/1/projects/9", counter),
                _ => deployment(&format!("web-{index}"), "organizations/1/projects/9", counter),
            }
        })
        .collect()
}
