// crates/fleet-gate-core/src/runtime/binder.rs
// ============================================================================
// Module: Fleet Gate Constraint Binder
// Description: Attach constraints to templates and validate parameters.
// Purpose: Produce per-target bound constraint lists for the review engine.
// Dependencies: crate::core, jsonschema, serde_json, tracing
// ============================================================================

//! ## Overview
//! Binding resolves each constraint's kind through the template registry,
//! validates its parameters against the template schema with structural
//! semantics, and hands it to every target the template binds. Constraint
//! order within a target is library order.
//!
//! Structural semantics: an object schema that lists `properties` and does
//! not say anything about `additionalProperties` rejects unknown fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::core::errors::PolicyError;
use crate::core::errors::PolicyErrors;
use crate::core::identifiers::ConstraintName;
use crate::core::identifiers::TargetName;
use crate::core::policy::Constraint;
use crate::runtime::compiler::TemplateRegistry;
use crate::runtime::target::BoundSet;
use crate::runtime::target::MatchRule;
use crate::runtime::target::Target;

// ============================================================================
// SECTION: Parameter Schemas
// ============================================================================

/// Keywords whose values are single nested schemas.
const SCHEMA_KEYWORDS: [&str; 3] = ["items", "additionalProperties", "not"];

/// Keywords whose values are lists of nested schemas.
const SCHEMA_LIST_KEYWORDS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// Returns a copy of the schema with structural unknown-field rejection.
#[must_use]
pub fn structural_schema(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut output = Map::new();
    for (key, value) in map {
        let rewritten = match key.as_str() {
            "properties" | "patternProperties" | "definitions" => match value {
                Value::Object(children) => Value::Object(
                    children.iter().map(|(name, child)| (name.clone(), structural_schema(child))).collect(),
                ),
                other => other.clone(),
            },
            keyword if SCHEMA_KEYWORDS.contains(&keyword) => structural_schema(value),
            keyword if SCHEMA_LIST_KEYWORDS.contains(&keyword) => match value {
                Value::Array(items) => Value::Array(items.iter().map(structural_schema).collect()),
                other => other.clone(),
            },
            _ => value.clone(),
        };
        output.insert(key.clone(), rewritten);
    }
    if output.get("properties").is_some_and(Value::is_object)
        && !output.contains_key("additionalProperties")
        && !output.contains_key("patternProperties")
    {
        output.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    Value::Object(output)
}

/// Compiles an OpenAPI v3 parameter schema with structural semantics.
///
/// # Errors
///
/// Returns the compiler message when the schema is invalid.
pub fn compile_parameter_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft4)
        .build(&structural_schema(schema))
        .map_err(|err| format!("invalid parameter schema: {err}"))
}

/// Compiles a target match schema.
fn compile_match_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("invalid match schema: {err}"))
}

/// Returns validator messages for an instance, each led by its JSON pointer.
///
/// Failures at the instance root are reported under `/`.
#[must_use]
pub fn schema_messages(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|err| {
            let location = err.instance_path().to_string();
            let location = if location.is_empty() { "/" } else { location.as_str() };
            format!("{location}: {err}")
        })
        .collect()
}

// ============================================================================
// SECTION: Bound Constraints
// ============================================================================

/// Constraint attached to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundConstraint {
    /// Owning constraint.
    pub constraint: Arc<Constraint>,
    /// Qualified constraint name.
    pub name: ConstraintName,
    /// Parsed match rules.
    pub rule: MatchRule,
    /// Constraint document echo passed to the evaluator.
    pub config: Value,
}

/// Bound constraints keyed by target, each list in library order.
pub type BindingTable = BTreeMap<TargetName, Vec<BoundConstraint>>;

/// Returns the kind -> display names map for one target's constraints.
#[must_use]
pub fn bound_set(bound: &[BoundConstraint]) -> BoundSet {
    let mut set = BoundSet::new();
    for entry in bound {
        set.entry(entry.constraint.kind.clone())
            .or_default()
            .push(entry.constraint.display_name().to_string());
    }
    set
}

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Binds constraints to the targets of their templates.
///
/// Failures are recorded in `errors`; constraints that fail are not bound.
pub fn bind_constraints(
    constraints: &[Constraint],
    registry: &TemplateRegistry<'_>,
    errors: &mut PolicyErrors,
) -> BindingTable {
    let mut table = BindingTable::new();
    let mut seen_names = BTreeSet::new();
    let mut match_schemas: BTreeMap<TargetName, Option<Validator>> = BTreeMap::new();

    for constraint in constraints {
        let name = constraint.qualified_name();
        if !seen_names.insert(name.clone()) {
            errors.push(PolicyError::BadConfig {
                path: constraint.source_path.clone(),
                reason: format!("duplicate constraint name {name}"),
            });
            continue;
        }
        if registry.is_rejected(&constraint.kind) {
            continue;
        }
        let Some(template) = registry.get(&constraint.kind) else {
            errors.push(PolicyError::UnboundConstraint {
                name: constraint.metadata.name.clone(),
                kind: constraint.kind.to_string(),
            });
            continue;
        };

        let mut failed = false;
        let messages = schema_messages(&template.parameters, &constraint.spec.parameters);
        if !messages.is_empty() {
            errors.push(PolicyError::SchemaViolation {
                path: constraint.source_path.clone(),
                messages: messages.into_iter().map(|message| format!("spec.parameters: {message}")).collect(),
            });
            failed = true;
        }

        let match_value = match serde_json::to_value(&constraint.spec.match_rules) {
            Ok(value) => value,
            Err(err) => {
                errors.push(PolicyError::BadConfig {
                    path: constraint.source_path.clone(),
                    reason: format!("spec.match cannot be encoded: {err}"),
                });
                continue;
            }
        };
        let shared = Arc::new(constraint.clone());
        let config = shared.config_echo();
        let mut bindings = Vec::with_capacity(template.targets.len());
        for target in &template.targets {
            let target_name = target.name();
            let validator = match_schemas.entry(target_name.clone()).or_insert_with(|| {
                compile_match_schema(&target.match_schema())
                    .map_err(|message| {
                        errors.push(PolicyError::BadConfig {
                            path: target_name.to_string(),
                            reason: message,
                        });
                    })
                    .ok()
            });
            if let Some(validator) = validator {
                let messages = schema_messages(validator, &match_value);
                if !messages.is_empty() {
                    errors.push_unique(PolicyError::SchemaViolation {
                        path: constraint.source_path.clone(),
                        messages: messages.into_iter().map(|message| format!("spec.match: {message}")).collect(),
                    });
                    failed = true;
                }
            }
            match target.validate_constraint(constraint) {
                Ok(rule) => bindings.push((
                    target_name,
                    BoundConstraint {
                        constraint: Arc::clone(&shared),
                        name: name.clone(),
                        rule,
                        config: config.clone(),
                    },
                )),
                Err(glob_errors) => {
                    for error in glob_errors {
                        errors.push_unique(error);
                    }
                    failed = true;
                }
            }
        }
        if failed {
            continue;
        }
        for (target_name, bound) in bindings {
            debug!(constraint = %bound.name, target = %target_name, "constraint bound");
            table.entry(target_name).or_default().push(bound);
        }
    }
    table
}

// ============================================================================
// SECTION: Tests
// ============================================================================
