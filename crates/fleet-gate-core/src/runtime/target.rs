// crates/fleet-gate-core/src/runtime/target.rs
// ============================================================================
// Module: Fleet Gate Targets
// Description: Target plug-point capabilities and the closed builtin set.
// Purpose: Route assets to targets and validate constraint match rules.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! A target identifies a family of resources and supplies the rules for that
//! family: its name, the shape of `spec.match`, a policy-language preamble,
//! review normalization, and constraint validation. The target set is closed
//! ([`BuiltinTarget`]); targets are offered assets in registration order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use serde_json::json;

use crate::core::ConstraintName;
use crate::core::ancestry::AncestryGlob;
use crate::core::asset::Asset;
use crate::core::errors::PolicyError;
use crate::core::identifiers::TargetName;
use crate::core::identifiers::TemplateKind;
use crate::core::policy::Constraint;
use crate::runtime::admission::AdmissionTarget;
use crate::runtime::cloud_asset::CloudAssetTarget;

// ============================================================================
// SECTION: Bound Constraint Sets
// ============================================================================

/// Constraint display names bound to a target, keyed by template kind.
pub type BoundSet = BTreeMap<TemplateKind, Vec<String>>;

// ============================================================================
// SECTION: Match Rules
// ============================================================================

/// Parsed match rules of one constraint.
///
/// # Invariants
/// - `target` is non-empty unless the constraint listed no targets explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    /// Selecting globs.
    pub target: Vec<AncestryGlob>,
    /// Deselecting globs.
    pub exclude: Vec<AncestryGlob>,
}

impl MatchRule {
    /// Returns true when any target glob matches and no exclude glob does.
    #[must_use]
    pub fn matches(&self, ancestry_path: &str) -> bool {
        self.target.iter().any(|glob| glob.matches(ancestry_path))
            && !self.exclude.iter().any(|glob| glob.matches(ancestry_path))
    }
}

/// Parses every match and exclude glob of a constraint.
///
/// # Errors
///
/// Returns one [`PolicyError::InvalidGlob`] per rejected pattern.
pub fn parse_match_rule(constraint: &Constraint) -> Result<MatchRule, Vec<PolicyError>> {
    let name = constraint.qualified_name();
    let mut errors = Vec::new();
    let target = parse_globs(&name, "target", &constraint.spec.match_rules.target, &mut errors);
    let exclude = parse_globs(&name, "exclude", &constraint.spec.match_rules.exclude, &mut errors);
    if errors.is_empty() {
        Ok(MatchRule {
            target,
            exclude,
        })
    } else {
        Err(errors)
    }
}

/// Parses one glob list, recording failures.
fn parse_globs(
    constraint: &ConstraintName,
    field: &str,
    patterns: &[String],
    errors: &mut Vec<PolicyError>,
) -> Vec<AncestryGlob> {
    let mut globs = Vec::with_capacity(patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        match AncestryGlob::parse(pattern) {
            Ok(glob) => globs.push(glob),
            Err(err) => errors.push(PolicyError::InvalidGlob {
                constraint: constraint.to_string(),
                field: field.to_string(),
                index,
                token: err.token,
            }),
        }
    }
    globs
}

// ============================================================================
// SECTION: Target Trait
// ============================================================================

/// Target plug-point capabilities.
pub trait Target {
    /// Returns the target name.
    fn name(&self) -> TargetName;

    /// Returns the JSON schema of `spec.match`.
    fn match_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": {"type": "array", "items": {"type": "string"}},
                "exclude": {"type": "array", "items": {"type": "string"}}
            },
            "additionalProperties": false
        })
    }

    /// Returns the policy-language preamble for the bound constraint set.
    fn preamble(&self, bound: &BoundSet) -> String;

    /// Normalizes an asset when the target handles it.
    fn handle_review(&self, asset: &Asset) -> Option<Value>;

    /// Validates a constraint and returns its parsed match rules.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidGlob`] for each malformed pattern.
    fn validate_constraint(&self, constraint: &Constraint) -> Result<MatchRule, Vec<PolicyError>> {
        parse_match_rule(constraint)
    }
}

// ============================================================================
// SECTION: Preamble Rendering
// ============================================================================

/// Package name of every target preamble.
pub const PREAMBLE_PACKAGE: &str = "target";

/// Comment emitted above `matching_constraint` in every preamble.
const MATCHING_CONSTRAINT_NOTE: &str = "\
# matching_constraint only checks that the constraint is bound to this target.
# Ancestry target/exclude globs are applied by the engine before evaluation,
# so every review a template sees already matches its constraint.
";

/// Renders a preamble module with the given review guard conditions.
///
/// `matching_constraint(kind, name)` in the rendered module holds when the
/// constraint is bound to the target. It does not apply match globs; the
/// engine filters by [`MatchRule::matches`] before any template runs.
#[must_use]
pub fn render_preamble(target: &TargetName, bound: &BoundSet, guard: &[&str]) -> String {
    let bound_json = Value::Object(
        bound
            .iter()
            .map(|(kind, names)| {
                (kind.as_str().to_string(), Value::Array(names.iter().cloned().map(Value::String).collect()))
            })
            .collect(),
    );
    let target_json = Value::String(target.to_string());
    let mut source = format!(
        "package {PREAMBLE_PACKAGE}\n\nimport rego.v1\n\ntarget_name := {target_json}\n\nbound_constraints := {bound_json}\n\n"
    );
    source.push_str("valid_review if {\n");
    for condition in guard {
        source.push('\t');
        source.push_str(condition);
        source.push('\n');
    }
    source.push_str("}\n\n");
    source.push_str(MATCHING_CONSTRAINT_NOTE);
    source.push_str("matching_constraint(kind, name) if {\n");
    source.push_str("\tsome bound_name in bound_constraints[kind]\n");
    source.push_str("\tbound_name == name\n");
    source.push_str("}\n");
    source
}

// ============================================================================
// SECTION: Builtin Targets
// ============================================================================

/// Closed set of registered targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTarget {
    /// Cloud asset inventory target.
    CloudAsset(CloudAssetTarget),
    /// Kubernetes admission target.
    Admission(AdmissionTarget),
}

impl BuiltinTarget {
    /// Returns every target in registration order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::CloudAsset(CloudAssetTarget), Self::Admission(AdmissionTarget)]
    }

    /// Looks up a target by name.
    #[must_use]
    pub fn by_name(name: &TargetName) -> Option<Self> {
        Self::all().into_iter().find(|target| &target.name() == name)
    }
}

impl Target for BuiltinTarget {
    fn name(&self) -> TargetName {
        match self {
            Self::CloudAsset(target) => target.name(),
            Self::Admission(target) => target.name(),
        }
    }

    fn match_schema(&self) -> Value {
        match self {
            Self::CloudAsset(target) => target.match_schema(),
            Self::Admission(target) => target.match_schema(),
        }
    }

    fn preamble(&self, bound: &BoundSet) -> String {
        match self {
            Self::CloudAsset(target) => target.preamble(bound),
            Self::Admission(target) => target.preamble(bound),
        }
    }

    fn handle_review(&self, asset: &Asset) -> Option<Value> {
        match self {
            Self::CloudAsset(target) => target.handle_review(asset),
            Self::Admission(target) => target.handle_review(asset),
        }
    }

    fn validate_constraint(&self, constraint: &Constraint) -> Result<MatchRule, Vec<PolicyError>> {
        match self {
            Self::CloudAsset(target) => target.validate_constraint(constraint),
            Self::Admission(target) => target.validate_constraint(constraint),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
