// crates/fleet-gate-core/src/core/policy.rs
// ============================================================================
// Module: Fleet Gate Policy Model
// Description: Templates, constraints, and the loaded policy library.
// Purpose: Provide the immutable policy documents consumed by the engine.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Template`] is a reusable policy definition that mints a constraint
//! kind; a [`Constraint`] instantiates that kind with parameters and match
//! rules. Templates never reference their constraints: the engine resolves
//! constraints through a registry keyed by [`TemplateKind`].
//!
//! Security posture: documents are untrusted input until validated by the
//! loader and the binder.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ConstraintName;
use crate::core::identifiers::TargetName;
use crate::core::identifiers::TemplateKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Accepted template `apiVersion` values.
pub const TEMPLATE_API_VERSIONS: [&str; 2] =
    ["templates.gatekeeper.sh/v1alpha1", "templates.gatekeeper.sh/v1beta1"];

/// Accepted constraint `apiVersion` values.
pub const CONSTRAINT_API_VERSIONS: [&str; 2] =
    ["constraints.gatekeeper.sh/v1alpha1", "constraints.gatekeeper.sh/v1beta1"];

/// Kind shared by every template document.
pub const CONSTRAINT_TEMPLATE_KIND: &str = "ConstraintTemplate";

/// Annotation that overrides a constraint's display name.
pub const ORIGINAL_NAME_ANNOTATION: &str = "original-name";

/// Default match target pattern.
pub const DEFAULT_MATCH_TARGET: &str = "**";

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectMeta {
    /// Document name.
    pub name: String,
    /// Document labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Document annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Policy source bound to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBinding {
    /// Target name.
    pub target: TargetName,
    /// Policy-language source.
    pub rego: String,
    /// Inline library modules.
    pub libs: Vec<String>,
}

/// Reusable policy definition.
///
/// # Invariants
/// - `generated_kind` is unique across a policy library.
/// - `targets` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Document path the template was loaded from.
    pub source_path: String,
    /// Template `apiVersion`.
    pub api_version: String,
    /// Template metadata.
    pub metadata: ObjectMeta,
    /// Kind minted for constraints.
    pub generated_kind: TemplateKind,
    /// OpenAPI v3 parameter schema.
    pub parameter_schema: Value,
    /// Target bindings in document order.
    pub targets: Vec<TargetBinding>,
}

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Match rules of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintMatch {
    /// Ancestry globs that select assets.
    #[serde(default = "default_match_target")]
    pub target: Vec<String>,
    /// Ancestry globs that deselect assets.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ConstraintMatch {
    fn default() -> Self {
        Self {
            target: default_match_target(),
            exclude: Vec::new(),
        }
    }
}

/// Returns the default match target list.
fn default_match_target() -> Vec<String> {
    vec![DEFAULT_MATCH_TARGET.to_string()]
}

/// Constraint spec section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    /// Optional severity label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Match rules.
    #[serde(default, rename = "match")]
    pub match_rules: ConstraintMatch,
    /// Template parameters.
    #[serde(default = "empty_object")]
    pub parameters: Value,
}

impl Default for ConstraintSpec {
    fn default() -> Self {
        Self {
            severity: None,
            match_rules: ConstraintMatch::default(),
            parameters: empty_object(),
        }
    }
}

/// Returns an empty JSON object.
fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Instantiation of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Document path the constraint was loaded from.
    pub source_path: String,
    /// Constraint `apiVersion`.
    pub api_version: String,
    /// Referenced template kind.
    pub kind: TemplateKind,
    /// Constraint metadata.
    pub metadata: ObjectMeta,
    /// Constraint spec.
    pub spec: ConstraintSpec,
}

impl Constraint {
    /// Returns the display name (`original-name` annotation or metadata name).
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.metadata
            .annotations
            .get(ORIGINAL_NAME_ANNOTATION)
            .filter(|name| !name.is_empty())
            .map_or(self.metadata.name.as_str(), String::as_str)
    }

    /// Returns the qualified `Kind.Name` form.
    #[must_use]
    pub fn qualified_name(&self) -> ConstraintName {
        ConstraintName::qualified(&self.kind, self.display_name())
    }

    /// Returns the severity or an empty string.
    #[must_use]
    pub fn severity(&self) -> &str {
        self.spec.severity.as_deref().unwrap_or_default()
    }

    /// Returns the JSON echo of the constraint document.
    #[must_use]
    pub fn config_echo(&self) -> Value {
        let mut echo = Map::new();
        echo.insert("api_version".to_string(), Value::String(self.api_version.clone()));
        echo.insert("kind".to_string(), Value::String(self.kind.as_str().to_string()));
        echo.insert(
            "metadata".to_string(),
            serde_json::to_value(&self.metadata).unwrap_or_else(|_| empty_object()),
        );
        echo.insert(
            "spec".to_string(),
            serde_json::to_value(&self.spec).unwrap_or_else(|_| empty_object()),
        );
        Value::Object(echo)
    }
}

// ============================================================================
// SECTION: Policy Library
// ============================================================================

/// Policy-language library module read from the library path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryModule {
    /// Module path.
    pub path: String,
    /// Module source.
    pub source: String,
}

/// Loaded policy library.
///
/// # Invariants
/// - Templates and constraints are in sorted document path order.
/// - Library modules are sorted by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyLibrary {
    /// Templates.
    pub templates: Vec<Template>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Library modules.
    pub modules: Vec<LibraryModule>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
