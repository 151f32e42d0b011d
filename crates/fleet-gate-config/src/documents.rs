// crates/fleet-gate-config/src/documents.rs
// ============================================================================
// Module: Policy Documents
// Description: YAML document parsing, classification, and decoding.
// Purpose: Turn policy files into validated templates and constraints.
// Dependencies: fleet-gate-core, jsonschema, serde, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! A policy file holds one or more `---` separated YAML documents. Each
//! non-empty document is classified as a template or a constraint by its
//! `apiVersion` and `kind`, validated against the strict document schema,
//! and then decoded with unknown fields denied. Every failure is recorded in
//! the caller's [`PolicyErrors`] and parsing moves on to the next document.
//!
//! Both `spec.targets` shapes decode to the same [`TargetBinding`] list:
//!
//! ```yaml
//! targets:                                  # mapping shape
//!   validation.gcp.forsetisecurity.org:
//!     rego: "package templates.gcp.Example ..."
//! ---
//! targets:                                  # sequence shape
//!   - target: validation.gcp.forsetisecurity.org
//!     rego: "package templates.gcp.Example ..."
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fleet_gate_core::CONSTRAINT_API_VERSIONS;
use fleet_gate_core::CONSTRAINT_TEMPLATE_KIND;
use fleet_gate_core::Constraint;
use fleet_gate_core::ConstraintSpec;
use fleet_gate_core::ObjectMeta;
use fleet_gate_core::PolicyError;
use fleet_gate_core::PolicyErrors;
use fleet_gate_core::TEMPLATE_API_VERSIONS;
use fleet_gate_core::TargetBinding;
use fleet_gate_core::TargetName;
use fleet_gate_core::Template;
use fleet_gate_core::TemplateKind;
use fleet_gate_core::runtime::schema_messages;
use jsonschema::Draft;
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::schema::constraint_document_schema;
use crate::schema::template_document_schema;

// ============================================================================
// SECTION: Documents
// ============================================================================

/// A classified and decoded policy document.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDocument {
    /// Constraint template.
    Template(Template),
    /// Constraint instantiating a template kind.
    Constraint(Constraint),
}

/// Document kind chosen by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    /// `ConstraintTemplate` in the template group.
    Template,
    /// Any other kind in the constraint group.
    Constraint,
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Returns the `apiVersion` and `kind` strings of a document.
fn header(document: &Value) -> Option<(&str, &str)> {
    let api_version = document.get("apiVersion")?.as_str()?;
    let kind = document.get("kind")?.as_str()?;
    Some((api_version, kind))
}

/// Matches template documents.
fn as_template(document: &Value) -> Option<DocumentKind> {
    let (api_version, kind) = header(document)?;
    (TEMPLATE_API_VERSIONS.contains(&api_version) && kind == CONSTRAINT_TEMPLATE_KIND)
        .then_some(DocumentKind::Template)
}

/// Matches constraint documents.
fn as_constraint(document: &Value) -> Option<DocumentKind> {
    let (api_version, kind) = header(document)?;
    (CONSTRAINT_API_VERSIONS.contains(&api_version) && kind != CONSTRAINT_TEMPLATE_KIND)
        .then_some(DocumentKind::Constraint)
}

/// Runs the classification chain.
fn classify(document: &Value) -> Option<DocumentKind> {
    as_template(document).or_else(|| as_constraint(document))
}

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Template document as written.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct TemplateDocument {
    /// Template group version.
    api_version: String,
    /// Always `ConstraintTemplate`.
    kind: String,
    /// Document metadata.
    metadata: ObjectMeta,
    /// Template body.
    spec: TemplateSpecDocument,
}

/// Template `spec`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateSpecDocument {
    /// Generated kind and parameter schema.
    crd: CrdDocument,
    /// Target bindings.
    targets: TargetsDocument,
}

/// Template `spec.crd`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrdDocument {
    /// Inner CRD spec.
    spec: CrdSpecDocument,
}

/// Template `spec.crd.spec`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrdSpecDocument {
    /// Generated kind names.
    names: CrdNamesDocument,
    /// Parameter validation.
    validation: CrdValidationDocument,
}

/// Template `spec.crd.spec.names`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CrdNamesDocument {
    /// Generated constraint kind.
    kind: String,
    /// Plural resource name of the generated kind.
    #[serde(default)]
    plural: Option<String>,
    /// Short aliases of the generated kind.
    #[serde(default)]
    short_names: Vec<String>,
}

/// Template `spec.crd.spec.validation`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrdValidationDocument {
    /// Parameter schema.
    #[serde(rename = "openAPIV3Schema")]
    open_api_v3_schema: Value,
}

/// Either `spec.targets` shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetsDocument {
    /// Mapping from target name to source.
    Map(BTreeMap<String, TargetSourceDocument>),
    /// Sequence of named sources.
    List(Vec<NamedTargetSourceDocument>),
}

/// Target source in the mapping shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetSourceDocument {
    /// Template policy source.
    rego: String,
    /// Inline library modules.
    #[serde(default)]
    libs: Vec<String>,
}

/// Target source in the sequence shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamedTargetSourceDocument {
    /// Target name.
    target: String,
    /// Template policy source.
    rego: String,
    /// Inline library modules.
    #[serde(default)]
    libs: Vec<String>,
}

impl TargetsDocument {
    /// Flattens either shape into bindings.
    fn into_bindings(self) -> Vec<TargetBinding> {
        match self {
            Self::Map(map) => map
                .into_iter()
                .map(|(target, source)| TargetBinding {
                    target: TargetName::from(target.as_str()),
                    rego: source.rego,
                    libs: source.libs,
                })
                .collect(),
            Self::List(list) => list
                .into_iter()
                .map(|source| TargetBinding {
                    target: TargetName::from(source.target.as_str()),
                    rego: source.rego,
                    libs: source.libs,
                })
                .collect(),
        }
    }
}

/// Constraint document as written.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ConstraintDocument {
    /// Constraint group version.
    api_version: String,
    /// Generated kind of the owning template.
    kind: String,
    /// Document metadata.
    metadata: ObjectMeta,
    /// Constraint body.
    spec: ConstraintSpec,
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Parses policy files with compiled document schemas.
pub struct DocumentParser {
    /// Template document schema.
    template: Validator,
    /// Constraint document schema.
    constraint: Validator,
}

impl DocumentParser {
    /// Compiles the document schemas.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::BadConfig`] when a schema fails to compile.
    pub fn new() -> Result<Self, PolicyError> {
        Ok(Self {
            template: compile_document_schema("template.schema.json", &template_document_schema())?,
            constraint: compile_document_schema(
                "constraint.schema.json",
                &constraint_document_schema(),
            )?,
        })
    }

    /// Parses every document of one file, recording failures in `errors`.
    pub fn parse(&self, path: &str, text: &str, errors: &mut PolicyErrors) -> Vec<PolicyDocument> {
        let mut documents = Vec::new();
        for (index, raw) in serde_yaml::Deserializer::from_str(text).enumerate() {
            let document = match Value::deserialize(raw) {
                Ok(Value::Null) => continue,
                Ok(document) => document,
                Err(err) => {
                    errors.push(PolicyError::BadConfig {
                        path: path.to_string(),
                        reason: format!("document {index}: invalid yaml: {err}"),
                    });
                    break;
                }
            };
            match self.decode(path, index, &document) {
                Ok(decoded) => documents.push(decoded),
                Err(error) => errors.push(error),
            }
        }
        documents
    }

    /// Classifies, validates, and decodes one document.
    fn decode(&self, path: &str, index: usize, document: &Value) -> Result<PolicyDocument, PolicyError> {
        let Some(kind) = classify(document) else {
            let (api_version, kind) = header(document).unwrap_or(("", ""));
            warn!(path, index, api_version, kind, "unrecognized policy document");
            return Err(PolicyError::BadConfig {
                path: path.to_string(),
                reason: format!(
                    "document {index}: unrecognized apiVersion '{api_version}' with kind '{kind}'"
                ),
            });
        };
        let validator = match kind {
            DocumentKind::Template => &self.template,
            DocumentKind::Constraint => &self.constraint,
        };
        let messages = schema_messages(validator, document);
        if !messages.is_empty() {
            warn!(path, index, failures = messages.len(), "policy document failed schema validation");
            return Err(PolicyError::SchemaViolation {
                path: path.to_string(),
                messages,
            });
        }
        match kind {
            DocumentKind::Template => decode_template(path, index, document),
            DocumentKind::Constraint => decode_constraint(path, index, document),
        }
    }
}

/// Parses one file with a fresh parser.
///
/// # Errors
///
/// Returns [`PolicyErrors`] listing every failing document.
pub fn parse_documents(path: &str, text: &str) -> Result<Vec<PolicyDocument>, PolicyErrors> {
    let parser = DocumentParser::new()?;
    let mut errors = PolicyErrors::new();
    let documents = parser.parse(path, text, &mut errors);
    errors.into_result(documents)
}

/// Compiles a document schema under Draft 2020-12.
fn compile_document_schema(name: &str, schema: &Value) -> Result<Validator, PolicyError> {
    jsonschema::options().with_draft(Draft::Draft202012).build(schema).map_err(|err| {
        PolicyError::BadConfig {
            path: name.to_string(),
            reason: format!("invalid document schema: {err}"),
        }
    })
}

/// Decodes a validated template document.
fn decode_template(path: &str, index: usize, document: &Value) -> Result<PolicyDocument, PolicyError> {
    let decoded: TemplateDocument = serde_json::from_value(document.clone())
        .map_err(|err| bad_document(path, index, "template", &err))?;
    if decoded.kind != CONSTRAINT_TEMPLATE_KIND {
        return Err(PolicyError::BadConfig {
            path: path.to_string(),
            reason: format!("document {index}: template kind must be {CONSTRAINT_TEMPLATE_KIND}"),
        });
    }
    let crd = decoded.spec.crd.spec;
    debug!(
        path,
        index,
        kind = crd.names.kind.as_str(),
        plural = crd.names.plural.as_deref().unwrap_or_default(),
        short_names = crd.names.short_names.len(),
        "template decoded"
    );
    Ok(PolicyDocument::Template(Template {
        source_path: path.to_string(),
        api_version: decoded.api_version,
        metadata: decoded.metadata,
        generated_kind: TemplateKind::from(crd.names.kind.as_str()),
        parameter_schema: crd.validation.open_api_v3_schema,
        targets: decoded.spec.targets.into_bindings(),
    }))
}

/// Decodes a validated constraint document.
fn decode_constraint(path: &str, index: usize, document: &Value) -> Result<PolicyDocument, PolicyError> {
    let decoded: ConstraintDocument = serde_json::from_value(document.clone())
        .map_err(|err| bad_document(path, index, "constraint", &err))?;
    Ok(PolicyDocument::Constraint(Constraint {
        source_path: path.to_string(),
        api_version: decoded.api_version,
        kind: TemplateKind::from(decoded.kind.as_str()),
        metadata: decoded.metadata,
        spec: decoded.spec,
    }))
}

/// Builds the error for a document that passed its schema but failed to decode.
fn bad_document(path: &str, index: usize, what: &str, err: &serde_json::Error) -> PolicyError {
    PolicyError::BadConfig {
        path: path.to_string(),
        reason: format!("document {index}: invalid {what}: {err}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
