// crates/fleet-gate-config/src/schema.rs
// ============================================================================
// Module: Config Schemas
// Description: JSON schema builders for fleet-gate.toml and policy documents.
// Purpose: Provide canonical validation schemas for config and policy inputs.
// Dependencies: fleet-gate-core, serde_json
// ============================================================================

//! ## Overview
//! This module defines the JSON Schemas for the engine configuration file and
//! for the two declarative policy document kinds. Document schemas reject
//! additional properties at every level the loader understands; parameter
//! schemas and policy parameters stay open because their shape belongs to
//! each template.

use fleet_gate_core::CONSTRAINT_API_VERSIONS;
use fleet_gate_core::CONSTRAINT_TEMPLATE_KIND;
use fleet_gate_core::TEMPLATE_API_VERSIONS;
use serde_json::Value;
use serde_json::json;

use crate::config::MAX_POLICY_PATHS;
use crate::config::MAX_TOTAL_PATH_LENGTH;
use crate::config::MAX_WORKER_COUNT;

// ============================================================================
// SECTION: Config Schema
// ============================================================================

/// Returns the JSON schema for `fleet-gate.toml`.
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "fleet-gate://contract/schemas/config.schema.json",
        "title": "Fleet Gate Configuration",
        "description": "Configuration for the Fleet Gate policy engine.",
        "type": "object",
        "properties": {
            "engine": engine_config_schema(),
            "policy": policy_config_schema(),
            "object_store": {
                "oneOf": [
                    { "type": "null" },
                    object_store_schema()
                ],
                "default": null
            }
        },
        "required": ["policy"],
        "additionalProperties": false
    })
}

/// Schema for the engine configuration section.
fn engine_config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "worker_count": {
                "oneOf": [
                    { "type": "null" },
                    {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_WORKER_COUNT
                    }
                ],
                "default": null,
                "description": "Review worker threads; defaults to logical cores."
            }
        },
        "additionalProperties": false
    })
}

/// Schema for the policy configuration section.
fn policy_config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "paths": {
                "type": "array",
                "items": schema_for_location("Local path or s3:// URI holding policy documents."),
                "minItems": 1,
                "maxItems": MAX_POLICY_PATHS
            },
            "library_path": {
                "oneOf": [
                    { "type": "null" },
                    schema_for_location("Local path or s3:// URI holding Rego library modules.")
                ],
                "default": null
            }
        },
        "required": ["paths"],
        "additionalProperties": false
    })
}

/// Schema for the object-store section.
fn object_store_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "region": {
                "oneOf": [
                    { "type": "null" },
                    { "type": "string", "minLength": 1 }
                ],
                "default": null
            },
            "endpoint": {
                "oneOf": [
                    { "type": "null" },
                    { "type": "string", "pattern": "^https?://" }
                ],
                "default": null
            },
            "force_path_style": { "type": "boolean", "default": false },
            "allow_http": { "type": "boolean", "default": false }
        },
        "additionalProperties": false
    })
}

/// Schema for a policy location string.
fn schema_for_location(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "maxLength": MAX_TOTAL_PATH_LENGTH,
        "description": description
    })
}

// ============================================================================
// SECTION: Document Schemas
// ============================================================================

/// Returns the JSON schema for `ConstraintTemplate` documents.
///
/// Both `spec.targets` shapes validate: a mapping from target name to
/// `{rego, libs?}` and a sequence of `{target, rego, libs?}`.
#[must_use]
pub fn template_document_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "fleet-gate://contract/schemas/template.schema.json",
        "title": "Constraint Template",
        "type": "object",
        "properties": {
            "apiVersion": { "enum": TEMPLATE_API_VERSIONS },
            "kind": { "const": CONSTRAINT_TEMPLATE_KIND },
            "metadata": metadata_schema(),
            "spec": {
                "type": "object",
                "properties": {
                    "crd": crd_schema(),
                    "targets": {
                        "oneOf": [
                            {
                                "type": "object",
                                "minProperties": 1,
                                "additionalProperties": target_source_schema(false)
                            },
                            {
                                "type": "array",
                                "minItems": 1,
                                "items": target_source_schema(true)
                            }
                        ]
                    }
                },
                "required": ["crd", "targets"],
                "additionalProperties": false
            }
        },
        "required": ["apiVersion", "kind", "metadata", "spec"],
        "additionalProperties": false
    })
}

/// Returns the JSON schema for constraint documents.
#[must_use]
pub fn constraint_document_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "fleet-gate://contract/schemas/constraint.schema.json",
        "title": "Constraint",
        "type": "object",
        "properties": {
            "apiVersion": { "enum": CONSTRAINT_API_VERSIONS },
            "kind": {
                "type": "string",
                "minLength": 1,
                "not": { "const": CONSTRAINT_TEMPLATE_KIND }
            },
            "metadata": metadata_schema(),
            "spec": {
                "type": "object",
                "properties": {
                    "severity": { "type": "string" },
                    "match": {
                        "type": "object",
                        "properties": {
                            "target": string_array_schema(),
                            "exclude": string_array_schema()
                        },
                        "additionalProperties": false
                    },
                    "parameters": { "type": "object" }
                },
                "additionalProperties": false
            }
        },
        "required": ["apiVersion", "kind", "metadata", "spec"],
        "additionalProperties": false
    })
}

/// Schema for document metadata.
fn metadata_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "minLength": 1 },
            "labels": string_map_schema(),
            "annotations": string_map_schema()
        },
        "required": ["name"],
        "additionalProperties": false
    })
}

/// Schema for `spec.crd`.
fn crd_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "spec": {
                "type": "object",
                "properties": {
                    "names": {
                        "type": "object",
                        "properties": {
                            "kind": { "type": "string", "minLength": 1 },
                            "plural": { "type": "string" },
                            "shortNames": string_array_schema()
                        },
                        "required": ["kind"],
                        "additionalProperties": false
                    },
                    "validation": {
                        "type": "object",
                        "properties": {
                            "openAPIV3Schema": { "type": "object" }
                        },
                        "required": ["openAPIV3Schema"],
                        "additionalProperties": false
                    }
                },
                "required": ["names", "validation"],
                "additionalProperties": false
            }
        },
        "required": ["spec"],
        "additionalProperties": false
    })
}

/// Schema for one target binding; the sequence shape also names the target.
fn target_source_schema(named: bool) -> Value {
    let mut properties = json!({
        "rego": { "type": "string", "minLength": 1 },
        "libs": string_array_schema()
    });
    let mut required = vec!["rego"];
    if named && let Some(map) = properties.as_object_mut() {
        map.insert("target".to_string(), json!({ "type": "string", "minLength": 1 }));
        required.push("target");
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Schema for an array of strings.
fn string_array_schema() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" }
    })
}

/// Schema for a string-to-string map.
fn string_map_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": { "type": "string" }
    })
}
