// crates/fleet-gate-core/src/runtime/admission.rs
// ============================================================================
// Module: Fleet Gate Admission Target
// Description: Target for Kubernetes objects wrapped as assets.
// Purpose: Unwrap embedded objects into admission-request envelopes.
// Dependencies: crate::core, crate::runtime::target, serde_json
// ============================================================================

//! ## Overview
//! The admission target handles `resource` payloads whose `data` is a
//! Kubernetes object (string `apiVersion` and `kind`) and whose asset type is
//! not a Google API type. The object is unwrapped, annotated with its ancestry
//! path, and wrapped in an admission request:
//! `{kind{group, version, kind}, name, namespace, operation, object}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::asset::Asset;
use crate::core::asset::AssetPayloadKind;
use crate::core::identifiers::TargetName;
use crate::runtime::cloud_asset::is_google_api_type;
use crate::runtime::target::BoundSet;
use crate::runtime::target::Target;
use crate::runtime::target::render_preamble;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Admission target name.
pub const ADMISSION_TARGET: &str = "admission.k8s.gatekeeper.sh";

/// Annotation carrying the asset ancestry path.
pub const ANCESTRY_ANNOTATION: &str = "fleet-gate.io/ancestry-path";

/// Operation reported for every admission request.
const ADMISSION_OPERATION: &str = "CREATE";

/// Review guard conditions.
const REVIEW_GUARD: [&str; 3] = [
    "is_object(input.review.object)",
    "is_string(input.review.kind.kind)",
    "is_string(input.review.name)",
];

// ============================================================================
// SECTION: Target
// ============================================================================

/// Kubernetes admission target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionTarget;

impl Target for AdmissionTarget {
    fn name(&self) -> TargetName {
        TargetName::from(ADMISSION_TARGET)
    }

    fn preamble(&self, bound: &BoundSet) -> String {
        render_preamble(&self.name(), bound, &REVIEW_GUARD)
    }

    fn handle_review(&self, asset: &Asset) -> Option<Value> {
        if asset.payload_kind() != AssetPayloadKind::Resource || is_google_api_type(asset.asset_type()) {
            return None;
        }
        let object = asset.payload().get("data")?.as_object()?;
        let api_version = object.get("apiVersion")?.as_str()?;
        let kind = object.get("kind")?.as_str()?;
        let (group, version) = api_version.rsplit_once('/').unwrap_or(("", api_version));

        let mut object = object.clone();
        let metadata = object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
        let name = metadata.get("name").and_then(Value::as_str).unwrap_or(asset.name()).to_string();
        let namespace = metadata.get("namespace").and_then(Value::as_str).unwrap_or_default().to_string();
        let annotations = metadata
            .entry("annotations")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
        annotations.insert(
            ANCESTRY_ANNOTATION.to_string(),
            Value::String(asset.ancestry_path().to_string()),
        );

        let mut gvk = Map::new();
        gvk.insert("group".to_string(), Value::String(group.to_string()));
        gvk.insert("version".to_string(), Value::String(version.to_string()));
        gvk.insert("kind".to_string(), Value::String(kind.to_string()));

        let mut request = Map::new();
        request.insert("kind".to_string(), Value::Object(gvk));
        request.insert("name".to_string(), Value::String(name));
        request.insert("namespace".to_string(), Value::String(namespace));
        request.insert("operation".to_string(), Value::String(ADMISSION_OPERATION.to_string()));
        request.insert("object".to_string(), Value::Object(object));
        Some(Value::Object(request))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
