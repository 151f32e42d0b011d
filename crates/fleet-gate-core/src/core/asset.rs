// crates/fleet-gate-core/src/core/asset.rs
// ============================================================================
// Module: Fleet Gate Assets
// Description: Normalized resource records submitted for review.
// Purpose: Enforce the asset envelope invariants before any evaluation.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! An [`Asset`] is one resource plus its ancestry context. Assets arrive as
//! JSON objects; [`Asset::from_json`] checks the required fields, derives the
//! canonical ancestry path and enforces the one-payload invariant. Nothing is
//! forwarded to a target or an evaluator unless this succeeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::ancestry::ancestry_from_ancestors;
use crate::core::ancestry::canonicalize_ancestry;
use crate::core::errors::ReviewError;

// ============================================================================
// SECTION: Payload Kinds
// ============================================================================

/// Payload field carried by an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetPayloadKind {
    /// Cloud resource data.
    Resource,
    /// IAM policy.
    IamPolicy,
    /// Organization policy.
    OrgPolicy,
    /// Access context manager policy.
    AccessPolicy,
    /// Access context manager level.
    AccessLevel,
    /// VPC service perimeter.
    ServicePerimeter,
}

impl AssetPayloadKind {
    /// Every payload kind, in envelope field order.
    pub const ALL: [Self; 6] = [
        Self::Resource,
        Self::IamPolicy,
        Self::OrgPolicy,
        Self::AccessPolicy,
        Self::AccessLevel,
        Self::ServicePerimeter,
    ];

    /// Returns the JSON field name for the payload.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::IamPolicy => "iam_policy",
            Self::OrgPolicy => "org_policy",
            Self::AccessPolicy => "access_policy",
            Self::AccessLevel => "access_level",
            Self::ServicePerimeter => "service_perimeter",
        }
    }
}

// ============================================================================
// SECTION: Asset
// ============================================================================

/// Resource under review.
///
/// # Invariants
/// - `name`, `asset_type`, and `ancestry_path` are non-empty.
/// - `ancestry_path` is canonical.
/// - Exactly one payload is present.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Globally unique asset name.
    name: String,
    /// Qualified asset type.
    asset_type: String,
    /// Canonical ancestry path.
    ancestry_path: String,
    /// Payload field kind.
    payload_kind: AssetPayloadKind,
    /// Payload value.
    payload: Value,
}

impl Asset {
    /// Builds an asset from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::MalformedAsset`] when `name` or `asset_type` are
    /// missing or the payload count is not one, and
    /// [`ReviewError::MissingAncestry`] when no ancestry can be derived.
    pub fn from_json(value: &Value) -> Result<Self, ReviewError> {
        let Some(object) = value.as_object() else {
            return Err(ReviewError::MalformedAsset {
                asset: String::new(),
                reason: "asset must be a JSON object".to_string(),
            });
        };
        let name = object.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(ReviewError::MalformedAsset {
                asset: name,
                reason: "missing name".to_string(),
            });
        }
        let asset_type =
            object.get("asset_type").and_then(Value::as_str).unwrap_or_default().to_string();
        if asset_type.is_empty() {
            return Err(ReviewError::MalformedAsset {
                asset: name,
                reason: "missing asset_type".to_string(),
            });
        }
        let ancestry_path = derive_ancestry(&name, object)?;
        let (payload_kind, payload) = single_payload(&name, object)?;
        Ok(Self {
            name,
            asset_type,
            ancestry_path,
            payload_kind,
            payload,
        })
    }

    /// Returns the asset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the asset type.
    #[must_use]
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Returns the canonical ancestry path.
    #[must_use]
    pub fn ancestry_path(&self) -> &str {
        &self.ancestry_path
    }

    /// Returns the payload kind.
    #[must_use]
    pub const fn payload_kind(&self) -> AssetPayloadKind {
        self.payload_kind
    }

    /// Returns the payload value.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the normalized JSON envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Value {
        let mut envelope = Map::new();
        envelope.insert("name".to_string(), Value::String(self.name.clone()));
        envelope.insert("asset_type".to_string(), Value::String(self.asset_type.clone()));
        envelope.insert("ancestry_path".to_string(), Value::String(self.ancestry_path.clone()));
        envelope.insert(self.payload_kind.field_name().to_string(), self.payload.clone());
        Value::Object(envelope)
    }
}

/// Derives the canonical ancestry path from `ancestors` or `ancestry_path`.
fn derive_ancestry(name: &str, object: &Map<String, Value>) -> Result<String, ReviewError> {
    if let Some(ancestors) = object.get("ancestors").filter(|value| !value.is_null()) {
        let Some(items) = ancestors.as_array() else {
            return Err(ReviewError::MalformedAsset {
                asset: name.to_string(),
                reason: "ancestors must be an array of strings".to_string(),
            });
        };
        let mut segments = Vec::with_capacity(items.len());
        for item in items {
            let Some(segment) = item.as_str() else {
                return Err(ReviewError::MalformedAsset {
                    asset: name.to_string(),
                    reason: "ancestors must be an array of strings".to_string(),
                });
            };
            segments.push(segment);
        }
        let path = ancestry_from_ancestors(&segments);
        if !path.is_empty() {
            return Ok(path);
        }
    }
    let path = object
        .get("ancestry_path")
        .and_then(Value::as_str)
        .map(canonicalize_ancestry)
        .unwrap_or_default();
    if path.is_empty() {
        return Err(ReviewError::MissingAncestry {
            asset: name.to_string(),
        });
    }
    Ok(path)
}

/// Returns the single non-null payload field.
fn single_payload(
    name: &str,
    object: &Map<String, Value>,
) -> Result<(AssetPayloadKind, Value), ReviewError> {
    let present: Vec<AssetPayloadKind> = AssetPayloadKind::ALL
        .into_iter()
        .filter(|kind| object.get(kind.field_name()).is_some_and(|value| !value.is_null()))
        .collect();
    match present.as_slice() {
        [kind] => {
            let payload = object.get(kind.field_name()).cloned().unwrap_or(Value::Null);
            Ok((*kind, payload))
        }
        [] => Err(ReviewError::MalformedAsset {
            asset: name.to_string(),
            reason: "exactly one payload is required, found none".to_string(),
        }),
        many => Err(ReviewError::MalformedAsset {
            asset: name.to_string(),
            reason: format!(
                "exactly one payload is required, found {}",
                many.iter().map(|kind| kind.field_name()).collect::<Vec<_>>().join(", ")
            ),
        }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
