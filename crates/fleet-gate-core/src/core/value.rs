// crates/fleet-gate-core/src/core/value.rs
// ============================================================================
// Module: Fleet Gate Policy Values
// Description: Tagged value tree for evaluator output and violation metadata.
// Purpose: Replace untyped evaluator JSON with a closed, ordered variant tree.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Evaluator results arrive as arbitrary nested JSON. They are converted into
//! [`PolicyValue`] at the canonicalization boundary; downstream code only sees
//! the tagged form. Maps are [`BTreeMap`]s so serialized metadata is always in
//! sorted key order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Policy Value
// ============================================================================

/// Ordered map of policy values.
pub type PolicyMap = BTreeMap<String, PolicyValue>;

/// Tagged value tree.
///
/// # Invariants
/// - Map keys are unique and iterate in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyValue {
    /// JSON null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (lossless JSON number).
    Number(Number),
    /// UTF-8 string.
    String(String),
    /// Ordered list.
    List(Vec<PolicyValue>),
    /// Key-sorted map.
    Map(PolicyMap),
}

impl PolicyValue {
    /// Returns the map payload when the value is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&PolicyMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the string payload when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Converts the value back into untyped JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(number) => Value::Number(number.clone()),
            Self::String(value) => Value::String(value.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter().map(|(key, value)| (key.clone(), value.to_json())).collect(),
            ),
        }
    }

    /// Builds a map value from string pairs.
    #[must_use]
    pub fn string_map(entries: &BTreeMap<String, String>) -> Self {
        Self::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), Self::String(value.clone())))
                .collect(),
        )
    }
}

impl From<&Value> for PolicyValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(*value),
            Value::Number(number) => Self::Number(number.clone()),
            Value::String(value) => Self::String(value.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.iter().map(|(key, value)| (key.clone(), Self::from(value))).collect(),
            ),
        }
    }
}

impl From<Value> for PolicyValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl From<&str> for PolicyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
