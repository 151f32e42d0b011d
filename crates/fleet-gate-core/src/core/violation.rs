// crates/fleet-gate-core/src/core/violation.rs
// ============================================================================
// Module: Fleet Gate Violations
// Description: Review results, violations, and insight projections.
// Purpose: Carry policy failures with provenance back to their constraint.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ReviewResult`] is the outcome of reviewing one asset. Each
//! [`ConstraintViolation`] keeps a shared reference to its owning
//! [`Constraint`]; [`Violation`] is the flattened external form and
//! [`Insight`] the finding-style projection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::errors::ReviewError;
use crate::core::identifiers::ConstraintName;
use crate::core::policy::Constraint;
use crate::core::value::PolicyMap;
use crate::core::value::PolicyValue;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Insight category reported for every violation.
pub const INSIGHT_CATEGORY: &str = "SECURITY";

// ============================================================================
// SECTION: Review Results
// ============================================================================

/// One canonicalized violation produced while reviewing an asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    /// Violation message.
    pub message: String,
    /// Canonical metadata (sorted keys).
    pub metadata: PolicyMap,
    /// Qualified constraint name.
    pub constraint_name: ConstraintName,
    /// Owning constraint.
    pub constraint: Arc<Constraint>,
    /// Constraint severity (empty when unset).
    pub severity: String,
}

impl ConstraintViolation {
    /// Flattens the violation into its external form.
    #[must_use]
    pub fn to_violation(&self, resource_name: &str) -> Violation {
        Violation {
            constraint_name: self.constraint_name.clone(),
            resource_name: resource_name.to_string(),
            message: self.message.clone(),
            metadata: self.metadata.clone(),
            severity: self.severity.clone(),
            constraint_config: self.constraint.config_echo(),
        }
    }
}

/// Outcome of reviewing one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    /// Asset name.
    pub asset_name: String,
    /// Asset as submitted.
    pub original_resource: Value,
    /// Review object after target-specific normalization.
    pub reviewed_resource: Value,
    /// Violations in constraint registry order.
    pub violations: Vec<ConstraintViolation>,
    /// Results skipped because they broke the canonicalization contract.
    pub skipped: Vec<ReviewError>,
}

impl ReviewResult {
    /// Returns the violations in external form.
    #[must_use]
    pub fn to_violations(&self) -> Vec<Violation> {
        self.violations.iter().map(|violation| violation.to_violation(&self.asset_name)).collect()
    }
}

// ============================================================================
// SECTION: External Forms
// ============================================================================

/// External violation form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Qualified constraint name (`Kind.Name`).
    pub constraint_name: ConstraintName,
    /// Asset name.
    pub resource_name: String,
    /// Violation message.
    pub message: String,
    /// Canonical metadata.
    pub metadata: PolicyMap,
    /// Constraint severity.
    pub severity: String,
    /// Echo of the constraint document.
    pub constraint_config: Value,
}

/// Finding-style projection of a violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    /// Violation message.
    pub description: String,
    /// Affected asset names.
    pub target_resources: Vec<String>,
    /// Qualified constraint name.
    pub subtype: String,
    /// Metadata and constraint provenance.
    pub content: PolicyMap,
    /// Insight category.
    pub category: String,
}

impl From<&Violation> for Insight {
    fn from(violation: &Violation) -> Self {
        let mut content = PolicyMap::new();
        content.insert("metadata".to_string(), PolicyValue::Map(violation.metadata.clone()));
        content.insert("severity".to_string(), PolicyValue::from(violation.severity.as_str()));
        content.insert(
            "constraint_config".to_string(),
            PolicyValue::from(&violation.constraint_config),
        );
        Self {
            description: violation.message.clone(),
            target_resources: vec![violation.resource_name.clone()],
            subtype: violation.constraint_name.as_str().to_string(),
            content,
            category: INSIGHT_CATEGORY.to_string(),
        }
    }
}
