// crates/fleet-gate-core/src/runtime/cloud_asset.rs
// ============================================================================
// Module: Fleet Gate Cloud Asset Target
// Description: Target for cloud asset inventory records.
// Purpose: Accept Google API asset types and normalize their envelope.
// Dependencies: crate::core, crate::runtime::target
// ============================================================================

//! ## Overview
//! The cloud asset target handles every asset whose type names a Google API
//! service (`<service>.googleapis.com/<Kind>`). The review object is the
//! normalized envelope: `name`, `asset_type`, `ancestry_path`, and the single
//! payload field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::asset::Asset;
use crate::core::identifiers::TargetName;
use crate::runtime::target::BoundSet;
use crate::runtime::target::Target;
use crate::runtime::target::render_preamble;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cloud asset target name.
pub const CLOUD_ASSET_TARGET: &str = "validation.gcp.forsetisecurity.org";

/// Service suffix of Google API asset types.
const GOOGLE_API_SUFFIX: &str = ".googleapis.com";

/// Review guard conditions.
const REVIEW_GUARD: [&str; 3] = [
    "is_string(input.review.name)",
    "is_string(input.review.asset_type)",
    "is_string(input.review.ancestry_path)",
];

// ============================================================================
// SECTION: Target
// ============================================================================

/// Cloud asset inventory target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloudAssetTarget;

/// Returns true when the asset type names a Google API service.
#[must_use]
pub fn is_google_api_type(asset_type: &str) -> bool {
    asset_type
        .split_once('/')
        .is_some_and(|(service, kind)| service.ends_with(GOOGLE_API_SUFFIX) && !kind.is_empty())
}

impl Target for CloudAssetTarget {
    fn name(&self) -> TargetName {
        TargetName::from(CLOUD_ASSET_TARGET)
    }

    fn preamble(&self, bound: &BoundSet) -> String {
        render_preamble(&self.name(), bound, &REVIEW_GUARD)
    }

    fn handle_review(&self, asset: &Asset) -> Option<Value> {
        is_google_api_type(asset.asset_type()).then(|| asset.to_envelope())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
