// crates/fleet-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Fleet Gate Review Engine
// Description: Build the per-target engines and review single assets.
// Purpose: Route each asset, evaluate matching constraints, and canonicalize.
// Dependencies: crate::core, crate::interfaces, serde_json, tokio-util, tracing
// ============================================================================

//! ## Overview
//! [`ReviewEngine::new`] registers templates, binds constraints, and compiles
//! every template/target pair; it either succeeds fully or returns every
//! failure at once. The engine is immutable afterwards and can be shared
//! across threads.
//!
//! Review order is deterministic: targets are offered the asset in
//! registration order, constraints are evaluated in library order, and each
//! evaluator result list is kept in evaluator order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::core::asset::Asset;
use crate::core::errors::PolicyErrors;
use crate::core::errors::ReviewError;
use crate::core::identifiers::ConstraintName;
use crate::core::identifiers::TargetName;
use crate::core::identifiers::TemplateKind;
use crate::core::policy::PolicyLibrary;
use crate::core::violation::ReviewResult;
use crate::interfaces::PolicyRuntime;
use crate::runtime::binder::BoundConstraint;
use crate::runtime::binder::bind_constraints;
use crate::runtime::canonical::canonicalize;
use crate::runtime::compiler::TemplateRegistry;
use crate::runtime::compiler::compile_templates;
use crate::runtime::target::BuiltinTarget;
use crate::runtime::target::Target;

// ============================================================================
// SECTION: Target Engines
// ============================================================================

/// Compiled templates and bound constraints of one target.
struct TargetEngine<C> {
    /// Target capabilities.
    target: BuiltinTarget,
    /// Compiled templates keyed by generated kind.
    compiled: BTreeMap<TemplateKind, C>,
    /// Bound constraints in library order.
    constraints: Vec<BoundConstraint>,
}

// ============================================================================
// SECTION: Review Engine
// ============================================================================

/// Immutable policy review engine.
///
/// # Invariants
/// - Every bound constraint has a compiled template for its target.
pub struct ReviewEngine<R: PolicyRuntime> {
    /// Policy-language runtime.
    runtime: R,
    /// Per-target engines in registration order.
    targets: Vec<TargetEngine<R::Compiled>>,
}

impl<R: PolicyRuntime> ReviewEngine<R> {
    /// Builds an engine from a loaded policy library.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyErrors`] listing every registration, binding, and
    /// compile failure.
    pub fn new(runtime: R, library: &PolicyLibrary) -> Result<Self, PolicyErrors> {
        let mut errors = PolicyErrors::new();
        let registry = TemplateRegistry::register(&library.templates, &mut errors);
        let mut bindings = bind_constraints(&library.constraints, &registry, &mut errors);
        let mut compiled =
            compile_templates(&runtime, &registry, &library.modules, &bindings, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        let targets: Vec<TargetEngine<R::Compiled>> = BuiltinTarget::all()
            .into_iter()
            .map(|target| {
                let name = target.name();
                TargetEngine {
                    target,
                    compiled: compiled.remove(&name).unwrap_or_default(),
                    constraints: bindings.remove(&name).unwrap_or_default(),
                }
            })
            .collect();
        info!(
            templates = library.templates.len(),
            constraints = library.constraints.len(),
            modules = library.modules.len(),
            "review engine built"
        );
        Ok(Self {
            runtime,
            targets,
        })
    }

    /// Returns the qualified names bound to a target, in evaluation order.
    #[must_use]
    pub fn constraint_names(&self, target: &TargetName) -> Vec<ConstraintName> {
        self.targets
            .iter()
            .filter(|engine| &engine.target.name() == target)
            .flat_map(|engine| engine.constraints.iter().map(|bound| bound.name.clone()))
            .collect()
    }

    /// Reviews one asset.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] when the asset is malformed, unroutable, or an
    /// evaluation fails, and [`ReviewError::Cancelled`] when `cancel` fires.
    pub fn review(
        &self,
        input: &Value,
        cancel: &CancellationToken,
    ) -> Result<ReviewResult, ReviewError> {
        let asset = Asset::from_json(input)?;
        let (engine, review) = self.route(&asset)?;
        let mut result = ReviewResult {
            asset_name: asset.name().to_string(),
            original_resource: input.clone(),
            reviewed_resource: review.clone(),
            violations: Vec::new(),
            skipped: Vec::new(),
        };

        let mut evaluator_input = Map::new();
        evaluator_input.insert("review".to_string(), review);
        for bound in &engine.constraints {
            if cancel.is_cancelled() {
                return Err(ReviewError::Cancelled {
                    asset: asset.name().to_string(),
                });
            }
            if !bound.rule.matches(asset.ancestry_path()) {
                continue;
            }
            let Some(compiled) = engine.compiled.get(&bound.constraint.kind) else {
                return Err(ReviewError::EvaluatorFailure {
                    asset: asset.name().to_string(),
                    constraint: bound.name.to_string(),
                    message: "no compiled template for constraint kind".to_string(),
                });
            };
            evaluator_input
                .insert("parameters".to_string(), bound.constraint.spec.parameters.clone());
            evaluator_input.insert("constraint".to_string(), bound.config.clone());
            let raw_results = self
                .runtime
                .evaluate(compiled, &Value::Object(evaluator_input.clone()))
                .map_err(|err| ReviewError::EvaluatorFailure {
                    asset: asset.name().to_string(),
                    constraint: bound.name.to_string(),
                    message: err.to_string(),
                })?;
            for raw in &raw_results {
                match canonicalize(&asset, bound, raw) {
                    Ok(violation) => result.violations.push(violation),
                    Err(err) => {
                        debug!(asset = asset.name(), constraint = %bound.name, error = %err, "result skipped");
                        result.skipped.push(err);
                    }
                }
            }
        }
        Ok(result)
    }

    /// Offers the asset to targets in registration order.
    fn route(&self, asset: &Asset) -> Result<(&TargetEngine<R::Compiled>, Value), ReviewError> {
        self.targets
            .iter()
            .find_map(|engine| engine.target.handle_review(asset).map(|review| (engine, review)))
            .ok_or_else(|| ReviewError::UnroutableAsset {
                asset: asset.name().to_string(),
                asset_type: asset.asset_type().to_string(),
            })
    }
}
