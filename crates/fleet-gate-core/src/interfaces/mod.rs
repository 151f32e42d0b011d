// crates/fleet-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Fleet Gate Interfaces
// Description: Backend-agnostic policy-language runtime contract.
// Purpose: Define the compile/evaluate surface used by the review engine.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The policy-language interpreter is a black box behind [`PolicyRuntime`].
//! The engine hands it one [`CompileUnit`] per template/target pair and later
//! evaluates the compiled artifact against `{review, parameters, constraint}`
//! inputs. Implementations must be deterministic for a given input and must
//! tolerate concurrent `evaluate` calls on a shared artifact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::TargetName;
use crate::core::identifiers::TemplateKind;

// ============================================================================
// SECTION: Compile Units
// ============================================================================

/// Role of a module inside a compile unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRole {
    /// Target preamble.
    Preamble,
    /// Shared or inline library module.
    Library,
    /// Template policy source.
    Template,
}

/// One policy-language module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModule {
    /// Module name used in diagnostics.
    pub name: String,
    /// Module source.
    pub source: String,
    /// Module role.
    pub role: ModuleRole,
}

/// Modules compiled together for one template/target pair.
///
/// # Invariants
/// - Modules are ordered preamble, libraries, template source.
/// - Exactly one module has [`ModuleRole::Template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Template generated kind.
    pub template: TemplateKind,
    /// Target name.
    pub target: TargetName,
    /// Ordered modules.
    pub modules: Vec<PolicyModule>,
}

impl CompileUnit {
    /// Returns the template source module.
    #[must_use]
    pub fn template_module(&self) -> Option<&PolicyModule> {
        self.modules.iter().find(|module| module.role == ModuleRole::Template)
    }
}

// ============================================================================
// SECTION: Evaluation Results
// ============================================================================

/// Raw evaluator result before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Violation message (empty when the evaluator omitted it).
    pub message: String,
    /// Evaluator details (expected to be an object).
    pub details: Value,
}

/// Policy runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Compiler rejected the unit.
    #[error("compile error: {0}")]
    Compile(String),
    /// Evaluator failed.
    #[error("evaluation error: {0}")]
    Evaluate(String),
}

// ============================================================================
// SECTION: Policy Runtime
// ============================================================================

/// Policy-language compile and evaluate capability.
pub trait PolicyRuntime: Send + Sync {
    /// Compiled artifact shared across worker threads.
    type Compiled: Send + Sync;

    /// Compiles a unit into an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Compile`] with the compiler diagnostic.
    fn compile(&self, unit: &CompileUnit) -> Result<Self::Compiled, RuntimeError>;

    /// Evaluates an artifact against one input document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Evaluate`] when the interpreter fails.
    fn evaluate(
        &self,
        compiled: &Self::Compiled,
        input: &Value,
    ) -> Result<Vec<RawResult>, RuntimeError>;
}
