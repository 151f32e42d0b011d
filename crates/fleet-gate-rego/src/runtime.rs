// crates/fleet-gate-rego/src/runtime.rs
// ============================================================================
// Module: Rego Runtime
// Description: regorus-backed compile and evaluate implementation.
// Purpose: Run compiled template units against review inputs.
// Dependencies: fleet-gate-core, regorus, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`RegoRuntime::compile`] qualifies aliased imports, loads every module of
//! a unit into a fresh `regorus::Engine`, and records the template package. [`RegoRuntime`]
//! evaluation clones that engine, sets the input, checks the target guard
//! `data.target.valid_review`, and collects the `violation` and `deny` sets
//! of the template package.
//!
//! # Invariants
//! - The shared compiled engine is only cloned, never evaluated in place.
//! - A review that fails the target guard is an evaluation error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;

use fleet_gate_core::CompileUnit;
use fleet_gate_core::ModuleRole;
use fleet_gate_core::PolicyRuntime;
use fleet_gate_core::RawResult;
use fleet_gate_core::RuntimeError;
use regorus::Engine;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::imports::qualify_imports;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rules of the template package that report violations, in evaluation order.
pub const VIOLATION_RULES: [&str; 2] = ["violation", "deny"];

/// Query for the target guard.
const GUARD_QUERY: &str = "data.target.valid_review";

/// Key holding a violation message.
const MESSAGE_KEY: &str = "msg";

/// Key holding violation details.
const DETAILS_KEY: &str = "details";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures inside the Rego backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegoError {
    /// A module failed to parse.
    #[error("{module}: {message}")]
    Parse {
        /// Module name.
        module: String,
        /// Interpreter diagnostic.
        message: String,
    },
    /// The unit carries no template module.
    #[error("compile unit for {0} has no template module")]
    MissingTemplate(String),
    /// A query failed.
    #[error("query {query} failed: {message}")]
    Query {
        /// Query text.
        query: String,
        /// Interpreter diagnostic.
        message: String,
    },
    /// A value could not cross the JSON boundary.
    #[error("value conversion failed: {0}")]
    Convert(String),
    /// The review failed the target guard.
    #[error("review rejected by {GUARD_QUERY}")]
    GuardRejected,
}

// ============================================================================
// SECTION: Compiled Units
// ============================================================================

/// Compiled template unit.
pub struct CompiledRego {
    /// Interpreter holding every module of the unit.
    engine: Mutex<Engine>,
    /// Template package path, e.g. `data.templates.gcp.Example`.
    package: String,
}

impl CompiledRego {
    /// Returns the template package path.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns a private interpreter copy.
    fn instance(&self) -> Engine {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Rego implementation of [`PolicyRuntime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegoRuntime;

impl RegoRuntime {
    /// Creates a runtime.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads a unit into a fresh interpreter.
    fn load(unit: &CompileUnit) -> Result<CompiledRego, RegoError> {
        let mut engine = Engine::new();
        let mut package = None;
        for module in &unit.modules {
            let source = qualify_imports(&module.source);
            let loaded = engine.add_policy(module.name.clone(), source).map_err(|err| {
                RegoError::Parse {
                    module: module.name.clone(),
                    message: err.to_string(),
                }
            })?;
            if module.role == ModuleRole::Template {
                package = Some(loaded);
            }
        }
        let package = package.ok_or_else(|| RegoError::MissingTemplate(unit.template.to_string()))?;
        debug!(
            template = %unit.template,
            target = %unit.target,
            package = package.as_str(),
            modules = unit.modules.len(),
            "rego unit compiled"
        );
        Ok(CompiledRego {
            engine: Mutex::new(engine),
            package,
        })
    }

    /// Evaluates a compiled unit against one input.
    fn run(compiled: &CompiledRego, input: &Value) -> Result<Vec<RawResult>, RegoError> {
        let mut engine = compiled.instance();
        let input = regorus::Value::from_json_str(&input.to_string())
            .map_err(|err| RegoError::Convert(err.to_string()))?;
        engine.set_input(input);
        if !query(&mut engine, GUARD_QUERY)?.iter().any(|value| value == &Value::Bool(true)) {
            return Err(RegoError::GuardRejected);
        }
        let mut results = Vec::new();
        for rule in VIOLATION_RULES {
            for value in query(&mut engine, &format!("{}.{rule}", compiled.package))? {
                if let Value::Array(entries) = value {
                    results.extend(entries.into_iter().map(raw_result));
                }
            }
        }
        Ok(results)
    }
}

impl PolicyRuntime for RegoRuntime {
    type Compiled = CompiledRego;

    fn compile(&self, unit: &CompileUnit) -> Result<Self::Compiled, RuntimeError> {
        Self::load(unit).map_err(|err| RuntimeError::Compile(err.to_string()))
    }

    fn evaluate(
        &self,
        compiled: &Self::Compiled,
        input: &Value,
    ) -> Result<Vec<RawResult>, RuntimeError> {
        Self::run(compiled, input).map_err(|err| RuntimeError::Evaluate(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a query and returns every defined expression value as JSON.
fn query(engine: &mut Engine, text: &str) -> Result<Vec<Value>, RegoError> {
    let results = engine.eval_query(text.to_string(), false).map_err(|err| RegoError::Query {
        query: text.to_string(),
        message: err.to_string(),
    })?;
    let mut values = Vec::new();
    for result in results.result {
        for expression in result.expressions {
            if expression.value == regorus::Value::Undefined {
                continue;
            }
            values.push(
                serde_json::to_value(&expression.value)
                    .map_err(|err| RegoError::Convert(err.to_string()))?,
            );
        }
    }
    Ok(values)
}

/// Converts one violation set element into a raw result.
///
/// Elements without a string `msg` produce an empty message, which the
/// canonicalizer records as malformed.
fn raw_result(entry: Value) -> RawResult {
    let Value::Object(mut fields) = entry else {
        return RawResult {
            message: String::new(),
            details: entry,
        };
    };
    RawResult {
        message: fields
            .remove(MESSAGE_KEY)
            .and_then(|message| message.as_str().map(str::to_string))
            .unwrap_or_default(),
        details: fields.remove(DETAILS_KEY).unwrap_or(Value::Null),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
