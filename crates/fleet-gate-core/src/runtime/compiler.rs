// crates/fleet-gate-core/src/runtime/compiler.rs
// ============================================================================
// Module: Fleet Gate Template Compiler
// Description: Register template schemas and compile target bindings.
// Purpose: Produce compiled artifacts keyed by (target, generated kind).
// Dependencies: crate::core, crate::interfaces, jsonschema, tracing
// ============================================================================

//! ## Overview
//! Compilation runs in two passes. Registration validates every template's
//! generated kind, parameter schema, and target names, producing a
//! [`TemplateRegistry`]. Once constraints are bound, each template/target
//! pair is compiled from `[preamble, library modules, inline libs, source]`
//! through the [`PolicyRuntime`]. All failures are accumulated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use jsonschema::Validator;
use tracing::debug;

use crate::core::errors::PolicyError;
use crate::core::errors::PolicyErrors;
use crate::core::identifiers::TargetName;
use crate::core::identifiers::TemplateKind;
use crate::core::policy::LibraryModule;
use crate::core::policy::Template;
use crate::interfaces::CompileUnit;
use crate::interfaces::ModuleRole;
use crate::interfaces::PolicyModule;
use crate::interfaces::PolicyRuntime;
use crate::runtime::binder::BindingTable;
use crate::runtime::binder::bound_set;
use crate::runtime::binder::compile_parameter_schema;
use crate::runtime::target::BuiltinTarget;
use crate::runtime::target::Target;

// ============================================================================
// SECTION: Template Registry
// ============================================================================

/// Template accepted by registration.
pub struct RegisteredTemplate<'a> {
    /// Source template.
    pub template: &'a Template,
    /// Compiled parameter schema.
    pub parameters: Validator,
    /// Targets the template binds, in document order.
    pub targets: Vec<BuiltinTarget>,
}

/// Registry of templates keyed by generated kind.
///
/// # Invariants
/// - A kind is either registered or rejected, never both.
#[derive(Default)]
pub struct TemplateRegistry<'a> {
    /// Accepted templates.
    entries: BTreeMap<TemplateKind, RegisteredTemplate<'a>>,
    /// Kinds whose templates failed registration.
    rejected: BTreeSet<TemplateKind>,
}

impl<'a> TemplateRegistry<'a> {
    /// Registers every template, recording failures.
    pub fn register(templates: &'a [Template], errors: &mut PolicyErrors) -> Self {
        let mut registry = Self::default();
        for template in templates {
            let kind = &template.generated_kind;
            if registry.entries.contains_key(kind) || registry.rejected.contains(kind) {
                errors.push(PolicyError::BadConfig {
                    path: template.source_path.clone(),
                    reason: format!("duplicate generated kind {kind}"),
                });
                continue;
            }
            match register_template(template) {
                Ok(entry) => {
                    registry.entries.insert(kind.clone(), entry);
                }
                Err(template_errors) => {
                    errors.extend(template_errors);
                    registry.rejected.insert(kind.clone());
                }
            }
        }
        registry
    }

    /// Returns the template registered for a kind.
    #[must_use]
    pub fn get(&self, kind: &TemplateKind) -> Option<&RegisteredTemplate<'a>> {
        self.entries.get(kind)
    }

    /// Returns true when the kind's template failed registration.
    #[must_use]
    pub fn is_rejected(&self, kind: &TemplateKind) -> bool {
        self.rejected.contains(kind)
    }

    /// Returns the registered templates in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTemplate<'a>> {
        self.entries.values()
    }
}

/// Validates one template's schema and targets.
fn register_template(template: &Template) -> Result<RegisteredTemplate<'_>, PolicyErrors> {
    let mut errors = PolicyErrors::new();
    let parameters = compile_parameter_schema(&template.parameter_schema)
        .map_err(|message| {
            errors.push(PolicyError::SchemaViolation {
                path: template.source_path.clone(),
                messages: vec![message],
            });
        })
        .ok();
    if template.targets.is_empty() {
        errors.push(PolicyError::BadConfig {
            path: template.source_path.clone(),
            reason: "template declares no targets".to_string(),
        });
    }
    let mut targets = Vec::with_capacity(template.targets.len());
    for binding in &template.targets {
        match BuiltinTarget::by_name(&binding.target) {
            Some(target) if targets.contains(&target) => errors.push(PolicyError::BadConfig {
                path: template.source_path.clone(),
                reason: format!("target {} is bound more than once", binding.target),
            }),
            Some(target) => targets.push(target),
            None => errors.push(PolicyError::BadConfig {
                path: template.source_path.clone(),
                reason: format!("unknown target {}", binding.target),
            }),
        }
    }
    match parameters {
        Some(parameters) if errors.is_empty() => Ok(RegisteredTemplate {
            template,
            parameters,
            targets,
        }),
        _ => Err(errors),
    }
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiled artifacts keyed by target then generated kind.
pub type CompiledTable<C> = BTreeMap<TargetName, BTreeMap<TemplateKind, C>>;

/// Builds the compile unit for one template/target pair.
#[must_use]
pub fn compile_unit(
    template: &Template,
    target: &BuiltinTarget,
    preamble: String,
    modules: &[LibraryModule],
) -> CompileUnit {
    let target_name = target.name();
    let mut unit_modules = Vec::with_capacity(modules.len() + 2);
    unit_modules.push(PolicyModule {
        name: format!("{target_name}/preamble.rego"),
        source: preamble,
        role: ModuleRole::Preamble,
    });
    for module in modules {
        unit_modules.push(PolicyModule {
            name: module.path.clone(),
            source: module.source.clone(),
            role: ModuleRole::Library,
        });
    }
    if let Some(binding) = template.targets.iter().find(|binding| binding.target == target_name) {
        for (index, lib) in binding.libs.iter().enumerate() {
            unit_modules.push(PolicyModule {
                name: format!("{}#{target_name}/libs/{index}", template.source_path),
                source: lib.clone(),
                role: ModuleRole::Library,
            });
        }
        unit_modules.push(PolicyModule {
            name: format!("{}#{target_name}", template.source_path),
            source: binding.rego.clone(),
            role: ModuleRole::Template,
        });
    }
    CompileUnit {
        template: template.generated_kind.clone(),
        target: target_name,
        modules: unit_modules,
    }
}

/// Compiles every registered template for every target it binds.
pub fn compile_templates<R: PolicyRuntime>(
    runtime: &R,
    registry: &TemplateRegistry<'_>,
    modules: &[LibraryModule],
    bindings: &BindingTable,
    errors: &mut PolicyErrors,
) -> CompiledTable<R::Compiled> {
    let mut sorted_modules = modules.to_vec();
    sorted_modules.sort_by(|left, right| left.path.cmp(&right.path));

    let mut table = CompiledTable::new();
    for entry in registry.iter() {
        for target in &entry.targets {
            let target_name = target.name();
            let bound = bindings.get(&target_name).map(Vec::as_slice).map(bound_set).unwrap_or_default();
            let unit = compile_unit(entry.template, target, target.preamble(&bound), &sorted_modules);
            match runtime.compile(&unit) {
                Ok(compiled) => {
                    debug!(template = %unit.template, target = %unit.target, "template compiled");
                    table.entry(target_name).or_default().insert(unit.template, compiled);
                }
                Err(err) => errors.push(PolicyError::CompileError {
                    template: entry.template.generated_kind.to_string(),
                    target: target_name.to_string(),
                    diagnostic: err.to_string(),
                }),
            }
        }
    }
    table
}
