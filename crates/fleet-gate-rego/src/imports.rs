// crates/fleet-gate-rego/src/imports.rs
// ============================================================================
// Module: Import Qualification
// Description: Rewrites aliased data imports to fully qualified references.
// Purpose: Let templates call library functions through their import alias.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Templates import shared libraries the Forseti way:
//!
//! ```rego
//! import data.validator.gcp.lib as lib
//! import data.lib.fleet
//!
//! msg := lib.describe(x)      # becomes data.validator.gcp.lib.describe(x)
//! msg := fleet.describe(x)    # becomes data.lib.fleet.describe(x)
//! ```
//!
//! The interpreter resolves aliased rule references but not aliased function
//! calls, so [`qualify_imports`] expands every `alias.` reference in code to
//! the imported `data.` path before the module is loaded. String literals,
//! raw strings, and comments are copied untouched, and only references that
//! do not follow a `.` are expanded.
//!
//! # Invariants
//! - Lines are never added or removed, so diagnostics keep their line numbers.
//! - Imports outside `data` (`rego.v1`, `future.keywords`, `input`) are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Import Table
// ============================================================================

/// Returns `alias -> data path` for every `import data.<path>` line.
fn data_aliases(source: &str) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    for line in source.lines() {
        let code = line.split('#').next().unwrap_or_default();
        let Some(rest) = code.trim().strip_prefix("import ") else {
            continue;
        };
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let (path, alias) = match tokens.as_slice() {
            [path] => (*path, path.rsplit('.').next().unwrap_or_default()),
            [path, "as", alias] => (*path, *alias),
            _ => continue,
        };
        let Some(segments) = path.strip_prefix("data.") else {
            continue;
        };
        if segments.split('.').all(is_identifier) && is_identifier(alias) {
            aliases.insert(alias.to_string(), path.to_string());
        }
    }
    aliases
}

/// Returns true for a plain Rego identifier.
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}

/// Returns true when `c` may start an identifier.
const fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true when `c` may continue an identifier.
const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// SECTION: Rewriting
// ============================================================================

/// Expands aliased `data` imports to their full paths.
#[must_use]
pub fn qualify_imports(source: &str) -> String {
    let aliases = data_aliases(source);
    if aliases.is_empty() {
        return source.to_string();
    }
    let chars: Vec<char> = source.chars().collect();
    let mut output = String::with_capacity(source.len());
    let mut index = 0;
    while index < chars.len() {
        let current = chars[index];
        let end = match current {
            '#' => scan_to(&chars, index, |c| c == '\n'),
            '"' => scan_string(&chars, index),
            '`' => scan_to(&chars, index + 1, |c| c == '`').saturating_add(1).min(chars.len()),
            c if is_identifier_start(c) => {
                let end = scan_to(&chars, index, |c| !is_identifier_char(c));
                let word: String = chars[index .. end].iter().collect();
                let after_dot = index > 0 && chars[index - 1] == '.';
                let before_dot = chars.get(end) == Some(&'.');
                match aliases.get(&word) {
                    Some(path) if before_dot && !after_dot => output.push_str(path),
                    _ => output.push_str(&word),
                }
                index = end;
                continue;
            }
            _ => index + 1,
        };
        output.extend(&chars[index .. end]);
        index = end;
    }
    output
}

/// Returns the index of the first char at or after `start` matching `stop`.
fn scan_to(chars: &[char], start: usize, stop: impl Fn(char) -> bool) -> usize {
    chars.iter().skip(start).position(|c| stop(*c)).map_or(chars.len(), |offset| start + offset)
}

/// Returns the index just past the string literal opening at `start`.
fn scan_string(chars: &[char], start: usize) -> usize {
    let mut index = start + 1;
    while index < chars.len() {
        match chars[index] {
            '\\' => index += 2,
            '"' | '\n' => return index + 1,
            _ => index += 1,
        }
    }
    chars.len()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
