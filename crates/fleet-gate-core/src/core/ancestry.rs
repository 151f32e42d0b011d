// crates/fleet-gate-core/src/core/ancestry.rs
// ============================================================================
// Module: Fleet Gate Ancestry
// Description: Ancestry path canonicalization and ancestry glob grammar.
// Purpose: Give assets and constraint match rules one canonical path form.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Ancestry paths are slash-joined containment chains such as
//! `organizations/1/folders/2/projects/3`, earliest ancestor first.
//! Canonicalization lowercases segment names, maps legacy aliases
//! (`orgs`, `organization`, `folder`, `project`) onto the plural names and
//! drops empty segments.
//!
//! Match globs share the same canonical form and are validated against a
//! small grammar:
//! - segment names `organizations`, `folders`, `projects`, in that order
//!   (`folders` may repeat, the chain may start at `folders` or `projects`);
//! - every segment name is followed by an id token: a positive integer
//!   (optionally suffixed with `*` or `**`), `*`, or `**`;
//! - `*` matches one segment and `**` matches zero or more segments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical organization segment name.
pub const ORGANIZATIONS: &str = "organizations";
/// Canonical folder segment name.
pub const FOLDERS: &str = "folders";
/// Canonical project segment name.
pub const PROJECTS: &str = "projects";

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Maps a segment name (or legacy alias) to its canonical plural form.
fn canonical_segment_name(segment: &str) -> Option<&'static str> {
    match segment.to_ascii_lowercase().as_str() {
        "organizations" | "organization" | "orgs" | "org" => Some(ORGANIZATIONS),
        "folders" | "folder" => Some(FOLDERS),
        "projects" | "project" => Some(PROJECTS),
        _ => None,
    }
}

/// Canonicalizes an ancestry path.
///
/// Empty segments (duplicate, leading, or trailing slashes) are removed and
/// segment names at name positions are lowercased and de-aliased. Id
/// segments are kept verbatim.
#[must_use]
pub fn canonicalize_ancestry(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| {
            if index % 2 == 0 {
                canonical_segment_name(segment)
                    .map_or_else(|| segment.to_ascii_lowercase(), str::to_string)
            } else {
                segment.to_string()
            }
        })
        .collect();
    segments.join("/")
}

/// Derives a canonical ancestry path from an ancestors list (nearest first).
#[must_use]
pub fn ancestry_from_ancestors<S: AsRef<str>>(ancestors: &[S]) -> String {
    let joined: Vec<&str> = ancestors.iter().rev().map(AsRef::as_ref).collect();
    canonicalize_ancestry(&joined.join("/"))
}

// ============================================================================
// SECTION: Glob Grammar
// ============================================================================

/// Segment-name rank used to enforce ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentName {
    /// `organizations`
    Organizations,
    /// `folders`
    Folders,
    /// `projects`
    Projects,
}

impl SegmentName {
    /// Parses a canonical segment name.
    fn parse(token: &str) -> Option<Self> {
        match canonical_segment_name(token)? {
            ORGANIZATIONS => Some(Self::Organizations),
            FOLDERS => Some(Self::Folders),
            PROJECTS => Some(Self::Projects),
            _ => None,
        }
    }

    /// Returns the canonical string form.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => ORGANIZATIONS,
            Self::Folders => FOLDERS,
            Self::Projects => PROJECTS,
        }
    }

    /// Returns true when `next` may follow `self` in a chain.
    fn may_precede(self, next: Self) -> bool {
        match (self, next) {
            (Self::Folders, Self::Folders) => true,
            (current, next) => next > current,
        }
    }
}

/// Parsed glob token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GlobToken {
    /// Literal segment name.
    Name(SegmentName),
    /// Literal numeric id.
    Id(String),
    /// Numeric id prefix followed by `*` (one segment).
    IdPrefix(String),
    /// Numeric id prefix followed by `**` (prefix segment, then any suffix).
    IdPrefixDeep(String),
    /// `*`
    Any,
    /// `**`
    AnyDeep,
}

/// Error raised when a glob token breaks the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobSyntaxError {
    /// Offending token (empty string for empty segments).
    pub token: String,
    /// Human-readable reason.
    pub reason: &'static str,
}

impl fmt::Display for GlobSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid token `{}`: {}", self.token, self.reason)
    }
}

impl std::error::Error for GlobSyntaxError {}

/// Grammar state for glob validation.
#[derive(Debug, Clone, Copy)]
enum GlobState {
    /// No token consumed yet.
    Start,
    /// A segment name was consumed; an id must follow.
    ExpectId(SegmentName),
    /// A name/id pair was consumed.
    AfterId(SegmentName),
    /// A wildcard was consumed at a name position.
    Wild(Option<SegmentName>),
}

/// Validated ancestry glob.
///
/// # Invariants
/// - Tokens conform to the ancestry grammar described in the module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestryGlob {
    /// Canonical source pattern.
    pattern: String,
    /// Parsed tokens.
    tokens: Vec<GlobToken>,
}

impl AncestryGlob {
    /// Parses and validates a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`GlobSyntaxError`] when the pattern breaks the grammar.
    pub fn parse(pattern: &str) -> Result<Self, GlobSyntaxError> {
        if pattern.is_empty() {
            return Err(GlobSyntaxError {
                token: String::new(),
                reason: "pattern is empty",
            });
        }
        let mut tokens = Vec::new();
        let mut state = GlobState::Start;
        for raw in pattern.split('/') {
            let token = classify_token(raw)?;
            state = advance(state, &token, raw)?;
            tokens.push(token);
        }
        if let GlobState::ExpectId(name) = state {
            return Err(GlobSyntaxError {
                token: name.as_str().to_string(),
                reason: "segment name must be followed by an id",
            });
        }
        let pattern = tokens.iter().map(render_token).collect::<Vec<_>>().join("/");
        Ok(Self {
            pattern,
            tokens,
        })
    }

    /// Returns the canonical pattern string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns true when the glob matches a canonical ancestry path.
    #[must_use]
    pub fn matches(&self, ancestry_path: &str) -> bool {
        let segments: Vec<&str> =
            ancestry_path.split('/').filter(|segment| !segment.is_empty()).collect();
        match_tokens(&self.tokens, &segments)
    }
}

impl fmt::Display for AncestryGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pattern.fmt(f)
    }
}

/// Classifies a raw token.
fn classify_token(raw: &str) -> Result<GlobToken, GlobSyntaxError> {
    if raw.is_empty() {
        return Err(GlobSyntaxError {
            token: String::new(),
            reason: "empty segment",
        });
    }
    match raw {
        "*" => return Ok(GlobToken::Any),
        "**" => return Ok(GlobToken::AnyDeep),
        _ => {}
    }
    if let Some(name) = SegmentName::parse(raw) {
        return Ok(GlobToken::Name(name));
    }
    let (digits, suffix) = raw.find('*').map_or((raw, ""), |split| raw.split_at(split));
    if is_positive_integer(digits) {
        return match suffix {
            "" => Ok(GlobToken::Id(digits.to_string())),
            "*" => Ok(GlobToken::IdPrefix(digits.to_string())),
            "**" => Ok(GlobToken::IdPrefixDeep(digits.to_string())),
            _ => Err(GlobSyntaxError {
                token: raw.to_string(),
                reason: "id suffix must be `*` or `**`",
            }),
        };
    }
    Err(GlobSyntaxError {
        token: raw.to_string(),
        reason: "unknown token",
    })
}

/// Returns true when the string is a positive decimal integer.
fn is_positive_integer(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|byte| byte.is_ascii_digit())
        && value.bytes().any(|byte| byte != b'0')
}

/// Advances the grammar state machine by one token.
fn advance(state: GlobState, token: &GlobToken, raw: &str) -> Result<GlobState, GlobSyntaxError> {
    let reject = |reason: &'static str| GlobSyntaxError {
        token: raw.to_string(),
        reason,
    };
    match (state, token) {
        (GlobState::ExpectId(name), GlobToken::Any | GlobToken::AnyDeep)
        | (
            GlobState::ExpectId(name),
            GlobToken::Id(_) | GlobToken::IdPrefix(_) | GlobToken::IdPrefixDeep(_),
        ) => Ok(GlobState::AfterId(name)),
        (GlobState::ExpectId(_), GlobToken::Name(_)) => {
            Err(reject("segment name must be followed by an id"))
        }
        (GlobState::Start, GlobToken::Name(name)) | (GlobState::Wild(None), GlobToken::Name(name)) => {
            Ok(GlobState::ExpectId(*name))
        }
        (GlobState::AfterId(last) | GlobState::Wild(Some(last)), GlobToken::Name(name)) => {
            if last.may_precede(*name) {
                Ok(GlobState::ExpectId(*name))
            } else {
                Err(reject("segment names out of order"))
            }
        }
        (GlobState::Start, GlobToken::Any | GlobToken::AnyDeep) => Ok(GlobState::Wild(None)),
        (GlobState::AfterId(last) | GlobState::Wild(Some(last)), GlobToken::Any | GlobToken::AnyDeep) => {
            Ok(GlobState::Wild(Some(last)))
        }
        (GlobState::Wild(None), GlobToken::Any | GlobToken::AnyDeep) => Ok(GlobState::Wild(None)),
        (
            GlobState::Wild(last),
            GlobToken::Id(_) | GlobToken::IdPrefix(_) | GlobToken::IdPrefixDeep(_),
        ) => Ok(GlobState::Wild(last)),
        (
            GlobState::Start | GlobState::AfterId(_),
            GlobToken::Id(_) | GlobToken::IdPrefix(_) | GlobToken::IdPrefixDeep(_),
        ) => Err(reject("id must follow a segment name")),
    }
}

/// Renders a token in canonical form.
fn render_token(token: &GlobToken) -> String {
    match token {
        GlobToken::Name(name) => name.as_str().to_string(),
        GlobToken::Id(id) => id.clone(),
        GlobToken::IdPrefix(id) => format!("{id}*"),
        GlobToken::IdPrefixDeep(id) => format!("{id}**"),
        GlobToken::Any => "*".to_string(),
        GlobToken::AnyDeep => "**".to_string(),
    }
}

/// Matches glob tokens against path segments.
fn match_tokens(tokens: &[GlobToken], segments: &[&str]) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return segments.is_empty();
    };
    match token {
        GlobToken::AnyDeep => (0 ..= segments.len()).any(|skip| match_tokens(rest, &segments[skip ..])),
        GlobToken::IdPrefixDeep(prefix) => match segments.split_first() {
            Some((segment, tail)) if segment.starts_with(prefix.as_str()) => {
                (0 ..= tail.len()).any(|skip| match_tokens(rest, &tail[skip ..]))
            }
            _ => false,
        },
        _ => match segments.split_first() {
            Some((segment, tail)) if match_single(token, segment) => match_tokens(rest, tail),
            _ => false,
        },
    }
}

/// Matches a single-segment token.
fn match_single(token: &GlobToken, segment: &str) -> bool {
    match token {
        GlobToken::Name(name) => name.as_str() == segment,
        GlobToken::Id(id) => id == segment,
        GlobToken::IdPrefix(prefix) => segment.starts_with(prefix.as_str()),
        GlobToken::Any => true,
        GlobToken::AnyDeep | GlobToken::IdPrefixDeep(_) => false,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
