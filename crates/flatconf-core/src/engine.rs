//! Include resolution engine
//!
//! Expands include directives recursively against a [`Resolver`] and merges
//! the results into one document. Precedence: entries an include supplies
//! win over same-unit lines written after the include directive. The
//! rationale is a "base config + override include"
//! composition model: the including file's author should not have to order
//! every line relative to every key an include might set.
//!
//! State is scoped to one top-level invocation and threaded explicitly
//! through the recursion: `visited` (ids on the active recursion stack, for
//! cycle detection), the memoizing cache (id to resolved document,
//! optionally caller-seeded to share across invocations), and the depth
//! counter. There is no process-wide state, so independent parses never
//! interfere.

use std::collections::{HashMap, HashSet};

use crate::document::{Document, Entry};
use crate::error::{Error, Result};
use crate::parser::{self, parse_text, parse_text_lenient, LineDiagnostic, ParseOptions};
use crate::resolver::{FsResolver, Resolver, Unit};

/// Options controlling include resolution
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Key whose entries are include directives (default `config-file`)
    pub include_key: String,
    /// Maximum include nesting depth (default 16)
    pub max_depth: usize,
    /// Line tokenization options
    pub parse: ParseOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            include_key: "config-file".into(),
            max_depth: 16,
            parse: ParseOptions::default(),
        }
    }
}

impl EngineOptions {
    /// Set the include directive key
    pub fn with_include_key(mut self, key: impl Into<String>) -> Self {
        self.include_key = key.into();
        self
    }

    /// Set the maximum include depth
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Set the tokenization options
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

/// Memoized resolution results, keyed by canonical unit id
///
/// Seed one cache across several top-level calls to resolve each distinct
/// unit at most once overall. The cycle-detection set is never shared this
/// way: two legitimately separate parses of the same unit are not a cycle.
pub type ResolveCache = HashMap<String, Document>;

/// A decoded include directive value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// The include target path
    pub path: String,
    /// Whether a missing target is tolerated (`?` prefix)
    pub optional: bool,
}

impl IncludeDirective {
    /// Decode raw directive syntax
    ///
    /// An optional leading `?` marks the include optional; matching
    /// surrounding quotes are stripped; `\"` and `\\` are decoded
    /// unconditionally, independent of the quoted-value escape option,
    /// since a path always needs its literal characters.
    pub fn decode(raw: &str) -> Self {
        let (optional, rest) = match raw.strip_prefix('?') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, raw),
        };
        let rest = if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
            &rest[1..rest.len() - 1]
        } else {
            rest
        };
        Self {
            path: parser::decode_escapes(rest),
            optional,
        }
    }
}

enum LineMode<'a> {
    Strict,
    Lenient(&'a mut dyn FnMut(&LineDiagnostic)),
}

/// Resolve a unit and all of its includes into one merged document
pub fn resolve_unit(unit: &Unit, resolver: &dyn Resolver, opts: &EngineOptions) -> Result<Document> {
    let mut cache = ResolveCache::new();
    resolve_unit_with_cache(unit, resolver, opts, &mut cache)
}

/// Resolve a unit using a caller-owned memoization cache
///
/// Already-cached ids short-circuit without re-parsing or resolver calls.
pub fn resolve_unit_with_cache(
    unit: &Unit,
    resolver: &dyn Resolver,
    opts: &EngineOptions,
    cache: &mut ResolveCache,
) -> Result<Document> {
    let mut visited = HashSet::new();
    resolve_recursive(unit, None, 0, resolver, opts, &mut visited, cache, &mut LineMode::Strict)
}

/// Resolve a unit, tolerating malformed lines
///
/// Line diagnostics from every unit in the include graph are routed to
/// `on_error` and the lines skipped. Include-level failures (missing
/// required include, cycle, depth) stay fatal; there is no lenient mode for
/// a broken include graph.
pub fn resolve_unit_lenient(
    unit: &Unit,
    resolver: &dyn Resolver,
    opts: &EngineOptions,
    on_error: &mut dyn FnMut(&LineDiagnostic),
) -> Result<Document> {
    let mut cache = ResolveCache::new();
    let mut visited = HashSet::new();
    resolve_recursive(
        unit,
        None,
        0,
        resolver,
        opts,
        &mut visited,
        &mut cache,
        &mut LineMode::Lenient(on_error),
    )
}

/// Resolve a configuration file from disk with an [`FsResolver`]
pub fn resolve_path(path: impl AsRef<std::path::Path>, opts: &EngineOptions) -> Result<Document> {
    let path = path.as_ref();
    let resolver = FsResolver::new();
    let unit = resolver
        .resolve(&path.to_string_lossy(), None)?
        .ok_or_else(|| Error::io(format!("configuration file not found: {}", path.display())))?;
    resolve_unit(&unit, &resolver, opts)
}

#[allow(clippy::too_many_arguments)]
fn resolve_recursive(
    unit: &Unit,
    from: Option<&str>,
    depth: usize,
    resolver: &dyn Resolver,
    opts: &EngineOptions,
    visited: &mut HashSet<String>,
    cache: &mut ResolveCache,
    mode: &mut LineMode<'_>,
) -> Result<Document> {
    if depth > opts.max_depth {
        return Err(Error::depth_exceeded(&unit.id, depth, opts.max_depth));
    }
    if visited.contains(&unit.id) {
        return Err(Error::circular_include(from.unwrap_or("<root>"), &unit.id));
    }
    if let Some(cached) = cache.get(&unit.id) {
        log::debug!("include cache hit for '{}'", unit.id);
        return Ok(cached.clone());
    }

    visited.insert(unit.id.clone());

    let raw = match mode {
        LineMode::Strict => {
            parse_text(&unit.content, &opts.parse).map_err(|e| e.with_unit(&unit.id))?
        }
        LineMode::Lenient(hook) => parse_text_lenient(&unit.content, &opts.parse, |d| hook(d)),
    };

    // Single pass: everything before the first directive, the directive
    // values themselves in order, and the raw tail after the first
    // directive (directives excluded).
    let mut pre: Vec<Entry> = Vec::new();
    let mut include_values: Vec<String> = Vec::new();
    let mut raw_tail: Vec<Entry> = Vec::new();
    let mut seen_directive = false;
    for entry in raw.entries() {
        if entry.key == opts.include_key {
            seen_directive = true;
            if let Some(value) = &entry.value {
                let value = value.trim();
                if !value.is_empty() {
                    include_values.push(value.to_string());
                }
            }
            continue;
        }
        if seen_directive {
            raw_tail.push(entry.clone());
        } else {
            pre.push(entry.clone());
        }
    }

    let mut include_entries: Vec<Entry> = Vec::new();
    let mut keys_from_includes: HashSet<String> = HashSet::new();
    for value in &include_values {
        let directive = IncludeDirective::decode(value);
        match resolver.resolve(&directive.path, Some(&unit.id))? {
            Some(found) => {
                let child = resolve_recursive(
                    &found,
                    Some(&unit.id),
                    depth + 1,
                    resolver,
                    opts,
                    visited,
                    cache,
                    mode,
                )?;
                for entry in child.entries() {
                    keys_from_includes.insert(entry.key.clone());
                    include_entries.push(entry.clone());
                }
            }
            None if directive.optional => {
                log::debug!(
                    "optional include '{}' not found (from '{}'), skipping",
                    directive.path,
                    unit.id
                );
            }
            None => return Err(Error::missing_include(&unit.id, &directive.path)),
        }
    }

    // Precedence rule: a key an include supplied cannot be overridden by a
    // same-unit line written after the include directive. Such lines are
    // silently dropped.
    let mut entries = pre;
    entries.extend(include_entries);
    for entry in raw_tail {
        if keys_from_includes.contains(&entry.key) {
            log::trace!(
                "dropping tail entry '{}' in '{}': key supplied by include",
                entry.key,
                unit.id
            );
            continue;
        }
        entries.push(entry);
    }

    let document = Document::new(entries);
    cache.insert(unit.id.clone(), document.clone());
    visited.remove(&unit.id);
    Ok(document)
}
