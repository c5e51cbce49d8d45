//! Resolver abstraction: mapping include targets to units of raw text
//!
//! A resolver answers "give me the configuration text behind this include
//! path". Not finding the target is a normal outcome (`Ok(None)`), routed
//! through the optional-include policy by the engine; a resolver *failing*
//! (storage became unreadable mid-walk) is an error and propagates
//! unchanged.
//!
//! The returned [`Unit`] id must be canonical: two spellings of the same
//! physical source (relative vs. absolute path, case variants on
//! case-insensitive storage) must collapse to one id, because the engine
//! keys both cycle detection and its resolution cache on it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A named chunk of raw configuration text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Canonical, resolver-defined id; the engine compares it only for equality
    pub id: String,
    /// Raw configuration text
    pub content: String,
}

impl Unit {
    /// Create a unit
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Maps an include target to a unit of configuration text
pub trait Resolver: Send + Sync {
    /// Resolve `target`, optionally relative to the unit id it appeared in
    ///
    /// `Ok(None)` means "not found" and is a normal outcome.
    fn resolve(&self, target: &str, from: Option<&str>) -> Result<Option<Unit>>;

    /// Get the name of this resolver (used in logs)
    fn name(&self) -> &str;
}

/// Storage-backed resolver reading units from the filesystem
///
/// Relative targets resolve against the directory of the including unit,
/// falling back to the configured base directory (or the process working
/// directory) at the root. Unit ids are canonical paths with symlinks
/// followed; when canonicalization fails the id degrades to a best-effort
/// absolute path rather than erroring.
#[derive(Debug, Clone)]
pub struct FsResolver {
    base: Option<PathBuf>,
    case_insensitive: bool,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FsResolver {
    /// Create a resolver with platform-default id casing
    pub fn new() -> Self {
        Self {
            base: None,
            case_insensitive: cfg!(any(windows, target_os = "macos")),
        }
    }

    /// Set the base directory for relative root targets
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Override case-insensitive id folding
    ///
    /// On case-insensitive storage, equivalent path spellings must collapse
    /// to one id; the default follows the platform.
    pub fn case_insensitive(mut self, ci: bool) -> Self {
        self.case_insensitive = ci;
        self
    }

    fn canonical_id(&self, path: &Path) -> String {
        // Canonicalization follows symlinks and absolutizes; it can fail if
        // a component disappeared between the existence check and here, in
        // which case we degrade to a best-effort absolute path.
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(_) if path.is_absolute() => path.to_path_buf(),
            Err(_) => std::env::current_dir()
                .map(|d| d.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        };
        let id = canonical.to_string_lossy().into_owned();
        if self.case_insensitive {
            id.to_lowercase()
        } else {
            id
        }
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, target: &str, from: Option<&str>) -> Result<Option<Unit>> {
        let target_path = Path::new(target);
        let path = if target_path.is_absolute() {
            target_path.to_path_buf()
        } else if let Some(from) = from {
            match Path::new(from).parent() {
                Some(dir) => dir.join(target_path),
                None => target_path.to_path_buf(),
            }
        } else if let Some(base) = &self.base {
            base.join(target_path)
        } else {
            target_path.to_path_buf()
        };

        if !path.is_file() {
            log::trace!("fs resolver: '{}' not found", path.display());
            return Ok(None);
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            // Lost a race with deletion: still a plain "not found"
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::io(format!(
                    "failed to read '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Some(Unit::new(self.canonical_id(&path), content)))
    }

    fn name(&self) -> &str {
        "fs"
    }
}

/// In-memory resolver over a fixed id-to-content mapping
///
/// With a namespace configured, targets lacking the prefix get it prepended
/// before lookup, so `theme` and `mem:theme` name the same unit.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    units: HashMap<String, String>,
    namespace: Option<String>,
}

impl MemoryResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty resolver with a namespace prefix
    pub fn with_namespace(prefix: impl Into<String>) -> Self {
        Self {
            units: HashMap::new(),
            namespace: Some(prefix.into()),
        }
    }

    /// Add a unit
    pub fn insert(&mut self, id: impl Into<String>, content: impl Into<String>) {
        self.units.insert(id.into(), content.into());
    }

    /// Add a unit, builder-style
    pub fn unit(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(id, content);
        self
    }

    fn canonical_id(&self, target: &str) -> String {
        match &self.namespace {
            Some(ns) if !target.starts_with(ns.as_str()) => format!("{}{}", ns, target),
            _ => target.to_string(),
        }
    }
}

impl Resolver for MemoryResolver {
    fn resolve(&self, target: &str, _from: Option<&str>) -> Result<Option<Unit>> {
        let id = self.canonical_id(target);
        Ok(self
            .units
            .get(&id)
            .map(|content| Unit::new(id.clone(), content.clone())))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// A simple function-based resolver
pub struct FnResolver<F>
where
    F: Fn(&str, Option<&str>) -> Result<Option<Unit>> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&str, Option<&str>) -> Result<Option<Unit>> + Send + Sync,
{
    /// Create a new function-based resolver
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Resolver for FnResolver<F>
where
    F: Fn(&str, Option<&str>) -> Result<Option<Unit>> + Send + Sync,
{
    fn resolve(&self, target: &str, from: Option<&str>) -> Result<Option<Unit>> {
        (self.func)(target, from)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered list of resolvers, first non-"not found" result wins
///
/// Enables override layering, e.g. in-memory overrides in front of storage.
/// A resolver error stops the walk and propagates.
#[derive(Clone, Default)]
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ChainResolver {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver
    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    /// Append a resolver, builder-style
    pub fn with(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.push(resolver);
        self
    }
}

impl Resolver for ChainResolver {
    fn resolve(&self, target: &str, from: Option<&str>) -> Result<Option<Unit>> {
        for resolver in &self.resolvers {
            if let Some(unit) = resolver.resolve(target, from)? {
                log::trace!("chain: '{}' resolved by {}", target, resolver.name());
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flatconf-resolver-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryResolver::new().unit("a", "x = 1");
        let unit = resolver.resolve("a", None).unwrap().unwrap();
        assert_eq!(unit.id, "a");
        assert_eq!(unit.content, "x = 1");
        assert_eq!(resolver.resolve("missing", None).unwrap(), None);
    }

    #[test]
    fn test_memory_resolver_namespace() {
        let resolver = MemoryResolver::with_namespace("mem:").unit("mem:theme", "bg = dark");
        // Bare and prefixed spellings collapse to the same id
        let bare = resolver.resolve("theme", None).unwrap().unwrap();
        let prefixed = resolver.resolve("mem:theme", None).unwrap().unwrap();
        assert_eq!(bare.id, "mem:theme");
        assert_eq!(bare, prefixed);
    }

    #[test]
    fn test_fn_resolver() {
        let resolver = FnResolver::new("fixed", |target: &str, _from: Option<&str>| {
            if target == "hit" {
                Ok(Some(Unit::new("hit", "k = v")))
            } else {
                Ok(None)
            }
        });
        assert!(resolver.resolve("hit", None).unwrap().is_some());
        assert!(resolver.resolve("miss", None).unwrap().is_none());
        assert_eq!(resolver.name(), "fixed");
    }

    #[test]
    fn test_chain_first_hit_wins() {
        let first = MemoryResolver::new().unit("a", "from = first");
        let second = MemoryResolver::new()
            .unit("a", "from = second")
            .unit("b", "from = second");
        let chain = ChainResolver::new()
            .with(Arc::new(first))
            .with(Arc::new(second));

        let a = chain.resolve("a", None).unwrap().unwrap();
        assert_eq!(a.content, "from = first");
        let b = chain.resolve("b", None).unwrap().unwrap();
        assert_eq!(b.content, "from = second");
        assert_eq!(chain.resolve("c", None).unwrap(), None);
    }

    #[test]
    fn test_chain_propagates_resolver_errors() {
        let failing = FnResolver::new("failing", |_: &str, _: Option<&str>| {
            Err(Error::io("backend unreadable"))
        });
        let fallback = MemoryResolver::new().unit("a", "x = 1");
        let chain = ChainResolver::new()
            .with(Arc::new(failing))
            .with(Arc::new(fallback));
        assert!(chain.resolve("a", None).is_err());
    }

    #[test]
    fn test_fs_resolver_not_found_is_none() {
        let dir = scratch_dir("missing");
        let resolver = FsResolver::new().with_base(&dir);
        assert_eq!(resolver.resolve("nope.conf", None).unwrap(), None);
    }

    #[test]
    fn test_fs_resolver_reads_relative_to_base() {
        let dir = scratch_dir("base");
        std::fs::write(dir.join("app.conf"), "k = v\n").unwrap();

        let resolver = FsResolver::new().with_base(&dir);
        let unit = resolver.resolve("app.conf", None).unwrap().unwrap();
        assert_eq!(unit.content, "k = v\n");
        assert!(Path::new(&unit.id).is_absolute());
    }

    #[test]
    fn test_fs_resolver_relative_to_including_unit() {
        let dir = scratch_dir("relative");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/child.conf"), "child = yes\n").unwrap();

        let resolver = FsResolver::new();
        let from = dir.join("sub/parent.conf");
        let unit = resolver
            .resolve("child.conf", Some(&from.to_string_lossy()))
            .unwrap()
            .unwrap();
        assert_eq!(unit.content, "child = yes\n");
    }

    #[test]
    fn test_fs_resolver_canonical_id_collapses_spellings() {
        let dir = scratch_dir("canonical");
        std::fs::write(dir.join("app.conf"), "k = v\n").unwrap();

        let resolver = FsResolver::new().with_base(&dir);
        let direct = resolver.resolve("app.conf", None).unwrap().unwrap();
        let dotted = resolver.resolve("./app.conf", None).unwrap().unwrap();
        assert_eq!(direct.id, dotted.id);
    }

    #[test]
    fn test_fs_resolver_case_folding() {
        let resolver = FsResolver::new().case_insensitive(true);
        let id = resolver.canonical_id(Path::new("/Does/Not/Exist.conf"));
        assert_eq!(id, "/does/not/exist.conf");
    }
}
