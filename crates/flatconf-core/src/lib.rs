//! flatconf-core: flat `key = value` configuration with include resolution
//!
//! This crate parses flat configuration text into ordered key/value
//! documents and expands cross-file `config-file` include directives
//! against a pluggable resolver, with cycle detection, depth limiting, and
//! memoized caching.
//!
//! # Example
//!
//! ```rust
//! use flatconf_core::{parse_text, ParseOptions};
//!
//! let doc = parse_text("theme = dark\nfont-size = 12\n", &ParseOptions::default()).unwrap();
//! assert_eq!(doc.latest_str("theme"), Some("dark"));
//! assert_eq!(doc.latest_int("font-size").unwrap(), Some(12));
//! ```
//!
//! Includes expand in place, and a key an include supplies wins over lines
//! written after the include directive in the same file:
//!
//! ```rust
//! use flatconf_core::{resolve_unit, EngineOptions, MemoryResolver, Unit};
//!
//! let resolver = MemoryResolver::new().unit("base", "k = 9\n");
//! let root = Unit::new("root", "k = 1\nconfig-file = base\nk = 2\n");
//! let doc = resolve_unit(&root, &resolver, &EngineOptions::default()).unwrap();
//! assert_eq!(doc.latest_str("k"), Some("9"));
//! ```

pub mod document;
pub mod encode;
pub mod engine;
pub mod error;
pub mod parser;
pub mod resolver;

pub use document::{Document, Entry};
pub use encode::encode;
pub use engine::{
    resolve_path, resolve_unit, resolve_unit_lenient, resolve_unit_with_cache, EngineOptions,
    IncludeDirective, ResolveCache,
};
pub use error::{Error, ErrorKind, LineErrorKind, Result, SourceLocation};
pub use parser::{
    find_unquoted, parse_line, parse_text, parse_text_lenient, split_unquoted, LineDiagnostic,
    ParseOptions,
};
pub use resolver::{ChainResolver, FnResolver, FsResolver, MemoryResolver, Resolver, Unit};
