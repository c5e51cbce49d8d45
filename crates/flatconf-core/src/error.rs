//! Error types for flatconf
//!
//! Errors are structured: a kind, the unit and line where the failure
//! happened, and an actionable help message where one exists.
//!
//! Line-level kinds may be tolerated in lenient parsing mode (routed to a
//! caller hook and skipped). Include-level kinds are always fatal: silently
//! tolerating a broken include graph would silently corrupt the resulting
//! configuration.

use std::fmt;

/// Result type alias for flatconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flatconf operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Location in a source unit, if available
    pub location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Canonical id of the unit, empty when not yet known
    pub unit: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A line failed to parse in strict mode
    Line {
        kind: LineErrorKind,
        /// The raw line text as it appeared in the input
        raw: String,
    },
    /// A required include target could not be resolved
    MissingInclude { from: String, path: String },
    /// An include graph cycle closed on a unit already being resolved
    CircularInclude { from: String, id: String },
    /// Include nesting exceeded the configured bound
    MaxIncludeDepthExceeded {
        id: String,
        depth: usize,
        max: usize,
    },
    /// A value could not be converted to the requested type
    TypeCoercion,
    /// I/O error from a resolver backend
    Io,
    /// Internal error (bug in flatconf)
    Internal,
}

/// Line-level parse failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineErrorKind {
    /// The line contains no `=` separator
    MissingSeparator,
    /// The text before `=` is empty after trimming
    EmptyKey,
    /// A quoted value has no unescaped closing quote
    UnterminatedQuote,
    /// Non-whitespace text follows the closing quote
    TrailingCharactersAfterQuote,
}

impl LineErrorKind {
    /// Short human-readable description of this kind
    pub fn describe(&self) -> &'static str {
        match self {
            LineErrorKind::MissingSeparator => "missing '=' separator",
            LineErrorKind::EmptyKey => "empty key before '='",
            LineErrorKind::UnterminatedQuote => "unterminated quoted value",
            LineErrorKind::TrailingCharactersAfterQuote => {
                "trailing characters after closing quote"
            }
        }
    }
}

impl Error {
    /// Create a line-level parse error
    pub fn line(kind: LineErrorKind, line: usize, raw: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Line {
                kind,
                raw: raw.into(),
            },
            location: Some(SourceLocation {
                unit: String::new(),
                line: Some(line),
                column: None,
            }),
            help: match kind {
                LineErrorKind::MissingSeparator => {
                    Some("Each entry must have the form 'key = value'".into())
                }
                LineErrorKind::EmptyKey => {
                    Some("Write a key name before the '=' separator".into())
                }
                LineErrorKind::UnterminatedQuote => {
                    Some("Close the value with an unescaped '\"'".into())
                }
                LineErrorKind::TrailingCharactersAfterQuote => {
                    Some("Remove the text after the closing quote, or quote the whole value".into())
                }
            },
            cause: None,
        }
    }

    /// Create a missing include error
    pub fn missing_include(from: impl Into<String>, path: impl Into<String>) -> Self {
        let p = path.into();
        Self {
            kind: ErrorKind::MissingInclude {
                from: from.into(),
                path: p.clone(),
            },
            location: None,
            help: Some(format!(
                "Check that '{}' exists, or prefix the path with '?' to make the include optional",
                p
            )),
            cause: None,
        }
    }

    /// Create a circular include error
    pub fn circular_include(from: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::CircularInclude {
                from: from.into(),
                id: id.into(),
            },
            location: None,
            help: Some("Break the cycle by removing one of the include directives".into()),
            cause: None,
        }
    }

    /// Create a max include depth exceeded error
    pub fn depth_exceeded(id: impl Into<String>, depth: usize, max: usize) -> Self {
        Self {
            kind: ErrorKind::MaxIncludeDepthExceeded {
                id: id.into(),
                depth,
                max,
            },
            location: None,
            help: Some("Raise the maximum include depth, or flatten the include chain".into()),
            cause: None,
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        key: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            location: None,
            help: Some(format!(
                "Ensure the value of '{}' can be read as {}",
                key.into(),
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an internal error (bug in flatconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            location: None,
            help: Some("This is likely a bug in flatconf. Please report it.".into()),
            cause: Some(message.into()),
        }
    }

    /// Set the unit id on the location, creating the location if needed
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        match &mut self.location {
            Some(loc) => loc.unit = unit.into(),
            None => {
                self.location = Some(SourceLocation {
                    unit: unit.into(),
                    line: None,
                    column: None,
                });
            }
        }
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Check whether this is a line-level parse error
    pub fn is_line_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Line { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Main error message
        match &self.kind {
            ErrorKind::Line { kind, raw } => {
                write!(f, "Parse error: {}", kind.describe())?;
                if !raw.trim().is_empty() {
                    write!(f, "\n  Line text: {}", raw.trim())?;
                }
            }
            ErrorKind::MissingInclude { from, path } => {
                write!(f, "Missing include '{}' (included from {})", path, from)?;
            }
            ErrorKind::CircularInclude { from, id } => {
                write!(
                    f,
                    "Circular include: '{}' is already being resolved (included from {})",
                    id, from
                )?;
            }
            ErrorKind::MaxIncludeDepthExceeded { id, depth, max } => {
                write!(
                    f,
                    "Include depth {} exceeds maximum {} at '{}'",
                    depth, max, id
                )?;
            }
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        // Source location
        if let Some(loc) = &self.location {
            if !loc.unit.is_empty() {
                write!(f, "\n  Unit: {}", loc.unit)?;
                if let Some(line) = loc.line {
                    write!(f, ":{}", line)?;
                }
            } else if let Some(line) = loc.line {
                write!(f, "\n  Line: {}", line)?;
            }
        }

        // Cause
        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        // Help
        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
