//! Line tokenizer and value parser for the flat `key = value` format
//!
//! One physical line holds at most one entry. A line is a comment when,
//! after left-trim, it starts with the configured comment prefix. The
//! key/value separator is the first `=` in the trimmed line. Values may be
//! double-quoted to preserve whitespace, `=`, and comment-prefix characters
//! verbatim; only `\"` and `\\` are recognized escape sequences.
//!
//! Parsing runs in one of two modes. Strict parsing converts the first
//! malformed line into a fatal [`Error`](crate::error::Error). Lenient
//! parsing routes [`LineDiagnostic`]s to a caller hook and skips the line,
//! with one deliberate exception: a quoted value with no closing quote (or
//! with trailing text after it) is accepted verbatim, leading quote
//! included. That asymmetry is long-standing, observable behavior and is
//! kept as documented, tested behavior.

use crate::document::{Document, Entry};
use crate::error::{Error, LineErrorKind, Result};
use std::fmt;

/// Options controlling line tokenization
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Prefix marking a comment line after left-trim (default `#`)
    pub comment_prefix: String,
    /// Decode `\"` and `\\` inside quoted values (default true)
    pub decode_escapes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            comment_prefix: "#".into(),
            decode_escapes: true,
        }
    }
}

impl ParseOptions {
    /// Set the comment prefix
    pub fn with_comment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.comment_prefix = prefix.into();
        self
    }

    /// Set whether quoted-value escapes are decoded
    pub fn with_decode_escapes(mut self, decode: bool) -> Self {
        self.decode_escapes = decode;
        self
    }
}

/// A categorized line-level parse failure
///
/// For the two quote-related kinds, `fallback` carries the entry a lenient
/// parse accepts instead of skipping the line: the whole trimmed value
/// verbatim, leading quote included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub kind: LineErrorKind,
    /// 1-based line number
    pub line: usize,
    /// The raw line text as it appeared in the input
    pub raw: String,
    /// Lenient-mode fallback entry, present for quote diagnostics only
    pub fallback: Option<Entry>,
}

impl fmt::Display for LineDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind.describe(), self.raw.trim())
    }
}

impl LineDiagnostic {
    fn new(kind: LineErrorKind, line: usize, raw: &str) -> Self {
        Self {
            kind,
            line,
            raw: raw.to_string(),
            fallback: None,
        }
    }

    fn with_fallback(mut self, entry: Entry) -> Self {
        self.fallback = Some(entry);
        self
    }

    /// Convert into a fatal strict-mode error
    pub fn into_error(self) -> Error {
        Error::line(self.kind, self.line, self.raw)
    }
}

/// Parse one raw line into an entry
///
/// Returns `Ok(None)` for blank and comment lines. The result uses strict
/// semantics; lenient callers inspect the diagnostic's `fallback` before
/// deciding to skip.
pub fn parse_line(
    raw: &str,
    line_number: usize,
    opts: &ParseOptions,
) -> std::result::Result<Option<Entry>, LineDiagnostic> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with(opts.comment_prefix.as_str()) {
        return Ok(None);
    }

    let Some(eq) = trimmed.find('=') else {
        return Err(LineDiagnostic::new(
            LineErrorKind::MissingSeparator,
            line_number,
            raw,
        ));
    };

    let key = trimmed[..eq].trim_end();
    if key.is_empty() {
        return Err(LineDiagnostic::new(LineErrorKind::EmptyKey, line_number, raw));
    }

    match parse_value(&trimmed[eq + 1..], opts) {
        Ok(value) => Ok(Some(Entry {
            key: key.to_string(),
            value,
        })),
        Err((kind, literal)) => Err(LineDiagnostic::new(kind, line_number, raw)
            .with_fallback(Entry::new(key, literal))),
    }
}

/// Parse the right-hand side of an entry
///
/// An empty trimmed slice is a reset (`None`). A leading double quote starts
/// a quoted literal; anything else is the trimmed slice itself. The error
/// variant carries the literal fallback a lenient parse accepts.
fn parse_value(
    raw: &str,
    opts: &ParseOptions,
) -> std::result::Result<Option<String>, (LineErrorKind, String)> {
    let v = raw.trim();
    if v.is_empty() {
        return Ok(None);
    }
    if !v.starts_with('"') {
        return Ok(Some(v.to_string()));
    }

    let Some(close) = last_unescaped_quote(v) else {
        return Err((LineErrorKind::UnterminatedQuote, v.to_string()));
    };
    if !v[close + 1..].trim().is_empty() {
        return Err((LineErrorKind::TrailingCharactersAfterQuote, v.to_string()));
    }

    let inner = &v[1..close];
    if opts.decode_escapes {
        Ok(Some(decode_escapes(inner)))
    } else {
        Ok(Some(inner.to_string()))
    }
}

/// Find the last `"` in `s` not preceded by an odd run of backslashes,
/// ignoring the leading quote at index 0
fn last_unescaped_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = bytes.len();
    while i > 1 {
        i -= 1;
        if bytes[i] == b'"' {
            let mut backslashes = 0;
            let mut j = i;
            while j > 1 && bytes[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Decode `\"` and `\\` in a quoted-value body
///
/// Any other backslash sequence passes through verbatim; no other escapes
/// are recognized.
pub(crate) fn decode_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Strip a UTF-8 byte-order-mark from the first character of the input
fn strip_bom(src: &str) -> &str {
    src.strip_prefix('\u{FEFF}').unwrap_or(src)
}

/// Parse configuration text strictly
///
/// The first malformed line aborts the parse with a fatal error carrying
/// the line number and raw text.
pub fn parse_text(src: &str, opts: &ParseOptions) -> Result<Document> {
    let src = strip_bom(src);
    let mut entries = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        match parse_line(raw, idx + 1, opts) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(diag) => return Err(diag.into_error()),
        }
    }
    Ok(Document::new(entries))
}

/// Parse configuration text leniently
///
/// Malformed lines are routed to `on_error` and skipped, except quote
/// diagnostics, whose fallback entry (malformed value accepted verbatim) is
/// kept instead.
pub fn parse_text_lenient(
    src: &str,
    opts: &ParseOptions,
    mut on_error: impl FnMut(&LineDiagnostic),
) -> Document {
    let src = strip_bom(src);
    let mut entries = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        match parse_line(raw, idx + 1, opts) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(diag) => match diag.fallback {
                Some(entry) => {
                    log::debug!(
                        "line {}: accepting malformed quoted value verbatim",
                        diag.line
                    );
                    entries.push(entry);
                }
                None => on_error(&diag),
            },
        }
    }
    Document::new(entries)
}

/// Find the first occurrence of `needle` outside double quotes
///
/// Backslash escapes the character after it, inside or outside quotes.
pub fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split `s` on `sep`, ignoring separators inside double quotes
pub fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
