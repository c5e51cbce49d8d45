//! Document encoding
//!
//! Turns a [`Document`] back into `key = value` text. Comments and original
//! layout are not preserved; the guarantee is that re-parsing the encoding
//! reproduces the latest-value map.

use crate::document::{Document, Entry};

/// Encode a document as configuration text, one entry per line
pub fn encode(doc: &Document) -> String {
    let mut out = String::new();
    for entry in doc.entries() {
        encode_entry(entry, &mut out);
        out.push('\n');
    }
    out
}

fn encode_entry(entry: &Entry, out: &mut String) {
    out.push_str(&entry.key);
    match &entry.value {
        // Reset: bare right-hand side
        None => out.push_str(" ="),
        Some(value) => {
            out.push_str(" = ");
            if needs_quoting(value) {
                push_quoted(value, out);
            } else {
                out.push_str(value);
            }
        }
    }
}

/// Whether a value would not survive an unquoted round-trip
///
/// An empty string would read back as a reset, surrounding whitespace would
/// be trimmed away, and a leading quote would start quoted parsing.
fn needs_quoting(value: &str) -> bool {
    value.is_empty() || value.trim() != value || value.starts_with('"')
}

fn push_quoted(value: &str, out: &mut String) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_text, ParseOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_plain_entries() {
        let doc = Document::new(vec![
            Entry::new("a", "1"),
            Entry::reset("b"),
            Entry::new("a", "2"),
        ]);
        assert_eq!(encode(&doc), "a = 1\nb =\na = 2\n");
    }

    #[test]
    fn test_encode_quotes_protected_values() {
        let doc = Document::new(vec![
            Entry::new("pad", "  spaced  "),
            Entry::new("empty", ""),
            Entry::new("quoted", "\"literal"),
        ]);
        assert_eq!(
            encode(&doc),
            "pad = \"  spaced  \"\nempty = \"\"\nquoted = \"\\\"literal\"\n"
        );
    }

    #[test]
    fn test_round_trip_preserves_latest_map() {
        let doc = Document::new(vec![
            Entry::new("a", "1"),
            Entry::new("b", "  padded  "),
            Entry::reset("c"),
            Entry::new("a", "x = y # not a comment"),
            Entry::new("d", "with \"quotes\" and \\slashes\\"),
        ]);
        let reparsed = parse_text(&encode(&doc), &ParseOptions::default()).unwrap();
        for key in doc.keys() {
            assert_eq!(reparsed.latest(key), doc.latest(key), "key {}", key);
        }
        assert_eq!(reparsed.len(), doc.len());
    }
}
