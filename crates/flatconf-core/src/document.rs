//! Ordered configuration documents
//!
//! A [`Document`] is an immutable sequence of [`Entry`] values in encounter
//! order, duplicates allowed. Two derived views (latest value per key, all
//! values per key) are computed on first access and cached; because a
//! document never mutates after construction, the caches never invalidate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};

/// One parsed `key = value` pair
///
/// A `None` value is an explicit reset, produced by an empty unquoted
/// right-hand side (`key =`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Option<String>,
}

impl Entry {
    /// Create an entry with a value
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a reset entry (no value)
    pub fn reset(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Check whether this entry is a reset
    pub fn is_reset(&self) -> bool {
        self.value.is_none()
    }
}

/// An immutable, ordered collection of entries
///
/// Equality and hashing are order-sensitive over the full entry sequence:
/// two documents with the same keys and values in a different order are
/// unequal. No operation in this crate ever reorders entries; documents are
/// only filtered or concatenated into new documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    entries: Vec<Entry>,
    #[serde(skip)]
    latest: OnceLock<IndexMap<String, Option<String>>>,
    #[serde(skip)]
    all_values: OnceLock<IndexMap<String, Vec<Option<String>>>>,
}

impl Document {
    /// Create a document from a sequence of entries
    ///
    /// The sequence is copied into the document; the caller keeps no handle
    /// that could mutate it afterwards.
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            latest: OnceLock::new(),
            all_values: OnceLock::new(),
        }
    }

    /// Create an empty document
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// The entries in encounter order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries (including duplicates and resets)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in encounter order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    fn latest_map(&self) -> &IndexMap<String, Option<String>> {
        self.latest.get_or_init(|| {
            let mut map = IndexMap::new();
            for entry in &self.entries {
                map.insert(entry.key.clone(), entry.value.clone());
            }
            map
        })
    }

    fn all_values_map(&self) -> &IndexMap<String, Vec<Option<String>>> {
        self.all_values.get_or_init(|| {
            let mut map: IndexMap<String, Vec<Option<String>>> = IndexMap::new();
            for entry in &self.entries {
                map.entry(entry.key.clone())
                    .or_default()
                    .push(entry.value.clone());
            }
            map
        })
    }

    /// The last value for `key`
    ///
    /// Returns `None` when the key never appears, `Some(None)` when the last
    /// occurrence is a reset, and `Some(Some(..))` otherwise.
    pub fn latest(&self, key: &str) -> Option<Option<&str>> {
        self.latest_map().get(key).map(|v| v.as_deref())
    }

    /// The last non-reset-aware value for `key`
    ///
    /// Collapses "absent" and "reset" into `None`.
    pub fn latest_str(&self, key: &str) -> Option<&str> {
        self.latest(key).flatten()
    }

    /// Every value for `key` in encounter order, including resets
    pub fn all_values(&self, key: &str) -> Option<&[Option<String>]> {
        self.all_values_map().get(key).map(|v| v.as_slice())
    }

    /// Check whether the key appears at least once
    pub fn contains_key(&self, key: &str) -> bool {
        self.latest_map().contains_key(key)
    }

    /// Distinct keys in first-encounter order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.latest_map().keys().map(|k| k.as_str())
    }

    /// The latest value for `key` as a boolean
    ///
    /// Accepts `true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`. A reset or
    /// absent key is `Ok(None)`.
    pub fn latest_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(v) = self.latest_str(key) else {
            return Ok(None);
        };
        match v {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            other => Err(Error::type_coercion(key, "a boolean", other)),
        }
    }

    /// The latest value for `key` as a signed integer
    pub fn latest_int(&self, key: &str) -> Result<Option<i64>> {
        let Some(v) = self.latest_str(key) else {
            return Ok(None);
        };
        v.parse::<i64>()
            .map(Some)
            .map_err(|_| Error::type_coercion(key, "an integer", v))
    }

    /// The latest value for `key` as a float
    pub fn latest_float(&self, key: &str) -> Result<Option<f64>> {
        let Some(v) = self.latest_str(key) else {
            return Ok(None);
        };
        v.parse::<f64>()
            .map(Some)
            .map_err(|_| Error::type_coercion(key, "a number", v))
    }

    /// The latest value for `key` as a duration
    ///
    /// Accepts `ms`, `s`, `m`, and `h` suffixes; a bare number is seconds.
    pub fn latest_duration(&self, key: &str) -> Result<Option<Duration>> {
        let Some(v) = self.latest_str(key) else {
            return Ok(None);
        };
        let split = v
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(v.len());
        let (digits, suffix) = v.split_at(split);
        let n: u64 = digits
            .parse()
            .map_err(|_| Error::type_coercion(key, "a duration", v))?;
        let duration = match suffix.trim() {
            "ms" => Duration::from_millis(n),
            "" | "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n.saturating_mul(60)),
            "h" => Duration::from_secs(n.saturating_mul(3600)),
            _ => return Err(Error::type_coercion(key, "a duration", v)),
        };
        Ok(Some(duration))
    }

    /// The latest value for `key` as a byte size
    ///
    /// Accepts binary `k`/`m`/`g`/`t` suffixes (an optional trailing `b` is
    /// tolerated, case-insensitive); a bare number is bytes.
    pub fn latest_byte_size(&self, key: &str) -> Result<Option<u64>> {
        let Some(v) = self.latest_str(key) else {
            return Ok(None);
        };
        let split = v
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(v.len());
        let (digits, suffix) = v.split_at(split);
        let n: u64 = digits
            .parse()
            .map_err(|_| Error::type_coercion(key, "a byte size", v))?;
        let multiplier: u64 = match suffix.trim().to_ascii_lowercase().as_str() {
            "" | "b" => 1,
            "k" | "kb" => 1 << 10,
            "m" | "mb" => 1 << 20,
            "g" | "gb" => 1 << 30,
            "t" | "tb" => 1 << 40,
            _ => return Err(Error::type_coercion(key, "a byte size", v)),
        };
        n.checked_mul(multiplier)
            .map(Some)
            .ok_or_else(|| Error::type_coercion(key, "a byte size", v))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<Entry> for Document {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(entries: Vec<Entry>) -> Document {
        Document::new(entries)
    }

    #[test]
    fn test_latest_returns_last_value() {
        let d = doc(vec![Entry::new("k", "1"), Entry::new("k", "3")]);
        assert_eq!(d.latest("k"), Some(Some("3")));
    }

    #[test]
    fn test_latest_absent_key() {
        let d = doc(vec![Entry::new("k", "1")]);
        assert_eq!(d.latest("missing"), None);
        assert_eq!(d.latest_str("missing"), None);
    }

    #[test]
    fn test_latest_reset() {
        let d = doc(vec![Entry::new("k", "1"), Entry::reset("k")]);
        assert_eq!(d.latest("k"), Some(None));
        assert_eq!(d.latest_str("k"), None);
    }

    #[test]
    fn test_all_values_includes_resets() {
        let d = doc(vec![
            Entry::new("k", "1"),
            Entry::reset("k"),
            Entry::new("k", "2"),
        ]);
        assert_eq!(
            d.all_values("k"),
            Some(&[Some("1".to_string()), None, Some("2".to_string())][..])
        );
    }

    #[test]
    fn test_keys_in_first_encounter_order() {
        let d = doc(vec![
            Entry::new("b", "1"),
            Entry::new("a", "2"),
            Entry::new("b", "3"),
        ]);
        let keys: Vec<&str> = d.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = doc(vec![Entry::new("a", "1"), Entry::new("b", "2")]);
        let b = doc(vec![Entry::new("b", "2"), Entry::new("a", "1")]);
        assert_ne!(a, b);

        let c = doc(vec![Entry::new("a", "1"), Entry::new("b", "2")]);
        assert_eq!(a, c);
    }

    #[test]
    fn test_views_do_not_affect_equality() {
        let a = doc(vec![Entry::new("a", "1")]);
        let b = doc(vec![Entry::new("a", "1")]);
        // Force a's caches, leave b's cold
        assert_eq!(a.latest("a"), Some(Some("1")));
        assert_eq!(a, b);
    }

    #[test]
    fn test_contains_key() {
        let d = doc(vec![Entry::reset("k")]);
        assert!(d.contains_key("k"));
        assert!(!d.contains_key("other"));
    }

    #[test]
    fn test_latest_bool() {
        let d = doc(vec![
            Entry::new("a", "true"),
            Entry::new("b", "off"),
            Entry::new("c", "maybe"),
        ]);
        assert_eq!(d.latest_bool("a").unwrap(), Some(true));
        assert_eq!(d.latest_bool("b").unwrap(), Some(false));
        assert_eq!(d.latest_bool("missing").unwrap(), None);
        assert!(d.latest_bool("c").is_err());
    }

    #[test]
    fn test_latest_bool_reset_is_none() {
        let d = doc(vec![Entry::new("k", "true"), Entry::reset("k")]);
        assert_eq!(d.latest_bool("k").unwrap(), None);
    }

    #[test]
    fn test_latest_int_and_float() {
        let d = doc(vec![Entry::new("i", "-42"), Entry::new("f", "2.5")]);
        assert_eq!(d.latest_int("i").unwrap(), Some(-42));
        assert_eq!(d.latest_float("f").unwrap(), Some(2.5));
        assert!(d.latest_int("f").is_err());
    }

    #[test]
    fn test_latest_duration() {
        let d = doc(vec![
            Entry::new("a", "250ms"),
            Entry::new("b", "2s"),
            Entry::new("c", "5m"),
            Entry::new("d", "1h"),
            Entry::new("e", "10"),
            Entry::new("bad", "fast"),
        ]);
        assert_eq!(d.latest_duration("a").unwrap(), Some(Duration::from_millis(250)));
        assert_eq!(d.latest_duration("b").unwrap(), Some(Duration::from_secs(2)));
        assert_eq!(d.latest_duration("c").unwrap(), Some(Duration::from_secs(300)));
        assert_eq!(d.latest_duration("d").unwrap(), Some(Duration::from_secs(3600)));
        assert_eq!(d.latest_duration("e").unwrap(), Some(Duration::from_secs(10)));
        assert!(d.latest_duration("bad").is_err());
    }

    #[test]
    fn test_latest_byte_size() {
        let d = doc(vec![
            Entry::new("a", "512"),
            Entry::new("b", "64k"),
            Entry::new("c", "2MB"),
            Entry::new("d", "1g"),
        ]);
        assert_eq!(d.latest_byte_size("a").unwrap(), Some(512));
        assert_eq!(d.latest_byte_size("b").unwrap(), Some(64 * 1024));
        assert_eq!(d.latest_byte_size("c").unwrap(), Some(2 * 1024 * 1024));
        assert_eq!(d.latest_byte_size("d").unwrap(), Some(1024 * 1024 * 1024));
    }

    #[test]
    fn test_serialize_as_entry_list() {
        let d = doc(vec![Entry::new("k", "v"), Entry::reset("r")]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(
            json,
            r#"[{"key":"k","value":"v"},{"key":"r","value":null}]"#
        );
    }
}
