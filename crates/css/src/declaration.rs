//! Inline declaration parsing
//!
//! Turns `property: value;` strings (a `style` attribute, a rule's
//! `cssText`) into a property map. Best-effort: malformed input never
//! fails.

use rustc_hash::FxHashMap;

/// Property name to trimmed value.
///
/// A segment without a `:` separator maps its text to an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationMap {
    entries: FxHashMap<String, Option<String>>,
}

impl DeclarationMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a property; `None` when missing or absent
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries.get(property).and_then(|v| v.as_deref())
    }

    /// Raw entry: `Some(None)` for a property parsed without a value
    pub fn entry(&self, property: &str) -> Option<Option<&str>> {
        self.entries.get(property).map(|v| v.as_deref())
    }

    pub fn contains_property(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    /// Insert or overwrite a property
    pub fn insert(&mut self, property: impl Into<String>, value: Option<String>) {
        self.entries.insert(property.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Merge `other` into `self`; properties of `other` win
    pub fn merge(&mut self, other: DeclarationMap) {
        self.entries.extend(other.entries);
    }

    /// Serialize as `name: value;` pairs sorted by property name
    pub fn to_css_text(&self) -> String {
        let mut properties: Vec<_> = self.iter().collect();
        properties.sort_by(|a, b| a.0.cmp(b.0));
        properties
            .into_iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{}: {};", name, value),
                None => format!("{};", name),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for DeclarationMap {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Parse a semicolon-delimited declaration string.
///
/// Blank segments are skipped, each segment is split on its first `:`,
/// both sides are trimmed and later duplicates overwrite earlier ones.
pub fn parse_declarations(input: &str) -> DeclarationMap {
    let mut map = DeclarationMap::new();

    for segment in input.split(';').filter(|s| !s.trim().is_empty()) {
        match segment.split_once(':') {
            Some((property, value)) => {
                map.insert(property.trim(), Some(value.trim().to_string()));
            }
            None => {
                map.insert(segment.trim(), None);
            }
        }
    }

    map
}
