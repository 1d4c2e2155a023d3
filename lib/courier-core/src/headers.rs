//! Request header multimap.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Case-insensitive header multimap with ordered, de-duplicated values.
///
/// Names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: BTreeMap<String, Vec<String>>,
}

impl RequestHeaders {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to a header. Duplicate values are ignored.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        let values = self.entries.entry(normalize(name)).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
        self
    }

    /// Appends several values to a header.
    pub fn add_all<I, V>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.add(name, value);
        }
        self
    }

    /// Adds a header only when it is not already present.
    ///
    /// Returns `true` if the value was added.
    pub fn try_add(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.entries.entry(normalize(name)) {
            Entry::Vacant(entry) => {
                entry.insert(vec![value.into()]);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Replaces all values of a header.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.entries.insert(normalize(name), vec![value.into()]);
        self
    }

    /// All values of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(&normalize(name)).map(Vec::as_slice)
    }

    /// First value of a header.
    #[must_use]
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Removes a header and returns its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&normalize(name))
    }

    /// Removes one value of a header; drops the header when no value is left.
    pub fn remove_value(&mut self, name: &str, value: &str) -> bool {
        let key = normalize(name);
        let Some(values) = self.entries.get_mut(&key) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    /// Copies every header of `other` into this map.
    pub fn extend(&mut self, other: &Self) {
        for (name, values) in other.iter() {
            self.add_all(name, values.iter().cloned());
        }
    }

    /// Iterates over `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut headers = RequestHeaders::new();
        headers.add("Content-Type", "application/json");

        assert!(headers.contains("content-type"));
        assert_eq!(headers.get_first("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn values_keep_order_without_duplicates() {
        let mut headers = RequestHeaders::new();
        headers
            .add("Accept", "application/json")
            .add("accept", "text/plain")
            .add("ACCEPT", "application/json");

        assert_eq!(
            headers.get("accept"),
            Some(&["application/json".to_string(), "text/plain".to_string()][..])
        );
    }

    #[test]
    fn try_add_keeps_existing() {
        let mut headers = RequestHeaders::new();
        assert!(headers.try_add("X-Id", "1"));
        assert!(!headers.try_add("x-id", "2"));
        assert_eq!(headers.get_first("x-id"), Some("1"));
    }

    #[test]
    fn insert_replaces_values() {
        let mut headers = RequestHeaders::new();
        headers.add("Accept", "a").add("Accept", "b");
        headers.insert("accept", "c");
        assert_eq!(headers.get("accept"), Some(&["c".to_string()][..]));
    }

    #[test]
    fn remove_value_drops_empty_header() {
        let mut headers = RequestHeaders::new();
        headers.add("Accept", "a").add("Accept", "b");

        assert!(headers.remove_value("accept", "a"));
        assert!(!headers.remove_value("accept", "a"));
        assert!(headers.remove_value("accept", "b"));
        assert!(!headers.contains("accept"));
    }

    #[test]
    fn extend_merges_values() {
        let mut left = RequestHeaders::new();
        left.add("Accept", "a");
        let mut right = RequestHeaders::new();
        right.add("accept", "b").add("X-Id", "1");

        left.extend(&right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get("accept").map(<[String]>::len), Some(2));
    }
}
