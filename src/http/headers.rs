//! Ordered, case-insensitive header storage.
//!
//! # Design Decisions
//! - Fields keep insertion order and the key casing they were added with, so a
//!   parsed message serializes back byte for byte
//! - Duplicates are allowed (`Set-Cookie`); only `set_all` collapses them
//! - Header counts are small, lookups are linear scans

/// An ordered multi-map of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    items: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key, 0).is_some()
    }

    /// Index of the first field named `key` at or after `start`.
    pub fn find(&self, key: &str, start: usize) -> Option<usize> {
        self.items
            .iter()
            .skip(start)
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|i| i + start)
    }

    /// Adds a field unconditionally.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.push((key.into(), value.into()));
    }

    /// Value of the first field named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key, 0).map(|i| self.items[i].1.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Values of every field named `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Replaces the first field named `key`, or appends one.
    ///
    /// Later duplicates are left alone.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.find(&key, 0) {
            Some(i) => self.items[i] = (key, value.into()),
            None => self.items.push((key, value.into())),
        }
    }

    /// Replaces the first field named `key` and drops every other one.
    pub fn set_all(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.find(&key, 0) {
            Some(i) => {
                self.remove_all_from(&key, i + 1);
                self.items[i] = (key, value.into());
            }
            None => self.items.push((key, value.into())),
        }
    }

    /// Removes the first field named `key`.
    pub fn remove(&mut self, key: &str) -> Option<(String, String)> {
        self.find(key, 0).map(|i| self.items.remove(i))
    }

    /// Removes every field named `key`, returning how many were dropped.
    pub fn remove_all(&mut self, key: &str) -> usize {
        self.remove_all_from(key, 0)
    }

    fn remove_all_from(&mut self, key: &str, start: usize) -> usize {
        let before = self.items.len();
        let mut index = 0;
        self.items.retain(|(k, _)| {
            let keep = index < start || !k.eq_ignore_ascii_case(key);
            index += 1;
            keep
        });
        before - self.items.len()
    }

    /// The `i`-th field.
    pub fn at(&self, i: usize) -> Option<(&str, &str)> {
        self.items.get(i).map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Removes the `i`-th field.
    pub fn pop(&mut self, i: usize) -> Option<(String, String)> {
        (i < self.items.len()).then(|| self.items.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when a comma-separated field named `key` lists `token`.
    pub fn has_token(&self, key: &str, token: &str) -> bool {
        self.get_all(key)
            .iter()
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            items: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
