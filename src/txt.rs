//! DNS-SD TXT record data (RFC 6763 §6) with the libp2p extension of
//! multi-valued keys.


use std::collections::HashMap;

/// TXT attributes of a service.
///
/// Two synchronized views back the API: the raw strings in insertion order
/// (which is the wire order) and an index from lowercased key to the
/// positions holding that key. The single-value accessors ([`get`],
/// [`set`]) give DNS-SD semantics; the multi-value ones ([`values`],
/// [`append`], [`set_values`]) give libp2p semantics, where a key may occur
/// any number of times.
///
/// Each raw string is either `"key"` (a boolean attribute, whose value reads
/// as the empty string) or `"key=value"`; only the first `=` separates key
/// from value, so values may contain `=`. Key lookups fold ASCII case;
/// values keep theirs. Empty strings are dropped on construction.
///
/// [`get`]: TxtRecord::get
/// [`set`]: TxtRecord::set
/// [`values`]: TxtRecord::values
/// [`append`]: TxtRecord::append
/// [`set_values`]: TxtRecord::set_values
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxtRecord {
    strings: Vec<String>,
    index: HashMap<String, Vec<usize>>,
}

impl TxtRecord {
    pub fn new() -> Self {
        TxtRecord::default()
    }

    /// Builds a record from raw TXT strings, preserving their order and
    /// dropping empty ones.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut txt = TxtRecord::new();
        for s in strings {
            let s = s.into();
            if s.is_empty() {
                continue;
            }
            let key = Self::key_of(&s);
            let pos = txt.strings.len();
            txt.strings.push(s);
            txt.index.entry(key).or_default().push(pos);
        }
        txt
    }

    /// The first value for `key` (DNS-SD semantics), `None` if the key is
    /// absent. A boolean attribute reads as `Some("")`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let positions = self.index.get(&key.to_ascii_lowercase())?;
        positions.first().map(|&pos| Self::value_of(&self.strings[pos]))
    }

    /// All values for `key` in insertion order (libp2p semantics).
    pub fn values(&self, key: &str) -> Vec<&str> {
        match self.index.get(&key.to_ascii_lowercase()) {
            Some(positions) => positions
                .iter()
                .map(|&pos| Self::value_of(&self.strings[pos]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether at least one entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_ascii_lowercase())
    }

    /// Replaces all entries for `key` with the single `key=value` entry, or
    /// removes the key entirely when `value` is `None`.
    pub fn set(&mut self, key: &str, value: Option<&str>) {
        self.remove(key);
        if let Some(value) = value {
            self.append(key, value);
        }
    }

    /// Adds another `key=value` entry without touching existing ones.
    pub fn append(&mut self, key: &str, value: &str) {
        if key.is_empty() {
            return;
        }
        let pos = self.strings.len();
        self.strings.push(format!("{key}={value}"));
        self.index
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(pos);
    }

    /// Replaces all entries for `key` with one entry per given value, in
    /// order.
    pub fn set_values<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove(key);
        for value in values {
            self.append(key, value.as_ref());
        }
    }

    /// Removes every entry for `key`.
    pub fn remove(&mut self, key: &str) {
        let key = key.to_ascii_lowercase();
        if self.index.remove(&key).is_none() {
            return;
        }
        self.strings.retain(|s| Self::key_of(s) != key);
        self.rebuild_index();
    }

    /// The raw strings in insertion order; this is the wire order.
    pub fn to_strings(&self) -> &[String] {
        &self.strings
    }

    /// Number of raw entries.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    // Removal invalidates stored positions, so the index is rebuilt from the
    // raw view.
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, s) in self.strings.iter().enumerate() {
            self.index.entry(Self::key_of(s)).or_default().push(pos);
        }
    }

    // Lowercased key: everything before the first '='.
    fn key_of(s: &str) -> String {
        match s.split_once('=') {
            Some((key, _)) => key.to_ascii_lowercase(),
            None => s.to_ascii_lowercase(),
        }
    }

    // Value: everything after the first '='; boolean attributes read as "".
    fn value_of(s: &str) -> &str {
        match s.split_once('=') {
            Some((_, value)) => value,
            None => "",
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TxtRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TxtRecord::from_strings(iter)
    }
}
