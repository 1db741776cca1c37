use serde::Serialize;
use std::collections::HashMap;
use std::string::FromUtf8Error;

/// Multi-value query parameters in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryMap {
    entries: Vec<(String, Vec<String>)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Raw bytes of values whose percent escapes are not UTF-8, keyed by
    /// (entry, position). The entry itself holds the lossy text.
    #[serde(skip)]
    undecodable: HashMap<(usize, usize), Vec<u8>>,
}

/// Percent-decode one form component. `+` is a space.
fn decode_component(raw: &str) -> Result<String, Vec<u8>> {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes()).into_owned();
    String::from_utf8(bytes).map_err(FromUtf8Error::into_bytes)
}

impl QueryMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. A value whose escapes do not decode to UTF-8
    /// reads back lossily (with U+FFFD) but keeps its raw bytes, see
    /// [`QueryMap::undecodable`].
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut map = Self::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)
                .unwrap_or_else(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            match decode_component(value) {
                Ok(value) => map.append(key, value),
                Err(bytes) => map.append_undecodable(key, bytes),
            }
        }
        map
    }

    /// Parse the query part of a request target such as `/api/x/?a=1`.
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((_, query)) => Self::parse(query),
            None => Self::new(),
        }
    }

    fn slot(&mut self, key: String) -> usize {
        if let Some(&entry) = self.index.get(&key) {
            return entry;
        }
        let entry = self.entries.len();
        self.index.insert(key.clone(), entry);
        self.entries.push((key, Vec::new()));
        entry
    }

    /// Add one value under `key`, after any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = self.slot(key.into());
        self.entries[entry].1.push(value.into());
    }

    /// Add a value that is not valid UTF-8.
    pub fn append_undecodable(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        let entry = self.slot(key.into());
        let values = &mut self.entries[entry].1;
        values.push(String::from_utf8_lossy(&bytes).into_owned());
        self.undecodable.insert((entry, values.len() - 1), bytes);
    }

    /// Raw bytes of the value at `position` under `key`, if it was not UTF-8.
    #[must_use]
    pub fn undecodable(&self, key: &str, position: usize) -> Option<&[u8]> {
        let entry = *self.index.get(key)?;
        self.undecodable_at(entry, position)
    }

    pub(crate) fn undecodable_at(&self, entry: usize, position: usize) -> Option<&[u8]> {
        self.undecodable.get(&(entry, position)).map(Vec::as_slice)
    }

    /// Every value for `key`, in arrival order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.index
            .get(key)
            .map(|&entry| self.entries[entry].1.as_slice())
            .unwrap_or(&[])
    }

    /// Last value for `key` ("last write wins").
    #[must_use]
    pub fn last(&self, key: &str) -> Option<&str> {
        self.get_all(key).last().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_keep_every_value() {
        let q = QueryMap::parse("a=1&b=x&a=2");
        assert_eq!(q.get_all("a"), ["1", "2"]);
        assert_eq!(q.last("a"), Some("2"));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn percent_and_plus_are_decoded() {
        let q = QueryMap::parse("?name=J%C3%BCrgen+M&f%5Bx%5D=1&sum=1%2B1");
        assert_eq!(q.last("name"), Some("Jürgen M"));
        assert_eq!(q.last("f[x]"), Some("1"));
        assert_eq!(q.last("sum"), Some("1+1"));
    }

    #[test]
    fn bare_keys_and_empty_pairs() {
        let q = QueryMap::parse("flag&&x=");
        assert_eq!(q.last("flag"), Some(""));
        assert_eq!(q.last("x"), Some(""));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn target_without_query_is_empty() {
        assert!(QueryMap::from_target("/api/math/add/").is_empty());
        assert_eq!(QueryMap::from_target("/p?x=1").last("x"), Some("1"));
    }

    #[test]
    fn key_order_is_first_seen() {
        let q: QueryMap = [("z", "1"), ("a", "2"), ("z", "3")].into_iter().collect();
        let keys: Vec<&str> = q.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a"]);
        assert_eq!(q.get_all("z"), ["1", "3"]);
    }

    #[test]
    fn invalid_utf8_keeps_raw_bytes() {
        let q = QueryMap::parse("name=ok&name=%FF%FE&other=%EF%BF%BD");
        assert_eq!(q.get_all("name"), ["ok", "\u{FFFD}\u{FFFD}"]);
        assert_eq!(q.undecodable("name", 0), None);
        assert_eq!(q.undecodable("name", 1), Some(&[0xFF, 0xFE][..]));
        // A well-formed U+FFFD escape is ordinary text.
        assert_eq!(q.last("other"), Some("\u{FFFD}"));
        assert_eq!(q.undecodable("other", 0), None);
    }

    #[test]
    fn many_distinct_keys_stay_addressable() {
        let q: QueryMap = (0..2000).map(|i| (format!("k{i}"), i.to_string())).collect();
        assert_eq!(q.len(), 2000);
        assert_eq!(q.last("k1999"), Some("1999"));
        assert_eq!(q.iter().next().map(|(k, _)| k), Some("k0"));
    }
}
