use super::map::QueryMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::trace;

#[allow(clippy::expect_used)]
static BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("bracket pattern is valid"));

/// Split `filter[date][from]` into `["filter", "date", "from"]`.
///
/// The root is everything before the first `[`; every bracketed segment in the
/// key contributes one more path element, empty ones (`a[]`) included.
fn key_path(key: &str) -> SmallVec<[&str; 4]> {
    let root = key.split_once('[').map_or(key, |(root, _)| root);
    let mut path: SmallVec<[&str; 4]> = SmallVec::new();
    path.push(root);
    for cap in BRACKET.captures_iter(key) {
        if let Some(segment) = cap.get(1) {
            path.push(segment.as_str());
        }
    }
    path
}

fn set_node(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            root.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let node = root
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(child) = node {
                set_node(child, rest, value);
            }
        }
    }
}

/// Decode bracketed query keys into a nested object.
///
/// Each leaf holds the full list of values for its original key. A value that
/// was not valid UTF-8 appears as an array of its bytes, which text fields
/// reject and byte fields accept. When two keys disagree about whether a
/// segment is a leaf or a branch, the later key (in [`QueryMap`] order) wins.
#[must_use]
pub fn decode(query: &QueryMap) -> Map<String, Value> {
    let mut parsed = Map::new();
    for (entry, (key, values)) in query.iter().enumerate() {
        let path = key_path(key);
        let leaf = Value::Array(
            values
                .iter()
                .enumerate()
                .map(|(position, value)| match query.undecodable_at(entry, position) {
                    Some(bytes) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
                    None => Value::String(value.clone()),
                })
                .collect(),
        );
        trace!(key = %key, depth = path.len(), "Query key decoded");
        set_node(&mut parsed, &path, leaf);
    }
    parsed
}

/// Recursively merge `source` into `destination`; `source` wins per key.
///
/// Objects merge key by key. Any other value replaces what was there, and an
/// object in `source` replaces a non-object in `destination`.
pub fn merge(source: Map<String, Value>, destination: &mut Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(child) => {
                let node = destination
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                if let Value::Object(target) = node {
                    merge(child, target);
                }
            }
            other => {
                destination.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn nested_key_keeps_all_values() {
        let q: QueryMap = [("a[b][c]", "1"), ("a[b][c]", "2")].into_iter().collect();
        assert_eq!(Value::Object(decode(&q)), json!({"a": {"b": {"c": ["1", "2"]}}}));
    }

    #[test]
    fn siblings_share_intermediate_maps() {
        let q = QueryMap::parse("filter[date][from]=x&filter[date][to]=y&filter[kind]=z&plain=1");
        assert_eq!(
            Value::Object(decode(&q)),
            json!({
                "filter": {"date": {"from": ["x"], "to": ["y"]}, "kind": ["z"]},
                "plain": ["1"]
            })
        );
    }

    #[test]
    fn later_branch_overwrites_scalar() {
        let q: QueryMap = [("a", "1"), ("a[b]", "2")].into_iter().collect();
        assert_eq!(Value::Object(decode(&q)), json!({"a": {"b": ["2"]}}));
    }

    #[test]
    fn later_leaf_overwrites_branch() {
        let q: QueryMap = [("a[b]", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(Value::Object(decode(&q)), json!({"a": ["1"]}));
    }

    #[test]
    fn empty_brackets_are_a_segment() {
        let q = QueryMap::parse("ids[]=1&ids[]=2");
        assert_eq!(Value::Object(decode(&q)), json!({"ids": {"": ["1", "2"]}}));
    }

    #[test]
    fn undecodable_values_stay_bytes() {
        let q = QueryMap::parse("name=%FF&name=ok&n[x]=%C3");
        assert_eq!(
            Value::Object(decode(&q)),
            json!({"name": [[255], "ok"], "n": {"x": [[195]]}})
        );
    }

    #[test]
    fn decode_is_deterministic() {
        let q = QueryMap::parse("x[y]=1&z=2&x[w]=3");
        assert_eq!(decode(&q), decode(&q));
    }

    #[test]
    fn body_wins_per_key_and_keeps_siblings() {
        let mut query = obj(json!({"a": {"x": 0, "y": 2}}));
        merge(obj(json!({"a": {"x": 1}})), &mut query);
        assert_eq!(Value::Object(query), json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn body_object_replaces_query_scalar() {
        let mut query = obj(json!({"a": ["1"], "b": ["2"]}));
        merge(obj(json!({"a": {"c": true}})), &mut query);
        assert_eq!(Value::Object(query), json!({"a": {"c": true}, "b": ["2"]}));
    }
}
