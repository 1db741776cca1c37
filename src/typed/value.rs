use crate::dispatcher::ApiRequest;
use serde_json::{Map, Number, Value};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A value after casting, ready to bind to a parameter.
///
/// Defaults declared on a parameter bind as [`Typed::Raw`], so every
/// [`FromTyped`] conversion also accepts the matching raw JSON shape.
pub enum Typed {
    /// Untouched JSON (unannotated parameters and defaults).
    Raw(Value),
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<Value>),
    /// Distinct values in first-seen order.
    Set(Vec<Value>),
    Mapping(Map<String, Value>),
    /// A value built by a nested callable.
    Instance(Box<dyn Any + Send>),
    /// The live inbound request, injected under the reserved `request` name.
    Request(Arc<ApiRequest>),
}

impl Typed {
    /// Wrap anything serializable as raw JSON.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Typed, serde_json::Error> {
        serde_json::to_value(value).map(Typed::Raw)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Typed::Raw(Value::Null))
    }

    /// Short name of the variant, for logs and error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Typed::Raw(_) => "raw",
            Typed::Int(_) => "int",
            Typed::Float(_) => "float",
            Typed::Bool(_) => "bool",
            Typed::Text(_) => "text",
            Typed::Bytes(_) => "bytes",
            Typed::Sequence(_) => "sequence",
            Typed::Set(_) => "set",
            Typed::Mapping(_) => "mapping",
            Typed::Instance(_) => "instance",
            Typed::Request(_) => "request",
        }
    }

    /// Serialize back to JSON. Instances and the request object have no JSON
    /// form and are handed back unchanged.
    pub fn into_json(self) -> Result<Value, Typed> {
        Ok(match self {
            Typed::Raw(v) => v,
            Typed::Int(i) => Value::from(i),
            Typed::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Typed::Bool(b) => Value::Bool(b),
            Typed::Text(s) => Value::String(s),
            Typed::Bytes(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
            Typed::Sequence(items) | Typed::Set(items) => Value::Array(items),
            Typed::Mapping(m) => Value::Object(m),
            other @ (Typed::Instance(_) | Typed::Request(_)) => return Err(other),
        })
    }
}

impl fmt::Debug for Typed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typed::Raw(v) => f.debug_tuple("Raw").field(v).finish(),
            Typed::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Typed::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Typed::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Typed::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Typed::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Typed::Sequence(v) => f.debug_tuple("Sequence").field(v).finish(),
            Typed::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Typed::Mapping(m) => f.debug_tuple("Mapping").field(m).finish(),
            Typed::Instance(_) => f.write_str("Instance(..)"),
            Typed::Request(r) => f.debug_tuple("Request").field(&r.id()).finish(),
        }
    }
}

/// Conversion from a bound [`Typed`] value into a concrete Rust type.
pub trait FromTyped: Sized {
    /// `None` when the value has the wrong shape.
    fn from_typed(value: Typed) -> Option<Self>;

    /// Field message for a `value` that [`FromTyped::from_typed`] rejects.
    fn mismatch(_value: &Typed) -> &'static str {
        "Invalid input type."
    }
}

macro_rules! int_from_typed {
    ($($t:ty),*) => {$(
        impl FromTyped for $t {
            fn from_typed(value: Typed) -> Option<Self> {
                match value {
                    Typed::Int(i) => <$t>::try_from(i).ok(),
                    Typed::Raw(Value::Number(n)) => n.as_i64().and_then(|i| <$t>::try_from(i).ok()),
                    _ => None,
                }
            }

            fn mismatch(value: &Typed) -> &'static str {
                match value {
                    Typed::Int(_) | Typed::Raw(Value::Number(_)) => "Number too large.",
                    _ => "Not a valid number.",
                }
            }
        }
    )*};
}

int_from_typed!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl FromTyped for f64 {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Float(f) => Some(f),
            Typed::Int(i) => Some(i as f64),
            Typed::Raw(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid number."
    }
}

impl FromTyped for f32 {
    fn from_typed(value: Typed) -> Option<Self> {
        f64::from_typed(value).map(|f| f as f32)
    }

    fn mismatch(value: &Typed) -> &'static str {
        f64::mismatch(value)
    }
}

impl FromTyped for bool {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Bool(b) | Typed::Raw(Value::Bool(b)) => Some(b),
            _ => None,
        }
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid boolean."
    }
}

impl FromTyped for String {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Text(s) | Typed::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid string."
    }
}

impl FromTyped for Vec<u8> {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Bytes(b) => Some(b),
            Typed::Raw(Value::String(s)) => Some(s.into_bytes()),
            _ => None,
        }
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid string."
    }
}

fn items(value: Typed) -> Option<Vec<Value>> {
    match value {
        Typed::Sequence(items) | Typed::Set(items) | Typed::Raw(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn strings(items: Vec<Value>) -> Option<Vec<String>> {
    items
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// A list whose items are not all strings is reported per item type.
fn string_items_mismatch(value: &Typed) -> &'static str {
    match value {
        Typed::Sequence(_) | Typed::Set(_) | Typed::Raw(Value::Array(_)) => "Not a valid string.",
        _ => "Not a valid list.",
    }
}

impl FromTyped for Vec<Value> {
    fn from_typed(value: Typed) -> Option<Self> {
        items(value)
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid list."
    }
}

impl FromTyped for Vec<String> {
    fn from_typed(value: Typed) -> Option<Self> {
        items(value).and_then(strings)
    }

    fn mismatch(value: &Typed) -> &'static str {
        string_items_mismatch(value)
    }
}

impl FromTyped for BTreeSet<String> {
    fn from_typed(value: Typed) -> Option<Self> {
        items(value).and_then(strings).map(|v| v.into_iter().collect())
    }

    fn mismatch(value: &Typed) -> &'static str {
        string_items_mismatch(value)
    }
}

impl FromTyped for HashSet<String> {
    fn from_typed(value: Typed) -> Option<Self> {
        items(value).and_then(strings).map(|v| v.into_iter().collect())
    }

    fn mismatch(value: &Typed) -> &'static str {
        string_items_mismatch(value)
    }
}

impl FromTyped for Map<String, Value> {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Mapping(m) | Typed::Raw(Value::Object(m)) => Some(m),
            _ => None,
        }
    }

    fn mismatch(_value: &Typed) -> &'static str {
        "Not a valid mapping type."
    }
}

impl FromTyped for HashMap<String, Value> {
    fn from_typed(value: Typed) -> Option<Self> {
        Map::from_typed(value).map(|m| m.into_iter().collect())
    }

    fn mismatch(value: &Typed) -> &'static str {
        <Map<String, Value>>::mismatch(value)
    }
}

impl FromTyped for BTreeMap<String, Value> {
    fn from_typed(value: Typed) -> Option<Self> {
        Map::from_typed(value).map(|m| m.into_iter().collect())
    }

    fn mismatch(value: &Typed) -> &'static str {
        <Map<String, Value>>::mismatch(value)
    }
}

impl FromTyped for Value {
    fn from_typed(value: Typed) -> Option<Self> {
        value.into_json().ok()
    }
}

impl FromTyped for Arc<ApiRequest> {
    fn from_typed(value: Typed) -> Option<Self> {
        match value {
            Typed::Request(r) => Some(r),
            _ => None,
        }
    }
}

impl<T: FromTyped> FromTyped for Option<T> {
    fn from_typed(value: Typed) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_typed(value).map(Some)
    }

    fn mismatch(value: &Typed) -> &'static str {
        T::mismatch(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ints_accept_cast_and_default_shapes() {
        assert_eq!(i64::from_typed(Typed::Int(5)), Some(5));
        assert_eq!(i32::from_typed(Typed::Raw(json!(10))), Some(10));
        assert_eq!(u8::from_typed(Typed::Int(300)), None);
        assert_eq!(i64::from_typed(Typed::Text("5".into())), None);
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<i64>::from_typed(Typed::Raw(Value::Null)), Some(None));
        assert_eq!(Option::<i64>::from_typed(Typed::Int(1)), Some(Some(1)));
    }

    #[test]
    fn string_lists_reject_mixed_items() {
        assert_eq!(
            Vec::<String>::from_typed(Typed::Sequence(vec![json!("a"), json!("b")])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(Vec::<String>::from_typed(Typed::Sequence(vec![json!(1)])), None);
    }

    #[test]
    fn mismatch_messages_name_the_expected_type() {
        assert_eq!(u8::mismatch(&Typed::Int(300)), "Number too large.");
        assert_eq!(u32::mismatch(&Typed::Raw(json!(-1))), "Number too large.");
        assert_eq!(i64::mismatch(&Typed::Text("x".into())), "Not a valid number.");
        assert_eq!(Vec::<String>::mismatch(&Typed::Sequence(vec![json!(1)])), "Not a valid string.");
        assert_eq!(Vec::<String>::mismatch(&Typed::Text("a".into())), "Not a valid list.");
        assert_eq!(Option::<bool>::mismatch(&Typed::Int(2)), "Not a valid boolean.");
    }

    #[test]
    fn into_json_covers_scalars_and_containers() {
        assert_eq!(Typed::Bytes(b"hi".to_vec()).into_json().ok(), Some(json!("hi")));
        assert_eq!(Typed::Set(vec![json!(1)]).into_json().ok(), Some(json!([1])));
        assert!(Typed::Instance(Box::new(3u8)).into_json().is_err());
    }
}
