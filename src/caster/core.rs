use super::nested::NestedCaster;
use super::types::{NestedType, TypeTag};
use crate::error::ValidationErrors;
use crate::typed::Typed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use std::sync::Arc;

/// Case-sensitive token sets for boolean parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoolTokens {
    truthy: BTreeSet<String>,
    falsy: BTreeSet<String>,
}

impl BoolTokens {
    pub fn new<I, J, S, T>(truthy: I, falsy: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            truthy: truthy.into_iter().map(Into::into).collect(),
            falsy: falsy.into_iter().map(Into::into).collect(),
        }
    }

    /// `None` for tokens in neither set.
    #[must_use]
    pub fn parse(&self, token: &str) -> Option<bool> {
        if self.truthy.contains(token) {
            Some(true)
        } else if self.falsy.contains(token) {
            Some(false)
        } else {
            None
        }
    }

    #[must_use]
    pub fn truthy(&self) -> &BTreeSet<String> {
        &self.truthy
    }

    #[must_use]
    pub fn falsy(&self) -> &BTreeSet<String> {
        &self.falsy
    }
}

impl Default for BoolTokens {
    fn default() -> Self {
        Self::new(["1", "true", "yes", "on"], ["0", "false", "no", "off", ""])
    }
}

/// Why a wire value could not be cast.
#[derive(Debug, Clone, PartialEq)]
pub enum CastError {
    InvalidNumber,
    NumberTooLarge,
    InvalidBoolean,
    InvalidString,
    InvalidUtf8,
    InvalidList,
    InvalidMapping,
    /// A nested parameter received something other than an object.
    InvalidNestedInput,
    /// The nested schema rejected one or more of its own fields.
    Nested(ValidationErrors),
    /// The nested callable itself failed.
    Construct(String),
    /// A lazily referenced schema could not be resolved.
    Unresolved(String),
}

impl CastError {
    /// Message recorded against the field.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            CastError::InvalidNumber => "Not a valid number.".to_string(),
            CastError::NumberTooLarge => "Number too large.".to_string(),
            CastError::InvalidBoolean => "Not a valid boolean.".to_string(),
            CastError::InvalidString => "Not a valid string.".to_string(),
            CastError::InvalidUtf8 => "Not a valid utf-8 string.".to_string(),
            CastError::InvalidList => "Not a valid list.".to_string(),
            CastError::InvalidMapping => "Not a valid mapping type.".to_string(),
            CastError::InvalidNestedInput => "Invalid input type.".to_string(),
            CastError::Nested(errors) => errors.to_value().to_string(),
            CastError::Construct(message) | CastError::Unresolved(message) => message.clone(),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CastError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Integers in `min..=max`.
    Int { min: i64, max: i64 },
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Sequence,
    Set,
    Mapping,
}

/// Converts one wire value into a [`Typed`] value, or rejects it.
#[derive(Debug, Clone)]
pub enum Caster {
    Raw,
    Number(NumberKind),
    Boolean(Arc<BoolTokens>),
    Text,
    Bytes,
    Container(ContainerKind),
    Nested(NestedCaster),
}

impl Caster {
    /// Pick the caster for a declared type. Nested types are handed to
    /// `nested`, which owns schema resolution.
    pub fn resolve<E>(
        tag: &TypeTag,
        tokens: &Arc<BoolTokens>,
        nested: impl FnOnce(&NestedType) -> Result<NestedCaster, E>,
    ) -> Result<Caster, E> {
        Ok(match tag {
            TypeTag::Any => Caster::Raw,
            TypeTag::Int => Caster::Number(NumberKind::Int {
                min: i64::MIN,
                max: i64::MAX,
            }),
            TypeTag::BoundedInt { min, max } => Caster::Number(NumberKind::Int {
                min: *min,
                max: *max,
            }),
            TypeTag::Float => Caster::Number(NumberKind::Float),
            TypeTag::Bool => Caster::Boolean(Arc::clone(tokens)),
            TypeTag::Text => Caster::Text,
            TypeTag::Bytes => Caster::Bytes,
            TypeTag::Sequence => Caster::Container(ContainerKind::Sequence),
            TypeTag::Set => Caster::Container(ContainerKind::Set),
            TypeTag::Mapping => Caster::Container(ContainerKind::Mapping),
            TypeTag::Nested(target) => Caster::Nested(nested(target)?),
        })
    }

    /// The nested caster, for output projection.
    #[must_use]
    pub fn as_nested(&self) -> Option<&NestedCaster> {
        match self {
            Caster::Nested(nested) => Some(nested),
            _ => None,
        }
    }

    pub fn cast(&self, value: &Value) -> Result<Typed, CastError> {
        match self {
            Caster::Raw => Ok(Typed::Raw(value.clone())),
            Caster::Number(NumberKind::Int { min, max }) => {
                let i = cast_int(last_value(value, CastError::InvalidNumber)?)?;
                // Below the range of an unsigned width counts as too large too.
                if (*min..=*max).contains(&i) {
                    Ok(Typed::Int(i))
                } else {
                    Err(CastError::NumberTooLarge)
                }
            }
            Caster::Number(NumberKind::Float) => {
                cast_float(last_value(value, CastError::InvalidNumber)?)
            }
            Caster::Boolean(tokens) => cast_bool(last_value(value, CastError::InvalidBoolean)?, tokens),
            Caster::Text => cast_text(last_value(value, CastError::InvalidString)?),
            Caster::Bytes => cast_bytes(last_value(value, CastError::InvalidString)?),
            Caster::Container(kind) => cast_container(*kind, value),
            Caster::Nested(nested) => nested.cast(value),
        }
    }
}

/// Repeated query keys arrive as lists; scalar casters use the last one.
fn last_value(value: &Value, empty: CastError) -> Result<&Value, CastError> {
    match value {
        Value::Array(items) => items.last().ok_or(empty),
        other => Ok(other),
    }
}

fn cast_int(value: &Value) -> Result<i64, CastError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.is_u64() {
                return Err(CastError::NumberTooLarge);
            }
            let f = n.as_f64().ok_or(CastError::InvalidNumber)?;
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f.trunc() as i64)
            } else {
                Err(CastError::NumberTooLarge)
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(i),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Err(CastError::NumberTooLarge),
                _ => Err(CastError::InvalidNumber),
            },
        },
        // Booleans are rejected outright rather than read as 0/1.
        _ => Err(CastError::InvalidNumber),
    }
}

fn cast_float(value: &Value) -> Result<Typed, CastError> {
    match value {
        Value::Number(n) => n.as_f64().map(Typed::Float).ok_or(CastError::InvalidNumber),
        Value::String(s) => {
            let text = s.trim();
            let f = text.parse::<f64>().map_err(|_| CastError::InvalidNumber)?;
            if f.is_finite() {
                Ok(Typed::Float(f))
            } else if f.is_infinite() && !text.to_ascii_lowercase().contains("inf") {
                Err(CastError::NumberTooLarge)
            } else {
                Err(CastError::InvalidNumber)
            }
        }
        _ => Err(CastError::InvalidNumber),
    }
}

fn cast_bool(value: &Value, tokens: &BoolTokens) -> Result<Typed, CastError> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => tokens.parse(s),
        Value::Number(n) => tokens.parse(&n.to_string()),
        _ => None,
    };
    parsed.map(Typed::Bool).ok_or(CastError::InvalidBoolean)
}

/// Query values that were not UTF-8 arrive as a non-empty array of bytes.
fn raw_bytes(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

fn cast_text(value: &Value) -> Result<Typed, CastError> {
    match value {
        Value::String(s) => Ok(Typed::Text(s.clone())),
        Value::Array(items) => {
            let bytes = raw_bytes(items).ok_or(CastError::InvalidString)?;
            String::from_utf8(bytes)
                .map(Typed::Text)
                .map_err(|_| CastError::InvalidUtf8)
        }
        _ => Err(CastError::InvalidString),
    }
}

fn cast_bytes(value: &Value) -> Result<Typed, CastError> {
    match value {
        Value::String(s) => Ok(Typed::Bytes(s.as_bytes().to_vec())),
        Value::Array(items) => raw_bytes(items)
            .map(Typed::Bytes)
            .ok_or(CastError::InvalidString),
        _ => Err(CastError::InvalidString),
    }
}

/// Containers take the whole value; elements are not validated.
fn cast_container(kind: ContainerKind, value: &Value) -> Result<Typed, CastError> {
    match kind {
        ContainerKind::Mapping => match value {
            Value::Object(m) => Ok(Typed::Mapping(m.clone())),
            _ => Err(CastError::InvalidMapping),
        },
        ContainerKind::Sequence | ContainerKind::Set => {
            let items = match value {
                Value::Array(items) => items.clone(),
                Value::Object(_) => return Err(CastError::InvalidList),
                scalar => vec![scalar.clone()],
            };
            if kind == ContainerKind::Sequence {
                return Ok(Typed::Sequence(items));
            }
            let mut distinct: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !distinct.contains(&item) {
                    distinct.push(item);
                }
            }
            Ok(Typed::Set(distinct))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caster(tag: TypeTag) -> Caster {
        Caster::resolve(&tag, &Arc::new(BoolTokens::default()), |_| Err(())).unwrap()
    }

    fn int(v: Value) -> Result<i64, CastError> {
        match caster(TypeTag::Int).cast(&v)? {
            Typed::Int(i) => Ok(i),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn int_uses_last_query_value() {
        assert_eq!(int(json!(["1", "2"])), Ok(2));
        assert_eq!(int(json!(" 7 ")), Ok(7));
        assert_eq!(int(json!(12)), Ok(12));
        assert_eq!(int(json!(5.9)), Ok(5));
    }

    #[test]
    fn int_rejects_booleans_and_garbage() {
        assert_eq!(int(json!(true)), Err(CastError::InvalidNumber));
        assert_eq!(int(json!("three")), Err(CastError::InvalidNumber));
        assert_eq!(int(json!("5.0")), Err(CastError::InvalidNumber));
        assert_eq!(int(json!([])), Err(CastError::InvalidNumber));
    }

    #[test]
    fn overflow_is_distinct_from_invalid() {
        assert_eq!(int(json!("99999999999999999999")), Err(CastError::NumberTooLarge));
        assert_eq!(int(json!(u64::MAX)), Err(CastError::NumberTooLarge));
        assert_eq!(int(json!(1e300)), Err(CastError::NumberTooLarge));
        let float = caster(TypeTag::Float);
        assert_eq!(float.cast(&json!("1e999")).err(), Some(CastError::NumberTooLarge));
        assert_eq!(float.cast(&json!("inf")).err(), Some(CastError::InvalidNumber));
        assert!(matches!(float.cast(&json!("2.5")), Ok(Typed::Float(f)) if f == 2.5));
        assert_eq!(float.cast(&json!(false)).err(), Some(CastError::InvalidNumber));
    }

    #[test]
    fn bounded_ints_reject_values_outside_the_width() {
        let byte = caster(TypeTag::int_range(u8::MIN.into(), u8::MAX.into()));
        assert!(matches!(byte.cast(&json!("255")), Ok(Typed::Int(255))));
        assert_eq!(byte.cast(&json!("300")).err(), Some(CastError::NumberTooLarge));
        assert_eq!(byte.cast(&json!(256)).err(), Some(CastError::NumberTooLarge));
        let count = caster(TypeTag::int_range(u32::MIN.into(), u32::MAX.into()));
        assert_eq!(count.cast(&json!(["-1"])).err(), Some(CastError::NumberTooLarge));
        assert!(matches!(count.cast(&json!(0)), Ok(Typed::Int(0))));
        let small = caster(TypeTag::int_range(i8::MIN.into(), i8::MAX.into()));
        assert_eq!(small.cast(&json!(-129)).err(), Some(CastError::NumberTooLarge));
        assert_eq!(small.cast(&json!("x")).err(), Some(CastError::InvalidNumber));
    }

    #[test]
    fn bool_tokens_are_case_sensitive() {
        let b = caster(TypeTag::Bool);
        assert!(matches!(b.cast(&json!(["yes"])), Ok(Typed::Bool(true))));
        assert!(matches!(b.cast(&json!("off")), Ok(Typed::Bool(false))));
        assert!(matches!(b.cast(&json!("")), Ok(Typed::Bool(false))));
        assert!(matches!(b.cast(&json!(true)), Ok(Typed::Bool(true))));
        assert!(matches!(b.cast(&json!(1)), Ok(Typed::Bool(true))));
        assert_eq!(b.cast(&json!("maybe")).err(), Some(CastError::InvalidBoolean));
        assert_eq!(b.cast(&json!("True")).err(), Some(CastError::InvalidBoolean));
    }

    #[test]
    fn custom_bool_tokens() {
        let tokens = Arc::new(BoolTokens::new(["y"], ["n"]));
        let b = Caster::resolve(&TypeTag::Bool, &tokens, |_| Err(())).unwrap();
        assert!(matches!(b.cast(&json!("y")), Ok(Typed::Bool(true))));
        assert_eq!(b.cast(&json!("yes")).err(), Some(CastError::InvalidBoolean));
    }

    #[test]
    fn text_and_bytes() {
        let text = caster(TypeTag::Text);
        assert!(matches!(text.cast(&json!(["a", "b"])), Ok(Typed::Text(s)) if s == "b"));
        assert_eq!(text.cast(&json!(5)).err(), Some(CastError::InvalidString));
        let bytes = caster(TypeTag::Bytes);
        assert!(matches!(bytes.cast(&json!("hé")), Ok(Typed::Bytes(b)) if b == "hé".as_bytes()));
        assert_eq!(bytes.cast(&json!({})).err(), Some(CastError::InvalidString));
    }

    #[test]
    fn replacement_character_is_ordinary_text() {
        let text = caster(TypeTag::Text);
        assert!(matches!(text.cast(&json!("ok \u{FFFD}")), Ok(Typed::Text(s)) if s == "ok \u{FFFD}"));
    }

    #[test]
    fn undecodable_query_bytes() {
        // Shape produced by query decoding for `?v=%FF` and `?v=%C3%A9`.
        let text = caster(TypeTag::Text);
        assert_eq!(text.cast(&json!([[255]])).err(), Some(CastError::InvalidUtf8));
        assert!(matches!(text.cast(&json!([[195, 169]])), Ok(Typed::Text(s)) if s == "é"));
        assert_eq!(text.cast(&json!([[]])).err(), Some(CastError::InvalidString));
        assert_eq!(text.cast(&json!([[300]])).err(), Some(CastError::InvalidString));
        let bytes = caster(TypeTag::Bytes);
        assert!(matches!(bytes.cast(&json!([[255, 0]])), Ok(Typed::Bytes(b)) if b == [255, 0]));
    }

    #[test]
    fn containers_consume_whole_value() {
        let seq = caster(TypeTag::Sequence);
        assert!(matches!(seq.cast(&json!(["1", "2"])), Ok(Typed::Sequence(v)) if v.len() == 2));
        assert!(matches!(seq.cast(&json!("x")), Ok(Typed::Sequence(v)) if v == vec![json!("x")]));
        assert_eq!(seq.cast(&json!({"a": 1})).err(), Some(CastError::InvalidList));
        let set = caster(TypeTag::Set);
        assert!(matches!(set.cast(&json!(["a", "b", "a"])), Ok(Typed::Set(v)) if v == vec![json!("a"), json!("b")]));
        let map = caster(TypeTag::Mapping);
        assert!(matches!(map.cast(&json!({"k": ["v"]})), Ok(Typed::Mapping(_))));
        assert_eq!(map.cast(&json!(["k"])).err(), Some(CastError::InvalidMapping));
    }

    #[test]
    fn raw_passes_lists_through() {
        assert!(matches!(caster(TypeTag::Any).cast(&json!(["1", "2"])), Ok(Typed::Raw(v)) if v == json!(["1", "2"])));
    }
}
