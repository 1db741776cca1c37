use super::param::ParameterSpec;
use crate::caster::{CastError, Caster};
use crate::error::ValidationErrors;
use crate::typed::{Arguments, Typed};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

const MISSING: &str = "Missing data for required field.";
const NULL: &str = "Field may not be null.";
const UNKNOWN: &str = "Unknown field.";

/// What to do with input keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Report each one as a field failure.
    #[default]
    Raise,
    /// Drop them silently.
    Exclude,
}

impl FromStr for UnknownFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raise" => Ok(UnknownFields::Raise),
            "exclude" => Ok(UnknownFields::Exclude),
            other => Err(format!("unknown field policy `{other}` (expected raise or exclude)")),
        }
    }
}

impl fmt::Display for UnknownFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnknownFields::Raise => "raise",
            UnknownFields::Exclude => "exclude",
        })
    }
}

/// Errors raised while building or applying a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Two parameters of one callable share a name.
    DuplicateParameter { schema: String, field: String },
    /// A deferred nested schema was resolved after its registry was dropped.
    RegistryDropped,
    /// The value handed to [`Schema::dump`] does not fit the schema.
    Serialize { schema: String, reason: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::DuplicateParameter { schema, field } => {
                write!(f, "schema `{schema}` declares `{field}` more than once")
            }
            SchemaError::RegistryDropped => f.write_str("schema registry was dropped"),
            SchemaError::Serialize { schema, reason } => {
                write!(f, "cannot serialize through schema `{schema}`: {reason}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// A declared parameter with its resolved caster.
#[derive(Debug, Clone)]
pub struct Field {
    spec: ParameterSpec,
    caster: Caster,
}

impl Field {
    pub(crate) fn new(spec: ParameterSpec, caster: Caster) -> Self {
        Self { spec, caster }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    #[must_use]
    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    #[must_use]
    pub fn caster(&self) -> &Caster {
        &self.caster
    }
}

/// Ordered fields used to validate and cast one decoded request.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    unknown: UnknownFields,
}

impl Schema {
    pub(crate) fn new(name: impl Into<String>, fields: Vec<Field>, unknown: UnknownFields) -> Self {
        Self {
            name: name.into(),
            fields,
            unknown,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Validate and cast `data`.
    ///
    /// Every field is checked; the error carries all failures, not only the
    /// first.
    pub fn load(&self, data: &Map<String, Value>) -> Result<Arguments, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut args = Arguments::new();

        if self.unknown == UnknownFields::Raise {
            for key in data.keys().filter(|k| self.field(k).is_none()) {
                errors.add_message(key.as_str(), UNKNOWN);
            }
        }

        for field in &self.fields {
            let name = field.name();
            let default = field.spec.default_value();
            match data.get(name) {
                None => match default {
                    Some(value) => args.insert(name, Typed::Raw(value.clone())),
                    None => errors.add_message(name, MISSING),
                },
                Some(Value::Null) => {
                    if default == Some(&Value::Null) {
                        args.insert(name, Typed::Raw(Value::Null));
                    } else {
                        errors.add_message(name, NULL);
                    }
                }
                Some(value) => match field.caster.cast(value) {
                    Ok(typed) => args.insert(name, typed),
                    Err(CastError::Nested(nested)) => errors.add_nested(name, nested),
                    Err(err) => errors.add_message(name, err.message()),
                },
            }
        }

        if errors.is_empty() {
            Ok(args)
        } else {
            Err(errors)
        }
    }

    /// Project a result onto the declared fields, dropping everything else.
    pub fn dump(&self, value: Value) -> Result<Value, SchemaError> {
        let mut source = match value {
            Value::Object(source) => source,
            other => {
                return Err(self.serialize_error(format!("expected an object, got {}", kind(&other))))
            }
        };
        let mut out = Map::new();
        for field in &self.fields {
            let Some(item) = source.remove(field.name()) else {
                continue;
            };
            let item = match (field.caster.as_nested(), item) {
                (Some(nested), item @ Value::Object(_)) => {
                    let schema = nested
                        .schema()
                        .map_err(|e| self.serialize_error(e.message()))?;
                    schema.dump(item)?
                }
                (_, item) => item,
            };
            out.insert(field.name().to_string(), item);
        }
        Ok(Value::Object(out))
    }

    fn serialize_error(&self, reason: String) -> SchemaError {
        SchemaError::Serialize {
            schema: self.name.clone(),
            reason,
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
