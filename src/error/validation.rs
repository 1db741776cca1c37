use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Failures recorded against one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldErrors {
    /// Messages for a scalar field.
    Messages(Vec<String>),
    /// Failures inside a nested callable's own fields.
    Nested(ValidationErrors),
}

/// Every field failure from one schema load, keyed by field name.
///
/// Loading never stops at the first failing field, so this collects the full
/// picture before the request is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, FieldErrors>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Record a message for `field`, keeping earlier messages for it.
    pub fn add_message(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.fields.get_mut(&field) {
            Some(FieldErrors::Messages(messages)) => messages.push(message),
            _ => {
                self.fields.insert(field, FieldErrors::Messages(vec![message]));
            }
        }
    }

    /// Record the failures of a nested schema under `field`.
    pub fn add_nested(&mut self, field: impl Into<String>, nested: ValidationErrors) {
        self.fields.insert(field.into(), FieldErrors::Nested(nested));
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldErrors> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded directly against `field` (empty for nested failures).
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        match self.fields.get(field) {
            Some(FieldErrors::Messages(messages)) => messages,
            _ => &[],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldErrors)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
