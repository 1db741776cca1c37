use crate::caster::TypeTag;
use serde_json::Value;

/// One declared parameter of a callable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    declared_type: TypeTag,
    default: Option<Value>,
}

impl ParameterSpec {
    /// A parameter without a default; omitting it fails validation.
    pub fn required(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            declared_type,
            default: None,
        }
    }

    /// A parameter bound to `default` when the request omits it.
    pub fn optional(name: impl Into<String>, declared_type: TypeTag, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            declared_type,
            default: Some(default.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn declared_type(&self) -> &TypeTag {
        &self.declared_type
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}
