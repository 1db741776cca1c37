use super::core::CastError;
use super::types::NestedType;
use crate::error::ValidationErrors;
use crate::schema::registry::Shared;
use crate::schema::{Schema, SchemaError};
use crate::typed::{CallError, Typed};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Clone)]
enum Source {
    Resolved(Arc<Schema>),
    /// The target was still being built when this caster was made; its schema
    /// is looked up in the registry on first use.
    Lazy(Weak<Shared>),
}

/// Validates a nested map against the target's schema, then calls the target
/// with the result to produce an instance.
#[derive(Clone)]
pub struct NestedCaster {
    target: NestedType,
    source: Source,
}

impl NestedCaster {
    pub(crate) fn resolved(target: NestedType, schema: Arc<Schema>) -> Self {
        Self {
            target,
            source: Source::Resolved(schema),
        }
    }

    pub(crate) fn lazy(target: NestedType, registry: Weak<Shared>) -> Self {
        Self {
            target,
            source: Source::Lazy(registry),
        }
    }

    #[must_use]
    pub fn target(&self) -> &NestedType {
        &self.target
    }

    #[must_use]
    pub fn is_lazy(&self) -> bool {
        matches!(self.source, Source::Lazy(_))
    }

    /// The target's schema, resolving it through the registry if deferred.
    pub fn schema(&self) -> Result<Arc<Schema>, CastError> {
        match &self.source {
            Source::Resolved(schema) => Ok(Arc::clone(schema)),
            Source::Lazy(registry) => {
                let registry = registry
                    .upgrade()
                    .ok_or_else(|| CastError::Unresolved(SchemaError::RegistryDropped.to_string()))?;
                registry
                    .resolve(self.target.callable())
                    .map_err(|e| CastError::Unresolved(e.to_string()))
            }
        }
    }

    pub fn cast(&self, value: &Value) -> Result<Typed, CastError> {
        let Value::Object(fields) = value else {
            return Err(CastError::InvalidNestedInput);
        };
        let schema = self.schema()?;
        let args = schema.load(fields).map_err(CastError::Nested)?;
        self.target.callable().call(args).map_err(|err| match err {
            CallError::Api(api) => CastError::Construct(api.detail().to_string()),
            CallError::Invalid { field, message } => {
                let mut errors = ValidationErrors::new();
                errors.add_message(field, message);
                CastError::Nested(errors)
            }
            CallError::Internal(err) => CastError::Construct(err.to_string()),
        })
    }
}

impl fmt::Debug for NestedCaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedCaster")
            .field("target", &self.target.name())
            .field("lazy", &self.is_lazy())
            .finish()
    }
}
