use super::core::{Field, Schema, SchemaError, UnknownFields};
use super::param::ParameterSpec;
use crate::caster::{BoolTokens, Caster, NestedCaster, NestedType};
use crate::runtime_config::RuntimeConfig;
use crate::typed::{Callable, CallableId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

/// Callables currently being built on this inference pass.
type Building = RefCell<HashSet<CallableId>>;

/// State shared between the registry handle and the lazy casters it hands out.
pub(crate) struct Shared {
    tokens: Arc<BoolTokens>,
    unknown: UnknownFields,
    cache: RwLock<HashMap<CallableId, Arc<Schema>>>,
    /// Serializes inference so the building set is only touched by one thread.
    build_lock: Mutex<()>,
    inferences: AtomicUsize,
}

/// Marks a callable as being built; unmarks it on every exit path.
struct BuildGuard<'a> {
    building: &'a Building,
    id: CallableId,
}

impl<'a> BuildGuard<'a> {
    fn enter(building: &'a Building, id: CallableId) -> Self {
        building.borrow_mut().insert(id.clone());
        Self { building, id }
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.building.borrow_mut().remove(&self.id);
    }
}

impl Shared {
    fn cached(&self, id: &CallableId) -> Option<Arc<Schema>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(Arc::clone)
    }

    /// Cached schema for `callable`, inferring it on a miss.
    pub(crate) fn resolve(self: &Arc<Self>, callable: &Arc<dyn Callable>) -> Result<Arc<Schema>, SchemaError> {
        self.infer(callable, &[])
    }

    fn infer(self: &Arc<Self>, callable: &Arc<dyn Callable>, ignore: &[&str]) -> Result<Arc<Schema>, SchemaError> {
        let id = callable.id();

        // Fast path: read lock only
        if let Some(schema) = self.cached(&id) {
            debug!(schema = %id, "Schema cache hit");
            return Ok(schema);
        }

        let _lock = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let building = Building::default();
        self.build(callable, ignore, &building)
    }

    fn build(
        self: &Arc<Self>,
        callable: &Arc<dyn Callable>,
        ignore: &[&str],
        building: &Building,
    ) -> Result<Arc<Schema>, SchemaError> {
        let id = callable.id();

        // Double-check: another thread may have built it while we waited
        if let Some(schema) = self.cached(&id) {
            debug!(schema = %id, "Schema already cached");
            return Ok(schema);
        }

        let _guard = BuildGuard::enter(building, id.clone());
        let mut fields: Vec<Field> = Vec::new();
        for spec in callable.parameters() {
            if ignore.contains(&spec.name()) {
                continue;
            }
            if fields.iter().any(|f| f.name() == spec.name()) {
                return Err(SchemaError::DuplicateParameter {
                    schema: callable.name().to_string(),
                    field: spec.name().to_string(),
                });
            }
            let caster = Caster::resolve(spec.declared_type(), &self.tokens, |target| {
                self.nested_caster(target, building)
            })?;
            fields.push(Field::new(spec, caster));
        }

        let schema = Arc::new(Schema::new(callable.name(), fields, self.unknown));
        self.inferences.fetch_add(1, Ordering::Relaxed);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let schema = Arc::clone(cache.entry(id).or_insert(schema));
        info!(
            schema = schema.name(),
            fields = schema.fields().len(),
            cache_size = cache.len(),
            "Schema inferred and cached"
        );
        Ok(schema)
    }

    fn nested_caster(self: &Arc<Self>, target: &NestedType, building: &Building) -> Result<NestedCaster, SchemaError> {
        let in_progress = building.borrow().contains(&target.id());
        if in_progress {
            debug!(nested = target.name(), "Self-referencing parameter, deferring schema");
            return Ok(NestedCaster::lazy(target.clone(), Arc::downgrade(self)));
        }
        let schema = self.build(target.callable(), &[], building)?;
        Ok(NestedCaster::resolved(target.clone(), schema))
    }

    fn assemble(self: &Arc<Self>, name: &str, parameters: Vec<ParameterSpec>) -> Result<Schema, SchemaError> {
        let _lock = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let building = Building::default();
        let mut fields: Vec<Field> = Vec::with_capacity(parameters.len());
        for spec in parameters {
            if fields.iter().any(|f| f.name() == spec.name()) {
                return Err(SchemaError::DuplicateParameter {
                    schema: name.to_string(),
                    field: spec.name().to_string(),
                });
            }
            let caster = Caster::resolve(spec.declared_type(), &self.tokens, |target| {
                self.nested_caster(target, &building)
            })?;
            fields.push(Field::new(spec, caster));
        }
        Ok(Schema::new(name, fields, self.unknown))
    }
}

/// Process-lifetime cache of inferred schemas, keyed by callable identity.
///
/// Build one at startup and share it with every endpoint. Cloning is cheap
/// and clones share the cache.
///
/// ```rust
/// use std::sync::Arc;
/// use sigbind::caster::TypeTag;
/// use sigbind::schema::{ParameterSpec, SchemaRegistry};
/// use sigbind::typed::{callable, Callable, Typed};
///
/// let registry = SchemaRegistry::new();
/// let echo: Arc<dyn Callable> = Arc::new(callable(
///     "echo",
///     vec![ParameterSpec::required("text", TypeTag::Text)],
///     |_| Ok(Typed::Raw(serde_json::Value::Null)),
/// ));
/// let first = registry.infer(&echo, &[]).unwrap();
/// let second = registry.infer(&echo, &[]).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(registry.inference_count(), 1);
/// ```
#[derive(Clone)]
pub struct SchemaRegistry {
    shared: Arc<Shared>,
}

impl SchemaRegistry {
    /// Registry with the default boolean tokens and unknown-field policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                tokens: Arc::new(config.bool_tokens.clone()),
                unknown: config.unknown_fields,
                cache: RwLock::new(HashMap::new()),
                build_lock: Mutex::new(()),
                inferences: AtomicUsize::new(0),
            }),
        }
    }

    /// The schema for `callable`, built on first use and cached.
    ///
    /// Parameters named in `ignore` are left out. The cache key is the
    /// callable alone, so the first inference decides which names were
    /// ignored.
    pub fn infer(&self, callable: &Arc<dyn Callable>, ignore: &[&str]) -> Result<Arc<Schema>, SchemaError> {
        self.shared.infer(callable, ignore)
    }

    /// Cached schema, without inferring.
    #[must_use]
    pub fn get(&self, id: &CallableId) -> Option<Arc<Schema>> {
        self.shared.cached(id)
    }

    /// Build an uncached schema from an explicit field list, for overrides.
    pub fn build_schema(&self, name: &str, parameters: Vec<ParameterSpec>) -> Result<Arc<Schema>, SchemaError> {
        let schema = self.shared.assemble(name, parameters)?;
        debug!(schema = name, fields = schema.fields().len(), "Explicit schema built");
        Ok(Arc::new(schema))
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many schemas were actually built, as opposed to served from cache.
    #[must_use]
    pub fn inference_count(&self) -> usize {
        self.shared.inferences.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bool_tokens(&self) -> &BoolTokens {
        &self.shared.tokens
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.len())
            .field("unknown_fields", &self.shared.unknown)
            .finish()
    }
}
