use super::core::CallError;
use super::value::{FromTyped, Typed};
use crate::dispatcher::ApiRequest;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Validated arguments for one call, in schema order.
#[derive(Debug, Default)]
pub struct Arguments {
    /// Removed slots stay behind as `None` so indexes never shift.
    values: Vec<(String, Option<Typed>)>,
    index: HashMap<String, usize>,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value bound to `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: Typed) {
        let name = name.into();
        match self.index.get(&name).copied() {
            Some(idx) => self.values[idx].1 = Some(value),
            None => {
                self.index.insert(name.clone(), self.values.len());
                self.values.push((name, Some(value)));
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Typed> {
        self.index.get(name).and_then(|&idx| self.values[idx].1.as_ref())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Typed> {
        let idx = self.index.remove(name)?;
        self.values[idx].1.take()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn live(&self) -> impl Iterator<Item = (&str, &Typed)> {
        self.values
            .iter()
            .filter_map(|(n, v)| v.as_ref().map(|v| (n.as_str(), v)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.live().map(|(n, _)| n)
    }

    /// The injected inbound request, if the callable asked for one.
    #[must_use]
    pub fn request(&self) -> Option<&Arc<ApiRequest>> {
        self.live().find_map(|(_, v)| match v {
            Typed::Request(r) => Some(r),
            _ => None,
        })
    }

    /// Remove `name` and convert it to `T`.
    ///
    /// A missing argument, or an injected one of the wrong kind, means the
    /// schema and the callable disagree, which is a server-side fault. A
    /// caller-supplied value that does not fit `T` is
    /// [`CallError::Invalid`] on that field.
    pub fn take<T: FromTyped>(&mut self, name: &str) -> Result<T, CallError> {
        let value = self
            .remove(name)
            .ok_or_else(|| CallError::binding(format!("missing argument `{name}`")))?;
        let kind = value.kind();
        let injected = matches!(value, Typed::Instance(_) | Typed::Request(_));
        let message = T::mismatch(&value);
        T::from_typed(value).ok_or_else(|| {
            if injected {
                CallError::binding(format!(
                    "argument `{name}` is {kind}, expected {}",
                    std::any::type_name::<T>()
                ))
            } else {
                CallError::invalid(name, message)
            }
        })
    }

    /// Remove `name` and downcast the nested instance it holds.
    pub fn take_instance<T: Any>(&mut self, name: &str) -> Result<T, CallError> {
        match self.remove(name) {
            Some(Typed::Instance(boxed)) => boxed.downcast::<T>().map(|b| *b).map_err(|_| {
                CallError::binding(format!(
                    "argument `{name}` is not a {}",
                    std::any::type_name::<T>()
                ))
            }),
            Some(other) => Err(CallError::binding(format!(
                "argument `{name}` is {}, expected an instance",
                other.kind()
            ))),
            None => Err(CallError::binding(format!("missing argument `{name}`"))),
        }
    }

    /// Like [`Arguments::take_instance`], mapping a `null` default to `None`.
    pub fn take_optional_instance<T: Any>(&mut self, name: &str) -> Result<Option<T>, CallError> {
        if self.get(name).is_some_and(Typed::is_null) {
            self.remove(name);
            return Ok(None);
        }
        self.take_instance(name).map(Some)
    }
}

type Slot = (String, Option<Typed>);

impl IntoIterator for Arguments {
    type Item = (String, Typed);
    type IntoIter = std::iter::FilterMap<std::vec::IntoIter<Slot>, fn(Slot) -> Option<(String, Typed)>>;

    fn into_iter(self) -> Self::IntoIter {
        let live: fn(Slot) -> Option<(String, Typed)> = |(name, value)| value.map(|v| (name, v));
        self.values.into_iter().filter_map(live)
    }
}
