use crate::typed::{Callable, CallableId, Construct, Constructor};
use std::fmt;
use std::sync::Arc;

/// Declared type of a parameter.
///
/// The variant order is the caster priority order: primitives are matched
/// before the structural containers, and nested callables come last.
#[derive(Clone)]
pub enum TypeTag {
    /// Unannotated; the wire value passes through untouched.
    Any,
    /// Any `i64`.
    Int,
    /// An integer narrowed to `min..=max`, for the smaller Rust widths.
    BoundedInt { min: i64, max: i64 },
    Float,
    Bool,
    Text,
    Bytes,
    Sequence,
    Set,
    Mapping,
    /// Another callable whose own parameters describe the value.
    Nested(NestedType),
}

impl TypeTag {
    /// Integer tag for the inclusive range of a Rust integer type, clamped to
    /// `i64`. The full `i64` range is plain [`TypeTag::Int`].
    ///
    /// ```rust
    /// use sigbind::caster::TypeTag;
    ///
    /// let byte = TypeTag::int_range(u8::MIN.into(), u8::MAX.into());
    /// assert_eq!(byte, TypeTag::BoundedInt { min: 0, max: 255 });
    /// let wide = TypeTag::int_range(u64::MIN.into(), u64::MAX.into());
    /// assert_eq!(wide, TypeTag::BoundedInt { min: 0, max: i64::MAX });
    /// assert_eq!(TypeTag::int_range(i64::MIN.into(), i64::MAX.into()), TypeTag::Int);
    /// ```
    #[must_use]
    pub fn int_range(min: i128, max: i128) -> Self {
        let clamp = |v: i128| i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX });
        match (clamp(min), clamp(max)) {
            (i64::MIN, i64::MAX) => TypeTag::Int,
            (min, max) => TypeTag::BoundedInt { min, max },
        }
    }

    /// Nested parameter built by a [`Construct`] type.
    #[must_use]
    pub fn nested<T: Construct>() -> Self {
        TypeTag::Nested(NestedType::new(Constructor::<T>::new()))
    }

    /// Nested parameter built by an arbitrary callable.
    pub fn nested_callable(callable: impl Callable) -> Self {
        TypeTag::Nested(NestedType::new(callable))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeTag::Any => "any",
            TypeTag::Int | TypeTag::BoundedInt { .. } => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Text => "text",
            TypeTag::Bytes => "bytes",
            TypeTag::Sequence => "sequence",
            TypeTag::Set => "set",
            TypeTag::Mapping => "mapping",
            TypeTag::Nested(n) => n.name(),
        }
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Nested(n) => f.debug_tuple("Nested").field(&n.name()).finish(),
            TypeTag::BoundedInt { min, max } => write!(f, "int[{min}..={max}]"),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeTag::Nested(a), TypeTag::Nested(b)) => a.id() == b.id(),
            (TypeTag::BoundedInt { min: a, max: b }, TypeTag::BoundedInt { min: c, max: d }) => {
                a == c && b == d
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// Handle on the callable behind a nested parameter.
#[derive(Clone)]
pub struct NestedType {
    callable: Arc<dyn Callable>,
}

impl NestedType {
    pub fn new(callable: impl Callable) -> Self {
        Self {
            callable: Arc::new(callable),
        }
    }

    #[must_use]
    pub fn from_arc(callable: Arc<dyn Callable>) -> Self {
        Self { callable }
    }

    #[must_use]
    pub fn id(&self) -> CallableId {
        self.callable.id()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.callable.name()
    }

    #[must_use]
    pub fn callable(&self) -> &Arc<dyn Callable> {
        &self.callable
    }
}

impl fmt::Debug for NestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedType").field("name", &self.name()).finish()
    }
}
