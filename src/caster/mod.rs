//! # Caster Module
//!
//! Converts untyped wire values into the declared type of a parameter.
//!
//! ## Resolution order
//!
//! [`Caster::resolve`] dispatches on [`TypeTag`] in a fixed priority order:
//!
//! 1. [`TypeTag::Any`] - the raw value passes through
//! 2. [`TypeTag::Int`] / [`TypeTag::BoundedInt`] / [`TypeTag::Float`] - numeric
//!    parse; booleans are rejected and values outside the declared range are
//!    reported separately from malformed input
//! 3. [`TypeTag::Bool`] - case-sensitive lookup in the configured [`BoolTokens`]
//! 4. [`TypeTag::Text`] / [`TypeTag::Bytes`]
//! 5. [`TypeTag::Sequence`], [`TypeTag::Set`], [`TypeTag::Mapping`] - the whole
//!    value, without per-element checks
//! 6. [`TypeTag::Nested`] - the value must be a map; it is validated against the
//!    target's schema and the target is called to build an instance
//!
//! Query parameters always arrive as lists. Scalar casters take the last
//! element, so `?n=1&n=2` casts `n` to `2`; container casters keep the list.

mod core;
mod nested;
mod types;

pub use self::core::{BoolTokens, CastError, Caster, ContainerKind, NumberKind};
pub use nested::NestedCaster;
pub use types::{NestedType, TypeTag};
