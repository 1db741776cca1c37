//! # Schema Module
//!
//! Validation schemas inferred from a callable's declared parameters.
//!
//! ## Overview
//!
//! A [`Schema`] is an ordered list of fields, each a [`ParameterSpec`] paired
//! with the [`Caster`](crate::caster::Caster) for its declared type.
//! [`Schema::load`] turns a decoded request into [`Arguments`](crate::typed::Arguments),
//! collecting every field failure before giving up.
//!
//! ## Inference and Caching
//!
//! [`SchemaRegistry::infer`] builds a schema the first time a callable is seen
//! and caches it for the life of the registry:
//!
//! - Parameters whose type is another callable get that callable's schema,
//!   inferred recursively and cached under its own identity
//! - A parameter whose type is a callable still being built (a self-reference,
//!   directly or through a cycle) gets a lazy caster that looks the schema up
//!   in the registry when it first casts a value
//! - Inference runs under one lock, so concurrent first requests for the same
//!   callable all observe the same fully built schema
//!
//! Explicit schemas for input or output overrides come from
//! [`SchemaRegistry::build_schema`] and are not cached.

mod core;
mod param;
pub(crate) mod registry;

pub use self::core::{Field, Schema, SchemaError, UnknownFields};
pub use param::ParameterSpec;
pub use registry::SchemaRegistry;
