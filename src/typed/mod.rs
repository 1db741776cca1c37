//! # Typed Module
//!
//! The seam between validated request data and ordinary Rust code.
//!
//! ## Overview
//!
//! A [`Callable`] declares its parameters as
//! [`ParameterSpec`](crate::schema::ParameterSpec)s and receives the validated
//! values as [`Arguments`]. Each cast value is a [`Typed`]; handlers pull
//! concrete Rust types back out through [`FromTyped`]:
//!
//! ```rust
//! use sigbind::typed::{Arguments, Typed};
//!
//! let mut args = Arguments::new();
//! args.insert("a", Typed::Int(5));
//! let a: i64 = args.take("a").unwrap();
//! assert_eq!(a, 5);
//! ```
//!
//! Nested parameter types are structs implementing [`Construct`]. Their
//! [`Constructor`] is itself a [`Callable`], so a nested field gets its own
//! schema and builds a [`Typed::Instance`] when cast.
//!
//! ## Writing Endpoints
//!
//! Most endpoints use the `#[endpoint]` attribute, which generates the
//! [`Callable`] impl from the function signature. [`callable`] covers the
//! cases where the parameter list is assembled at runtime.

mod args;
mod core;
mod value;

pub use args::Arguments;
pub use core::{
    callable, reply, CallError, Callable, CallableId, Construct, Constructor, FnCallable,
};
pub use value::{FromTyped, Typed};
