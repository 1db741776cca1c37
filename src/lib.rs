//! # sigbind
//!
//! **sigbind** exposes ordinary Rust functions as JSON endpoints. The request
//! schema is derived from the function's parameters, so there is no separate
//! validation layer to keep in sync.
//!
//! ## Overview
//!
//! An endpoint is a function whose parameters describe the request:
//!
//! ```rust
//! use sigbind::{endpoint, ApiError};
//!
//! #[endpoint(name = "add", methods(GET, POST))]
//! fn add(a: i64, #[param(default = 10)] b: i64) -> Result<serde_json::Value, ApiError> {
//!     Ok(serde_json::json!({"sum": a + b}))
//! }
//!
//! let registry = sigbind::SchemaRegistry::new();
//! let endpoint = AddEndpoint::endpoint(&registry).unwrap();
//! let req = std::sync::Arc::new(sigbind::ApiRequest::new(sigbind::http::Method::GET, "/?a=5"));
//! assert_eq!(endpoint.respond(&req), serde_json::json!({"sum": 15}));
//! ```
//!
//! The `#[endpoint]` attribute turns the signature into a [`typed::Callable`].
//! On the first request the [`SchemaRegistry`] infers a [`schema::Schema`] from
//! it and caches it. Each request then goes through the same steps:
//!
//! ```text
//! ApiRequest ─► method check ─► query::decode ─► merge JSON body ─► Schema::load
//!            ─► inject `request` ─► auth gate ─► call ─► output schema ─► JSON
//! ```
//!
//! Every failure along the way is an [`ApiError`] with a stable numeric code
//! (see [`error`]).
//!
//! ## Modules
//!
//! - **[`error`]** - error taxonomy and codes
//! - **[`query`]** - bracketed query decoding and body merging
//! - **[`caster`]** - wire value to typed value conversion
//! - **[`schema`]** - schema inference, the registry and its cache
//! - **[`typed`]** - the callable abstraction and argument extraction
//! - **[`dispatcher`]** - the per-request pipeline
//! - **[`router`]** - `/<prefix>/<app>/<endpoint>/` namespacing
//! - **[`paginate`]** - list pagination helper
//! - **[`runtime_config`]** / **[`logging`]** - configuration and tracing setup
//! - **[`cli`]** - the `sigbind` binary
//!
//! ## Nested Parameters
//!
//! A parameter can be another struct with its own fields. Derive
//! [`Construct`] on it and it is validated from a nested map, including
//! self-referencing types:
//!
//! ```rust
//! use sigbind::Construct;
//!
//! #[derive(Construct)]
//! struct Comment {
//!     text: String,
//!     #[param(default = serde_json::Value::Null)]
//!     reply: Option<Box<Comment>>,
//! }
//! ```
//!
//! Query strings reach nested fields through brackets:
//! `?comment[text]=hi&comment[reply][text]=hello`.

extern crate self as sigbind;

pub mod caster;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod paginate;
pub mod query;
pub mod router;
pub mod runtime_config;
pub mod schema;
pub mod typed;

pub use dispatcher::{ApiRequest, Endpoint, EndpointOptions};
pub use error::{ApiError, ErrorCode};
pub use router::ApiRouter;
pub use runtime_config::RuntimeConfig;
pub use schema::{ParameterSpec, SchemaRegistry};
pub use typed::{Callable, Construct};
pub use sigbind_macros::{endpoint, Construct};

// Re-exported for macro expansions and downstream crates.
pub use http;
pub use serde_json;
