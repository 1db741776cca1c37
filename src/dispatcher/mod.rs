//! # Dispatcher Module
//!
//! Binds one inbound request to one endpoint callable.
//!
//! ## Pipeline
//!
//! [`Endpoint::handle`] runs these steps in order. Any of them can end the
//! request with an [`ApiError`](crate::error::ApiError):
//!
//! 1. **Method check** - rejects methods outside [`EndpointOptions::methods`]
//! 2. **Decode** - bracketed query keys become a nested map. Non-GET requests
//!    read the query only when `allow_get_params` is set
//! 3. **Body** - the JSON body is parsed with the declared [`BodyEncoding`] and
//!    merged over the query, body winning at every level
//! 4. **Schema** - the explicit input schema, or the one inferred from the
//!    callable (without its `request` parameter)
//! 5. **Validate** - all fields are cast. Failures are collected into a single
//!    validation error
//! 6. **Inject** - the live [`ApiRequest`] is bound under `request` if declared
//! 7. **Bind** - arguments must match the declared parameters; a mismatch is an
//!    internal error
//! 8. **Authenticate** - `auth_required` endpoints reject unauthenticated requests
//!    before the callable runs
//! 9. **Invoke** - application errors pass through; anything else, panics
//!    included, becomes a generic internal error and is logged
//! 10. **Serialize** - through the output schema if one is declared, with an
//!     empty result turned into `{}`
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sigbind::caster::TypeTag;
//! use sigbind::dispatcher::{ApiRequest, Endpoint, EndpointOptions};
//! use sigbind::http::Method;
//! use sigbind::schema::{ParameterSpec, SchemaRegistry};
//! use sigbind::typed::{callable, reply, CallError};
//!
//! let registry = SchemaRegistry::new();
//! let add = callable(
//!     "add",
//!     vec![
//!         ParameterSpec::required("a", TypeTag::Int),
//!         ParameterSpec::optional("b", TypeTag::Int, 10),
//!     ],
//!     |mut args| {
//!         let a: i64 = args.take("a")?;
//!         let b: i64 = args.take("b")?;
//!         reply::<_, CallError>(Ok(serde_json::json!({"sum": a + b})))
//!     },
//! );
//! let endpoint = Endpoint::new(Arc::new(add), EndpointOptions::new(), &registry).unwrap();
//!
//! let req = Arc::new(ApiRequest::new(Method::GET, "/api/math/add/?a=5"));
//! assert_eq!(endpoint.respond(&req)["sum"], 15);
//! ```

mod core;
mod request;

pub use core::{Endpoint, EndpointOptions, REQUEST_PARAM};
pub use request::{ApiRequest, BodyEncoding, HeaderVec, MAX_INLINE_HEADERS};
