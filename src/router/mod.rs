//! # Router Module
//!
//! Mounts endpoints under per-application namespaces.
//!
//! Every endpoint lives at `/<prefix>/<app_label>/<endpoint_name>/`, with the
//! prefix taken from [`RuntimeConfig::api_prefix`](crate::runtime_config::RuntimeConfig)
//! (`api` by default). Matching is exact on the path; a request path without
//! its trailing slash still matches. Unknown paths produce the
//! [`ApiError::not_found`](crate::error::ApiError::not_found) error.
//!
//! ```rust
//! use std::sync::Arc;
//! use sigbind::dispatcher::{ApiRequest, Endpoint, EndpointOptions};
//! use sigbind::http::Method;
//! use sigbind::router::ApiRouter;
//! use sigbind::schema::SchemaRegistry;
//! use sigbind::typed::{callable, Typed};
//!
//! let registry = SchemaRegistry::new();
//! let ping = callable("ping", vec![], |_| Ok(Typed::Raw(serde_json::json!({"pong": true}))));
//! let mut router = ApiRouter::new("api");
//! router
//!     .mount("health", Endpoint::new(Arc::new(ping), EndpointOptions::new(), &registry).unwrap())
//!     .unwrap();
//!
//! let req = Arc::new(ApiRequest::new(Method::GET, "/api/health/ping/"));
//! assert_eq!(router.respond(&req)["pong"], true);
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{ApiRouter, RouteEntry, RouteError};
