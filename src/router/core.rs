use crate::dispatcher::{ApiRequest, Endpoint};
use crate::error::ApiError;
use crate::runtime_config::RuntimeConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why an endpoint could not be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Another endpoint already owns the path.
    Duplicate(String),
    /// An app label or endpoint name that cannot be a single path segment.
    InvalidSegment(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Duplicate(path) => write!(f, "route `{path}` is already mounted"),
            RouteError::InvalidSegment(segment) => {
                write!(f, "`{segment}` is not a valid path segment")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// One mounted endpoint.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub path: String,
    pub app_label: String,
    pub endpoint: Arc<Endpoint>,
}

/// Exact-path table of endpoints, namespaced as `/<prefix>/<app>/<name>/`.
#[derive(Debug, Default)]
pub struct ApiRouter {
    prefix: String,
    by_path: HashMap<String, usize>,
    entries: Vec<RouteEntry>,
}

impl ApiRouter {
    /// `prefix` may be empty, in which case routes start at the app label.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('/').to_string(),
            by_path: HashMap::new(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.api_prefix)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mount `endpoint` under `app_label`, returning its path.
    pub fn mount(&mut self, app_label: &str, endpoint: Endpoint) -> Result<String, RouteError> {
        for segment in [app_label, endpoint.name()] {
            if segment.is_empty() || segment.contains(['/', '?', '#']) {
                return Err(RouteError::InvalidSegment(segment.to_string()));
            }
        }
        let path = if self.prefix.is_empty() {
            format!("/{app_label}/{}/", endpoint.name())
        } else {
            format!("/{}/{app_label}/{}/", self.prefix, endpoint.name())
        };
        if self.by_path.contains_key(&path) {
            warn!(path = %path, "Duplicate route rejected");
            return Err(RouteError::Duplicate(path));
        }
        info!(path = %path, app_label = app_label, endpoint = endpoint.name(), "Route mounted");
        self.by_path.insert(path.clone(), self.entries.len());
        self.entries.push(RouteEntry {
            path: path.clone(),
            app_label: app_label.to_string(),
            endpoint: Arc::new(endpoint),
        });
        Ok(path)
    }

    /// Endpoint mounted at `path`. A missing trailing slash still matches.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<&RouteEntry> {
        let found = match self.by_path.get(path) {
            Some(idx) => Some(*idx),
            None if !path.ends_with('/') => self.by_path.get(&format!("{path}/")).copied(),
            None => None,
        };
        found.and_then(|idx| self.entries.get(idx))
    }

    pub fn handle(&self, request: &Arc<ApiRequest>) -> Result<Value, ApiError> {
        match self.route(request.path()) {
            Some(entry) => entry.endpoint.handle(request),
            None => {
                debug!(request_id = %request.id(), path = request.path(), "No route matched");
                Err(ApiError::not_found())
            }
        }
    }

    #[must_use]
    pub fn respond(&self, request: &Arc<ApiRequest>) -> Value {
        match self.handle(request) {
            Ok(body) => body,
            Err(err) => err.response(),
        }
    }

    /// Mounted routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Log the routing table at debug level.
    pub fn dump_routes(&self) {
        for entry in &self.entries {
            let methods = entry
                .endpoint
                .options()
                .methods
                .as_ref()
                .map_or_else(|| "*".to_string(), |m| {
                    m.iter().map(http::Method::as_str).collect::<Vec<_>>().join(",")
                });
            debug!(path = %entry.path, app_label = %entry.app_label, methods = %methods, "Route");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
