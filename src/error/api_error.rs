use super::code::ErrorCode;
use super::validation::ValidationErrors;
use http::Method;
use serde_json::{Map, Value};
use std::fmt;

/// A structured, caller-facing failure.
///
/// Immutable once built; [`ApiError::response`] is the only projection the
/// transport needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    code: ErrorCode,
    detail: String,
    extra: Map<String, Value>,
}

impl ApiError {
    /// Build an error with an arbitrary code, as endpoint logic does for its
    /// own failures.
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            extra: Map::new(),
        }
    }

    /// Attach an extra structured field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorCode::NOT_FOUND, "Not Found Error")
    }

    /// Method not in the whitelist; the allowed methods travel in `methods`.
    #[must_use]
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let methods: Vec<Value> = allowed
            .iter()
            .map(|m| Value::String(m.as_str().to_string()))
            .collect();
        Self::new(ErrorCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
            .with_extra("methods", Value::Array(methods))
    }

    /// Body could not be decoded; the parser's message travels in `error`.
    pub fn invalid_body(error: impl fmt::Display) -> Self {
        Self::new(ErrorCode::INVALID_BODY, "Invalid Json").with_extra("error", error.to_string())
    }

    #[must_use]
    pub fn authentication_required() -> Self {
        Self::new(ErrorCode::AUTHENTICATION_REQUIRED, "Authentication required.")
    }

    /// Aggregate of every per-field failure, under `validation`.
    #[must_use]
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::new(ErrorCode::VALIDATION_FAILED, "Invalid Parameters")
            .with_extra("validation", errors.to_value())
    }

    /// Generic server failure. Carries nothing about the cause.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(ErrorCode::INTERNAL, "Internal Error")
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Transport-ready JSON body: the extras, then `code` and `detail`.
    #[must_use]
    pub fn response(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert("code".to_string(), Value::from(self.code.as_u32()));
        body.insert("detail".to_string(), Value::String(self.detail.clone()));
        Value::Object(body)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.response())
    }
}

impl std::error::Error for ApiError {}
