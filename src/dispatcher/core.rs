use super::request::ApiRequest;
use crate::error::{ApiError, ValidationErrors};
use crate::query::{decode, merge};
use crate::schema::{ParameterSpec, Schema, SchemaError, SchemaRegistry};
use crate::typed::{Arguments, CallError, Callable, Typed};
use http::Method;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Parameter name under which the live request is injected.
pub const REQUEST_PARAM: &str = "request";

/// Per-endpoint configuration supplied at registration.
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    /// URL segment; defaults to the callable's name.
    pub name: Option<String>,
    /// Allowed methods; `None` accepts any.
    pub methods: Option<Vec<Method>>,
    /// Whether non-GET requests also read the query string.
    pub allow_get_params: bool,
    pub auth_required: bool,
    /// Explicit input fields, replacing inference.
    pub args_schema: Option<Vec<ParameterSpec>>,
    /// Explicit output fields, replacing the callable's own.
    pub schema: Option<Vec<ParameterSpec>>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            name: None,
            methods: None,
            allow_get_params: true,
            auth_required: false,
            args_schema: None,
            schema: None,
        }
    }
}

impl EndpointOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    #[must_use]
    pub fn allow_get_params(mut self, allow: bool) -> Self {
        self.allow_get_params = allow;
        self
    }

    #[must_use]
    pub fn auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    #[must_use]
    pub fn args_schema(mut self, fields: Vec<ParameterSpec>) -> Self {
        self.args_schema = Some(fields);
        self
    }

    #[must_use]
    pub fn schema(mut self, fields: Vec<ParameterSpec>) -> Self {
        self.schema = Some(fields);
        self
    }
}

/// A callable bound to its options and schemas, ready to serve requests.
pub struct Endpoint {
    name: String,
    callable: Arc<dyn Callable>,
    options: EndpointOptions,
    registry: SchemaRegistry,
    /// Set only for an explicit input schema; inferred ones live in the registry.
    args_schema: Option<Arc<Schema>>,
    output_schema: Option<Arc<Schema>>,
    /// Every parameter the callable declares, `request` included.
    parameter_names: Vec<String>,
    wants_request: bool,
}

impl Endpoint {
    /// Explicit schemas are built here; the inferred input schema is built on
    /// the first request and then served from `registry`.
    pub fn new(
        callable: Arc<dyn Callable>,
        options: EndpointOptions,
        registry: &SchemaRegistry,
    ) -> Result<Self, SchemaError> {
        let name = options.name.clone().unwrap_or_else(|| callable.name().to_string());
        let parameter_names: Vec<String> = callable
            .parameters()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        let wants_request = parameter_names.iter().any(|n| n == REQUEST_PARAM);

        let args_schema = options
            .args_schema
            .clone()
            .map(|fields| registry.build_schema(&name, fields))
            .transpose()?;
        let output_schema = options
            .schema
            .clone()
            .or_else(|| callable.output_parameters())
            .map(|fields| registry.build_schema(&format!("{name}Output"), fields))
            .transpose()?;

        info!(
            endpoint = %name,
            methods = ?options.methods,
            allow_get_params = options.allow_get_params,
            auth_required = options.auth_required,
            explicit_input = args_schema.is_some(),
            output_schema = output_schema.is_some(),
            "Endpoint registered"
        );

        Ok(Self {
            name,
            callable,
            options,
            registry: registry.clone(),
            args_schema,
            output_schema,
            parameter_names,
            wants_request,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    #[must_use]
    pub fn callable(&self) -> &Arc<dyn Callable> {
        &self.callable
    }

    /// The schema requests are validated against.
    pub fn input_schema(&self) -> Result<Arc<Schema>, SchemaError> {
        match &self.args_schema {
            Some(schema) => Ok(Arc::clone(schema)),
            None => self.registry.infer(&self.callable, &[REQUEST_PARAM]),
        }
    }

    #[must_use]
    pub fn output_schema(&self) -> Option<&Arc<Schema>> {
        self.output_schema.as_ref()
    }

    /// Merged query and body data, before validation.
    pub fn decode_request(&self, request: &ApiRequest) -> Result<Map<String, Value>, ApiError> {
        let mut data = if *request.method() == Method::GET || self.options.allow_get_params {
            decode(request.query())
        } else {
            Map::new()
        };
        if let Some(body) = request.json_body()? {
            merge(body, &mut data);
        }
        Ok(data)
    }

    /// Run the whole pipeline for one request.
    pub fn handle(&self, request: &Arc<ApiRequest>) -> Result<Value, ApiError> {
        let started = Instant::now();
        debug!(
            request_id = %request.id(),
            endpoint = %self.name,
            method = %request.method(),
            "Dispatch start"
        );

        // Nested callables run during validation, so the guard covers the whole pipeline.
        let outcome = match catch_unwind(AssertUnwindSafe(|| self.run(request))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    request_id = %request.id(),
                    endpoint = %self.name,
                    panic_message = %panic_message,
                    "Endpoint panicked"
                );
                Err(ApiError::internal())
            }
        };
        match &outcome {
            Ok(_) => debug!(
                request_id = %request.id(),
                endpoint = %self.name,
                elapsed_us = started.elapsed().as_micros() as u64,
                "Dispatch complete"
            ),
            Err(err) if err.code().is_server() => error!(
                request_id = %request.id(),
                endpoint = %self.name,
                code = %err.code(),
                detail = err.detail(),
                "Request failed"
            ),
            Err(err) => {
                let extra = Value::Object(err.extra().clone());
                warn!(
                    request_id = %request.id(),
                    endpoint = %self.name,
                    code = %err.code(),
                    detail = err.detail(),
                    extra = %extra,
                    "Request rejected"
                );
            }
        }
        outcome
    }

    /// [`Endpoint::handle`] flattened to the JSON body the transport sends.
    #[must_use]
    pub fn respond(&self, request: &Arc<ApiRequest>) -> Value {
        match self.handle(request) {
            Ok(body) => body,
            Err(err) => err.response(),
        }
    }

    fn run(&self, request: &Arc<ApiRequest>) -> Result<Value, ApiError> {
        if let Some(allowed) = &self.options.methods {
            if !allowed.contains(request.method()) {
                return Err(ApiError::method_not_allowed(allowed));
            }
        }

        let data = self.decode_request(request)?;

        let schema = self.input_schema().map_err(|e| {
            error!(endpoint = %self.name, error = %e, "Input schema unavailable");
            ApiError::internal()
        })?;

        let mut args = schema.load(&data).map_err(|errors| ApiError::validation(&errors))?;

        if self.wants_request {
            args.insert(REQUEST_PARAM, Typed::Request(Arc::clone(request)));
        }

        self.check_binding(&args)?;

        if self.options.auth_required && !request.is_authenticated() {
            return Err(ApiError::authentication_required());
        }

        let result = self.invoke(request, args)?;
        self.serialize(result)
    }

    /// Arguments must cover the declared parameters exactly.
    fn check_binding(&self, args: &Arguments) -> Result<(), ApiError> {
        let missing = self.parameter_names.iter().find(|n| !args.contains(n));
        let unexpected = args.names().find(|n| !self.parameter_names.iter().any(|p| p == n));
        if missing.is_none() && unexpected.is_none() {
            return Ok(());
        }
        error!(
            endpoint = %self.name,
            missing = ?missing,
            unexpected = ?unexpected,
            "Validated arguments do not match the callable's parameters"
        );
        Err(ApiError::internal())
    }

    fn invoke(&self, request: &ApiRequest, args: Arguments) -> Result<Typed, ApiError> {
        match self.callable.call(args) {
            Ok(result) => Ok(result),
            Err(CallError::Api(err)) => Err(err),
            Err(CallError::Invalid { field, message }) => {
                let mut errors = ValidationErrors::new();
                errors.add_message(field, message);
                Err(ApiError::validation(&errors))
            }
            Err(CallError::Internal(err)) => {
                error!(
                    request_id = %request.id(),
                    endpoint = %self.name,
                    error = ?err,
                    "Endpoint raised an unexpected error"
                );
                Err(ApiError::internal())
            }
        }
    }

    fn serialize(&self, result: Typed) -> Result<Value, ApiError> {
        let value = result.into_json().map_err(|typed| {
            error!(endpoint = %self.name, kind = typed.kind(), "Endpoint returned a value with no JSON form");
            ApiError::internal()
        })?;
        let value = if is_empty(&value) {
            Value::Object(Map::new())
        } else {
            value
        };
        match &self.output_schema {
            Some(schema) => schema.dump(value).map_err(|e| {
                error!(endpoint = %self.name, error = %e, "Output serialization failed");
                ApiError::internal()
            }),
            None => Ok(value),
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::TypeTag;
    use crate::error::ErrorCode;
    use crate::typed::{callable, reply};
    use serde_json::json;

    fn echo_request() -> Arc<dyn Callable> {
        Arc::new(callable(
            "whoami",
            vec![
                ParameterSpec::required(REQUEST_PARAM, TypeTag::Any),
                ParameterSpec::optional("greeting", TypeTag::Text, "hi"),
            ],
            |mut args| {
                let request: Arc<ApiRequest> = args.take(REQUEST_PARAM)?;
                let greeting: String = args.take("greeting")?;
                reply::<_, CallError>(Ok(json!({"greeting": greeting, "path": request.path()})))
            },
        ))
    }

    #[test]
    fn request_is_injected_not_validated() {
        let registry = SchemaRegistry::new();
        let endpoint = Endpoint::new(echo_request(), EndpointOptions::new(), &registry).unwrap();
        let schema = endpoint.input_schema().unwrap();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), ["greeting"]);
        let req = Arc::new(ApiRequest::new(Method::GET, "/me/?greeting=yo"));
        assert_eq!(endpoint.handle(&req).unwrap(), json!({"greeting": "yo", "path": "/me/"}));
    }

    #[test]
    fn query_ignored_on_post_when_disallowed() {
        let registry = SchemaRegistry::new();
        let endpoint = Endpoint::new(
            echo_request(),
            EndpointOptions::new().allow_get_params(false),
            &registry,
        )
        .unwrap();
        let req = Arc::new(ApiRequest::new(Method::POST, "/me/?greeting=yo"));
        assert_eq!(endpoint.handle(&req).unwrap()["greeting"], "hi");
    }

    #[test]
    fn empty_results_become_objects() {
        let registry = SchemaRegistry::new();
        let nothing = Arc::new(callable("nothing", vec![], |_| Ok(Typed::Raw(Value::Null))));
        let endpoint = Endpoint::new(nothing, EndpointOptions::new(), &registry).unwrap();
        let req = Arc::new(ApiRequest::new(Method::GET, "/"));
        assert_eq!(endpoint.handle(&req).unwrap(), json!({}));
    }

    #[test]
    fn panics_and_internal_errors_are_generic() {
        let registry = SchemaRegistry::new();
        let boom = Arc::new(callable("boom", vec![], |_| -> Result<Typed, CallError> {
            panic!("secret detail")
        }));
        let failing = Arc::new(callable("failing", vec![], |_| {
            Err(CallError::Internal(anyhow::anyhow!("db password leaked")))
        }));
        let req = Arc::new(ApiRequest::new(Method::GET, "/"));
        for c in [boom as Arc<dyn Callable>, failing] {
            let endpoint = Endpoint::new(c, EndpointOptions::new(), &registry).unwrap();
            let body = endpoint.respond(&req);
            assert_eq!(body, json!({"code": 32, "detail": "Internal Error"}));
        }
    }

    #[test]
    fn panicking_nested_constructor_is_internal() {
        let registry = SchemaRegistry::new();
        let inner = callable(
            "Inner",
            vec![ParameterSpec::required("x", TypeTag::Int)],
            |_| -> Result<Typed, CallError> { panic!("constructor exploded") },
        );
        let outer = Arc::new(callable(
            "outer",
            vec![ParameterSpec::required("p", TypeTag::nested_callable(inner))],
            |_| reply::<_, CallError>(Ok(json!({"reached": true}))),
        ));
        let endpoint = Endpoint::new(outer, EndpointOptions::new(), &registry).unwrap();
        let req = Arc::new(
            ApiRequest::new(Method::POST, "/").with_body(br#"{"p":{"x":1}}"#.to_vec()),
        );
        assert_eq!(endpoint.respond(&req), json!({"code": 32, "detail": "Internal Error"}));
        // Still serving after the panic.
        assert_eq!(endpoint.respond(&req)["code"], 32);
    }

    #[test]
    fn unfit_argument_is_a_field_failure() {
        let registry = SchemaRegistry::new();
        // Declared as a plain int, bound as u8.
        let shade = Arc::new(callable(
            "shade",
            vec![ParameterSpec::required("level", TypeTag::Int)],
            |mut args| reply::<_, CallError>(Ok(args.take::<u8>("level")?)),
        ));
        let endpoint = Endpoint::new(shade, EndpointOptions::new(), &registry).unwrap();
        let err = endpoint
            .handle(&Arc::new(ApiRequest::new(Method::GET, "/?level=999")))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_FAILED);
        assert_eq!(
            err.extra()["validation"],
            json!({"level": ["Number too large."]})
        );
    }

    #[test]
    fn application_errors_pass_through() {
        let registry = SchemaRegistry::new();
        let teapot = Arc::new(callable("teapot", vec![], |_| {
            reply::<(), _>(Err(ApiError::new(ErrorCode::from_u32(0x10 | 9), "I'm a teapot")))
        }));
        let endpoint = Endpoint::new(teapot, EndpointOptions::new(), &registry).unwrap();
        let err = endpoint.handle(&Arc::new(ApiRequest::new(Method::GET, "/"))).unwrap_err();
        assert_eq!(err.code().as_u32(), 25);
        assert_eq!(err.detail(), "I'm a teapot");
    }

    #[test]
    fn output_schema_projects_result() {
        let registry = SchemaRegistry::new();
        let leaky = Arc::new(
            callable("user", vec![], |_| {
                reply::<_, CallError>(Ok(json!({"name": "ada", "password": "hunter2"})))
            })
            .returns(vec![ParameterSpec::required("name", TypeTag::Text)]),
        );
        let endpoint = Endpoint::new(leaky, EndpointOptions::new(), &registry).unwrap();
        let req = Arc::new(ApiRequest::new(Method::GET, "/"));
        assert_eq!(endpoint.handle(&req).unwrap(), json!({"name": "ada"}));
    }

    #[test]
    fn override_schema_mismatch_is_internal() {
        let registry = SchemaRegistry::new();
        let add = Arc::new(callable(
            "add",
            vec![ParameterSpec::required("a", TypeTag::Int)],
            |mut args| reply::<_, CallError>(Ok(args.take::<i64>("a")?)),
        ));
        let options = EndpointOptions::new().args_schema(vec![ParameterSpec::required("z", TypeTag::Int)]);
        let endpoint = Endpoint::new(add, options, &registry).unwrap();
        let err = endpoint.handle(&Arc::new(ApiRequest::new(Method::GET, "/?z=1"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::INTERNAL);
    }
}
