use super::args::Arguments;
use super::value::Typed;
use crate::error::ApiError;
use crate::schema::ParameterSpec;
use serde::Serialize;
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

/// Identity of a callable: its concrete Rust type plus its name.
///
/// Schemas are cached under this key for the life of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableId {
    type_id: TypeId,
    name: String,
}

impl CallableId {
    #[must_use]
    pub fn new(type_id: TypeId, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Failure raised by an invoked callable.
#[derive(Debug)]
pub enum CallError {
    /// A deliberate, taxonomy-conformant failure. Returned to the caller as is.
    Api(ApiError),
    /// A caller-supplied value did not fit the parameter's Rust type. Reported
    /// as a validation failure on `field`.
    Invalid { field: String, message: String },
    /// Anything else. Logged, then replaced by a generic internal error.
    Internal(anyhow::Error),
}

impl CallError {
    /// Arguments did not line up with the callable's parameters.
    pub fn binding(message: impl fmt::Display) -> Self {
        CallError::Internal(anyhow::anyhow!("binding failed: {message}"))
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Api(err) => write!(f, "{}", err.detail()),
            CallError::Invalid { field, message } => write!(f, "{field}: {message}"),
            CallError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Api(err) => Some(err),
            CallError::Invalid { .. } => None,
            CallError::Internal(err) => Some(&**err),
        }
    }
}

impl From<ApiError> for CallError {
    fn from(err: ApiError) -> Self {
        CallError::Api(err)
    }
}

impl From<anyhow::Error> for CallError {
    fn from(err: anyhow::Error) -> Self {
        CallError::Internal(err)
    }
}

/// Anything whose declared parameter list can be turned into a schema and
/// then called with validated arguments.
///
/// Endpoint functions get an implementation from `#[endpoint]` or
/// [`callable`]; nested parameter types get one through [`Construct`].
pub trait Callable: Send + Sync + 'static {
    /// Cache identity. Distinct types, or distinct names, never share a schema.
    fn id(&self) -> CallableId {
        CallableId::new(TypeId::of::<Self>(), self.name())
    }

    /// Identifier used as the schema name.
    fn name(&self) -> &str;

    /// Declared parameters, in declaration order.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Fields of the declared return shape, if any.
    fn output_parameters(&self) -> Option<Vec<ParameterSpec>> {
        None
    }

    fn call(&self, args: Arguments) -> Result<Typed, CallError>;
}

/// A struct that can be built from validated arguments, making it usable as a
/// nested parameter type. Usually derived with `#[derive(Construct)]`.
pub trait Construct: Sized + Send + 'static {
    const NAME: &'static str;

    fn parameters() -> Vec<ParameterSpec>;

    fn construct(args: &mut Arguments) -> Result<Self, CallError>;
}

/// The [`Callable`] view of a [`Construct`] type.
pub struct Constructor<T>(PhantomData<fn() -> T>);

impl<T> Constructor<T> {
    #[must_use]
    pub fn new() -> Self {
        Constructor(PhantomData)
    }
}

impl<T> Default for Constructor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Construct> Callable for Constructor<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        T::parameters()
    }

    fn call(&self, mut args: Arguments) -> Result<Typed, CallError> {
        T::construct(&mut args).map(|v| Typed::Instance(Box::new(v)))
    }
}

/// A closure plus an explicit parameter list.
pub struct FnCallable<F> {
    name: String,
    parameters: Vec<ParameterSpec>,
    output: Option<Vec<ParameterSpec>>,
    func: F,
}

impl<F> FnCallable<F> {
    /// Declare the fields of the return shape.
    #[must_use]
    pub fn returns(mut self, output: Vec<ParameterSpec>) -> Self {
        self.output = Some(output);
        self
    }
}

impl<F> Callable for FnCallable<F>
where
    F: Fn(Arguments) -> Result<Typed, CallError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        self.parameters.clone()
    }

    fn output_parameters(&self) -> Option<Vec<ParameterSpec>> {
        self.output.clone()
    }

    fn call(&self, args: Arguments) -> Result<Typed, CallError> {
        (self.func)(args)
    }
}

/// Wrap a closure as a [`Callable`].
///
/// ```rust
/// use sigbind::schema::ParameterSpec;
/// use sigbind::caster::TypeTag;
/// use sigbind::typed::{callable, reply};
///
/// let add = callable(
///     "add",
///     vec![
///         ParameterSpec::required("a", TypeTag::Int),
///         ParameterSpec::optional("b", TypeTag::Int, 10),
///     ],
///     |mut args| {
///         let a: i64 = args.take("a")?;
///         let b: i64 = args.take("b")?;
///         reply::<_, sigbind::typed::CallError>(Ok(a + b))
///     },
/// );
/// # let _ = add;
/// ```
pub fn callable<F>(name: impl Into<String>, parameters: Vec<ParameterSpec>, func: F) -> FnCallable<F>
where
    F: Fn(Arguments) -> Result<Typed, CallError> + Send + Sync + 'static,
{
    FnCallable {
        name: name.into(),
        parameters,
        output: None,
        func,
    }
}

/// Turn an endpoint's `Result<T, E>` into the dispatcher's reply shape.
pub fn reply<T, E>(result: Result<T, E>) -> Result<Typed, CallError>
where
    T: Serialize,
    E: Into<CallError>,
{
    let value = result.map_err(Into::into)?;
    Typed::json(&value).map_err(|e| CallError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::TypeTag;

    struct Point {
        x: i64,
    }

    impl Construct for Point {
        const NAME: &'static str = "Point";

        fn parameters() -> Vec<ParameterSpec> {
            vec![ParameterSpec::required("x", TypeTag::Int)]
        }

        fn construct(args: &mut Arguments) -> Result<Self, CallError> {
            Ok(Point { x: args.take("x")? })
        }
    }

    #[test]
    fn identity_separates_types_and_names() {
        let a = callable("a", vec![], |_| Ok(Typed::Raw(serde_json::Value::Null)));
        let b = callable("b", vec![], |_| Ok(Typed::Raw(serde_json::Value::Null)));
        assert_ne!(a.id(), b.id());
        assert_eq!(Constructor::<Point>::new().id(), Constructor::<Point>::new().id());
        assert_ne!(Constructor::<Point>::new().id(), a.id());
    }

    #[test]
    fn constructor_builds_instance() {
        let mut args = Arguments::new();
        args.insert("x", Typed::Int(4));
        let built = Constructor::<Point>::new().call(args);
        match built {
            Ok(Typed::Instance(b)) => assert_eq!(b.downcast::<Point>().map(|p| p.x).ok(), Some(4)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reply_serializes_ok_and_passes_errors() {
        let ok = reply::<_, ApiError>(Ok(serde_json::json!({"sum": 3})));
        assert!(matches!(ok, Ok(Typed::Raw(_))));
        let err = reply::<(), _>(Err(ApiError::not_found()));
        assert!(matches!(err, Err(CallError::Api(_))));
    }
}
