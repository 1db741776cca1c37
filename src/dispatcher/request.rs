use crate::error::ApiError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::query::QueryMap;
use http::Method;
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Most requests carry only a handful of headers.
pub const MAX_INLINE_HEADERS: usize = 16;

pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Text encoding of the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl BodyEncoding {
    /// Pick the encoding named by a `Content-Type` charset, defaulting to UTF-8.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        let charset = content_type
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase());
        match charset.as_deref() {
            Some("iso-8859-1" | "latin1" | "latin-1") => BodyEncoding::Latin1,
            _ => BodyEncoding::Utf8,
        }
    }

    fn decode<'a>(self, bytes: &'a [u8]) -> Result<std::borrow::Cow<'a, str>, std::str::Utf8Error> {
        match self {
            BodyEncoding::Utf8 => std::str::from_utf8(bytes).map(Into::into),
            BodyEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect::<String>().into()),
        }
    }
}

/// What the host transport hands to an endpoint: method, query, body and an
/// authentication flag.
///
/// ```rust
/// use sigbind::dispatcher::ApiRequest;
/// use sigbind::http::Method;
///
/// let req = ApiRequest::new(Method::GET, "/api/math/add/?a=5&a=6");
/// assert_eq!(req.path(), "/api/math/add/");
/// assert_eq!(req.query().last("a"), Some("6"));
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: RequestId,
    method: Method,
    path: String,
    query: QueryMap,
    headers: HeaderVec,
    body: Option<Vec<u8>>,
    encoding: BodyEncoding,
    authenticated: bool,
}

impl ApiRequest {
    /// `target` is the request path, optionally followed by `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, QueryMap::parse(query)),
            None => (target, QueryMap::new()),
        };
        Self {
            id: RequestId::new(),
            method,
            path: path.to_string(),
            query,
            headers: HeaderVec::new(),
            body: None,
            encoding: BodyEncoding::default(),
            authenticated: false,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: QueryMap) -> Self {
        self.query = query;
        self
    }

    /// Adds a header. `X-Request-Id` also becomes the request id when valid,
    /// and `Content-Type` sets the body encoding.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.id = RequestId::from_header_or_new(Some(&value));
        } else if name.eq_ignore_ascii_case("content-type") {
            self.encoding = BodyEncoding::from_content_type(&value);
        }
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Outcome of the host's authentication check.
    #[must_use]
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Case-insensitive header lookup; the last occurrence wins.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parse the body as a JSON object. An absent or empty body is `None`.
    pub fn json_body(&self) -> Result<Option<Map<String, Value>>, ApiError> {
        let bytes = match self.body.as_deref() {
            None | Some([]) => return Ok(None),
            Some(bytes) => bytes,
        };
        let text = self.encoding.decode(bytes).map_err(ApiError::invalid_body)?;
        match serde_json::from_str::<Value>(&text).map_err(ApiError::invalid_body)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(ApiError::invalid_body("request body must be a JSON object")),
        }
    }
}
