//! Per-request state shared by the field resolvers.
//!
//! - `RequestContext`: the request head, the one-shot payload, the path parameters and the
//!   lazily decoded form
//! - `PathParams`: the named path segments matched by the router

use crate::body::OptionReqBody;
use crate::error::{BoxError, ResolveError};
use crate::form::FormData;
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};
use http_body::Body as HttpBody;
use matchit::Params;

/// Everything a resolver may read while binding one request.
///
/// The context is owned by a single request and never shared between tasks.
#[derive(Debug)]
pub struct RequestContext {
    head: Parts,
    body: OptionReqBody,
    path_params: PathParams,
    form: Option<FormData>,
}

impl RequestContext {
    /// Creates a new RequestContext from a request head, its payload and the matched path parameters
    pub fn new(head: Parts, body: OptionReqBody, path_params: PathParams) -> Self {
        Self { head, body, path_params, form: None }
    }

    /// Splits `request` into head and payload.
    pub fn from_request<B>(request: Request<B>, path_params: PathParams) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = request.into_parts();
        Self::new(head, OptionReqBody::new(body), path_params)
    }

    /// Returns a reference to the request head
    pub fn head(&self) -> &Parts {
        &self.head
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The request payload. It can be consumed once.
    pub fn body_mut(&mut self) -> &mut OptionReqBody {
        &mut self.body
    }

    /// The decoded form payload, decoded on first use and cached for the rest of the request.
    pub(crate) async fn form_data(&mut self, max_memory: u64) -> Result<&FormData, ResolveError> {
        let form = match self.form.take() {
            Some(form) => form,
            None => FormData::parse(&self.head, &mut self.body, max_memory).await?,
        };
        Ok(self.form.insert(form))
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// For example, in the route "/users/{id}", "id" is a path parameter. The values are owned, so
/// the parameters outlive the router match they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }
}

impl From<Params<'_, '_>> for PathParams {
    fn from(params: Params<'_, '_>) -> Self {
        params.iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}
