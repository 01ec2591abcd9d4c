use crate::annotation::BindingKind;
use crate::convert::{BoundValue, TypeInfo, convert};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;
use http::HeaderMap;
use http::header::COOKIE;

/// Binds a cookie value. Unlike headers and query parameters, a missing cookie is an error.
#[derive(Debug)]
pub(crate) struct CookieResolver {
    position: usize,
    name: String,
    type_info: TypeInfo,
}

impl CookieResolver {
    pub(crate) fn new(position: usize, name: &str, type_info: TypeInfo) -> Self {
        Self { position, name: name.to_owned(), type_info }
    }
}

#[async_trait]
impl FieldResolver for CookieResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let raw = find_cookie(ctx.headers(), &self.name)
            .ok_or_else(|| ResolveError::CookieNotFound { name: self.name.clone() })?;

        convert(raw, &self.type_info).map_err(|e| ResolveError::conversion(BindingKind::Cookie, &self.name, e))
    }
}

/// The first cookie called `name` across every `Cookie` header.
fn find_cookie<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| strip_quotes(value))
}

fn strip_quotes(value: &str) -> &str {
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}
