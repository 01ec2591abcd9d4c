use crate::annotation::BindingKind;
use crate::convert::{BoundValue, TypeInfo, convert};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;

/// Binds the first value of a query string parameter. A missing parameter binds the zero value.
#[derive(Debug)]
pub(crate) struct QueryResolver {
    position: usize,
    name: String,
    type_info: TypeInfo,
}

impl QueryResolver {
    pub(crate) fn new(position: usize, name: &str, type_info: TypeInfo) -> Self {
        Self { position, name: name.to_owned(), type_info }
    }
}

#[async_trait]
impl FieldResolver for QueryResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let query = ctx.uri().query().unwrap_or_default();
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| ResolveError::QueryDecode { reason: e.to_string() })?;

        let raw = pairs.iter().find(|(key, _)| *key == self.name).map_or("", |(_, value)| value.as_str());

        convert(raw, &self.type_info).map_err(|e| ResolveError::conversion(BindingKind::Query, &self.name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FieldType;
    use crate::resolver::tests::{context, empty_request};

    #[tokio::test]
    async fn first_value_is_converted() {
        let resolver = QueryResolver::new(0, "page", u32::type_info());
        let mut ctx = context(empty_request("/posts?page=2&page=5&size=10"));

        let value = resolver.resolve(&mut ctx).await.unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 2);
    }

    #[tokio::test]
    async fn values_are_percent_decoded() {
        let resolver = QueryResolver::new(0, "q", String::type_info());
        let mut ctx = context(empty_request("/search?q=rust+lang%21"));

        let value = resolver.resolve(&mut ctx).await.unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "rust lang!");
    }

    #[tokio::test]
    async fn missing_parameter_binds_zero() {
        let resolver = QueryResolver::new(0, "active", bool::type_info());

        let mut ctx = context(empty_request("/users"));
        assert!(!*resolver.resolve(&mut ctx).await.unwrap().downcast::<bool>().unwrap());

        let mut ctx = context(empty_request("/users?other=1"));
        assert!(!*resolver.resolve(&mut ctx).await.unwrap().downcast::<bool>().unwrap());
    }

    #[tokio::test]
    async fn unconvertible_parameter() {
        let resolver = QueryResolver::new(0, "active", bool::type_info());
        let mut ctx = context(empty_request("/users?active=maybe"));

        let err = resolver.resolve(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ResolveError::Conversion { kind: BindingKind::Query, .. }));
    }
}
