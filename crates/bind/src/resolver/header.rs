use crate::annotation::BindingKind;
use crate::convert::{BoundValue, TypeInfo, convert};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;
use http::HeaderName;

/// Binds the first value of a request header. A missing header binds the zero value.
#[derive(Debug)]
pub(crate) struct HeaderResolver {
    position: usize,
    name: HeaderName,
    type_info: TypeInfo,
}

impl HeaderResolver {
    pub(crate) fn new(position: usize, name: HeaderName, type_info: TypeInfo) -> Self {
        Self { position, name, type_info }
    }
}

#[async_trait]
impl FieldResolver for HeaderResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let raw = match ctx.headers().get(&self.name) {
            Some(value) => {
                std::str::from_utf8(value.as_bytes())
                    .map_err(|_| ResolveError::InvalidHeaderValue { name: self.name.to_string() })?
            }
            None => "",
        };

        convert(raw, &self.type_info).map_err(|e| ResolveError::conversion(BindingKind::Header, self.name.as_str(), e))
    }
}
