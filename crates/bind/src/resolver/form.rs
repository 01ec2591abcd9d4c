use crate::annotation::BindingKind;
use crate::convert::{BoundValue, TypeInfo, convert};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;

/// Binds a value from a url-encoded or multipart payload. The query string is never consulted,
/// and a missing value binds the zero value.
#[derive(Debug)]
pub(crate) struct FormResolver {
    position: usize,
    name: String,
    type_info: TypeInfo,
    max_memory: u64,
}

impl FormResolver {
    pub(crate) fn new(position: usize, name: &str, type_info: TypeInfo, max_memory: u64) -> Self {
        Self { position, name: name.to_owned(), type_info, max_memory }
    }
}

#[async_trait]
impl FieldResolver for FormResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let form = ctx.form_data(self.max_memory).await?;
        let raw = form.value(&self.name).unwrap_or_default();

        convert(raw, &self.type_info).map_err(|e| ResolveError::conversion(BindingKind::Form, &self.name, e))
    }
}
