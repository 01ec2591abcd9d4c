use crate::annotation::BindingKind;
use crate::convert::{BoundValue, TypeInfo, convert};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;

/// Binds a named segment matched by the router. The segment must be present.
#[derive(Debug)]
pub(crate) struct PathResolver {
    position: usize,
    name: String,
    type_info: TypeInfo,
}

impl PathResolver {
    pub(crate) fn new(position: usize, name: &str, type_info: TypeInfo) -> Self {
        Self { position, name: name.to_owned(), type_info }
    }
}

#[async_trait]
impl FieldResolver for PathResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let raw = ctx
            .path_params()
            .get(&self.name)
            .ok_or_else(|| ResolveError::PathVariableNotFound { name: self.name.clone() })?;

        convert(raw, &self.type_info).map_err(|e| ResolveError::conversion(BindingKind::Path, &self.name, e))
    }
}
