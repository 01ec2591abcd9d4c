use crate::convert::{BoundValue, TypeInfo};
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;
use serde::de::Error as _;

/// Decodes the whole json payload into the field.
#[derive(Debug)]
pub(crate) struct BodyResolver {
    position: usize,
    type_info: TypeInfo,
}

impl BodyResolver {
    pub(crate) fn new(position: usize, type_info: TypeInfo) -> Self {
        Self { position, type_info }
    }
}

#[async_trait]
impl FieldResolver for BodyResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let bytes = ctx.body_mut().bytes().await?;
        let decoded = self.type_info.decode(&bytes).unwrap_or_else(|| {
            Err(serde_json::Error::custom(format!("{} cannot be decoded from json", self.type_info.name())))
        });
        decoded.map_err(|source| ResolveError::BodyDecode { source })
    }
}
