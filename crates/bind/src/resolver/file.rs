use crate::convert::BoundValue;
use crate::error::ResolveError;
use crate::request::RequestContext;
use crate::resolver::FieldResolver;
use async_trait::async_trait;

/// Binds the first file part submitted under a name in a multipart request.
#[derive(Debug)]
pub(crate) struct FileResolver {
    position: usize,
    name: String,
    max_memory: u64,
}

impl FileResolver {
    pub(crate) fn new(position: usize, name: &str, max_memory: u64) -> Self {
        Self { position, name: name.to_owned(), max_memory }
    }
}

#[async_trait]
impl FieldResolver for FileResolver {
    fn field_position(&self) -> usize {
        self.position
    }

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError> {
        let form = ctx.form_data(self.max_memory).await?;
        if !form.is_multipart() {
            return Err(ResolveError::NotMultipart { name: self.name.clone() });
        }

        let file = form.file(&self.name).ok_or_else(|| ResolveError::FileNotFound { name: self.name.clone() })?;
        Ok(Box::new(file.clone()))
    }
}
