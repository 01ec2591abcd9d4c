//! Field resolvers: one strategy per binding kind.
//!
//! Each resolver is built once by the compiler for a single field and then asked to produce
//! that field's value for every request.

mod body;
mod cookie;
mod file;
mod form;
mod header;
mod path;
mod query;

pub(crate) use body::BodyResolver;
pub(crate) use cookie::CookieResolver;
pub(crate) use file::FileResolver;
pub(crate) use form::FormResolver;
pub(crate) use header::HeaderResolver;
pub(crate) use path::PathResolver;
pub(crate) use query::QueryResolver;

use crate::convert::BoundValue;
use crate::error::ResolveError;
use crate::request::RequestContext;
use async_trait::async_trait;

/// Produces the value of one field of the input type from a request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldResolver: Send + Sync {
    /// The position of the field in the input type's declaration order.
    fn field_position(&self) -> usize;

    async fn resolve(&self, ctx: &mut RequestContext) -> Result<BoundValue, ResolveError>;
}
