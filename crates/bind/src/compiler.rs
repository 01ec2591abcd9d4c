//! Compiles the field declarations of an input type into a binding plan.
//!
//! Every check happens here, once, when an adapter is built. A record that passes compilation
//! cannot fail for structural reasons while a request is bound; only the request data can.

use crate::adapter::AdaptOptions;
use crate::annotation::{BindingKind, ParsedAnnotation, parse_annotation};
use crate::convert::TypeKind;
use crate::error::{CompileError, ResolveError};
use crate::fields::Record;
use crate::request::RequestContext;
use crate::resolver::{
    BodyResolver, CookieResolver, FieldResolver, FileResolver, FormResolver, HeaderResolver, PathResolver,
    QueryResolver,
};
use http::HeaderName;
use std::any::Any;
use std::collections::HashSet;
use tracing::debug;

/// The compiled resolvers of one input type.
///
/// The body resolver, if any, always runs first; the others run in declaration order.
pub(crate) struct Plan {
    body: Option<Box<dyn FieldResolver>>,
    rest: Vec<Box<dyn FieldResolver>>,
}

impl Plan {
    pub(crate) fn new(body: Option<Box<dyn FieldResolver>>, rest: Vec<Box<dyn FieldResolver>>) -> Self {
        Self { body, rest }
    }

    pub(crate) fn len(&self) -> usize {
        usize::from(self.body.is_some()) + self.rest.len()
    }

    pub(crate) fn body_position(&self) -> Option<usize> {
        self.body.as_ref().map(|body| body.field_position())
    }

    /// The field positions in execution order.
    pub(crate) fn positions(&self) -> Vec<usize> {
        self.resolvers().map(|resolver| resolver.field_position()).collect()
    }

    fn resolvers(&self) -> impl Iterator<Item = &(dyn FieldResolver + 'static)> {
        self.body.iter().chain(self.rest.iter()).map(Box::as_ref)
    }

    /// Resolves every planned field of `target`, stopping at the first failure.
    pub(crate) async fn bind(
        &self,
        record: &Record,
        target: &mut (dyn Any + Send),
        ctx: &mut RequestContext,
    ) -> Result<(), ResolveError> {
        for resolver in self.resolvers() {
            let value = resolver.resolve(ctx).await?;
            record.assign(target, resolver.field_position(), value)?;
        }
        Ok(())
    }
}

pub(crate) fn compile(record: &Record, options: &AdaptOptions) -> Result<Plan, CompileError> {
    let mut names = HashSet::with_capacity(record.len());
    let mut body: Option<(&'static str, Box<dyn FieldResolver>)> = None;
    let mut rest: Vec<Box<dyn FieldResolver>> = Vec::with_capacity(record.len());
    let mut reads_form_payload = false;
    let mut bindings = Vec::with_capacity(record.len());

    for (position, field) in record.fields().iter().enumerate() {
        if !names.insert(field.name()) {
            return Err(CompileError::DuplicateField { field: field.name() });
        }

        let annotation = match parse_annotation(field.annotation()) {
            ParsedAnnotation::Ignored => continue,
            ParsedAnnotation::Invalid => {
                return Err(CompileError::InvalidAnnotation { field: field.name(), annotation: field.annotation() });
            }
            ParsedAnnotation::Binding(annotation) => annotation,
        };

        if !field.is_settable() {
            return Err(CompileError::FieldNotSettable { field: field.name() });
        }

        if annotation.kind != BindingKind::Body && annotation.name.is_empty() {
            return Err(CompileError::EmptyBindingName { field: field.name(), kind: annotation.kind });
        }

        let type_info = *field.type_info();
        let name = annotation.name;
        let max_memory = options.max_memory();

        match annotation.kind {
            BindingKind::Body => {
                if let Some((first, _)) = &body {
                    return Err(CompileError::DuplicateBody { first: *first, second: field.name() });
                }
                if !type_info.is_decodable() {
                    return Err(CompileError::UnsupportedBodyType { field: field.name(), type_name: type_info.name() });
                }
                body = Some((field.name(), Box::new(BodyResolver::new(position, type_info))));
            }
            BindingKind::Header => {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| CompileError::InvalidHeaderName { field: field.name(), name })?;
                rest.push(Box::new(HeaderResolver::new(position, header_name, type_info)));
            }
            BindingKind::Query => rest.push(Box::new(QueryResolver::new(position, name, type_info))),
            BindingKind::Path => rest.push(Box::new(PathResolver::new(position, name, type_info))),
            BindingKind::Cookie => rest.push(Box::new(CookieResolver::new(position, name, type_info))),
            BindingKind::Form => rest.push(Box::new(FormResolver::new(position, name, type_info, max_memory))),
            BindingKind::File => {
                if type_info.kind() != TypeKind::File {
                    return Err(CompileError::InvalidFileField { field: field.name(), type_name: type_info.name() });
                }
                rest.push(Box::new(FileResolver::new(position, name, max_memory)));
            }
        }

        reads_form_payload |= annotation.kind.reads_form_payload();
        bindings.push(format!("{} <- {}", field.name(), field.annotation()));
    }

    if body.is_some() && reads_form_payload {
        return Err(CompileError::IncompatiblePayloadBinding);
    }

    debug!(input = record.type_name(), ?bindings, "compiled binding plan");
    Ok(Plan::new(body.map(|(_, resolver)| resolver), rest))
}
