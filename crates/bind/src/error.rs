//! Error types for both phases of request binding.
//!
//! - [`CompileError`]: raised while an [`Adapter`](crate::Adapter) is being built. These are
//!   programming mistakes in the input type and never surface per request.
//! - [`ResolveError`] / [`ConvertError`]: raised while a single request is bound. They map to
//!   `400 Bad Request`.
//! - [`HttpError`]: returned by callbacks to choose the response status explicitly.

use crate::annotation::BindingKind;
use http::StatusCode;
use std::error::Error;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("handler must have exactly 1 input, got {inputs}")]
    InvalidHandlerShape { inputs: usize },

    #[error("field {field:?} is registered twice")]
    DuplicateField { field: &'static str },

    #[error("field {field:?} is annotated but not settable")]
    FieldNotSettable { field: &'static str },

    #[error("field {field:?} has an invalid binding annotation {annotation:?}")]
    InvalidAnnotation { field: &'static str, annotation: &'static str },

    #[error("{kind} annotation name cannot be empty for field {field:?}")]
    EmptyBindingName { field: &'static str, kind: BindingKind },

    #[error("field {field:?} uses {name:?}, which is not a valid header name")]
    InvalidHeaderName { field: &'static str, name: &'static str },

    #[error("multiple body fields found: {first:?} and {second:?}")]
    DuplicateBody { first: &'static str, second: &'static str },

    #[error("body field {field:?} has type {type_name}, which cannot be decoded from json")]
    UnsupportedBodyType { field: &'static str, type_name: &'static str },

    #[error("file field {field:?} must be UploadedFile, got {type_name}")]
    InvalidFileField { field: &'static str, type_name: &'static str },

    #[error(
        "cannot combine body resolver with form/file resolvers: body consumes request body as json, form/file consume it as multipart or url-encoded data"
    )]
    IncompatiblePayloadBinding,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported field type {type_name}")]
    UnsupportedFieldType { type_name: &'static str },

    #[error("invalid boolean value {value:?}")]
    InvalidBool { value: String },

    #[error("invalid {type_name} value {value:?}: {source}")]
    InvalidInteger {
        value: String,
        type_name: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid {type_name} value {value:?}: {reason}")]
    InvalidFloat { value: String, type_name: &'static str, reason: String },

    #[error("converted value does not match {type_name}")]
    Mismatch { type_name: &'static str },
}

impl ConvertError {
    pub(crate) fn invalid_float(value: &str, type_name: &'static str, source: &ParseFloatError) -> Self {
        Self::InvalidFloat { value: value.to_owned(), type_name, reason: source.to_string() }
    }

    pub(crate) fn float_out_of_range(value: &str, type_name: &'static str) -> Self {
        Self::InvalidFloat { value: value.to_owned(), type_name, reason: "value out of range".into() }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request body has already been consumed")]
    BodyConsumed,

    #[error("read body: {source}")]
    BodyRead {
        #[source]
        source: BoxError,
    },

    #[error("decode body: {source}")]
    BodyDecode {
        #[source]
        source: serde_json::Error,
    },

    #[error("resolve {kind} {name:?}: {source}")]
    Conversion {
        kind: BindingKind,
        name: String,
        #[source]
        source: ConvertError,
    },

    #[error("resolve header {name:?}: value is not valid utf-8")]
    InvalidHeaderValue { name: String },

    #[error("resolve query: {reason}")]
    QueryDecode { reason: String },

    #[error("resolve cookie {name:?}: named cookie not present")]
    CookieNotFound { name: String },

    #[error("path variable {name:?} not found")]
    PathVariableNotFound { name: String },

    #[error("resolve form: {reason}")]
    FormDecode { reason: String },

    #[error("resolve form: message too large, limit is {limit} bytes")]
    FormTooLarge { limit: u64 },

    #[error("resolve file {name:?}: request Content-Type isn't multipart/form-data")]
    NotMultipart { name: String },

    #[error("resolve file {name:?}: file not found")]
    FileNotFound { name: String },

    #[error("store uploaded file: {source}")]
    FileStore {
        #[source]
        source: std::io::Error,
    },

    #[error("resolved value cannot be assigned to field {field:?} of type {expected}")]
    FieldAssignment { field: &'static str, expected: &'static str },
}

impl ResolveError {
    pub(crate) fn conversion(kind: BindingKind, name: &str, source: ConvertError) -> Self {
        Self::Conversion { kind, name: name.to_owned(), source }
    }

    pub(crate) fn body_read<E: Into<BoxError>>(e: E) -> Self {
        Self::BodyRead { source: e.into() }
    }

    pub(crate) fn form_decode<S: ToString>(reason: S) -> Self {
        Self::FormDecode { reason: reason.to_string() }
    }

    pub(crate) fn file_store(source: std::io::Error) -> Self {
        Self::FileStore { source }
    }
}

/// An error that carries the status code of the response it should produce.
///
/// When a callback fails with an `HttpError` (directly, or anywhere in the `source()` chain of
/// the returned error) the adapter responds with its status instead of `500`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable_entity<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal_server_error<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Finds the first `HttpError` in `error` or its chain of sources.
    pub fn find<'e>(error: &'e (dyn Error + 'static)) -> Option<&'e HttpError> {
        let mut current = Some(error);
        while let Some(e) = current {
            if let Some(http_error) = e.downcast_ref::<HttpError>() {
                return Some(http_error);
            }
            current = e.source();
        }
        None
    }
}
