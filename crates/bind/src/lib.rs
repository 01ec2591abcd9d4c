//! Declarative request binding.
//!
//! A callback takes one input type whose fields declare where their values come from: the json
//! body, a header, a query parameter, a path segment, a cookie, a form value or an uploaded file.
//! [`Adapter`] checks those declarations once, compiles them into a plan, and then binds every
//! request with it before invoking the callback and encoding its result.
//!
//! ```
//! use micro_bind::{Adapter, Bind, Fields, HttpError, PathParams};
//! use serde::Serialize;
//!
//! #[derive(Default)]
//! struct GetUser {
//!     id: u64,
//!     verbose: bool,
//! }
//!
//! impl Bind for GetUser {
//!     fn bindings(fields: &mut Fields<Self>) {
//!         fields.field("id", "path:id", |input| &mut input.id).field("verbose", "query:verbose", |input| &mut input.verbose);
//!     }
//! }
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u64,
//! }
//!
//! async fn get_user(input: GetUser) -> Result<User, HttpError> {
//!     match input.id {
//!         0 => Err(HttpError::not_found("no such user")),
//!         id => Ok(User { id }),
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let adapter = Adapter::new(get_user).expect("input declarations are valid");
//!
//! let request = http::Request::get("/users/42").body(http_body_util::Empty::<bytes::Bytes>::new()).unwrap();
//! let response = adapter.handle(request, PathParams::from_iter([("id", "42")])).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # }
//! ```

mod adapter;
mod analyzer;
mod annotation;
mod body;
mod compiler;
mod convert;
mod error;
mod fields;
mod form;
mod handler;
mod reply;
mod request;
mod resolver;
mod responder;

pub use adapter::AdaptOptions;
pub use adapter::Adapter;
pub use adapter::AdapterBuilder;
pub use adapter::DEFAULT_MAX_MEMORY;
pub use analyzer::Callback;
pub use analyzer::CallbackDescriptor;
pub use analyzer::Inputs;
pub use analyzer::analyze;
pub use annotation::BindingKind;
pub use body::OptionReqBody;
pub use body::ReqBody;
pub use body::ResponseBody;
pub use convert::BoundValue;
pub use convert::FieldType;
pub use convert::TypeInfo;
pub use convert::TypeKind;
pub use convert::convert;
pub use error::BoxError;
pub use error::CompileError;
pub use error::ConvertError;
pub use error::HttpError;
pub use error::ResolveError;
pub use fields::Bind;
pub use fields::Fields;
pub use fields::Record;
pub use form::UploadedFile;
pub use handler::RequestHandler;
pub use reply::Json;
pub use reply::Outcome;
pub use reply::Reply;
pub use request::PathParams;
pub use request::RequestContext;
pub use resolver::FieldResolver;
pub use responder::Responder;
