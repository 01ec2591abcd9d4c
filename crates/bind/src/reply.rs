//! What a callback may return, and how a returned value is classified.

use crate::error::BoxError;
use serde::Serialize;
use std::any::{TypeId, type_name};
use std::fmt;

/// Serializes the wrapped value as the json response body.
///
/// # Example
/// ```
/// # use micro_bind::Json;
/// # use serde::Serialize;
/// #[derive(Serialize)]
/// struct User {
///     id: u64,
/// }
///
/// async fn get_user() -> Json<User> {
///     Json(User { id: 42 })
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// The classified result of one callback invocation.
pub enum Outcome {
    /// nothing to send back
    Empty,
    /// the encoded json document
    Value(serde_json::Result<Vec<u8>>),
    Failed(BoxError),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Empty => f.write_str("Empty"),
            Outcome::Value(Ok(bytes)) => f.debug_tuple("Value").field(&bytes.len()).finish(),
            Outcome::Value(Err(e)) => f.debug_tuple("Value").field(e).finish(),
            Outcome::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// A value a callback can return.
///
/// | return type      | outputs   | error |
/// |------------------|-----------|-------|
/// | `()`             | none      | no    |
/// | `Json<T>`        | `T`       | no    |
/// | `Result<(), E>`  | `E`       | yes   |
/// | `Result<T, E>`   | `T`, `E`  | yes   |
pub trait Reply: Send + 'static {
    /// The type names of the declared outputs, the error last.
    fn output_types() -> Vec<&'static str>;

    /// whether the last output is an error
    fn returns_error() -> bool {
        false
    }

    fn into_outcome(self) -> Outcome;
}

impl Reply for () {
    fn output_types() -> Vec<&'static str> {
        Vec::new()
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Empty
    }
}

impl<T: Serialize + Send + 'static> Reply for Json<T> {
    fn output_types() -> Vec<&'static str> {
        vec![type_name::<T>()]
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Value(serde_json::to_vec(&self.0))
    }
}

impl<T, E> Reply for Result<T, E>
where
    T: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    fn output_types() -> Vec<&'static str> {
        if is_unit::<T>() { vec![type_name::<E>()] } else { vec![type_name::<T>(), type_name::<E>()] }
    }

    fn returns_error() -> bool {
        true
    }

    fn into_outcome(self) -> Outcome {
        match self {
            Ok(_) if is_unit::<T>() => Outcome::Empty,
            Ok(value) => Outcome::Value(serde_json::to_vec(&value)),
            Err(e) => Outcome::Failed(e.into()),
        }
    }
}

fn is_unit<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<()>()
}
