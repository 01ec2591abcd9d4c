//! Runtime type descriptors and the raw text to value converter.
//!
//! Every field that takes part in binding has a [`TypeInfo`], supplied by its [`FieldType`]
//! implementation. The descriptor is captured once when an input type is registered and then
//! drives [`convert`] on every request, so no per-request type inspection happens.
//!
//! Conversion policy:
//!
//! | destination            | empty input       | non-empty input                         |
//! |------------------------|-------------------|-----------------------------------------|
//! | text                   | empty text        | the input, retyped                      |
//! | boolean                | `false`           | `1 t T TRUE true True 0 f F FALSE false False` |
//! | integers (any width)   | `0`               | parsed, out of range fails              |
//! | floats (any width)     | `0.0`             | parsed, overflow of the width fails     |
//! | `Option<T>`            | `None`            | `Some(convert T)`                       |
//! | `Box<T>`               | boxed zero of `T` | `Box::new(convert T)`                   |
//! | anything else          | zero value        | [`ConvertError::UnsupportedFieldType`]  |
//!
//! An empty input is not an error: absent optional parameters simply keep their zero value.

use crate::error::ConvertError;
use crate::form::UploadedFile;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

/// A resolved value on its way into a field of the input type.
pub type BoundValue = Box<dyn Any + Send>;

type ParseFn = fn(&str) -> Result<BoundValue, ConvertError>;
type DecodeFn = fn(&[u8]) -> Result<BoundValue, serde_json::Error>;
type WrapFn = fn(BoundValue) -> Result<BoundValue, ConvertError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Text,
    Bool,
    Signed { bits: u32 },
    Unsigned { bits: u32 },
    Float { bits: u32 },
    /// `Option<T>`; absent values stay `None`
    Optional,
    /// `Box<T>`
    Boxed,
    /// an [`UploadedFile`] handle
    File,
    /// a structured document, only reachable through the request body
    Record,
}

/// Describes a field type: its name, its kind, how to build its zero value, and how to produce
/// it from text or from a json document.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    name: &'static str,
    kind: TypeKind,
    zero: fn() -> BoundValue,
    parse: Option<ParseFn>,
    decode: Option<DecodeFn>,
    inner: Option<fn() -> TypeInfo>,
    wrap: Option<WrapFn>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("decodable", &self.decode.is_some())
            .finish_non_exhaustive()
    }
}

impl TypeInfo {
    fn new<T: Default + Send + 'static>(kind: TypeKind) -> Self {
        Self { name: type_name::<T>(), kind, zero: zero_of::<T>, parse: None, decode: None, inner: None, wrap: None }
    }

    /// Text-like types, `String` and newtypes over it.
    pub fn text<T: From<String> + Default + Send + 'static>() -> Self {
        Self { parse: Some(parse_text::<T>), ..Self::new::<T>(TypeKind::Text) }
    }

    pub fn boolean<T: From<bool> + Default + Send + 'static>() -> Self {
        Self { parse: Some(parse_bool::<T>), ..Self::new::<T>(TypeKind::Bool) }
    }

    pub fn signed<T>(bits: u32) -> Self
    where
        T: FromStr<Err = ParseIntError> + Default + Send + 'static,
    {
        Self { parse: Some(parse_int::<T>), ..Self::new::<T>(TypeKind::Signed { bits }) }
    }

    pub fn unsigned<T>(bits: u32) -> Self
    where
        T: FromStr<Err = ParseIntError> + Default + Send + 'static,
    {
        Self { parse: Some(parse_int::<T>), ..Self::new::<T>(TypeKind::Unsigned { bits }) }
    }

    pub fn float<T>(bits: u32) -> Self
    where
        T: FromStr<Err = ParseFloatError> + Into<f64> + Copy + Default + Send + 'static,
    {
        Self { parse: Some(parse_float::<T>), ..Self::new::<T>(TypeKind::Float { bits }) }
    }

    /// A structured document that can only be bound from the json request body.
    pub fn record<T: DeserializeOwned + Default + Send + 'static>() -> Self {
        Self::new::<T>(TypeKind::Record).decodable::<T>()
    }

    pub fn optional<T: FieldType>() -> Self {
        Self {
            name: type_name::<Option<T>>(),
            kind: TypeKind::Optional,
            zero: zero_of::<Option<T>>,
            parse: None,
            decode: T::type_info().decode.map(|_| decode_some::<T> as DecodeFn),
            inner: Some(T::type_info),
            wrap: Some(wrap_some::<T>),
        }
    }

    pub fn boxed<T: FieldType>() -> Self {
        Self {
            name: type_name::<Box<T>>(),
            kind: TypeKind::Boxed,
            zero: boxed_zero_of::<T>,
            parse: None,
            decode: T::type_info().decode.map(|_| decode_boxed::<T> as DecodeFn),
            inner: Some(T::type_info),
            wrap: Some(wrap_boxed::<T>),
        }
    }

    pub(crate) fn file() -> Self {
        Self::new::<UploadedFile>(TypeKind::File)
    }

    /// Lets the described type be bound from a json request body. `T` must be the described type.
    #[must_use]
    pub fn decodable<T: DeserializeOwned + Send + 'static>(self) -> Self {
        Self { decode: Some(decode_as::<T>), ..self }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_decodable(&self) -> bool {
        self.decode.is_some()
    }

    pub fn zero(&self) -> BoundValue {
        (self.zero)()
    }

    /// Decodes a json document into a value of the described type.
    pub fn decode(&self, bytes: &[u8]) -> Option<Result<BoundValue, serde_json::Error>> {
        self.decode.map(|decode| decode(bytes))
    }
}

/// Types that can be the destination of a binding.
///
/// Implemented for `String`, `bool`, every integer and float type, `Option<T>`, `Box<T>` and
/// [`UploadedFile`]. Json documents bound from the request body implement it through
/// [`TypeInfo::record`], usually via the [`record_types!`](crate::record_types) macro.
pub trait FieldType: Send + Sized + 'static {
    fn type_info() -> TypeInfo;
}

/// Converts `raw` into a value of the type `target` describes.
pub fn convert(raw: &str, target: &TypeInfo) -> Result<BoundValue, ConvertError> {
    if raw.is_empty() {
        return Ok(target.zero());
    }

    match target.kind {
        TypeKind::Text | TypeKind::Bool | TypeKind::Signed { .. } | TypeKind::Unsigned { .. } | TypeKind::Float { .. } => {
            let parse = target.parse.ok_or(ConvertError::UnsupportedFieldType { type_name: target.name })?;
            parse(raw)
        }
        TypeKind::Optional | TypeKind::Boxed => match (target.inner, target.wrap) {
            (Some(inner), Some(wrap)) => wrap(convert(raw, &inner())?),
            _ => Err(ConvertError::UnsupportedFieldType { type_name: target.name }),
        },
        TypeKind::File | TypeKind::Record => Err(ConvertError::UnsupportedFieldType { type_name: target.name }),
    }
}

fn zero_of<T: Default + Send + 'static>() -> BoundValue {
    Box::new(T::default())
}

fn boxed_zero_of<T: FieldType>() -> BoundValue {
    let zero = T::type_info().zero();
    match zero.downcast::<T>() {
        Ok(value) => Box::new(value) as BoundValue,
        // left for the assignment step to reject
        Err(other) => other,
    }
}

fn parse_text<T: From<String> + Send + 'static>(raw: &str) -> Result<BoundValue, ConvertError> {
    Ok(Box::new(T::from(raw.to_owned())))
}

fn parse_bool<T: From<bool> + Send + 'static>(raw: &str) -> Result<BoundValue, ConvertError> {
    let value = match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => true,
        "0" | "f" | "F" | "FALSE" | "false" | "False" => false,
        _ => return Err(ConvertError::InvalidBool { value: raw.to_owned() }),
    };
    Ok(Box::new(T::from(value)))
}

fn parse_int<T>(raw: &str) -> Result<BoundValue, ConvertError>
where
    T: FromStr<Err = ParseIntError> + Send + 'static,
{
    raw.parse::<T>()
        .map(|value| Box::new(value) as BoundValue)
        .map_err(|source| ConvertError::InvalidInteger { value: raw.to_owned(), type_name: type_name::<T>(), source })
}

fn parse_float<T>(raw: &str) -> Result<BoundValue, ConvertError>
where
    T: FromStr<Err = ParseFloatError> + Into<f64> + Copy + Send + 'static,
{
    let value = raw.parse::<T>().map_err(|e| ConvertError::invalid_float(raw, type_name::<T>(), &e))?;
    let widened: f64 = value.into();
    if widened.is_infinite() && !names_infinity(raw) {
        return Err(ConvertError::float_out_of_range(raw, type_name::<T>()));
    }
    Ok(Box::new(value))
}

fn names_infinity(raw: &str) -> bool {
    let unsigned = raw.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn decode_as<T: DeserializeOwned + Send + 'static>(bytes: &[u8]) -> Result<BoundValue, serde_json::Error> {
    serde_json::from_slice::<T>(bytes).map(|value| Box::new(value) as BoundValue)
}

fn decode_inner<T: FieldType>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    use serde::de::Error as _;

    let decoded = T::type_info()
        .decode(bytes)
        .ok_or_else(|| serde_json::Error::custom(format!("{} is not decodable", type_name::<T>())))??;
    decoded
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| serde_json::Error::custom(format!("decoded value is not {}", type_name::<T>())))
}

fn decode_some<T: FieldType>(bytes: &[u8]) -> Result<BoundValue, serde_json::Error> {
    decode_inner::<T>(bytes).map(|value| Box::new(Some(value)) as BoundValue)
}

fn decode_boxed<T: FieldType>(bytes: &[u8]) -> Result<BoundValue, serde_json::Error> {
    decode_inner::<T>(bytes).map(|value| Box::new(Box::new(value)) as BoundValue)
}

fn wrap_some<T: FieldType>(value: BoundValue) -> Result<BoundValue, ConvertError> {
    value
        .downcast::<T>()
        .map(|value| Box::new(Some(*value)) as BoundValue)
        .map_err(|_| ConvertError::Mismatch { type_name: type_name::<T>() })
}

fn wrap_boxed<T: FieldType>(value: BoundValue) -> Result<BoundValue, ConvertError> {
    value
        .downcast::<T>()
        .map(|value| Box::new(value) as BoundValue)
        .map_err(|_| ConvertError::Mismatch { type_name: type_name::<T>() })
}

impl FieldType for String {
    fn type_info() -> TypeInfo {
        TypeInfo::text::<String>().decodable::<String>()
    }
}

impl FieldType for bool {
    fn type_info() -> TypeInfo {
        TypeInfo::boolean::<bool>().decodable::<bool>()
    }
}

macro_rules! impl_field_type_for_number {
    ($constructor:ident: $($ty:ty => $bits:expr),* $(,)?) => {
        $(
        impl FieldType for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::$constructor::<$ty>($bits).decodable::<$ty>()
            }
        }
        )*
    };
}

impl_field_type_for_number! { signed: i8 => 8, i16 => 16, i32 => 32, i64 => 64, i128 => 128, isize => isize::BITS }
impl_field_type_for_number! { unsigned: u8 => 8, u16 => 16, u32 => 32, u64 => 64, u128 => 128, usize => usize::BITS }
impl_field_type_for_number! { float: f32 => 32, f64 => 64 }

impl<T: FieldType> FieldType for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::optional::<T>()
    }
}

impl<T: FieldType> FieldType for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::boxed::<T>()
    }
}

impl FieldType for serde_json::Value {
    fn type_info() -> TypeInfo {
        TypeInfo::record::<serde_json::Value>()
    }
}

impl FieldType for UploadedFile {
    fn type_info() -> TypeInfo {
        TypeInfo::file()
    }
}

/// Implements [`FieldType`] for json documents that are bound from the request body.
///
/// ```
/// # use serde::Deserialize;
/// #[derive(Deserialize, Default)]
/// struct CreateUser {
///     name: String,
/// }
///
/// micro_bind::record_types!(CreateUser);
/// ```
#[macro_export]
macro_rules! record_types {
    ($($ty:ty),+ $(,)?) => {
        $(
        impl $crate::FieldType for $ty {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::record::<$ty>()
            }
        }
        )+
    };
}
