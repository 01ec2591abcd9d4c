//! Declaring the bindable fields of an input type.
//!
//! An input type implements [`Bind`] and lists its fields once, each with the annotation that
//! names its request source and a typed accessor:
//!
//! ```
//! use micro_bind::{Bind, Fields};
//!
//! #[derive(Default)]
//! struct GetUser {
//!     id: u64,
//!     token: String,
//!     verbose: bool,
//! }
//!
//! impl Bind for GetUser {
//!     fn bindings(fields: &mut Fields<Self>) {
//!         fields
//!             .field("id", "path:id", |input| &mut input.id)
//!             .field("token", "header:Authorization", |input| &mut input.token)
//!             .field("verbose", "query:verbose", |input| &mut input.verbose);
//!     }
//! }
//! ```
//!
//! The declarations are erased into a [`Record`], which the compiler turns into a plan. Nothing
//! here runs per request except the setters.

use crate::convert::{BoundValue, FieldType, TypeInfo};
use crate::error::ResolveError;
use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;

/// An input type whose fields can be bound from a request.
///
/// `Default` provides the zero-valued instance every request starts from.
pub trait Bind: Default + Send + 'static {
    fn bindings(fields: &mut Fields<Self>);
}

type Setter = Box<dyn Fn(&mut (dyn Any + Send), BoundValue) -> Result<(), BoundValue> + Send + Sync>;

/// Collects the field declarations of `T`.
pub struct Fields<T> {
    decls: Vec<FieldDecl>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> fmt::Debug for Fields<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.decls).finish()
    }
}

impl<T: Send + 'static> Fields<T> {
    fn new() -> Self {
        Self { decls: Vec::new(), _phantom: PhantomData }
    }

    /// Declares a field written through `access`.
    pub fn field<F: FieldType>(
        &mut self,
        name: &'static str,
        annotation: &'static str,
        access: fn(&mut T) -> &mut F,
    ) -> &mut Self {
        let setter: Setter = Box::new(move |target: &mut (dyn Any + Send), value: BoundValue| -> Result<(), BoundValue> {
            let Some(target) = target.downcast_mut::<T>() else {
                return Err(value);
            };
            let value = value.downcast::<F>()?;
            *access(target) = *value;
            Ok(())
        });

        self.decls.push(FieldDecl { name, annotation, type_info: F::type_info(), setter: Some(setter) });
        self
    }

    /// Declares a field that cannot be written from outside its type. Annotating such a field
    /// is rejected when the plan is compiled.
    pub fn private<F: FieldType>(&mut self, name: &'static str, annotation: &'static str) -> &mut Self {
        self.decls.push(FieldDecl { name, annotation, type_info: F::type_info(), setter: None });
        self
    }
}

pub(crate) struct FieldDecl {
    name: &'static str,
    annotation: &'static str,
    type_info: TypeInfo,
    setter: Option<Setter>,
}

impl FieldDecl {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn annotation(&self) -> &'static str {
        self.annotation
    }

    pub(crate) fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub(crate) fn is_settable(&self) -> bool {
        self.setter.is_some()
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("name", &self.name)
            .field("annotation", &self.annotation)
            .field("type", &self.type_info.name())
            .field("settable", &self.is_settable())
            .finish()
    }
}

/// The erased field layout of an input type.
pub struct Record {
    type_name: &'static str,
    new_instance: fn() -> Box<dyn Any + Send>,
    fields: Vec<FieldDecl>,
}

impl Record {
    pub fn of<T: Bind>() -> Self {
        let mut fields = Fields::<T>::new();
        T::bindings(&mut fields);
        Self { type_name: type_name::<T>(), new_instance: new_instance_of::<T>, fields: fields.decls }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub(crate) fn field_name(&self, position: usize) -> &'static str {
        self.fields.get(position).map_or("<unknown>", FieldDecl::name)
    }

    /// A fresh zero-valued instance of the input type.
    pub(crate) fn new_instance(&self) -> Box<dyn Any + Send> {
        (self.new_instance)()
    }

    /// Writes `value` into the field at `position` of `target`.
    pub(crate) fn assign(
        &self,
        target: &mut (dyn Any + Send),
        position: usize,
        value: BoundValue,
    ) -> Result<(), ResolveError> {
        let field = self.fields.get(position).ok_or(ResolveError::FieldAssignment {
            field: "<unknown>",
            expected: self.type_name,
        })?;
        let assignment_error = || ResolveError::FieldAssignment { field: field.name, expected: field.type_info.name() };

        let setter = field.setter.as_ref().ok_or_else(assignment_error)?;
        setter(target, value).map_err(|_| assignment_error())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record").field("type_name", &self.type_name).field("fields", &self.fields).finish()
    }
}

fn new_instance_of<T: Bind>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}
