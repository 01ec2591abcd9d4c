//! Describes callbacks: how many inputs they take and what they return.

use crate::fields::{Bind, Record};
use crate::reply::Reply;
use std::any::{Any, type_name};
use std::future::Future;

/// Represents an async callback taking `Args` as a tuple.
pub trait Callback<Args>: Send + Sync + 'static {
    type Output: Reply;
    type Future: Future<Output = Self::Output> + Send;

    fn call(&self, args: Args) -> Self::Future;
}

/// impl `Fn` for `Callback`, from 0 parameters to 4 parameters
///
/// for example, it will impl Fn(A, B) like this:
///```ignore
/// impl<Func, Fut, A, B> Callback<(A, B)> for Func
///    where
///        Func: Fn(A, B) -> Fut + Send + Sync + 'static,
///        Fut: std::future::Future + Send,
///        Fut::Output: Reply,
/// {
///    type Output = Fut::Output;
///    type Future = Fut;
///
///    #[inline]
///    #[allow(non_snake_case)]
///    fn call(&self, (A, B): (A, B)) -> Self::Future {
///        (self)(A, B)
///    }
/// }
///```
macro_rules! impl_callback_for_fn ({ $($param:ident)* } => {
    impl<Func, Fut, $($param,)*> Callback<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future + Send,
        Fut::Output: Reply,
    {
        type Output = Fut::Output;
        type Future = Fut;

        #[inline]
        #[allow(non_snake_case, reason = "the tuple is destructured into its type parameter names")]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Future {
            (self)($($param,)*)
        }
    }
});

impl_callback_for_fn! {}
impl_callback_for_fn! { A }
impl_callback_for_fn! { A B }
impl_callback_for_fn! { A B C }
impl_callback_for_fn! { A B C D }

/// The argument tuple of a callback.
///
/// Only a single [`Bind`] argument can be bound from a request; other arities are described so
/// they can be rejected with a precise error.
pub trait Inputs: Send + Sized + 'static {
    const ARITY: usize;

    fn input_types() -> Vec<&'static str>;

    /// The field layout of the bound input, for the single-argument shape.
    fn record() -> Option<Record>;

    /// Rebuilds the argument tuple from a bound instance.
    fn from_instance(instance: Box<dyn Any + Send>) -> Option<Self>;
}

impl Inputs for () {
    const ARITY: usize = 0;

    fn input_types() -> Vec<&'static str> {
        Vec::new()
    }

    fn record() -> Option<Record> {
        None
    }

    fn from_instance(_instance: Box<dyn Any + Send>) -> Option<Self> {
        None
    }
}

impl<A: Bind> Inputs for (A,) {
    const ARITY: usize = 1;

    fn input_types() -> Vec<&'static str> {
        vec![type_name::<A>()]
    }

    fn record() -> Option<Record> {
        Some(Record::of::<A>())
    }

    fn from_instance(instance: Box<dyn Any + Send>) -> Option<Self> {
        instance.downcast::<A>().ok().map(|input| (*input,))
    }
}

macro_rules! impl_inputs_for_unbound_tuple ({ $arity:literal: $($param:ident)* } => {
    impl<$($param: Send + 'static,)*> Inputs for ($($param,)*) {
        const ARITY: usize = $arity;

        fn input_types() -> Vec<&'static str> {
            vec![$(type_name::<$param>(),)*]
        }

        fn record() -> Option<Record> {
            None
        }

        fn from_instance(_instance: Box<dyn Any + Send>) -> Option<Self> {
            None
        }
    }
});

impl_inputs_for_unbound_tuple! { 2: A B }
impl_inputs_for_unbound_tuple! { 3: A B C }
impl_inputs_for_unbound_tuple! { 4: A B C D }

/// The shape of a callback, computed once when it is adapted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackDescriptor {
    num_inputs: usize,
    num_outputs: usize,
    input_types: Vec<&'static str>,
    output_types: Vec<&'static str>,
    returns_error: bool,
}

impl CallbackDescriptor {
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn input_types(&self) -> &[&'static str] {
        &self.input_types
    }

    /// The output type names, the error last when [`returns_error`](Self::returns_error).
    pub fn output_types(&self) -> &[&'static str] {
        &self.output_types
    }

    pub fn returns_error(&self) -> bool {
        self.returns_error
    }
}

pub fn analyze<F, Args>(_callback: &F) -> CallbackDescriptor
where
    F: Callback<Args>,
    Args: Inputs,
{
    let output_types = F::Output::output_types();
    CallbackDescriptor {
        num_inputs: Args::ARITY,
        num_outputs: output_types.len(),
        input_types: Args::input_types(),
        output_types,
        returns_error: F::Output::returns_error(),
    }
}
