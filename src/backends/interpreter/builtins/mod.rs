//! Standard library objects
//!
//! Each submodule installs one family of globals. Builtins that never call
//! back into JavaScript are plain functions `fn(&Interpreter, CallArgs)`;
//! those that do are `async fn(Interpreter, CallArgs)` registered through
//! [`define_async`].

pub mod array;
pub mod collections;
pub mod console;
pub mod date;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod node;
pub mod number;
pub mod object;
pub mod promise;
pub mod reflect;
pub mod regexp;
pub mod string;
pub mod symbol;
pub mod typed_array;

use std::future::Future;
use std::sync::Arc;

use super::{BoxFuture, Interpreter, JsResult};
use crate::runtime::value::number::to_integer;
use crate::runtime::value::{CallArgs, NativeFn, Obj, ObjectKind, PropertyKey, Value};

/// Install every builtin into a fresh realm
pub fn install(interp: &Interpreter) {
    object::install(interp);
    function::install(interp);
    error::install(interp);
    symbol::install(interp);
    install_iterator_protos(interp);
    array::install(interp);
    string::install(interp);
    number::install(interp);
    math::install(interp);
    json::install(interp);
    promise::install(interp);
    collections::install(interp);
    date::install(interp);
    regexp::install(interp);
    typed_array::install(interp);
    reflect::install(interp);
    global::install(interp);
    console::install(interp);
    node::install(interp);
    super::generator::install(interp);
}

/// `[Symbol.iterator]() { return this }` on the iterator prototypes
fn install_iterator_protos(interp: &Interpreter) {
    let i = interp.intrinsics();
    let this = |_: &Interpreter, args: CallArgs| Ok(args.this);
    let iter = interp.native_fn("[Symbol.iterator]", 0, this);
    interp.define_symbol_method(&i.iterator_proto, i.symbols.iterator.clone(), iter);
    let async_iter = interp.native_fn("[Symbol.asyncIterator]", 0, this);
    interp.define_symbol_method(&i.async_iterator_proto, i.symbols.async_iterator.clone(), async_iter);
}

/// Register an `async fn` builtin as a method of `target`
pub(crate) fn define_async<F, Fut>(
    interp: &Interpreter,
    target: &Obj,
    name: &str,
    length: usize,
    f: F,
) where
    F: Fn(Interpreter, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsResult<Value>> + Send + 'static,
{
    interp.define_async_method(target, name, length, move |interp, args| Box::pin(f(interp, args)));
}

/// Async builtin function object
pub(crate) fn async_fn<F, Fut>(
    interp: &Interpreter,
    name: &str,
    length: usize,
    f: F,
) -> Obj
where
    F: Fn(Interpreter, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsResult<Value>> + Send + 'static,
{
    interp.async_native_fn(name, length, move |interp, args| Box::pin(f(interp, args)))
}

/// Constructor body from an `async fn` builtin
pub(crate) fn async_ctor<F, Fut>(f: F) -> NativeFn
where
    F: Fn(Interpreter, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsResult<Value>> + Send + 'static,
{
    NativeFn::Async(Arc::new(move |interp: Interpreter, args: CallArgs| -> BoxFuture<'static, JsResult<Value>> {
        Box::pin(f(interp, args))
    }))
}

/// Prototype for an object created by a builtin constructor
pub(crate) fn proto_for(
    interp: &Interpreter,
    new_target: Option<&Obj>,
    fallback: &Obj,
) -> Obj {
    new_target
        .and_then(
            |target| match interp.get_data(&Value::Object(target.clone()), &PropertyKey::from("prototype")) {
                Some(Value::Object(proto)) => Some(proto),
                _ => None,
            },
        )
        .unwrap_or_else(|| fallback.clone())
}

/// `ToNumber` without running user code: wrappers and dates unwrap, other objects are `NaN`
pub(crate) fn number_of(
    interp: &Interpreter,
    value: &Value,
) -> JsResult<f64> {
    match value {
        Value::Object(obj) => {
            let inner = match &obj.lock().kind {
                ObjectKind::Boxed(v) => v.clone(),
                ObjectKind::Date(t) => Value::Number(*t),
                _ => Value::Number(f64::NAN),
            };
            interp.primitive_to_number(&inner)
        }
        v => interp.primitive_to_number(v),
    }
}

/// `ToIntegerOrInfinity` of argument `i`, `default` when it is `undefined`
pub(crate) fn integer_arg(
    interp: &Interpreter,
    args: &CallArgs,
    i: usize,
    default: f64,
) -> JsResult<f64> {
    match args.args.get(i) {
        None | Some(Value::Undefined) => Ok(default),
        Some(v) => Ok(to_integer(number_of(interp, v)?)),
    }
}

/// `ToString` of argument `i`
pub(crate) async fn string_arg(
    interp: &Interpreter,
    args: &CallArgs,
    i: usize,
) -> JsResult<Arc<str>> {
    interp.to_string(&args.arg(i)).await
}

/// `this` as an object, for methods that require one
pub(crate) fn this_object(
    interp: &Interpreter,
    args: &CallArgs,
    method: &str,
) -> JsResult<Obj> {
    match &args.this {
        Value::Object(obj) => Ok(obj.clone()),
        Value::Undefined | Value::Null => Err(interp.type_error(format!("{} called on null or undefined", method))),
        v => interp.to_object(v),
    }
}
