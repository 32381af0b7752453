//! `Promise`
//!
//! Reactions and thenable adoption live in the job queue; this module only
//! wires the constructor, `then` and the combinators onto it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{async_ctor, async_fn, define_async, proto_for};
use crate::backends::interpreter::{ErrorKind, Interpreter, JsResult, Throw};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, PromiseState, Property, PropertyKey, Value};

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().promise_proto.clone();
    let ctor = interp.define_constructor("Promise", 1, async_ctor(promise_ctor), &proto);

    interp.define_method(&ctor, "resolve", 1, |interp, args: CallArgs| {
        Ok(Value::Object(interp.promise_resolved(args.arg(0))))
    });
    interp.define_method(&ctor, "reject", 1, |interp, args: CallArgs| {
        Ok(Value::Object(interp.promise_rejected(args.arg(0))))
    });
    interp.define_method(&ctor, "withResolvers", 0, |interp, _| {
        let promise = interp.new_promise();
        let (resolve, reject) = interp.resolving_functions(&promise);
        Ok(Value::Object(interp.object_from(vec![
            ("promise", Value::Object(promise)),
            ("resolve", Value::Object(resolve)),
            ("reject", Value::Object(reject)),
        ])))
    });
    define_async(interp, &ctor, "try", 1, |interp: Interpreter, args: CallArgs| async move {
        let rest = args.args.iter().skip(1).cloned().collect();
        let promise = match interp.call(&args.arg(0), Value::Undefined, rest).await {
            Ok(v) => interp.promise_resolved(v),
            Err(Throw(e)) => interp.promise_rejected(e),
        };
        Ok(Value::Object(promise))
    });
    define_async(interp, &ctor, "all", 1, |interp, args| combine(interp, args, Combinator::All));
    define_async(interp, &ctor, "allSettled", 1, |interp, args| combine(interp, args, Combinator::AllSettled));
    define_async(interp, &ctor, "any", 1, |interp, args| combine(interp, args, Combinator::Any));
    define_async(interp, &ctor, "race", 1, |interp, args| combine(interp, args, Combinator::Race));

    interp.define_method(&proto, "then", 2, |interp, args: CallArgs| {
        let promise = this_promise(interp, &args.this, "then")?;
        let derived = interp.new_promise();
        interp.promise_then(
            &promise,
            callable_or_undefined(interp, args.arg(0)),
            callable_or_undefined(interp, args.arg(1)),
            Some(derived.clone()),
        );
        Ok(Value::Object(derived))
    });
    define_async(interp, &proto, "catch", 1, |interp: Interpreter, args: CallArgs| async move {
        let then = interp.get_named(&args.this, "then").await?;
        interp.call(&then, args.this.clone(), vec![Value::Undefined, args.arg(0)]).await
    });
    define_async(interp, &proto, "finally", 1, finally);

    proto.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::constant(Value::str("Promise")),
    );
}

async fn promise_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let Some(target) = &args.new_target else {
        return Err(interp.type_error("Promise constructor cannot be invoked without 'new'"));
    };
    let executor = args.arg(0);
    if !interp.is_callable(&executor) {
        return Err(interp.type_error("Promise resolver is not a function"));
    }
    let proto = proto_for(&interp, Some(target), &interp.intrinsics().promise_proto);
    let promise = Obj::new(Object::new(
        Some(proto),
        ObjectKind::Promise(PromiseState::Pending(Vec::new())),
    ));
    let (resolve, reject) = interp.resolving_functions(&promise);
    let call_args = vec![Value::Object(resolve), Value::Object(reject.clone())];
    if let Err(Throw(e)) = interp.call(&executor, Value::Undefined, call_args).await {
        interp.call_function(&reject, Value::Undefined, vec![e]).await?;
    }
    Ok(Value::Object(promise))
}

fn this_promise(
    interp: &Interpreter,
    this: &Value,
    method: &str,
) -> JsResult<Obj> {
    match this {
        Value::Object(obj) if interp.is_promise(this) => Ok(obj.clone()),
        _ => Err(interp.type_error(format!(
            "Method Promise.prototype.{} called on incompatible receiver",
            method
        ))),
    }
}

fn callable_or_undefined(
    interp: &Interpreter,
    value: Value,
) -> Value {
    if interp.is_callable(&value) {
        value
    } else {
        Value::Undefined
    }
}

async fn finally(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let on_finally = args.arg(0);
    let then = interp.get_named(&args.this, "then").await?;
    if !interp.is_callable(&on_finally) {
        return interp.call(&then, args.this.clone(), vec![on_finally.clone(), on_finally]).await;
    }

    let callback = on_finally.clone();
    let then_finally = async_fn(&interp, "", 1, move |interp: Interpreter, args: CallArgs| {
        let callback = callback.clone();
        async move {
            let value = args.arg(0);
            let result = interp.call(&callback, Value::Undefined, Vec::new()).await?;
            let pass = interp.native_fn("", 0, move |_, _| Ok(value.clone()));
            Ok(Value::Object(chain(&interp, result, Value::Object(pass))))
        }
    });
    let callback = on_finally;
    let catch_finally = async_fn(&interp, "", 1, move |interp: Interpreter, args: CallArgs| {
        let callback = callback.clone();
        async move {
            let reason = args.arg(0);
            let result = interp.call(&callback, Value::Undefined, Vec::new()).await?;
            let rethrow = interp.native_fn("", 0, move |_, _| Err(Throw(reason.clone())));
            Ok(Value::Object(chain(&interp, result, Value::Object(rethrow))))
        }
    });
    interp
        .call(
            &then,
            args.this.clone(),
            vec![Value::Object(then_finally), Value::Object(catch_finally)],
        )
        .await
}

/// `Promise.resolve(value).then(next)`
fn chain(
    interp: &Interpreter,
    value: Value,
    next: Value,
) -> Obj {
    let promise = interp.promise_resolved(value);
    let derived = interp.new_promise();
    interp.promise_then(&promise, next, Value::Undefined, Some(derived.clone()));
    derived
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Combinator {
    All,
    AllSettled,
    Any,
    Race,
}

/// Shared bookkeeping of one `Promise.all`-style call
struct Gather {
    values: Mutex<Vec<Value>>,
    remaining: AtomicUsize,
    result: Obj,
}

impl Gather {
    /// Store slot `i`; settles the result once every slot is filled
    fn store(
        &self,
        interp: &Interpreter,
        i: usize,
        value: Value,
        reject: bool,
    ) {
        let done = {
            let mut values = self.values.lock();
            if let Some(slot) = values.get_mut(i) {
                *slot = value;
            }
            self.remaining.fetch_sub(1, Ordering::SeqCst) == 1
        };
        if !done {
            return;
        }
        let values = std::mem::take(&mut *self.values.lock());
        let array = Value::Object(interp.new_array(values));
        if reject {
            let error = interp.new_error(ErrorKind::AggregateError, "All promises were rejected");
            error.lock().define("errors", Property::hidden(array));
            interp.reject_promise(&self.result, Value::Object(error));
        } else {
            interp.resolve_promise(&self.result, array);
        }
    }
}

async fn combine(
    interp: Interpreter,
    args: CallArgs,
    kind: Combinator,
) -> JsResult<Value> {
    let result = interp.new_promise();
    let items = match interp.iterate_to_vec(&args.arg(0)).await {
        Ok(items) => items,
        Err(Throw(e)) => {
            interp.reject_promise(&result, e);
            return Ok(Value::Object(result));
        }
    };
    let (resolve, reject) = interp.resolving_functions(&result);

    if items.is_empty() {
        match kind {
            Combinator::All | Combinator::AllSettled => {
                interp.resolve_promise(&result, Value::Object(interp.new_array(Vec::new())));
            }
            Combinator::Any => {
                let error = interp.new_error(ErrorKind::AggregateError, "All promises were rejected");
                let empty = Value::Object(interp.new_array(Vec::new()));
                error.lock().define("errors", Property::hidden(empty));
                interp.reject_promise(&result, Value::Object(error));
            }
            Combinator::Race => {}
        }
        return Ok(Value::Object(result));
    }

    let gather = Arc::new(Gather {
        values: Mutex::new(vec![Value::Undefined; items.len()]),
        remaining: AtomicUsize::new(items.len()),
        result: result.clone(),
    });
    for (i, item) in items.into_iter().enumerate() {
        let promise = interp.promise_resolved(item);
        let (on_fulfilled, on_rejected) = match kind {
            Combinator::Race => (Value::Object(resolve.clone()), Value::Object(reject.clone())),
            Combinator::All => {
                let g = gather.clone();
                let fulfilled = interp.native_fn("", 1, move |interp, args: CallArgs| {
                    g.store(interp, i, args.arg(0), false);
                    Ok(Value::Undefined)
                });
                (Value::Object(fulfilled), Value::Object(reject.clone()))
            }
            Combinator::AllSettled => {
                let g = gather.clone();
                let fulfilled = interp.native_fn("", 1, move |interp, args: CallArgs| {
                    let entry = interp.object_from(vec![("status", Value::str("fulfilled")), ("value", args.arg(0))]);
                    g.store(interp, i, Value::Object(entry), false);
                    Ok(Value::Undefined)
                });
                let g = gather.clone();
                let rejected = interp.native_fn("", 1, move |interp, args: CallArgs| {
                    let entry = interp.object_from(vec![("status", Value::str("rejected")), ("reason", args.arg(0))]);
                    g.store(interp, i, Value::Object(entry), false);
                    Ok(Value::Undefined)
                });
                (Value::Object(fulfilled), Value::Object(rejected))
            }
            Combinator::Any => {
                let g = gather.clone();
                let rejected = interp.native_fn("", 1, move |interp, args: CallArgs| {
                    g.store(interp, i, args.arg(0), true);
                    Ok(Value::Undefined)
                });
                (Value::Object(resolve.clone()), Value::Object(rejected))
            }
        };
        interp.promise_then(&promise, on_fulfilled, on_rejected, None);
    }
    Ok(Value::Object(result))
}
