//! `Function` and `Function.prototype`

use std::sync::Arc;

use super::{async_ctor, async_fn, define_async};
use crate::backends::interpreter::property::describe_value;
use crate::backends::interpreter::{Cx, Interpreter, JsResult};
use crate::frontend::parser::parse_expression;
use crate::runtime::value::{
    BoundFunction, CallArgs, Callable, Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value,
};

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().function_proto.clone();
    interp.define_constructor("Function", 1, async_ctor(function_ctor), &proto);

    define_async(interp, &proto, "call", 1, |interp: Interpreter, args: CallArgs| async move {
        let this_arg = args.arg(0);
        let rest = args.args.iter().skip(1).cloned().collect();
        interp.call(&args.this, this_arg, rest).await
    });
    define_async(interp, &proto, "apply", 2, |interp: Interpreter, args: CallArgs| async move {
        let list = match args.arg(1) {
            Value::Undefined | Value::Null => Vec::new(),
            v @ Value::Object(_) => array_like_to_vec(&interp, &v).await?,
            _ => return Err(interp.type_error("CreateListFromArrayLike called on non-object")),
        };
        interp.call(&args.this, args.arg(0), list).await
    });
    interp.define_method(&proto, "bind", 1, bind);
    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| match &args.this {
        Value::Object(f) => match interp.function_text(f) {
            Some(text) => Ok(Value::from(text)),
            None => Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function")),
        },
        _ => Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function")),
    });

    let has_instance = async_fn(interp, "[Symbol.hasInstance]", 1, |interp: Interpreter, args: CallArgs| async move {
        let result = interp.ordinary_has_instance(&args.this, &args.arg(0)).await?;
        Ok(Value::Bool(result))
    });
    proto.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.has_instance.clone()),
        Property::constant(Value::Object(has_instance)),
    );
}

/// `new Function(p1, ..., body)`: parsed as a function expression in global scope
async fn function_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut parts = Vec::with_capacity(args.args.len());
    for v in &args.args {
        parts.push(interp.to_string(v).await?);
    }
    let body = parts.pop().unwrap_or_else(|| Arc::from(""));
    let params = parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(",");
    let text = format!("(function anonymous({}\n) {{\n{}\n}})", params, body);
    let expr = parse_expression(&text, false).map_err(|e| interp.syntax_error(e.to_string()))?;
    let cx = Cx::new(interp.realm().global_env.clone(), Arc::from(text));
    interp.eval(&expr, &cx).await
}

/// Elements `0..length` of an array-like object
pub(crate) async fn array_like_to_vec(
    interp: &Interpreter,
    value: &Value,
) -> JsResult<Vec<Value>> {
    if let Value::Object(obj) = value {
        if let Some(items) = obj.array_elements() {
            return Ok(items);
        }
    }
    let len = interp.get_named(value, "length").await?;
    let len = interp.length_of(&Value::Number(interp.to_number(&len).await?));
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(interp.get(value, &PropertyKey::from(i)).await?);
    }
    Ok(out)
}

fn bind(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let Value::Object(target) = &args.this else {
        return Err(interp.type_error("Bind must be called on a function"));
    };
    if !target.is_callable() {
        return Err(interp.type_error(format!("Bind must be called on a function, got {}", describe_value(&args.this))));
    }
    let bound_args: Vec<Value> = args.args.iter().skip(1).cloned().collect();
    let length = match interp.get_data(&args.this, &PropertyKey::from("length")) {
        Some(Value::Number(n)) => (n - bound_args.len() as f64).max(0.0),
        _ => 0.0,
    };
    let name = format!("bound {}", interp.function_name(target));
    let bound = Obj::new(Object::new(
        target.proto(),
        ObjectKind::Function(Callable::Bound(BoundFunction {
            target: target.clone(),
            this: args.arg(0),
            args: bound_args,
        })),
    ));
    {
        let mut object = bound.lock();
        let attr = |value: Value| Property {
            slot: Slot::Data(value),
            enumerable: false,
            writable: false,
            configurable: true,
        };
        object.define("length", attr(Value::Number(length)));
        object.define("name", attr(Value::from(name)));
    }
    Ok(Value::Object(bound))
}
