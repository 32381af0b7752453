//! `Reflect`

use super::define_async;
use super::function::array_like_to_vec;
use super::object::{define_own, from_descriptor, to_descriptor};
use crate::backends::interpreter::property::describe_value;
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::{CallArgs, Obj, Property, PropertyKey, Value};

pub(crate) fn install(interp: &Interpreter) {
    let reflect = interp.new_object();
    reflect.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::constant(Value::str("Reflect")),
    );

    define_async(interp, &reflect, "apply", 3, |interp: Interpreter, args: CallArgs| async move {
        let target = args.arg(0);
        if !interp.is_callable(&target) {
            return Err(interp.type_error(format!("{} is not a function", describe_value(&target))));
        }
        let list = argument_list(&interp, &args.arg(2)).await?;
        interp.call(&target, args.arg(1), list).await
    });
    define_async(interp, &reflect, "construct", 2, |interp: Interpreter, args: CallArgs| async move {
        let target = args.arg(0);
        if !interp.is_constructor(&target) {
            return Err(interp.type_error(format!("{} is not a constructor", describe_value(&target))));
        }
        let new_target = match args.args.get(2) {
            None => None,
            Some(v) if interp.is_constructor(v) => v.as_object().cloned(),
            Some(v) => return Err(interp.type_error(format!("{} is not a constructor", describe_value(v)))),
        };
        let list = argument_list(&interp, &args.arg(1)).await?;
        interp.construct(&target, list, new_target).await
    });
    define_async(interp, &reflect, "defineProperty", 3, |interp: Interpreter, args: CallArgs| async move {
        let obj = target(&interp, &args, "defineProperty")?;
        let key = interp.to_property_key(&args.arg(1)).await?;
        let existing = obj.lock().get_own(&key);
        let prop = to_descriptor(&interp, &args.arg(2), existing).await?;
        Ok(Value::Bool(define_own(&interp, &obj, key, prop).is_ok()))
    });
    define_async(interp, &reflect, "deleteProperty", 2, |interp: Interpreter, args: CallArgs| async move {
        let obj = target(&interp, &args, "deleteProperty")?;
        let key = interp.to_property_key(&args.arg(1)).await?;
        let removed = obj.lock().remove(&key);
        Ok(Value::Bool(removed))
    });
    define_async(interp, &reflect, "get", 2, |interp: Interpreter, args: CallArgs| async move {
        let obj = target(&interp, &args, "get")?;
        let key = interp.to_property_key(&args.arg(1)).await?;
        let receiver = args.args.get(2).cloned().unwrap_or(Value::Object(obj.clone()));
        get_with_receiver(&interp, &obj, &key, receiver).await
    });
    define_async(
        interp,
        &reflect,
        "getOwnPropertyDescriptor",
        2,
        |interp: Interpreter, args: CallArgs| async move {
            let obj = target(&interp, &args, "getOwnPropertyDescriptor")?;
            let key = interp.to_property_key(&args.arg(1)).await?;
            let prop = obj.lock().get_own(&key);
            Ok(prop.map(|p| from_descriptor(&interp, &p)).unwrap_or_default())
        },
    );
    interp.define_method(&reflect, "getPrototypeOf", 1, |interp, args: CallArgs| {
        let obj = target(interp, &args, "getPrototypeOf")?;
        Ok(obj.proto().map(Value::Object).unwrap_or(Value::Null))
    });
    define_async(interp, &reflect, "has", 2, |interp: Interpreter, args: CallArgs| async move {
        let obj = target(&interp, &args, "has")?;
        let key = interp.to_property_key(&args.arg(1)).await?;
        Ok(Value::Bool(interp.has_property(&obj, &key)))
    });
    interp.define_method(&reflect, "isExtensible", 1, |interp, args: CallArgs| {
        let obj = target(interp, &args, "isExtensible")?;
        let extensible = obj.lock().extensible;
        Ok(Value::Bool(extensible))
    });
    interp.define_method(&reflect, "ownKeys", 1, |interp, args: CallArgs| {
        let obj = target(interp, &args, "ownKeys")?;
        let keys: Vec<Value> = obj.lock().own_keys().into_iter().map(|k| k.to_value()).collect();
        Ok(Value::Object(interp.new_array(keys)))
    });
    interp.define_method(&reflect, "preventExtensions", 1, |interp, args: CallArgs| {
        let obj = target(interp, &args, "preventExtensions")?;
        obj.lock().extensible = false;
        Ok(Value::Bool(true))
    });
    define_async(interp, &reflect, "set", 3, |interp: Interpreter, args: CallArgs| async move {
        let obj = target(&interp, &args, "set")?;
        let key = interp.to_property_key(&args.arg(1)).await?;
        // a foreign receiver gets the property written onto itself
        let receiver = args.args.get(3).cloned().unwrap_or(Value::Object(obj));
        Ok(Value::Bool(interp.set(&receiver, key, args.arg(2)).await.is_ok()))
    });
    interp.define_method(&reflect, "setPrototypeOf", 2, |interp, args: CallArgs| {
        let obj = target(interp, &args, "setPrototypeOf")?;
        let proto = match args.arg(1) {
            Value::Object(p) => Some(p),
            Value::Null => None,
            _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
        };
        let mut cursor = proto.clone();
        while let Some(p) = cursor {
            if p.ptr_eq(&obj) {
                return Ok(Value::Bool(false));
            }
            cursor = p.proto();
        }
        let mut object = obj.lock();
        let same = match (&object.proto, &proto) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if !object.extensible && !same {
            return Ok(Value::Bool(false));
        }
        object.proto = proto;
        Ok(Value::Bool(true))
    });

    interp.define_global("Reflect", Value::Object(reflect));
}

/// First argument, which every `Reflect` function requires to be an object
fn target(
    interp: &Interpreter,
    args: &CallArgs,
    method: &str,
) -> JsResult<Obj> {
    match args.arg(0) {
        Value::Object(obj) => Ok(obj),
        _ => Err(interp.type_error(format!("Reflect.{} called on non-object", method))),
    }
}

async fn argument_list(
    interp: &Interpreter,
    list: &Value,
) -> JsResult<Vec<Value>> {
    match list {
        Value::Object(_) => array_like_to_vec(interp, list).await,
        _ => Err(interp.type_error("CreateListFromArrayLike called on non-object")),
    }
}

/// `[[Get]]` with getters invoked on `receiver`
async fn get_with_receiver(
    interp: &Interpreter,
    obj: &Obj,
    key: &PropertyKey,
    receiver: Value,
) -> JsResult<Value> {
    use crate::runtime::value::Slot;

    let mut current = Some(obj.clone());
    while let Some(o) = current {
        let (prop, proto) = {
            let object = o.lock();
            (object.get_own(key), object.proto.clone())
        };
        match prop.map(|p| p.slot) {
            Some(Slot::Data(v)) => return Ok(v),
            Some(Slot::Accessor { get: Some(getter), .. }) => {
                return interp.call_function(&getter, receiver, Vec::new()).await;
            }
            Some(Slot::Accessor { get: None, .. }) => return Ok(Value::Undefined),
            None => current = proto,
        }
    }
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::module::NodeResolver;
    use std::sync::Arc;

    #[test]
    fn test_target_rejects_primitives() {
        let interp = Interpreter::new(Arc::new(NodeResolver::default()));
        let args = CallArgs::new(Value::Undefined, vec![Value::Number(1.0)]);
        assert!(target(&interp, &args, "get").is_err());
        let obj = interp.new_object();
        let args = CallArgs::new(Value::Undefined, vec![Value::Object(obj.clone())]);
        assert!(target(&interp, &args, "get").is_ok_and(|o| o.ptr_eq(&obj)));
    }
}
