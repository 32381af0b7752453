//! `Symbol`

use super::async_ctor;
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::{CallArgs, ObjectKind, Property, PropertyKey, Symbol, Value};

pub(crate) fn install(interp: &Interpreter) {
    let i = interp.intrinsics();
    let proto = i.symbol_proto.clone();
    let ctor = interp.define_constructor("Symbol", 0, async_ctor(symbol_ctor), &proto);

    let well_known = [
        ("iterator", &i.symbols.iterator),
        ("asyncIterator", &i.symbols.async_iterator),
        ("hasInstance", &i.symbols.has_instance),
        ("toPrimitive", &i.symbols.to_primitive),
        ("toStringTag", &i.symbols.to_string_tag),
    ];
    {
        let mut object = ctor.lock();
        for (name, symbol) in well_known {
            object.define(name, Property::constant(Value::Symbol(symbol.clone())));
        }
    }

    interp.define_method(&ctor, "for", 1, |interp, args: CallArgs| {
        let key = match args.arg(0) {
            Value::Symbol(_) => return Err(interp.type_error("Cannot convert a Symbol value to a string")),
            v => v.primitive_to_string().map(|s| s.to_string()).unwrap_or_else(|| "[object Object]".into()),
        };
        let mut registry = interp.intrinsics().symbol_registry.lock();
        let symbol = registry
            .entry(key.clone())
            .or_insert_with(|| Symbol::new(Some(key)))
            .clone();
        Ok(Value::Symbol(symbol))
    });
    interp.define_method(&ctor, "keyFor", 1, |interp, args: CallArgs| {
        let Value::Symbol(symbol) = args.arg(0) else {
            return Err(interp.type_error("Symbol.keyFor: argument is not a symbol"));
        };
        let registry = interp.intrinsics().symbol_registry.lock();
        Ok(registry
            .iter()
            .find(|(_, s)| **s == symbol)
            .map(|(k, _)| Value::str(k))
            .unwrap_or_default())
    });

    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| {
        let symbol = this_symbol(interp, &args.this)?;
        Ok(Value::from(format!("Symbol({})", symbol.description().unwrap_or(""))))
    });
    interp.define_method(&proto, "valueOf", 0, |interp, args: CallArgs| {
        Ok(Value::Symbol(this_symbol(interp, &args.this)?))
    });
    interp.define_getter(&proto, "description", |interp, args: CallArgs| {
        let symbol = this_symbol(interp, &args.this)?;
        Ok(symbol.description().map(Value::str).unwrap_or_default())
    });
    let to_primitive = interp.native_fn("[Symbol.toPrimitive]", 1, |interp, args: CallArgs| {
        Ok(Value::Symbol(this_symbol(interp, &args.this)?))
    });
    interp.define_symbol_method(&proto, i.symbols.to_primitive.clone(), to_primitive);
    proto.lock().define(
        PropertyKey::Symbol(i.symbols.to_string_tag.clone()),
        Property::constant(Value::str("Symbol")),
    );
}

async fn symbol_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    if args.new_target.is_some() {
        return Err(interp.type_error("Symbol is not a constructor"));
    }
    let description = match args.arg(0) {
        Value::Undefined => None,
        v => Some(interp.to_string(&v).await?.to_string()),
    };
    Ok(Value::Symbol(Symbol::new(description)))
}

fn this_symbol(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Symbol> {
    match this {
        Value::Symbol(s) => Ok(s.clone()),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Boxed(Value::Symbol(s)) => Ok(s.clone()),
            _ => Err(interp.type_error("Symbol.prototype method called on incompatible receiver")),
        },
        _ => Err(interp.type_error("Symbol.prototype method called on incompatible receiver")),
    }
}
