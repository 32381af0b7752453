//! Typed arrays
//!
//! Each typed array owns its elements; there is no shared `ArrayBuffer`, so
//! `subarray` copies. Read-only iteration methods are shared with
//! `Array.prototype`, which already understands typed array storage.

use std::cmp::Ordering;

use super::array::{elements, sort_values};
use super::{async_ctor, define_async, integer_arg, proto_for};
use crate::backends::interpreter::property::{coerce_typed_element, index_of_number};
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::number::relative_index;
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, Property, PropertyKey, TypedArray, TypedKind, Value};

/// `Array.prototype` methods that work unchanged on typed arrays
const SHARED: [&str; 19] = [
    "at",
    "entries",
    "every",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "forEach",
    "includes",
    "indexOf",
    "join",
    "keys",
    "lastIndexOf",
    "reduce",
    "reduceRight",
    "some",
    "toLocaleString",
    "toString",
    "values",
];

pub(crate) fn install(interp: &Interpreter) {
    let i = interp.intrinsics();
    let Some(base) = i.typed_array_proto(TypedKind::Int8).proto() else {
        return;
    };
    install_base(interp, &base);

    for kind in TypedKind::ALL {
        let proto = i.typed_array_proto(kind);
        let ctor = interp.define_constructor(
            kind.name(),
            3,
            async_ctor(move |interp, args| construct(interp, args, kind)),
            &proto,
        );
        let size = Property::constant(Value::Number(kind.bytes_per_element() as f64));
        ctor.lock().define("BYTES_PER_ELEMENT", size.clone());
        proto.lock().define("BYTES_PER_ELEMENT", size);

        interp.define_method(&ctor, "of", 0, move |interp, args: CallArgs| {
            Ok(Value::Object(new_typed(interp, kind, args.args)))
        });
        define_async(interp, &ctor, "from", 1, move |interp: Interpreter, args: CallArgs| async move {
            let mut items = interp.iterate_to_vec(&args.arg(0)).await?;
            let map_fn = args.arg(1);
            if interp.is_callable(&map_fn) {
                for (i, item) in items.iter_mut().enumerate() {
                    let mapped = interp
                        .call(&map_fn, args.arg(2), vec![item.clone(), Value::Number(i as f64)])
                        .await?;
                    *item = mapped;
                }
            }
            let items = to_numeric_all(&interp, items).await?;
            Ok(Value::Object(new_typed(&interp, kind, items)))
        });
    }
}

fn install_base(
    interp: &Interpreter,
    base: &Obj,
) {
    let array_proto = interp.intrinsics().array_proto.clone();
    for name in SHARED {
        let method = array_proto.lock().get_own(&PropertyKey::from(name));
        if let Some(method) = method {
            base.lock().define(name, method);
        }
    }
    let iterator = PropertyKey::Symbol(interp.intrinsics().symbols.iterator.clone());
    let values = base.lock().get_own(&PropertyKey::from("values"));
    if let Some(values) = values {
        base.lock().define(iterator, values);
    }

    interp.define_getter(base, "length", |interp, args: CallArgs| {
        let (obj, _) = this_typed(interp, &args.this)?;
        Ok(Value::Number(len_of(&obj) as f64))
    });
    interp.define_getter(base, "byteLength", |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        Ok(Value::Number((len_of(&obj) * kind.bytes_per_element()) as f64))
    });
    interp.define_getter(base, "byteOffset", |interp, args: CallArgs| {
        this_typed(interp, &args.this)?;
        Ok(Value::Number(0.0))
    });
    let tag = interp.native_fn("get [Symbol.toStringTag]", 0, |_, args: CallArgs| {
        Ok(match &args.this {
            Value::Object(obj) => match &obj.lock().kind {
                ObjectKind::TypedArray(ta) => Value::str(ta.kind.name()),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        })
    });
    base.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::accessor(Some(tag), None, false),
    );

    interp.define_method(base, "fill", 1, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let len = len_of(&obj);
        let value = coerce_typed_element(kind, &args.arg(0));
        let start = relative_index(integer_arg(interp, &args, 1, 0.0)?, len);
        let end = relative_index(integer_arg(interp, &args, 2, len as f64)?, len);
        with_elems(&obj, |elems| {
            for slot in elems.iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
        });
        Ok(args.this)
    });
    interp.define_method(base, "reverse", 0, |interp, args: CallArgs| {
        let (obj, _) = this_typed(interp, &args.this)?;
        with_elems(&obj, |elems| elems.reverse());
        Ok(args.this)
    });
    interp.define_method(base, "set", 1, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let offset = integer_arg(interp, &args, 1, 0.0)?;
        if offset < 0.0 {
            return Err(interp.range_error("offset is out of bounds"));
        }
        let source = match args.arg(0) {
            Value::Object(src) => match &src.lock().kind {
                ObjectKind::Array(items) => items.clone(),
                ObjectKind::TypedArray(ta) => ta.elems.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let offset = offset as usize;
        if offset + source.len() > len_of(&obj) {
            return Err(interp.range_error("offset is out of bounds"));
        }
        with_elems(&obj, |elems| {
            for (i, v) in source.iter().enumerate() {
                elems[offset + i] = coerce_typed_element(kind, v);
            }
        });
        Ok(Value::Undefined)
    });
    interp.define_method(base, "copyWithin", 2, |interp, args: CallArgs| {
        let (obj, _) = this_typed(interp, &args.this)?;
        let len = len_of(&obj);
        let target = relative_index(integer_arg(interp, &args, 0, 0.0)?, len);
        let start = relative_index(integer_arg(interp, &args, 1, 0.0)?, len);
        let end = relative_index(integer_arg(interp, &args, 2, len as f64)?, len);
        with_elems(&obj, |elems| {
            let count = end.saturating_sub(start).min(len - target);
            let chunk: Vec<Value> = elems[start..start + count].to_vec();
            elems[target..target + count].clone_from_slice(&chunk);
        });
        Ok(args.this)
    });
    interp.define_method(base, "subarray", 2, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let elems = snapshot(&obj);
        let len = elems.len();
        let start = relative_index(integer_arg(interp, &args, 0, 0.0)?, len);
        let end = relative_index(integer_arg(interp, &args, 1, len as f64)?, len).max(start);
        Ok(Value::Object(new_typed(interp, kind, elems[start..end].to_vec())))
    });
    interp.define_method(base, "slice", 2, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let elems = snapshot(&obj);
        let len = elems.len();
        let start = relative_index(integer_arg(interp, &args, 0, 0.0)?, len);
        let end = relative_index(integer_arg(interp, &args, 1, len as f64)?, len).max(start);
        Ok(Value::Object(new_typed(interp, kind, elems[start..end].to_vec())))
    });
    interp.define_method(base, "toReversed", 0, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let mut elems = snapshot(&obj);
        elems.reverse();
        Ok(Value::Object(new_typed(interp, kind, elems)))
    });
    interp.define_method(base, "with", 2, |interp, args: CallArgs| {
        let (obj, kind) = this_typed(interp, &args.this)?;
        let mut elems = snapshot(&obj);
        let rel = integer_arg(interp, &args, 0, 0.0)?;
        let index = if rel < 0.0 { elems.len() as f64 + rel } else { rel };
        if index < 0.0 || index >= elems.len() as f64 {
            return Err(interp.range_error("Invalid typed array index"));
        }
        elems[index as usize] = args.arg(1);
        Ok(Value::Object(new_typed(interp, kind, elems)))
    });
    define_async(interp, base, "map", 1, |interp: Interpreter, args: CallArgs| async move {
        let (obj, kind) = this_typed(&interp, &args.this)?;
        let callback = args.arg(0);
        let mut out = Vec::new();
        for (i, item) in snapshot(&obj).into_iter().enumerate() {
            let mapped = interp
                .call(&callback, args.arg(1), vec![item, Value::Number(i as f64), args.this.clone()])
                .await?;
            out.push(mapped);
        }
        let out = to_numeric_all(&interp, out).await?;
        Ok(Value::Object(new_typed(&interp, kind, out)))
    });
    define_async(interp, base, "filter", 1, |interp: Interpreter, args: CallArgs| async move {
        let (obj, kind) = this_typed(&interp, &args.this)?;
        let callback = args.arg(0);
        let mut out = Vec::new();
        for (i, item) in snapshot(&obj).into_iter().enumerate() {
            let keep = interp
                .call(&callback, args.arg(1), vec![item.clone(), Value::Number(i as f64), args.this.clone()])
                .await?;
            if keep.to_boolean() {
                out.push(item);
            }
        }
        Ok(Value::Object(new_typed(&interp, kind, out)))
    });
    define_async(interp, base, "sort", 1, |interp: Interpreter, args: CallArgs| async move {
        let (obj, _) = this_typed(&interp, &args.this)?;
        let sorted = sorted(&interp, snapshot(&obj), &args.arg(0)).await?;
        with_elems(&obj, |elems| *elems = sorted);
        Ok(args.this)
    });
    define_async(interp, base, "toSorted", 1, |interp: Interpreter, args: CallArgs| async move {
        let (obj, kind) = this_typed(&interp, &args.this)?;
        let sorted = sorted(&interp, snapshot(&obj), &args.arg(0)).await?;
        Ok(Value::Object(new_typed(&interp, kind, sorted)))
    });
}

async fn construct(
    interp: Interpreter,
    args: CallArgs,
    kind: TypedKind,
) -> JsResult<Value> {
    let Some(target) = &args.new_target else {
        return Err(interp.type_error(format!("Constructor {} requires 'new'", kind.name())));
    };
    let elems = match args.arg(0) {
        Value::Undefined => Vec::new(),
        source @ Value::Object(_) => {
            let iter_key = PropertyKey::Symbol(interp.intrinsics().symbols.iterator.clone());
            let items = if interp.get(&source, &iter_key).await?.is_nullish() {
                elements(&interp, &source).await?
            } else {
                interp.iterate_to_vec(&source).await?
            };
            to_numeric_all(&interp, items).await?
        }
        v => {
            let n = interp.to_number(&v).await?;
            let len = index_of_number(n).ok_or_else(|| interp.range_error("Invalid typed array length"))?;
            vec![Value::Undefined; len]
        }
    };
    let proto = proto_for(&interp, Some(target), &interp.intrinsics().typed_array_proto(kind));
    Ok(Value::Object(typed_with_proto(proto, kind, elems)))
}

/// Convert objects to primitives first so storage never runs user code
async fn to_numeric_all(
    interp: &Interpreter,
    items: Vec<Value>,
) -> JsResult<Vec<Value>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(if item.is_object() { interp.to_numeric(&item).await? } else { item });
    }
    Ok(out)
}

fn typed_with_proto(
    proto: Obj,
    kind: TypedKind,
    items: Vec<Value>,
) -> Obj {
    let elems = items.iter().map(|v| coerce_typed_element(kind, v)).collect();
    Obj::new(Object::new(Some(proto), ObjectKind::TypedArray(TypedArray { kind, elems })))
}

/// Typed array of `kind` holding `items` converted for storage
pub(crate) fn new_typed(
    interp: &Interpreter,
    kind: TypedKind,
    items: Vec<Value>,
) -> Obj {
    typed_with_proto(interp.intrinsics().typed_array_proto(kind), kind, items)
}

fn this_typed(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<(Obj, TypedKind)> {
    if let Value::Object(obj) = this {
        if let ObjectKind::TypedArray(ta) = &obj.lock().kind {
            return Ok((obj.clone(), ta.kind));
        }
    }
    Err(interp.type_error("this is not a typed array."))
}

fn len_of(obj: &Obj) -> usize {
    match &obj.lock().kind {
        ObjectKind::TypedArray(ta) => ta.elems.len(),
        _ => 0,
    }
}

fn snapshot(obj: &Obj) -> Vec<Value> {
    match &obj.lock().kind {
        ObjectKind::TypedArray(ta) => ta.elems.clone(),
        _ => Vec::new(),
    }
}

fn with_elems(
    obj: &Obj,
    f: impl FnOnce(&mut Vec<Value>),
) {
    if let ObjectKind::TypedArray(ta) = &mut obj.lock().kind {
        f(&mut ta.elems);
    }
}

/// Numeric order by default: `-0` before `+0`, `NaN` last
async fn sorted(
    interp: &Interpreter,
    mut items: Vec<Value>,
    comparator: &Value,
) -> JsResult<Vec<Value>> {
    if !comparator.is_undefined() {
        return sort_values(interp, items, comparator).await;
    }
    items.sort_by(numeric_order);
    Ok(items)
}

fn numeric_order(
    a: &Value,
    b: &Value,
) -> Ordering {
    match (a, b) {
        (Value::BigInt(x), Value::BigInt(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => x.total_cmp(y),
        },
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_order() {
        let mut items = vec![
            Value::Number(f64::NAN),
            Value::Number(10.0),
            Value::Number(0.0),
            Value::Number(-0.0),
            Value::Number(2.0),
        ];
        items.sort_by(numeric_order);
        let out: Vec<f64> = items.iter().filter_map(Value::as_number).collect();
        assert_eq!(out[..4], [-0.0, 0.0, 2.0, 10.0]);
        assert!(out[0].is_sign_negative());
        assert!(out[4].is_nan());
    }
}
