//! `Array` and `Array.prototype`
//!
//! Arrays are dense: a hole reads back as `undefined`. Methods that take a
//! callback read elements live, so a callback that mutates the array sees
//! its own writes.

use std::cmp::Ordering;
use std::sync::Arc;

use super::function::array_like_to_vec;
use super::{async_ctor, define_async, integer_arg, proto_for};
use crate::backends::interpreter::property::{describe_value, index_of_number};
use crate::backends::interpreter::{BoxFuture, Interpreter, JsResult};
use crate::runtime::value::number::{relative_index, to_integer};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value};

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().array_proto.clone();
    let ctor = interp.define_constructor("Array", 1, async_ctor(array_ctor), &proto);

    interp.define_method(&ctor, "isArray", 1, |_, args: CallArgs| {
        Ok(Value::Bool(matches!(args.arg(0), Value::Object(o) if o.is_array())))
    });
    interp.define_method(&ctor, "of", 0, |interp, args: CallArgs| Ok(Value::Object(interp.new_array(args.args))));
    define_async(interp, &ctor, "from", 1, array_from);

    interp.define_method(&proto, "push", 1, push);
    interp.define_method(&proto, "pop", 0, pop);
    interp.define_method(&proto, "shift", 0, shift);
    interp.define_method(&proto, "unshift", 1, unshift);
    interp.define_method(&proto, "splice", 2, splice);
    interp.define_method(&proto, "reverse", 0, reverse);
    interp.define_method(&proto, "fill", 1, fill);
    interp.define_method(&proto, "copyWithin", 2, copy_within);
    define_async(interp, &proto, "slice", 2, slice);
    define_async(interp, &proto, "concat", 1, concat);
    define_async(interp, &proto, "indexOf", 1, index_of);
    define_async(interp, &proto, "lastIndexOf", 1, last_index_of);
    define_async(interp, &proto, "includes", 1, includes);
    define_async(interp, &proto, "at", 1, at);
    define_async(interp, &proto, "join", 1, join);
    define_async(interp, &proto, "toString", 0, |interp: Interpreter, args: CallArgs| async move {
        let join = interp.get_named(&args.this, "join").await?;
        if interp.is_callable(&join) {
            return interp.call(&join, args.this.clone(), Vec::new()).await;
        }
        Ok(Value::from(super::object::to_string_tag(&interp, &args.this)))
    });
    define_async(interp, &proto, "toLocaleString", 0, join);
    define_async(interp, &proto, "flat", 0, flat);
    define_async(interp, &proto, "flatMap", 1, flat_map);
    define_async(interp, &proto, "forEach", 1, for_each);
    define_async(interp, &proto, "map", 1, map);
    define_async(interp, &proto, "filter", 1, filter);
    define_async(interp, &proto, "some", 1, some);
    define_async(interp, &proto, "every", 1, every);
    define_async(interp, &proto, "find", 1, |interp, args| find(interp, args, Find::Value, false));
    define_async(interp, &proto, "findIndex", 1, |interp, args| find(interp, args, Find::Index, false));
    define_async(interp, &proto, "findLast", 1, |interp, args| find(interp, args, Find::Value, true));
    define_async(interp, &proto, "findLastIndex", 1, |interp, args| find(interp, args, Find::Index, true));
    define_async(interp, &proto, "reduce", 1, |interp, args| reduce(interp, args, false));
    define_async(interp, &proto, "reduceRight", 1, |interp, args| reduce(interp, args, true));
    define_async(interp, &proto, "sort", 1, sort);
    define_async(interp, &proto, "toSorted", 1, to_sorted);
    define_async(interp, &proto, "toReversed", 0, |interp: Interpreter, args: CallArgs| async move {
        let mut items = elements(&interp, &args.this).await?;
        items.reverse();
        Ok(Value::Object(interp.new_array(items)))
    });
    define_async(interp, &proto, "toSpliced", 2, to_spliced);
    define_async(interp, &proto, "with", 2, with);

    interp.define_method(&proto, "keys", 0, |interp, args: CallArgs| {
        array_iterator(interp, &args.this, IterKind::Keys)
    });
    interp.define_method(&proto, "entries", 0, |interp, args: CallArgs| {
        array_iterator(interp, &args.this, IterKind::Entries)
    });
    let values = interp.native_fn("values", 0, |interp, args: CallArgs| {
        array_iterator(interp, &args.this, IterKind::Values)
    });
    proto.lock().define("values", Property::hidden(Value::Object(values.clone())));
    interp.define_symbol_method(&proto, interp.intrinsics().symbols.iterator.clone(), values);
}

async fn array_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = match args.args.as_slice() {
        [Value::Number(n)] => match index_of_number(*n) {
            Some(len) => vec![Value::Undefined; len],
            None => return Err(interp.range_error("Invalid array length")),
        },
        _ => args.args.clone(),
    };
    let proto = proto_for(&interp, args.new_target.as_ref(), &interp.intrinsics().array_proto);
    Ok(Value::Object(Obj::new(Object::new(Some(proto), ObjectKind::Array(items)))))
}

async fn array_from(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let source = args.arg(0);
    if source.is_nullish() {
        return Err(interp.type_error(format!("{} is not iterable", source.type_of())));
    }
    let iter_key = PropertyKey::Symbol(interp.intrinsics().symbols.iterator.clone());
    let method = match &source {
        Value::String(_) => Value::Bool(true),
        v => interp.get(v, &iter_key).await?,
    };
    let items = if method.is_nullish() {
        array_like_to_vec(&interp, &Value::Object(interp.to_object(&source)?)).await?
    } else {
        interp.iterate_to_vec(&source).await?
    };
    let map_fn = args.arg(1);
    if map_fn.is_undefined() {
        return Ok(Value::Object(interp.new_array(items)));
    }
    if !interp.is_callable(&map_fn) {
        return Err(interp.type_error("Array.from: when provided, the second argument must be a function"));
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(interp.call(&map_fn, args.arg(2), vec![item, Value::Number(i as f64)]).await?);
    }
    Ok(Value::Object(interp.new_array(out)))
}

/// Snapshot of the elements of `this`: arrays, strings and array-likes
pub(crate) async fn elements(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Vec<Value>> {
    match this {
        Value::Undefined | Value::Null => Err(interp.type_error("Array.prototype method called on null or undefined")),
        Value::String(s) => Ok(s
            .encode_utf16()
            .map(|u| Value::from(String::from_utf16_lossy(&[u])))
            .collect()),
        Value::Object(obj) => {
            let fast = match &obj.lock().kind {
                ObjectKind::Array(items) => Some(items.clone()),
                ObjectKind::TypedArray(ta) => Some(ta.elems.clone()),
                _ => None,
            };
            match fast {
                Some(items) => Ok(items),
                None => array_like_to_vec(interp, this).await,
            }
        }
        _ => Ok(Vec::new()),
    }
}

/// The array behind `this`, for methods that mutate it in place
fn this_array(
    interp: &Interpreter,
    this: &Value,
    method: &str,
) -> JsResult<Obj> {
    match this {
        Value::Object(obj) if obj.is_array() => {
            if obj.lock().frozen {
                return Err(interp.type_error(format!(
                    "Cannot add property 0, object is not extensible (Array.prototype.{})",
                    method
                )));
            }
            Ok(obj.clone())
        }
        _ => Err(interp.type_error(format!("Array.prototype.{} called on a non-array receiver", method))),
    }
}

/// Run `f` on the elements of an array
fn with_items<T>(
    obj: &Obj,
    f: impl FnOnce(&mut Vec<Value>) -> T,
) -> Option<T> {
    match &mut obj.lock().kind {
        ObjectKind::Array(items) => Some(f(items)),
        _ => None,
    }
}

/// Element `i` read at the time of the call, `None` past the end
async fn element_at(
    interp: &Interpreter,
    this: &Value,
    i: usize,
) -> JsResult<Option<Value>> {
    let fast = match this {
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Array(items) => Some(items.get(i).cloned()),
            ObjectKind::TypedArray(ta) => Some(ta.elems.get(i).cloned()),
            _ => None,
        },
        _ => None,
    };
    match fast {
        Some(item) => Ok(item),
        None => Ok(Some(interp.get(this, &PropertyKey::from(i)).await?)),
    }
}

async fn current_len(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<usize> {
    let fast = match this {
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Array(items) => Some(items.len()),
            ObjectKind::TypedArray(ta) => Some(ta.elems.len()),
            _ => None,
        },
        _ => None,
    };
    if let Some(len) = fast {
        return Ok(len);
    }
    let len = interp.get_named(this, "length").await?;
    Ok(interp.length_of(&Value::Number(interp.to_number(&len).await?)))
}

fn callback_arg(
    interp: &Interpreter,
    args: &CallArgs,
) -> JsResult<Value> {
    let callback = args.arg(0);
    if !interp.is_callable(&callback) {
        return Err(interp.type_error(format!("{} is not a function", describe_value(&callback))));
    }
    Ok(callback)
}

fn push(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "push")?;
    let len = with_items(&obj, |items| {
        items.extend(args.args);
        items.len()
    });
    Ok(Value::Number(len.unwrap_or(0) as f64))
}

fn pop(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "pop")?;
    Ok(with_items(&obj, |items| items.pop()).flatten().unwrap_or_default())
}

fn shift(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "shift")?;
    let first = with_items(&obj, |items| (!items.is_empty()).then(|| items.remove(0)));
    Ok(first.flatten().unwrap_or_default())
}

fn unshift(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "unshift")?;
    let len = with_items(&obj, |items| {
        items.splice(0..0, args.args);
        items.len()
    });
    Ok(Value::Number(len.unwrap_or(0) as f64))
}

/// Start and delete count of a `splice` call
fn splice_range(
    interp: &Interpreter,
    args: &CallArgs,
    len: usize,
) -> JsResult<(usize, usize)> {
    let start = relative_index(integer_arg(interp, args, 0, 0.0)?, len);
    let count = match args.args.len() {
        0 => 0,
        1 => len - start,
        _ => integer_arg(interp, args, 1, 0.0)?.clamp(0.0, (len - start) as f64) as usize,
    };
    Ok((start, count))
}

fn splice(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "splice")?;
    let len = obj.array_elements().map(|v| v.len()).unwrap_or(0);
    let (start, count) = splice_range(interp, &args, len)?;
    let inserted: Vec<Value> = args.args.iter().skip(2).cloned().collect();
    let removed = with_items(&obj, |items| items.splice(start..start + count, inserted).collect());
    Ok(Value::Object(interp.new_array(removed.unwrap_or_default())))
}

async fn to_spliced(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut items = elements(&interp, &args.this).await?;
    let (start, count) = splice_range(&interp, &args, items.len())?;
    items.splice(start..start + count, args.args.iter().skip(2).cloned());
    Ok(Value::Object(interp.new_array(items)))
}

fn reverse(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "reverse")?;
    with_items(&obj, |items| items.reverse());
    Ok(args.this)
}

fn fill(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "fill")?;
    let len = obj.array_elements().map(|v| v.len()).unwrap_or(0);
    let start = relative_index(integer_arg(interp, &args, 1, 0.0)?, len);
    let end = relative_index(integer_arg(interp, &args, 2, len as f64)?, len);
    let value = args.arg(0);
    with_items(&obj, |items| {
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    });
    Ok(args.this)
}

fn copy_within(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(interp, &args.this, "copyWithin")?;
    let len = obj.array_elements().map(|v| v.len()).unwrap_or(0);
    let target = relative_index(integer_arg(interp, &args, 0, 0.0)?, len);
    let start = relative_index(integer_arg(interp, &args, 1, 0.0)?, len);
    let end = relative_index(integer_arg(interp, &args, 2, len as f64)?, len);
    with_items(&obj, |items| {
        let chunk: Vec<Value> = items[start..end.max(start)].to_vec();
        for (offset, v) in chunk.into_iter().enumerate() {
            if let Some(slot) = items.get_mut(target + offset) {
                *slot = v;
            }
        }
    });
    Ok(args.this)
}

async fn slice(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let len = items.len();
    let start = relative_index(integer_arg(&interp, &args, 0, 0.0)?, len);
    let end = relative_index(integer_arg(&interp, &args, 1, len as f64)?, len);
    let out = if start < end { items[start..end].to_vec() } else { Vec::new() };
    Ok(Value::Object(interp.new_array(out)))
}

async fn concat(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut out = elements(&interp, &args.this).await?;
    for arg in &args.args {
        match arg {
            Value::Object(obj) if obj.is_array() => out.extend(obj.array_elements().unwrap_or_default()),
            v => out.push(v.clone()),
        }
    }
    Ok(Value::Object(interp.new_array(out)))
}

async fn index_of(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let start = relative_index(integer_arg(&interp, &args, 1, 0.0)?, items.len());
    let target = args.arg(0);
    let found = items.iter().skip(start).position(|v| v.strict_equals(&target));
    Ok(Value::Number(found.map(|i| (i + start) as f64).unwrap_or(-1.0)))
}

async fn last_index_of(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    if items.is_empty() {
        return Ok(Value::Number(-1.0));
    }
    let len = items.len() as f64;
    let from = integer_arg(&interp, &args, 1, len - 1.0)?;
    let from = if from < 0.0 { len + from } else { from.min(len - 1.0) };
    if from < 0.0 {
        return Ok(Value::Number(-1.0));
    }
    let target = args.arg(0);
    let found = items[..=from as usize].iter().rposition(|v| v.strict_equals(&target));
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

async fn includes(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let start = relative_index(integer_arg(&interp, &args, 1, 0.0)?, items.len());
    let target = args.arg(0);
    Ok(Value::Bool(items.iter().skip(start).any(|v| v.same_value_zero(&target))))
}

async fn at(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let rel = integer_arg(&interp, &args, 0, 0.0)?;
    let index = if rel < 0.0 { items.len() as f64 + rel } else { rel };
    if index < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(index as usize).cloned().unwrap_or_default())
}

async fn join(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let separator = match args.arg(0) {
        Value::Undefined => Arc::from(","),
        v => interp.to_string(&v).await?,
    };
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator);
        }
        if let Value::Object(obj) = item {
            // a cyclic reference joins as the empty string
            if matches!(&args.this, Value::Object(this) if this.ptr_eq(obj)) {
                continue;
            }
        }
        if !item.is_nullish() {
            out.push_str(&interp.to_string(item).await?);
        }
    }
    Ok(Value::from(out))
}

fn flatten_into<'a>(
    out: &'a mut Vec<Value>,
    items: Vec<Value>,
    depth: f64,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        for item in items {
            let nested = match &item {
                Value::Object(obj) if depth >= 1.0 => obj.array_elements(),
                _ => None,
            };
            match nested {
                Some(inner) => flatten_into(out, inner, depth - 1.0).await,
                None => out.push(item),
            }
        }
    })
}

async fn flat(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let depth = integer_arg(&interp, &args, 0, 1.0)?;
    let mut out = Vec::new();
    flatten_into(&mut out, items, depth).await;
    Ok(Value::Object(interp.new_array(out)))
}

async fn flat_map(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let callback = callback_arg(&interp, &args)?;
    let len = current_len(&interp, &args.this).await?;
    let mut out = Vec::new();
    for i in 0..len {
        let Some(item) = element_at(&interp, &args.this, i).await? else {
            break;
        };
        let mapped = interp
            .call(&callback, args.arg(1), vec![item, Value::Number(i as f64), args.this.clone()])
            .await?;
        match &mapped {
            Value::Object(obj) if obj.is_array() => out.extend(obj.array_elements().unwrap_or_default()),
            _ => out.push(mapped),
        }
    }
    Ok(Value::Object(interp.new_array(out)))
}

/// Call `callback(element, index, array)` for each index present when the loop starts
async fn each<F>(
    interp: &Interpreter,
    args: &CallArgs,
    mut f: F,
) -> JsResult<()>
where
    F: FnMut(usize, Value, Value) -> bool,
{
    let callback = callback_arg(interp, args)?;
    let len = current_len(interp, &args.this).await?;
    for i in 0..len {
        let Some(item) = element_at(interp, &args.this, i).await? else {
            break;
        };
        let result = interp
            .call(&callback, args.arg(1), vec![item.clone(), Value::Number(i as f64), args.this.clone()])
            .await?;
        if !f(i, item, result) {
            break;
        }
    }
    Ok(())
}

async fn for_each(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    each(&interp, &args, |_, _, _| true).await?;
    Ok(Value::Undefined)
}

async fn map(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut out = Vec::new();
    each(&interp, &args, |_, _, mapped| {
        out.push(mapped);
        true
    })
    .await?;
    Ok(Value::Object(interp.new_array(out)))
}

async fn filter(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut out = Vec::new();
    each(&interp, &args, |_, item, keep| {
        if keep.to_boolean() {
            out.push(item);
        }
        true
    })
    .await?;
    Ok(Value::Object(interp.new_array(out)))
}

async fn some(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut found = false;
    each(&interp, &args, |_, _, hit| {
        found = hit.to_boolean();
        !found
    })
    .await?;
    Ok(Value::Bool(found))
}

async fn every(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut all = true;
    each(&interp, &args, |_, _, ok| {
        all = ok.to_boolean();
        all
    })
    .await?;
    Ok(Value::Bool(all))
}

#[derive(Clone, Copy)]
enum Find {
    Value,
    Index,
}

async fn find(
    interp: Interpreter,
    args: CallArgs,
    want: Find,
    from_end: bool,
) -> JsResult<Value> {
    let callback = callback_arg(&interp, &args)?;
    let len = current_len(&interp, &args.this).await?;
    let indices: Box<dyn Iterator<Item = usize> + Send> = if from_end {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };
    for i in indices {
        let item = element_at(&interp, &args.this, i).await?.unwrap_or_default();
        let hit = interp
            .call(&callback, args.arg(1), vec![item.clone(), Value::Number(i as f64), args.this.clone()])
            .await?;
        if hit.to_boolean() {
            return Ok(match want {
                Find::Value => item,
                Find::Index => Value::Number(i as f64),
            });
        }
    }
    Ok(match want {
        Find::Value => Value::Undefined,
        Find::Index => Value::Number(-1.0),
    })
}

async fn reduce(
    interp: Interpreter,
    args: CallArgs,
    from_end: bool,
) -> JsResult<Value> {
    let callback = callback_arg(&interp, &args)?;
    let items = elements(&interp, &args.this).await?;
    let mut order: Vec<usize> = (0..items.len()).collect();
    if from_end {
        order.reverse();
    }
    let mut order = order.into_iter();
    let mut acc = if args.args.len() >= 2 {
        args.arg(1)
    } else {
        match order.next() {
            Some(i) => items[i].clone(),
            None => return Err(interp.type_error("Reduce of empty array with no initial value")),
        }
    };
    for i in order {
        let item = element_at(&interp, &args.this, i).await?.unwrap_or_default();
        acc = interp
            .call(&callback, Value::Undefined, vec![acc, item, Value::Number(i as f64), args.this.clone()])
            .await?;
    }
    Ok(acc)
}

/// UTF-16 code unit order of two strings
pub(crate) fn compare_utf16(
    a: &str,
    b: &str,
) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// `SortCompare` with an optional user comparator
async fn compare(
    interp: &Interpreter,
    comparator: &Value,
    a: &Value,
    b: &Value,
) -> JsResult<Ordering> {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Greater),
        (false, true) => return Ok(Ordering::Less),
        _ => {}
    }
    if comparator.is_undefined() {
        let (x, y) = (interp.to_string(a).await?, interp.to_string(b).await?);
        return Ok(compare_utf16(&x, &y));
    }
    let result = interp.call(comparator, Value::Undefined, vec![a.clone(), b.clone()]).await?;
    let n = interp.to_number(&result).await?;
    Ok(if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

/// Stable merge sort driven by an async comparison
pub(crate) async fn sort_values(
    interp: &Interpreter,
    items: Vec<Value>,
    comparator: &Value,
) -> JsResult<Vec<Value>> {
    if !comparator.is_undefined() && !interp.is_callable(comparator) {
        return Err(interp.type_error("The comparison function must be either a function or undefined"));
    }
    let mut runs: Vec<Vec<Value>> = items.into_iter().map(|v| vec![v]).collect();
    while runs.len() > 1 {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        let mut pending = runs.into_iter();
        while let Some(left) = pending.next() {
            let Some(right) = pending.next() else {
                merged.push(left);
                break;
            };
            let mut out = Vec::with_capacity(left.len() + right.len());
            let (mut l, mut r) = (left.into_iter().peekable(), right.into_iter().peekable());
            loop {
                let take_right = match (l.peek(), r.peek()) {
                    (Some(a), Some(b)) => compare(interp, comparator, a, b).await? == Ordering::Greater,
                    (Some(_), None) => false,
                    (None, Some(_)) => true,
                    (None, None) => break,
                };
                let next = if take_right { r.next() } else { l.next() };
                out.extend(next);
            }
            merged.push(out);
        }
        runs = merged;
    }
    Ok(runs.pop().unwrap_or_default())
}

async fn sort(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = this_array(&interp, &args.this, "sort")?;
    let items = obj.array_elements().unwrap_or_default();
    let sorted = sort_values(&interp, items, &args.arg(0)).await?;
    with_items(&obj, |items| *items = sorted);
    Ok(args.this)
}

async fn to_sorted(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let items = elements(&interp, &args.this).await?;
    let sorted = sort_values(&interp, items, &args.arg(0)).await?;
    Ok(Value::Object(interp.new_array(sorted)))
}

async fn with(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let mut items = elements(&interp, &args.this).await?;
    let rel = integer_arg(&interp, &args, 0, 0.0)?;
    let index = if rel < 0.0 { items.len() as f64 + rel } else { rel };
    if index < 0.0 || index >= items.len() as f64 {
        return Err(interp.range_error("Invalid index"));
    }
    items[to_integer(index) as usize] = args.arg(1);
    Ok(Value::Object(interp.new_array(items)))
}

#[derive(Clone, Copy)]
enum IterKind {
    Keys,
    Values,
    Entries,
}

/// Live iterator over an array, typed array or array-like
fn array_iterator(
    interp: &Interpreter,
    this: &Value,
    kind: IterKind,
) -> JsResult<Value> {
    let obj = interp.to_object(this)?;
    let mut index = 0usize;
    let iter = interp.native_iterator("Array Iterator", move |interp| {
        let item = {
            let object = obj.lock();
            match &object.kind {
                ObjectKind::Array(items) => items.get(index).cloned(),
                ObjectKind::TypedArray(ta) => ta.elems.get(index).cloned(),
                _ => {
                    let len = match object.get_own(&PropertyKey::from("length")).map(|p| p.slot) {
                        Some(Slot::Data(v)) => interp.length_of(&v),
                        _ => 0,
                    };
                    (index < len).then(|| {
                        match object.get_own(&PropertyKey::from(index)).map(|p| p.slot) {
                            Some(Slot::Data(v)) => v,
                            _ => Value::Undefined,
                        }
                    })
                }
            }
        };
        let Some(value) = item else {
            return Ok(None);
        };
        let i = index;
        index += 1;
        Ok(Some(match kind {
            IterKind::Keys => Value::Number(i as f64),
            IterKind::Values => value,
            IterKind::Entries => Value::Object(interp.new_array(vec![Value::Number(i as f64), value])),
        }))
    });
    Ok(Value::Object(iter))
}
