//! `Map`, `Set`, `WeakMap` and `WeakSet`
//!
//! Entries are kept in insertion order in an `IndexMap` keyed by
//! [`HashKey`]. Weak collections hold their keys strongly; nothing outlives
//! a single evaluation.

use indexmap::IndexMap;

use super::{async_ctor, define_async, proto_for};
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::{CallArgs, HashKey, Obj, Object, ObjectKind, Property, PropertyKey, Value};

type MapEntries = IndexMap<HashKey, (Value, Value)>;
type SetEntries = IndexMap<HashKey, Value>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Strong,
    Weak,
}

pub(crate) fn install(interp: &Interpreter) {
    install_map(interp);
    install_set(interp);
    install_weak_map(interp);
    install_weak_set(interp);
}

fn install_map(interp: &Interpreter) {
    let proto = interp.intrinsics().map_proto.clone();
    let ctor = interp.define_constructor(
        "Map",
        0,
        async_ctor(|interp, args| construct_map(interp, args, Flavor::Strong)),
        &proto,
    );
    define_async(interp, &ctor, "groupBy", 2, |interp: Interpreter, args: CallArgs| async move {
        let items = interp.iterate_to_vec(&args.arg(0)).await?;
        let callback = args.arg(1);
        let mut groups = MapEntries::new();
        for (i, item) in items.into_iter().enumerate() {
            let key = interp
                .call(&callback, Value::Undefined, vec![item.clone(), Value::Number(i as f64)])
                .await?;
            let key = normalize_zero(key);
            let entry = groups
                .entry(HashKey::of(&key))
                .or_insert_with(|| (key.clone(), Value::Object(interp.new_array(Vec::new()))));
            if let Value::Object(list) = &entry.1 {
                if let ObjectKind::Array(items) = &mut list.lock().kind {
                    items.push(item);
                }
            }
        }
        let map = Obj::new(Object::new(Some(interp.intrinsics().map_proto.clone()), ObjectKind::Map(groups)));
        Ok(Value::Object(map))
    });

    interp.define_method(&proto, "get", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "Map.prototype.get", Flavor::Strong, |m| {
            m.get(&HashKey::of(&args.arg(0))).map(|(_, v)| v.clone()).unwrap_or_default()
        })
    });
    interp.define_method(&proto, "set", 2, |interp, args: CallArgs| {
        let key = normalize_zero(args.arg(0));
        with_map(interp, &args.this, "Map.prototype.set", Flavor::Strong, |m| {
            set_entry(m, key, args.arg(1));
        })?;
        Ok(args.this)
    });
    interp.define_method(&proto, "has", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "Map.prototype.has", Flavor::Strong, |m| {
            Value::Bool(m.contains_key(&HashKey::of(&args.arg(0))))
        })
    });
    interp.define_method(&proto, "delete", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "Map.prototype.delete", Flavor::Strong, |m| {
            Value::Bool(m.shift_remove(&HashKey::of(&args.arg(0))).is_some())
        })
    });
    interp.define_method(&proto, "clear", 0, |interp, args: CallArgs| {
        with_map(interp, &args.this, "Map.prototype.clear", Flavor::Strong, |m| m.clear())?;
        Ok(Value::Undefined)
    });
    interp.define_getter(&proto, "size", |interp, args: CallArgs| {
        with_map(interp, &args.this, "get Map.prototype.size", Flavor::Strong, |m| {
            Value::Number(m.len() as f64)
        })
    });
    define_async(interp, &proto, "forEach", 1, |interp: Interpreter, args: CallArgs| async move {
        let callback = args.arg(0);
        if !interp.is_callable(&callback) {
            return Err(interp.type_error("Map.prototype.forEach: callback is not a function"));
        }
        let mut i = 0;
        loop {
            let entry = with_map(&interp, &args.this, "Map.prototype.forEach", Flavor::Strong, |m| {
                m.get_index(i).map(|(_, (k, v))| (k.clone(), v.clone()))
            })?;
            let Some((key, value)) = entry else { break };
            interp
                .call(&callback, args.arg(1), vec![value, key, args.this.clone()])
                .await?;
            i += 1;
        }
        Ok(Value::Undefined)
    });
    for (name, part) in [("keys", Part::Key), ("values", Part::Value), ("entries", Part::Entry)] {
        let func = interp.native_fn(name, 0, move |interp, args: CallArgs| {
            let map = this_collection(interp, &args.this, "Map.prototype iterator", |k| {
                matches!(k, ObjectKind::Map(_))
            })?;
            Ok(Value::Object(map_iterator(interp, map, part)))
        });
        let value = Value::Object(func.clone());
        proto.lock().define(name, Property::hidden(value));
        if part == Part::Entry {
            interp.define_symbol_method(&proto, interp.intrinsics().symbols.iterator.clone(), func);
        }
    }
    define_tag(interp, &proto, "Map");
}

fn install_set(interp: &Interpreter) {
    let proto = interp.intrinsics().set_proto.clone();
    interp.define_constructor(
        "Set",
        0,
        async_ctor(|interp, args| construct_set(interp, args, Flavor::Strong)),
        &proto,
    );

    interp.define_method(&proto, "add", 1, |interp, args: CallArgs| {
        let value = normalize_zero(args.arg(0));
        with_set(interp, &args.this, "Set.prototype.add", Flavor::Strong, |s| {
            s.entry(HashKey::of(&value)).or_insert(value.clone());
        })?;
        Ok(args.this)
    });
    interp.define_method(&proto, "has", 1, |interp, args: CallArgs| {
        with_set(interp, &args.this, "Set.prototype.has", Flavor::Strong, |s| {
            Value::Bool(s.contains_key(&HashKey::of(&args.arg(0))))
        })
    });
    interp.define_method(&proto, "delete", 1, |interp, args: CallArgs| {
        with_set(interp, &args.this, "Set.prototype.delete", Flavor::Strong, |s| {
            Value::Bool(s.shift_remove(&HashKey::of(&args.arg(0))).is_some())
        })
    });
    interp.define_method(&proto, "clear", 0, |interp, args: CallArgs| {
        with_set(interp, &args.this, "Set.prototype.clear", Flavor::Strong, |s| s.clear())?;
        Ok(Value::Undefined)
    });
    interp.define_getter(&proto, "size", |interp, args: CallArgs| {
        with_set(interp, &args.this, "get Set.prototype.size", Flavor::Strong, |s| {
            Value::Number(s.len() as f64)
        })
    });
    define_async(interp, &proto, "forEach", 1, |interp: Interpreter, args: CallArgs| async move {
        let callback = args.arg(0);
        if !interp.is_callable(&callback) {
            return Err(interp.type_error("Set.prototype.forEach: callback is not a function"));
        }
        let mut i = 0;
        loop {
            let value = with_set(&interp, &args.this, "Set.prototype.forEach", Flavor::Strong, |s| {
                s.get_index(i).map(|(_, v)| v.clone())
            })?;
            let Some(value) = value else { break };
            interp
                .call(&callback, args.arg(1), vec![value.clone(), value, args.this.clone()])
                .await?;
            i += 1;
        }
        Ok(Value::Undefined)
    });
    let values = interp.native_fn("values", 0, |interp, args: CallArgs| {
        let set = this_collection(interp, &args.this, "Set.prototype.values", |k| matches!(k, ObjectKind::Set(_)))?;
        Ok(Value::Object(set_iterator(interp, set, false)))
    });
    {
        let mut object = proto.lock();
        object.define("values", Property::hidden(Value::Object(values.clone())));
        object.define("keys", Property::hidden(Value::Object(values.clone())));
    }
    interp.define_symbol_method(&proto, interp.intrinsics().symbols.iterator.clone(), values);
    interp.define_method(&proto, "entries", 0, |interp, args: CallArgs| {
        let set = this_collection(interp, &args.this, "Set.prototype.entries", |k| matches!(k, ObjectKind::Set(_)))?;
        Ok(Value::Object(set_iterator(interp, set, true)))
    });

    for (name, op) in [
        ("union", SetOp::Union),
        ("intersection", SetOp::Intersection),
        ("difference", SetOp::Difference),
        ("symmetricDifference", SetOp::SymmetricDifference),
        ("isSubsetOf", SetOp::IsSubsetOf),
        ("isSupersetOf", SetOp::IsSupersetOf),
        ("isDisjointFrom", SetOp::IsDisjointFrom),
    ] {
        define_async(interp, &proto, name, 1, move |interp, args| set_algebra(interp, args, op));
    }
    define_tag(interp, &proto, "Set");
}

fn install_weak_map(interp: &Interpreter) {
    let proto = interp.intrinsics().weak_map_proto.clone();
    interp.define_constructor(
        "WeakMap",
        0,
        async_ctor(|interp, args| construct_map(interp, args, Flavor::Weak)),
        &proto,
    );
    interp.define_method(&proto, "get", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "WeakMap.prototype.get", Flavor::Weak, |m| {
            m.get(&HashKey::of(&args.arg(0))).map(|(_, v)| v.clone()).unwrap_or_default()
        })
    });
    interp.define_method(&proto, "set", 2, |interp, args: CallArgs| {
        let key = args.arg(0);
        check_weak_key(interp, &key, "WeakMap key")?;
        with_map(interp, &args.this, "WeakMap.prototype.set", Flavor::Weak, |m| {
            set_entry(m, key, args.arg(1));
        })?;
        Ok(args.this)
    });
    interp.define_method(&proto, "has", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "WeakMap.prototype.has", Flavor::Weak, |m| {
            Value::Bool(m.contains_key(&HashKey::of(&args.arg(0))))
        })
    });
    interp.define_method(&proto, "delete", 1, |interp, args: CallArgs| {
        with_map(interp, &args.this, "WeakMap.prototype.delete", Flavor::Weak, |m| {
            Value::Bool(m.shift_remove(&HashKey::of(&args.arg(0))).is_some())
        })
    });
    define_tag(interp, &proto, "WeakMap");
}

fn install_weak_set(interp: &Interpreter) {
    let proto = interp.intrinsics().weak_set_proto.clone();
    interp.define_constructor(
        "WeakSet",
        0,
        async_ctor(|interp, args| construct_set(interp, args, Flavor::Weak)),
        &proto,
    );
    interp.define_method(&proto, "add", 1, |interp, args: CallArgs| {
        let value = args.arg(0);
        check_weak_key(interp, &value, "WeakSet value")?;
        with_set(interp, &args.this, "WeakSet.prototype.add", Flavor::Weak, |s| {
            s.entry(HashKey::of(&value)).or_insert(value.clone());
        })?;
        Ok(args.this)
    });
    interp.define_method(&proto, "has", 1, |interp, args: CallArgs| {
        with_set(interp, &args.this, "WeakSet.prototype.has", Flavor::Weak, |s| {
            Value::Bool(s.contains_key(&HashKey::of(&args.arg(0))))
        })
    });
    interp.define_method(&proto, "delete", 1, |interp, args: CallArgs| {
        with_set(interp, &args.this, "WeakSet.prototype.delete", Flavor::Weak, |s| {
            Value::Bool(s.shift_remove(&HashKey::of(&args.arg(0))).is_some())
        })
    });
    define_tag(interp, &proto, "WeakSet");
}

fn define_tag(
    interp: &Interpreter,
    proto: &Obj,
    tag: &str,
) {
    proto.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::constant(Value::str(tag)),
    );
}

/// Map keys treat `-0` as `+0`
fn normalize_zero(value: Value) -> Value {
    match value {
        Value::Number(n) if n == 0.0 => Value::Number(0.0),
        v => v,
    }
}

fn set_entry(
    map: &mut MapEntries,
    key: Value,
    value: Value,
) {
    match map.get_mut(&HashKey::of(&key)) {
        Some(entry) => entry.1 = value,
        None => {
            map.insert(HashKey::of(&key), (key, value));
        }
    }
}

fn check_weak_key(
    interp: &Interpreter,
    key: &Value,
    what: &str,
) -> JsResult<()> {
    match key {
        Value::Object(_) | Value::Symbol(_) => Ok(()),
        _ => Err(interp.type_error(format!("Invalid value used as {}", what))),
    }
}

fn this_collection(
    interp: &Interpreter,
    this: &Value,
    method: &str,
    accepts: impl Fn(&ObjectKind) -> bool,
) -> JsResult<Obj> {
    match this {
        Value::Object(obj) if accepts(&obj.lock().kind) => Ok(obj.clone()),
        _ => Err(interp.type_error(format!("Method {} called on incompatible receiver", method))),
    }
}

fn with_map<R>(
    interp: &Interpreter,
    this: &Value,
    method: &str,
    flavor: Flavor,
    f: impl FnOnce(&mut MapEntries) -> R,
) -> JsResult<R> {
    if let Value::Object(obj) = this {
        match (&mut obj.lock().kind, flavor) {
            (ObjectKind::Map(m), Flavor::Strong) | (ObjectKind::WeakMap(m), Flavor::Weak) => return Ok(f(m)),
            _ => {}
        }
    }
    Err(interp.type_error(format!("Method {} called on incompatible receiver", method)))
}

fn with_set<R>(
    interp: &Interpreter,
    this: &Value,
    method: &str,
    flavor: Flavor,
    f: impl FnOnce(&mut SetEntries) -> R,
) -> JsResult<R> {
    if let Value::Object(obj) = this {
        match (&mut obj.lock().kind, flavor) {
            (ObjectKind::Set(s), Flavor::Strong) | (ObjectKind::WeakSet(s), Flavor::Weak) => return Ok(f(s)),
            _ => {}
        }
    }
    Err(interp.type_error(format!("Method {} called on incompatible receiver", method)))
}

async fn construct_map(
    interp: Interpreter,
    args: CallArgs,
    flavor: Flavor,
) -> JsResult<Value> {
    let (name, fallback) = match flavor {
        Flavor::Strong => ("Map", interp.intrinsics().map_proto.clone()),
        Flavor::Weak => ("WeakMap", interp.intrinsics().weak_map_proto.clone()),
    };
    let Some(target) = &args.new_target else {
        return Err(interp.type_error(format!("Constructor {} requires 'new'", name)));
    };
    let mut entries = MapEntries::new();
    let iterable = args.arg(0);
    if !iterable.is_nullish() {
        for entry in interp.iterate_to_vec(&iterable).await? {
            if !entry.is_object() {
                return Err(interp.type_error(format!(
                    "Iterator value {} is not an entry object",
                    crate::backends::interpreter::property::describe_value(&entry)
                )));
            }
            let key = interp.get(&entry, &PropertyKey::from(0usize)).await?;
            let value = interp.get(&entry, &PropertyKey::from(1usize)).await?;
            if flavor == Flavor::Weak {
                check_weak_key(&interp, &key, "WeakMap key")?;
            }
            set_entry(&mut entries, normalize_zero(key), value);
        }
    }
    let kind = match flavor {
        Flavor::Strong => ObjectKind::Map(entries),
        Flavor::Weak => ObjectKind::WeakMap(entries),
    };
    let proto = proto_for(&interp, Some(target), &fallback);
    Ok(Value::Object(Obj::new(Object::new(Some(proto), kind))))
}

async fn construct_set(
    interp: Interpreter,
    args: CallArgs,
    flavor: Flavor,
) -> JsResult<Value> {
    let (name, fallback) = match flavor {
        Flavor::Strong => ("Set", interp.intrinsics().set_proto.clone()),
        Flavor::Weak => ("WeakSet", interp.intrinsics().weak_set_proto.clone()),
    };
    let Some(target) = &args.new_target else {
        return Err(interp.type_error(format!("Constructor {} requires 'new'", name)));
    };
    let mut entries = SetEntries::new();
    let iterable = args.arg(0);
    if !iterable.is_nullish() {
        for value in interp.iterate_to_vec(&iterable).await? {
            if flavor == Flavor::Weak {
                check_weak_key(&interp, &value, "WeakSet value")?;
            }
            let value = normalize_zero(value);
            entries.entry(HashKey::of(&value)).or_insert(value);
        }
    }
    let kind = match flavor {
        Flavor::Strong => ObjectKind::Set(entries),
        Flavor::Weak => ObjectKind::WeakSet(entries),
    };
    let proto = proto_for(&interp, Some(target), &fallback);
    Ok(Value::Object(Obj::new(Object::new(Some(proto), kind))))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Part {
    Key,
    Value,
    Entry,
}

/// Live iterator over a map; entries added during iteration are visited
fn map_iterator(
    interp: &Interpreter,
    map: Obj,
    part: Part,
) -> Obj {
    let mut index = 0;
    interp.native_iterator("Map Iterator", move |interp| {
        let entry = match &map.lock().kind {
            ObjectKind::Map(m) => m.get_index(index).map(|(_, (k, v))| (k.clone(), v.clone())),
            _ => None,
        };
        let Some((key, value)) = entry else {
            return Ok(None);
        };
        index += 1;
        Ok(Some(match part {
            Part::Key => key,
            Part::Value => value,
            Part::Entry => Value::Object(interp.new_array(vec![key, value])),
        }))
    })
}

fn set_iterator(
    interp: &Interpreter,
    set: Obj,
    entries: bool,
) -> Obj {
    let mut index = 0;
    interp.native_iterator("Set Iterator", move |interp| {
        let value = match &set.lock().kind {
            ObjectKind::Set(s) => s.get_index(index).map(|(_, v)| v.clone()),
            _ => None,
        };
        let Some(value) = value else {
            return Ok(None);
        };
        index += 1;
        Ok(Some(if entries {
            Value::Object(interp.new_array(vec![value.clone(), value]))
        } else {
            value
        }))
    })
}

#[derive(Clone, Copy)]
enum SetOp {
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
    IsSubsetOf,
    IsSupersetOf,
    IsDisjointFrom,
}

/// Elements of a set-like argument: a `Set` directly, otherwise its `keys()`
async fn set_like_values(
    interp: &Interpreter,
    other: &Value,
) -> JsResult<Vec<Value>> {
    if let Value::Object(obj) = other {
        if let ObjectKind::Set(s) = &obj.lock().kind {
            return Ok(s.values().cloned().collect());
        }
    }
    if !other.is_object() {
        return Err(interp.type_error("The argument must be a set-like object"));
    }
    let keys = interp.get_named(other, "keys").await?;
    let iterator = interp.call(&keys, other.clone(), Vec::new()).await?;
    let mut record = crate::backends::interpreter::IterRecord::Object {
        next: interp.get_named(&iterator, "next").await?,
        iterator,
        is_async: false,
    };
    let mut out = Vec::new();
    while let Some(v) = interp.iter_next(&mut record).await? {
        out.push(v);
    }
    Ok(out)
}

async fn set_algebra(
    interp: Interpreter,
    args: CallArgs,
    op: SetOp,
) -> JsResult<Value> {
    let mine = with_set(&interp, &args.this, "Set.prototype method", Flavor::Strong, |s| s.clone())?;
    let theirs: SetEntries = set_like_values(&interp, &args.arg(0))
        .await?
        .into_iter()
        .map(|v| {
            let v = normalize_zero(v);
            (HashKey::of(&v), v)
        })
        .collect();
    let result: SetEntries = match op {
        SetOp::Union => {
            let mut out = mine;
            for (k, v) in theirs {
                out.entry(k).or_insert(v);
            }
            out
        }
        SetOp::Intersection => mine.into_iter().filter(|(k, _)| theirs.contains_key(k)).collect(),
        SetOp::Difference => mine.into_iter().filter(|(k, _)| !theirs.contains_key(k)).collect(),
        SetOp::SymmetricDifference => {
            let mut out: SetEntries = mine.iter().filter(|(k, _)| !theirs.contains_key(*k)).map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in theirs {
                if !mine.contains_key(&k) {
                    out.insert(k, v);
                }
            }
            out
        }
        SetOp::IsSubsetOf => return Ok(Value::Bool(mine.keys().all(|k| theirs.contains_key(k)))),
        SetOp::IsSupersetOf => return Ok(Value::Bool(theirs.keys().all(|k| mine.contains_key(k)))),
        SetOp::IsDisjointFrom => return Ok(Value::Bool(!mine.keys().any(|k| theirs.contains_key(k)))),
    };
    let set = Obj::new(Object::new(Some(interp.intrinsics().set_proto.clone()), ObjectKind::Set(result)));
    Ok(Value::Object(set))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_entry_keeps_first_key() {
        let mut map = MapEntries::new();
        set_entry(&mut map, Value::Number(0.0), Value::str("a"));
        set_entry(&mut map, normalize_zero(Value::Number(-0.0)), Value::str("b"));
        assert_eq!(map.len(), 1);
        let (_, (_, v)) = map.get_index(0).unwrap();
        assert_eq!(v.as_str(), Some("b"));
    }

    #[test]
    fn test_normalize_zero() {
        let Value::Number(n) = normalize_zero(Value::Number(-0.0)) else {
            panic!("expected a number");
        };
        assert!(n.is_sign_positive());
    }
}
