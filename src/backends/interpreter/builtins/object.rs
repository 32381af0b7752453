//! `Object` and `Object.prototype`

use std::sync::Arc;

use super::{define_async, proto_for, this_object};
use crate::backends::interpreter::property::describe_value;
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::{CallArgs, NativeFn, Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value};

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().object_proto.clone();
    let ctor = interp.define_constructor("Object", 1, NativeFn::Sync(Arc::new(object_ctor)), &proto);

    interp.define_method(&ctor, "keys", 1, keys);
    define_async(interp, &ctor, "values", 1, values);
    define_async(interp, &ctor, "entries", 1, entries);
    define_async(interp, &ctor, "assign", 2, assign);
    define_async(interp, &ctor, "fromEntries", 1, from_entries);
    define_async(interp, &ctor, "groupBy", 2, group_by);
    interp.define_method(&ctor, "freeze", 1, freeze);
    interp.define_method(&ctor, "isFrozen", 1, is_frozen);
    interp.define_method(&ctor, "seal", 1, seal);
    interp.define_method(&ctor, "isSealed", 1, is_sealed);
    interp.define_method(&ctor, "preventExtensions", 1, prevent_extensions);
    interp.define_method(&ctor, "isExtensible", 1, is_extensible);
    define_async(interp, &ctor, "create", 2, create);
    interp.define_method(&ctor, "getPrototypeOf", 1, get_prototype_of);
    interp.define_method(&ctor, "setPrototypeOf", 2, set_prototype_of);
    define_async(interp, &ctor, "defineProperty", 3, define_property);
    define_async(interp, &ctor, "defineProperties", 2, define_properties);
    interp.define_method(&ctor, "getOwnPropertyNames", 1, get_own_property_names);
    interp.define_method(&ctor, "getOwnPropertySymbols", 1, get_own_property_symbols);
    define_async(interp, &ctor, "getOwnPropertyDescriptor", 2, get_own_property_descriptor);
    interp.define_method(&ctor, "getOwnPropertyDescriptors", 1, get_own_property_descriptors);
    interp.define_method(&ctor, "is", 2, |_, args| Ok(Value::Bool(args.arg(0).same_value(&args.arg(1)))));
    define_async(interp, &ctor, "hasOwn", 2, has_own);

    define_async(interp, &proto, "hasOwnProperty", 1, has_own_property);
    interp.define_method(&proto, "isPrototypeOf", 1, is_prototype_of);
    define_async(interp, &proto, "propertyIsEnumerable", 1, property_is_enumerable);
    interp.define_method(&proto, "toString", 0, |interp, args| Ok(Value::from(to_string_tag(interp, &args.this))));
    define_async(interp, &proto, "toLocaleString", 0, |interp: Interpreter, args: CallArgs| async move {
        let method = interp.get_named(&args.this, "toString").await?;
        interp.call(&method, args.this.clone(), Vec::new()).await
    });
    interp.define_method(&proto, "valueOf", 0, |interp, args| Ok(Value::Object(interp.to_object(&args.this)?)));

    let get_proto = interp.native_fn("get __proto__", 0, |interp, args: CallArgs| {
        Ok(interp.proto_of(&args.this).map(Value::Object).unwrap_or(Value::Null))
    });
    let set_proto = interp.native_fn("set __proto__", 1, |_, args: CallArgs| {
        if let Value::Object(obj) = &args.this {
            match args.arg(0) {
                Value::Object(p) => obj.lock().proto = Some(p),
                Value::Null => obj.lock().proto = None,
                _ => {}
            }
        }
        Ok(Value::Undefined)
    });
    proto
        .lock()
        .define("__proto__", Property::accessor(Some(get_proto), Some(set_proto), false));
}

fn object_ctor(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    if let Some(target) = &args.new_target {
        let is_object_ctor = matches!(interp.global_value("Object"), Some(Value::Object(ctor)) if ctor.ptr_eq(target));
        if !is_object_ctor {
            let proto = proto_for(interp, Some(target), &interp.intrinsics().object_proto);
            return Ok(Value::Object(Obj::new(Object::new(Some(proto), ObjectKind::Ordinary))));
        }
    }
    match args.arg(0) {
        Value::Undefined | Value::Null => Ok(Value::Object(interp.new_object())),
        v => Ok(Value::Object(interp.to_object(&v)?)),
    }
}

/// `"[object Tag]"`
pub(crate) fn to_string_tag(
    interp: &Interpreter,
    value: &Value,
) -> String {
    let tag_key = PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone());
    if value.is_object() {
        if let Some(Value::String(tag)) = interp.get_data(value, &tag_key) {
            return format!("[object {}]", tag);
        }
    }
    let tag = match value {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::BigInt(_) => "BigInt",
        Value::Symbol(_) => "Symbol",
        Value::Object(obj) => {
            let object = obj.lock();
            match &object.kind {
                ObjectKind::Boxed(Value::String(_)) => "String",
                ObjectKind::Boxed(Value::Number(_)) => "Number",
                ObjectKind::Boxed(Value::Bool(_)) => "Boolean",
                ObjectKind::Map(_) | ObjectKind::Set(_) | ObjectKind::WeakMap(_) | ObjectKind::WeakSet(_) => "Object",
                ObjectKind::Promise(_) | ObjectKind::TypedArray(_) | ObjectKind::Generator(_) => "Object",
                _ => object.class_name(),
            }
        }
    };
    format!("[object {}]", tag)
}

/// Own enumerable string keys of `ToObject(value)`
fn enumerable_keys(
    interp: &Interpreter,
    value: &Value,
) -> JsResult<(Obj, Vec<PropertyKey>)> {
    let obj = interp.to_object(value)?;
    let keys = interp.own_enumerable_keys(&obj);
    Ok((obj, keys))
}

fn keys(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let (_, keys) = enumerable_keys(interp, &args.arg(0))?;
    let items = keys.iter().map(PropertyKey::to_value).collect();
    Ok(Value::Object(interp.new_array(items)))
}

async fn values(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let entries = interp.own_enumerable_entries(&obj).await?;
    let items = entries.into_iter().map(|(_, v)| v).collect();
    Ok(Value::Object(interp.new_array(items)))
}

async fn entries(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let entries = interp.own_enumerable_entries(&obj).await?;
    let items = entries
        .into_iter()
        .map(|(k, v)| Value::Object(interp.new_array(vec![k.to_value(), v])))
        .collect();
    Ok(Value::Object(interp.new_array(items)))
}

async fn assign(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = interp.to_object(&args.arg(0))?;
    let target_value = Value::Object(target.clone());
    for source in args.args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let source = interp.to_object(source)?;
        let keys: Vec<PropertyKey> = {
            let object = source.lock();
            object
                .own_keys()
                .into_iter()
                .filter(|k| object.get_own(k).map(|p| p.enumerable).unwrap_or(false))
                .collect()
        };
        let source_value = Value::Object(source);
        for key in keys {
            let value = interp.get(&source_value, &key).await?;
            interp.set(&target_value, key, value).await?;
        }
    }
    Ok(target_value)
}

async fn from_entries(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.new_object();
    for entry in interp.iterate_to_vec(&args.arg(0)).await? {
        if !entry.is_object() {
            return Err(interp.type_error("Iterator value is not an entry object"));
        }
        let key = interp.get(&entry, &PropertyKey::from("0")).await?;
        let value = interp.get(&entry, &PropertyKey::from("1")).await?;
        let key = interp.to_property_key(&key).await?;
        interp.create_data_property(&obj, key, value);
    }
    Ok(Value::Object(obj))
}

async fn group_by(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let callback = args.arg(1);
    if !interp.is_callable(&callback) {
        return Err(interp.type_error("callback is not a function"));
    }
    let out = Obj::new(Object::new(None, ObjectKind::Ordinary));
    for (i, item) in interp.iterate_to_vec(&args.arg(0)).await?.into_iter().enumerate() {
        let key = interp
            .call(&callback, Value::Undefined, vec![item.clone(), Value::Number(i as f64)])
            .await?;
        let key = interp.to_property_key(&key).await?;
        let existing = out.lock().get_own(&key);
        match existing.map(|p| p.slot) {
            Some(Slot::Data(Value::Object(group))) => {
                if let ObjectKind::Array(items) = &mut group.lock().kind {
                    items.push(item);
                }
            }
            _ => {
                let group = interp.new_array(vec![item]);
                out.lock().insert(key, Value::Object(group));
            }
        }
    }
    Ok(Value::Object(out))
}

fn freeze(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(obj) = &target {
        let mut object = obj.lock();
        object.frozen = true;
        object.extensible = false;
        for prop in object.props.values_mut() {
            prop.configurable = false;
            if matches!(prop.slot, Slot::Data(_)) {
                prop.writable = false;
            }
        }
    }
    Ok(target)
}

fn is_frozen(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let Value::Object(obj) = args.arg(0) else {
        return Ok(Value::Bool(true));
    };
    let object = obj.lock();
    if object.frozen {
        return Ok(Value::Bool(true));
    }
    let has_elements = match &object.kind {
        ObjectKind::Array(items) => !items.is_empty(),
        ObjectKind::TypedArray(ta) => !ta.elems.is_empty(),
        _ => false,
    };
    let locked = object
        .props
        .values()
        .all(|p| !p.configurable && (!p.writable || matches!(p.slot, Slot::Accessor { .. })));
    Ok(Value::Bool(!object.extensible && !has_elements && locked))
}

fn seal(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(obj) = &target {
        let mut object = obj.lock();
        object.extensible = false;
        for prop in object.props.values_mut() {
            prop.configurable = false;
        }
    }
    Ok(target)
}

fn is_sealed(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let Value::Object(obj) = args.arg(0) else {
        return Ok(Value::Bool(true));
    };
    let object = obj.lock();
    Ok(Value::Bool(
        object.frozen || (!object.extensible && object.props.values().all(|p| !p.configurable)),
    ))
}

fn prevent_extensions(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(obj) = &target {
        obj.lock().extensible = false;
    }
    Ok(target)
}

fn is_extensible(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    Ok(Value::Bool(match args.arg(0) {
        Value::Object(obj) => obj.lock().extensible,
        _ => false,
    }))
}

async fn create(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let proto = match args.arg(0) {
        Value::Object(p) => Some(p),
        Value::Null => None,
        v => {
            return Err(interp.type_error(format!(
                "Object prototype may only be an Object or null: {}",
                describe_value(&v)
            )))
        }
    };
    let obj = Obj::new(Object::new(proto, ObjectKind::Ordinary));
    let props = args.arg(1);
    if !props.is_undefined() {
        define_properties_from(&interp, &obj, &props).await?;
    }
    Ok(Value::Object(obj))
}

fn get_prototype_of(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let proto = obj.proto();
    Ok(proto.map(Value::Object).unwrap_or(Value::Null))
}

fn set_prototype_of(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    let proto = match args.arg(1) {
        Value::Object(p) => Some(p),
        Value::Null => None,
        _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
    };
    if let Value::Object(obj) = &target {
        let mut cursor = proto.clone();
        while let Some(p) = cursor {
            if p.ptr_eq(obj) {
                return Err(interp.type_error("Cyclic __proto__ value"));
            }
            cursor = p.proto();
        }
        let mut object = obj.lock();
        if !object.extensible {
            return Err(interp.type_error("#<Object> is not extensible"));
        }
        object.proto = proto;
    }
    Ok(target)
}

/// Read a property descriptor object
pub(crate) async fn to_descriptor(
    interp: &Interpreter,
    desc: &Value,
    existing: Option<Property>,
) -> JsResult<Property> {
    if !desc.is_object() {
        return Err(interp.type_error("Property description must be an object"));
    }
    let field = |name: &'static str| {
        let key = PropertyKey::from(name);
        let interp = interp.clone();
        let desc = desc.clone();
        async move {
            let Value::Object(obj) = &desc else {
                return Ok(None);
            };
            if !interp.has_property(obj, &key) {
                return Ok(None);
            }
            interp.get(&desc, &key).await.map(Some)
        }
    };
    let enumerable = field("enumerable").await?.map(|v| v.to_boolean());
    let configurable = field("configurable").await?.map(|v| v.to_boolean());
    let writable = field("writable").await?.map(|v| v.to_boolean());
    let value = field("value").await?;
    let get = field("get").await?;
    let set = field("set").await?;

    let accessor_fn = |v: Option<Value>, what: &str| -> JsResult<Option<Option<Obj>>> {
        match v {
            None => Ok(None),
            Some(Value::Undefined) => Ok(Some(None)),
            Some(Value::Object(f)) if f.is_callable() => Ok(Some(Some(f))),
            Some(_) => Err(interp.type_error(format!("{} must be a function", what))),
        }
    };
    let get = accessor_fn(get, "Getter")?;
    let set = accessor_fn(set, "Setter")?;

    if (get.is_some() || set.is_some()) && (value.is_some() || writable.is_some()) {
        return Err(interp.type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }

    let base = existing.unwrap_or(Property {
        slot: Slot::Data(Value::Undefined),
        enumerable: false,
        writable: false,
        configurable: false,
    });
    let slot = if get.is_some() || set.is_some() {
        let (old_get, old_set) = match &base.slot {
            Slot::Accessor { get, set } => (get.clone(), set.clone()),
            Slot::Data(_) => (None, None),
        };
        Slot::Accessor {
            get: get.unwrap_or(old_get),
            set: set.unwrap_or(old_set),
        }
    } else {
        match (value, &base.slot) {
            (Some(v), _) => Slot::Data(v),
            (None, Slot::Data(v)) => Slot::Data(v.clone()),
            (None, Slot::Accessor { .. }) => Slot::Data(Value::Undefined),
        }
    };
    Ok(Property {
        writable: writable.unwrap_or(base.writable && matches!(slot, Slot::Data(_))),
        enumerable: enumerable.unwrap_or(base.enumerable),
        configurable: configurable.unwrap_or(base.configurable),
        slot,
    })
}

/// `[[DefineOwnProperty]]` with the usual immutability checks
pub(crate) fn define_own(
    interp: &Interpreter,
    obj: &Obj,
    key: PropertyKey,
    prop: Property,
) -> JsResult<()> {
    let mut object = obj.lock();
    let existing = object.get_own(&key);
    match &existing {
        Some(old) if !old.configurable => {
            let same = match (&old.slot, &prop.slot) {
                (Slot::Data(a), Slot::Data(b)) => (old.writable || a.same_value(b)) && (old.writable || !prop.writable),
                _ => false,
            };
            if !same || prop.enumerable != old.enumerable {
                return Err(interp.type_error(format!("Cannot redefine property: {}", key)));
            }
        }
        None if !object.extensible => {
            return Err(interp.type_error(format!("Cannot define property {}, object is not extensible", key)));
        }
        _ => {}
    }

    if let ObjectKind::Array(items) = &mut object.kind {
        if let (Some(i), Slot::Data(v)) = (key.array_index(), &prop.slot) {
            if i >= items.len() {
                items.resize(i + 1, Value::Undefined);
            }
            items[i] = v.clone();
            return Ok(());
        }
        if key.as_str() == Some("length") {
            if let Slot::Data(Value::Number(n)) = &prop.slot {
                items.resize(*n as usize, Value::Undefined);
            }
            if !prop.writable {
                object.frozen = true;
            }
            return Ok(());
        }
    }
    object.define(key, prop);
    Ok(())
}

async fn define_property(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    let Value::Object(obj) = &target else {
        return Err(interp.type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&args.arg(1)).await?;
    let existing = obj.lock().get_own(&key);
    let prop = to_descriptor(&interp, &args.arg(2), existing).await?;
    define_own(&interp, obj, key, prop)?;
    Ok(target)
}

async fn define_properties_from(
    interp: &Interpreter,
    obj: &Obj,
    props: &Value,
) -> JsResult<()> {
    let source = interp.to_object(props)?;
    for (key, desc) in interp.own_enumerable_entries(&source).await? {
        let existing = obj.lock().get_own(&key);
        let prop = to_descriptor(interp, &desc, existing).await?;
        define_own(interp, obj, key, prop)?;
    }
    Ok(())
}

async fn define_properties(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let target = args.arg(0);
    let Value::Object(obj) = &target else {
        return Err(interp.type_error("Object.defineProperties called on non-object"));
    };
    define_properties_from(&interp, obj, &args.arg(1)).await?;
    Ok(target)
}

fn get_own_property_names(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let keys: Vec<Value> = obj
        .lock()
        .own_keys()
        .into_iter()
        .filter(|k| matches!(k, PropertyKey::String(_)))
        .map(|k| k.to_value())
        .collect();
    Ok(Value::Object(interp.new_array(keys)))
}

fn get_own_property_symbols(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let keys: Vec<Value> = obj
        .lock()
        .own_keys()
        .into_iter()
        .filter(|k| matches!(k, PropertyKey::Symbol(_)))
        .map(|k| k.to_value())
        .collect();
    Ok(Value::Object(interp.new_array(keys)))
}

/// Descriptor object for a property
pub(crate) fn from_descriptor(
    interp: &Interpreter,
    prop: &Property,
) -> Value {
    let flags = [
        ("enumerable", Value::Bool(prop.enumerable)),
        ("configurable", Value::Bool(prop.configurable)),
    ];
    let mut fields = match &prop.slot {
        Slot::Data(v) => vec![("value", v.clone()), ("writable", Value::Bool(prop.writable))],
        Slot::Accessor { get, set } => vec![
            ("get", get.clone().map(Value::Object).unwrap_or_default()),
            ("set", set.clone().map(Value::Object).unwrap_or_default()),
        ],
    };
    fields.extend(flags);
    Value::Object(interp.object_from(fields))
}

async fn get_own_property_descriptor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let key = interp.to_property_key(&args.arg(1)).await?;
    let prop = obj.lock().get_own(&key);
    Ok(prop.map(|p| from_descriptor(&interp, &p)).unwrap_or_default())
}

fn get_own_property_descriptors(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let props: Vec<(PropertyKey, Property)> = {
        let object = obj.lock();
        object
            .own_keys()
            .into_iter()
            .filter_map(|k| object.get_own(&k).map(|p| (k, p)))
            .collect()
    };
    let out = interp.new_object();
    for (key, prop) in props {
        let desc = from_descriptor(interp, &prop);
        out.lock().insert(key, desc);
    }
    Ok(Value::Object(out))
}

async fn has_own(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let obj = interp.to_object(&args.arg(0))?;
    let key = interp.to_property_key(&args.arg(1)).await?;
    Ok(Value::Bool(interp.has_own_property(&obj, &key)))
}

async fn has_own_property(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let key = interp.to_property_key(&args.arg(0)).await?;
    if let Value::String(s) = &args.this {
        let len = s.encode_utf16().count();
        let hit = key.as_str() == Some("length") || key.array_index().map(|i| i < len).unwrap_or(false);
        return Ok(Value::Bool(hit));
    }
    let obj = this_object(&interp, &args, "Object.prototype.hasOwnProperty")?;
    Ok(Value::Bool(interp.has_own_property(&obj, &key)))
}

fn is_prototype_of(
    _: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let (Value::Object(this), Value::Object(target)) = (&args.this, args.arg(0)) else {
        return Ok(Value::Bool(false));
    };
    let mut cursor = target.proto();
    while let Some(p) = cursor {
        if p.ptr_eq(this) {
            return Ok(Value::Bool(true));
        }
        cursor = p.proto();
    }
    Ok(Value::Bool(false))
}

async fn property_is_enumerable(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let key = interp.to_property_key(&args.arg(0)).await?;
    let obj = this_object(&interp, &args, "Object.prototype.propertyIsEnumerable")?;
    let prop = obj.lock().get_own(&key);
    Ok(Value::Bool(prop.map(|p| p.enumerable).unwrap_or(false)))
}
