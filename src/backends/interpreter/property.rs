//! Property access and type conversions

use std::sync::Arc;

use num_bigint::BigInt;

use super::{BoxFuture, Interpreter, JsResult};
use crate::runtime::value::number::{string_to_number, to_uint32};
use crate::runtime::value::{
    Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value,
};

/// Result of a property lookup along the prototype chain
pub(crate) enum Found {
    Value(Value),
    Getter(Obj),
    /// Accessor without getter, or no such property
    Missing,
}

/// Preferred type for `ToPrimitive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Default,
    Number,
    String,
}

impl Hint {
    fn name(self) -> &'static str {
        match self {
            Hint::Default => "default",
            Hint::Number => "number",
            Hint::String => "string",
        }
    }
}

/// Short description of a value for error messages
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Symbol(s) => format!("{:?}", s),
        Value::Object(obj) => {
            let object = obj.lock();
            match &object.kind {
                ObjectKind::Function(_) => "function".to_string(),
                ObjectKind::Array(_) => "array".to_string(),
                _ => format!("#<{}>", object.class_name()),
            }
        }
        v => v.primitive_to_string().map(|s| s.to_string()).unwrap_or_default(),
    }
}

impl Interpreter {
    /// Prototype used for property lookups on `value`
    pub fn proto_of(
        &self,
        value: &Value,
    ) -> Option<Obj> {
        let i = self.intrinsics();
        match value {
            Value::Undefined | Value::Null => None,
            Value::Bool(_) => Some(i.boolean_proto.clone()),
            Value::Number(_) => Some(i.number_proto.clone()),
            Value::BigInt(_) => Some(i.bigint_proto.clone()),
            Value::String(_) => Some(i.string_proto.clone()),
            Value::Symbol(_) => Some(i.symbol_proto.clone()),
            Value::Object(obj) => obj.proto(),
        }
    }

    /// Look up a property without invoking getters
    pub(crate) fn lookup(
        &self,
        target: &Value,
        key: &PropertyKey,
    ) -> JsResult<Found> {
        let mut current = match target {
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    describe_value(target),
                    key
                )));
            }
            Value::String(s) => {
                if key.as_str() == Some("length") {
                    return Ok(Found::Value(Value::Number(s.encode_utf16().count() as f64)));
                }
                if let Some(i) = key.array_index() {
                    if let Some(unit) = s.encode_utf16().nth(i) {
                        return Ok(Found::Value(Value::from(String::from_utf16_lossy(&[unit]))));
                    }
                }
                self.proto_of(target)
            }
            Value::Object(obj) => Some(obj.clone()),
            _ => self.proto_of(target),
        };
        while let Some(obj) = current {
            let (own, proto) = {
                let object = obj.lock();
                (object.get_own(key), object.proto.clone())
            };
            if let Some(prop) = own {
                return Ok(match prop.slot {
                    Slot::Data(v) => Found::Value(v),
                    Slot::Accessor { get: Some(g), .. } => Found::Getter(g),
                    Slot::Accessor { get: None, .. } => Found::Missing,
                });
            }
            current = proto;
        }
        Ok(Found::Missing)
    }

    /// `target[key]`
    pub fn get<'a>(
        &'a self,
        target: &'a Value,
        key: &'a PropertyKey,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            match self.lookup(target, key)? {
                Found::Value(v) => Ok(v),
                Found::Getter(getter) => self.call_function(&getter, target.clone(), Vec::new()).await,
                Found::Missing => Ok(Value::Undefined),
            }
        })
    }

    /// `target.name`
    pub async fn get_named(
        &self,
        target: &Value,
        name: &str,
    ) -> JsResult<Value> {
        let key = PropertyKey::from(name);
        self.get(target, &key).await
    }

    /// Data property through the prototype chain; getters are not run
    pub fn get_data(
        &self,
        target: &Value,
        key: &PropertyKey,
    ) -> Option<Value> {
        match self.lookup(target, key) {
            Ok(Found::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether `key` exists on `obj` or its prototypes
    pub fn has_property(
        &self,
        obj: &Obj,
        key: &PropertyKey,
    ) -> bool {
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            let (found, proto) = {
                let object = o.lock();
                (object.get_own(key).is_some(), object.proto.clone())
            };
            if found {
                return true;
            }
            current = proto;
        }
        false
    }

    pub fn has_own_property(
        &self,
        obj: &Obj,
        key: &PropertyKey,
    ) -> bool {
        obj.lock().get_own(key).is_some()
    }

    /// `target[key] = value` with strict-mode failures
    pub fn set<'a>(
        &'a self,
        target: &'a Value,
        key: PropertyKey,
        value: Value,
    ) -> BoxFuture<'a, JsResult<()>> {
        Box::pin(async move {
            let receiver = match target {
                Value::Object(obj) => obj.clone(),
                Value::Undefined | Value::Null => {
                    return Err(self.type_error(format!(
                        "Cannot set properties of {} (setting '{}')",
                        describe_value(target),
                        key
                    )));
                }
                _ => {
                    return Err(self.type_error(format!(
                        "Cannot create property '{}' on {} {}",
                        key,
                        target.type_of(),
                        describe_value(target)
                    )));
                }
            };

            // find the nearest definition
            let mut current = Some(receiver.clone());
            while let Some(obj) = current {
                let (prop, proto) = {
                    let object = obj.lock();
                    (object.get_own(&key), object.proto.clone())
                };
                match prop.map(|p| (p.slot, p.writable)) {
                    Some((Slot::Accessor { set: Some(setter), .. }, _)) => {
                        self.call_function(&setter, target.clone(), vec![value]).await?;
                        return Ok(());
                    }
                    Some((Slot::Accessor { set: None, .. }, _)) => {
                        return Err(self.type_error(format!(
                            "Cannot set property {} of {} which has only a getter",
                            key,
                            describe_value(target)
                        )));
                    }
                    Some((Slot::Data(_), false)) => {
                        return Err(self.type_error(format!(
                            "Cannot assign to read only property '{}' of object '{}'",
                            key,
                            describe_value(target)
                        )));
                    }
                    Some((Slot::Data(_), true)) => break,
                    None => current = proto,
                }
            }
            self.write_own(&receiver, key, value)
        })
    }

    /// `target.name = value`
    pub async fn set_named(
        &self,
        target: &Value,
        name: &str,
        value: Value,
    ) -> JsResult<()> {
        self.set(target, PropertyKey::from(name), value).await
    }

    /// Create or update an own data property, honoring exotic array/typed array storage
    pub(crate) fn write_own(
        &self,
        obj: &Obj,
        key: PropertyKey,
        value: Value,
    ) -> JsResult<()> {
        let result = write_own_locked(&mut obj.lock(), &key, value);
        result.map_err(|fail| match fail {
            WriteFail::Frozen => self.type_error(format!("Cannot assign to read only property '{}' of object", key)),
            WriteFail::BadLength => self.range_error("Invalid array length"),
            WriteFail::NotExtensible => {
                self.type_error(format!("Cannot add property {}, object is not extensible", key))
            }
        })
    }

    /// `CreateDataProperty`: define an enumerable own property, replacing accessors
    pub fn create_data_property(
        &self,
        obj: &Obj,
        key: impl Into<PropertyKey>,
        value: Value,
    ) {
        let key = key.into();
        let mut object = obj.lock();
        match &mut object.kind {
            ObjectKind::Array(items) if key.array_index().is_some() => {
                let i = key.array_index().unwrap_or(0);
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
            }
            _ => object.define(key, Property::data(value)),
        }
    }

    /// `delete obj[key]`
    pub fn delete_property(
        &self,
        obj: &Obj,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        let removed = obj.lock().remove(key);
        if removed {
            Ok(true)
        } else {
            Err(self.type_error(format!("Cannot delete property '{}' of {}", key, describe_value(&Value::Object(obj.clone())))))
        }
    }

    /// Own enumerable string-keyed properties, in property order
    pub fn own_enumerable_keys(
        &self,
        obj: &Obj,
    ) -> Vec<PropertyKey> {
        let object = obj.lock();
        object
            .own_keys()
            .into_iter()
            .filter(|k| matches!(k, PropertyKey::String(_)))
            .filter(|k| object.get_own(k).map(|p| p.enumerable).unwrap_or(false))
            .collect()
    }

    /// Own enumerable properties as `(key, value)` pairs, running getters
    pub async fn own_enumerable_entries(
        &self,
        obj: &Obj,
    ) -> JsResult<Vec<(PropertyKey, Value)>> {
        let target = Value::Object(obj.clone());
        let mut out = Vec::new();
        for key in self.own_enumerable_keys(obj) {
            let value = self.get(&target, &key).await?;
            out.push((key, value));
        }
        Ok(out)
    }

    /// Plain object with the default prototype
    pub fn new_object(&self) -> Obj {
        Obj::new(Object::new(
            Some(self.intrinsics().object_proto.clone()),
            ObjectKind::Ordinary,
        ))
    }

    /// Array object
    pub fn new_array(
        &self,
        items: Vec<Value>,
    ) -> Obj {
        Obj::new(Object::new(
            Some(self.intrinsics().array_proto.clone()),
            ObjectKind::Array(items),
        ))
    }

    /// Plain object from `(name, value)` pairs
    pub fn object_from(
        &self,
        entries: Vec<(&str, Value)>,
    ) -> Obj {
        let obj = self.new_object();
        {
            let mut object = obj.lock();
            for (k, v) in entries {
                object.insert(k, v);
            }
        }
        obj
    }

    /// `ToPrimitive`
    pub fn to_primitive<'a>(
        &'a self,
        value: &'a Value,
        hint: Hint,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            let Value::Object(obj) = value else {
                return Ok(value.clone());
            };
            let to_prim = PropertyKey::Symbol(self.intrinsics().symbols.to_primitive.clone());
            let exotic = self.get(value, &to_prim).await?;
            if !exotic.is_nullish() {
                let result = self.call(&exotic, value.clone(), vec![Value::str(hint.name())]).await?;
                if result.is_object() {
                    return Err(self.type_error("Cannot convert object to primitive value"));
                }
                return Ok(result);
            }
            let is_date = matches!(obj.lock().kind, ObjectKind::Date(_));
            let order = match hint {
                Hint::String => ["toString", "valueOf"],
                Hint::Default if is_date => ["toString", "valueOf"],
                _ => ["valueOf", "toString"],
            };
            for name in order {
                let method = self.get_named(value, name).await?;
                if self.is_callable(&method) {
                    let result = self.call(&method, value.clone(), Vec::new()).await?;
                    if !result.is_object() {
                        return Ok(result);
                    }
                }
            }
            Err(self.type_error("Cannot convert object to primitive value"))
        })
    }

    /// `ToNumber`
    pub async fn to_number(
        &self,
        value: &Value,
    ) -> JsResult<f64> {
        match value {
            Value::Object(_) => {
                let prim = self.to_primitive(value, Hint::Number).await?;
                self.primitive_to_number(&prim)
            }
            v => self.primitive_to_number(v),
        }
    }

    pub(crate) fn primitive_to_number(
        &self,
        value: &Value,
    ) -> JsResult<f64> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => *b as u8 as f64,
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::BigInt(_) => return Err(self.type_error("Cannot convert a BigInt value to a number")),
            Value::Symbol(_) => return Err(self.type_error("Cannot convert a Symbol value to a number")),
            Value::Object(_) => f64::NAN,
        })
    }

    /// `ToNumeric`: a number or a big integer
    pub async fn to_numeric(
        &self,
        value: &Value,
    ) -> JsResult<Value> {
        let prim = self.to_primitive(value, Hint::Number).await?;
        match prim {
            Value::BigInt(_) => Ok(prim),
            v => Ok(Value::Number(self.primitive_to_number(&v)?)),
        }
    }

    /// `ToString`
    pub async fn to_string(
        &self,
        value: &Value,
    ) -> JsResult<Arc<str>> {
        match value {
            Value::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a string")),
            Value::Object(_) => {
                let prim = self.to_primitive(value, Hint::String).await?;
                if let Value::Symbol(_) = prim {
                    return Err(self.type_error("Cannot convert a Symbol value to a string"));
                }
                Ok(prim.primitive_to_string().unwrap_or_else(|| Arc::from("")))
            }
            v => Ok(v.primitive_to_string().unwrap_or_else(|| Arc::from(""))),
        }
    }

    /// `ToPropertyKey`
    pub async fn to_property_key(
        &self,
        value: &Value,
    ) -> JsResult<PropertyKey> {
        match value {
            Value::Symbol(s) => Ok(PropertyKey::Symbol(s.clone())),
            Value::String(s) => Ok(PropertyKey::String(s.clone())),
            Value::Object(_) => {
                let prim = self.to_primitive(value, Hint::String).await?;
                match prim {
                    Value::Symbol(s) => Ok(PropertyKey::Symbol(s)),
                    p => Ok(PropertyKey::String(p.primitive_to_string().unwrap_or_else(|| Arc::from("")))),
                }
            }
            v => Ok(PropertyKey::String(v.primitive_to_string().unwrap_or_else(|| Arc::from("")))),
        }
    }

    /// `ToObject`
    pub fn to_object(
        &self,
        value: &Value,
    ) -> JsResult<Obj> {
        match value {
            Value::Object(obj) => Ok(obj.clone()),
            Value::Undefined | Value::Null => Err(self.type_error("Cannot convert undefined or null to object")),
            v => Ok(Obj::new(Object::new(self.proto_of(v), ObjectKind::Boxed(v.clone())))),
        }
    }

    /// `ToLength`-style conversion of a `length` value
    pub fn length_of(
        &self,
        value: &Value,
    ) -> usize {
        match value {
            Value::Number(n) if *n > 0.0 => n.min(u32::MAX as f64) as usize,
            _ => 0,
        }
    }
}

enum WriteFail {
    Frozen,
    BadLength,
    NotExtensible,
}

fn write_own_locked(
    object: &mut Object,
    key: &PropertyKey,
    value: Value,
) -> Result<(), WriteFail> {
    let frozen = object.frozen;
    match &mut object.kind {
        ObjectKind::Array(items) => {
            if let Some(i) = key.array_index() {
                if frozen {
                    return Err(WriteFail::Frozen);
                }
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                return Ok(());
            }
            if key.as_str() == Some("length") {
                let len = match &value {
                    Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => *n as usize,
                    _ => return Err(WriteFail::BadLength),
                };
                if frozen {
                    return Err(WriteFail::Frozen);
                }
                items.resize(len, Value::Undefined);
                return Ok(());
            }
        }
        ObjectKind::TypedArray(ta) => {
            if let Some(i) = key.array_index() {
                let kind = ta.kind;
                if let Some(slot) = ta.elems.get_mut(i) {
                    *slot = coerce_typed_element(kind, &value);
                }
                return Ok(());
            }
        }
        _ => {}
    }
    if let Some(prop) = object.props.get_mut(key) {
        prop.slot = Slot::Data(value);
        return Ok(());
    }
    if !object.extensible {
        return Err(WriteFail::NotExtensible);
    }
    object.props.insert(key.clone(), Property::data(value));
    Ok(())
}

/// Convert a value for storage in a typed array without running user code
pub(crate) fn coerce_typed_element(
    kind: crate::runtime::value::TypedKind,
    value: &Value,
) -> Value {
    if kind.is_bigint() {
        let n = match value {
            Value::BigInt(n) => (**n).clone(),
            Value::Bool(b) => BigInt::from(*b as u8),
            _ => BigInt::from(0),
        };
        return Value::bigint(kind.coerce_bigint(&n));
    }
    let x = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => *b as u8 as f64,
        Value::String(s) => string_to_number(s),
        Value::Null => 0.0,
        _ => f64::NAN,
    };
    Value::Number(kind.coerce_number(x))
}

/// Array index conversion used by builtins (`ToUint32` of a number)
pub(crate) fn index_of_number(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < u32::MAX as f64).then(|| to_uint32(n) as usize)
}
