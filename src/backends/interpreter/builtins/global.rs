//! Global functions and constants
//!
//! Timers return plain numeric ids. They are driven by the job queue, so a
//! timer only fires while something awaits.

use std::collections::HashMap;
use std::time::Duration;

use super::{define_async, number_of, string_arg};
use crate::backends::interpreter::property::describe_value;
use crate::backends::interpreter::{BoxFuture, ErrorKind, Interpreter, JsResult};
use crate::runtime::value::{CallArgs, HashKey, Obj, Object, ObjectKind, Property, PropertyKey, TypedArray, Value};

/// Characters `encodeURIComponent` leaves alone besides ASCII alphanumerics
const URI_UNRESERVED: &str = "-_.!~*'()";

/// Characters `encodeURI` additionally leaves alone
const URI_RESERVED: &str = ";/?:@&=+$,#";

pub(crate) fn install(interp: &Interpreter) {
    let global = interp.global().clone();
    {
        let mut object = global.lock();
        object.define("globalThis", Property::hidden(Value::Object(global.clone())));
        object.define("undefined", Property::constant(Value::Undefined));
        object.define("NaN", Property::constant(Value::Number(f64::NAN)));
        object.define("Infinity", Property::constant(Value::Number(f64::INFINITY)));
    }

    // the globals are the very same functions as `Number.parseInt` / `Number.parseFloat`
    if let Some(number) = interp.global_value("Number") {
        for name in ["parseInt", "parseFloat"] {
            if let Some(f) = interp.get_data(&number, &PropertyKey::from(name)) {
                interp.define_global(name, f);
            }
        }
    }

    define_async(interp, &global, "isNaN", 1, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::Bool(interp.to_number(&args.arg(0)).await?.is_nan()))
    });
    define_async(interp, &global, "isFinite", 1, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::Bool(interp.to_number(&args.arg(0)).await?.is_finite()))
    });

    interp.define_method(&global, "setTimeout", 2, |interp, args: CallArgs| schedule(interp, args, false));
    interp.define_method(&global, "setInterval", 2, |interp, args: CallArgs| schedule(interp, args, true));
    interp.define_method(&global, "clearTimeout", 1, clear);
    interp.define_method(&global, "clearInterval", 1, clear);
    interp.define_method(&global, "queueMicrotask", 1, |interp, args: CallArgs| {
        let callback = args.arg(0);
        if !interp.is_callable(&callback) {
            return Err(interp.type_error(format!(
                "The \"callback\" argument must be of type function. Received {}",
                describe_value(&callback)
            )));
        }
        interp.queue_microtask(callback);
        Ok(Value::Undefined)
    });

    define_async(interp, &global, "encodeURI", 1, |interp: Interpreter, args: CallArgs| async move {
        let text = string_arg(&interp, &args, 0).await?;
        Ok(Value::from(encode_uri(&text, URI_RESERVED)))
    });
    define_async(interp, &global, "encodeURIComponent", 1, |interp: Interpreter, args: CallArgs| async move {
        let text = string_arg(&interp, &args, 0).await?;
        Ok(Value::from(encode_uri(&text, "")))
    });
    define_async(interp, &global, "decodeURI", 1, |interp: Interpreter, args: CallArgs| async move {
        let text = string_arg(&interp, &args, 0).await?;
        decode_uri(&text, URI_RESERVED)
            .map(Value::from)
            .ok_or_else(|| interp.throw(ErrorKind::UriError, "URI malformed"))
    });
    define_async(interp, &global, "decodeURIComponent", 1, |interp: Interpreter, args: CallArgs| async move {
        let text = string_arg(&interp, &args, 0).await?;
        decode_uri(&text, "")
            .map(Value::from)
            .ok_or_else(|| interp.throw(ErrorKind::UriError, "URI malformed"))
    });

    define_async(interp, &global, "structuredClone", 1, |interp: Interpreter, args: CallArgs| async move {
        let mut memo = HashMap::new();
        clone_value(&interp, args.arg(0), &mut memo).await
    });
}

fn schedule(
    interp: &Interpreter,
    args: CallArgs,
    repeat: bool,
) -> JsResult<Value> {
    let callback = args.arg(0);
    if !interp.is_callable(&callback) {
        return Err(interp.type_error(format!(
            "The \"callback\" argument must be of type function. Received {}",
            describe_value(&callback)
        )));
    }
    let delay = number_of(interp, &args.arg(1))?;
    let delay = if delay.is_finite() && delay > 0.0 { delay } else { 0.0 };
    let rest = args.args.iter().skip(2).cloned().collect();
    let id = interp.set_timer(callback, Duration::from_secs_f64(delay / 1000.0), rest, repeat);
    Ok(Value::Number(id as f64))
}

fn clear(
    interp: &Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let id = number_of(interp, &args.arg(0))?;
    if id.is_finite() && id >= 1.0 {
        interp.clear_timer(id as u64);
    }
    Ok(Value::Undefined)
}

fn encode_uri(
    text: &str,
    keep: &str,
) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || URI_UNRESERVED.contains(c) || keep.contains(c) {
            out.push(c);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Percent-decoding; escapes of characters in `keep` stay as written
fn decode_uri(
    text: &str,
    keep: &str,
) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let first = hex_byte(bytes, i)?;
        let width = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return None,
        };
        if width == 1 {
            if keep.contains(first as char) {
                out.extend_from_slice(&bytes[i..i + 3]);
            } else {
                out.push(first);
            }
            i += 3;
            continue;
        }
        let mut seq = vec![first];
        for k in 1..width {
            let byte = hex_byte(bytes, i + 3 * k)?;
            if byte & 0xC0 != 0x80 {
                return None;
            }
            seq.push(byte);
        }
        std::str::from_utf8(&seq).ok()?;
        out.extend_from_slice(&seq);
        i += 3 * width;
    }
    String::from_utf8(out).ok()
}

/// Value of the `%XX` escape at `at`
fn hex_byte(
    bytes: &[u8],
    at: usize,
) -> Option<u8> {
    if bytes.get(at) != Some(&b'%') {
        return None;
    }
    let digits = std::str::from_utf8(bytes.get(at + 1..at + 3)?).ok()?;
    u8::from_str_radix(digits, 16).ok()
}

/// Structured clone of `value`; `memo` maps source object ids to their copies
fn clone_value<'a>(
    interp: &'a Interpreter,
    value: Value,
    memo: &'a mut HashMap<usize, Obj>,
) -> BoxFuture<'a, JsResult<Value>> {
    Box::pin(async move {
        let obj = match &value {
            Value::Symbol(_) => {
                return Err(interp.type_error(format!("{} could not be cloned.", describe_value(&value))));
            }
            Value::Object(obj) => obj.clone(),
            _ => return Ok(value),
        };
        if let Some(copy) = memo.get(&obj.id()) {
            return Ok(Value::Object(copy.clone()));
        }
        if obj.is_callable() {
            return Err(interp.type_error(format!("{} could not be cloned.", describe_value(&value))));
        }

        let i = interp.intrinsics();
        let (proto, kind) = {
            let object = obj.lock();
            match &object.kind {
                ObjectKind::Ordinary => (i.object_proto.clone(), ObjectKind::Ordinary),
                ObjectKind::Array(_) => (i.array_proto.clone(), ObjectKind::Array(Vec::new())),
                ObjectKind::Date(t) => (i.date_proto.clone(), ObjectKind::Date(*t)),
                ObjectKind::RegExp(re) => (i.regexp_proto.clone(), ObjectKind::RegExp(re.clone())),
                ObjectKind::Boxed(v) => (
                    object.proto.clone().unwrap_or_else(|| i.object_proto.clone()),
                    ObjectKind::Boxed(v.clone()),
                ),
                ObjectKind::Error => (
                    object.proto.clone().unwrap_or_else(|| i.error_proto(ErrorKind::Error)),
                    ObjectKind::Error,
                ),
                ObjectKind::Map(_) => (i.map_proto.clone(), ObjectKind::Map(Default::default())),
                ObjectKind::Set(_) => (i.set_proto.clone(), ObjectKind::Set(Default::default())),
                ObjectKind::TypedArray(ta) => (
                    i.typed_array_proto(ta.kind),
                    ObjectKind::TypedArray(TypedArray {
                        kind: ta.kind,
                        elems: ta.elems.clone(),
                    }),
                ),
                _ => {
                    return Err(interp.throw(
                        ErrorKind::Error,
                        format!("{} could not be cloned.", describe_value(&value)),
                    ))
                }
            }
        };
        let copy = Obj::new(Object::new(Some(proto), kind));
        memo.insert(obj.id(), copy.clone());

        // collection contents
        let entries: Option<Vec<(Value, Value)>> = match &obj.lock().kind {
            ObjectKind::Map(map) => Some(map.values().cloned().collect()),
            ObjectKind::Set(set) => Some(set.values().map(|v| (v.clone(), Value::Undefined)).collect()),
            _ => None,
        };
        if let Some(entries) = entries {
            let mut cloned = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let k = clone_value(interp, k, memo).await?;
                let v = clone_value(interp, v, memo).await?;
                cloned.push((k, v));
            }
            match &mut copy.lock().kind {
                ObjectKind::Map(map) => {
                    for (k, v) in cloned {
                        map.insert(HashKey::of(&k), (k, v));
                    }
                }
                ObjectKind::Set(set) => {
                    for (k, _) in cloned {
                        set.insert(HashKey::of(&k), k);
                    }
                }
                _ => {}
            }
        }

        // error fields are own but not enumerable
        let mut keys = interp.own_enumerable_keys(&obj);
        if matches!(obj.lock().kind, ObjectKind::Error) {
            for name in ["message", "stack", "cause"] {
                let key = PropertyKey::from(name);
                if interp.has_own_property(&obj, &key) && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        let source = Value::Object(obj.clone());
        for key in keys {
            if matches!(key, PropertyKey::Symbol(_)) {
                continue;
            }
            let field = interp.get(&source, &key).await?;
            let field = clone_value(interp, field, memo).await?;
            interp.create_data_property(&copy, key, field);
        }
        Ok(Value::Object(copy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri("a b&c", ""), "a%20b%26c");
        assert_eq!(encode_uri("a b&c", URI_RESERVED), "a%20b&c");
        assert_eq!(encode_uri("ü", ""), "%C3%BC");
        assert_eq!(encode_uri("(x)!", ""), "(x)!");
    }

    #[test]
    fn test_decode_uri() {
        assert_eq!(decode_uri("a%20b%26c", "").as_deref(), Some("a b&c"));
        assert_eq!(decode_uri("a%20b%26c", URI_RESERVED).as_deref(), Some("a b%26c"));
        assert_eq!(decode_uri("%C3%BC", "").as_deref(), Some("ü"));
        assert_eq!(decode_uri("%E0%A4%A", ""), None);
        assert_eq!(decode_uri("%FF", ""), None);
        assert_eq!(decode_uri("%", ""), None);
    }
}
