//! `String` and `String.prototype`
//!
//! Indices are UTF-16 code units. Text is stored as UTF-8, so index-based
//! methods convert through `encode_utf16`; lone surrogates produced by
//! slicing inside a pair become U+FFFD.

use std::sync::Arc;

use super::regexp::{self, as_regexp, byte_to_utf16, expand_template, find_all, find_at, match_result, Match};
use super::{async_ctor, define_async, integer_arg, proto_for};
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::number::{is_js_whitespace, relative_index};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, PropertyKey, Value};

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().string_proto.clone();
    // String.prototype is itself a String wrapper for ""
    proto.lock().kind = ObjectKind::Boxed(Value::str(""));
    let ctor = interp.define_constructor("String", 1, async_ctor(string_ctor), &proto);

    interp.define_method(&ctor, "fromCharCode", 1, |interp, args: CallArgs| {
        let mut units = Vec::with_capacity(args.args.len());
        for v in &args.args {
            units.push(crate::runtime::value::number::to_uint32(super::number_of(interp, v)?) as u16);
        }
        Ok(Value::from(String::from_utf16_lossy(&units)))
    });
    interp.define_method(&ctor, "fromCodePoint", 1, |interp, args: CallArgs| {
        let mut out = String::new();
        for v in &args.args {
            let n = super::number_of(interp, v)?;
            let c = (n.fract() == 0.0 && (0.0..=1_114_111.0).contains(&n))
                .then(|| char::from_u32(n as u32).unwrap_or('\u{FFFD}'))
                .ok_or_else(|| interp.range_error(format!("Invalid code point {}", n)))?;
            out.push(c);
        }
        Ok(Value::from(out))
    });
    define_async(interp, &ctor, "raw", 1, string_raw);

    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| Ok(Value::String(this_string(interp, &args.this)?)));
    interp.define_method(&proto, "valueOf", 0, |interp, args: CallArgs| Ok(Value::String(this_string(interp, &args.this)?)));

    define_async(interp, &proto, "charAt", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let i = integer_arg(&interp, &args, 0, 0.0)?;
        let unit = (i >= 0.0).then(|| s.encode_utf16().nth(i as usize)).flatten();
        Ok(Value::from(unit.map(|u| String::from_utf16_lossy(&[u])).unwrap_or_default()))
    });
    define_async(interp, &proto, "charCodeAt", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let i = integer_arg(&interp, &args, 0, 0.0)?;
        let unit = (i >= 0.0).then(|| s.encode_utf16().nth(i as usize)).flatten();
        Ok(Value::Number(unit.map(|u| u as f64).unwrap_or(f64::NAN)))
    });
    define_async(interp, &proto, "codePointAt", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let i = integer_arg(&interp, &args, 0, 0.0)?;
        if i < 0.0 {
            return Ok(Value::Undefined);
        }
        let units: Vec<u16> = s.encode_utf16().collect();
        let Some(&first) = units.get(i as usize) else {
            return Ok(Value::Undefined);
        };
        let code = match units.get(i as usize + 1) {
            Some(&second) if (0xD800..0xDC00).contains(&first) && (0xDC00..0xE000).contains(&second) => {
                0x10000 + ((first as u32 - 0xD800) << 10) + (second as u32 - 0xDC00)
            }
            _ => first as u32,
        };
        Ok(Value::Number(code as f64))
    });
    define_async(interp, &proto, "at", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let rel = integer_arg(&interp, &args, 0, 0.0)?;
        let index = if rel < 0.0 { units.len() as f64 + rel } else { rel };
        if index < 0.0 {
            return Ok(Value::Undefined);
        }
        Ok(units
            .get(index as usize)
            .map(|u| Value::from(String::from_utf16_lossy(&[*u])))
            .unwrap_or_default())
    });
    define_async(interp, &proto, "indexOf", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let needle = interp.to_string(&args.arg(0)).await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let from = integer_arg(&interp, &args, 1, 0.0)?.clamp(0.0, units.len() as f64) as usize;
        Ok(Value::Number(index_of_units(&units, &utf16(&needle), from).map(|i| i as f64).unwrap_or(-1.0)))
    });
    define_async(interp, &proto, "lastIndexOf", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let needle = utf16(&interp.to_string(&args.arg(0)).await?);
        let units: Vec<u16> = s.encode_utf16().collect();
        let from = match args.arg(1) {
            Value::Undefined => units.len() as f64,
            v => {
                let n = interp.to_number(&v).await?;
                if n.is_nan() { units.len() as f64 } else { n.trunc() }
            }
        };
        let max_start = (from.max(0.0) as usize).min(units.len().saturating_sub(needle.len()));
        if needle.len() > units.len() {
            return Ok(Value::Number(-1.0));
        }
        let found = (0..=max_start).rev().find(|&i| units[i..i + needle.len()] == needle[..]);
        Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
    });
    define_async(interp, &proto, "includes", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let needle = no_regexp(&interp, &args.arg(0), "includes").await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let from = integer_arg(&interp, &args, 1, 0.0)?.clamp(0.0, units.len() as f64) as usize;
        Ok(Value::Bool(index_of_units(&units, &utf16(&needle), from).is_some()))
    });
    define_async(interp, &proto, "startsWith", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let needle = utf16(&no_regexp(&interp, &args.arg(0), "startsWith").await?);
        let units: Vec<u16> = s.encode_utf16().collect();
        let start = integer_arg(&interp, &args, 1, 0.0)?.clamp(0.0, units.len() as f64) as usize;
        Ok(Value::Bool(units[start..].starts_with(&needle)))
    });
    define_async(interp, &proto, "endsWith", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let needle = utf16(&no_regexp(&interp, &args.arg(0), "endsWith").await?);
        let units: Vec<u16> = s.encode_utf16().collect();
        let end = integer_arg(&interp, &args, 1, units.len() as f64)?.clamp(0.0, units.len() as f64) as usize;
        Ok(Value::Bool(units[..end].ends_with(&needle)))
    });
    define_async(interp, &proto, "slice", 2, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let len = units.len();
        let start = relative_index(integer_arg(&interp, &args, 0, 0.0)?, len);
        let end = relative_index(integer_arg(&interp, &args, 1, len as f64)?, len);
        Ok(Value::from(from_units(&units, start, end)))
    });
    define_async(interp, &proto, "substring", 2, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let len = units.len() as f64;
        let a = integer_arg(&interp, &args, 0, 0.0)?.clamp(0.0, len) as usize;
        let b = integer_arg(&interp, &args, 1, len)?.clamp(0.0, len) as usize;
        Ok(Value::from(from_units(&units, a.min(b), a.max(b))))
    });
    define_async(interp, &proto, "substr", 2, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let units: Vec<u16> = s.encode_utf16().collect();
        let len = units.len();
        let start = relative_index(integer_arg(&interp, &args, 0, 0.0)?, len);
        let count = integer_arg(&interp, &args, 1, len as f64)?.clamp(0.0, (len - start) as f64) as usize;
        Ok(Value::from(from_units(&units, start, start + count)))
    });
    define_async(interp, &proto, "toUpperCase", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::from(coerce_this(&interp, &args).await?.to_uppercase()))
    });
    define_async(interp, &proto, "toLowerCase", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::from(coerce_this(&interp, &args).await?.to_lowercase()))
    });
    define_async(interp, &proto, "toLocaleUpperCase", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::from(coerce_this(&interp, &args).await?.to_uppercase()))
    });
    define_async(interp, &proto, "toLocaleLowerCase", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::from(coerce_this(&interp, &args).await?.to_lowercase()))
    });
    define_async(interp, &proto, "trim", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::str(coerce_this(&interp, &args).await?.trim_matches(is_js_whitespace)))
    });
    define_async(interp, &proto, "trimStart", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::str(coerce_this(&interp, &args).await?.trim_start_matches(is_js_whitespace)))
    });
    define_async(interp, &proto, "trimEnd", 0, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::str(coerce_this(&interp, &args).await?.trim_end_matches(is_js_whitespace)))
    });
    define_async(interp, &proto, "padStart", 2, |interp, args| pad(interp, args, true));
    define_async(interp, &proto, "padEnd", 2, |interp, args| pad(interp, args, false));
    define_async(interp, &proto, "repeat", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let count = integer_arg(&interp, &args, 0, 0.0)?;
        if count < 0.0 || count.is_infinite() {
            return Err(interp.range_error(format!("Invalid count value: {}", count)));
        }
        if s.len() as f64 * count > (1u64 << 29) as f64 {
            return Err(interp.range_error("Invalid string length"));
        }
        Ok(Value::from(s.repeat(count as usize)))
    });
    define_async(interp, &proto, "concat", 1, |interp: Interpreter, args: CallArgs| async move {
        let mut out = coerce_this(&interp, &args).await?.to_string();
        for v in &args.args {
            out.push_str(&interp.to_string(v).await?);
        }
        Ok(Value::from(out))
    });
    define_async(interp, &proto, "localeCompare", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let other = interp.to_string(&args.arg(0)).await?;
        Ok(Value::Number(match s.as_ref().cmp(other.as_ref()) {
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Greater => 1.0,
        }))
    });
    define_async(interp, &proto, "normalize", 0, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        match args.arg(0) {
            Value::Undefined => {}
            v => {
                let form = interp.to_string(&v).await?;
                if !matches!(&*form, "NFC" | "NFD" | "NFKC" | "NFKD") {
                    return Err(interp.range_error("The normalization form should be one of NFC, NFD, NFKC, NFKD."));
                }
            }
        }
        // text is kept as written; sources are expected to be NFC already
        Ok(Value::String(s))
    });
    define_async(interp, &proto, "isWellFormed", 0, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        Ok(Value::Bool(!s.contains('\u{FFFD}')))
    });
    define_async(interp, &proto, "split", 2, split);
    define_async(interp, &proto, "replace", 2, |interp, args| replace(interp, args, false));
    define_async(interp, &proto, "replaceAll", 2, |interp, args| replace(interp, args, true));
    define_async(interp, &proto, "match", 1, string_match);
    define_async(interp, &proto, "matchAll", 1, match_all);
    define_async(interp, &proto, "search", 1, |interp: Interpreter, args: CallArgs| async move {
        let s = coerce_this(&interp, &args).await?;
        let (_, data) = to_regexp(&interp, &args.arg(0), "").await?;
        Ok(Value::Number(
            find_at(&data, &s, 0)
                .map(|m| byte_to_utf16(&s, m.start) as f64)
                .unwrap_or(-1.0),
        ))
    });

    let iterator = interp.native_fn("[Symbol.iterator]", 0, |interp, args: CallArgs| {
        let s = this_string(interp, &args.this)?;
        let items = s.chars().map(|c| Value::from(c.to_string())).collect();
        Ok(Value::Object(interp.list_iterator("String Iterator", items)))
    });
    interp.define_symbol_method(&proto, interp.intrinsics().symbols.iterator.clone(), iterator);
}

async fn string_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let s: Arc<str> = match args.args.first() {
        None => Arc::from(""),
        Some(Value::Symbol(sym)) if args.new_target.is_none() => {
            Arc::from(format!("Symbol({})", sym.description().unwrap_or("")))
        }
        Some(v) => interp.to_string(v).await?,
    };
    match &args.new_target {
        None => Ok(Value::String(s)),
        Some(target) => {
            let proto = proto_for(&interp, Some(target), &interp.intrinsics().string_proto);
            Ok(Value::Object(Obj::new(Object::new(Some(proto), ObjectKind::Boxed(Value::String(s))))))
        }
    }
}

async fn string_raw(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let strings = args.arg(0);
    let raw = interp.get_named(&strings, "raw").await?;
    let parts = super::function::array_like_to_vec(&interp, &raw).await?;
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        out.push_str(&interp.to_string(part).await?);
        if i + 1 < parts.len() {
            if let Some(sub) = args.args.get(i + 1) {
                out.push_str(&interp.to_string(sub).await?);
            }
        }
    }
    Ok(Value::from(out))
}

fn this_string(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Arc<str>> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Boxed(Value::String(s)) => Ok(s.clone()),
            _ => Err(interp.type_error("String.prototype.valueOf requires that 'this' be a String")),
        },
        _ => Err(interp.type_error("String.prototype.valueOf requires that 'this' be a String")),
    }
}

/// `RequireObjectCoercible(this)` then `ToString`
async fn coerce_this(
    interp: &Interpreter,
    args: &CallArgs,
) -> JsResult<Arc<str>> {
    match &args.this {
        Value::String(s) => Ok(s.clone()),
        Value::Undefined | Value::Null => {
            Err(interp.type_error("String.prototype method called on null or undefined"))
        }
        v => interp.to_string(v).await,
    }
}

async fn no_regexp(
    interp: &Interpreter,
    value: &Value,
    method: &str,
) -> JsResult<Arc<str>> {
    if as_regexp(value).is_some() {
        return Err(interp.type_error(format!(
            "First argument to String.prototype.{} must not be a regular expression",
            method
        )));
    }
    interp.to_string(value).await
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(
    units: &[u16],
    start: usize,
    end: usize,
) -> String {
    if start >= end {
        return String::new();
    }
    String::from_utf16_lossy(&units[start..end])
}

fn index_of_units(
    haystack: &[u16],
    needle: &[u16],
    from: usize,
) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

async fn pad(
    interp: Interpreter,
    args: CallArgs,
    at_start: bool,
) -> JsResult<Value> {
    let s = coerce_this(&interp, &args).await?;
    let target = integer_arg(&interp, &args, 0, 0.0)?;
    let filler = match args.arg(1) {
        Value::Undefined => Arc::from(" "),
        v => interp.to_string(&v).await?,
    };
    let len = s.encode_utf16().count();
    if target <= len as f64 || filler.is_empty() {
        return Ok(Value::String(s));
    }
    let fill_units: Vec<u16> = filler.encode_utf16().collect();
    let needed = target as usize - len;
    let padding: Vec<u16> = fill_units.iter().copied().cycle().take(needed).collect();
    let padding = String::from_utf16_lossy(&padding);
    Ok(Value::from(if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }))
}

/// Regular expression for a `match`/`search` argument
async fn to_regexp(
    interp: &Interpreter,
    value: &Value,
    flags: &str,
) -> JsResult<(Obj, Arc<crate::runtime::value::RegExpData>)> {
    if let Some(found) = as_regexp(value) {
        return Ok(found);
    }
    let source = match value {
        Value::Undefined => Arc::from("(?:)"),
        v => interp.to_string(v).await?,
    };
    let obj = regexp::new_regexp(interp, &source, flags)?;
    let data = regexp::data_of(&obj).ok_or_else(|| interp.type_error("invalid regular expression"))?;
    Ok((obj, data))
}

async fn split(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let s = coerce_this(&interp, &args).await?;
    let limit = match args.arg(1) {
        Value::Undefined => u32::MAX as usize,
        v => crate::runtime::value::number::to_uint32(interp.to_number(&v).await?) as usize,
    };
    let separator = args.arg(0);
    let mut parts: Vec<Value> = Vec::new();
    if let Some((_, data)) = as_regexp(&separator) {
        if s.is_empty() {
            if find_at(&data, &s, 0).is_none() {
                parts.push(Value::String(s.clone()));
            }
        } else {
            let mut last = 0;
            for m in find_all(&data, &s) {
                // an empty match where the previous piece ended never splits
                if m.start >= s.len() || (m.end == m.start && m.start == last) {
                    continue;
                }
                parts.push(Value::str(&s[last..m.start]));
                for i in 0..m.groups.len() {
                    parts.push(m.group(&s, i).map(Value::str).unwrap_or_default());
                }
                last = m.end;
            }
            parts.push(Value::str(&s[last..]));
        }
    } else if separator.is_undefined() {
        parts.push(Value::String(s.clone()));
    } else {
        let sep = interp.to_string(&separator).await?;
        if sep.is_empty() {
            parts = s
                .encode_utf16()
                .map(|u| Value::from(String::from_utf16_lossy(&[u])))
                .collect();
        } else {
            parts = s.split(sep.as_ref()).map(Value::str).collect();
        }
    }
    parts.truncate(limit);
    Ok(Value::Object(interp.new_array(parts)))
}

/// Replacement text for one match, calling a replacer function if given
async fn replacement(
    interp: &Interpreter,
    replacer: &Value,
    template: &Option<Arc<str>>,
    subject: &str,
    m: &Match,
) -> JsResult<String> {
    if let Some(template) = template {
        return Ok(expand_template(template, subject, m));
    }
    let mut call_args = vec![Value::str(m.text(subject))];
    for i in 0..m.groups.len() {
        call_args.push(m.group(subject, i).map(Value::str).unwrap_or_default());
    }
    call_args.push(Value::Number(byte_to_utf16(subject, m.start) as f64));
    call_args.push(Value::str(subject));
    if m.has_names() {
        if let Value::Object(result) = match_result(interp, subject, m) {
            let groups = interp.get_data(&Value::Object(result), &PropertyKey::from("groups"));
            call_args.push(groups.unwrap_or_default());
        }
    }
    let out = interp.call(replacer, Value::Undefined, call_args).await?;
    Ok(interp.to_string(&out).await?.to_string())
}

async fn replace(
    interp: Interpreter,
    args: CallArgs,
    all: bool,
) -> JsResult<Value> {
    let s = coerce_this(&interp, &args).await?;
    let pattern = args.arg(0);
    let replacer = args.arg(1);
    let template = if interp.is_callable(&replacer) {
        None
    } else {
        Some(interp.to_string(&replacer).await?)
    };

    let matches: Vec<Match> = match as_regexp(&pattern) {
        Some((obj, data)) => {
            if all && !data.global() {
                return Err(interp.type_error("replaceAll must be called with a global RegExp"));
            }
            if data.global() {
                if let Some(prop) = obj.lock().props.get_mut(&PropertyKey::from("lastIndex")) {
                    prop.slot = crate::runtime::value::Slot::Data(Value::Number(0.0));
                }
                find_all(&data, &s)
            } else {
                let start = if data.sticky() {
                    match interp.get_data(&pattern, &PropertyKey::from("lastIndex")) {
                        Some(Value::Number(n)) => regexp::utf16_to_byte(&s, n.max(0.0) as usize),
                        _ => 0,
                    }
                } else {
                    0
                };
                find_at(&data, &s, start).into_iter().collect()
            }
        }
        None => {
            let needle = interp.to_string(&pattern).await?;
            literal_matches(&s, &needle, all)
        }
    };

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in &matches {
        out.push_str(&s[last..m.start]);
        out.push_str(&replacement(&interp, &replacer, &template, &s, m).await?);
        last = m.end;
    }
    out.push_str(&s[last..]);
    Ok(Value::from(out))
}

/// Occurrences of a literal needle as matches without groups
fn literal_matches(
    s: &str,
    needle: &str,
    all: bool,
) -> Vec<Match> {
    let at = |start: usize| Match {
        start,
        end: start + needle.len(),
        groups: Vec::new(),
        names: Vec::new(),
    };
    if !all {
        return s.find(needle).map(at).into_iter().collect();
    }
    if needle.is_empty() {
        let mut starts: Vec<usize> = s.char_indices().map(|(i, _)| i).collect();
        starts.push(s.len());
        return starts.into_iter().map(at).collect();
    }
    s.match_indices(needle).map(|(i, _)| at(i)).collect()
}

async fn string_match(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let s = coerce_this(&interp, &args).await?;
    let (obj, data) = to_regexp(&interp, &args.arg(0), "").await?;
    if !data.global() {
        return regexp::exec(&interp, &obj, &s);
    }
    let found = find_all(&data, &s);
    if let Some(prop) = obj.lock().props.get_mut(&PropertyKey::from("lastIndex")) {
        prop.slot = crate::runtime::value::Slot::Data(Value::Number(0.0));
    }
    if found.is_empty() {
        return Ok(Value::Null);
    }
    let items = found.iter().map(|m| Value::str(m.text(&s))).collect();
    Ok(Value::Object(interp.new_array(items)))
}

async fn match_all(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let s = coerce_this(&interp, &args).await?;
    let (_, data) = to_regexp(&interp, &args.arg(0), "g").await?;
    if !data.global() {
        return Err(interp.type_error("String.prototype.matchAll called with a non-global RegExp argument"));
    }
    let results = find_all(&data, &s)
        .iter()
        .map(|m| match_result(&interp, &s, m))
        .collect();
    Ok(Value::Object(interp.list_iterator("RegExp String Iterator", results)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_units() {
        let hay = utf16("hello world");
        assert_eq!(index_of_units(&hay, &utf16("o"), 0), Some(4));
        assert_eq!(index_of_units(&hay, &utf16("o"), 5), Some(7));
        assert_eq!(index_of_units(&hay, &utf16(""), 3), Some(3));
        assert_eq!(index_of_units(&hay, &utf16("xyz"), 0), None);
    }

    #[test]
    fn test_literal_matches() {
        let found: Vec<usize> = literal_matches("a-b-c", "-", true).iter().map(|m| m.start).collect();
        assert_eq!(found, vec![1, 3]);
        assert_eq!(literal_matches("a-b-c", "-", false).len(), 1);
        assert_eq!(literal_matches("ab", "", true).len(), 3);
    }
}
