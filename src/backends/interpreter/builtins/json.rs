//! `JSON`
//!
//! Parsing goes through `serde_json` with `preserve_order`, so object keys
//! keep their source order. Serialization is done by hand because it has to
//! call `toJSON`, getters and the replacer.

use super::{async_fn, define_async};
use crate::backends::interpreter::{BoxFuture, Interpreter, JsResult};
use crate::runtime::value::number::number_to_string;
use crate::runtime::value::{CallArgs, Obj, ObjectKind, Property, PropertyKey, Value};

pub(crate) fn install(interp: &Interpreter) {
    let json = interp.new_object();
    json.lock().define(
        PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::constant(Value::str("JSON")),
    );

    define_async(interp, &json, "parse", 2, |interp: Interpreter, args: CallArgs| async move {
        let text = interp.to_string(&args.arg(0)).await?;
        let value = parse_json(&interp, &text)?;
        let reviver = args.arg(1);
        if !interp.is_callable(&reviver) {
            return Ok(value);
        }
        let root = interp.new_object();
        interp.create_data_property(&root, "", value);
        internalize(&interp, &root, PropertyKey::from(""), &reviver).await
    });
    let stringify = async_fn(interp, "stringify", 3, |interp: Interpreter, args: CallArgs| async move {
        let out = stringify_with(&interp, args.arg(0), args.arg(1), args.arg(2)).await?;
        Ok(out.map(Value::from).unwrap_or_default())
    });
    json.lock().define("stringify", Property::hidden(Value::Object(stringify)));

    interp.define_global("JSON", Value::Object(json));
}

/// `JSON.parse` without a reviver
pub fn parse_json(
    interp: &Interpreter,
    text: &str,
) -> JsResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| interp.syntax_error(format!("Unexpected token in JSON: {}", e)))?;
    Ok(from_json(interp, &parsed))
}

/// Convert a parsed JSON document into interpreter values
pub(crate) fn from_json(
    interp: &Interpreter,
    json: &serde_json::Value,
) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => {
            let items = items.iter().map(|item| from_json(interp, item)).collect();
            Value::Object(interp.new_array(items))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.new_object();
            for (key, value) in map {
                let value = from_json(interp, value);
                interp.create_data_property(&obj, key.as_str(), value);
            }
            Value::Object(obj)
        }
    }
}

fn internalize<'a>(
    interp: &'a Interpreter,
    holder: &'a Obj,
    key: PropertyKey,
    reviver: &'a Value,
) -> BoxFuture<'a, JsResult<Value>> {
    Box::pin(async move {
        let holder_value = Value::Object(holder.clone());
        let value = interp.get(&holder_value, &key).await?;
        if let Value::Object(obj) = &value {
            let keys: Vec<PropertyKey> = if obj.is_array() {
                let len = interp.length_of(&interp.get_named(&value, "length").await?);
                (0..len).map(PropertyKey::from).collect()
            } else {
                interp
                    .own_enumerable_keys(obj)
                    .into_iter()
                    .filter(|k| !matches!(k, PropertyKey::Symbol(_)))
                    .collect()
            };
            for k in keys {
                let revived = internalize(interp, obj, k.clone(), reviver).await?;
                if revived.is_undefined() {
                    interp.delete_property(obj, &k)?;
                } else {
                    interp.create_data_property(obj, k, revived);
                }
            }
        }
        interp.call(reviver, holder_value, vec![key.to_value(), value]).await
    })
}

/// `JSON.stringify(value, replacer, space)`; `None` when nothing is serializable
pub(crate) async fn stringify_with(
    interp: &Interpreter,
    value: Value,
    replacer: Value,
    space: Value,
) -> JsResult<Option<String>> {
    let mut serializer = Serializer {
        interp,
        replacer: None,
        allow: None,
        gap: String::new(),
        stack: Vec::new(),
    };
    if interp.is_callable(&replacer) {
        serializer.replacer = Some(replacer);
    } else if let Value::Object(list) = &replacer {
        if list.is_array() {
            let mut allow: Vec<PropertyKey> = Vec::new();
            for item in interp.iterate_to_vec(&replacer).await? {
                let item = match &item {
                    Value::Object(o) => match &o.lock().kind {
                        ObjectKind::Boxed(inner @ (Value::String(_) | Value::Number(_))) => inner.clone(),
                        _ => continue,
                    },
                    v => v.clone(),
                };
                let key = match item {
                    Value::String(s) => PropertyKey::from(s),
                    Value::Number(n) => PropertyKey::from(number_to_string(n)),
                    _ => continue,
                };
                if !allow.contains(&key) {
                    allow.push(key);
                }
            }
            serializer.allow = Some(allow);
        }
    }

    let space = match &space {
        Value::Object(o) => match &o.lock().kind {
            ObjectKind::Boxed(inner) => inner.clone(),
            _ => space.clone(),
        },
        v => v.clone(),
    };
    serializer.gap = match space {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let wrapper = interp.new_object();
    interp.create_data_property(&wrapper, "", value);
    serializer.property(Value::Object(wrapper), PropertyKey::from(""), String::new()).await
}

struct Serializer<'i> {
    interp: &'i Interpreter,
    replacer: Option<Value>,
    allow: Option<Vec<PropertyKey>>,
    gap: String,
    /// Objects being serialized, for cycle detection
    stack: Vec<Obj>,
}

impl<'i> Serializer<'i> {
    fn property<'a>(
        &'a mut self,
        holder: Value,
        key: PropertyKey,
        indent: String,
    ) -> BoxFuture<'a, JsResult<Option<String>>>
    where
        'i: 'a,
    {
        Box::pin(async move {
            let interp = self.interp;
            let mut value = interp.get(&holder, &key).await?;
            if matches!(value, Value::Object(_) | Value::BigInt(_)) {
                let to_json = interp.get_named(&value, "toJSON").await?;
                if interp.is_callable(&to_json) {
                    value = interp.call(&to_json, value, vec![key.to_value()]).await?;
                }
            }
            if let Some(replacer) = &self.replacer {
                value = interp.call(replacer, holder, vec![key.to_value(), value]).await?;
            }
            if let Value::Object(obj) = &value {
                let inner = match &obj.lock().kind {
                    ObjectKind::Boxed(inner) => Some(inner.clone()),
                    _ => None,
                };
                value = match inner {
                    Some(Value::Number(_)) => Value::Number(interp.to_number(&value).await?),
                    Some(Value::String(_)) => Value::String(interp.to_string(&value).await?),
                    Some(inner @ (Value::Bool(_) | Value::BigInt(_))) => inner,
                    _ => value,
                };
            }
            match &value {
                Value::Null => Ok(Some("null".into())),
                Value::Bool(b) => Ok(Some(b.to_string())),
                Value::String(s) => Ok(Some(quote(s))),
                Value::Number(n) if n.is_finite() => Ok(Some(number_to_string(*n))),
                Value::Number(_) => Ok(Some("null".into())),
                Value::BigInt(_) => Err(interp.type_error("Do not know how to serialize a BigInt")),
                Value::Object(obj) if !obj.is_callable() => {
                    if self.stack.iter().any(|o| o.ptr_eq(obj)) {
                        return Err(interp.type_error("Converting circular structure to JSON"));
                    }
                    self.stack.push(obj.clone());
                    let result = if obj.is_array() {
                        self.array(obj, &indent).await
                    } else {
                        self.object(obj, &indent).await
                    };
                    self.stack.pop();
                    result.map(Some)
                }
                _ => Ok(None),
            }
        })
    }

    async fn object(
        &mut self,
        obj: &Obj,
        indent: &str,
    ) -> JsResult<String> {
        let inner = format!("{}{}", indent, self.gap);
        let keys = match &self.allow {
            Some(keys) => keys.clone(),
            None => self
                .interp
                .own_enumerable_keys(obj)
                .into_iter()
                .filter(|k| !matches!(k, PropertyKey::Symbol(_)))
                .collect(),
        };
        let holder = Value::Object(obj.clone());
        let mut members = Vec::new();
        for key in keys {
            let name = quote(&key.to_string());
            if let Some(text) = self.property(holder.clone(), key, inner.clone()).await? {
                let colon = if self.gap.is_empty() { ":" } else { ": " };
                members.push(format!("{}{}{}", name, colon, text));
            }
        }
        Ok(self.wrap('{', '}', members, indent, &inner))
    }

    async fn array(
        &mut self,
        obj: &Obj,
        indent: &str,
    ) -> JsResult<String> {
        let inner = format!("{}{}", indent, self.gap);
        let holder = Value::Object(obj.clone());
        let len = self
            .interp
            .length_of(&self.interp.get_named(&holder, "length").await?);
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let text = self.property(holder.clone(), PropertyKey::from(i), inner.clone()).await?;
            items.push(text.unwrap_or_else(|| "null".into()));
        }
        Ok(self.wrap('[', ']', items, indent, &inner))
    }

    fn wrap(
        &self,
        open: char,
        close: char,
        items: Vec<String>,
        indent: &str,
        inner: &str,
    ) -> String {
        if items.is_empty() {
            return format!("{}{}", open, close);
        }
        if self.gap.is_empty() {
            return format!("{}{}{}", open, items.join(","), close);
        }
        let separator = format!(",\n{}", inner);
        format!("{}\n{}{}\n{}{}", open, inner, items.join(&separator), indent, close)
    }
}

/// JSON string literal for `s`
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("a\"b"), r#""a\"b""#);
        assert_eq!(quote("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(quote("\u{01}"), r#""\u0001""#);
        assert_eq!(quote("ü"), "\"ü\"");
    }
}
