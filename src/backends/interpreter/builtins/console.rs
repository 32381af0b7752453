//! `console` and value inspection
//!
//! Output from evaluated code goes through `tracing` under the `console`
//! target, so it interleaves with the build log and follows its filter.

use super::date::iso_string;
use super::number_of;
use crate::backends::interpreter::Interpreter;
use crate::runtime::value::number::number_to_string;
use crate::runtime::value::{CallArgs, Callable, Obj, ObjectKind, PromiseState, Property, PropertyKey, Slot, Value};

/// Nesting below which objects print as `[Object]`
const MAX_DEPTH: usize = 2;

/// Array and collection entries printed before `... n more items`
const MAX_ITEMS: usize = 100;

/// Width beyond which an object breaks over several lines
const LINE_WIDTH: usize = 72;

#[derive(Clone, Copy)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

pub(crate) fn install(interp: &Interpreter) {
    let console = interp.new_object();
    let levels = [
        ("log", Level::Info),
        ("info", Level::Info),
        ("debug", Level::Debug),
        ("trace", Level::Debug),
        ("warn", Level::Warn),
        ("error", Level::Error),
    ];
    for (name, level) in levels {
        interp.define_method(&console, name, 0, move |interp, args: CallArgs| {
            emit(level, &format_args(interp, &args.args));
            Ok(Value::Undefined)
        });
    }
    interp.define_method(&console, "dir", 1, |interp, args: CallArgs| {
        emit(Level::Info, &inspect(interp, &args.arg(0)));
        Ok(Value::Undefined)
    });
    interp.define_method(&console, "assert", 0, |interp, args: CallArgs| {
        if !args.arg(0).to_boolean() {
            let rest = args.args.get(1..).unwrap_or_default();
            let message = format_args(interp, rest);
            if message.is_empty() {
                emit(Level::Error, "Assertion failed");
            } else {
                emit(Level::Error, &format!("Assertion failed: {}", message));
            }
        }
        Ok(Value::Undefined)
    });
    interp.define_global("console", Value::Object(console));
}

fn emit(
    level: Level,
    line: &str,
) {
    match level {
        Level::Debug => tracing::debug!(target: "console", "{}", line),
        Level::Info => tracing::info!(target: "console", "{}", line),
        Level::Warn => tracing::warn!(target: "console", "{}", line),
        Level::Error => tracing::error!(target: "console", "{}", line),
    }
}

/// `console.log` argument formatting, including `%s`-style substitutions
pub fn format_args(
    interp: &Interpreter,
    args: &[Value],
) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut rest = args.iter();
    if let Some(Value::String(first)) = args.first() {
        rest.next();
        let mut out = String::new();
        let mut chars = first.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let Some(&spec) = chars.peek() else {
                out.push(c);
                break;
            };
            if spec == '%' {
                chars.next();
                out.push('%');
                continue;
            }
            if !"sdifjoOc".contains(spec) {
                out.push(c);
                continue;
            }
            let Some(arg) = rest.next() else {
                out.push(c);
                continue;
            };
            chars.next();
            match spec {
                's' => match arg {
                    Value::String(s) => out.push_str(s),
                    v => out.push_str(&inspect_nested(interp, v)),
                },
                'd' | 'i' => {
                    let n = match arg {
                        Value::BigInt(b) => {
                            out.push_str(&format!("{}n", b));
                            continue;
                        }
                        v => number_of(interp, v).unwrap_or(f64::NAN),
                    };
                    let n = if spec == 'i' { n.trunc() } else { n };
                    out.push_str(&number_text(n));
                }
                'f' => out.push_str(&number_text(number_of(interp, arg).unwrap_or(f64::NAN))),
                'c' => {}
                _ => out.push_str(&inspect_nested(interp, arg)),
            }
        }
        parts.push(out);
    }
    for arg in rest {
        parts.push(inspect(interp, arg));
    }
    parts.join(" ")
}

/// Human-readable rendering of a value; top-level strings print unquoted
pub fn inspect(
    interp: &Interpreter,
    value: &Value,
) -> String {
    match value {
        Value::String(s) => s.to_string(),
        v => inspect_nested(interp, v),
    }
}

fn inspect_nested(
    interp: &Interpreter,
    value: &Value,
) -> String {
    let mut inspector = Inspector {
        interp,
        seen: Vec::new(),
    };
    inspector.value(value, 0)
}

fn number_text(n: f64) -> String {
    if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else {
        number_to_string(n)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn key_text(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Symbol(s) => format!("[{:?}]", s),
        k => {
            let name = k.to_string();
            let ident = name
                .chars()
                .next()
                .is_some_and(|c| c == '_' || c == '$' || unicode_ident::is_xid_start(c))
                && name.chars().all(|c| c == '_' || c == '$' || unicode_ident::is_xid_continue(c));
            if ident {
                name
            } else {
                quote(&name)
            }
        }
    }
}

struct Inspector<'i> {
    interp: &'i Interpreter,
    /// Objects on the current path, for cycle detection
    seen: Vec<Obj>,
}

impl Inspector<'_> {
    fn value(
        &mut self,
        value: &Value,
        depth: usize,
    ) -> String {
        match value {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_text(*n),
            Value::BigInt(b) => format!("{}n", b),
            Value::String(s) => quote(s),
            Value::Symbol(s) => format!("{:?}", s),
            Value::Object(obj) => {
                if self.seen.iter().any(|o| o.ptr_eq(obj)) {
                    return "[Circular]".into();
                }
                self.seen.push(obj.clone());
                let text = self.object(obj, depth);
                self.seen.pop();
                text
            }
        }
    }

    fn object(
        &mut self,
        obj: &Obj,
        depth: usize,
    ) -> String {
        enum Shape {
            Plain,
            Function(bool),
            Error,
            Leaf(String),
            Array(Vec<Value>),
            Typed(&'static str, Vec<Value>),
            Map(Vec<(Value, Value)>),
            Set(Vec<Value>),
            Promise(Option<(bool, Value)>),
            Weak(&'static str),
        }

        let shape = match &obj.lock().kind {
            ObjectKind::Function(callable) => Shape::Function(matches!(callable, Callable::Class(_))),
            ObjectKind::Error => Shape::Error,
            ObjectKind::Date(t) if t.is_nan() => Shape::Leaf("Invalid Date".into()),
            ObjectKind::Date(t) => Shape::Leaf(iso_string(*t)),
            ObjectKind::RegExp(re) => Shape::Leaf(format!("/{}/{}", re.source, re.flags)),
            ObjectKind::Boxed(inner) => {
                let (tag, text) = match inner {
                    Value::String(s) => ("String", quote(s)),
                    Value::Number(n) => ("Number", number_text(*n)),
                    Value::Bool(b) => ("Boolean", b.to_string()),
                    Value::BigInt(b) => ("BigInt", format!("{}n", b)),
                    Value::Symbol(s) => ("Symbol", format!("{:?}", s)),
                    _ => ("Object", String::new()),
                };
                Shape::Leaf(format!("[{}: {}]", tag, text))
            }
            ObjectKind::Generator(_) => Shape::Leaf("Object [Generator] {}".into()),
            ObjectKind::Array(items) => Shape::Array(items.clone()),
            ObjectKind::TypedArray(ta) => Shape::Typed(ta.kind.name(), ta.elems.clone()),
            ObjectKind::Map(map) => Shape::Map(map.values().cloned().collect()),
            ObjectKind::Set(set) => Shape::Set(set.values().cloned().collect()),
            ObjectKind::WeakMap(_) => Shape::Weak("WeakMap"),
            ObjectKind::WeakSet(_) => Shape::Weak("WeakSet"),
            ObjectKind::Promise(state) => Shape::Promise(match state {
                PromiseState::Pending(_) => None,
                PromiseState::Fulfilled(v) => Some((false, v.clone())),
                PromiseState::Rejected(v) => Some((true, v.clone())),
            }),
            ObjectKind::Ordinary => Shape::Plain,
        };
        match shape {
            Shape::Function(is_class) => {
                let name = self.interp.function_name(obj);
                return match (is_class, name.is_empty()) {
                    (true, true) => "[class (anonymous)]".into(),
                    (true, false) => format!("[class {}]", name),
                    (false, true) => "[Function (anonymous)]".into(),
                    (false, false) => format!("[Function: {}]", name),
                };
            }
            Shape::Error => return self.error(obj),
            Shape::Leaf(text) => return text,
            _ => {}
        }

        let class = self.constructor_name(obj);
        if depth > MAX_DEPTH {
            return match shape {
                Shape::Array(_) => "[Array]".into(),
                _ => format!("[{}]", class.unwrap_or_else(|| "Object".into())),
            };
        }

        let (prefix, mut items, brackets) = match shape {
            Shape::Array(values) => {
                let prefix = match class.as_deref() {
                    Some("Array") | None => String::new(),
                    Some(name) => format!("{}({}) ", name, values.len()),
                };
                (prefix, self.list(&values, depth), ('[', ']'))
            }
            Shape::Typed(name, values) => (format!("{}({}) ", name, values.len()), self.list(&values, depth), ('[', ']')),
            Shape::Map(entries) => {
                let mut items: Vec<String> = entries
                    .iter()
                    .take(MAX_ITEMS)
                    .map(|(k, v)| format!("{} => {}", self.value(k, depth + 1), self.value(v, depth + 1)))
                    .collect();
                if entries.len() > MAX_ITEMS {
                    items.push(format!("... {} more items", entries.len() - MAX_ITEMS));
                }
                (format!("Map({}) ", entries.len()), items, ('{', '}'))
            }
            Shape::Set(values) => (format!("Set({}) ", values.len()), self.list(&values, depth), ('{', '}')),
            Shape::Weak(name) => return format!("{} {{ <items unknown> }}", name),
            Shape::Promise(state) => {
                let item = match state {
                    None => "<pending>".to_string(),
                    Some((false, v)) => self.value(&v, depth + 1),
                    Some((true, v)) => format!("<rejected> {}", self.value(&v, depth + 1)),
                };
                ("Promise ".to_string(), vec![item], ('{', '}'))
            }
            Shape::Function(_) | Shape::Error | Shape::Leaf(_) | Shape::Plain => {
                let prefix = match (obj.proto(), class.as_deref()) {
                    (None, _) => "[Object: null prototype] ".to_string(),
                    (_, Some("Object")) | (_, None) => String::new(),
                    (_, Some(name)) => format!("{} ", name),
                };
                (prefix, Vec::new(), ('{', '}'))
            }
        };
        items.extend(self.properties(obj, depth));
        self.wrap(&prefix, items, brackets, depth)
    }

    fn list(
        &mut self,
        values: &[Value],
        depth: usize,
    ) -> Vec<String> {
        let mut items: Vec<String> = values
            .iter()
            .take(MAX_ITEMS)
            .map(|v| self.value(v, depth + 1))
            .collect();
        if values.len() > MAX_ITEMS {
            items.push(format!("... {} more items", values.len() - MAX_ITEMS));
        }
        items
    }

    /// Own enumerable non-index properties as `key: value`
    fn properties(
        &mut self,
        obj: &Obj,
        depth: usize,
    ) -> Vec<String> {
        let props: Vec<(PropertyKey, Property)> = {
            let object = obj.lock();
            object
                .props
                .iter()
                .filter(|(k, p)| p.enumerable && !matches!(k, PropertyKey::Private(_)))
                .filter(|(k, _)| {
                    !matches!(object.kind, ObjectKind::Array(_) | ObjectKind::TypedArray(_)) || k.array_index().is_none()
                })
                .map(|(k, p)| (k.clone(), p.clone()))
                .collect()
        };
        props
            .into_iter()
            .map(|(key, prop)| {
                let text = match &prop.slot {
                    Slot::Data(v) => self.value(v, depth + 1),
                    Slot::Accessor {
                        get: Some(_),
                        set: Some(_),
                    } => "[Getter/Setter]".into(),
                    Slot::Accessor { get: Some(_), .. } => "[Getter]".into(),
                    Slot::Accessor { .. } => "[Setter]".into(),
                };
                format!("{}: {}", key_text(&key), text)
            })
            .collect()
    }

    fn wrap(
        &self,
        prefix: &str,
        items: Vec<String>,
        (open, close): (char, char),
        depth: usize,
    ) -> String {
        if items.is_empty() {
            return format!("{}{}{}", prefix, open, close);
        }
        let width: usize = prefix.len() + items.iter().map(|i| i.len() + 2).sum::<usize>();
        if width <= LINE_WIDTH && items.iter().all(|i| !i.contains('\n')) {
            return format!("{}{} {} {}", prefix, open, items.join(", "), close);
        }
        let indent = "  ".repeat(depth + 1);
        let outer = "  ".repeat(depth);
        let body = items
            .iter()
            .map(|i| format!("{}{}", indent, i))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{}{}\n{}\n{}{}", prefix, open, body, outer, close)
    }

    fn error(
        &mut self,
        obj: &Obj,
    ) -> String {
        let target = Value::Object(obj.clone());
        let text = |key: &str| match self.interp.get_data(&target, &PropertyKey::from(key)) {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        };
        if let Some(stack) = text("stack") {
            return stack;
        }
        let name = text("name").unwrap_or_else(|| "Error".into());
        match text("message") {
            Some(message) if !message.is_empty() => format!("{}: {}", name, message),
            _ => name,
        }
    }

    /// `obj.constructor.name`, read without running getters
    fn constructor_name(
        &self,
        obj: &Obj,
    ) -> Option<String> {
        let proto = obj.proto()?;
        let ctor = self
            .interp
            .get_data(&Value::Object(proto), &PropertyKey::from("constructor"))?;
        match ctor {
            Value::Object(f) if f.is_callable() => {
                let name = self.interp.function_name(&f);
                (!name.is_empty()).then(|| name.to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_key_text() {
        assert_eq!(key_text(&PropertyKey::from("plain")), "plain");
        assert_eq!(key_text(&PropertyKey::from("$x_1")), "$x_1");
        assert_eq!(key_text(&PropertyKey::from("kebab-case")), "'kebab-case'");
        assert_eq!(key_text(&PropertyKey::from("")), "''");
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text(-0.0), "-0");
        assert_eq!(number_text(1.5), "1.5");
    }
}
