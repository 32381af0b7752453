//! `RegExp` on top of the `regex` crate
//!
//! Patterns are translated to `regex` syntax at construction. Features the
//! engine cannot express (lookaround, backreferences) are rejected with a
//! `SyntaxError` instead of silently matching differently. `lastIndex` and
//! match offsets are UTF-16 code unit indices, as in JavaScript.

use std::sync::Arc;

use super::{async_ctor, async_fn, define_async, proto_for};
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, Property, PropertyKey, RegExpData, Slot, Value};

const FLAGS: &str = "dgimsuvy";

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().regexp_proto.clone();
    interp.define_constructor("RegExp", 2, async_ctor(regexp_ctor), &proto);

    define_async(interp, &proto, "exec", 1, |interp: Interpreter, args: CallArgs| async move {
        let obj = this_regexp(&interp, &args.this)?;
        let text = interp.to_string(&args.arg(0)).await?;
        exec(&interp, &obj, &text)
    });
    define_async(interp, &proto, "test", 1, |interp: Interpreter, args: CallArgs| async move {
        let obj = this_regexp(&interp, &args.this)?;
        let text = interp.to_string(&args.arg(0)).await?;
        Ok(Value::Bool(!matches!(exec(&interp, &obj, &text)?, Value::Null)))
    });
    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| {
        let data = data_of(&this_regexp(interp, &args.this)?);
        Ok(Value::from(match data {
            Some(d) => format!("/{}/{}", d.source, d.flags),
            None => "/(?:)/".to_string(),
        }))
    });

    interp.define_getter(&proto, "source", |interp, args: CallArgs| {
        let data = data_of(&this_regexp(interp, &args.this)?);
        Ok(Value::from(data.map(|d| d.source.clone()).unwrap_or_else(|| "(?:)".into())))
    });
    interp.define_getter(&proto, "flags", |interp, args: CallArgs| {
        let data = data_of(&this_regexp(interp, &args.this)?);
        Ok(Value::from(data.map(|d| d.flags.clone()).unwrap_or_default()))
    });
    for (name, flag) in [
        ("global", 'g'),
        ("ignoreCase", 'i'),
        ("multiline", 'm'),
        ("dotAll", 's'),
        ("unicode", 'u'),
        ("sticky", 'y'),
        ("hasIndices", 'd'),
    ] {
        interp.define_getter(&proto, name, move |interp, args: CallArgs| {
            let data = data_of(&this_regexp(interp, &args.this)?);
            Ok(Value::Bool(data.map(|d| d.flags.contains(flag)).unwrap_or(false)))
        });
    }

    let ctor = interp.global_value("RegExp");
    if let Some(Value::Object(ctor)) = ctor {
        let escape = async_fn(interp, "escape", 1, |interp: Interpreter, args: CallArgs| async move {
            let Value::String(s) = args.arg(0) else {
                return Err(interp.type_error("RegExp.escape requires a string"));
            };
            Ok(Value::from(regex::escape(&s)))
        });
        ctor.lock().define("escape", Property::hidden(Value::Object(escape)));
    }
}

async fn regexp_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let pattern = args.arg(0);
    let flags = args.arg(1);
    if let Value::Object(existing) = &pattern {
        if let Some(data) = data_of(existing) {
            if args.new_target.is_none() && flags.is_undefined() {
                return Ok(pattern.clone());
            }
            let flags = match flags {
                Value::Undefined => data.flags.clone(),
                v => interp.to_string(&v).await?.to_string(),
            };
            let obj = new_regexp(&interp, &data.source, &flags)?;
            apply_new_target(&interp, &obj, &args);
            return Ok(Value::Object(obj));
        }
    }
    let source = match pattern {
        Value::Undefined => "(?:)".to_string(),
        v => interp.to_string(&v).await?.to_string(),
    };
    let flags = match flags {
        Value::Undefined => String::new(),
        v => interp.to_string(&v).await?.to_string(),
    };
    let obj = new_regexp(&interp, &source, &flags)?;
    apply_new_target(&interp, &obj, &args);
    Ok(Value::Object(obj))
}

fn apply_new_target(
    interp: &Interpreter,
    obj: &Obj,
    args: &CallArgs,
) {
    if args.new_target.is_some() {
        let proto = proto_for(interp, args.new_target.as_ref(), &interp.intrinsics().regexp_proto);
        obj.lock().proto = Some(proto);
    }
}

/// Compile a regular expression object
///
/// # Arguments
/// * `pattern` - Pattern source as written between the slashes
/// * `flags` - Flag letters
pub fn new_regexp(
    interp: &Interpreter,
    pattern: &str,
    flags: &str,
) -> JsResult<Obj> {
    let mut seen = String::new();
    for c in flags.chars() {
        if !FLAGS.contains(c) || seen.contains(c) {
            return Err(interp.syntax_error(format!("Invalid flags supplied to RegExp constructor '{}'", flags)));
        }
        seen.push(c);
    }
    let translated = translate(pattern)
        .map_err(|why| interp.syntax_error(format!("Invalid regular expression: /{}/{}: {}", pattern, flags, why)))?;
    let regex = regex::RegexBuilder::new(&translated)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| {
            tracing::debug!("regex rejected /{}/ as {:?}: {}", pattern, translated, e);
            interp.syntax_error(format!("Invalid regular expression: /{}/{}", pattern, flags))
        })?;
    let mut ordered: Vec<char> = flags.chars().collect();
    ordered.sort_unstable();
    let data = RegExpData {
        source: if pattern.is_empty() { "(?:)".to_string() } else { pattern.to_string() },
        flags: ordered.into_iter().collect(),
        regex,
    };
    let mut object = Object::new(Some(interp.intrinsics().regexp_proto.clone()), ObjectKind::RegExp(Arc::new(data)));
    object.define(
        "lastIndex",
        Property {
            slot: Slot::Data(Value::Number(0.0)),
            enumerable: false,
            writable: true,
            configurable: false,
        },
    );
    Ok(Obj::new(object))
}

/// Rewrite JavaScript pattern syntax into `regex` syntax
fn translate(pattern: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(e) = chars.next() else {
                    return Err("\\ at end of pattern");
                };
                match e {
                    // JavaScript classes are ASCII-only
                    'd' => out.push_str(if in_class { "0-9" } else { "[0-9]" }),
                    'w' => out.push_str(if in_class { "0-9A-Za-z_" } else { "[0-9A-Za-z_]" }),
                    'D' if !in_class => out.push_str("[^0-9]"),
                    'W' if !in_class => out.push_str("[^0-9A-Za-z_]"),
                    'D' | 'W' | 's' | 'S' | 'b' | 'B' | 'n' | 'r' | 't' | 'f' | 'v' => {
                        if in_class && (e == 'b') {
                            out.push_str("\\x08");
                        } else {
                            out.push('\\');
                            out.push(e);
                        }
                    }
                    '0' => out.push_str("\\x00"),
                    '1'..='9' => return Err("backreferences are not supported"),
                    'k' if chars.peek() == Some(&'<') => return Err("named backreferences are not supported"),
                    'u' => {
                        if chars.peek() == Some(&'{') {
                            chars.next();
                            let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                            out.push_str(&format!("\\x{{{}}}", hex));
                        } else {
                            let hex: String = chars.by_ref().take(4).collect();
                            if hex.len() != 4 {
                                return Err("Invalid Unicode escape");
                            }
                            out.push_str(&format!("\\x{{{}}}", hex));
                        }
                    }
                    'x' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        out.push_str(&format!("\\x{{{}}}", hex));
                    }
                    'c' => {
                        let Some(letter) = chars.next() else {
                            return Err("Invalid control escape");
                        };
                        out.push_str(&format!("\\x{{{:x}}}", (letter as u32) % 32));
                    }
                    'p' | 'P' => {
                        out.push('\\');
                        out.push(e);
                    }
                    e if e.is_ascii_alphanumeric() => out.push(e),
                    e => {
                        out.push('\\');
                        out.push(e);
                    }
                }
            }
            '[' if !in_class => {
                if chars.peek() == Some(&']') {
                    chars.next();
                    // `[]` never matches
                    out.push_str("[^\\s\\S]");
                    continue;
                }
                if chars.peek() == Some(&'^') {
                    chars.next();
                    if chars.peek() == Some(&']') {
                        chars.next();
                        out.push_str("[\\s\\S]");
                        continue;
                    }
                    out.push_str("[^");
                } else {
                    out.push('[');
                }
                in_class = true;
            }
            '[' => out.push_str("\\["),
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '(' if !in_class && chars.peek() == Some(&'?') => {
                let mut look = chars.clone();
                look.next();
                match look.next() {
                    Some('=') | Some('!') => return Err("lookahead assertions are not supported"),
                    Some('<') if matches!(look.next(), Some('=') | Some('!')) => {
                        return Err("lookbehind assertions are not supported");
                    }
                    _ => out.push('('),
                }
            }
            '&' | '~' | '-' if in_class && chars.peek() == Some(&c) => {
                // doubled, these are set operators in `regex` classes
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

pub(crate) fn data_of(obj: &Obj) -> Option<Arc<RegExpData>> {
    match &obj.lock().kind {
        ObjectKind::RegExp(data) => Some(data.clone()),
        _ => None,
    }
}

/// Regular expression data of a value, if it is a RegExp
pub(crate) fn as_regexp(value: &Value) -> Option<(Obj, Arc<RegExpData>)> {
    let Value::Object(obj) = value else {
        return None;
    };
    data_of(obj).map(|d| (obj.clone(), d))
}

fn this_regexp(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Obj> {
    match this {
        Value::Object(obj) if data_of(obj).is_some() => Ok(obj.clone()),
        Value::Object(obj) if obj.ptr_eq(&interp.intrinsics().regexp_proto) => Ok(obj.clone()),
        _ => Err(interp.type_error("RegExp method called on incompatible receiver")),
    }
}

/// Byte offset of a UTF-16 index
pub(crate) fn utf16_to_byte(
    s: &str,
    index: usize,
) -> usize {
    let mut units = 0;
    for (byte, c) in s.char_indices() {
        if units >= index {
            return byte;
        }
        units += c.len_utf16();
    }
    s.len()
}

/// UTF-16 index of a byte offset
pub(crate) fn byte_to_utf16(
    s: &str,
    byte: usize,
) -> usize {
    s[..byte.min(s.len())].encode_utf16().count()
}

/// One successful match, as byte ranges into the subject
#[derive(Debug, Clone)]
pub(crate) struct Match {
    pub start: usize,
    pub end: usize,
    /// Capture groups 1.., `None` when a group did not participate
    pub groups: Vec<Option<(usize, usize)>>,
    /// Name of each capture group 1..
    pub names: Vec<Option<String>>,
}

impl Match {
    pub fn text<'s>(
        &self,
        subject: &'s str,
    ) -> &'s str {
        &subject[self.start..self.end]
    }

    pub fn group<'s>(
        &self,
        subject: &'s str,
        i: usize,
    ) -> Option<&'s str> {
        self.groups
            .get(i)
            .copied()
            .flatten()
            .map(|(a, b)| &subject[a..b])
    }

    pub fn has_names(&self) -> bool {
        self.names.iter().any(Option::is_some)
    }
}

/// First match at or after byte offset `from`; sticky matches must start exactly there
pub(crate) fn find_at(
    data: &RegExpData,
    subject: &str,
    from: usize,
) -> Option<Match> {
    if from > subject.len() {
        return None;
    }
    let caps = data.regex.captures_at(subject, from)?;
    let whole = caps.get(0)?;
    if data.sticky() && whole.start() != from {
        return None;
    }
    let groups = (1..caps.len()).map(|i| caps.get(i).map(|m| (m.start(), m.end()))).collect();
    let names = data
        .regex
        .capture_names()
        .skip(1)
        .map(|n| n.map(str::to_string))
        .collect();
    Some(Match {
        start: whole.start(),
        end: whole.end(),
        groups,
        names,
    })
}

/// Every match from the start of `subject`, advancing past empty matches
pub(crate) fn find_all(
    data: &RegExpData,
    subject: &str,
) -> Vec<Match> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(m) = find_at(data, subject, from) {
        from = if m.end == m.start {
            m.end + subject[m.end..].chars().next().map(char::len_utf8).unwrap_or(1)
        } else {
            m.end
        };
        out.push(m);
        if from > subject.len() {
            break;
        }
    }
    out
}

/// Match result array: `[match, ...groups]` with `index`, `input` and `groups`
pub(crate) fn match_result(
    interp: &Interpreter,
    subject: &str,
    m: &Match,
) -> Value {
    let mut items = vec![Value::str(m.text(subject))];
    for i in 0..m.groups.len() {
        items.push(m.group(subject, i).map(Value::str).unwrap_or_default());
    }
    let array = interp.new_array(items);
    let groups = if m.has_names() {
        let groups = Obj::new(Object::new(None, ObjectKind::Ordinary));
        {
            let mut object = groups.lock();
            for (i, name) in m.names.iter().enumerate() {
                if let Some(name) = name {
                    object.insert(name.as_str(), m.group(subject, i).map(Value::str).unwrap_or_default());
                }
            }
        }
        Value::Object(groups)
    } else {
        Value::Undefined
    };
    {
        let mut object = array.lock();
        object.insert("index", Value::Number(byte_to_utf16(subject, m.start) as f64));
        object.insert("input", Value::str(subject));
        object.insert("groups", groups);
    }
    Value::Object(array)
}

fn last_index(obj: &Obj) -> f64 {
    match obj.lock().get_own(&PropertyKey::from("lastIndex")).map(|p| p.slot) {
        Some(Slot::Data(Value::Number(n))) => n,
        _ => 0.0,
    }
}

fn set_last_index(
    obj: &Obj,
    value: usize,
) {
    if let Some(prop) = obj.lock().props.get_mut(&PropertyKey::from("lastIndex")) {
        prop.slot = Slot::Data(Value::Number(value as f64));
    }
}

/// `RegExp.prototype.exec`, honoring and updating `lastIndex`
pub(crate) fn exec(
    interp: &Interpreter,
    obj: &Obj,
    subject: &str,
) -> JsResult<Value> {
    let Some(data) = data_of(obj) else {
        return Err(interp.type_error("RegExp.prototype.exec called on incompatible receiver"));
    };
    let stateful = data.global() || data.sticky();
    let start = if stateful { last_index(obj).max(0.0) as usize } else { 0 };
    if start > subject.encode_utf16().count() {
        set_last_index(obj, 0);
        return Ok(Value::Null);
    }
    match find_at(&data, subject, utf16_to_byte(subject, start)) {
        Some(m) => {
            if stateful {
                set_last_index(obj, byte_to_utf16(subject, m.end));
            }
            Ok(match_result(interp, subject, &m))
        }
        None => {
            if stateful {
                set_last_index(obj, 0);
            }
            Ok(Value::Null)
        }
    }
}

/// Expand `$` patterns of a replacement template
pub(crate) fn expand_template(
    template: &str,
    subject: &str,
    m: &Match,
) -> String {
    let mut out = String::new();
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().map(|(_, c)| *c) {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(m.text(subject));
            }
            Some('`') => {
                chars.next();
                out.push_str(&subject[..m.start]);
            }
            Some('\'') => {
                chars.next();
                out.push_str(&subject[m.end..]);
            }
            Some('<') if m.has_names() => {
                let rest: String = chars.clone().skip(1).map(|(_, c)| c).take_while(|c| *c != '>').collect();
                let closed = chars.clone().skip(1).any(|(_, c)| c == '>');
                if !closed {
                    out.push('$');
                    continue;
                }
                for _ in 0..rest.chars().count() + 2 {
                    chars.next();
                }
                if let Some(i) = m.names.iter().position(|n| n.as_deref() == Some(rest.as_str())) {
                    out.push_str(m.group(subject, i).unwrap_or(""));
                }
            }
            Some(d) if d.is_ascii_digit() => {
                let first = d.to_digit(10).unwrap_or(0) as usize;
                let mut look = chars.clone();
                look.next();
                let second = look.peek().and_then(|(_, c)| c.to_digit(10)).map(|d| d as usize);
                let two = second.map(|s| first * 10 + s).filter(|n| *n >= 1 && *n <= m.groups.len());
                if let Some(n) = two {
                    chars.next();
                    chars.next();
                    out.push_str(m.group(subject, n - 1).unwrap_or(""));
                } else if first >= 1 && first <= m.groups.len() {
                    chars.next();
                    out.push_str(m.group(subject, first - 1).unwrap_or(""));
                } else {
                    out.push('$');
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pattern: &str, flags: &str) -> RegExpData {
        let regex = regex::RegexBuilder::new(&translate(pattern).unwrap())
            .case_insensitive(flags.contains('i'))
            .build()
            .unwrap();
        RegExpData {
            source: pattern.to_string(),
            flags: flags.to_string(),
            regex,
        }
    }

    #[test]
    fn test_translate_rejects_lookaround() {
        assert!(translate("a(?=b)").is_err());
        assert!(translate("(?<!a)b").is_err());
        assert!(translate("(a)\\1").is_err());
        assert!(translate("(?<year>\\d{4})").is_ok());
    }

    #[test]
    fn test_translate_escapes() {
        assert_eq!(translate("\\u0041").unwrap(), "\\x{0041}");
        assert_eq!(translate("[^]").unwrap(), "[\\s\\S]");
        assert_eq!(translate("\\/").unwrap(), "\\/");
    }

    #[test]
    fn test_find_all_advances_past_empty_matches() {
        let re = data("a*", "g");
        let found: Vec<(usize, usize)> = find_all(&re, "baa").iter().map(|m| (m.start, m.end)).collect();
        assert_eq!(found, vec![(0, 0), (1, 3), (3, 3)]);
    }

    #[test]
    fn test_expand_template() {
        let re = data("(?<first>\\w+) (\\w+)", "");
        let subject = "hello world";
        let m = find_at(&re, subject, 0).unwrap();
        assert_eq!(expand_template("$2 $1", subject, &m), "world hello");
        assert_eq!(expand_template("$<first>!", subject, &m), "hello!");
        assert_eq!(expand_template("$$ $& $9", subject, &m), "$ hello world $9");
    }

    #[test]
    fn test_utf16_offsets() {
        let s = "a😀b";
        assert_eq!(utf16_to_byte(s, 3), 5);
        assert_eq!(byte_to_utf16(s, 5), 3);
    }
}
