//! Resolved values and their source form
//!
//! A settled evaluation result is first copied out of the interpreter into a
//! [`ResolvedValue`], then printed as an expression that rebuilds it. Records
//! are parenthesized so the literal stays an expression in statement position.

use num_bigint::BigInt;

use crate::backends::interpreter::builtins::json::quote;
use crate::backends::interpreter::{BoxFuture, Interpreter, JsResult};
use crate::runtime::value::{number_to_string, Callable, ClosureKind, ObjectKind, TypedKind, Value};

/// A value that left the sandbox
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(String),
    Array(Vec<ResolvedValue>),
    /// Milliseconds since the epoch
    Date(f64),
    RegExp { source: String, flags: String },
    Set(Vec<ResolvedValue>),
    Map(Vec<(ResolvedValue, ResolvedValue)>),
    TypedArray { kind: TypedKind, elements: Vec<ResolvedValue> },
    /// Own enumerable string-keyed properties, in property order
    Record(Vec<(String, ResolvedValue)>),
    /// Function source text; captured variables are not carried along
    Function(String),
    Symbol(Option<String>),
    Unrepresentable(String),
}

/// Value that has no source form
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SerializeError {
    #[error("Emitting symbols will have unexpected consequences (Symbol({}))", .0.as_deref().unwrap_or(""))]
    Symbol(Option<String>),

    #[error("Cannot emit {0} as a literal")]
    Unrepresentable(String),
}

impl ResolvedValue {
    /// Copy `value` out of the interpreter, running getters on records
    pub async fn from_runtime(
        interp: &Interpreter,
        value: &Value,
    ) -> JsResult<ResolvedValue> {
        let mut path = Vec::new();
        resolve(interp, value, &mut path).await
    }

    /// Source text that evaluates to this value
    pub fn to_source(&self) -> Result<String, SerializeError> {
        let mut out = String::new();
        self.write(&mut out)?;
        Ok(out)
    }

    fn write(
        &self,
        out: &mut String,
    ) -> Result<(), SerializeError> {
        match self {
            ResolvedValue::Null => out.push_str("null"),
            ResolvedValue::Undefined => out.push_str("undefined"),
            ResolvedValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ResolvedValue::Number(n) => out.push_str(&number_literal(*n)),
            ResolvedValue::BigInt(n) => {
                out.push_str(&n.to_string());
                out.push('n');
            }
            ResolvedValue::String(s) => out.push_str(&quote(s)),
            ResolvedValue::Array(items) => {
                out.push('[');
                write_list(out, items)?;
                out.push(']');
            }
            ResolvedValue::Date(ms) => {
                out.push_str("new Date(");
                out.push_str(&number_literal(*ms));
                out.push(')');
            }
            ResolvedValue::RegExp { source, flags } => {
                out.push_str(&format!("new RegExp({}, {})", quote(source), quote(flags)));
            }
            ResolvedValue::Set(items) => {
                out.push_str("new Set([");
                write_list(out, items)?;
                out.push_str("])");
            }
            ResolvedValue::Map(entries) => {
                out.push_str("new Map([");
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('[');
                    k.write(out)?;
                    out.push_str(", ");
                    v.write(out)?;
                    out.push(']');
                }
                out.push_str("])");
            }
            ResolvedValue::TypedArray { kind, elements } => {
                out.push_str("new ");
                out.push_str(kind.name());
                out.push_str("([");
                write_list(out, elements)?;
                out.push_str("])");
            }
            ResolvedValue::Record(entries) => {
                out.push_str("({");
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    // a literal `__proto__` key would set the prototype instead
                    if k == "__proto__" {
                        out.push_str("[\"__proto__\"]");
                    } else {
                        out.push_str(&quote(k));
                    }
                    out.push_str(": ");
                    v.write(out)?;
                }
                out.push_str("})");
            }
            ResolvedValue::Function(text) => out.push_str(text),
            ResolvedValue::Symbol(description) => return Err(SerializeError::Symbol(description.clone())),
            ResolvedValue::Unrepresentable(reason) => return Err(SerializeError::Unrepresentable(reason.clone())),
        }
        Ok(())
    }
}

fn write_list(
    out: &mut String,
    items: &[ResolvedValue],
) -> Result<(), SerializeError> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write(out)?;
    }
    Ok(())
}

/// Number literal; unlike `String(n)` keeps the sign of zero
fn number_literal(n: f64) -> String {
    if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else {
        number_to_string(n)
    }
}

/// Shape of an object, copied out from under its lock
enum Shape {
    Array(Vec<Value>),
    Date(f64),
    RegExp { source: String, flags: String },
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    TypedArray(TypedKind, Vec<Value>),
    Function(Option<String>),
    Record,
    Opaque(&'static str),
}

fn resolve<'a>(
    interp: &'a Interpreter,
    value: &'a Value,
    path: &'a mut Vec<usize>,
) -> BoxFuture<'a, JsResult<ResolvedValue>> {
    Box::pin(async move {
        let obj = match value {
            Value::Undefined => return Ok(ResolvedValue::Undefined),
            Value::Null => return Ok(ResolvedValue::Null),
            Value::Bool(b) => return Ok(ResolvedValue::Bool(*b)),
            Value::Number(n) => return Ok(ResolvedValue::Number(*n)),
            Value::BigInt(n) => return Ok(ResolvedValue::BigInt((**n).clone())),
            Value::String(s) => return Ok(ResolvedValue::String(s.to_string())),
            Value::Symbol(s) => return Ok(ResolvedValue::Symbol(s.description().map(str::to_string))),
            Value::Object(obj) => obj,
        };
        if path.contains(&obj.id()) {
            return Ok(ResolvedValue::Unrepresentable("a cyclic structure".into()));
        }

        let shape = match &obj.lock().kind {
            ObjectKind::Array(items) => Shape::Array(items.clone()),
            ObjectKind::Date(ms) => Shape::Date(*ms),
            ObjectKind::RegExp(data) => Shape::RegExp {
                source: data.source.clone(),
                flags: data.flags.clone(),
            },
            ObjectKind::Set(items) => Shape::Set(items.values().cloned().collect()),
            ObjectKind::Map(entries) => Shape::Map(entries.values().cloned().collect()),
            ObjectKind::TypedArray(array) => Shape::TypedArray(array.kind, array.elems.clone()),
            ObjectKind::Function(Callable::Closure(c)) if c.kind != ClosureKind::Method => {
                Shape::Function(Some(c.text().to_string()))
            }
            ObjectKind::Function(Callable::Class(c)) => Shape::Function(Some(c.text().to_string())),
            ObjectKind::Function(_) => Shape::Function(None),
            ObjectKind::Promise(_) => Shape::Opaque("a nested promise"),
            ObjectKind::WeakMap(_) => Shape::Opaque("a WeakMap"),
            ObjectKind::WeakSet(_) => Shape::Opaque("a WeakSet"),
            ObjectKind::Generator(_) => Shape::Opaque("a generator"),
            ObjectKind::Ordinary | ObjectKind::Error | ObjectKind::Boxed(_) => Shape::Record,
        };

        path.push(obj.id());
        let resolved = match shape {
            Shape::Array(items) => ResolvedValue::Array(resolve_all(interp, &items, path).await?),
            Shape::Date(ms) => ResolvedValue::Date(ms),
            Shape::RegExp { source, flags } => ResolvedValue::RegExp { source, flags },
            Shape::Set(items) => ResolvedValue::Set(resolve_all(interp, &items, path).await?),
            Shape::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in &entries {
                    let key = resolve(interp, k, path).await?;
                    out.push((key, resolve(interp, v, path).await?));
                }
                ResolvedValue::Map(out)
            }
            Shape::TypedArray(kind, elems) => ResolvedValue::TypedArray {
                kind,
                elements: resolve_all(interp, &elems, path).await?,
            },
            Shape::Function(Some(text)) => ResolvedValue::Function(text),
            Shape::Function(None) => ResolvedValue::Unrepresentable("a native or bound function".into()),
            Shape::Opaque(what) => ResolvedValue::Unrepresentable(what.into()),
            Shape::Record => {
                let target = value.clone();
                let mut entries = Vec::new();
                for key in interp.own_enumerable_keys(obj) {
                    let field = interp.get(&target, &key).await?;
                    let name = key.as_str().unwrap_or_default().to_string();
                    entries.push((name, resolve(interp, &field, path).await?));
                }
                ResolvedValue::Record(entries)
            }
        };
        path.pop();
        Ok(resolved)
    })
}

async fn resolve_all(
    interp: &Interpreter,
    items: &[Value],
    path: &mut Vec<usize>,
) -> JsResult<Vec<ResolvedValue>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(resolve(interp, item, path).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::frontend::module::NodeResolver;
    use crate::frontend::parser::{parse, ParseOptions};

    /// Evaluate `return <expr>` and copy the result out
    async fn eval(expr: String) -> Result<ResolvedValue, String> {
        let outcome = Interpreter::run_isolated(async move {
            let source: Arc<str> = Arc::from(format!("return {};", expr));
            let parsed = parse(&source, ParseOptions::javascript().function_body()).map_err(|e| e.to_string())?;
            let interp = Interpreter::new(Arc::new(NodeResolver::new()));
            let value = interp
                .evaluate_body(source, Arc::new(parsed.module), Path::new("/virtual/serialize.js"))
                .await
                .map_err(|t| interp.describe(&t).to_string())?;
            ResolvedValue::from_runtime(&interp, &value)
                .await
                .map_err(|t| interp.describe(&t).to_string())
        })
        .await;
        outcome.unwrap_or_else(|e| Err(e.to_string()))
    }

    fn source_of(expr: &str) -> Result<String, SerializeError> {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let value = rt.block_on(eval(expr.to_string())).unwrap();
        value.to_source()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(ResolvedValue::Number(-0.0).to_source().unwrap(), "-0");
        assert_eq!(ResolvedValue::Number(f64::NAN).to_source().unwrap(), "NaN");
        assert_eq!(ResolvedValue::Number(f64::NEG_INFINITY).to_source().unwrap(), "-Infinity");
        assert_eq!(ResolvedValue::BigInt(BigInt::from(-12)).to_source().unwrap(), "-12n");
        assert_eq!(ResolvedValue::String("a\"\n".into()).to_source().unwrap(), r#""a\"\n""#);
    }

    #[test]
    fn test_records_are_parenthesized() {
        let record = ResolvedValue::Record(vec![
            ("a".into(), ResolvedValue::Number(1.0)),
            ("b c".into(), ResolvedValue::Array(vec![ResolvedValue::Null, ResolvedValue::Undefined])),
        ]);
        assert_eq!(record.to_source().unwrap(), r#"({"a": 1, "b c": [null, undefined]})"#);
        assert_eq!(ResolvedValue::Record(Vec::new()).to_source().unwrap(), "({})");
        let proto = ResolvedValue::Record(vec![("__proto__".into(), ResolvedValue::Null)]);
        assert_eq!(proto.to_source().unwrap(), r#"({["__proto__"]: null})"#);
    }

    #[test]
    fn test_collections() {
        assert_eq!(source_of("new Set([1, 'x'])").unwrap(), r#"new Set([1, "x"])"#);
        assert_eq!(source_of("new Map([[1, { k: 2 }]])").unwrap(), r#"new Map([[1, ({"k": 2})]])"#);
        assert_eq!(source_of("new Date(86400000)").unwrap(), "new Date(86400000)");
        assert_eq!(source_of("new Uint8Array([1, 2, 300])").unwrap(), "new Uint8Array([1, 2, 44])");
        assert_eq!(source_of("new BigInt64Array([5n])").unwrap(), "new BigInt64Array([5n])");
    }

    #[test]
    fn test_functions_keep_text() {
        assert_eq!(source_of("(a, b) => a + b").unwrap(), "(a, b) => a + b");
        assert_eq!(source_of("function twice(x) { return x * 2; }").unwrap(), "function twice(x) { return x * 2; }");
    }

    #[test]
    fn test_getters_are_read() {
        assert_eq!(source_of("({ get x() { return 4; } })").unwrap(), r#"({"x": 4})"#);
    }

    #[test]
    fn test_unrepresentable_values() {
        assert_eq!(source_of("Symbol('s')"), Err(SerializeError::Symbol(Some("s".into()))));
        let cyclic = source_of("(() => { const o = {}; o.self = o; return o; })()");
        assert_eq!(cyclic, Err(SerializeError::Unrepresentable("a cyclic structure".into())));
        assert!(source_of("Math.max").is_err());
        assert!(source_of("({ f() {} }).f").is_err());
    }

    #[test]
    fn test_shared_reference_is_not_a_cycle() {
        let source = source_of("(() => { const o = [1]; return [o, o]; })()").unwrap();
        assert_eq!(source, "[[1], [1]]");
    }

    fn value_strategy() -> impl Strategy<Value = ResolvedValue> {
        let leaf = prop_oneof![
            Just(ResolvedValue::Null),
            Just(ResolvedValue::Undefined),
            any::<bool>().prop_map(ResolvedValue::Bool),
            (-1.0e9f64..1.0e9).prop_map(ResolvedValue::Number),
            any::<i64>().prop_map(|n| ResolvedValue::BigInt(BigInt::from(n))),
            r#"[a-zA-Z0-9 "'\\\n\té😀]{0,12}"#.prop_map(ResolvedValue::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(ResolvedValue::Array),
                prop::collection::vec(inner.clone(), 0..4).prop_map(ResolvedValue::Set),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                    let mut seen = std::collections::HashSet::new();
                    ResolvedValue::Record(entries.into_iter().filter(|(k, _)| seen.insert(k.clone())).collect())
                }),
            ]
        })
    }

    /// Sets drop repeated members, so compare against the deduplicated form
    fn canonical(value: ResolvedValue) -> ResolvedValue {
        match value {
            ResolvedValue::Array(items) => ResolvedValue::Array(items.into_iter().map(canonical).collect()),
            ResolvedValue::Set(items) => {
                let mut unique: Vec<ResolvedValue> = Vec::new();
                for item in items.into_iter().map(canonical) {
                    let primitive = !matches!(item, ResolvedValue::Array(_) | ResolvedValue::Set(_) | ResolvedValue::Record(_));
                    if !(primitive && unique.contains(&item)) {
                        unique.push(item);
                    }
                }
                ResolvedValue::Set(unique)
            }
            ResolvedValue::Record(entries) => ResolvedValue::Record(entries.into_iter().map(|(k, v)| (k, canonical(v))).collect()),
            other => other,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_source_evaluates_back(value in value_strategy()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let source = value.to_source().unwrap();
            let back = rt.block_on(eval(source.clone())).unwrap();
            prop_assert_eq!(back, canonical(value), "source: {}", source);
        }
    }
}
