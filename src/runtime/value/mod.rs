//! JavaScript values as seen by the interpreter
//!
//! Primitives are stored inline; objects are shared, mutable heap cells
//! ([`Obj`]). Values are `Send + Sync` so an evaluation can move between
//! threads and be suspended across await points.

pub mod number;
pub mod object;

pub use number::number_to_string;
pub use object::*;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;

/// A JavaScript value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(Arc<BigInt>),
    String(Arc<str>),
    Symbol(Symbol),
    Object(Obj),
}

impl Value {
    /// String value from text
    pub fn str(s: &str) -> Value {
        Value::String(Arc::from(s))
    }

    /// Big integer value
    pub fn bigint(n: BigInt) -> Value {
        Value::BigInt(Arc::new(n))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<&Obj> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// `ToBoolean`
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::BigInt(n) => **n != BigInt::from(0),
            Value::String(s) => !s.is_empty(),
            Value::Symbol(_) | Value::Object(_) => true,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Object(obj) => {
                if obj.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// `ToString` for primitives; `None` for objects and symbols
    pub fn primitive_to_string(&self) -> Option<Arc<str>> {
        Some(match self {
            Value::Undefined => Arc::from("undefined"),
            Value::Null => Arc::from("null"),
            Value::Bool(b) => Arc::from(if *b { "true" } else { "false" }),
            Value::Number(n) => Arc::from(number_to_string(*n)),
            Value::BigInt(n) => Arc::from(n.to_string()),
            Value::String(s) => s.clone(),
            Value::Symbol(_) | Value::Object(_) => return None,
        })
    }

    /// `===`
    pub fn strict_equals(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_value(other),
        }
    }

    /// `SameValueZero` (Map keys, `includes`)
    pub fn same_value_zero(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.same_value(other),
        }
    }

    /// `SameValue` (`Object.is`)
    pub fn same_value(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, "{:?}", s),
            Value::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Obj> for Value {
    fn from(obj: Obj) -> Self {
        Value::Object(obj)
    }
}

/// Symbol identity; equality is by allocation
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

#[derive(Debug)]
struct SymbolData {
    description: Option<String>,
}

impl Symbol {
    pub fn new(description: Option<String>) -> Self {
        Symbol(Arc::new(SymbolData { description }))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Stable identity for hashing
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Symbol {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

/// Hashable identity of a value under `SameValueZero` (Map/Set keys)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    NaN,
    BigInt(String),
    String(Arc<str>),
    Symbol(usize),
    Object(usize),
}

impl HashKey {
    pub fn of(value: &Value) -> HashKey {
        match value {
            Value::Undefined => HashKey::Undefined,
            Value::Null => HashKey::Null,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Number(n) if n.is_nan() => HashKey::NaN,
            // -0 and +0 are the same key
            Value::Number(n) => HashKey::Number((*n + 0.0).to_bits()),
            Value::BigInt(n) => HashKey::BigInt(n.to_string()),
            Value::String(s) => HashKey::String(s.clone()),
            Value::Symbol(s) => HashKey::Symbol(s.id()),
            Value::Object(obj) => HashKey::Object(obj.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::Number(-0.0).to_boolean());
        assert!(!Value::str("").to_boolean());
        assert!(Value::str("0").to_boolean());
        assert!(!Value::bigint(BigInt::from(0)).to_boolean());
        assert!(Value::bigint(BigInt::from(2)).to_boolean());
    }

    #[test]
    fn test_equality_flavors() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.strict_equals(&nan));
        assert!(nan.same_value_zero(&nan));
        let (pz, nz) = (Value::Number(0.0), Value::Number(-0.0));
        assert!(pz.strict_equals(&nz));
        assert!(pz.same_value_zero(&nz));
        assert!(!pz.same_value(&nz));
        assert_eq!(HashKey::of(&pz), HashKey::of(&nz));
    }

    #[test]
    fn test_symbol_identity() {
        let a = Symbol::new(Some("a".into()));
        let b = Symbol::new(Some("a".into()));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(Value::Symbol(a).type_of(), "symbol");
    }

    #[test]
    fn test_primitive_to_string() {
        assert_eq!(Value::Number(1.5).primitive_to_string().as_deref(), Some("1.5"));
        assert_eq!(Value::Null.primitive_to_string().as_deref(), Some("null"));
        assert_eq!(Value::bigint(BigInt::from(10)).primitive_to_string().as_deref(), Some("10"));
    }
}
