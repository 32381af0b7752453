//! Heap objects
//!
//! An [`Obj`] is a shared handle to a mutex-protected [`Object`]. The
//! interpreter never holds a lock across a call into JavaScript code: data is
//! copied out of the object first, then the lock is released.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};

use super::{HashKey, Symbol, Value};
use crate::backends::interpreter::env::Env;
use crate::backends::interpreter::generator::GeneratorState;
use crate::backends::interpreter::{BoxFuture, Interpreter, JsResult};
use crate::frontend::parser::ast;

/// Shared object handle; equality is identity
#[derive(Clone)]
pub struct Obj(Arc<Mutex<Object>>);

impl Obj {
    pub fn new(object: Object) -> Self {
        Obj(Arc::new(Mutex::new(object)))
    }

    /// Lock the object; never hold the guard across an await point
    pub fn lock(&self) -> MutexGuard<'_, Object> {
        self.0.lock()
    }

    pub fn ptr_eq(
        &self,
        other: &Obj,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for hashing and cycle detection
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn proto(&self) -> Option<Obj> {
        self.lock().proto.clone()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.lock().kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.lock().kind, ObjectKind::Array(_))
    }

    /// Copy of the elements if this is an array
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match &self.lock().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Obj {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[object #{:x}]", self.id())
    }
}

/// Property key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(Arc<str>),
    Symbol(Symbol),
    /// `#name` class member; never enumerated
    Private(Arc<str>),
}

impl PropertyKey {
    /// Canonical array index (`"0"`, `"17"`, not `"01"`)
    pub fn array_index(&self) -> Option<usize> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        if s.is_empty() || s.len() > 10 || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n: u64 = s.parse().ok()?;
        (n < u32::MAX as u64).then_some(n as usize)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            _ => None,
        }
    }

    /// Key as a JavaScript value (`Object.keys`, `Reflect.ownKeys`)
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(s) => Value::Symbol(s.clone()),
            PropertyKey::Private(s) => Value::String(Arc::from(format!("#{}", s))),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Symbol(s) => write!(f, "[{}]", s.description().unwrap_or("")),
            PropertyKey::Private(s) => write!(f, "#{}", s),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Arc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(Arc::from(s))
    }
}

impl From<Arc<str>> for PropertyKey {
    fn from(s: Arc<str>) -> Self {
        PropertyKey::String(s)
    }
}

impl From<usize> for PropertyKey {
    fn from(i: usize) -> Self {
        PropertyKey::String(Arc::from(i.to_string()))
    }
}

impl From<Symbol> for PropertyKey {
    fn from(s: Symbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

/// Property storage
#[derive(Debug, Clone)]
pub enum Slot {
    Data(Value),
    Accessor { get: Option<Obj>, set: Option<Obj> },
}

/// Property with its attributes
#[derive(Debug, Clone)]
pub struct Property {
    pub slot: Slot,
    pub enumerable: bool,
    pub writable: bool,
    pub configurable: bool,
}

impl Property {
    /// Ordinary assignment-created property
    pub fn data(value: Value) -> Self {
        Property {
            slot: Slot::Data(value),
            enumerable: true,
            writable: true,
            configurable: true,
        }
    }

    /// Builtin method or class member: not enumerable
    pub fn hidden(value: Value) -> Self {
        Property {
            slot: Slot::Data(value),
            enumerable: false,
            writable: true,
            configurable: true,
        }
    }

    /// Constant (`Math.PI`, function `name`)
    pub fn constant(value: Value) -> Self {
        Property {
            slot: Slot::Data(value),
            enumerable: false,
            writable: false,
            configurable: false,
        }
    }

    pub fn accessor(
        get: Option<Obj>,
        set: Option<Obj>,
        enumerable: bool,
    ) -> Self {
        Property {
            slot: Slot::Accessor { get, set },
            enumerable,
            writable: true,
            configurable: true,
        }
    }
}

/// Object contents
pub struct Object {
    pub proto: Option<Obj>,
    pub props: IndexMap<PropertyKey, Property>,
    pub kind: ObjectKind,
    pub extensible: bool,
    /// `Object.freeze` also covers array and typed array elements
    pub frozen: bool,
}

impl Object {
    pub fn new(
        proto: Option<Obj>,
        kind: ObjectKind,
    ) -> Self {
        Object {
            proto,
            props: IndexMap::new(),
            kind,
            extensible: true,
            frozen: false,
        }
    }

    /// Own property, including the virtual index/`length` properties of arrays
    pub fn get_own(
        &self,
        key: &PropertyKey,
    ) -> Option<Property> {
        match &self.kind {
            ObjectKind::Array(items) => {
                if let Some(i) = key.array_index() {
                    return items.get(i).map(|v| Property {
                        writable: !self.frozen,
                        configurable: !self.frozen,
                        ..Property::data(v.clone())
                    });
                }
                if key.as_str() == Some("length") {
                    return Some(Property {
                        slot: Slot::Data(Value::Number(items.len() as f64)),
                        enumerable: false,
                        writable: !self.frozen,
                        configurable: false,
                    });
                }
            }
            ObjectKind::TypedArray(ta) => {
                if let Some(i) = key.array_index() {
                    return ta.elems.get(i).map(|v| Property::data(v.clone()));
                }
            }
            ObjectKind::Boxed(Value::String(s)) => {
                if let Some(i) = key.array_index() {
                    let unit = s.encode_utf16().nth(i)?;
                    return Some(Property::constant(Value::String(Arc::from(
                        String::from_utf16_lossy(&[unit]),
                    ))));
                }
                if key.as_str() == Some("length") {
                    return Some(Property::constant(Value::Number(s.encode_utf16().count() as f64)));
                }
            }
            _ => {}
        }
        self.props.get(key).cloned()
    }

    /// Own keys in property order: integer keys ascending, then strings in
    /// insertion order, then symbols. Private names are never listed.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<usize> = match &self.kind {
            ObjectKind::Array(items) => (0..items.len()).collect(),
            ObjectKind::TypedArray(ta) => (0..ta.elems.len()).collect(),
            ObjectKind::Boxed(Value::String(s)) => (0..s.encode_utf16().count()).collect(),
            _ => Vec::new(),
        };
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in self.props.keys() {
            match key {
                PropertyKey::Private(_) => {}
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
                PropertyKey::String(_) => match key.array_index() {
                    Some(i) => indices.push(i),
                    None => strings.push(key.clone()),
                },
            }
        }
        indices.sort_unstable();
        indices.dedup();

        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::from).collect();
        if matches!(self.kind, ObjectKind::Array(_)) {
            keys.push(PropertyKey::from("length"));
        }
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    /// Create or overwrite an ordinary data property
    pub fn insert(
        &mut self,
        key: impl Into<PropertyKey>,
        value: Value,
    ) {
        self.props.insert(key.into(), Property::data(value));
    }

    /// Create or overwrite a property with explicit attributes
    pub fn define(
        &mut self,
        key: impl Into<PropertyKey>,
        prop: Property,
    ) {
        self.props.insert(key.into(), prop);
    }

    /// Delete an own property; `false` if it is not configurable
    pub fn remove(
        &mut self,
        key: &PropertyKey,
    ) -> bool {
        if let ObjectKind::Array(items) = &mut self.kind {
            if let Some(i) = key.array_index() {
                if self.frozen {
                    return false;
                }
                // holes read back as undefined
                if i + 1 == items.len() {
                    items.pop();
                } else if let Some(slot) = items.get_mut(i) {
                    *slot = Value::Undefined;
                }
                return true;
            }
        }
        match self.props.get(key) {
            Some(prop) if !prop.configurable => false,
            Some(_) => {
                self.props.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Class name used by `Object.prototype.toString` and diagnostics
    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Ordinary | ObjectKind::Boxed(_) => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Date(_) => "Date",
            ObjectKind::RegExp(_) => "RegExp",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::WeakMap(_) => "WeakMap",
            ObjectKind::WeakSet(_) => "WeakSet",
            ObjectKind::Promise(_) => "Promise",
            ObjectKind::TypedArray(ta) => ta.kind.name(),
            ObjectKind::Generator(_) => "Generator",
        }
    }
}

/// Internal slots that distinguish exotic and builtin objects
pub enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Function(Callable),
    Error,
    /// Milliseconds since the epoch, `NaN` for an invalid date
    Date(f64),
    RegExp(Arc<RegExpData>),
    Map(IndexMap<HashKey, (Value, Value)>),
    Set(IndexMap<HashKey, Value>),
    WeakMap(IndexMap<HashKey, (Value, Value)>),
    WeakSet(IndexMap<HashKey, Value>),
    Promise(PromiseState),
    TypedArray(TypedArray),
    Generator(Box<GeneratorState>),
    /// Primitive wrapper (`Object("s")`, `new Number(1)`)
    Boxed(Value),
}

/// Anything that can be called
#[derive(Clone)]
pub enum Callable {
    Closure(Closure),
    Class(ClassConstructor),
    Native(NativeFunction),
    Bound(BoundFunction),
}

/// How `this` and `new` behave for a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    /// `function` declaration or expression: callable and constructible
    Normal,
    /// Arrow function: lexical `this`
    Arrow,
    /// Object or class method: not constructible, has a home object
    Method,
}

/// User function closed over its defining environment
#[derive(Clone)]
pub struct Closure {
    pub func: Arc<ast::Function>,
    pub env: Env,
    /// Text the function was parsed from (for `toString`)
    pub source: Arc<str>,
    pub kind: ClosureKind,
    /// Object whose prototype `super` refers to
    pub home: Option<Obj>,
}

impl Closure {
    /// Source text of the function
    pub fn text(&self) -> &str {
        self.source.get(self.func.span.start..self.func.span.end).unwrap_or("")
    }
}

/// Class constructor
#[derive(Clone)]
pub struct ClassConstructor {
    /// Explicit `constructor(...)`, if any
    pub ctor: Option<Arc<ast::Function>>,
    pub class: Arc<ast::Class>,
    /// Class scope (binds the class name)
    pub env: Env,
    pub source: Arc<str>,
    /// The class prototype object
    pub home: Obj,
    pub derived: bool,
    /// Instance fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl ClassConstructor {
    pub fn text(&self) -> &str {
        self.source.get(self.class.span.start..self.class.span.end).unwrap_or("")
    }
}

/// Instance field installed at construction
#[derive(Clone)]
pub struct FieldDef {
    pub key: PropertyKey,
    pub init: FieldInit,
}

/// How an instance member gets its value
#[derive(Clone)]
pub enum FieldInit {
    /// Field initializer: index into the class members
    Expr(usize),
    /// Field without initializer
    Undefined,
}

/// Synchronous builtin
pub type SyncFn = Arc<dyn Fn(&Interpreter, CallArgs) -> JsResult<Value> + Send + Sync>;

/// Builtin that calls back into JavaScript
pub type AsyncFn = Arc<dyn Fn(Interpreter, CallArgs) -> BoxFuture<'static, JsResult<Value>> + Send + Sync>;

#[derive(Clone)]
pub enum NativeFn {
    Sync(SyncFn),
    Async(AsyncFn),
}

/// Builtin function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: Arc<str>,
    pub f: NativeFn,
    /// May be called with `new`
    pub constructor: bool,
}

/// `Function.prototype.bind` result
#[derive(Clone)]
pub struct BoundFunction {
    pub target: Obj,
    pub this: Value,
    pub args: Vec<Value>,
}

/// Receiver, arguments and `new.target` of a builtin call
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub this: Value,
    pub args: Vec<Value>,
    /// Set when called as a constructor
    pub new_target: Option<Obj>,
}

impl CallArgs {
    pub fn new(
        this: Value,
        args: Vec<Value>,
    ) -> Self {
        CallArgs {
            this,
            args,
            new_target: None,
        }
    }

    /// Argument `i`, `undefined` when missing
    pub fn arg(
        &self,
        i: usize,
    ) -> Value {
        self.args.get(i).cloned().unwrap_or(Value::Undefined)
    }
}

/// Promise state
pub enum PromiseState {
    Pending(Vec<Reaction>),
    Fulfilled(Value),
    Rejected(Value),
}

/// Callbacks registered by `then`
#[derive(Clone)]
pub struct Reaction {
    pub on_fulfilled: Value,
    pub on_rejected: Value,
    /// Promise returned by `then`
    pub derived: Option<Obj>,
}

/// Compiled regular expression
#[derive(Debug)]
pub struct RegExpData {
    pub source: String,
    pub flags: String,
    pub regex: regex::Regex,
}

impl RegExpData {
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn sticky(&self) -> bool {
        self.flags.contains('y')
    }
}

/// Typed array element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedKind {
    pub const ALL: [TypedKind; 11] = [
        TypedKind::Int8,
        TypedKind::Uint8,
        TypedKind::Uint8Clamped,
        TypedKind::Int16,
        TypedKind::Uint16,
        TypedKind::Int32,
        TypedKind::Uint32,
        TypedKind::Float32,
        TypedKind::Float64,
        TypedKind::BigInt64,
        TypedKind::BigUint64,
    ];

    /// Constructor name
    pub fn name(self) -> &'static str {
        match self {
            TypedKind::Int8 => "Int8Array",
            TypedKind::Uint8 => "Uint8Array",
            TypedKind::Uint8Clamped => "Uint8ClampedArray",
            TypedKind::Int16 => "Int16Array",
            TypedKind::Uint16 => "Uint16Array",
            TypedKind::Int32 => "Int32Array",
            TypedKind::Uint32 => "Uint32Array",
            TypedKind::Float32 => "Float32Array",
            TypedKind::Float64 => "Float64Array",
            TypedKind::BigInt64 => "BigInt64Array",
            TypedKind::BigUint64 => "BigUint64Array",
        }
    }

    pub fn is_bigint(self) -> bool {
        matches!(self, TypedKind::BigInt64 | TypedKind::BigUint64)
    }

    pub fn bytes_per_element(self) -> usize {
        match self {
            TypedKind::Int8 | TypedKind::Uint8 | TypedKind::Uint8Clamped => 1,
            TypedKind::Int16 | TypedKind::Uint16 => 2,
            TypedKind::Int32 | TypedKind::Uint32 | TypedKind::Float32 => 4,
            TypedKind::Float64 | TypedKind::BigInt64 | TypedKind::BigUint64 => 8,
        }
    }

    /// Store conversion for a numeric element
    pub fn coerce_number(
        self,
        x: f64,
    ) -> f64 {
        use super::number::to_uint32;
        let wrap = |bits: u32| -> f64 {
            let m = to_uint32(x) as u64 & ((1u64 << bits) - 1);
            m as f64
        };
        match self {
            TypedKind::Int8 => wrap(8) as u8 as i8 as f64,
            TypedKind::Uint8 => wrap(8),
            TypedKind::Uint8Clamped => {
                if x.is_nan() {
                    0.0
                } else {
                    // round half to even
                    let c = x.clamp(0.0, 255.0);
                    let r = c.round();
                    if (c - c.trunc() - 0.5).abs() < f64::EPSILON && r % 2.0 != 0.0 {
                        r - 1.0
                    } else {
                        r
                    }
                }
            }
            TypedKind::Int16 => wrap(16) as u16 as i16 as f64,
            TypedKind::Uint16 => wrap(16),
            TypedKind::Int32 => to_uint32(x) as i32 as f64,
            TypedKind::Uint32 => to_uint32(x) as f64,
            TypedKind::Float32 => x as f32 as f64,
            TypedKind::Float64 => x,
            TypedKind::BigInt64 | TypedKind::BigUint64 => x,
        }
    }

    /// Store conversion for a big integer element
    pub fn coerce_bigint(
        self,
        n: &num_bigint::BigInt,
    ) -> num_bigint::BigInt {
        let modulus = num_bigint::BigInt::from(1u8) << 64usize;
        let mut m = n % &modulus;
        if m < num_bigint::BigInt::from(0) {
            m += &modulus;
        }
        if self == TypedKind::BigInt64 && m >= (num_bigint::BigInt::from(1u8) << 63usize) {
            m -= modulus;
        }
        m
    }
}

/// Typed array contents; elements are stored already converted
pub struct TypedArray {
    pub kind: TypedKind,
    pub elems: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index_keys() {
        assert_eq!(PropertyKey::from("0").array_index(), Some(0));
        assert_eq!(PropertyKey::from("42").array_index(), Some(42));
        assert_eq!(PropertyKey::from("01").array_index(), None);
        assert_eq!(PropertyKey::from("-1").array_index(), None);
        assert_eq!(PropertyKey::from("length").array_index(), None);
    }

    #[test]
    fn test_own_key_order() {
        let mut obj = Object::new(None, ObjectKind::Ordinary);
        obj.insert("b", Value::Null);
        obj.insert("2", Value::Null);
        obj.insert("a", Value::Null);
        obj.insert("1", Value::Null);
        let keys: Vec<String> = obj.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["1", "2", "b", "a"]);
    }

    #[test]
    fn test_array_virtual_properties() {
        let obj = Object::new(None, ObjectKind::Array(vec![Value::Number(1.0), Value::Number(2.0)]));
        let len = obj.get_own(&PropertyKey::from("length")).map(|p| p.enumerable);
        assert_eq!(len, Some(false));
        assert!(obj.get_own(&PropertyKey::from("1")).is_some());
        assert!(obj.get_own(&PropertyKey::from("2")).is_none());
    }

    #[test]
    fn test_typed_coercion() {
        assert_eq!(TypedKind::Uint8.coerce_number(257.0), 1.0);
        assert_eq!(TypedKind::Int8.coerce_number(255.0), -1.0);
        assert_eq!(TypedKind::Uint8Clamped.coerce_number(300.0), 255.0);
        assert_eq!(TypedKind::Uint8Clamped.coerce_number(2.5), 2.0);
        assert_eq!(TypedKind::Int32.coerce_number(2_147_483_648.0), -2_147_483_648.0);
        let big = num_bigint::BigInt::from(-1);
        assert_eq!(
            TypedKind::BigUint64.coerce_bigint(&big),
            num_bigint::BigInt::from(u64::MAX)
        );
    }
}
