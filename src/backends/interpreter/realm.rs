//! Intrinsic objects shared by everything evaluated in one interpreter

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::value::{
    Callable, NativeFn, NativeFunction, Obj, Object, ObjectKind, Symbol, TypedKind, Value,
};

/// Native error constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
    UriError,
    AggregateError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::EvalError,
        ErrorKind::UriError,
        ErrorKind::AggregateError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::UriError => "URIError",
            ErrorKind::AggregateError => "AggregateError",
        }
    }
}

/// Well-known symbols
pub struct WellKnown {
    pub iterator: Symbol,
    pub async_iterator: Symbol,
    pub has_instance: Symbol,
    pub to_primitive: Symbol,
    pub to_string_tag: Symbol,
}

/// Prototype objects created before any builtin is installed
pub struct Intrinsics {
    pub object_proto: Obj,
    pub function_proto: Obj,
    pub array_proto: Obj,
    pub string_proto: Obj,
    pub number_proto: Obj,
    pub boolean_proto: Obj,
    pub bigint_proto: Obj,
    pub symbol_proto: Obj,
    pub promise_proto: Obj,
    pub map_proto: Obj,
    pub set_proto: Obj,
    pub weak_map_proto: Obj,
    pub weak_set_proto: Obj,
    pub date_proto: Obj,
    pub regexp_proto: Obj,
    /// `%IteratorPrototype%`: `[Symbol.iterator]() { return this }`
    pub iterator_proto: Obj,
    pub generator_proto: Obj,
    /// `%AsyncIteratorPrototype%`
    pub async_iterator_proto: Obj,
    pub async_generator_proto: Obj,
    /// Thrown through a generator body when `return()` resumes it
    pub generator_return: Obj,
    pub typed_array_protos: HashMap<TypedKind, Obj>,
    pub error_protos: HashMap<ErrorKind, Obj>,
    pub symbols: WellKnown,
    /// `Symbol.for` registry
    pub symbol_registry: Mutex<HashMap<String, Symbol>>,
}

impl Intrinsics {
    pub fn new() -> Self {
        let object_proto = Obj::new(Object::new(None, ObjectKind::Ordinary));
        let ordinary = |proto: &Obj| Obj::new(Object::new(Some(proto.clone()), ObjectKind::Ordinary));
        let empty_fn = NativeFunction {
            name: Arc::from(""),
            f: NativeFn::Sync(Arc::new(|_, _| Ok(Value::Undefined))),
            constructor: false,
        };
        let function_proto = Obj::new(Object::new(
            Some(object_proto.clone()),
            ObjectKind::Function(Callable::Native(empty_fn)),
        ));
        let array_proto = Obj::new(Object::new(Some(object_proto.clone()), ObjectKind::Array(Vec::new())));
        let iterator_proto = ordinary(&object_proto);
        let generator_proto = ordinary(&iterator_proto);
        let async_iterator_proto = ordinary(&object_proto);
        let async_generator_proto = ordinary(&async_iterator_proto);
        let error_proto = ordinary(&object_proto);

        let mut error_protos = HashMap::new();
        for kind in ErrorKind::ALL {
            let proto = if kind == ErrorKind::Error {
                error_proto.clone()
            } else {
                ordinary(&error_proto)
            };
            error_protos.insert(kind, proto);
        }

        let typed_base = ordinary(&object_proto);
        let typed_array_protos = TypedKind::ALL.iter().map(|k| (*k, ordinary(&typed_base))).collect();

        let symbol = |name: &str| Symbol::new(Some(format!("Symbol.{}", name)));
        Intrinsics {
            function_proto,
            array_proto,
            string_proto: ordinary(&object_proto),
            number_proto: ordinary(&object_proto),
            boolean_proto: ordinary(&object_proto),
            bigint_proto: ordinary(&object_proto),
            symbol_proto: ordinary(&object_proto),
            promise_proto: ordinary(&object_proto),
            map_proto: ordinary(&object_proto),
            set_proto: ordinary(&object_proto),
            weak_map_proto: ordinary(&object_proto),
            weak_set_proto: ordinary(&object_proto),
            date_proto: ordinary(&object_proto),
            regexp_proto: ordinary(&object_proto),
            iterator_proto,
            generator_proto,
            async_iterator_proto,
            async_generator_proto,
            generator_return: ordinary(&object_proto),
            typed_array_protos,
            error_protos,
            symbols: WellKnown {
                iterator: symbol("iterator"),
                async_iterator: symbol("asyncIterator"),
                has_instance: symbol("hasInstance"),
                to_primitive: symbol("toPrimitive"),
                to_string_tag: symbol("toStringTag"),
            },
            symbol_registry: Mutex::new(HashMap::new()),
            object_proto,
        }
    }

    pub fn error_proto(
        &self,
        kind: ErrorKind,
    ) -> Obj {
        match self.error_protos.get(&kind) {
            Some(proto) => proto.clone(),
            None => self.object_proto.clone(),
        }
    }

    pub fn typed_array_proto(
        &self,
        kind: TypedKind,
    ) -> Obj {
        match self.typed_array_protos.get(&kind) {
            Some(proto) => proto.clone(),
            None => self.object_proto.clone(),
        }
    }
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::new()
    }
}
