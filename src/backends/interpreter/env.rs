//! Lexical environments
//!
//! A chain of scopes. Function scopes carry a [`Frame`] holding `this`,
//! `new.target` and the home object; arrow functions and blocks do not, so
//! lookups of those walk outward to the nearest enclosing function.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::generator::Channel;
use crate::runtime::value::{Obj, Value};

/// Shared scope handle
#[derive(Clone)]
pub struct Env(Arc<Scope>);

pub struct Scope {
    vars: Mutex<HashMap<Arc<str>, Binding>>,
    parent: Option<Env>,
    frame: Option<Frame>,
}

/// A variable slot
#[derive(Clone)]
pub enum Binding {
    /// `None` while in the temporal dead zone
    Value { value: Option<Value>, mutable: bool },
    /// Live import: reads through to the exporting module's scope
    Import { module: Env, name: Arc<str> },
}

/// Per-call state of a non-arrow function, module or sandbox body
#[derive(Default)]
pub struct Frame {
    /// `None` in a derived constructor before `super()` returns
    pub this: Mutex<Option<Value>>,
    pub home: Option<Obj>,
    pub new_target: Option<Obj>,
    /// The running function object (for `super(...)` lookups)
    pub func: Option<Obj>,
    /// Module path used to resolve relative dynamic imports
    pub referrer: Option<Arc<PathBuf>>,
    /// Set inside generator bodies
    pub generator: Option<Arc<Channel>>,
}

impl Frame {
    /// Frame of a module or sandbox body
    pub fn module(referrer: Option<Arc<PathBuf>>) -> Self {
        Frame {
            this: Mutex::new(Some(Value::Undefined)),
            referrer,
            ..Frame::default()
        }
    }
}

/// Outcome of a variable read
pub enum Lookup {
    Found(Value),
    /// Declared but not yet initialized
    Uninitialized,
    Missing,
}

/// Outcome of a variable write
#[derive(Debug, PartialEq, Eq)]
pub enum Assign {
    Done,
    Const,
    Uninitialized,
    Missing,
}

impl Env {
    /// Outermost scope
    pub fn root() -> Env {
        Env(Arc::new(Scope {
            vars: Mutex::new(HashMap::new()),
            parent: None,
            frame: Some(Frame::module(None)),
        }))
    }

    /// Block scope nested in this one
    pub fn child(&self) -> Env {
        Env(Arc::new(Scope {
            vars: Mutex::new(HashMap::new()),
            parent: Some(self.clone()),
            frame: None,
        }))
    }

    /// Function scope nested in this one
    pub fn with_frame(
        &self,
        frame: Frame,
    ) -> Env {
        Env(Arc::new(Scope {
            vars: Mutex::new(HashMap::new()),
            parent: Some(self.clone()),
            frame: Some(frame),
        }))
    }

    pub fn ptr_eq(
        &self,
        other: &Env,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Declare an initialized binding, replacing any previous one in this scope
    pub fn declare(
        &self,
        name: &str,
        value: Value,
        mutable: bool,
    ) {
        self.0.vars.lock().insert(
            Arc::from(name),
            Binding::Value {
                value: Some(value),
                mutable,
            },
        );
    }

    /// Declare a binding in its temporal dead zone
    pub fn declare_uninitialized(
        &self,
        name: &str,
        mutable: bool,
    ) {
        self.0
            .vars
            .lock()
            .insert(Arc::from(name), Binding::Value { value: None, mutable });
    }

    /// `var` hoisting: declare as `undefined` unless already present
    pub fn declare_var(
        &self,
        name: &str,
    ) {
        self.0
            .vars
            .lock()
            .entry(Arc::from(name))
            .or_insert(Binding::Value {
                value: Some(Value::Undefined),
                mutable: true,
            });
    }

    /// Bind `name` to another scope's binding
    pub fn declare_import(
        &self,
        name: &str,
        module: Env,
        exported: &str,
    ) {
        self.0.vars.lock().insert(
            Arc::from(name),
            Binding::Import {
                module,
                name: Arc::from(exported),
            },
        );
    }

    /// Initialize a binding of this scope (leaves the dead zone)
    pub fn initialize(
        &self,
        name: &str,
        value: Value,
    ) {
        let mut vars = self.0.vars.lock();
        match vars.get_mut(name) {
            Some(Binding::Value { value: slot, .. }) => *slot = Some(value),
            _ => {
                vars.insert(
                    Arc::from(name),
                    Binding::Value {
                        value: Some(value),
                        mutable: true,
                    },
                );
            }
        }
    }

    pub fn has_local(
        &self,
        name: &str,
    ) -> bool {
        self.0.vars.lock().contains_key(name)
    }

    /// Names declared directly in this scope
    pub fn local_names(&self) -> Vec<Arc<str>> {
        self.0.vars.lock().keys().cloned().collect()
    }

    /// Read a variable through the scope chain
    pub fn lookup(
        &self,
        name: &str,
    ) -> Lookup {
        let mut scope = Some(self.clone());
        while let Some(env) = scope {
            let binding = env.0.vars.lock().get(name).cloned();
            match binding {
                Some(Binding::Value { value: Some(v), .. }) => return Lookup::Found(v),
                Some(Binding::Value { value: None, .. }) => return Lookup::Uninitialized,
                Some(Binding::Import { module, name }) => return module.lookup_local(&name),
                None => scope = env.0.parent.clone(),
            }
        }
        Lookup::Missing
    }

    /// Read a variable of this scope only
    pub fn lookup_local(
        &self,
        name: &str,
    ) -> Lookup {
        let binding = self.0.vars.lock().get(name).cloned();
        match binding {
            Some(Binding::Value { value: Some(v), .. }) => Lookup::Found(v),
            Some(Binding::Value { value: None, .. }) => Lookup::Uninitialized,
            Some(Binding::Import { module, name }) => module.lookup_local(&name),
            None => Lookup::Missing,
        }
    }

    /// Write a variable through the scope chain
    pub fn assign(
        &self,
        name: &str,
        value: Value,
    ) -> Assign {
        let mut scope = Some(self.clone());
        while let Some(env) = scope {
            scope = {
                let mut vars = env.0.vars.lock();
                let parent = match vars.get_mut(name) {
                    Some(Binding::Value { value: slot, mutable }) => {
                        return match (slot.is_some(), *mutable) {
                            (false, _) => Assign::Uninitialized,
                            (true, false) => Assign::Const,
                            (true, true) => {
                                *slot = Some(value);
                                Assign::Done
                            }
                        };
                    }
                    // imports are read-only
                    Some(Binding::Import { .. }) => return Assign::Const,
                    None => env.0.parent.clone(),
                };
                parent
            };
        }
        Assign::Missing
    }

    /// Nearest enclosing function frame
    pub fn frame(&self) -> Option<&Frame> {
        let mut scope: &Env = self;
        loop {
            if let Some(frame) = &scope.0.frame {
                return Some(frame);
            }
            scope = scope.0.parent.as_ref()?;
        }
    }

    /// `this` of the nearest function; `None` before `super()` in a derived constructor
    pub fn this_value(&self) -> Option<Value> {
        self.frame().and_then(|f| f.this.lock().clone())
    }

    /// Bind `this` after `super()` returns; `false` if it was already bound
    pub fn bind_this(
        &self,
        value: Value,
    ) -> bool {
        match self.frame() {
            Some(frame) => {
                let mut this = frame.this.lock();
                if this.is_some() {
                    return false;
                }
                *this = Some(value);
                true
            }
            None => false,
        }
    }

    /// Module path of the innermost enclosing module or sandbox body
    pub fn referrer(&self) -> Option<Arc<PathBuf>> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(referrer) = env.0.frame.as_ref().and_then(|f| f.referrer.clone()) {
                return Some(referrer);
            }
            scope = env.0.parent.as_ref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_and_assignment() {
        let outer = Env::root();
        outer.declare("x", Value::Number(1.0), true);
        let inner = outer.child();
        inner.declare("x", Value::Number(2.0), false);

        assert!(matches!(inner.lookup("x"), Lookup::Found(Value::Number(n)) if n == 2.0));
        assert_eq!(inner.assign("x", Value::Null), Assign::Const);
        assert_eq!(outer.assign("x", Value::Null), Assign::Done);
        assert_eq!(inner.assign("y", Value::Null), Assign::Missing);
    }

    #[test]
    fn test_dead_zone() {
        let env = Env::root();
        env.declare_uninitialized("c", false);
        assert!(matches!(env.lookup("c"), Lookup::Uninitialized));
        assert_eq!(env.assign("c", Value::Null), Assign::Uninitialized);
        env.initialize("c", Value::Bool(true));
        assert!(matches!(env.lookup("c"), Lookup::Found(Value::Bool(true))));
    }

    #[test]
    fn test_live_import() {
        let module = Env::root();
        module.declare("count", Value::Number(0.0), true);
        let importer = Env::root();
        importer.declare_import("n", module.clone(), "count");

        module.assign("count", Value::Number(5.0));
        assert!(matches!(importer.lookup("n"), Lookup::Found(Value::Number(n)) if n == 5.0));
        assert_eq!(importer.assign("n", Value::Null), Assign::Const);
    }

    #[test]
    fn test_frames() {
        let module = Env::root();
        let func = module.with_frame(Frame {
            this: Mutex::new(None),
            ..Frame::default()
        });
        let arrow = func.child();
        assert!(arrow.this_value().is_none());
        assert!(arrow.bind_this(Value::Number(1.0)));
        assert!(!arrow.bind_this(Value::Number(2.0)));
        assert!(matches!(func.this_value(), Some(Value::Number(n)) if n == 1.0));
    }
}
