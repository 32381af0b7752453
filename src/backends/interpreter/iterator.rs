//! Iteration protocol

use parking_lot::Mutex;

use super::{Interpreter, JsResult};
use crate::runtime::value::{Callable, CallArgs, Obj, Object, ObjectKind, Property, PropertyKey, Value};

/// An iterator being consumed
pub enum IterRecord {
    /// Array with its default iterator: elements are read live by index
    Array { array: Obj, index: usize },
    /// Pre-computed sequence (string code points)
    List { items: std::vec::IntoIter<Value> },
    /// Any object implementing `next()`
    Object {
        iterator: Value,
        next: Value,
        is_async: bool,
    },
}

impl Interpreter {
    /// `{ value, done }`
    pub fn iter_result(
        &self,
        value: Value,
        done: bool,
    ) -> Value {
        Value::Object(self.object_from(vec![("value", value), ("done", Value::Bool(done))]))
    }

    /// Whether `method` is the builtin `Array.prototype.values`
    fn is_array_values(
        &self,
        method: &Value,
    ) -> bool {
        let Value::Object(f) = method else {
            return false;
        };
        matches!(&f.lock().kind, ObjectKind::Function(Callable::Native(n)) if &*n.name == "values")
    }

    /// `GetIterator(value, sync)`
    pub async fn get_iterator(
        &self,
        value: &Value,
    ) -> JsResult<IterRecord> {
        if let Value::String(s) = value {
            let items: Vec<Value> = s.chars().map(|c| Value::from(c.to_string())).collect();
            return Ok(IterRecord::List {
                items: items.into_iter(),
            });
        }
        let key = PropertyKey::Symbol(self.intrinsics().symbols.iterator.clone());
        let method = self.get(value, &key).await?;
        if let Value::Object(array) = value {
            if array.is_array() && self.is_array_values(&method) {
                return Ok(IterRecord::Array {
                    array: array.clone(),
                    index: 0,
                });
            }
        }
        if !self.is_callable(&method) {
            return Err(self.type_error(format!(
                "{} is not iterable",
                super::property::describe_value(value)
            )));
        }
        self.iterator_from_method(value, &method, false).await
    }

    /// `GetIterator(value, async)`: falls back to the sync iterator
    pub async fn get_async_iterator(
        &self,
        value: &Value,
    ) -> JsResult<IterRecord> {
        let key = PropertyKey::Symbol(self.intrinsics().symbols.async_iterator.clone());
        let method = if value.is_nullish() {
            Value::Undefined
        } else {
            self.get(value, &key).await?
        };
        if method.is_nullish() {
            return self.get_iterator(value).await;
        }
        self.iterator_from_method(value, &method, true).await
    }

    async fn iterator_from_method(
        &self,
        value: &Value,
        method: &Value,
        is_async: bool,
    ) -> JsResult<IterRecord> {
        let iterator = self.call(method, value.clone(), Vec::new()).await?;
        if !iterator.is_object() {
            return Err(self.type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next = self.get_named(&iterator, "next").await?;
        Ok(IterRecord::Object {
            iterator,
            next,
            is_async,
        })
    }

    /// Next value, `None` once the iterator is done
    pub async fn iter_next(
        &self,
        record: &mut IterRecord,
    ) -> JsResult<Option<Value>> {
        match record {
            IterRecord::Array { array, index } => {
                let item = match &array.lock().kind {
                    ObjectKind::Array(items) => items.get(*index).cloned(),
                    _ => None,
                };
                if item.is_some() {
                    *index += 1;
                }
                Ok(item)
            }
            IterRecord::List { items } => Ok(items.next()),
            IterRecord::Object {
                iterator,
                next,
                is_async,
            } => {
                let mut result = self.call(next, iterator.clone(), Vec::new()).await?;
                if *is_async {
                    result = self.await_value(result).await?;
                }
                if !result.is_object() {
                    return Err(self.type_error(format!(
                        "Iterator result {} is not an object",
                        super::property::describe_value(&result)
                    )));
                }
                if self.get_named(&result, "done").await?.to_boolean() {
                    return Ok(None);
                }
                Ok(Some(self.get_named(&result, "value").await?))
            }
        }
    }

    /// `IteratorClose`: call `return()` when a loop exits early
    pub async fn iter_close(
        &self,
        record: &IterRecord,
    ) -> JsResult<()> {
        let IterRecord::Object {
            iterator, is_async, ..
        } = record
        else {
            return Ok(());
        };
        let method = self.get_named(iterator, "return").await?;
        if method.is_nullish() {
            return Ok(());
        }
        let mut result = self.call(&method, iterator.clone(), Vec::new()).await?;
        if *is_async {
            result = self.await_value(result).await?;
        }
        if !result.is_object() {
            return Err(self.type_error("iterator.return() did not return an object"));
        }
        Ok(())
    }

    /// Collect every value of an iterable
    pub async fn iterate_to_vec(
        &self,
        value: &Value,
    ) -> JsResult<Vec<Value>> {
        if let Value::Object(obj) = value {
            if let Some(items) = obj.array_elements() {
                let key = PropertyKey::Symbol(self.intrinsics().symbols.iterator.clone());
                let method = self.get(value, &key).await?;
                if self.is_array_values(&method) {
                    return Ok(items);
                }
            }
        }
        let mut record = self.get_iterator(value).await?;
        let mut out = Vec::new();
        while let Some(v) = self.iter_next(&mut record).await? {
            out.push(v);
        }
        Ok(out)
    }

    /// Iterator object whose `next()` pulls from `step`
    pub fn native_iterator<F>(
        &self,
        tag: &str,
        step: F,
    ) -> Obj
    where
        F: FnMut(&Interpreter) -> JsResult<Option<Value>> + Send + 'static,
    {
        let step = Mutex::new(step);
        let next = self.native_fn("next", 0, move |interp, _args: CallArgs| {
            let item = {
                let mut step = step.lock();
                (*step)(interp)?
            };
            Ok(match item {
                Some(v) => interp.iter_result(v, false),
                None => interp.iter_result(Value::Undefined, true),
            })
        });
        let obj = Obj::new(Object::new(
            Some(self.intrinsics().iterator_proto.clone()),
            ObjectKind::Ordinary,
        ));
        {
            let mut object = obj.lock();
            object.define("next", Property::hidden(Value::Object(next)));
            let key = PropertyKey::Symbol(self.intrinsics().symbols.to_string_tag.clone());
            object.define(key, Property::constant(Value::str(tag)));
        }
        obj
    }

    /// Iterator over a fixed list of values
    pub fn list_iterator(
        &self,
        tag: &str,
        items: Vec<Value>,
    ) -> Obj {
        let mut items = items.into_iter();
        self.native_iterator(tag, move |_| Ok(items.next()))
    }
}
