//! Operator semantics

use std::cmp::Ordering;

use num_bigint::BigInt;

use super::property::{describe_value, Hint};
use super::{BoxFuture, Interpreter, JsResult};
use crate::frontend::parser::ast::{BinaryOp, UnaryOp};
use crate::runtime::value::number::{f64_to_bigint, string_to_bigint, to_int32, to_uint32};
use crate::runtime::value::{Callable, ObjectKind, PropertyKey, Value};

/// `BigInt` vs `Number` ordering; `None` when `n` is NaN
fn compare_bigint_number(
    b: &BigInt,
    n: f64,
) -> Option<Ordering> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if n == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let floor = f64_to_bigint(n.floor())?;
    Some(match b.cmp(&floor) {
        Ordering::Equal if n.fract() != 0.0 => Ordering::Less,
        other => other,
    })
}

/// Compare strings by UTF-16 code units
fn compare_utf16(
    a: &str,
    b: &str,
) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// `base ** exponent` with JavaScript edge cases
pub(crate) fn number_pow(
    base: f64,
    exponent: f64,
) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

impl Interpreter {
    /// Binary operator other than the short-circuiting ones
    pub(crate) async fn binary_op(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
    ) -> JsResult<Value> {
        match op {
            BinaryOp::Add => self.add(left, right).await,
            BinaryOp::StrictEq => Ok(Value::Bool(left.strict_equals(&right))),
            BinaryOp::StrictNotEq => Ok(Value::Bool(!left.strict_equals(&right))),
            BinaryOp::Eq => Ok(Value::Bool(self.loose_equals(&left, &right).await?)),
            BinaryOp::NotEq => Ok(Value::Bool(!self.loose_equals(&left, &right).await?)),
            BinaryOp::Lt => Ok(Value::Bool(self.less_than(&left, &right, true).await? == Some(true))),
            BinaryOp::Gt => Ok(Value::Bool(self.less_than(&right, &left, false).await? == Some(true))),
            BinaryOp::Le => Ok(Value::Bool(self.less_than(&right, &left, false).await? == Some(false))),
            BinaryOp::Ge => Ok(Value::Bool(self.less_than(&left, &right, true).await? == Some(false))),
            BinaryOp::In => {
                let Value::Object(obj) = &right else {
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        describe_value(&left),
                        describe_value(&right)
                    )));
                };
                let key = self.to_property_key(&left).await?;
                Ok(Value::Bool(self.has_property(obj, &key)))
            }
            BinaryOp::Instanceof => Ok(Value::Bool(self.instance_of(&left, &right).await?)),
            _ => {
                let l = self.to_numeric(&left).await?;
                let r = self.to_numeric(&right).await?;
                self.numeric_op(op, l, r)
            }
        }
    }

    /// `+`: string concatenation or numeric addition
    async fn add(
        &self,
        left: Value,
        right: Value,
    ) -> JsResult<Value> {
        if let (Value::Number(a), Value::Number(b)) = (&left, &right) {
            return Ok(Value::Number(a + b));
        }
        let l = self.to_primitive(&left, Hint::Default).await?;
        let r = self.to_primitive(&right, Hint::Default).await?;
        if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
            let ls = self.to_string(&l).await?;
            let rs = self.to_string(&r).await?;
            let mut s = String::with_capacity(ls.len() + rs.len());
            s.push_str(&ls);
            s.push_str(&rs);
            return Ok(Value::from(s));
        }
        let l = self.to_numeric(&l).await?;
        let r = self.to_numeric(&r).await?;
        self.numeric_op(BinaryOp::Add, l, r)
    }

    /// Arithmetic and bitwise operators on numeric operands
    pub(crate) fn numeric_op(
        &self,
        op: BinaryOp,
        left: Value,
        right: Value,
    ) -> JsResult<Value> {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(number_op(op, *a, *b))),
            (Value::BigInt(a), Value::BigInt(b)) => self.bigint_op(op, a, b),
            _ => Err(self.type_error("Cannot mix BigInt and other types, use explicit conversions")),
        }
    }

    fn bigint_op(
        &self,
        op: BinaryOp,
        a: &BigInt,
        b: &BigInt,
    ) -> JsResult<Value> {
        let zero = BigInt::from(0);
        let shift = |n: &BigInt| -> JsResult<usize> {
            let s = n.to_string().parse::<usize>();
            s.map_err(|_| self.range_error("Maximum BigInt size exceeded"))
        };
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div | BinaryOp::Mod if *b == zero => return Err(self.range_error("Division by zero")),
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::Exp => {
                if *b < zero {
                    return Err(self.range_error("Exponent must be non-negative"));
                }
                let e = u32::try_from(shift(b)?).map_err(|_| self.range_error("Maximum BigInt size exceeded"))?;
                a.pow(e)
            }
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
            BinaryOp::Shl if *b < zero => a >> shift(&-b)?,
            BinaryOp::Shl => a << shift(b)?,
            BinaryOp::Shr if *b < zero => a << shift(&-b)?,
            BinaryOp::Shr => a >> shift(b)?,
            BinaryOp::UShr => {
                return Err(self.type_error("BigInts have no unsigned right shift, use >> instead"));
            }
            _ => return Err(self.type_error("invalid BigInt operation")),
        };
        Ok(Value::bigint(result))
    }

    /// `==`
    pub fn loose_equals<'a>(
        &'a self,
        a: &'a Value,
        b: &'a Value,
    ) -> BoxFuture<'a, JsResult<bool>> {
        Box::pin(async move {
            Ok(match (a, b) {
                (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
                (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
                (Value::Number(_), Value::String(s)) => {
                    let n = Value::Number(self.primitive_to_number(&Value::String(s.clone()))?);
                    a.strict_equals(&n)
                }
                (Value::String(_), Value::Number(_)) => return self.loose_equals(b, a).await,
                (Value::BigInt(x), Value::String(s)) => string_to_bigint(s).map(|y| **x == y).unwrap_or(false),
                (Value::String(_), Value::BigInt(_)) => return self.loose_equals(b, a).await,
                (Value::Bool(x), _) => {
                    let n = Value::Number(*x as u8 as f64);
                    return self.loose_equals(&n, b).await;
                }
                (_, Value::Bool(_)) => return self.loose_equals(b, a).await,
                (Value::Object(_), Value::Object(_)) => a.strict_equals(b),
                (Value::Object(_), _) => {
                    let p = self.to_primitive(a, Hint::Default).await?;
                    return self.loose_equals(&p, b).await;
                }
                (_, Value::Object(_)) => return self.loose_equals(b, a).await,
                (Value::BigInt(x), Value::Number(n)) | (Value::Number(n), Value::BigInt(x)) => {
                    compare_bigint_number(x, *n) == Some(Ordering::Equal)
                }
                _ => a.strict_equals(b),
            })
        })
    }

    /// Abstract relational comparison `a < b`; `None` when undefined (NaN)
    async fn less_than(
        &self,
        a: &Value,
        b: &Value,
        left_first: bool,
    ) -> JsResult<Option<bool>> {
        let (pa, pb) = if left_first {
            let pa = self.to_primitive(a, Hint::Number).await?;
            (pa, self.to_primitive(b, Hint::Number).await?)
        } else {
            let pb = self.to_primitive(b, Hint::Number).await?;
            (self.to_primitive(a, Hint::Number).await?, pb)
        };
        if let (Value::String(x), Value::String(y)) = (&pa, &pb) {
            return Ok(Some(compare_utf16(x, y) == Ordering::Less));
        }
        match (&pa, &pb) {
            (Value::BigInt(x), Value::String(y)) => {
                return Ok(string_to_bigint(y).map(|y| **x < y));
            }
            (Value::String(x), Value::BigInt(y)) => {
                return Ok(string_to_bigint(x).map(|x| x < **y));
            }
            _ => {}
        }
        let na = self.to_numeric(&pa).await?;
        let nb = self.to_numeric(&pb).await?;
        Ok(match (&na, &nb) {
            (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).map(|o| o == Ordering::Less),
            (Value::BigInt(x), Value::BigInt(y)) => Some(x < y),
            (Value::BigInt(x), Value::Number(y)) => compare_bigint_number(x, *y).map(|o| o == Ordering::Less),
            (Value::Number(x), Value::BigInt(y)) => {
                compare_bigint_number(y, *x).map(|o| o == Ordering::Greater)
            }
            _ => None,
        })
    }

    /// `value instanceof target`
    pub async fn instance_of(
        &self,
        value: &Value,
        target: &Value,
    ) -> JsResult<bool> {
        if !target.is_object() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not an object"));
        }
        let key = PropertyKey::Symbol(self.intrinsics().symbols.has_instance.clone());
        let handler = self.get(target, &key).await?;
        if !handler.is_nullish() {
            let result = self.call(&handler, target.clone(), vec![value.clone()]).await?;
            return Ok(result.to_boolean());
        }
        if !self.is_callable(target) {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        self.ordinary_has_instance(target, value).await
    }

    /// `OrdinaryHasInstance`
    pub(crate) async fn ordinary_has_instance(
        &self,
        target: &Value,
        value: &Value,
    ) -> JsResult<bool> {
        let Value::Object(func) = target else {
            return Ok(false);
        };
        let bound = match &func.lock().kind {
            ObjectKind::Function(Callable::Bound(b)) => Some(b.target.clone()),
            _ => None,
        };
        if let Some(inner) = bound {
            return Box::pin(self.instance_of(value, &Value::Object(inner))).await;
        }
        let Value::Object(obj) = value else {
            return Ok(false);
        };
        let proto = match self.get_named(target, "prototype").await? {
            Value::Object(p) => p,
            _ => return Err(self.type_error("Function has non-object prototype in instanceof check")),
        };
        let mut current = obj.proto();
        while let Some(p) = current {
            if p.ptr_eq(&proto) {
                return Ok(true);
            }
            current = p.proto();
        }
        Ok(false)
    }

    /// Unary operators other than `delete` and `typeof`
    pub(crate) async fn unary_op(
        &self,
        op: UnaryOp,
        value: Value,
    ) -> JsResult<Value> {
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.to_boolean()),
            UnaryOp::Void => Value::Undefined,
            UnaryOp::Typeof => Value::str(value.type_of()),
            UnaryOp::Pos => Value::Number(self.to_number(&value).await?),
            UnaryOp::Neg => match self.to_numeric(&value).await? {
                Value::BigInt(n) => Value::bigint(-(*n).clone()),
                Value::Number(n) => Value::Number(-n),
                _ => Value::Number(f64::NAN),
            },
            UnaryOp::BitNot => match self.to_numeric(&value).await? {
                Value::BigInt(n) => Value::bigint(!(*n).clone()),
                Value::Number(n) => Value::Number(!to_int32(n) as f64),
                _ => Value::Number(-1.0),
            },
            UnaryOp::Delete => Value::Bool(true),
        })
    }

    /// `++` / `--` on a numeric value
    pub(crate) fn increment(
        &self,
        value: &Value,
        delta: i32,
    ) -> Value {
        match value {
            Value::BigInt(n) => Value::bigint(&**n + BigInt::from(delta)),
            Value::Number(n) => Value::Number(n + delta as f64),
            _ => Value::Number(f64::NAN),
        }
    }
}

fn number_op(
    op: BinaryOp,
    a: f64,
    b: f64,
) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => {
            if b.is_infinite() && a.is_finite() {
                a
            } else {
                a % b
            }
        }
        BinaryOp::Exp => number_pow(a, b),
        BinaryOp::BitAnd => (to_int32(a) & to_int32(b)) as f64,
        BinaryOp::BitOr => (to_int32(a) | to_int32(b)) as f64,
        BinaryOp::BitXor => (to_int32(a) ^ to_int32(b)) as f64,
        BinaryOp::Shl => to_int32(a).wrapping_shl(to_uint32(b) & 31) as f64,
        BinaryOp::Shr => (to_int32(a) >> (to_uint32(b) & 31)) as f64,
        BinaryOp::UShr => (to_uint32(a) >> (to_uint32(b) & 31)) as f64,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::number::bigint_to_f64;

    #[test]
    fn test_number_ops() {
        assert_eq!(number_op(BinaryOp::Mod, -7.0, 2.0), -1.0);
        assert_eq!(number_op(BinaryOp::Shl, 1.0, 33.0), 2.0);
        assert_eq!(number_op(BinaryOp::UShr, -1.0, 0.0), 4_294_967_295.0);
        assert_eq!(number_op(BinaryOp::Shr, -8.0, 1.0), -4.0);
        assert!(number_pow(1.0, f64::INFINITY).is_nan());
        assert_eq!(number_pow(2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_bigint_number_comparison() {
        let b = BigInt::from(3);
        assert_eq!(compare_bigint_number(&b, 3.5), Some(Ordering::Less));
        assert_eq!(compare_bigint_number(&b, 3.0), Some(Ordering::Equal));
        assert_eq!(compare_bigint_number(&b, 2.9), Some(Ordering::Greater));
        assert_eq!(compare_bigint_number(&b, f64::NAN), None);
        assert_eq!(bigint_to_f64(&b), 3.0);
    }

    #[test]
    fn test_utf16_order() {
        // U+FF61 sorts after a surrogate pair in UTF-16
        assert_eq!(compare_utf16("\u{FF61}", "\u{1F600}"), Ordering::Greater);
        assert_eq!(compare_utf16("a", "b"), Ordering::Less);
    }
}
