//! `Number`, `Boolean` and `BigInt`

use std::sync::Arc;

use num_bigint::{BigInt, Sign};

use super::{async_ctor, define_async, integer_arg, proto_for, string_arg};
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::number::{
    bigint_to_f64, f64_to_bigint, number_to_radix_string, number_to_string, parse_float, parse_int, string_to_bigint,
    to_int32,
};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, Property, Value};

pub(crate) fn install(interp: &Interpreter) {
    install_number(interp);
    install_boolean(interp);
    install_bigint(interp);
}

fn install_number(interp: &Interpreter) {
    let proto = interp.intrinsics().number_proto.clone();
    proto.lock().kind = ObjectKind::Boxed(Value::Number(0.0));
    let ctor = interp.define_constructor("Number", 1, async_ctor(number_ctor), &proto);

    {
        let mut object = ctor.lock();
        for (name, value) in [
            ("EPSILON", f64::EPSILON),
            ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
            ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("NaN", f64::NAN),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ] {
            object.define(name, Property::constant(Value::Number(value)));
        }
    }

    interp.define_method(&ctor, "isFinite", 1, |_, args: CallArgs| {
        Ok(Value::Bool(matches!(args.arg(0), Value::Number(n) if n.is_finite())))
    });
    interp.define_method(&ctor, "isNaN", 1, |_, args: CallArgs| {
        Ok(Value::Bool(matches!(args.arg(0), Value::Number(n) if n.is_nan())))
    });
    interp.define_method(&ctor, "isInteger", 1, |_, args: CallArgs| {
        Ok(Value::Bool(matches!(args.arg(0), Value::Number(n) if n.is_finite() && n.trunc() == n)))
    });
    interp.define_method(&ctor, "isSafeInteger", 1, |_, args: CallArgs| {
        Ok(Value::Bool(matches!(
            args.arg(0),
            Value::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= 9_007_199_254_740_991.0
        )))
    });
    define_async(interp, &ctor, "parseFloat", 1, |interp: Interpreter, args: CallArgs| async move {
        Ok(Value::Number(parse_float(&string_arg(&interp, &args, 0).await?)))
    });
    define_async(interp, &ctor, "parseInt", 2, |interp: Interpreter, args: CallArgs| async move {
        let text = string_arg(&interp, &args, 0).await?;
        let radix = to_int32(interp.to_number(&args.arg(1)).await?);
        Ok(Value::Number(parse_int(&text, radix)))
    });

    interp.define_method(&proto, "valueOf", 0, |interp, args: CallArgs| {
        Ok(Value::Number(this_number(interp, &args.this)?))
    });
    interp.define_method(&proto, "toString", 1, |interp, args: CallArgs| {
        let x = this_number(interp, &args.this)?;
        let radix = radix_arg(interp, &args)?;
        Ok(Value::from(number_to_radix_string(x, radix)))
    });
    interp.define_method(&proto, "toLocaleString", 0, |interp, args: CallArgs| {
        Ok(Value::from(locale_string(this_number(interp, &args.this)?)))
    });
    interp.define_method(&proto, "toFixed", 1, |interp, args: CallArgs| {
        let x = this_number(interp, &args.this)?;
        let digits = integer_arg(interp, &args, 0, 0.0)?;
        if !(0.0..=100.0).contains(&digits) {
            return Err(interp.range_error("toFixed() digits argument must be between 0 and 100"));
        }
        if !x.is_finite() || x.abs() >= 1e21 {
            return Ok(Value::from(number_to_string(x)));
        }
        let text = to_fixed(x.abs(), digits as usize);
        let negative = x < 0.0 && text.bytes().any(|b| b.is_ascii_digit() && b != b'0');
        Ok(Value::from(if negative { format!("-{}", text) } else { text }))
    });
    interp.define_method(&proto, "toExponential", 1, |interp, args: CallArgs| {
        let x = this_number(interp, &args.this)?;
        let digits = integer_arg(interp, &args, 0, 0.0)?;
        if !x.is_finite() {
            return Ok(Value::from(number_to_string(x)));
        }
        if !(0.0..=100.0).contains(&digits) {
            return Err(interp.range_error("toExponential() argument must be between 0 and 100"));
        }
        let sign = if x < 0.0 { "-" } else { "" };
        let text = if args.arg(0).is_undefined() {
            shortest_exponential(x.abs())
        } else {
            let (digits, exp) = significant_digits(x.abs(), digits as usize + 1);
            exponential(&digits, exp)
        };
        Ok(Value::from(format!("{}{}", sign, text)))
    });
    interp.define_method(&proto, "toPrecision", 1, |interp, args: CallArgs| {
        let x = this_number(interp, &args.this)?;
        if args.arg(0).is_undefined() || !x.is_finite() {
            return Ok(Value::from(number_to_string(x)));
        }
        let precision = integer_arg(interp, &args, 0, 0.0)?;
        if !(1.0..=100.0).contains(&precision) {
            return Err(interp.range_error("toPrecision() argument must be between 1 and 100"));
        }
        Ok(Value::from(to_precision(x, precision as usize)))
    });
}

fn install_boolean(interp: &Interpreter) {
    let proto = interp.intrinsics().boolean_proto.clone();
    proto.lock().kind = ObjectKind::Boxed(Value::Bool(false));
    interp.define_constructor(
        "Boolean",
        1,
        crate::runtime::value::NativeFn::Sync(Arc::new(|interp: &Interpreter, args: CallArgs| {
            let b = args.arg(0).to_boolean();
            match &args.new_target {
                None => Ok(Value::Bool(b)),
                Some(target) => {
                    let proto = proto_for(interp, Some(target), &interp.intrinsics().boolean_proto);
                    Ok(boxed(proto, Value::Bool(b)))
                }
            }
        })),
        &proto,
    );
    interp.define_method(&proto, "valueOf", 0, |interp, args: CallArgs| {
        Ok(Value::Bool(this_boolean(interp, &args.this)?))
    });
    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| {
        Ok(Value::str(if this_boolean(interp, &args.this)? { "true" } else { "false" }))
    });
}

fn install_bigint(interp: &Interpreter) {
    let proto = interp.intrinsics().bigint_proto.clone();
    let ctor = interp.define_constructor("BigInt", 1, async_ctor(bigint_ctor), &proto);

    define_async(interp, &ctor, "asIntN", 2, |interp, args| as_n(interp, args, true));
    define_async(interp, &ctor, "asUintN", 2, |interp, args| as_n(interp, args, false));

    interp.define_method(&proto, "valueOf", 0, |interp, args: CallArgs| {
        Ok(Value::BigInt(this_bigint(interp, &args.this)?))
    });
    interp.define_method(&proto, "toString", 0, |interp, args: CallArgs| {
        let n = this_bigint(interp, &args.this)?;
        let radix = radix_arg(interp, &args)?;
        Ok(Value::from(n.to_str_radix(radix)))
    });
    interp.define_method(&proto, "toLocaleString", 0, |interp, args: CallArgs| {
        let n = this_bigint(interp, &args.this)?;
        let digits = n.magnitude().to_string();
        let sign = if n.sign() == Sign::Minus { "-" } else { "" };
        Ok(Value::from(format!("{}{}", sign, group_thousands(&digits))))
    });
    proto.lock().define(
        crate::runtime::value::PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
        Property::constant(Value::str("BigInt")),
    );
}

fn boxed(
    proto: Obj,
    value: Value,
) -> Value {
    Value::Object(Obj::new(Object::new(Some(proto), ObjectKind::Boxed(value))))
}

async fn number_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let n = match args.args.first() {
        None => 0.0,
        Some(v) => match interp.to_numeric(v).await? {
            Value::BigInt(b) => bigint_to_f64(&b),
            Value::Number(n) => n,
            _ => f64::NAN,
        },
    };
    match &args.new_target {
        None => Ok(Value::Number(n)),
        Some(target) => {
            let proto = proto_for(&interp, Some(target), &interp.intrinsics().number_proto);
            Ok(boxed(proto, Value::Number(n)))
        }
    }
}

async fn bigint_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    if args.new_target.is_some() {
        return Err(interp.type_error("BigInt is not a constructor"));
    }
    let prim = interp
        .to_primitive(&args.arg(0), crate::backends::interpreter::property::Hint::Number)
        .await?;
    match prim {
        Value::Number(n) => f64_to_bigint(n).map(Value::bigint).ok_or_else(|| {
            interp.range_error(format!(
                "The number {} cannot be converted to a BigInt because it is not an integer",
                number_to_string(n)
            ))
        }),
        other => to_bigint(&interp, &other),
    }
}

/// `ToBigInt` of a primitive
pub(crate) fn to_bigint(
    interp: &Interpreter,
    value: &Value,
) -> JsResult<Value> {
    match value {
        Value::BigInt(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::bigint(BigInt::from(*b as u8))),
        Value::String(s) => string_to_bigint(s)
            .map(Value::bigint)
            .ok_or_else(|| interp.syntax_error(format!("Cannot convert {} to a BigInt", s))),
        Value::Number(n) => Err(interp.type_error(format!("Cannot convert {} to a BigInt", number_to_string(*n)))),
        Value::Undefined => Err(interp.type_error("Cannot convert undefined to a BigInt")),
        Value::Null => Err(interp.type_error("Cannot convert null to a BigInt")),
        Value::Symbol(_) => Err(interp.type_error("Cannot convert a Symbol value to a BigInt")),
        Value::Object(_) => Err(interp.type_error("Cannot convert object to a BigInt")),
    }
}

async fn as_n(
    interp: Interpreter,
    args: CallArgs,
    signed: bool,
) -> JsResult<Value> {
    let bits = interp.to_number(&args.arg(0)).await?;
    if !(0.0..=9_007_199_254_740_991.0).contains(&bits) || bits.fract() != 0.0 {
        return Err(interp.range_error("Invalid value: not (convertible to) a safe integer"));
    }
    let prim = interp
        .to_primitive(&args.arg(1), crate::backends::interpreter::property::Hint::Number)
        .await?;
    let Value::BigInt(n) = to_bigint(&interp, &prim)? else {
        return Ok(Value::Undefined);
    };
    let bits = bits as usize;
    if bits == 0 {
        return Ok(Value::bigint(BigInt::from(0)));
    }
    let modulus = BigInt::from(1u8) << bits;
    let mut m = n.as_ref() % &modulus;
    if m.sign() == Sign::Minus {
        m += &modulus;
    }
    if signed && m >= (BigInt::from(1u8) << (bits - 1)) {
        m -= modulus;
    }
    Ok(Value::bigint(m))
}

fn this_number(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Boxed(Value::Number(n)) => Ok(*n),
            _ => Err(interp.type_error("Number.prototype method called on incompatible receiver")),
        },
        _ => Err(interp.type_error("Number.prototype method called on incompatible receiver")),
    }
}

fn this_boolean(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<bool> {
    match this {
        Value::Bool(b) => Ok(*b),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Boxed(Value::Bool(b)) => Ok(*b),
            _ => Err(interp.type_error("Boolean.prototype method called on incompatible receiver")),
        },
        _ => Err(interp.type_error("Boolean.prototype method called on incompatible receiver")),
    }
}

fn this_bigint(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Arc<BigInt>> {
    match this {
        Value::BigInt(n) => Ok(n.clone()),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::Boxed(Value::BigInt(n)) => Ok(n.clone()),
            _ => Err(interp.type_error("BigInt.prototype method called on incompatible receiver")),
        },
        _ => Err(interp.type_error("BigInt.prototype method called on incompatible receiver")),
    }
}

fn radix_arg(
    interp: &Interpreter,
    args: &CallArgs,
) -> JsResult<u32> {
    let radix = integer_arg(interp, args, 0, 10.0)?;
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    Ok(radix as u32)
}

/// Extra digits printed to tell an exact tie from a near tie
const TIE_DIGITS: usize = 25;

/// Add one unit in the last place of a decimal digit string; `true` on overflow
fn increment(digits: &mut Vec<u8>) -> bool {
    for d in digits.iter_mut().rev() {
        match *d {
            b'.' => continue,
            b'9' => *d = b'0',
            _ => {
                *d += 1;
                return false;
            }
        }
    }
    digits.insert(0, b'1');
    true
}

/// True when the discarded digits are exactly one half
fn is_tie(tail: &str) -> bool {
    tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
}

/// `x` (non-negative) with `digits` fraction digits, ties rounded up
fn to_fixed(
    x: f64,
    digits: usize,
) -> String {
    let long = format!("{:.*}", digits + TIE_DIGITS, x);
    let (head, tail) = long.split_at(long.len() - TIE_DIGITS);
    if !is_tie(tail) {
        return format!("{:.*}", digits, x);
    }
    let mut bytes = head.trim_end_matches('.').as_bytes().to_vec();
    increment(&mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// The first `count` significant digits of `x` (non-negative) and its decimal exponent
fn significant_digits(
    x: f64,
    count: usize,
) -> (String, i32) {
    if x == 0.0 {
        return ("0".repeat(count), 0);
    }
    let long = format!("{:.*e}", count - 1 + TIE_DIGITS, x);
    let (mantissa, exp) = long.split_once('e').unwrap_or((&long, "0"));
    let mut exp: i32 = exp.parse().unwrap_or(0);
    let all: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let (head, tail) = all.split_at(count);
    let rounded = if is_tie(tail) {
        let mut bytes = head.as_bytes().to_vec();
        if increment(&mut bytes) {
            bytes.pop();
            exp += 1;
        }
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        let short = format!("{:.*e}", count - 1, x);
        let (m, e) = short.split_once('e').unwrap_or((&short, "0"));
        exp = e.parse().unwrap_or(exp);
        m.chars().filter(char::is_ascii_digit).collect()
    };
    (rounded, exp)
}

fn exponential(
    digits: &str,
    exp: i32,
) -> String {
    let (first, rest) = digits.split_at(1);
    let sign = if exp < 0 { '-' } else { '+' };
    if rest.is_empty() {
        format!("{}e{}{}", first, sign, exp.abs())
    } else {
        format!("{}.{}e{}{}", first, rest, sign, exp.abs())
    }
}

/// Exponential form with as many digits as needed to round-trip
fn shortest_exponential(x: f64) -> String {
    if x == 0.0 {
        return "0e+0".to_string();
    }
    let short = format!("{:e}", x);
    let (m, e) = short.split_once('e').unwrap_or((&short, "0"));
    let digits: String = m.chars().filter(char::is_ascii_digit).collect();
    exponential(&digits, e.parse().unwrap_or(0))
}

fn to_precision(
    x: f64,
    precision: usize,
) -> String {
    let sign = if x < 0.0 { "-" } else { "" };
    let (digits, exp) = significant_digits(x.abs(), precision);
    let body = if exp < -6 || exp >= precision as i32 {
        exponential(&digits, exp)
    } else if exp >= 0 {
        let point = exp as usize + 1;
        if point >= digits.len() {
            digits
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    } else {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    };
    format!("{}{}", sign, body)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `en-US` style: grouped integer part, at most three fraction digits
fn locale_string(x: f64) -> String {
    if !x.is_finite() {
        return if x.is_nan() {
            "NaN".into()
        } else if x > 0.0 {
            "∞".into()
        } else {
            "-∞".into()
        };
    }
    let fixed = to_fixed(x.abs(), 3);
    let (int, frac) = fixed.split_once('.').unwrap_or((&fixed, ""));
    let frac = frac.trim_end_matches('0');
    let sign = if x < 0.0 && (int != "0" || !frac.is_empty()) { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, group_thousands(int))
    } else {
        format!("{}{}.{}", sign, group_thousands(int), frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed_rounds_ties_up() {
        assert_eq!(to_fixed(0.5, 0), "1");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(1.25, 1), "1.3");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(3.14159, 3), "3.142");
        assert_eq!(to_fixed(9.5, 0), "10");
    }

    #[test]
    fn test_to_precision() {
        assert_eq!(to_precision(123.456, 4), "123.5");
        assert_eq!(to_precision(0.000123, 2), "0.00012");
        assert_eq!(to_precision(123456.0, 2), "1.2e+5");
        assert_eq!(to_precision(1e-7, 1), "1e-7");
        assert_eq!(to_precision(99.99, 3), "100");
    }

    #[test]
    fn test_exponential() {
        let (d, e) = significant_digits(12345.0, 3);
        assert_eq!(exponential(&d, e), "1.23e+4");
        assert_eq!(shortest_exponential(0.00015), "1.5e-4");
    }

    #[test]
    fn test_locale_string() {
        assert_eq!(locale_string(1234567.891), "1,234,567.891");
        assert_eq!(locale_string(1000.0), "1,000");
        assert_eq!(locale_string(-0.5), "-0.5");
    }
}
