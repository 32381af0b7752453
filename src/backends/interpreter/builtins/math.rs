//! `Math`

use rand::Rng;

use super::number_of;
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::number::to_uint32;
use crate::runtime::value::{CallArgs, Property, PropertyKey, Value};

pub(crate) fn install(interp: &Interpreter) {
    let math = interp.new_object();
    {
        let mut object = math.lock();
        for (name, value) in [
            ("E", std::f64::consts::E),
            ("LN10", std::f64::consts::LN_10),
            ("LN2", std::f64::consts::LN_2),
            ("LOG10E", std::f64::consts::LOG10_E),
            ("LOG2E", std::f64::consts::LOG2_E),
            ("PI", std::f64::consts::PI),
            ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
            ("SQRT2", std::f64::consts::SQRT_2),
        ] {
            object.define(name, Property::constant(Value::Number(value)));
        }
        object.define(
            PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone()),
            Property::constant(Value::str("Math")),
        );
    }

    let unary: [(&str, fn(f64) -> f64); 26] = [
        ("abs", f64::abs),
        ("acos", f64::acos),
        ("acosh", f64::acosh),
        ("asin", f64::asin),
        ("asinh", f64::asinh),
        ("atan", f64::atan),
        ("atanh", f64::atanh),
        ("cbrt", f64::cbrt),
        ("ceil", f64::ceil),
        ("cos", f64::cos),
        ("cosh", f64::cosh),
        ("exp", f64::exp),
        ("expm1", f64::exp_m1),
        ("floor", f64::floor),
        ("fround", |x| x as f32 as f64),
        ("log", f64::ln),
        ("log1p", f64::ln_1p),
        ("log10", f64::log10),
        ("log2", f64::log2),
        ("round", round),
        ("sign", sign),
        ("sin", f64::sin),
        ("sinh", f64::sinh),
        ("sqrt", f64::sqrt),
        ("tan", f64::tan),
        ("trunc", f64::trunc),
    ];
    for (name, f) in unary {
        interp.define_method(&math, name, 1, move |interp, args: CallArgs| {
            Ok(Value::Number(f(number_of(interp, &args.arg(0))?)))
        });
    }
    interp.define_method(&math, "tanh", 1, |interp, args: CallArgs| {
        Ok(Value::Number(number_of(interp, &args.arg(0))?.tanh()))
    });
    interp.define_method(&math, "clz32", 1, |interp, args: CallArgs| {
        Ok(Value::Number(to_uint32(number_of(interp, &args.arg(0))?).leading_zeros() as f64))
    });
    interp.define_method(&math, "imul", 2, |interp, args: CallArgs| {
        let a = to_uint32(number_of(interp, &args.arg(0))?) as i32;
        let b = to_uint32(number_of(interp, &args.arg(1))?) as i32;
        Ok(Value::Number(a.wrapping_mul(b) as f64))
    });
    interp.define_method(&math, "atan2", 2, |interp, args: CallArgs| {
        let y = number_of(interp, &args.arg(0))?;
        let x = number_of(interp, &args.arg(1))?;
        Ok(Value::Number(y.atan2(x)))
    });
    interp.define_method(&math, "pow", 2, |interp, args: CallArgs| {
        let base = number_of(interp, &args.arg(0))?;
        let exp = number_of(interp, &args.arg(1))?;
        Ok(Value::Number(crate::backends::interpreter::operators::number_pow(base, exp)))
    });
    interp.define_method(&math, "max", 2, |interp, args: CallArgs| {
        let values = numbers(interp, &args)?;
        Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, max)))
    });
    interp.define_method(&math, "min", 2, |interp, args: CallArgs| {
        let values = numbers(interp, &args)?;
        Ok(Value::Number(values.into_iter().fold(f64::INFINITY, min)))
    });
    interp.define_method(&math, "hypot", 2, |interp, args: CallArgs| {
        let values = numbers(interp, &args)?;
        if values.iter().any(|v| v.is_infinite()) {
            return Ok(Value::Number(f64::INFINITY));
        }
        Ok(Value::Number(values.iter().map(|v| v * v).sum::<f64>().sqrt()))
    });
    interp.define_method(&math, "random", 0, |_, _| Ok(Value::Number(random())));

    interp.define_global("Math", Value::Object(math));
}

fn numbers(
    interp: &Interpreter,
    args: &CallArgs,
) -> JsResult<Vec<f64>> {
    args.args.iter().map(|v| number_of(interp, v)).collect()
}

/// Round half toward +Infinity
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if x > 0.0 && x < 0.5 {
        return 0.0;
    }
    if x < 0.0 && x >= -0.5 {
        return -0.0;
    }
    (x + 0.5).floor()
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn max(
    a: f64,
    b: f64,
) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        // +0 wins over -0
        if a.is_sign_negative() { b } else { a }
    } else {
        a.max(b)
    }
}

fn min(
    a: f64,
    b: f64,
) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else {
        a.min(b)
    }
}

fn random() -> f64 {
    rand::rng().random::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-0.4).to_bits(), (-0.0f64).to_bits());
        assert_eq!(round(1.4), 1.0);
    }

    #[test]
    fn test_min_max_signed_zero() {
        assert!(max(-0.0, 0.0).is_sign_positive());
        assert!(min(0.0, -0.0).is_sign_negative());
        assert!(max(1.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_random_range() {
        for _ in 0..100 {
            let r = random();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
