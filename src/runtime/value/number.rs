//! Number conversions with JavaScript semantics

use num_bigint::BigInt;

/// `Number.prototype.toString()` for radix 10
pub fn number_to_string(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if x < 0.0 {
        return format!("-{}", number_to_string(-x));
    }

    // shortest round-trip digits, e.g. "1.2345e3"
    let sci = format!("{:e}", x);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    let k = digits.len() as i32;
    let n = exp + 1;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let sign = if e >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

/// `Number.prototype.toString(radix)` for radix other than 10
pub fn number_to_radix_string(
    x: f64,
    radix: u32,
) -> String {
    if radix == 10 || !x.is_finite() {
        return number_to_string(x);
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let negative = x < 0.0;
    let x = x.abs();
    let mut int = x.trunc();
    let mut frac = x - int;
    let radix_f = radix as f64;

    let mut int_digits = Vec::new();
    if int == 0.0 {
        int_digits.push('0');
    }
    while int >= 1.0 {
        let d = (int % radix_f) as u32;
        int_digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int = (int / radix_f).trunc();
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(int_digits);
    if frac > 0.0 {
        out.push('.');
        let mut count = 0;
        while frac > 0.0 && count < 52 {
            frac *= radix_f;
            let d = frac.trunc();
            out.push(std::char::from_digit(d as u32, radix).unwrap_or('0'));
            frac -= d;
            count += 1;
        }
    }
    out
}

/// Whitespace and line terminators as trimmed by `String.prototype.trim`
pub fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// `ToNumber` applied to a string
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim_matches(is_js_whitespace);
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return parse_radix_digits(digits, radix).unwrap_or(f64::NAN);
        }
    }
    if decimal_literal_len(t) == t.len() {
        t.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn parse_radix_digits(
    digits: &str,
    radix: u32,
) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix)? as f64;
    }
    Some(value)
}

/// Length of the longest prefix of `s` that is a decimal literal
/// (`[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`)
fn decimal_literal_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Global `parseFloat`
pub fn parse_float(s: &str) -> f64 {
    let t = s.trim_start_matches(is_js_whitespace);
    for (text, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if t.starts_with(text) {
            return value;
        }
    }
    let len = decimal_literal_len(t);
    if len == 0 {
        return f64::NAN;
    }
    t[..len].parse::<f64>().unwrap_or(f64::NAN)
}

/// Global `parseInt`
pub fn parse_int(
    s: &str,
    radix: i32,
) -> f64 {
    let mut t = s.trim_start_matches(is_js_whitespace);
    let mut sign = 1.0;
    if let Some(rest) = t.strip_prefix('-') {
        sign = -1.0;
        t = rest;
    } else if let Some(rest) = t.strip_prefix('+') {
        t = rest;
    }
    let mut radix = radix;
    if radix == 0 || radix == 16 {
        if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            t = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let end = t.find(|c: char| c.to_digit(radix as u32).is_none()).unwrap_or(t.len());
    match parse_radix_digits(&t[..end], radix as u32) {
        Some(value) => sign * value,
        None => f64::NAN,
    }
}

/// `ToIntegerOrInfinity`
pub fn to_integer(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.trunc() + 0.0
    }
}

/// `ToUint32`
pub fn to_uint32(x: f64) -> u32 {
    if !x.is_finite() {
        return 0;
    }
    x.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// `ToInt32`
pub fn to_int32(x: f64) -> i32 {
    to_uint32(x) as i32
}

/// Relative index argument (`slice`, `at`, ...) clamped into `0..=len`
pub fn relative_index(
    x: f64,
    len: usize,
) -> usize {
    let x = to_integer(x);
    let len_f = len as f64;
    if x < 0.0 {
        (len_f + x).max(0.0) as usize
    } else {
        x.min(len_f) as usize
    }
}

/// Nearest double to a big integer
pub fn bigint_to_f64(n: &BigInt) -> f64 {
    n.to_string().parse::<f64>().unwrap_or(f64::NAN)
}

/// Exact big integer for an integral double
pub fn f64_to_bigint(x: f64) -> Option<BigInt> {
    if !x.is_finite() || x.trunc() != x {
        return None;
    }
    format!("{:.0}", x).parse::<BigInt>().ok()
}

/// `StringToBigInt`: `None` when the text is not a valid integer literal
pub fn string_to_bigint(s: &str) -> Option<BigInt> {
    let t = s.trim_matches(is_js_whitespace);
    if t.is_empty() {
        return Some(BigInt::from(0));
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    let unsigned = t.strip_prefix(['+', '-']).unwrap_or(t);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    t.strip_prefix('+').unwrap_or(t).parse::<BigInt>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-1.5), "-1.5");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_radix() {
        assert_eq!(number_to_radix_string(255.0, 16), "ff");
        assert_eq!(number_to_radix_string(-5.0, 2), "-101");
        assert_eq!(number_to_radix_string(0.5, 2), "0.1");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert_eq!(string_to_number(".5"), 0.5);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_parse_int_float() {
        assert_eq!(parse_int("  12px", 10), 12.0);
        assert_eq!(parse_int("0x10", 0), 16.0);
        assert_eq!(parse_int("-7", 0), -7.0);
        assert!(parse_int("px", 10).is_nan());
        assert_eq!(parse_float("3.14abc"), 3.14);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn test_int32() {
        assert_eq!(to_int32(4_294_967_295.0), -1);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(relative_index(-1.0, 5), 4);
        assert_eq!(relative_index(10.0, 5), 5);
    }

    #[test]
    fn test_bigint_conversions() {
        assert_eq!(string_to_bigint("0xff"), Some(BigInt::from(255)));
        assert_eq!(string_to_bigint(" -12 "), Some(BigInt::from(-12)));
        assert_eq!(string_to_bigint("1.5"), None);
        assert_eq!(f64_to_bigint(1e3), Some(BigInt::from(1000)));
        assert_eq!(f64_to_bigint(0.5), None);
        assert_eq!(bigint_to_f64(&BigInt::from(7)), 7.0);
    }
}
