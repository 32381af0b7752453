//! `Date`
//!
//! Time values are milliseconds since the epoch. Local time is UTC, so
//! builds produce the same output on every machine.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use super::{async_ctor, define_async, proto_for};
use crate::backends::interpreter::property::Hint;
use crate::backends::interpreter::{Interpreter, JsResult};
use crate::runtime::value::number::to_integer;
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, Value};

const MS_PER_DAY: f64 = 86_400_000.0;
const MAX_TIME: f64 = 8.64e15;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub(crate) fn install(interp: &Interpreter) {
    let proto = interp.intrinsics().date_proto.clone();
    let ctor = interp.define_constructor("Date", 7, async_ctor(date_ctor), &proto);

    interp.define_method(&ctor, "now", 0, |_, _| Ok(Value::Number(now())));
    define_async(interp, &ctor, "parse", 1, |interp: Interpreter, args: CallArgs| async move {
        let text = interp.to_string(&args.arg(0)).await?;
        Ok(Value::Number(parse_date(&text).unwrap_or(f64::NAN)))
    });
    define_async(interp, &ctor, "UTC", 7, |interp: Interpreter, args: CallArgs| async move {
        let fields = numbers(&interp, &args, 7).await?;
        Ok(Value::Number(time_clip(from_fields(&fields))))
    });

    let getters: [(&str, fn(f64) -> f64); 17] = [
        ("getTime", |t| t),
        ("valueOf", |t| t),
        ("getFullYear", |t| year_from_time(t) as f64),
        ("getMonth", |t| month_from_time(t) as f64),
        ("getDate", |t| date_from_time(t) as f64),
        ("getDay", week_day),
        ("getHours", |t| hour_from_time(t) as f64),
        ("getMinutes", |t| min_from_time(t) as f64),
        ("getSeconds", |t| sec_from_time(t) as f64),
        ("getMilliseconds", |t| ms_from_time(t) as f64),
        ("getUTCFullYear", |t| year_from_time(t) as f64),
        ("getUTCMonth", |t| month_from_time(t) as f64),
        ("getUTCDate", |t| date_from_time(t) as f64),
        ("getUTCDay", week_day),
        ("getUTCHours", |t| hour_from_time(t) as f64),
        ("getUTCMinutes", |t| min_from_time(t) as f64),
        ("getUTCSeconds", |t| sec_from_time(t) as f64),
    ];
    for (name, f) in getters {
        interp.define_method(&proto, name, 0, move |interp, args: CallArgs| {
            let t = this_time(interp, &args.this)?;
            Ok(Value::Number(if t.is_nan() { t } else { f(t) }))
        });
    }
    interp.define_method(&proto, "getUTCMilliseconds", 0, |interp, args: CallArgs| {
        let t = this_time(interp, &args.this)?;
        Ok(Value::Number(if t.is_nan() { t } else { ms_from_time(t) as f64 }))
    });
    interp.define_method(&proto, "getYear", 0, |interp, args: CallArgs| {
        let t = this_time(interp, &args.this)?;
        Ok(Value::Number(if t.is_nan() { t } else { year_from_time(t) as f64 - 1900.0 }))
    });
    interp.define_method(&proto, "getTimezoneOffset", 0, |interp, args: CallArgs| {
        let t = this_time(interp, &args.this)?;
        Ok(Value::Number(if t.is_nan() { t } else { 0.0 }))
    });

    define_async(interp, &proto, "setTime", 1, |interp: Interpreter, args: CallArgs| async move {
        let date = this_date(&interp, &args.this)?;
        let t = time_clip(interp.to_number(&args.arg(0)).await?);
        date.lock().kind = ObjectKind::Date(t);
        Ok(Value::Number(t))
    });
    for (name, field, max) in [
        ("setMilliseconds", Field::Ms, 1),
        ("setSeconds", Field::Sec, 2),
        ("setMinutes", Field::Min, 3),
        ("setHours", Field::Hour, 4),
        ("setDate", Field::Date, 1),
        ("setMonth", Field::Month, 2),
        ("setFullYear", Field::Year, 3),
    ] {
        let utc_name = name.replacen("set", "setUTC", 1);
        for method in [name.to_string(), utc_name] {
            define_async(interp, &proto, &method, max, move |interp, args| set_fields(interp, args, field, max));
        }
    }

    interp.define_method(&proto, "toISOString", 0, |interp, args: CallArgs| {
        let t = this_time(interp, &args.this)?;
        if t.is_nan() {
            return Err(interp.range_error("Invalid time value"));
        }
        Ok(Value::from(iso_string(t)))
    });
    define_async(interp, &proto, "toJSON", 1, |interp: Interpreter, args: CallArgs| async move {
        let prim = interp.to_primitive(&args.this, Hint::Number).await?;
        if let Value::Number(n) = prim {
            if !n.is_finite() {
                return Ok(Value::Null);
            }
        }
        let method = interp.get_named(&args.this, "toISOString").await?;
        interp.call(&method, args.this.clone(), Vec::new()).await
    });
    let formats: [(&str, fn(f64) -> String); 7] = [
        ("toString", date_string),
        ("toDateString", |t| day_string(t)),
        ("toTimeString", |t| format!("{} GMT+0000 (Coordinated Universal Time)", clock(t))),
        ("toUTCString", utc_string),
        ("toLocaleString", |t| format!("{}, {}", locale_date(t), locale_time(t))),
        ("toLocaleDateString", locale_date),
        ("toLocaleTimeString", locale_time),
    ];
    for (name, f) in formats {
        interp.define_method(&proto, name, 0, move |interp, args: CallArgs| {
            let t = this_time(interp, &args.this)?;
            Ok(Value::from(if t.is_nan() { "Invalid Date".to_string() } else { f(t) }))
        });
    }
    let utc = proto.lock().get_own(&"toUTCString".into());
    if let Some(utc) = utc {
        proto.lock().define("toGMTString", utc);
    }

    let to_primitive = super::async_fn(interp, "[Symbol.toPrimitive]", 1, |interp: Interpreter, args: CallArgs| async move {
        if !args.this.is_object() {
            return Err(interp.type_error("Date.prototype[Symbol.toPrimitive] called on non-object"));
        }
        let hint = match args.arg(0).as_str() {
            Some("number") => Hint::Number,
            Some("string") | Some("default") => Hint::String,
            _ => return Err(interp.type_error("Invalid hint")),
        };
        let order = if matches!(hint, Hint::String) {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = interp.get_named(&args.this, name).await?;
            if interp.is_callable(&method) {
                let result = interp.call(&method, args.this.clone(), Vec::new()).await?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(interp.type_error("Cannot convert object to primitive value"))
    });
    interp.define_symbol_method(&proto, interp.intrinsics().symbols.to_primitive.clone(), to_primitive);
}

async fn date_ctor(
    interp: Interpreter,
    args: CallArgs,
) -> JsResult<Value> {
    let Some(target) = &args.new_target else {
        return Ok(Value::from(date_string(now())));
    };
    let t = match args.args.len() {
        0 => now(),
        1 => {
            let arg = args.arg(0);
            let existing = match &arg {
                Value::Object(obj) => match &obj.lock().kind {
                    ObjectKind::Date(t) => Some(*t),
                    _ => None,
                },
                _ => None,
            };
            match existing {
                Some(t) => t,
                None => match interp.to_primitive(&arg, Hint::Default).await? {
                    Value::String(s) => parse_date(&s).unwrap_or(f64::NAN),
                    prim => time_clip(interp.to_number(&prim).await?),
                },
            }
        }
        _ => time_clip(from_fields(&numbers(&interp, &args, 7).await?)),
    };
    let proto = proto_for(&interp, Some(target), &interp.intrinsics().date_proto);
    Ok(Value::Object(Obj::new(Object::new(Some(proto), ObjectKind::Date(t)))))
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

/// `ToNumber` of up to `max` arguments
async fn numbers(
    interp: &Interpreter,
    args: &CallArgs,
    max: usize,
) -> JsResult<Vec<f64>> {
    let mut out = Vec::new();
    for v in args.args.iter().take(max) {
        out.push(interp.to_number(v).await?);
    }
    Ok(out)
}

/// Time value from `[year, month, day, hours, minutes, seconds, ms]`, missing fields defaulted
fn from_fields(fields: &[f64]) -> f64 {
    let get = |i: usize, default: f64| fields.get(i).copied().unwrap_or(default);
    let mut year = get(0, f64::NAN);
    if !year.is_nan() {
        let y = to_integer(year);
        if (0.0..=99.0).contains(&y) {
            year = 1900.0 + y;
        }
    }
    let day = make_day(year, get(1, 0.0), get(2, 1.0));
    let time = make_time(get(3, 0.0), get(4, 0.0), get(5, 0.0), get(6, 0.0));
    make_date(day, time)
}

fn this_date(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<Obj> {
    match this {
        Value::Object(obj) if matches!(obj.lock().kind, ObjectKind::Date(_)) => Ok(obj.clone()),
        _ => Err(interp.type_error("this is not a Date object.")),
    }
}

fn this_time(
    interp: &Interpreter,
    this: &Value,
) -> JsResult<f64> {
    let date = this_date(interp, this)?;
    let t = match date.lock().kind {
        ObjectKind::Date(t) => t,
        _ => f64::NAN,
    };
    Ok(t)
}

#[derive(Clone, Copy)]
enum Field {
    Ms,
    Sec,
    Min,
    Hour,
    Date,
    Month,
    Year,
}

/// Shared body of the `set*` methods; `field` is the first field written
async fn set_fields(
    interp: Interpreter,
    args: CallArgs,
    field: Field,
    max: usize,
) -> JsResult<Value> {
    let date = this_date(&interp, &args.this)?;
    let t = this_time(&interp, &args.this)?;
    let values = numbers(&interp, &args, max).await?;
    let arg = |i: usize, current: f64| values.get(i).copied().unwrap_or(current);
    let first = values.first().copied().unwrap_or(f64::NAN);
    let t = match field {
        Field::Year if t.is_nan() => 0.0,
        _ => t,
    };
    let (year, month, day) = (
        year_from_time(t) as f64,
        month_from_time(t) as f64,
        date_from_time(t) as f64,
    );
    let (h, m, s, ms) = (
        hour_from_time(t) as f64,
        min_from_time(t) as f64,
        sec_from_time(t) as f64,
        ms_from_time(t) as f64,
    );
    let new = if t.is_nan() {
        f64::NAN
    } else {
        match field {
            Field::Ms => make_date(day_of(t), make_time(h, m, s, first)),
            Field::Sec => make_date(day_of(t), make_time(h, m, first, arg(1, ms))),
            Field::Min => make_date(day_of(t), make_time(h, first, arg(1, s), arg(2, ms))),
            Field::Hour => make_date(day_of(t), make_time(first, arg(1, m), arg(2, s), arg(3, ms))),
            Field::Date => make_date(make_day(year, month, first), time_within_day(t)),
            Field::Month => make_date(make_day(year, first, arg(1, day)), time_within_day(t)),
            Field::Year => make_date(make_day(first, arg(1, month), arg(2, day)), time_within_day(t)),
        }
    };
    let new = time_clip(new);
    date.lock().kind = ObjectKind::Date(new);
    Ok(Value::Number(new))
}

fn day_of(t: f64) -> f64 {
    (t / MS_PER_DAY).floor()
}

fn time_within_day(t: f64) -> f64 {
    t.rem_euclid(MS_PER_DAY)
}

fn days_in_year(y: i64) -> i64 {
    if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 {
        366
    } else {
        365
    }
}

fn day_from_year(y: f64) -> f64 {
    365.0 * (y - 1970.0) + ((y - 1969.0) / 4.0).floor() - ((y - 1901.0) / 100.0).floor()
        + ((y - 1601.0) / 400.0).floor()
}

fn year_from_time(t: f64) -> i64 {
    let day = day_of(t);
    let mut y = (day / 365.2425).floor() as i64 + 1970;
    while day_from_year(y as f64) > day {
        y -= 1;
    }
    while day_from_year((y + 1) as f64) <= day {
        y += 1;
    }
    y
}

/// Cumulative days before each month, non-leap
const MONTH_START: [i64; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];

fn month_start(
    month: usize,
    leap: bool,
) -> i64 {
    MONTH_START[month] + if leap && month >= 2 { 1 } else { 0 }
}

fn day_in_year(t: f64) -> i64 {
    let y = year_from_time(t);
    day_of(t) as i64 - day_from_year(y as f64) as i64
}

fn month_from_time(t: f64) -> usize {
    let leap = days_in_year(year_from_time(t)) == 366;
    let d = day_in_year(t);
    (0..12).find(|&m| d < month_start(m + 1, leap)).unwrap_or(11)
}

fn date_from_time(t: f64) -> i64 {
    let leap = days_in_year(year_from_time(t)) == 366;
    day_in_year(t) - month_start(month_from_time(t), leap) + 1
}

fn week_day(t: f64) -> f64 {
    (day_of(t) + 4.0).rem_euclid(7.0)
}

fn hour_from_time(t: f64) -> i64 {
    (time_within_day(t) / 3_600_000.0).floor() as i64
}

fn min_from_time(t: f64) -> i64 {
    (time_within_day(t) / 60_000.0).floor() as i64 % 60
}

fn sec_from_time(t: f64) -> i64 {
    (time_within_day(t) / 1000.0).floor() as i64 % 60
}

fn ms_from_time(t: f64) -> i64 {
    time_within_day(t) as i64 % 1000
}

fn make_time(
    hour: f64,
    min: f64,
    sec: f64,
    ms: f64,
) -> f64 {
    if ![hour, min, sec, ms].iter().all(|v| v.is_finite()) {
        return f64::NAN;
    }
    to_integer(hour) * 3_600_000.0 + to_integer(min) * 60_000.0 + to_integer(sec) * 1000.0 + to_integer(ms)
}

fn make_day(
    year: f64,
    month: f64,
    date: f64,
) -> f64 {
    if ![year, month, date].iter().all(|v| v.is_finite()) {
        return f64::NAN;
    }
    let (y, m, dt) = (to_integer(year), to_integer(month), to_integer(date));
    let ym = y + (m / 12.0).floor();
    if ym.abs() > 400_000.0 {
        return f64::NAN;
    }
    let mn = m.rem_euclid(12.0) as usize;
    let leap = days_in_year(ym as i64) == 366;
    day_from_year(ym) + month_start(mn, leap) as f64 + dt - 1.0
}

fn make_date(
    day: f64,
    time: f64,
) -> f64 {
    if !day.is_finite() || !time.is_finite() {
        return f64::NAN;
    }
    day * MS_PER_DAY + time
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > MAX_TIME {
        return f64::NAN;
    }
    to_integer(t)
}

fn year_text(y: i64) -> String {
    if y < 0 {
        format!("-{:06}", -y)
    } else if y > 9999 {
        format!("+{:06}", y)
    } else {
        format!("{:04}", y)
    }
}

/// Calendar view of a time value; `None` past chrono's year range
fn utc_datetime(t: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(t as i64)
}

fn display_year(y: i64) -> String {
    if y < 0 { format!("-{:06}", -y) } else { format!("{:04}", y) }
}

pub(crate) fn iso_string(t: f64) -> String {
    if let Some(dt) = utc_datetime(t) {
        return format!("{}{}", year_text(dt.year() as i64), dt.format("-%m-%dT%H:%M:%S%.3fZ"));
    }
    format!(
        "{}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year_text(year_from_time(t)),
        month_from_time(t) + 1,
        date_from_time(t),
        hour_from_time(t),
        min_from_time(t),
        sec_from_time(t),
        ms_from_time(t)
    )
}

fn clock(t: f64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        hour_from_time(t),
        min_from_time(t),
        sec_from_time(t)
    )
}

fn day_string(t: f64) -> String {
    format!(
        "{} {} {:02} {}",
        DAY_NAMES[week_day(t) as usize],
        MONTH_NAMES[month_from_time(t)],
        date_from_time(t),
        display_year(year_from_time(t))
    )
}

fn date_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".into();
    }
    format!("{} {} GMT+0000 (Coordinated Universal Time)", day_string(t), clock(t))
}

fn utc_string(t: f64) -> String {
    if let Some(dt) = utc_datetime(t) {
        return format!(
            "{} {} {}",
            dt.format("%a, %d %b"),
            display_year(dt.year() as i64),
            dt.format("%H:%M:%S GMT")
        );
    }
    format!(
        "{}, {:02} {} {} {} GMT",
        DAY_NAMES[week_day(t) as usize],
        date_from_time(t),
        MONTH_NAMES[month_from_time(t)],
        display_year(year_from_time(t)),
        clock(t)
    )
}

fn locale_date(t: f64) -> String {
    format!("{}/{}/{}", month_from_time(t) + 1, date_from_time(t), year_from_time(t))
}

fn locale_time(t: f64) -> String {
    let h = hour_from_time(t);
    let (h12, suffix) = match h {
        0 => (12, "AM"),
        1..=11 => (h, "AM"),
        12 => (12, "PM"),
        _ => (h - 12, "PM"),
    };
    format!("{}:{:02}:{:02} {}", h12, min_from_time(t), sec_from_time(t), suffix)
}

/// Parse the ISO date-time format and the formats `toString`/`toUTCString` produce
pub(crate) fn parse_date(text: &str) -> Option<f64> {
    let text = text.trim();
    parse_iso(text).or_else(|| parse_informal(text)).map(time_clip).filter(|t| !t.is_nan())
}

fn parse_iso(text: &str) -> Option<f64> {
    parse_rfc3339(text).or_else(|| scan_iso(text))
}

/// Full dates and date-times; a missing offset means UTC
fn parse_rfc3339(text: &str) -> Option<f64> {
    // chrono reads `:60` as a leap second
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return (dt.nanosecond() < 1_000_000_000).then(|| dt.timestamp_millis() as f64);
    }
    let millis = |dt: NaiveDateTime| (dt.nanosecond() < 1_000_000_000).then(|| dt.and_utc().timestamp_millis() as f64);
    let naive = text.strip_suffix(['Z', 'z']).unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return millis(dt);
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    millis(date.and_hms_opt(0, 0, 0)?)
}

/// Expanded years, partial dates and `24:00`
fn scan_iso(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let digits = |pos: &mut usize, n: usize| -> Option<f64> {
        let s = text.get(*pos..*pos + n)?;
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *pos += n;
        s.parse::<f64>().ok()
    };

    let year = match bytes.first()? {
        b'+' | b'-' => {
            let negative = bytes[0] == b'-';
            pos = 1;
            let y = digits(&mut pos, 6)?;
            if negative && y == 0.0 {
                return None;
            }
            if negative { -y } else { y }
        }
        _ => digits(&mut pos, 4)?,
    };
    let mut month = 1.0;
    let mut day = 1.0;
    if bytes.get(pos) == Some(&b'-') {
        pos += 1;
        month = digits(&mut pos, 2)?;
        if bytes.get(pos) == Some(&b'-') {
            pos += 1;
            day = digits(&mut pos, 2)?;
        }
    }
    if !(1.0..=12.0).contains(&month) || !(1.0..=31.0).contains(&day) {
        return None;
    }
    let (mut h, mut m, mut s, mut ms) = (0.0, 0.0, 0.0, 0.0);
    let mut offset = 0.0;
    if matches!(bytes.get(pos), Some(b'T') | Some(b't') | Some(b' ')) {
        pos += 1;
        h = digits(&mut pos, 2)?;
        if bytes.get(pos) != Some(&b':') {
            return None;
        }
        pos += 1;
        m = digits(&mut pos, 2)?;
        if bytes.get(pos) == Some(&b':') {
            pos += 1;
            s = digits(&mut pos, 2)?;
            if bytes.get(pos) == Some(&b'.') {
                pos += 1;
                let start = pos;
                while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
                    pos += 1;
                }
                let frac = text.get(start..pos)?;
                if frac.is_empty() {
                    return None;
                }
                let first3: String = frac.chars().chain("00".chars()).take(3).collect();
                ms = first3.parse().ok()?;
            }
        }
        if h > 24.0 || m > 59.0 || s > 59.0 || (h == 24.0 && (m > 0.0 || s > 0.0 || ms > 0.0)) {
            return None;
        }
        match bytes.get(pos) {
            Some(b'Z') | Some(b'z') => pos += 1,
            Some(&sign @ (b'+' | b'-')) => {
                pos += 1;
                let oh = digits(&mut pos, 2)?;
                if bytes.get(pos) == Some(&b':') {
                    pos += 1;
                }
                let om = digits(&mut pos, 2)?;
                offset = (oh * 60.0 + om) * 60_000.0;
                if sign == b'-' {
                    offset = -offset;
                }
            }
            _ => {}
        }
    }
    if pos != bytes.len() {
        return None;
    }
    Some(make_date(make_day(year, month - 1.0, day), make_time(h, m, s, ms)) - offset)
}

/// `Tue Jan 02 2024 10:00:00 GMT+0000 (...)`, `Tue, 02 Jan 2024 10:00:00 GMT`, `Jan 2, 2024`
fn parse_informal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .split('(')
        .next()
        .unwrap_or(text)
        .replace(',', " ");
    let mut year = None;
    let mut month = None;
    let mut day = None;
    let mut time = (0.0, 0.0, 0.0);
    let mut offset = 0.0;
    for word in cleaned.split_whitespace() {
        let lower = word.to_ascii_lowercase();
        if let Some(m) = MONTH_NAMES.iter().position(|n| lower.starts_with(&n.to_ascii_lowercase())) {
            month = Some(m as f64);
        } else if DAY_NAMES.iter().any(|n| lower.starts_with(&n.to_ascii_lowercase())) {
            continue;
        } else if word.contains(':') {
            let parts: Vec<f64> = word.split(':').map(|p| p.parse::<f64>().ok()).collect::<Option<_>>()?;
            time = (
                *parts.first()?,
                parts.get(1).copied().unwrap_or(0.0),
                parts.get(2).copied().unwrap_or(0.0),
            );
        } else if let Some(zone) = lower.strip_prefix("gmt").or_else(|| lower.strip_prefix("utc")) {
            if let Some((sign, rest)) = zone.split_at_checked(1) {
                let n: f64 = rest.parse().ok()?;
                let minutes = (n / 100.0).trunc() * 60.0 + n % 100.0;
                offset = minutes * 60_000.0 * if sign == "-" { -1.0 } else { 1.0 };
            }
        } else if lower == "z" {
            continue;
        } else if let Ok(n) = word.parse::<f64>() {
            if word.len() >= 3 || n > 31.0 || day.is_some() {
                year = Some(n);
            } else {
                day = Some(n);
            }
        } else {
            return None;
        }
    }
    let (year, month, day) = (year?, month?, day?);
    Some(make_date(make_day(year, month, day), make_time(time.0, time.1, time.2, 0.0)) - offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_fields() {
        // 2024-02-29T12:34:56.789Z
        let t = 1_709_210_096_789.0;
        assert_eq!(year_from_time(t), 2024);
        assert_eq!(month_from_time(t), 1);
        assert_eq!(date_from_time(t), 29);
        assert_eq!(hour_from_time(t), 12);
        assert_eq!(min_from_time(t), 34);
        assert_eq!(sec_from_time(t), 56);
        assert_eq!(ms_from_time(t), 789);
        assert_eq!(week_day(t), 4.0);
    }

    #[test]
    fn test_iso_round_trip() {
        let t = parse_date("2024-02-29T12:34:56.789Z").unwrap();
        assert_eq!(t, 1_709_210_096_789.0);
        assert_eq!(iso_string(t), "2024-02-29T12:34:56.789Z");
        assert_eq!(parse_date("1970-01-01"), Some(0.0));
        assert_eq!(parse_date("1970-01-01T01:00:00+01:00"), Some(0.0));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_partial_and_expanded_iso() {
        assert_eq!(parse_date("1970"), Some(0.0));
        assert_eq!(parse_date("1970-01"), Some(0.0));
        assert_eq!(parse_date("1970-01-01T00:00"), Some(0.0));
        assert_eq!(parse_date("1969-12-31T24:00:00Z"), Some(0.0));
        assert_eq!(parse_date("2024-01-02T10:00:00.5-02:30"), Some(1_704_198_600_500.0));
        assert_eq!(parse_date("1970-01-01T23:59:60Z"), None);
        let t = parse_date("+012024-01-01T00:00:00Z").unwrap();
        assert_eq!(iso_string(t), "+012024-01-01T00:00:00.000Z");
        assert_eq!(utc_string(t), "Mon, 01 Jan 12024 00:00:00 GMT");
    }

    #[test]
    fn test_negative_times() {
        let t = -1.0;
        assert_eq!(iso_string(t), "1969-12-31T23:59:59.999Z");
    }

    #[test]
    fn test_informal_formats() {
        let t = parse_date("2024-01-02T10:00:00Z").unwrap();
        assert_eq!(parse_date(&date_string(t)), Some(t));
        assert_eq!(parse_date(&utc_string(t)), Some(t));
        assert_eq!(utc_string(t), "Tue, 02 Jan 2024 10:00:00 GMT");
    }

    #[test]
    fn test_from_fields() {
        assert_eq!(from_fields(&[1970.0, 0.0]), 0.0);
        assert_eq!(from_fields(&[70.0, 0.0, 1.0]), 0.0);
        assert_eq!(from_fields(&[2024.0, 12.0, 1.0]), parse_date("2025-01-01").unwrap());
    }
}
