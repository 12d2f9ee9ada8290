use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Flat field-to-value mapping, as persisted.
pub type Mapping = Map<String, Value>;

/// Post-processing step run on every sanitized submission.
pub type SanitizeHook = Box<dyn Fn(Mapping) -> Mapping + Send + Sync>;

const TOGGLE_KEYS: [&str; 2] = ["smtp", "auth"];
const PORT_KEY: &str = "port";

/// Clean a raw form submission into a record-shaped mapping.
///
/// Every value has markup tags and backslash escapes removed. `smtp` and
/// `auth` always come out as `0` or `1`, `port` always as an integer. Input
/// is never rejected.
pub fn sanitize(input: &BTreeMap<String, String>, hooks: &[SanitizeHook]) -> Mapping {
    run_hooks(clean(input), hooks)
}

/// The coercion part of [`sanitize`], without the hooks.
pub fn clean(input: &BTreeMap<String, String>) -> Mapping {
    let mut output: Mapping = input
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(strip_slashes(&strip_tags(value)))))
        .collect();

    for key in TOGGLE_KEYS {
        let on = output.get(key).map_or(false, truthy);
        output.insert(key.to_string(), Value::from(i64::from(on)));
    }

    let port = output.get(PORT_KEY).map_or(0, to_int);
    output.insert(PORT_KEY.to_string(), Value::from(port));
    output
}

/// Run every hook over `mapping`, in registration order.
pub fn run_hooks(mapping: Mapping, hooks: &[SanitizeHook]) -> Mapping {
    hooks.iter().fold(mapping, |mapping, hook| hook(mapping))
}

/// Remove anything that looks like a markup tag. An unterminated tag swallows
/// the rest of the input.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, _) => out.push(c),
            (true, _) => {}
        }
    }
    out
}

/// Undo backslash escaping: `\x` becomes `x`, `\\` becomes `\`.
pub fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Leading-integer parse: optional whitespace and sign, then digits. Anything
/// after the digits is ignored; no digits at all yields 0.
pub fn parse_int_prefix(input: &str) -> i64 {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Loose truthiness: empty strings, `"0"`, zero, null and empty containers are
/// false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Loose integer coercion, truncating fractions.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => parse_int_prefix(s),
        _ => 0,
    }
}
