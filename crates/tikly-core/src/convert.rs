// ── Case and value translation ──
//
// Pure functions between caller-facing field names/values and the device's
// dashed-case keys and string values. Everything that crosses the wire in
// either direction goes through here.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use strum::{Display, EnumString};

/// Field naming used for rows returned to the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CaseConvention {
    /// `rxByte`
    #[default]
    Camel,
    /// `rx_byte`
    Snake,
}

// ── Keys ────────────────────────────────────────────────────────────

/// Dotted metafield for the short names `id`, `next`, `nextid` and `dead`.
pub fn metafield(key: &str) -> Option<&'static str> {
    match key {
        "id" | ".id" => Some(".id"),
        "next" | "nextid" | ".nextid" => Some(".nextid"),
        "dead" | ".dead" => Some(".dead"),
        _ => None,
    }
}

/// camelCase or snake_case to dashed-case.
///
/// Whitespace is dropped, a lowercase letter followed by an uppercase one
/// gets a dash between them, and underscores become dashes.
pub fn to_wire(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars().filter(|c| !c.is_whitespace()) {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
        prev_lower = c.is_ascii_lowercase();
    }
    out
}

/// Wire key for a caller field name, honouring the metafield table.
pub fn wire_key(key: &str) -> String {
    metafield(key).map_or_else(|| to_wire(key), str::to_owned)
}

/// dashed-case to the caller's convention.
pub fn from_wire(key: &str, case: CaseConvention) -> String {
    match case {
        CaseConvention::Snake => key.replace('-', "_"),
        CaseConvention::Camel => {
            let mut out = String::with_capacity(key.len());
            let mut chars = key.chars().peekable();
            while let Some(c) = chars.next() {
                match chars.peek() {
                    Some(&next) if c == '-' && next.is_ascii_lowercase() => {
                        out.push(next.to_ascii_uppercase());
                        chars.next();
                    }
                    _ => out.push(c),
                }
            }
            out
        }
    }
}

// ── Values ──────────────────────────────────────────────────────────

fn is_numeric(raw: &str) -> bool {
    let (int, frac) = match raw.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (raw, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.is_none_or(digits)
}

/// Device string to a typed value.
///
/// `true`/`yes` and `false`/`no` become booleans, plain integers and decimals
/// become numbers. Everything else, including integers too large for `u64`,
/// stays a string.
pub fn coerce_out(raw: &str) -> Value {
    match raw {
        "true" | "yes" => return Value::Bool(true),
        "false" | "no" => return Value::Bool(false),
        _ => {}
    }
    if is_numeric(raw) {
        if !raw.contains('.') {
            if let Ok(n) = raw.parse::<u64>() {
                return Value::Number(n.into());
            }
        } else if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_owned())
}

/// Typed value to the device string.
///
/// Booleans become `yes`/`no`, `null` the empty string, arrays a comma list.
/// Objects are rendered as compact JSON; the resolver decodes them again when
/// they stand for a row reference.
pub fn coerce_in(value: &Value) -> String {
    match value {
        Value::Bool(true) => "yes".into(),
        Value::Bool(false) => "no".into(),
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(coerce_in).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}
