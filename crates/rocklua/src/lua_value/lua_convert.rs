//! String <-> number conversion following the Lua literal grammar.
//!
//! Numbers and strings are the only mutually convertible value pair:
//! a value "can convert to string" iff it is a string or a number, and
//! numbers read from strings use the standard numeric literal grammar
//! (decimal, hex integers, hex floats with a binary exponent).

use smol_str::SmolStr;

use crate::lua_value::LuaValue;

/// Canonical integral predicate for the single numeric kind.
#[inline(always)]
pub fn is_integer(n: f64) -> bool {
    n.is_finite() && n >= i64::MIN as f64 && n < -(i64::MIN as f64) && (n as i64) as f64 == n
}

/// Canonical display form: integral values print without a fractional part.
pub fn number_to_string(n: f64) -> String {
    if is_integer(n) {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        format!("{}", n)
    }
}

/// True if `v` is a string or a number.
#[inline(always)]
pub fn lv_can_conv_to_string(v: &LuaValue) -> bool {
    matches!(v, LuaValue::String(_) | LuaValue::Number(_))
}

/// String representation of a string or number value, "" otherwise.
pub fn lv_as_string(v: &LuaValue) -> SmolStr {
    match v {
        LuaValue::String(s) => s.clone(),
        LuaValue::Number(n) => SmolStr::new(number_to_string(*n)),
        _ => SmolStr::default(),
    }
}

/// Numeric coercion: numbers pass through, strings are parsed with the
/// Lua literal grammar, everything else (and parse failure) yields 0.
pub fn lv_as_number(v: &LuaValue) -> f64 {
    match v {
        LuaValue::Number(n) => *n,
        LuaValue::String(s) => parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[inline(always)]
pub fn lv_is_false(v: &LuaValue) -> bool {
    v.is_falsy()
}

#[inline(always)]
pub fn lv_as_bool(v: &LuaValue) -> bool {
    v.is_truthy()
}

/// Parse a Lua numeric literal. Failure is a `None`, never a crash.
///
/// Accepts optional surrounding whitespace, an optional sign, decimal
/// integers and floats with `e` exponents, `0x`/`0X` hex integers, and
/// hex floats with a `p` binary exponent.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if s.is_empty() {
        return None;
    }

    let (sign, body) = match s.as_bytes()[0] {
        b'-' => (-1.0, &s[1..]),
        b'+' => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if body.is_empty() {
        return None;
    }

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        return parse_hex_number(hex).map(|n| sign * n);
    }

    // Rust's f64 grammar is a superset here only for inf/nan keywords,
    // which Lua does not read as numbers.
    if body.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
        return None;
    }
    body.parse::<f64>().ok().map(|n| sign * n)
}

/// Hex mantissa with optional fraction and optional `p` binary exponent.
/// Integer forms that fit i64 wrap through two's complement like Lua's
/// lexer; wider mantissas accumulate as floats.
fn parse_hex_number(hex: &str) -> Option<f64> {
    if hex.is_empty() {
        return None;
    }

    let (mantissa, exp) = match hex.find(['p', 'P']) {
        Some(i) => {
            let e: i32 = hex[i + 1..].parse().ok()?;
            (&hex[..i], Some(e))
        }
        None => (hex, None),
    };

    let (int_part, frac_part) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    // pure hex integer: reinterpret through u64 so 0xFFFFFFFFFFFFFFFF == -1
    if frac_part.is_empty() && exp.is_none() {
        if let Ok(u) = u64::from_str_radix(int_part, 16) {
            return Some(u as i64 as f64);
        }
    }

    let mut value = 0.0f64;
    for c in int_part.chars() {
        value = value * 16.0 + c.to_digit(16)? as f64;
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += c.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    if let Some(e) = exp {
        value *= (e as f64).exp2();
    }
    Some(value)
}
