//! Runtime values produced by formulas.

use num_traits::Zero;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::Decimal;
use crate::error::EvalError;

/// Decimal literals must lie within `1E-4096 ..= 9.99E+4096` in magnitude.
pub const MAX_EXPONENT: i64 = 4096;

/// Numbers whose leading digit sits beyond this power of ten print in
/// scientific notation.
const PLAIN_EXPONENT: i64 = 20;

/// A typed value flowing through a compiled formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Decimal(Decimal),
    Bool(bool),
    /// Values of the populated cells of a range, row-major.
    Range(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "bool",
            Value::Range(_) => "range",
        }
    }

    /// Empty text stands for a blank cell and coerces to zero / false.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }

    pub fn bool_value(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Decimal(d) => Ok(!d.is_zero()),
            v if v.is_blank() => Ok(false),
            v => Err(cast(v, "bool")),
        }
    }

    pub fn decimal_value(&self) -> Result<Decimal, EvalError> {
        match self {
            Value::Decimal(d) => Ok(d.clone()),
            v if v.is_blank() => Ok(Decimal::zero()),
            v => Err(cast(v, "decimal")),
        }
    }

    pub fn string_value(&self) -> Result<String, EvalError> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Decimal(d) => Ok(format_decimal(d)),
            Value::Bool(b) => Ok(format_bool(*b).to_string()),
            v => Err(cast(v, "text")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.string_value() {
            Ok(s) => f.write_str(&s),
            Err(e) => f.write_str(e.indicator()),
        }
    }
}

fn cast(v: &Value, to: &'static str) -> EvalError {
    EvalError::TypeCast {
        from: v.kind(),
        to,
    }
}

/// Format a decimal without trailing fractional zeros. Very large and very
/// small magnitudes use `1.5E+30` notation, which parses back.
pub fn format_decimal(d: &Decimal) -> String {
    if d.is_zero() {
        return "0".to_string();
    }
    let (mantissa, scale) = d.normalized().as_bigint_and_exponent();
    let text = mantissa.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let len = digits.len() as i64;
    let exponent = len - 1 - scale;
    if exponent.abs() > PLAIN_EXPONENT {
        let (head, tail) = digits.split_at(1);
        let point = if tail.is_empty() { "" } else { "." };
        format!("{}{}{}{}E{:+}", sign, head, point, tail, exponent)
    } else if scale <= 0 {
        format!("{}{}{}", sign, digits, "0".repeat((-scale) as usize))
    } else if scale < len {
        let (int, frac) = digits.split_at((len - scale) as usize);
        format!("{}{}.{}", sign, int, frac)
    } else {
        format!("{}0.{}{}", sign, "0".repeat((scale - len) as usize), digits)
    }
}

/// Power of ten of the leading digit: 2 for `123`, -3 for `0.0045`.
fn leading_exponent(d: &Decimal) -> i64 {
    let (mantissa, scale) = d.as_bigint_and_exponent();
    let digits = mantissa.to_string().trim_start_matches('-').len() as i64;
    digits - 1 - scale
}

pub fn format_bool(b: bool) -> &'static str {
    if b { "TRUE" } else { "FALSE" }
}

/// Parse `TRUE` / `FALSE` in any letter case. Nothing else is a boolean.
pub fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("TRUE") {
        Some(true)
    } else if s.eq_ignore_ascii_case("FALSE") {
        Some(false)
    } else {
        None
    }
}

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+-]?)([0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE]([+-]?[0-9]+))?$")
            .expect("decimal regex must compile")
    })
}

/// Parse a decimal literal with optional fraction and exponent.
/// Returns None for anything else, including magnitudes beyond
/// [`MAX_EXPONENT`].
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let caps = decimal_re().captures(s)?;
    let exponent: i64 = match caps.get(3) {
        Some(e) => e.as_str().parse().ok()?,
        None => 0,
    };
    if exponent.abs() > 2 * MAX_EXPONENT + s.len() as i64 {
        return None;
    }
    let sign = if &caps[1] == "-" { "-" } else { "" };
    let digits = &caps[2];
    let zero = if digits.starts_with('.') { "0" } else { "" };
    let d = Decimal::from_str(&format!("{}{}{}e{}", sign, zero, digits, exponent)).ok()?;
    if d.is_zero() || leading_exponent(&d).abs() <= MAX_EXPONENT {
        Some(d)
    } else {
        None
    }
}
