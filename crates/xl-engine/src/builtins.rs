//! Operator and function evaluation.
//!
//! Conventions:
//! - Spreadsheet-facing function names are matched case-insensitively and
//!   listed in ALL CAPS in [`FUNCTIONS`].
//! - Arithmetic coerces operands with [`Value::decimal_value`] and is exact
//!   except for division, which keeps the decimal crate's default precision.
//! - Range arguments are flattened by the aggregate functions.

use bigdecimal::RoundingMode;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;

use crate::Decimal;
use crate::error::EvalError;
use crate::formula::{BinaryOp, Sign};
use crate::value::{MAX_EXPONENT, Value};

/// The capability compiled formulas call to apply operators and functions.
pub trait Functions {
    fn eval_unary(&self, sign: Sign, operand: &Value) -> Result<Value, EvalError>;

    fn eval_binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError>;

    fn eval_function(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError>;
}

pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
}

pub const FUNCTIONS: &[Builtin] = &[
    Builtin {
        name: "SUM",
        description: "Sum of numeric arguments and range values",
    },
    Builtin {
        name: "AVERAGE",
        description: "Average of numeric arguments and range values (alias AVG)",
    },
    Builtin {
        name: "MIN",
        description: "Smallest numeric argument",
    },
    Builtin {
        name: "MAX",
        description: "Largest numeric argument",
    },
    Builtin {
        name: "COUNT",
        description: "Count of numeric arguments and range values",
    },
    Builtin {
        name: "ABS",
        description: "Absolute value",
    },
    Builtin {
        name: "ROUND",
        description: "Round half away from zero to the given number of digits",
    },
    Builtin {
        name: "IF",
        description: "IF(condition, then, [else])",
    },
    Builtin {
        name: "AND",
        description: "True when every argument is true",
    },
    Builtin {
        name: "OR",
        description: "True when any argument is true",
    },
    Builtin {
        name: "NOT",
        description: "Logical negation",
    },
    Builtin {
        name: "CONCAT",
        description: "Join the text of all arguments (alias CONCATENATE)",
    },
    Builtin {
        name: "LEN",
        description: "Number of characters in the text",
    },
    Builtin {
        name: "UPPER",
        description: "Upper-case text",
    },
    Builtin {
        name: "LOWER",
        description: "Lower-case text",
    },
];

/// The default operator and function set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Builtins;

impl Functions for Builtins {
    fn eval_unary(&self, sign: Sign, operand: &Value) -> Result<Value, EvalError> {
        let n = numeric(sign.symbol(), operand)?;
        Ok(Value::Decimal(match sign {
            Sign::Plus => n,
            Sign::Minus => -n,
        }))
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let a = numeric(op.symbol(), lhs)?;
                let b = numeric(op.symbol(), rhs)?;
                arithmetic(op, &a, &b).map(Value::Decimal)
            }
            BinaryOp::Eq => Ok(Value::Bool(equals(lhs, rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!equals(lhs, rhs))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ord = compare(op, lhs, rhs)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::LtEq => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                }))
            }
        }
    }

    fn eval_function(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "SUM" => {
                let total = numbers(&upper, &args)?
                    .into_iter()
                    .fold(Decimal::zero(), |total, n| total + n);
                Ok(Value::Decimal(total))
            }
            "AVERAGE" | "AVG" => {
                let nums = numbers(&upper, &args)?;
                if nums.is_empty() {
                    return Err(EvalError::DivisionByZero);
                }
                let count = Decimal::from(nums.len() as u64);
                let total = nums.into_iter().fold(Decimal::zero(), |total, n| total + n);
                arithmetic(BinaryOp::Div, &total, &count).map(Value::Decimal)
            }
            "MIN" => Ok(Value::Decimal(
                numbers(&upper, &args)?
                    .into_iter()
                    .min()
                    .unwrap_or_else(Decimal::zero),
            )),
            "MAX" => Ok(Value::Decimal(
                numbers(&upper, &args)?
                    .into_iter()
                    .max()
                    .unwrap_or_else(Decimal::zero),
            )),
            "COUNT" => {
                let count = flatten(&args)
                    .filter(|v| matches!(v, Value::Decimal(_)))
                    .count();
                Ok(Value::Decimal(Decimal::from(count as u64)))
            }
            "ABS" => {
                let [v] = exactly::<1>(&upper, args)?;
                Ok(Value::Decimal(numeric(&upper, &v)?.abs()))
            }
            "ROUND" => {
                if !(1..=2).contains(&args.len()) {
                    return Err(arity(&upper, "1 or 2", args.len()));
                }
                let n = numeric(&upper, &args[0])?;
                let dp = match args.get(1) {
                    Some(d) => numeric(&upper, d)?
                        .to_i64()
                        .filter(|dp| dp.abs() <= MAX_EXPONENT)
                        .ok_or(EvalError::Overflow)?,
                    None => 0,
                };
                Ok(Value::Decimal(n.with_scale_round(dp, RoundingMode::HalfUp)))
            }
            "IF" => {
                if !(2..=3).contains(&args.len()) {
                    return Err(arity(&upper, "2 or 3", args.len()));
                }
                let mut args = args.into_iter();
                let condition = args.next().map(|c| c.bool_value()).transpose()?;
                let then = args.next();
                let otherwise = args.next();
                Ok(if condition.unwrap_or(false) {
                    then.unwrap_or(Value::Bool(true))
                } else {
                    otherwise.unwrap_or(Value::Bool(false))
                })
            }
            "AND" | "OR" => {
                if args.is_empty() {
                    return Err(arity(&upper, "at least 1", 0));
                }
                let mut result = upper == "AND";
                for v in flatten(&args) {
                    let b = v.bool_value()?;
                    result = if upper == "AND" { result && b } else { result || b };
                }
                Ok(Value::Bool(result))
            }
            "NOT" => {
                let [v] = exactly::<1>(&upper, args)?;
                Ok(Value::Bool(!v.bool_value()?))
            }
            "CONCAT" | "CONCATENATE" => {
                let mut out = String::new();
                for v in flatten(&args) {
                    out.push_str(&v.string_value()?);
                }
                Ok(Value::Text(out))
            }
            "LEN" => {
                let [v] = exactly::<1>(&upper, args)?;
                Ok(Value::Decimal(Decimal::from(v.string_value()?.chars().count() as u64)))
            }
            "UPPER" => {
                let [v] = exactly::<1>(&upper, args)?;
                Ok(Value::Text(v.string_value()?.to_uppercase()))
            }
            "LOWER" => {
                let [v] = exactly::<1>(&upper, args)?;
                Ok(Value::Text(v.string_value()?.to_lowercase()))
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

fn arity(name: &str, expected: &'static str, got: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected,
        got,
    }
}

fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| {
        let expected = match N {
            1 => "1",
            2 => "2",
            _ => "a fixed number of",
        };
        arity(name, expected, got)
    })
}

fn numeric(op: &str, v: &Value) -> Result<Decimal, EvalError> {
    match v {
        Value::Range(_) => Err(EvalError::InvalidOperand {
            op: op.to_string(),
            kind: v.kind(),
        }),
        v => v.decimal_value(),
    }
}

fn arithmetic(op: BinaryOp, a: &Decimal, b: &Decimal) -> Result<Decimal, EvalError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div if b.is_zero() => Err(EvalError::DivisionByZero),
        BinaryOp::Div => Ok(a / b),
        _ => Err(EvalError::InvalidOperand {
            op: op.symbol().to_string(),
            kind: "decimal",
        }),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Text(a), Value::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Ordering, EvalError> {
    match (lhs, rhs) {
        (Value::Text(a), Value::Text(b)) => Ok(a.to_lowercase().cmp(&b.to_lowercase())),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (a, b) => Err(EvalError::InvalidOperand {
            op: op.symbol().to_string(),
            kind: if matches!(a, Value::Range(_)) || a.kind() == b.kind() {
                a.kind()
            } else {
                "mixed kinds"
            },
        }),
    }
}

/// Arguments with ranges expanded in place.
fn flatten(args: &[Value]) -> impl Iterator<Item = &Value> {
    args.iter().flat_map(|v| match v {
        Value::Range(values) => values.iter(),
        v => std::slice::from_ref(v).iter(),
    })
}

/// Numeric arguments of an aggregate. Direct arguments must be numeric;
/// non-numeric values inside ranges are skipped.
fn numbers(name: &str, args: &[Value]) -> Result<Vec<Decimal>, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Range(values) => out.extend(values.iter().filter_map(|v| match v {
                Value::Decimal(d) => Some(d.clone()),
                _ => None,
            })),
            v => out.push(numeric(name, v)?),
        }
    }
    Ok(out)
}
