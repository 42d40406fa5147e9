//! Compiling a formula AST into a closure over resolved reference values.
//!
//! Every cell or range reference met during a left-to-right walk of the AST is
//! appended to a [`VarBin`]. The caller resolves those references in the same
//! order and hands the values to [`Program::eval`]. Sub-evaluators read their
//! share of the values from a shared [`Args`] cursor, so each value is consumed
//! exactly once, in source order.

use std::fmt;

use super::ast::{CellRange, Chain, Expression, Primary, Unary};
use crate::builtins::Functions;
use crate::error::EvalError;
use crate::value::Value;

/// Cursor over the resolved reference values of one evaluation.
pub struct Args<'a> {
    values: std::slice::Iter<'a, Value>,
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Args {
            values: values.iter(),
        }
    }

    /// Take the next value.
    ///
    /// # Panics
    ///
    /// Panics when the cursor is exhausted. The bound value count always equals
    /// the program's arity, so this only fires on a compiler bug.
    pub fn take(&mut self) -> &'a Value {
        self.values
            .next()
            .expect("compiled formula read past its bound arguments")
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

type EvalFn = Box<dyn Fn(&mut Args<'_>, &dyn Functions) -> Result<Value, EvalError>>;

/// A compiled sub-expression and the number of values it consumes.
struct Compiled {
    eval: EvalFn,
    consumed: usize,
}

impl Compiled {
    fn constant(value: Value) -> Self {
        Compiled {
            eval: Box::new(move |_, _| Ok(value.clone())),
            consumed: 0,
        }
    }
}

/// References collected while compiling, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarBin {
    pub vars: Vec<CellRange>,
}

impl VarBin {
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CellRange> {
        self.vars.iter()
    }
}

/// A compiled formula.
pub struct Program {
    eval: EvalFn,
    arity: usize,
}

impl Program {
    /// Number of resolved values [`Program::eval`] expects.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the formula over values resolved from its [`VarBin`], in order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from [`Program::arity`].
    pub fn eval(&self, values: &[Value], functions: &dyn Functions) -> Result<Value, EvalError> {
        assert_eq!(
            values.len(),
            self.arity,
            "formula bound to the wrong number of values"
        );
        let mut args = Args::new(values);
        let result = (self.eval)(&mut args, functions);
        debug_assert!(result.is_err() || args.remaining() == 0);
        result
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Compile an AST. The returned program's arity equals the variable bin's length.
pub fn compile(expr: &Expression) -> (Program, VarBin) {
    let mut vars = VarBin::default();
    let compiled = expr.equality.compile(&mut vars);
    debug_assert_eq!(compiled.consumed, vars.len());
    let program = Program {
        eval: compiled.eval,
        arity: compiled.consumed,
    };
    (program, vars)
}

trait Compile {
    fn compile(&self, vars: &mut VarBin) -> Compiled;
}

/// Operators of one layer are applied left to right: `10-4-3` is `(10-4)-3`.
impl<T: Compile> Compile for Chain<T> {
    fn compile(&self, vars: &mut VarBin) -> Compiled {
        let first = self.operand.compile(vars);
        let rest: Vec<_> = self
            .tail()
            .map(|(op, operand)| (op, operand.compile(vars)))
            .collect();
        if rest.is_empty() {
            return first;
        }
        let consumed = first.consumed + rest.iter().map(|(_, c)| c.consumed).sum::<usize>();
        Compiled {
            eval: Box::new(move |args, functions| {
                let mut acc = (first.eval)(args, functions)?;
                for (op, operand) in &rest {
                    let rhs = (operand.eval)(args, functions)?;
                    acc = functions.eval_binary(*op, &acc, &rhs)?;
                }
                Ok(acc)
            }),
            consumed,
        }
    }
}

impl Compile for Unary {
    fn compile(&self, vars: &mut VarBin) -> Compiled {
        match self {
            Unary::Signed(sign, inner) => {
                let sign = *sign;
                let inner = inner.compile(vars);
                Compiled {
                    consumed: inner.consumed,
                    eval: Box::new(move |args, functions| {
                        let v = (inner.eval)(args, functions)?;
                        functions.eval_unary(sign, &v)
                    }),
                }
            }
            Unary::Primary(p) => p.compile(vars),
        }
    }
}

impl Compile for Primary {
    fn compile(&self, vars: &mut VarBin) -> Compiled {
        match self {
            Primary::SubExpression(inner) => inner.compile(vars),
            Primary::Number(n) => Compiled::constant(Value::Decimal(n.clone())),
            Primary::String(s) => Compiled::constant(Value::Text(s.clone())),
            Primary::Boolean(b) => Compiled::constant(Value::Bool(*b)),
            Primary::Func(func) => {
                let name = func.name.clone();
                let arguments: Vec<Compiled> =
                    func.arguments.iter().map(|a| a.compile(vars)).collect();
                let consumed = arguments.iter().map(|a| a.consumed).sum();
                Compiled {
                    eval: Box::new(move |args, functions| {
                        let values = arguments
                            .iter()
                            .map(|a| (a.eval)(args, functions))
                            .collect::<Result<Vec<_>, _>>()?;
                        functions.eval_function(&name, values)
                    }),
                    consumed,
                }
            }
            Primary::CellRange(range) => {
                vars.vars.push(range.clone());
                Compiled {
                    eval: Box::new(|args, _| Ok(args.take().clone())),
                    consumed: 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::formula::parse;
    use crate::Decimal;

    fn build(source: &str) -> (Program, VarBin) {
        compile(&parse(source).unwrap())
    }

    fn num(n: i64) -> Value {
        Value::Decimal(Decimal::from(n))
    }

    fn refs(vars: &VarBin) -> Vec<String> {
        vars.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_literals_consume_nothing() {
        let (program, vars) = build("=1+2*3");
        assert_eq!(program.arity(), 0);
        assert!(vars.is_empty());
        assert_eq!(program.eval(&[], &Builtins), Ok(num(7)));
    }

    #[test]
    fn test_reference_consumes_one_value() {
        let (program, vars) = build("=A1+2");
        assert_eq!(refs(&vars), vec!["A1"]);
        assert_eq!(program.eval(&[num(3)], &Builtins), Ok(num(5)));
    }

    #[test]
    fn test_var_bin_follows_source_order() {
        let (program, vars) = build("=SUM(B2, Sheet2!A1*(C3-D4), MAX(E5:F6, G7))/H8");
        assert_eq!(
            refs(&vars),
            vec!["B2", "Sheet2!A1", "C3", "D4", "E5:F6", "G7", "H8"]
        );
        assert_eq!(program.arity(), vars.len());
    }

    #[test]
    fn test_values_are_consumed_in_source_order() {
        let (program, _) = build("=A1-B1-C1");
        assert_eq!(program.eval(&[num(10), num(4), num(3)], &Builtins), Ok(num(3)));
        let (program, _) = build("=A1/B1/C1");
        assert_eq!(program.eval(&[num(8), num(4), num(2)], &Builtins), Ok(num(1)));
    }

    #[test]
    fn test_nested_function_arguments_partition_values() {
        let (program, vars) = build("=SUM(A1, SUM(A2, A3), -A4)");
        assert_eq!(vars.len(), 4);
        assert_eq!(
            program.eval(&[num(1), num(10), num(100), num(1000)], &Builtins),
            Ok(num(-889))
        );
    }

    #[test]
    fn test_error_short_circuits() {
        let (program, _) = build("=A1/0+UNKNOWN(B1)");
        assert_eq!(
            program.eval(&[num(1), num(2)], &Builtins),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_unknown_function_is_an_evaluation_error() {
        let (program, _) = build("=NOPE(1)");
        assert_eq!(
            program.eval(&[], &Builtins),
            Err(EvalError::UnknownFunction("NOPE".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "wrong number of values")]
    fn test_eval_rejects_wrong_binding_count() {
        let (program, _) = build("=A1+A2");
        let _ = program.eval(&[num(1)], &Builtins);
    }
}
