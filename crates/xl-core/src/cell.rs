//! The lazily typed cell value model.
//!
//! A cell stores the raw text the user typed. Its type is worked out on the
//! first read and cached until the raw text changes:
//! - empty text -> [`ValueType::Empty`]
//! - `=` followed by anything -> [`ValueType::Formula`] (parsed, compiled and
//!   bound to the cells it references)
//! - `TRUE` / `FALSE` in any case -> [`ValueType::Bool`]
//! - a whole number -> [`ValueType::Integer`]
//! - a decimal number -> [`ValueType::Decimal`]
//! - anything else -> [`ValueType::Text`]

use num_traits::Zero;
use std::fmt;

use thiserror::Error;
use xl_engine::formula::{VarBin, build};
use xl_engine::value::{parse_bool, parse_decimal};
use xl_engine::{Decimal, EvalError, ParseError, Program, RefError, Value};

use crate::context::EvalContext;
use crate::link::Binding;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Untyped,
    Empty,
    Text,
    Integer,
    Decimal,
    Bool,
    Formula,
}

/// Why a formula cell has no usable program. Cleared only by new raw text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("formula error: {0}")]
    Formula(#[from] ParseError),

    #[error("reference error: {0}")]
    Reference(#[from] RefError),
}

impl From<&CellError> for EvalError {
    fn from(e: &CellError) -> Self {
        match e {
            CellError::Formula(e) => EvalError::Formula(e.to_string()),
            CellError::Reference(e) => EvalError::Reference(e.clone()),
        }
    }
}

struct BoundFormula {
    program: Program,
    args: Vec<Binding>,
}

impl BoundFormula {
    fn eval(&self, ctx: &mut EvalContext<'_>) -> Result<Value, EvalError> {
        let values = self
            .args
            .iter()
            .map(|arg| arg.resolve(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        self.program.eval(&values, ctx.functions())
    }
}

enum Content {
    Untyped,
    Empty,
    Text,
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
    Formula(Result<BoundFormula, CellError>),
}

pub struct Cell {
    raw: String,
    content: Content,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell {
            raw: String::new(),
            content: Content::Empty,
        }
    }

    pub fn new_untyped(raw: impl Into<String>) -> Cell {
        let mut cell = Cell::new_empty();
        cell.set_value_untyped(raw);
        cell
    }

    /// Reset the cell to empty.
    pub fn erase_value(&mut self) {
        self.raw.clear();
        self.content = Content::Empty;
    }

    /// Replace the raw text. The type is worked out again on the next read.
    pub fn set_value_untyped(&mut self, raw: impl Into<String>) {
        self.erase_value();
        self.raw = raw.into();
        self.content = Content::Untyped;
    }

    /// The text as entered. No evaluation performed.
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    pub fn value_type(&self) -> ValueType {
        match self.content {
            Content::Untyped => ValueType::Untyped,
            Content::Empty => ValueType::Empty,
            Content::Text => ValueType::Text,
            Content::Integer(_) => ValueType::Integer,
            Content::Decimal(_) => ValueType::Decimal,
            Content::Bool(_) => ValueType::Bool,
            Content::Formula(_) => ValueType::Formula,
        }
    }

    /// The formula error, if the raw text is a formula that could not be
    /// compiled or bound.
    pub fn error(&self) -> Option<&CellError> {
        match &self.content {
            Content::Formula(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn bool_value(&mut self, ctx: &mut EvalContext<'_>) -> Result<bool, EvalError> {
        self.resolve_type(ctx);
        match &self.content {
            Content::Untyped | Content::Empty => Ok(false),
            Content::Text => Err(EvalError::TypeCast {
                from: "text",
                to: "bool",
            }),
            Content::Integer(i) => Ok(*i != 0),
            Content::Decimal(d) => Ok(!d.is_zero()),
            Content::Bool(b) => Ok(*b),
            Content::Formula(f) => formula(f)?.eval(ctx)?.bool_value(),
        }
    }

    pub fn decimal_value(&mut self, ctx: &mut EvalContext<'_>) -> Result<Decimal, EvalError> {
        self.resolve_type(ctx);
        match &self.content {
            Content::Untyped | Content::Empty => Ok(Decimal::zero()),
            Content::Text => Err(EvalError::TypeCast {
                from: "text",
                to: "decimal",
            }),
            Content::Integer(i) => Ok(Decimal::from(*i)),
            Content::Decimal(d) => Ok(d.clone()),
            Content::Bool(_) => Err(EvalError::TypeCast {
                from: "bool",
                to: "decimal",
            }),
            Content::Formula(f) => formula(f)?.eval(ctx)?.decimal_value(),
        }
    }

    /// Text to show for the cell. Never fails: formulas that cannot be
    /// evaluated show an error marker such as `#REF!`.
    pub fn string_value(&mut self, ctx: &mut EvalContext<'_>) -> String {
        self.resolve_type(ctx);
        match &self.content {
            Content::Formula(f) => match formula(f).and_then(|f| f.eval(ctx)) {
                Ok(v) => v.to_string(),
                Err(e) => e.indicator().to_string(),
            },
            _ => self.raw.clone(),
        }
    }

    /// The cell's typed value. Integers are widened to decimals and an empty
    /// cell reads as empty text.
    pub fn value(&mut self, ctx: &mut EvalContext<'_>) -> Result<Value, EvalError> {
        self.resolve_type(ctx);
        match &self.content {
            Content::Empty => Ok(Value::text("")),
            Content::Text => Ok(Value::Text(self.raw.clone())),
            Content::Integer(i) => Ok(Value::Decimal(Decimal::from(*i))),
            Content::Decimal(d) => Ok(Value::Decimal(d.clone())),
            Content::Bool(b) => Ok(Value::Bool(*b)),
            Content::Formula(f) => formula(f)?.eval(ctx),
            Content::Untyped => unreachable!("cell type is resolved before it is read"),
        }
    }

    fn resolve_type(&mut self, ctx: &EvalContext<'_>) {
        if !matches!(self.content, Content::Untyped) {
            return;
        }
        self.content = guess_type(&self.raw, ctx);
        log::trace!("typed {:?} as {:?}", self.raw, self.value_type());
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::new_empty()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("raw", &self.raw)
            .field("type", &self.value_type())
            .field("error", &self.error())
            .finish()
    }
}

fn formula(f: &Result<BoundFormula, CellError>) -> Result<&BoundFormula, EvalError> {
    f.as_ref().map_err(EvalError::from)
}

fn guess_type(raw: &str, ctx: &EvalContext<'_>) -> Content {
    if raw.is_empty() {
        Content::Empty
    } else if raw.starts_with('=') && raw.len() > 1 {
        Content::Formula(compile_formula(raw, ctx))
    } else if let Some(b) = parse_bool(raw) {
        Content::Bool(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Content::Integer(i)
    } else if let Some(d) = parse_decimal(raw) {
        Content::Decimal(d)
    } else {
        Content::Text
    }
}

fn compile_formula(raw: &str, ctx: &EvalContext<'_>) -> Result<BoundFormula, CellError> {
    let (program, vars) = build(raw).inspect_err(|e| {
        log::debug!("formula {:?} does not parse: {}", raw, e);
    })?;
    let args = bind(&vars, ctx).inspect_err(|e| {
        log::debug!("formula {:?} has an unresolved reference: {}", raw, e);
    })?;
    Ok(BoundFormula { program, args })
}

/// Turn each reference of the variable bin into a link, in order.
fn bind(vars: &VarBin, ctx: &EvalContext<'_>) -> Result<Vec<Binding>, RefError> {
    let registry = ctx.registry();
    let scope = ctx.current_sheet();
    vars.iter()
        .map(|range| {
            let sheet = range.cell.sheet.as_deref().or(scope);
            let Some(to) = &range.to else {
                return registry.make_link(&range.cell.cell, sheet).map(Binding::Cell);
            };
            if let Some(to_sheet) = &to.sheet
                && range
                    .cell
                    .sheet
                    .as_deref()
                    .is_none_or(|from_sheet| !from_sheet.eq_ignore_ascii_case(to_sheet))
            {
                return Err(RefError::MultiSheetRange);
            }
            registry
                .make_range(&range.cell.cell, &to.cell, sheet)
                .map(Binding::Range)
        })
        .collect()
}
