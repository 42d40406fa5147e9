//! Error types for the formula engine.

use thiserror::Error;

/// Errors raised while turning formula text into an AST.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected input at offset {offset}: {near:?}")]
    Lexical { offset: usize, near: String },

    #[error("syntax error at offset {offset}: {message}")]
    Grammatical { offset: usize, message: String },
}

/// Errors raised while binding a parsed reference to a live cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    #[error("invalid cell reference: {0}")]
    InvalidCell(String),

    #[error("no such sheet: {0}")]
    NoSuchSheet(String),

    #[error("no such cell: {0}")]
    NoSuchCell(String),

    #[error("ranges spanning several sheets are not supported")]
    MultiSheetRange,
}

/// Errors raised while reading or computing a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unable to cast {from} to {to}")]
    TypeCast {
        from: &'static str,
        to: &'static str,
    },

    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow")]
    Overflow,

    #[error("operator {op} cannot be applied to {kind}")]
    InvalidOperand { op: String, kind: &'static str },

    #[error("circular reference through {cell}")]
    Cycle { cell: String },

    #[error("unable to evaluate formula: {0}")]
    Formula(String),

    #[error("unable to evaluate formula: {0}")]
    Reference(#[from] RefError),
}

impl EvalError {
    /// Short marker shown in place of a value that failed to evaluate.
    pub fn indicator(&self) -> &'static str {
        match self {
            EvalError::TypeCast { .. }
            | EvalError::InvalidOperand { .. }
            | EvalError::Arity { .. } => "#VALUE!",
            EvalError::UnknownFunction(_) => "#NAME?",
            EvalError::DivisionByZero => "#DIV/0!",
            EvalError::Overflow => "#NUM!",
            EvalError::Cycle { .. } => "#CYCLE!",
            EvalError::Formula(_) => "#ERROR!",
            EvalError::Reference(_) => "#REF!",
        }
    }
}
