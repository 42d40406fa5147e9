//! The formula language.
//!
//! - [`tokenize`] - Split formula text into classified tokens
//! - [`parse`] - Build the precedence-layered AST
//! - [`compile`] - Turn an AST into a [`Program`] plus its [`VarBin`]
//! - [`Render`] - Print an AST back to (highlightable) text

mod ast;
mod compiler;
mod lexer;
mod output;
mod parser;

pub use ast::{
    Addition, BinaryOp, CellRange, Chain, Comparison, Equality, Expression, Func,
    Multiplication, Primary, Reference, Sign, Unary,
};
pub use compiler::{Args, Program, VarBin, compile};
pub use lexer::{Token, TokenKind, tokenize};
pub use output::{OutputKind, Render};
pub use parser::parse;

use crate::error::ParseError;

/// Parse and compile formula source in one step.
pub fn build(source: &str) -> Result<(Program, VarBin), ParseError> {
    let expr = parse(source)?;
    let (program, vars) = compile(&expr);
    log::trace!("compiled {:?} with {} reference(s)", source, vars.len());
    Ok((program, vars))
}

/// References a formula reads, in source order, without compiling it.
pub fn dependencies(source: &str) -> Result<VarBin, ParseError> {
    build(source).map(|(_, vars)| vars)
}
