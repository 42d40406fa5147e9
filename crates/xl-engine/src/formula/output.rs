//! Rendering a formula AST back to text.
//!
//! [`Render::render`] emits fragments tagged with an [`OutputKind`] so an
//! editor can colour them; `Display` on [`Expression`] joins them into the
//! canonical formula text, which always parses back to an equal AST.

use std::fmt;

use super::ast::{CellRange, Chain, Expression, Func, Primary, Reference, Unary};
use crate::value::{format_bool, format_decimal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Symbol,
    Whitespace,
    Operator,
    Number,
    Boolean,
    String,
    Function,
    Sheet,
    Cell,
}

pub trait Render {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind));
}

impl Render for Expression {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        out("=", OutputKind::Symbol);
        self.equality.render(out);
    }
}

impl<T: Render> Render for Chain<T> {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        self.operand.render(out);
        for (op, operand) in self.tail() {
            out(op.symbol(), OutputKind::Operator);
            operand.render(out);
        }
    }
}

impl Render for Unary {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        match self {
            Unary::Signed(sign, inner) => {
                out(sign.symbol(), OutputKind::Operator);
                inner.render(out);
            }
            Unary::Primary(p) => p.render(out),
        }
    }
}

impl Render for Primary {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        match self {
            Primary::SubExpression(inner) => {
                out("(", OutputKind::Symbol);
                inner.render(out);
                out(")", OutputKind::Symbol);
            }
            Primary::Number(n) => out(&format_decimal(n), OutputKind::Number),
            Primary::String(s) => out(&quote_string(s), OutputKind::String),
            Primary::Boolean(b) => out(format_bool(*b), OutputKind::Boolean),
            Primary::Func(f) => f.render(out),
            Primary::CellRange(r) => r.render(out),
        }
    }
}

impl Render for Func {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        out(&self.name, OutputKind::Function);
        out("(", OutputKind::Symbol);
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                out(",", OutputKind::Symbol);
                out(" ", OutputKind::Whitespace);
            }
            arg.render(out);
        }
        out(")", OutputKind::Symbol);
    }
}

impl Render for CellRange {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        self.cell.render(out);
        if let Some(to) = &self.to {
            out(":", OutputKind::Symbol);
            to.render(out);
        }
    }
}

impl Render for Reference {
    fn render(&self, out: &mut dyn FnMut(&str, OutputKind)) {
        if let Some(sheet) = &self.sheet {
            out(&quote_sheet(sheet), OutputKind::Sheet);
            out("!", OutputKind::Symbol);
        }
        out(&self.cell, OutputKind::Cell);
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        self.render(&mut |s, _| text.push_str(s));
        f.write_str(&text)
    }
}

fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Sheet names that would not lex back as a bare sheet qualifier are quoted.
pub(crate) fn quote_sheet(name: &str) -> String {
    let bare = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.eq_ignore_ascii_case("TRUE")
        && !name.eq_ignore_ascii_case("FALSE");
    if bare {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
