//! Formula syntax tree.
//!
//! Nodes are layered by binding power, loosest first:
//! `Expression -> Equality -> Comparison -> Addition -> Multiplication -> Unary -> Primary`.
//! Each binary layer is a [`Chain`]: one operand of the next tighter layer,
//! optionally followed by an operator and the rest of the same layer.

use crate::Decimal;

/// A whole formula, including its leading `=`.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub equality: Equality,
}

/// `operand [op rest]` for one precedence layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain<T> {
    pub operand: T,
    pub rest: Option<(BinaryOp, Box<Chain<T>>)>,
}

impl<T> Chain<T> {
    pub fn single(operand: T) -> Self {
        Chain {
            operand,
            rest: None,
        }
    }

    /// Iterate the operators and operands after the first one, in source order.
    pub fn tail(&self) -> impl Iterator<Item = (BinaryOp, &T)> {
        std::iter::successors(self.rest.as_ref(), |link| link.1.rest.as_ref())
            .map(|link| (link.0, &link.1.operand))
    }
}

impl<T> Drop for Chain<T> {
    // Unlink the rest one node at a time; long layers would otherwise be
    // dropped recursively.
    fn drop(&mut self) {
        let mut next = self.rest.take();
        while let Some((_, mut link)) = next {
            next = link.rest.take();
        }
    }
}

pub type Equality = Chain<Comparison>;
pub type Comparison = Chain<Addition>;
pub type Addition = Chain<Multiplication>;
pub type Multiplication = Chain<Unary>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub const EQUALITY: &'static [BinaryOp] = &[BinaryOp::NotEq, BinaryOp::Eq];
    pub const COMPARISON: &'static [BinaryOp] =
        &[BinaryOp::Gt, BinaryOp::GtEq, BinaryOp::Lt, BinaryOp::LtEq];
    pub const ADDITIVE: &'static [BinaryOp] = &[BinaryOp::Sub, BinaryOp::Add];
    pub const MULTIPLICATIVE: &'static [BinaryOp] = &[BinaryOp::Div, BinaryOp::Mul];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn symbol(self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Unary {
    Signed(Sign, Box<Unary>),
    Primary(Primary),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primary {
    SubExpression(Box<Equality>),
    Number(Decimal),
    String(String),
    Boolean(bool),
    Func(Func),
    CellRange(CellRange),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Func {
    pub name: String,
    pub arguments: Vec<Equality>,
}

/// A single reference, or a range when `to` is present.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub cell: Reference,
    pub to: Option<Reference>,
}

/// `[Sheet!]A1` as written in the formula. The coordinate is not validated here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    pub sheet: Option<String>,
    pub cell: String,
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}", super::output::quote_sheet(sheet), self.cell),
            None => f.write_str(&self.cell),
        }
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cell)?;
        if let Some(to) = &self.to {
            write!(f, ":{}", to)?;
        }
        Ok(())
    }
}
