//! Recursive-descent parser for the formula grammar.
//!
//! ```text
//! expression     = "=" equality EOF
//! equality       = comparison [ ( "<>" | "=" ) equality ]
//! comparison     = addition [ ( ">" | ">=" | "<" | "<=" ) comparison ]
//! addition       = multiplication [ ( "-" | "+" ) addition ]
//! multiplication = unary [ ( "/" | "*" ) multiplication ]
//! unary          = ( "-" | "+" ) unary | primary
//! primary        = "(" equality ")" | Number | String | Boolean | func | range
//! func           = FuncName [ equality { "," equality } ] ")"
//! range          = reference [ ":" reference ]
//! reference      = [ Sheet ] Cell
//! ```

use super::ast::{
    Addition, BinaryOp, CellRange, Chain, Comparison, Equality, Expression, Func,
    Multiplication, Primary, Reference, Sign, Unary,
};
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::ParseError;
use crate::value::parse_decimal;

/// Deepest nesting of parentheses, function calls and prefix signs accepted.
pub const MAX_NESTING: usize = 64;

/// Parse formula source (including its leading `=`) into an AST.
pub fn parse(source: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(source)?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Whitespace)
        .collect();
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    parser.expression()
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::Grammatical {
                offset: t.offset,
                message: format!("expected {}, found {:?}", expected, t.text),
            },
            None => ParseError::Grammatical {
                offset: self.end,
                message: format!("expected {}, found end of formula", expected),
            },
        }
    }

    fn at_operator(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Operator && t.text == symbol)
    }

    fn expect_operator(&mut self, symbol: &str) -> Result<(), ParseError> {
        if self.at_operator(symbol) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("{:?}", symbol)))
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Marker => self.pos += 1,
            _ => return Err(self.error("\"=\" at the start of the formula")),
        }
        let equality = self.equality()?;
        if self.peek().is_some() {
            return Err(self.error("an operator or end of formula"));
        }
        Ok(Expression { equality })
    }

    /// One precedence layer: an operand, then any number of operators of this
    /// layer each followed by another operand. The operands are linked from
    /// the last one back, giving `operand [op rest]`.
    fn chain<T>(
        &mut self,
        ops: &[BinaryOp],
        operand: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Chain<T>, ParseError> {
        let first = operand(self)?;
        let mut links = Vec::new();
        while let Some(op) = self.layer_operator(ops) {
            self.pos += 1;
            links.push((op, operand(self)?));
        }
        // Link from the tail so each operator owns the rest of the layer.
        let mut rest = None;
        while let Some((op, operand)) = links.pop() {
            rest = Some((op, Box::new(Chain { operand, rest })));
        }
        Ok(Chain {
            operand: first,
            rest,
        })
    }

    fn layer_operator(&self, ops: &[BinaryOp]) -> Option<BinaryOp> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Operator => {
                ops.iter().copied().find(|op| op.symbol() == t.text)
            }
            _ => None,
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!("at most {} levels of nesting", MAX_NESTING)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn equality(&mut self) -> Result<Equality, ParseError> {
        self.chain(BinaryOp::EQUALITY, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Comparison, ParseError> {
        self.chain(BinaryOp::COMPARISON, Self::addition)
    }

    fn addition(&mut self) -> Result<Addition, ParseError> {
        self.chain(BinaryOp::ADDITIVE, Self::multiplication)
    }

    fn multiplication(&mut self) -> Result<Multiplication, ParseError> {
        self.chain(BinaryOp::MULTIPLICATIVE, Self::unary)
    }

    fn unary(&mut self) -> Result<Unary, ParseError> {
        let sign = if self.at_operator("-") {
            Some(Sign::Minus)
        } else if self.at_operator("+") {
            Some(Sign::Plus)
        } else {
            None
        };
        match sign {
            Some(sign) => {
                self.pos += 1;
                let inner = self.nested(Self::unary)?;
                Ok(Unary::Signed(sign, Box::new(inner)))
            }
            None => Ok(Unary::Primary(self.primary()?)),
        }
    }

    fn primary(&mut self) -> Result<Primary, ParseError> {
        let Some(token) = self.peek().copied() else {
            return Err(self.error("a value"));
        };
        match token.kind {
            TokenKind::Operator if token.text == "(" => {
                self.pos += 1;
                let inner = self.nested(Self::equality)?;
                self.expect_operator(")")?;
                Ok(Primary::SubExpression(Box::new(inner)))
            }
            TokenKind::Number => {
                let n = parse_decimal(token.text).ok_or_else(|| ParseError::Grammatical {
                    offset: token.offset,
                    message: format!("number out of range: {}", token.text),
                })?;
                self.pos += 1;
                Ok(Primary::Number(n))
            }
            TokenKind::String => {
                self.pos += 1;
                Ok(Primary::String(unquote_string(token.text)))
            }
            TokenKind::Boolean => {
                self.pos += 1;
                Ok(Primary::Boolean(token.text.eq_ignore_ascii_case("TRUE")))
            }
            TokenKind::FuncName => {
                self.pos += 1;
                Ok(Primary::Func(self.nested(|p| p.func(token.text))?))
            }
            TokenKind::Sheet | TokenKind::Cell => Ok(Primary::CellRange(self.cell_range()?)),
            _ => Err(self.error("a value")),
        }
    }

    fn func(&mut self, text: &str) -> Result<Func, ParseError> {
        let name = text.strip_suffix('(').unwrap_or(text).to_string();
        let mut arguments = Vec::new();
        if !self.at_operator(")") {
            arguments.push(self.equality()?);
            while self.at_operator(",") {
                self.pos += 1;
                arguments.push(self.equality()?);
            }
        }
        self.expect_operator(")")?;
        Ok(Func { name, arguments })
    }

    fn cell_range(&mut self) -> Result<CellRange, ParseError> {
        let cell = self.reference()?;
        let to = if self.at_operator(":") {
            self.pos += 1;
            Some(self.reference()?)
        } else {
            None
        };
        Ok(CellRange { cell, to })
    }

    fn reference(&mut self) -> Result<Reference, ParseError> {
        let sheet = match self.peek() {
            Some(t) if t.kind == TokenKind::Sheet => {
                let name = sheet_name(t.text);
                self.pos += 1;
                Some(name)
            }
            _ => None,
        };
        match self.peek() {
            Some(t) if t.kind == TokenKind::Cell => {
                let cell = t.text.to_string();
                self.next();
                Ok(Reference { sheet, cell })
            }
            _ => Err(self.error("a cell reference")),
        }
    }
}

/// Strip the surrounding double quotes and collapse `""` escapes.
fn unquote_string(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);
    inner.replace("\"\"", "\"")
}

/// Strip the trailing `!`, one layer of single quotes, and collapse `''` escapes.
fn sheet_name(text: &str) -> String {
    let name = text.strip_suffix('!').unwrap_or(text);
    let name = if name.len() >= 2 && name.starts_with('\'') && name.ends_with('\'') {
        &name[1..name.len() - 1]
    } else {
        name
    };
    name.replace("''", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decimal;
    use std::str::FromStr;

    fn primary_of(unary: &Unary) -> &Primary {
        match unary {
            Unary::Primary(p) => p,
            Unary::Signed(_, inner) => primary_of(inner),
        }
    }

    /// The sole primary of an expression with no binary operators.
    fn lone_primary(expr: &Expression) -> &Primary {
        let eq = &expr.equality;
        assert!(eq.rest.is_none());
        let cmp = &eq.operand;
        assert!(cmp.rest.is_none());
        let add = &cmp.operand;
        assert!(add.rest.is_none());
        let mul = &add.operand;
        assert!(mul.rest.is_none());
        primary_of(&mul.operand)
    }

    #[test]
    fn test_parse_number_literal() {
        let expr = parse("=1.5").unwrap();
        assert_eq!(
            lone_primary(&expr),
            &Primary::Number(Decimal::from_str("1.5").unwrap())
        );
    }

    #[test]
    fn test_parse_wide_number_literals() {
        for (source, text) in [("=1e30", "1e30"), ("=1e-60", "1e-60"), ("=.0000000000000000000000000000001", "1e-31")] {
            let expr = parse(source).unwrap();
            assert_eq!(
                lone_primary(&expr),
                &Primary::Number(Decimal::from_str(text).unwrap()),
                "{}",
                source
            );
        }
        assert!(matches!(parse("=1e5000"), Err(ParseError::Grammatical { .. })));
    }

    #[test]
    fn test_parse_string_unescapes_quotes() {
        let expr = parse(r#"="a ""b"" c""#).unwrap();
        assert_eq!(
            lone_primary(&expr),
            &Primary::String("a \"b\" c".to_string())
        );
    }

    #[test]
    fn test_parse_boolean_case_insensitive() {
        let expr = parse("=tRuE").unwrap();
        assert_eq!(lone_primary(&expr), &Primary::Boolean(true));
        let expr = parse("=false").unwrap();
        assert_eq!(lone_primary(&expr), &Primary::Boolean(false));
    }

    #[test]
    fn test_parse_multiplication_binds_tighter() {
        let expr = parse("=1+2*3").unwrap();
        let add = &expr.equality.operand.operand;
        let (op, rest) = add.rest.as_ref().unwrap();
        assert_eq!(*op, BinaryOp::Add);
        assert!(add.operand.rest.is_none());
        let (mul_op, _) = rest.operand.rest.as_ref().unwrap();
        assert_eq!(*mul_op, BinaryOp::Mul);
    }

    #[test]
    fn test_parse_layer_is_a_chain() {
        let expr = parse("=10-4-3").unwrap();
        let add = &expr.equality.operand.operand;
        let ops: Vec<BinaryOp> = add.tail().map(|(op, _)| op).collect();
        assert_eq!(ops, vec![BinaryOp::Sub, BinaryOp::Sub]);
    }

    #[test]
    fn test_parse_comparison_and_equality_layers() {
        let expr = parse("=A1<=2<>TRUE").unwrap();
        let (op, _) = expr.equality.rest.as_ref().unwrap();
        assert_eq!(*op, BinaryOp::NotEq);
        let (cmp_op, _) = expr.equality.operand.rest.as_ref().unwrap();
        assert_eq!(*cmp_op, BinaryOp::LtEq);
    }

    #[test]
    fn test_parse_nested_unary() {
        let expr = parse("=--A1").unwrap();
        let unary = &expr.equality.operand.operand.operand.operand;
        match unary {
            Unary::Signed(Sign::Minus, inner) => {
                assert!(matches!(**inner, Unary::Signed(Sign::Minus, _)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_arguments() {
        let expr = parse("=SUM(A1, 2, MAX(B1:B3))").unwrap();
        match lone_primary(&expr) {
            Primary::Func(f) => {
                assert_eq!(f.name, "SUM");
                assert_eq!(f.arguments.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_without_arguments() {
        let expr = parse("=NOW()").unwrap();
        assert!(matches!(lone_primary(&expr), Primary::Func(f) if f.arguments.is_empty()));
    }

    #[test]
    fn test_parse_sheet_qualified_range() {
        let expr = parse("='Q1 ''24'!a1:B2").unwrap();
        assert_eq!(
            lone_primary(&expr),
            &Primary::CellRange(CellRange {
                cell: Reference {
                    sheet: Some("Q1 '24".to_string()),
                    cell: "a1".to_string(),
                },
                to: Some(Reference {
                    sheet: None,
                    cell: "B2".to_string(),
                }),
            })
        );
    }

    #[test]
    fn test_parse_plain_sheet_name() {
        let expr = parse("=Data_2!C3").unwrap();
        match lone_primary(&expr) {
            Primary::CellRange(r) => assert_eq!(r.cell.sheet.as_deref(), Some("Data_2")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("1+2"), Err(ParseError::Grammatical { offset: 0, .. })));
        assert!(matches!(parse("="), Err(ParseError::Grammatical { offset: 1, .. })));
        assert!(matches!(parse("=(1+2"), Err(ParseError::Grammatical { offset: 5, .. })));
        assert!(matches!(parse("=1 2"), Err(ParseError::Grammatical { offset: 3, .. })));
        assert!(matches!(parse("=SUM(1,)"), Err(ParseError::Grammatical { offset: 7, .. })));
        assert!(matches!(parse("=Sheet1!"), Err(ParseError::Grammatical { .. })));
        assert!(matches!(parse("=1+*2"), Err(ParseError::Grammatical { offset: 3, .. })));
    }

    #[test]
    fn test_parse_lexical_error_passes_through() {
        assert!(matches!(parse("=1 $ 2"), Err(ParseError::Lexical { offset: 3, .. })));
    }

    #[test]
    fn test_parse_long_layer() {
        let source = format!("=1{}", "+1".repeat(100_000));
        let expr = parse(&source).unwrap();
        let add = &expr.equality.operand.operand;
        assert_eq!(add.tail().count(), 100_000);
        assert_eq!(expr.to_string().len(), source.len());
    }

    #[test]
    fn test_parse_nesting_limit() {
        let nested = |n: usize| format!("={}1{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&nested(MAX_NESTING)).is_ok());
        assert!(matches!(
            parse(&nested(MAX_NESTING + 1)),
            Err(ParseError::Grammatical { .. })
        ));
        assert!(matches!(
            parse(&nested(100_000)),
            Err(ParseError::Grammatical { .. })
        ));
        let signs = format!("={}1", "-".repeat(100_000));
        assert!(matches!(parse(&signs), Err(ParseError::Grammatical { .. })));
        let calls = format!("={}1{}", "ABS(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(parse(&calls), Err(ParseError::Grammatical { .. })));
    }
}
