//! Parsing of textual join conditions.
//!
//! The syntax follows dplyr's `join_by`:
//!
//! ```text
//! id, closest(birthday >= party), between(x, lower, upper), a + 2 < b
//! ```
//!
//! Items are separated by `,` or `&`. A bare column name `a` is shorthand for
//! `a == a`. Column names that aren't plain identifiers can be quoted with
//! backticks.

use super::{ComparisonOperator, JoinComparison, JoinCondition, JoinExpr};
use crate::errors::{JoinError, Result};
use crate::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Integer(i64),
    Float(f64),
    Op(ComparisonOperator),
    Plus,
    Minus,
    LeftParen,
    RightParen,
    Comma,
    And,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithLocation {
    pub token: Token,
    /// Byte offset of the start of the token.
    pub position: usize,
}

#[derive(Debug)]
pub struct Tokenizer<'a> {
    input: &'a str,
    idx: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer { input, idx: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<TokenWithLocation>> {
        let mut toks = Vec::new();
        while let Some(tok) = self.next_token()? {
            toks.push(tok);
        }
        Ok(toks)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.idx..].chars().next()
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut chars = self.input[self.idx..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.idx += c.len_utf8();
        Some(c)
    }

    fn err(&self, message: impl Into<String>, position: usize) -> JoinError {
        JoinError::Parse {
            message: message.into(),
            position,
        }
    }

    fn next_token(&mut self) -> Result<Option<TokenWithLocation>> {
        while self.peek_char().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }

        let position = self.idx;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let token = match c {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '&' => {
                if self.peek_char() == Some('&') {
                    self.bump();
                }
                Token::And
            }
            '=' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::Op(ComparisonOperator::Eq)
                } else {
                    return Err(self.err("Expected '==', got '='", position));
                }
            }
            '<' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::Op(ComparisonOperator::LtEq)
                } else {
                    Token::Op(ComparisonOperator::Lt)
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    Token::Op(ComparisonOperator::GtEq)
                } else {
                    Token::Op(ComparisonOperator::Gt)
                }
            }
            '`' => {
                let start = self.idx;
                loop {
                    match self.bump() {
                        Some('`') => break,
                        Some(_) => (),
                        None => return Err(self.err("Unterminated quoted identifier", position)),
                    }
                }
                let name = &self.input[start..self.idx - 1];
                if name.is_empty() {
                    return Err(self.err("Empty quoted identifier", position));
                }
                Token::Ident(name.to_string())
            }
            c if c.is_ascii_digit() => self.take_number(position)?,
            '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                self.take_number(position)?
            }
            c if c.is_alphabetic() || c == '_' => {
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
                {
                    self.bump();
                }
                Token::Ident(self.input[position..self.idx].to_string())
            }
            other => return Err(self.err(format!("Unexpected character '{other}'"), position)),
        };

        Ok(Some(TokenWithLocation { token, position }))
    }

    /// Read the rest of a number starting at `start`.
    fn take_number(&mut self, start: usize) -> Result<Token> {
        let mut is_float = self.input[start..].starts_with('.');
        loop {
            match self.peek_char() {
                Some(c) if c.is_ascii_digit() => {
                    self.bump();
                }
                Some('.') if !is_float && self.peek_second_char().is_some_and(|c| c.is_ascii_digit()) => {
                    is_float = true;
                    self.bump();
                }
                _ => break,
            }
        }

        let s = &self.input[start..self.idx];
        if is_float {
            s.parse::<f64>()
                .map(Token::Float)
                .map_err(|e| self.err(format!("Invalid number '{s}': {e}"), start))
        } else {
            s.parse::<i64>()
                .map(Token::Integer)
                .map_err(|e| self.err(format!("Invalid number '{s}': {e}"), start))
        }
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a str,
    toks: Vec<TokenWithLocation>,
    /// Index of token we should process next.
    idx: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            toks: Vec::new(),
            idx: 0,
        }
    }

    /// Parse a full condition.
    ///
    /// Empty input produces a cross join condition.
    pub fn parse_condition(mut self) -> Result<JoinCondition> {
        self.toks = Tokenizer::new(self.input).tokenize()?;

        let mut condition = JoinCondition::cross();
        if self.toks.is_empty() {
            return Ok(condition);
        }

        loop {
            self.parse_item(&mut condition)?;
            match self.next_token() {
                None => break,
                Some(Token::Comma) | Some(Token::And) => continue,
                Some(other) => {
                    return Err(self.err_prev(format!("Expected ',' or '&', got {other:?}")));
                }
            }
        }

        Ok(condition)
    }

    fn parse_item(&mut self, condition: &mut JoinCondition) -> Result<()> {
        let is_call = matches!(self.peek_nth(1), Some(Token::LeftParen));
        if let (Some(Token::Ident(name)), true) = (self.peek_nth(0), is_call) {
            let name = name.to_ascii_lowercase();
            match name.as_str() {
                "closest" => {
                    self.idx += 2;
                    let mut cmp = self.parse_comparison()?;
                    cmp.closest = true;
                    self.expect(Token::RightParen)?;
                    condition.comparisons.push(cmp);
                    return Ok(());
                }
                "between" => {
                    self.idx += 2;
                    let args = self.parse_args(3)?;
                    let [x, lower, upper] = <[JoinExpr; 3]>::try_from(args)
                        .map_err(|_| self.err_prev("between() takes 3 arguments"))?;
                    *condition = std::mem::take(condition).between(x, lower, upper);
                    return Ok(());
                }
                "within" | "overlaps" => {
                    self.idx += 2;
                    let args = self.parse_args(4)?;
                    let [xl, xu, yl, yu] = <[JoinExpr; 4]>::try_from(args)
                        .map_err(|_| self.err_prev(format!("{name}() takes 4 arguments")))?;
                    let taken = std::mem::take(condition);
                    *condition = if name == "within" {
                        taken.within(xl, xu, yl, yu)
                    } else {
                        taken.overlaps(xl, xu, yl, yu)
                    };
                    return Ok(());
                }
                other => {
                    return Err(self.err_at(self.idx, format!("Unknown join helper '{other}'")));
                }
            }
        }

        let left = self.parse_expr()?;
        match self.peek_nth(0) {
            Some(Token::Op(op)) => {
                let op = *op;
                self.idx += 1;
                let right = self.parse_expr()?;
                condition
                    .comparisons
                    .push(JoinComparison::new(left, op, right));
            }
            _ => {
                // Bare column, join on the same name on both sides.
                let name = match left {
                    JoinExpr::Column(name) => name,
                    JoinExpr::Shift { .. } => {
                        return Err(self.err_prev("Expected a comparison operator after expression"));
                    }
                };
                *condition = std::mem::take(condition).eq(name.as_str(), name.as_str());
            }
        }

        Ok(())
    }

    fn parse_comparison(&mut self) -> Result<JoinComparison> {
        let left = self.parse_expr()?;
        let op = match self.next_token() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(self.err_prev(format!(
                    "Expected a comparison operator, got {other:?}"
                )));
            }
        };
        let right = self.parse_expr()?;
        Ok(JoinComparison::new(left, op, right))
    }

    /// Parse exactly `n` comma separated expressions followed by a closing
    /// paren.
    fn parse_args(&mut self, n: usize) -> Result<Vec<JoinExpr>> {
        let mut args = Vec::with_capacity(n);
        loop {
            args.push(self.parse_expr()?);
            match self.next_token() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => break,
                other => return Err(self.err_prev(format!("Expected ',' or ')', got {other:?}"))),
            }
        }
        if args.len() != n {
            return Err(self.err_prev(format!("Expected {n} arguments, got {}", args.len())));
        }
        Ok(args)
    }

    fn parse_expr(&mut self) -> Result<JoinExpr> {
        let column = match self.next_token() {
            Some(Token::Ident(name)) => name,
            other => return Err(self.err_prev(format!("Expected a column name, got {other:?}"))),
        };

        let negate = match self.peek_nth(0) {
            Some(Token::Plus) => false,
            Some(Token::Minus) => true,
            _ => return Ok(JoinExpr::Column(column)),
        };
        self.idx += 1;

        let by = match self.next_token() {
            Some(Token::Integer(v)) => ScalarValue::Int64(if negate { -v } else { v }),
            Some(Token::Float(v)) => ScalarValue::Float64(if negate { -v } else { v }),
            other => return Err(self.err_prev(format!("Expected a number, got {other:?}"))),
        };

        Ok(JoinExpr::Shift { column, by })
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next_token() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(self.err_prev(format!("Expected {expected:?}, got {other:?}"))),
        }
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.toks.get(self.idx + n).map(|t| &t.token)
    }

    fn next_token(&mut self) -> Option<Token> {
        let tok = self.toks.get(self.idx)?.token.clone();
        self.idx += 1;
        Some(tok)
    }

    /// Error pointing at the most recently consumed token.
    fn err_prev(&self, message: impl Into<String>) -> JoinError {
        self.err_at(self.idx.saturating_sub(1), message)
    }

    fn err_at(&self, tok_idx: usize, message: impl Into<String>) -> JoinError {
        let position = self
            .toks
            .get(tok_idx)
            .map(|t| t.position)
            .unwrap_or(self.input.len());
        JoinError::Parse {
            message: message.into(),
            position,
        }
    }
}
