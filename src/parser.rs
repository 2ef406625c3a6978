//! Tokenizer and recursive-descent parser for rule strings.
//!
//! Grammar, loosest binding first (`->` is right-associative):
//!
//! ```text
//! implies := or ( "->" implies )?
//! or      := and ( "|" and )*
//! and     := unary ( "&" unary )*
//! unary   := "!" unary | primary
//! primary := IDENT | "true" | "false" | "(" implies ")"
//! ```
//!
//! Operator aliases: `=>` / `→` for `->`, `||` / `∨` for `|`, `&&` / `∧` for `&`,
//! `~` / `¬` for `!`. Identifiers are runs of alphanumerics and `_`.
//!
//! ```
//! use mwp_rs::parser::parse_rule;
//!
//! let e = parse_rule("ByLocation -> Location").unwrap();
//! assert_eq!(e.to_string(), "ByLocation -> Location");
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::Expr;
use crate::error::RuleError;

#[derive(Debug, Clone, Eq, PartialEq)]
enum Token {
    Ident(String),
    Const(bool),
    Not,
    And,
    Or,
    Implies,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Const(b) => b.to_string(),
            Token::Not => "!".to_string(),
            Token::And => "&".to_string(),
            Token::Or => "|".to_string(),
            Token::Implies => "->".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    /// Consumes `next` if it is the upcoming char.
    fn eat(&mut self, next: char) -> bool {
        if self.chars.peek().map(|&(_, c)| c) == Some(next) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, RuleError> {
        let mut tokens = Vec::new();
        while let Some((offset, c)) = self.chars.next() {
            let token = match c {
                c if c.is_whitespace() => continue,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '!' | '~' | '¬' => Token::Not,
                '∧' => Token::And,
                '∨' => Token::Or,
                '→' => Token::Implies,
                '&' => {
                    self.eat('&');
                    Token::And
                }
                '|' => {
                    self.eat('|');
                    Token::Or
                }
                '-' | '=' if self.eat('>') => Token::Implies,
                c if is_ident_char(c) => {
                    let mut end = offset + c.len_utf8();
                    while let Some(&(i, c)) = self.chars.peek() {
                        if !is_ident_char(c) {
                            break;
                        }
                        end = i + c.len_utf8();
                        self.chars.next();
                    }
                    match &self.text[offset..end] {
                        "true" => Token::Const(true),
                        "false" => Token::Const(false),
                        ident => Token::Ident(ident.to_string()),
                    }
                }
                found => return Err(RuleError::UnexpectedChar { found, offset }),
            };
            tokens.push((offset, token));
        }
        Ok(tokens)
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn bump(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_implies(&mut self) -> Result<Expr, RuleError> {
        let lhs = self.parse_or()?;
        if self.peek() == Some(&Token::Implies) {
            self.bump();
            let rhs = self.parse_implies()?;
            return Ok(Expr::implies(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            lhs = Expr::or(lhs, self.parse_and()?);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            lhs = Expr::and(lhs, self.parse_unary()?);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            let inner = self.parse_unary()?;
            // Keep the node even for `!!x`; the rule text is reproduced structurally.
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        const EXPECTED: &str = "an atom, a constant or '('";
        match self.bump() {
            Some((_, Token::Ident(name))) => Ok(Expr::var(name)),
            Some((_, Token::Const(b))) => Ok(Expr::Const(b)),
            Some((_, Token::LParen)) => {
                let inner = self.parse_implies()?;
                match self.bump() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((offset, t)) => Err(RuleError::UnexpectedToken {
                        found: t.describe(),
                        offset,
                        expected: "')'",
                    }),
                    None => Err(RuleError::UnexpectedEnd { expected: "')'" }),
                }
            }
            Some((offset, t)) => Err(RuleError::UnexpectedToken {
                found: t.describe(),
                offset,
                expected: EXPECTED,
            }),
            None => Err(RuleError::UnexpectedEnd { expected: EXPECTED }),
        }
    }
}

/// Parses one rule string into an expression.
pub fn parse_rule(text: &str) -> Result<Expr, RuleError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_implies()?;
    match parser.bump() {
        None => Ok(expr),
        Some((offset, t)) => Err(RuleError::UnexpectedToken {
            found: t.describe(),
            offset,
            expected: "end of rule",
        }),
    }
}
