use super::ast::{Builtin, CmpOp, ContextVar, Expr};
use super::token::{lex, Token};
use fancy_regex::Regex;
use std::sync::Arc;

/// Parse a rule expression into an AST. All names are resolved here, so an
/// expression that parses is guaranteed to reference only known variables
/// and builtins with valid arity.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(format!("unexpected trailing token '{tok}'")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected '{expected}', found '{token}'")),
            None => Err(format!("expected '{expected}', found end of input")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Bang) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_primary()?;

        let op = match self.peek() {
            Some(Token::EqEq) => Some(CmpOp::Eq),
            Some(Token::NotEq) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            Some(Token::Contains) => {
                self.next();
                let rhs = self.parse_primary()?;
                return Ok(Expr::Contains(Box::new(lhs), Box::new(rhs)));
            }
            _ => None,
        };

        match op {
            Some(op) => {
                self.next();
                let rhs = self.parse_primary()?;
                Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Int(value)) => Ok(Expr::Int(value)),
            Some(Token::Str(value)) => Ok(Expr::Str(Arc::from(value.as_str()))),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.parse_call(&name)
                } else {
                    ContextVar::from_name(&name)
                        .map(Expr::Var)
                        .ok_or_else(|| format!("unknown identifier '{name}'"))
                }
            }
            Some(token) => Err(format!("unexpected token '{token}'")),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, String> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.next();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&Token::RParen)?;

        if name == "DomainRegex" {
            return build_regex_call(args);
        }

        let builtin = Builtin::from_name(name)
            .ok_or_else(|| format!("unknown function '{name}'"))?;
        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            return Err(format!(
                "{} expects {} argument(s), got {}",
                builtin.name(),
                if min == max {
                    min.to_string()
                } else {
                    format!("{min}+")
                },
                args.len()
            ));
        }
        Ok(Expr::Call(builtin, args))
    }
}

/// `DomainRegex(d, pattern)`: the pattern must be a string literal so the
/// regex compiles exactly once, here, and a bad pattern is rejected at rule
/// mutation time instead of surfacing during evaluation.
fn build_regex_call(mut args: Vec<Expr>) -> Result<Expr, String> {
    if args.len() != 2 {
        return Err(format!("DomainRegex expects 2 arguments, got {}", args.len()));
    }
    let pattern_expr = args.pop().unwrap();
    let arg = args.pop().unwrap();

    let pattern = match pattern_expr {
        Expr::Str(pattern) => pattern,
        _ => return Err("DomainRegex pattern must be a string literal".into()),
    };
    let regex =
        Regex::new(&pattern).map_err(|e| format!("invalid regex '{pattern}': {e}"))?;
    Ok(Expr::Regex(Box::new(arg), Arc::new(regex), pattern))
}
