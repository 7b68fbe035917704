use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    True,
    False,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Int(value) => write!(f, "{value}"),
            Token::Str(value) => write!(f, "\"{value}\""),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::Bang => f.write_str("!"),
            Token::EqEq => f.write_str("=="),
            Token::NotEq => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Contains => f.write_str("contains"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

pub fn lex(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '&' => {
                chars.next();
                match chars.next() {
                    Some('&') => tokens.push(Token::AndAnd),
                    _ => return Err("expected '&&'".into()),
                }
            }
            '|' => {
                chars.next();
                match chars.next() {
                    Some('|') => tokens.push(Token::OrOr),
                    _ => return Err("expected '||'".into()),
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::EqEq),
                    _ => return Err("expected '=='".into()),
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err("unterminated string literal".into()),
                        },
                        Some(end) if end == quote => break,
                        Some(other) => value.push(other),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '0'..='9' => {
                let mut value: i64 = 0;
                while let Some(&d) = chars.peek() {
                    match d.to_digit(10) {
                        Some(digit) => {
                            chars.next();
                            value = value
                                .checked_mul(10)
                                .and_then(|v| v.checked_add(i64::from(digit)))
                                .ok_or_else(|| "integer literal overflows".to_string())?;
                        }
                        None => break,
                    }
                }
                tokens.push(Token::Int(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.as_str() {
                    "contains" => Token::Contains,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(name),
                });
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}
