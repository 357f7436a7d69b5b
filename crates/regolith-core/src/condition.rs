//! `when` expressions for conditional filters
//!
//! ```text
//! expr    := or
//! or      := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | compare
//! compare := primary (("==" | "!=") primary)?
//! primary := ident | "string" | true | false | "(" expr ")"
//! ```
//!
//! Identifiers: `os`, `arch`, `profile` (strings) and `initial`, `watch`
//! (booleans).

use crate::error::{Error, Result};

/// Values the identifiers of an expression resolve to.
#[derive(Debug, Clone)]
pub struct ConditionEnv {
    pub os: String,
    pub arch: String,
    pub profile: String,
    pub initial: bool,
    pub watch: bool,
}

impl ConditionEnv {
    /// Environment of the running process for `profile`.
    pub fn current(profile: &str, initial: bool, watch: bool) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            profile: profile.to_string(),
            initial,
            watch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Eq,
    Ne,
    Not,
    And,
    Or,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Ident(String),
    Str(String),
    Bool(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Bool(bool),
}

/// A parsed `when` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidCondition {
            expression: source.to_string(),
            reason,
        };
        let tokens = tokenize(source).map_err(invalid)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or().map_err(invalid)?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected {token:?}")));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn evaluate(&self, env: &ConditionEnv) -> Result<bool> {
        match eval(&self.expr, env) {
            Ok(Value::Bool(b)) => Ok(b),
            Ok(Value::Str(s)) => Err(self.invalid(format!("evaluates to the string \"{s}\""))),
            Err(reason) => Err(self.invalid(reason)),
        }
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidCondition {
            expression: self.source.clone(),
            reason,
        }
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(source: &str, env: &ConditionEnv) -> Result<bool> {
    Condition::parse(source)?.evaluate(env)
}

fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
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
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '=' | '&' | '|' => {
                chars.next();
                if chars.next_if_eq(&c).is_none() {
                    return Err(format!("expected \"{c}{c}\""));
                }
                tokens.push(match c {
                    '=' => Token::Eq,
                    '&' => Token::And,
                    _ => Token::Or,
                });
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(ch) => value.push(ch),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                    ident.push(ch);
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult = std::result::Result<Expr, String>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> ParseResult {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> ParseResult {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            left = Expr::And(Box::new(left), Box::new(self.unary()?));
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> ParseResult {
        let left = self.primary()?;
        if self.eat(&Token::Eq) {
            return Ok(Expr::Eq(Box::new(left), Box::new(self.primary()?)));
        }
        if self.eat(&Token::Ne) {
            return Ok(Expr::Ne(Box::new(left), Box::new(self.primary()?)));
        }
        Ok(left)
    }

    fn primary(&mut self) -> ParseResult {
        let token = self.peek().cloned().ok_or("unexpected end of expression")?;
        self.pos += 1;
        match token {
            Token::LParen => {
                let inner = self.or()?;
                if !self.eat(&Token::RParen) {
                    return Err("missing \")\"".to_string());
                }
                Ok(inner)
            }
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "os" | "arch" | "profile" | "initial" | "watch" => Ok(Expr::Ident(name)),
                _ => Err(format!("unknown identifier \"{name}\"")),
            },
            other => Err(format!("unexpected {other:?}")),
        }
    }
}

fn eval(expr: &Expr, env: &ConditionEnv) -> std::result::Result<Value, String> {
    Ok(match expr {
        Expr::Ident(name) => match name.as_str() {
            "os" => Value::Str(env.os.clone()),
            "arch" => Value::Str(env.arch.clone()),
            "profile" => Value::Str(env.profile.clone()),
            "initial" => Value::Bool(env.initial),
            "watch" => Value::Bool(env.watch),
            _ => return Err(format!("unknown identifier \"{name}\"")),
        },
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Not(inner) => Value::Bool(!eval_bool(inner, env)?),
        Expr::And(l, r) => Value::Bool(eval_bool(l, env)? && eval_bool(r, env)?),
        Expr::Or(l, r) => Value::Bool(eval_bool(l, env)? || eval_bool(r, env)?),
        Expr::Eq(l, r) => Value::Bool(compare(l, r, env)?),
        Expr::Ne(l, r) => Value::Bool(!compare(l, r, env)?),
    })
}

fn eval_bool(expr: &Expr, env: &ConditionEnv) -> std::result::Result<bool, String> {
    match eval(expr, env)? {
        Value::Bool(b) => Ok(b),
        Value::Str(s) => Err(format!("\"{s}\" is not a boolean")),
    }
}

fn compare(l: &Expr, r: &Expr, env: &ConditionEnv) -> std::result::Result<bool, String> {
    match (eval(l, env)?, eval(r, env)?) {
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        _ => Err("cannot compare a string with a boolean".to_string()),
    }
}
