//! `#if` expression evaluation
//!
//! Operates on tokens that already went through `defined` resolution and
//! macro expansion. Any identifier left over evaluates to 0.

use crate::lexer::{Token, TokenKind};

/// Evaluate a controlling expression
pub fn evaluate(tokens: &[Token]) -> Result<i64, String> {
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_space()).collect();
    if tokens.is_empty() {
        return Err("#if with no expression".to_string());
    }

    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.conditional(true)?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(format!("unexpected token in expression: {}", token.text)),
    }
}

/// Parse an integer literal (decimal, hex, octal) with optional u/l suffixes
pub fn parse_integer(text: &str) -> Result<i64, String> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<u64>()
    };
    parsed
        .map(|v| v as i64)
        .map_err(|_| format!("invalid integer constant: {}", text))
}

fn char_value(text: &str) -> Result<i64, String> {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| format!("invalid token in expression: {}", text))?;
    let mut chars = inner.chars();
    let value = match (chars.next(), chars.next()) {
        (Some('\\'), Some(escaped)) => match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        },
        (Some(c), None) => c,
        _ => return Err(format!("invalid character constant: {}", text)),
    };
    Ok(value as i64)
}

struct ExprParser<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), String> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(format!("expected '{}' in expression", punct))
        }
    }

    /// Operands in an unevaluated branch (`0 && x`, `1 || x`, the untaken
    /// side of `?:`) are parsed with `eval` off and never fail on division.
    fn conditional(&mut self, eval: bool) -> Result<i64, String> {
        let condition = self.binary(0, eval)?;
        if self.eat("?") {
            let then = self.conditional(eval && condition != 0)?;
            self.expect(":")?;
            let otherwise = self.conditional(eval && condition == 0)?;
            Ok(if condition != 0 { then } else { otherwise })
        } else {
            Ok(condition)
        }
    }

    fn binary(&mut self, min_precedence: u8, eval: bool) -> Result<i64, String> {
        let mut lhs = self.unary(eval)?;

        while let Some((op, precedence)) = self.peek().and_then(binary_operator) {
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs_eval = match op {
                "&&" => eval && lhs != 0,
                "||" => eval && lhs == 0,
                _ => eval,
            };
            let rhs = self.binary(precedence + 1, rhs_eval)?;
            lhs = match apply(op, lhs, rhs) {
                Ok(value) => value,
                Err(_) if !rhs_eval => 0,
                Err(message) => return Err(message),
            };
        }

        Ok(lhs)
    }

    fn unary(&mut self, eval: bool) -> Result<i64, String> {
        if self.eat("!") {
            return Ok((self.unary(eval)? == 0) as i64);
        }
        if self.eat("~") {
            return Ok(!self.unary(eval)?);
        }
        if self.eat("-") {
            return Ok(self.unary(eval)?.wrapping_neg());
        }
        if self.eat("+") {
            return self.unary(eval);
        }
        self.primary(eval)
    }

    fn primary(&mut self, eval: bool) -> Result<i64, String> {
        let token = self
            .peek()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;

        match token.kind {
            TokenKind::Number => parse_integer(&token.text),
            TokenKind::Ident => Ok(0),
            TokenKind::Literal => char_value(&token.text),
            TokenKind::Punct if token.text == "(" => {
                let value = self.conditional(eval)?;
                self.expect(")")?;
                Ok(value)
            }
            _ => Err(format!("unexpected token in expression: {}", token.text)),
        }
    }
}

fn binary_operator(token: &Token) -> Option<(&'static str, u8)> {
    if token.kind != TokenKind::Punct {
        return None;
    }
    let entry = match token.text.as_str() {
        "||" => ("||", 1),
        "&&" => ("&&", 2),
        "|" => ("|", 3),
        "^" => ("^", 4),
        "&" => ("&", 5),
        "==" => ("==", 6),
        "!=" => ("!=", 6),
        "<" => ("<", 7),
        "<=" => ("<=", 7),
        ">" => (">", 7),
        ">=" => (">=", 7),
        "<<" => ("<<", 8),
        ">>" => (">>", 8),
        "+" => ("+", 9),
        "-" => ("-", 9),
        "*" => ("*", 10),
        "/" => ("/", 10),
        "%" => ("%", 10),
        _ => return None,
    };
    Some(entry)
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Result<i64, String> {
    let value = match op {
        "||" => (lhs != 0 || rhs != 0) as i64,
        "&&" => (lhs != 0 && rhs != 0) as i64,
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => (lhs == rhs) as i64,
        "!=" => (lhs != rhs) as i64,
        "<" => (lhs < rhs) as i64,
        "<=" => (lhs <= rhs) as i64,
        ">" => (lhs > rhs) as i64,
        ">=" => (lhs >= rhs) as i64,
        "<<" => lhs.wrapping_shl(rhs as u32),
        ">>" => lhs.wrapping_shr(rhs as u32),
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" | "%" if rhs == 0 => return Err("division by zero in expression".to_string()),
        "/" => lhs.wrapping_div(rhs),
        "%" => lhs.wrapping_rem(rhs),
        _ => return Err(format!("unsupported operator: {}", op)),
    };
    Ok(value)
}
