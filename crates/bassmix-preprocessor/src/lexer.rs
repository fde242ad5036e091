//! Preprocessing tokens
//!
//! A deliberately small C tokenizer: enough to drive macro substitution and
//! `#if` evaluation. Whitespace is kept as tokens so substituted lines keep
//! their original layout.

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    /// String or character literal
    Literal,
    Punct,
    Space,
}

/// A preprocessing token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Macro name met while that macro was being expanded; never replaced
    pub no_expand: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            no_expand: false,
        }
    }

    pub fn is_space(&self) -> bool {
        self.kind == TokenKind::Space
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }
}

const MULTI_CHAR_PUNCTS: [&str; 13] = [
    "...", "##", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "->", "++", "--",
];

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Split a logical line into tokens
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        let kind = if c.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            TokenKind::Space
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            // pp-number: digits, identifier characters, dots and exponent signs
            i += 1;
            while i < chars.len() {
                let d = chars[i];
                if is_ident_continue(d) || d == '.' {
                    i += 1;
                } else if (d == '+' || d == '-') && matches!(chars[i - 1], 'e' | 'E' | 'p' | 'P') {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            TokenKind::Literal
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let len = MULTI_CHAR_PUNCTS
                .iter()
                .find(|p| rest.starts_with(*p))
                .map_or(1, |p| p.len());
            i += len;
            TokenKind::Punct
        };

        tokens.push(Token::new(kind, chars[start..i].iter().collect::<String>()));
    }

    tokens
}

/// Concatenate token texts
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Replace comments with whitespace, keeping newlines so line numbers stay
/// stable. Returns the 1-based line of an unterminated block comment as the
/// error.
pub fn strip_comments(source: &str) -> Result<String, usize> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'*') => {
                let opened_at = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => return Err(opened_at),
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => {
                            out.push('\n');
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
                out.push(' ');
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' | '\'' => {
                out.push(c);
                i += 1;
                while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() && chars[i] == c {
                    out.push(c);
                    i += 1;
                }
            }
            '\n' => {
                out.push(c);
                line += 1;
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Join backslash-continued physical lines. Yields `(first_line, text)`
/// with 1-based line numbers.
pub fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, physical) in source.lines().enumerate() {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        let (start, mut text) = pending.take().unwrap_or((index + 1, String::new()));

        match physical.strip_suffix('\\') {
            Some(head) => {
                text.push_str(head);
                pending = Some((start, text));
            }
            None => {
                text.push_str(physical);
                lines.push((start, text));
            }
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }

    lines
}
