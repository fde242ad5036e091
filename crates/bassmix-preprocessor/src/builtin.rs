//! Built-in Preprocessor
//!
//! An in-process C preprocessor covering what vendor headers use: object
//! and function-like macros, conditional compilation and includes served
//! from the context's virtual includes. The host file system is never
//! consulted for `#include`.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::context::PreprocessContext;
use crate::expr;
use crate::lexer::{self, Token, TokenKind};
use crate::{PreprocessError, Preprocessor};

const MAX_INCLUDE_DEPTH: usize = 64;
const MAX_EXPANSION_DEPTH: usize = 256;
const MAX_EXPANSIONS: usize = 1 << 16;

/// Token waiting to be rescanned, with the macros it may not expand again
type Pending = VecDeque<(Token, Rc<Vec<String>>)>;

#[derive(Debug)]
enum ExpandError {
    /// A function-like macro invocation runs past the end of the input
    Unterminated(String),
    Invalid(String),
}

impl From<String> for ExpandError {
    fn from(message: String) -> Self {
        ExpandError::Invalid(message)
    }
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::Unterminated(name) => write!(f, "unterminated invocation of macro {}", name),
            ExpandError::Invalid(message) => f.write_str(message),
        }
    }
}

/// A macro known to the preprocessor
#[derive(Debug, Clone)]
struct Macro {
    /// Parameter names for function-like macros
    params: Option<Vec<String>>,
    body: Vec<Token>,
}

/// One level of `#if` nesting
#[derive(Debug)]
struct Conditional {
    directive: String,
    line: usize,
    /// Whether the enclosing region is emitted
    parent_active: bool,
    /// Whether some branch of this group was already taken
    taken: bool,
    active: bool,
    seen_else: bool,
}

/// In-process C preprocessor
#[derive(Debug, Clone, Default)]
pub struct BuiltinPreprocessor;

impl BuiltinPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for BuiltinPreprocessor {
    fn process(
        &self,
        source: &str,
        filename: &str,
        context: &PreprocessContext,
    ) -> Result<String, PreprocessError> {
        let mut run = Run::new(context)?;
        run.process_text(source, filename, 0)?;
        debug!(
            "Preprocessed {} into {} lines ({} macros defined)",
            filename,
            run.output.len(),
            run.macros.len()
        );
        Ok(run.output.join("\n"))
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// State of a single `process` call
struct Run<'a> {
    context: &'a PreprocessContext,
    macros: HashMap<String, Macro>,
    output: Vec<String>,
}

impl<'a> Run<'a> {
    fn new(context: &'a PreprocessContext) -> Result<Self, PreprocessError> {
        let mut run = Self {
            context,
            macros: HashMap::new(),
            output: Vec::new(),
        };

        for definition in context.macros() {
            let directive = definition.to_directive();
            let (name, rest) = split_directive(&directive).unwrap_or(("", ""));
            match name {
                "define" => run.define(rest, "<context>", 0)?,
                _ => {
                    run.macros.remove(definition.identifier());
                }
            }
        }

        Ok(run)
    }

    fn process_text(
        &mut self,
        source: &str,
        filename: &str,
        depth: usize,
    ) -> Result<(), PreprocessError> {
        let stripped = lexer::strip_comments(source).map_err(|line| PreprocessError::Syntax {
            file: filename.to_string(),
            line,
            message: "unterminated comment".to_string(),
        })?;

        let mut stack: Vec<Conditional> = Vec::new();
        // Text lines held back while a macro invocation is still open
        let mut held: Option<(String, usize)> = None;

        for (line, text) in lexer::logical_lines(&stripped) {
            let active = stack.last().map_or(true, |c| c.active);

            let Some((directive, rest)) = split_directive(&text) else {
                if active {
                    let (joined, start) = match held.take() {
                        Some((previous, start)) => (format!("{}\n{}", previous, text), start),
                        None => (text.clone(), line),
                    };
                    if !self.emit(&joined, filename, start, false)? {
                        held = Some((joined, start));
                    }
                }
                continue;
            };

            // A directive ends any open invocation
            if let Some((previous, start)) = held.take() {
                self.emit(&previous, filename, start, true)?;
            }

            match directive {
                "ifdef" | "ifndef" => {
                    let taken = if active {
                        let name = first_identifier(rest).ok_or_else(|| {
                            syntax(filename, line, format!("#{} without a macro name", directive))
                        })?;
                        self.macros.contains_key(name) == (directive == "ifdef")
                    } else {
                        false
                    };
                    stack.push(Conditional::open(directive, line, active, taken));
                }
                "if" => {
                    let taken = active && self.condition(rest, filename, line)?;
                    stack.push(Conditional::open(directive, line, active, taken));
                }
                "elif" => {
                    let frame = stack
                        .last()
                        .ok_or_else(|| syntax(filename, line, "#elif without #if".to_string()))?;
                    if frame.seen_else {
                        return Err(syntax(filename, line, "#elif after #else".to_string()));
                    }
                    let evaluate = frame.parent_active && !frame.taken;
                    let take = evaluate && self.condition(rest, filename, line)?;
                    if let Some(frame) = stack.last_mut() {
                        frame.active = take;
                        frame.taken |= take;
                    }
                }
                "else" => {
                    let frame = stack
                        .last_mut()
                        .ok_or_else(|| syntax(filename, line, "#else without #if".to_string()))?;
                    if frame.seen_else {
                        return Err(syntax(filename, line, "duplicate #else".to_string()));
                    }
                    frame.seen_else = true;
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
                "endif" => {
                    if stack.pop().is_none() {
                        return Err(syntax(filename, line, "#endif without #if".to_string()));
                    }
                }
                _ if !active => {}
                "define" => self.define(rest, filename, line)?,
                "undef" => {
                    let name = first_identifier(rest).ok_or_else(|| {
                        syntax(filename, line, "#undef without a macro name".to_string())
                    })?;
                    self.macros.remove(name);
                }
                "include" => self.include(rest, filename, line, depth)?,
                "error" => {
                    return Err(PreprocessError::ErrorDirective {
                        file: filename.to_string(),
                        line,
                        message: rest.trim().to_string(),
                    });
                }
                "warning" => warn!("{}:{}: #warning {}", filename, line, rest.trim()),
                "pragma" | "line" | "ident" | "" => {}
                other => {
                    return Err(syntax(filename, line, format!("unknown directive #{}", other)));
                }
            }
        }

        if let Some((previous, start)) = held.take() {
            self.emit(&previous, filename, start, true)?;
        }

        if let Some(open) = stack.pop() {
            return Err(PreprocessError::UnterminatedConditional {
                file: filename.to_string(),
                line: open.line,
                directive: open.directive,
            });
        }

        Ok(())
    }

    /// Expand and output a run of text lines. Returns `false` without
    /// output when the run ends inside a macro invocation and more lines
    /// may follow (`complete` unset).
    fn emit(
        &mut self,
        text: &str,
        filename: &str,
        line: usize,
        complete: bool,
    ) -> Result<bool, PreprocessError> {
        if text.trim().is_empty() {
            return Ok(true);
        }
        let expanded = match self.expand(&lexer::tokenize(text), &[], 0, complete) {
            Ok(expanded) => expanded,
            Err(ExpandError::Unterminated(_)) if !complete => return Ok(false),
            Err(err) => return Err(syntax(filename, line, err.to_string())),
        };
        let rendered = lexer::render(&expanded);
        let rendered = rendered.trim_end();
        if !rendered.trim().is_empty() {
            self.output.push(rendered.to_string());
        }
        Ok(true)
    }

    fn define(&mut self, rest: &str, filename: &str, line: usize) -> Result<(), PreprocessError> {
        let tokens = lexer::tokenize(rest.trim_start());
        let name = match tokens.first() {
            Some(token) if token.kind == TokenKind::Ident => token.text.clone(),
            _ => return Err(syntax(filename, line, "#define without a macro name".to_string())),
        };

        let mut index = 1;
        let params = if tokens.get(1).is_some_and(|t| t.is_punct("(")) {
            let (params, next) = parse_params(&tokens, 2)
                .map_err(|message| syntax(filename, line, format!("#define {}: {}", name, message)))?;
            index = next;
            Some(params)
        } else {
            None
        };

        let body = trim_spaces(&tokens[index..]).to_vec();
        self.macros.insert(name, Macro { params, body });
        Ok(())
    }

    fn include(
        &mut self,
        rest: &str,
        filename: &str,
        line: usize,
        depth: usize,
    ) -> Result<(), PreprocessError> {
        let target = rest.trim();
        let name = target
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .or_else(|| target.strip_prefix('<').and_then(|t| t.strip_suffix('>')))
            .ok_or_else(|| syntax(filename, line, format!("malformed #include {}", target)))?;

        let body = self
            .context
            .include(name)
            .ok_or_else(|| PreprocessError::IncludeNotFound {
                file: filename.to_string(),
                line,
                name: name.to_string(),
            })?;

        if depth >= MAX_INCLUDE_DEPTH {
            return Err(syntax(filename, line, format!("#include nested too deeply: {}", name)));
        }

        debug!("Including virtual header {}", name);
        self.process_text(body, name, depth + 1)
    }

    /// Evaluate an `#if`/`#elif` condition
    fn condition(&self, rest: &str, filename: &str, line: usize) -> Result<bool, PreprocessError> {
        let tokens = lexer::tokenize(rest);
        let resolved = self
            .resolve_defined(&tokens)
            .map_err(|message| syntax(filename, line, message))?;
        let expanded = self
            .expand(&resolved, &[], 0, true)
            .map_err(|err| syntax(filename, line, err.to_string()))?;
        let value = expr::evaluate(&expanded).map_err(|message| syntax(filename, line, message))?;
        Ok(value != 0)
    }

    /// Replace `defined X` and `defined(X)` with 1 or 0
    fn resolve_defined(&self, tokens: &[Token]) -> Result<Vec<Token>, String> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            if token.kind != TokenKind::Ident || token.text != "defined" {
                out.push(token.clone());
                i += 1;
                continue;
            }

            i = skip_spaces(tokens, i + 1);
            let parenthesized = tokens.get(i).is_some_and(|t| t.is_punct("("));
            if parenthesized {
                i = skip_spaces(tokens, i + 1);
            }

            let name = match tokens.get(i) {
                Some(t) if t.kind == TokenKind::Ident => &t.text,
                _ => return Err("operator \"defined\" requires an identifier".to_string()),
            };
            i += 1;

            if parenthesized {
                i = skip_spaces(tokens, i);
                if !tokens.get(i).is_some_and(|t| t.is_punct(")")) {
                    return Err("missing ')' after \"defined\"".to_string());
                }
                i += 1;
            }

            let value = if self.macros.contains_key(name) { "1" } else { "0" };
            out.push(Token::new(TokenKind::Number, value));
        }

        Ok(out)
    }

    /// Expand macros in a token sequence. Each replacement is spliced back
    /// in front of the remaining tokens and rescanned with them, so a
    /// replacement ending in a function-like macro name picks up its
    /// arguments from the source. Macros in `hidden` are not expanded.
    ///
    /// With `complete` unset, an invocation left open at the end of the
    /// input (including a trailing function-like macro name) is reported as
    /// [`ExpandError::Unterminated`] so the caller can supply more text.
    fn expand(
        &self,
        tokens: &[Token],
        hidden: &[String],
        depth: usize,
        complete: bool,
    ) -> Result<Vec<Token>, ExpandError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(ExpandError::Invalid("macro expansion too deep".to_string()));
        }

        let base = Rc::new(hidden.to_vec());
        let mut pending: Pending = tokens.iter().map(|t| (t.clone(), Rc::clone(&base))).collect();
        let mut out = Vec::with_capacity(tokens.len());
        let mut expansions = 0usize;

        while let Some((token, hidden)) = pending.pop_front() {
            let candidate = (token.kind == TokenKind::Ident && !token.no_expand)
                .then(|| self.macros.get(&token.text))
                .flatten();

            let Some(definition) = candidate else {
                out.push(token);
                continue;
            };

            if hidden.contains(&token.text) {
                let mut token = token;
                token.no_expand = true;
                out.push(token);
                continue;
            }

            let replacement = match &definition.params {
                None => paste(&definition.body),
                Some(params) => {
                    let open = pending.iter().position(|(t, _)| !t.is_space());
                    let Some(open) = open.filter(|&o| pending[o].0.is_punct("(")) else {
                        if open.is_none() && !complete {
                            return Err(ExpandError::Unterminated(token.text));
                        }
                        // Function-like macro name without arguments stays as is
                        out.push(token);
                        continue;
                    };
                    pending.drain(..=open);
                    let args = take_args(&mut pending)
                        .ok_or_else(|| ExpandError::Unterminated(token.text.clone()))?;
                    let args = bind_args(&token.text, params, args)?;
                    self.substitute(&definition.body, params, &args, &hidden, depth)?
                }
            };

            expansions += 1;
            if expansions > MAX_EXPANSIONS {
                return Err(ExpandError::Invalid("macro expansion too deep".to_string()));
            }

            let mut names = hidden.to_vec();
            names.push(token.text);
            let names = Rc::new(names);
            for replaced in replacement.into_iter().rev() {
                pending.push_front((replaced, Rc::clone(&names)));
            }
        }

        Ok(out)
    }

    /// Replace parameters in a function-like macro body
    fn substitute(
        &self,
        body: &[Token],
        params: &[String],
        args: &[Vec<Token>],
        hidden: &[String],
        depth: usize,
    ) -> Result<Vec<Token>, ExpandError> {
        let param_index = |token: &Token| {
            (token.kind == TokenKind::Ident)
                .then(|| params.iter().position(|p| *p == token.text))
                .flatten()
        };

        let mut out = Vec::with_capacity(body.len());
        let mut i = 0;

        while i < body.len() {
            let token = &body[i];

            if token.is_punct("#") {
                let next = skip_spaces(body, i + 1);
                if let Some(index) = body.get(next).and_then(|t| param_index(t)) {
                    out.push(stringify(&args[index]));
                    i = next + 1;
                    continue;
                }
            }

            if let Some(index) = param_index(token) {
                let next_is_paste = body
                    .get(skip_spaces(body, i + 1))
                    .is_some_and(|t| t.is_punct("##"));
                let prev_is_paste = out
                    .iter()
                    .rev()
                    .find(|t: &&Token| !t.is_space())
                    .is_some_and(|t| t.is_punct("##"));

                if next_is_paste || prev_is_paste {
                    out.extend(trim_spaces(&args[index]).iter().cloned());
                } else {
                    out.extend(self.expand(&args[index], hidden, depth + 1, true)?);
                }
                i += 1;
                continue;
            }

            out.push(token.clone());
            i += 1;
        }

        Ok(paste(&out))
    }
}

impl Conditional {
    fn open(directive: &str, line: usize, parent_active: bool, taken: bool) -> Self {
        Self {
            directive: directive.to_string(),
            line,
            parent_active,
            taken,
            active: taken,
            seen_else: false,
        }
    }
}

fn syntax(filename: &str, line: usize, message: String) -> PreprocessError {
    PreprocessError::Syntax {
        file: filename.to_string(),
        line,
        message,
    }
}

/// Split `# name rest` into `(name, rest)`; `None` for ordinary lines
fn split_directive(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start().strip_prefix('#')?.trim_start();
    let end = rest
        .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .unwrap_or(rest.len());
    Some((&rest[..end], &rest[end..]))
}

fn first_identifier(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .unwrap_or(text.len());
    let ident = &text[..end];
    let valid = ident
        .chars()
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
    valid.then_some(ident)
}

fn skip_spaces(tokens: &[Token], mut index: usize) -> usize {
    while tokens.get(index).is_some_and(Token::is_space) {
        index += 1;
    }
    index
}

fn trim_spaces(tokens: &[Token]) -> &[Token] {
    let start = tokens.iter().position(|t| !t.is_space()).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !t.is_space()).map_or(start, |p| p + 1);
    &tokens[start..end]
}

/// Parse `a, b, ...)` starting after the opening parenthesis
fn parse_params(tokens: &[Token], start: usize) -> Result<(Vec<String>, usize), String> {
    let mut params = Vec::new();
    let mut i = skip_spaces(tokens, start);

    if tokens.get(i).is_some_and(|t| t.is_punct(")")) {
        return Ok((params, i + 1));
    }

    loop {
        match tokens.get(i) {
            Some(t) if t.kind == TokenKind::Ident => params.push(t.text.clone()),
            Some(t) if t.is_punct("...") => params.push("__VA_ARGS__".to_string()),
            _ => return Err("malformed parameter list".to_string()),
        }

        i = skip_spaces(tokens, i + 1);
        match tokens.get(i) {
            Some(t) if t.is_punct(",") => i = skip_spaces(tokens, i + 1),
            Some(t) if t.is_punct(")") => return Ok((params, i + 1)),
            _ => return Err("malformed parameter list".to_string()),
        }
    }
}

/// Take comma-separated arguments off the front of `pending`, up to and
/// including the matching `)`. `None` if the input ends first.
fn take_args(pending: &mut Pending) -> Option<Vec<Vec<Token>>> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;

    while let Some((token, _)) = pending.pop_front() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            if depth == 0 {
                return Some(args);
            }
            depth -= 1;
        } else if token.is_punct(",") && depth == 0 {
            args.push(Vec::new());
            continue;
        }
        if let Some(current) = args.last_mut() {
            current.push(token);
        }
    }

    None
}

/// Match collected arguments to parameters, folding variadic extras
fn bind_args(name: &str, params: &[String], mut args: Vec<Vec<Token>>) -> Result<Vec<Vec<Token>>, String> {
    let variadic = params.last().is_some_and(|p| p == "__VA_ARGS__");

    if params.is_empty() && args.len() == 1 && trim_spaces(&args[0]).is_empty() {
        return Ok(Vec::new());
    }

    if variadic && args.len() > params.len() {
        let extra = args.split_off(params.len() - 1);
        let mut joined = Vec::new();
        for (index, arg) in extra.into_iter().enumerate() {
            if index > 0 {
                joined.push(Token::new(TokenKind::Punct, ","));
            }
            joined.extend(arg);
        }
        args.push(joined);
    } else if variadic && args.len() + 1 == params.len() {
        args.push(Vec::new());
    }

    if args.len() != params.len() {
        return Err(format!(
            "macro {} expects {} argument(s), got {}",
            name,
            params.len(),
            args.len()
        ));
    }

    Ok(args.into_iter().map(|a| trim_spaces(&a).to_vec()).collect())
}

fn stringify(arg: &[Token]) -> Token {
    let mut text = String::from("\"");
    let mut last_was_space = false;
    for token in trim_spaces(arg) {
        if token.is_space() {
            if !last_was_space {
                text.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        if token.kind == TokenKind::Literal {
            text.push_str(&token.text.replace('\\', "\\\\").replace('"', "\\\""));
        } else {
            text.push_str(&token.text);
        }
    }
    text.push('"');
    Token::new(TokenKind::Literal, text)
}

/// Apply `##` token pasting
fn paste(tokens: &[Token]) -> Vec<Token> {
    if !tokens.iter().any(|t| t.is_punct("##")) {
        return tokens.to_vec();
    }

    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i].is_punct("##") {
            while out.last().is_some_and(Token::is_space) {
                out.pop();
            }
            let next = skip_spaces(tokens, i + 1);
            let left = out.pop().map(|t| t.text).unwrap_or_default();
            let right = tokens.get(next).map(|t| t.text.clone()).unwrap_or_default();
            out.extend(lexer::tokenize(&format!("{}{}", left, right)));
            i = next + 1;
            continue;
        }
        out.push(tokens[i].clone());
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<String, PreprocessError> {
        BuiltinPreprocessor::new().process(source, "test.h", &PreprocessContext::new())
    }

    #[test]
    fn test_object_like_macro() {
        let output = run("#define SIZE 16\nchar buf[SIZE];").unwrap();
        assert_eq!(output, "char buf[16];");
    }

    #[test]
    fn test_function_like_macro() {
        let source = "#define WINAPI\n#define DEF(f) WINAPI f\nint DEF(Open)(void);";
        assert_eq!(run(source).unwrap(), "int  Open(void);");
    }

    #[test]
    fn test_function_like_name_without_call() {
        let source = "#define F(x) x\nint F;";
        assert_eq!(run(source).unwrap(), "int F;");
    }

    #[test]
    fn test_object_macro_naming_function_macro() {
        let source = "#define f(x) x + 1\n#define g f\nint y = g(2);";
        assert_eq!(run(source).unwrap(), "int y = 2 + 1;");
    }

    #[test]
    fn test_blocked_name_stays_blocked_after_argument_expansion() {
        let source = "#define LOOP LOOP + 1\n#define ID(a) a\nint x = ID(LOOP);";
        assert_eq!(run(source).unwrap(), "int x = LOOP + 1;");
    }

    #[test]
    fn test_invocation_spanning_lines() {
        let source = "#define F(a, b) a b\nint F(x,\n y);\nint z;";
        assert_eq!(run(source).unwrap(), "int x y;\nint z;");
    }

    #[test]
    fn test_function_like_name_at_line_end() {
        let source = "#define F(x) [x]\nint a = F\n(1);\nint b = F;\nint c = F\n#define G 2\nint d = F";
        assert_eq!(
            run(source).unwrap(),
            "int a = [1];\nint b = F;\nint c = F\nint d = F"
        );
    }

    #[test]
    fn test_invocation_left_open_at_end() {
        let err = run("#define F(a, b) a b\nint F(x,\n").unwrap_err();
        match err {
            PreprocessError::Syntax { line, message, .. } => {
                assert_eq!(line, 2);
                assert_eq!(message, "unterminated invocation of macro F");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_arguments() {
        let source = "#define FIRST(a, b) a\nint x = FIRST((1, 2), 3);";
        assert_eq!(run(source).unwrap(), "int x = (1, 2);");
    }

    #[test]
    fn test_self_reference_terminates() {
        let source = "#define LOOP LOOP + 1\nint x = LOOP;";
        assert_eq!(run(source).unwrap(), "int x = LOOP + 1;");
    }

    #[test]
    fn test_stringify_and_paste() {
        let source = "#define NAME(x) #x\n#define CAT(a, b) a ## b\nconst char *s = NAME(hello world);\nint CAT(foo, bar);";
        assert_eq!(
            run(source).unwrap(),
            "const char *s = \"hello world\";\nint foobar;"
        );
    }

    #[test]
    fn test_variadic_macro() {
        let source = "#define CALL(f, ...) f(__VA_ARGS__)\nCALL(g, 1, 2, 3);";
        assert_eq!(run(source).unwrap(), "g(1, 2, 3);");
    }

    #[test]
    fn test_wrong_argument_count() {
        let err = run("#define TWO(a, b) a b\nTWO(1);").unwrap_err();
        assert!(matches!(err, PreprocessError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_ifdef_else() {
        let source = "#define A\n#ifdef A\nyes\n#else\nno\n#endif\n#ifndef A\nskipped\n#endif";
        assert_eq!(run(source).unwrap(), "yes");
    }

    #[test]
    fn test_if_elif_chain() {
        let source = "#define V 3\n#if V == 1\none\n#elif V == 3\nthree\n#elif V > 2\nlater\n#else\nother\n#endif";
        assert_eq!(run(source).unwrap(), "three");
    }

    #[test]
    fn test_defined_operator() {
        let source = "#define X\n#if defined(X) && !defined Y\nok\n#endif";
        assert_eq!(run(source).unwrap(), "ok");
    }

    #[test]
    fn test_inactive_region_ignores_directives() {
        let source = "#if 0\n#error never\n#include <missing.h>\n#bogus\n#endif\nafter";
        assert_eq!(run(source).unwrap(), "after");
    }

    #[test]
    fn test_skipped_group_ignores_malformed_ifdef() {
        let source = "#if 0\n#ifdef\n#ifndef 1\n#endif\n#endif\n#endif\nafter";
        assert_eq!(run(source).unwrap(), "after");
        assert!(matches!(run("#ifdef\n#endif"), Err(PreprocessError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_guarded_division_is_not_evaluated() {
        let source = "#if 0 && (1 / 0)\nbad\n#else\ngood\n#endif";
        assert_eq!(run(source).unwrap(), "good");

        let source = "#define X 0\n#if defined(X) && X != 0 && (8 / X)\nbad\n#else\ngood\n#endif";
        assert_eq!(run(source).unwrap(), "good");
    }

    #[test]
    fn test_nested_conditionals() {
        let source = "#if 0\n#if 1\ninner\n#else\nelse\n#endif\n#else\nouter\n#endif";
        assert_eq!(run(source).unwrap(), "outer");
    }

    #[test]
    fn test_unterminated_conditional() {
        let err = run("#ifdef A\nint x;\n").unwrap_err();
        match err {
            PreprocessError::UnterminatedConditional { line, directive, .. } => {
                assert_eq!(line, 1);
                assert_eq!(directive, "ifdef");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stray_endif_and_else() {
        assert!(matches!(run("#endif"), Err(PreprocessError::Syntax { .. })));
        assert!(matches!(run("#else"), Err(PreprocessError::Syntax { .. })));
        assert!(matches!(
            run("#if 1\n#else\n#else\n#endif"),
            Err(PreprocessError::Syntax { .. })
        ));
    }

    #[test]
    fn test_error_directive() {
        let err = run("#if 1\n#error conflicting versions\n#endif").unwrap_err();
        match err {
            PreprocessError::ErrorDirective { line, message, .. } => {
                assert_eq!(line, 2);
                assert_eq!(message, "conflicting versions");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_include() {
        let err = run("#include \"bass.h\"").unwrap_err();
        assert!(matches!(err, PreprocessError::IncludeNotFound { ref name, .. } if name == "bass.h"));
    }

    #[test]
    fn test_virtual_include() {
        let mut context = PreprocessContext::new();
        context.add("types.h", "#define HANDLE DWORD\ntypedef unsigned DWORD;");
        let output = BuiltinPreprocessor::new()
            .process("#include <types.h>\nHANDLE h;", "test.h", &context)
            .unwrap();
        assert_eq!(output, "typedef unsigned DWORD;\nDWORD h;");
    }

    #[test]
    fn test_context_macros_seed_run() {
        let mut context = PreprocessContext::new();
        context.define("_WIN32", "1");
        let source = "#ifdef _WIN32\nwin\n#else\nposix\n#endif";
        let output = BuiltinPreprocessor::new().process(source, "test.h", &context).unwrap();
        assert_eq!(output, "win");
    }

    #[test]
    fn test_comments_and_continuations() {
        let source = "/* header\n comment */\n#define LONG 1 + \\\n  2\nint x = LONG; // trailing";
        assert_eq!(run(source).unwrap(), "int x = 1 +   2;");
    }

    #[test]
    fn test_undef() {
        let source = "#define A 1\n#undef A\n#ifdef A\nbad\n#endif\nA";
        assert_eq!(run(source).unwrap(), "A");
    }
}
