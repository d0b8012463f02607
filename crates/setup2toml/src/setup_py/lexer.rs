//! A tokenizer for the parts of Python syntax a setup script is made of.
//!
//! Newlines inside brackets and after a `\` continuation are dropped, so a
//! [`TokenKind::Newline`] always ends a logical line. Indentation is not
//! tokenized; each token records its column instead.

use unscanny::Scanner;

/// A syntax error in a setup script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    line: usize,
    message: String,
}

impl SyntaxError {
    pub fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    /// A string literal with escapes resolved. `formatted` marks an f-string
    /// with placeholders, whose value cannot be known statically.
    Str {
        value: String,
        formatted: bool,
    },
    Number(String),
    Op(&'static str),
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: usize,
    /// Byte offset of the token from the start of its line.
    pub(crate) column: usize,
}

impl Token {
    pub(crate) fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }

    pub(crate) fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    pub(crate) fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Longest operators first.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", "%=", "&=", "**", "*=", "+=", "-=", "->", "//", "/=",
    ":=", "<<", "<=", "==", ">=", ">>", "@=", "^=", "|=", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", ";", "@", "=", "+", "-", "*", "/", "%", "<", ">", "&", "|", "^", "~",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Split Python `source` into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    Lexer {
        scanner: Scanner::new(source),
        tokens: Vec::new(),
        brackets: Vec::new(),
        line: 1,
        line_start: 0,
    }
    .run()
}

/// Keywords that cannot start or end an expression operand.
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Keywords only at the start of a statement.
const SOFT_KEYWORDS: &[&str] = &["match", "case", "type"];

/// Reject token sequences no Python statement contains: two operands with
/// nothing between them, as in `just some words`.
pub(crate) fn check_syntax(tokens: &[Token]) -> Result<(), SyntaxError> {
    let mut line_start = true;
    for pair in tokens.windows(2) {
        let [first, second] = pair else { continue };
        let statement_start = line_start;
        line_start = first.kind == TokenKind::Newline;
        if statement_start && first.name().is_some_and(|name| SOFT_KEYWORDS.contains(&name)) {
            continue;
        }
        if !ends_operand(first) || !starts_operand(second) {
            continue;
        }
        // Adjacent string literals are concatenated.
        if matches!(first.kind, TokenKind::Str { .. })
            && matches!(second.kind, TokenKind::Str { .. })
        {
            continue;
        }
        return Err(SyntaxError {
            line: second.line,
            message: "invalid syntax".to_owned(),
        });
    }
    Ok(())
}

fn starts_operand(token: &Token) -> bool {
    match &token.kind {
        TokenKind::Name(name) => !KEYWORDS.contains(&name.as_str()),
        TokenKind::Str { .. } | TokenKind::Number(_) => true,
        TokenKind::Op(_) | TokenKind::Newline => false,
    }
}

fn ends_operand(token: &Token) -> bool {
    starts_operand(token) || token.is_op(")") || token.is_op("]") || token.is_op("}")
}

struct Lexer<'a> {
    scanner: Scanner<'a>,
    tokens: Vec<Token>,
    /// Open brackets and the line they were opened on.
    brackets: Vec<(char, usize)>,
    line: usize,
    line_start: usize,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(c) = self.scanner.peek() {
            let start = self.scanner.cursor();
            match c {
                '\n' => {
                    self.scanner.eat();
                    self.newline();
                    if self.brackets.is_empty() {
                        self.end_logical_line();
                    }
                }
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.scanner.eat();
                }
                '#' => {
                    self.scanner.eat_until('\n');
                }
                '\\' => {
                    self.scanner.eat();
                    self.scanner.eat_if('\r');
                    if !self.scanner.eat_if('\n') {
                        return Err(
                            self.error("unexpected character after line continuation character")
                        );
                    }
                    self.newline();
                }
                '"' | '\'' => self.string(start, "")?,
                c if c.is_ascii_digit()
                    || (c == '.' && self.scanner.scout(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    self.number(start);
                }
                c if is_ident_start(c) => {
                    let name = self.scanner.eat_while(is_ident_continue);
                    let is_prefix = STRING_PREFIXES.contains(&name.to_ascii_lowercase().as_str());
                    if is_prefix && self.scanner.at(|c: char| c == '"' || c == '\'') {
                        self.string(start, name)?;
                    } else {
                        self.push(TokenKind::Name(name.to_owned()), start);
                    }
                }
                _ => self.operator(start)?,
            }
        }

        if let Some((open, line)) = self.brackets.last() {
            return Err(SyntaxError {
                line: *line,
                message: format!("'{open}' was never closed"),
            });
        }
        self.end_logical_line();
        Ok(self.tokens)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: message.into(),
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.scanner.cursor();
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            line: self.line,
            column: start - self.line_start,
        });
    }

    fn end_logical_line(&mut self) {
        if self
            .tokens
            .last()
            .is_some_and(|token| token.kind != TokenKind::Newline)
        {
            let column = self.scanner.cursor() - self.line_start;
            self.tokens.push(Token {
                kind: TokenKind::Newline,
                line: self.line,
                column,
            });
        }
    }

    fn number(&mut self, start: usize) {
        loop {
            self.scanner
                .eat_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            let text = self.scanner.from(start);
            let is_hex = text.starts_with("0x") || text.starts_with("0X");
            if !is_hex
                && text.ends_with(['e', 'E'])
                && self.scanner.eat_if(|c: char| c == '+' || c == '-')
            {
                continue;
            }
            break;
        }
        let text = self.scanner.from(start).to_owned();
        self.push(TokenKind::Number(text), start);
    }

    fn operator(&mut self, start: usize) -> Result<(), SyntaxError> {
        let Some(op) = OPERATORS.iter().find(|op| self.scanner.eat_if(**op)) else {
            let c = self.scanner.peek().unwrap_or_default();
            return Err(self.error(format!("invalid character '{c}'")));
        };

        match *op {
            "(" | "[" | "{" => {
                let open = op.chars().next().unwrap_or_default();
                self.brackets.push((open, self.line));
            }
            ")" | "]" | "}" => {
                let expected = match *op {
                    ")" => '(',
                    "]" => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(self.error(format!(
                            "closing parenthesis '{op}' does not match opening parenthesis '{open}'"
                        )));
                    }
                    None => return Err(self.error(format!("unmatched '{op}'"))),
                }
            }
            ";" if self.brackets.is_empty() => {
                self.end_logical_line();
                return Ok(());
            }
            _ => {}
        }
        self.push(TokenKind::Op(op), start);
        Ok(())
    }

    fn string(&mut self, start: usize, prefix: &str) -> Result<(), SyntaxError> {
        let raw = prefix.contains(['r', 'R']);
        let formatted = prefix.contains(['f', 'F']);
        let line = self.line;
        let column = start - self.line_start;

        let quote = self.scanner.eat().unwrap_or('"');
        let pair = if quote == '"' { "\"\"" } else { "''" };
        let triple = self.scanner.eat_if(pair);

        let unterminated = || SyntaxError {
            line,
            message: "unterminated string literal".to_owned(),
        };

        let mut value = String::new();
        loop {
            let Some(c) = self.scanner.eat() else {
                return Err(unterminated());
            };
            match c {
                '\\' => {
                    let Some(next) = self.scanner.eat() else {
                        return Err(unterminated());
                    };
                    if raw {
                        value.push('\\');
                        value.push(next);
                    } else {
                        self.escape(next, &mut value);
                    }
                }
                '\n' if !triple => return Err(unterminated()),
                c if c == quote => {
                    if !triple || self.scanner.eat_if(pair) {
                        break;
                    }
                    value.push(c);
                }
                c => value.push(c),
            }
        }

        // Strings may span lines; keep line numbers accurate.
        let consumed = self.scanner.from(start);
        if let Some(last) = consumed.rfind('\n') {
            self.line += consumed.matches('\n').count();
            self.line_start = start + last + 1;
        }

        let (value, formatted) = if formatted {
            resolve_fstring(value)
        } else {
            (value, false)
        };
        self.tokens.push(Token {
            kind: TokenKind::Str { value, formatted },
            line,
            column,
        });
        Ok(())
    }

    fn escape(&mut self, next: char, value: &mut String) {
        let simple = match next {
            '\n' => return,
            '\\' | '\'' | '"' => next,
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            '0'..='7' => {
                let mut code = next.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match self.scanner.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            self.scanner.eat();
                            code = code * 8 + digit;
                        }
                        None => break,
                    }
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits_start = self.scanner.cursor();
                let mut code = 0u32;
                for _ in 0..width {
                    match self.scanner.peek().and_then(|c| c.to_digit(16)) {
                        Some(digit) => {
                            self.scanner.eat();
                            code = code * 16 + digit;
                        }
                        None => {
                            // Not a valid escape: keep the text as written.
                            value.push('\\');
                            value.push(next);
                            value.push_str(self.scanner.from(digits_start));
                            return;
                        }
                    }
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            other => {
                value.push('\\');
                other
            }
        };
        value.push(simple);
    }
}

/// Unescape `{{`/`}}` in an f-string, or report that it has placeholders.
fn resolve_fstring(value: String) -> (String, bool) {
    let mut resolved = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' | '}' if chars.peek() == Some(&c) => {
                chars.next();
                resolved.push(c);
            }
            '{' => return (value, true),
            c => resolved.push(c),
        }
    }
    (resolved, false)
}
