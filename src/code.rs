//! Code-like payloads: lexing and parsing into normalized values.
//!
//! Code is never stored as-is. Spacing, letter case and redundant brackets
//! would make identical statements hash differently and fragment the trie,
//! so code is parsed into a [`Value`] hierarchy first:
//!
//! - words become lowercase text, numbers become numbers
//! - `"quoted"` and `` `backticked` `` literals keep their exact text
//! - whitespace and `,` separate members of a sequence
//! - `(`/`)` and `[`/`]` nest, `|` turns the enclosing level into alternatives
//!
//! Parsing is lenient: stray closing brackets are skipped and unclosed ones are
//! closed at the end of input. Brackets past [`MAX_NESTING`] levels are ignored.

use crate::value::Value;

/// Byte-level source span for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Open,
    Close,
    Bar,
    Word(String),
    Literal(String),
    Number(f64),
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Split code into tokens.
pub fn tokenize(code: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            '(' | '[' => {
                chars.next();
                tokens.push(token(TokenKind::Open, start, start + 1));
            }
            ')' | ']' => {
                chars.next();
                tokens.push(token(TokenKind::Close, start, start + 1));
            }
            '|' => {
                chars.next();
                tokens.push(token(TokenKind::Bar, start, start + 1));
            }
            '"' | '`' => {
                let quote = c;
                chars.next();
                let mut literal = String::new();
                let mut end = code.len();
                while let Some((i, ch)) = chars.next() {
                    if ch == quote {
                        end = i + 1;
                        break;
                    }
                    literal.push(ch);
                }
                tokens.push(token(TokenKind::Literal(literal), start, end));
            }
            _ => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | '[' | ']' | '|' | '"' | '`') {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                let word = &code[start..end];
                let kind = match word.parse::<f64>() {
                    Ok(n) if n.is_finite() => TokenKind::Number(n),
                    _ => TokenKind::Word(word.to_lowercase()),
                };
                tokens.push(token(kind, start, end));
            }
        }
    }

    tokens
}

fn token(kind: TokenKind, start: usize, end: usize) -> Token {
    Token {
        kind,
        span: Span { start, end },
    }
}

/// Brackets nested deeper than this are ignored; their content stays at the
/// deepest level.
pub const MAX_NESTING: usize = 64;

/// One open nesting level: its branches so far.
struct Level {
    alternatives: Vec<Vec<Value>>,
    branching: bool,
    opened_at: usize,
}

impl Level {
    fn new(opened_at: usize) -> Self {
        Self {
            alternatives: vec![Vec::new()],
            branching: false,
            opened_at,
        }
    }

    fn push(&mut self, value: Value) {
        if let Some(current) = self.alternatives.last_mut() {
            current.push(value);
        }
    }

    fn branch(&mut self) {
        self.branching = true;
        self.alternatives.push(Vec::new());
    }

    fn finish(mut self) -> Value {
        if self.branching {
            let branches = self
                .alternatives
                .into_iter()
                .filter(|seq| !seq.is_empty())
                .map(|seq| collapse(Value::all(seq)))
                .collect();
            collapse(Value::any(branches))
        } else {
            let seq = self.alternatives.pop().unwrap_or_default();
            collapse(Value::all(seq))
        }
    }
}

/// Parse code into a normalized value hierarchy.
pub fn parse(code: &str) -> Value {
    let mut groups = Vec::new();
    let mut outer: Vec<Level> = Vec::new();
    let mut current = Level::new(0);
    let mut ignored = 0usize;

    for tok in tokenize(code) {
        match tok.kind {
            TokenKind::Open if outer.len() >= MAX_NESTING => {
                if ignored == 0 {
                    tracing::debug!(at = tok.span.start, "brackets nested too deep, flattening");
                }
                ignored += 1;
            }
            TokenKind::Open => {
                outer.push(std::mem::replace(&mut current, Level::new(tok.span.start)));
            }
            TokenKind::Close if ignored > 0 => ignored -= 1,
            TokenKind::Close => match outer.pop() {
                Some(parent) => {
                    let nested = std::mem::replace(&mut current, parent).finish();
                    current.push(nested);
                }
                None => {
                    tracing::debug!(at = tok.span.start, "skipping unbalanced closing bracket");
                    let finished = std::mem::replace(&mut current, Level::new(tok.span.end)).finish();
                    if !finished.is_empty() {
                        groups.push(finished);
                    }
                }
            },
            TokenKind::Bar => current.branch(),
            TokenKind::Word(w) | TokenKind::Literal(w) => current.push(Value::Text(w)),
            TokenKind::Number(n) => current.push(Value::Number(n)),
        }
    }

    while let Some(parent) = outer.pop() {
        tracing::debug!(at = current.opened_at, "closing unterminated bracket at end of code");
        let nested = std::mem::replace(&mut current, parent).finish();
        current.push(nested);
    }
    let finished = current.finish();
    if !finished.is_empty() {
        groups.push(finished);
    }

    collapse(Value::all(groups))
}

/// Remove redundant single-member nesting.
fn collapse(value: Value) -> Value {
    match value {
        Value::Group { mut items, .. } if items.len() == 1 => items.remove(0),
        other => other,
    }
}
