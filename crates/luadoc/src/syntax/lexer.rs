//
// syntax/lexer.rs
//
// Lua tokenizer that keeps `---` doc lines and drops ordinary comments
//

use super::tree::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Keyword,
    Number,
    Str,
    Symbol,
    /// Text after a `---` prefix, up to the end of the line
    DocLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
    /// 0-based line of the token start
    pub line: u32,
}

impl Token<'_> {
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }
}

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

const MULTI_CHAR_SYMBOLS: &[&str] = &["...", "..", "==", "~=", "<=", ">=", "::", "//", "<<", ">>"];

pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 0u32;

    while pos < bytes.len() {
        let b = bytes[pos];
        let start = pos;
        match b {
            b'\n' => {
                line += 1;
                pos += 1;
            }
            b' ' | b'\t' | b'\r' | b'\x0c' => pos += 1,
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                if bytes.get(pos + 2) == Some(&b'-') {
                    let eol = line_end(bytes, pos);
                    let content_start = pos + 3;
                    let mut content_end = eol;
                    if content_end > content_start && bytes[content_end - 1] == b'\r' {
                        content_end -= 1;
                    }
                    tokens.push(Token {
                        kind: TokenKind::DocLine,
                        text: &text[content_start..content_end],
                        range: TextRange::new(content_start, content_end),
                        line,
                    });
                    pos = eol;
                } else if let Some(level) = long_bracket_level(bytes, pos + 2) {
                    let end = skip_long_bracket(bytes, pos + 2, level);
                    line += count_newlines(&bytes[pos..end]);
                    pos = end;
                } else {
                    pos = line_end(bytes, pos);
                }
            }
            b'"' | b'\'' => {
                pos = skip_short_string(bytes, pos);
                tokens.push(token(text, TokenKind::Str, start, pos, line));
            }
            b'[' if long_bracket_level(bytes, pos).is_some() => {
                let level = long_bracket_level(bytes, pos).unwrap_or(0);
                pos = skip_long_bracket(bytes, pos, level);
                tokens.push(token(text, TokenKind::Str, start, pos, line));
                line += count_newlines(&bytes[start..pos]);
            }
            _ if is_name_start(b) => {
                while pos < bytes.len() && is_name_continue(bytes[pos]) {
                    pos += 1;
                }
                let word = &text[start..pos];
                let kind = if KEYWORDS.contains(&word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Name
                };
                tokens.push(token(text, kind, start, pos, line));
            }
            _ if b.is_ascii_digit()
                || (b == b'.' && bytes.get(pos + 1).is_some_and(|c| c.is_ascii_digit())) =>
            {
                pos = skip_number(bytes, pos);
                tokens.push(token(text, TokenKind::Number, start, pos, line));
            }
            _ => {
                let rest = &text[pos..];
                let len = MULTI_CHAR_SYMBOLS
                    .iter()
                    .find(|sym| rest.starts_with(**sym))
                    .map(|sym| sym.len())
                    .or_else(|| rest.chars().next().map(char::len_utf8))
                    .unwrap_or(1);
                pos += len;
                tokens.push(token(text, TokenKind::Symbol, start, pos, line));
            }
        }
    }

    tokens
}

fn token(text: &str, kind: TokenKind, start: usize, end: usize, line: u32) -> Token<'_> {
    Token {
        kind,
        text: &text[start..end],
        range: TextRange::new(start, end),
        line,
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

fn count_newlines(bytes: &[u8]) -> u32 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u32
}

/// `[[`, `[=[`, `[==[` ... at `pos`; returns the number of `=`.
fn long_bracket_level(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }
    let mut i = pos + 1;
    while bytes.get(i) == Some(&b'=') {
        i += 1;
    }
    (bytes.get(i) == Some(&b'[')).then_some(i - pos - 1)
}

/// Position just past the closing bracket, or end of input when unterminated.
fn skip_long_bracket(bytes: &[u8], pos: usize, level: usize) -> usize {
    let mut i = pos + level + 2;
    while i < bytes.len() {
        if bytes[i] == b']' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j] == b'=' {
                j += 1;
            }
            if j - i - 1 == level && bytes.get(j) == Some(&b']') {
                return j + 1;
            }
        }
        i += 1;
    }
    bytes.len()
}

/// Stops at the closing quote, or before a newline when unterminated.
fn skip_short_string(bytes: &[u8], pos: usize) -> usize {
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_number(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_alphanumeric() || c == b'.' {
            i += 1;
        } else if (c == b'+' || c == b'-') && matches!(bytes[i - 1], b'e' | b'E' | b'p' | b'P') {
            i += 1;
        } else {
            break;
        }
    }
    i
}
