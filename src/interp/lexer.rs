//! Tokenizer for calculator source
//!
//! Indentation is significant: the lexer emits `Indent`/`Dedent` tokens at
//! block boundaries and a `Newline` at the end of every logical line. Lines
//! inside parentheses or after a trailing backslash continue the current
//! logical line. Running out of input inside either construct is reported as
//! [`CompileError::Incomplete`] so the console can ask for more.

use super::error::{CompileError, Exception};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    pub col: usize,
}

const OPERATORS: &[&str] = &[
    "**=", "//=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "+", "-",
    "*", "/", "%", "(", ")", ",", ":", ";", "=", "<", ">",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut indents = vec![0usize];
    let mut depth = 0usize;
    let mut continuation = false;
    let mut logical_open = false;
    let mut last_line = 1;

    for (index, raw) in source.split('\n').enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let chars: Vec<char> = raw.trim_end_matches('\r').chars().collect();
        let continued = continuation || depth > 0;
        continuation = false;

        let mut pos = 0;
        if !continued {
            let mut width = 0;
            while pos < chars.len() && (chars[pos] == ' ' || chars[pos] == '\t') {
                width = if chars[pos] == '\t' { (width / 8 + 1) * 8 } else { width + 1 };
                pos += 1;
            }
            if pos == chars.len() || chars[pos] == '#' {
                continue;
            }

            let current = *indents.last().unwrap_or(&0);
            if width > current {
                indents.push(width);
                tokens.push(Token { tok: Tok::Indent, line: line_no, col: 0 });
            } else if width < current {
                while indents.len() > 1 && width < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    tokens.push(Token { tok: Tok::Dedent, line: line_no, col: 0 });
                }
                if width != *indents.last().unwrap_or(&0) {
                    return Err(Exception::syntax(
                        "unindent does not match any outer indentation level",
                        line_no,
                        pos,
                    )
                    .into());
                }
            }
        }

        while pos < chars.len() {
            let c = chars[pos];
            let col = pos;

            if c == ' ' || c == '\t' {
                pos += 1;
                continue;
            }
            if c == '#' {
                break;
            }
            if c == '\\' {
                if chars[pos + 1..].iter().all(|c| c.is_whitespace()) {
                    continuation = true;
                    break;
                }
                return Err(Exception::syntax(
                    "unexpected character after line continuation character",
                    line_no,
                    col,
                )
                .into());
            }

            if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit())) {
                let (tok, next) = lex_number(&chars, pos, line_no)?;
                tokens.push(Token { tok, line: line_no, col });
                logical_open = true;
                pos = next;
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let name: String = chars[start..pos].iter().collect();
                tokens.push(Token { tok: Tok::Name(name), line: line_no, col });
                logical_open = true;
                continue;
            }

            if c == '\'' || c == '"' {
                let (text, next) = lex_string(&chars, pos, line_no)?;
                tokens.push(Token { tok: Tok::Str(text), line: line_no, col });
                logical_open = true;
                pos = next;
                continue;
            }

            let rest: String = chars[pos..chars.len().min(pos + 3)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .copied()
                .ok_or_else(|| Exception::syntax(format!("invalid character '{}'", c), line_no, col))?;

            match op {
                "(" => depth += 1,
                ")" => {
                    if depth == 0 {
                        return Err(Exception::syntax("unmatched ')'", line_no, col).into());
                    }
                    depth -= 1;
                }
                _ => {}
            }
            tokens.push(Token { tok: Tok::Op(op), line: line_no, col });
            logical_open = true;
            pos += op.len();
        }

        if !continuation && depth == 0 && logical_open {
            tokens.push(Token { tok: Tok::Newline, line: line_no, col: chars.len() });
            logical_open = false;
        }
    }

    if depth > 0 || continuation {
        return Err(CompileError::Incomplete);
    }

    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token { tok: Tok::Dedent, line: last_line, col: 0 });
    }
    tokens.push(Token { tok: Tok::Eof, line: last_line, col: 0 });
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize, line: usize) -> Result<(Tok, usize), CompileError> {
    let mut pos = start;
    let mut is_float = false;

    while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '_') {
        pos += 1;
    }
    if pos < chars.len() && chars[pos] == '.' {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        let mut probe = pos + 1;
        if probe < chars.len() && (chars[probe] == '+' || chars[probe] == '-') {
            probe += 1;
        }
        if probe < chars.len() && chars[probe].is_ascii_digit() {
            is_float = true;
            pos = probe;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    if pos < chars.len() && (chars[pos].is_alphabetic() || chars[pos] == '_') {
        return Err(Exception::syntax("invalid decimal literal", line, start).into());
    }

    let text: String = chars[start..pos].iter().filter(|c| **c != '_').collect();
    let tok = if is_float {
        text.parse::<f64>()
            .map(Tok::Float)
            .map_err(|_| Exception::syntax("invalid decimal literal", line, start))?
    } else {
        match text.parse::<i64>() {
            Ok(value) => Tok::Int(value),
            Err(_) => {
                return Err(CompileError::Syntax(Exception::Overflow(
                    "integer literal too large".to_string(),
                )))
            }
        }
    };
    Ok((tok, pos))
}

fn lex_string(chars: &[char], start: usize, line: usize) -> Result<(String, usize), CompileError> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut text = String::new();

    while pos < chars.len() {
        let c = chars[pos];
        if c == quote {
            return Ok((text, pos + 1));
        }
        if c == '\\' && pos + 1 < chars.len() {
            pos += 1;
            match chars[pos] {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                '0' => text.push('\0'),
                '\\' => text.push('\\'),
                '\'' => text.push('\''),
                '"' => text.push('"'),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
        } else {
            text.push(c);
        }
        pos += 1;
    }

    Err(Exception::syntax(
        format!("unterminated string literal (detected at line {})", line),
        line,
        start,
    )
    .into())
}
