//! Tokenizer for C sources with embedded SQL.
//!
//! The same tokenizer serves both languages: the recognizer switches the
//! [`Mode`] when it enters or leaves an `EXEC SQL` statement. Every byte of
//! the input belongs to exactly one token (blanks and comments included) so
//! that host code can be copied through verbatim.
use memchr::memchr;
use std::result::Result;

pub use crate::dialect::TokenType;
use crate::dialect::{is_identifier_continue, is_identifier_start};
use crate::lexer::scan::Splitter;

mod error;
#[cfg(test)]
mod test;

pub use error::Error;

/// Token text with its class
pub type Token<'input> = (&'input [u8], TokenType);

/// Lexical rules in effect
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// host language
    #[default]
    C,
    /// inside `EXEC SQL ... ;`
    Sql,
}

/// Host file splitter
#[derive(Debug, Default)]
pub struct Tokenizer {
    mode: Mode,
}

impl Tokenizer {
    /// Constructor
    pub fn new() -> Tokenizer {
        Tokenizer { mode: Mode::C }
    }

    /// Current lexical rules
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch lexical rules
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}

/// C white space, vertical tab included
fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'\x0b'
}

impl Splitter for Tokenizer {
    type Error = Error;
    type TokenType = TokenType;

    fn split<'input>(
        &mut self,
        data: &'input [u8],
    ) -> Result<(Option<Token<'input>>, usize), Error> {
        if data.is_empty() {
            return Ok((None, 0));
        }
        if is_space(data[0]) {
            // eat as much space as possible
            let i = match data.iter().skip(1).position(|&b| !is_space(b)) {
                Some(i) => i + 1,
                _ => data.len(),
            };
            return Ok((Some((&data[..i], TokenType::TK_SPACE)), i));
        }
        let sql = self.mode == Mode::Sql;
        let tok = |n: usize, tt: TokenType| Ok((Some((&data[..n], tt)), n));
        match data[0] {
            b'-' => match data.get(1) {
                Some(b'-') if sql => line_comment(data),
                Some(b'>') => tok(2, TokenType::TK_ARROW),
                Some(b'-') | Some(b'=') => tok(2, TokenType::TK_OP),
                _ => tok(1, TokenType::TK_MINUS),
            },
            b'/' => match data.get(1) {
                Some(b'*') => block_comment(data),
                Some(b'/') if !sql => line_comment(data),
                _ => tok(1, TokenType::TK_SLASH),
            },
            b'#' if !sql => preprocessor_line(data),
            b'(' => tok(1, TokenType::TK_LP),
            b')' => tok(1, TokenType::TK_RP),
            b'[' => tok(1, TokenType::TK_LBRACKET),
            b']' => tok(1, TokenType::TK_RBRACKET),
            b'{' => tok(1, TokenType::TK_LBRACE),
            b'}' => tok(1, TokenType::TK_RBRACE),
            b';' => tok(1, TokenType::TK_SEMI),
            b',' => tok(1, TokenType::TK_COMMA),
            b'*' => tok(1, TokenType::TK_STAR),
            b':' => match data.get(1) {
                Some(b':') => tok(2, TokenType::TK_TYPECAST),
                _ => tok(1, TokenType::TK_COLON),
            },
            b'&' => match data.get(1) {
                Some(b'&') | Some(b'=') => tok(2, TokenType::TK_OP),
                _ => tok(1, TokenType::TK_AMP),
            },
            b'=' => match data.get(1) {
                Some(b'=') => tok(2, TokenType::TK_OP),
                _ => tok(1, TokenType::TK_EQ),
            },
            b'.' => match data.get(1) {
                Some(b) if b.is_ascii_digit() => number(data),
                _ => tok(1, TokenType::TK_DOT),
            },
            b'\'' => {
                if sql {
                    sql_literal(data, b'\'', TokenType::TK_STRING)
                } else {
                    c_literal(data, b'\'', TokenType::TK_STRING)
                }
            }
            b'"' => {
                if sql {
                    sql_literal(data, b'"', TokenType::TK_DQUOTE)
                } else {
                    c_literal(data, b'"', TokenType::TK_DQUOTE)
                }
            }
            b'$' if sql => match data.get(1) {
                Some(b) if b.is_ascii_digit() => {
                    let i = data
                        .iter()
                        .skip(1)
                        .position(|b| !b.is_ascii_digit())
                        .map_or(data.len(), |i| i + 1);
                    tok(i, TokenType::TK_PARAM)
                }
                Some(b) if is_identifier_start(*b) => tok(1, TokenType::TK_DOLLAR),
                _ => tok(1, TokenType::TK_OP),
            },
            b'0'..=b'9' => number(data),
            b if is_identifier_start(b) => {
                let i = data
                    .iter()
                    .skip(1)
                    .position(|&b| !is_identifier_continue(b))
                    .map_or(data.len(), |i| i + 1);
                tok(i, TokenType::TK_ID)
            }
            b'<' | b'>' | b'!' | b'|' | b'+' => match (data[0], data.get(1)) {
                (b'<', Some(b'=' | b'>' | b'<'))
                | (b'>', Some(b'=' | b'>'))
                | (b'!', Some(b'='))
                | (b'|', Some(b'|' | b'='))
                | (b'+', Some(b'+' | b'=')) => tok(2, TokenType::TK_OP),
                _ => tok(1, TokenType::TK_OP),
            },
            b'%' | b'^' | b'~' | b'?' | b'@' | b'$' | b'\\' | b'#' | b'`' => {
                tok(1, TokenType::TK_OP)
            }
            _ => Err(Error::UnrecognizedToken(None)),
        }
    }
}

fn line_comment(data: &[u8]) -> Result<(Option<Token<'_>>, usize), Error> {
    // the newline is left to the next blank token
    let i = memchr(b'\n', data).unwrap_or(data.len());
    Ok((Some((&data[..i], TokenType::TK_COMMENT)), i))
}

fn block_comment(data: &[u8]) -> Result<(Option<Token<'_>>, usize), Error> {
    debug_assert_eq!(&data[..2], b"/*");
    let mut pb = 0;
    for (i, b) in data.iter().enumerate().skip(2) {
        if *b == b'/' && pb == b'*' {
            return Ok((Some((&data[..=i], TokenType::TK_COMMENT)), i + 1));
        }
        pb = *b;
    }
    Err(Error::UnterminatedBlockComment(None))
}

fn preprocessor_line(data: &[u8]) -> Result<(Option<Token<'_>>, usize), Error> {
    let mut start = 0;
    loop {
        match memchr(b'\n', &data[start..]) {
            Some(i) => {
                let end = start + i;
                let continued = data[start..end]
                    .iter()
                    .rev()
                    .find(|b| **b != b'\r')
                    .is_some_and(|b| *b == b'\\');
                if continued {
                    start = end + 1;
                    continue;
                }
                return Ok((Some((&data[..end], TokenType::TK_PREPROC)), end));
            }
            None => return Ok((Some((data, TokenType::TK_PREPROC)), data.len())),
        }
    }
}

/// SQL literal: the quote is escaped by doubling it.
fn sql_literal(data: &[u8], quote: u8, tt: TokenType) -> Result<(Option<Token<'_>>, usize), Error> {
    debug_assert_eq!(data[0], quote);
    let mut i = 1;
    while i < data.len() {
        if data[i] == quote {
            if data.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok((Some((&data[..=i], tt)), i + 1));
        }
        i += 1;
    }
    Err(Error::UnterminatedLiteral(None))
}

/// C literal: the quote is escaped by a backslash.
fn c_literal(data: &[u8], quote: u8, tt: TokenType) -> Result<(Option<Token<'_>>, usize), Error> {
    debug_assert_eq!(data[0], quote);
    let mut i = 1;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b if b == quote => return Ok((Some((&data[..=i], tt)), i + 1)),
            _ => i += 1,
        }
    }
    Err(Error::UnterminatedLiteral(None))
}

/// Integer or floating point constant, C suffixes (`10L`, `1.5f`, `0x1F`) included.
fn number(data: &[u8]) -> Result<(Option<Token<'_>>, usize), Error> {
    let mut tt = TokenType::TK_INTEGER;
    let mut i = 0;
    let mut prev = 0u8;
    while i < data.len() {
        let b = data[i];
        if b == b'.' {
            if tt == TokenType::TK_FLOAT {
                break;
            }
            tt = TokenType::TK_FLOAT;
        } else if (b == b'+' || b == b'-') && (prev == b'e' || prev == b'E') {
            // exponent sign, but not in an hexadecimal constant
            if data.starts_with(b"0x") || data.starts_with(b"0X") {
                break;
            }
            tt = TokenType::TK_FLOAT;
        } else if !is_identifier_continue(b) || b == b'$' {
            break;
        }
        prev = b;
        i += 1;
    }
    Ok((Some((&data[..i], tt)), i))
}
