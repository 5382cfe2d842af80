//! Embedded SQL recognizer
//!
//! The host file is split into [`Chunk`]s: host code is passed through
//! untouched, declarations of declare sections and `EXEC SQL` statements are
//! parsed into an AST for the translation pass.
use std::collections::VecDeque;
use std::error;
use std::fmt;

use fallible_iterator::FallibleIterator;
use indexmap::IndexMap;
use log::{debug, trace};

use crate::config::Options;
use crate::dialect::{from_bytes, keyword, Keyword, TokenType};
use crate::error::Error;
use crate::lexer::pgc::{Mode, Tokenizer};
use crate::lexer::{Pos, Scanner};

pub mod ast;
mod decl;
mod stmt;

use ast::{Chunk, Exec, Stmt};

/// Grammar error of one statement or declaration
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParserError {
    /// unexpected token
    SyntaxError {
        /// what was expected
        expected: &'static str,
        /// what was found
        found: Option<String>,
    },
    /// statement not terminated
    UnexpectedEof,
    /// other error
    Custom(String),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::SyntaxError {
                expected,
                found: Some(found),
            } => write!(f, "syntax error at or near \"{found}\", expected {expected}"),
            ParserError::SyntaxError {
                expected,
                found: None,
            } => write!(f, "syntax error at end of statement, expected {expected}"),
            ParserError::UnexpectedEof => f.write_str("unexpected end of file"),
            ParserError::Custom(s) => f.write_str(s),
        }
    }
}

impl error::Error for ParserError {}

/// Custom error constructor
#[macro_export]
macro_rules! custom_err {
    ($msg:literal $(,)?) => {
        $crate::parser::ParserError::Custom($msg.to_owned())
    };
    ($err:expr $(,)?) => {
        $crate::parser::ParserError::Custom(format!($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::parser::ParserError::Custom(format!($fmt, $($arg)*))
    };
}

/// Significant token of a statement or declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Tok {
    pub ty: TokenType,
    pub text: String,
}

impl Tok {
    fn new(ty: TokenType, text: String) -> Tok {
        Tok { ty, text }
    }

    /// SQL keyword
    pub fn keyword(&self) -> Option<Keyword> {
        if self.ty == TokenType::TK_ID {
            keyword(&self.text)
        } else {
            None
        }
    }

    pub fn is_kw(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    /// Identifier compared case-insensitively (words unknown to the keyword table)
    pub fn is_word(&self, word: &str) -> bool {
        self.ty == TokenType::TK_ID && self.text.eq_ignore_ascii_case(word)
    }
}

/// Cursor over the tokens of one statement
#[derive(Debug)]
pub(crate) struct Stream<'t> {
    toks: &'t [Tok],
    pos: usize,
}

impl<'t> Stream<'t> {
    pub fn new(toks: &'t [Tok]) -> Stream<'t> {
        Stream { toks, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'t Tok> {
        self.toks.get(self.pos)
    }

    pub fn peek_at(&self, n: usize) -> Option<&'t Tok> {
        self.toks.get(self.pos + n)
    }

    pub fn next(&mut self) -> Option<&'t Tok> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.toks.len()
    }

    /// Tokens not consumed yet
    pub fn rest(&mut self) -> &'t [Tok] {
        let rest = &self.toks[self.pos.min(self.toks.len())..];
        self.pos = self.toks.len();
        rest
    }

    pub fn check(&self, ty: TokenType) -> bool {
        self.peek().is_some_and(|t| t.ty == ty)
    }

    pub fn check_kw(&self, kw: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_kw(kw))
    }

    pub fn eat(&mut self, ty: TokenType) -> bool {
        let found = self.check(ty);
        if found {
            self.pos += 1;
        }
        found
    }

    pub fn eat_kw(&mut self, kw: Keyword) -> bool {
        let found = self.check_kw(kw);
        if found {
            self.pos += 1;
        }
        found
    }

    pub fn error(&self, expected: &'static str) -> ParserError {
        ParserError::SyntaxError {
            expected,
            found: self.peek().map(|t| t.text.clone()),
        }
    }

    pub fn expect(&mut self, ty: TokenType, expected: &'static str) -> Result<&'t Tok, ParserError> {
        match self.peek() {
            Some(t) if t.ty == ty => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.error(expected)),
        }
    }

    pub fn expect_kw(&mut self, kw: Keyword, expected: &'static str) -> Result<(), ParserError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    pub fn expect_end(&self) -> Result<(), ParserError> {
        if self.is_done() {
            Ok(())
        } else {
            Err(self.error("end of statement"))
        }
    }
}

/// Join tokens back into source text, with a blank only between words
pub(crate) fn join_tokens(toks: &[Tok]) -> String {
    let mut s = String::new();
    let mut prev_word = false;
    for t in toks {
        let word = matches!(
            t.ty,
            TokenType::TK_ID | TokenType::TK_INTEGER | TokenType::TK_FLOAT
        );
        if word && prev_word {
            s.push(' ');
        }
        s.push_str(&t.text);
        prev_word = word;
    }
    s
}

/// Recognizer over one host file
pub struct Parser<'input> {
    scanner: Scanner<'input, Tokenizer>,
    /// C token read ahead after `EXEC`
    peeked: Option<(Pos, &'input [u8], TokenType)>,
    pending: VecDeque<Chunk>,
    /// error raised after some host text was read
    deferred: Option<Error>,
    defines: IndexMap<String, String>,
    informix: bool,
    declare_section: bool,
}

impl<'input> Parser<'input> {
    /// Parser over `input`; `-D` defines of `options` are applied
    pub fn new(input: &'input [u8], options: &Options) -> Parser<'input> {
        Parser {
            scanner: Scanner::new(input, Tokenizer::new()),
            peeked: None,
            pending: VecDeque::new(),
            deferred: None,
            defines: options.defines.clone(),
            informix: options.compat.is_informix(),
            declare_section: false,
        }
    }

    /// Current line
    pub fn line(&self) -> u64 {
        self.scanner.line()
    }

    /// `DEFINE`d symbols
    pub fn defines(&self) -> &IndexMap<String, String> {
        &self.defines
    }

    /// Replace the `DEFINE`d symbols (after an included file)
    pub fn set_defines(&mut self, defines: IndexMap<String, String>) {
        self.defines = defines;
    }

    /// Inside `BEGIN DECLARE SECTION` ... `END DECLARE SECTION`
    pub fn in_declare_section(&self) -> bool {
        self.declare_section
    }

    /// Start inside a declare section (file included from one)
    pub fn set_in_declare_section(&mut self, on: bool) {
        self.declare_section = on;
    }

    fn scan(&mut self) -> Result<Option<(Pos, &'input [u8], TokenType)>, Error> {
        if let Some(tok) = self.peeked.take() {
            return Ok(Some(tok));
        }
        Ok(self.scanner.scan()?)
    }

    /// Next significant token, blanks and comments skipped (and returned)
    fn scan_significant(
        &mut self,
        skipped: &mut String,
    ) -> Result<Option<(Pos, &'input [u8], TokenType)>, Error> {
        loop {
            match self.scan()? {
                Some((_, value, ty)) if ty.is_trivia() => skipped.push_str(&from_bytes(value)),
                other => return Ok(other),
            }
        }
    }

    fn token(&self, value: &[u8], ty: TokenType) -> Tok {
        let text = from_bytes(value);
        if ty == TokenType::TK_ID {
            if let Some(replacement) = self.defines.get(&text) {
                trace!(target: "parser", "define {text} -> {replacement}");
                return Tok::new(defined_type(replacement), replacement.clone());
            }
        }
        Tok::new(ty, text)
    }

    /// Tokens of an `EXEC SQL` statement, `;` excluded
    fn statement_tokens(&mut self) -> Result<(Vec<Tok>, u64), Error> {
        self.scanner.splitter_mut().set_mode(Mode::Sql);
        let mut toks: Vec<Tok> = Vec::new();
        let result = loop {
            match self.scanner.scan() {
                Err(err) => break Err(err.into()),
                Ok(None) => {
                    break Err(Error::Parser(ParserError::UnexpectedEof, self.line()));
                }
                Ok(Some((pos, _, TokenType::TK_SEMI))) => break Ok(pos.line),
                Ok(Some((_, _, ty))) if ty.is_trivia() => {}
                // the symbol named by DEFINE/UNDEF is never substituted
                Ok(Some((_, value, ty)))
                    if matches!(toks.as_slice(), [t] if t.is_kw(Keyword::Define) || t.is_kw(Keyword::Undef)) =>
                {
                    toks.push(Tok::new(ty, from_bytes(value)))
                }
                Ok(Some((_, value, ty))) => toks.push(self.token(value, ty)),
            }
        };
        self.scanner.splitter_mut().set_mode(Mode::C);
        result.map(|end_line| (toks, end_line))
    }

    /// Tokens of a C declaration up to its `;`, braces of struct bodies included
    fn declaration_tokens(&mut self, first: Tok) -> Result<Vec<Tok>, Error> {
        let mut depth = 0usize;
        let mut toks = vec![first];
        if toks[0].ty == TokenType::TK_LBRACE {
            depth += 1;
        }
        loop {
            match self.scan()? {
                None => return Err(Error::Parser(ParserError::UnexpectedEof, self.line())),
                Some((_, _, ty)) if ty.is_trivia() => {}
                Some((_, value, ty)) => {
                    match ty {
                        TokenType::TK_LBRACE => depth += 1,
                        TokenType::TK_RBRACE => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    toks.push(self.token(value, ty));
                    if ty == TokenType::TK_SEMI && depth == 0 {
                        return Ok(toks);
                    }
                }
            }
        }
    }

    fn exec(&mut self, line: u64) -> Result<Chunk, Error> {
        let (toks, end_line) = self.statement_tokens()?;
        debug!(target: "parser", "exec sql at line {line}: {} tokens", toks.len());
        let (connection, stmt) = stmt::statement(&toks, self.informix)
            .map_err(|err| Error::Parser(err, line))?;
        match &stmt {
            Stmt::BeginDeclare => self.declare_section = true,
            Stmt::EndDeclare => self.declare_section = false,
            Stmt::Define(name, value) => {
                self.defines
                    .insert(name.clone(), value.clone().unwrap_or_default());
            }
            Stmt::Undef(name) => {
                self.defines.shift_remove(name);
            }
            _ => {}
        }
        Ok(Chunk::Exec(Exec {
            line,
            end_line,
            connection,
            stmt,
        }))
    }
}

/// Token class of a `DEFINE` replacement text
fn defined_type(value: &str) -> TokenType {
    match value.as_bytes().first() {
        Some(b'0'..=b'9') => TokenType::TK_INTEGER,
        Some(b'\'') => TokenType::TK_STRING,
        Some(b'"') => TokenType::TK_DQUOTE,
        _ => TokenType::TK_ID,
    }
}

impl FallibleIterator for Parser<'_> {
    type Item = Chunk;
    type Error = Error;

    fn next(&mut self) -> Result<Option<Chunk>, Error> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let mut text = String::new();
        loop {
            let Some((pos, value, ty)) = self.scan()? else {
                break;
            };
            match ty {
                TokenType::TK_LBRACE => {
                    self.pending.push_back(Chunk::OpenBrace);
                    break;
                }
                TokenType::TK_RBRACE => {
                    self.pending.push_back(Chunk::CloseBrace);
                    break;
                }
                TokenType::TK_ID if value.eq_ignore_ascii_case(b"exec") => {
                    let mut skipped = String::new();
                    match self.scan_significant(&mut skipped)? {
                        Some((_, sql, TokenType::TK_ID)) if sql.eq_ignore_ascii_case(b"sql") => {
                            match self.exec(pos.line) {
                                Ok(chunk) => self.pending.push_back(chunk),
                                // the host text read so far is returned first
                                Err(err) => self.deferred = Some(err),
                            }
                            break;
                        }
                        other => {
                            text.push_str(&from_bytes(value));
                            text.push_str(&skipped);
                            self.peeked = other;
                        }
                    }
                }
                _ if self.declare_section && !ty.is_trivia() && ty != TokenType::TK_PREPROC => {
                    let first = self.token(value, ty);
                    let declaration = self.declaration_tokens(first).and_then(|toks| {
                        decl::declaration(&toks, pos.line)
                            .map_err(|err| Error::Parser(err, pos.line))
                    });
                    match declaration {
                        Ok(declaration) => self.pending.push_back(Chunk::Declaration(declaration)),
                        Err(err) => self.deferred = Some(err),
                    }
                    break;
                }
                _ => text.push_str(&from_bytes(value)),
            }
        }
        if !text.is_empty() {
            return Ok(Some(Chunk::Text(text)));
        }
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        match self.deferred.take() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test;
