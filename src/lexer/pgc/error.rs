use std::error;
use std::fmt;

use crate::lexer::scan::{Pos, ScanError};

/// Host file lexer errors
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte which cannot start any token
    UnrecognizedToken(Option<Pos>),
    /// Missing quote or double-quote
    UnterminatedLiteral(Option<Pos>),
    /// Missing `*/`
    UnterminatedBlockComment(Option<Pos>),
}

impl Error {
    /// Where the error was raised
    pub fn pos(&self) -> Option<Pos> {
        match *self {
            Self::UnrecognizedToken(pos)
            | Self::UnterminatedLiteral(pos)
            | Self::UnterminatedBlockComment(pos) => pos,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedToken(_) => f.write_str("unrecognized token"),
            Self::UnterminatedLiteral(_) => f.write_str("unterminated quoted string"),
            Self::UnterminatedBlockComment(_) => f.write_str("unterminated /* comment"),
        }
    }
}

impl error::Error for Error {}

impl ScanError for Error {
    fn position(&mut self, p: Pos) {
        match *self {
            Self::UnrecognizedToken(ref mut pos) => *pos = Some(p),
            Self::UnterminatedLiteral(ref mut pos) => *pos = Some(p),
            Self::UnterminatedBlockComment(ref mut pos) => *pos = Some(p),
        }
    }
}
