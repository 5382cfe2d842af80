//! Diagnostics of the translator
//!
//! Every problem found while translating goes through [`Diagnostics::report`],
//! which decides what the severity means: warnings are only recorded, errors
//! are recorded and make the final exit status fail, fatal problems stop the
//! translation.
use std::error;
use std::fmt;
use std::io;

use log::{debug, warn};

use crate::lexer::pgc;
use crate::parser::ParserError;

/// Process exit codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCode {
    /// Illegal option or no input file
    IllegalOption = 1,
    /// Include file not found
    NoIncludeFile = 2,
    /// Any other translation error
    ParseError = 3,
    /// Array target with a non-array indicator
    IndicatorNotArray = 4,
    /// Allocation failure
    OutOfMemory = 5,
    /// Struct target with a non-struct indicator
    IndicatorNotStruct = 6,
    /// Simple target with an array or struct indicator
    IndicatorNotSimple = 7,
}

impl ErrorCode {
    /// Value returned by the process
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// How bad a diagnostic is
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// reported, translation succeeds
    Warning,
    /// reported, translation continues, exit status fails
    Error,
    /// translation stops
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "ERROR",
        })
    }
}

/// One reported problem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// severity
    pub severity: Severity,
    /// exit code associated with errors
    pub code: ErrorCode,
    /// input file name
    pub file: String,
    /// input line
    pub line: u64,
    /// message
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.line, self.severity, self.message
        )
    }
}

/// Diagnostics sink of one translation
#[derive(Debug, Default)]
pub struct Diagnostics {
    file: String,
    line: u64,
    reported: Vec<Diagnostic>,
    status: Option<ErrorCode>,
}

impl Diagnostics {
    /// Constructor
    pub fn new(file: &str) -> Diagnostics {
        Diagnostics {
            file: file.to_owned(),
            line: 1,
            reported: Vec::new(),
            status: None,
        }
    }

    /// Input file diagnostics refer to
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Switch to another input file (include), returning the previous one
    pub fn set_file(&mut self, file: &str) -> String {
        std::mem::replace(&mut self.file, file.to_owned())
    }

    /// Current input line
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Move to `line`
    pub fn set_line(&mut self, line: u64) {
        self.line = line;
    }

    /// Report a problem at the current line.
    ///
    /// Returns `Err` only for [`Severity::Fatal`].
    pub fn report<M: Into<String>>(
        &mut self,
        severity: Severity,
        code: ErrorCode,
        message: M,
    ) -> Result<(), Error> {
        let diagnostic = Diagnostic {
            severity,
            code,
            file: self.file.clone(),
            line: self.line,
            message: message.into(),
        };
        match severity {
            Severity::Warning => warn!(target: "translate", "{diagnostic}"),
            _ => debug!(target: "translate", "{diagnostic}"),
        }
        if severity >= Severity::Error {
            self.status = Some(code);
        }
        self.reported.push(diagnostic.clone());
        if severity == Severity::Fatal {
            return Err(Error::Fatal(diagnostic));
        }
        Ok(())
    }

    /// Shortcut for a warning
    pub fn warning<M: Into<String>>(&mut self, message: M) {
        // warnings never fail
        let _ = self.report(Severity::Warning, ErrorCode::ParseError, message);
    }

    /// Shortcut for a recoverable error
    pub fn error<M: Into<String>>(&mut self, message: M) {
        let _ = self.report(Severity::Error, ErrorCode::ParseError, message);
    }

    /// Shortcut for a fatal error
    pub fn fatal<M: Into<String>>(&mut self, code: ErrorCode, message: M) -> Error {
        match self.report(Severity::Fatal, code, message) {
            Err(err) => err,
            Ok(()) => unreachable!("fatal diagnostics always fail"),
        }
    }

    /// Everything reported so far
    pub fn reported(&self) -> &[Diagnostic] {
        &self.reported
    }

    /// Number of diagnostics with at least `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.reported
            .iter()
            .filter(|d| d.severity >= severity)
            .count()
    }

    /// Exit code of the last error, `None` when only warnings were reported
    pub fn status(&self) -> Option<ErrorCode> {
        self.status
    }
}

/// Translation failure
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// I/O error (include files)
    Io(io::Error),
    /// Lexer error, cannot resynchronize
    Lexer(pgc::Error),
    /// Grammar error in one embedded statement
    Parser(ParserError, u64),
    /// Fatal diagnostic
    Fatal(Diagnostic),
}

impl Error {
    /// Exit code for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Fatal(d) => d.code,
            _ => ErrorCode::ParseError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(ref err) => err.fmt(f),
            Self::Lexer(ref err) => match err.pos() {
                Some(pos) => write!(f, "{err} at {pos}"),
                None => err.fmt(f),
            },
            Self::Parser(ref err, line) => write!(f, "{err} at line {line}"),
            Self::Fatal(ref d) => d.fmt(f),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<pgc::Error> for Error {
    fn from(err: pgc::Error) -> Self {
        Self::Lexer(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities() {
        let mut d = Diagnostics::new("t.pgc");
        d.set_line(3);
        d.warning("nullable is always 1");
        assert_eq!(d.status(), None);
        d.error("variable \"x\" is not declared");
        assert_eq!(d.status(), Some(ErrorCode::ParseError));
        let err = d.fatal(ErrorCode::IndicatorNotSimple, "bad indicator");
        assert_eq!(err.code(), ErrorCode::IndicatorNotSimple);
        assert_eq!(d.count(Severity::Warning), 3);
        assert_eq!(d.count(Severity::Error), 2);
        assert_eq!(
            d.reported()[0].to_string(),
            "t.pgc:3: WARNING: nullable is always 1"
        );
        assert_eq!(
            d.reported()[1].to_string(),
            "t.pgc:3: ERROR: variable \"x\" is not declared"
        );
    }
}
