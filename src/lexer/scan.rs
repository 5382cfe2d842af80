//! Adaptation/port of [Go scanner](http://tip.golang.org/pkg/bufio/#Scanner).

use log::debug;

use std::error::Error;
use std::fmt;

/// Position in the input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    /// line number, starting at 1
    pub line: u64,
    /// column number (byte offset, not char offset), starting at 1
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

/// Error which may occur while splitting the input
pub trait ScanError: Error + Sized {
    /// Attach the position where the error was raised
    fn position(&mut self, p: Pos);
}

/// The `(&[u8], TokenType)` is the token.
/// And the `usize` is the amount of bytes to consume.
type SplitResult<'input, TokenType, Error> =
    Result<(Option<(&'input [u8], TokenType)>, usize), Error>;

/// Split function used to tokenize the input
pub trait Splitter: Sized {
    /// Potential error raised
    type Error: ScanError;
    /// Token generated
    type TokenType;

    /// The arguments are an initial substring of the remaining unprocessed
    /// data.
    ///
    /// If the returned error is non-nil, scanning stops and the error
    /// is returned to the client.
    ///
    /// The function is never called with an empty data slice.
    fn split<'input>(
        &mut self,
        data: &'input [u8],
    ) -> SplitResult<'input, Self::TokenType, Self::Error>;
}

/// Successive calls to the `scan` method will step through the 'tokens'
/// of the input.
///
/// Scanning stops at the end of the input or at the first error.
pub struct Scanner<'input, S: Splitter> {
    /// The input provided by the client.
    input: &'input [u8],
    /// The function to tokenize the input.
    splitter: S,
    /// current line number
    line: u64,
    /// current column number (byte offset, not char offset)
    column: usize,
}

impl<'input, S: Splitter> Scanner<'input, S> {
    /// Constructor
    pub fn new(input: &'input [u8], splitter: S) -> Scanner<'input, S> {
        Scanner {
            input,
            splitter,
            line: 1,
            column: 1,
        }
    }

    /// Current line number
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Current column number (byte offset, not char offset)
    pub fn column(&self) -> usize {
        self.column
    }

    /// Current position
    pub fn position(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    /// Associated splitter
    pub fn splitter(&self) -> &S {
        &self.splitter
    }

    /// Mutable access to the splitter (to switch its mode)
    pub fn splitter_mut(&mut self) -> &mut S {
        &mut self.splitter
    }

    /// Reset the scanner such that it behaves as if it had never been used.
    pub fn reset(&mut self, input: &'input [u8]) {
        self.input = input;
        self.line = 1;
        self.column = 1;
    }
}

type ScanResult<'input, TokenType, Error> =
    Result<Option<(Pos, &'input [u8], TokenType)>, Error>;

impl<'input, S: Splitter> Scanner<'input, S> {
    /// Advance the Scanner to next token.
    /// Return the token as a byte slice with its starting position.
    /// Return `None` when the end of the input is reached.
    /// Return any error that occurs while reading the input.
    pub fn scan(&mut self) -> ScanResult<'input, S::TokenType, S::Error> {
        debug!(target: "scanner", "scan(line: {}, column: {})", self.line, self.column);
        // Loop until we have a token.
        loop {
            if self.input.is_empty() {
                return Ok(None);
            }
            let data = self.input;
            let pos = self.position();
            match self.splitter.split(data) {
                Err(mut e) => {
                    e.position(pos);
                    return Err(e);
                }
                Ok((None, 0)) => {
                    // nothing more can be produced
                    return Ok(None);
                }
                Ok((None, amt)) => {
                    // Ignore/skip this data
                    self.consume(amt);
                    continue;
                }
                Ok((Some((token, tt)), amt)) => {
                    self.consume(amt);
                    return Ok(Some((pos, token, tt)));
                }
            }
        }
    }

    /// Consume `amt` bytes of the buffer.
    fn consume(&mut self, amt: usize) {
        debug!(target: "scanner", "consume({})", amt);
        debug_assert!(amt <= self.input.len());
        for byte in &self.input[..amt] {
            if *byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.input = &self.input[amt..];
    }
}

impl<'input, S: Splitter> fmt::Debug for Scanner<'input, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("input", &self.input)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}
