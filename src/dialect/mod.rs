//! Token types, keyword tables and identifier classes of the host language
//! and of the embedded SQL dialect.

use uncased::UncasedStr;

mod token;
pub use token::TokenType;

/// Words with a meaning for the embedded SQL recognizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Keyword {
    All,
    Allocate,
    As,
    At,
    Begin,
    Break,
    By,
    Call,
    Cardinality,
    Close,
    Commit,
    Connect,
    Connection,
    Continue,
    Count,
    Current,
    Cursor,
    Data,
    DatetimeIntervalCode,
    DatetimeIntervalPrecision,
    Deallocate,
    Declare,
    Default,
    Define,
    Describe,
    Descriptor,
    Disconnect,
    Do,
    End,
    Exec,
    Execute,
    Fetch,
    For,
    Found,
    From,
    Get,
    Go,
    Goto,
    Hold,
    Identified,
    Immediate,
    Include,
    Indicator,
    Input,
    Into,
    Is,
    KeyMember,
    Length,
    Name,
    Not,
    Nullable,
    OctetLength,
    Open,
    Output,
    Precision,
    Prepare,
    ReturnedLength,
    ReturnedOctetLength,
    Rollback,
    Scale,
    Section,
    Set,
    Sql,
    Sqlerror,
    Sqlprint,
    Sqlwarning,
    Start,
    Stop,
    To,
    Transaction,
    Type,
    Undef,
    User,
    Using,
    Value,
    Var,
    Whenever,
    With,
    Without,
    Work,
    /// SQL keyword without special meaning (only lower-cased on output)
    Plain,
}

/// Type and storage-class words of declare sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CKeyword {
    Auto,
    Bool,
    Bytea,
    Char,
    Const,
    Date,
    Decimal,
    Double,
    Enum,
    Extern,
    Float,
    Int,
    Interval,
    Long,
    Numeric,
    Register,
    Short,
    Signed,
    SqldaT,
    Static,
    String,
    Struct,
    Timestamp,
    Typedef,
    Union,
    Unsigned,
    Varchar,
    Volatile,
}

include!(concat!(env!("OUT_DIR"), "/keywords.rs"));

/// Check if `word` is an SQL keyword (case-insensitive)
pub fn keyword(word: &str) -> Option<Keyword> {
    KEYWORDS.get(UncasedStr::new(word)).copied()
}

/// Check if `word` is a host type keyword (case-sensitive)
pub fn c_keyword(word: &str) -> Option<CKeyword> {
    C_KEYWORDS.get(word).copied()
}

/// Check if `b` may start an identifier
pub fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b > b'\x7F'
}

/// Check if `b` may continue an identifier
pub fn is_identifier_continue(b: u8) -> bool {
    b == b'$' || b.is_ascii_alphanumeric() || b == b'_' || b > b'\x7F'
}

/// Token text as an owned string.
pub fn from_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_keywords_are_case_insensitive() {
        assert_eq!(keyword("whenever"), Some(Keyword::Whenever));
        assert_eq!(keyword("WheneVer"), Some(Keyword::Whenever));
        assert_eq!(keyword("select"), Some(Keyword::Plain));
        assert_eq!(keyword("mytable"), None);
    }

    #[test]
    fn c_keywords_are_case_sensitive() {
        assert_eq!(c_keyword("varchar"), Some(CKeyword::Varchar));
        assert_eq!(c_keyword("VARCHAR"), Some(CKeyword::Varchar));
        assert_eq!(c_keyword("Int"), None);
    }
}
