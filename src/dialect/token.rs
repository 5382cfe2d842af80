/// Token classes produced by the host-file tokenizer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
#[allow(missing_docs)]
pub enum TokenType {
    TK_EOF,
    /// blanks, tabs and newlines
    TK_SPACE,
    /// `/* ... */`, `// ...` (C) or `-- ...` (SQL)
    TK_COMMENT,
    /// preprocessor line, continuation lines included
    TK_PREPROC,
    TK_ID,
    TK_INTEGER,
    TK_FLOAT,
    /// `'...'`: SQL string or C character constant
    TK_STRING,
    /// `"..."`: C string or SQL quoted identifier
    TK_DQUOTE,
    /// `$n` positional parameter (SQL mode)
    TK_PARAM,
    /// `$` before an identifier (Informix host variable)
    TK_DOLLAR,
    TK_SEMI,
    TK_COMMA,
    TK_LP,
    TK_RP,
    TK_LBRACKET,
    TK_RBRACKET,
    TK_LBRACE,
    TK_RBRACE,
    TK_DOT,
    TK_ARROW,
    TK_COLON,
    /// `::`
    TK_TYPECAST,
    TK_STAR,
    TK_AMP,
    TK_EQ,
    TK_SLASH,
    TK_MINUS,
    /// any other operator
    TK_OP,
}

impl TokenType {
    /// Tokens without meaning for the recognizer
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenType::TK_SPACE | TokenType::TK_COMMENT)
    }
}
