use super::{Error, Mode, TokenType, Tokenizer};
use crate::lexer::Scanner;

fn tokens(input: &str, mode: Mode) -> Vec<(String, TokenType)> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.set_mode(mode);
    let mut s = Scanner::new(input.as_bytes(), tokenizer);
    let mut v = Vec::new();
    while let Some((_, token, tt)) = s.scan().unwrap() {
        v.push((String::from_utf8(token.to_vec()).unwrap(), tt));
    }
    v
}

fn significant(input: &str, mode: Mode) -> Vec<TokenType> {
    tokens(input, mode)
        .into_iter()
        .map(|(_, tt)| tt)
        .filter(|tt| !tt.is_trivia())
        .collect()
}

#[test]
fn every_byte_is_covered() {
    let input = "int x; /* c */ // line\n#include <stdio.h>\nchar *s = \"a\\\"b\";\n";
    let text: String = tokens(input, Mode::C).into_iter().map(|(t, _)| t).collect();
    assert_eq!(text, input);
}

#[test]
fn double_dash_depends_on_mode() {
    assert_eq!(
        significant("i--;", Mode::C),
        vec![TokenType::TK_ID, TokenType::TK_OP, TokenType::TK_SEMI]
    );
    assert_eq!(
        significant("a -- comment\n;", Mode::Sql),
        vec![TokenType::TK_ID, TokenType::TK_SEMI]
    );
}

#[test]
fn host_variable_tokens() {
    assert_eq!(
        significant(":x:ind", Mode::Sql),
        vec![
            TokenType::TK_COLON,
            TokenType::TK_ID,
            TokenType::TK_COLON,
            TokenType::TK_ID
        ]
    );
    assert_eq!(
        significant("a::int", Mode::Sql),
        vec![TokenType::TK_ID, TokenType::TK_TYPECAST, TokenType::TK_ID]
    );
    assert_eq!(
        significant("$1 $x", Mode::Sql),
        vec![TokenType::TK_PARAM, TokenType::TK_DOLLAR, TokenType::TK_ID]
    );
}

#[test]
fn sql_literal_with_doubled_quote() {
    let v = tokens("'it''s'", Mode::Sql);
    assert_eq!(v, vec![("'it''s'".to_owned(), TokenType::TK_STRING)]);
}

#[test]
fn preprocessor_continuation() {
    let v = tokens("#define A \\\n 1\nint", Mode::C);
    assert_eq!(v[0], ("#define A \\\n 1".to_owned(), TokenType::TK_PREPROC));
}

#[test]
fn numbers() {
    let v = tokens("10L 1.5e-3 0x1F", Mode::C);
    let v: Vec<_> = v.into_iter().filter(|(_, tt)| !tt.is_trivia()).collect();
    assert_eq!(v[0], ("10L".to_owned(), TokenType::TK_INTEGER));
    assert_eq!(v[1], ("1.5e-3".to_owned(), TokenType::TK_FLOAT));
    assert_eq!(v[2], ("0x1F".to_owned(), TokenType::TK_INTEGER));
}

#[test]
fn unterminated_comment() {
    let mut s = Scanner::new(b"int /* x", Tokenizer::new());
    s.scan().unwrap();
    s.scan().unwrap();
    let err = s.scan().unwrap_err();
    assert!(matches!(err, Error::UnterminatedBlockComment(Some(_))));
    assert_eq!(err.pos().unwrap().column, 5);
}

#[test]
fn vertical_tab_and_form_feed_are_space() {
    let t = tokens("int\x0bx;\x0c\n", Mode::C);
    assert_eq!(
        t,
        vec![
            ("int".to_owned(), TokenType::TK_ID),
            ("\x0b".to_owned(), TokenType::TK_SPACE),
            ("x".to_owned(), TokenType::TK_ID),
            (";".to_owned(), TokenType::TK_SEMI),
            ("\x0c\n".to_owned(), TokenType::TK_SPACE),
        ]
    );
}
