//! Host variable declarations
use super::ast::{Declaration, Declarator, TypeName, TypeSpec};
use super::{join_tokens, ParserError, Stream, Tok};
use crate::custom_err;
use crate::dialect::{c_keyword, CKeyword, TokenType};
use crate::types::{Aggregate, CExpr, TypeKind};

/// Parse one declaration; `toks` ends with its `;`
pub(crate) fn declaration(toks: &[Tok], line: u64) -> Result<Declaration, ParserError> {
    let mut s = Stream::new(toks);
    let decl = parse_declaration(&mut s, line)?;
    s.expect_end()?;
    Ok(decl)
}

fn c_kw(tok: &Tok) -> Option<CKeyword> {
    if tok.ty == TokenType::TK_ID {
        c_keyword(&tok.text)
    } else {
        None
    }
}

fn parse_declaration(s: &mut Stream<'_>, line: u64) -> Result<Declaration, ParserError> {
    let mut qualifiers = Vec::new();
    let mut typedef = false;
    while let Some(tok) = s.peek() {
        match c_kw(tok) {
            Some(
                CKeyword::Auto
                | CKeyword::Const
                | CKeyword::Extern
                | CKeyword::Register
                | CKeyword::Static
                | CKeyword::Volatile,
            ) => qualifiers.push(tok.text.clone()),
            Some(CKeyword::Typedef) => typedef = true,
            _ => break,
        }
        s.next();
    }
    let spec = type_spec(s, line)?;
    let mut declarators = Vec::new();
    if !s.check(TokenType::TK_SEMI) {
        loop {
            declarators.push(declarator(s)?);
            if !s.eat(TokenType::TK_COMMA) {
                break;
            }
        }
    }
    s.expect(TokenType::TK_SEMI, "';'")?;
    Ok(Declaration {
        line,
        qualifiers,
        typedef,
        spec,
        declarators,
    })
}

/// Type specifier, storage classes excluded
pub(crate) fn type_spec(s: &mut Stream<'_>, line: u64) -> Result<TypeSpec, ParserError> {
    let Some(first) = s.peek() else {
        return Err(s.error("type"));
    };
    let simple = |kind: TypeKind, text: &str| TypeSpec::Simple {
        kind,
        text: text.to_owned(),
    };
    let spec = match c_kw(first) {
        Some(
            CKeyword::Signed
            | CKeyword::Unsigned
            | CKeyword::Short
            | CKeyword::Long
            | CKeyword::Int
            | CKeyword::Char
            | CKeyword::Float
            | CKeyword::Double
            | CKeyword::Bool,
        ) => return arithmetic(s),
        Some(CKeyword::Varchar) => simple(TypeKind::Varchar, "varchar"),
        Some(CKeyword::Bytea) => simple(TypeKind::Bytea, "bytea"),
        Some(CKeyword::Numeric) => simple(TypeKind::Numeric, "numeric"),
        Some(CKeyword::Decimal) => simple(TypeKind::Decimal, "decimal"),
        Some(CKeyword::Date) => simple(TypeKind::Date, "date"),
        Some(CKeyword::Timestamp) => simple(TypeKind::Timestamp, "timestamp"),
        Some(CKeyword::Interval) => simple(TypeKind::Interval, "interval"),
        Some(CKeyword::String) => simple(TypeKind::String, "string"),
        Some(CKeyword::SqldaT) => simple(TypeKind::Sqlda, "sqlda_t"),
        Some(CKeyword::Struct | CKeyword::Union) => return aggregate(s, line),
        Some(CKeyword::Enum) => return enumeration(s),
        _ if first.ty == TokenType::TK_ID => TypeSpec::Named(first.text.clone()),
        _ => return Err(s.error("type")),
    };
    s.next();
    Ok(spec)
}

fn arithmetic(s: &mut Stream<'_>) -> Result<TypeSpec, ParserError> {
    let mut words = Vec::new();
    let (mut unsigned, mut longs) = (false, 0);
    let mut base = None;
    while let Some(tok) = s.peek() {
        match c_kw(tok) {
            Some(CKeyword::Unsigned) => unsigned = true,
            Some(CKeyword::Signed) => {}
            Some(CKeyword::Long) => longs += 1,
            Some(kw @ (CKeyword::Short
            | CKeyword::Int
            | CKeyword::Char
            | CKeyword::Float
            | CKeyword::Double
            | CKeyword::Bool)) => {
                if kw != CKeyword::Int && base.is_some_and(|b| b != CKeyword::Int) {
                    return Err(custom_err!("invalid type specifier \"{}\"", tok.text));
                }
                if kw != CKeyword::Int || base.is_none() {
                    base = Some(kw);
                }
            }
            _ => break,
        }
        words.push(tok.text.clone());
        s.next();
    }
    let kind = match (base, longs, unsigned) {
        (Some(CKeyword::Char), _, false) => TypeKind::Char,
        (Some(CKeyword::Char), _, true) => TypeKind::UnsignedChar,
        (Some(CKeyword::Short), _, false) => TypeKind::Short,
        (Some(CKeyword::Short), _, true) => TypeKind::UnsignedShort,
        (Some(CKeyword::Float), ..) => TypeKind::Float,
        (Some(CKeyword::Double), ..) => TypeKind::Double,
        (Some(CKeyword::Bool), ..) => TypeKind::Bool,
        (_, 0, false) => TypeKind::Int,
        (_, 0, true) => TypeKind::UnsignedInt,
        (_, 1, false) => TypeKind::Long,
        (_, 1, true) => TypeKind::UnsignedLong,
        (_, _, false) => TypeKind::LongLong,
        (_, _, true) => TypeKind::UnsignedLongLong,
    };
    Ok(TypeSpec::Simple {
        kind,
        text: words.join(" "),
    })
}

fn aggregate(s: &mut Stream<'_>, line: u64) -> Result<TypeSpec, ParserError> {
    let aggregate = match s.next().and_then(c_kw) {
        Some(CKeyword::Union) => Aggregate::Union,
        _ => Aggregate::Struct,
    };
    let tag = match s.peek() {
        Some(t) if t.ty == TokenType::TK_ID => {
            s.next();
            Some(t.text.clone())
        }
        _ => None,
    };
    let body = if s.eat(TokenType::TK_LBRACE) {
        let mut members = Vec::new();
        while !s.eat(TokenType::TK_RBRACE) {
            if s.is_done() {
                return Err(ParserError::UnexpectedEof);
            }
            members.push(parse_declaration(s, line)?);
        }
        Some(members)
    } else if tag.is_none() {
        return Err(s.error("struct tag or '{'"));
    } else {
        None
    };
    Ok(TypeSpec::Struct {
        aggregate,
        tag,
        body,
    })
}

fn enumeration(s: &mut Stream<'_>) -> Result<TypeSpec, ParserError> {
    let start = s.pos;
    s.next();
    if s.check(TokenType::TK_ID) {
        s.next();
    }
    if s.eat(TokenType::TK_LBRACE) {
        let mut depth = 1;
        while depth > 0 {
            match s.next().map(|t| t.ty) {
                Some(TokenType::TK_LBRACE) => depth += 1,
                Some(TokenType::TK_RBRACE) => depth -= 1,
                Some(_) => {}
                None => return Err(ParserError::UnexpectedEof),
            }
        }
    }
    Ok(TypeSpec::Enum(join_tokens(&s.toks[start..s.pos])))
}

fn declarator(s: &mut Stream<'_>) -> Result<Declarator, ParserError> {
    let mut pointers = 0;
    loop {
        if s.eat(TokenType::TK_STAR) {
            pointers += 1;
        } else if s
            .peek()
            .is_some_and(|t| matches!(c_kw(t), Some(CKeyword::Const | CKeyword::Volatile)))
        {
            s.next();
        } else {
            break;
        }
    }
    let name = s.expect(TokenType::TK_ID, "variable name")?.text.clone();
    let brackets = brackets(s)?;
    let bit_width = if s.eat(TokenType::TK_COLON) {
        Some(join_tokens(until_separator(s)))
    } else {
        None
    };
    let initializer = if s.eat(TokenType::TK_EQ) {
        let init = until_separator(s);
        if init.is_empty() {
            return Err(s.error("initializer"));
        }
        Some(join_tokens(init))
    } else {
        None
    };
    Ok(Declarator {
        pointers,
        name,
        brackets,
        bit_width,
        initializer,
    })
}

/// `[expr]...`, `[]` being `0`
pub(crate) fn brackets(s: &mut Stream<'_>) -> Result<Vec<CExpr>, ParserError> {
    let mut brackets = Vec::new();
    while s.eat(TokenType::TK_LBRACKET) {
        let start = s.pos;
        let mut depth = 1;
        loop {
            match s.next().map(|t| t.ty) {
                Some(TokenType::TK_LBRACKET) => depth += 1,
                Some(TokenType::TK_RBRACKET) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
                None => return Err(s.error("']'")),
            }
        }
        let expr = join_tokens(&s.toks[start..s.pos - 1]);
        brackets.push(if expr.is_empty() {
            CExpr::new("0")
        } else {
            CExpr::new(expr)
        });
    }
    Ok(brackets)
}

/// Tokens up to the next `,` or `;` outside of any parentheses or braces
fn until_separator<'t>(s: &mut Stream<'t>) -> &'t [Tok] {
    let start = s.pos;
    let mut depth = 0usize;
    while let Some(t) = s.peek() {
        match t.ty {
            TokenType::TK_LP | TokenType::TK_LBRACE | TokenType::TK_LBRACKET => depth += 1,
            TokenType::TK_RP | TokenType::TK_RBRACE | TokenType::TK_RBRACKET => {
                depth = depth.saturating_sub(1)
            }
            TokenType::TK_COMMA | TokenType::TK_SEMI if depth == 0 => break,
            _ => {}
        }
        s.next();
    }
    &s.toks[start..s.pos]
}

/// Type of `EXEC SQL TYPE` / `EXEC SQL VAR`: `type [*...] [[n]...]`
pub(crate) fn type_name(s: &mut Stream<'_>, line: u64) -> Result<TypeName, ParserError> {
    let spec = type_spec(s, line)?;
    let mut pointers = 0;
    while s.eat(TokenType::TK_STAR) {
        pointers += 1;
    }
    let brackets = brackets(s)?;
    Ok(TypeName {
        spec,
        pointers,
        brackets,
    })
}
