//! `EXEC SQL` statements
use super::ast::{
    ArgRef, CursorSource, DisconnectTarget, HostRef, Query, Stmt, Target, Value,
};
use super::{decl, join_tokens, ParserError, Stream, Tok};
use crate::custom_err;
use crate::descriptor::Item;
use crate::dialect::{Keyword, TokenType};
use crate::whenever::{Condition, WhenAction};

/// Parse the tokens of one statement (`;` excluded) into the optional
/// `AT` connection and the statement.
pub(crate) fn statement(
    toks: &[Tok],
    informix: bool,
) -> Result<(Option<Value>, Stmt), ParserError> {
    let mut s = Stream::new(toks);
    let mut p = StmtParser { informix };
    let connection = if s.eat_kw(Keyword::At) {
        Some(p.value(&mut s)?)
    } else {
        None
    };
    let stmt = p.stmt(&mut s)?;
    Ok((connection, stmt))
}

struct StmtParser {
    informix: bool,
}

/// SQL rendering of a token: keywords in lower case
fn render(tok: &Tok) -> String {
    match tok.keyword() {
        Some(_) => tok.text.to_ascii_lowercase(),
        None => tok.text.clone(),
    }
}

fn render_all(toks: &[Tok]) -> String {
    toks.iter().map(render).collect::<Vec<_>>().join(" ")
}

/// `'it''s'` -> `it's`
fn unquote(text: &str) -> String {
    let quote = text.chars().next().unwrap_or('\'');
    let inner = text
        .strip_prefix(quote)
        .and_then(|t| t.strip_suffix(quote))
        .unwrap_or(text);
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

impl StmtParser {
    fn stmt(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let Some(first) = s.peek() else {
            return Err(s.error("statement"));
        };
        let second = s.peek_at(1);
        let second_is = |kw: Keyword| second.is_some_and(|t| t.is_kw(kw));
        let stmt = match first.keyword() {
            Some(Keyword::Begin) if second_is(Keyword::Declare) => {
                s.next();
                s.next();
                s.expect_kw(Keyword::Section, "SECTION")?;
                Stmt::BeginDeclare
            }
            Some(Keyword::End) if second_is(Keyword::Declare) => {
                s.next();
                s.next();
                s.expect_kw(Keyword::Section, "SECTION")?;
                Stmt::EndDeclare
            }
            Some(Keyword::Begin | Keyword::End | Keyword::Commit | Keyword::Rollback) => {
                Stmt::Transaction(render_all(s.rest()))
            }
            Some(Keyword::Start) if second_is(Keyword::Transaction) => {
                Stmt::Transaction(render_all(s.rest()))
            }
            Some(Keyword::Include) => {
                s.next();
                self.include(s)?
            }
            Some(Keyword::Define) => {
                s.next();
                let name = s.expect(TokenType::TK_ID, "symbol name")?.text.clone();
                let value = s.rest();
                let value = if value.is_empty() {
                    None
                } else {
                    Some(join_tokens(value))
                };
                Stmt::Define(name, value)
            }
            Some(Keyword::Undef) => {
                s.next();
                let name = s.expect(TokenType::TK_ID, "symbol name")?.text.clone();
                Stmt::Undef(name)
            }
            Some(Keyword::Type) if second.is_some_and(|t| t.ty == TokenType::TK_ID) => {
                s.next();
                let (name, ty) = self.type_alias(s)?;
                Stmt::TypeDef(name, ty)
            }
            Some(Keyword::Var) => {
                s.next();
                let (name, ty) = self.type_alias(s)?;
                Stmt::Var(name, ty)
            }
            Some(Keyword::Whenever) => {
                s.next();
                self.whenever(s)?
            }
            Some(Keyword::Connect) => {
                s.next();
                self.connect(s)?
            }
            Some(Keyword::Disconnect) => {
                s.next();
                let target = if s.is_done() || s.eat_kw(Keyword::Current) {
                    DisconnectTarget::Current
                } else if s.eat_kw(Keyword::Default) {
                    DisconnectTarget::Default
                } else if s.eat_kw(Keyword::All) {
                    DisconnectTarget::All
                } else {
                    DisconnectTarget::Named(self.value(s)?)
                };
                Stmt::Disconnect(target)
            }
            Some(Keyword::Set) if second_is(Keyword::Connection) => {
                s.next();
                s.next();
                if !s.eat_kw(Keyword::To) {
                    s.eat(TokenType::TK_EQ);
                }
                Stmt::SetConnection(self.value(s)?)
            }
            Some(Keyword::Set) if second.is_some_and(|t| t.is_word("autocommit")) => {
                s.next();
                s.next();
                if !s.eat_kw(Keyword::To) {
                    s.eat(TokenType::TK_EQ);
                }
                let on = match s.next() {
                    Some(t) if t.is_word("on") => true,
                    Some(t) if t.is_word("off") => false,
                    _ => return Err(s.error("ON or OFF")),
                };
                Stmt::SetAutocommit(on)
            }
            Some(Keyword::Set)
                if second_is(Keyword::Descriptor)
                    || (second_is(Keyword::Sql)
                        && s.peek_at(2).is_some_and(|t| t.is_kw(Keyword::Descriptor))) =>
            {
                s.next();
                s.eat_kw(Keyword::Sql);
                s.next();
                self.set_descriptor(s)?
            }
            Some(Keyword::Prepare) if s.toks.iter().any(|t| t.is_kw(Keyword::From)) =>
            {
                s.next();
                let name = self.value(s)?;
                s.expect_kw(Keyword::From, "FROM")?;
                let source = self.value(s)?;
                Stmt::Prepare { name, source }
            }
            Some(Keyword::Deallocate) => {
                s.next();
                if s.eat_kw(Keyword::Descriptor) {
                    Stmt::DeallocateDescriptor(self.value(s)?)
                } else if s.eat_kw(Keyword::Sql) {
                    s.expect_kw(Keyword::Descriptor, "DESCRIPTOR")?;
                    Stmt::DeallocateDescriptor(self.value(s)?)
                } else {
                    s.eat_kw(Keyword::Prepare);
                    if s.eat_kw(Keyword::All) {
                        Stmt::Deallocate(None)
                    } else {
                        Stmt::Deallocate(Some(self.value(s)?))
                    }
                }
            }
            Some(Keyword::Execute) => {
                s.next();
                if s.eat_kw(Keyword::Immediate) {
                    Stmt::ExecuteImmediate(self.value(s)?)
                } else {
                    let name = self.value(s)?;
                    let (mut using, mut into) = (Vec::new(), Vec::new());
                    loop {
                        if s.eat_kw(Keyword::Into) {
                            into.extend(self.arguments(s, false)?);
                        } else if s.eat_kw(Keyword::Using) {
                            using.extend(self.arguments(s, true)?);
                        } else {
                            break;
                        }
                    }
                    Stmt::Execute { name, using, into }
                }
            }
            Some(Keyword::Declare)
                if s.toks[s.pos..]
                    .iter()
                    .take_while(|t| !t.is_kw(Keyword::For))
                    .any(|t| t.is_kw(Keyword::Cursor)) =>
            {
                self.declare_cursor(s)?
            }
            Some(Keyword::Open) => {
                s.next();
                let name = s.expect(TokenType::TK_ID, "cursor name")?.text.clone();
                let (mut using, mut into) = (Vec::new(), Vec::new());
                loop {
                    if s.eat_kw(Keyword::Using) {
                        using.extend(self.arguments(s, true)?);
                    } else if s.eat_kw(Keyword::Into) {
                        into.extend(self.arguments(s, false)?);
                    } else {
                        break;
                    }
                }
                Stmt::Open { name, using, into }
            }
            Some(Keyword::Allocate) => {
                s.next();
                s.eat_kw(Keyword::Sql);
                s.expect_kw(Keyword::Descriptor, "DESCRIPTOR")?;
                let name = self.value(s)?;
                // WITH MAX n is accepted and ignored
                s.rest();
                Stmt::AllocateDescriptor(name)
            }
            Some(Keyword::Get) => {
                s.next();
                s.eat_kw(Keyword::Sql);
                s.expect_kw(Keyword::Descriptor, "DESCRIPTOR")?;
                self.get_descriptor(s)?
            }
            Some(Keyword::Describe) => {
                s.next();
                let input = if s.eat_kw(Keyword::Input) {
                    true
                } else {
                    s.eat_kw(Keyword::Output);
                    false
                };
                let statement = self.value(s)?;
                if !s.eat_kw(Keyword::Into) {
                    s.expect_kw(Keyword::Using, "INTO or USING")?;
                }
                let descriptor = self.descriptor_ref(s)?;
                Stmt::Describe {
                    input,
                    statement,
                    descriptor,
                }
            }
            _ => Stmt::Sql(self.query(s)?),
        };
        s.expect_end()?;
        Ok(stmt)
    }

    fn include(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let rest = s.rest();
        match rest {
            [] => Err(s.error("file name")),
            [t] if matches!(t.ty, TokenType::TK_DQUOTE | TokenType::TK_STRING) => {
                Ok(Stmt::Include {
                    name: unquote(&t.text),
                    system: false,
                })
            }
            [open, inner @ .., close] if open.text == "<" && close.text == ">" => {
                Ok(Stmt::Include {
                    name: join_tokens(inner),
                    system: true,
                })
            }
            _ => Ok(Stmt::Include {
                name: join_tokens(rest),
                system: false,
            }),
        }
    }

    fn type_alias(
        &mut self,
        s: &mut Stream<'_>,
    ) -> Result<(String, super::ast::TypeName), ParserError> {
        let name = s.expect(TokenType::TK_ID, "name")?.text.clone();
        s.expect_kw(Keyword::Is, "IS")?;
        let ty = decl::type_name(s, 0)?;
        // REFERENCES is accepted and ignored
        if s.peek().is_some_and(|t| t.is_word("references")) {
            s.rest();
        }
        Ok((name, ty))
    }

    fn whenever(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let condition = if s.eat_kw(Keyword::Sqlerror) {
            Condition::Error
        } else if s.eat_kw(Keyword::Sqlwarning) {
            Condition::Warning
        } else if s.eat_kw(Keyword::Not) {
            s.expect_kw(Keyword::Found, "FOUND")?;
            Condition::NotFound
        } else {
            return Err(s.error("SQLERROR, SQLWARNING or NOT FOUND"));
        };
        let action = match s.next().and_then(Tok::keyword) {
            Some(Keyword::Continue) => WhenAction::Nothing,
            Some(Keyword::Sqlprint) => WhenAction::Sqlprint,
            Some(Keyword::Stop) => WhenAction::Stop,
            Some(Keyword::Goto) => WhenAction::Goto(label(s)?),
            Some(Keyword::Go) => {
                s.expect_kw(Keyword::To, "TO")?;
                WhenAction::Goto(label(s)?)
            }
            Some(Keyword::Do) => {
                if s.eat_kw(Keyword::Break) {
                    WhenAction::Break
                } else if s.eat_kw(Keyword::Continue) {
                    WhenAction::Continue
                } else {
                    WhenAction::Do(function_call(s)?)
                }
            }
            Some(Keyword::Call) => WhenAction::Do(function_call(s)?),
            _ => return Err(custom_err!("unrecognized WHENEVER action")),
        };
        Ok(Stmt::Whenever(condition, action))
    }

    fn connect(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        s.expect_kw(Keyword::To, "TO")?;
        let target = if s.eat_kw(Keyword::Default) {
            Target::Default
        } else if self.at_host_var(s) {
            Target::Host(self.host_path(s)?)
        } else if s.check(TokenType::TK_STRING) {
            Target::Literal(unquote(&s.next().map_or_else(String::new, |t| t.text.clone())))
        } else {
            let start = s.pos;
            while s
                .peek()
                .is_some_and(|t| !t.is_kw(Keyword::As) && !t.is_kw(Keyword::User))
            {
                s.next();
            }
            let text = join_tokens(&s.toks[start..s.pos]);
            if text.is_empty() {
                return Err(s.error("connection target"));
            }
            check_target(&text)?;
            Target::Literal(text)
        };
        let mut name = None;
        let (mut user, mut password) = (None, None);
        loop {
            if s.eat_kw(Keyword::As) {
                name = Some(self.value(s)?);
            } else if s.eat_kw(Keyword::User) {
                user = Some(self.value(s)?);
                if s.eat(TokenType::TK_SLASH) || s.eat_kw(Keyword::Using) {
                    password = Some(self.value(s)?);
                } else if s.eat_kw(Keyword::Identified) {
                    s.expect_kw(Keyword::By, "BY")?;
                    password = Some(self.value(s)?);
                }
            } else {
                break;
            }
        }
        Ok(Stmt::Connect {
            target,
            name,
            user,
            password,
        })
    }

    fn declare_cursor(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let name = match s.peek_at(1) {
            Some(t) if t.ty == TokenType::TK_ID => t.text.clone(),
            _ => return Err(custom_err!("cursor name expected")),
        };
        let for_at = s.toks[s.pos..]
            .iter()
            .position(|t| t.is_kw(Keyword::For))
            .map(|i| s.pos + i)
            .ok_or_else(|| s.error("FOR"))?;
        let after = &s.toks[for_at + 1..];
        let prepared = match after {
            [t] if t.ty == TokenType::TK_ID && t.keyword().is_none() => Some(t.text.clone()),
            [colon, t] if colon.ty == TokenType::TK_COLON && t.ty == TokenType::TK_ID => {
                Some(t.text.clone())
            }
            _ => None,
        };
        let source = match prepared {
            Some(statement) => {
                let head = render_all(&s.toks[s.pos..=for_at]);
                s.rest();
                CursorSource::Prepared {
                    command: format!("{head} $1"),
                    statement,
                }
            }
            None => CursorSource::Query(self.query(s)?),
        };
        Ok(Stmt::DeclareCursor { name, source })
    }

    fn get_descriptor(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let name = self.value(s)?;
        if s.eat_kw(Keyword::Value) {
            let index = self.value(s)?;
            let mut items = Vec::new();
            loop {
                let var = self.host_path(s)?;
                s.expect(TokenType::TK_EQ, "'='")?;
                let item = s
                    .next()
                    .and_then(Tok::keyword)
                    .and_then(Item::from_keyword)
                    .ok_or_else(|| custom_err!("unrecognized descriptor item"))?;
                items.push((var, item));
                if !s.eat(TokenType::TK_COMMA) {
                    break;
                }
            }
            Ok(Stmt::GetDescriptor { name, index, items })
        } else {
            let mut items = Vec::new();
            loop {
                let var = self.host_path(s)?;
                s.expect(TokenType::TK_EQ, "'='")?;
                let item = s.expect(TokenType::TK_ID, "COUNT")?.text.clone();
                items.push((var, item));
                if !s.eat(TokenType::TK_COMMA) {
                    break;
                }
            }
            Ok(Stmt::GetDescriptorHeader { name, items })
        }
    }

    fn set_descriptor(&mut self, s: &mut Stream<'_>) -> Result<Stmt, ParserError> {
        let name = self.value(s)?;
        if s.eat_kw(Keyword::Count) {
            s.expect(TokenType::TK_EQ, "'='")?;
            let count = self.value(s)?;
            return Ok(Stmt::SetDescriptorHeader { name, count });
        }
        s.expect_kw(Keyword::Value, "VALUE or COUNT")?;
        let index = self.value(s)?;
        let mut items = Vec::new();
        loop {
            let item = s
                .next()
                .and_then(Tok::keyword)
                .and_then(Item::from_keyword)
                .ok_or_else(|| custom_err!("unrecognized descriptor item"))?;
            s.expect(TokenType::TK_EQ, "'='")?;
            items.push((item, self.value(s)?));
            if !s.eat(TokenType::TK_COMMA) {
                break;
            }
        }
        Ok(Stmt::SetDescriptor { name, index, items })
    }

    /// `SQL DESCRIPTOR name` or `DESCRIPTOR sqlda`
    fn descriptor_ref(&mut self, s: &mut Stream<'_>) -> Result<ArgRef, ParserError> {
        if s.eat_kw(Keyword::Sql) {
            s.expect_kw(Keyword::Descriptor, "DESCRIPTOR")?;
            return Ok(ArgRef::Descriptor(self.value(s)?));
        }
        s.expect_kw(Keyword::Descriptor, "DESCRIPTOR")?;
        if self.at_host_var(s) {
            return Ok(ArgRef::Sqlda(self.host_path(s)?));
        }
        Ok(ArgRef::Sqlda(
            s.expect(TokenType::TK_ID, "sqlda variable")?.text.clone(),
        ))
    }

    /// Argument list of `USING` / `INTO`; literals only when `constants`
    fn arguments(&mut self, s: &mut Stream<'_>, constants: bool) -> Result<Vec<ArgRef>, ParserError> {
        if s.check_kw(Keyword::Sql) || s.check_kw(Keyword::Descriptor) {
            return Ok(vec![self.descriptor_ref(s)?]);
        }
        let mut args = Vec::new();
        loop {
            if self.at_host_var(s) {
                args.push(ArgRef::Host(self.host_ref(s)?));
            } else if constants
                && s.peek().is_some_and(|t| {
                    matches!(
                        t.ty,
                        TokenType::TK_STRING | TokenType::TK_INTEGER | TokenType::TK_FLOAT
                    )
                })
            {
                let t = s.next().map_or_else(String::new, |t| {
                    if t.ty == TokenType::TK_STRING {
                        unquote(&t.text)
                    } else {
                        t.text.clone()
                    }
                });
                args.push(ArgRef::Literal(t));
            } else {
                return Err(s.error("host variable"));
            }
            if !s.eat(TokenType::TK_COMMA) {
                break;
            }
        }
        Ok(args)
    }

    fn at_host_var(&self, s: &Stream<'_>) -> bool {
        let marker = s
            .peek()
            .is_some_and(|t| matches!(t.ty, TokenType::TK_COLON | TokenType::TK_DOLLAR));
        marker && s.peek_at(1).is_some_and(|t| t.ty == TokenType::TK_ID)
    }

    /// `:path [[INDICATOR] :path]`
    fn host_ref(&mut self, s: &mut Stream<'_>) -> Result<HostRef, ParserError> {
        let path = self.host_path(s)?;
        let indicator = if self.at_host_var(s) {
            Some(self.host_path(s)?)
        } else if s.check_kw(Keyword::Indicator) {
            s.next();
            if !self.at_host_var(s) {
                return Err(s.error("indicator variable"));
            }
            Some(self.host_path(s)?)
        } else {
            None
        };
        Ok(HostRef { path, indicator })
    }

    fn host_path(&mut self, s: &mut Stream<'_>) -> Result<String, ParserError> {
        match s.next() {
            Some(t) if t.ty == TokenType::TK_DOLLAR && !self.informix => {
                return Err(custom_err!(
                    "\"$\" host variables are only supported in Informix compatibility mode"
                ))
            }
            Some(t) if matches!(t.ty, TokenType::TK_COLON | TokenType::TK_DOLLAR) => {}
            _ => return Err(s.error("host variable")),
        }
        let mut path = s.expect(TokenType::TK_ID, "variable name")?.text.clone();
        loop {
            match (s.peek().map(|t| t.ty), s.peek_at(1)) {
                (Some(TokenType::TK_DOT), Some(m)) if m.ty == TokenType::TK_ID => {
                    path.push('.');
                    path.push_str(&m.text);
                    s.next();
                    s.next();
                }
                (Some(TokenType::TK_ARROW), Some(m)) if m.ty == TokenType::TK_ID => {
                    path.push_str("->");
                    path.push_str(&m.text);
                    s.next();
                    s.next();
                }
                (Some(TokenType::TK_LBRACKET), _) => {
                    let start = s.pos;
                    let mut depth = 0;
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
                    path.push_str(&join_tokens(&s.toks[start..s.pos]));
                }
                _ => break,
            }
        }
        Ok(path)
    }

    /// Identifier, literal or host variable
    fn value(&mut self, s: &mut Stream<'_>) -> Result<Value, ParserError> {
        if self.at_host_var(s) {
            return Ok(Value::Host(HostRef::new(self.host_path(s)?)));
        }
        match s.next() {
            Some(t) if t.ty == TokenType::TK_ID => Ok(Value::Name(t.text.clone())),
            Some(t) if t.ty == TokenType::TK_DQUOTE => Ok(Value::Name(unquote(&t.text))),
            Some(t) if t.ty == TokenType::TK_STRING => Ok(Value::Str(unquote(&t.text))),
            Some(t) if matches!(t.ty, TokenType::TK_INTEGER | TokenType::TK_FLOAT) => {
                Ok(Value::Number(t.text.clone()))
            }
            Some(t) => Err(ParserError::SyntaxError {
                expected: "name or host variable",
                found: Some(t.text.clone()),
            }),
            None => Err(s.error("name or host variable")),
        }
    }

    /// Statement sent to the server: host variables become `$n`, `INTO`
    /// lists become output arguments.
    fn query(&mut self, s: &mut Stream<'_>) -> Result<Query, ParserError> {
        let mut q = Query::default();
        let mut words = Vec::new();
        while let Some(tok) = s.peek() {
            if self.at_host_var(s) {
                q.inputs.push(ArgRef::Host(self.host_ref(s)?));
                words.push(format!("${}", q.inputs.len()));
                continue;
            }
            if tok.is_kw(Keyword::Into) {
                let next = s.peek_at(1);
                let into_args = next.is_some_and(|t| {
                    t.is_kw(Keyword::Sql)
                        || t.is_kw(Keyword::Descriptor)
                        || matches!(t.ty, TokenType::TK_COLON | TokenType::TK_DOLLAR)
                });
                if into_args {
                    s.next();
                    q.outputs.extend(self.arguments(s, false)?);
                    continue;
                }
            }
            if tok.is_kw(Keyword::Using)
                && s.peek_at(1).is_some_and(|t| t.is_kw(Keyword::Sql) || t.is_kw(Keyword::Descriptor))
            {
                s.next();
                q.inputs.push(self.descriptor_ref(s)?);
                continue;
            }
            words.push(render(tok));
            s.next();
        }
        q.text = words.join(" ");
        Ok(q)
    }
}

fn label(s: &mut Stream<'_>) -> Result<String, ParserError> {
    Ok(s.expect(TokenType::TK_ID, "label")?.text.clone())
}

/// `f(args)` of `DO` / `CALL`, kept as C text
fn function_call(s: &mut Stream<'_>) -> Result<String, ParserError> {
    let rest = s.rest();
    if !matches!(rest.first(), Some(t) if t.ty == TokenType::TK_ID) {
        return Err(custom_err!("function call expected"));
    }
    Ok(join_tokens(rest))
}

/// `tcp:postgresql://...` and `unix:postgresql://...` targets
fn check_target(text: &str) -> Result<(), ParserError> {
    let Some(rest_at) = text.find("://") else {
        return Ok(());
    };
    let head = &text[..rest_at];
    let (protocol, kind) = head.split_once(':').unwrap_or((head, ""));
    if protocol != "tcp" && protocol != "unix" {
        return Err(custom_err!("invalid connection type: {}", protocol));
    }
    if kind != "postgresql" {
        return Err(custom_err!("expected \"postgresql\", found \"{}\"", kind));
    }
    Ok(())
}
