//! Translation pass: recognizer chunks to generated C.
//!
//! One [`TranslationContext`] lives for one input file (included files share
//! it). It owns every piece of state a translation accumulates: symbol
//! table, typedefs, cursors, descriptors, `WHENEVER` actions and the brace
//! level.
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use fallible_iterator::FallibleIterator;
use log::debug;
use memchr::memchr_iter;

use crate::config::{Flags, Options};
use crate::cursor::{Cursor, Cursors};
use crate::descriptor::{Descriptors, Item, Settable};
use crate::error::{Diagnostics, Error, ErrorCode};
use crate::output::{self, line_directive, StatementKind};
use crate::parser::ast::{
    ArgRef, Chunk, CursorSource, Declaration, Declarator, DisconnectTarget, Exec, Query, Stmt,
    Target, TypeName, TypeSpec, Value,
};
use crate::parser::Parser;
use crate::types::dump::{escape, Dumper, Target as DumpTarget};
use crate::types::{no_indicator, CExpr, Member, Type, TypeKind};
use crate::variable::{
    adjust_array, build_type, check_indicator, Argument, BaseType, Shape, TypeTemplate, Typedefs,
    Variable, Variables,
};
use crate::whenever::{Guard, WhenAction, Whenever};

const MAX_INCLUDE_DEPTH: usize = 32;

const SYSTEM_INCLUDE_DIRS: &[&str] = &["/usr/local/include", "/usr/include"];

/// State of the translation of one input file
pub struct TranslationContext<'o> {
    options: &'o Options,
    diags: Diagnostics,
    /// file the current line directives refer to
    file: String,
    variables: Variables,
    typedefs: Typedefs,
    cursors: Cursors,
    descriptors: Descriptors,
    whenever: Whenever,
    braces: usize,
    varchar_counter: u32,
    include_depth: usize,
}

impl<'o> TranslationContext<'o> {
    /// Fresh context for `file`
    pub fn new(file: &str, options: &'o Options) -> TranslationContext<'o> {
        TranslationContext {
            options,
            diags: Diagnostics::new(file),
            file: file.to_owned(),
            variables: Variables::default(),
            typedefs: Typedefs::default(),
            cursors: Cursors::default(),
            descriptors: Descriptors::default(),
            whenever: Whenever::default(),
            braces: 0,
            varchar_counter: 0,
            include_depth: 0,
        }
    }

    /// Problems reported so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Consume the context, keeping its diagnostics
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diags
    }

    /// Translate `input`, the content of the context's file.
    ///
    /// Errors are only reported: the output is still produced. A fatal
    /// problem stops the translation and is returned.
    pub fn translate(&mut self, input: &[u8]) -> Result<String, Error> {
        debug!(target: "translate", "translating {}", self.file);
        let mut out = String::new();
        self.check_encoding(input)?;
        output::preamble(&mut out, &self.file, self.options);
        let mut parser = Parser::new(input, self.options);
        self.run(&mut parser, &mut out)?;
        let unopened: Vec<(String, u64)> = self
            .cursors
            .unopened()
            .map(|c| (c.name.clone(), c.line))
            .collect();
        for (name, line) in unopened {
            self.diags.set_line(line);
            self.diags.warning(format!(
                "cursor \"{name}\" has been declared but not opened"
            ));
        }
        Ok(out)
    }

    /// Source text must be UTF-8; the first bad byte is fatal.
    fn check_encoding(&mut self, input: &[u8]) -> Result<(), Error> {
        let Err(err) = std::str::from_utf8(input) else {
            return Ok(());
        };
        let valid = err.valid_up_to();
        self.diags
            .set_line(memchr_iter(b'\n', &input[..valid]).count() as u64 + 1);
        Err(self.diags.fatal(
            ErrorCode::ParseError,
            format!("invalid UTF-8 byte sequence at offset {valid}"),
        ))
    }

    fn run(&mut self, parser: &mut Parser<'_>, out: &mut String) -> Result<(), Error> {
        loop {
            let chunk = match parser.next() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Ok(()),
                Err(Error::Parser(err, line)) => {
                    // the statement is skipped, the parser resumes after its `;`
                    self.diags.set_line(line);
                    self.diags.error(err.to_string());
                    line_directive(out, parser.line(), &self.file);
                    continue;
                }
                Err(Error::Lexer(err)) => {
                    if let Some(pos) = err.pos() {
                        self.diags.set_line(pos.line);
                    }
                    return Err(self.diags.fatal(ErrorCode::ParseError, err.to_string()));
                }
                Err(err) => return Err(err),
            };
            self.chunk(chunk, parser, out)?;
        }
    }

    fn chunk(&mut self, chunk: Chunk, parser: &mut Parser<'_>, out: &mut String) -> Result<(), Error> {
        match chunk {
            Chunk::Text(text) => out.push_str(&text),
            Chunk::OpenBrace => {
                self.braces += 1;
                out.push('{');
            }
            Chunk::CloseBrace => {
                if self.braces > 0 {
                    self.variables.remove_scope(self.braces);
                    self.typedefs.remove_scope(self.braces);
                    self.braces -= 1;
                }
                out.push('}');
            }
            Chunk::Declaration(decl) => {
                self.diags.set_line(decl.line);
                let text = self.declaration(&decl, None)?;
                out.push_str(&text);
                let end = parser.line();
                if end != decl.line {
                    line_directive(out, end, &self.file);
                }
            }
            Chunk::Exec(exec) => {
                self.diags.set_line(exec.line);
                self.exec(exec, parser, out)?;
            }
        }
        Ok(())
    }

    fn guard(&self, out: &mut String, guard: Guard, line: u64) {
        self.whenever.emit(out, guard, line, &self.file);
    }

    /// Line directive after a statement spanning several lines
    fn resync(&self, out: &mut String, exec_line: u64, end_line: u64) {
        if end_line != exec_line {
            line_directive(out, end_line, &self.file);
        }
    }

    // Declarations

    /// Register a declaration and return its C text. Inside a struct body,
    /// `members` collects the declarators instead of the symbol table.
    fn declaration(
        &mut self,
        decl: &Declaration,
        mut members: Option<&mut Vec<Member>>,
    ) -> Result<String, Error> {
        let (template, spec_text) = self.base_type(&decl.spec)?;
        let mut prefix = String::new();
        for qualifier in &decl.qualifiers {
            prefix.push_str(qualifier);
            prefix.push(' ');
        }
        if decl.typedef {
            prefix.push_str("typedef ");
        }
        let wrapper = match &template {
            Some(TypeTemplate {
                base: BaseType::Simple(kind @ (TypeKind::Varchar | TypeKind::Bytea)),
                ..
            }) => Some(*kind),
            _ => None,
        };

        let mut plain = Vec::new();
        let mut wrapped = Vec::new();
        for d in &decl.declarators {
            let Some(template) = &template else {
                plain.push(render_declarator(d));
                continue;
            };
            let shape = self.declarator_shape(template, d, decl.typedef)?;
            let mut counter = 0;
            if let Some(kind) = wrapper {
                if shape.length.is_zero() || shape.length.is_unset() {
                    self.diags.error("pointers to varchar are not implemented");
                    continue;
                }
                self.varchar_counter += 1;
                counter = self.varchar_counter;
                let mut text = format!(
                    "{prefix}struct {}_{}_{counter} {{ int len; char arr[{}]; }} {}{}",
                    kind.c_name(),
                    d.name,
                    shape.length,
                    "*".repeat(d.pointers),
                    d.name
                );
                if d.pointers == 0 && shape.dimension.atoi() >= 0 {
                    let _ = write!(text, "[{}]", shape.dimension);
                }
                if let Some(init) = &d.initializer {
                    let _ = write!(text, " = {init}");
                }
                text.push(';');
                wrapped.push(text);
            } else {
                plain.push(render_declarator(d));
            }

            if let Some(members) = members.as_deref_mut() {
                let ty = build_type(&template.base, &shape, &d.name, counter);
                members.push(Member::new(d.name.clone(), ty));
            } else if decl.typedef {
                let base = named_base(&template.base, &d.name);
                self.typedefs.define(
                    &d.name,
                    TypeTemplate::new(base, shape),
                    self.braces,
                    &mut self.diags,
                );
            } else {
                let ty = build_type(&template.base, &shape, &d.name, counter);
                self.variables.declare(&d.name, ty, self.braces);
            }
        }

        let mut text = String::new();
        if !plain.is_empty() || (decl.declarators.is_empty() && wrapper.is_none()) {
            let _ = write!(text, "{prefix}{spec_text}");
            if !plain.is_empty() {
                text.push(' ');
                text.push_str(&plain.join(", "));
            }
            text.push(';');
        }
        for w in wrapped {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&w);
        }
        Ok(text)
    }

    /// Adjusted shape of one declarator
    fn declarator_shape(
        &mut self,
        template: &TypeTemplate,
        d: &Declarator,
        type_definition: bool,
    ) -> Result<Shape, Error> {
        let mut brackets = d.brackets.clone();
        if let BaseType::Simple(kind) = &template.base {
            if kind.is_char() && d.pointers == 0 {
                if let (Some(last), Some(init)) = (brackets.last_mut(), &d.initializer) {
                    if last.is_zero() {
                        *last = initializer_capacity(init);
                    }
                }
            }
        }
        let mut shape = Shape::from_brackets(&brackets, &mut self.diags)?;
        adjust_array(
            &template.base,
            &mut shape,
            &template.shape,
            d.pointers,
            type_definition,
            &mut self.diags,
        )?;
        Ok(shape)
    }

    /// Base type of a specifier and its C text. `None` when the type is
    /// unknown (already reported).
    fn base_type(&mut self, spec: &TypeSpec) -> Result<(Option<TypeTemplate>, String), Error> {
        let simple = |kind| Some(TypeTemplate::new(BaseType::Simple(kind), Shape::default()));
        Ok(match spec {
            TypeSpec::Simple {
                kind: TypeKind::String,
                text,
            } if !self.options.compat.is_informix() => {
                return self.base_type(&TypeSpec::Named(text.clone()));
            }
            TypeSpec::Simple {
                kind: TypeKind::String,
                ..
            } => (simple(TypeKind::String), "char".to_owned()),
            TypeSpec::Simple { kind, text } => (simple(*kind), text.clone()),
            TypeSpec::Enum(text) => (simple(TypeKind::Int), text.clone()),
            TypeSpec::Named(name) => match self.typedefs.get(name) {
                Some(template) => (Some(template.clone()), name.clone()),
                None => {
                    self.diags
                        .error(format!("unrecognized data type name \"{name}\""));
                    (None, name.clone())
                }
            },
            TypeSpec::Struct {
                aggregate,
                tag,
                body: Some(body),
            } => {
                let mut members = Vec::new();
                let mut text = format!("{} ", aggregate.keyword());
                if let Some(tag) = tag {
                    text.push_str(tag);
                    text.push(' ');
                }
                text.push('{');
                for member in body {
                    let member = self.declaration(member, Some(&mut members))?;
                    text.push(' ');
                    text.push_str(&member);
                }
                text.push_str(" }");
                let struct_sizeof = match tag {
                    Some(tag) => {
                        self.typedefs
                            .define_tag(*aggregate, tag, members.clone(), self.braces);
                        format!("sizeof({} {tag})", aggregate.keyword())
                    }
                    None => format!("sizeof({text})"),
                };
                let base = BaseType::Struct {
                    aggregate: *aggregate,
                    members,
                    type_name: tag.clone(),
                    struct_sizeof: CExpr::new(struct_sizeof),
                };
                (Some(TypeTemplate::new(base, Shape::default())), text)
            }
            TypeSpec::Struct {
                aggregate,
                tag: Some(tag),
                body: None,
            } => {
                let text = format!("{} {tag}", aggregate.keyword());
                match self.typedefs.tag(*aggregate, tag) {
                    Some(members) => {
                        let base = BaseType::Struct {
                            aggregate: *aggregate,
                            members: members.to_vec(),
                            type_name: Some(tag.clone()),
                            struct_sizeof: CExpr::new(format!("sizeof({text})")),
                        };
                        (Some(TypeTemplate::new(base, Shape::default())), text)
                    }
                    None => {
                        self.diags.error(format!("{text} is not defined"));
                        (None, text)
                    }
                }
            }
            TypeSpec::Struct { aggregate, .. } => (None, aggregate.keyword().to_owned()),
        })
    }

    /// Type of `EXEC SQL TYPE` / `EXEC SQL VAR`
    fn type_name(
        &mut self,
        tn: &TypeName,
        type_definition: bool,
    ) -> Result<Option<(BaseType, Shape)>, Error> {
        let (template, _) = self.base_type(&tn.spec)?;
        let Some(template) = template else {
            return Ok(None);
        };
        let mut shape = Shape::from_brackets(&tn.brackets, &mut self.diags)?;
        adjust_array(
            &template.base,
            &mut shape,
            &template.shape,
            tn.pointers,
            type_definition,
            &mut self.diags,
        )?;
        Ok(Some((template.base, shape)))
    }

    fn type_name_text(&mut self, tn: &TypeName) -> String {
        let mut text = match &tn.spec {
            TypeSpec::Simple { text, .. } | TypeSpec::Enum(text) | TypeSpec::Named(text) => {
                text.clone()
            }
            TypeSpec::Struct {
                aggregate,
                tag: Some(tag),
                ..
            } => format!("{} {tag}", aggregate.keyword()),
            TypeSpec::Struct { aggregate, .. } => format!("{} {{...}}", aggregate.keyword()),
        };
        text.push_str(&"*".repeat(tn.pointers));
        for b in &tn.brackets {
            let _ = write!(text, "[{b}]");
        }
        text
    }

    // Statements

    fn exec(&mut self, exec: Exec, parser: &mut Parser<'_>, out: &mut String) -> Result<(), Error> {
        let Exec {
            line,
            end_line,
            connection,
            stmt,
        } = exec;
        let conn_key = connection.as_ref().map(Value::to_c);
        let conn = conn_key.clone().unwrap_or_else(|| "NULL".to_owned());
        debug!(target: "translate", "statement at line {line}");
        match stmt {
            Stmt::BeginDeclare => {
                out.push_str("/* exec sql begin declare section */");
                self.resync(out, line, end_line);
            }
            Stmt::EndDeclare => {
                out.push_str("/* exec sql end declare section */");
                line_directive(out, end_line, &self.file);
            }
            Stmt::Include { name, system } => {
                self.include(&name, system, end_line, parser, out)?;
            }
            Stmt::Define(..) | Stmt::Undef(_) => self.resync(out, line, end_line),
            Stmt::TypeDef(name, tn) => {
                if let Some((base, shape)) = self.type_name(&tn, true)? {
                    let base = named_base(&base, &name);
                    self.typedefs.define(
                        &name,
                        TypeTemplate::new(base, shape),
                        self.braces,
                        &mut self.diags,
                    );
                }
                let text = self.type_name_text(&tn);
                let _ = write!(out, "/* exec sql type {name} is {text} */");
                self.resync(out, line, end_line);
            }
            Stmt::Var(name, tn) => {
                if let Some((base, shape)) = self.type_name(&tn, false)? {
                    // no struct is emitted here, so a varchar keeps the generic layout
                    let ty = match base {
                        BaseType::Simple(kind @ (TypeKind::Varchar | TypeKind::Bytea)) => {
                            let element = Type::simple(kind, shape.length.clone(), 0);
                            if shape.dimension.is_unset() {
                                element
                            } else {
                                Type::array(element, shape.dimension.clone())
                            }
                        }
                        _ => build_type(&base, &shape, &name, 0),
                    };
                    match self.variables.find_mut(&name) {
                        Some(var) => var.ty = ty,
                        None => self
                            .diags
                            .error(format!("variable \"{name}\" is not declared")),
                    }
                }
                let text = self.type_name_text(&tn);
                let _ = write!(out, "/* exec sql var {name} is {text} */");
                self.resync(out, line, end_line);
            }
            Stmt::Whenever(condition, action) => {
                let _ = write!(
                    out,
                    "/* exec sql whenever {condition} {}; */",
                    action_text(&action)
                );
                self.whenever.set(condition, action);
                line_directive(out, end_line, &self.file);
            }
            Stmt::Connect {
                target,
                name,
                user,
                password,
            } => {
                let (target, default_name) = match target {
                    Target::Default => ("NULL".to_owned(), "\"DEFAULT\"".to_owned()),
                    Target::Literal(text) => (format!("\"{}\"", escape(&text)), "NULL".to_owned()),
                    Target::Host(var) => (var, "NULL".to_owned()),
                };
                let c = |v: Option<Value>| v.map_or_else(|| "NULL".to_owned(), |v| v.to_c());
                let name = name.map_or(default_name, |v| v.to_c());
                output::connect(out, self.options, &target, &c(user), &c(password), &name);
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::Disconnect(target) => {
                let target = match target {
                    DisconnectTarget::Current => "\"CURRENT\"".to_owned(),
                    DisconnectTarget::Default => "\"DEFAULT\"".to_owned(),
                    DisconnectTarget::All => "\"ALL\"".to_owned(),
                    DisconnectTarget::Named(v) => v.to_c(),
                };
                output::disconnect(out, &target);
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::SetConnection(v) => {
                output::set_connection(out, &v.to_c());
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::SetAutocommit(on) => {
                output::set_autocommit(out, on, &conn);
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::Transaction(text) => {
                output::transaction(out, &conn, &text);
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::Prepare { name, source } => {
                output::prepare(out, self.options, &conn, &name.to_c(), &source.to_c());
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::Deallocate(name) => {
                let name = name.map(|v| v.to_c());
                output::deallocate(out, self.options, &conn, name.as_deref());
                self.guard(out, Guard::CLOSE_BLOCK, end_line);
            }
            Stmt::ExecuteImmediate(v) => {
                let expr = v.to_c();
                self.run_statement(
                    out,
                    &conn,
                    StatementKind::ExecImmediate(&expr),
                    &[],
                    &[],
                    Guard::all(),
                    end_line,
                )?;
            }
            Stmt::Execute { name, using, into } => {
                let inputs = self.arguments(&using);
                let outputs = self.arguments(&into);
                let (Some(inputs), Some(outputs)) = (inputs, outputs) else {
                    line_directive(out, end_line, &self.file);
                    return Ok(());
                };
                let name = name.to_c();
                self.run_statement(
                    out,
                    &conn,
                    StatementKind::Execute(&name),
                    &inputs,
                    &outputs,
                    Guard::all(),
                    end_line,
                )?;
            }
            Stmt::DeclareCursor { name, source } => {
                let (command, arguments, results) = match source {
                    CursorSource::Query(q) => {
                        let inputs = self.arguments(&q.inputs);
                        let outputs = self.arguments(&q.outputs);
                        (q.text, inputs, outputs)
                    }
                    CursorSource::Prepared { command, statement } => {
                        let expr = output::prepared_statement(&conn, &statement);
                        let arg = Argument::new(Variable::prepared(expr));
                        (command, Some(vec![arg]), Some(Vec::new()))
                    }
                };
                let _ = write!(out, "/* {} */", command.replace("*/", "* /"));
                if let (Some(arguments), Some(results)) = (arguments, results) {
                    let cursor = Cursor {
                        name,
                        command,
                        connection: conn_key,
                        arguments,
                        results,
                        line,
                        opened: false,
                    };
                    self.cursors.declare(cursor, &mut self.diags);
                }
                line_directive(out, end_line, &self.file);
            }
            Stmt::Open { name, using, into } => {
                let Some(cursor) = self.cursors.open(&name).cloned() else {
                    self.diags
                        .error(format!("cursor \"{name}\" does not exist"));
                    line_directive(out, end_line, &self.file);
                    return Ok(());
                };
                let conn = conn_key
                    .or(cursor.connection)
                    .unwrap_or_else(|| "NULL".to_owned());
                let (Some(using), Some(into)) = (self.arguments(&using), self.arguments(&into))
                else {
                    line_directive(out, end_line, &self.file);
                    return Ok(());
                };
                let mut inputs = cursor.arguments;
                inputs.extend(using);
                let mut outputs = cursor.results;
                outputs.extend(into);
                self.run_statement(
                    out,
                    &conn,
                    StatementKind::Normal(&cursor.command),
                    &inputs,
                    &outputs,
                    Guard::CLOSE_BLOCK,
                    end_line,
                )?;
            }
            Stmt::AllocateDescriptor(v) => {
                let name = v.to_c();
                self.descriptors.add(&name, conn_key.as_deref());
                output::allocate_descriptor(out, &name);
                self.guard(out, Guard::empty(), end_line);
            }
            Stmt::DeallocateDescriptor(v) => {
                let name = v.to_c();
                self.descriptors
                    .drop(&name, conn_key.as_deref(), &mut self.diags);
                output::deallocate_descriptor(out, &name);
                self.guard(out, Guard::empty(), end_line);
            }
            Stmt::GetDescriptorHeader { name, items } => {
                let descriptor = name.to_c();
                self.descriptors
                    .lookup(&descriptor, conn_key.as_deref(), &mut self.diags);
                let mut emitted = false;
                for (var, item) in items {
                    if !item.eq_ignore_ascii_case("count") {
                        self.diags.error(format!(
                            "descriptor header item \"{item}\" is not implemented"
                        ));
                        continue;
                    }
                    let Some(var) = self.lookup(&var) else {
                        continue;
                    };
                    if !var.ty.kind().is_some_and(TypeKind::is_integer) {
                        self.diags.error(format!(
                            "variable \"{}\" must have a numeric type",
                            var.name
                        ));
                        continue;
                    }
                    output::get_descriptor_header(out, &descriptor, &var.name);
                    self.guard(out, Guard::all(), end_line);
                    emitted = true;
                }
                if !emitted {
                    line_directive(out, end_line, &self.file);
                }
            }
            Stmt::GetDescriptor { name, index, items } => {
                let descriptor = name.to_c();
                self.descriptors
                    .lookup(&descriptor, conn_key.as_deref(), &mut self.diags);
                let mut tuples = String::new();
                let mut complete = true;
                for (var, item) in items {
                    if let Some(warning) = item.constant() {
                        self.diags.warning(warning);
                    }
                    let Some(var) = self.lookup(&var) else {
                        complete = false;
                        continue;
                    };
                    if item == Item::Data && zero_length_buffer(&var.ty) {
                        self.diags.error(format!(
                            "variable \"{}\" is a zero-length character buffer",
                            var.name
                        ));
                        complete = false;
                        continue;
                    }
                    let _ = write!(tuples, "{},", item.code());
                    Dumper::new(&mut tuples, &mut self.diags).dump(
                        DumpTarget::new(&var.name, &var.ty),
                        None,
                        &CExpr::new("0"),
                    )?;
                }
                if complete {
                    output::get_descriptor(out, &descriptor, &index.to_c(), &tuples);
                    self.guard(out, Guard::all(), end_line);
                } else {
                    line_directive(out, end_line, &self.file);
                }
            }
            Stmt::SetDescriptorHeader { name, count } => {
                let descriptor = name.to_c();
                self.descriptors
                    .lookup(&descriptor, conn_key.as_deref(), &mut self.diags);
                output::set_descriptor_header(out, &descriptor, &count.to_c());
                self.guard(out, Guard::all(), end_line);
            }
            Stmt::SetDescriptor { name, index, items } => {
                let descriptor = name.to_c();
                self.descriptors
                    .lookup(&descriptor, conn_key.as_deref(), &mut self.diags);
                let mut tuples = String::new();
                let mut complete = true;
                for (item, value) in items {
                    match item.settable() {
                        Settable::Yes => {}
                        Settable::NotImplemented => {
                            self.diags
                                .error(format!("descriptor item \"{item}\" is not implemented"));
                            complete = false;
                            continue;
                        }
                        Settable::No => {
                            self.diags
                                .error(format!("descriptor item \"{item}\" cannot be set"));
                            complete = false;
                            continue;
                        }
                    }
                    let var = match value {
                        Value::Host(h) => match self.lookup(&h.path) {
                            Some(var) => var,
                            None => {
                                complete = false;
                                continue;
                            }
                        },
                        Value::Name(s) | Value::Str(s) | Value::Number(s) => Variable::literal(&s),
                    };
                    let _ = write!(tuples, "{},", item.code());
                    Dumper::new(&mut tuples, &mut self.diags).dump(
                        DumpTarget::new(&var.name, &var.ty),
                        None,
                        &CExpr::new("0"),
                    )?;
                }
                if complete {
                    output::set_descriptor(out, &descriptor, &index.to_c(), &tuples);
                    self.guard(out, Guard::all(), end_line);
                } else {
                    line_directive(out, end_line, &self.file);
                }
            }
            Stmt::Describe {
                input,
                statement,
                descriptor,
            } => {
                if let ArgRef::Descriptor(v) = &descriptor {
                    self.descriptors
                        .lookup(&v.to_c(), conn_key.as_deref(), &mut self.diags);
                }
                let mut tuples = String::new();
                let dumped = match self.argument(&descriptor) {
                    Some(arg) => self.dump_arguments(&[arg], &mut tuples)?,
                    None => false,
                };
                if dumped {
                    output::describe(
                        out,
                        self.options,
                        input,
                        &conn,
                        &statement.to_c(),
                        &tuples,
                    );
                }
                line_directive(out, end_line, &self.file);
            }
            Stmt::Sql(q) => self.sql(q, &conn, end_line, out)?,
        }
        Ok(())
    }

    /// Generic statement sent as text
    fn sql(&mut self, q: Query, conn: &str, end_line: u64, out: &mut String) -> Result<(), Error> {
        let (Some(inputs), Some(outputs)) = (self.arguments(&q.inputs), self.arguments(&q.outputs))
        else {
            line_directive(out, end_line, &self.file);
            return Ok(());
        };
        let first = q.text.split_whitespace().next().unwrap_or("");
        let guard = if matches!(first, "select" | "insert" | "update" | "delete" | "fetch") {
            Guard::all()
        } else {
            Guard::CLOSE_BLOCK
        };
        self.run_statement(
            out,
            conn,
            StatementKind::Normal(&q.text),
            &inputs,
            &outputs,
            guard,
            end_line,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn run_statement(
        &mut self,
        out: &mut String,
        conn: &str,
        statement: StatementKind<'_>,
        inputs: &[Argument],
        outputs: &[Argument],
        guard: Guard,
        line: u64,
    ) -> Result<(), Error> {
        let mut dumped_inputs = String::new();
        let mut dumped_outputs = String::new();
        if !self.dump_arguments(inputs, &mut dumped_inputs)?
            || !self.dump_arguments(outputs, &mut dumped_outputs)?
        {
            line_directive(out, line, &self.file);
            return Ok(());
        }
        output::run_statement(
            out,
            self.options,
            conn,
            statement,
            &dumped_inputs,
            &dumped_outputs,
        );
        self.guard(out, guard, line);
        Ok(())
    }

    // Arguments

    fn lookup(&mut self, path: &str) -> Option<Variable> {
        self.variables
            .resolve(path)
            .map_err(|err| self.diags.error(err.to_string()))
            .ok()
    }

    /// Resolve a reference; `None` when it failed (reported)
    fn argument(&mut self, arg: &ArgRef) -> Option<Argument> {
        match arg {
            ArgRef::Host(h) => {
                let var = self.lookup(&h.path)?;
                let ind = match &h.indicator {
                    Some(path) => {
                        let ind = self.lookup(path)?;
                        if !check_indicator(&ind.ty) {
                            self.diags.error("indicator variable must be integer type");
                            return None;
                        }
                        Some(ind)
                    }
                    None => None,
                };
                Some(Argument { var, ind })
            }
            ArgRef::Descriptor(v) => Some(Argument::new(Variable::descriptor(v.to_c()))),
            ArgRef::Sqlda(name) => {
                let var = self.lookup(name)?;
                Some(Argument::new(Variable::sqlda(var.name)))
            }
            ArgRef::Literal(text) => Some(Argument::new(Variable::literal(text))),
        }
    }

    /// Resolve every reference of a list; `None` if one of them failed
    fn arguments(&mut self, args: &[ArgRef]) -> Option<Vec<Argument>> {
        let mut resolved = Vec::with_capacity(args.len());
        let mut complete = true;
        for arg in args {
            match self.argument(arg) {
                Some(arg) => resolved.push(arg),
                None => complete = false,
            }
        }
        complete.then_some(resolved)
    }

    /// A variable resolved earlier must still denote the same binding
    fn check_hidden(&mut self, arg: &Argument) -> Result<bool, Error> {
        let checked = [(Some(&arg.var), "variable"), (arg.ind.as_ref(), "indicator variable")];
        for (var, what) in checked {
            let Some(var) = var else {
                continue;
            };
            let Some(level) = var.brace_level() else {
                continue;
            };
            match self.variables.resolve(&var.name) {
                Ok(current) => {
                    if !current.ty.same_kind(&var.ty) {
                        return Err(self.diags.fatal(
                            ErrorCode::ParseError,
                            format!(
                                "{what} \"{}\" is hidden by a local variable of a different type",
                                var.name
                            ),
                        ));
                    }
                    if current.brace_level() != Some(level) {
                        self.diags.warning(format!(
                            "{what} \"{}\" is hidden by a local variable",
                            var.name
                        ));
                    }
                }
                Err(err) => {
                    self.diags.error(err.to_string());
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Dump `args` with their indicators; `false` if the statement must be
    /// skipped.
    fn dump_arguments(&mut self, args: &[Argument], out: &mut String) -> Result<bool, Error> {
        for arg in args {
            if !self.check_hidden(arg)? {
                return Ok(false);
            }
        }
        let sentinel = no_indicator();
        let top = CExpr::new("0");
        for arg in args {
            let ind = match &arg.ind {
                Some(ind) => DumpTarget::new(&ind.name, &ind.ty),
                None => DumpTarget::new("", &sentinel),
            };
            Dumper::new(out, &mut self.diags).dump(
                DumpTarget::new(&arg.var.name, &arg.var.ty),
                Some(ind),
                &top,
            )?;
        }
        Ok(true)
    }

    // Include files

    fn include(
        &mut self,
        name: &str,
        system: bool,
        end_line: u64,
        parser: &mut Parser<'_>,
        out: &mut String,
    ) -> Result<(), Error> {
        let lower = name.to_ascii_lowercase();
        let stem = lower.strip_suffix(".h").unwrap_or(&lower);
        if matches!(stem, "sqlca" | "sqlda" | "sqltypes") {
            let _ = write!(out, "#include <{stem}.h>");
            line_directive(out, end_line, &self.file);
            return Ok(());
        }
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(self.diags.fatal(
                ErrorCode::ParseError,
                format!("include file \"{name}\" nested too deeply"),
            ));
        }
        let Some(path) = self.find_include(name, system) else {
            return Err(self.diags.fatal(
                ErrorCode::NoIncludeFile,
                format!("could not open include file \"{name}\""),
            ));
        };
        let input = match fs::read(&path) {
            Ok(input) => input,
            Err(err) => {
                return Err(self.diags.fatal(
                    ErrorCode::NoIncludeFile,
                    format!("could not open include file \"{}\": {err}", path.display()),
                ))
            }
        };
        let file = path.to_string_lossy().into_owned();
        debug!(target: "translate", "including {file}");

        let parent_line = self.diags.line();
        let parent = std::mem::replace(&mut self.file, file.clone());
        self.diags.set_file(&file);
        self.check_encoding(&input)?;
        line_directive(out, 1, &file);

        let mut child = Parser::new(&input, self.options);
        child.set_defines(parser.defines().clone());
        child.set_in_declare_section(parser.in_declare_section());
        self.include_depth += 1;
        let result = self.run(&mut child, out);
        self.include_depth -= 1;
        parser.set_defines(child.defines().clone());

        self.diags.set_file(&parent);
        self.diags.set_line(parent_line);
        self.file = parent;
        result?;
        line_directive(out, end_line, &self.file);
        Ok(())
    }

    /// Directory of the including file, then `-I` paths (then the system
    /// directories with `-i`); `name`, then `name.h`.
    fn find_include(&self, name: &str, system: bool) -> Option<PathBuf> {
        let mut dirs = Vec::new();
        if !system {
            let dir = Path::new(&self.file)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            dirs.push(dir);
        }
        dirs.extend(self.options.include_paths.iter().cloned());
        if self.options.flags.contains(Flags::SYSTEM_INCLUDES) {
            dirs.extend(SYSTEM_INCLUDE_DIRS.iter().map(PathBuf::from));
        }
        let mut candidates = vec![name.to_owned()];
        if Path::new(name).extension().is_none() {
            candidates.push(format!("{name}.h"));
        }
        dirs.iter()
            .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
            .find(|path| path.is_file())
    }
}

/// Struct base named after the typedef declaring it
fn named_base(base: &BaseType, name: &str) -> BaseType {
    match base {
        BaseType::Struct {
            aggregate,
            members,
            type_name: None,
            ..
        } => BaseType::Struct {
            aggregate: *aggregate,
            members: members.clone(),
            type_name: Some(name.to_owned()),
            struct_sizeof: CExpr::new(format!("sizeof({name})")),
        },
        other => other.clone(),
    }
}

fn render_declarator(d: &Declarator) -> String {
    let mut s = "*".repeat(d.pointers);
    s.push_str(&d.name);
    for b in &d.brackets {
        if b.is_zero() {
            s.push_str("[]");
        } else {
            let _ = write!(s, "[{b}]");
        }
    }
    if let Some(width) = &d.bit_width {
        let _ = write!(s, " : {width}");
    }
    if let Some(init) = &d.initializer {
        let _ = write!(s, " = {init}");
    }
    s
}

/// Capacity of `char x[] = init`
fn initializer_capacity(init: &str) -> CExpr {
    if !init.starts_with('"') {
        return CExpr::new(format!("sizeof({init})"));
    }
    let mut len = 0;
    let mut in_string = false;
    let mut chars = init.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_string = !in_string,
            '\\' if in_string => {
                chars.next();
                len += 1;
            }
            _ if in_string => len += 1,
            _ => {}
        }
    }
    CExpr::new((len + 1).to_string())
}

fn zero_length_buffer(ty: &Type) -> bool {
    match ty {
        // `char x[0]` leaves the length unset; a char pointer has length 0
        Type::Simple(s) if s.kind.is_char() => s.size.is_unset(),
        Type::Simple(s) => {
            matches!(s.kind, TypeKind::Varchar | TypeKind::Bytea) && s.size.is_zero()
        }
        _ => false,
    }
}

fn action_text(action: &WhenAction) -> String {
    match action {
        WhenAction::Nothing => "continue".to_owned(),
        WhenAction::Sqlprint => "sqlprint".to_owned(),
        WhenAction::Goto(label) => format!("goto {label}"),
        WhenAction::Do(call) => format!("do {call}"),
        WhenAction::Stop => "stop".to_owned(),
        WhenAction::Break => "do break".to_owned(),
        WhenAction::Continue => "do continue".to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capacity_of_initializers() {
        assert_eq!(initializer_capacity("\"hi\""), CExpr::new("3"));
        assert_eq!(initializer_capacity("\"a\\n\""), CExpr::new("3"));
        assert_eq!(initializer_capacity("\"ab\"\"c\""), CExpr::new("4"));
        assert_eq!(initializer_capacity("name"), CExpr::new("sizeof(name)"));
    }

    #[test]
    fn declarators() {
        let d = Declarator {
            pointers: 1,
            name: "p".to_owned(),
            brackets: vec![CExpr::new("0"), CExpr::new("N")],
            bit_width: None,
            initializer: Some("0".to_owned()),
        };
        assert_eq!(render_declarator(&d), "*p[][N] = 0");
    }

    #[test]
    fn whenever_comments() {
        assert_eq!(action_text(&WhenAction::Goto("err".to_owned())), "goto err");
        assert_eq!(action_text(&WhenAction::Nothing), "continue");
        assert_eq!(action_text(&WhenAction::Do("f()".to_owned())), "do f()");
    }
}
