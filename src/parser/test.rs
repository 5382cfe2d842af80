use fallible_iterator::FallibleIterator;

use super::ast::*;
use super::{Parser, ParserError};
use crate::config::{CompatMode, Options};
use crate::descriptor::Item;
use crate::error::Error;
use crate::types::{Aggregate, CExpr, TypeKind};
use crate::whenever::{Condition, WhenAction};

fn chunks_with(input: &str, options: &Options) -> Result<Vec<Chunk>, Error> {
    let mut parser = Parser::new(input.as_bytes(), options);
    let mut chunks = Vec::new();
    while let Some(chunk) = parser.next()? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn chunks(input: &str) -> Vec<Chunk> {
    chunks_with(input, &Options::default()).unwrap()
}

fn stmt(input: &str) -> Stmt {
    exec(input).stmt
}

fn exec(input: &str) -> Exec {
    chunks(input)
        .into_iter()
        .find_map(|c| match c {
            Chunk::Exec(e) => Some(e),
            _ => None,
        })
        .unwrap()
}

fn query(input: &str) -> Query {
    match stmt(input) {
        Stmt::Sql(q) => q,
        other => panic!("unexpected {other:?}"),
    }
}

fn parse_error(input: &str) -> ParserError {
    match chunks_with(input, &Options::default()) {
        Err(Error::Parser(err, _)) => err,
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn host_text_is_passed_through() {
    let input = "#include <stdio.h>\nint main(void)\n";
    assert_eq!(chunks(input), vec![Chunk::Text(input.to_owned())]);
}

#[test]
fn braces_are_split_out() {
    assert_eq!(
        chunks("f() { x; }"),
        vec![
            Chunk::Text("f() ".to_owned()),
            Chunk::OpenBrace,
            Chunk::Text(" x; ".to_owned()),
            Chunk::CloseBrace,
        ]
    );
}

#[test]
fn exec_without_sql_is_host_code() {
    assert_eq!(
        chunks("exec (x);"),
        vec![Chunk::Text("exec (x);".to_owned())]
    );
}

#[test]
fn exec_sql_is_case_insensitive() {
    let e = exec("  EXEC Sql COMMIT;\n");
    assert_eq!(e.line, 1);
    assert_eq!(e.stmt, Stmt::Transaction("commit".to_owned()));
}

#[test]
fn statement_spanning_lines() {
    let e = exec("\nexec sql\n commit\n work;");
    assert_eq!(e.line, 2);
    assert_eq!(e.end_line, 4);
    assert_eq!(e.stmt, Stmt::Transaction("commit work".to_owned()));
}

#[test]
fn unterminated_statement() {
    assert_eq!(parse_error("exec sql commit"), ParserError::UnexpectedEof);
}

#[test]
fn host_text_before_error_is_kept() {
    let mut parser = Parser::new(b"int a;\nexec sql connect;", &Options::default());
    assert_eq!(
        parser.next().unwrap(),
        Some(Chunk::Text("int a;\n".to_owned()))
    );
    assert!(parser.next().is_err());
}

#[test]
fn select_into() {
    let q = query("exec sql SELECT a, b INTO :x, :y INDICATOR :y_ind FROM t WHERE c = :k;");
    assert_eq!(q.text, "select a , b from t where c = $1");
    assert_eq!(q.inputs, vec![ArgRef::Host(HostRef::new("k"))]);
    assert_eq!(
        q.outputs,
        vec![
            ArgRef::Host(HostRef::new("x")),
            ArgRef::Host(HostRef {
                path: "y".to_owned(),
                indicator: Some("y_ind".to_owned()),
            }),
        ]
    );
}

#[test]
fn identifiers_keep_their_case() {
    let q = query("exec sql Insert Into MyTable Values (:a:a_ind, 'Text');");
    assert_eq!(q.text, "insert into MyTable values ( $1 , 'Text' )");
    assert_eq!(
        q.inputs,
        vec![ArgRef::Host(HostRef {
            path: "a".to_owned(),
            indicator: Some("a_ind".to_owned()),
        })]
    );
}

#[test]
fn member_paths() {
    let q = query("exec sql insert into t values (:rec.name, :p->id, :arr[i + 1]);");
    let paths: Vec<_> = q
        .inputs
        .iter()
        .map(|a| match a {
            ArgRef::Host(h) => h.path.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(paths, vec!["rec.name", "p->id", "arr[i+1]"]);
}

#[test]
fn dollar_host_variables() {
    assert!(matches!(
        parse_error("exec sql select 1 into $x;"),
        ParserError::Custom(_)
    ));
    let options = Options {
        compat: CompatMode::Informix,
        ..Options::default()
    };
    let chunks = chunks_with("exec sql select 1 into $x;", &options).unwrap();
    let Chunk::Exec(Exec {
        stmt: Stmt::Sql(q), ..
    }) = &chunks[0]
    else {
        panic!("unexpected {chunks:?}");
    };
    assert_eq!(q.outputs, vec![ArgRef::Host(HostRef::new("x"))]);
}

#[test]
fn positional_parameters_are_kept() {
    let q = query("exec sql select $1::int;");
    assert_eq!(q.text, "select $1 :: int");
    assert!(q.inputs.is_empty());
}

#[test]
fn into_descriptor() {
    let q = query("exec sql fetch next from c into sql descriptor mydesc;");
    assert_eq!(q.text, "fetch next from c");
    assert_eq!(
        q.outputs,
        vec![ArgRef::Descriptor(Value::Name("mydesc".to_owned()))]
    );
}

#[test]
fn at_connection() {
    let e = exec("exec sql at con1 select 1;");
    assert_eq!(e.connection, Some(Value::Name("con1".to_owned())));
    let e = exec("exec sql at :con select 1;");
    assert_eq!(e.connection, Some(Value::Host(HostRef::new("con"))));
}

#[test]
fn declare_section() {
    let c = chunks(
        "exec sql begin declare section;\n\
         int a, *b[3];\n\
         exec sql end declare section;\n",
    );
    assert!(matches!(
        &c[0],
        Chunk::Exec(Exec {
            stmt: Stmt::BeginDeclare,
            ..
        })
    ));
    let decl = c
        .iter()
        .find_map(|c| match c {
            Chunk::Declaration(d) => Some(d),
            _ => None,
        })
        .unwrap();
    assert_eq!(decl.line, 2);
    assert_eq!(
        decl.spec,
        TypeSpec::Simple {
            kind: TypeKind::Int,
            text: "int".to_owned()
        }
    );
    assert_eq!(decl.declarators.len(), 2);
    assert_eq!(decl.declarators[1].pointers, 1);
    assert_eq!(decl.declarators[1].brackets, vec![CExpr::new("3")]);
    assert!(matches!(
        c.last(),
        Some(Chunk::Text(_))
    ));
    assert!(c.iter().any(|c| matches!(
        c,
        Chunk::Exec(Exec {
            stmt: Stmt::EndDeclare,
            ..
        })
    )));
}

#[test]
fn arithmetic_types() {
    let kind = |text: &str| {
        let input = format!("exec sql begin declare section; {text} x; exec sql end declare section;");
        chunks(&input)
            .into_iter()
            .find_map(|c| match c {
                Chunk::Declaration(Declaration {
                    spec: TypeSpec::Simple { kind, .. },
                    ..
                }) => Some(kind),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(kind("unsigned"), TypeKind::UnsignedInt);
    assert_eq!(kind("long int"), TypeKind::Long);
    assert_eq!(kind("unsigned long long"), TypeKind::UnsignedLongLong);
    assert_eq!(kind("short int"), TypeKind::Short);
    assert_eq!(kind("unsigned char"), TypeKind::UnsignedChar);
    assert_eq!(kind("long double"), TypeKind::Double);
}

#[test]
fn struct_declaration() {
    let c = chunks(
        "exec sql begin declare section;\n\
         struct rec { int id; char name[20]; } r = {0};\n\
         exec sql end declare section;",
    );
    let decl = c
        .iter()
        .find_map(|c| match c {
            Chunk::Declaration(d) => Some(d),
            _ => None,
        })
        .unwrap();
    let TypeSpec::Struct {
        aggregate,
        tag,
        body: Some(members),
    } = &decl.spec
    else {
        panic!("unexpected {decl:?}");
    };
    assert_eq!(*aggregate, Aggregate::Struct);
    assert_eq!(tag.as_deref(), Some("rec"));
    assert_eq!(members.len(), 2);
    assert_eq!(decl.declarators[0].initializer.as_deref(), Some("{0}"));
}

#[test]
fn empty_brackets() {
    let c = chunks("exec sql begin declare section; char s[] = \"hi\"; exec sql end declare section;");
    let decl = c
        .iter()
        .find_map(|c| match c {
            Chunk::Declaration(d) => Some(d),
            _ => None,
        })
        .unwrap();
    assert_eq!(decl.declarators[0].brackets, vec![CExpr::new("0")]);
    assert_eq!(decl.declarators[0].initializer.as_deref(), Some("\"hi\""));
}

#[test]
fn preprocessor_lines_in_declare_section() {
    let c = chunks("exec sql begin declare section;\n#define N 3\nexec sql end declare section;");
    assert!(c
        .iter()
        .any(|c| matches!(c, Chunk::Text(t) if t.contains("#define N 3"))));
    assert!(!c.iter().any(|c| matches!(c, Chunk::Declaration(_))));
}

#[test]
fn include() {
    assert_eq!(
        stmt("exec sql include sqlca;"),
        Stmt::Include {
            name: "sqlca".to_owned(),
            system: false
        }
    );
    assert_eq!(
        stmt("exec sql include \"my.h\";"),
        Stmt::Include {
            name: "my.h".to_owned(),
            system: false
        }
    );
    assert_eq!(
        stmt("exec sql include <my.h>;"),
        Stmt::Include {
            name: "my.h".to_owned(),
            system: true
        }
    );
}

#[test]
fn define_is_substituted() {
    let c = chunks("exec sql define LEN 10;\nexec sql select :a from t limit LEN;");
    let Some(Chunk::Exec(Exec {
        stmt: Stmt::Sql(q), ..
    })) = c.last()
    else {
        panic!("unexpected {c:?}");
    };
    assert_eq!(q.text, "select $1 from t limit 10");
}

#[test]
fn undef() {
    let c = chunks("exec sql define LEN 10;\nexec sql undef LEN;\nexec sql select LEN;");
    let Some(Chunk::Exec(Exec {
        stmt: Stmt::Sql(q), ..
    })) = c.last()
    else {
        panic!("unexpected {c:?}");
    };
    assert_eq!(q.text, "select LEN");
}

#[test]
fn redefine_after_undef() {
    let c = chunks(
        "exec sql define LEN 10;\nexec sql undef LEN;\nexec sql define LEN 20;\nexec sql select LEN;",
    );
    assert!(c.iter().any(|c| matches!(
        c,
        Chunk::Exec(Exec { stmt: Stmt::Undef(name), .. }) if name == "LEN"
    )));
    let Some(Chunk::Exec(Exec {
        stmt: Stmt::Sql(q), ..
    })) = c.last()
    else {
        panic!("unexpected {c:?}");
    };
    assert_eq!(q.text, "select 20");
}

#[test]
fn command_line_defines() {
    let mut options = Options::default();
    options.define("N=5");
    let c = chunks_with("exec sql select N;", &options).unwrap();
    let Some(Chunk::Exec(Exec {
        stmt: Stmt::Sql(q), ..
    })) = c.last()
    else {
        panic!("unexpected {c:?}");
    };
    assert_eq!(q.text, "select 5");
}

#[test]
fn type_and_var() {
    assert_eq!(
        stmt("exec sql type str is varchar[10];"),
        Stmt::TypeDef(
            "str".to_owned(),
            TypeName {
                spec: TypeSpec::Simple {
                    kind: TypeKind::Varchar,
                    text: "varchar".to_owned()
                },
                pointers: 0,
                brackets: vec![CExpr::new("10")],
            }
        )
    );
    assert!(matches!(
        stmt("exec sql var buf is char[80];"),
        Stmt::Var(name, _) if name == "buf"
    ));
}

#[test]
fn whenever() {
    assert_eq!(
        stmt("exec sql whenever sqlerror goto err;"),
        Stmt::Whenever(Condition::Error, WhenAction::Goto("err".to_owned()))
    );
    assert_eq!(
        stmt("exec sql whenever not found do break;"),
        Stmt::Whenever(Condition::NotFound, WhenAction::Break)
    );
    assert_eq!(
        stmt("exec sql whenever sqlwarning sqlprint;"),
        Stmt::Whenever(Condition::Warning, WhenAction::Sqlprint)
    );
    assert_eq!(
        stmt("exec sql whenever sqlerror do handle(1, \"x\");"),
        Stmt::Whenever(
            Condition::Error,
            WhenAction::Do("handle(1,\"x\")".to_owned())
        )
    );
    assert_eq!(
        stmt("exec sql whenever sqlerror go to done;"),
        Stmt::Whenever(Condition::Error, WhenAction::Goto("done".to_owned()))
    );
    assert_eq!(
        stmt("exec sql whenever sqlerror continue;"),
        Stmt::Whenever(Condition::Error, WhenAction::Nothing)
    );
}

#[test]
fn connect() {
    assert_eq!(
        stmt("exec sql connect to testdb as con1 user postgres;"),
        Stmt::Connect {
            target: Target::Literal("testdb".to_owned()),
            name: Some(Value::Name("con1".to_owned())),
            user: Some(Value::Name("postgres".to_owned())),
            password: None,
        }
    );
    assert_eq!(
        stmt("exec sql connect to db@localhost:5432 user :u identified by :pw;"),
        Stmt::Connect {
            target: Target::Literal("db@localhost:5432".to_owned()),
            name: None,
            user: Some(Value::Host(HostRef::new("u"))),
            password: Some(Value::Host(HostRef::new("pw"))),
        }
    );
    assert_eq!(
        stmt("exec sql connect to :target;"),
        Stmt::Connect {
            target: Target::Host("target".to_owned()),
            name: None,
            user: None,
            password: None,
        }
    );
    assert!(matches!(
        stmt("exec sql connect to default;"),
        Stmt::Connect {
            target: Target::Default,
            ..
        }
    ));
}

#[test]
fn connect_protocols() {
    assert!(matches!(
        stmt("exec sql connect to tcp:postgresql://localhost/db;"),
        Stmt::Connect {
            target: Target::Literal(t),
            ..
        } if t == "tcp:postgresql://localhost/db"
    ));
    assert_eq!(
        parse_error("exec sql connect to udp:postgresql://localhost/db;"),
        ParserError::Custom("invalid connection type: udp".to_owned())
    );
    assert_eq!(
        parse_error("exec sql connect to tcp:mysql://localhost/db;"),
        ParserError::Custom("expected \"postgresql\", found \"mysql\"".to_owned())
    );
}

#[test]
fn disconnect() {
    assert_eq!(
        stmt("exec sql disconnect;"),
        Stmt::Disconnect(DisconnectTarget::Current)
    );
    assert_eq!(
        stmt("exec sql disconnect all;"),
        Stmt::Disconnect(DisconnectTarget::All)
    );
    assert_eq!(
        stmt("exec sql disconnect con1;"),
        Stmt::Disconnect(DisconnectTarget::Named(Value::Name("con1".to_owned())))
    );
}

#[test]
fn set_statements() {
    assert_eq!(
        stmt("exec sql set connection to con2;"),
        Stmt::SetConnection(Value::Name("con2".to_owned()))
    );
    assert_eq!(
        stmt("exec sql set autocommit = on;"),
        Stmt::SetAutocommit(true)
    );
    assert_eq!(
        stmt("exec sql set autocommit to off;"),
        Stmt::SetAutocommit(false)
    );
    assert!(matches!(
        query("exec sql set datestyle to iso;").text.as_str(),
        "set datestyle to iso"
    ));
}

#[test]
fn prepare_execute() {
    assert_eq!(
        stmt("exec sql prepare s from :q;"),
        Stmt::Prepare {
            name: Value::Name("s".to_owned()),
            source: Value::Host(HostRef::new("q")),
        }
    );
    assert_eq!(
        stmt("exec sql execute s using :a, 5 into :b;"),
        Stmt::Execute {
            name: Value::Name("s".to_owned()),
            using: vec![
                ArgRef::Host(HostRef::new("a")),
                ArgRef::Literal("5".to_owned())
            ],
            into: vec![ArgRef::Host(HostRef::new("b"))],
        }
    );
    assert_eq!(
        stmt("exec sql execute immediate :cmd;"),
        Stmt::ExecuteImmediate(Value::Host(HostRef::new("cmd")))
    );
    assert_eq!(
        stmt("exec sql deallocate prepare s;"),
        Stmt::Deallocate(Some(Value::Name("s".to_owned())))
    );
    assert_eq!(stmt("exec sql deallocate all;"), Stmt::Deallocate(None));
}

#[test]
fn declare_cursor() {
    let Stmt::DeclareCursor { name, source } =
        stmt("exec sql declare c cursor for select a from t where b = :k;")
    else {
        panic!();
    };
    assert_eq!(name, "c");
    let CursorSource::Query(q) = source else {
        panic!("unexpected {source:?}");
    };
    assert_eq!(q.text, "declare c cursor for select a from t where b = $1");
    assert_eq!(q.inputs.len(), 1);
}

#[test]
fn declare_cursor_for_prepared_statement() {
    assert_eq!(
        stmt("exec sql declare c scroll cursor with hold for s;"),
        Stmt::DeclareCursor {
            name: "c".to_owned(),
            source: CursorSource::Prepared {
                command: "declare c scroll cursor with hold for $1".to_owned(),
                statement: "s".to_owned(),
            },
        }
    );
}

#[test]
fn open_cursor() {
    assert_eq!(
        stmt("exec sql open c using :k;"),
        Stmt::Open {
            name: "c".to_owned(),
            using: vec![ArgRef::Host(HostRef::new("k"))],
            into: vec![],
        }
    );
}

#[test]
fn descriptors() {
    assert_eq!(
        stmt("exec sql allocate descriptor d;"),
        Stmt::AllocateDescriptor(Value::Name("d".to_owned()))
    );
    assert_eq!(
        stmt("exec sql deallocate sql descriptor d;"),
        Stmt::DeallocateDescriptor(Value::Name("d".to_owned()))
    );
    assert_eq!(
        stmt("exec sql get descriptor d :n = count;"),
        Stmt::GetDescriptorHeader {
            name: Value::Name("d".to_owned()),
            items: vec![("n".to_owned(), "count".to_owned())],
        }
    );
    assert_eq!(
        stmt("exec sql get descriptor d value 1 :v = data, :l = length;"),
        Stmt::GetDescriptor {
            name: Value::Name("d".to_owned()),
            index: Value::Number("1".to_owned()),
            items: vec![("v".to_owned(), Item::Data), ("l".to_owned(), Item::Length)],
        }
    );
    assert_eq!(
        stmt("exec sql set descriptor d count = 2;"),
        Stmt::SetDescriptorHeader {
            name: Value::Name("d".to_owned()),
            count: Value::Number("2".to_owned()),
        }
    );
    assert_eq!(
        stmt("exec sql set descriptor d value :i data = :v;"),
        Stmt::SetDescriptor {
            name: Value::Name("d".to_owned()),
            index: Value::Host(HostRef::new("i")),
            items: vec![(Item::Data, Value::Host(HostRef::new("v")))],
        }
    );
}

#[test]
fn describe() {
    assert_eq!(
        stmt("exec sql describe s into sql descriptor d;"),
        Stmt::Describe {
            input: false,
            statement: Value::Name("s".to_owned()),
            descriptor: ArgRef::Descriptor(Value::Name("d".to_owned())),
        }
    );
    assert_eq!(
        stmt("exec sql describe input s using descriptor da;"),
        Stmt::Describe {
            input: true,
            statement: Value::Name("s".to_owned()),
            descriptor: ArgRef::Sqlda("da".to_owned()),
        }
    );
}

#[test]
fn trailing_tokens() {
    assert!(matches!(
        parse_error("exec sql disconnect all now;"),
        ParserError::SyntaxError { .. }
    ));
}
