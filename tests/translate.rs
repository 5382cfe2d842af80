use std::fs;

use ecpg_preproc::config::{Flags, Options};
use ecpg_preproc::error::{ErrorCode, Severity};
use ecpg_preproc::TranslationContext;

fn regression() -> Options {
    let mut options = Options::default();
    options.flags |= Flags::REGRESSION;
    options
}

fn translate_with<'a>(input: &str, options: &'a Options) -> (String, TranslationContext<'a>) {
    let mut ctx = TranslationContext::new("test.pgc", options);
    let out = ctx.translate(input.as_bytes()).unwrap();
    (out, ctx)
}

fn declare(decls: &str, body: &str) -> String {
    format!("EXEC SQL BEGIN DECLARE SECTION;\n{decls}\nEXEC SQL END DECLARE SECTION;\n{body}\n")
}

#[test]
fn select_into_int() {
    let options = regression();
    let (out, ctx) = translate_with(&declare("int x;", "EXEC SQL SELECT 1 INTO :x;"), &options);
    assert!(out.starts_with("/* Processed by ecpg (regression mode) */\n"));
    assert!(out.contains(
        "{ ECPGdo(__LINE__, 0, 1, NULL, 0, ECPGst_normal, \"select 1\", ECPGt_EOIT, \
         \n\tECPGt_int,&(x),(long)1,(long)1,sizeof(int), \
         \n\tECPGt_NO_INDICATOR, NULL , 0L, 0L, 0L, ECPGt_EORT);}"
    ));
    assert!(out.contains("int x;"));
    assert!(ctx.diagnostics().reported().is_empty());
    assert_eq!(ctx.diagnostics().status(), None);
}

#[test]
fn char_buffer_input() {
    let options = regression();
    let (out, _) = translate_with(
        &declare("char buf[10];", "EXEC SQL INSERT INTO t VALUES (:buf);"),
        &options,
    );
    assert!(out.contains("\"insert into t values ( $1 )\", \n\tECPGt_char,(buf),(long)10,(long)1,(10)*sizeof(char), "));
}

#[test]
fn indicator_is_dumped_after_its_variable() {
    let options = regression();
    let (out, _) = translate_with(
        &declare("short v, ind;", "EXEC SQL SELECT a INTO :v:ind FROM t;"),
        &options,
    );
    assert!(out.contains(
        "\n\tECPGt_short,&(v),(long)1,(long)1,sizeof(short), \
         \n\tECPGt_short,&(ind),(long)1,(long)1,sizeof(short), ECPGt_EORT);"
    ));
}

#[test]
fn array_indicator_for_scalar_is_fatal() {
    let options = regression();
    let mut ctx = TranslationContext::new("test.pgc", &options);
    let err = ctx
        .translate(declare("int v; int ind[5];", "EXEC SQL SELECT a INTO :v:ind FROM t;").as_bytes())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndicatorNotSimple);
    let diags = ctx.into_diagnostics();
    assert_eq!(diags.count(Severity::Fatal), 1);
    assert_eq!(diags.status(), Some(ErrorCode::IndicatorNotSimple));
}

#[test]
fn whenever_guards_following_statements() {
    let options = regression();
    let (out, _) = translate_with(
        "EXEC SQL WHENEVER SQLERROR GOTO err;\nEXEC SQL COMMIT;\n",
        &options,
    );
    assert!(out.contains("/* exec sql whenever sqlerror goto err; */"));
    assert!(out.contains(
        "{ ECPGtrans(__LINE__, NULL, \"commit\");\
         \n#line 2 \"test.pgc\"\n\nif (sqlca.sqlcode < 0) goto err;}\
         \n#line 2 \"test.pgc\"\n"
    ));
}

#[test]
fn not_found_only_guards_row_statements() {
    let options = regression();
    let (out, _) = translate_with(
        &declare(
            "int x;",
            "EXEC SQL WHENEVER NOT FOUND DO BREAK;\n\
             EXEC SQL FETCH c INTO :x;\n\
             EXEC SQL CREATE TABLE t (a int);",
        ),
        &options,
    );
    assert_eq!(out.matches("if (sqlca.sqlcode == ECPG_NOT_FOUND) break;").count(), 1);
}

#[test]
fn undeclared_variable_skips_the_statement() {
    let options = regression();
    let (out, ctx) = translate_with("EXEC SQL SELECT 1 INTO :nope;\nint after;\n", &options);
    assert!(!out.contains("ECPGdo"));
    assert!(out.contains("int after;"));
    let reported = ctx.diagnostics().reported();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].message, "variable \"nope\" is not declared");
    assert_eq!(reported[0].line, 1);
    assert_eq!(ctx.diagnostics().status(), Some(ErrorCode::ParseError));
}

#[test]
fn grammar_error_does_not_stop_translation() {
    let options = regression();
    let (out, ctx) = translate_with("EXEC SQL CONNECT;\nEXEC SQL COMMIT;\n", &options);
    assert!(out.contains("ECPGtrans(__LINE__, NULL, \"commit\")"));
    assert_eq!(ctx.diagnostics().count(Severity::Error), 1);
}

#[test]
fn variables_go_out_of_scope() {
    let options = regression();
    let (_, ctx) = translate_with(
        "void f(void) {\nEXEC SQL BEGIN DECLARE SECTION;\nint x;\nEXEC SQL END DECLARE SECTION;\n}\n\
         EXEC SQL SELECT 1 INTO :x;\n",
        &options,
    );
    let reported = ctx.diagnostics().reported();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].line, 6);
}

#[test]
fn varchar_declaration_becomes_a_struct() {
    let options = regression();
    let (out, _) = translate_with(
        &declare("varchar name[20];", "EXEC SQL SELECT n INTO :name FROM t;"),
        &options,
    );
    assert!(out.contains("struct varchar_name_1 { int len; char arr[20]; } name;"));
    assert!(out.contains("\n\tECPGt_varchar,&(name),(long)20,(long)1,sizeof(struct varchar_name_1), "));
}

#[test]
fn cursors() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "int k; int x;",
            "EXEC SQL DECLARE c CURSOR FOR SELECT a FROM t WHERE b = :k;\n\
             EXEC SQL DECLARE unused CURSOR FOR SELECT 1;\n\
             EXEC SQL OPEN c;\n\
             EXEC SQL OPEN missing;",
        ),
        &options,
    );
    assert!(out.contains("/* declare c cursor for select a from t where b = $1 */"));
    assert!(out.contains(
        "ECPGst_normal, \"declare c cursor for select a from t where b = $1\", \
         \n\tECPGt_int,&(k),(long)1,(long)1,sizeof(int), "
    ));
    let messages: Vec<_> = ctx
        .diagnostics()
        .reported()
        .iter()
        .map(|d| (d.severity, d.message.as_str()))
        .collect();
    assert_eq!(
        messages,
        vec![
            (Severity::Error, "cursor \"missing\" does not exist"),
            (
                Severity::Warning,
                "cursor \"unused\" has been declared but not opened"
            ),
        ]
    );
}

#[test]
fn connect_and_disconnect() {
    let options = regression();
    let (out, _) = translate_with(
        "EXEC SQL CONNECT TO DEFAULT;\nEXEC SQL DISCONNECT ALL;\n",
        &options,
    );
    assert!(out.contains("{ ECPGconnect(__LINE__, 0, NULL, NULL, NULL, \"DEFAULT\", 0); }"));
    assert!(out.contains("{ ECPGdisconnect(__LINE__, \"ALL\");}"));

    let mut options = regression();
    options.flags |= Flags::AUTOCOMMIT;
    let (out, _) = translate_with("EXEC SQL CONNECT TO db;\n", &options);
    assert!(out.contains("{ ECPGconnect(__LINE__, 0, \"db\", NULL, NULL, NULL, 1); }"));
}

#[test]
fn prepared_statements() {
    let options = regression();
    let (out, _) = translate_with(
        &declare(
            "char *stmt; int x;",
            "EXEC SQL PREPARE s FROM :stmt;\nEXEC SQL EXECUTE s INTO :x;",
        ),
        &options,
    );
    assert!(out.contains("{ ECPGprepare(__LINE__, NULL, 0, \"s\", stmt);"));
    assert!(out.contains("ECPGst_execute, \"s\", ECPGt_EOIT, \n\tECPGt_int,&(x)"));
}

#[test]
fn descriptors() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "int n; char name[32];",
            "EXEC SQL ALLOCATE DESCRIPTOR d;\n\
             EXEC SQL GET DESCRIPTOR d :n = COUNT;\n\
             EXEC SQL GET DESCRIPTOR d VALUE 1 :name = NAME;\n\
             EXEC SQL DEALLOCATE DESCRIPTOR d;",
        ),
        &options,
    );
    assert!(out.contains("ECPGallocate_desc(__LINE__, \"d\");"));
    assert!(out.contains("{ ECPGget_desc_header(__LINE__, \"d\", &(n));"));
    assert!(out.contains(
        "{ ECPGget_desc(__LINE__, \"d\", 1,ECPGd_name,\n\tECPGt_char,(name),(long)32,(long)1,(32)*sizeof(char), ECPGd_EODT);"
    ));
    assert!(out.contains("ECPGdeallocate_desc(__LINE__, \"d\");"));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn includes_are_translated_inline() {
    let dir = std::env::temp_dir().join(format!("ecpg-include-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("vars.h"),
        "EXEC SQL BEGIN DECLARE SECTION;\nint shared;\nEXEC SQL END DECLARE SECTION;\n",
    )
    .unwrap();

    let mut options = regression();
    options.include_paths.push(dir.clone());
    let (out, ctx) = translate_with(
        "EXEC SQL INCLUDE sqlca;\nEXEC SQL INCLUDE vars;\nEXEC SQL SELECT 1 INTO :shared;\n",
        &options,
    );
    assert!(out.contains("#include <sqlca.h>"));
    assert!(out.contains(&format!("#line 1 \"{}\"", dir.join("vars.h").display())));
    assert!(out.contains("ECPGt_int,&(shared)"));
    assert!(out.contains("\n#line 2 \"test.pgc\"\n"));
    assert!(ctx.diagnostics().reported().is_empty());

    let mut ctx = TranslationContext::new("test.pgc", &options);
    let err = ctx.translate(b"EXEC SQL INCLUDE nowhere;\n").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoIncludeFile);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn typedefs_and_structs() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "typedef struct { int id; char name[20]; } person;\nperson p;",
            "EXEC SQL SELECT id, name INTO :p FROM t;",
        ),
        &options,
    );
    assert!(out.contains("\n\tECPGt_int,&(p.id),(long)1,(long)1,sizeof(person), "));
    assert!(out.contains("\n\tECPGt_char,&(p.name),(long)20,(long)1,sizeof(person), "));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn exec_sql_var_retypes_a_variable() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "char raw[8];",
            "EXEC SQL VAR raw IS int;\nEXEC SQL SELECT 1 INTO :raw;",
        ),
        &options,
    );
    assert!(out.contains("/* exec sql var raw is int */"));
    assert!(out.contains("ECPGt_int,&(raw)"));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn varchar_wrappers_are_numbered_per_declaration() {
    let options = regression();
    let (out, _) = translate_with(
        &declare(
            "varchar s[5];",
            "void f(void) {\nEXEC SQL BEGIN DECLARE SECTION;\nvarchar s[8];\nEXEC SQL END DECLARE SECTION;\n}",
        ),
        &options,
    );
    assert!(out.contains("struct varchar_s_1 { int len; char arr[5]; } s;"));
    assert!(out.contains("struct varchar_s_2 { int len; char arr[8]; } s;"));
}

#[test]
fn placeholders_follow_order_of_appearance() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "int a; char s[4]; short b;",
            "EXEC SQL INSERT INTO t VALUES (:b, :s, :a);",
        ),
        &options,
    );
    assert!(out.contains("\"insert into t values ( $1 , $2 , $3 )\""));
    let b = out.find("ECPGt_short,&(b)").unwrap();
    let s = out.find("ECPGt_char,(s),(long)4").unwrap();
    let a = out.find("ECPGt_int,&(a)").unwrap();
    assert!(b < s && s < a);
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn symbol_can_be_redefined_after_undef() {
    let options = regression();
    let (out, ctx) = translate_with(
        "EXEC SQL DEFINE LEN 10;\nEXEC SQL UNDEF LEN;\nEXEC SQL DEFINE LEN 20;\nEXEC SQL SELECT LEN;\n",
        &options,
    );
    assert!(out.contains("ECPGst_normal, \"select 20\""));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn var_as_varchar_uses_the_generic_struct() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "struct { int len; char arr[10]; } v;",
            "EXEC SQL VAR v IS varchar[10];\nEXEC SQL SELECT a INTO :v FROM t;",
        ),
        &options,
    );
    assert!(out.contains("\n\tECPGt_varchar,&(v),(long)10,(long)1,sizeof(struct varchar), "));
    assert!(!out.contains("varchar_v_"));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn descriptor_data_into_char_pointer() {
    let options = regression();
    let (out, ctx) = translate_with(
        &declare(
            "char *p;",
            "EXEC SQL ALLOCATE DESCRIPTOR d;\nEXEC SQL GET DESCRIPTOR d VALUE 1 :p = DATA;",
        ),
        &options,
    );
    assert!(out.contains("{ ECPGget_desc(__LINE__, \"d\", 1,ECPGd_data,\n\tECPGt_char,"));
    assert!(ctx.diagnostics().reported().is_empty());
}

#[test]
fn non_utf8_input_is_fatal() {
    let options = regression();
    let mut ctx = TranslationContext::new("test.pgc", &options);
    let err = ctx.translate(b"int x;\n/* caf\xe9 */\n").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParseError);
    let diags = ctx.into_diagnostics();
    let reported = diags.reported();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].severity, Severity::Fatal);
    assert_eq!(reported[0].line, 2);
    assert!(reported[0].message.contains("invalid UTF-8"));
}
