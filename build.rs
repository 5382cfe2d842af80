use std::env;
use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;

use uncased::UncasedStr;

/// Words with a meaning inside `EXEC SQL ... ;`, matched case-insensitively.
/// The second column is the `Keyword` variant.
const SQL_KEYWORDS: &[[&str; 2]] = &[
    ["ALL", "All"],
    ["ALLOCATE", "Allocate"],
    ["AS", "As"],
    ["AT", "At"],
    ["BEGIN", "Begin"],
    ["BREAK", "Break"],
    ["BY", "By"],
    ["CALL", "Call"],
    ["CARDINALITY", "Cardinality"],
    ["CLOSE", "Close"],
    ["COMMIT", "Commit"],
    ["CONNECT", "Connect"],
    ["CONNECTION", "Connection"],
    ["CONTINUE", "Continue"],
    ["COUNT", "Count"],
    ["CURRENT", "Current"],
    ["CURSOR", "Cursor"],
    ["DATA", "Data"],
    ["DATETIME_INTERVAL_CODE", "DatetimeIntervalCode"],
    ["DATETIME_INTERVAL_PRECISION", "DatetimeIntervalPrecision"],
    ["DEALLOCATE", "Deallocate"],
    ["DECLARE", "Declare"],
    ["DEFAULT", "Default"],
    ["DEFINE", "Define"],
    ["DESCRIBE", "Describe"],
    ["DESCRIPTOR", "Descriptor"],
    ["DISCONNECT", "Disconnect"],
    ["DO", "Do"],
    ["END", "End"],
    ["EXEC", "Exec"],
    ["EXECUTE", "Execute"],
    ["FETCH", "Fetch"],
    ["FOR", "For"],
    ["FOUND", "Found"],
    ["FROM", "From"],
    ["GET", "Get"],
    ["GO", "Go"],
    ["GOTO", "Goto"],
    ["HOLD", "Hold"],
    ["IDENTIFIED", "Identified"],
    ["IMMEDIATE", "Immediate"],
    ["INCLUDE", "Include"],
    ["INDICATOR", "Indicator"],
    ["INPUT", "Input"],
    ["INTO", "Into"],
    ["IS", "Is"],
    ["KEY_MEMBER", "KeyMember"],
    ["LENGTH", "Length"],
    ["NAME", "Name"],
    ["NOT", "Not"],
    ["NULLABLE", "Nullable"],
    ["OCTET_LENGTH", "OctetLength"],
    ["OPEN", "Open"],
    ["OUTPUT", "Output"],
    ["PRECISION", "Precision"],
    ["PREPARE", "Prepare"],
    ["RETURNED_LENGTH", "ReturnedLength"],
    ["RETURNED_OCTET_LENGTH", "ReturnedOctetLength"],
    ["ROLLBACK", "Rollback"],
    ["SCALE", "Scale"],
    ["SECTION", "Section"],
    ["SET", "Set"],
    ["SQL", "Sql"],
    ["SQLERROR", "Sqlerror"],
    ["SQLPRINT", "Sqlprint"],
    ["SQLWARNING", "Sqlwarning"],
    ["START", "Start"],
    ["STOP", "Stop"],
    ["TO", "To"],
    ["TRANSACTION", "Transaction"],
    ["TYPE", "Type"],
    ["UNDEF", "Undef"],
    ["USER", "User"],
    ["USING", "Using"],
    ["VALUE", "Value"],
    ["VAR", "Var"],
    ["WHENEVER", "Whenever"],
    ["WITH", "With"],
    ["WITHOUT", "Without"],
    ["WORK", "Work"],
];

/// Plain SQL words: no meaning for the recognizer, but rendered in lower case
/// inside the generated statement text.
const PLAIN_SQL_KEYWORDS: &[&str] = &[
    "ABSOLUTE", "ADD", "ALTER", "AND", "ANY", "ASC", "BACKWARD", "BETWEEN", "BIGINT", "BINARY",
    "BOOLEAN", "BOTH", "CASCADE", "CASE", "CAST", "CHAR", "CHARACTER", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DATE", "DECIMAL", "DELETE", "DESC", "DISTINCT",
    "DOUBLE", "DROP", "ELSE", "EXCEPT", "EXISTS", "FALSE", "FIRST", "FLOAT", "FOREIGN", "FORWARD",
    "FULL", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSENSITIVE", "INSERT",
    "INT", "INTEGER", "INTERSECT", "INTERVAL", "JOIN", "KEY", "LAST", "LEFT", "LIKE", "LIMIT",
    "NATURAL", "NEXT", "NO", "NULL", "NUMERIC", "OF", "OFFSET", "ON", "ONLY", "OR", "ORDER",
    "OUTER", "PRIMARY", "PRIOR", "REAL", "REFERENCES", "RELATIVE", "RETURNING", "REVOKE", "RIGHT",
    "SCHEMA", "SCROLL", "SELECT", "SMALLINT", "TABLE", "TEMP", "TEMPORARY", "TEXT", "THEN",
    "TIME", "TIMESTAMP", "TRUE", "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "VALUES", "VARCHAR",
    "VIEW", "WHEN", "WHERE",
];

/// Host type words accepted inside declare sections (case-sensitive, as in C).
const C_KEYWORDS: &[[&str; 2]] = &[
    ["VARCHAR", "Varchar"],
    ["auto", "Auto"],
    ["bool", "Bool"],
    ["bytea", "Bytea"],
    ["char", "Char"],
    ["const", "Const"],
    ["date", "Date"],
    ["decimal", "Decimal"],
    ["double", "Double"],
    ["enum", "Enum"],
    ["extern", "Extern"],
    ["float", "Float"],
    ["int", "Int"],
    ["interval", "Interval"],
    ["long", "Long"],
    ["numeric", "Numeric"],
    ["register", "Register"],
    ["short", "Short"],
    ["signed", "Signed"],
    ["sqlda_t", "SqldaT"],
    ["static", "Static"],
    ["string", "String"],
    ["struct", "Struct"],
    ["timestamp", "Timestamp"],
    ["typedef", "Typedef"],
    ["union", "Union"],
    ["unsigned", "Unsigned"],
    ["varchar", "Varchar"],
    ["volatile", "Volatile"],
];

fn build_sql_keyword_map(writer: &mut impl Write) -> Result<()> {
    let mut keywords = phf_codegen::Map::new();
    for [word, variant] in SQL_KEYWORDS {
        keywords.entry(UncasedStr::new(word), format!("Keyword::{variant}"));
    }
    for word in PLAIN_SQL_KEYWORDS {
        keywords.entry(UncasedStr::new(word), "Keyword::Plain");
    }
    writeln!(
        writer,
        "static KEYWORDS: ::phf::Map<&'static UncasedStr, Keyword> = \n{};",
        keywords.build()
    )
}

fn build_c_keyword_map(writer: &mut impl Write) -> Result<()> {
    let mut keywords = phf_codegen::Map::new();
    for [word, variant] in C_KEYWORDS {
        keywords.entry(*word, format!("CKeyword::{variant}"));
    }
    writeln!(
        writer,
        "static C_KEYWORDS: ::phf::Map<&'static str, CKeyword> = \n{};",
        keywords.build()
    )
}

fn main() -> Result<()> {
    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);
    let mut writer = BufWriter::new(File::create(out_path.join("keywords.rs"))?);
    build_sql_keyword_map(&mut writer)?;
    build_c_keyword_map(&mut writer)?;
    writer.flush()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
