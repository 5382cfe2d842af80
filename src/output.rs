//! Generated C text: preamble, line directives and runtime library calls.
//!
//! Emitters only format; argument tuples are produced by
//! [`crate::types::dump`] and the `WHENEVER` guard by [`crate::whenever`].
use std::fmt::Write;

use crate::config::{Flags, Options};
use crate::types::dump::escape;

/// `#line` directive mapping generated text back to `file:line`
pub fn line_directive(out: &mut String, line: u64, file: &str) {
    let _ = write!(out, "\n#line {line} \"{}\"\n", escape(file));
}

/// Text heading every generated file
pub fn preamble(out: &mut String, file: &str, options: &Options) {
    if options.flags.contains(Flags::REGRESSION) {
        out.push_str("/* Processed by ecpg (regression mode) */\n");
    } else {
        let _ = writeln!(
            out,
            "/* Processed by ecpg ({}) */",
            env!("CARGO_PKG_VERSION")
        );
    }
    if !options.flags.contains(Flags::HEADER) {
        out.push_str("/* These include files are added by the preprocessor */\n");
        out.push_str("#include <ecpglib.h>\n#include <ecpgerrno.h>\n#include <sqlca.h>\n");
        if options.compat.is_informix() {
            out.push_str("/* Needed for informix compatibility */\n");
            out.push_str("#include <ecpg_informix.h>\n");
        }
        out.push_str("/* End of automatic include section */\n");
    }
    if options.flags.contains(Flags::REGRESSION) {
        out.push_str("#define ECPGdebug(X,Y) ECPGdebug((X)+100,(Y))\n");
    }
    line_directive(out, 1, file);
}

/// Statement argument of `ECPGdo`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind<'a> {
    /// SQL text, escaped on output
    Normal(&'a str),
    /// prepared statement name (C expression)
    Execute(&'a str),
    /// statement text held by a C expression
    ExecImmediate(&'a str),
}

/// `{ ECPGdo(...);`, block left open for the guard
pub fn run_statement(
    out: &mut String,
    options: &Options,
    connection: &str,
    statement: StatementKind<'_>,
    inputs: &str,
    outputs: &str,
) {
    let _ = write!(
        out,
        "{{ ECPGdo(__LINE__, {}, {}, {connection}, {}, ",
        options.compat.value(),
        options.force_indicator(),
        options.questionmarks(),
    );
    let _ = match statement {
        StatementKind::Normal(text) => write!(out, "ECPGst_normal, \"{}\", ", escape(text)),
        StatementKind::Execute(name) => write!(out, "ECPGst_execute, {name}, "),
        StatementKind::ExecImmediate(expr) => write!(out, "ECPGst_exec_immediate, {expr}, "),
    };
    out.push_str(inputs);
    out.push_str("ECPGt_EOIT, ");
    out.push_str(outputs);
    out.push_str("ECPGt_EORT);");
}

/// `{ ECPGconnect(...); `
pub fn connect(
    out: &mut String,
    options: &Options,
    target: &str,
    user: &str,
    password: &str,
    name: &str,
) {
    let _ = write!(
        out,
        "{{ ECPGconnect(__LINE__, {}, {target}, {user}, {password}, {name}, {}); ",
        options.compat.value(),
        options.autocommit(),
    );
}

/// `{ ECPGdisconnect(...);`
pub fn disconnect(out: &mut String, target: &str) {
    let _ = write!(out, "{{ ECPGdisconnect(__LINE__, {target});");
}

/// `{ ECPGsetconn(...);`
pub fn set_connection(out: &mut String, target: &str) {
    let _ = write!(out, "{{ ECPGsetconn(__LINE__, {target});");
}

/// `{ ECPGsetcommit(...);`
pub fn set_autocommit(out: &mut String, on: bool, connection: &str) {
    let mode = if on { "on" } else { "off" };
    let _ = write!(out, "{{ ECPGsetcommit(__LINE__, \"{mode}\", {connection});");
}

/// `{ ECPGtrans(...);`
pub fn transaction(out: &mut String, connection: &str, text: &str) {
    let _ = write!(
        out,
        "{{ ECPGtrans(__LINE__, {connection}, \"{}\");",
        escape(text)
    );
}

/// `{ ECPGprepare(...);`
pub fn prepare(out: &mut String, options: &Options, connection: &str, name: &str, source: &str) {
    let _ = write!(
        out,
        "{{ ECPGprepare(__LINE__, {connection}, {}, {name}, {source});",
        options.questionmarks()
    );
}

/// `{ ECPGdeallocate(...);`, every statement of the connection without a name
pub fn deallocate(out: &mut String, options: &Options, connection: &str, name: Option<&str>) {
    let compat = options.compat.value();
    let _ = match name {
        Some(name) => write!(
            out,
            "{{ ECPGdeallocate(__LINE__, {compat}, {connection}, {name});"
        ),
        None => write!(out, "{{ ECPGdeallocate_all(__LINE__, {compat}, {connection});"),
    };
}

/// `ECPGallocate_desc(...);`
pub fn allocate_descriptor(out: &mut String, name: &str) {
    let _ = write!(out, "ECPGallocate_desc(__LINE__, {name});");
}

/// `ECPGdeallocate_desc(...);`
pub fn deallocate_descriptor(out: &mut String, name: &str) {
    let _ = write!(out, "ECPGdeallocate_desc(__LINE__, {name});");
}

/// `{ ECPGdescribe(...);}`, self-contained
pub fn describe(
    out: &mut String,
    options: &Options,
    input: bool,
    connection: &str,
    statement: &str,
    tuples: &str,
) {
    let _ = write!(
        out,
        "{{ ECPGdescribe(__LINE__, {}, {}, {connection}, {statement},{tuples}ECPGt_EORT);}}",
        options.compat.value(),
        i32::from(input),
    );
}

/// `{ ECPGget_desc_header(...);`
pub fn get_descriptor_header(out: &mut String, descriptor: &str, variable: &str) {
    let _ = writeln!(
        out,
        "{{ ECPGget_desc_header(__LINE__, {descriptor}, &({variable}));"
    );
}

/// `{ ECPGget_desc(...);`, `items` being `ECPGd_x,<tuple>` sequences
pub fn get_descriptor(out: &mut String, descriptor: &str, index: &str, items: &str) {
    let _ = writeln!(
        out,
        "{{ ECPGget_desc(__LINE__, {descriptor}, {index},{items}ECPGd_EODT);"
    );
}

/// `{ ECPGset_desc_header(...);`
pub fn set_descriptor_header(out: &mut String, descriptor: &str, count: &str) {
    let _ = write!(
        out,
        "{{ ECPGset_desc_header(__LINE__, {descriptor}, (int)({count}));"
    );
}

/// `{ ECPGset_desc(...);`
pub fn set_descriptor(out: &mut String, descriptor: &str, index: &str, items: &str) {
    let _ = writeln!(
        out,
        "{{ ECPGset_desc(__LINE__, {descriptor}, {index},{items}ECPGd_EODT);"
    );
}

/// `ECPGprepared_statement(...)`: statement text of a prepared cursor
pub fn prepared_statement(connection: &str, name: &str) -> String {
    format!(
        "ECPGprepared_statement({connection}, \"{}\", __LINE__)",
        escape(name)
    )
}
