//! Embedded SQL abstract syntax tree
use std::fmt;

use crate::descriptor::Item;
use crate::types::{Aggregate, CExpr, TypeKind};
use crate::whenever::{Condition, WhenAction};

/// Unit produced by the recognizer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// host code, copied verbatim
    Text(String),
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// host variable declaration inside a declare section
    Declaration(Declaration),
    /// `EXEC SQL ... ;`
    Exec(Exec),
}

/// Embedded statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exec {
    /// line of `EXEC`
    pub line: u64,
    /// line of the terminating `;`
    pub end_line: u64,
    /// `AT connection`
    pub connection: Option<Value>,
    /// statement
    pub stmt: Stmt,
}

/// Host variable reference: `:path` or `:path :indicator`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostRef {
    /// variable name or member path
    pub path: String,
    /// indicator name or member path
    pub indicator: Option<String>,
}

impl HostRef {
    /// Reference without indicator
    pub fn new<S: Into<String>>(path: S) -> HostRef {
        HostRef {
            path: path.into(),
            indicator: None,
        }
    }
}

/// Operand that may be given literally or through a host variable
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// identifier, taken literally
    Name(String),
    /// `'string'` (content, quotes removed)
    Str(String),
    /// numeric literal
    Number(String),
    /// `:var`
    Host(HostRef),
}

impl Value {
    /// C expression: literals become C strings, variables stay names
    pub fn to_c(&self) -> String {
        match self {
            Value::Name(s) | Value::Str(s) => format!("\"{}\"", crate::types::dump::escape(s)),
            Value::Number(n) => n.clone(),
            Value::Host(h) => h.path.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Name(s) | Value::Number(s) => f.write_str(s),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Host(h) => write!(f, ":{}", h.path),
        }
    }
}

/// Argument of a statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgRef {
    /// host variable
    Host(HostRef),
    /// `SQL DESCRIPTOR name`
    Descriptor(Value),
    /// `DESCRIPTOR sqlda_var`
    Sqlda(String),
    /// literal constant
    Literal(String),
}

/// SQL statement text with its host variables replaced by `$n`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    /// statement text
    pub text: String,
    /// input arguments, in placeholder order
    pub inputs: Vec<ArgRef>,
    /// output arguments (`INTO`)
    pub outputs: Vec<ArgRef>,
}

/// `DECLARE name CURSOR FOR ...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorSource {
    /// inline query; the text is the whole `declare` command
    Query(Query),
    /// prepared statement name; `command` ends with `$1`
    Prepared {
        /// `declare name cursor for $1`
        command: String,
        /// statement name
        statement: String,
    },
}

/// Connection target of `CONNECT TO`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// `DEFAULT`
    Default,
    /// database / URL given literally
    Literal(String),
    /// host variable holding the target
    Host(String),
}

/// `DISCONNECT` target
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectTarget {
    /// `CURRENT` (default)
    Current,
    /// `DEFAULT`
    Default,
    /// `ALL`
    All,
    /// named connection
    Named(Value),
}

/// `SET DESCRIPTOR` value / `GET DESCRIPTOR` index
pub type Index = Value;

/// Embedded statements
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `BEGIN DECLARE SECTION`
    BeginDeclare,
    /// `END DECLARE SECTION`
    EndDeclare,
    /// `INCLUDE name`
    Include {
        /// file name as written
        name: String,
        /// `<name>`
        system: bool,
    },
    /// `DEFINE name [value]`
    Define(String, Option<String>),
    /// `UNDEF name`
    Undef(String),
    /// `TYPE name IS type`
    TypeDef(String, TypeName),
    /// `VAR name IS type`
    Var(String, TypeName),
    /// `WHENEVER condition action`
    Whenever(Condition, WhenAction),
    /// `CONNECT TO target [AS name] [USER user[/password]]`
    Connect {
        /// target
        target: Target,
        /// connection name
        name: Option<Value>,
        /// user
        user: Option<Value>,
        /// password
        password: Option<Value>,
    },
    /// `DISCONNECT [target]`
    Disconnect(DisconnectTarget),
    /// `SET CONNECTION [TO | =] name`
    SetConnection(Value),
    /// `SET AUTOCOMMIT [TO | =] ON | OFF`
    SetAutocommit(bool),
    /// `BEGIN`, `COMMIT`, `ROLLBACK`...
    Transaction(String),
    /// `PREPARE name FROM source`
    Prepare {
        /// statement name
        name: Value,
        /// statement text
        source: Value,
    },
    /// `DEALLOCATE [PREPARE] name` or `DEALLOCATE [PREPARE] ALL`
    Deallocate(Option<Value>),
    /// `EXECUTE IMMEDIATE source`
    ExecuteImmediate(Value),
    /// `EXECUTE name [INTO ...] [USING ...]`
    Execute {
        /// statement name
        name: Value,
        /// input arguments
        using: Vec<ArgRef>,
        /// output arguments
        into: Vec<ArgRef>,
    },
    /// `DECLARE name CURSOR FOR ...`
    DeclareCursor {
        /// cursor name
        name: String,
        /// query
        source: CursorSource,
    },
    /// `OPEN name [USING ...]`
    Open {
        /// cursor name
        name: String,
        /// additional input arguments
        using: Vec<ArgRef>,
        /// output arguments (`INTO`)
        into: Vec<ArgRef>,
    },
    /// `ALLOCATE DESCRIPTOR name`
    AllocateDescriptor(Value),
    /// `DEALLOCATE DESCRIPTOR name`
    DeallocateDescriptor(Value),
    /// `GET DESCRIPTOR name :var = COUNT`
    GetDescriptorHeader {
        /// descriptor
        name: Value,
        /// `(variable, item)`; only `COUNT` is valid
        items: Vec<(String, String)>,
    },
    /// `GET DESCRIPTOR name VALUE n :var = item, ...`
    GetDescriptor {
        /// descriptor
        name: Value,
        /// item number
        index: Index,
        /// assignments
        items: Vec<(String, Item)>,
    },
    /// `SET DESCRIPTOR name COUNT = n`
    SetDescriptorHeader {
        /// descriptor
        name: Value,
        /// count
        count: Value,
    },
    /// `SET DESCRIPTOR name VALUE n item = value, ...`
    SetDescriptor {
        /// descriptor
        name: Value,
        /// item number
        index: Index,
        /// assignments
        items: Vec<(Item, Value)>,
    },
    /// `DESCRIBE [INPUT | OUTPUT] name INTO|USING [SQL] DESCRIPTOR d`
    Describe {
        /// `INPUT`
        input: bool,
        /// prepared statement name
        statement: Value,
        /// result descriptor
        descriptor: ArgRef,
    },
    /// any other statement, sent as is
    Sql(Query),
}

/// Type of a declaration, as written
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSpec {
    /// builtin type; `text` is the spelling to emit
    Simple {
        /// kind
        kind: TypeKind,
        /// spelling
        text: String,
    },
    /// `struct` / `union`
    Struct {
        /// `struct` or `union`
        aggregate: Aggregate,
        /// tag
        tag: Option<String>,
        /// member declarations, `None` for a reference to a tag
        body: Option<Vec<Declaration>>,
    },
    /// `enum`, handled as `int`; `text` is the whole specifier
    Enum(String),
    /// typedef name
    Named(String),
}

/// One declared name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declarator {
    /// number of `*`
    pub pointers: usize,
    /// name
    pub name: String,
    /// subscripts, `[]` being `0`
    pub brackets: Vec<CExpr>,
    /// bit-field width
    pub bit_width: Option<String>,
    /// initializer text, without `=`
    pub initializer: Option<String>,
}

/// C declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// line of the declaration
    pub line: u64,
    /// storage class and qualifiers, in order (`static`, `const`...)
    pub qualifiers: Vec<String>,
    /// `typedef`
    pub typedef: bool,
    /// type
    pub spec: TypeSpec,
    /// declared names
    pub declarators: Vec<Declarator>,
}

/// Type given to `EXEC SQL TYPE` / `EXEC SQL VAR`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeName {
    /// base type
    pub spec: TypeSpec,
    /// number of `*`
    pub pointers: usize,
    /// subscripts
    pub brackets: Vec<CExpr>,
}
