//! Host variable symbol table, typedefs and struct tags
use std::fmt;

use indexmap::IndexMap;
use log::debug;

use crate::error::{Diagnostics, Error, ErrorCode};
use crate::types::{Aggregate, CExpr, Member, Type, TypeKind};

/// Where a variable comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// declared in a declare section, at this brace level
    Declared(usize),
    /// `SQL DESCRIPTOR name` used as an argument
    Descriptor,
    /// literal constant used as an argument
    Literal,
    /// prepared statement text looked up at run time
    Prepared,
}

/// Host variable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    /// name or member path (`s.a`, `p->b`, `arr[i]`)
    pub name: String,
    /// type
    pub ty: Type,
    /// origin
    pub origin: Origin,
}

impl Variable {
    /// Declared variable
    pub fn declared<S: Into<String>>(name: S, ty: Type, brace_level: usize) -> Variable {
        Variable {
            name: name.into(),
            ty,
            origin: Origin::Declared(brace_level),
        }
    }

    /// Descriptor pseudo-variable; `name` is emitted as is
    pub fn descriptor<S: Into<String>>(name: S) -> Variable {
        Variable {
            name: name.into(),
            ty: Type::simple(TypeKind::Descriptor, "1", 0),
            origin: Origin::Descriptor,
        }
    }

    /// `sqlda_t` pointer used as a descriptor
    pub fn sqlda<S: Into<String>>(name: S) -> Variable {
        Variable {
            name: name.into(),
            ty: Type::simple(TypeKind::Sqlda, "1", 0),
            origin: Origin::Descriptor,
        }
    }

    /// Literal constant
    pub fn literal(text: &str) -> Variable {
        Variable {
            name: text.to_owned(),
            ty: Type::simple(TypeKind::Const, text.len().to_string().as_str(), 0),
            origin: Origin::Literal,
        }
    }

    /// Prepared statement, `expr` evaluates to its text
    pub fn prepared<S: Into<String>>(expr: S) -> Variable {
        Variable {
            name: expr.into(),
            ty: Type::simple(TypeKind::CharVariable, "1", 0),
            origin: Origin::Prepared,
        }
    }

    /// Brace level of a declared variable
    pub fn brace_level(&self) -> Option<usize> {
        match self.origin {
            Origin::Declared(level) => Some(level),
            _ => None,
        }
    }
}

/// Host variable reference of a statement, with its indicator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    /// variable
    pub var: Variable,
    /// indicator, `None` for the no-indicator sentinel
    pub ind: Option<Variable>,
}

impl Argument {
    /// Argument without indicator
    pub fn new(var: Variable) -> Argument {
        Argument { var, ind: None }
    }
}

/// Lookup failures
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// no such variable
    Undeclared(String),
    /// `.` applied to a non struct
    NotAStruct(String),
    /// `->` applied to something else than a pointer to struct
    NotAPointer(String),
    /// `[]` applied to a non array
    NotAnArray(String),
    /// unknown struct member
    NoMember(String, String),
    /// unparsable member path
    BadPath(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Undeclared(name) => write!(f, "variable \"{name}\" is not declared"),
            LookupError::NotAStruct(name) => {
                write!(f, "variable \"{name}\" is neither a structure nor a union")
            }
            LookupError::NotAPointer(name) => write!(
                f,
                "variable \"{name}\" is not a pointer to a structure or a union"
            ),
            LookupError::NotAnArray(name) => write!(f, "variable \"{name}\" is not an array"),
            LookupError::NoMember(name, member) => {
                write!(f, "variable \"{name}\" has no member \"{member}\"")
            }
            LookupError::BadPath(name) => write!(f, "incorrectly formed variable \"{name}\""),
        }
    }
}

impl std::error::Error for LookupError {}

/// Symbol table; later declarations shadow earlier ones.
#[derive(Debug, Default)]
pub struct Variables {
    list: Vec<Variable>,
}

impl Variables {
    /// Declare `name` at `brace_level`
    pub fn declare(&mut self, name: &str, ty: Type, brace_level: usize) {
        debug!(target: "translate", "declare {name}: {} at level {brace_level}", ty.describe());
        self.list.push(Variable::declared(name, ty, brace_level));
    }

    /// Innermost binding of a plain name
    pub fn find(&self, name: &str) -> Option<&Variable> {
        self.list.iter().rev().find(|v| v.name == name)
    }

    /// Mutable innermost binding of a plain name
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.list.iter_mut().rev().find(|v| v.name == name)
    }

    /// Resolve a reference, following member paths and subscripts.
    pub fn resolve(&self, path: &str) -> Result<Variable, LookupError> {
        let steps = parse_path(path).ok_or_else(|| LookupError::BadPath(path.to_owned()))?;
        let (base, steps) = match steps.split_first() {
            Some((Step::Name(base), rest)) => (*base, rest),
            _ => return Err(LookupError::BadPath(path.to_owned())),
        };
        let root = self
            .find(base)
            .ok_or_else(|| LookupError::Undeclared(base.to_owned()))?;
        let mut ty = root.ty.clone();
        for step in steps {
            ty = match step {
                Step::Name(_) => return Err(LookupError::BadPath(path.to_owned())),
                Step::Dot(member) => match &ty {
                    Type::Struct { members, .. } => member_type(path, members, member)?,
                    _ => return Err(LookupError::NotAStruct(path.to_owned())),
                },
                Step::Arrow(member) => match &ty {
                    Type::Array { element, .. } => match element.as_ref() {
                        Type::Struct { members, .. } => member_type(path, members, member)?,
                        _ => return Err(LookupError::NotAPointer(path.to_owned())),
                    },
                    _ => return Err(LookupError::NotAPointer(path.to_owned())),
                },
                Step::Index => match &ty {
                    Type::Array { element, .. } => element.as_ref().clone(),
                    Type::Simple(s) if s.kind.is_char() => Type::simple(s.kind, "1", 0),
                    _ => return Err(LookupError::NotAnArray(path.to_owned())),
                },
            };
        }
        Ok(Variable {
            name: path.to_owned(),
            ty,
            origin: root.origin,
        })
    }

    /// Drop every binding declared at `level` or deeper
    pub fn remove_scope(&mut self, level: usize) {
        self.list
            .retain(|v| v.brace_level().is_some_and(|l| l < level));
    }
}

fn member_type(path: &str, members: &[Member], name: &str) -> Result<Type, LookupError> {
    members
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.ty.clone())
        .ok_or_else(|| LookupError::NoMember(path.to_owned(), name.to_owned()))
}

#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    Name(&'a str),
    Dot(&'a str),
    Arrow(&'a str),
    Index,
}

fn parse_path(path: &str) -> Option<Vec<Step<'_>>> {
    let bytes = path.as_bytes();
    let mut steps = Vec::new();
    let ident = |from: usize| -> usize {
        bytes[from..]
            .iter()
            .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
            .map_or(bytes.len(), |n| from + n)
    };
    let end = ident(0);
    if end == 0 {
        return None;
    }
    steps.push(Step::Name(&path[..end]));
    let mut i = end;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'.' => {
                let end = ident(i + 1);
                if end == i + 1 {
                    return None;
                }
                steps.push(Step::Dot(&path[i + 1..end]));
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'>') => {
                let end = ident(i + 2);
                if end == i + 2 {
                    return None;
                }
                steps.push(Step::Arrow(&path[i + 2..end]));
                i = end;
            }
            b'[' => {
                let mut depth = 0;
                let mut j = i;
                loop {
                    match bytes.get(j) {
                        Some(b'[') => depth += 1,
                        Some(b']') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        Some(_) => {}
                        None => return None,
                    }
                    j += 1;
                }
                steps.push(Step::Index);
                i = j + 1;
            }
            _ => return None,
        }
    }
    Some(steps)
}

/// Indicators must be integers (or arrays / structs of integers)
pub fn check_indicator(ty: &Type) -> bool {
    match ty {
        Type::Simple(s) => s.kind.is_integer(),
        Type::Array { element, .. } => check_indicator(element),
        Type::Struct { members, .. } => members.iter().all(|m| check_indicator(&m.ty)),
    }
}

/// Base type of a declaration, before array and pointer suffixes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseType {
    /// leaf kind
    Simple(TypeKind),
    /// struct or union
    Struct {
        /// `struct` or `union`
        aggregate: Aggregate,
        /// members
        members: Vec<Member>,
        /// tag or typedef name
        type_name: Option<String>,
        /// `sizeof` expression
        struct_sizeof: CExpr,
    },
}

/// Array shape of a declaration: outer dimension and string length
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    /// number of elements, `-1` if not an array, `0` for a pointer
    pub dimension: CExpr,
    /// string capacity, `-1` if none
    pub length: CExpr,
}

impl Default for Shape {
    fn default() -> Shape {
        Shape {
            dimension: CExpr::unset(),
            length: CExpr::unset(),
        }
    }
}

impl Shape {
    /// From the declarator's bracket list (`[]` is `0`)
    pub fn from_brackets(brackets: &[CExpr], diags: &mut Diagnostics) -> Result<Shape, Error> {
        let mut shape = Shape::default();
        match brackets {
            [] => {}
            [d] => shape.dimension = d.clone(),
            [d, l] => {
                shape.dimension = d.clone();
                shape.length = l.clone();
            }
            _ => {
                return Err(diags.fatal(
                    ErrorCode::ParseError,
                    "multidimensional arrays are not supported",
                ))
            }
        }
        Ok(shape)
    }
}

/// Typedef entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTemplate {
    /// base type
    pub base: BaseType,
    /// shape carried by the typedef
    pub shape: Shape,
    brace_level: usize,
}

impl TypeTemplate {
    /// Constructor
    pub fn new(base: BaseType, shape: Shape) -> TypeTemplate {
        TypeTemplate {
            base,
            shape,
            brace_level: 0,
        }
    }
}

/// Typedef and struct tag registries
#[derive(Debug, Default)]
pub struct Typedefs {
    types: IndexMap<String, TypeTemplate>,
    tags: IndexMap<(Aggregate, String), (Vec<Member>, usize)>,
}

impl Typedefs {
    /// Register a typedef; redefinition is an error (reported, the first
    /// definition is kept).
    pub fn define(
        &mut self,
        name: &str,
        mut template: TypeTemplate,
        brace_level: usize,
        diags: &mut Diagnostics,
    ) {
        if self.types.contains_key(name) {
            diags.error(format!("type \"{name}\" is already defined"));
            return;
        }
        debug!(target: "translate", "typedef {name}");
        template.brace_level = brace_level;
        self.types.insert(name.to_owned(), template);
    }

    /// Typedef lookup
    pub fn get(&self, name: &str) -> Option<&TypeTemplate> {
        self.types.get(name)
    }

    /// Register the members of `struct tag`
    pub fn define_tag(
        &mut self,
        aggregate: Aggregate,
        tag: &str,
        members: Vec<Member>,
        brace_level: usize,
    ) {
        self.tags
            .insert((aggregate, tag.to_owned()), (members, brace_level));
    }

    /// Members of `struct tag`
    pub fn tag(&self, aggregate: Aggregate, tag: &str) -> Option<&[Member]> {
        self.tags
            .get(&(aggregate, tag.to_owned()))
            .map(|(members, _)| members.as_slice())
    }

    /// Drop typedefs and tags declared at `level` or deeper
    pub fn remove_scope(&mut self, level: usize) {
        self.types.retain(|_, t| t.brace_level < level);
        self.tags.retain(|_, (_, l)| *l < level);
    }
}

/// Combine a declarator's shape with the typedef's shape and normalize it
/// for the base type.
pub fn adjust_array(
    base: &BaseType,
    shape: &mut Shape,
    template: &Shape,
    pointers: usize,
    type_definition: bool,
    diags: &mut Diagnostics,
) -> Result<(), Error> {
    let multidimensional = |diags: &mut Diagnostics| {
        diags.fatal(
            ErrorCode::ParseError,
            "multidimensional arrays are not supported",
        )
    };
    if template.length.atoi() >= 0 {
        if shape.length.atoi() >= 0 {
            return Err(multidimensional(diags));
        }
        shape.length = template.length.clone();
    }
    if template.dimension.atoi() >= 0 {
        if shape.dimension.atoi() >= 0 && shape.length.atoi() >= 0 {
            return Err(multidimensional(diags));
        }
        if shape.dimension.atoi() >= 0 {
            shape.length = shape.dimension.clone();
        }
        shape.dimension = template.dimension.clone();
    }
    let kind = match base {
        BaseType::Simple(kind) => Some(*kind),
        BaseType::Struct { .. } => None,
    };
    if pointers > 2 {
        return Err(diags.fatal(
            ErrorCode::ParseError,
            format!("multilevel pointers (more than 2 levels) are not supported; found {pointers} levels"),
        ));
    }
    if pointers > 1 && !kind.is_some_and(TypeKind::is_char) {
        return Err(diags.fatal(
            ErrorCode::ParseError,
            "pointer to pointer is not supported for this data type",
        ));
    }
    if pointers > 1 && (shape.length.atoi() >= 0 || shape.dimension.atoi() >= 0) {
        return Err(multidimensional(diags));
    }
    if pointers > 0 && shape.length.atoi() >= 0 && shape.dimension.atoi() >= 0 {
        return Err(multidimensional(diags));
    }

    match kind {
        None => {
            if pointers > 0 {
                shape.length = std::mem::replace(&mut shape.dimension, CExpr::new("0"));
            }
            if shape.length.atoi() >= 0 {
                return Err(diags.fatal(
                    ErrorCode::ParseError,
                    "multidimensional arrays for structures are not supported",
                ));
            }
        }
        Some(TypeKind::Varchar | TypeKind::Bytea) => {
            if pointers > 0 {
                shape.dimension = CExpr::new("0");
            }
            // the only subscript is the capacity
            if shape.length.atoi() < 0 {
                shape.length = std::mem::replace(&mut shape.dimension, CExpr::unset());
            }
        }
        Some(k) if k.is_char() => {
            if pointers == 2 {
                shape.length = CExpr::new("0");
                shape.dimension = CExpr::new("0");
                return Ok(());
            }
            if pointers == 1 {
                shape.length = CExpr::new("0");
            }
            if shape.length.atoi() < 0 {
                shape.length = if shape.dimension.atoi() < 0 && !type_definition {
                    // single char; typedefs keep -1 until the variable is declared
                    CExpr::new("1")
                } else if shape.dimension.is_zero() {
                    CExpr::unset()
                } else {
                    shape.dimension.clone()
                };
                shape.dimension = CExpr::unset();
            }
        }
        Some(_) => {
            if pointers > 0 {
                shape.length = std::mem::replace(&mut shape.dimension, CExpr::new("0"));
            }
            if shape.length.atoi() >= 0 {
                return Err(multidimensional(diags));
            }
        }
    }
    Ok(())
}

/// Build the type of a declared variable from its adjusted shape.
///
/// `counter` numbers the varchar wrapper structs of the file.
pub fn build_type(base: &BaseType, shape: &Shape, name: &str, counter: u32) -> Type {
    let element = match base {
        BaseType::Struct {
            aggregate,
            members,
            type_name,
            struct_sizeof,
        } => Type::structure(
            members,
            *aggregate,
            type_name.as_deref(),
            Some(struct_sizeof.clone()),
        ),
        BaseType::Simple(kind @ (TypeKind::Varchar | TypeKind::Bytea)) => {
            Type::wrapped(*kind, shape.length.clone(), counter, name)
        }
        BaseType::Simple(kind) if kind.is_char() => Type::simple(*kind, shape.length.clone(), 0),
        BaseType::Simple(kind) => Type::simple(*kind, "1", 0),
    };
    if shape.dimension.atoi() < 0 {
        element
    } else {
        Type::array(element, shape.dimension.clone())
    }
}
