//! Host variable type model
//!
//! Sizes and array bounds are C expressions kept as source text: they may be
//! symbolic (`sizeof(x)`, `BUFSIZE`) and are only ever copied into the
//! generated code, never evaluated.
use std::fmt;

pub mod dump;

/// Opaque C expression
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CExpr(String);

impl CExpr {
    /// `-1`: no array bound / no length given
    pub fn unset() -> CExpr {
        CExpr("-1".to_owned())
    }

    /// Wrap expression text
    pub fn new<S: Into<String>>(text: S) -> CExpr {
        CExpr(text.into())
    }

    /// Expression text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading integer value, 0 when the expression does not start with one
    /// (C `atoi`).
    pub fn atoi(&self) -> i64 {
        let s = self.0.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let end = digits
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(digits.len());
        let value = digits[..end].parse::<i64>().unwrap_or(0);
        if negative {
            -value
        } else {
            value
        }
    }

    /// The literal `0`
    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    /// Negative: bound or length not given
    pub fn is_unset(&self) -> bool {
        self.atoi() < 0
    }

    /// Positive literal or symbolic expression
    pub fn is_bounded(&self) -> bool {
        let n = self.atoi();
        n > 0 || (n == 0 && !self.is_zero())
    }
}

impl fmt::Display for CExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CExpr {
    fn from(s: &str) -> Self {
        CExpr::new(s)
    }
}

/// Leaf kinds, as known by the runtime library
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TypeKind {
    Char,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    Bool,
    Varchar,
    Bytea,
    /// unquoted string expression
    CharVariable,
    /// quoted literal
    Const,
    Numeric,
    Decimal,
    Interval,
    Date,
    Timestamp,
    String,
    Descriptor,
    Sqlda,
    NoIndicator,
}

impl TypeKind {
    /// Runtime tag
    pub fn tag(self) -> &'static str {
        match self {
            TypeKind::Char => "ECPGt_char",
            TypeKind::UnsignedChar => "ECPGt_unsigned_char",
            TypeKind::Short => "ECPGt_short",
            TypeKind::UnsignedShort => "ECPGt_unsigned_short",
            TypeKind::Int => "ECPGt_int",
            TypeKind::UnsignedInt => "ECPGt_unsigned_int",
            TypeKind::Long => "ECPGt_long",
            TypeKind::UnsignedLong => "ECPGt_unsigned_long",
            TypeKind::LongLong => "ECPGt_long_long",
            TypeKind::UnsignedLongLong => "ECPGt_unsigned_long_long",
            TypeKind::Float => "ECPGt_float",
            TypeKind::Double => "ECPGt_double",
            TypeKind::Bool => "ECPGt_bool",
            TypeKind::Varchar => "ECPGt_varchar",
            TypeKind::Bytea => "ECPGt_bytea",
            TypeKind::CharVariable => "ECPGt_char_variable",
            TypeKind::Const => "ECPGt_const",
            TypeKind::Numeric => "ECPGt_numeric",
            TypeKind::Decimal => "ECPGt_decimal",
            TypeKind::Interval => "ECPGt_interval",
            TypeKind::Date => "ECPGt_date",
            TypeKind::Timestamp => "ECPGt_timestamp",
            TypeKind::String => "ECPGt_string",
            TypeKind::Descriptor => "ECPGt_descriptor",
            TypeKind::Sqlda => "ECPGt_sqlda",
            TypeKind::NoIndicator => "ECPGt_NO_INDICATOR",
        }
    }

    /// C type name, as used in `sizeof()`
    pub fn c_name(self) -> &'static str {
        match self {
            TypeKind::Char | TypeKind::CharVariable | TypeKind::Const | TypeKind::String => {
                "char"
            }
            TypeKind::UnsignedChar => "unsigned char",
            TypeKind::Short => "short",
            TypeKind::UnsignedShort => "unsigned short",
            TypeKind::Int => "int",
            TypeKind::UnsignedInt => "unsigned int",
            TypeKind::Long => "long",
            TypeKind::UnsignedLong => "unsigned long",
            TypeKind::LongLong => "long long",
            TypeKind::UnsignedLongLong => "unsigned long long",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Bool => "bool",
            TypeKind::Varchar => "varchar",
            TypeKind::Bytea => "bytea",
            TypeKind::Numeric => "numeric",
            TypeKind::Decimal => "decimal",
            TypeKind::Interval => "interval",
            TypeKind::Date => "date",
            TypeKind::Timestamp => "timestamp",
            TypeKind::Descriptor => "descriptor",
            TypeKind::Sqlda => "sqlda",
            TypeKind::NoIndicator => "no_indicator",
        }
    }

    /// Integer kinds (valid for indicators)
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::Short
                | TypeKind::UnsignedShort
                | TypeKind::Int
                | TypeKind::UnsignedInt
                | TypeKind::Long
                | TypeKind::UnsignedLong
                | TypeKind::LongLong
                | TypeKind::UnsignedLongLong
        )
    }

    /// Character kinds where the size is a string capacity
    pub fn is_char(self) -> bool {
        matches!(
            self,
            TypeKind::Char | TypeKind::UnsignedChar | TypeKind::String
        )
    }
}

/// `struct` or `union`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// `struct`
    Struct,
    /// `union`
    Union,
}

impl Aggregate {
    /// C keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Aggregate::Struct => "struct",
            Aggregate::Union => "union",
        }
    }
}

/// Leaf type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Simple {
    /// kind
    pub kind: TypeKind,
    /// element size or string capacity
    pub size: CExpr,
    /// declaration counter of `varchar`/`bytea` wrapper structs, 0 otherwise
    pub counter: u32,
    /// tag of the generated wrapper struct (`varchar_name_1`)
    pub wrapper: Option<String>,
}

/// Named member of a struct or union
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// member name
    pub name: String,
    /// member type
    pub ty: Type,
}

impl Member {
    /// Constructor
    pub fn new<S: Into<String>>(name: S, ty: Type) -> Member {
        Member {
            name: name.into(),
            ty,
        }
    }
}

/// Host variable type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// scalar, string, varchar, pseudo types
    Simple(Simple),
    /// array or pointer (size `0`)
    Array {
        /// element type
        element: Box<Type>,
        /// number of elements
        size: CExpr,
    },
    /// struct or union
    Struct {
        /// `struct` or `union`
        aggregate: Aggregate,
        /// members in declaration order
        members: Vec<Member>,
        /// struct tag (`struct tag`), when declared with one
        type_name: Option<String>,
        /// `sizeof` expression of the whole struct
        struct_sizeof: Option<CExpr>,
    },
}

impl Type {
    /// Leaf type; `size` is kept verbatim
    pub fn simple<E: Into<CExpr>>(kind: TypeKind, size: E, counter: u32) -> Type {
        Type::Simple(Simple {
            kind,
            size: size.into(),
            counter,
            wrapper: None,
        })
    }

    /// `varchar`/`bytea` leaf with its generated wrapper struct tag
    pub fn wrapped<E: Into<CExpr>>(kind: TypeKind, size: E, counter: u32, name: &str) -> Type {
        debug_assert!(matches!(kind, TypeKind::Varchar | TypeKind::Bytea));
        Type::Simple(Simple {
            kind,
            size: size.into(),
            counter,
            wrapper: Some(format!("{}_{}_{}", kind.c_name(), name, counter)),
        })
    }

    /// Array of `element`
    pub fn array<E: Into<CExpr>>(element: Type, size: E) -> Type {
        Type::Array {
            element: Box::new(element),
            size: size.into(),
        }
    }

    /// Struct or union; the members are copied so that the caller may reuse
    /// its list.
    pub fn structure(
        members: &[Member],
        aggregate: Aggregate,
        type_name: Option<&str>,
        struct_sizeof: Option<CExpr>,
    ) -> Type {
        Type::Struct {
            aggregate,
            members: members.to_vec(),
            type_name: type_name.map(str::to_owned),
            struct_sizeof,
        }
    }

    /// Size of a leaf, `None` for composites
    pub fn size(&self) -> Option<&CExpr> {
        match self {
            Type::Simple(s) => Some(&s.size),
            Type::Array { size, .. } => Some(size),
            Type::Struct { .. } => None,
        }
    }

    /// Leaf kind, `None` for composites
    pub fn kind(&self) -> Option<TypeKind> {
        match self {
            Type::Simple(s) => Some(s.kind),
            _ => None,
        }
    }

    /// Struct tag
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Type::Struct { type_name, .. } => type_name.as_deref(),
            _ => None,
        }
    }

    /// Is this the no-indicator sentinel
    pub fn is_no_indicator(&self) -> bool {
        self.kind() == Some(TypeKind::NoIndicator)
    }

    /// Same category and leaf kind (used to detect hidden variables)
    pub fn same_kind(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Simple(a), Type::Simple(b)) => a.kind == b.kind,
            (Type::Array { .. }, Type::Array { .. }) => true,
            (
                Type::Struct {
                    aggregate: a,
                    type_name: an,
                    ..
                },
                Type::Struct {
                    aggregate: b,
                    type_name: bn,
                    ..
                },
            ) => a == b && an == bn,
            _ => false,
        }
    }

    /// Human readable category for messages
    pub fn describe(&self) -> &'static str {
        match self {
            Type::Simple(s) => s.kind.c_name(),
            Type::Array { .. } => "array",
            Type::Struct {
                aggregate: Aggregate::Struct,
                ..
            } => "struct",
            Type::Struct {
                aggregate: Aggregate::Union,
                ..
            } => "union",
        }
    }
}

/// The indicator sentinel dumped for variables without indicator
pub fn no_indicator() -> Type {
    Type::simple(TypeKind::NoIndicator, "0", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoi_like_c() {
        assert_eq!(CExpr::new("10").atoi(), 10);
        assert_eq!(CExpr::new("-1").atoi(), -1);
        assert_eq!(CExpr::new("sizeof(int)").atoi(), 0);
        assert_eq!(CExpr::new("12+3").atoi(), 12);
    }

    #[test]
    fn bounds() {
        assert!(CExpr::new("10").is_bounded());
        assert!(CExpr::new("MAXLEN").is_bounded());
        assert!(!CExpr::new("0").is_bounded());
        assert!(!CExpr::unset().is_bounded());
        assert!(CExpr::unset().is_unset());
    }

    #[test]
    fn structure_copies_members() {
        let mut staging = vec![Member::new("a", Type::simple(TypeKind::Int, "1", 0))];
        let s = Type::structure(&staging, Aggregate::Struct, Some("s"), None);
        staging.clear();
        match s {
            Type::Struct { members, .. } => assert_eq!(members.len(), 1),
            _ => panic!("struct expected"),
        }
    }

    #[test]
    fn varchar_wrapper_tag() {
        let t = Type::wrapped(TypeKind::Varchar, "10", 2, "name");
        match t {
            Type::Simple(s) => assert_eq!(s.wrapper.as_deref(), Some("varchar_name_2")),
            _ => panic!("simple expected"),
        }
    }
}
