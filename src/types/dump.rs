//! Argument dump: host variables to runtime argument tuples.
//!
//! Every leaf reachable from a variable becomes one
//! `type, address, varcharsize, arraysize, offset` tuple, followed by the
//! tuple of the matching indicator leaf (or the no-indicator sentinel).
//!
//! Address forms:
//!
//! | leaf | context | address |
//! |---|---|---|
//! | scalar | alone, or member of a struct | `&(name)` |
//! | scalar | element of a bounded array, no struct offset | `(name)` |
//! | char | bounded capacity or bounded array, no struct offset | `(name)` |
//! | char | pointer (`size == 0`) or single char | `&(name)` |
//! | varchar | element of a bounded array, no struct offset | `(name)` |
//! | descriptor | always | quoted name |
//! | sqlda | always | `&name` |
//! | const | always | quoted literal |
//!
//! An array count of `-1` means "not an array" and becomes `1`, except inside
//! a struct reached through a pointer where the struct size is the offset.
use log::trace;

use super::{no_indicator, Aggregate, CExpr, Member, Simple, Type, TypeKind};
use crate::error::{Diagnostics, Error, ErrorCode};

/// Host variable (or indicator) as seen by the dump
#[derive(Clone, Copy, Debug)]
pub struct Target<'a> {
    /// name, without prefix
    pub name: &'a str,
    /// type
    pub ty: &'a Type,
    /// accumulated `outer.` / `outer->` prefix
    pub prefix: Option<&'a str>,
    /// `sizeof` of the enclosing struct, when dumping a member
    pub struct_sizeof: Option<&'a CExpr>,
}

impl<'a> Target<'a> {
    /// Top level variable
    pub fn new(name: &'a str, ty: &'a Type) -> Target<'a> {
        Target {
            name,
            ty,
            prefix: None,
            struct_sizeof: None,
        }
    }
}

/// Argument dump of one call
pub struct Dumper<'o> {
    out: &'o mut String,
    diags: &'o mut Diagnostics,
}

impl<'o> Dumper<'o> {
    /// Append to `out`, report to `diags`
    pub fn new(out: &'o mut String, diags: &'o mut Diagnostics) -> Dumper<'o> {
        Dumper { out, diags }
    }

    /// Dump `var` and its indicator.
    ///
    /// `ind == None` emits no indicator tuple at all (descriptor items);
    /// the no-indicator sentinel type emits `ECPGt_NO_INDICATOR` tuples.
    /// `arr_str_size` is the array count imposed by an enclosing array, `0`
    /// at top level.
    pub fn dump(
        &mut self,
        var: Target<'_>,
        ind: Option<Target<'_>>,
        arr_str_size: &CExpr,
    ) -> Result<(), Error> {
        trace!(target: "dump", "dump({}, {:?})", var.name, arr_str_size);
        let indicator_set = ind.is_some_and(|i| !i.ty.is_no_indicator());
        match var.ty {
            Type::Array { element, size } => {
                if let Some(i) = ind.filter(|_| indicator_set) {
                    if !matches!(i.ty, Type::Array { .. }) {
                        return Err(self.diags.fatal(
                            ErrorCode::IndicatorNotArray,
                            "indicator for array/pointer has to be array/pointer",
                        ));
                    }
                }
                match element.as_ref() {
                    Type::Array { .. } => Err(self.diags.fatal(
                        ErrorCode::ParseError,
                        "nested arrays are not supported (except strings)",
                    )),
                    Type::Struct { .. } => {
                        let ind = ind.map(|i| match i.ty {
                            Type::Array { element, .. } => Target { ty: element, ..i },
                            _ => i,
                        });
                        self.dump_struct(var.name, var.prefix, size, element, ind)
                    }
                    Type::Simple(leaf) => {
                        self.dump_simple(
                            var.name,
                            var.prefix,
                            leaf,
                            &leaf.size,
                            size,
                            var.struct_sizeof,
                        );
                        match ind {
                            None => {}
                            Some(i) => match i.ty {
                                Type::Simple(sentinel) if sentinel.kind == TypeKind::NoIndicator => {
                                    self.dump_simple(
                                        i.name,
                                        i.prefix,
                                        sentinel,
                                        &sentinel.size,
                                        &CExpr::unset(),
                                        None,
                                    );
                                }
                                Type::Array { element, size } => match element.as_ref() {
                                    Type::Simple(ind_leaf) => self.dump_simple(
                                        i.name,
                                        i.prefix,
                                        ind_leaf,
                                        &ind_leaf.size,
                                        size,
                                        None,
                                    ),
                                    _ => {
                                        return Err(self.diags.fatal(
                                            ErrorCode::IndicatorNotSimple,
                                            "indicator for simple data type has to be simple",
                                        ))
                                    }
                                },
                                _ => unreachable!("indicator shape checked above"),
                            },
                        }
                        Ok(())
                    }
                }
            }
            Type::Struct {
                aggregate: Aggregate::Struct,
                ..
            } => {
                if let Some(i) = ind.filter(|_| indicator_set) {
                    if !matches!(
                        i.ty,
                        Type::Struct {
                            aggregate: Aggregate::Struct,
                            ..
                        }
                    ) {
                        return Err(self.diags.fatal(
                            ErrorCode::IndicatorNotStruct,
                            "indicator for struct has to be a struct",
                        ));
                    }
                }
                self.dump_struct(var.name, var.prefix, &CExpr::new("1"), var.ty, ind)
            }
            Type::Struct {
                aggregate: Aggregate::Union,
                ..
            } => Err(self
                .diags
                .fatal(ErrorCode::ParseError, "type of union has to be specified")),
            Type::Simple(leaf) => {
                if let Some(i) = ind.filter(|_| indicator_set) {
                    if !matches!(i.ty, Type::Simple(_)) {
                        return Err(self.diags.fatal(
                            ErrorCode::IndicatorNotSimple,
                            "indicator for simple data type has to be simple",
                        ));
                    }
                }
                let imposed = if arr_str_size.is_zero() {
                    CExpr::unset()
                } else {
                    arr_str_size.clone()
                };
                match leaf.kind {
                    TypeKind::CharVariable => {
                        let count = if arr_str_size.is_zero() {
                            CExpr::new("1")
                        } else {
                            arr_str_size.clone()
                        };
                        self.dump_simple(
                            var.name,
                            var.prefix,
                            leaf,
                            &CExpr::new("1"),
                            &count,
                            var.struct_sizeof,
                        );
                    }
                    TypeKind::Descriptor => {
                        self.dump_simple(
                            var.name,
                            var.prefix,
                            leaf,
                            &leaf.size,
                            &CExpr::unset(),
                            None,
                        );
                    }
                    _ => {
                        self.dump_simple(
                            var.name,
                            var.prefix,
                            leaf,
                            &leaf.size,
                            &imposed,
                            var.struct_sizeof,
                        );
                    }
                }
                if let Some(i) = ind {
                    self.dump_indicator_leaf(i, &imposed)?;
                }
                Ok(())
            }
        }
    }

    fn dump_indicator_leaf(&mut self, ind: Target<'_>, arrsize: &CExpr) -> Result<(), Error> {
        match ind.ty {
            Type::Simple(leaf) => {
                self.dump_simple(
                    ind.name,
                    ind.prefix,
                    leaf,
                    &leaf.size,
                    arrsize,
                    ind.struct_sizeof,
                );
                Ok(())
            }
            _ => Err(self.diags.fatal(
                ErrorCode::IndicatorNotSimple,
                "indicator for simple data type has to be simple",
            )),
        }
    }

    /// Dump every member of a struct; `arrsize` is `1` for a single struct,
    /// the array bound (or `0` for a pointer) otherwise.
    fn dump_struct(
        &mut self,
        name: &str,
        prefix: Option<&str>,
        arrsize: &CExpr,
        ty: &Type,
        ind: Option<Target<'_>>,
    ) -> Result<(), Error> {
        let Type::Struct {
            members,
            struct_sizeof,
            ..
        } = ty
        else {
            unreachable!("dump_struct on {}", ty.describe());
        };
        let separator = if arrsize.atoi() == 1 { "." } else { "->" };
        let pbuf = format!("{}{}{}", prefix.unwrap_or(""), name, separator);

        let sentinel = no_indicator();
        let mut ind_members = IndicatorMembers::Absent;
        let mut ind_pbuf = String::new();
        let mut ind_name = "";
        let mut ind_struct_sizeof = None;
        if let Some(i) = ind {
            ind_name = i.name;
            match i.ty {
                t if t.is_no_indicator() => ind_members = IndicatorMembers::Sentinel,
                Type::Struct {
                    members,
                    struct_sizeof,
                    ..
                } => {
                    ind_pbuf = format!("{}{}{}", i.prefix.unwrap_or(""), i.name, separator);
                    ind_struct_sizeof = struct_sizeof.as_ref();
                    if members.is_empty() {
                        self.diags.warning(format!(
                            "indicator struct \"{}\" has too few members",
                            i.name
                        ));
                        ind_members = IndicatorMembers::Sentinel;
                    } else {
                        ind_members = IndicatorMembers::Members(members.as_slice(), 0);
                    }
                }
                _ => {
                    return Err(self.diags.fatal(
                        ErrorCode::IndicatorNotStruct,
                        "indicator for struct has to be a struct",
                    ))
                }
            }
        }

        for (n, member) in members.iter().enumerate() {
            let var = Target {
                name: &member.name,
                ty: &member.ty,
                prefix: Some(pbuf.as_str()),
                struct_sizeof: struct_sizeof.as_ref(),
            };
            let ind = match ind_members {
                IndicatorMembers::Absent => None,
                IndicatorMembers::Sentinel => Some(Target {
                    name: "no_indicator",
                    ty: &sentinel,
                    prefix: None,
                    struct_sizeof: None,
                }),
                IndicatorMembers::Members(list, idx) => Some(Target {
                    name: &list[idx].name,
                    ty: &list[idx].ty,
                    prefix: Some(ind_pbuf.as_str()),
                    struct_sizeof: ind_struct_sizeof,
                }),
            };
            self.dump(var, ind, arrsize)?;
            if let IndicatorMembers::Members(list, idx) = ind_members {
                let next = idx + 1;
                if next == list.len() && n + 1 < members.len() {
                    self.diags.warning(format!(
                        "indicator struct \"{ind_name}\" has too few members"
                    ));
                    ind_members = IndicatorMembers::Sentinel;
                } else {
                    ind_members = IndicatorMembers::Members(list, next);
                }
            }
        }
        if let IndicatorMembers::Members(list, idx) = ind_members {
            if idx < list.len() {
                self.diags.warning(format!(
                    "indicator struct \"{ind_name}\" has too many members"
                ));
            }
        }
        Ok(())
    }

    /// Emit one tuple.
    fn dump_simple(
        &mut self,
        name: &str,
        prefix: Option<&str>,
        leaf: &Simple,
        varcharsize: &CExpr,
        arrsize: &CExpr,
        siz: Option<&CExpr>,
    ) {
        let siz = siz.filter(|s| !s.as_str().is_empty());
        let prefix = prefix.unwrap_or("");
        match leaf.kind {
            TypeKind::NoIndicator => {
                self.out.push_str("\n\tECPGt_NO_INDICATOR, NULL , 0L, 0L, 0L, ");
                return;
            }
            TypeKind::Descriptor => {
                // the name already carries its quotes
                self.out
                    .push_str(&format!("\n\tECPGt_descriptor, {name}, 1L, 1L, 1L, "));
                return;
            }
            TypeKind::Sqlda => {
                self.out
                    .push_str(&format!("\n\tECPGt_sqlda, &{name}, 0L, 0L, 0L, "));
                return;
            }
            _ => {}
        }
        let bare = format!("({prefix}{name})");
        let addressed = format!("&({prefix}{name})");
        let (variable, offset) = match leaf.kind {
            TypeKind::Varchar | TypeKind::Bytea => {
                let variable = if arrsize.is_bounded() && siz.is_none() {
                    bare
                } else {
                    addressed
                };
                let offset = match &leaf.wrapper {
                    Some(tag) => format!("sizeof(struct {tag})"),
                    None => format!("sizeof(struct {})", leaf.kind.c_name()),
                };
                (variable, offset)
            }
            TypeKind::Char
            | TypeKind::UnsignedChar
            | TypeKind::CharVariable
            | TypeKind::String => {
                let mut sizeof_name = "char";
                let buffer = varcharsize.atoi() > 1
                    || arrsize.atoi() > 0
                    || (varcharsize.atoi() == 0 && !varcharsize.is_zero())
                    || (arrsize.atoi() == 0 && !arrsize.is_zero());
                let variable = if buffer && siz.is_none() {
                    if matches!(leaf.kind, TypeKind::Char | TypeKind::UnsignedChar)
                        && varcharsize.is_zero()
                    {
                        // array of char pointers
                        sizeof_name = "char *";
                    }
                    bare
                } else {
                    addressed
                };
                let capacity = if varcharsize.is_zero() {
                    "1"
                } else {
                    varcharsize.as_str()
                };
                (variable, format!("({capacity})*sizeof({sizeof_name})"))
            }
            TypeKind::Const => {
                let literal = escape(name);
                (
                    format!("\"{literal}\""),
                    format!("strlen(\"{literal}\")"),
                )
            }
            // numeric, decimal, date, interval and timestamp included: a
            // pointer except for arrays with given bounds
            _ => {
                let variable = if arrsize.is_bounded() && siz.is_none() {
                    bare
                } else {
                    addressed
                };
                (variable, format!("sizeof({})", leaf.kind.c_name()))
            }
        };
        let arrsize = if arrsize.atoi() < 0 && siz.is_none() {
            "1"
        } else {
            arrsize.as_str()
        };
        let offset = match siz {
            Some(siz) => siz.as_str(),
            None => offset.as_str(),
        };
        self.out.push_str(&format!(
            "\n\t{},{},(long){},(long){},{}, ",
            leaf.kind.tag(),
            variable,
            varcharsize,
            arrsize,
            offset
        ));
    }
}

#[derive(Clone, Copy)]
enum IndicatorMembers<'t> {
    Absent,
    Sentinel,
    Members(&'t [Member], usize),
}

/// Escape text for a C string literal
pub fn escape(text: &str) -> String {
    let mut s = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => s.push_str("\\\""),
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            _ => s.push(c),
        }
    }
    s
}
