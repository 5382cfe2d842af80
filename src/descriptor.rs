//! SQL descriptors allocated by the translation unit, and descriptor items
use std::fmt;

use log::debug;

use crate::dialect::Keyword;
use crate::error::Diagnostics;

/// Allocated descriptors, per connection.
///
/// Only descriptors named by a literal (`'d'`, emitted as `"d"`) are
/// tracked; names held in host variables are only known at run time.
#[derive(Debug, Default)]
pub struct Descriptors {
    list: Vec<(String, Option<String>)>,
}

fn is_literal(name: &str) -> bool {
    name.starts_with('"')
}

impl Descriptors {
    /// `ALLOCATE DESCRIPTOR`
    pub fn add(&mut self, name: &str, connection: Option<&str>) {
        if !is_literal(name) {
            return;
        }
        debug!(target: "translate", "allocate descriptor {name}");
        self.list
            .push((name.to_owned(), connection.map(str::to_owned)));
    }

    /// `DEALLOCATE DESCRIPTOR`
    pub fn drop(&mut self, name: &str, connection: Option<&str>, diags: &mut Diagnostics) {
        if !is_literal(name) {
            return;
        }
        match self.position(name, connection) {
            Some(i) => {
                self.list.remove(i);
            }
            None => not_found(name, connection, diags),
        }
    }

    /// Check that `name` was allocated; reports an error otherwise.
    pub fn lookup(&self, name: &str, connection: Option<&str>, diags: &mut Diagnostics) -> bool {
        if !is_literal(name) || self.position(name, connection).is_some() {
            return true;
        }
        not_found(name, connection, diags);
        false
    }

    fn position(&self, name: &str, connection: Option<&str>) -> Option<usize> {
        self.list
            .iter()
            .position(|(n, c)| n == name && c.as_deref() == connection)
    }
}

fn not_found(name: &str, connection: Option<&str>, diags: &mut Diagnostics) {
    match connection {
        Some(c) => diags.error(format!(
            "descriptor {name} bound to connection {c} does not exist"
        )),
        None => diags.error(format!("descriptor {name} does not exist")),
    }
}

/// Item of a descriptor area
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    /// `CARDINALITY`
    Cardinality,
    /// `DATA`
    Data,
    /// `DATETIME_INTERVAL_CODE`
    DiCode,
    /// `DATETIME_INTERVAL_PRECISION`
    DiPrecision,
    /// `INDICATOR`
    Indicator,
    /// `KEY_MEMBER`
    KeyMember,
    /// `LENGTH`
    Length,
    /// `NAME`
    Name,
    /// `NULLABLE`
    Nullable,
    /// `OCTET_LENGTH`
    Octet,
    /// `PRECISION`
    Precision,
    /// `RETURNED_LENGTH`
    RetLength,
    /// `RETURNED_OCTET_LENGTH`
    RetOctet,
    /// `SCALE`
    Scale,
    /// `TYPE`
    Type,
}

/// What `SET DESCRIPTOR` can do with an item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settable {
    /// supported
    Yes,
    /// meaningful but not supported by the runtime
    NotImplemented,
    /// read-only
    No,
}

impl Item {
    /// Item for a keyword
    pub fn from_keyword(kw: Keyword) -> Option<Item> {
        Some(match kw {
            Keyword::Cardinality => Item::Cardinality,
            Keyword::Data => Item::Data,
            Keyword::DatetimeIntervalCode => Item::DiCode,
            Keyword::DatetimeIntervalPrecision => Item::DiPrecision,
            Keyword::Indicator => Item::Indicator,
            Keyword::KeyMember => Item::KeyMember,
            Keyword::Length => Item::Length,
            Keyword::Name => Item::Name,
            Keyword::Nullable => Item::Nullable,
            Keyword::OctetLength => Item::Octet,
            Keyword::Precision => Item::Precision,
            Keyword::ReturnedLength => Item::RetLength,
            Keyword::ReturnedOctetLength => Item::RetOctet,
            Keyword::Scale => Item::Scale,
            Keyword::Type => Item::Type,
            _ => return None,
        })
    }

    /// Runtime item code
    pub fn code(self) -> &'static str {
        match self {
            Item::Cardinality => "ECPGd_cardinality",
            Item::Data => "ECPGd_data",
            Item::DiCode => "ECPGd_di_code",
            Item::DiPrecision => "ECPGd_di_precision",
            Item::Indicator => "ECPGd_indicator",
            Item::KeyMember => "ECPGd_key_member",
            Item::Length => "ECPGd_length",
            Item::Name => "ECPGd_name",
            Item::Nullable => "ECPGd_nullable",
            Item::Octet => "ECPGd_octet",
            Item::Precision => "ECPGd_precision",
            Item::RetLength => "ECPGd_ret_length",
            Item::RetOctet => "ECPGd_ret_octet",
            Item::Scale => "ECPGd_scale",
            Item::Type => "ECPGd_type",
        }
    }

    /// Support by `SET DESCRIPTOR`
    pub fn settable(self) -> Settable {
        match self {
            Item::Data | Item::Indicator | Item::Length | Item::Type => Settable::Yes,
            Item::Cardinality
            | Item::DiCode
            | Item::DiPrecision
            | Item::Precision
            | Item::Scale => Settable::NotImplemented,
            Item::KeyMember
            | Item::Name
            | Item::Nullable
            | Item::Octet
            | Item::RetLength
            | Item::RetOctet => Settable::No,
        }
    }

    /// Fixed value reported instead of reading the item, if any
    pub fn constant(self) -> Option<&'static str> {
        match self {
            Item::Nullable => Some("nullable is always 1"),
            Item::KeyMember => Some("key_member is always 0"),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // item name as written in SQL
        let code = self.code();
        f.write_str(&code["ECPGd_".len()..])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut diags = Diagnostics::new("t.pgc");
        let mut descriptors = Descriptors::default();
        assert!(!descriptors.lookup("\"d\"", None, &mut diags));
        descriptors.add("\"d\"", None);
        assert!(descriptors.lookup("\"d\"", None, &mut diags));
        assert!(!descriptors.lookup("\"d\"", Some("con1"), &mut diags));
        descriptors.drop("\"d\"", None, &mut diags);
        assert!(!descriptors.lookup("\"d\"", None, &mut diags));
        let messages: Vec<_> = diags.reported().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "descriptor \"d\" does not exist",
                "descriptor \"d\" bound to connection con1 does not exist",
                "descriptor \"d\" does not exist",
            ]
        );
    }

    #[test]
    fn variable_names_are_not_tracked() {
        let mut diags = Diagnostics::new("t.pgc");
        let mut descriptors = Descriptors::default();
        assert!(descriptors.lookup("dname", None, &mut diags));
        descriptors.drop("dname", None, &mut diags);
        assert!(diags.reported().is_empty());
    }

    #[test]
    fn items() {
        assert_eq!(Item::from_keyword(Keyword::OctetLength), Some(Item::Octet));
        assert_eq!(Item::from_keyword(Keyword::Plain), None);
        assert_eq!(Item::Data.settable(), Settable::Yes);
        assert_eq!(Item::Scale.settable(), Settable::NotImplemented);
        assert_eq!(Item::Name.settable(), Settable::No);
        assert_eq!(Item::RetLength.to_string(), "ret_length");
    }
}
