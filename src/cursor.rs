//! Declared cursors of a translation unit
use indexmap::IndexMap;
use log::debug;

use crate::error::Diagnostics;
use crate::variable::Argument;

/// Cursor declared with `DECLARE name CURSOR FOR ...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    /// cursor name
    pub name: String,
    /// `declare ... cursor for ...` statement text sent at `OPEN`
    pub command: String,
    /// connection given with `AT`
    pub connection: Option<String>,
    /// input arguments recorded at declaration
    pub arguments: Vec<Argument>,
    /// output arguments recorded at declaration
    pub results: Vec<Argument>,
    /// line of the declaration
    pub line: u64,
    /// whether an `OPEN` was seen
    pub opened: bool,
}

/// Cursor registry
#[derive(Debug, Default)]
pub struct Cursors {
    map: IndexMap<String, Cursor>,
}

impl Cursors {
    /// Declare `cursor`. A redeclaration with another statement is an
    /// error; the new declaration wins either way.
    pub fn declare(&mut self, cursor: Cursor, diags: &mut Diagnostics) {
        if let Some(previous) = self.map.get(&cursor.name) {
            if previous.command != cursor.command {
                diags.error(format!("cursor \"{}\" is already defined", cursor.name));
            }
        }
        debug!(target: "translate", "declare cursor {}", cursor.name);
        self.map.insert(cursor.name.clone(), cursor);
    }

    /// Mark `name` opened and return it
    pub fn open(&mut self, name: &str) -> Option<&Cursor> {
        let cursor = self.map.get_mut(name)?;
        cursor.opened = true;
        Some(cursor)
    }

    /// Cursors never opened, in declaration order
    pub fn unopened(&self) -> impl Iterator<Item = &Cursor> {
        self.map.values().filter(|c| !c.opened)
    }
}
