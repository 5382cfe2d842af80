//! Translation options
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bitflags::bitflags;
use indexmap::IndexMap;

bitflags! {
    /// Boolean switches of a translation
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// Connections are opened in autocommit mode
        const AUTOCOMMIT = 0x01;
        /// Runtime complains when a NULL is fetched without indicator
        const FORCE_INDICATOR = 0x02;
        /// `?` placeholders are allowed in prepared statements
        const QUESTIONMARKS = 0x04;
        /// Reproducible output (no version stamp)
        const REGRESSION = 0x08;
        /// Header file: no automatic include section
        const HEADER = 0x10;
        /// `EXEC SQL INCLUDE` also searches the system include directories
        const SYSTEM_INCLUDES = 0x20;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::FORCE_INDICATOR
    }
}

/// Vendor dialect emulated by the generated code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompatMode {
    /// native
    #[default]
    Pgsql = 0,
    /// Informix
    Informix = 1,
    /// Informix SE
    InformixSe = 2,
}

impl CompatMode {
    /// Value passed to the runtime
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Either Informix flavour
    pub fn is_informix(self) -> bool {
        matches!(self, CompatMode::Informix | CompatMode::InformixSe)
    }
}

/// Unknown compatibility mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compatibility mode \"{}\" is not supported", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for CompatMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("INFORMIX") {
            Ok(CompatMode::Informix)
        } else if s.eq_ignore_ascii_case("INFORMIX_SE") {
            Ok(CompatMode::InformixSe)
        } else if s.eq_ignore_ascii_case("PGSQL") {
            Ok(CompatMode::Pgsql)
        } else {
            Err(UnknownMode(s.to_owned()))
        }
    }
}

/// Everything a translation needs besides its input
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// switches
    pub flags: Flags,
    /// dialect
    pub compat: CompatMode,
    /// `EXEC SQL INCLUDE` search path, in order
    pub include_paths: Vec<PathBuf>,
    /// command-line defines, kept for every input file
    pub defines: IndexMap<String, String>,
}

impl Options {
    /// Add a `NAME[=VALUE]` command-line define; the value defaults to `1`.
    pub fn define(&mut self, def: &str) {
        let (name, value) = match def.split_once('=') {
            Some((name, value)) => (name, value),
            None => (def, "1"),
        };
        self.defines.insert(name.to_owned(), value.to_owned());
    }

    /// `force_indicator` argument of generated calls
    pub fn force_indicator(&self) -> i32 {
        i32::from(self.flags.contains(Flags::FORCE_INDICATOR))
    }

    /// `questionmarks` argument of generated calls
    pub fn questionmarks(&self) -> i32 {
        i32::from(self.flags.contains(Flags::QUESTIONMARKS))
    }

    /// `autocommit` argument of generated connects
    pub fn autocommit(&self) -> i32 {
        i32::from(self.flags.contains(Flags::AUTOCOMMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert_eq!(opts.force_indicator(), 1);
        assert_eq!(opts.questionmarks(), 0);
        assert_eq!(opts.compat.value(), 0);
    }

    #[test]
    fn defines() {
        let mut opts = Options::default();
        opts.define("DEBUG");
        opts.define("LEN=20");
        assert_eq!(opts.defines["DEBUG"], "1");
        assert_eq!(opts.defines["LEN"], "20");
    }

    #[test]
    fn compat_modes() {
        assert_eq!("informix".parse(), Ok(CompatMode::Informix));
        assert_eq!("INFORMIX_SE".parse(), Ok(CompatMode::InformixSe));
        assert!("oracle".parse::<CompatMode>().is_err());
    }
}
