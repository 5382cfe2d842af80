//! `EXEC SQL WHENEVER` state and the guard code appended to statements
use std::fmt;

use bitflags::bitflags;

use crate::output::line_directive;

/// Action taken when a condition holds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WhenAction {
    /// `CONTINUE`: nothing
    #[default]
    Nothing,
    /// `SQLPRINT`
    Sqlprint,
    /// `GOTO label` / `GO TO label`
    Goto(String),
    /// `DO function(args)` / `CALL function(args)`
    Do(String),
    /// `STOP`
    Stop,
    /// `DO BREAK`
    Break,
    /// `DO CONTINUE`
    Continue,
}

impl fmt::Display for WhenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhenAction::Nothing => Ok(()),
            WhenAction::Sqlprint => f.write_str("sqlprint();"),
            WhenAction::Goto(label) => write!(f, "goto {label};"),
            WhenAction::Do(call) => write!(f, "{call};"),
            WhenAction::Stop => f.write_str("exit (1);"),
            WhenAction::Break => f.write_str("break;"),
            WhenAction::Continue => f.write_str("continue;"),
        }
    }
}

/// Condition of a `WHENEVER`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// `SQLERROR`
    Error,
    /// `SQLWARNING`
    Warning,
    /// `NOT FOUND`
    NotFound,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Condition::Error => "sqlerror",
            Condition::Warning => "sqlwarning",
            Condition::NotFound => "not found",
        })
    }
}

bitflags! {
    /// Which parts of the guard to emit
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Guard: u8 {
        /// test for "no data" (statements that may return rows)
        const NOT_FOUND = 1;
        /// close the block opened by the call
        const CLOSE_BLOCK = 2;
    }
}

/// Actions in effect
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whenever {
    error: WhenAction,
    warning: WhenAction,
    not_found: WhenAction,
}

impl Whenever {
    /// Set the action of `condition`
    pub fn set(&mut self, condition: Condition, action: WhenAction) {
        let slot = match condition {
            Condition::Error => &mut self.error,
            Condition::Warning => &mut self.warning,
            Condition::NotFound => &mut self.not_found,
        };
        *slot = action;
    }

    /// Action of `condition`
    pub fn get(&self, condition: Condition) -> &WhenAction {
        match condition {
            Condition::Error => &self.error,
            Condition::Warning => &self.warning,
            Condition::NotFound => &self.not_found,
        }
    }

    /// Append the guard code following a runtime call
    pub fn emit(&self, out: &mut String, guard: Guard, line: u64, file: &str) {
        let tests = [
            (Condition::NotFound, "if (sqlca.sqlcode == ECPG_NOT_FOUND) "),
            (Condition::Warning, "if (sqlca.sqlwarn[0] == 'W') "),
            (Condition::Error, "if (sqlca.sqlcode < 0) "),
        ];
        for (condition, test) in tests {
            if condition == Condition::NotFound && !guard.contains(Guard::NOT_FOUND) {
                continue;
            }
            let action = self.get(condition);
            if *action == WhenAction::Nothing {
                continue;
            }
            line_directive(out, line, file);
            out.push('\n');
            out.push_str(test);
            out.push_str(&action.to_string());
        }
        if guard.contains(Guard::CLOSE_BLOCK) {
            out.push('}');
        }
        line_directive(out, line, file);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn actions() {
        assert_eq!(WhenAction::Sqlprint.to_string(), "sqlprint();");
        assert_eq!(WhenAction::Goto("err".to_owned()).to_string(), "goto err;");
        assert_eq!(WhenAction::Do("f(1)".to_owned()).to_string(), "f(1);");
        assert_eq!(WhenAction::Stop.to_string(), "exit (1);");
        assert_eq!(WhenAction::Nothing.to_string(), "");
    }

    #[test]
    fn guard_order_and_modes() {
        let mut w = Whenever::default();
        w.set(Condition::Error, WhenAction::Goto("err".to_owned()));
        w.set(Condition::NotFound, WhenAction::Break);
        w.set(Condition::Warning, WhenAction::Sqlprint);

        let mut out = String::new();
        w.emit(&mut out, Guard::all(), 7, "a.pgc");
        assert_eq!(
            out,
            "\n#line 7 \"a.pgc\"\n\nif (sqlca.sqlcode == ECPG_NOT_FOUND) break;\
             \n#line 7 \"a.pgc\"\n\nif (sqlca.sqlwarn[0] == 'W') sqlprint();\
             \n#line 7 \"a.pgc\"\n\nif (sqlca.sqlcode < 0) goto err;}\
             \n#line 7 \"a.pgc\"\n"
        );

        let mut out = String::new();
        w.emit(&mut out, Guard::empty(), 7, "a.pgc");
        assert!(!out.contains("ECPG_NOT_FOUND"));
        assert!(!out.contains('}'));
    }

    #[test]
    fn nothing_set() {
        let mut out = String::new();
        Whenever::default().emit(&mut out, Guard::CLOSE_BLOCK, 3, "a.pgc");
        assert_eq!(out, "}\n#line 3 \"a.pgc\"\n");
    }
}
