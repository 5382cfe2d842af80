//! Embedded SQL preprocessor for C
//!
//! Reads C source containing `EXEC SQL` statements and host variable
//! declarations and produces plain C calling the `ecpglib` runtime.
//!
//! ```rust,no_run
//! use ecpg_preproc::{config::Options, TranslationContext};
//!
//! let options = Options::default();
//! let mut ctx = TranslationContext::new("prog.pgc", &options);
//! let c = ctx.translate(b"EXEC SQL BEGIN DECLARE SECTION; int n; EXEC SQL END DECLARE SECTION;")?;
//! print!("{c}");
//! # Ok::<(), ecpg_preproc::error::Error>(())
//! ```
#![warn(missing_docs)]
#![warn(clippy::large_stack_frames)]

pub mod config;
mod cursor;
mod descriptor;
pub mod dialect;
pub mod error;
pub mod lexer;
mod output;
pub mod parser;
mod translate;
pub mod types;
mod variable;
mod whenever;

pub use parser::ast;
pub use translate::TranslationContext;
