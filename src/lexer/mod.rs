//! Host file tokenizer

pub mod pgc;
mod scan;

pub use scan::{Pos, ScanError, Scanner, Splitter};
