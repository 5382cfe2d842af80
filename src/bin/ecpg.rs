//! Command line front end: `ecpg [OPTION]... FILE...`
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use ecpg_preproc::config::{CompatMode, Flags, Options};
use ecpg_preproc::error::ErrorCode;
use ecpg_preproc::TranslationContext;

#[derive(Parser)]
#[command(
    name = "ecpg",
    about = "Embedded SQL preprocessor for C programs",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_flag = true
)]
struct Cli {
    /// Write the result to FILE (`-` for standard output)
    #[arg(short = 'o', value_name = "OUTFILE")]
    output: Option<String>,

    /// Search DIRECTORY for include files
    #[arg(short = 'I', value_name = "DIRECTORY")]
    include: Vec<PathBuf>,

    /// Define SYMBOL, with VALUE or 1
    #[arg(short = 'D', value_name = "SYMBOL[=VALUE]")]
    define: Vec<String>,

    /// Compatibility mode: INFORMIX or INFORMIX_SE
    #[arg(short = 'C', value_name = "MODE")]
    compat: Option<CompatMode>,

    /// Turn on autocommit of transactions
    #[arg(short = 't')]
    autocommit: bool,

    /// Runtime behavior: no_indicator, prepare or questionmarks
    #[arg(short = 'r', value_name = "OPTION")]
    runtime: Vec<String>,

    /// Parse a header file, output named `.h`
    #[arg(short = 'h')]
    header: bool,

    /// Parse system include files as well
    #[arg(short = 'i')]
    system_includes: bool,

    /// Run in regression testing mode
    #[arg(long)]
    regression: bool,

    /// Show this help, then exit
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Input files
    files: Vec<PathBuf>,
}

impl Cli {
    fn options(&self) -> Result<Options, String> {
        let mut options = Options::default();
        if let Some(compat) = self.compat {
            options.compat = compat;
        }
        if self.autocommit {
            options.flags |= Flags::AUTOCOMMIT;
        }
        if self.header {
            options.flags |= Flags::HEADER;
        }
        if self.system_includes {
            options.flags |= Flags::SYSTEM_INCLUDES;
        }
        if self.regression {
            options.flags |= Flags::REGRESSION;
        }
        for opt in &self.runtime {
            match opt.as_str() {
                "no_indicator" => options.flags.remove(Flags::FORCE_INDICATOR),
                "questionmarks" => options.flags |= Flags::QUESTIONMARKS,
                // statements are always prepared by the runtime
                "prepare" => {}
                _ => return Err(format!("invalid runtime option \"{opt}\"")),
            }
        }
        options.include_paths = self.include.clone();
        for def in &self.define {
            options.define(def);
        }
        Ok(options)
    }
}

/// `prog.pgc` -> `prog.c` (`prog.h` in header mode)
fn output_name(input: &Path, header: bool) -> PathBuf {
    let ext = if header { "h" } else { "c" };
    match input.extension() {
        Some(e) if e == "pgc" || e == "pgh" => input.with_extension(ext),
        _ => {
            let mut name = input.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        }
    }
}

/// Translate one file; the status code is `None` on success
fn process(input: &Path, output: Option<&str>, options: &Options) -> Option<ErrorCode> {
    let source = match fs::read(input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("ecpg: could not open file \"{}\": {err}", input.display());
            return Some(ErrorCode::IllegalOption);
        }
    };
    let file = input.to_string_lossy();
    let mut ctx = TranslationContext::new(&file, options);
    let result = ctx.translate(&source);
    let diags = ctx.into_diagnostics();
    for d in diags.reported() {
        eprintln!("{d}");
    }
    let text = match result {
        Ok(text) => text,
        Err(err) => {
            debug!("{}: translation stopped: {err}", file);
            return Some(err.code());
        }
    };
    let written = match output {
        Some("-") => io::stdout().lock().write_all(text.as_bytes()),
        Some(path) => fs::write(path, &text),
        None => fs::write(output_name(input, options.flags.contains(Flags::HEADER)), &text),
    };
    if let Err(err) = written {
        error!("cannot write output of {file}: {err}");
        eprintln!("ecpg: could not write output: {err}");
        return Some(ErrorCode::IllegalOption);
    }
    diags.status()
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(ErrorCode::IllegalOption.exit_code() as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let options = match cli.options() {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("ecpg: {msg}");
            return ExitCode::from(ErrorCode::IllegalOption.exit_code() as u8);
        }
    };
    if cli.files.is_empty() {
        eprintln!("ecpg: no input files specified");
        eprintln!("Try \"ecpg --help\" for more information.");
        return ExitCode::from(ErrorCode::IllegalOption.exit_code() as u8);
    }

    let mut status = None;
    for input in &cli.files {
        if let Some(code) = process(input, cli.output.as_deref(), &options) {
            status = Some(code);
        }
    }
    match status {
        Some(code) => ExitCode::from(code.exit_code() as u8),
        None => ExitCode::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert_eq!(output_name(Path::new("a/prog.pgc"), false), PathBuf::from("a/prog.c"));
        assert_eq!(output_name(Path::new("prog.pgc"), true), PathBuf::from("prog.h"));
        assert_eq!(output_name(Path::new("prog"), false), PathBuf::from("prog.c"));
    }

    #[test]
    fn runtime_options() {
        let cli = Cli::parse_from(["ecpg", "-r", "no_indicator", "-t", "-C", "INFORMIX", "x.pgc"]);
        let options = cli.options().unwrap();
        assert!(!options.flags.contains(Flags::FORCE_INDICATOR));
        assert!(options.flags.contains(Flags::AUTOCOMMIT));
        assert_eq!(options.compat, CompatMode::Informix);

        let cli = Cli::parse_from(["ecpg", "-r", "bogus", "x.pgc"]);
        assert!(cli.options().is_err());
    }
}
