use std::path::PathBuf;

use colored::*;
use structopt::StructOpt;

use kestrel::{
    common::{diag::Reporter, source::Source},
    compiler::lex::Lexer,
};

#[derive(StructOpt, Debug)]
#[structopt(name = "kestrelc", bin_name = "kestrelc", about)]
pub struct Opts {
    /// Source file to compile
    #[structopt(parse(from_os_str))]
    pub input: PathBuf,

    /// Where to write the assembly listing;
    /// defaults to the input with a `.j` extension
    #[structopt(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Dump the token stream instead of compiling
    #[structopt(long)]
    pub emit_tokens: bool,
}

pub enum Kind {
    Success,
    Error,
    Fatal,
}

/// Colored status tags on stderr, one line per event.
pub struct Status(pub Kind, pub &'static str);

impl Status {
    pub fn success() -> Status {
        Status(Kind::Success, "Success")
    }
    pub fn error() -> Status {
        Status(Kind::Error, "Error")
    }
    pub fn fatal() -> Status {
        Status(Kind::Fatal, "Fatal")
    }

    fn tag(&self) -> ColoredString {
        match self.0 {
            Kind::Success => self.1.green(),
            Kind::Error => self.1.yellow(),
            Kind::Fatal => self.1.red(),
        }
        .bold()
    }

    pub fn log(&self, message: &str) {
        eprintln!("{:>12} {}", self.tag(), message);
    }
}

fn main() {
    let opts = Opts::from_args();
    if let Err(message) = run(opts) {
        Status::fatal().log(&message);
        std::process::exit(1);
    }
}

fn run(opts: Opts) -> Result<(), String> {
    let source = Source::file(&opts.input)
        .map_err(|e| format!("could not read {}: {}", opts.input.display(), e))?;
    let reporter = Reporter::new();

    if opts.emit_tokens {
        let tokens =
            Lexer::tokenize(source, reporter.clone()).map_err(|e| e.to_string())?;
        for token in tokens {
            println!("{}", token);
        }
        for diag in reporter.diagnostics() {
            Status::error().log(&diag.to_string());
        }
        return Ok(());
    }

    let class = source.class_name();
    let result = kestrel::compile(source, &class, &reporter);

    // surface everything the core reported, in order
    for diag in reporter.diagnostics() {
        Status::error().log(&diag.to_string());
    }

    let assembly = result.map_err(|e| e.to_string())?;
    if !reporter.is_clean() {
        return Err(format!("{} error(s); no object file produced", reporter.count()));
    }

    let output = opts
        .output
        .unwrap_or_else(|| opts.input.with_extension("j"));
    assembly
        .write_to(&output)
        .map_err(|e| format!("could not write {}: {}", output.display(), e))?;
    Status::success().log(&format!("wrote {}", output.display()));
    Ok(())
}
