//! # Kestrel
//! A compiler for a small C-like language that emits textual
//! Jasmin-compatible assembly for the JVM.
//!
//! The pipeline is a single synchronous pass per stage:
//! the lexer feeds tokens to the parser on demand, the parser
//! builds one position-annotated syntax tree, the resolver
//! decorates it (declaration references, static types, explicit
//! numeric promotions), and the emitter walks it once to
//! produce the assembly listing.
//!
//! ## Embedding
//! ```ignore
//! use kestrel::{common::source::Source, common::diag::Reporter};
//!
//! let reporter = Reporter::new();
//! let source = Source::snippet("int main() { putIntLn(42); return 0; }");
//! let listing = kestrel::compile(source, "hello", &reporter).unwrap();
//! print!("{}", listing);
//! ```

pub mod codegen;
pub mod common;
pub mod compiler;

use std::rc::Rc;

use crate::codegen::assembly::Assembly;
use crate::common::{diag::Reporter, source::Source};
use crate::compiler::{lex::Lexer, parse::Parser, resolve::resolve, syntax::Syntax};

/// Compiles one unit front to back: lex, parse, decorate, emit.
/// `class` names the generated class (usually the input's file
/// stem). Recoverable lexical problems land in the `reporter`;
/// the first fatal error aborts with `Err` and no listing.
pub fn compile(source: Rc<Source>, class: &str, reporter: &Reporter) -> Result<Assembly, Syntax> {
    let lexer = Lexer::new(source, reporter.clone());
    let mut program = Parser::parse(lexer, reporter.clone())?;
    let table = resolve(&mut program, reporter)?;
    Ok(codegen::gen(&program, &table, class))
}
