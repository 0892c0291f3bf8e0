//! The compiler front end. Each step turns one datatype into
//! another, starting from a `Source` (string + path):
//!
//! 1. Tokens:        `lex.rs`
//! 2. Syntax tree:   `parse.rs`
//! 3. Decorated tree + declaration table: `resolve.rs`
//!
//! Code generation over the decorated tree lives in the
//! `codegen` module.

pub mod ast;
pub mod lex;
pub mod parse;
pub mod resolve;
pub mod syntax;
pub mod token;

pub use lex::Lexer;
pub use parse::Parser;
pub use resolve::resolve;
