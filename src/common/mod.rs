//! Datastructures shared by every stage of the compiler:
//! source code representation, positions and spans,
//! and the diagnostics sink.

pub mod diag;
pub mod source;
pub mod span;
