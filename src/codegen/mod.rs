//! Code generation: lowering a decorated syntax tree into a
//! textual Jasmin-compatible assembly listing.
//!
//! The split mirrors the rest of the pipeline: `jvm` holds the
//! raw mnemonics, `frame` tracks one function's compile-time
//! resources, `assembly` is the append-only instruction store,
//! and `emit` walks the tree and does the actual lowering.

pub mod assembly;
pub mod emit;
pub mod frame;
pub mod jvm;

pub use emit::gen;
