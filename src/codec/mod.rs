//! Variable-length integer, zig-zag and run-length codec.
//!
//! The debug-information format is built from a handful of primitives: unsigned base-128 varints,
//! zig-zag signed varints, run-length arrays and length-prefixed strings. [`Parser`] decodes them
//! from a borrowed buffer with full bounds checking, [`Writer`] encodes them into a growable one.
//!
//! Relative ("delta") coding is layered on top by the section readers and writers in
//! [`crate::information`]: a value is stored as its difference from the previous value of the same
//! array, and the running base restarts at zero for every section.

mod parser;
mod writer;

pub use parser::Parser;
pub use writer::Writer;
