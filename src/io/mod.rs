//! Input-side plumbing: transparent decompression and path expansion.

pub mod compression;
pub mod glob;

pub use compression::{auto_detect_reader, auto_detect_writer, open_input};
pub use glob::{expand_glob, resolve_inputs};
