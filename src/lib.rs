//! # rbsplit
//!
//! Re-encodes schema-validated CSV into per-column **raw binary arrays**,
//! split across `P` partitions by a balanced randomized sampler that can
//! place each record in `K` partitions.
//!
//! ## Key Features
//!
//! - **Typed column codecs** - integers of 1/2/4/8 bytes, `float`, `double`,
//!   closed label vocabularies, and `ignore`
//! - **Self-describing files** - a fixed 32-byte header with magic, type tag,
//!   record count and element width ahead of a contiguous native-endian payload
//! - **Balanced sampling** - every partition ends with exactly its share of
//!   the `R·K` assignments, reproducibly
//! - **Streaming** - inputs are read line by line; memory stays bounded by
//!   the staging arrays regardless of input size
//! - **Compressed inputs** - gzip, zstd, bzip2 and xz, detected by extension
//!   or magic bytes (all optional via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use rbsplit::*;
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let spec = datasets::cicfm::spec()?;
//! let inputs = resolve_inputs(&["captures/*.csv"])?;
//! let config = EncodeConfig { partitions: 10, repetitions: 2, ..Default::default() };
//!
//! let summary = run(spec, &inputs, PathBuf::from("encoded"), config)?;
//! println!("{} records, {:?} per partition", summary.records, summary.assigned);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`preflight`] validates every header and counts data records
//! 2. [`EncodingSession::create`] builds the layout, the sampler and one
//!    [`ColumnBuffer`] per (column, partition)
//! 3. [`EncodingSession::encode_file`] streams each input through the codecs
//! 4. [`EncodingSession::finish`] patches record counts into every header
//!
//! A failure at any step aborts the run. Files already opened are left
//! closed but with unspecified contents.
//!
//! ## Module Overview
//!
//! - [`codec`] - column types, literal parsing and label vocabularies
//! - [`header`] - the column file header
//! - [`buffer`] - staged, flushed, finalized column files
//! - [`sampler`] - the partition sampler
//! - [`session`] - the encoding session and the one-call [`run`]
//! - [`reader`] - decoding column files
//! - [`datasets`] - built-in schemas
//! - [`testing`] - fixtures and assertions for tests

pub mod buffer;
pub mod codec;
pub mod config;
pub mod datasets;
pub mod error;
pub mod header;
pub mod io;
pub mod layout;
#[cfg(feature = "manifest")]
pub mod manifest;
pub mod preflight;
pub mod reader;
pub mod sampler;
pub mod schema;
pub mod session;
pub mod testing;

pub use buffer::ColumnBuffer;
pub use codec::{ColumnType, EncodedValue, LabelSet};
pub use config::EncodeConfig;
pub use error::{Error, Result, ValueError};
pub use header::ColumnHeader;
pub use io::{open_input, resolve_inputs};
pub use layout::OutputLayout;
pub use preflight::{Preflight, count_records, preflight};
pub use reader::{ColumnReader, ColumnValues, read_column};
pub use sampler::{PartitionSampler, PartitionSet, RemainderPolicy};
pub use schema::{ColumnDef, ColumnSpec};
pub use session::{EncodeSummary, EncodingSession, run};

#[cfg(feature = "manifest")]
pub use manifest::RunManifest;
