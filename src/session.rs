//! Encoding session: the column × partition grid driven line by line.
//!
//! For each CSV data line the session
//! 1. splits it into exactly as many trimmed fields as the column list declares,
//! 2. encodes every field through its column's codec,
//! 3. asks the sampler for the record's partition assignments once, and
//! 4. stages each encoded value into the buffer of every assigned partition.
//!
//! All columns of a record share the same assignments, so a record's values
//! line up at the same element index across the columns of a partition.
//! Nothing is staged until the whole line has encoded, but any failure still
//! aborts the run: the sampler cannot be rewound.
//!
//! ```no_run
//! use rbsplit::{EncodeConfig, EncodingSession, datasets, preflight};
//! use std::path::PathBuf;
//!
//! # fn main() -> rbsplit::Result<()> {
//! let spec = datasets::cicfm::spec()?;
//! let inputs = vec![PathBuf::from("DrDoS_DNS.csv")];
//! let config = EncodeConfig { partitions: 5, repetitions: 1, ..Default::default() };
//!
//! let counted = preflight(&spec, &inputs, config.count_chunk_bytes)?;
//! let mut session = EncodingSession::create(spec, "out", config, counted.total_records)?;
//! for input in &inputs {
//!     session.encode_file(input)?;
//! }
//! let summary = session.finish()?;
//! println!("{} records encoded", summary.records);
//! # Ok(())
//! # }
//! ```

use crate::buffer::ColumnBuffer;
use crate::codec::EncodedValue;
use crate::config::EncodeConfig;
use crate::error::{Error, Result};
use crate::io::open_input;
use crate::layout::OutputLayout;
use crate::preflight::{preflight, read_header};
use crate::sampler::PartitionSampler;
use crate::schema::{ColumnSpec, byte_fields};
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Records between progress messages.
const PROGRESS_EVERY: u64 = 1_000_000;

/// Per-column outcome of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub tag: u64,
    /// Finalized record count of this column's file in each partition.
    pub records_per_partition: Vec<u64>,
}

/// Outcome of a finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncodeSummary {
    pub root: PathBuf,
    /// Data records consumed from the inputs.
    pub records: u64,
    pub partitions: u32,
    pub repetitions: u32,
    /// Assignments handed to each partition by the sampler.
    pub assigned: Vec<u64>,
    /// Stored (non-ignored) columns only.
    pub columns: Vec<ColumnSummary>,
}

impl EncodeSummary {
    /// Total staged elements per column (identical for every stored column).
    pub fn elements_per_column(&self) -> u64 {
        self.assigned.iter().sum()
    }
}

/// Exclusive owner of the buffer grid and the sampler state for one run.
#[derive(Debug)]
pub struct EncodingSession {
    spec: ColumnSpec,
    layout: OutputLayout,
    config: EncodeConfig,
    /// Indexed `column * partitions + partition`.
    grid: Vec<ColumnBuffer>,
    sampler: PartitionSampler,
    expected_records: u64,
    records: u64,
    scratch: Vec<EncodedValue>,
}

impl EncodingSession {
    /// Create the output layout under `root`, seed the sampler for
    /// `total_records` records and open one buffer per (column, partition).
    pub fn create(
        spec: ColumnSpec,
        root: impl Into<PathBuf>,
        config: EncodeConfig,
        total_records: u64,
    ) -> Result<Self> {
        config.validate()?;
        let sampler = PartitionSampler::new(
            config.partitions,
            config.repetitions,
            total_records,
            config.seed,
            config.remainder,
        )?;
        let layout = OutputLayout::create(root, config.partitions)?;

        let mut grid = Vec::with_capacity(spec.len() * config.partitions as usize);
        for (c, col) in spec.columns().iter().enumerate() {
            for p in 0..config.partitions {
                let path = layout.column_path(p, c);
                grid.push(ColumnBuffer::open(&col.ty, &path, config.staging_capacity)?);
            }
        }
        info!(
            columns = spec.len(),
            stored = spec.stored_columns(),
            partitions = config.partitions,
            repetitions = config.repetitions,
            records = total_records,
            slots = sampler.total_remaining(),
            "encoding session ready"
        );

        Ok(Self {
            scratch: Vec::with_capacity(spec.len()),
            spec,
            layout,
            config,
            grid,
            sampler,
            expected_records: total_records,
            records: 0,
        })
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn sampler(&self) -> &PartitionSampler {
        &self.sampler
    }

    /// Data records encoded so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Encode one data line (terminator optional). Ignored fields may hold
    /// arbitrary bytes; stored fields must be UTF-8.
    pub fn encode_line(&mut self, line: impl AsRef<[u8]>) -> Result<()> {
        if self.records == self.expected_records {
            return Err(Error::RecordOverflow {
                expected: self.expected_records,
            });
        }
        let mut line = line.as_ref();
        while let [rest @ .., b'\n' | b'\r'] = line {
            line = rest;
        }
        let columns = self.spec.columns();

        self.scratch.clear();
        for (i, token) in byte_fields(line).enumerate() {
            let Some(col) = columns.get(i) else {
                return Err(Error::FieldCount {
                    expected: columns.len(),
                    found: byte_fields(line).count(),
                });
            };
            let value = col.ty.parse_bytes(token).map_err(|source| Error::Value {
                column: i,
                name: col.name.clone(),
                source,
            })?;
            self.scratch.push(value);
        }
        if self.scratch.len() < columns.len() {
            return Err(Error::FieldCount {
                expected: columns.len(),
                found: self.scratch.len(),
            });
        }

        let (sampler, assignment) = std::mem::take(&mut self.sampler).next_partition_set();
        self.sampler = sampler;

        let partitions = self.config.partitions as usize;
        for (c, value) in self.scratch.iter().enumerate() {
            if columns[c].ty.is_ignored() {
                continue;
            }
            let row = &mut self.grid[c * partitions..(c + 1) * partitions];
            for &p in assignment.as_slice() {
                row[p as usize].stage(value)?;
            }
        }
        self.records += 1;
        Ok(())
    }

    /// Validate the header of `reader` and encode every following line.
    /// Returns the number of records read. `path` labels errors.
    pub fn encode_reader<R: BufRead>(&mut self, mut reader: R, path: &Path) -> Result<u64> {
        read_header(&self.spec, &mut reader, path)?;
        let mut line = Vec::new();
        let mut line_no = 1u64;
        let mut read = 0u64;
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| Error::io("read", path, e).at_line(path, line_no + 1))?;
            if n == 0 {
                break;
            }
            line_no += 1;
            self.encode_line(&line)
                .map_err(|e| e.at_line(path, line_no))?;
            read += 1;
            if self.records % PROGRESS_EVERY == 0 {
                debug!(
                    records = self.records,
                    of = self.expected_records,
                    "encoding progress"
                );
            }
        }
        Ok(read)
    }

    /// Encode one CSV input (compressed inputs are decompressed transparently).
    pub fn encode_file(&mut self, path: &Path) -> Result<u64> {
        info!(path = %path.display(), "encoding input");
        let reader = open_input(path)?;
        let read = self.encode_reader(reader, path)?;
        info!(path = %path.display(), records = read, "input encoded");
        Ok(read)
    }

    /// Finalize every buffer exactly once and report the run.
    ///
    /// All buffers are finalized even if one fails; the first failure is
    /// returned. A record count that disagrees with pre-flight is reported
    /// after the files are closed.
    pub fn finish(self) -> Result<EncodeSummary> {
        let Self {
            spec,
            layout,
            config,
            grid,
            sampler,
            expected_records,
            records,
            ..
        } = self;
        let partitions = config.partitions as usize;

        let mut first_error = None;
        let mut counts = Vec::with_capacity(grid.len());
        for buffer in grid {
            match buffer.finalize() {
                Ok(n) => counts.push(n),
                Err(e) => {
                    warn!(error = %e, "failed to finalize column file");
                    counts.push(0);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if records != expected_records {
            return Err(Error::RecordCountMismatch {
                expected: expected_records,
                actual: records,
            });
        }

        let columns = spec
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, col)| !col.ty.is_ignored())
            .map(|(c, col)| ColumnSummary {
                index: c,
                name: col.name.clone(),
                ty: col.ty.name().to_string(),
                tag: col.ty.tag(),
                records_per_partition: counts[c * partitions..(c + 1) * partitions].to_vec(),
            })
            .collect();

        let summary = EncodeSummary {
            root: layout.root().to_path_buf(),
            records,
            partitions: config.partitions,
            repetitions: config.repetitions,
            assigned: sampler.assigned(),
            columns,
        };
        info!(
            records,
            elements_per_column = summary.elements_per_column(),
            "all column files finalized"
        );

        #[cfg(feature = "manifest")]
        if config.write_manifest {
            crate::manifest::RunManifest::build(&layout, &spec, &config, &summary)?
                .save(&layout.manifest_path())?;
        }

        Ok(summary)
    }
}

/// Pre-flight every input, then encode them all into `root`.
pub fn run(
    spec: ColumnSpec,
    inputs: &[PathBuf],
    root: impl Into<PathBuf>,
    config: EncodeConfig,
) -> Result<EncodeSummary> {
    config.validate()?;
    let counted = preflight(&spec, inputs, config.count_chunk_bytes)?;
    let mut session = EncodingSession::create(spec, root, config, counted.total_records)?;
    for input in inputs {
        session.encode_file(input)?;
    }
    session.finish()
}
