//! Pre-flight: header validation and record counting.
//!
//! Before any output exists, every input is opened, its header is checked
//! against the [`ColumnSpec`], and its data lines are counted by scanning the
//! raw bytes for `\n` in large chunks. The aggregate count sizes the
//! partition sampler. Counting does not tokenize anything; it is much
//! cheaper than a parse pass.
//!
//! A final line without a terminator still counts as a record, matching
//! what the line-driven encoder will read.

use crate::error::{Error, Result};
use crate::io::open_input;
use crate::schema::ColumnSpec;
use serde::Serialize;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(feature = "parallel-io")]
use rayon::prelude::*;

/// Record count for one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileCount {
    pub path: PathBuf,
    pub records: u64,
}

/// Per-file and aggregate record counts, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Preflight {
    pub files: Vec<FileCount>,
    pub total_records: u64,
}

/// Read and validate the header line of `reader`.
pub(crate) fn read_header<R: BufRead>(
    spec: &ColumnSpec,
    reader: &mut R,
    path: &Path,
) -> Result<()> {
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .map_err(|e| Error::io("read header of", path, e))?;
    if n == 0 {
        return Err(Error::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    spec.check_header(&String::from_utf8_lossy(&line), path)
}

/// Count `\n`-terminated lines in `reader`, reading `chunk_bytes` at a time.
/// A trailing unterminated line counts as one more.
pub fn count_lines<R: Read>(reader: &mut R, chunk_bytes: usize, path: &Path) -> Result<u64> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(chunk_bytes)
        .map_err(|source| Error::Alloc {
            bytes: chunk_bytes,
            source,
        })?;
    buf.resize(chunk_bytes, 0);

    let mut count = 0u64;
    let mut last = None;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io("read", path, e)),
        };
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }
    if last.is_some_and(|b| b != b'\n') {
        count += 1;
    }
    Ok(count)
}

/// Validate the header of `path` and count its data records.
pub fn count_records(spec: &ColumnSpec, path: &Path, chunk_bytes: usize) -> Result<u64> {
    let mut reader = open_input(path)?;
    read_header(spec, &mut reader, path)?;
    let records = count_lines(&mut reader, chunk_bytes, path)?;
    debug!(path = %path.display(), records, "counted records");
    Ok(records)
}

/// Run [`count_records`] over every input and sum the counts.
///
/// With the `parallel-io` feature files are scanned concurrently; the
/// report keeps input order and the first failing input (in that order)
/// decides the error.
pub fn preflight(spec: &ColumnSpec, paths: &[PathBuf], chunk_bytes: usize) -> Result<Preflight> {
    #[cfg(feature = "parallel-io")]
    let counted: Vec<Result<u64>> = paths
        .par_iter()
        .map(|p| count_records(spec, p, chunk_bytes))
        .collect();
    #[cfg(not(feature = "parallel-io"))]
    let counted: Vec<Result<u64>> = paths
        .iter()
        .map(|p| count_records(spec, p, chunk_bytes))
        .collect();

    let mut report = Preflight::default();
    for (path, records) in paths.iter().zip(counted) {
        let records = records?;
        info!(path = %path.display(), records, "input is valid");
        report.total_records += records;
        report.files.push(FileCount {
            path: path.clone(),
            records,
        });
    }
    info!(
        files = report.files.len(),
        total_records = report.total_records,
        "pre-flight complete"
    );
    Ok(report)
}
