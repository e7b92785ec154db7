//! Reading finished layouts back and checking their invariants.

use crate::layout::OutputLayout;
use crate::reader::{ColumnValues, read_column};
use crate::schema::ColumnSpec;
use anyhow::{Context, Result, ensure};
use std::path::Path;

/// Decode every stored column of partition `p`, in column order.
pub fn read_partition(root: &Path, spec: &ColumnSpec, p: u32) -> Result<Vec<(usize, ColumnValues)>> {
    let layout = OutputLayout::new(root);
    layout
        .column_files(spec, p)
        .into_iter()
        .map(|(c, path)| {
            let (_, values) =
                read_column(&path, spec).with_context(|| format!("reading {}", path.display()))?;
            Ok((c, values))
        })
        .collect()
}

/// Rows of partition `p` as text, one entry per stored column.
///
/// Fails if the columns disagree on their length.
pub fn partition_rows(root: &Path, spec: &ColumnSpec, p: u32) -> Result<Vec<Vec<String>>> {
    let columns = read_partition(root, spec, p)?;
    let len = columns.first().map_or(0, |(_, v)| v.len());
    for (c, values) in &columns {
        ensure!(
            values.len() == len,
            "partition {p}: column {c} holds {} records, column {} holds {len}",
            values.len(),
            columns[0].0
        );
    }
    Ok((0..len)
        .map(|i| {
            columns
                .iter()
                .map(|(_, v)| v.text(i).unwrap_or_default())
                .collect()
        })
        .collect())
}

/// Check that within each partition every stored column has the same record
/// count. Returns the per-partition counts.
pub fn assert_partitions_aligned(root: &Path, spec: &ColumnSpec, partitions: u32) -> Result<Vec<u64>> {
    (0..partitions)
        .map(|p| partition_rows(root, spec, p).map(|rows| rows.len() as u64))
        .collect()
}

/// Assert that every partition received exactly `expected` assignments.
///
/// # Panics
///
/// Panics if any count differs.
pub fn assert_balanced(counts: &[u64], expected: u64) {
    for (p, &n) in counts.iter().enumerate() {
        assert_eq!(
            n, expected,
            "partition {p} holds {n} records, expected {expected}; all counts: {counts:?}"
        );
    }
}
