//! Sample schema and CSV inputs.

use crate::codec::{ColumnType, LabelSet};
use crate::schema::{ColumnDef, ColumnSpec};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Tag of the sample vocabulary ("SAMPLABL" read as bytes).
pub const SAMPLE_LABEL_TAG: u64 = 0x4C42_414C_504D_4153;

/// Labels of the sample vocabulary.
pub const SAMPLE_LABELS: [&str; 2] = ["BENIGN", "Syn"];

/// A five-column schema exercising an ignored column, two integer widths,
/// a float and a label.
///
/// ```text
/// id (ignore), bytes (uint32), delta (int16), score (float), Label (attack)
/// ```
#[must_use]
pub fn sample_spec() -> ColumnSpec {
    let labels = match LabelSet::new("attack", SAMPLE_LABEL_TAG, SAMPLE_LABELS) {
        Ok(set) => Arc::new(set),
        Err(e) => panic!("sample vocabulary is valid: {e}"),
    };
    let spec = ColumnSpec::new([
        ColumnDef::new("id", ColumnType::Ignore),
        ColumnDef::new("bytes", ColumnType::UInt32),
        ColumnDef::new("delta", ColumnType::Int16),
        ColumnDef::new("score", ColumnType::Float),
        ColumnDef::new("Label", ColumnType::Label(labels)),
    ]);
    match spec {
        Ok(spec) => spec,
        Err(e) => panic!("sample schema is valid: {e}"),
    }
}

/// One data line of the sample schema.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRow {
    pub id: String,
    pub bytes: u32,
    pub delta: i16,
    pub score: f32,
    pub label: &'static str,
}

impl SampleRow {
    /// Field texts in schema order.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.bytes.to_string(),
            self.delta.to_string(),
            self.score.to_string(),
            self.label.to_string(),
        ]
    }

    /// Field texts of the stored columns as they read back from column files.
    #[must_use]
    pub fn stored_fields(&self) -> Vec<String> {
        self.fields().split_off(1)
    }
}

/// `n` deterministic rows with distinct `bytes` values.
#[must_use]
pub fn sample_rows(n: usize) -> Vec<SampleRow> {
    (0..n)
        .map(|i| SampleRow {
            id: format!("flow-{i}"),
            bytes: i as u32 * 7 + 3,
            delta: (i % 200) as i16 - 100,
            score: i as f32 * 0.25,
            label: SAMPLE_LABELS[usize::from(i % 3 == 0)],
        })
        .collect()
}

/// Write `rows` under the sample header with the `csv` crate.
pub fn write_sample_csv(path: &Path, rows: &[SampleRow]) -> Result<()> {
    let spec = sample_spec();
    write_csv(path, spec.names(), rows.iter().map(SampleRow::fields))
}

/// Write a header and records as plain comma-separated lines.
pub fn write_csv<H, R, F>(path: &Path, header: H, records: R) -> Result<()>
where
    H: IntoIterator,
    H::Item: AsRef<[u8]>,
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?;
    wtr.write_record(header)?;
    for record in records {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(())
}
