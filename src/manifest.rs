//! Run manifest: `manifest.json` at the layout root.
//!
//! Records the configuration a run used, its columns, and for every column
//! file its record count and SHA-256 digest, so a finished layout can be
//! verified without the CSV inputs.

use crate::config::EncodeConfig;
use crate::error::{Error, Result};
use crate::layout::OutputLayout;
use crate::schema::ColumnSpec;
use crate::session::EncodeSummary;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One stored column of the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestColumn {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub tag: u64,
}

/// One column file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Relative to the layout root.
    pub path: PathBuf,
    pub partition: u32,
    pub column: usize,
    pub records: u64,
    pub sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: String,
    pub config: EncodeConfig,
    pub records: u64,
    pub assigned: Vec<u64>,
    pub columns: Vec<ManifestColumn>,
    pub files: Vec<ManifestFile>,
}

impl RunManifest {
    /// Describe a finished run, hashing every column file.
    pub fn build(
        layout: &OutputLayout,
        spec: &ColumnSpec,
        config: &EncodeConfig,
        summary: &EncodeSummary,
    ) -> Result<Self> {
        let columns = summary
            .columns
            .iter()
            .map(|c| ManifestColumn {
                index: c.index,
                name: c.name.clone(),
                ty: c.ty.clone(),
                tag: c.tag,
            })
            .collect();

        let mut files = Vec::new();
        for p in 0..summary.partitions {
            for (column, path) in layout.column_files(spec, p) {
                let records = summary
                    .columns
                    .iter()
                    .find(|c| c.index == column)
                    .map_or(0, |c| c.records_per_partition[p as usize]);
                let relative = path
                    .strip_prefix(layout.root())
                    .map_or_else(|_| path.clone(), Path::to_path_buf);
                files.push(ManifestFile {
                    sha256: file_digest(&path)?,
                    path: relative,
                    partition: p,
                    column,
                    records,
                });
            }
        }

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
            records: summary.records,
            assigned: summary.assigned.clone(),
            columns,
            files,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = File::create(path).map_err(|e| Error::io("create", path, e))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)
            .map_err(|e| Error::io("write", path, e.into()))?;
        w.flush().map_err(|e| Error::io("write", path, e))?;
        info!(path = %path.display(), files = self.files.len(), "wrote run manifest");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| Error::io("open", path, e))?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| Error::Format {
            path: path.to_path_buf(),
            reason: format!("bad manifest: {e}"),
        })
    }

    /// Re-hash every listed file under `root` and return the ones whose
    /// digest no longer matches.
    pub fn verify(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for file in &self.files {
            if file_digest(&root.join(&file.path))? != file.sha256 {
                changed.push(file.path.clone());
            }
        }
        Ok(changed)
    }
}

/// Hex SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut f = File::open(path).map_err(|e| Error::io("open", path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf).map_err(|e| Error::io("read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}
