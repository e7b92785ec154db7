//! Output directory layout.
//!
//! ```text
//! <root>/
//!   manifest.json            (feature `manifest`)
//!   p00000000/
//!     c00000001.bin
//!     c00000003.bin
//!   p00000001/
//!     ...
//! ```
//!
//! One directory per partition, one file per stored column, both named with
//! eight uppercase hex digits. Ignored columns keep their index but get no
//! file. The root must not exist yet: a run never resumes or overwrites an
//! earlier one.

use crate::error::{Error, Result};
use crate::schema::ColumnSpec;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Refer to an existing (or yet to be created) layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and one directory per partition.
    pub fn create(root: impl Into<PathBuf>, partitions: u32) -> Result<Self> {
        let layout = Self::new(root);
        if let Some(parent) = layout.root.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io("mkdir -p", parent, e))?;
        }
        fs::create_dir(&layout.root).map_err(|e| Error::io("create directory", &layout.root, e))?;
        for p in 0..partitions {
            let dir = layout.partition_dir(p);
            fs::create_dir(&dir).map_err(|e| Error::io("create directory", &dir, e))?;
        }
        info!(root = %layout.root.display(), partitions, "created output layout");
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_dir(&self, partition: u32) -> PathBuf {
        self.root.join(format!("p{partition:08X}"))
    }

    pub fn column_path(&self, partition: u32, column: usize) -> PathBuf {
        self.partition_dir(partition).join(format!("c{column:08X}.bin"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Partition directories present on disk, sorted by index.
    pub fn partitions_on_disk(&self) -> Result<Vec<u32>> {
        let entries = fs::read_dir(&self.root).map_err(|e| Error::io("read directory", &self.root, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("read directory", &self.root, e))?;
            let name = entry.file_name();
            let Some(hex) = name.to_str().and_then(|n| n.strip_prefix('p')) else {
                continue;
            };
            if hex.len() == 8
                && let Ok(p) = u32::from_str_radix(hex, 16)
                && entry.path().is_dir()
            {
                found.push(p);
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Every (column index, path) a partition holds for `spec`.
    pub fn column_files(&self, spec: &ColumnSpec, partition: u32) -> Vec<(usize, PathBuf)> {
        spec.columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.ty.is_ignored())
            .map(|(i, _)| (i, self.column_path(partition, i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_use_upper_hex() {
        let layout = OutputLayout::new("/data/out");
        assert_eq!(
            layout.column_path(10, 255),
            PathBuf::from("/data/out/p0000000A/c000000FF.bin")
        );
    }

    #[test]
    fn refuses_existing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = OutputLayout::create(tmp.path(), 2).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn lists_created_partitions() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::create(tmp.path().join("run"), 3).unwrap();
        assert_eq!(layout.partitions_on_disk().unwrap(), vec![0, 1, 2]);
    }
}
