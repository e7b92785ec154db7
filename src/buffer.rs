//! Buffered, flush-on-full column writer.
//!
//! A [`ColumnBuffer`] owns one output file and a bounded staging array of
//! encoded elements. Elements are staged in memory; once the configured
//! capacity is reached the whole array is appended to the file in one write.
//! [`ColumnBuffer::finalize`] consumes the buffer, flushes the remainder and
//! patches the header's record count, so it can only ever run once.
//!
//! The `ignore` codec gets [`ColumnBuffer::Ignored`], for which every
//! operation is a no-op and no file exists.

use crate::codec::{ColumnType, EncodedValue};
use crate::error::{Error, Result};
use crate::header::{ColumnHeader, RECORD_COUNT_OFFSET};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Default number of elements staged before an automatic flush.
pub const DEFAULT_STAGING_CAPACITY: usize = 4096;

/// Staging array and backing writer for one (column, partition) pair.
#[derive(Debug)]
pub enum ColumnBuffer<W = File> {
    /// The column is skipped; nothing is staged or written.
    Ignored,
    /// The column is written to `W`.
    Active(ActiveBuffer<W>),
}

#[derive(Debug)]
pub struct ActiveBuffer<W> {
    writer: W,
    path: PathBuf,
    staging: Vec<u8>,
    width: usize,
    capacity: usize,
    committed: u64,
}

impl ColumnBuffer<File> {
    /// Create the backing file at `path`, write a fresh header and allocate
    /// a staging array of `capacity` elements.
    pub fn open(ty: &ColumnType, path: &Path, capacity: usize) -> Result<Self> {
        if ty.is_ignored() {
            return Ok(Self::Ignored);
        }
        let file = File::create(path).map_err(|e| Error::io("create", path, e))?;
        Self::from_writer(ty, file, path, capacity)
    }
}

impl<W: Write + Seek> ColumnBuffer<W> {
    /// Like [`ColumnBuffer::open`] but over an already-open writer positioned
    /// at offset 0. `path` is only used to label errors.
    pub fn from_writer(
        ty: &ColumnType,
        mut writer: W,
        path: impl Into<PathBuf>,
        capacity: usize,
    ) -> Result<Self> {
        if ty.is_ignored() {
            return Ok(Self::Ignored);
        }
        let path = path.into();
        let width = ty.width();
        let header = ColumnHeader::new(ty.tag(), width as u16);
        writer
            .write_all(&header.to_bytes())
            .map_err(|e| Error::io("write header to", &path, e))?;

        let bytes = capacity.saturating_mul(width);
        let mut staging = Vec::new();
        staging
            .try_reserve_exact(bytes)
            .map_err(|source| Error::Alloc { bytes, source })?;

        Ok(Self::Active(ActiveBuffer {
            writer,
            path,
            staging,
            width,
            capacity: capacity.max(1),
            committed: 0,
        }))
    }

    /// Append one element; flushes when the staging array becomes full.
    pub fn stage(&mut self, value: &EncodedValue) -> Result<()> {
        let Self::Active(buf) = self else {
            return Ok(());
        };
        debug_assert_eq!(value.width(), buf.width, "element width mismatch");
        buf.staging.extend_from_slice(value.as_bytes());
        if buf.staged() == buf.capacity {
            buf.flush()?;
        }
        Ok(())
    }

    /// Write all staged elements to the file. No-op when nothing is staged.
    pub fn flush(&mut self) -> Result<()> {
        match self {
            Self::Ignored => Ok(()),
            Self::Active(buf) => buf.flush(),
        }
    }

    /// Flush the remainder, patch the header's record count and close the
    /// file. Returns the final record count.
    pub fn finalize(self) -> Result<u64> {
        let Self::Active(mut buf) = self else {
            return Ok(0);
        };
        buf.flush()?;
        buf.writer
            .seek(SeekFrom::Start(RECORD_COUNT_OFFSET))
            .map_err(|e| Error::io("seek in", &buf.path, e))?;
        buf.writer
            .write_all(&buf.committed.to_ne_bytes())
            .map_err(|e| Error::io("patch record count of", &buf.path, e))?;
        buf.writer
            .flush()
            .map_err(|e| Error::io("close", &buf.path, e))?;
        trace!(path = %buf.path.display(), records = buf.committed, "finalized column file");
        Ok(buf.committed)
    }

    /// Elements already written to the file.
    pub fn committed(&self) -> u64 {
        match self {
            Self::Ignored => 0,
            Self::Active(buf) => buf.committed,
        }
    }

    /// Elements waiting in the staging array.
    pub fn staged(&self) -> usize {
        match self {
            Self::Ignored => 0,
            Self::Active(buf) => buf.staged(),
        }
    }

    /// Backing writer, for inspection in tests.
    pub fn writer(&self) -> Option<&W> {
        match self {
            Self::Ignored => None,
            Self::Active(buf) => Some(&buf.writer),
        }
    }
}

impl<W: Write> ActiveBuffer<W> {
    #[inline]
    fn staged(&self) -> usize {
        self.staging.len() / self.width
    }

    fn flush(&mut self) -> Result<()> {
        if self.staging.is_empty() {
            return Ok(());
        }
        let count = self.staged() as u64;
        self.writer
            .write_all(&self.staging)
            .map_err(|e| Error::io("write to", &self.path, e))?;
        self.committed += count;
        self.staging.clear();
        Ok(())
    }
}
