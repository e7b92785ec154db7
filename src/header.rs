//! Fixed-size header at the start of every column file.
//!
//! Layout (native endianness, no padding):
//!
//! ```text
//! offset  width  field
//!      0      8  format magic ("RAWBINAR")
//!      8      8  type tag
//!     16      8  record count (0 at open, patched at finalize)
//!     24      4  data offset (= header size)
//!     28      2  element width
//!     30      2  format version
//! ```

use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

/// Constant identifying the container format.
pub const FORMAT_MAGIC: u64 = 0x5241_4E49_4257_4152;

/// Container format version written by this crate.
pub const FORMAT_VERSION: u16 = 0;

/// Size of the encoded header in bytes.
pub const HEADER_LEN: usize = 32;

/// Byte offset of the record-count field, patched at finalize.
pub const RECORD_COUNT_OFFSET: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHeader {
    pub magic: u64,
    pub type_tag: u64,
    pub records: u64,
    pub data_offset: u32,
    pub element_width: u16,
    pub version: u16,
}

impl ColumnHeader {
    /// A fresh header for a file about to receive elements.
    pub fn new(type_tag: u64, element_width: u16) -> Self {
        Self {
            magic: FORMAT_MAGIC,
            type_tag,
            records: 0,
            data_offset: HEADER_LEN as u32,
            element_width,
            version: FORMAT_VERSION,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(&self.magic.to_ne_bytes());
        out[8..16].copy_from_slice(&self.type_tag.to_ne_bytes());
        out[16..24].copy_from_slice(&self.records.to_ne_bytes());
        out[24..28].copy_from_slice(&self.data_offset.to_ne_bytes());
        out[28..30].copy_from_slice(&self.element_width.to_ne_bytes());
        out[30..32].copy_from_slice(&self.version.to_ne_bytes());
        out
    }

    /// Decode a header without validating it.
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            u64::from_ne_bytes(b)
        };
        Self {
            magic: u64_at(0),
            type_tag: u64_at(8),
            records: u64_at(16),
            data_offset: u32::from_ne_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            element_width: u16::from_ne_bytes([bytes[28], bytes[29]]),
            version: u16::from_ne_bytes([bytes[30], bytes[31]]),
        }
    }

    /// Read and validate a header from `reader`; `path` is used for errors.
    pub fn read_from<R: Read>(reader: &mut R, path: &Path) -> Result<Self> {
        let mut bytes = [0u8; HEADER_LEN];
        reader.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Format {
                    path: path.to_path_buf(),
                    reason: format!("shorter than the {HEADER_LEN}-byte header"),
                }
            } else {
                Error::io("read header of", path, e)
            }
        })?;
        let header = Self::from_bytes(&bytes);
        header.validate(path)?;
        Ok(header)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let reason = if self.magic != FORMAT_MAGIC {
            format!("bad magic {:#018x}", self.magic)
        } else if self.data_offset as usize != HEADER_LEN {
            format!("unsupported data offset {}", self.data_offset)
        } else if self.version != FORMAT_VERSION {
            format!("unsupported format version {}", self.version)
        } else {
            return Ok(());
        };
        Err(Error::Format {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Number of payload bytes the header announces; `None` when the record
    /// count is too large to address.
    pub fn payload_len(&self) -> Option<u64> {
        self.records.checked_mul(u64::from(self.element_width))
    }
}
