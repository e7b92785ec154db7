//! Reading column files back into typed vectors.

use crate::codec::{ColumnType, LabelSet};
use crate::error::{Error, Result};
use crate::header::{ColumnHeader, HEADER_LEN};
use crate::schema::ColumnSpec;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded payload of one column file.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Label { set: Arc<LabelSet>, codes: Vec<u8> },
}

macro_rules! decode_ne {
    ($bytes:expr, $ty:ty) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$ty>())
            .map(|c| {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(c);
                <$ty>::from_ne_bytes(raw)
            })
            .collect()
    };
}

impl ColumnValues {
    fn decode(ty: &ColumnType, bytes: &[u8]) -> Option<Self> {
        Some(match ty {
            ColumnType::Ignore => return None,
            ColumnType::UInt8 => Self::U8(bytes.to_vec()),
            ColumnType::Int8 => Self::I8(bytes.iter().map(|&b| b as i8).collect()),
            ColumnType::UInt16 => Self::U16(decode_ne!(bytes, u16)),
            ColumnType::Int16 => Self::I16(decode_ne!(bytes, i16)),
            ColumnType::UInt32 => Self::U32(decode_ne!(bytes, u32)),
            ColumnType::Int32 => Self::I32(decode_ne!(bytes, i32)),
            ColumnType::UInt64 => Self::U64(decode_ne!(bytes, u64)),
            ColumnType::Int64 => Self::I64(decode_ne!(bytes, i64)),
            ColumnType::Float => Self::F32(decode_ne!(bytes, f32)),
            ColumnType::Double => Self::F64(decode_ne!(bytes, f64)),
            ColumnType::Label(set) => Self::Label {
                set: Arc::clone(set),
                codes: bytes.to_vec(),
            },
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Label { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` rendered as CSV text. Labels render as their string.
    pub fn text(&self, i: usize) -> Option<String> {
        match self {
            Self::U8(v) => v.get(i).map(ToString::to_string),
            Self::I8(v) => v.get(i).map(ToString::to_string),
            Self::U16(v) => v.get(i).map(ToString::to_string),
            Self::I16(v) => v.get(i).map(ToString::to_string),
            Self::U32(v) => v.get(i).map(ToString::to_string),
            Self::I32(v) => v.get(i).map(ToString::to_string),
            Self::U64(v) => v.get(i).map(ToString::to_string),
            Self::I64(v) => v.get(i).map(ToString::to_string),
            Self::F32(v) => v.get(i).map(ToString::to_string),
            Self::F64(v) => v.get(i).map(ToString::to_string),
            Self::Label { set, codes } => codes.get(i).map(|&code| {
                set.label_of(code)
                    .map_or_else(|| format!("#{code}"), str::to_string)
            }),
        }
    }
}

/// A column file with a validated header, positioned at its payload.
#[derive(Debug)]
pub struct ColumnReader<R = BufReader<File>> {
    reader: R,
    path: PathBuf,
    header: ColumnHeader,
}

impl ColumnReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io("open", path, e))?;
        Self::new(BufReader::new(file), path)
    }
}

impl<R: Read> ColumnReader<R> {
    /// Read and validate the header from `reader`.
    pub fn new(mut reader: R, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let header = ColumnHeader::read_from(&mut reader, &path)?;
        Ok(Self {
            reader,
            path,
            header,
        })
    }

    pub fn header(&self) -> &ColumnHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Codec for this file's tag: built-in tags resolve directly, label tags
    /// through `spec`.
    pub fn column_type(&self, spec: Option<&ColumnSpec>) -> Result<ColumnType> {
        let tag = self.header.type_tag;
        let ty = ColumnType::from_builtin_tag(tag)
            .or_else(|| spec.and_then(|s| s.codec_for_tag(tag).cloned()))
            .ok_or_else(|| self.format_error(format!("unknown type tag {tag:#018x}")))?;
        if ty.width() != usize::from(self.header.element_width) {
            return Err(self.format_error(format!(
                "element width {} does not match {} ({} bytes)",
                self.header.element_width,
                ty,
                ty.width()
            )));
        }
        Ok(ty)
    }

    /// Decode the whole payload. The payload must hold exactly the number of
    /// records the header announces.
    pub fn read_values(mut self, spec: Option<&ColumnSpec>) -> Result<ColumnValues> {
        let ty = self.column_type(spec)?;
        let expected = self
            .header
            .payload_len()
            .ok_or_else(|| self.format_error("record count overflows payload size".to_string()))?;
        let mut bytes = Vec::new();
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io("read", &self.path, e))?;
        if bytes.len() as u64 != expected {
            return Err(self.format_error(format!(
                "payload holds {} bytes after the {HEADER_LEN}-byte header, {} records need {expected}",
                bytes.len(),
                self.header.records
            )));
        }
        ColumnValues::decode(&ty, &bytes)
            .ok_or_else(|| self.format_error("ignored columns have no file".to_string()))
    }

    fn format_error(&self, reason: String) -> Error {
        Error::Format {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Open `path` and decode it, resolving label tags through `spec`.
pub fn read_column(path: impl AsRef<Path>, spec: &ColumnSpec) -> Result<(ColumnHeader, ColumnValues)> {
    let reader = ColumnReader::open(path)?;
    let header = *reader.header();
    let values = reader.read_values(Some(spec))?;
    Ok((header, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tags;
    use std::io::Cursor;

    fn file(tag: u64, width: u16, records: u64, payload: &[u8]) -> Vec<u8> {
        let mut header = ColumnHeader::new(tag, width);
        header.records = records;
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn decodes_native_endian_payload() {
        let payload: Vec<u8> = [7u16, 65535].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let bytes = file(tags::UINT16, 2, 2, &payload);
        let values = ColumnReader::new(Cursor::new(bytes), "mem")
            .unwrap()
            .read_values(None)
            .unwrap();
        assert_eq!(values, ColumnValues::U16(vec![7, 65535]));
        assert_eq!(values.text(1).as_deref(), Some("65535"));
    }

    #[test]
    fn truncated_payload_is_a_format_error() {
        let bytes = file(tags::DOUBLE, 8, 2, &1.5f64.to_ne_bytes());
        let err = ColumnReader::new(Cursor::new(bytes), "mem")
            .unwrap()
            .read_values(None)
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn oversized_record_count_is_a_format_error() {
        let bytes = file(tags::DOUBLE, 8, u64::MAX, &[]);
        let err = ColumnReader::new(Cursor::new(bytes), "mem")
            .unwrap()
            .read_values(None)
            .unwrap_err();
        assert!(
            matches!(&err, Error::Format { reason, .. } if reason.contains("overflows")),
            "{err}"
        );
    }

    #[test]
    fn label_tags_need_a_spec() {
        let bytes = file(0x4142_524d_4643_4943, 1, 0, &[]);
        let reader = ColumnReader::new(Cursor::new(bytes), "mem").unwrap();
        assert!(reader.column_type(None).is_err());
    }
}
