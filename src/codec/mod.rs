//! Column codecs: how one trimmed CSV token becomes one fixed-width element.
//!
//! The set of codecs is closed and dispatched statically through
//! [`ColumnType`]. Each variant carries a persisted 64-bit tag that is
//! written into the header of every column file it produces, an element
//! width, and a parse policy:
//!
//! | type     | width | bad token            |
//! |----------|-------|----------------------|
//! | `ignore` | 0     | never fails          |
//! | integers | 1..8  | fatal                |
//! | `float`  | 4     | substituted by `0.0` |
//! | `double` | 8     | fatal                |
//! | label    | 1     | fatal                |
//!
//! The `float`/`double` asymmetry is a dataset-tolerance policy for sparse
//! numeric fields and must be kept.

pub(crate) mod literal;

use crate::error::ValueError;
use literal::{LiteralError, parse_double, parse_signed, parse_unsigned};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Persisted tags, one per built-in codec.
pub mod tags {
    pub const IGNORE: u64 = 0x0000_0000_0000_0000;
    pub const UINT8: u64 = 0x0038_544E_4955_4252;
    pub const INT8: u64 = 0x0000_3854_4E55_4252;
    pub const UINT16: u64 = 0x3631_544E_4955_4252;
    pub const INT16: u64 = 0x0036_3154_4E55_4252;
    pub const UINT32: u64 = 0x3233_544E_4955_4252;
    pub const INT32: u64 = 0x0032_3354_4E55_4252;
    pub const UINT64: u64 = 0x3436_544E_4955_4252;
    pub const INT64: u64 = 0x0034_3654_4E55_4252;
    pub const FLOAT: u64 = 0x0054_414F_4C46_4252;
    pub const DOUBLE: u64 = 0x454C_4255_4F44_4252;

    /// All built-in tags, for uniqueness checks against label vocabularies.
    pub const BUILTIN: [u64; 11] = [
        IGNORE, UINT8, INT8, UINT16, INT16, UINT32, INT32, UINT64, INT64, FLOAT, DOUBLE,
    ];
}

/// Maximum number of labels an 8-bit code can address.
pub const MAX_LABELS: usize = 256;

/// A closed, ordered vocabulary of string labels.
///
/// A label encodes as its position in the list. The tag identifies the
/// vocabulary in file headers, so two different vocabularies must not share
/// a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub name: String,
    pub tag: u64,
    pub labels: Vec<String>,
}

impl LabelSet {
    /// Build a vocabulary. Fails when it is empty, too large, has duplicate
    /// labels, or reuses a built-in tag.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        tag: u64,
        labels: impl IntoIterator<Item = S>,
    ) -> crate::Result<Self> {
        let name = name.into();
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() || labels.len() > MAX_LABELS {
            return Err(crate::Error::InvalidSchema(format!(
                "vocabulary '{name}' must hold 1..={MAX_LABELS} labels, got {}",
                labels.len()
            )));
        }
        if tags::BUILTIN.contains(&tag) {
            return Err(crate::Error::InvalidSchema(format!(
                "vocabulary '{name}' reuses built-in tag {tag:#018x}"
            )));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(crate::Error::InvalidSchema(format!(
                    "vocabulary '{name}' lists {label:?} twice"
                )));
            }
        }
        Ok(Self { name, tag, labels })
    }

    /// Position of `token` in the vocabulary.
    pub fn code_of(&self, token: &str) -> Option<u8> {
        self.labels
            .iter()
            .position(|l| l == token)
            .and_then(|i| u8::try_from(i).ok())
    }

    /// Label for an encoded code.
    pub fn label_of(&self, code: u8) -> Option<&str> {
        self.labels.get(usize::from(code)).map(String::as_str)
    }
}

/// One encoded element: up to eight native-endian bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncodedValue {
    bytes: [u8; 8],
    width: u8,
}

impl EncodedValue {
    /// The zero-width value produced by `ignore`.
    pub const EMPTY: Self = Self {
        bytes: [0; 8],
        width: 0,
    };

    fn from_slice(src: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..src.len()].copy_from_slice(src);
        Self {
            bytes,
            width: src.len() as u8,
        }
    }

    /// The element bytes, exactly `width` long.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.width)]
    }

    #[inline]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }
}

impl fmt::Debug for EncodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedValue({:02x?})", self.as_bytes())
    }
}

/// A column codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Ignore,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float,
    Double,
    Label(Arc<LabelSet>),
}

macro_rules! encode_unsigned {
    ($token:expr, $ty:ty, $name:expr) => {{
        let value = parse_unsigned($token).map_err(|e| literal_error(e, $name, $token))?;
        let narrowed = <$ty>::try_from(value).map_err(|_| ValueError::OutOfRange {
            ty: $name,
            token: $token.to_string(),
        })?;
        Ok(EncodedValue::from_slice(&narrowed.to_ne_bytes()))
    }};
}

macro_rules! encode_signed {
    ($token:expr, $ty:ty, $name:expr) => {{
        let value = parse_signed($token).map_err(|e| literal_error(e, $name, $token))?;
        let narrowed = <$ty>::try_from(value).map_err(|_| ValueError::OutOfRange {
            ty: $name,
            token: $token.to_string(),
        })?;
        Ok(EncodedValue::from_slice(&narrowed.to_ne_bytes()))
    }};
}

fn literal_error(err: LiteralError, ty: &'static str, token: &str) -> ValueError {
    match err {
        LiteralError::Syntax => ValueError::Unparseable {
            ty,
            token: token.to_string(),
        },
        LiteralError::Range => ValueError::OutOfRange {
            ty,
            token: token.to_string(),
        },
    }
}

impl ColumnType {
    /// Look up a built-in codec by its schema name.
    pub fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "ignore" => Self::Ignore,
            "uint8" => Self::UInt8,
            "int8" => Self::Int8,
            "uint16" => Self::UInt16,
            "int16" => Self::Int16,
            "uint32" => Self::UInt32,
            "int32" => Self::Int32,
            "uint64" => Self::UInt64,
            "int64" => Self::Int64,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    /// The built-in codec persisted under `tag`. Label tags are not known here.
    pub fn from_builtin_tag(tag: u64) -> Option<Self> {
        Some(match tag {
            tags::UINT8 => Self::UInt8,
            tags::INT8 => Self::Int8,
            tags::UINT16 => Self::UInt16,
            tags::INT16 => Self::Int16,
            tags::UINT32 => Self::UInt32,
            tags::INT32 => Self::Int32,
            tags::UINT64 => Self::UInt64,
            tags::INT64 => Self::Int64,
            tags::FLOAT => Self::Float,
            tags::DOUBLE => Self::Double,
            _ => return None,
        })
    }

    /// Symbolic name, as used in schema files.
    pub fn name(&self) -> &str {
        match self {
            Self::Ignore => "ignore",
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Label(set) => &set.name,
        }
    }

    /// The format-identifying tag persisted in file headers.
    pub fn tag(&self) -> u64 {
        match self {
            Self::Ignore => tags::IGNORE,
            Self::UInt8 => tags::UINT8,
            Self::Int8 => tags::INT8,
            Self::UInt16 => tags::UINT16,
            Self::Int16 => tags::INT16,
            Self::UInt32 => tags::UINT32,
            Self::Int32 => tags::INT32,
            Self::UInt64 => tags::UINT64,
            Self::Int64 => tags::INT64,
            Self::Float => tags::FLOAT,
            Self::Double => tags::DOUBLE,
            Self::Label(set) => set.tag,
        }
    }

    /// Encoded element width in bytes; zero for `ignore`.
    pub fn width(&self) -> usize {
        match self {
            Self::Ignore => 0,
            Self::UInt8 | Self::Int8 | Self::Label(_) => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float => 4,
            Self::UInt64 | Self::Int64 | Self::Double => 8,
        }
    }

    /// True for the degenerate codec that consumes a field and writes nothing.
    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignore)
    }

    /// Encode one trimmed token.
    pub fn parse(&self, token: &str) -> Result<EncodedValue, ValueError> {
        match self {
            Self::Ignore => Ok(EncodedValue::EMPTY),
            Self::UInt8 => encode_unsigned!(token, u8, "uint8"),
            Self::UInt16 => encode_unsigned!(token, u16, "uint16"),
            Self::UInt32 => encode_unsigned!(token, u32, "uint32"),
            Self::UInt64 => encode_unsigned!(token, u64, "uint64"),
            Self::Int8 => encode_signed!(token, i8, "int8"),
            Self::Int16 => encode_signed!(token, i16, "int16"),
            Self::Int32 => encode_signed!(token, i32, "int32"),
            Self::Int64 => encode_signed!(token, i64, "int64"),
            // Missing or malformed values in sparse float columns become 0.0.
            Self::Float => {
                let value = parse_double(token).unwrap_or(0.0) as f32;
                Ok(EncodedValue::from_slice(&value.to_ne_bytes()))
            }
            Self::Double => {
                let value = parse_double(token).map_err(|e| literal_error(e, "double", token))?;
                Ok(EncodedValue::from_slice(&value.to_ne_bytes()))
            }
            Self::Label(set) => set
                .code_of(token)
                .map(|code| EncodedValue::from_slice(&[code]))
                .ok_or_else(|| ValueError::UnknownLabel {
                    vocabulary: set.name.clone(),
                    token: token.to_string(),
                }),
        }
    }

    /// Encode one trimmed raw token. Only stored columns need UTF-8; an
    /// ignored field may hold any bytes.
    pub fn parse_bytes(&self, token: &[u8]) -> Result<EncodedValue, ValueError> {
        match (self, std::str::from_utf8(token)) {
            (Self::Ignore, _) => Ok(EncodedValue::EMPTY),
            (_, Ok(text)) => self.parse(text),
            (Self::Float, Err(_)) => self.parse(""),
            (_, Err(_)) => Err(ValueError::NotUtf8 {
                ty: self.name().to_string(),
                token: String::from_utf8_lossy(token).into_owned(),
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_unique() {
        let mut seen = tags::BUILTIN.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), tags::BUILTIN.len());
    }

    #[test]
    fn raw_tokens_need_utf8_only_when_stored() {
        let latin1 = b"caf\xe9";
        assert_eq!(ColumnType::Ignore.parse_bytes(latin1), Ok(EncodedValue::EMPTY));
        assert_eq!(
            ColumnType::Float.parse_bytes(latin1).unwrap(),
            ColumnType::Float.parse("0").unwrap()
        );
        assert!(matches!(
            ColumnType::UInt8.parse_bytes(latin1),
            Err(ValueError::NotUtf8 { .. })
        ));
        assert_eq!(
            ColumnType::UInt8.parse_bytes(b"0x2A").unwrap(),
            ColumnType::UInt8.parse("42").unwrap()
        );
    }

    #[test]
    fn widths_match_encoded_lengths() {
        let cases = [
            (ColumnType::UInt8, "200"),
            (ColumnType::Int8, "-100"),
            (ColumnType::UInt16, "0xFFFF"),
            (ColumnType::Int16, "-32768"),
            (ColumnType::UInt32, "4000000000"),
            (ColumnType::Int32, "-7"),
            (ColumnType::UInt64, "18446744073709551615"),
            (ColumnType::Int64, "-1"),
            (ColumnType::Float, "1.25"),
            (ColumnType::Double, "1.25"),
        ];
        for (ty, token) in cases {
            let v = ty.parse(token).unwrap();
            assert_eq!(v.width(), ty.width(), "{ty}");
        }
    }

    #[test]
    fn narrow_integers_are_range_checked() {
        assert!(matches!(
            ColumnType::UInt8.parse("256"),
            Err(ValueError::OutOfRange { ty: "uint8", .. })
        ));
        assert!(matches!(
            ColumnType::Int8.parse("-129"),
            Err(ValueError::OutOfRange { ty: "int8", .. })
        ));
        assert!(matches!(
            ColumnType::Int32.parse("abc"),
            Err(ValueError::Unparseable { ty: "int32", .. })
        ));
    }

    #[test]
    fn float_tolerates_missing_but_double_does_not() {
        let zero = ColumnType::Float.parse("").unwrap();
        assert_eq!(zero.as_bytes(), 0.0f32.to_ne_bytes());
        let junk = ColumnType::Float.parse("n/a").unwrap();
        assert_eq!(junk.as_bytes(), 0.0f32.to_ne_bytes());
        assert!(ColumnType::Double.parse("").is_err());
        assert!(ColumnType::Double.parse("n/a").is_err());
    }

    #[test]
    fn label_codes_follow_vocabulary_order() {
        let set = Arc::new(LabelSet::new("attack", 0x1234, ["BENIGN", "Syn"]).unwrap());
        let ty = ColumnType::Label(set);
        assert_eq!(ty.parse("Syn").unwrap().as_bytes(), &[1]);
        assert_eq!(ty.parse("BENIGN").unwrap().as_bytes(), &[0]);
        assert!(matches!(
            ty.parse("Unknown"),
            Err(ValueError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn vocabulary_rejects_builtin_tags_and_duplicates() {
        assert!(LabelSet::new("x", tags::FLOAT, ["a"]).is_err());
        assert!(LabelSet::new("x", 7, ["a", "a"]).is_err());
        assert!(LabelSet::new("x", 7, Vec::<String>::new()).is_err());
    }
}
