//! Column specifications and CSV header validation.
//!
//! A [`ColumnSpec`] is the ordered list of `(name, codec)` pairs that defines
//! both the expected CSV header and the binary schema of a run. It is
//! immutable once built.
//!
//! Specs are either built in code (see [`crate::datasets`]) or loaded from a
//! JSON schema file:
//!
//! ```json
//! {
//!   "vocabularies": {
//!     "attack": { "tag": "0x4b43415454410000", "labels": ["BENIGN", "Syn"] }
//!   },
//!   "columns": [
//!     { "name": "Flow ID", "type": "ignore" },
//!     { "name": "Flow Duration", "type": "float" },
//!     { "name": "Label", "type": "attack" }
//!   ]
//! }
//! ```

use crate::codec::literal::parse_unsigned;
use crate::codec::{ColumnType, LabelSet};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Split a CSV line into trimmed fields.
///
/// Fields are separated by plain commas; there is no quoting. A trailing
/// line terminator ends up in the last field and is trimmed with it.
pub fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim)
}

/// Split a raw CSV line into trimmed fields, like [`fields`] but without
/// requiring the line to be UTF-8.
pub fn byte_fields(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&b| b == b',').map(<[u8]>::trim_ascii)
}

/// One column of a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered schema shared by the CSV header and the column files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<ColumnDef>,
}

impl ColumnSpec {
    /// Build a spec. Fails on an empty column list or when two different
    /// label vocabularies share a tag.
    pub fn new(columns: impl IntoIterator<Item = ColumnDef>) -> Result<Self> {
        let columns: Vec<ColumnDef> = columns.into_iter().collect();
        if columns.is_empty() {
            return Err(Error::InvalidSchema("a schema needs at least one column".into()));
        }
        let mut vocabularies: Vec<&LabelSet> = Vec::new();
        for col in &columns {
            if let ColumnType::Label(set) = &col.ty {
                if let Some(other) = vocabularies.iter().find(|v| v.tag == set.tag) {
                    if **other != **set {
                        return Err(Error::InvalidSchema(format!(
                            "vocabularies '{}' and '{}' share tag {:#018x}",
                            other.name, set.name, set.tag
                        )));
                    }
                } else {
                    vocabularies.push(set);
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of columns that produce files.
    pub fn stored_columns(&self) -> usize {
        self.columns.iter().filter(|c| !c.ty.is_ignored()).count()
    }

    /// The codec a file tag belongs to, if this spec uses it.
    pub fn codec_for_tag(&self, tag: u64) -> Option<&ColumnType> {
        self.columns
            .iter()
            .map(|c| &c.ty)
            .find(|ty| !ty.is_ignored() && ty.tag() == tag)
    }

    /// Validate a CSV header line: same count, same names, same order.
    pub fn check_header(&self, line: &str, path: &Path) -> Result<()> {
        let mut found = 0usize;
        for (i, token) in fields(line).enumerate() {
            let Some(expected) = self.columns.get(i) else {
                return Err(Error::HeaderTooLong {
                    path: path.to_path_buf(),
                    expected: self.columns.len(),
                    extra: token.to_string(),
                });
            };
            if expected.name != token {
                return Err(Error::HeaderMismatch {
                    path: path.to_path_buf(),
                    column: i,
                    expected: expected.name.clone(),
                    found: token.to_string(),
                });
            }
            found += 1;
        }
        if found < self.columns.len() {
            return Err(Error::HeaderTooShort {
                path: path.to_path_buf(),
                expected: self.columns.len(),
                found,
            });
        }
        Ok(())
    }

    /// The CSV header line this spec expects, without terminator.
    pub fn header_line(&self) -> String {
        self.names().collect::<Vec<_>>().join(",")
    }

    /// Load a JSON schema file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| Error::io("open", path, e))?;
        let file: SchemaFile = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| Error::InvalidSchema(format!("{}: {e}", path.display())))?;
        file.into_spec()
    }

    /// Parse a JSON schema document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: SchemaFile =
            serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))?;
        file.into_spec()
    }

    /// Describe this spec as a schema file document.
    pub fn to_schema_file(&self) -> SchemaFile {
        let mut vocabularies = BTreeMap::new();
        for col in &self.columns {
            if let ColumnType::Label(set) = &col.ty {
                vocabularies
                    .entry(set.name.clone())
                    .or_insert_with(|| VocabularyEntry {
                        tag: TagRepr::Text(format!("{:#018x}", set.tag)),
                        labels: set.labels.clone(),
                    });
            }
        }
        SchemaFile {
            vocabularies,
            columns: self
                .columns
                .iter()
                .map(|c| ColumnEntry {
                    name: c.name.clone(),
                    ty: c.ty.name().to_string(),
                })
                .collect(),
        }
    }
}

/// On-disk JSON form of a [`ColumnSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub vocabularies: BTreeMap<String, VocabularyEntry>,
    pub columns: Vec<ColumnEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub tag: TagRepr,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A tag written either as a JSON number or as a (possibly hex) string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagRepr {
    Number(u64),
    Text(String),
}

impl TagRepr {
    fn value(&self) -> Result<u64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_unsigned(s.trim())
                .map_err(|_| Error::InvalidSchema(format!("bad tag literal {s:?}"))),
        }
    }
}

impl SchemaFile {
    /// Resolve type names and build the spec.
    pub fn into_spec(self) -> Result<ColumnSpec> {
        let mut vocabularies: BTreeMap<String, Arc<LabelSet>> = BTreeMap::new();
        for (name, entry) in self.vocabularies {
            if ColumnType::builtin(&name).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "vocabulary name '{name}' shadows a built-in type"
                )));
            }
            let set = LabelSet::new(name.clone(), entry.tag.value()?, entry.labels)?;
            vocabularies.insert(name, Arc::new(set));
        }
        let columns = self
            .columns
            .into_iter()
            .map(|c| {
                let ty = ColumnType::builtin(&c.ty)
                    .or_else(|| vocabularies.get(&c.ty).cloned().map(ColumnType::Label))
                    .ok_or_else(|| {
                        Error::InvalidSchema(format!(
                            "column '{}' has unknown type '{}'",
                            c.name, c.ty
                        ))
                    })?;
                Ok(ColumnDef::new(c.name, ty))
            })
            .collect::<Result<Vec<_>>>()?;
        ColumnSpec::new(columns)
    }
}
