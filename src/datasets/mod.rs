//! Built-in column specifications for known CSV exports.

pub mod cicfm;

use crate::error::{Error, Result};
use crate::schema::ColumnSpec;

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &["cicfm"];

/// Look up a built-in specification by name.
pub fn by_name(name: &str) -> Result<ColumnSpec> {
    match name {
        "cicfm" => cicfm::spec(),
        other => Err(Error::InvalidSchema(format!(
            "unknown built-in schema '{other}' (known: {})",
            NAMES.join(", ")
        ))),
    }
}
