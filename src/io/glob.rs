//! Input path expansion.
//!
//! CSV inputs can be given as literal paths or glob patterns
//! (`captures/2019-01-*/*.csv.gz`). Every pattern expands to its matching
//! files in sorted order, and the expansion order is the order in which the
//! files are counted and encoded, so it also fixes the sampler's sequence.

use crate::error::{Error, Result};
use glob::glob;
use std::path::{Path, PathBuf};

/// Expand a glob pattern into a sorted vector of matching files.
///
/// Directories are skipped. A pattern matching nothing yields an empty vector.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern)
        .map_err(|e| Error::InvalidConfig(format!("invalid glob pattern {pattern:?}: {e}")))?;

    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            Error::io("read glob entry", path, e.into())
        })?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Resolve command-line inputs: literal paths are kept as given (so a missing
/// file is reported when it is opened), patterns are expanded and must match
/// at least one file.
pub fn resolve_inputs<S: AsRef<str>>(args: &[S]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        if is_pattern(arg) && !Path::new(arg).exists() {
            let matched = expand_glob(arg)?;
            if matched.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "no files found matching pattern: {arg}"
                )));
            }
            out.extend(matched);
        } else {
            out.push(PathBuf::from(arg));
        }
    }
    Ok(out)
}
