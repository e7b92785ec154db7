//! Run configuration.
//!
//! ```
//! use rbsplit::config::EncodeConfig;
//!
//! let config = EncodeConfig {
//!     partitions: 5,
//!     repetitions: 2,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::buffer::DEFAULT_STAGING_CAPACITY;
use crate::error::{Error, Result};
use crate::sampler::{DEFAULT_SEED, RemainderPolicy};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Bytes read per chunk while counting records during pre-flight.
pub const DEFAULT_COUNT_CHUNK_BYTES: usize = 16 * 1024 * 1024;

/// Parameters of one encoding run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Number of output partitions.
    pub partitions: u32,
    /// How many times each record is assigned to a partition.
    pub repetitions: u32,
    /// Elements staged per (column, partition) before an automatic flush.
    pub staging_capacity: usize,
    /// Chunk size for newline counting.
    pub count_chunk_bytes: usize,
    /// Generator seed. Fixed, so runs are reproducible.
    pub seed: u64,
    /// Handling of the slots left over by the even split.
    pub remainder: RemainderPolicy,
    /// Write `manifest.json` next to the partitions (feature `manifest`).
    pub write_manifest: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            partitions: 1,
            repetitions: 1,
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            count_chunk_bytes: DEFAULT_COUNT_CHUNK_BYTES,
            seed: DEFAULT_SEED,
            remainder: RemainderPolicy::default(),
            write_manifest: true,
        }
    }
}

impl EncodeConfig {
    /// Reject values that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.partitions == 0 {
            "partitions must be at least 1"
        } else if self.repetitions == 0 {
            "repetitions must be at least 1"
        } else if self.staging_capacity == 0 {
            "staging_capacity must be at least 1"
        } else if self.count_chunk_bytes == 0 {
            "count_chunk_bytes must be at least 1"
        } else {
            return Ok(());
        };
        Err(Error::InvalidConfig(problem.to_string()))
    }

    /// Load a JSON configuration file; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| Error::io("open", path, e))?;
        let config: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EncodeConfig =
            serde_json::from_str(r#"{"partitions": 4, "remainder": "distribute"}"#).unwrap();
        assert_eq!(config.partitions, 4);
        assert_eq!(config.repetitions, 1);
        assert_eq!(config.remainder, RemainderPolicy::Distribute);
        assert_eq!(config.staging_capacity, DEFAULT_STAGING_CAPACITY);
    }

    #[test]
    fn zero_values_are_rejected() {
        for config in [
            EncodeConfig { partitions: 0, ..Default::default() },
            EncodeConfig { repetitions: 0, ..Default::default() },
            EncodeConfig { staging_capacity: 0, ..Default::default() },
            EncodeConfig { count_chunk_bytes: 0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }
}
