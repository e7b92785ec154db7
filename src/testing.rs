//! Testing utilities for encoding runs.
//!
//! - **Fixtures**: a small sample schema and deterministic CSV inputs for it
//! - **Assertions**: read a finished layout back and check its invariants
//! - **Logging**: [`init_test_logging`] routes `tracing` output to the test
//!   harness
//!
//! # Quick Start
//!
//! ```no_run
//! use rbsplit::testing::*;
//! use rbsplit::{EncodeConfig, run};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let csv = dir.path().join("in.csv");
//! write_sample_csv(&csv, &sample_rows(100))?;
//!
//! let config = EncodeConfig { partitions: 4, repetitions: 2, ..Default::default() };
//! let summary = run(sample_spec(), &[csv], dir.path().join("out"), config)?;
//! assert_balanced(&summary.assigned, 50);
//! assert_partitions_aligned(&dir.path().join("out"), &sample_spec(), 4)?;
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG` and enables `debug` for this crate. Safe to call from
/// every test; only the first call installs anything.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::from_default_env();
    let filter = match "rbsplit=debug".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
