//! Balanced weighted-random partition sampler.
//!
//! For `R` records repeated `K` times over `P` partitions the sampler holds a
//! pool of `R·K` slots, split evenly into per-partition counters. Each draw
//! picks a slot uniformly from what is left, walks the counters in index
//! order to find which partition owns that slot, and removes the slot. This
//! is sampling without replacement from a virtual array in which partition
//! `p` appears `remaining[p]` times, without materializing the array, so
//! every partition ends with exactly its seeded share.
//!
//! The generator is a 64-bit LCG seeded with a fixed constant: two runs over
//! the same inputs produce the same assignments.
//!
//! The sampler is a plain value. [`PartitionSampler::next_partition_set`]
//! consumes the current state and returns the successor together with the
//! record's assignments; nothing is shared or global.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seed used unless the configuration overrides it.
pub const DEFAULT_SEED: u64 = 1;

const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const LCG_INCREMENT: u64 = 1;

/// Linear congruential generator, `x' = x·A + C mod 2^64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Lcg {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Advance once; returns the successor and its output.
    #[inline]
    #[must_use]
    pub const fn step(self) -> (Self, u64) {
        let state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        (Self { state }, state)
    }

    /// Draw uniformly from `[1, n]`. `n` must be non-zero.
    #[inline]
    #[must_use]
    pub const fn draw(self, n: u64) -> (Self, u64) {
        let (next, x) = self.step();
        let scaled = ((x as u128 * n as u128) >> 64) as u64;
        (next, scaled + 1)
    }
}

/// What to do with `pool mod P` slots that do not divide evenly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Shrink the pool to `P·⌊pool/P⌋`; the last `pool mod P` assignments of
    /// the run are not staged anywhere.
    #[default]
    Drop,
    /// Give one extra slot to each of the first `pool mod P` partitions so
    /// every assignment is staged.
    Distribute,
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drop => "drop",
            Self::Distribute => "distribute",
        })
    }
}

impl FromStr for RemainderPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "distribute" => Ok(Self::Distribute),
            other => Err(Error::InvalidConfig(format!(
                "unknown remainder policy '{other}' (expected drop or distribute)"
            ))),
        }
    }
}

/// Partition indices chosen for one record, one per staged repetition.
///
/// Holds fewer than `K` entries only for the trailing records of a run under
/// [`RemainderPolicy::Drop`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionSet(Vec<u32>);

impl PartitionSet {
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Remaining-capacity counters plus generator state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionSampler {
    capacity: Vec<u64>,
    remaining: Vec<u64>,
    total_remaining: u64,
    repetitions: u32,
    rng: Lcg,
}

impl PartitionSampler {
    /// Seed the counters for `records` records repeated `repetitions` times.
    pub fn new(
        partitions: u32,
        repetitions: u32,
        records: u64,
        seed: u64,
        policy: RemainderPolicy,
    ) -> Result<Self> {
        if partitions == 0 {
            return Err(Error::InvalidConfig("partitions must be at least 1".into()));
        }
        if repetitions == 0 {
            return Err(Error::InvalidConfig("repetitions must be at least 1".into()));
        }
        let pool = records.checked_mul(u64::from(repetitions)).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "{records} records x {repetitions} repetitions overflows the slot pool"
            ))
        })?;
        let share = pool / u64::from(partitions);
        let extra = pool % u64::from(partitions);
        let capacity: Vec<u64> = (0..u64::from(partitions))
            .map(|p| match policy {
                RemainderPolicy::Distribute if p < extra => share + 1,
                _ => share,
            })
            .collect();
        let total_remaining = capacity.iter().sum();
        Ok(Self {
            remaining: capacity.clone(),
            capacity,
            total_remaining,
            repetitions,
            rng: Lcg::new(seed),
        })
    }

    /// Draw this record's assignments and return the successor state.
    #[must_use]
    pub fn next_partition_set(mut self) -> (Self, PartitionSet) {
        let mut picked = Vec::with_capacity(self.repetitions as usize);
        for _ in 0..self.repetitions {
            if self.total_remaining == 0 {
                break;
            }
            let (rng, draw) = self.rng.draw(self.total_remaining);
            self.rng = rng;
            let p = self.locate(draw);
            self.remaining[p] -= 1;
            self.total_remaining -= 1;
            picked.push(p as u32);
        }
        (self, PartitionSet(picked))
    }

    /// Index of the partition owning slot `draw` (1-based).
    fn locate(&self, mut draw: u64) -> usize {
        for (p, &left) in self.remaining.iter().enumerate() {
            if draw <= left {
                return p;
            }
            draw -= left;
        }
        // sum(remaining) == total_remaining and draw <= total_remaining
        unreachable!("draw exceeded the remaining slot pool")
    }

    pub fn partitions(&self) -> usize {
        self.remaining.len()
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Slots still open per partition.
    pub fn remaining(&self) -> &[u64] {
        &self.remaining
    }

    /// Slots still open across all partitions.
    pub fn total_remaining(&self) -> u64 {
        self.total_remaining
    }

    /// Slots each partition was seeded with.
    pub fn capacity(&self) -> &[u64] {
        &self.capacity
    }

    /// Assignments handed out so far, per partition.
    pub fn assigned(&self) -> Vec<u64> {
        self.capacity
            .iter()
            .zip(&self.remaining)
            .map(|(c, r)| c - r)
            .collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.total_remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_stays_in_range() {
        let mut rng = Lcg::default();
        for n in [1u64, 2, 3, 17, 1 << 40, u64::MAX] {
            for _ in 0..1000 {
                let (next, v) = rng.draw(n);
                rng = next;
                assert!((1..=n).contains(&v), "{v} not in [1, {n}]");
            }
        }
    }

    #[test]
    fn counters_sum_to_total() {
        let mut s = PartitionSampler::new(3, 2, 50, DEFAULT_SEED, RemainderPolicy::Drop).unwrap();
        while !s.is_exhausted() {
            assert_eq!(s.remaining().iter().sum::<u64>(), s.total_remaining());
            s = s.next_partition_set().0;
        }
        assert_eq!(s.remaining(), &[0, 0, 0]);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Drop".parse::<RemainderPolicy>().unwrap(), RemainderPolicy::Drop);
        assert_eq!(
            "distribute".parse::<RemainderPolicy>().unwrap(),
            RemainderPolicy::Distribute
        );
        assert!("keep".parse::<RemainderPolicy>().is_err());
    }
}
