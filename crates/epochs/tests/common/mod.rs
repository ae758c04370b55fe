#![allow(dead_code)]

use epochs::DataSource;

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TEST_SEED: u64 = 42;

/// Installs `env_logger` once for the whole test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Source that records every read, returning the index itself.
pub struct CountingSource {
    reads: Vec<AtomicUsize>,
}

impl CountingSource {
    pub fn new(n: usize) -> Self {
        Self {
            reads: (0..n).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn reads_of(&self, index: usize) -> usize {
        self.reads[index].load(Ordering::SeqCst)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.iter().map(|r| r.load(Ordering::SeqCst)).sum()
    }

    pub fn touched(&self) -> usize {
        self.reads
            .iter()
            .filter(|r| r.load(Ordering::SeqCst) > 0)
            .count()
    }
}

impl DataSource for CountingSource {
    type Item = usize;

    fn len(&self) -> usize {
        self.reads.len()
    }

    fn get(&self, index: usize) -> Result<usize> {
        self.reads[index].fetch_add(1, Ordering::SeqCst);
        Ok(index)
    }
}

/// Source that fails on a fixed set of indices.
pub struct FailingSource {
    pub len: usize,
    pub fail_at: Vec<usize>,
}

impl DataSource for FailingSource {
    type Item = usize;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<usize> {
        if self.fail_at.contains(&index) {
            bail!("corrupt record {}", index);
        }
        Ok(index)
    }
}

/// Token sequences of varying length: sample `i` has length `lengths[i]`
/// and is filled with `i + 1`.
pub fn token_sequences(lengths: &[usize]) -> Vec<Vec<i64>> {
    lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| vec![i as i64 + 1; len])
        .collect()
}

/// Deterministic pseudo-random lengths in `1..=max`.
pub fn varied_lengths(n: usize, max: usize) -> Vec<usize> {
    (0..n).map(|i| (i * 7919 + 13) % max + 1).collect()
}
