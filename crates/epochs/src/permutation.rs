use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::{Ordering, Reverse};

use crate::errors::{ensure_config, EpochsError};

/// An ordered sequence of indices into a data source.
///
/// All epoch-level reordering (shuffling, length bucketing) happens on this
/// integer array; samples themselves are never moved or touched. In the
/// default case it is exactly a permutation of `0..len`, but explicit index
/// lists may select a subset or repeat indices (over/undersampling).
///
/// # Example
/// ```ignore
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut order = IndexPermutation::identity(1000).shuffled(&mut rng);
/// // Sort each run of 256 indices by descending sample length.
/// order.sorted_in_chunks_by_key_desc(256, |i| lengths[i])?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexPermutation {
    indices: Vec<usize>,
}

impl IndexPermutation {
    /// `0, 1, ..., count - 1`.
    pub fn identity(count: usize) -> Self {
        Self {
            indices: (0..count).collect(),
        }
    }

    /// A uniformly shuffled permutation of `0..count`.
    pub fn random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        Self::identity(count).shuffled(rng)
    }

    /// Builds a permutation from an explicit index list.
    ///
    /// Indices may repeat and need not cover the source; every index must
    /// be `< source_len`.
    pub fn from_indices(indices: Vec<usize>, source_len: usize) -> Result<Self> {
        let permutation = Self { indices };
        permutation.validate(source_len)?;
        Ok(permutation)
    }

    /// Draws `num_samples` indices from `0..source_len` uniformly, with replacement.
    pub fn with_replacement<R: Rng + ?Sized>(
        source_len: usize,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Self> {
        ensure_config!(
            source_len > 0 || num_samples == 0,
            "cannot draw {} samples from an empty source",
            num_samples
        );
        let indices = (0..num_samples)
            .map(|_| rng.random_range(0..source_len))
            .collect();
        Ok(Self { indices })
    }

    /// Shuffles in place (Fisher–Yates), advancing `rng`.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.indices.shuffle(rng);
    }

    pub fn shuffled<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.shuffle(rng);
        self
    }

    /// Sorts each contiguous chunk of `chunk_size` indices independently.
    ///
    /// The last chunk may be shorter. Indices never cross chunk boundaries,
    /// so when the sequence was shuffled beforehand, chunk contents stay
    /// random while the order inside each chunk is determined by `order`.
    /// The sort is stable.
    pub fn sorted_in_chunks<F>(&mut self, chunk_size: usize, mut order: F) -> Result<()>
    where
        F: FnMut(usize, usize) -> Ordering,
    {
        ensure_config!(
            chunk_size > 0,
            "chunk_size must be > 0, but got chunk_size={}",
            chunk_size
        );
        for chunk in self.indices.chunks_mut(chunk_size) {
            chunk.sort_by(|&a, &b| order(a, b));
        }
        Ok(())
    }

    /// [`sorted_in_chunks`](Self::sorted_in_chunks) ordering by descending `key`.
    pub fn sorted_in_chunks_by_key_desc<K, F>(&mut self, chunk_size: usize, mut key: F) -> Result<()>
    where
        K: Ord,
        F: FnMut(usize) -> K,
    {
        ensure_config!(
            chunk_size > 0,
            "chunk_size must be > 0, but got chunk_size={}",
            chunk_size
        );
        for chunk in self.indices.chunks_mut(chunk_size) {
            chunk.sort_by_key(|&i| Reverse(key(i)));
        }
        Ok(())
    }

    /// Checks that every index is a valid position in a source of `source_len`.
    pub fn validate(&self, source_len: usize) -> Result<()> {
        match self.indices.iter().find(|&&index| index >= source_len) {
            Some(&index) => Err(EpochsError::IndexOutOfBounds {
                index,
                len: source_len,
            }
            .into()),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [usize] {
        &mut self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }
}

impl From<IndexPermutation> for Vec<usize> {
    fn from(permutation: IndexPermutation) -> Self {
        permutation.indices
    }
}
