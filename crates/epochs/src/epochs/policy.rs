use crate::dataset::DataSource;
use crate::errors::ensure_config;
use crate::permutation::IndexPermutation;
use anyhow::Result;
use rand::Rng;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

/// Size of the sample at a source index, used to bucket by length.
pub type SizeFn = Arc<dyn Fn(usize) -> usize + Send + Sync>;

/// How the order of samples is chosen for each epoch.
///
/// Every policy consumes the entropy source at most once per epoch and
/// never reads a sample while building the order.
#[derive(Clone)]
pub enum SamplingPolicy {
    /// Natural source order every epoch. Consumes no entropy. Typical for
    /// validation passes.
    Sequential,

    /// A fresh uniform shuffle of every source index each epoch.
    Uniform,

    /// `num_samples` indices drawn uniformly with replacement each epoch.
    /// `num_samples` may be smaller or larger than the source.
    WithReplacement { num_samples: usize },

    /// "Sortish" order: shuffle, then sort descending by `size_of` within
    /// chunks of `batch_size * bucket_multiplier` indices, so that samples
    /// of similar size end up in the same batch. The largest sample of the
    /// epoch is always placed in the first batch.
    LengthBucketed { size_of: SizeFn },
}

impl fmt::Debug for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "Sequential"),
            Self::Uniform => write!(f, "Uniform"),
            Self::WithReplacement { num_samples } => f
                .debug_struct("WithReplacement")
                .field("num_samples", num_samples)
                .finish(),
            Self::LengthBucketed { .. } => f.debug_struct("LengthBucketed").finish_non_exhaustive(),
        }
    }
}

impl SamplingPolicy {
    /// Length bucketing with an index-based size hook.
    ///
    /// `size_of` must not read the source if the source is expensive to
    /// access; precompute sizes instead (see [`Self::length_bucketed_by_lengths`]).
    pub fn length_bucketed<F>(size_of: F) -> Self
    where
        F: Fn(usize) -> usize + Send + Sync + 'static,
    {
        Self::LengthBucketed {
            size_of: Arc::new(size_of),
        }
    }

    /// Length bucketing over precomputed sizes, one per source index.
    /// Indices past the end of `lengths` count as size 0.
    pub fn length_bucketed_by_lengths(lengths: Vec<usize>) -> Self {
        let lengths: Arc<[usize]> = lengths.into();
        Self::length_bucketed(move |i| lengths.get(i).copied().unwrap_or(0))
    }

    /// Length bucketing for eager sources: reads every sample once, now,
    /// and records `size(&sample)`.
    pub fn length_bucketed_by_sample<D, F>(source: &D, size: F) -> Result<Self>
    where
        D: DataSource + ?Sized,
        F: Fn(&D::Item) -> usize,
    {
        let lengths = (0..source.len())
            .map(|i| source.get(i).map(|sample| size(&sample)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::length_bucketed_by_lengths(lengths))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Uniform => "uniform",
            Self::WithReplacement { .. } => "with_replacement",
            Self::LengthBucketed { .. } => "length_bucketed",
        }
    }

    /// Whether a short final batch is dropped when the config leaves it unset.
    pub fn default_drop_remainder(&self) -> bool {
        matches!(self, Self::Uniform)
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::WithReplacement { num_samples } = self {
            ensure_config!(
                *num_samples > 0,
                "num_samples must be > 0, but got num_samples={}",
                num_samples
            );
        }
        Ok(())
    }

    /// Order of source indices for one epoch over a source of `source_len`.
    pub(crate) fn permutation<R: Rng + ?Sized>(
        &self,
        source_len: usize,
        batch_size: usize,
        bucket_multiplier: usize,
        rng: &mut R,
    ) -> Result<IndexPermutation> {
        match self {
            Self::Sequential => Ok(IndexPermutation::identity(source_len)),
            Self::Uniform => Ok(IndexPermutation::random(source_len, rng)),
            Self::WithReplacement { num_samples } => {
                IndexPermutation::with_replacement(source_len, *num_samples, rng)
            }
            Self::LengthBucketed { size_of } => {
                let chunk_size = batch_size.saturating_mul(bucket_multiplier);
                let mut permutation = IndexPermutation::random(source_len, rng);
                permutation.sorted_in_chunks_by_key_desc(chunk_size, |i| size_of(i))?;
                largest_to_front(&mut permutation, chunk_size, &**size_of);
                Ok(permutation)
            }
        }
    }
}

/// Moves the largest sample to position 0 of a chunk-sorted permutation.
///
/// Each chunk starts with its own maximum, so only chunk starts are
/// compared. The displaced first element goes into the winning chunk,
/// which is sorted again; chunk 0 stays sorted since its new head is the
/// global maximum.
fn largest_to_front(
    permutation: &mut IndexPermutation,
    chunk_size: usize,
    size_of: &(dyn Fn(usize) -> usize + Send + Sync),
) {
    let indices = permutation.as_mut_slice();
    let mut best: Option<(usize, usize)> = None;
    for start in (0..indices.len()).step_by(chunk_size) {
        let size = size_of(indices[start]);
        match best {
            Some((_, best_size)) if size <= best_size => {}
            _ => best = Some((start, size)),
        }
    }

    if let Some((start, _)) = best.filter(|&(start, _)| start > 0) {
        indices.swap(0, start);
        let end = (start + chunk_size).min(indices.len());
        indices[start..end].sort_by_key(|&i| Reverse(size_of(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::LinearCongruential;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TEST_SEED: u64 = 42;

    fn sorted(permutation: &IndexPermutation) -> Vec<usize> {
        let mut indices = permutation.clone().into_vec();
        indices.sort_unstable();
        indices
    }

    #[test]
    fn sequential_is_identity_and_consumes_no_entropy() -> Result<()> {
        let mut rng = LinearCongruential::new(TEST_SEED);
        let p = SamplingPolicy::Sequential.permutation(5, 2, 100, &mut rng)?;
        assert_eq!(p, IndexPermutation::identity(5));
        assert_eq!(rng, LinearCongruential::new(TEST_SEED));
        Ok(())
    }

    #[test]
    fn uniform_covers_every_index_once() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(TEST_SEED);
        let p = SamplingPolicy::Uniform.permutation(100, 10, 100, &mut rng)?;
        assert_eq!(sorted(&p), (0..100).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn with_replacement_draws_requested_count() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(TEST_SEED);
        let policy = SamplingPolicy::WithReplacement { num_samples: 25 };
        let p = policy.permutation(10, 4, 100, &mut rng)?;
        assert_eq!(p.len(), 25);
        assert!(p.iter().all(|i| i < 10));

        assert!(SamplingPolicy::WithReplacement { num_samples: 0 }
            .validate()
            .is_err());
        Ok(())
    }

    #[test]
    fn length_bucketed_chunks_are_sorted_and_max_is_first() -> Result<()> {
        let lengths: Vec<usize> = (0..997).map(|i| (i * 7919) % 1000).collect();
        let max = *lengths.iter().max().unwrap();
        let policy = SamplingPolicy::length_bucketed_by_lengths(lengths.clone());
        let mut rng = StdRng::seed_from_u64(TEST_SEED);

        for _ in 0..10 {
            let p = policy.permutation(lengths.len(), 8, 4, &mut rng)?;
            assert_eq!(sorted(&p), (0..lengths.len()).collect::<Vec<_>>());
            assert_eq!(lengths[p.as_slice()[0]], max);
            for chunk in p.as_slice().chunks(32) {
                assert!(chunk.windows(2).all(|w| lengths[w[0]] >= lengths[w[1]]));
            }
        }
        Ok(())
    }

    #[test]
    fn length_bucketed_single_chunk_is_fully_sorted() -> Result<()> {
        let lengths = vec![5, 3, 7, 4, 9, 1, 2, 8];
        let policy = SamplingPolicy::length_bucketed_by_lengths(lengths.clone());
        let mut rng = StdRng::seed_from_u64(TEST_SEED);
        let p = policy.permutation(8, 2, 4, &mut rng)?;
        let ordered: Vec<usize> = p.iter().map(|i| lengths[i]).collect();
        assert_eq!(ordered, vec![9, 8, 7, 5, 4, 3, 2, 1]);
        Ok(())
    }

    #[test]
    fn by_sample_reads_each_sample_once() -> Result<()> {
        let source = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
        let policy = SamplingPolicy::length_bucketed_by_sample(&source, |s: &String| s.len())?;
        let mut rng = StdRng::seed_from_u64(TEST_SEED);
        let p = policy.permutation(3, 1, 1, &mut rng)?;
        // One-element chunks: the only reordering is the largest moving to the front.
        assert_eq!(p.as_slice()[0], 1);
        Ok(())
    }

    #[test]
    fn drop_remainder_defaults() {
        assert!(SamplingPolicy::Uniform.default_drop_remainder());
        assert!(!SamplingPolicy::Sequential.default_drop_remainder());
        assert!(!SamplingPolicy::length_bucketed(|i| i).default_drop_remainder());
        assert!(!SamplingPolicy::WithReplacement { num_samples: 3 }.default_drop_remainder());
    }

    #[test]
    fn debug_names_the_policy() {
        assert_eq!(format!("{:?}", SamplingPolicy::Uniform), "Uniform");
        assert!(format!("{:?}", SamplingPolicy::length_bucketed(|i| i)).starts_with("LengthBucketed"));
        assert_eq!(SamplingPolicy::WithReplacement { num_samples: 1 }.name(), "with_replacement");
    }
}
