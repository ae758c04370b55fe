use crate::collator::Collator;
use crate::dataset::DataSource;
use crate::errors::ensure_config;
use crate::fetcher::ConcurrentFetcher;
use crate::reindex::ReindexedView;
use crate::slicer::BatchSlicer;
use anyhow::Result;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

use super::config::EpochConfig;
use super::epoch::Epoch;
use super::policy::SamplingPolicy;

/// An infinite sequence of epochs over one data source.
///
/// The generator owns its entropy source. Each call to
/// [`next_epoch`](Self::next_epoch) asks the sampling policy for a new
/// order of indices (one shuffle at most), increments the epoch counter
/// and returns an [`Epoch`] that shares the source. No sample is read
/// until a batch of that epoch is requested.
///
/// Two generators built from the same configuration, policy and entropy
/// state produce identical epochs.
///
/// # Example
/// ```ignore
/// let config = EpochConfig::builder().batch_size(64).seed(42).build();
/// let mut epochs = EpochGenerator::seeded(
///     Arc::new(dataset),
///     config,
///     SamplingPolicy::Uniform,
///     Collator::to_vec(),
/// )?;
///
/// for _ in 0..10 {
///     let epoch = epochs.next_epoch()?;
///     for batch in &epoch {
///         train_step(batch?);
///     }
/// }
/// ```
///
/// # Training and validation
///
/// A held-out split gets its own generator. `Sequential` keeps its batches
/// in source order and keeps the short last batch, so every validation
/// sample is seen once per pass:
/// ```ignore
/// let mut training = EpochGenerator::seeded(
///     Arc::new(train_set),
///     EpochConfig::builder().batch_size(64).seed(42).build(),
///     SamplingPolicy::Uniform,
///     Collator::padded_stacking(Padding::new(0)),
/// )?;
/// let mut validation = EpochGenerator::seeded(
///     Arc::new(valid_set),
///     EpochConfig::builder().batch_size(256).build(),
///     SamplingPolicy::Sequential,
///     Collator::padded_stacking(Padding::new(0)),
/// )?;
///
/// for _ in 0..10 {
///     for batch in &training.next_epoch()? {
///         train_step(batch?);
///     }
///     for batch in &validation.next_epoch()? {
///         eval_step(batch?);
///     }
/// }
/// ```
pub struct EpochGenerator<D: DataSource, B, R = StdRng> {
    source: Arc<D>,
    policy: SamplingPolicy,
    collator: Collator<D::Item, B>,
    fetcher: ConcurrentFetcher,
    batch_size: usize,
    bucket_multiplier: usize,
    drop_remainder: bool,
    prefetch_factor: usize,
    timeout: Duration,
    entropy: R,
    seed: Option<u64>,
    epoch: usize,
}

impl<D, B, R> EpochGenerator<D, B, R>
where
    D: DataSource,
    D::Item: Send,
    R: RngCore,
{
    /// Creates a generator driven by `entropy`.
    ///
    /// All configuration errors are raised here, before any epoch exists.
    pub fn new(
        source: Arc<D>,
        config: EpochConfig,
        policy: SamplingPolicy,
        collator: Collator<D::Item, B>,
        entropy: R,
    ) -> Result<Self> {
        let batch_size = config.validate()?;
        policy.validate()?;
        let fetcher = ConcurrentFetcher::new(config.worker_limit)?;
        let drop_remainder = config
            .drop_remainder
            .unwrap_or_else(|| policy.default_drop_remainder());

        Ok(Self {
            source,
            policy,
            collator,
            fetcher,
            batch_size,
            bucket_multiplier: config.bucket_multiplier,
            drop_remainder,
            prefetch_factor: config.prefetch_factor,
            timeout: config.timeout,
            entropy,
            seed: None,
            epoch: 0,
        })
    }

    /// Produces the next epoch and advances the entropy state.
    pub fn next_epoch(&mut self) -> Result<Epoch<D, B>> {
        let permutation = self.policy.permutation(
            self.source.len(),
            self.batch_size,
            self.bucket_multiplier,
            &mut self.entropy,
        )?;
        let slicer = BatchSlicer::new(permutation.len(), self.batch_size, self.drop_remainder)?;
        let samples = ReindexedView::new(self.source.clone(), permutation)?;

        let index = self.epoch;
        self.epoch += 1;
        debug!(
            epoch = index,
            samples = samples.len(),
            batches = slicer.len(),
            dropped = slicer.dropped(),
            policy = self.policy.name();
            "generated epoch"
        );

        Ok(Epoch::new(
            index,
            samples,
            slicer,
            self.fetcher,
            self.collator.clone(),
            self.prefetch_factor,
            self.timeout,
        ))
    }

    /// Changes the batch size starting with the next epoch. Epochs already
    /// handed out keep their own batch size.
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<()> {
        ensure_config!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );
        self.batch_size = batch_size;
        Ok(())
    }

    /// Seed of the entropy source. Only generators built by
    /// [`EpochGenerator::seeded`] know it; `new` reports `None` since the
    /// caller's entropy source may have been seeded with anything.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Number of epochs generated so far, which is also the index of the next one.
    pub fn epochs_generated(&self) -> usize {
        self.epoch
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn drop_remainder(&self) -> bool {
        self.drop_remainder
    }

    pub fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    pub fn source(&self) -> &Arc<D> {
        &self.source
    }
}

impl<D, B> EpochGenerator<D, B, StdRng>
where
    D: DataSource,
    D::Item: Send,
{
    /// Creates a generator driven by `StdRng` seeded with `config.seed`, or
    /// with a random seed when none is configured. The seed in use is
    /// reported by [`seed`](Self::seed), so any run can be replayed.
    pub fn seeded(
        source: Arc<D>,
        config: EpochConfig,
        policy: SamplingPolicy,
        collator: Collator<D::Item, B>,
    ) -> Result<Self> {
        let effective_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let entropy = StdRng::seed_from_u64(effective_seed);
        let mut generator = Self::new(source, config, policy, collator, entropy)?;
        generator.seed = Some(effective_seed);
        Ok(generator)
    }
}

/// Never exhausted: `next` always returns `Some`.
impl<D, B, R> Iterator for EpochGenerator<D, B, R>
where
    D: DataSource,
    D::Item: Send,
    R: RngCore,
{
    type Item = Result<Epoch<D, B>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_epoch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
