use crate::collator::Collator;
use crate::dataset::DataSource;
use crate::errors::EpochsError;
use crate::fetcher::ConcurrentFetcher;
use crate::permutation::IndexPermutation;
use crate::reindex::ReindexedView;
use crate::slicer::BatchSlicer;
use anyhow::Result;
use log::{trace, warn};
use std::iter::FusedIterator;
use std::time::Duration;

use super::prefetch::PrefetchIter;

/// One pass over the data: a fixed order of samples, cut into batches.
///
/// Building an epoch touches no sample. Batches are materialized one at a
/// time, when requested, by reading the batch's window of the permutation
/// from the source (possibly with several fetch workers) and collating the
/// result. Dropping an epoch part way through is free.
///
/// # Example
/// ```ignore
/// let epoch = generator.next_epoch()?;
/// for batch in &epoch {
///     let batch = batch?;
///     train_step(batch);
/// }
/// ```
pub struct Epoch<D: DataSource, B> {
    index: usize,
    samples: ReindexedView<D>,
    slicer: BatchSlicer,
    fetcher: ConcurrentFetcher,
    collator: Collator<D::Item, B>,
    prefetch_factor: usize,
    timeout: Duration,
}

impl<D: DataSource, B> Clone for Epoch<D, B> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            samples: self.samples.clone(),
            slicer: self.slicer,
            fetcher: self.fetcher,
            collator: self.collator.clone(),
            prefetch_factor: self.prefetch_factor,
            timeout: self.timeout,
        }
    }
}

impl<D, B> Epoch<D, B>
where
    D: DataSource,
    D::Item: Send,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        index: usize,
        samples: ReindexedView<D>,
        slicer: BatchSlicer,
        fetcher: ConcurrentFetcher,
        collator: Collator<D::Item, B>,
        prefetch_factor: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            index,
            samples,
            slicer,
            fetcher,
            collator,
            prefetch_factor,
            timeout,
        }
    }

    /// Epoch number, starting at 0 for the first epoch of a generator.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.slicer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slicer.is_empty()
    }

    /// Order of source indices for this epoch.
    pub fn permutation(&self) -> &IndexPermutation {
        self.samples.permutation()
    }

    /// The source in this epoch's order, for random access to single samples.
    pub fn samples(&self) -> &ReindexedView<D> {
        &self.samples
    }

    pub fn slicer(&self) -> &BatchSlicer {
        &self.slicer
    }

    /// Source indices making up batch `k`.
    pub fn batch_indices(&self, k: usize) -> Result<&[usize]> {
        let window = self.slicer.window(k).ok_or(EpochsError::IndexOutOfBounds {
            index: k,
            len: self.len(),
        })?;
        Ok(&self.permutation().as_slice()[window])
    }

    /// Materializes batch `k`.
    ///
    /// Failures are per batch: the epoch stays usable and other batches
    /// can still be requested.
    pub fn batch(&self, k: usize) -> Result<B> {
        let indices = self.batch_indices(k)?;
        trace!(epoch = self.index, batch = k, len = indices.len(); "materializing batch");

        let samples = self
            .fetcher
            .fetch_indices(&**self.samples.source(), indices)?;
        self.collator.collate(samples).inspect_err(|e| {
            warn!(epoch = self.index, batch = k; "collation failed: {:#}", e);
        })
    }

    /// Iterates over all batches in order, materializing each on demand.
    pub fn iter(&self) -> EpochIter<'_, D, B> {
        EpochIter {
            epoch: self,
            next: 0,
        }
    }

    /// Materializes batches ahead of consumption on a background thread,
    /// keeping at most `prefetch_factor` finished batches queued.
    pub fn prefetch(&self) -> Result<PrefetchIter<B>>
    where
        D: 'static,
        B: Send + 'static,
    {
        PrefetchIter::spawn(self.clone(), self.prefetch_factor, self.timeout)
    }
}

/// Iterator over the batches of an [`Epoch`], created by [`Epoch::iter`].
pub struct EpochIter<'a, D: DataSource, B> {
    epoch: &'a Epoch<D, B>,
    next: usize,
}

impl<D, B> Iterator for EpochIter<'_, D, B>
where
    D: DataSource,
    D::Item: Send,
{
    type Item = Result<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.epoch.len() {
            return None;
        }
        let k = self.next;
        self.next += 1;
        Some(self.epoch.batch(k))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.epoch.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<D, B> ExactSizeIterator for EpochIter<'_, D, B>
where
    D: DataSource,
    D::Item: Send,
{
}

impl<D, B> FusedIterator for EpochIter<'_, D, B>
where
    D: DataSource,
    D::Item: Send,
{
}

impl<'a, D, B> IntoIterator for &'a Epoch<D, B>
where
    D: DataSource,
    D::Item: Send,
{
    type Item = Result<B>;
    type IntoIter = EpochIter<'a, D, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
