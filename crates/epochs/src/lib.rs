//! Seeded epoch generation and concurrent batching for training loops.
//!
//! Samples are never moved: every epoch is an [`IndexPermutation`] over a
//! [`DataSource`], cut into windows by a [`BatchSlicer`]. A batch is only
//! read (by a [`ConcurrentFetcher`]) and combined (by a [`Collator`]) when
//! it is requested, so shuffling a decode-on-access dataset is as cheap as
//! shuffling integers.

pub mod collator;
pub mod dataset;
pub mod entropy;
pub mod epochs;
pub mod errors;
pub mod fetcher;
pub mod minibatch;
pub mod permutation;
pub mod reindex;
pub mod slicer;
pub mod transform;

pub use collator::{Collator, Padding, PaddingRule};
pub use dataset::{DataSource, InMemoryDataset, LazyDataset};
pub use entropy::LinearCongruential;
pub use epochs::{
    Epoch, EpochConfig, EpochConfigBuilder, EpochGenerator, EpochIter, PrefetchIter,
    SamplingPolicy,
};
pub use errors::EpochsError;
pub use fetcher::ConcurrentFetcher;
pub use minibatch::MiniBatch;
pub use permutation::IndexPermutation;
pub use reindex::ReindexedView;
pub use slicer::BatchSlicer;
pub use transform::Transform;
