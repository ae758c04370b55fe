use crate::errors::EpochsError;
use crate::transform::Transform;
use anyhow::Result;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// A `DataSource` is a finite, random-access collection of samples.
///
/// `get` may compute the sample on access (decoding, tokenizing, ...), so
/// it returns an owned value and may fail. The engine only ever reads a
/// source through `get`, one index at a time, and never mutates it.
///
/// Implementations must be `Send + Sync` so that fetch workers can read
/// the same source concurrently.
pub trait DataSource: Send + Sync {
    type Item;

    /// Number of samples. Must stay constant while epochs are in use.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the sample at `index`.
    fn get(&self, index: usize) -> Result<Self::Item>;
}

fn out_of_bounds(index: usize, len: usize) -> anyhow::Error {
    EpochsError::IndexOutOfBounds { index, len }.into()
}

impl<T: Clone + Send + Sync> DataSource for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Result<T> {
        self.as_slice()
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_bounds(index, self.as_slice().len()))
    }
}

impl<D: DataSource + ?Sized> DataSource for Arc<D> {
    type Item = D::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<D::Item> {
        (**self).get(index)
    }
}

/// A dataset that stores all samples contiguously behind an `Arc<[T]>`.
///
/// This enables:
/// - Zero-copy clone: cloning only bumps the `Arc` counter
/// - Thread-safe sharing: concurrent reads from fetch workers
///
/// Ideal for datasets that comfortably fit into RAM.
#[derive(Debug, Clone)]
pub struct InMemoryDataset<T> {
    samples: Arc<[T]>,
    metadata: HashMap<String, String>,
}

impl<T> InMemoryDataset<T> {
    pub fn new(samples: Vec<T>) -> Self {
        Self {
            samples: samples.into(),
            metadata: HashMap::new(),
        }
    }

    /// Adds/updates metadata and returns the modified dataset.
    /// Enables chaining: `dataset.with_metadata("split", "train")`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    /// Borrowing access, for callers that precompute sort keys.
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Wraps the dataset so that `transform` runs on every access.
    pub fn with_transform<O, F>(self, transform: F) -> LazyDataset<Self, O, F>
    where
        T: Clone + Send + Sync,
        F: Transform<T, O>,
    {
        LazyDataset::new(self, transform)
    }
}

impl<T: Clone + Send + Sync> DataSource for InMemoryDataset<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<T> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_bounds(index, self.samples.len()))
    }
}

/// A source whose samples are computed from a base source on every access.
///
/// Nothing is cached: reading index `i` twice runs the transform twice.
/// This is the typical "decode on access" source that shuffling must not
/// force, which is why epochs reorder indices rather than samples.
pub struct LazyDataset<D, O, F> {
    base: D,
    transform: F,
    _output: PhantomData<fn() -> O>,
}

impl<D, O, F> LazyDataset<D, O, F>
where
    D: DataSource,
    F: Transform<D::Item, O>,
{
    pub fn new(base: D, transform: F) -> Self {
        Self {
            base,
            transform,
            _output: PhantomData,
        }
    }

    pub fn base(&self) -> &D {
        &self.base
    }
}

impl<D, O, F> DataSource for LazyDataset<D, O, F>
where
    D: DataSource,
    F: Transform<D::Item, O>,
{
    type Item = O;

    fn len(&self) -> usize {
        self.base.len()
    }

    fn get(&self, index: usize) -> Result<O> {
        let raw = self.base.get(index)?;
        self.transform.apply(raw)
    }
}
