use crate::dataset::DataSource;
use crate::errors::EpochsError;
use crate::permutation::IndexPermutation;
use anyhow::Result;
use std::sync::Arc;

/// A random-access view of `source` in the order given by a permutation.
///
/// `view.get(i)` reads exactly one element, `source.get(permutation[i])`.
/// Nothing is copied or evaluated up front, so a shuffled view over a
/// decode-on-access source costs O(n) integers, not O(n) samples.
///
/// `len()` is the permutation length, which may differ from the source
/// length when the permutation under- or oversamples.
pub struct ReindexedView<D> {
    source: Arc<D>,
    permutation: Arc<IndexPermutation>,
}

impl<D> Clone for ReindexedView<D> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            permutation: Arc::clone(&self.permutation),
        }
    }
}

impl<D: DataSource> ReindexedView<D> {
    /// Fails with `IndexOutOfBounds` if the permutation refers past the end of `source`.
    pub fn new(source: Arc<D>, permutation: impl Into<Arc<IndexPermutation>>) -> Result<Self> {
        let permutation = permutation.into();
        permutation.validate(source.len())?;
        Ok(Self {
            source,
            permutation,
        })
    }

    /// The source in its natural order.
    pub fn identity(source: Arc<D>) -> Self {
        let permutation = Arc::new(IndexPermutation::identity(source.len()));
        Self {
            source,
            permutation,
        }
    }

    /// Source index behind view position `position`.
    pub fn source_index(&self, position: usize) -> Result<usize> {
        self.permutation
            .get(position)
            .ok_or_else(|| {
                EpochsError::IndexOutOfBounds {
                    index: position,
                    len: self.permutation.len(),
                }
                .into()
            })
    }

    pub fn permutation(&self) -> &IndexPermutation {
        &self.permutation
    }

    pub fn source(&self) -> &Arc<D> {
        &self.source
    }
}

impl<D: DataSource> DataSource for ReindexedView<D> {
    type Item = D::Item;

    fn len(&self) -> usize {
        self.permutation.len()
    }

    fn get(&self, position: usize) -> Result<D::Item> {
        let index = self.source_index(position)?;
        self.source.get(index)
    }
}
