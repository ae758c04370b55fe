use crate::errors::EpochsError;
use anyhow::{anyhow, bail, Result};

/// The `MiniBatch` struct is a batch of equal-length rows stored row-major
/// in one contiguous buffer.
///
/// It is constructed by stacking per-sample rows along the batch dimension
/// (dim 0), so a batch built from `b` rows of length `l` has shape `[b, l]`.
/// Variable-length samples must be padded first, see
/// [`Padding`](crate::collator::Padding).
///
/// # Examples
/// Stacking 3 token sequences of length 4:
/// - rows: `[1, 2, 3, 4]`, `[5, 6, 7, 8]`, `[9, 10, 11, 12]`
/// - resulting `MiniBatch` shape: `[3, 4]`
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch<T> {
    data: Vec<T>,
    rows: usize,
    row_len: usize,
}

impl<T> MiniBatch<T> {
    /// Stacks `rows` along dim 0.
    ///
    /// Fails on an empty row list or if any row length differs from the
    /// first. Both failures are `EpochsError::Collation`.
    pub fn stack(rows: Vec<Vec<T>>) -> Result<Self> {
        let Some(row_len) = rows.first().map(Vec::len) else {
            return Err(EpochsError::Collation(anyhow!("Cannot stack empty sample list")).into());
        };

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != row_len) {
            return Err(EpochsError::Collation(anyhow!(
                "Shape mismatch in sample {}: expected length {}, got {}",
                i,
                row_len,
                row.len()
            ))
            .into());
        }

        let batch_size = rows.len();
        let mut data = Vec::with_capacity(batch_size * row_len);
        for row in rows {
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: batch_size,
            row_len,
        })
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> usize {
        self.rows
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// `[batch_size, row_len]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.row_len]
    }

    /// Returns the `i`-th row.
    pub fn row(&self, i: usize) -> Result<&[T]> {
        if i >= self.rows {
            bail!(EpochsError::IndexOutOfBounds {
                index: i,
                len: self.rows
            });
        }
        let start = i * self.row_len;
        Ok(&self.data[start..start + self.row_len])
    }

    /// Returns an iterator over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |i| {
            let start = i * self.row_len;
            &self.data[start..start + self.row_len]
        })
    }

    /// The row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}
