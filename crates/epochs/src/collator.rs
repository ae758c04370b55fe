use crate::errors::EpochsError;
use crate::minibatch::MiniBatch;
use anyhow::{anyhow, Result};
use std::fmt;
use std::sync::Arc;

pub type ResizeFn<S> = Arc<dyn Fn(Vec<S>) -> Result<Vec<S>> + Send + Sync>;
pub type CombineFn<S, B> = Arc<dyn Fn(Vec<S>) -> Result<B> + Send + Sync>;

/// A `Collator` defines how to resize and combine the samples of one
/// window into a batch value `B`.
///
/// It is a plain record of two functions:
/// - `resize`: per-batch reshaping such as padding to a common length.
///   It may change the shape of samples but never their number.
///   Defaults to the identity.
/// - `combine`: builds the batch from the resized samples.
///
/// Any failure in either hook surfaces as `EpochsError::Collation`.
///
/// # Example
/// ```ignore
/// // Pad token sequences to the longest in the batch, then stack.
/// let collator = Collator::padded_stacking(Padding::new(0));
///
/// // Keep the raw samples.
/// let collator = Collator::<String, Vec<String>>::to_vec();
/// ```
pub struct Collator<S, B> {
    resize: Option<ResizeFn<S>>,
    combine: CombineFn<S, B>,
}

impl<S, B> Clone for Collator<S, B> {
    fn clone(&self) -> Self {
        Self {
            resize: self.resize.clone(),
            combine: Arc::clone(&self.combine),
        }
    }
}

impl<S, B> fmt::Debug for Collator<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collator")
            .field("resize", &self.resize.is_some())
            .finish_non_exhaustive()
    }
}

/// Wraps a hook failure, leaving errors that already are collation errors alone.
fn collation_error(error: anyhow::Error) -> anyhow::Error {
    match error.downcast_ref::<EpochsError>() {
        Some(EpochsError::Collation(_)) => error,
        _ => EpochsError::Collation(error).into(),
    }
}

impl<S, B> Collator<S, B> {
    pub fn new<F>(combine: F) -> Self
    where
        F: Fn(Vec<S>) -> Result<B> + Send + Sync + 'static,
    {
        Self {
            resize: None,
            combine: Arc::new(combine),
        }
    }

    /// Replaces the resize hook.
    pub fn with_resize<F>(mut self, resize: F) -> Self
    where
        F: Fn(Vec<S>) -> Result<Vec<S>> + Send + Sync + 'static,
    {
        self.resize = Some(Arc::new(resize));
        self
    }

    /// Runs `resize` then `combine` on the samples of one window.
    pub fn collate(&self, samples: Vec<S>) -> Result<B> {
        let count = samples.len();
        let samples = match &self.resize {
            Some(resize) => {
                let resized = resize(samples).map_err(collation_error)?;
                if resized.len() != count {
                    return Err(EpochsError::Collation(anyhow!(
                        "resize changed the number of samples from {} to {}",
                        count,
                        resized.len()
                    ))
                    .into());
                }
                resized
            }
            None => samples,
        };
        (self.combine)(samples).map_err(collation_error)
    }
}

impl<S: 'static> Collator<S, Vec<S>> {
    /// The batch is the list of samples itself.
    pub fn to_vec() -> Self {
        Self::new(Ok)
    }
}

impl<T, B> Collator<Vec<T>, B>
where
    T: Clone + Send + Sync + 'static,
{
    /// Uses `padding` as the resize hook.
    pub fn with_padding(self, padding: Padding<T>) -> Self {
        self.with_resize(move |rows| Ok(padding.apply(rows)))
    }
}

impl<T> Collator<Vec<T>, MiniBatch<T>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Stacks rows of identical length; ragged batches fail.
    pub fn stacking() -> Self {
        Self::new(MiniBatch::stack)
    }

    /// Pads rows with `padding`, then stacks them.
    pub fn padded_stacking(padding: Padding<T>) -> Self {
        Self::stacking().with_padding(padding)
    }
}

//=======================================================================================================
/// Defines the common length rows are padded to within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingRule {
    // Pad to the longest row of the batch
    MaxLength,
    // Pad (or truncate) to exactly this length
    Fixed(usize),
}

/// Pads variable-length rows to a common length.
///
/// With `pad_first = false` the pad values go after the data, otherwise
/// before it. Under `PaddingRule::Fixed(n)` rows longer than `n` are
/// truncated on the same side that would have been padded, so that
/// left-padded rows keep their most recent elements.
///
/// # Example
/// ```ignore
/// let padding = Padding::new(0).with_pad_first(true);
/// assert_eq!(padding.apply(vec![vec![1, 2, 3], vec![4]]), vec![vec![1, 2, 3], vec![0, 0, 4]]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Padding<T> {
    pub pad_value: T,
    pub pad_first: bool,
    pub rule: PaddingRule,
}

impl<T: Clone> Padding<T> {
    /// Right-pads to the longest row with `pad_value`.
    pub fn new(pad_value: T) -> Self {
        Self {
            pad_value,
            pad_first: false,
            rule: PaddingRule::MaxLength,
        }
    }

    pub fn with_pad_first(mut self, pad_first: bool) -> Self {
        self.pad_first = pad_first;
        self
    }

    pub fn with_rule(mut self, rule: PaddingRule) -> Self {
        self.rule = rule;
        self
    }

    /// Length every row of `rows` is brought to.
    pub fn target_len(&self, rows: &[Vec<T>]) -> usize {
        match self.rule {
            PaddingRule::MaxLength => rows.iter().map(Vec::len).max().unwrap_or(0),
            PaddingRule::Fixed(n) => n,
        }
    }

    pub fn apply(&self, rows: Vec<Vec<T>>) -> Vec<Vec<T>> {
        let target = self.target_len(&rows);
        rows.into_iter()
            .map(|row| self.pad_single(row, target))
            .collect()
    }

    fn pad_single(&self, mut row: Vec<T>, target: usize) -> Vec<T> {
        match (row.len().cmp(&target), self.pad_first) {
            (std::cmp::Ordering::Less, false) => {
                row.resize(target, self.pad_value.clone());
                row
            }
            (std::cmp::Ordering::Less, true) => {
                let mut padded = vec![self.pad_value.clone(); target - row.len()];
                padded.append(&mut row);
                padded
            }
            (std::cmp::Ordering::Greater, false) => {
                row.truncate(target);
                row
            }
            (std::cmp::Ordering::Greater, true) => row.split_off(row.len() - target),
            (std::cmp::Ordering::Equal, _) => row,
        }
    }
}


#[cfg(test)]
mod collator_tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn test_default_resize_is_identity() -> Result<()> {
        let collator = Collator::<i32, Vec<i32>>::to_vec();
        assert_eq!(collator.collate(vec![3, 1, 2])?, vec![3, 1, 2]);
        Ok(())
    }

    #[test]
    fn test_padded_stacking() -> Result<()> {
        let collator = Collator::padded_stacking(Padding::new(0));
        let batch = collator.collate(vec![vec![1, 2, 3], vec![4, 5]])?;
        assert_eq!(batch.shape(), [2, 3]);
        assert_eq!(batch.as_slice(), &[1, 2, 3, 4, 5, 0]);
        Ok(())
    }

    #[test]
    fn test_stacking_without_padding_rejects_ragged_rows() {
        let collator = Collator::stacking();
        let err = collator.collate(vec![vec![1, 2, 3], vec![4, 5]]).unwrap_err();
        match err.downcast_ref::<EpochsError>() {
            Some(EpochsError::Collation(inner)) => {
                assert!(inner.downcast_ref::<EpochsError>().is_none());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_custom_combine() -> Result<()> {
        let collator = Collator::new(|samples: Vec<String>| Ok(samples.join(" ")))
            .with_resize(|samples| Ok(samples.into_iter().map(|s| s.to_uppercase()).collect()));
        assert_eq!(collator.collate(vec!["a".into(), "b".into()])?, "A B");
        Ok(())
    }

    #[test]
    fn test_resize_must_keep_sample_count() {
        let collator = Collator::<u8, Vec<u8>>::to_vec().with_resize(|mut s| {
            s.pop();
            Ok(s)
        });
        let err = collator.collate(vec![1, 2]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EpochsError>(),
            Some(EpochsError::Collation(_))
        ));
        assert!(format!("{:#}", err).contains("from 2 to 1"));
    }

    #[test]
    fn test_hook_errors_are_collation_errors() {
        let collator = Collator::new(|_: Vec<u8>| -> Result<u8> { bail!("out of memory") });
        let err = collator.collate(vec![1]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EpochsError>(),
            Some(EpochsError::Collation(_))
        ));
        assert!(format!("{:#}", err).contains("out of memory"));

        let failing_resize =
            Collator::<u8, Vec<u8>>::to_vec().with_resize(|_| bail!("bad shape"));
        assert!(failing_resize.collate(vec![1]).is_err());
    }
}
