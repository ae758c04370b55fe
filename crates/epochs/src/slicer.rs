use crate::errors::ensure_config;
use anyhow::Result;
use std::ops::Range;

/// ============================================================================
/// Partitions `0..n` into consecutive windows of `batch_size` positions.
///
/// Window `k` is `[k * batch_size, min((k + 1) * batch_size, n))`. With
/// `drop_remainder = true`, a short final window is omitted so that every
/// window has exactly `batch_size` positions.
///
/// Windows are computed arithmetically; the slicer never looks at data.
///
/// # Example
/// ```ignore
/// let slicer = BatchSlicer::new(10, 4, false)?;
/// assert_eq!(slicer.windows().collect::<Vec<_>>(), vec![0..4, 4..8, 8..10]);
///
/// let slicer = BatchSlicer::new(10, 4, true)?;
/// assert_eq!(slicer.len(), 2);
/// assert_eq!(slicer.dropped(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSlicer {
    n: usize,
    batch_size: usize,
    drop_remainder: bool,
}

impl BatchSlicer {
    pub fn new(n: usize, batch_size: usize, drop_remainder: bool) -> Result<Self> {
        ensure_config!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );
        Ok(Self {
            n,
            batch_size,
            drop_remainder,
        })
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        if self.drop_remainder {
            self.n / self.batch_size
        } else {
            self.n.div_ceil(self.batch_size)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn drop_remainder(&self) -> bool {
        self.drop_remainder
    }

    /// Range of positions covered by window `k`, or `None` if `k >= len()`.
    pub fn window(&self, k: usize) -> Option<Range<usize>> {
        if k >= self.len() {
            return None;
        }
        let start = k * self.batch_size;
        let end = (start + self.batch_size).min(self.n);
        Some(start..end)
    }

    pub fn windows(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.len()).filter_map(move |k| self.window(k))
    }

    /// Positions that belong to some window.
    pub fn covered(&self) -> usize {
        if self.drop_remainder {
            self.len() * self.batch_size
        } else {
            self.n
        }
    }

    /// Trailing positions left out by `drop_remainder`.
    pub fn dropped(&self) -> usize {
        self.n - self.covered()
    }
}
