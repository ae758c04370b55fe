use thiserror::Error;

/// Error taxonomy for epoch generation and batch materialization.
///
/// Fallible operations in this crate return `anyhow::Result`; the concrete
/// failure is one of these variants, so callers can recover it with
/// `err.downcast_ref::<EpochsError>()`.
#[derive(Debug, Error)]
pub enum EpochsError {
    /// Invalid construction parameters. Raised eagerly, never while iterating.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An index or position outside `[0, len)`.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The data source failed to produce the sample at `index`
    /// (window position `position`). The whole batch is discarded.
    #[error("failed to fetch sample {index} at batch position {position}")]
    Fetch {
        position: usize,
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The resize or combine hook failed.
    #[error("collation failed")]
    Collation(#[source] anyhow::Error),
}

impl EpochsError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Fails with `EpochsError::Configuration` unless `cond` holds.
macro_rules! ensure_config {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::errors::EpochsError::configuration(format!($($arg)+)).into());
        }
    };
}

pub(crate) use ensure_config;
