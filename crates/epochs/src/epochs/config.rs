//! Configuration for epoch generation.
//!
//! The `EpochConfig` struct stores the parameters that control how every
//! epoch is sliced and materialized.
//!
//! Example:
//! ```ignore
//! let config = EpochConfig::builder()
//!     .batch_size(64)
//!     .worker_limit(8)
//!     .drop_remainder(true)
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `worker_limit`: More workers shorten the wait for slow (decode-on-access)
//!   sources but cost one thread spawn per sub-range and batch
//! - `bucket_multiplier`: Larger chunks group lengths more tightly but make
//!   batch composition less random
//! - `prefetch_factor`: Higher values hide more latency but keep more
//!   materialized batches in memory

use crate::errors::{ensure_config, EpochsError};
use anyhow::Result;
use std::time::Duration;

/// Configuration for EpochGenerator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochConfig {
    /// Number of samples per batch. Required.
    pub batch_size: Option<usize>,
    /// Chunk size of length bucketing, in batches (chunk = batch_size * bucket_multiplier)
    pub bucket_multiplier: usize,
    /// Maximum number of fetch workers per batch (None = one per sample, 1 = caller thread)
    pub worker_limit: Option<usize>,
    /// Whether to omit a short final batch. When unset, only the uniform
    /// policy drops it.
    pub drop_remainder: Option<bool>,
    /// Random seed used by `EpochGenerator::seeded`
    pub seed: Option<u64>,
    /// Number of batches materialized ahead by `Epoch::prefetch`
    pub prefetch_factor: usize,
    /// Maximum time to wait for one prefetched batch. Default: 30s
    pub timeout: Duration,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            bucket_multiplier: 100,
            worker_limit: None,
            drop_remainder: None,
            seed: None,
            prefetch_factor: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EpochConfig {
    pub fn builder() -> EpochConfigBuilder {
        EpochConfigBuilder::default()
    }

    /// Checks every field, returning the batch size.
    pub fn validate(&self) -> Result<usize> {
        let batch_size = self
            .batch_size
            .ok_or_else(|| EpochsError::configuration("batch_size is required"))?;
        ensure_config!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );
        ensure_config!(
            self.bucket_multiplier > 0,
            "bucket_multiplier must be > 0, but got bucket_multiplier={}",
            self.bucket_multiplier
        );
        if let Some(limit) = self.worker_limit {
            ensure_config!(
                limit > 0,
                "worker_limit must be > 0, but got worker_limit={}",
                limit
            );
        }
        ensure_config!(
            self.prefetch_factor > 0,
            "prefetch_factor must be > 0, but got prefetch_factor={}",
            self.prefetch_factor
        );
        Ok(batch_size)
    }
}

/// Builder for EpochConfig with method chaining
#[derive(Default)]
pub struct EpochConfigBuilder {
    config: EpochConfig,
}

impl EpochConfigBuilder {
    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Set the bucket multiplier used by length bucketing
    pub fn bucket_multiplier(mut self, multiplier: usize) -> Self {
        self.config.bucket_multiplier = multiplier;
        self
    }

    /// Set the maximum number of fetch workers per batch
    pub fn worker_limit(mut self, workers: usize) -> Self {
        self.config.worker_limit = Some(workers);
        self
    }

    /// Set whether to drop a short final batch
    pub fn drop_remainder(mut self, drop: bool) -> Self {
        self.config.drop_remainder = Some(drop);
        self
    }

    /// Set the random seed for reproducible epochs
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the prefetch queue depth
    pub fn prefetch_factor(mut self, factor: usize) -> Self {
        self.config.prefetch_factor = factor;
        self
    }

    /// Set the timeout for a prefetched batch.
    ///
    /// - Too low: May fail batches during legitimate heavy decoding.
    /// - Too high: Delays detection of a stuck source.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> EpochConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EpochConfig::default();
        assert_eq!(config.batch_size, None);
        assert_eq!(config.bucket_multiplier, 100);
        assert_eq!(config.worker_limit, None);
        assert_eq!(config.prefetch_factor, 2);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_sets_fields() -> Result<()> {
        let config = EpochConfig::builder()
            .batch_size(64)
            .bucket_multiplier(4)
            .worker_limit(8)
            .drop_remainder(false)
            .seed(7)
            .prefetch_factor(3)
            .timeout(Duration::from_millis(500))
            .build();
        assert_eq!(config.validate()?, 64);
        assert_eq!(config.worker_limit, Some(8));
        assert_eq!(config.drop_remainder, Some(false));
        assert_eq!(config.seed, Some(7));
        Ok(())
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let cases = [
            EpochConfig::builder().build(),
            EpochConfig::builder().batch_size(0).build(),
            EpochConfig::builder().batch_size(4).bucket_multiplier(0).build(),
            EpochConfig::builder().batch_size(4).worker_limit(0).build(),
            EpochConfig::builder().batch_size(4).prefetch_factor(0).build(),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<EpochsError>(),
                    Some(EpochsError::Configuration(_))
                ),
                "{:?} should be a configuration error",
                config
            );
        }
    }
}
