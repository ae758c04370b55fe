//! This module implements the `EpochGenerator`.
//!
//! The `EpochGenerator` coordinates a `DataSource`, a `SamplingPolicy` and a
//! `Collator` to turn one dataset into an endless sequence of epochs, each
//! a lazily evaluated sequence of batches.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────┐
//!                  │ DataSource │ (Vec, InMemory or Lazy)
//!                  └─────┬──────┘
//!                        │ len() only
//!                        ↓
//!                ┌────────────────┐
//!                │ SamplingPolicy │ ←── entropy (one shuffle per epoch)
//!                └───────┬────────┘
//!                        │ IndexPermutation
//!                        ↓
//!                ┌────────────────┐
//!                │ ReindexedView  │ ←── BatchSlicer (windows of batch_size)
//!                └───────┬────────┘
//!                        │ on request: one window
//!                        ↓
//!               [ConcurrentFetcher] (scoped fetch workers)
//!                        │ samples in window order
//!                        ↓
//!                   ┌──────────┐
//!                   │ Collator │ (resize, then combine)
//!                   └────┬─────┘
//!                        ↓
//!                      batch
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/epochs/
//! ├── mod.rs        # Public API exports + module-level architecture docs
//! ├── config.rs     # EpochConfig, builder, and validation
//! ├── policy.rs     # SamplingPolicy and per-epoch index ordering
//! ├── generator.rs  # EpochGenerator
//! ├── epoch.rs      # Epoch and its batch iterator
//! └── prefetch.rs   # Background batch materialization
//! ```

mod config;
mod epoch;
mod generator;
mod policy;
mod prefetch;

pub use config::{EpochConfig, EpochConfigBuilder};
pub use epoch::{Epoch, EpochIter};
pub use generator::EpochGenerator;
pub use policy::{SamplingPolicy, SizeFn};
pub use prefetch::PrefetchIter;
