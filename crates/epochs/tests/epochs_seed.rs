//! Seed and determinism tests for EpochGenerator.
//!
//! Tests cover:
//! - Same seed → identical sequence of epochs (order and batch contents)
//! - Different seeds → different epochs
//! - Custom entropy sources
//! - Length-bucketed ("sortish") ordering across epochs

mod common;
use common::{init_logging, token_sequences, varied_lengths, TEST_SEED};

use epochs::{
    Collator, EpochConfig, EpochGenerator, IndexPermutation, LinearCongruential, Padding,
    SamplingPolicy,
};

use anyhow::Result;
use std::sync::Arc;

// ============================================================================
// Common Helper Functions
// ============================================================================

fn permutations_for_seed(seed: u64, epochs: usize) -> Result<Vec<IndexPermutation>> {
    let config = EpochConfig::builder().batch_size(16).seed(seed).build();
    let mut generator = EpochGenerator::seeded(
        Arc::new((0..256).collect::<Vec<usize>>()),
        config,
        SamplingPolicy::Uniform,
        Collator::to_vec(),
    )?;
    (0..epochs)
        .map(|_| generator.next_epoch().map(|e| e.permutation().clone()))
        .collect()
}

fn bucketed_generator(
    lengths: &[usize],
    batch_size: usize,
    bucket_multiplier: usize,
    seed: u64,
) -> Result<EpochGenerator<Vec<Vec<i64>>, Vec<Vec<i64>>>> {
    let config = EpochConfig::builder()
        .batch_size(batch_size)
        .bucket_multiplier(bucket_multiplier)
        .seed(seed)
        .build();
    EpochGenerator::seeded(
        Arc::new(token_sequences(lengths)),
        config,
        SamplingPolicy::length_bucketed_by_lengths(lengths.to_vec()),
        Collator::to_vec(),
    )
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[test]
fn test_same_seed_same_epochs() -> Result<()> {
    init_logging();
    let a = permutations_for_seed(TEST_SEED, 5)?;
    let b = permutations_for_seed(TEST_SEED, 5)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn test_different_seeds_different_epochs() -> Result<()> {
    let a = permutations_for_seed(TEST_SEED, 3)?;
    let b = permutations_for_seed(TEST_SEED + 1, 3)?;
    assert_ne!(a, b);
    Ok(())
}

#[test]
fn test_same_seed_same_batches() -> Result<()> {
    let lengths = varied_lengths(200, 50);
    let mut first = bucketed_generator(&lengths, 8, 4, TEST_SEED)?;
    let mut second = bucketed_generator(&lengths, 8, 4, TEST_SEED)?;
    for _ in 0..3 {
        let a: Vec<_> = first.next_epoch()?.iter().collect::<Result<_>>()?;
        let b: Vec<_> = second.next_epoch()?.iter().collect::<Result<_>>()?;
        assert_eq!(a, b);
    }
    Ok(())
}

#[test]
fn test_custom_entropy_source() -> Result<()> {
    let make = || -> Result<EpochGenerator<Vec<usize>, Vec<usize>, LinearCongruential>> {
        EpochGenerator::new(
            Arc::new((0..64).collect()),
            EpochConfig::builder().batch_size(8).build(),
            SamplingPolicy::Uniform,
            Collator::to_vec(),
            LinearCongruential::new(7),
        )
    };
    let mut a = make()?;
    let mut b = make()?;
    assert_eq!(a.seed(), None);

    let first = a.next_epoch()?;
    assert_eq!(first.permutation(), b.next_epoch()?.permutation());
    assert_ne!(first.permutation(), a.next_epoch()?.permutation());
    Ok(())
}

#[test]
fn test_sequential_ignores_seed() -> Result<()> {
    let config = EpochConfig::builder().batch_size(4).build();
    let mut generator = EpochGenerator::seeded(
        Arc::new((0..10).collect::<Vec<usize>>()),
        config,
        SamplingPolicy::Sequential,
        Collator::to_vec(),
    )?;
    for _ in 0..3 {
        assert_eq!(
            generator.next_epoch()?.permutation(),
            &IndexPermutation::identity(10)
        );
    }
    Ok(())
}

// ============================================================================
// Length Bucketing Tests
// ============================================================================

#[test]
fn test_bucketed_chunks_sorted_descending() -> Result<()> {
    init_logging();
    let lengths = varied_lengths(100, 40);
    // batch 2 x multiplier 4 = chunks of 8
    let mut generator = bucketed_generator(&lengths, 2, 4, TEST_SEED)?;

    let mut orders = Vec::new();
    for _ in 0..3 {
        let epoch = generator.next_epoch()?;
        let order = epoch.permutation().clone();
        for chunk in order.as_slice().chunks(8) {
            let sizes: Vec<usize> = chunk.iter().map(|&i| lengths[i]).collect();
            assert!(
                sizes.windows(2).all(|w| w[0] >= w[1]),
                "chunk not sorted: {:?}",
                sizes
            );
        }
        let mut sorted = order.clone().into_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
        orders.push(order);
    }
    assert_ne!(orders[0], orders[1]);
    assert_ne!(orders[1], orders[2]);
    Ok(())
}

#[test]
fn test_largest_sample_in_first_batch() -> Result<()> {
    let lengths = varied_lengths(500, 200);
    let max = lengths.iter().copied().max().unwrap_or(0);
    let mut generator = bucketed_generator(&lengths, 16, 2, TEST_SEED)?;

    for _ in 0..5 {
        let epoch = generator.next_epoch()?;
        let first_batch = epoch.batch(0)?;
        assert!(first_batch.iter().any(|sample| sample.len() == max));
    }
    Ok(())
}

#[test]
fn test_bucketed_batches_pad_less() -> Result<()> {
    let lengths = varied_lengths(512, 200);
    let config = |seed| {
        EpochConfig::builder()
            .batch_size(16)
            .bucket_multiplier(8)
            .seed(seed)
            .build()
    };
    let padded_cells = |policy: SamplingPolicy| -> Result<usize> {
        let mut generator = EpochGenerator::seeded(
            Arc::new(token_sequences(&lengths)),
            config(TEST_SEED),
            policy,
            Collator::padded_stacking(Padding::new(0)),
        )?;
        let epoch = generator.next_epoch()?;
        epoch
            .iter()
            .map(|batch| batch.map(|b| b.as_slice().len()))
            .sum()
    };

    let uniform = padded_cells(SamplingPolicy::Uniform)?;
    let bucketed = padded_cells(SamplingPolicy::length_bucketed_by_lengths(lengths.clone()))?;
    assert!(bucketed < uniform, "bucketed={bucketed} uniform={uniform}");
    Ok(())
}
