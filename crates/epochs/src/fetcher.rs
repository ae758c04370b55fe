//! Concurrent materialization of one batch window.
//!
//! A window of positions is split into `min(worker_limit, len)` contiguous
//! sub-ranges whose widths differ by at most one; with no limit every
//! position gets its own worker. Each sub-range is read by its own scoped thread, which
//! writes every sample into its own slice of a pre-allocated buffer at the
//! sample's original position. Workers never share an output slot, so no
//! locks are involved and the output order always equals the window order.
//!
//! The call blocks until every sub-range is done. A single failing element
//! fails the whole window; partial batches are never returned.

use crate::dataset::DataSource;
use crate::errors::{ensure_config, EpochsError};
use anyhow::{anyhow, Context, Result};
use log::{trace, warn};
use std::any::Any;
use std::cell::Cell;
use std::ops::Range;
use std::thread;

thread_local! {
    /// Id of the fetch worker running on this thread, if any.
    static FETCH_WORKER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Id (`0..workers`) of the fetch worker calling into the data source.
///
/// `None` when the source is read on the caller's own thread. Sources can
/// use it to keep per-worker state such as open file handles.
pub fn current_worker() -> Option<usize> {
    FETCH_WORKER.with(|id| id.get())
}

/// A failed sub-range: offset of its first failing element and the cause.
struct ChunkFailure {
    offset: usize,
    error: anyhow::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConcurrentFetcher {
    worker_limit: Option<usize>,
}

impl ConcurrentFetcher {
    /// `None` reads every position of a window on its own worker.
    pub fn new(worker_limit: Option<usize>) -> Result<Self> {
        if let Some(limit) = worker_limit {
            ensure_config!(
                limit > 0,
                "worker_limit must be > 0, but got worker_limit={}",
                limit
            );
        }
        Ok(Self { worker_limit })
    }

    /// Reads every window on the calling thread.
    pub fn sequential() -> Self {
        Self {
            worker_limit: Some(1),
        }
    }

    pub fn worker_limit(&self) -> Option<usize> {
        self.worker_limit
    }

    /// Number of sub-ranges a window of `len` positions is split into.
    pub fn workers_for(&self, len: usize) -> usize {
        match self.worker_limit {
            _ if len == 0 => 1,
            Some(limit) => limit.min(len),
            None => len,
        }
    }

    /// Reads `source[window]` in window order.
    ///
    /// On failure the error is `EpochsError::Fetch` for the lowest failing
    /// position (relative to `window.start`).
    pub fn fetch<D>(&self, source: &D, window: Range<usize>) -> Result<Vec<D::Item>>
    where
        D: DataSource + ?Sized,
        D::Item: Send,
    {
        let start = window.start;
        self.run(
            window.len(),
            |offset| source.get(start + offset),
            |offset| start + offset,
        )
    }

    /// Reads `source[indices[0]], source[indices[1]], ...` in that order.
    ///
    /// Used by epochs to read a window of the permutation straight from the
    /// underlying source, so that a `Fetch` error names the source index.
    pub fn fetch_indices<D>(&self, source: &D, indices: &[usize]) -> Result<Vec<D::Item>>
    where
        D: DataSource + ?Sized,
        D::Item: Send,
    {
        self.run(
            indices.len(),
            |offset| source.get(indices[offset]),
            |offset| indices[offset],
        )
    }

    fn run<T, R, I>(&self, len: usize, read: R, index_of: I) -> Result<Vec<T>>
    where
        T: Send,
        R: Fn(usize) -> Result<T> + Sync,
        I: Fn(usize) -> usize,
    {
        let workers = self.workers_for(len);
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
        trace!(len = len, workers = workers; "fetching window");

        let failure = if workers == 1 {
            read_chunk(&read, 0, &mut slots).err()
        } else {
            // The first `len % workers` sub-ranges take one extra position.
            let (base, extra) = (len / workers, len % workers);
            let read = &read;
            let mut rest = slots.as_mut_slice();
            thread::scope(|scope| {
                let mut handles = Vec::with_capacity(workers);
                let mut failures = Vec::new();
                let mut offset = 0;

                for worker_id in 0..workers {
                    let width = base + usize::from(worker_id < extra);
                    let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(width);
                    rest = tail;
                    let chunk_offset = offset;
                    offset += width;

                    let spawned = thread::Builder::new()
                        .name(format!("epochs-fetch-{}", worker_id))
                        .spawn_scoped(scope, move || {
                            FETCH_WORKER.with(|id| id.set(Some(worker_id)));
                            read_chunk(read, chunk_offset, chunk)
                        })
                        .with_context(|| format!("Failed to spawn fetch worker {}", worker_id));
                    match spawned {
                        Ok(handle) => handles.push((chunk_offset, handle)),
                        Err(error) => {
                            failures.push(ChunkFailure {
                                offset: chunk_offset,
                                error,
                            });
                            break;
                        }
                    }
                }

                for (offset, handle) in handles {
                    match handle.join() {
                        Ok(Ok(())) => {}
                        Ok(Err(failure)) => failures.push(failure),
                        Err(payload) => failures.push(ChunkFailure {
                            offset,
                            error: anyhow!("fetch worker panicked: {}", panic_message(&*payload)),
                        }),
                    }
                }

                failures.into_iter().min_by_key(|failure| failure.offset)
            })
        };

        if let Some(ChunkFailure { offset, error }) = failure {
            let index = index_of(offset);
            warn!(position = offset, index = index; "fetch failed, discarding batch: {:#}", error);
            return Err(EpochsError::Fetch {
                position: offset,
                index,
                source: error,
            }
            .into());
        }

        slots
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| anyhow!("fetch finished with unfilled batch positions"))
    }
}

/// Reads `chunk.len()` samples starting at window offset `offset`, stopping
/// at the first failure.
fn read_chunk<T, R>(read: &R, offset: usize, chunk: &mut [Option<T>]) -> Result<(), ChunkFailure>
where
    R: Fn(usize) -> Result<T>,
{
    for (i, slot) in chunk.iter_mut().enumerate() {
        match read(offset + i) {
            Ok(item) => *slot = Some(item),
            Err(error) => {
                return Err(ChunkFailure {
                    offset: offset + i,
                    error,
                })
            }
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
