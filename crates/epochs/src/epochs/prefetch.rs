//! Background materialization of one epoch's batches.
//!
//! A single named thread walks the epoch in batch order and pushes each
//! result into a bounded channel. The channel capacity (`prefetch_factor`)
//! caps how many finished batches wait in memory; the producer blocks when
//! the consumer falls behind.
//!
//! Dropping the iterator stops the producer: the shutdown flag is raised,
//! the receiving end is closed so a blocked send returns, and the thread is
//! joined.

use crate::dataset::DataSource;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::epoch::Epoch;

/// Iterator over prefetched batches, created by [`Epoch::prefetch`].
///
/// Yields `Result<B>` in batch order. Waiting longer than the configured
/// timeout for a batch yields an error and ends the iteration.
pub struct PrefetchIter<B> {
    epoch: usize,
    remaining: usize,
    timeout: Duration,
    receiver: Option<Receiver<Result<B>>>,
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl<B: Send + 'static> PrefetchIter<B> {
    pub(crate) fn spawn<D>(epoch: Epoch<D, B>, prefetch_factor: usize, timeout: Duration) -> Result<Self>
    where
        D: DataSource + 'static,
        D::Item: Send,
    {
        let (sender, receiver) = bounded(prefetch_factor.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let index = epoch.index();
        let remaining = epoch.len();

        let handle = {
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name(format!("epochs-prefetch-{}", index))
                .spawn(move || {
                    for k in 0..epoch.len() {
                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        // A closed channel means the iterator was dropped.
                        if sender.send(epoch.batch(k)).is_err() {
                            break;
                        }
                    }
                    debug!(epoch = index; "prefetch thread finished");
                })
                .with_context(|| format!("Failed to spawn prefetch thread for epoch {}", index))?
        };

        Ok(Self {
            epoch: index,
            remaining,
            timeout,
            receiver: Some(receiver),
            handle: Some(handle),
            shutdown,
        })
    }
}

impl<B> Iterator for PrefetchIter<B> {
    type Item = Result<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let receiver = self.receiver.as_ref()?;
        match receiver.recv_timeout(self.timeout) {
            Ok(result) => {
                self.remaining -= 1;
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => {
                let pending = self.remaining;
                self.remaining = 0;
                Some(Err(anyhow!(
                    "Failed to receive batch of epoch {} after {:?} \
                    (pending batches: {}, possible slow or stuck data source)",
                    self.epoch,
                    self.timeout,
                    pending
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.remaining = 0;
                Some(Err(anyhow!(
                    "Prefetch thread of epoch {} exited before producing every batch",
                    self.epoch
                )))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<B> Drop for PrefetchIter<B> {
    fn drop(&mut self) {
        // Signal shutdown to the producer
        self.shutdown.store(true, Ordering::Relaxed);

        // Close the channel so a blocked send returns
        self.receiver.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(epoch = self.epoch; "prefetch thread panicked");
            }
        }
    }
}
