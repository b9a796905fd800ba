//! Coalescing outbox of writes waiting for the remote mirror.

use crate::sync::remote::{PendingMutation, RemoteStore};
use log::{info, warn};
use serde_json::Value;
use std::collections::VecDeque;

/// Outcome counts for one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub pushed: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// FIFO of pending mutations, at most one per key.
#[derive(Debug, Default)]
pub struct SyncOutbox {
    queue: VecDeque<PendingMutation>,
}

impl SyncOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the latest value for `key`, replacing any older pending one.
    ///
    /// The replaced entry's attempt count carries over.
    pub fn enqueue(&mut self, key: &str, value: Option<Value>, now_ms: i64) {
        let attempts = match self.queue.iter().position(|pending| pending.key == key) {
            Some(index) => self
                .queue
                .remove(index)
                .map_or(0, |pending| pending.attempts),
            None => 0,
        };
        self.queue.push_back(PendingMutation {
            key: key.to_string(),
            value,
            queued_at_ms: now_ms,
            attempts,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingMutation> {
        self.queue.iter()
    }

    /// Pushes everything queued, oldest first.
    ///
    /// Retryable failures go back on the queue for the next flush; others
    /// are dropped.
    pub fn flush(&mut self, remote: &dyn RemoteStore) -> FlushReport {
        let mut report = FlushReport::default();
        let batch: Vec<PendingMutation> = self.queue.drain(..).collect();

        for mut mutation in batch {
            match remote.push(&mutation) {
                Ok(()) => report.pushed += 1,
                Err(err) if err.retryable => {
                    mutation.attempts += 1;
                    warn!(
                        "event=outbox_push module=sync status=retry remote={} key={} attempts={} code={}",
                        remote.remote_id(),
                        mutation.key,
                        mutation.attempts,
                        err.code
                    );
                    report.requeued += 1;
                    self.queue.push_back(mutation);
                }
                Err(err) => {
                    warn!(
                        "event=outbox_push module=sync status=dropped remote={} key={} code={}",
                        remote.remote_id(),
                        mutation.key,
                        err.code
                    );
                    report.dropped += 1;
                }
            }
        }

        info!(
            "event=outbox_flush module=sync status=ok remote={} pushed={} requeued={} dropped={}",
            remote.remote_id(),
            report.pushed,
            report.requeued,
            report.dropped
        );
        report
    }
}
