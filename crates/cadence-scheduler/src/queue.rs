//! Recurring, time-ordered job queue.
//!
//! Backed by a min-heap keyed on `(due, seq)`. `seq` is a monotonically
//! increasing insertion counter, so jobs due at the same instant come out in
//! the order they were (re)inserted.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::schedule::next_after;
use crate::types::Job;

struct Entry {
    due: DateTime<Utc>,
    seq: u64,
    job: Arc<Job>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and we want the earliest on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Holds every job and always knows which one is due soonest.
#[derive(Default)]
pub struct JobQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue's contents, scheduling each job relative to `now`.
    ///
    /// Jobs whose schedule yields no future run are left out.
    pub fn set_jobs<I>(&mut self, now: DateTime<Utc>, jobs: I)
    where
        I: IntoIterator<Item = Arc<Job>>,
    {
        self.heap.clear();
        self.next_seq = 0;
        for job in jobs {
            match next_after(&job.schedule, now) {
                Some(due) => self.push(due, job),
                None => warn!(job = %job.name, "schedule has no upcoming run, not queued"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Due time of the job that will be popped next.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|e| e.due)
    }

    /// Wait until the earliest job is due, then return it.
    ///
    /// The returned job has already been rescheduled for its following
    /// occurrence. Paused jobs are returned like any other; the caller
    /// decides whether to run them. Returns `None` only when `cancel` fires,
    /// which it checks before any due job. An empty queue waits for
    /// cancellation.
    pub async fn pop(
        &mut self,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Option<Arc<Job>> {
        let Some(due) = self.next_due() else {
            cancel.cancelled().await;
            return None;
        };

        let wait = (due - now).to_std().unwrap_or_default();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(wait) => {}
        }

        let entry = self.heap.pop()?;
        // Overdue jobs are rescheduled from `now` so a stall does not turn
        // into a burst of catch-up runs.
        let base = entry.due.max(now);
        match next_after(&entry.job.schedule, base) {
            Some(next) => self.push(next, Arc::clone(&entry.job)),
            None => debug!(job = %entry.job.name, "schedule exhausted, dropping from queue"),
        }
        Some(entry.job)
    }

    fn push(&mut self, due: DateTime<Utc>, job: Arc<Job>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due, seq, job });
    }
}
