use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::entities::CrawlTask;

/// FIFO of pending tasks. A URL is accepted at most once per crawl, and at
/// most `max_requests` URLs are accepted overall.
#[derive(Debug)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
    max_requests: Option<usize>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<CrawlTask>,
    seen: HashSet<String>,
    accepted: usize,
}

impl RequestQueue {
    /// `None` means no cap.
    pub fn new(max_requests: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_requests,
        }
    }

    /// Returns whether the task was accepted. Fragments are ignored when
    /// comparing URLs.
    pub fn push(&self, mut task: CrawlTask) -> bool {
        task.url.set_fragment(None);

        let mut state = self.lock();
        if self.max_requests.is_some_and(|max| state.accepted >= max) {
            return false;
        }
        if !state.seen.insert(task.url.to_string()) {
            return false;
        }

        state.accepted += 1;
        state.pending.push_back(task);
        true
    }

    pub fn pop(&self) -> Option<CrawlTask> {
        self.lock().pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tasks accepted so far, including those already popped.
    pub fn accepted(&self) -> usize {
        self.lock().accepted
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // state stays consistent across a panicking holder; every update is a single step
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
