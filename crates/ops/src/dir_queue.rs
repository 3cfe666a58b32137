//! Shared queue of directories awaiting a walker
//!
//! `in_flight` counts directories that are queued or being read. It starts
//! at one for the root and the walk is over when it drops back to zero.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<PathBuf>,
    in_flight: usize,
    aborted: bool,
}

#[derive(Debug)]
pub(crate) struct DirQueue {
    state: Mutex<QueueState>,
    ready: Notify,
}

impl DirQueue {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::from([root]),
                in_flight: 1,
                aborted: false,
            }),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, dir: PathBuf) {
        {
            let mut state = self.lock();
            state.pending.push_back(dir);
            state.in_flight += 1;
        }
        self.ready.notify_one();
    }

    /// Wait for the next directory
    ///
    /// Returns `None` once every directory has been processed or the walk was
    /// aborted.
    pub(crate) async fn next(&self) -> Option<PathBuf> {
        loop {
            // Register before inspecting state so a concurrent finish/abort
            // cannot slip between the check and the wait.
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.aborted {
                    return None;
                }
                if let Some(dir) = state.pending.pop_front() {
                    return Some(dir);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Mark one directory returned by [`DirQueue::next`] as processed
    pub(crate) fn finish(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0
        };
        if drained {
            self.ready.notify_waiters();
        }
    }

    /// Stop handing out work; waiting walkers return `None`
    pub(crate) fn abort(&self) {
        self.lock().aborted = true;
        self.ready.notify_waiters();
    }
}
