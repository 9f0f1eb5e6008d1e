// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lock-free counters describing the queue's activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time copy of the manager's queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    /// Commands accepted by a request method.
    pub queued: u64,
    /// Commands that ran against a live ticket.
    pub executed: u64,
    /// Times a command was parked in a delayed deque.
    pub requeued: u64,
    /// Commands completed with an empty result without running.
    pub discarded: u64,
}

impl QueueStatsSnapshot {
    /// Commands that have been accepted but not yet completed.
    pub fn outstanding(&self) -> u64 {
        self.queued.saturating_sub(self.executed + self.discarded)
    }
}

#[derive(Debug, Default)]
pub(crate) struct QueueStats {
    queued: AtomicU64,
    executed: AtomicU64,
    requeued: AtomicU64,
    discarded: AtomicU64,
}

impl QueueStats {
    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
