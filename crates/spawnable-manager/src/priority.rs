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

//! Priorities, queue selection flags and queue status.

use serde::{Deserialize, Serialize};

/// The priority of a single request. Lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpawnablePriority(pub u8);

impl SpawnablePriority {
    /// The most urgent priority.
    pub const HIGH: Self = Self(0);
    /// The priority used when nothing else is asked for.
    pub const DEFAULT: Self = Self(128);
    /// The least urgent priority.
    pub const LOWEST: Self = Self(255);
}

impl Default for SpawnablePriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One of the two command queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueClass {
    /// Drained first.
    High,
    /// Drained after the high priority queue.
    Regular,
}

impl QueueClass {
    pub(crate) const COUNT: usize = 2;

    pub(crate) const fn index(self) -> usize {
        match self {
            QueueClass::High => 0,
            QueueClass::Regular => 1,
        }
    }
}

/// Flags selecting which queues a call to `process_queue` drains.
///
/// The flags can be combined with `|`; the high priority queue is always
/// drained before the regular one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandQueuePriority {
    bits: u8,
}

impl CommandQueuePriority {
    /// No queue.
    pub const NONE: Self = Self { bits: 0 };
    /// The high priority queue.
    pub const HIGH: Self = Self { bits: 1 << 0 };
    /// The regular priority queue.
    pub const REGULAR: Self = Self { bits: 1 << 1 };
    /// Both queues.
    pub const ALL: Self = Self {
        bits: Self::HIGH.bits | Self::REGULAR.bits,
    };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags select the given queue.
    pub const fn contains(&self, class: QueueClass) -> bool {
        let class_bits = Self::from_class(class).bits;
        (self.bits & class_bits) == class_bits
    }

    /// Checks if no queue is selected.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Creates flags selecting a single queue.
    pub const fn from_class(class: QueueClass) -> Self {
        match class {
            QueueClass::High => Self::HIGH,
            QueueClass::Regular => Self::REGULAR,
        }
    }
}

impl std::ops::BitOr for CommandQueuePriority {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for CommandQueuePriority {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Whether any command is still waiting after a call to `process_queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandQueueStatus {
    /// At least one command is pending or deferred in a processed queue.
    HasCommandsLeft,
    /// The processed queues are empty.
    NoCommandsLeft,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_select_queues() {
        let mut flags = CommandQueuePriority::NONE;
        assert!(flags.is_empty());

        flags |= CommandQueuePriority::REGULAR;
        assert!(flags.contains(QueueClass::Regular));
        assert!(!flags.contains(QueueClass::High));

        let all = CommandQueuePriority::HIGH | CommandQueuePriority::REGULAR;
        assert_eq!(all, CommandQueuePriority::ALL);
        assert_eq!(all.bits(), 0b11);
    }

    #[test]
    fn lower_priority_values_are_more_urgent() {
        assert!(SpawnablePriority::HIGH < SpawnablePriority::DEFAULT);
        assert!(SpawnablePriority::DEFAULT < SpawnablePriority::LOWEST);
        assert_eq!(SpawnablePriority::default(), SpawnablePriority::DEFAULT);
    }
}
