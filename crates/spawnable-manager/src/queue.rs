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

//! One priority level of the command queue.
//!
//! Producers on any thread push into the pending FIFO under a short-held
//! mutex. The owning thread moves the FIFO into its own batch and works on it
//! without the lock, parking commands that cannot run yet in a delayed deque
//! that only it ever touches. Both live in [`OwnedCommands`], outside the
//! drain's stack frame, so a callback that unwinds loses only its own command.

use crate::command::Command;
use crate::priority::{CommandQueueStatus, QueueClass};
use crate::stats::QueueStats;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happened to a command handed to the processor.
pub(crate) enum CommandResult {
    /// The command ran, or was completed without running.
    Executed,
    /// The command cannot run yet and goes back to the delayed deque.
    Requeue(Command),
}

/// The commands the owning thread holds for one queue.
#[derive(Default)]
pub(crate) struct OwnedCommands {
    /// Taken from the pending FIFO, not handled yet.
    pub(crate) batch: VecDeque<Command>,
    /// Handled at least once, waiting for their turn.
    pub(crate) delayed: VecDeque<Command>,
}

pub(crate) struct CommandQueue {
    class: QueueClass,
    pending: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    pub(crate) fn new(class: QueueClass) -> Self {
        Self {
            class,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn class(&self) -> QueueClass {
        self.class
    }

    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a command. Safe to call from any thread.
    pub(crate) fn push(&self, command: Command) {
        self.lock_pending().push_back(command);
    }

    /// Moves everything pending to the back of `batch`.
    fn take_pending(&self, batch: &mut VecDeque<Command>) {
        batch.append(&mut *self.lock_pending());
    }

    fn has_pending(&self) -> bool {
        !self.lock_pending().is_empty()
    }

    /// Drains the queue, handing every command to `handler`.
    ///
    /// Each round first retries the delayed commands that were parked before
    /// the round started, then runs the batch taken from the pending FIFO.
    /// Rounds repeat while new commands keep arriving, or while a round made
    /// progress that may have unblocked a delayed command.
    ///
    /// If `handler` unwinds, every command it has not been handed yet stays in
    /// `owned` and runs on the next call.
    pub(crate) fn process(
        &self,
        owned: &mut OwnedCommands,
        mut handler: impl FnMut(Command) -> CommandResult,
    ) -> CommandQueueStatus {
        let OwnedCommands { batch, delayed } = owned;
        // Leftovers of an unwound drain are older than anything still pending.
        self.take_pending(batch);
        loop {
            let mut progressed = false;

            for _ in 0..delayed.len() {
                let Some(command) = delayed.pop_front() else {
                    break;
                };
                match handler(command) {
                    CommandResult::Executed => progressed = true,
                    CommandResult::Requeue(command) => delayed.push_back(command),
                }
            }

            while let Some(command) = batch.pop_front() {
                match handler(command) {
                    CommandResult::Executed => progressed = true,
                    CommandResult::Requeue(command) => delayed.push_back(command),
                }
            }

            self.take_pending(batch);
            let retry_delayed = progressed && !delayed.is_empty();
            if batch.is_empty() && !retry_delayed {
                break;
            }
        }

        if delayed.is_empty() && !self.has_pending() {
            CommandQueueStatus::NoCommandsLeft
        } else {
            CommandQueueStatus::HasCommandsLeft
        }
    }
}

/// Both priority levels and the counters that describe them.
///
/// Shared by the manager and every ticket handle, so a handle dropped on any
/// thread can still queue its ticket's destruction.
pub(crate) struct CommandQueues {
    queues: [CommandQueue; QueueClass::COUNT],
    stats: QueueStats,
}

impl CommandQueues {
    pub(crate) fn new() -> Self {
        Self {
            queues: [
                CommandQueue::new(QueueClass::High),
                CommandQueue::new(QueueClass::Regular),
            ],
            stats: QueueStats::default(),
        }
    }

    /// The queues in drain order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &CommandQueue> {
        self.queues.iter()
    }

    pub(crate) fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Appends `command` to the queue of `class`. Safe to call from any thread.
    pub(crate) fn submit(&self, class: QueueClass, command: Command) {
        log::trace!(
            "SpawnableEntitiesManager: queued {} #{} on ticket {} ({:?}).",
            command.kind.name(),
            command.request_id,
            command.ticket,
            class
        );
        self.stats.record_queued();
        self.queues[class.index()].push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::ticket::TicketId;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::{Arc, Mutex};

    fn barrier(request_id: u32, log: &Arc<Mutex<Vec<u32>>>) -> Command {
        let log = Arc::clone(log);
        Command {
            ticket: TicketId {
                index: 0,
                generation: 0,
            },
            request_id,
            kind: CommandKind::Barrier {
                completion: Box::new(move |_: TicketId| log.lock().unwrap().push(request_id)),
            },
        }
    }

    /// Runs barriers strictly in request order, parking the rest.
    fn in_order(cursor: &mut u32) -> impl FnMut(Command) -> CommandResult + '_ {
        move |command| {
            if command.request_id != *cursor {
                return CommandResult::Requeue(command);
            }
            *cursor += 1;
            if let CommandKind::Barrier { completion } = command.kind {
                completion(command.ticket);
            }
            CommandResult::Executed
        }
    }

    fn run(command: Command) -> CommandResult {
        if let CommandKind::Barrier { completion } = command.kind {
            completion(command.ticket);
        }
        CommandResult::Executed
    }

    #[test]
    fn empty_queue_reports_no_commands_left() {
        let queue = CommandQueue::new(QueueClass::Regular);
        let mut owned = OwnedCommands::default();
        let status = queue.process(&mut owned, |_| CommandResult::Executed);
        assert_eq!(status, CommandQueueStatus::NoCommandsLeft);
    }

    #[test]
    fn out_of_order_commands_converge_in_one_call() {
        // --- 1. Setup ---
        let queue = CommandQueue::new(QueueClass::High);
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in [2, 0, 3, 1] {
            queue.push(barrier(id, &log));
        }

        // --- 2. Action ---
        let mut owned = OwnedCommands::default();
        let mut cursor = 0;
        let status = queue.process(&mut owned, in_order(&mut cursor));

        // --- 3. Assertions ---
        assert_eq!(status, CommandQueueStatus::NoCommandsLeft);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
        assert!(owned.delayed.is_empty());
    }

    #[test]
    fn blocked_commands_stay_delayed() {
        let queue = CommandQueue::new(QueueClass::Regular);
        let log = Arc::new(Mutex::new(Vec::new()));
        queue.push(barrier(5, &log));

        let mut owned = OwnedCommands::default();
        let mut cursor = 0;
        let status = queue.process(&mut owned, in_order(&mut cursor));

        assert_eq!(status, CommandQueueStatus::HasCommandsLeft);
        assert_eq!(owned.delayed.len(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn commands_pushed_while_draining_are_processed() {
        let queue = Arc::new(CommandQueue::new(QueueClass::Regular));
        let log = Arc::new(Mutex::new(Vec::new()));
        queue.push(barrier(0, &log));

        let mut owned = OwnedCommands::default();
        let producer = Arc::clone(&queue);
        let mut follow_up = Some(barrier(1, &log));
        let status = queue.process(&mut owned, |command| {
            if let Some(next) = follow_up.take() {
                producer.push(next);
            }
            run(command)
        });

        assert_eq!(status, CommandQueueStatus::NoCommandsLeft);
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn unwinding_handler_keeps_the_rest_of_the_batch() {
        // --- 1. Setup ---
        let queue = CommandQueue::new(QueueClass::High);
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..4 {
            queue.push(barrier(id, &log));
        }
        let mut owned = OwnedCommands::default();

        // --- 2. Action ---
        let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
            queue.process(&mut owned, |command| {
                if command.request_id == 1 {
                    panic!("callback failed");
                }
                run(command)
            })
        }));
        assert!(unwound.is_err());
        assert_eq!(owned.batch.len(), 2);

        queue.push(barrier(4, &log));
        let status = queue.process(&mut owned, run);

        // --- 3. Assertions ---
        assert_eq!(status, CommandQueueStatus::NoCommandsLeft);
        assert_eq!(*log.lock().unwrap(), vec![0, 2, 3, 4]);
        assert!(owned.batch.is_empty());
    }
}
