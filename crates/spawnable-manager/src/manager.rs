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

//! The thread-safe façade in front of the command queues.

use crate::command::{Command, CommandKind};
use crate::config::SpawnableEntitiesConfig;
use crate::options::{
    BarrierOptionalArgs, ClaimEntitiesOptionalArgs, DespawnAllEntitiesOptionalArgs,
    DespawnEntityOptionalArgs, DestroyTicketOptionalArgs, IndexEntityView,
    ListEntitiesOptionalArgs, ReloadSpawnableOptionalArgs, SpawnAllEntitiesOptionalArgs,
    SpawnEntitiesOptionalArgs,
};
use crate::priority::{CommandQueuePriority, CommandQueueStatus, QueueClass, SpawnablePriority};
use crate::processor::{CommandProcessor, TicketFate};
use crate::queue::{CommandQueues, CommandResult, OwnedCommands};
use crate::stats::QueueStatsSnapshot;
use crate::ticket::{Checkout, EntitySpawnTicket, Ticket, TicketArena, TicketId, TicketShared};
use spawnable_core::{DeepCloner, Entity, EntityCloner, EntityContainer, EntityId, SpawnableAsset};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, TryLockError};
use std::thread::{self, ThreadId};

/// State that only the draining thread touches.
struct OwnerState {
    processor: CommandProcessor,
    owned: [OwnedCommands; QueueClass::COUNT],
}

/// Turns spawn, despawn and query requests from any thread into entity
/// mutations on a single owning thread.
///
/// Requests are queued and never block on completion; results arrive through
/// callbacks, which run on the thread that calls
/// [`process_queue`](Self::process_queue). Requests made against the same
/// ticket always complete in the order they were made, even when they land in
/// different queues.
///
/// A callback that panics takes only its own request down: the panic reaches
/// the caller of `process_queue`, and the next call carries on with the
/// remaining requests.
///
/// # Examples
///
/// ```
/// use spawnable_core::{AssetUUID, Entity, EntityId, GameEntityContext, Spawnable, SpawnableAsset};
/// use spawnable_manager::{
///     CommandQueuePriority, CommandQueueStatus, SpawnAllEntitiesOptionalArgs,
///     SpawnableEntitiesConfig, SpawnableEntitiesManager,
/// };
///
/// let context = GameEntityContext::new();
/// let manager = SpawnableEntitiesManager::with_default_cloner(
///     SpawnableEntitiesConfig::default(),
///     Box::new(context.clone()),
/// );
///
/// let template = Spawnable::new(vec![Entity::new(EntityId::generate(), "crate")]);
/// let ticket = manager.create_ticket(SpawnableAsset::ready(AssetUUID::new(), template));
/// manager.spawn_all_entities(&ticket, SpawnAllEntitiesOptionalArgs::default());
///
/// assert_eq!(manager.process_queue(CommandQueuePriority::ALL), CommandQueueStatus::NoCommandsLeft);
/// assert_eq!(context.len(), 1);
/// ```
pub struct SpawnableEntitiesManager {
    config: SpawnableEntitiesConfig,
    queues: Arc<CommandQueues>,
    tickets: Mutex<TicketArena>,
    owner: Mutex<OwnerState>,
    owner_thread: OnceLock<ThreadId>,
}

impl SpawnableEntitiesManager {
    /// Creates a manager that clones prototypes with `cloner` and registers
    /// spawned entities with `container`.
    pub fn new(
        config: SpawnableEntitiesConfig,
        cloner: Arc<dyn EntityCloner>,
        container: Box<dyn EntityContainer>,
    ) -> Self {
        Self {
            config,
            queues: Arc::new(CommandQueues::new()),
            tickets: Mutex::new(TicketArena::new()),
            owner: Mutex::new(OwnerState {
                processor: CommandProcessor::new(cloner, container),
                owned: [OwnedCommands::default(), OwnedCommands::default()],
            }),
            owner_thread: OnceLock::new(),
        }
    }

    /// Creates a manager that uses [`DeepCloner`] to clone prototypes.
    pub fn with_default_cloner(
        config: SpawnableEntitiesConfig,
        container: Box<dyn EntityContainer>,
    ) -> Self {
        Self::new(config, Arc::new(DeepCloner), container)
    }

    /// Returns the configuration the manager was created with.
    pub fn config(&self) -> &SpawnableEntitiesConfig {
        &self.config
    }

    /// Returns a snapshot of the queue counters.
    pub fn stats(&self) -> QueueStatsSnapshot {
        self.queues.stats().snapshot()
    }

    /// Returns the number of tickets whose destroy request has not run yet.
    pub fn live_ticket_count(&self) -> usize {
        self.lock_tickets().live_count()
    }

    /// Creates a ticket bound to `spawnable`.
    ///
    /// The ticket's queue is decided here, once: a spawnable that is already
    /// loaded and small enough goes to the high priority queue, anything else
    /// to the regular one.
    pub fn create_ticket(&self, spawnable: SpawnableAsset) -> EntitySpawnTicket {
        let queue_class = self.classify(&spawnable);
        let shared = self.lock_tickets().insert(|id| {
            Ticket::new(Arc::new(TicketShared::new(id, queue_class)), spawnable)
        });
        log::debug!(
            "SpawnableEntitiesManager: created ticket {} in the {:?} queue.",
            shared.id,
            queue_class
        );
        EntitySpawnTicket::new(shared, Arc::downgrade(&self.queues))
    }

    /// Spawns every prototype of the ticket's spawnable.
    pub fn spawn_all_entities(
        &self,
        ticket: &EntitySpawnTicket,
        optional_args: SpawnAllEntitiesOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::SpawnAll {
                completion: optional_args.completion_callback,
                pre_insertion: optional_args.pre_insertion_callback,
            },
        );
    }

    /// Spawns the prototypes at `entity_indices`, in that order. An index may
    /// appear more than once; indices out of range are skipped.
    pub fn spawn_entities(
        &self,
        ticket: &EntitySpawnTicket,
        entity_indices: Vec<usize>,
        optional_args: SpawnEntitiesOptionalArgs,
    ) {
        let reference_previously_spawned = optional_args
            .reference_previously_spawned_entities
            .unwrap_or(self.config.reference_previously_spawned_by_default);
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::SpawnSubset {
                indices: entity_indices,
                reference_previously_spawned,
                completion: optional_args.completion_callback,
                pre_insertion: optional_args.pre_insertion_callback,
            },
        );
    }

    /// Despawns every entity the ticket owns.
    pub fn despawn_all_entities(
        &self,
        ticket: &EntitySpawnTicket,
        optional_args: DespawnAllEntitiesOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::DespawnAll {
                completion: optional_args.completion_callback,
            },
        );
    }

    /// Despawns a single entity owned by the ticket.
    pub fn despawn_entity(
        &self,
        ticket: &EntitySpawnTicket,
        entity: EntityId,
        optional_args: DespawnEntityOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::DespawnEntity {
                entity,
                completion: optional_args.completion_callback,
            },
        );
    }

    /// Binds the ticket to another spawnable. Entities that are already
    /// spawned are left as they are.
    pub fn reload_spawnable(
        &self,
        ticket: &EntitySpawnTicket,
        spawnable: SpawnableAsset,
        optional_args: ReloadSpawnableOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::Reload {
                spawnable,
                completion: optional_args.completion_callback,
            },
        );
    }

    /// Calls `listener` with the ticket's entities.
    pub fn list_entities(
        &self,
        ticket: &EntitySpawnTicket,
        listener: impl FnOnce(TicketId, &[Entity]) + Send + 'static,
        optional_args: ListEntitiesOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::ListEntities {
                listener: Box::new(listener),
            },
        );
    }

    /// Calls `listener` with the ticket's entities and the prototype index
    /// each was spawned from.
    pub fn list_indices_and_entities(
        &self,
        ticket: &EntitySpawnTicket,
        listener: impl for<'a> FnOnce(TicketId, IndexEntityView<'a>) + Send + 'static,
        optional_args: ListEntitiesOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::ListIndicesAndEntities {
                listener: Box::new(listener),
            },
        );
    }

    /// Hands the ticket's entities over to `listener`. They stay registered
    /// with the container but the ticket no longer tracks or despawns them.
    pub fn claim_entities(
        &self,
        ticket: &EntitySpawnTicket,
        listener: impl FnOnce(TicketId, Vec<Entity>) + Send + 'static,
        optional_args: ClaimEntitiesOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::ClaimEntities {
                listener: Box::new(listener),
            },
        );
    }

    /// Calls `completion` once every earlier request on the ticket is done.
    pub fn barrier(
        &self,
        ticket: &EntitySpawnTicket,
        completion: impl FnOnce(TicketId) + Send + 'static,
        optional_args: BarrierOptionalArgs,
    ) {
        self.enqueue(
            ticket,
            optional_args.priority,
            CommandKind::Barrier {
                completion: Box::new(completion),
            },
        );
    }

    /// Destroys the ticket after all of its earlier requests, despawning any
    /// entities it still owns.
    ///
    /// Earlier requests that are waiting for an asset are given up on and
    /// complete with empty results. Requests made after this call are
    /// dropped the same way.
    pub fn destroy_ticket(&self, ticket: &EntitySpawnTicket, optional_args: DestroyTicketOptionalArgs) {
        if !ticket.shared().request_destroy() {
            log::warn!(
                "SpawnableEntitiesManager: ticket {} is already being destroyed.",
                ticket.id()
            );
            return;
        }
        self.enqueue(ticket, optional_args.priority, CommandKind::DestroyTicket);
    }

    /// Drains the selected queues, high priority first.
    ///
    /// Must be called from one thread only, the thread that owns the entity
    /// container. Returns [`CommandQueueStatus::HasCommandsLeft`] if any
    /// command in the selected queues had to be deferred.
    pub fn process_queue(&self, priority: CommandQueuePriority) -> CommandQueueStatus {
        self.check_owner_thread();
        let mut guard = match self.owner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::error!(
                    "SpawnableEntitiesManager: process_queue called while the queue is already being processed."
                );
                return CommandQueueStatus::HasCommandsLeft;
            }
        };
        let owner = &mut *guard;

        let mut status = CommandQueueStatus::NoCommandsLeft;
        for queue in self.queues.iter() {
            let class = queue.class();
            if !priority.contains(class) {
                continue;
            }
            let processor = &mut owner.processor;
            let owned = &mut owner.owned[class.index()];
            let queue_status = queue.process(owned, |command| self.handle(processor, command));
            if queue_status == CommandQueueStatus::HasCommandsLeft {
                status = CommandQueueStatus::HasCommandsLeft;
            }
        }
        status
    }

    fn handle(&self, processor: &mut CommandProcessor, command: Command) -> CommandResult {
        let checkout = self
            .lock_tickets()
            .checkout(command.ticket, command.request_id);
        let mut ticket = match checkout {
            Checkout::Ready(ticket) => ticket,
            Checkout::NotYet | Checkout::InFlight => return self.defer(command),
            Checkout::Invalid => {
                log::warn!(
                    "SpawnableEntitiesManager: dropping {} for destroyed ticket {}.",
                    command.kind.name(),
                    command.ticket
                );
                self.queues.stats().record_discarded();
                command.kind.abandon(command.ticket);
                return CommandResult::Executed;
            }
        };

        if !command.kind.assets_ready(&ticket.spawnable) {
            if !ticket.shared.is_destroy_requested() {
                self.lock_tickets().checkin(ticket);
                return self.defer(command);
            }
            match ticket.spawnable.failure() {
                Some(reason) => log::debug!(
                    "SpawnableEntitiesManager: cancelling {} on ticket {}, its asset failed to load: {reason}",
                    command.kind.name(),
                    command.ticket
                ),
                None => log::debug!(
                    "SpawnableEntitiesManager: cancelling {} on ticket {}, its assets never loaded.",
                    command.kind.name(),
                    command.ticket
                ),
            }
            ticket.advance_request();
            self.lock_tickets().checkin(ticket);
            self.queues.stats().record_discarded();
            command.kind.abandon(command.ticket);
            return CommandResult::Executed;
        }

        let name = command.kind.name();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.execute(&mut ticket, command.kind)
        }));
        let fate = match outcome {
            Ok(fate) => fate,
            Err(payload) => {
                // The command is spent; the ticket moves on to its next request.
                log::error!(
                    "SpawnableEntitiesManager: {name} on ticket {} panicked.",
                    command.ticket
                );
                ticket.advance_request();
                self.lock_tickets().checkin(ticket);
                self.queues.stats().record_executed();
                panic::resume_unwind(payload);
            }
        };
        match fate {
            TicketFate::Keep => {
                ticket.advance_request();
                self.lock_tickets().checkin(ticket);
            }
            TicketFate::Release => self.lock_tickets().release(command.ticket),
        }
        self.queues.stats().record_executed();
        CommandResult::Executed
    }

    fn defer(&self, command: Command) -> CommandResult {
        log::trace!(
            "SpawnableEntitiesManager: deferring {} #{} on ticket {}.",
            command.kind.name(),
            command.request_id,
            command.ticket
        );
        self.queues.stats().record_requeued();
        CommandResult::Requeue(command)
    }

    fn enqueue(
        &self,
        ticket: &EntitySpawnTicket,
        priority: Option<SpawnablePriority>,
        kind: CommandKind,
    ) {
        let class = self.route(ticket, priority);
        let command = Command {
            ticket: ticket.id(),
            request_id: ticket.shared().next_request_id(),
            kind,
        };
        self.queues.submit(class, command);
    }

    fn classify(&self, spawnable: &SpawnableAsset) -> QueueClass {
        match spawnable.get() {
            Some(asset) if asset.estimated_size() <= self.config.small_spawnable_threshold => {
                QueueClass::High
            }
            _ => QueueClass::Regular,
        }
    }

    fn route(&self, ticket: &EntitySpawnTicket, priority: Option<SpawnablePriority>) -> QueueClass {
        match priority {
            Some(priority) if priority.0 <= self.config.high_priority_threshold => QueueClass::High,
            Some(_) => QueueClass::Regular,
            None => ticket.queue_class(),
        }
    }

    fn check_owner_thread(&self) {
        let current = thread::current().id();
        let owner = *self.owner_thread.get_or_init(|| current);
        debug_assert_eq!(
            owner, current,
            "process_queue must always be called from the same thread"
        );
    }

    fn lock_tickets(&self) -> MutexGuard<'_, TicketArena> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
