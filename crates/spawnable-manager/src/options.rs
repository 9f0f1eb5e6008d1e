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

//! Optional arguments and callback types for the manager's requests.
//!
//! Every request takes its own `*OptionalArgs` struct. All of them can carry a
//! [`SpawnablePriority`] that overrides the ticket's queue for that one
//! request; leaving it `None` uses the queue fixed when the ticket was created.

use crate::priority::SpawnablePriority;
use crate::ticket::TicketId;
use spawnable_core::Entity;

/// Receives the entities produced by one spawn request.
pub type EntitySpawnCallback = Box<dyn FnOnce(TicketId, &[Entity]) + Send>;
/// Sees a freshly cloned batch before any of it is registered with the container.
pub type EntityPreInsertionCallback = Box<dyn FnOnce(TicketId, &mut [Entity]) + Send>;
/// Signals that a despawn request has completed.
pub type EntityDespawnCallback = Box<dyn FnOnce(TicketId) + Send>;
/// Receives the ticket's entities after its spawnable was swapped.
pub type ReloadSpawnableCallback = Box<dyn FnOnce(TicketId, &[Entity]) + Send>;
/// Receives the ticket's entities.
pub type ListEntitiesCallback = Box<dyn FnOnce(TicketId, &[Entity]) + Send>;
/// Receives the ticket's entities together with their prototype indices.
pub type ListIndicesEntitiesCallback = Box<dyn for<'a> FnOnce(TicketId, IndexEntityView<'a>) + Send>;
/// Receives ownership of the ticket's entities.
pub type ClaimEntitiesCallback = Box<dyn FnOnce(TicketId, Vec<Entity>) + Send>;
/// Signals that every earlier request on the ticket has completed.
pub type BarrierCallback = Box<dyn FnOnce(TicketId) + Send>;

/// A read-only view pairing each entity with the prototype index it came from.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntityView<'a> {
    indices: &'a [usize],
    entities: &'a [Entity],
}

impl<'a> IndexEntityView<'a> {
    pub(crate) fn new(indices: &'a [usize], entities: &'a [Entity]) -> Self {
        Self { indices, entities }
    }

    /// An empty view, handed out when the ticket no longer exists.
    pub(crate) fn empty() -> Self {
        Self {
            indices: &[],
            entities: &[],
        }
    }

    /// Iterates over `(prototype index, entity)` pairs in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Entity)> + 'a {
        let (indices, entities) = (self.indices, self.entities);
        indices.iter().copied().zip(entities.iter())
    }

    /// Returns the number of entities in the view.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the view holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Optional arguments for `spawn_all_entities`.
#[derive(Default)]
pub struct SpawnAllEntitiesOptionalArgs {
    /// Called with the spawned entities once the request completes.
    pub completion_callback: Option<EntitySpawnCallback>,
    /// Called with the cloned batch before it is registered.
    pub pre_insertion_callback: Option<EntityPreInsertionCallback>,
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `spawn_entities`.
#[derive(Default)]
pub struct SpawnEntitiesOptionalArgs {
    /// Called with the spawned entities once the request completes.
    pub completion_callback: Option<EntitySpawnCallback>,
    /// Called with the cloned batch before it is registered.
    pub pre_insertion_callback: Option<EntityPreInsertionCallback>,
    /// Whether references may resolve to entities spawned by earlier requests
    /// on the same ticket. `None` uses the manager's configured default.
    pub reference_previously_spawned_entities: Option<bool>,
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `despawn_all_entities`.
#[derive(Default)]
pub struct DespawnAllEntitiesOptionalArgs {
    /// Called once every entity of the ticket has been removed.
    pub completion_callback: Option<EntityDespawnCallback>,
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `despawn_entity`.
#[derive(Default)]
pub struct DespawnEntityOptionalArgs {
    /// Called once the entity has been removed.
    pub completion_callback: Option<EntityDespawnCallback>,
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `reload_spawnable`.
#[derive(Default)]
pub struct ReloadSpawnableOptionalArgs {
    /// Called with the ticket's entities after the swap.
    pub completion_callback: Option<ReloadSpawnableCallback>,
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `list_entities`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListEntitiesOptionalArgs {
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `claim_entities`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaimEntitiesOptionalArgs {
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `barrier`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BarrierOptionalArgs {
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}

/// Optional arguments for `destroy_ticket`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DestroyTicketOptionalArgs {
    /// Overrides the ticket's queue for this request.
    pub priority: Option<SpawnablePriority>,
}
