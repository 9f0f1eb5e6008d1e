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

//! The entity container service that spawned entities are registered with.

use crate::entity::{Entity, EntityId, EntityState};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// The world-side service that receives spawned entities.
///
/// Only the owning thread calls into a container, so implementations take
/// `&mut self` and need no internal locking for the spawn pipeline's sake.
/// Each call also updates `entity.state` to match.
pub trait EntityContainer: Send {
    /// Registers a constructed entity. It stays inactive until activated.
    fn add_entity(&mut self, entity: &mut Entity);

    /// Starts a registered entity.
    fn activate_entity(&mut self, entity: &mut Entity);

    /// Stops a running entity without unregistering it.
    fn deactivate_entity(&mut self, entity: &mut Entity);

    /// Unregisters an entity. The entity object itself is dropped by its owner.
    fn remove_entity(&mut self, entity: &mut Entity);
}

/// What a [`GameEntityContext`] remembers about a registered entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// The entity's name at registration time.
    pub name: String,
    /// The entity's current state.
    pub state: EntityState,
    /// The entity's parent at registration time.
    pub parent: Option<EntityId>,
}

/// An in-memory entity container.
///
/// Clones share the same registry, so one clone can be handed to the spawn
/// manager while another is kept around to inspect what has been spawned.
#[derive(Debug, Clone, Default)]
pub struct GameEntityContext {
    records: Arc<RwLock<HashMap<EntityId, EntityRecord>>>,
}

impl GameEntityContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered entities.
    pub fn len(&self) -> usize {
        self.read(|records| records.len())
    }

    /// Returns `true` if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: EntityId) -> bool {
        self.read(|records| records.contains_key(&id))
    }

    /// Returns `true` if `id` is registered and active.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.record(id)
            .is_some_and(|record| record.state == EntityState::Active)
    }

    /// Returns a copy of the record for `id`.
    pub fn record(&self, id: EntityId) -> Option<EntityRecord> {
        self.read(|records| records.get(&id).cloned())
    }

    /// Returns the number of active entities.
    pub fn active_count(&self) -> usize {
        self.read(|records| {
            records
                .values()
                .filter(|record| record.state == EntityState::Active)
                .count()
        })
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<EntityId, EntityRecord>) -> R) -> R {
        f(&self.records.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<EntityId, EntityRecord>) -> R) -> R {
        f(&mut self.records.write().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_state(&self, entity: &mut Entity, state: EntityState) {
        let found = self.write(|records| match records.get_mut(&entity.id) {
            Some(record) => {
                record.state = state;
                true
            }
            None => false,
        });
        if found {
            entity.state = state;
        } else {
            log::warn!(
                "GameEntityContext: entity {} ('{}') is not registered.",
                entity.id,
                entity.name
            );
        }
    }
}

impl EntityContainer for GameEntityContext {
    fn add_entity(&mut self, entity: &mut Entity) {
        entity.state = EntityState::Inactive;
        let record = EntityRecord {
            name: entity.name.clone(),
            state: entity.state,
            parent: entity.parent,
        };
        if self.write(|records| records.insert(entity.id, record)).is_some() {
            log::warn!("GameEntityContext: entity {} was registered twice.", entity.id);
        }
    }

    fn activate_entity(&mut self, entity: &mut Entity) {
        self.set_state(entity, EntityState::Active);
    }

    fn deactivate_entity(&mut self, entity: &mut Entity) {
        self.set_state(entity, EntityState::Inactive);
    }

    fn remove_entity(&mut self, entity: &mut Entity) {
        if self.write(|records| records.remove(&entity.id)).is_none() {
            log::warn!("GameEntityContext: removing unknown entity {}.", entity.id);
        }
        entity.state = EntityState::Constructed;
    }
}
