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

//! Executes commands against ticket bodies and the entity container.
//!
//! The processor only ever runs on the owning thread, with the ticket body
//! checked out of the arena. Callbacks are free to enqueue further requests or
//! create tickets while they run.

use crate::command::CommandKind;
use crate::options::{EntityPreInsertionCallback, EntitySpawnCallback, IndexEntityView};
use crate::ticket::{Ticket, TicketId};
use spawnable_core::{
    AliasTarget, Entity, EntityAliasType, EntityCloner, EntityContainer, EntityId,
    EntityIdRemapper, Spawnable, SpawnableAsset,
};
use std::sync::Arc;

/// What happens to the ticket body after a command ran.
pub(crate) enum TicketFate {
    /// The body goes back into its slot and the next request becomes current.
    Keep,
    /// The ticket was destroyed and its slot must be retired.
    Release,
}

/// The entities one spawn request cloned, with the prototype index of each.
struct SpawnBatch {
    entities: Vec<Entity>,
    indices: Vec<usize>,
}

impl SpawnBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            indices: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, index: usize, entity: Entity) {
        self.entities.push(entity);
        self.indices.push(index);
    }
}

pub(crate) struct CommandProcessor {
    cloner: Arc<dyn EntityCloner>,
    container: Box<dyn EntityContainer>,
}

impl CommandProcessor {
    pub(crate) fn new(cloner: Arc<dyn EntityCloner>, container: Box<dyn EntityContainer>) -> Self {
        Self { cloner, container }
    }

    /// Runs one command. The caller has already checked that the command is
    /// current for the ticket and that its asset is loaded.
    pub(crate) fn execute(&mut self, ticket: &mut Ticket, kind: CommandKind) -> TicketFate {
        let id = ticket.id();
        match kind {
            CommandKind::SpawnAll {
                completion,
                pre_insertion,
            } => self.spawn_all(ticket, pre_insertion, completion),
            CommandKind::SpawnSubset {
                indices,
                reference_previously_spawned,
                completion,
                pre_insertion,
            } => self.spawn_subset(
                ticket,
                &indices,
                reference_previously_spawned,
                pre_insertion,
                completion,
            ),
            CommandKind::DespawnAll { completion } => {
                self.despawn_owned(ticket);
                ticket.entity_id_map.clear();
                ticket.load_all = false;
                if let Some(completion) = completion {
                    completion(id);
                }
            }
            CommandKind::DespawnEntity { entity, completion } => {
                self.despawn_one(ticket, entity);
                if let Some(completion) = completion {
                    completion(id);
                }
            }
            CommandKind::Reload {
                spawnable,
                completion,
            } => {
                Self::reload(ticket, spawnable);
                if let Some(completion) = completion {
                    completion(id, &ticket.entities);
                }
            }
            CommandKind::ListEntities { listener } => listener(id, &ticket.entities),
            CommandKind::ListIndicesAndEntities { listener } => listener(
                id,
                IndexEntityView::new(&ticket.entity_indices, &ticket.entities),
            ),
            CommandKind::ClaimEntities { listener } => {
                let entities = std::mem::take(&mut ticket.entities);
                ticket.entity_indices.clear();
                ticket.entity_id_map.clear();
                ticket.load_all = false;
                log::debug!("Ticket {id}: {} entities claimed.", entities.len());
                listener(id, entities);
            }
            CommandKind::Barrier { completion } => completion(id),
            CommandKind::DestroyTicket => {
                self.despawn_owned(ticket);
                log::debug!("Ticket {id} destroyed.");
                return TicketFate::Release;
            }
        }
        TicketFate::Keep
    }

    fn spawn_all(
        &mut self,
        ticket: &mut Ticket,
        pre_insertion: Option<EntityPreInsertionCallback>,
        completion: Option<EntitySpawnCallback>,
    ) {
        let Some(spawnable) = ticket.spawnable.get() else {
            Self::report_missing_asset(ticket.id(), completion);
            return;
        };

        // Ids only refer within this one batch.
        let mut remapper = EntityIdRemapper::new();
        remapper.seed(spawnable.entities().iter().map(|prototype| prototype.id));

        let mut batch = SpawnBatch::with_capacity(spawnable.len());
        for (index, prototype) in spawnable.entities().iter().enumerate() {
            self.spawn_prototype(ticket.id(), &spawnable, index, prototype, &mut remapper, &mut batch);
        }

        ticket.entity_id_map = remapper;
        ticket.load_all = true;
        self.insert_batch(ticket, batch, pre_insertion, completion);
    }

    fn spawn_subset(
        &mut self,
        ticket: &mut Ticket,
        requested: &[usize],
        reference_previously_spawned: bool,
        pre_insertion: Option<EntityPreInsertionCallback>,
        completion: Option<EntitySpawnCallback>,
    ) {
        let Some(spawnable) = ticket.spawnable.get() else {
            Self::report_missing_asset(ticket.id(), completion);
            return;
        };

        if !reference_previously_spawned {
            ticket.entity_id_map.clear();
        }
        ticket
            .entity_id_map
            .seed(spawnable.entities().iter().map(|prototype| prototype.id));

        let mut batch = SpawnBatch::with_capacity(requested.len());
        for &index in requested {
            let Some(prototype) = spawnable.get(index) else {
                log::warn!(
                    "Ticket {}: index {index} is out of range for a spawnable with {} prototypes, skipping it.",
                    ticket.id(),
                    spawnable.len()
                );
                continue;
            };
            self.spawn_prototype(
                ticket.id(),
                &spawnable,
                index,
                prototype,
                &mut ticket.entity_id_map,
                &mut batch,
            );
        }

        ticket.load_all = false;
        self.insert_batch(ticket, batch, pre_insertion, completion);
    }

    /// Clones the prototype at `index` into `batch`, applying its alias.
    ///
    /// An alias whose target entity does not exist falls back to the plain
    /// prototype.
    fn spawn_prototype(
        &self,
        ticket: TicketId,
        spawnable: &Spawnable,
        index: usize,
        prototype: &Entity,
        remapper: &mut EntityIdRemapper,
        batch: &mut SpawnBatch,
    ) {
        let Some(alias) = spawnable.alias(index) else {
            self.clone_into(ticket, index, prototype, remapper, batch);
            return;
        };
        if alias.alias_type == EntityAliasType::Disable {
            log::trace!("Ticket {ticket}: prototype {index} is disabled by an alias.");
            return;
        }
        let Some(target) = alias.target.as_ref().and_then(AliasTarget::entity) else {
            log::warn!(
                "Ticket {ticket}: {:?} alias of prototype {index} has no target entity, spawning the prototype.",
                alias.alias_type
            );
            self.clone_into(ticket, index, prototype, remapper, batch);
            return;
        };

        match alias.alias_type {
            EntityAliasType::Disable => {}
            EntityAliasType::Replace => {
                // The stand-in keeps the prototype's id so references to it follow.
                let stand_in = Entity {
                    id: prototype.id,
                    ..target
                };
                self.clone_into(ticket, index, &stand_in, remapper, batch);
            }
            EntityAliasType::Additional => {
                self.clone_into(ticket, index, prototype, remapper, batch);
                self.clone_into(ticket, index, &target, remapper, batch);
            }
            EntityAliasType::Merge => {
                let mut merged = prototype.clone();
                merged.parent = merged.parent.or(target.parent);
                merged.references.extend(target.references);
                merged.components.extend(target.components);
                self.clone_into(ticket, index, &merged, remapper, batch);
            }
        }
    }

    fn clone_into(
        &self,
        ticket: TicketId,
        index: usize,
        prototype: &Entity,
        remapper: &mut EntityIdRemapper,
        batch: &mut SpawnBatch,
    ) {
        match self.cloner.clone_entity(prototype, remapper) {
            Some(entity) => batch.push(index, entity),
            None => log::warn!(
                "Ticket {ticket}: failed to clone prototype {index} ('{}'), skipping it.",
                prototype.name
            ),
        }
    }

    /// Registers a cloned batch with the container and hands it to the caller.
    fn insert_batch(
        &mut self,
        ticket: &mut Ticket,
        batch: SpawnBatch,
        pre_insertion: Option<EntityPreInsertionCallback>,
        completion: Option<EntitySpawnCallback>,
    ) {
        let id = ticket.id();
        let SpawnBatch {
            entities: mut batch,
            indices,
        } = batch;
        if let Some(pre_insertion) = pre_insertion {
            pre_insertion(id, &mut batch);
        }

        for entity in &mut batch {
            self.container.add_entity(entity);
        }
        for entity in &mut batch {
            self.container.activate_entity(entity);
        }

        let first = ticket.entities.len();
        log::debug!("Ticket {id}: spawned {} entities.", batch.len());
        ticket.entities.append(&mut batch);
        ticket.entity_indices.extend(indices);

        if let Some(completion) = completion {
            completion(id, &ticket.entities[first..]);
        }
    }

    /// Deactivates, then removes, every entity the ticket owns, newest first.
    fn despawn_owned(&mut self, ticket: &mut Ticket) {
        for entity in ticket.entities.iter_mut().rev() {
            self.container.deactivate_entity(entity);
        }
        for mut entity in ticket.entities.drain(..).rev() {
            self.container.remove_entity(&mut entity);
        }
        ticket.entity_indices.clear();
    }

    fn despawn_one(&mut self, ticket: &mut Ticket, entity_id: EntityId) {
        let Some(position) = ticket.entities.iter().position(|entity| entity.id == entity_id) else {
            log::debug!(
                "Ticket {}: entity {entity_id} is not owned by this ticket.",
                ticket.id()
            );
            return;
        };
        let mut entity = ticket.entities.remove(position);
        ticket.entity_indices.remove(position);
        self.container.deactivate_entity(&mut entity);
        self.container.remove_entity(&mut entity);
        ticket.load_all = false;
    }

    /// Swaps the ticket's spawnable. Entities that are already spawned stay.
    fn reload(ticket: &mut Ticket, spawnable: SpawnableAsset) {
        if ticket.load_all {
            let previous = ticket.spawnable.get().map(|asset| asset.len());
            let next = spawnable.get().map(|asset| asset.len());
            if previous != next {
                log::warn!(
                    "Ticket {}: reloaded spawnable has {:?} prototypes instead of {:?}; existing entities are kept.",
                    ticket.id(),
                    next,
                    previous
                );
            }
        }
        ticket.spawnable = spawnable;
    }

    fn report_missing_asset(ticket: TicketId, completion: Option<EntitySpawnCallback>) {
        log::warn!("Ticket {ticket}: spawnable is no longer available, nothing spawned.");
        if let Some(completion) = completion {
            completion(ticket, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::QueueClass;
    use crate::ticket::TicketShared;
    use spawnable_core::{AssetUUID, DeepCloner, Spawnable};
    use std::sync::Mutex;

    /// Records container calls in order.
    #[derive(Clone, Default)]
    struct RecordingContainer {
        calls: Arc<Mutex<Vec<(&'static str, String)>>>,
    }

    impl RecordingContainer {
        fn record(&self, call: &'static str, entity: &Entity) {
            self.calls.lock().unwrap().push((call, entity.name.clone()));
        }
    }

    impl EntityContainer for RecordingContainer {
        fn add_entity(&mut self, entity: &mut Entity) {
            self.record("add", entity);
        }
        fn activate_entity(&mut self, entity: &mut Entity) {
            self.record("activate", entity);
        }
        fn deactivate_entity(&mut self, entity: &mut Entity) {
            self.record("deactivate", entity);
        }
        fn remove_entity(&mut self, entity: &mut Entity) {
            self.record("remove", entity);
        }
    }

    fn spawnable(names: &[&str]) -> SpawnableAsset {
        let entities = names
            .iter()
            .map(|name| Entity::new(EntityId::generate(), *name))
            .collect();
        SpawnableAsset::ready(AssetUUID::new(), Spawnable::new(entities))
    }

    fn ticket(names: &[&str]) -> Ticket {
        let id = TicketId {
            index: 0,
            generation: 0,
        };
        Ticket::new(
            Arc::new(TicketShared::new(id, QueueClass::Regular)),
            spawnable(names),
        )
    }

    fn processor(container: &RecordingContainer) -> CommandProcessor {
        CommandProcessor::new(Arc::new(DeepCloner), Box::new(container.clone()))
    }

    #[test]
    fn despawn_runs_in_reverse_spawn_order() {
        let container = RecordingContainer::default();
        let mut processor = processor(&container);
        let mut ticket = ticket(&["a", "b"]);

        processor.execute(
            &mut ticket,
            CommandKind::SpawnAll {
                completion: None,
                pre_insertion: None,
            },
        );
        container.calls.lock().unwrap().clear();
        processor.execute(&mut ticket, CommandKind::DespawnAll { completion: None });

        let calls = container.calls.lock().unwrap().clone();
        let expected: Vec<(&str, String)> = vec![
            ("deactivate", "b".into()),
            ("deactivate", "a".into()),
            ("remove", "b".into()),
            ("remove", "a".into()),
        ];
        assert_eq!(calls, expected);
        assert!(ticket.entities.is_empty());
        assert!(ticket.entity_indices.is_empty());
    }

    #[test]
    fn whole_batch_is_added_before_activation() {
        let container = RecordingContainer::default();
        let mut processor = processor(&container);
        let mut ticket = ticket(&["a", "b"]);

        processor.execute(
            &mut ticket,
            CommandKind::SpawnAll {
                completion: None,
                pre_insertion: None,
            },
        );

        let calls: Vec<&str> = container
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| *call)
            .collect();
        assert_eq!(calls, vec!["add", "add", "activate", "activate"]);
        assert!(ticket.load_all);
        assert_eq!(ticket.entity_indices, vec![0, 1]);
    }

    #[test]
    fn destroy_despawns_and_releases() {
        let container = RecordingContainer::default();
        let mut processor = processor(&container);
        let mut ticket = ticket(&["a"]);

        processor.execute(
            &mut ticket,
            CommandKind::SpawnSubset {
                indices: vec![0, 0],
                reference_previously_spawned: true,
                completion: None,
                pre_insertion: None,
            },
        );
        let fate = processor.execute(&mut ticket, CommandKind::DestroyTicket);

        assert!(matches!(fate, TicketFate::Release));
        assert!(ticket.entities.is_empty());
        let removed = container
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(call, _)| *call == "remove")
            .count();
        assert_eq!(removed, 2);
    }

    #[test]
    fn reload_keeps_spawned_entities() {
        let container = RecordingContainer::default();
        let mut processor = processor(&container);
        let mut ticket = ticket(&["a", "b", "c"]);
        let replacement = spawnable(&["x"]);

        processor.execute(
            &mut ticket,
            CommandKind::SpawnAll {
                completion: None,
                pre_insertion: None,
            },
        );
        processor.execute(
            &mut ticket,
            CommandKind::Reload {
                spawnable: replacement.clone(),
                completion: None,
            },
        );

        assert_eq!(ticket.entities.len(), 3);
        assert!(ticket.spawnable.ptr_eq(&replacement));
    }
}
