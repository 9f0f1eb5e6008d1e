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

//! The clone service used to turn prototypes into live entities.
//!
//! Cloning a batch of prototypes has to keep references between them intact:
//! a child cloned in the same batch as its parent must point at the parent's
//! clone, not at the prototype. The [`EntityIdRemapper`] is the id table a
//! ticket keeps for its spawn requests, and an [`EntityCloner`] consults it
//! for the new entity's own id and for every reference it rewrites.

use crate::entity::{Entity, EntityId, EntityState};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Maps prototype ids to spawned ids.
///
/// Resolution rules:
/// - A reference resolves to the latest instance of the referenced prototype
///   that has been spawned.
/// - A prototype that was [seeded](Self::seed) but not spawned yet resolves to
///   the id its first instance will receive, so forward references work both
///   inside one request and across requests.
/// - References to prototypes that are unknown to the table are left
///   unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntityIdRemapper {
    ids: HashMap<EntityId, EntityId>,
    unused: HashSet<EntityId>,
}

impl EntityIdRemapper {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-assigns ids for every prototype the table does not know yet.
    pub fn seed(&mut self, prototypes: impl IntoIterator<Item = EntityId>) {
        for prototype in prototypes {
            if let Entry::Vacant(entry) = self.ids.entry(prototype) {
                entry.insert(EntityId::generate());
                self.unused.insert(prototype);
            }
        }
    }

    /// Returns the id the next clone of `prototype` must use and records it as
    /// the latest instance.
    ///
    /// The first clone after seeding takes the pre-assigned id; every later
    /// clone gets a fresh one.
    pub fn assign(&mut self, prototype: EntityId) -> EntityId {
        if self.unused.remove(&prototype) {
            if let Some(id) = self.ids.get(&prototype) {
                return *id;
            }
        }
        let id = EntityId::generate();
        self.ids.insert(prototype, id);
        id
    }

    /// Rewrites a reference to a prototype into a reference to its clone.
    pub fn resolve(&self, reference: EntityId) -> EntityId {
        self.ids.get(&reference).copied().unwrap_or(reference)
    }

    /// Forgets every mapping.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.unused.clear();
    }

    /// Returns the number of prototypes the table maps.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the table maps no prototype.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Duplicates prototypes into new entity instances.
///
/// Implementations are shared between threads and only ever read the
/// prototype, so they need no locking of their own.
pub trait EntityCloner: Send + Sync {
    /// Clones `prototype`, taking the new id and all rewritten references from
    /// `remapper`.
    ///
    /// Returning `None` signals that this one prototype could not be cloned.
    /// The caller skips it and carries on with the rest of the batch.
    fn clone_entity(&self, prototype: &Entity, remapper: &mut EntityIdRemapper) -> Option<Entity>;
}

/// The default clone service: copies every field and rewrites the parent and
/// all references through the remapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepCloner;

impl EntityCloner for DeepCloner {
    fn clone_entity(
        &self,
        prototype: &Entity,
        remapper: &mut EntityIdRemapper,
    ) -> Option<Entity> {
        // The own id is assigned first so that a self reference resolves to
        // the clone itself.
        let id = remapper.assign(prototype.id);
        Some(Entity {
            id,
            name: prototype.name.clone(),
            state: EntityState::Constructed,
            parent: prototype.parent.map(|parent| remapper.resolve(parent)),
            references: prototype
                .references
                .iter()
                .map(|reference| remapper.resolve(*reference))
                .collect(),
            components: prototype.components.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_id_is_used_by_first_clone_only() {
        let mut remapper = EntityIdRemapper::new();
        let prototype = EntityId(3);

        remapper.seed([prototype]);
        let forward = remapper.resolve(prototype);
        let first = remapper.assign(prototype);
        let second = remapper.assign(prototype);

        assert_eq!(forward, first);
        assert_ne!(first, second);
        assert_eq!(remapper.resolve(prototype), second);
    }

    #[test]
    fn seeding_keeps_previously_spawned_instance() {
        let mut remapper = EntityIdRemapper::new();
        let previous = remapper.assign(EntityId(3));

        remapper.seed([EntityId(3)]);
        assert_eq!(remapper.resolve(EntityId(3)), previous);
        assert_ne!(remapper.assign(EntityId(3)), previous);
    }

    #[test]
    fn unknown_references_are_left_unchanged() {
        let remapper = EntityIdRemapper::new();
        assert_eq!(remapper.resolve(EntityId(99)), EntityId(99));
    }

    #[test]
    fn clear_forgets_spawned_and_seeded_ids() {
        let mut remapper = EntityIdRemapper::new();
        remapper.seed([EntityId(1), EntityId(2)]);
        assert_eq!(remapper.len(), 2);

        remapper.clear();
        assert!(remapper.is_empty());
        assert_eq!(remapper.resolve(EntityId(1)), EntityId(1));
    }

    #[test]
    fn deep_cloner_rewrites_parent_and_references() {
        let parent = Entity::new(EntityId(1), "parent");
        let child = Entity::new(EntityId(2), "child")
            .with_parent(EntityId(1))
            .with_reference(EntityId(2))
            .with_component("Tag", vec![1, 2]);

        let mut remapper = EntityIdRemapper::new();
        remapper.seed([parent.id, child.id]);

        let parent_clone = DeepCloner
            .clone_entity(&parent, &mut remapper)
            .expect("clone");
        let child_clone = DeepCloner.clone_entity(&child, &mut remapper).expect("clone");

        assert_ne!(parent_clone.id, parent.id);
        assert_eq!(child_clone.parent, Some(parent_clone.id));
        assert_eq!(child_clone.references, vec![child_clone.id]);
        assert_eq!(child_clone.components, child.components);
        assert_eq!(child_clone.state, EntityState::Constructed);
    }
}
