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

//! Defines the entity types shared by spawnable templates and spawned instances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for an entity.
///
/// Prototype ids stored inside a spawnable are only meaningful within that
/// template. Every spawned instance receives a fresh id from
/// [`EntityId::generate`], and references between prototypes are rewritten to
/// those fresh ids during cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The id that never refers to a live entity.
    pub const INVALID: Self = Self(0);

    /// Hands out a new, process-unique entity id.
    pub fn generate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns `true` unless this is [`EntityId::INVALID`].
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// The lifecycle state of an entity with respect to an entity container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityState {
    /// Freshly built or cloned, not yet known to any container.
    #[default]
    Constructed,
    /// Registered with a container but not running.
    Inactive,
    /// Registered and running.
    Active,
}

/// Opaque component payload carried by an entity.
///
/// The spawn pipeline never looks inside `data`; it is copied verbatim when a
/// prototype is cloned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentData {
    /// The full type name of the component.
    pub component_type: String,
    /// The component data in whatever encoding its owner chose.
    pub data: Vec<u8>,
}

/// An entity, either as a prototype inside a spawnable or as a spawned instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The id of this entity.
    pub id: EntityId,
    /// A human readable name, mostly for diagnostics.
    #[serde(default)]
    pub name: String,
    /// Where the entity is in its container lifecycle.
    #[serde(default, skip_serializing)]
    pub state: EntityState,
    /// The parent in the transform hierarchy, if any.
    #[serde(default)]
    pub parent: Option<EntityId>,
    /// Other entities this one points at (targets, owners, sockets...).
    #[serde(default)]
    pub references: Vec<EntityId>,
    /// The component payloads.
    #[serde(default)]
    pub components: Vec<ComponentData>,
}

impl Entity {
    /// Creates an empty entity with the given id and name.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: EntityState::Constructed,
            parent: None,
            references: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Sets the parent, builder style.
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a reference to another entity, builder style.
    pub fn with_reference(mut self, target: EntityId) -> Self {
        self.references.push(target);
        self
    }

    /// Adds a component payload, builder style.
    pub fn with_component(mut self, component_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.components.push(ComponentData {
            component_type: component_type.into(),
            data,
        });
        self
    }

    /// Returns `true` if the entity is currently running in a container.
    pub fn is_active(&self) -> bool {
        self.state == EntityState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_valid() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(b.is_valid());
        assert!(!EntityId::INVALID.is_valid());
    }

    #[test]
    fn builder_collects_parent_references_and_components() {
        let entity = Entity::new(EntityId(7), "turret")
            .with_parent(EntityId(1))
            .with_reference(EntityId(2))
            .with_component("Health", vec![100]);

        assert_eq!(entity.parent, Some(EntityId(1)));
        assert_eq!(entity.references, vec![EntityId(2)]);
        assert_eq!(entity.components[0].component_type, "Health");
        assert_eq!(entity.state, EntityState::Constructed);
        assert!(!entity.is_active());
    }
}
