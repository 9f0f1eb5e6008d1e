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

//! Entity aliases: per-prototype overrides that swap in, add or merge an entity
//! from another spawnable at spawn time.

use crate::entity::Entity;
use crate::spawnable::SpawnableAsset;

/// What an alias does to the prototype it is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityAliasType {
    /// The prototype is not spawned.
    Disable,
    /// The target entity is spawned instead, taking over the prototype's id.
    Replace,
    /// The prototype is spawned, followed by the target entity.
    Additional,
    /// The prototype is spawned with the target's components and references
    /// added to its own.
    Merge,
}

/// An entity of another spawnable.
#[derive(Debug, Clone)]
pub struct AliasTarget {
    /// The spawnable holding the entity. Spawns that hit the alias wait until
    /// it is loaded.
    pub spawnable: SpawnableAsset,
    /// The entity's index in that spawnable.
    pub index: usize,
}

impl AliasTarget {
    /// Returns `true` once the target spawnable can be read.
    pub fn is_ready(&self) -> bool {
        self.spawnable.is_ready()
    }

    /// Returns a copy of the target entity, if the spawnable is loaded and the
    /// index exists.
    pub fn entity(&self) -> Option<Entity> {
        self.spawnable.get()?.get(self.index).cloned()
    }
}

impl PartialEq for AliasTarget {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.spawnable.ptr_eq(&other.spawnable)
    }
}

/// An override for one prototype of a spawnable.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAlias {
    /// The index of the prototype the alias applies to.
    pub source_index: usize,
    /// What happens to the prototype.
    pub alias_type: EntityAliasType,
    /// The entity swapped in, added or merged. `None` only for
    /// [`EntityAliasType::Disable`].
    pub target: Option<AliasTarget>,
}

impl EntityAlias {
    /// Stops the prototype at `source_index` from being spawned.
    pub fn disable(source_index: usize) -> Self {
        Self {
            source_index,
            alias_type: EntityAliasType::Disable,
            target: None,
        }
    }

    /// Creates an alias of `alias_type` pointing at entity `index` of
    /// `spawnable`.
    pub fn new(
        source_index: usize,
        alias_type: EntityAliasType,
        spawnable: SpawnableAsset,
        index: usize,
    ) -> Self {
        Self {
            source_index,
            alias_type,
            target: Some(AliasTarget { spawnable, index }),
        }
    }

    /// Returns `true` if the alias can be applied right now.
    pub fn is_ready(&self) -> bool {
        self.target.as_ref().is_none_or(AliasTarget::is_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetUUID;
    use crate::entity::EntityId;
    use crate::spawnable::Spawnable;

    #[test]
    fn target_entity_is_available_once_loaded() {
        let spawnable = SpawnableAsset::loading(AssetUUID::new());
        let alias = EntityAlias::new(0, EntityAliasType::Replace, spawnable.clone(), 1);
        assert!(!alias.is_ready());
        assert!(alias.target.as_ref().and_then(AliasTarget::entity).is_none());

        spawnable.complete(Spawnable::new(vec![
            Entity::new(EntityId(1), "first"),
            Entity::new(EntityId(2), "second"),
        ]));

        assert!(alias.is_ready());
        let entity = alias.target.as_ref().and_then(AliasTarget::entity);
        assert_eq!(entity.map(|entity| entity.name), Some("second".to_string()));
    }

    #[test]
    fn disabled_alias_needs_no_target() {
        let alias = EntityAlias::disable(3);
        assert!(alias.is_ready());
        assert_eq!(alias.alias_type, EntityAliasType::Disable);
    }
}
