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

//! The spawnable template asset: an ordered list of entity prototypes.

use crate::alias::EntityAlias;
use crate::asset::{Asset, AssetRef};
use crate::entity::Entity;
use crate::error::SpawnableError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A reference to a spawnable that may still be loading.
pub type SpawnableAsset = AssetRef<Spawnable>;

/// An ordered, indexable list of entity prototypes.
///
/// Prototype positions are stable: subset spawns address prototypes by their
/// index in this list, and the index of every spawned instance is recorded so
/// callers can tell which prototype it came from.
///
/// Aliases point into other loaded spawnables, so they are attached at
/// runtime and never written to a template file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spawnable {
    /// The prototypes, in spawn order.
    pub entities: Vec<Entity>,
    /// At most one alias per prototype, sorted by source index.
    #[serde(skip)]
    aliases: Vec<EntityAlias>,
}

impl Asset for Spawnable {}

impl Spawnable {
    /// Creates a spawnable from a list of prototypes.
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            aliases: Vec::new(),
        }
    }

    /// Registers an alias for one prototype.
    ///
    /// Returns `false`, leaving the spawnable unchanged, if the source index is
    /// out of range or the prototype already has an alias.
    pub fn add_alias(&mut self, alias: EntityAlias) -> bool {
        if alias.source_index >= self.entities.len() {
            log::warn!(
                "Spawnable: alias source {} is out of range for {} prototypes.",
                alias.source_index,
                self.entities.len()
            );
            return false;
        }
        match self
            .aliases
            .binary_search_by_key(&alias.source_index, |existing| existing.source_index)
        {
            Ok(_) => {
                log::warn!(
                    "Spawnable: prototype {} already has an alias.",
                    alias.source_index
                );
                false
            }
            Err(position) => {
                self.aliases.insert(position, alias);
                true
            }
        }
    }

    /// Registers an alias, builder style. Rejected aliases are dropped.
    pub fn with_alias(mut self, alias: EntityAlias) -> Self {
        self.add_alias(alias);
        self
    }

    /// Returns every alias, sorted by source index.
    pub fn aliases(&self) -> &[EntityAlias] {
        &self.aliases
    }

    /// Returns the alias registered for the prototype at `index`.
    pub fn alias(&self, index: usize) -> Option<&EntityAlias> {
        self.aliases
            .binary_search_by_key(&index, |alias| alias.source_index)
            .ok()
            .map(|position| &self.aliases[position])
    }

    /// Returns `true` if every alias target is loaded.
    pub fn aliases_ready(&self) -> bool {
        self.aliases.iter().all(EntityAlias::is_ready)
    }

    /// Returns all prototypes in order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns the prototype at `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Returns the number of prototypes.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the spawnable holds no prototypes.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns a rough measure of how expensive the template is to spawn.
    ///
    /// This is the prototype count. It is compared against a threshold to
    /// decide which queue a ticket's requests go to.
    pub fn estimated_size(&self) -> usize {
        self.entities.len()
    }

    /// Parses a spawnable from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, SpawnableError> {
        Ok(ron::de::from_str(text)?)
    }

    /// Writes the spawnable out as human readable RON.
    pub fn to_ron_string(&self) -> Result<String, SpawnableError> {
        let pretty_config = ron::ser::PrettyConfig::default();
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    /// Reads and parses a RON spawnable file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpawnableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SpawnableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }
}
