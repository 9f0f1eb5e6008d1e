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

//! # Spawnable Core
//!
//! Foundational crate containing the entity types, asset primitives and the
//! collaborator contracts consumed by the spawnable entities manager.
//!
//! Nothing in this crate knows about queues or tickets. It only describes what
//! an entity is, what a spawnable template is, how a prototype gets cloned and
//! where spawned entities end up.

#![warn(missing_docs)]

pub mod alias;
pub mod asset;
pub mod cloner;
pub mod container;
pub mod entity;
pub mod error;
pub mod spawnable;

pub use alias::{AliasTarget, EntityAlias, EntityAliasType};
pub use asset::{Asset, AssetHandle, AssetRef, AssetStatus, AssetUUID};
pub use cloner::{DeepCloner, EntityCloner, EntityIdRemapper};
pub use container::{EntityContainer, EntityRecord, GameEntityContext};
pub use entity::{ComponentData, Entity, EntityId, EntityState};
pub use error::SpawnableError;
pub use spawnable::{Spawnable, SpawnableAsset};
