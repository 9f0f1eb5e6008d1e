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

//! # Spawnable Manager
//!
//! A thread-safe, priority-ordered command queue that turns spawn, despawn and
//! query requests made from any thread into entity mutations performed on a
//! single owning thread.
//!
//! Callers create an [`EntitySpawnTicket`] for a spawnable, make requests
//! against it, and the owning thread calls
//! [`SpawnableEntitiesManager::process_queue`] once per tick to execute them.

#![warn(missing_docs)]

mod command;
pub mod config;
mod manager;
pub mod options;
pub mod priority;
mod processor;
mod queue;
pub mod stats;
pub mod ticket;

pub use config::{ConfigError, SpawnableEntitiesConfig};
pub use manager::SpawnableEntitiesManager;
pub use options::{
    BarrierOptionalArgs, ClaimEntitiesOptionalArgs, DespawnAllEntitiesOptionalArgs,
    DespawnEntityOptionalArgs, DestroyTicketOptionalArgs, IndexEntityView,
    ListEntitiesOptionalArgs, ReloadSpawnableOptionalArgs, SpawnAllEntitiesOptionalArgs,
    SpawnEntitiesOptionalArgs,
};
pub use priority::{CommandQueuePriority, CommandQueueStatus, QueueClass, SpawnablePriority};
pub use stats::QueueStatsSnapshot;
pub use ticket::{EntitySpawnTicket, TicketId};
