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

//! The closed set of commands that travel through the queues.

use crate::options::{
    BarrierCallback, ClaimEntitiesCallback, EntityDespawnCallback, EntityPreInsertionCallback,
    EntitySpawnCallback, IndexEntityView, ListEntitiesCallback, ListIndicesEntitiesCallback,
    ReloadSpawnableCallback,
};
use crate::ticket::TicketId;
use spawnable_core::{EntityId, SpawnableAsset};

/// A single queued request against a ticket.
pub(crate) struct Command {
    pub(crate) ticket: TicketId,
    /// The position of this command in its ticket's order.
    pub(crate) request_id: u32,
    pub(crate) kind: CommandKind,
}

/// The payload of a command, one variant per request kind.
pub(crate) enum CommandKind {
    SpawnAll {
        completion: Option<EntitySpawnCallback>,
        pre_insertion: Option<EntityPreInsertionCallback>,
    },
    SpawnSubset {
        indices: Vec<usize>,
        reference_previously_spawned: bool,
        completion: Option<EntitySpawnCallback>,
        pre_insertion: Option<EntityPreInsertionCallback>,
    },
    DespawnAll {
        completion: Option<EntityDespawnCallback>,
    },
    DespawnEntity {
        entity: EntityId,
        completion: Option<EntityDespawnCallback>,
    },
    Reload {
        spawnable: SpawnableAsset,
        completion: Option<ReloadSpawnableCallback>,
    },
    ListEntities {
        listener: ListEntitiesCallback,
    },
    ListIndicesAndEntities {
        listener: ListIndicesEntitiesCallback,
    },
    ClaimEntities {
        listener: ClaimEntitiesCallback,
    },
    Barrier {
        completion: BarrierCallback,
    },
    DestroyTicket,
}

impl CommandKind {
    /// A short name for logs.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            CommandKind::SpawnAll { .. } => "SpawnAll",
            CommandKind::SpawnSubset { .. } => "SpawnSubset",
            CommandKind::DespawnAll { .. } => "DespawnAll",
            CommandKind::DespawnEntity { .. } => "DespawnEntity",
            CommandKind::Reload { .. } => "Reload",
            CommandKind::ListEntities { .. } => "ListEntities",
            CommandKind::ListIndicesAndEntities { .. } => "ListIndicesAndEntities",
            CommandKind::ClaimEntities { .. } => "ClaimEntities",
            CommandKind::Barrier { .. } => "Barrier",
            CommandKind::DestroyTicket => "DestroyTicket",
        }
    }

    /// Returns `true` if every asset this command reads is loaded.
    ///
    /// Spawns read the ticket's spawnable and the targets of its aliases; a
    /// reload only needs the new spawnable itself.
    pub(crate) fn assets_ready(&self, ticket_spawnable: &SpawnableAsset) -> bool {
        match self {
            CommandKind::SpawnAll { .. } | CommandKind::SpawnSubset { .. } => ticket_spawnable
                .get()
                .is_some_and(|spawnable| spawnable.aliases_ready()),
            CommandKind::Reload { spawnable, .. } => spawnable.is_ready(),
            _ => true,
        }
    }

    /// Completes the command without running it, handing every callback an
    /// empty result.
    pub(crate) fn abandon(self, ticket: TicketId) {
        match self {
            CommandKind::SpawnAll { completion, .. } | CommandKind::SpawnSubset { completion, .. } => {
                if let Some(completion) = completion {
                    completion(ticket, &[]);
                }
            }
            CommandKind::DespawnAll { completion } | CommandKind::DespawnEntity { completion, .. } => {
                if let Some(completion) = completion {
                    completion(ticket);
                }
            }
            CommandKind::Reload { completion, .. } => {
                if let Some(completion) = completion {
                    completion(ticket, &[]);
                }
            }
            CommandKind::ListEntities { listener } => listener(ticket, &[]),
            CommandKind::ListIndicesAndEntities { listener } => {
                listener(ticket, IndexEntityView::empty())
            }
            CommandKind::ClaimEntities { listener } => listener(ticket, Vec::new()),
            CommandKind::Barrier { completion } => completion(ticket),
            CommandKind::DestroyTicket => {}
        }
    }
}
