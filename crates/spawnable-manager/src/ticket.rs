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

//! Spawn tickets: the caller-held handle and the owning-thread state behind it.
//!
//! A ticket is split in two. The [`EntitySpawnTicket`] handle is cheap to clone
//! and safe to use from any thread; it only hands out request ids. The
//! [`Ticket`] body holds the spawned entities and lives in a generational
//! [`TicketArena`], touched only while commands are processed. Both sides hold
//! the [`TicketShared`] state, but only handles keep the handle alive, so the
//! last one dropped can queue the ticket's destruction.

use crate::command::{Command, CommandKind};
use crate::priority::QueueClass;
use crate::queue::CommandQueues;
use spawnable_core::{Entity, EntityIdRemapper, SpawnableAsset};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// A generational index identifying a ticket.
///
/// When a ticket is destroyed its slot can be recycled for a new ticket, but
/// the generation is incremented, so commands still carrying the old id are
/// recognised as stale instead of acting on the new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId {
    /// The index of the ticket's slot in the arena.
    pub index: u32,
    /// A generation counter that is incremented each time the slot is recycled.
    pub generation: u32,
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// State shared between the caller's handle and the ticket body.
#[derive(Debug)]
pub(crate) struct TicketShared {
    pub(crate) id: TicketId,
    pub(crate) queue_class: QueueClass,
    next_request_id: AtomicU32,
    destroy_requested: AtomicBool,
}

impl TicketShared {
    pub(crate) fn new(id: TicketId, queue_class: QueueClass) -> Self {
        Self {
            id,
            queue_class,
            next_request_id: AtomicU32::new(0),
            destroy_requested: AtomicBool::new(false),
        }
    }

    /// Claims the next request id. Commands run in the order of these ids.
    pub(crate) fn next_request_id(&self) -> u32 {
        self.next_request_id.fetch_add(1, Ordering::AcqRel)
    }

    /// Flags the ticket for destruction. Returns `false` if it already was.
    pub(crate) fn request_destroy(&self) -> bool {
        !self.destroy_requested.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_destroy_requested(&self) -> bool {
        self.destroy_requested.load(Ordering::Acquire)
    }
}

/// A handle to one spawn session bound to a spawnable.
///
/// Clones refer to the same ticket. When the last clone is dropped and
/// `destroy_ticket` was never called, the ticket is destroyed all the same:
/// after its earlier requests, despawning whatever it still owns.
///
/// A handle stays valid to pass around after the ticket is destroyed; requests
/// made through it are then dropped and their callbacks receive empty results.
#[derive(Clone)]
pub struct EntitySpawnTicket {
    handle: Arc<TicketHandle>,
}

/// The part of a ticket only callers hold.
struct TicketHandle {
    shared: Arc<TicketShared>,
    queues: Weak<CommandQueues>,
}

impl Drop for TicketHandle {
    fn drop(&mut self) {
        if !self.shared.request_destroy() {
            return;
        }
        // Gone with the manager, together with the arena.
        let Some(queues) = self.queues.upgrade() else {
            return;
        };
        log::debug!(
            "Ticket {}: last handle dropped, destroying the ticket.",
            self.shared.id
        );
        queues.submit(
            self.shared.queue_class,
            Command {
                ticket: self.shared.id,
                request_id: self.shared.next_request_id(),
                kind: CommandKind::DestroyTicket,
            },
        );
    }
}

impl EntitySpawnTicket {
    pub(crate) fn new(shared: Arc<TicketShared>, queues: Weak<CommandQueues>) -> Self {
        Self {
            handle: Arc::new(TicketHandle { shared, queues }),
        }
    }

    pub(crate) fn shared(&self) -> &TicketShared {
        &self.handle.shared
    }

    /// Returns the ticket's id.
    pub fn id(&self) -> TicketId {
        self.shared().id
    }

    /// Returns the queue this ticket's requests go to when they don't ask for
    /// a priority. Fixed when the ticket is created.
    pub fn queue_class(&self) -> QueueClass {
        self.shared().queue_class
    }

    /// Returns `true` once the ticket's destruction has been requested.
    pub fn is_destroy_requested(&self) -> bool {
        self.shared().is_destroy_requested()
    }
}

impl fmt::Debug for EntitySpawnTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared();
        f.debug_struct("EntitySpawnTicket")
            .field("id", &shared.id)
            .field("queue_class", &shared.queue_class)
            .field("destroy_requested", &shared.is_destroy_requested())
            .finish()
    }
}

/// The owning-thread side of a ticket.
pub(crate) struct Ticket {
    pub(crate) shared: Arc<TicketShared>,
    pub(crate) spawnable: SpawnableAsset,
    /// Entities owned by the ticket, in spawn order.
    pub(crate) entities: Vec<Entity>,
    /// For each entry in `entities`, the prototype index it was cloned from.
    pub(crate) entity_indices: Vec<usize>,
    /// Prototype id to latest spawned id, kept across subset spawns.
    pub(crate) entity_id_map: EntityIdRemapper,
    pub(crate) current_request_id: u32,
    /// Set when the whole spawnable has been spawned in one go.
    pub(crate) load_all: bool,
}

impl Ticket {
    pub(crate) fn new(shared: Arc<TicketShared>, spawnable: SpawnableAsset) -> Self {
        Self {
            shared,
            spawnable,
            entities: Vec::new(),
            entity_indices: Vec::new(),
            entity_id_map: EntityIdRemapper::new(),
            current_request_id: 0,
            load_all: false,
        }
    }

    pub(crate) fn id(&self) -> TicketId {
        self.shared.id
    }

    /// Moves the cursor to the next request id, wrapping like the shared counter.
    pub(crate) fn advance_request(&mut self) {
        self.current_request_id = self.current_request_id.wrapping_add(1);
    }
}

enum TicketSlot {
    Vacant,
    Idle(Box<Ticket>),
    /// The body is checked out by the command currently being processed.
    InFlight,
}

/// The result of trying to check a ticket out for a command.
pub(crate) enum Checkout {
    /// The command is next in line; the body is handed over.
    Ready(Box<Ticket>),
    /// Earlier commands of this ticket have not completed yet.
    NotYet,
    /// Another command holds the ticket right now.
    InFlight,
    /// The ticket was destroyed, or never existed.
    Invalid,
}

/// Generational storage for ticket bodies.
///
/// Slots are recycled through a free list, the same scheme entity ids use in
/// the ECS: the generation stored next to a slot must match the id's
/// generation for a lookup to succeed.
pub(crate) struct TicketArena {
    slots: Vec<(TicketId, TicketSlot)>,
    freed: Vec<u32>,
    live: usize,
}

impl TicketArena {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            freed: Vec::new(),
            live: 0,
        }
    }

    /// Allocates a new or recycled slot and fills it with the ticket built by
    /// `make`. Returns the state the caller's handle shares with the body.
    pub(crate) fn insert(&mut self, make: impl FnOnce(TicketId) -> Ticket) -> Arc<TicketShared> {
        let id = if let Some(index) = self.freed.pop() {
            let (slot_id, _) = &mut self.slots[index as usize];
            slot_id.generation += 1;
            *slot_id
        } else {
            let id = TicketId {
                index: self.slots.len() as u32,
                generation: 0,
            };
            self.slots.push((id, TicketSlot::Vacant));
            id
        };
        let ticket = make(id);
        let shared = Arc::clone(&ticket.shared);
        self.slots[id.index as usize].1 = TicketSlot::Idle(Box::new(ticket));
        self.live += 1;
        shared
    }

    /// Hands out the ticket body if `request_id` is the ticket's current request.
    pub(crate) fn checkout(&mut self, id: TicketId, request_id: u32) -> Checkout {
        let Some((slot_id, slot)) = self.slots.get_mut(id.index as usize) else {
            return Checkout::Invalid;
        };
        if slot_id.generation != id.generation {
            return Checkout::Invalid;
        }
        let is_current = match slot {
            TicketSlot::Vacant => return Checkout::Invalid,
            TicketSlot::InFlight => return Checkout::InFlight,
            TicketSlot::Idle(ticket) => ticket.current_request_id == request_id,
        };
        if !is_current {
            return Checkout::NotYet;
        }
        match std::mem::replace(slot, TicketSlot::InFlight) {
            TicketSlot::Idle(ticket) => Checkout::Ready(ticket),
            other => {
                *slot = other;
                Checkout::InFlight
            }
        }
    }

    /// Returns a checked out body to its slot.
    pub(crate) fn checkin(&mut self, ticket: Box<Ticket>) {
        let id = ticket.id();
        match self.slots.get_mut(id.index as usize) {
            Some((slot_id, slot)) if slot_id.generation == id.generation => {
                *slot = TicketSlot::Idle(ticket);
            }
            _ => log::error!("TicketArena: checkin for unknown ticket {id}."),
        }
    }

    /// Retires a checked out ticket's slot so its id can never match again.
    pub(crate) fn release(&mut self, id: TicketId) {
        match self.slots.get_mut(id.index as usize) {
            Some((slot_id, slot)) if slot_id.generation == id.generation => {
                *slot = TicketSlot::Vacant;
                self.freed.push(id.index);
                self.live -= 1;
            }
            _ => log::error!("TicketArena: release for unknown ticket {id}."),
        }
    }

    /// Returns the number of tickets that have not been destroyed.
    pub(crate) fn live_count(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawnable_core::{AssetUUID, Spawnable};

    fn make_ticket(id: TicketId) -> Ticket {
        let shared = Arc::new(TicketShared::new(id, QueueClass::Regular));
        Ticket::new(shared, SpawnableAsset::ready(AssetUUID::new(), Spawnable::default()))
    }

    #[test]
    fn checkout_follows_request_order() {
        let mut arena = TicketArena::new();
        let id = arena.insert(make_ticket).id;

        assert!(matches!(arena.checkout(id, 1), Checkout::NotYet));
        let Checkout::Ready(mut ticket) = arena.checkout(id, 0) else {
            panic!("request 0 should be current");
        };
        assert!(matches!(arena.checkout(id, 0), Checkout::InFlight));

        ticket.advance_request();
        arena.checkin(ticket);
        assert!(matches!(arena.checkout(id, 1), Checkout::Ready(_)));
    }

    #[test]
    fn released_slot_is_recycled_with_new_generation() {
        let mut arena = TicketArena::new();
        let first = arena.insert(make_ticket).id;
        assert!(matches!(arena.checkout(first, 0), Checkout::Ready(_)));
        arena.release(first);
        assert_eq!(arena.live_count(), 0);

        let second = arena.insert(make_ticket).id;
        assert_eq!(second.index, first.index);
        assert_eq!(second.generation, first.generation + 1);
        assert!(matches!(arena.checkout(first, 0), Checkout::Invalid));
        assert!(matches!(arena.checkout(second, 0), Checkout::Ready(_)));
    }

    #[test]
    fn request_ids_are_handed_out_in_sequence() {
        let shared = TicketShared::new(
            TicketId {
                index: 0,
                generation: 0,
            },
            QueueClass::High,
        );
        assert_eq!(shared.next_request_id(), 0);
        assert_eq!(shared.next_request_id(), 1);
        assert!(shared.request_destroy());
        assert!(!shared.request_destroy());
        assert!(shared.is_destroy_requested());
    }

    #[test]
    fn cursor_wraps_with_the_request_counter() {
        let mut arena = TicketArena::new();
        let shared = arena.insert(make_ticket);
        let id = shared.id;
        shared.next_request_id.store(u32::MAX, Ordering::Release);
        let Checkout::Ready(mut ticket) = arena.checkout(id, 0) else {
            panic!("request 0 should be current");
        };
        ticket.current_request_id = u32::MAX;
        arena.checkin(ticket);

        assert_eq!(shared.next_request_id(), u32::MAX);
        assert_eq!(shared.next_request_id(), 0);

        let Checkout::Ready(mut ticket) = arena.checkout(id, u32::MAX) else {
            panic!("request u32::MAX should be current");
        };
        ticket.advance_request();
        assert_eq!(ticket.current_request_id, 0);
        arena.checkin(ticket);
        assert!(matches!(arena.checkout(id, 0), Checkout::Ready(_)));
    }
}
