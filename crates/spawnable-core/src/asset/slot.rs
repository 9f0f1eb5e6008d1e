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

//! A shared load slot for assets that may still be in flight.

use super::{Asset, AssetHandle, AssetUUID};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// The load state of an asset as seen through an [`AssetRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetStatus {
    /// The loader has not produced the asset yet.
    Loading,
    /// The asset data is available.
    Ready,
    /// The loader gave up. The slot stays in this state until completed again.
    Failed,
}

enum SlotState<A: Asset> {
    Loading,
    Ready(AssetHandle<A>),
    Failed(String),
}

/// A cloneable reference to an asset that may not have finished loading.
///
/// All clones share one slot: when the loader calls [`AssetRef::complete`],
/// every holder observes the asset as ready on its next [`AssetRef::get`].
/// This is the readiness query consumers use to decide whether to act now or
/// retry later.
pub struct AssetRef<A: Asset> {
    uuid: AssetUUID,
    slot: Arc<RwLock<SlotState<A>>>,
}

impl<A: Asset> AssetRef<A> {
    /// Creates a reference whose asset is still loading.
    pub fn loading(uuid: AssetUUID) -> Self {
        Self {
            uuid,
            slot: Arc::new(RwLock::new(SlotState::Loading)),
        }
    }

    /// Creates a reference to an asset that is already available.
    pub fn ready(uuid: AssetUUID, asset: A) -> Self {
        Self {
            uuid,
            slot: Arc::new(RwLock::new(SlotState::Ready(AssetHandle::new(asset)))),
        }
    }

    /// Returns the asset's identifier.
    pub fn uuid(&self) -> AssetUUID {
        self.uuid
    }

    /// Returns the current load state.
    pub fn status(&self) -> AssetStatus {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Loading => AssetStatus::Loading,
            SlotState::Ready(_) => AssetStatus::Ready,
            SlotState::Failed(_) => AssetStatus::Failed,
        }
    }

    /// Returns `true` once the asset data can be read.
    pub fn is_ready(&self) -> bool {
        self.status() == AssetStatus::Ready
    }

    /// Returns a handle to the asset data if it has finished loading.
    pub fn get(&self) -> Option<AssetHandle<A>> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Returns the failure reason if the loader gave up.
    pub fn failure(&self) -> Option<String> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Publishes the loaded asset to every holder of this reference.
    pub fn complete(&self, asset: A) {
        log::debug!("Asset {} is ready.", self.uuid);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
            SlotState::Ready(AssetHandle::new(asset));
    }

    /// Marks the asset as failed.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Asset {} failed to load: {reason}", self.uuid);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = SlotState::Failed(reason);
    }

    /// Returns `true` if both references share the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<A: Asset> Clone for AssetRef<A> {
    fn clone(&self) -> Self {
        Self {
            uuid: self.uuid,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A: Asset> fmt::Debug for AssetRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRef")
            .field("uuid", &self.uuid)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Blob(u32);
    impl Asset for Blob {}

    #[test]
    fn loading_reference_becomes_ready_for_every_clone() {
        let reference = AssetRef::<Blob>::loading(AssetUUID::new());
        let clone = reference.clone();
        assert_eq!(clone.status(), AssetStatus::Loading);
        assert!(clone.get().is_none());

        reference.complete(Blob(3));

        assert!(clone.is_ready());
        assert_eq!(*clone.get().expect("asset should be ready"), Blob(3));
        assert!(clone.ptr_eq(&reference));
    }

    #[test]
    fn failed_reference_reports_reason_and_no_data() {
        let reference = AssetRef::<Blob>::loading(AssetUUID::new());
        reference.fail("missing file");

        assert_eq!(reference.status(), AssetStatus::Failed);
        assert_eq!(reference.failure().as_deref(), Some("missing file"));
        assert!(reference.get().is_none());
    }

    #[test]
    fn separate_references_do_not_share_slots() {
        let uuid = AssetUUID::new();
        let a = AssetRef::ready(uuid, Blob(1));
        let b = AssetRef::ready(uuid, Blob(1));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.uuid(), b.uuid());
    }
}
