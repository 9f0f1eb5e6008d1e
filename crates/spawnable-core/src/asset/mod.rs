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

//! Provides the asset primitives the spawn pipeline relies on.
//!
//! The spawn manager does not load assets itself. It only needs to hold on to
//! a shared reference, ask whether the asset has finished loading and read it
//! once it has. Those three needs are covered here:
//! - The [`Asset`] trait: A marker for all types that can be treated as assets.
//! - [`AssetHandle`]: shared ownership of loaded asset data.
//! - [`AssetRef`]: a load slot that starts out `Loading` and is completed by
//!   whatever loader owns it, which is the readiness query used to defer work.

mod handle;
mod slot;
mod uuid;

pub use handle::*;
pub use slot::*;
pub use uuid::*;

/// A marker trait for types that can be managed by the asset system.
///
/// The supertraits enforce critical safety guarantees:
/// - `Send` + `Sync`: The asset type can be safely shared and sent between threads.
///   Spawn requests carry asset references from producer threads to the
///   owning thread.
/// - `'static`: The asset type does not contain any non-static references.
///
/// # Examples
///
/// ```
/// use spawnable_core::asset::Asset;
///
/// struct Prefab {
///     // ... fields
/// }
///
/// impl Asset for Prefab {}
/// ```
pub trait Asset: Send + Sync + 'static {}
