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

//! Configuration for the spawnable entities manager.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// An error raised while loading a [`SpawnableEntitiesConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Io {
        /// The path that failed to load.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid RON.
    #[error("invalid configuration: {0}")]
    InvalidFormat(#[from] ron::error::SpannedError),
}

/// Configuration for the spawnable entities manager.
///
/// Every field has a default, so a configuration file only needs to list the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnableEntitiesConfig {
    /// Requests with an explicit priority at or below this value go to the
    /// high priority queue.
    pub high_priority_threshold: u8,
    /// Tickets whose spawnable is loaded on creation and holds at most this
    /// many prototypes are classified as high priority.
    pub small_spawnable_threshold: usize,
    /// Default for whether subset spawns may reference entities spawned by
    /// earlier requests on the same ticket.
    pub reference_previously_spawned_by_default: bool,
}

impl Default for SpawnableEntitiesConfig {
    fn default() -> Self {
        Self {
            high_priority_threshold: 64,
            small_spawnable_threshold: 64,
            reference_previously_spawned_by_default: true,
        }
    }
}

impl SpawnableEntitiesConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::de::from_str(text)?)
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }
}
