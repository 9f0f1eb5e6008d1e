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

//! Error types for loading and saving spawnable templates.

use thiserror::Error;

/// An error raised while reading or writing a spawnable template.
#[derive(Debug, Error)]
pub enum SpawnableError {
    /// The template file could not be read.
    #[error("failed to read spawnable '{path}': {source}")]
    Io {
        /// The path that failed to load.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The template text is not valid RON for a spawnable.
    #[error("invalid spawnable format: {0}")]
    InvalidFormat(#[from] ron::error::SpannedError),
    /// The template could not be written out.
    #[error("failed to serialize spawnable: {0}")]
    Serialization(#[from] ron::Error),
}
