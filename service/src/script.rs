//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Shared current-script state
//!
//! The slot is the only mutable state shared between the two listeners:
//! control handlers write it, the session accept path reads it. Sessions
//! receive a snapshot taken at accept time, so replacing the script never
//! affects a connection that is already replaying.

use crate::error::{ServiceError, ServiceResult};
use std::path::Path;
use std::sync::Arc;
use teleplay_emulator::{Transcript, TranscriptOptions};
use tokio::sync::RwLock;

/// The single mutable slot holding the service's current transcript.
///
/// Cheap to clone; all clones share the same slot.
#[derive(Debug, Clone)]
pub struct ScriptSlot {
    options: TranscriptOptions,
    current: Arc<RwLock<Option<Arc<Transcript>>>>,
}

impl ScriptSlot {
    /// Create an empty slot that builds transcripts with the given options
    pub fn new(options: TranscriptOptions) -> Self {
        Self {
            options,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the current transcript with one built from `data`
    pub async fn set(&self, data: &str) -> ServiceResult<()> {
        let transcript = Arc::new(Transcript::with_options(data, &self.options)?);
        *self.current.write().await = Some(transcript);
        tracing::info!(bytes = data.len(), "emulation script replaced");
        Ok(())
    }

    /// Replace the current transcript with the contents of a file
    pub async fn load(&self, path: impl AsRef<Path>) -> ServiceResult<()> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ServiceError::ScriptLoad {
                path: path.to_path_buf(),
                source,
            })?;
        self.set(&data).await
    }

    /// The current transcript, if any has ever been set.
    ///
    /// Session handlers call this exactly once, at accept time.
    pub async fn snapshot(&self) -> Option<Arc<Transcript>> {
        self.current.read().await.clone()
    }

    /// Whether a script has ever been set
    pub async fn is_set(&self) -> bool {
        self.current.read().await.is_some()
    }
}
