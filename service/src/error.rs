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

//! Error types for the emulation service

use std::path::PathBuf;
use std::time::Duration;
use teleplay_emulator::EmulationError;
use thiserror::Error;

/// Result type for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Emulation service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream or listener
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the replay engine
    #[error(transparent)]
    Emulation(#[from] EmulationError),

    /// A session was accepted before any script was set
    #[error("No emulation script has been set")]
    EmulationNotSet,

    /// A `LOAD` target could not be read
    #[error("Failed to load script {path:?}: {source}")]
    ScriptLoad {
        /// Path the load was attempted from
        path: PathBuf,
        /// Underlying read failure
        source: std::io::Error,
    },

    /// An incoming line exceeded the codec's buffer limit
    #[error("Line exceeds maximum length ({0} bytes)")]
    LineTooLong(usize),

    /// The service is not running
    #[error("Service not running")]
    NotRunning,

    /// The service failed to stop within the allowed bound
    #[error("Service failed to stop within {0:?}")]
    ShutdownTimeout(Duration),
}

impl ServiceError {
    /// Check whether the error only affects a single connection.
    ///
    /// Connection-scoped errors are handled at the owning handler and never
    /// terminate the service.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Io(_)
                | ServiceError::Emulation(_)
                | ServiceError::LineTooLong(_)
                | ServiceError::EmulationNotSet
        )
    }
}
