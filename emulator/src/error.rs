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

//! Error types for the replay engine

use thiserror::Error;

/// Result type for replay engine operations
pub type EmulationResult<T> = std::result::Result<T, EmulationError>;

/// Replay engine error types
#[derive(Debug, Error)]
pub enum EmulationError {
    /// Client input did not satisfy the pending expectation.
    ///
    /// This halts the engine; only [`crate::Emulator::start`] makes it
    /// usable again.
    #[error("Expected {expected:?}, got {got:?} at line {line}")]
    UnexpectedInput {
        /// What the script expected at this point
        expected: String,
        /// What the client actually sent
        got: String,
        /// Script line number at which the mismatch occurred
        line: i64,
    },

    /// A configured input tag pattern failed to compile
    #[error("Invalid input tag pattern: {0}")]
    InvalidTagPattern(#[from] regex::Error),
}
