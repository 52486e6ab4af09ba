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

//! # Teleplay Replay Engine
//!
//! This crate provides the script replay engine used by the teleplay
//! emulation service. A script is ordinary console text interspersed with
//! input markers of the form `<%command%>`; the engine plays the text back
//! chunk by chunk, pausing at each marker until the client supplies the
//! expected input.
//!
//! You can pretty much copy and paste console output from a live session
//! and then mark the inputs with `<% %>` tags:
//!
//! ```text
//! (FSM7328S)
//! User:<%admin%>
//! Password:<%secret%>
//! (FSM7328S) ><%show hardware%>
//!
//! Switch: 1
//! ...
//! (FSM7328S) ><%logout%>
//! ```
//!
//! ## Core Components
//!
//! ### [`Transcript`]
//!
//! The immutable parsed view over a script document: the greeting prefix,
//! the combined body text, and the compiled marker pattern. One
//! `Arc<Transcript>` may back any number of concurrent engines.
//!
//! ### [`Emulator`]
//!
//! The per-connection state machine. Each call to [`Emulator::input`]
//! validates the supplied command against the pending expectation and
//! returns the body slice up to the next marker, or the remaining tail of
//! the script when no marker is left.
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use teleplay_emulator::{Emulator, Transcript};
//!
//! let transcript = Arc::new(Transcript::new("Login:<%admin%>\nWelcome!\n"));
//! let mut emulator = Emulator::new(transcript);
//!
//! let greeting = emulator.input(None).unwrap().unwrap();
//! assert!(greeting.ends_with("Login:"));
//!
//! let tail = emulator.input(Some("admin")).unwrap().unwrap();
//! assert_eq!(tail, "Welcome!\n");
//! assert!(emulator.eof());
//! ```

mod emulator;
mod error;
mod transcript;

pub use emulator::Emulator;
pub use error::{EmulationError, EmulationResult};
pub use transcript::{DEFAULT_GREETING, DEFAULT_INPUT_TAG, Transcript, TranscriptOptions};
