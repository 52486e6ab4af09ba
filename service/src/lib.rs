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

//! # Teleplay Emulation Service
//!
//! A telnet-style server that replays a scripted console session to every
//! client, pausing at each input marker until the client supplies the
//! expected command. A second listener speaks a small text control protocol
//! for swapping the active script at runtime and for shutting the service
//! down. Test harnesses drive both.
//!
//! # Architecture
//!
//! ```text
//! EmulationService
//!     ↓
//! Listener("session") → SessionAcceptor → SessionHandler → Emulator
//! Listener("control") → ControlAcceptor → ControlHandler
//!     ↓
//! ScriptSlot (written by control commands, read once per session accept)
//! ```
//!
//! Each accepted connection runs on its own task; the shared script slot is
//! written only by control handlers and read only at session-accept time.
//! Shutdown is cooperative: cancelling the service token (directly, or via
//! the control protocol's `SHUTDOWN`) stops both accept loops and closes
//! every in-flight connection within a bounded drain.
//!
//! # Example
//!
//! ```no_run
//! use teleplay_service::{EmulationService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::new()
//!         .with_script("Login:<%admin%>\nWelcome!\n");
//!     let service = EmulationService::bind(config).await?;
//!     service.run().await?;
//!     Ok(())
//! }
//! ```

mod codec;
mod config;
mod control;
mod error;
mod runner;
mod script;
mod server;
mod service;
mod session;
mod types;

pub use codec::{DEFAULT_MAX_LINE_LENGTH, LineCodec};
pub use config::{DEFAULT_CONTROL_PORT, DEFAULT_SESSION_PORT, ServiceConfig};
pub use control::ControlHandler;
pub use error::{ServiceError, ServiceResult};
pub use runner::{BackgroundService, DEFAULT_STOP_TIMEOUT};
pub use script::ScriptSlot;
pub use server::{ConnectionHandler, Listener};
pub use service::EmulationService;
pub use session::SessionHandler;
pub use types::ConnectionId;
