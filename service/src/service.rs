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

//! The emulation service
//!
//! Owns the session and control listeners, the shared script slot, and the
//! cancellation/tracking machinery that makes shutdown close every
//! connection exactly once.

use crate::config::ServiceConfig;
use crate::control::ControlAcceptor;
use crate::error::{ServiceError, ServiceResult};
use crate::script::ScriptSlot;
use crate::server::Listener;
use crate::session::SessionAcceptor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Scripted emulation service: one listener replaying the current script to
/// each client, one listener accepting control commands.
///
/// # Example
///
/// ```no_run
/// use teleplay_service::{EmulationService, ServiceConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServiceConfig::new().with_script("Hello\n<%bye%>\nBye!\n");
///     let service = EmulationService::bind(config).await?;
///     service.run().await?;
///     Ok(())
/// }
/// ```
pub struct EmulationService {
    config: ServiceConfig,
    slot: ScriptSlot,
    session: Listener,
    control: Listener,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl EmulationService {
    /// Bind both listeners and install the initial script, if any.
    ///
    /// The service does not accept connections until [`run`](Self::run).
    pub async fn bind(config: ServiceConfig) -> ServiceResult<Self> {
        let session = Listener::bind("session", config.session_addr()).await?;
        let control = Listener::bind("control", config.control_addr()).await?;

        let slot = ScriptSlot::new(config.transcript.clone());
        if let Some(script) = &config.script {
            slot.set(script).await?;
        }

        Ok(Self {
            config,
            slot,
            session,
            control,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Handle on the shared script slot
    pub fn script(&self) -> ScriptSlot {
        self.slot.clone()
    }

    /// Actual address of the session listener
    pub fn session_addr(&self) -> SocketAddr {
        self.session.local_addr()
    }

    /// Actual address of the control listener
    pub fn control_addr(&self) -> SocketAddr {
        self.control.local_addr()
    }

    /// Token that stops the service when cancelled.
    ///
    /// The control protocol's `SHUTDOWN` cancels the same token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive both accept loops until shutdown, then drain handlers.
    ///
    /// Returns [`ServiceError::ShutdownTimeout`] when in-flight connections
    /// fail to close within the configured bound.
    pub async fn run(self) -> ServiceResult<()> {
        let ids = Arc::new(AtomicU64::new(1));

        let session_handler = Arc::new(SessionAcceptor::new(
            self.slot.clone(),
            self.config.max_line_length,
        ));
        let control_handler = Arc::new(ControlAcceptor::new(
            self.slot.clone(),
            self.cancel.clone(),
            self.config.max_line_length,
        ));

        let session_loop = tokio::spawn(self.session.serve(
            session_handler,
            self.cancel.clone(),
            self.tracker.clone(),
            ids.clone(),
        ));
        let control_loop = tokio::spawn(self.control.serve(
            control_handler,
            self.cancel.clone(),
            self.tracker.clone(),
            ids,
        ));

        self.cancel.cancelled().await;
        tracing::info!("shutting down emulation service");

        let _ = session_loop.await;
        let _ = control_loop.await;

        self.tracker.close();
        if tokio::time::timeout(self.config.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout = ?self.config.shutdown_timeout,
                "connections failed to drain during shutdown"
            );
            return Err(ServiceError::ShutdownTimeout(self.config.shutdown_timeout));
        }

        tracing::info!("emulation service stopped");
        Ok(())
    }
}

impl std::fmt::Debug for EmulationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulationService")
            .field("session_addr", &self.session_addr())
            .field("control_addr", &self.control_addr())
            .finish()
    }
}
