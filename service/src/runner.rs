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

//! Background service runner
//!
//! Runs the whole emulation service on a dedicated OS thread with its own
//! runtime, decoupled from the calling process (typically a test harness).
//! All coordination with the running service goes through the control
//! socket; the runner never reaches into the service's state directly, so
//! mutation keeps funneling through the single control-handler path.

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::service::EmulationService;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// How long [`BackgroundService::stop`] waits for the thread to finish
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on waiting for a control-protocol prompt
const CONTROL_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// An emulation service running on a background thread.
///
/// # Example
///
/// ```no_run
/// use std::net::{IpAddr, Ipv4Addr};
/// use teleplay_service::{BackgroundService, ServiceConfig};
///
/// # fn main() -> Result<(), teleplay_service::ServiceError> {
/// let config = ServiceConfig::new()
///     .with_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
///     .with_session_port(0)
///     .with_control_port(0);
/// let service = BackgroundService::start(config)?;
/// service.set_script("Hello\n<%bye%>\nBye!\n")?;
/// // ... point the client under test at service.session_addr() ...
/// service.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct BackgroundService {
    session_addr: SocketAddr,
    control_addr: SocketAddr,
    handle: thread::JoinHandle<()>,
    stop_timeout: Duration,
}

impl BackgroundService {
    /// Bind and run a service on a new background thread.
    ///
    /// Returns once both listeners are bound, so `:0` port configurations
    /// can be queried for their actual addresses immediately.
    pub fn start(config: ServiceConfig) -> ServiceResult<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<ServiceResult<(SocketAddr, SocketAddr)>>();

        let handle = thread::Builder::new()
            .name("teleplay-service".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(error) => {
                        let _ = ready_tx.send(Err(ServiceError::Io(error)));
                        return;
                    }
                };

                runtime.block_on(async move {
                    match EmulationService::bind(config).await {
                        Ok(service) => {
                            let addrs = (service.session_addr(), service.control_addr());
                            let _ = ready_tx.send(Ok(addrs));
                            if let Err(error) = service.run().await {
                                tracing::error!(%error, "emulation service terminated");
                            }
                        }
                        Err(error) => {
                            let _ = ready_tx.send(Err(error));
                        }
                    }
                });
            })?;

        let (session_addr, control_addr) = ready_rx
            .recv()
            .map_err(|_| ServiceError::NotRunning)??;

        Ok(Self {
            session_addr,
            control_addr,
            handle,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        })
    }

    /// Actual address of the session listener
    pub fn session_addr(&self) -> SocketAddr {
        self.session_addr
    }

    /// Actual address of the control listener
    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    /// Whether the service thread is still alive
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Change how long [`stop`](Self::stop) waits for termination
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Install a script directly, quoted for the control protocol
    pub fn set_script(&self, data: &str) -> ServiceResult<()> {
        let quoted = shlex::try_quote(data).map_err(|_| {
            ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "script data contains a NUL byte",
            ))
        })?;
        self.send_command(&format!("SET {quoted}"))
    }

    /// Load a script from a file readable by the service
    pub fn load_script(&self, path: &str) -> ServiceResult<()> {
        let quoted = shlex::try_quote(path).map_err(|_| {
            ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "script path contains a NUL byte",
            ))
        })?;
        self.send_command(&format!("LOAD {quoted}"))
    }

    /// Ask the service to shut down and wait (bounded) for the thread.
    ///
    /// Returns [`ServiceError::ShutdownTimeout`] when the thread does not
    /// terminate within the stop timeout.
    pub fn stop(self) -> ServiceResult<()> {
        self.send_command("SHUTDOWN")?;
        tracing::debug!("waiting for emulation service to shut down");

        let deadline = Instant::now() + self.stop_timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!("emulation service failed to shut down cleanly");
                return Err(ServiceError::ShutdownTimeout(self.stop_timeout));
            }
            thread::sleep(Duration::from_millis(10));
        }

        let _ = self.handle.join();
        Ok(())
    }

    /// Open a control connection, wait for the prompt, send one command.
    ///
    /// The connection is closed right after writing; the service processes
    /// the command from its receive buffer, exactly like a fire-and-forget
    /// operator session.
    fn send_command(&self, command: &str) -> ServiceResult<()> {
        let mut stream = std::net::TcpStream::connect(self.control_addr)?;
        stream.set_read_timeout(Some(CONTROL_READ_TIMEOUT))?;

        read_until_prompt(&mut stream)?;
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for BackgroundService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundService")
            .field("session_addr", &self.session_addr)
            .field("control_addr", &self.control_addr)
            .field("running", &self.is_running())
            .finish()
    }
}

fn read_until_prompt(stream: &mut std::net::TcpStream) -> ServiceResult<()> {
    let mut seen = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "control connection closed before prompt",
            )));
        }
        seen.extend_from_slice(&chunk[..n]);
        if seen.ends_with(b"> ") {
            return Ok(());
        }
    }
}
