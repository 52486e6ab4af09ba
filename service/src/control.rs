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

//! Control protocol handling
//!
//! Line-based command protocol for operating the service. Every control
//! connection gets its own handler; all of them mutate the same shared
//! script slot, so a `SET` or `LOAD` is visible to the very next session
//! accept.

use crate::codec::LineCodec;
use crate::error::ServiceError;
use crate::script::ScriptSlot;
use crate::server::ConnectionHandler;
use crate::types::ConnectionId;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Prompt sent on connect and after every non-terminal command
const PROMPT: &str = "\n> ";

const HELP: &str = "Command handler for the emulation service.\n\
\n\
LOAD <file>: Load an emulation script from a file\n\
SET <data>:  Set the emulation script directly (quote the data)\n\
QUIT:        Close this control connection\n\
SHUTDOWN:    Shut down all servers\n\
HELP:        This help\n";

/// What the dispatch decided about the connection's future
enum Disposition {
    /// Keep reading commands
    Continue,
    /// Close this control connection only
    Close,
}

/// Drives the command protocol over one control connection
pub struct ControlHandler {
    id: ConnectionId,
    framed: Framed<TcpStream, LineCodec>,
    slot: ScriptSlot,
    shutdown: CancellationToken,
}

impl ControlHandler {
    /// Wrap an accepted control stream
    pub fn new(
        id: ConnectionId,
        stream: TcpStream,
        codec: LineCodec,
        slot: ScriptSlot,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            framed: Framed::new(stream, codec),
            slot,
            shutdown,
        }
    }

    /// Run the command loop until the connection closes or the service
    /// shuts down
    pub async fn run(mut self, cancel: CancellationToken) {
        if let Err(error) = self.framed.send(PROMPT).await {
            tracing::warn!(id = %self.id, %error, "failed to send control prompt");
            return;
        }

        loop {
            let incoming = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(id = %self.id, "control connection cancelled by shutdown");
                    break;
                }
                incoming = self.framed.next() => incoming,
            };

            match incoming {
                Some(Ok(line)) => match self.dispatch(line.trim_end()).await {
                    Ok(Disposition::Continue) => {}
                    Ok(Disposition::Close) => break,
                    Err(error) => {
                        tracing::warn!(id = %self.id, %error, "control transport failure");
                        break;
                    }
                },
                Some(Err(error)) => {
                    tracing::warn!(id = %self.id, %error, "failed to read control command");
                    break;
                }
                None => {
                    tracing::debug!(id = %self.id, "control client disconnected");
                    break;
                }
            }
        }

        if let Err(error) = SinkExt::<&str>::close(&mut self.framed).await {
            tracing::debug!(id = %self.id, %error, "error while closing control connection");
        }
    }

    /// Parse and execute one command line
    async fn dispatch(&mut self, line: &str) -> Result<Disposition, ServiceError> {
        let Some(parts) = shlex::split(line) else {
            // Unbalanced quoting; nothing to do but re-prompt.
            return self.prompt().await;
        };
        let Some(keyword) = parts.first() else {
            return self.prompt().await;
        };
        let command = keyword.to_uppercase();

        match command.as_str() {
            "LOAD" => {
                match parts.get(1) {
                    Some(path) => {
                        self.framed.send(format!("Loading '{path}'\n")).await?;
                        match self.slot.load(path).await {
                            Ok(()) => self.framed.send("Loaded file\n").await?,
                            Err(error) => {
                                tracing::warn!(id = %self.id, %error, "script load failed");
                                self.framed.send("Failed to load file\n").await?;
                            }
                        }
                    }
                    None => self.framed.send("Failed to load file\n").await?,
                }
                self.prompt().await
            }
            "SET" => {
                match parts.get(1) {
                    Some(data) => match self.slot.set(data).await {
                        Ok(()) => self.framed.send("Set emulation data").await?,
                        Err(error) => {
                            tracing::warn!(id = %self.id, %error, "script set failed");
                            self.framed.send("Failed to set data").await?;
                        }
                    },
                    None => self.framed.send("Failed to set data").await?,
                }
                self.prompt().await
            }
            "QUIT" => {
                self.framed.send("Closing connection...\n").await?;
                Ok(Disposition::Close)
            }
            "SHUTDOWN" => {
                self.framed.send("Sending shutdown signal...\n").await?;
                tracing::info!(id = %self.id, "shutdown requested over control connection");
                self.shutdown.cancel();
                Ok(Disposition::Close)
            }
            "HELP" => {
                self.framed.send(HELP).await?;
                self.prompt().await
            }
            _ => {
                self.framed
                    .send(format!("Unknown command: {command}\n"))
                    .await?;
                self.prompt().await
            }
        }
    }

    async fn prompt(&mut self) -> Result<Disposition, ServiceError> {
        self.framed.send(PROMPT).await?;
        Ok(Disposition::Continue)
    }
}

/// Builds a [`ControlHandler`] per accepted control connection
pub(crate) struct ControlAcceptor {
    slot: ScriptSlot,
    shutdown: CancellationToken,
    max_line_length: usize,
}

impl ControlAcceptor {
    pub(crate) fn new(
        slot: ScriptSlot,
        shutdown: CancellationToken,
        max_line_length: usize,
    ) -> Self {
        Self {
            slot,
            shutdown,
            max_line_length,
        }
    }
}

#[async_trait]
impl ConnectionHandler for ControlAcceptor {
    async fn handle(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        _peer: SocketAddr,
        cancel: CancellationToken,
    ) {
        let codec = LineCodec::with_max_line_length(self.max_line_length);
        ControlHandler::new(id, stream, codec, self.slot.clone(), self.shutdown.clone())
            .run(cancel)
            .await;
    }
}
