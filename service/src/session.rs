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

//! Session handling
//!
//! One session owns one connection and one replay engine, created from a
//! snapshot of the current script at accept time. Swapping the script while
//! a session is replaying does not affect it.

use crate::codec::LineCodec;
use crate::error::ServiceError;
use crate::script::ScriptSlot;
use crate::server::ConnectionHandler;
use crate::types::ConnectionId;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use teleplay_emulator::Emulator;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Whether the session continues after a step
enum Step {
    Continue,
    Finished,
}

/// Drives one replay engine over one line-terminated duplex stream
pub struct SessionHandler {
    id: ConnectionId,
    framed: Framed<TcpStream, LineCodec>,
    emulator: Emulator,
}

impl SessionHandler {
    /// Wrap an accepted stream and a freshly built engine
    pub fn new(id: ConnectionId, stream: TcpStream, codec: LineCodec, emulator: Emulator) -> Self {
        Self {
            id,
            framed: Framed::new(stream, codec),
            emulator,
        }
    }

    /// Run the session until a terminal condition, then close the stream
    pub async fn run(mut self, cancel: CancellationToken) {
        self.emulator.start();

        // Emit the greeting chunk before any client data is required.
        match self.step(None).await {
            Ok(Step::Continue) => loop {
                let incoming = tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(id = %self.id, "session cancelled by shutdown");
                        break;
                    }
                    incoming = self.framed.next() => incoming,
                };

                match incoming {
                    Some(Ok(line)) => {
                        let line = line.trim_end().to_string();
                        match self.step(Some(&line)).await {
                            Ok(Step::Continue) => {}
                            Ok(Step::Finished) => break,
                            Err(error) => {
                                tracing::warn!(id = %self.id, %error, "session transport failure");
                                break;
                            }
                        }
                    }
                    Some(Err(error)) => {
                        tracing::warn!(id = %self.id, %error, "failed to read from session");
                        break;
                    }
                    None => {
                        tracing::debug!(id = %self.id, "client closed the session");
                        break;
                    }
                }
            },
            Ok(Step::Finished) => {}
            Err(error) => {
                tracing::warn!(id = %self.id, %error, "session transport failure");
            }
        }

        if let Err(error) = SinkExt::<&str>::close(&mut self.framed).await {
            tracing::debug!(id = %self.id, %error, "error while closing session");
        }
    }

    /// Feed one input (or the no-input sentinel) through the engine and
    /// write whatever it produces.
    async fn step(&mut self, line: Option<&str>) -> Result<Step, ServiceError> {
        match self.emulator.input(line) {
            Ok(Some(chunk)) => {
                self.framed.send(chunk.as_str()).await?;
                if self.emulator.eof() {
                    tracing::debug!(id = %self.id, "script exhausted, closing session");
                    Ok(Step::Finished)
                } else {
                    Ok(Step::Continue)
                }
            }
            Ok(None) => Ok(Step::Finished),
            Err(error) => {
                tracing::warn!(
                    id = %self.id,
                    line = self.emulator.line(),
                    "emulation halted: {error}"
                );
                self.framed.send(format!("Error: {error}\n")).await?;
                Ok(Step::Finished)
            }
        }
    }
}

/// Builds a [`SessionHandler`] per accepted connection from a snapshot of
/// the shared script slot.
pub(crate) struct SessionAcceptor {
    slot: ScriptSlot,
    max_line_length: usize,
}

impl SessionAcceptor {
    pub(crate) fn new(slot: ScriptSlot, max_line_length: usize) -> Self {
        Self {
            slot,
            max_line_length,
        }
    }
}

#[async_trait]
impl ConnectionHandler for SessionAcceptor {
    async fn handle(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    ) {
        // Snapshot at accept time: later swaps must not reach this session.
        match self.slot.snapshot().await {
            Some(transcript) => {
                let codec = LineCodec::with_max_line_length(self.max_line_length);
                let emulator = Emulator::new(transcript);
                SessionHandler::new(id, stream, codec, emulator)
                    .run(cancel)
                    .await;
            }
            None => {
                let error = ServiceError::EmulationNotSet;
                tracing::error!(%id, %peer, %error, "rejecting session");
                drop(stream);
            }
        }
    }
}
