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

//! Generic accept loop
//!
//! Both the session and control listeners are the same component bound to a
//! different [`ConnectionHandler`]. The loop accepts until cancelled and
//! spawns one handler task per connection; a handler failure never takes the
//! listener down.

use crate::error::ServiceResult;
use crate::types::ConnectionId;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Per-connection behavior plugged into a [`Listener`].
///
/// Implementations own the accepted stream for the connection's whole life
/// and must close it on every terminal outcome.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Drive one accepted connection to completion
    async fn handle(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    );
}

/// A bound TCP listener plus the accept loop that feeds a handler
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
    name: &'static str,
}

impl Listener {
    /// Bind to the given address
    pub async fn bind(name: &'static str, addr: SocketAddr) -> ServiceResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(listener = name, %local_addr, "listening for connections");
        Ok(Self {
            listener,
            local_addr,
            name,
        })
    }

    /// Actual bound address (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until cancelled.
    ///
    /// Each accepted connection runs on its own task, tracked by `tracker`
    /// and handed a child of `cancel` so shutdown reaches every handler.
    pub(crate) async fn serve(
        self,
        handler: Arc<dyn ConnectionHandler>,
        cancel: CancellationToken,
        tracker: TaskTracker,
        ids: Arc<AtomicU64>,
    ) {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let id = ConnectionId::new(ids.fetch_add(1, Ordering::SeqCst));
                    tracing::info!(listener = self.name, %id, %peer, "accepted connection");

                    let handler = handler.clone();
                    let child = cancel.child_token();
                    tracker.spawn(async move {
                        handler.handle(id, stream, peer, child).await;
                        tracing::debug!(%id, "connection finished");
                    });
                }
                Err(error) => {
                    tracing::warn!(listener = self.name, %error, "failed to accept connection");
                    // Back off to avoid a tight loop on persistent errors.
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }

        tracing::info!(listener = self.name, "accept loop terminated");
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("name", &self.name)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
