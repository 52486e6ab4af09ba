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

//! Service configuration
//!
//! # Examples
//!
//! ```
//! use teleplay_service::ServiceConfig;
//! use std::time::Duration;
//!
//! let config = ServiceConfig::new()
//!     .with_session_port(9023)
//!     .with_control_port(9024)
//!     .with_shutdown_timeout(Duration::from_secs(2));
//! ```

use crate::codec::DEFAULT_MAX_LINE_LENGTH;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use teleplay_emulator::TranscriptOptions;

/// Default port for the session (emulation) listener
pub const DEFAULT_SESSION_PORT: u16 = 23;

/// Default port for the control listener
pub const DEFAULT_CONTROL_PORT: u16 = 2323;

/// Emulation service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address both listeners bind on
    pub host: IpAddr,

    /// Port for the session listener
    pub session_port: u16,

    /// Port for the control listener
    pub control_port: u16,

    /// Greeting and marker pattern applied to every script
    pub transcript: TranscriptOptions,

    /// Script installed before the service starts, if any
    pub script: Option<String>,

    /// Maximum length of a single inbound line
    pub max_line_length: usize,

    /// How long shutdown waits for in-flight connections to drain
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            session_port: DEFAULT_SESSION_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            transcript: TranscriptOptions::default(),
            script: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServiceConfig {
    /// Create a configuration with the default ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the session listener port
    pub fn with_session_port(mut self, port: u16) -> Self {
        self.session_port = port;
        self
    }

    /// Set the control listener port
    pub fn with_control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Set the greeting prepended to every script
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.transcript.greeting = greeting.into();
        self
    }

    /// Set the input marker pattern
    pub fn with_input_tag(mut self, input_tag: impl Into<String>) -> Self {
        self.transcript.input_tag = input_tag.into();
        self
    }

    /// Set the initial script
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the maximum inbound line length
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Set the shutdown drain bound
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Socket address of the session listener
    pub fn session_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.session_port)
    }

    /// Socket address of the control listener
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.control_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = ServiceConfig::default();
        assert_eq!(config.session_port, 23);
        assert_eq!(config.control_port, 2323);
        assert_eq!(config.session_addr().to_string(), "0.0.0.0:23");
        assert_eq!(config.control_addr().to_string(), "0.0.0.0:2323");
    }

    #[test]
    fn test_builder_methods() {
        let config = ServiceConfig::new()
            .with_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_session_port(9023)
            .with_control_port(9024)
            .with_greeting("Test Session\n")
            .with_script("hello\n")
            .with_max_line_length(512)
            .with_shutdown_timeout(Duration::from_secs(1));

        assert_eq!(config.session_addr().to_string(), "127.0.0.1:9023");
        assert_eq!(config.control_addr().to_string(), "127.0.0.1:9024");
        assert_eq!(config.transcript.greeting, "Test Session\n");
        assert_eq!(config.script.as_deref(), Some("hello\n"));
        assert_eq!(config.max_line_length, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }
}
