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

//! Teleplay command line entry point
//!
//! Serves a scripted console session over TCP, or pumps it over
//! stdin/stdout with `--stdio` for quick script checks:
//!
//! ```text
//! teleplay demos/switch.txt
//! teleplay demos/switch.txt --stdio
//! ```

use clap::Parser;
use std::error::Error;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use teleplay_emulator::{Emulator, Transcript};
use teleplay_service::{
    DEFAULT_CONTROL_PORT, DEFAULT_SESSION_PORT, EmulationService, ServiceConfig,
};

/// Script-driven session emulator for testing line-oriented clients
#[derive(Debug, Parser)]
#[command(name = "teleplay", version)]
struct Args {
    /// Script file to replay
    script: Option<PathBuf>,

    /// Address both listeners bind on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Session (emulation) listener port
    #[arg(long, default_value_t = DEFAULT_SESSION_PORT)]
    port: u16,

    /// Control listener port
    #[arg(long, default_value_t = DEFAULT_CONTROL_PORT)]
    control_port: u16,

    /// Pump the script over stdin/stdout instead of serving TCP
    #[arg(long)]
    stdio: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let result = if args.stdio {
        run_stdio(&args)
    } else {
        run_service(args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("teleplay: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Run the emulation over stdin/stdout, no networking involved
fn run_stdio(args: &Args) -> Result<(), Box<dyn Error>> {
    let Some(path) = &args.script else {
        return Err("a script file is required with --stdio".into());
    };
    let data = std::fs::read_to_string(path)?;

    let mut emulator = Emulator::new(Arc::new(Transcript::new(&data)));
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    if let Some(chunk) = emulator.input(None)? {
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }

    while !emulator.eof() {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        match emulator.input(Some(line.trim_end()))? {
            Some(chunk) => {
                stdout.write_all(chunk.as_bytes())?;
                stdout.flush()?;
            }
            None => break,
        }
    }

    Ok(())
}

/// Bind and run the emulation service until Ctrl-C or a control-plane
/// shutdown
fn run_service(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = ServiceConfig::new()
        .with_host(args.host)
        .with_session_port(args.port)
        .with_control_port(args.control_port);
    if let Some(path) = &args.script {
        config = config.with_script(std::fs::read_to_string(path)?);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let service = EmulationService::bind(config).await?;
        tracing::info!(
            session = %service.session_addr(),
            control = %service.control_addr(),
            "teleplay ready"
        );

        let cancel = service.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });

        service.run().await?;
        Ok(())
    })
}
