//! Link checker for gateways.
//!
//! Connects, logs in, runs the requested number of connectivity checks and
//! shuts the link down again.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use gatewire::{CommandHandle, ConnectivityCheck, Engine, LinkConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let config = LinkConfig {
        host: cli.host,
        port: cli.port,
        password: cli.password,
        command_timeout_secs: cli.timeout,
        keepalive_minutes: cli.keepalive,
        max_queue_depth: cli.queue_depth,
    };

    let engine = match Engine::connect(&config).await {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("could not open link to {}: {error}", config.address());
            return ExitCode::FAILURE;
        }
    };

    let mut failures = 0u32;
    for attempt in 1..=cli.checks {
        let check = CommandHandle::new(ConnectivityCheck::new());
        match engine.execute(&check, None).await {
            Ok(()) => {
                let state = check.command().gateway_state();
                println!("check {attempt}: ok (gateway state {state:?})");
            }
            Err(error) => {
                failures += 1;
                println!("check {attempt}: {error}");
            }
        }
    }

    engine.shutdown().await;
    if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
