//! Desktop host that drives the engine from stdin, standing in for the
//! mobile runtime's toggle button and app-state callbacks.

pub mod sim;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::EngineConfig,
    models::AppExecutionState,
    notify::{LogPresenter, OnlineIndicator},
    platform::{HostLifecycle, SystemClock},
    EngineParts,
};

use sim::SimulatedLocationProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Online,
    Offline,
    Lifecycle(AppExecutionState),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "online" => Some(Command::Online),
        "offline" => Some(Command::Offline),
        "status" => Some(Command::Status),
        "quit" | "exit" => Some(Command::Quit),
        other => other.parse().ok().map(Command::Lifecycle),
    }
}

pub async fn run_simulated(config: EngineConfig) -> Result<()> {
    let lifecycle = HostLifecycle::new();
    let parts = EngineParts {
        provider: Arc::new(SimulatedLocationProvider::new(config.simulated_origin)),
        lifecycle: Arc::new(lifecycle.clone()),
        indicator: OnlineIndicator::new(Arc::new(LogPresenter)),
        clock: Arc::new(SystemClock),
    };

    let monitor = crate::build_monitor(&config, parts).await?;
    monitor.start().await?;

    info!("Commands: online | offline | active | inactive | background | status | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(Command::Online) => {
                if !monitor.set_online(true).await {
                    warn!("Location permission denied; tracking disabled");
                }
            }
            Some(Command::Offline) => {
                monitor.set_online(false).await;
            }
            Some(Command::Lifecycle(state)) => lifecycle.notify(state),
            Some(Command::Status) => {
                let status = monitor.status().await;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            Some(Command::Quit) => break,
            None => warn!("Unknown command '{}'", line.trim()),
        }
    }

    monitor.shutdown().await;
    info!("Genie presence engine stopped");
    Ok(())
}
