// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! `ouroctl`: launches the supervisor (with self-exec restart), runs the
//! supervisor loop in-process, and issues owner commands against a
//! running supervisor's control socket.

mod client;
mod daemon;
mod launcher;
mod socket_ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ouro_wire::Query;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ouroctl", about = "Ouroboros supervisor launcher and control client")]
struct Cli {
    /// Directory holding settings.json, state, and the task queue.
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the supervisor under the restart-on-exit-42 launcher.
    Run,
    /// Internal: run the supervisor loop in this process (invoked by `run`).
    #[command(hide = true)]
    RunSupervisor,
    Status,
    Review,
    Evolve {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    Bg {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    Restart,
    Panic,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(true).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let code = launcher::run(&cli.data_dir)?;
            std::process::exit(code);
        }
        Commands::RunSupervisor => {
            let cfg = ouro_supervisor::config::load(cli.data_dir.clone());
            let runtime = tokio::runtime::Runtime::new()?;
            let code = runtime.block_on(daemon::run(cfg))?;
            std::process::exit(code);
        }
        Commands::Status => run_client_command(&cli.data_dir, Query::Status),
        Commands::Review => run_client_command(&cli.data_dir, Query::Review),
        Commands::Evolve { state } => run_client_command(&cli.data_dir, Query::Evolve { enabled: state == "on" }),
        Commands::Bg { state } => run_client_command(&cli.data_dir, Query::Bg { enabled: state == "on" }),
        Commands::Restart => run_client_command(&cli.data_dir, Query::Restart),
        Commands::Panic => run_client_command(&cli.data_dir, Query::Panic),
    }
}

fn run_client_command(data_dir: &std::path::Path, query: Query) -> Result<()> {
    let socket_path = ouro_core::Config { data_dir: data_dir.to_path_buf(), ..ouro_core::Config::default() }.control_socket_path();
    let runtime = tokio::runtime::Runtime::new()?;
    let response = runtime.block_on(client::send(&socket_path, query))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
