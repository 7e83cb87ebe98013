// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use archetype_cli::commands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archetype")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Drives an archetype script to a project plan, or validates one statically", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script, prompting at the terminal for any undeclared input
    Run {
        /// Path to the entry script document (JSON)
        script: PathBuf,
    },
    /// Statically validate a script with no prompting
    Validate {
        /// Path to the entry script document (JSON)
        script: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run { script } => commands::run(&script),
        Commands::Validate { script } => commands::validate_script(&script),
    }
}
