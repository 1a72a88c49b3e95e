// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lorekeeper - semantic memory for roleplay and worldbuilding bots.
//!
//! This is the binary entry point: memory CRUD, similarity search, frecency
//! maintenance, and diagnostics from the command line.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod doctor;
mod shutdown;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lorekeeper_core::types::{EntityId, MemoryId, MemoryScope};

/// Lorekeeper - semantic memory for roleplay and worldbuilding bots.
#[derive(Parser, Debug)]
#[command(name = "lorekeeper", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Scope selection shared by listing and search commands.
#[derive(Args, Debug, Clone)]
pub(crate) struct ScopeArgs {
    /// none, channel, guild, or global.
    #[arg(long, default_value = "global")]
    pub scope: MemoryScope,
    /// Channel id, required by `--scope channel`.
    #[arg(long)]
    pub channel: Option<String>,
    /// Guild id, required by `--scope guild`.
    #[arg(long)]
    pub guild: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Add a memory to an entity.
    Add {
        entity: EntityId,
        content: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        guild: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// List an entity's memories, most frecent first.
    List {
        entity: EntityId,
        #[command(flatten)]
        scope: ScopeArgs,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one memory.
    Get {
        id: MemoryId,
        #[arg(long)]
        json: bool,
    },
    /// Replace a memory's content (re-embeds it).
    Update { id: MemoryId, content: String },
    /// Delete a memory and its embedding.
    Remove { id: MemoryId },
    /// Score memories against queries without touching frecency.
    Search {
        entity: EntityId,
        #[arg(required = true)]
        queries: Vec<String>,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Retrieve relevant memories (boosts frecency) and print a context block.
    Retrieve {
        entity: EntityId,
        #[arg(required = true)]
        queries: Vec<String>,
        #[command(flatten)]
        scope: ScopeArgs,
        /// Entity name for the context block.
        #[arg(long, default_value = "entity")]
        name: String,
    },
    /// Apply one frecency decay pass to every memory.
    Decay,
    /// Delete memories below the frecency cleanup threshold.
    Cleanup,
    /// Run decay + cleanup on the configured interval until interrupted.
    Maintain,
    /// Check configuration, database, and model health.
    Doctor {
        /// Also load the model and embed a probe sentence.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => lorekeeper_config::load_and_validate_path(path),
        None => lorekeeper_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            lorekeeper_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.log_level);

    let result = match cli.command {
        Commands::Doctor { deep, plain } => doctor::run_doctor(&config, deep, plain).await,
        Commands::Config => commands::print_config(&config),
        command => commands::run(command, &config).await,
    };

    if let Err(e) = result {
        eprintln!("lorekeeper: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the config level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lorekeeper={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
