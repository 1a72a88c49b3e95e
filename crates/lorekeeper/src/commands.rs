// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory subcommands.
//!
//! Each command renders its output to a `String` so the formatting can be
//! tested without a terminal; `run` prints it.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use lorekeeper_config::model::LorekeeperConfig;
use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::types::{Memory, MemorySource};
use lorekeeper_memory::{
    EmbeddingCache, FrecencyMaintenance, FrecencyPolicy, LazyEmbedder, MemoryRetriever,
    MemoryStore, ScopeFilter, format_memories_for_context,
};
use lorekeeper_storage::Database;

use crate::{Commands, ScopeArgs};

/// The wired memory stack a command runs against.
pub struct Engine {
    pub store: Arc<MemoryStore>,
    pub retriever: Arc<MemoryRetriever>,
    maintenance_interval: Duration,
}

impl Engine {
    /// Open the configured database with a lazily loaded ONNX encoder.
    pub async fn open(config: &LorekeeperConfig) -> Result<Self, LorekeeperError> {
        let db = Database::open_with_config(&config.storage).await?;
        let embedder = Arc::new(LazyEmbedder::onnx(config.embedding.clone()));
        Ok(Self::assemble(config, Arc::new(db), embedder))
    }

    pub fn assemble(
        config: &LorekeeperConfig,
        db: Arc<Database>,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Self {
        let store = Arc::new(
            MemoryStore::new(db, embedder, config.embedding.dimensions)
                .with_policy(FrecencyPolicy::from_config(&config.memory))
                .with_batch_size(config.embedding.batch_size),
        );
        let cache = Arc::new(EmbeddingCache::from_config(&config.memory));
        let retriever = Arc::new(MemoryRetriever::new(
            Arc::clone(&store),
            cache,
            config.memory.similarity_threshold,
        ));
        Self {
            store,
            retriever,
            maintenance_interval: Duration::from_secs(config.memory.maintenance_interval_secs),
        }
    }
}

impl From<ScopeArgs> for ScopeFilter {
    fn from(args: ScopeArgs) -> Self {
        ScopeFilter::new(args.scope, args.channel, args.guild)
    }
}

fn memory_line(memory: &Memory) -> String {
    format!(
        "{:>6}  {:>6.3}  {}",
        memory.id, memory.frecency, memory.content
    )
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, LorekeeperError> {
    serde_json::to_string_pretty(value).map_err(|e| LorekeeperError::Internal(e.to_string()))
}

/// Execute a memory command and return what it prints.
pub async fn execute(engine: &Engine, command: Commands) -> Result<String, LorekeeperError> {
    let store = &engine.store;
    match command {
        Commands::Add {
            entity,
            content,
            channel,
            guild,
            message,
        } => {
            let source = MemorySource {
                message_id: message,
                channel_id: channel,
                guild_id: guild,
            };
            let memory = store.add_memory(entity, &content, source).await?;
            Ok(format!("added memory {}", memory.id))
        }
        Commands::List {
            entity,
            scope,
            json,
        } => {
            let memories = store.list_scoped(entity, &scope.into()).await?;
            if json {
                return to_json(&memories);
            }
            if memories.is_empty() {
                return Ok(format!("no memories for entity {entity}"));
            }
            Ok(memories.iter().map(memory_line).collect::<Vec<_>>().join("\n"))
        }
        Commands::Get { id, json } => {
            let memory = store
                .get_memory(id)
                .await?
                .ok_or(LorekeeperError::MemoryNotFound { id })?;
            if json {
                to_json(&memory)
            } else {
                Ok(memory_line(&memory))
            }
        }
        Commands::Update { id, content } => {
            let memory = store.update_memory(id, &content).await?;
            Ok(format!("updated memory {}", memory.id))
        }
        Commands::Remove { id } => {
            if store.remove_memory(id).await? {
                Ok(format!("removed memory {id}"))
            } else {
                Err(LorekeeperError::MemoryNotFound { id })
            }
        }
        Commands::Search {
            entity,
            queries,
            scope,
        } => {
            let scored = engine
                .retriever
                .search_memories_by_similarity(entity, &queries, &scope.into())
                .await?;
            if scored.is_empty() {
                return Ok("no memories above the similarity threshold".to_string());
            }
            Ok(scored
                .iter()
                .map(|s| format!("{:.4}  {}", s.similarity, memory_line(&s.memory)))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Commands::Retrieve {
            entity,
            queries,
            scope,
            name,
        } => {
            let memories = engine
                .retriever
                .retrieve_relevant_memories(entity, &queries, &scope.into())
                .await?;
            Ok(format_memories_for_context(&name, entity, &memories))
        }
        Commands::Decay => {
            let decayed = store.decay_all_frecency().await?;
            Ok(format!("decayed {decayed} memories"))
        }
        Commands::Cleanup => {
            let removed = store.cleanup_low_frecency().await?;
            Ok(format!("removed {removed} memories"))
        }
        Commands::Maintain | Commands::Doctor { .. } | Commands::Config => Err(
            LorekeeperError::Internal("command is not a one-shot memory command".to_string()),
        ),
    }
}

/// Run a memory command against the configured database.
pub async fn run(command: Commands, config: &LorekeeperConfig) -> Result<(), LorekeeperError> {
    let engine = Engine::open(config).await?;

    if let Commands::Maintain = command {
        let cancel = crate::shutdown::install_signal_handler();
        let maintenance =
            FrecencyMaintenance::new(Arc::clone(&engine.store), engine.maintenance_interval);
        maintenance.run(cancel).await;
        info!("maintenance stopped");
        return Ok(());
    }

    let output = execute(&engine, command).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Print the effective configuration.
pub fn print_config(config: &LorekeeperConfig) -> Result<(), LorekeeperError> {
    let rendered =
        toml::to_string_pretty(config).map_err(|e| LorekeeperError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}
