// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory record CRUD, scoped listing, and frecency statements.
//!
//! Every write that touches both a record and its embedding runs inside one
//! transaction. Deletions always remove the embedding row first, so an
//! embedding can never outlive its memory.

use lorekeeper_core::LorekeeperError;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{EntityId, Memory, MemoryId, MemorySource, NewMemory};
use crate::queries::embeddings::upsert_embedding;

const SELECT_MEMORY: &str = "SELECT id, entity_id, content, source_message_id, source_channel_id, source_guild_id, frecency, created_at, updated_at FROM memories";

/// Default listing order: most frecent first, newest first among equals.
const ORDER_BY_RANK: &str = "ORDER BY frecency DESC, created_at DESC, id DESC";

fn row_to_memory(row: &Row<'_>) -> Result<Memory, rusqlite::Error> {
    Ok(Memory {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        content: row.get(2)?,
        source: MemorySource {
            message_id: row.get(3)?,
            channel_id: row.get(4)?,
            guild_id: row.get(5)?,
        },
        frecency: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn insert_row(
    conn: &rusqlite::Connection,
    memory: &NewMemory,
    embedding: &[f32],
) -> Result<Memory, rusqlite::Error> {
    conn.execute(
        "INSERT INTO memories (entity_id, content, source_message_id, source_channel_id, source_guild_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            memory.entity_id,
            memory.content,
            memory.source.message_id,
            memory.source.channel_id,
            memory.source.guild_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    upsert_embedding(conn, id, embedding)?;
    conn.query_row(
        &format!("{SELECT_MEMORY} WHERE id = ?1"),
        params![id],
        row_to_memory,
    )
}

fn delete_row(conn: &rusqlite::Connection, id: MemoryId) -> Result<bool, rusqlite::Error> {
    conn.execute(
        "DELETE FROM memory_embeddings WHERE memory_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

fn query_memories(
    conn: &rusqlite::Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Memory>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, row_to_memory)?;
    rows.collect()
}

/// Insert a memory together with its embedding.
pub async fn insert_memory(
    db: &Database,
    memory: NewMemory,
    embedding: Vec<f32>,
) -> Result<Memory, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<Memory, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = insert_row(&tx, &memory, &embedding)?;
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a memory by id.
pub async fn get_memory(db: &Database, id: MemoryId) -> Result<Option<Memory>, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                &format!("{SELECT_MEMORY} WHERE id = ?1"),
                params![id],
                row_to_memory,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Find an entity's memory whose content matches exactly.
///
/// When several rows share the content, the oldest one is returned.
pub async fn find_by_content(
    db: &Database,
    entity_id: EntityId,
    content: &str,
) -> Result<Option<Memory>, LorekeeperError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                &format!("{SELECT_MEMORY} WHERE entity_id = ?1 AND content = ?2 ORDER BY id ASC LIMIT 1"),
                params![entity_id, content],
                row_to_memory,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List every memory owned by an entity in rank order.
pub async fn list_for_entity(
    db: &Database,
    entity_id: EntityId,
) -> Result<Vec<Memory>, LorekeeperError> {
    db.connection()
        .call(move |conn| {
            query_memories(
                conn,
                &format!("{SELECT_MEMORY} WHERE entity_id = ?1 {ORDER_BY_RANK}"),
                params![entity_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// List an entity's memories sourced from one channel, in rank order.
pub async fn list_for_channel(
    db: &Database,
    entity_id: EntityId,
    channel_id: &str,
) -> Result<Vec<Memory>, LorekeeperError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            query_memories(
                conn,
                &format!("{SELECT_MEMORY} WHERE entity_id = ?1 AND source_channel_id = ?2 {ORDER_BY_RANK}"),
                params![entity_id, channel_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// List an entity's memories sourced from one guild, in rank order.
pub async fn list_for_guild(
    db: &Database,
    entity_id: EntityId,
    guild_id: &str,
) -> Result<Vec<Memory>, LorekeeperError> {
    let guild_id = guild_id.to_string();
    db.connection()
        .call(move |conn| {
            query_memories(
                conn,
                &format!("{SELECT_MEMORY} WHERE entity_id = ?1 AND source_guild_id = ?2 {ORDER_BY_RANK}"),
                params![entity_id, guild_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Count an entity's memories.
pub async fn count_for_entity(
    db: &Database,
    entity_id: EntityId,
) -> Result<usize, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE entity_id = ?1",
                params![entity_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a memory's content and embedding in one transaction.
///
/// Returns the updated memory, or `None` if the id does not exist (in which
/// case nothing is written).
pub async fn update_content(
    db: &Database,
    id: MemoryId,
    content: String,
    embedding: Vec<f32>,
) -> Result<Option<Memory>, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let n = tx.execute(
                "UPDATE memories SET content = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
                params![content, id],
            )?;
            if n == 0 {
                return Ok(None);
            }
            upsert_embedding(&tx, id, &embedding)?;
            let updated = tx.query_row(
                &format!("{SELECT_MEMORY} WHERE id = ?1"),
                params![id],
                row_to_memory,
            )?;
            tx.commit()?;
            Ok(Some(updated))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a memory and its embedding. Returns whether the memory existed.
pub async fn delete_memory(db: &Database, id: MemoryId) -> Result<bool, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let existed = delete_row(&tx, id)?;
            tx.commit()?;
            Ok(existed)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every memory (and embedding) owned by an entity.
pub async fn delete_for_entity(
    db: &Database,
    entity_id: EntityId,
) -> Result<usize, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM memory_embeddings WHERE memory_id IN (SELECT id FROM memories WHERE entity_id = ?1)",
                params![entity_id],
            )?;
            let n = tx.execute("DELETE FROM memories WHERE entity_id = ?1", params![entity_id])?;
            tx.commit()?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically replace all of an entity's memories with a new set.
///
/// Every entry must already carry its embedding; the old set is cleared and
/// the new one inserted in a single transaction.
pub async fn replace_for_entity(
    db: &Database,
    entity_id: EntityId,
    memories: Vec<(NewMemory, Vec<f32>)>,
) -> Result<Vec<Memory>, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Memory>, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM memory_embeddings WHERE memory_id IN (SELECT id FROM memories WHERE entity_id = ?1)",
                params![entity_id],
            )?;
            tx.execute("DELETE FROM memories WHERE entity_id = ?1", params![entity_id])?;
            let mut inserted = Vec::with_capacity(memories.len());
            for (memory, embedding) in &memories {
                inserted.push(insert_row(&tx, memory, embedding)?);
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// Boost one memory's frecency: `frecency = frecency * retention + boost`.
///
/// A single UPDATE, so concurrent boosts of the same memory never lose an
/// increment. Returns whether the memory exists.
pub async fn boost_frecency(
    db: &Database,
    id: MemoryId,
    retention: f64,
    boost: f64,
) -> Result<bool, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE memories SET frecency = frecency * ?1 + ?2 WHERE id = ?3",
                params![retention, boost, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Boost several memories in one transaction. Returns how many existed.
///
/// Either every listed memory is boosted or, on error, none is.
pub async fn boost_frecency_many(
    db: &Database,
    ids: Vec<MemoryId>,
    retention: f64,
    boost: f64,
) -> Result<usize, LorekeeperError> {
    if ids.is_empty() {
        return Ok(0);
    }
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut touched = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE memories SET frecency = frecency * ?1 + ?2 WHERE id = ?3",
                )?;
                for id in &ids {
                    touched += stmt.execute(params![retention, boost, id])?;
                }
            }
            tx.commit()?;
            Ok(touched)
        })
        .await
        .map_err(map_tr_err)
}

/// Multiply every memory's frecency by `factor`. Returns rows touched.
pub async fn decay_all(db: &Database, factor: f64) -> Result<usize, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("UPDATE memories SET frecency = frecency * ?1", params![factor])
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every memory whose frecency is below `threshold`, embeddings first.
pub async fn delete_below_frecency(
    db: &Database,
    threshold: f64,
) -> Result<usize, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM memory_embeddings WHERE memory_id IN (SELECT id FROM memories WHERE frecency < ?1)",
                params![threshold],
            )?;
            let n = tx.execute("DELETE FROM memories WHERE frecency < ?1", params![threshold])?;
            tx.commit()?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite a memory's frecency. Used by imports and tests.
pub async fn set_frecency(
    db: &Database,
    id: MemoryId,
    frecency: f64,
) -> Result<bool, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE memories SET frecency = ?1 WHERE id = ?2",
                params![frecency, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}
