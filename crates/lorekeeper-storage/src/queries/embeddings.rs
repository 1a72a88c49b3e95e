// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding vector storage, keyed 1:1 by memory id.
//!
//! Vectors are written as little-endian f32 BLOBs. Readers also accept a JSON
//! array stored as TEXT, which is how vectors look when another tool writes
//! them natively; anything else is reported as a missing embedding.

use lorekeeper_core::LorekeeperError;
use rusqlite::types::ValueRef;
use rusqlite::{OptionalExtension, params};
use tracing::warn;

use crate::database::{Database, map_tr_err};
use crate::models::MemoryId;

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a little-endian f32 BLOB back to a vector.
///
/// Returns `None` when the byte length is not a positive multiple of four.
pub fn blob_to_vec(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Decode whatever the store returned for an embedding column.
pub fn decode_embedding(value: ValueRef<'_>) -> Option<Vec<f32>> {
    match value {
        ValueRef::Blob(bytes) => blob_to_vec(bytes),
        ValueRef::Text(text) => serde_json::from_slice::<Vec<f32>>(text)
            .ok()
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

/// Write (or overwrite) the embedding for a memory.
pub(crate) fn upsert_embedding(
    conn: &rusqlite::Connection,
    memory_id: MemoryId,
    embedding: &[f32],
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO memory_embeddings (memory_id, embedding, dimensions) VALUES (?1, ?2, ?3)
         ON CONFLICT(memory_id) DO UPDATE SET
             embedding = excluded.embedding,
             dimensions = excluded.dimensions,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![memory_id, vec_to_blob(embedding), embedding.len() as i64],
    )?;
    Ok(())
}

/// Get the embedding for one memory.
///
/// `Ok(None)` covers both "no row" and "row present but undecodable".
pub async fn get_embedding(
    db: &Database,
    memory_id: MemoryId,
) -> Result<Option<Vec<f32>>, LorekeeperError> {
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<rusqlite::types::Value>, rusqlite::Error> {
            conn.query_row(
                "SELECT embedding FROM memory_embeddings WHERE memory_id = ?1",
                params![memory_id],
                |row| row.get::<_, rusqlite::types::Value>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(raw.and_then(|value| {
        let decoded = decode_embedding(ValueRef::from(&value));
        if decoded.is_none() {
            warn!(memory_id, "stored embedding could not be decoded");
        }
        decoded
    }))
}

/// Get embeddings for many memories.
///
/// Memories without a row or with an undecodable row are omitted. Results
/// follow the order of `ids`.
pub async fn get_embeddings(
    db: &Database,
    ids: &[MemoryId],
) -> Result<Vec<(MemoryId, Vec<f32>)>, LorekeeperError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<(MemoryId, Vec<f32>)>, rusqlite::Error> {
            let mut stmt =
                conn.prepare_cached("SELECT embedding FROM memory_embeddings WHERE memory_id = ?1")?;
            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                let decoded = stmt
                    .query_row(params![id], |row| Ok(decode_embedding(row.get_ref(0)?)))
                    .optional()?;
                match decoded {
                    Some(Some(vector)) => found.push((id, vector)),
                    Some(None) => warn!(memory_id = id, "stored embedding could not be decoded"),
                    None => {}
                }
            }
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

/// Store or replace the embedding for an existing memory.
pub async fn put_embedding(
    db: &Database,
    memory_id: MemoryId,
    embedding: Vec<f32>,
) -> Result<(), LorekeeperError> {
    db.connection()
        .call(move |conn| upsert_embedding(conn, memory_id, &embedding))
        .await
        .map_err(map_tr_err)
}

/// Delete the embedding for a memory. Returns whether a row was removed.
pub async fn delete_embedding(db: &Database, memory_id: MemoryId) -> Result<bool, LorekeeperError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM memory_embeddings WHERE memory_id = ?1",
                params![memory_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMemory;
    use crate::queries::memories;

    #[test]
    fn vec_to_blob_roundtrip() {
        let original = vec![0.1_f32, 0.2, 0.3, -0.5, 1.0];
        let recovered = blob_to_vec(&vec_to_blob(&original)).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn vec_to_blob_384_dim() {
        let vec384: Vec<f32> = (0..384).map(|i| i as f32 / 384.0).collect();
        let blob = vec_to_blob(&vec384);
        assert_eq!(blob.len(), 384 * 4);
        assert_eq!(blob_to_vec(&blob).unwrap().len(), 384);
    }

    #[test]
    fn blob_with_ragged_length_is_rejected() {
        assert!(blob_to_vec(&[0, 0, 128]).is_none());
        assert!(blob_to_vec(&[]).is_none());
    }

    #[test]
    fn decode_accepts_json_text() {
        let decoded = decode_embedding(ValueRef::Text(b"[0.5, -0.25, 1.0]")).unwrap();
        assert_eq!(decoded, vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn decode_rejects_null_and_numbers() {
        assert!(decode_embedding(ValueRef::Null).is_none());
        assert!(decode_embedding(ValueRef::Integer(3)).is_none());
        assert!(decode_embedding(ValueRef::Text(b"not json")).is_none());
    }

    #[tokio::test]
    async fn text_embedding_rows_are_readable() {
        let db = Database::open_in_memory().await.unwrap();
        let memory = memories::insert_memory(&db, NewMemory::new(1, "fact"), vec![1.0, 0.0])
            .await
            .unwrap();
        let id = memory.id;
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE memory_embeddings SET embedding = '[0.0, 1.0]' WHERE memory_id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(get_embedding(&db, id).await.unwrap(), Some(vec![0.0, 1.0]));
    }

    #[tokio::test]
    async fn get_embeddings_skips_missing_rows() {
        let db = Database::open_in_memory().await.unwrap();
        let a = memories::insert_memory(&db, NewMemory::new(1, "a"), vec![1.0, 0.0])
            .await
            .unwrap();
        let b = memories::insert_memory(&db, NewMemory::new(1, "b"), vec![0.0, 1.0])
            .await
            .unwrap();
        assert!(delete_embedding(&db, a.id).await.unwrap());

        let found = get_embeddings(&db, &[a.id, b.id, 999]).await.unwrap();
        assert_eq!(found, vec![(b.id, vec![0.0, 1.0])]);
    }

    #[tokio::test]
    async fn put_embedding_replaces_existing_vector() {
        let db = Database::open_in_memory().await.unwrap();
        let m = memories::insert_memory(&db, NewMemory::new(1, "a"), vec![1.0, 0.0])
            .await
            .unwrap();
        put_embedding(&db, m.id, vec![0.6, 0.8]).await.unwrap();
        assert_eq!(get_embedding(&db, m.id).await.unwrap(), Some(vec![0.6, 0.8]));
    }
}
