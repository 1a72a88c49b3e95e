// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for MemoryStore against an in-memory database.

use lorekeeper_core::LorekeeperError;
use lorekeeper_core::types::{MemoryScope, MemorySource};
use lorekeeper_memory::{FrecencyPolicy, MemoryStore, ScopeFilter};
use lorekeeper_storage::queries::{embeddings, memories};
use lorekeeper_test_utils::{MOCK_DIM, MockEmbedder, TestHarness};

#[tokio::test]
async fn add_embeds_and_persists() {
    let h = TestHarness::new().await.unwrap();
    let m = h
        .store
        .add_memory(5, "Alice loves tea", MemorySource::default())
        .await
        .unwrap();

    assert_eq!(m.entity_id, 5);
    assert!((m.frecency - 1.0).abs() < f64::EPSILON);
    let stored = embeddings::get_embedding(&h.db, m.id).await.unwrap().unwrap();
    assert_eq!(stored, h.embedder.vector_for("Alice loves tea"));
    assert_eq!(h.store.get_memory(m.id).await.unwrap(), Some(m));
}

#[tokio::test]
async fn add_with_failing_encoder_writes_nothing() {
    let h = TestHarness::new().await.unwrap();
    h.embedder.set_failing(true);

    let err = h
        .store
        .add_memory(1, "lost", MemorySource::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LorekeeperError::Embedding { .. }));
    assert_eq!(h.store.count_for_entity(1).await.unwrap(), 0);
}

#[tokio::test]
async fn update_reembeds_content() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["Alice loves tea"]).await.unwrap().remove(0);

    let updated = h.store.update_memory(m.id, "Alice loves coffee").await.unwrap();
    assert_eq!(updated.content, "Alice loves coffee");
    let stored = embeddings::get_embedding(&h.db, m.id).await.unwrap().unwrap();
    assert_eq!(stored, h.embedder.vector_for("Alice loves coffee"));
}

#[tokio::test]
async fn failed_update_keeps_content_and_embedding_in_step() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["Alice loves tea"]).await.unwrap().remove(0);

    h.embedder.set_failing(true);
    assert!(h.store.update_memory(m.id, "Alice loves coffee").await.is_err());

    let current = h.store.get_memory(m.id).await.unwrap().unwrap();
    assert_eq!(current.content, "Alice loves tea");
    let stored = embeddings::get_embedding(&h.db, m.id).await.unwrap().unwrap();
    assert_eq!(stored, h.embedder.vector_for("Alice loves tea"));
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let h = TestHarness::new().await.unwrap();
    let err = h.store.update_memory(404, "x").await.unwrap_err();
    assert!(matches!(err, LorekeeperError::MemoryNotFound { id: 404 }));
    assert_eq!(h.embedder.call_count(), 0);
}

#[tokio::test]
async fn update_and_remove_by_content() {
    let h = TestHarness::new().await.unwrap();
    h.seed(1, &["Bob hates rain", "Alice loves tea"]).await.unwrap();

    let updated = h
        .store
        .update_memory_by_content(1, "Bob hates rain", "Bob tolerates rain")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.content, "Bob tolerates rain");
    assert!(
        h.store
            .update_memory_by_content(1, "no such memory", "x")
            .await
            .unwrap()
            .is_none()
    );

    assert!(h.store.remove_memory_by_content(1, "Alice loves tea").await.unwrap());
    assert!(!h.store.remove_memory_by_content(1, "Alice loves tea").await.unwrap());
    assert_eq!(h.store.count_for_entity(1).await.unwrap(), 1);
}

#[tokio::test]
async fn remove_leaves_no_orphaned_embedding() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["gone soon"]).await.unwrap().remove(0);

    assert!(h.store.remove_memory(m.id).await.unwrap());
    assert!(embeddings::get_embedding(&h.db, m.id).await.unwrap().is_none());
    assert!(h.store.get_memory(m.id).await.unwrap().is_none());
}

#[tokio::test]
async fn set_memories_replaces_whole_set() {
    let h = TestHarness::builder().with_batch_size(2).build().await.unwrap();
    let old = h.seed(1, &["old one", "old two"]).await.unwrap();
    h.seed(2, &["someone else"]).await.unwrap();

    let contents: Vec<String> = ["new a", "new b", "new c"].iter().map(|s| s.to_string()).collect();
    let replaced = h.store.set_memories(1, &contents).await.unwrap();

    assert_eq!(replaced.len(), 3);
    let listed: Vec<String> = h
        .store
        .get_memories_for_entity(1)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(listed.len(), 3);
    assert!(listed.contains(&"new b".to_string()));
    for m in old {
        assert!(embeddings::get_embedding(&h.db, m.id).await.unwrap().is_none());
    }
    assert_eq!(h.store.count_for_entity(2).await.unwrap(), 1);
}

#[tokio::test]
async fn set_memories_with_failing_encoder_keeps_old_set() {
    let h = TestHarness::new().await.unwrap();
    h.seed(1, &["keep me"]).await.unwrap();
    h.embedder.set_failing(true);

    assert!(h.store.set_memories(1, &["replacement".to_string()]).await.is_err());
    let listed = h.store.get_memories_for_entity(1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "keep me");
}

#[tokio::test]
async fn scoped_listing_follows_source_refs() {
    let h = TestHarness::new().await.unwrap();
    let tagged = h
        .store
        .add_memory(
            1,
            "said in c1",
            MemorySource::channel("c1", Some("g1".to_string())),
        )
        .await
        .unwrap();
    h.seed(1, &["untagged"]).await.unwrap();

    let ids = |list: Vec<lorekeeper_core::Memory>| {
        list.into_iter().map(|m| m.id).collect::<Vec<_>>()
    };

    let c1 = h.store.list_scoped(1, &ScopeFilter::channel("c1")).await.unwrap();
    assert_eq!(ids(c1), vec![tagged.id]);
    assert!(h.store.list_scoped(1, &ScopeFilter::channel("c2")).await.unwrap().is_empty());
    assert_eq!(h.store.list_scoped(1, &ScopeFilter::guild("g1")).await.unwrap().len(), 1);
    assert_eq!(h.store.list_scoped(1, &ScopeFilter::global()).await.unwrap().len(), 2);

    assert!(h.store.list_scoped(1, &ScopeFilter::none()).await.unwrap().is_empty());
    let channel_without_id = ScopeFilter::new(MemoryScope::Channel, None, Some("g1".into()));
    assert!(h.store.list_scoped(1, &channel_without_id).await.unwrap().is_empty());
    let guild_without_id = ScopeFilter::new(MemoryScope::Guild, Some("c1".into()), None);
    assert!(h.store.list_scoped(1, &guild_without_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn boost_decay_and_cleanup() {
    let h = TestHarness::new().await.unwrap();
    let added = h.seed(1, &["hot", "cold"]).await.unwrap();
    let (hot, cold) = (&added[0], &added[1]);

    assert!(h.store.boost_frecency(hot.id).await.unwrap());
    assert!((h.frecency(hot.id).await.unwrap().unwrap() - 1.05).abs() < 1e-12);

    assert_eq!(h.store.decay_all_frecency().await.unwrap(), 2);
    assert!((h.frecency(cold.id).await.unwrap().unwrap() - 0.99).abs() < 1e-12);

    memories::set_frecency(&h.db, cold.id, 0.005).await.unwrap();
    assert_eq!(h.store.cleanup_low_frecency().await.unwrap(), 1);
    assert!(h.store.get_memory(cold.id).await.unwrap().is_none());
    assert!(embeddings::get_embedding(&h.db, cold.id).await.unwrap().is_none());
    assert!(h.store.get_memory(hot.id).await.unwrap().is_some());
}

#[tokio::test]
async fn repeated_boosts_approach_two() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["popular"]).await.unwrap().remove(0);
    memories::set_frecency(&h.db, m.id, 0.0).await.unwrap();

    for _ in 0..200 {
        h.store.boost_frecency(m.id).await.unwrap();
    }
    let f = h.frecency(m.id).await.unwrap().unwrap();
    assert!(f <= 2.0);
    assert!(f > 1.99);
}

#[tokio::test]
async fn concurrent_boosts_are_not_lost() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["contended"]).await.unwrap().remove(0);
    memories::set_frecency(&h.db, m.id, 0.0).await.unwrap();

    // With retention 1.0 each boost adds exactly `boost`, so the total is
    // order-independent and any lost update would show.
    let store = std::sync::Arc::new(
        MemoryStore::new(h.db.clone(), h.embedder.clone(), MOCK_DIM).with_policy(
            FrecencyPolicy {
                retention: 1.0,
                ..Default::default()
            },
        ),
    );
    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.boost_frecency(m.id).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    let f = h.frecency(m.id).await.unwrap().unwrap();
    assert!((f - 2.0).abs() < 1e-9, "got {f}");
}

#[tokio::test]
async fn remove_all_for_entity() {
    let h = TestHarness::new().await.unwrap();
    h.seed(1, &["a", "b"]).await.unwrap();
    h.seed(2, &["c"]).await.unwrap();

    assert_eq!(h.store.remove_all_for_entity(1).await.unwrap(), 2);
    assert_eq!(h.store.count_for_entity(1).await.unwrap(), 0);
    assert_eq!(h.store.count_for_entity(2).await.unwrap(), 1);
}

#[tokio::test]
async fn encoder_of_the_wrong_width_cannot_write() {
    let h = TestHarness::builder()
        .with_embedder(MockEmbedder::new(5))
        .with_dimensions(384)
        .build()
        .await
        .unwrap();

    let err = h
        .store
        .add_memory(1, "Alice loves tea", MemorySource::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LorekeeperError::DimensionMismatch {
            expected: 384,
            actual: 5
        }
    ));
    assert!(
        h.store
            .set_memories(1, &["Bob hates rain".to_string()])
            .await
            .is_err()
    );
    assert_eq!(h.store.count_for_entity(1).await.unwrap(), 0);
}

#[tokio::test]
async fn mis_sized_vector_leaves_existing_memories_untouched() {
    let h = TestHarness::new().await.unwrap();
    let m = h.seed(1, &["Alice loves tea"]).await.unwrap().remove(0);
    h.embedder.set_fixed("short vector", vec![1.0, 0.0, 0.0, 0.0, 0.0]);

    let err = h.store.update_memory(m.id, "short vector").await.unwrap_err();
    assert!(matches!(
        err,
        LorekeeperError::DimensionMismatch {
            expected: MOCK_DIM,
            actual: 5
        }
    ));
    let current = h.store.get_memory(m.id).await.unwrap().unwrap();
    assert_eq!(current.content, "Alice loves tea");

    let contents = vec!["fine".to_string(), "short vector".to_string()];
    assert!(h.store.set_memories(1, &contents).await.is_err());
    let listed = h.store.get_memories_for_entity(1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, m.id);
}

#[tokio::test]
async fn one_decay_pass_pushes_borderline_memory_into_cleanup() {
    let h = TestHarness::new().await.unwrap();
    let added = h.seed(1, &["fading", "lingering"]).await.unwrap();
    let (fading, lingering) = (&added[0], &added[1]);
    // 0.0101 * 0.99 < 0.01 <= 0.0102 * 0.99
    memories::set_frecency(&h.db, fading.id, 0.0101).await.unwrap();
    memories::set_frecency(&h.db, lingering.id, 0.0102).await.unwrap();

    assert_eq!(h.store.cleanup_low_frecency().await.unwrap(), 0);
    h.store.decay_all_frecency().await.unwrap();
    assert_eq!(h.store.cleanup_low_frecency().await.unwrap(), 1);

    assert!(h.store.get_memory(fading.id).await.unwrap().is_none());
    assert!(embeddings::get_embedding(&h.db, fading.id).await.unwrap().is_none());
    assert!(h.store.get_memory(lingering.id).await.unwrap().is_some());
}

#[tokio::test]
async fn boost_many_applies_one_step_to_each() {
    let h = TestHarness::new().await.unwrap();
    let added = h.seed(1, &["a", "b", "c"]).await.unwrap();

    let boosted = h.store.boost_frecency_many(&[added[0].id, added[2].id]).await.unwrap();
    assert_eq!(boosted, 2);
    assert!((h.frecency(added[0].id).await.unwrap().unwrap() - 1.05).abs() < 1e-12);
    assert!((h.frecency(added[1].id).await.unwrap().unwrap() - 1.0).abs() < 1e-12);
    assert!((h.frecency(added[2].id).await.unwrap().unwrap() - 1.05).abs() < 1e-12);
}
