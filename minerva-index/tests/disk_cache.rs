//! End-to-end behavior of the on-disk index cache across cache instances.

use minerva_context::ChunkConfig;
use minerva_embed::HashedProvider;
use minerva_index::{BuildMode, IndexCache, IndexCacheConfig, IndexStatus, key_digest};
use std::sync::Arc;
use tempfile::tempdir;

fn cache_at(root: &std::path::Path) -> IndexCache {
    let config = IndexCacheConfig::new(root).with_chunk_config(ChunkConfig::new(120, 20));
    IndexCache::new(config, Arc::new(HashedProvider::new(64)))
}

const PAPER: &str = "Sparse retrieval relies on lexical overlap between query and document. \
    Dense retrieval instead embeds both into a shared vector space. \
    Hybrid systems combine the two signals and often outperform either alone.";

#[tokio::test]
async fn fresh_cache_reloads_persisted_index() {
    let root = tempdir().unwrap();

    // First process lifetime: build and persist.
    let built_chunks = {
        let cache = cache_at(root.path());
        let status = cache
            .ensure_index(PAPER, BuildMode::Foreground)
            .await
            .unwrap();
        let IndexStatus::Built { chunks } = status else {
            panic!("expected Built, got {status:?}");
        };
        cache.shutdown().await;
        chunks
    };
    assert!(built_chunks > 0);

    // Second lifetime: same root, cold map, warm disk.
    let cache = cache_at(root.path());
    let status = cache
        .ensure_index(PAPER, BuildMode::Foreground)
        .await
        .unwrap();
    match status {
        IndexStatus::LoadedFromDisk { chunks } => assert_eq!(chunks, built_chunks),
        other => panic!("expected LoadedFromDisk, got {other:?}"),
    }

    // And queries work against the reloaded index.
    let hits = cache.query(PAPER, "dense vector retrieval", None).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.len() <= 3);
    cache.shutdown().await;
}

#[tokio::test]
async fn corrupted_cache_directory_falls_back_to_rebuild() {
    let root = tempdir().unwrap();
    let key_dir = root.path().join(key_digest(PAPER));
    std::fs::create_dir_all(&key_dir).unwrap();
    std::fs::write(key_dir.join("index.db"), b"garbage, not sqlite").unwrap();

    let cache = cache_at(root.path());
    let status = cache
        .ensure_index(PAPER, BuildMode::Foreground)
        .await
        .unwrap();
    assert!(
        matches!(status, IndexStatus::Built { chunks } if chunks > 0),
        "corrupt dir must rebuild, got {status:?}"
    );
    cache.shutdown().await;
}

#[tokio::test]
async fn provider_dimension_change_invalidates_disk_cache() {
    let root = tempdir().unwrap();

    {
        let cache = cache_at(root.path());
        cache
            .ensure_index(PAPER, BuildMode::Foreground)
            .await
            .unwrap();
        cache.shutdown().await;
    }

    // Same root, different embedding dimension: the persisted index no
    // longer matches and must be rebuilt rather than loaded.
    let config = IndexCacheConfig::new(root.path()).with_chunk_config(ChunkConfig::new(120, 20));
    let cache = IndexCache::new(config, Arc::new(HashedProvider::new(32)));
    let status = cache
        .ensure_index(PAPER, BuildMode::Foreground)
        .await
        .unwrap();
    assert!(matches!(status, IndexStatus::Built { .. }));
    cache.shutdown().await;
}

#[tokio::test]
async fn default_slot_is_shared_and_empty_by_default() {
    let root = tempdir().unwrap();
    let cache = cache_at(root.path());

    let status = cache.ensure_index("", BuildMode::Foreground).await.unwrap();
    assert!(matches!(status, IndexStatus::Built { chunks: 0 }));

    let status = cache
        .ensure_index("   ", BuildMode::Foreground)
        .await
        .unwrap();
    assert!(matches!(status, IndexStatus::AlreadyIndexed));

    let hits = cache.query("", "anything at all", None).await.unwrap();
    assert!(hits.is_empty());
    cache.shutdown().await;
}

#[tokio::test]
async fn default_slot_can_carry_configured_content() {
    let root = tempdir().unwrap();
    let config = IndexCacheConfig::new(root.path())
        .with_chunk_config(ChunkConfig::new(120, 20))
        .with_default_source("Minerva is a research assistant toolkit built around a cached vector index.");
    let cache = IndexCache::new(config, Arc::new(HashedProvider::new(64)));

    let status = cache.ensure_index("", BuildMode::Foreground).await.unwrap();
    assert!(matches!(status, IndexStatus::Built { chunks } if chunks > 0));

    let hits = cache
        .query("", "what is minerva", None)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].text.contains("research assistant"));
    cache.shutdown().await;
}
