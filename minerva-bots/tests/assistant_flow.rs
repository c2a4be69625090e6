//! End-to-end assistant flows with hermetic backends: hashed embeddings and
//! a fixed-reply completion service.

use futures::StreamExt;
use minerva_bots::{Assistant, AssistantConfig, BotKind, CompletionClient};
use minerva_context::ChunkConfig;
use minerva_embed::HashedProvider;
use minerva_index::{IndexCache, IndexCacheConfig};
use std::sync::Arc;
use tempfile::tempdir;

const PAPER: &str = "We present a cache for vector indexes keyed by source string. \
    Rebuilding embeddings for an unchanged source wastes minutes of compute. \
    Our cache reuses in-memory indexes and falls back to a disk serialization.";

fn assistant_with_reply(root: &std::path::Path, reply: &str) -> Assistant {
    let config = IndexCacheConfig::new(root).with_chunk_config(ChunkConfig::new(120, 20));
    let cache = IndexCache::new(config, Arc::new(HashedProvider::new(64)));
    Assistant::with_config(
        cache,
        CompletionClient::fixed(reply),
        AssistantConfig::default().with_stream_max_chars(60),
    )
}

#[tokio::test]
async fn ensure_index_reports_built_then_already_indexed() {
    let dir = tempdir().unwrap();
    let assistant = assistant_with_reply(dir.path(), "unused");

    let first = assistant.ensure_index(PAPER, false).await.unwrap();
    assert!(first.starts_with("Indexed "), "got: {first}");

    let second = assistant.ensure_index(PAPER, false).await.unwrap();
    assert!(second.starts_with("Already indexed source:"), "got: {second}");
}

#[tokio::test]
async fn background_ensure_reports_started() {
    let dir = tempdir().unwrap();
    let assistant = assistant_with_reply(dir.path(), "unused");

    let status = assistant.ensure_index(PAPER, true).await.unwrap();
    assert!(status.starts_with("Indexing started for"), "got: {status}");
}

#[tokio::test]
async fn reviewer_answer_is_normalized_into_headings() {
    let dir = tempdir().unwrap();
    let assistant = assistant_with_reply(
        dir.path(),
        "Strengths: clear caching design\nWeaknesses: racy background builds",
    );

    let answer = assistant
        .answer(BotKind::Reviewer, PAPER, None)
        .await
        .unwrap();

    assert!(answer.contains("## Strengths\nclear caching design"));
    assert!(answer.contains("## Weaknesses\nracy background builds"));
    assert!(answer.contains("## Title Assessment"));
}

#[tokio::test]
async fn conference_answer_gets_summary_heading() {
    let dir = tempdir().unwrap();
    let assistant = assistant_with_reply(
        dir.path(),
        "The cache avoids rebuild work.\nIt keeps indexes in memory.\nDisk is a fallback.",
    );

    let answer = assistant
        .answer(BotKind::Conference, PAPER, Some("What does the cache do?"))
        .await
        .unwrap();

    assert!(answer.starts_with("### Summary\nThe cache avoids rebuild work."));
    assert!(answer.contains("\n\nIt keeps indexes in memory."));
}

#[tokio::test]
async fn stream_pieces_are_bounded_and_end_with_marker() {
    let dir = tempdir().unwrap();
    let reply: String = (0..15).map(|_| "A short sentence for streaming. ").collect();
    let assistant = assistant_with_reply(dir.path(), &reply);

    let pieces: Vec<String> = assistant
        .stream(BotKind::Analyst, PAPER, Some("Summarize."))
        .await
        .unwrap()
        .collect()
        .await;

    assert!(pieces.len() > 2);
    assert_eq!(pieces.last().unwrap(), "");
    for piece in &pieces[..pieces.len() - 1] {
        assert!(!piece.is_empty());
        assert!(piece.len() <= 60, "piece too long: {piece:?}");
    }
}

#[tokio::test]
async fn missing_question_surfaces_as_error() {
    let dir = tempdir().unwrap();
    let assistant = assistant_with_reply(dir.path(), "unused");

    let result = assistant.answer(BotKind::Conference, PAPER, None).await;
    assert!(result.is_err());
}
