//! `minerva`: CLI for the research-assistant bots.

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use minerva_bots::{Assistant, BotKind, CompletionClient, CompletionConfig};
use minerva_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider, HashedProvider};
use minerva_index::{BuildMode, IndexCache, IndexCacheConfig, IndexStatus};
use std::path::PathBuf;
use std::sync::Arc;

/// Research-assistant bots over a cached retrieval index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory for persisted indexes
    #[arg(long, default_value = ".minerva-cache")]
    cache_dir: PathBuf,

    /// Chat model on the OpenAI-compatible endpoint
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Source indexed when a command omits --source
    #[arg(long)]
    default_source: Option<String>,

    /// Use deterministic hashed embeddings and a canned completion
    /// backend; no network or model download
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build (or reuse) the index for a source
    Index {
        /// Raw text, a PDF path, or a URL
        source: String,
        /// Hand the build to the worker pool and wait on its handle
        #[arg(long)]
        background: bool,
    },
    /// Ask a bot a question
    Ask {
        /// One of: reviewer, analyst, conference, writer
        bot: BotKind,
        /// Question; bots with a default may omit it
        question: Option<String>,
        /// Source to answer against
        #[arg(short, long, default_value = "")]
        source: String,
    },
    /// Stream a bot's answer as bounded pieces
    Stream {
        bot: BotKind,
        question: Option<String>,
        #[arg(short, long, default_value = "")]
        source: String,
    },
    /// Show cache statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let provider: Arc<dyn EmbeddingProvider> = if args.offline {
        Arc::new(HashedProvider::default())
    } else {
        Arc::new(FastEmbedProvider::create(EmbedConfig::default()).await?)
    };

    let mut cache_config = IndexCacheConfig::new(&args.cache_dir);
    if let Some(default_source) = &args.default_source {
        cache_config = cache_config.with_default_source(default_source.clone());
    }
    let cache = IndexCache::new(cache_config, provider);

    let completion = if args.offline {
        CompletionClient::fixed("(offline mode: no completion service configured)")
    } else {
        let config = CompletionConfig::new(&args.model)
            .with_streaming(matches!(args.command, Commands::Stream { .. }))
            .with_api_base(std::env::var("OPENAI_BASE_URL").ok())
            .with_api_key(std::env::var("OPENAI_API_KEY").ok());
        CompletionClient::openai(config)
    };

    let assistant = Assistant::new(cache, completion);

    match args.command {
        Commands::Index { source, background } => {
            let key = assistant.cache().resolve_key(&source);
            let mode = if background {
                BuildMode::Background
            } else {
                BuildMode::Foreground
            };
            let status = assistant.cache().ensure_index(&source, mode).await?;
            println!("{}", status.describe(&key));

            // Exiting would kill the queued build; wait on its handle.
            if let IndexStatus::BuildStarted(mut handle) = status {
                let chunks = handle.wait().await?;
                println!("Indexed {chunks} chunks for {key}");
            }
        }
        Commands::Ask {
            bot,
            question,
            source,
        } => {
            let answer = assistant.answer(bot, &source, question.as_deref()).await?;
            println!("{answer}");
        }
        Commands::Stream {
            bot,
            question,
            source,
        } => {
            let mut pieces = assistant.stream(bot, &source, question.as_deref()).await?;
            while let Some(piece) = pieces.next().await {
                if piece.is_empty() {
                    break;
                }
                println!("{piece}");
            }
        }
        Commands::Stats => {
            let stats = assistant.cache().stats().await;
            println!(
                "cached indexes: {}\ntotal chunks: {}\nbuilds in flight: {}",
                stats.entries, stats.chunks, stats.builds_in_flight
            );
        }
    }

    Ok(())
}
