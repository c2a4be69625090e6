//! The index cache: in-memory map, disk fallback, and background builds.
//!
//! [`IndexCache`] is an explicit object with its own lifecycle: construct
//! it once, inject it into whatever serves requests, call
//! [`IndexCache::shutdown`] when done. All shared state lives behind one
//! `RwLock`; there is no ambient global.
//!
//! ## Lookup order
//!
//! 1. in-memory map; a hit returns immediately with no I/O
//! 2. cache directory on disk; a valid serialization repopulates the map
//! 3. full build: load, chunk, embed, persist (best-effort), insert
//!
//! ## Background builds
//!
//! Step 3 can be handed to a bounded pool of worker tasks. The caller gets
//! a [`BuildHandle`] back and can poll or await it; build failures land in
//! the handle instead of vanishing with a worker. The guarded state also
//! tracks builds in flight, so a second request for the same key joins the
//! existing build rather than spawning a duplicate.

use crate::error::{IndexError, Result};
use crate::loader::DocumentLoader;
use crate::source::{DEFAULT_KEY, Source, key_digest};
use crate::store;
use crate::vector_index::{ScoredChunk, VectorIndex};
use minerva_context::ChunkConfig;
use minerva_embed::EmbeddingProvider;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, info, warn};

/// Configuration for an [`IndexCache`].
#[derive(Debug, Clone)]
pub struct IndexCacheConfig {
    /// Root directory for persisted indexes; one subdirectory per key digest.
    pub cache_root: PathBuf,
    /// Chunking profile for raw text (URL text drops the overlap).
    pub chunk: ChunkConfig,
    /// Default number of chunks returned by a query.
    pub top_k: usize,
    /// Number of background build workers.
    pub build_workers: usize,
    /// Content indexed for requests that arrive without a source. Empty
    /// means the default slot indexes nothing and queries against it return
    /// no context.
    pub default_source: String,
}

impl IndexCacheConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            chunk: ChunkConfig::default(),
            top_k: 3,
            build_workers: 2,
            default_source: String::new(),
        }
    }

    pub fn with_chunk_config(mut self, chunk: ChunkConfig) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_build_workers(mut self, workers: usize) -> Self {
        self.build_workers = workers.max(1);
        self
    }

    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }
}

/// Whether `ensure_index` blocks for the build or hands it to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Foreground,
    Background,
}

/// Observable state of one build.
#[derive(Debug, Clone)]
pub enum BuildState {
    Pending,
    Completed { chunks: usize },
    Failed { message: String },
}

/// Handle to a build in flight. Cloneable; every clone observes the same
/// build.
#[derive(Debug, Clone)]
pub struct BuildHandle {
    key: String,
    state: watch::Receiver<BuildState>,
}

impl BuildHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current state, without waiting.
    pub fn state(&self) -> BuildState {
        self.state.borrow().clone()
    }

    /// Wait for the build to finish; returns the chunk count on success.
    pub async fn wait(&mut self) -> Result<usize> {
        loop {
            let current = self.state.borrow().clone();
            match current {
                BuildState::Completed { chunks } => return Ok(chunks),
                BuildState::Failed { message } => {
                    return Err(IndexError::BackgroundBuild {
                        key: self.key.clone(),
                        message,
                    });
                }
                BuildState::Pending => {
                    if self.state.changed().await.is_err() {
                        return Err(IndexError::BackgroundBuild {
                            key: self.key.clone(),
                            message: "build worker exited before completing".to_string(),
                        });
                    }
                }
            }
        }
    }
}

/// Outcome of [`IndexCache::ensure_index`].
#[derive(Debug, Clone)]
pub enum IndexStatus {
    /// The key was already in the in-memory cache.
    AlreadyIndexed,
    /// A valid serialization was found on disk and reloaded.
    LoadedFromDisk { chunks: usize },
    /// A fresh index was built synchronously.
    Built { chunks: usize },
    /// A background build was started (or joined); poll the handle.
    BuildStarted(BuildHandle),
}

impl IndexStatus {
    /// Human-readable one-liner for callers that report status as text.
    pub fn describe(&self, key: &str) -> String {
        match self {
            IndexStatus::AlreadyIndexed => format!("Already indexed source: {key}"),
            IndexStatus::LoadedFromDisk { chunks } => {
                format!("Loaded cached index with {chunks} chunks for {key}")
            }
            IndexStatus::Built { chunks } => format!("Indexed {chunks} chunks for {key}"),
            IndexStatus::BuildStarted(_) => format!("Indexing started for {key}"),
        }
    }
}

/// Counters reported by [`IndexCache::stats`].
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub chunks: usize,
    pub builds_in_flight: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<VectorIndex>>,
    in_flight: HashMap<String, BuildHandle>,
}

struct CacheInner {
    config: IndexCacheConfig,
    provider: Arc<dyn EmbeddingProvider>,
    loader: DocumentLoader,
    state: RwLock<CacheState>,
}

struct BuildJob {
    key: String,
    source: Source,
    done: watch::Sender<BuildState>,
}

enum Claim {
    Joined(BuildHandle),
    Owner {
        sender: watch::Sender<BuildState>,
        handle: BuildHandle,
    },
}

/// Maps source keys to ready-to-query vector indexes.
pub struct IndexCache {
    inner: Arc<CacheInner>,
    build_tx: mpsc::UnboundedSender<BuildJob>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl IndexCache {
    pub fn new(config: IndexCacheConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        let loader = DocumentLoader::new(config.chunk.clone());
        let worker_count = config.build_workers.max(1);
        let inner = Arc::new(CacheInner {
            config,
            provider,
            loader,
            state: RwLock::new(CacheState::default()),
        });

        let (build_tx, build_rx) = mpsc::unbounded_channel();
        let build_rx = Arc::new(Mutex::new(build_rx));

        let workers = (0..worker_count)
            .map(|worker_id| {
                let inner = Arc::clone(&inner);
                let build_rx = Arc::clone(&build_rx);
                tokio::spawn(worker_loop(inner, build_rx, worker_id))
            })
            .collect();

        Self {
            inner,
            build_tx,
            workers,
        }
    }

    /// The cache key an input string resolves to. Blank input collapses to
    /// the shared default slot.
    pub fn resolve_key(&self, input: &str) -> String {
        self.inner.resolve(input).0
    }

    /// Make sure an index exists for `input`, building one if necessary.
    ///
    /// See the module docs for the lookup order. In background mode the
    /// call returns as soon as the build is queued; the caller polls the
    /// returned handle or simply calls again later.
    pub async fn ensure_index(&self, input: &str, mode: BuildMode) -> Result<IndexStatus> {
        let (key, source) = self.inner.resolve(input);

        if self.inner.state.read().await.entries.contains_key(&key) {
            return Ok(IndexStatus::AlreadyIndexed);
        }

        if let Some(index) = self.inner.try_load_from_disk(&key).await {
            let chunks = index.chunk_count();
            let mut state = self.inner.state.write().await;
            state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(index));
            info!(%key, chunks, "loaded index from disk cache");
            return Ok(IndexStatus::LoadedFromDisk { chunks });
        }

        // Claim the build, or join one that is already running.
        let claim = {
            let mut state = self.inner.state.write().await;
            if state.entries.contains_key(&key) {
                return Ok(IndexStatus::AlreadyIndexed);
            }
            if let Some(handle) = state.in_flight.get(&key) {
                Claim::Joined(handle.clone())
            } else {
                let (sender, receiver) = watch::channel(BuildState::Pending);
                let handle = BuildHandle {
                    key: key.clone(),
                    state: receiver,
                };
                state.in_flight.insert(key.clone(), handle.clone());
                Claim::Owner { sender, handle }
            }
        };

        match (mode, claim) {
            (BuildMode::Background, Claim::Joined(handle)) => {
                debug!(%key, "joining build already in flight");
                Ok(IndexStatus::BuildStarted(handle))
            }
            (BuildMode::Foreground, Claim::Joined(mut handle)) => {
                debug!(%key, "waiting for build already in flight");
                let chunks = handle.wait().await?;
                Ok(IndexStatus::Built { chunks })
            }
            (BuildMode::Background, Claim::Owner { sender, handle }) => {
                let job = BuildJob {
                    key: key.clone(),
                    source,
                    done: sender,
                };
                if self.build_tx.send(job).is_err() {
                    self.inner.state.write().await.in_flight.remove(&key);
                    return Err(IndexError::Shutdown);
                }
                info!(%key, "queued background index build");
                Ok(IndexStatus::BuildStarted(handle))
            }
            (BuildMode::Foreground, Claim::Owner { sender, .. }) => {
                match self.inner.build_and_register(&key, &source).await {
                    Ok(chunks) => {
                        let _ = sender.send(BuildState::Completed { chunks });
                        Ok(IndexStatus::Built { chunks })
                    }
                    Err(error) => {
                        self.inner.state.write().await.in_flight.remove(&key);
                        let _ = sender.send(BuildState::Failed {
                            message: error.to_string(),
                        });
                        Err(error)
                    }
                }
            }
        }
    }

    /// Top-`k` chunks for `question` against the index for `input`,
    /// building the index synchronously first when it is not cached.
    pub async fn query(
        &self,
        input: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<Vec<ScoredChunk>> {
        let (key, _) = self.inner.resolve(input);

        let index = match self.inner.state.read().await.entries.get(&key).cloned() {
            Some(index) => index,
            None => {
                self.ensure_index(input, BuildMode::Foreground).await?;
                self.inner
                    .state
                    .read()
                    .await
                    .entries
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| IndexError::BackgroundBuild {
                        key: key.clone(),
                        message: "index missing after build".to_string(),
                    })?
            }
        };

        let query_embedding = self.inner.provider.embed_text(question).await?;
        Ok(index.search(&query_embedding, k.unwrap_or(self.inner.config.top_k)))
    }

    /// Handle to the build in flight for `input`, if any.
    pub async fn build_handle(&self, input: &str) -> Option<BuildHandle> {
        let key = self.resolve_key(input);
        self.inner.state.read().await.in_flight.get(&key).cloned()
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            chunks: state.entries.values().map(|i| i.chunk_count()).sum(),
            builds_in_flight: state.in_flight.len(),
        }
    }

    /// Stop the worker pool and wait for it to drain. Queued builds still
    /// complete; new background requests fail with [`IndexError::Shutdown`].
    pub async fn shutdown(mut self) {
        drop(self.build_tx);
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        debug!("index cache shut down");
    }
}

impl CacheInner {
    /// Resolve an input string to its cache key and classified source.
    fn resolve(&self, input: &str) -> (String, Source) {
        if input.trim().is_empty() {
            (
                DEFAULT_KEY.to_string(),
                Source::classify(&self.config.default_source),
            )
        } else {
            let source = Source::classify(input);
            (source.key(), source)
        }
    }

    fn cache_dir(&self, key: &str) -> PathBuf {
        self.config.cache_root.join(key_digest(key))
    }

    async fn try_load_from_disk(&self, key: &str) -> Option<VectorIndex> {
        let dir = self.cache_dir(key);
        if !dir.exists() {
            return None;
        }
        match store::load(&dir, key, self.provider.dimension()).await {
            Ok(index) => Some(index),
            Err(error) => {
                warn!(key, %error, "persisted index unusable, rebuilding");
                None
            }
        }
    }

    /// The expensive path: load, chunk, embed, persist, insert.
    async fn build_and_register(&self, key: &str, source: &Source) -> Result<usize> {
        info!(key, kind = source.kind_name(), "building index");

        let chunks = self.loader.load(key, source).await?;
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embedded = self.provider.embed_texts(&texts).await?;

        let index = VectorIndex::from_parts(
            key,
            self.provider.provider_name(),
            self.provider.dimension(),
            chunks,
            embedded.embeddings,
        );
        let chunk_count = index.chunk_count();

        // Persistence is best-effort; the in-memory copy is authoritative
        // for this process either way.
        let dir = self.cache_dir(key);
        if let Err(error) = store::save(&dir, &index).await {
            warn!(key, %error, "failed to persist index");
        }

        let mut state = self.state.write().await;
        state.in_flight.remove(key);
        state.entries.insert(key.to_string(), Arc::new(index));

        info!(key, chunk_count, "index ready");
        Ok(chunk_count)
    }
}

async fn worker_loop(
    inner: Arc<CacheInner>,
    build_rx: Arc<Mutex<mpsc::UnboundedReceiver<BuildJob>>>,
    worker_id: usize,
) {
    loop {
        let job = { build_rx.lock().await.recv().await };
        let Some(job) = job else {
            debug!(worker_id, "build worker stopping");
            break;
        };

        debug!(worker_id, key = %job.key, "starting background build");
        match inner.build_and_register(&job.key, &job.source).await {
            Ok(chunks) => {
                let _ = job.done.send(BuildState::Completed { chunks });
            }
            Err(error) => {
                warn!(worker_id, key = %job.key, %error, "background build failed");
                inner.state.write().await.in_flight.remove(&job.key);
                let _ = job.done.send(BuildState::Failed {
                    message: error.to_string(),
                });
            }
        }
    }
}
