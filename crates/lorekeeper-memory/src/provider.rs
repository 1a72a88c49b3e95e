// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazily loaded embedding provider with single-flight initialization.
//!
//! The first `embed` call starts the loader. Callers that arrive while the
//! load is in flight await the same shared future, so the model is loaded at
//! most once per attempt. A failed load fails every waiter and every later
//! call until [`LazyEmbedder::retry`] is invoked.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared, try_join_all};
use tracing::{info, warn};

use lorekeeper_config::model::EmbeddingConfig;
use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::traits::adapter::PluginAdapter;
use lorekeeper_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

use crate::embedder::OnnxEmbedder;

type LoadResult = Result<Arc<dyn EmbeddingAdapter>, LorekeeperError>;
type SharedLoad = Shared<BoxFuture<'static, Result<Arc<dyn EmbeddingAdapter>, String>>>;
type Loader = Box<dyn Fn() -> BoxFuture<'static, LoadResult> + Send + Sync>;

enum InitState {
    Idle,
    Loading { attempt: usize, load: SharedLoad },
    Ready(Arc<dyn EmbeddingAdapter>),
    Failed(String),
}

/// An [`EmbeddingAdapter`] that loads its inner encoder on first use.
pub struct LazyEmbedder {
    name: String,
    loader: Loader,
    state: Mutex<InitState>,
    attempts: AtomicUsize,
}

impl LazyEmbedder {
    /// Wrap an async loader. It runs once per load attempt.
    pub fn new<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(move || loader().boxed()),
            state: Mutex::new(InitState::Idle),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Lazily load the ONNX encoder described by `config` on a blocking thread.
    pub fn onnx(config: EmbeddingConfig) -> Self {
        Self::new("lazy-onnx-embedder", move || {
            let config = config.clone();
            async move {
                let embedder = tokio::task::spawn_blocking(move || OnnxEmbedder::load(&config))
                    .await
                    .map_err(|e| {
                        LorekeeperError::Internal(format!("model load task failed: {e}"))
                    })??;
                Ok(Arc::new(embedder) as Arc<dyn EmbeddingAdapter>)
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, InitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the inner encoder has finished loading.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock(), InitState::Ready(_))
    }

    /// Number of load attempts started so far.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Clear a failed load so the next call tries again.
    ///
    /// Has no effect unless the last attempt failed.
    pub fn retry(&self) {
        let mut state = self.lock();
        if matches!(*state, InitState::Failed(_)) {
            *state = InitState::Idle;
        }
    }

    /// Get the loaded encoder, loading it if needed.
    pub async fn get(&self) -> Result<Arc<dyn EmbeddingAdapter>, LorekeeperError> {
        let (attempt, load) = {
            let mut state = self.lock();
            match &*state {
                InitState::Ready(inner) => return Ok(Arc::clone(inner)),
                InitState::Failed(message) => {
                    return Err(LorekeeperError::embedding(format!(
                        "encoder unavailable: {message}"
                    )));
                }
                InitState::Loading { attempt, load } => (*attempt, load.clone()),
                InitState::Idle => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(adapter = %self.name, attempt, "loading embedding model");
                    let load = (self.loader)()
                        .map(|result| result.map_err(|e| e.to_string()))
                        .boxed()
                        .shared();
                    *state = InitState::Loading {
                        attempt,
                        load: load.clone(),
                    };
                    (attempt, load)
                }
            }
        };

        let outcome = load.await;

        let mut state = self.lock();
        let current = matches!(&*state, InitState::Loading { attempt: a, .. } if *a == attempt);
        match outcome {
            Ok(inner) => {
                if current {
                    info!(adapter = %self.name, "embedding model ready");
                    *state = InitState::Ready(Arc::clone(&inner));
                }
                Ok(inner)
            }
            Err(message) => {
                if current {
                    warn!(adapter = %self.name, error = %message, "embedding model failed to load");
                    *state = InitState::Failed(message.clone());
                }
                Err(LorekeeperError::embedding(format!(
                    "encoder failed to load: {message}"
                )))
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for LazyEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeeperError> {
        let inner = match &*self.lock() {
            InitState::Ready(inner) => Arc::clone(inner),
            InitState::Idle => return Ok(HealthStatus::Degraded("model not loaded".into())),
            InitState::Loading { .. } => return Ok(HealthStatus::Degraded("model loading".into())),
            InitState::Failed(message) => return Ok(HealthStatus::Unhealthy(message.clone())),
        };
        inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), LorekeeperError> {
        let inner = match &*self.lock() {
            InitState::Ready(inner) => Arc::clone(inner),
            _ => return Ok(()),
        };
        inner.shutdown().await
    }
}

#[async_trait]
impl EmbeddingAdapter for LazyEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LorekeeperError> {
        self.get().await?.embed(input).await
    }
}

/// Embed `texts` in chunks of `batch_size`.
///
/// Texts inside a chunk are submitted concurrently; chunks run one after
/// another so at most `batch_size` requests are outstanding. Output order
/// matches input order. Any failure fails the whole call.
pub async fn embed_in_chunks(
    embedder: &dyn EmbeddingAdapter,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, LorekeeperError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let embedded = try_join_all(chunk.iter().map(|text| embedder.embed_one(text))).await?;
        vectors.extend(embedded);
    }
    Ok(vectors)
}
