//! A hierarchical resource store layered atop a remote key-value backend
//! that supports server-side scripted execution, projecting filesystem-like
//! paths (`/a/b/c`) onto a flat backend keyspace and performing every
//! read-modify-write as an atomic script. See each module for the
//! component it implements.

pub mod backend;
pub mod compress;
pub mod config;
mod coroutine;
pub mod memory;
mod ops;
pub mod path;
pub mod registry;
pub mod result;
pub mod stream;
#[cfg(test)]
mod tests;

use backend::Backend;
use compress::{Compressor, GzipCompressor};
use config::Config;
use memory::MemoryMonitor;
use registry::Registry;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use ops::{DeleteOptions, PutOptions};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("script missing after exhausting retries")]
    ScriptMissing,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    Protocol(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The store's immutable handle: script registry, backend client, and
/// config, passed to each operation with no back-references — mirroring
/// how `gazette::router::Router` and `gazette::journal::Client` are plain
/// value handles rather than objects holding a callback into the caller.
pub struct Store<C: Compressor = GzipCompressor> {
    pub(crate) config: Config,
    pub(crate) registry: Arc<Registry>,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) compressor: C,
    memory: Arc<RwLock<Option<f64>>>,
}

impl<C: Compressor> Store<C> {
    pub fn new(backend: Arc<dyn Backend>, config: Config, compressor: C) -> Self {
        let registry = Arc::new(Registry::new(backend.clone(), &config));
        Self {
            config,
            registry,
            backend,
            compressor,
            memory: Arc::new(RwLock::new(None)),
        }
    }

    /// Best-effort eager registration of every script; see
    /// [`Registry::bootstrap`].
    pub async fn bootstrap(&self) {
        self.registry.bootstrap().await;
    }

    /// Latest memory-usage sample as a percentage, or `None` if no sample
    /// has succeeded yet.
    pub async fn memory_percent(&self) -> Option<f64> {
        *self.memory.read().await
    }

    /// Fetch one memory sample immediately, outside the periodic schedule.
    pub async fn sample_memory(&self) {
        let value = memory::sample(self.backend.as_ref()).await;
        *self.memory.write().await = value;
    }

    /// Build a periodic [`MemoryMonitor`] that writes into this store's own
    /// memory cell, so `monitor.spawn()` keeps `memory_percent()` current.
    pub fn memory_monitor(&self) -> MemoryMonitor {
        MemoryMonitor::with_cell(self.backend.clone(), &self.config, self.memory.clone())
    }
}

impl Store<GzipCompressor> {
    pub fn with_defaults(backend: Arc<dyn Backend>, config: Config) -> Self {
        Self::new(backend, config, GzipCompressor)
    }
}
