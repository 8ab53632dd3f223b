//! Memory monitor (component E).
//!
//! Periodically samples `info_memory` and exposes `used_memory /
//! total_system_memory * 100`, clamped to `[0, 100]`, behind a
//! `tokio::sync::RwLock`. Reads are cheap and infrequent enough that a
//! simple `RwLock<Option<f64>>` suffices under cooperative scheduling,
//! rather than the per-member `DialState` locking the script registry uses.

use crate::backend::Backend;
use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct MemoryMonitor {
    backend: Arc<dyn Backend>,
    percent: Arc<RwLock<Option<f64>>>,
    interval: Duration,
}

impl MemoryMonitor {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self::with_cell(backend, config, Arc::new(RwLock::new(None)))
    }

    /// Build a monitor that writes samples into an existing cell, so a
    /// caller (e.g. [`crate::Store`]) can read through its own handle
    /// without depending on the monitor outliving it.
    pub fn with_cell(
        backend: Arc<dyn Backend>,
        config: &Config,
        percent: Arc<RwLock<Option<f64>>>,
    ) -> Self {
        Self {
            backend,
            percent,
            interval: config.free_memory_check_interval,
        }
    }

    /// Shared handle other components (e.g. `Store`) can hold onto to read
    /// the latest sample without depending on the monitor itself.
    pub fn handle(&self) -> Arc<RwLock<Option<f64>>> {
        self.percent.clone()
    }

    /// Fetch and store one sample immediately, independent of the periodic
    /// schedule. Used by tests and by `spawn`'s loop body.
    pub async fn sample_once(&self) {
        let value = sample(self.backend.as_ref()).await;
        *self.percent.write().await = value;
    }

    /// Spawn the periodic sampling loop on the current tokio runtime.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.sample_once().await;
            }
        })
    }
}

pub(crate) async fn sample(backend: &dyn Backend) -> Option<f64> {
    let info = match backend.info_memory().await {
        Ok(info) => info,
        Err(err) => {
            tracing::warn!(%err, "memory info fetch failed, memory cell set to None");
            return None;
        }
    };

    let used: f64 = info.get("used_memory")?.parse().ok()?;
    let total: f64 = info.get("total_system_memory")?.parse().ok()?;
    if total == 0.0 {
        return None;
    }
    Some((used / total * 100.0).clamp(0.0, 100.0))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::{Backend, Reply};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeBackend {
        info: HashMap<String, String>,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn eval_script(&self, _: &str, _: &[&str], _: &[&str]) -> crate::Result<Reply> {
            unimplemented!()
        }
        async fn load_script(&self, _: &str) -> crate::Result<String> {
            unimplemented!()
        }
        async fn script_exists(&self, _: &str) -> crate::Result<bool> {
            unimplemented!()
        }
        async fn info_memory(&self) -> crate::Result<HashMap<String, String>> {
            Ok(self.info.clone())
        }
        async fn zcount(&self, _: &str, _: i64, _: i64) -> crate::Result<i64> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn computes_clamped_percentage() {
        let mut info = HashMap::new();
        info.insert("used_memory".to_string(), "50".to_string());
        info.insert("total_system_memory".to_string(), "100".to_string());
        let pct = sample(&FakeBackend { info }).await;
        assert_eq!(pct, Some(50.0));
    }

    #[tokio::test]
    async fn zero_total_yields_none() {
        let mut info = HashMap::new();
        info.insert("used_memory".to_string(), "50".to_string());
        info.insert("total_system_memory".to_string(), "0".to_string());
        let pct = sample(&FakeBackend { info }).await;
        assert_eq!(pct, None);
    }

    #[tokio::test]
    async fn missing_section_yields_none() {
        let pct = sample(&FakeBackend {
            info: HashMap::new(),
        })
        .await;
        assert_eq!(pct, None);
    }
}
