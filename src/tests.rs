//! Shared test support: an in-memory fake [`crate::backend::Backend`] used
//! across the operation-engine unit tests, since there is no live backend
//! in this repo's test environment.

use crate::backend::{Backend, Reply};
use crate::compress::GzipCompressor;
use crate::config::Config;
use crate::Store;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeBackend {
    scripts: Mutex<HashMap<String, String>>,
    info: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Backend for FakeBackend {
    async fn eval_script(
        &self,
        sha: &str,
        _keys: &[&str],
        _args: &[&str],
    ) -> crate::Result<Reply> {
        if self.scripts.lock().unwrap().contains_key(sha) {
            Ok(Reply::Status("ok".to_string()))
        } else {
            Err(crate::Error::ScriptMissing)
        }
    }

    async fn load_script(&self, source: &str) -> crate::Result<String> {
        let sha = format!("{:x}", stub_hash(source));
        self.scripts
            .lock()
            .unwrap()
            .insert(sha.clone(), source.to_string());
        Ok(sha)
    }

    async fn script_exists(&self, sha: &str) -> crate::Result<bool> {
        Ok(self.scripts.lock().unwrap().contains_key(sha))
    }

    async fn info_memory(&self) -> crate::Result<HashMap<String, String>> {
        Ok(self.info.lock().unwrap().clone())
    }

    async fn zcount(&self, _key: &str, _min: i64, _max: i64) -> crate::Result<i64> {
        Ok(0)
    }
}

/// A cheap, deterministic stand-in content hash: tests never compare this
/// against a real backend's SHA-1, they only need load-then-evalsha to
/// agree with itself.
fn stub_hash(source: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn fake_store() -> Store<GzipCompressor> {
    Store::with_defaults(std::sync::Arc::new(FakeBackend::default()), Config::default())
}
