//! Backend client facade (component B).
//!
//! The operation engine and script registry only ever talk to a `Backend`.
//! Nothing above this module inspects a raw `redis::Value` or `redis::RedisError`:
//! `RedisBackend` translates at the boundary, the way `gazette::journal::Client`
//! keeps `tonic::Status` from leaking past `check_ok`.

use async_trait::async_trait;
use std::collections::HashMap;

/// A backend script reply, decoded just enough to be script-shape-agnostic.
///
/// Operation decoders (`src/ops/*.rs`) pattern-match on this to recover the
/// `["TYPE_RESOURCE", ...]` / `["TYPE_COLLECTION", ...]` shapes the Lua
/// scripts return.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Int(i64),
    Status(String),
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn as_bulk_str(&self) -> Option<&str> {
        match self {
            Reply::Bulk(b) => std::str::from_utf8(b).ok(),
            Reply::Status(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// The narrow async capability set the rest of the crate requires of a backend.
///
/// The core does not assume a specific protocol framing; it only requires
/// these five capabilities and that `eval_script` be atomic with respect to
/// other operations on the same backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Invoke a preloaded script by content hash. Returns `Error::ScriptMissing`
    /// when the backend reports the script is not cached (`NOSCRIPT`).
    async fn eval_script(
        &self,
        sha: &str,
        keys: &[&str],
        args: &[&str],
    ) -> crate::Result<Reply>;

    /// Register script source with the backend; returns its content hash.
    async fn load_script(&self, source: &str) -> crate::Result<String>;

    /// Whether the backend currently has `sha` cached.
    async fn script_exists(&self, sha: &str) -> crate::Result<bool>;

    /// Backend `INFO` output for the `memory` section, as raw key/value pairs.
    async fn info_memory(&self) -> crate::Result<HashMap<String, String>>;

    /// Count members of an ordered set with score in `[min, max]`.
    async fn zcount(&self, key: &str, min: i64, max: i64) -> crate::Result<i64>;
}

/// Redis-backed implementation of [`Backend`], built on `redis`'s async
/// connection manager so callers get transparent reconnection without
/// managing a connection pool themselves.
pub struct RedisBackend {
    manager: redis::aio::ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(addr: &str) -> crate::Result<Self> {
        let client = redis::Client::open(addr)
            .map_err(|err| crate::Error::Backend(err.to_string()))?;
        let manager = client
            .get_tokio_connection_manager()
            .await
            .map_err(|err| crate::Error::Backend(err.to_string()))?;
        Ok(Self { manager })
    }
}

fn into_reply(value: redis::Value) -> Reply {
    match value {
        redis::Value::Nil => Reply::Nil,
        redis::Value::Int(n) => Reply::Int(n),
        redis::Value::Status(s) => Reply::Status(s),
        redis::Value::Okay => Reply::Status("OK".to_string()),
        redis::Value::Data(bytes) => Reply::Bulk(bytes),
        redis::Value::Bulk(items) => Reply::Array(items.into_iter().map(into_reply).collect()),
    }
}

fn classify_err(err: redis::RedisError) -> crate::Error {
    if err.kind() == redis::ErrorKind::NoScriptError {
        crate::Error::ScriptMissing
    } else {
        crate::Error::Backend(err.to_string())
    }
}

#[async_trait]
impl Backend for RedisBackend {
    #[tracing::instrument(level = "trace", skip(self, args))]
    async fn eval_script(
        &self,
        sha: &str,
        keys: &[&str],
        args: &[&str],
    ) -> crate::Result<Reply> {
        let mut cmd = redis::cmd("EVALSHA");
        cmd.arg(sha).arg(keys.len());
        for key in keys {
            cmd.arg(*key);
        }
        for arg in args {
            cmd.arg(*arg);
        }

        let mut conn = self.manager.clone();
        let value: redis::Value = cmd.query_async(&mut conn).await.map_err(classify_err)?;
        Ok(into_reply(value))
    }

    async fn load_script(&self, source: &str) -> crate::Result<String> {
        let mut conn = self.manager.clone();
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(source)
            .query_async(&mut conn)
            .await
            .map_err(classify_err)?;
        Ok(sha)
    }

    async fn script_exists(&self, sha: &str) -> crate::Result<bool> {
        let mut conn = self.manager.clone();
        let exists: Vec<bool> = redis::cmd("SCRIPT")
            .arg("EXISTS")
            .arg(sha)
            .query_async(&mut conn)
            .await
            .map_err(classify_err)?;
        Ok(exists.first().copied().unwrap_or(false))
    }

    async fn info_memory(&self) -> crate::Result<HashMap<String, String>> {
        let mut conn = self.manager.clone();
        let raw: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(classify_err)?;
        Ok(parse_info(&raw))
    }

    async fn zcount(&self, key: &str, min: i64, max: i64) -> crate::Result<i64> {
        let mut conn = self.manager.clone();
        let count: i64 = redis::cmd("ZCOUNT")
            .arg(key)
            .arg(min)
            .arg(max)
            .query_async(&mut conn)
            .await
            .map_err(classify_err)?;
        Ok(count)
    }
}

fn parse_info(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.trim_end_matches('\r').to_string()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_info_section() {
        let raw = "# Memory\r\nused_memory:12345\r\nused_memory_human:12.06K\r\n";
        let parsed = parse_info(raw);
        assert_eq!(parsed.get("used_memory"), Some(&"12345".to_string()));
        assert_eq!(parsed.get("used_memory_human"), Some(&"12.06K".to_string()));
        assert!(!parsed.contains_key("Memory"));
    }
}
