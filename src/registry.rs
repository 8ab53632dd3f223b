//! Script registry (component C).
//!
//! Owns the five Lua scripts by kind, tracks each one's content SHA, and
//! handles load-on-miss, recompile-on-log-level-change, and the bounded
//! `NOSCRIPT` retry loop. Mirrors the per-key locking style of
//! `gazette::router::Router`'s `DialState`: state is partitioned per
//! [`ScriptKind`] behind its own lock rather than one crate-wide mutex, so a
//! GET reload never blocks a concurrent PUT.

use crate::backend::Backend;
use crate::config::Config;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Marker substring identifying a debug-logging line that gets stripped from
/// a script's source when trace logging is disabled.
const LOG_MARKER: &str = "redis.log(redis.LOG_NOTICE,";

/// Placeholder in `cleanup.lua` substituted with `delete.lua`'s body.
const DELSCRIPT_PLACEHOLDER: &str = "--%(delscript)";

/// Marker suffix identifying a top-level `return` statement in `delete.lua`
/// that must be commented out when its body is spliced into `cleanup.lua`,
/// so that deleting one expired entry doesn't exit the whole sweep. Returns
/// inside `delete.lua`'s own local helper functions don't carry this marker
/// and are left untouched.
const TOPLEVEL_RETURN_MARKER: &str = "--%(toplevel)";

/// Process-wide flag mirroring the host application's configured log level.
/// The registry polls this once per operation and recompiles a script's
/// source whenever it no longer matches what was last loaded.
static TRACE_LOGGING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable the `redis.log(...)` lines embedded in the Lua scripts.
/// Call this whenever the host application's log level crosses the
/// trace/debug threshold; the next operation will recompile and reload the
/// affected scripts.
pub fn set_script_logging(enabled: bool) {
    TRACE_LOGGING_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn script_logging_enabled() -> bool {
    TRACE_LOGGING_ENABLED.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Get,
    Expand,
    Put,
    Delete,
    Cleanup,
}

impl ScriptKind {
    fn raw_source(self) -> &'static str {
        match self {
            ScriptKind::Get => include_str!("lua/get.lua"),
            ScriptKind::Expand => include_str!("lua/expand.lua"),
            ScriptKind::Put => include_str!("lua/put.lua"),
            ScriptKind::Delete => include_str!("lua/delete.lua"),
            ScriptKind::Cleanup => include_str!("lua/cleanup.lua"),
        }
    }
}

struct ScriptEntry {
    /// Fully composed source for the current `log_output` setting.
    source: String,
    sha: String,
    log_output: bool,
}

fn strip_debug_logging(source: &str, keep: bool) -> String {
    if keep {
        return source.to_string();
    }
    source
        .lines()
        .filter(|line| !line.contains(LOG_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comment out `delete.lua`'s top-level `return` statements so the spliced
/// copy inside `cleanup.lua` performs its side effects without exiting the
/// enclosing sweep loop early.
fn disable_toplevel_returns(delete_source: &str) -> String {
    delete_source
        .lines()
        .map(|line| {
            if line.contains(TOPLEVEL_RETURN_MARKER) {
                format!("-- {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn compose_cleanup_source(log_output: bool) -> String {
    let cleanup_base = strip_debug_logging(ScriptKind::Cleanup.raw_source(), log_output);
    let delete_body = disable_toplevel_returns(ScriptKind::Delete.raw_source());
    let delete_body = strip_debug_logging(&delete_body, log_output);
    cleanup_base.replacen(DELSCRIPT_PLACEHOLDER, &delete_body, 1)
}

fn compose_source(kind: ScriptKind, log_output: bool) -> String {
    match kind {
        ScriptKind::Cleanup => compose_cleanup_source(log_output),
        other => strip_debug_logging(other.raw_source(), log_output),
    }
}

fn sha1_hex(source: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct Registry {
    backend: Arc<dyn Backend>,
    retry_limit: u32,
    entries: HashMap<ScriptKind, RwLock<ScriptEntry>>,
}

impl Registry {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let log_output = script_logging_enabled();
        let mut entries = HashMap::new();
        for kind in [
            ScriptKind::Get,
            ScriptKind::Expand,
            ScriptKind::Put,
            ScriptKind::Delete,
            ScriptKind::Cleanup,
        ] {
            let source = compose_source(kind, log_output);
            let sha = sha1_hex(&source);
            entries.insert(
                kind,
                RwLock::new(ScriptEntry {
                    source,
                    sha,
                    log_output,
                }),
            );
        }
        Self {
            backend,
            retry_limit: config.script_retry_limit,
            entries,
        }
    }

    /// Best-effort eager registration of every script. Failures here are
    /// logged and otherwise ignored: registration is genuinely lazy, this
    /// just warms the cache so the first real request doesn't pay for it.
    pub async fn bootstrap(&self) {
        for kind in [
            ScriptKind::Get,
            ScriptKind::Expand,
            ScriptKind::Put,
            ScriptKind::Delete,
            ScriptKind::Cleanup,
        ] {
            if let Err(err) = self.load(kind).await {
                tracing::warn!(?kind, %err, "eager script registration failed, continuing lazily");
            }
        }
    }

    async fn ensure_current(&self, kind: ScriptKind) -> crate::Result<()> {
        let current = script_logging_enabled();
        {
            let entry = self.entries[&kind].read().await;
            if entry.log_output == current {
                return Ok(());
            }
        }
        let mut entry = self.entries[&kind].write().await;
        if entry.log_output == current {
            return Ok(()); // lost the race to another recompiler; already current.
        }
        let source = compose_source(kind, current);
        let sha = sha1_hex(&source);
        self.backend.load_script(&source).await?;
        entry.source = source;
        entry.sha = sha;
        entry.log_output = current;
        Ok(())
    }

    async fn load(&self, kind: ScriptKind) -> crate::Result<String> {
        let source = { self.entries[&kind].read().await.source.clone() };
        let backend_sha = self.backend.load_script(&source).await?;
        let mut entry = self.entries[&kind].write().await;
        if backend_sha != entry.sha {
            tracing::warn!(
                ?kind,
                local_sha = %entry.sha,
                backend_sha = %backend_sha,
                "backend script hash disagrees with locally computed SHA-1, adopting backend's"
            );
            entry.sha = backend_sha.clone();
        }
        Ok(backend_sha)
    }

    /// Invoke `kind`'s script, transparently reloading and retrying up to the
    /// configured bound if the backend reports the script missing.
    pub async fn eval(
        &self,
        kind: ScriptKind,
        keys: &[&str],
        args: &[&str],
    ) -> crate::Result<crate::backend::Reply> {
        self.ensure_current(kind).await?;

        for attempt in 0..=self.retry_limit {
            let sha = { self.entries[&kind].read().await.sha.clone() };

            match self.backend.eval_script(&sha, keys, args).await {
                Ok(reply) => return Ok(reply),
                Err(crate::Error::ScriptMissing) => {
                    tracing::debug!(?kind, attempt, "NOSCRIPT, reloading and retrying");
                    self.load(kind).await?;
                }
                Err(other) => return Err(other),
            }
        }

        Err(crate::Error::ScriptMissing)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_only_marked_logging_lines() {
        let source = "redis.call('X')\nredis.log(redis.LOG_NOTICE, 'hi')\nreturn 1";
        assert_eq!(
            strip_debug_logging(source, false),
            "redis.call('X')\nreturn 1"
        );
        assert_eq!(strip_debug_logging(source, true), source);
    }

    #[test]
    fn disables_only_toplevel_returns() {
        let source = "local function f()\n  return 1\nend\nreturn 'ok'  --%(toplevel)";
        let disabled = disable_toplevel_returns(source);
        assert!(disabled.contains("  return 1\n"));
        assert!(disabled.contains("-- return 'ok'  --%(toplevel)"));
    }

    #[test]
    fn cleanup_source_embeds_delete_body_without_toplevel_returns() {
        let composed = compose_cleanup_source(true);
        assert!(!composed.contains(DELSCRIPT_PLACEHOLDER));
        assert!(composed.contains("forget_resource"));
        assert!(!composed.contains("\nreturn 'notFound'  --%(toplevel)"));
    }

    #[test]
    fn sha1_hex_is_stable_and_matches_known_vector() {
        assert_eq!(
            sha1_hex(""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[tokio::test]
    async fn eval_loads_on_first_miss_and_succeeds() {
        use crate::tests::FakeBackend;

        let backend = Arc::new(FakeBackend::default());
        let registry = Registry::new(backend, &Config::default());

        // Nothing has been loaded into the fake backend yet, so the first
        // `eval` must hit `ScriptMissing`, reload, and retry successfully.
        let reply = registry.eval(ScriptKind::Get, &["p"], &[]).await.unwrap();
        assert_eq!(reply, crate::backend::Reply::Status("ok".to_string()));
    }
}
