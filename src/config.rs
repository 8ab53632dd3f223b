use std::time::Duration;

/// `MAX_EXPIRE_IN_MILLIS` is the sentinel `expire_at` meaning "never expires".
pub const MAX_EXPIRE_IN_MILLIS: i64 = 9_999_999_999_999;

/// Number of expired entries a single CLEANUP script invocation is allowed to delete.
pub const CLEANUP_BULK_SIZE: i64 = 200;

/// Number of times an operation will reload and retry after a `ScriptMissing` reply.
pub const SCRIPT_RETRY_LIMIT: u32 = 10;

/// Backend key prefixes and tunables, all independently overridable.
///
/// This is a plain value struct, not a config-file loader: reading these values
/// from disk, the environment, or a remote config service is an external
/// collaborator's job, not this crate's.
#[derive(Clone, Debug)]
pub struct Config {
    pub resources_prefix: String,
    pub collections_prefix: String,
    pub expirable_prefix: String,
    pub delta_resources_prefix: String,
    pub delta_etags_prefix: String,
    pub lock_prefix: String,
    pub max_expire_millis: i64,
    pub cleanup_bulk_size: i64,
    pub script_retry_limit: u32,
    pub free_memory_check_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resources_prefix: "rest-storage:resources:".to_string(),
            collections_prefix: "rest-storage:collections:".to_string(),
            expirable_prefix: "rest-storage:expirable".to_string(),
            delta_resources_prefix: "rest-storage:delta:resources:".to_string(),
            delta_etags_prefix: "rest-storage:delta:etags:".to_string(),
            lock_prefix: "rest-storage:locks:".to_string(),
            max_expire_millis: MAX_EXPIRE_IN_MILLIS,
            cleanup_bulk_size: CLEANUP_BULK_SIZE,
            script_retry_limit: SCRIPT_RETRY_LIMIT,
            free_memory_check_interval: Duration::from_secs(60),
        }
    }
}
