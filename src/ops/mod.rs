//! Operation engine (component D).
//!
//! Each submodule implements one of the five operations as an argument
//! marshaller over [`crate::registry::Registry`], with result decoding.
//! They're all `impl<C: Compressor> Store<C>` blocks split one-file-per-operation,
//! the way `gazette::journal` splits `append`/`read`/`list` into their own
//! files against one `Client`.

mod cleanup;
mod delete;
mod expand;
mod get;
mod put;

pub use delete::DeleteOptions;
pub use put::PutOptions;

use sha1::{Digest, Sha1};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as i64
}

/// `expire_seconds = -1` means "never"; otherwise `now_ms + expire_seconds * 1000`.
pub(crate) fn expire_at_millis(now_ms: i64, expire_seconds: i64, max_expire_millis: i64) -> i64 {
    if expire_seconds < 0 {
        max_expire_millis
    } else {
        now_ms + expire_seconds * 1000
    }
}

pub(crate) fn bool_arg(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Content-hash etag for a synthesized (non-PUT-supplied) document body, as
/// used by STORAGE_EXPAND and CLEANUP's result documents.
pub(crate) fn sha1_hex(source: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}
