use super::{bool_arg, expire_at_millis, now_millis};
use crate::backend::Reply;
use crate::compress::Compressor;
use crate::path;
use crate::registry::ScriptKind;
use crate::result::Resource;
use crate::stream::{ReadStream, WriteSink};
use crate::Store;
use bytes::Bytes;
use uuid::Uuid;

/// Parameters for [`Store::put`] beyond path and body.
///
/// `lock_mode` must be one of the wire-visible strings `"silent"`,
/// `"reject"`, `"override"` — the scripts compare these exactly.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub etag: Option<String>,
    pub merge: bool,
    /// `-1` means "never expires".
    pub expire_seconds: i64,
    pub lock_owner: String,
    pub lock_mode: String,
    pub lock_expire_seconds: i64,
    pub store_compressed: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            etag: None,
            merge: false,
            expire_seconds: -1,
            lock_owner: String::new(),
            lock_mode: "silent".to_string(),
            lock_expire_seconds: -1,
            store_compressed: false,
        }
    }
}

impl<C: Compressor> Store<C> {
    /// A fresh sink the caller writes PUT body bytes into before calling
    /// [`Store::put`].
    pub fn new_sink(&self) -> WriteSink {
        WriteSink::new()
    }

    /// PUT(path, etag, merge, expire_seconds, lock_owner, lock_mode,
    /// lock_expire_seconds, store_compressed) → Resource.
    ///
    /// Ends `sink`, optionally compresses the collected bytes, and invokes
    /// the PUT script.
    #[tracing::instrument(level = "trace", skip(self, sink))]
    pub async fn put(
        &self,
        path: &str,
        opts: PutOptions,
        sink: WriteSink,
    ) -> crate::Result<Resource> {
        let path = path.to_string();
        sink.end(move |bytes| async move { self.put_bytes(&path, opts, bytes).await })
            .await
    }

    async fn put_bytes(
        &self,
        path: &str,
        opts: PutOptions,
        bytes: Bytes,
    ) -> crate::Result<Resource> {
        let payload = if opts.store_compressed {
            self.compressor.compress(bytes.to_vec()).await?
        } else {
            bytes.to_vec()
        };

        // An empty supplied etag means "generate one"; the script always
        // receives a populated etag so it never has to synthesize one.
        let etag = opts
            .etag
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let now = now_millis();
        let expire_at = expire_at_millis(now, opts.expire_seconds, self.config.max_expire_millis);
        let lock_expire_at =
            expire_at_millis(now, opts.lock_expire_seconds, self.config.max_expire_millis);

        let encoded = path::encode_path(path);
        let body = path::encode_binary(&payload);
        let max_expire = self.config.max_expire_millis.to_string();
        let expire_at_s = expire_at.to_string();
        let lock_expire_s = lock_expire_at.to_string();
        let compressed_flag = if opts.store_compressed { "1" } else { "0" };

        let args = [
            self.config.resources_prefix.as_str(),
            self.config.collections_prefix.as_str(),
            self.config.expirable_prefix.as_str(),
            bool_arg(opts.merge),
            expire_at_s.as_str(),
            max_expire.as_str(),
            body.as_str(),
            etag.as_str(),
            self.config.lock_prefix.as_str(),
            opts.lock_owner.as_str(),
            opts.lock_mode.as_str(),
            lock_expire_s.as_str(),
            compressed_flag,
        ];

        let reply = self
            .registry
            .eval(ScriptKind::Put, &[encoded.as_str()], &args)
            .await?;

        decode_put(reply, etag, bytes)
    }
}

fn decode_put(reply: Reply, etag: String, bytes: Bytes) -> crate::Result<Resource> {
    let tag = reply
        .as_bulk_str()
        .ok_or(crate::Error::Protocol("PUT reply was not a status"))?;

    Ok(match tag {
        // The path would shadow an existing document: success-shaped but
        // `exists=false`, per the source's overload (documented in
        // DESIGN.md rather than modeled as a separate variant).
        "existingCollection" => Resource::Collection {
            items: Vec::new(),
            exists: false,
        },
        "existingResource" => Resource::Document {
            stream: ReadStream::from_bytes(Bytes::new()),
            len: 0,
            etag: String::new(),
            exists: false,
        },
        "notModified" => Resource::NotModified,
        "reject" => Resource::Rejected,
        "ok" => {
            let len = bytes.len();
            Resource::Document {
                stream: ReadStream::from_bytes(bytes),
                len,
                etag,
                exists: true,
            }
        }
        _ => return Err(crate::Error::Protocol("unrecognized PUT reply status")),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ok_yields_document_with_supplied_etag() {
        let resource = decode_put(
            Reply::Status("ok".to_string()),
            "etag-1".to_string(),
            Bytes::from_static(b"body"),
        )
        .unwrap();
        match resource {
            Resource::Document { etag, exists, len, .. } => {
                assert_eq!(etag, "etag-1");
                assert!(exists);
                assert_eq!(len, 4);
            }
            other => panic!("expected Document, got {other:?}"),
        }
    }

    #[test]
    fn existing_resource_yields_document_with_exists_false() {
        let resource = decode_put(
            Reply::Status("existingResource".to_string()),
            "unused".to_string(),
            Bytes::new(),
        )
        .unwrap();
        match resource {
            Resource::Document { exists, .. } => assert!(!exists),
            other => panic!("expected Document, got {other:?}"),
        }
    }

    #[test]
    fn existing_collection_yields_collection_with_exists_false() {
        let resource = decode_put(
            Reply::Status("existingCollection".to_string()),
            "unused".to_string(),
            Bytes::new(),
        )
        .unwrap();
        match resource {
            Resource::Collection { exists, .. } => assert!(!exists),
            other => panic!("expected Collection, got {other:?}"),
        }
    }

    #[test]
    fn reject_yields_rejected() {
        let resource = decode_put(
            Reply::Status("reject".to_string()),
            "unused".to_string(),
            Bytes::new(),
        )
        .unwrap();
        assert!(matches!(resource, Resource::Rejected));
    }
}
