use super::{bool_arg, expire_at_millis, now_millis};
use crate::backend::Reply;
use crate::compress::Compressor;
use crate::path;
use crate::registry::ScriptKind;
use crate::result::Resource;
use crate::stream::ReadStream;
use crate::Store;
use bytes::Bytes;

/// Parameters for [`Store::delete`] beyond the path.
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub lock_owner: String,
    pub lock_mode: String,
    /// `-1` means "never expires"; irrelevant unless `lock_mode` takes one.
    pub lock_expire_seconds: i64,
    /// Explicit acknowledgment that `path` may resolve to a collection.
    /// `delete.lua` requires this alongside `delete_recursive` before it will
    /// remove a non-empty collection; either flag alone yields `NotEmpty`.
    pub confirm_collection_delete: bool,
    pub delete_recursive: bool,
}

impl<C: Compressor> Store<C> {
    /// DELETE(path, lock_owner, lock_mode, lock_expire_seconds,
    /// confirm_collection_delete, delete_recursive) → Resource.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn delete(&self, path: &str, opts: DeleteOptions) -> crate::Result<Resource> {
        let encoded = path::encode_path(path);
        let now = now_millis();
        let lock_expire_at =
            expire_at_millis(now, opts.lock_expire_seconds, self.config.max_expire_millis);

        let now_s = now.to_string();
        let max_expire = self.config.max_expire_millis.to_string();
        let lock_expire_s = lock_expire_at.to_string();

        let args = [
            self.config.resources_prefix.as_str(),
            self.config.collections_prefix.as_str(),
            self.config.delta_resources_prefix.as_str(),
            self.config.delta_etags_prefix.as_str(),
            self.config.expirable_prefix.as_str(),
            now_s.as_str(),
            max_expire.as_str(),
            bool_arg(opts.confirm_collection_delete),
            bool_arg(opts.delete_recursive),
            self.config.lock_prefix.as_str(),
            opts.lock_owner.as_str(),
            opts.lock_mode.as_str(),
            lock_expire_s.as_str(),
        ];

        let reply = self
            .registry
            .eval(ScriptKind::Delete, &[encoded.as_str()], &args)
            .await?;

        decode_delete(reply)
    }
}

fn decode_delete(reply: Reply) -> crate::Result<Resource> {
    let tag = reply
        .as_bulk_str()
        .ok_or(crate::Error::Protocol("DELETE reply was not a status"))?;

    Ok(match tag {
        "notFound" => Resource::NotFound,
        "notEmpty" => Resource::NotEmpty,
        "reject" => Resource::Rejected,
        // No content to stream back; success rides the Document channel
        // with an empty body, the same way CLEANUP's tally does.
        "ok" => Resource::Document {
            stream: ReadStream::from_bytes(Bytes::new()),
            len: 0,
            etag: String::new(),
            exists: true,
        },
        _ => return Err(crate::Error::Protocol("unrecognized DELETE reply status")),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ok_yields_empty_success_document() {
        let resource = decode_delete(Reply::Status("ok".to_string())).unwrap();
        match resource {
            Resource::Document { exists, len, .. } => {
                assert!(exists);
                assert_eq!(len, 0);
            }
            other => panic!("expected Document, got {other:?}"),
        }
    }

    #[test]
    fn not_empty_without_recursive() {
        let resource = decode_delete(Reply::Status("notEmpty".to_string())).unwrap();
        assert!(matches!(resource, Resource::NotEmpty));
    }

    #[test]
    fn reject_mode_yields_rejected() {
        let resource = decode_delete(Reply::Status("reject".to_string())).unwrap();
        assert!(matches!(resource, Resource::Rejected));
    }

    #[test]
    fn not_found_when_path_resolves_to_nothing() {
        let resource = decode_delete(Reply::Status("notFound".to_string())).unwrap();
        assert!(matches!(resource, Resource::NotFound));
    }
}
