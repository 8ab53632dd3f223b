use super::{now_millis, sha1_hex};
use crate::compress::Compressor;
use crate::registry::ScriptKind;
use crate::result::Resource;
use crate::stream::ReadStream;
use crate::Store;
use bytes::Bytes;

impl<C: Compressor> Store<C> {
    /// Bulked sweep of expired entries, `bulk_size` per script call so each
    /// batch stays atomic. Stops once a batch deletes nothing or the total
    /// reaches `max_delete`, then reports how many remain expired.
    ///
    /// If the CLEANUP script is reported missing after exhausting the
    /// registry's retry budget, this tick ends early with that error; the
    /// next scheduled tick will succeed once the script is reloaded.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn cleanup(&self, max_delete: i64) -> crate::Result<Resource> {
        let now = now_millis();
        let mut cleaned_total: i64 = 0;

        loop {
            let count = self.cleanup_bulk(now).await?;
            cleaned_total += count;
            if count == 0 || cleaned_total >= max_delete {
                break;
            }
        }

        let expired_left = self
            .backend
            .zcount(&self.config.expirable_prefix, 0, now)
            .await?;

        let body = format!(
            "{{\"cleanedResources\":{cleaned_total},\"expiredResourcesLeft\":{expired_left}}}"
        );
        let etag = sha1_hex(&body);
        let len = body.len();

        Ok(Resource::Document {
            stream: ReadStream::from_bytes(Bytes::from(body)),
            len,
            etag,
            exists: true,
        })
    }

    async fn cleanup_bulk(&self, now: i64) -> crate::Result<i64> {
        let now_s = now.to_string();
        let max_expire = self.config.max_expire_millis.to_string();
        let bulk_size = self.config.cleanup_bulk_size.to_string();

        let args = [
            self.config.resources_prefix.as_str(),
            self.config.collections_prefix.as_str(),
            self.config.delta_resources_prefix.as_str(),
            self.config.delta_etags_prefix.as_str(),
            self.config.expirable_prefix.as_str(),
            "0",
            max_expire.as_str(),
            "false",
            "true",
            now_s.as_str(),
            bulk_size.as_str(),
        ];

        let reply = self.registry.eval(ScriptKind::Cleanup, &[], &args).await?;
        reply
            .as_int()
            .ok_or(crate::Error::Protocol("CLEANUP reply was not an integer"))
    }
}

#[cfg(test)]
mod test {
    use crate::tests::fake_store;

    #[tokio::test]
    async fn empty_backend_cleans_nothing() {
        let store = fake_store();
        let resource = store.cleanup(1000).await.unwrap();
        match resource {
            crate::result::Resource::Document { etag, .. } => assert_eq!(etag.len(), 40),
            other => panic!("expected Document, got {other:?}"),
        }
    }
}
