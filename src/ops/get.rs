use super::now_millis;
use crate::backend::Reply;
use crate::compress::Compressor;
use crate::path;
use crate::registry::ScriptKind;
use crate::result::{CollectionEntry, Resource};
use crate::stream::ReadStream;
use crate::Store;
use bytes::Bytes;

impl<C: Compressor> Store<C> {
    /// GET(path, etag, offset, limit) → Resource.
    ///
    /// `offset=0, limit=-1` means "all, and notFound instead of an empty
    /// collection" — the convention the `get.lua` script itself implements.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn get(
        &self,
        path: &str,
        etag: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> crate::Result<Resource> {
        let encoded = path::encode_path(path);
        let now = now_millis().to_string();
        let max_expire = self.config.max_expire_millis.to_string();
        let offset_s = offset.to_string();
        let limit_s = limit.to_string();
        let etag = etag.unwrap_or("");

        let args = [
            self.config.resources_prefix.as_str(),
            self.config.collections_prefix.as_str(),
            self.config.expirable_prefix.as_str(),
            now.as_str(),
            max_expire.as_str(),
            offset_s.as_str(),
            limit_s.as_str(),
            etag,
        ];

        let reply = self
            .registry
            .eval(ScriptKind::Get, &[encoded.as_str()], &args)
            .await?;

        self.decode_get(reply).await
    }

    async fn decode_get(&self, reply: Reply) -> crate::Result<Resource> {
        let items = reply
            .as_array()
            .ok_or(crate::Error::Protocol("GET reply was not an array"))?;
        let tag = items
            .first()
            .and_then(Reply::as_bulk_str)
            .ok_or(crate::Error::Protocol("GET reply missing tag"))?;

        match tag {
            "notModified" => Ok(Resource::NotModified),
            "notFound" => Ok(Resource::NotFound),
            "TYPE_RESOURCE" => {
                let body = items
                    .get(1)
                    .and_then(Reply::as_bulk_str)
                    .ok_or(crate::Error::Protocol("GET resource missing body"))?;
                let etag = items
                    .get(2)
                    .and_then(Reply::as_bulk_str)
                    .unwrap_or_default()
                    .to_string();
                let compressed = matches!(items.get(3), Some(Reply::Int(1)));

                let mut bytes = path::decode_binary(body)
                    .ok_or(crate::Error::Protocol("GET resource body was not Latin-1"))?;
                if compressed {
                    bytes = self.compressor.decompress(bytes).await?;
                }
                let len = bytes.len();
                Ok(Resource::Document {
                    stream: ReadStream::from_bytes(Bytes::from(bytes)),
                    len,
                    etag,
                    exists: true,
                })
            }
            "TYPE_COLLECTION" => {
                let entries = items[1..]
                    .iter()
                    .filter_map(Reply::as_bulk_str)
                    .map(CollectionEntry::from_member)
                    .collect();
                Ok(Resource::Collection {
                    items: entries,
                    exists: true,
                })
            }
            _ => Err(crate::Error::Protocol("unrecognized GET reply tag")),
        }
    }
}
