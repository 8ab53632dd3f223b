use super::{now_millis, sha1_hex};
use crate::backend::Reply;
use crate::compress::Compressor;
use crate::path;
use crate::registry::ScriptKind;
use crate::result::Resource;
use crate::stream::ReadStream;
use crate::Store;
use bytes::Bytes;

impl<C: Compressor> Store<C> {
    /// STORAGE_EXPAND(path, etag, sub_resource_names) → Resource.
    ///
    /// Fetches a set of named children of a collection in one round trip and
    /// synthesizes a JSON object keyed by child name, each value the parsed
    /// child payload (verbatim, not re-serialized).
    #[tracing::instrument(level = "trace", skip(self, sub_resource_names))]
    pub async fn storage_expand(
        &self,
        path: &str,
        etag: Option<&str>,
        sub_resource_names: &[&str],
    ) -> crate::Result<Resource> {
        let encoded = path::encode_path(path);
        let now = now_millis().to_string();
        let max_expire = self.config.max_expire_millis.to_string();
        let joined = sub_resource_names.join(";");
        let count = sub_resource_names.len().to_string();

        let args = [
            self.config.resources_prefix.as_str(),
            self.config.collections_prefix.as_str(),
            self.config.expirable_prefix.as_str(),
            now.as_str(),
            max_expire.as_str(),
            joined.as_str(),
            count.as_str(),
        ];

        let reply = self
            .registry
            .eval(ScriptKind::Expand, &[encoded.as_str()], &args)
            .await?;

        decode_expand(reply, etag)
    }
}

fn decode_expand(reply: Reply, caller_etag: Option<&str>) -> crate::Result<Resource> {
    if let Some(status) = reply.as_bulk_str() {
        return Ok(match status {
            "notFound" => Resource::NotFound,
            "compressionNotSupported" => {
                Resource::Invalid("expansion does not support compressed entries".to_string())
            }
            _other => return Err(crate::Error::Protocol("unrecognized STORAGE_EXPAND status")),
        });
    }

    let pairs = reply
        .as_array()
        .ok_or(crate::Error::Protocol("STORAGE_EXPAND reply was not an array or status"))?;

    let mut assembled = String::from("{");
    for (i, pair) in pairs.iter().enumerate() {
        let fields = pair
            .as_array()
            .ok_or(crate::Error::Protocol("STORAGE_EXPAND pair was not an array"))?;
        let name = fields
            .first()
            .and_then(Reply::as_bulk_str)
            .ok_or(crate::Error::Protocol("STORAGE_EXPAND pair missing name"))?;
        let payload = fields
            .get(1)
            .and_then(Reply::as_bulk_str)
            .ok_or(crate::Error::Protocol("STORAGE_EXPAND pair missing payload"))?;

        // Both the array-shaped sub-listing text and plain resource bodies
        // are valid JSON already (the former built and sorted server-side in
        // expand.lua); validate the latter here, since a raw document body
        // is never checked for well-formedness before being handed back.
        if serde_json::from_str::<serde_json::Value>(payload).is_err() {
            return Ok(Resource::Invalid(format!(
                "Error decoding invalid json resource '{name}'"
            )));
        }

        if i > 0 {
            assembled.push(',');
        }
        assembled.push_str(&serde_json::to_string(name).map_err(|err| {
            crate::Error::InvalidJson(err.to_string())
        })?);
        assembled.push(':');
        assembled.push_str(payload);
    }
    assembled.push('}');

    let etag = sha1_hex(&assembled);
    if caller_etag.is_some_and(|e| e == etag) {
        return Ok(Resource::NotModified);
    }

    let len = assembled.len();
    Ok(Resource::Document {
        stream: ReadStream::from_bytes(Bytes::from(assembled)),
        len,
        etag,
        exists: true,
    })
}
