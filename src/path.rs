//! Path and binary codec (component A).
//!
//! Paths look like filesystem paths (`/a/b/c`) but are projected onto a flat
//! backend key space, one key per path. Byte payloads are transported through
//! a text-only scripting channel and must round-trip exactly (invariant I6),
//! so a naive UTF-8 reinterpretation is not an option: bytes are carried one
//! Latin-1 codepoint per byte instead.

/// Encode a resource path into its backend key-suffix form.
///
/// `/` becomes the empty string. Any existing `;` or `:` in a path segment is
/// escaped first (`;` -> `;s`, `:` -> `;c`) so that the subsequent `/` -> `:`
/// substitution is unambiguous and reversible.
pub fn encode_path(path: &str) -> String {
    let stripped = path.strip_prefix('/').unwrap_or(path);
    if stripped.is_empty() {
        return String::new();
    }
    let escaped = stripped.replace(';', ";s").replace(':', ";c");
    escaped.replace('/', ":")
}

/// Inverse of [`encode_path`].
pub fn decode_path(encoded: &str) -> String {
    if encoded.is_empty() {
        return "/".to_string();
    }
    let unslashed = encoded.replace(':', "/");
    let uncoloned = unslashed.replace(";c", ":");
    let unescaped = uncoloned.replace(";s", ";");
    format!("/{unescaped}")
}

/// Encode raw bytes as a string carrying one Latin-1 codepoint per input byte.
///
/// This is a 1:1 octet-preserving transcoding, not UTF-8 decoding: every byte
/// 0x00-0xFF maps to the identically-numbered Unicode scalar value, so the
/// mapping is lossless and reversible for arbitrary binary content.
pub fn encode_binary(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`encode_binary`].
///
/// Returns `None` if `text` contains a codepoint outside the Latin-1 range,
/// which would mean the text did not originate from [`encode_binary`].
pub fn decode_binary(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let cp = ch as u32;
        if cp > 0xFF {
            return None;
        }
        out.push(cp as u8);
    }
    Some(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn root_round_trips() {
        assert_eq!(encode_path("/"), "");
        assert_eq!(decode_path(""), "/");
    }

    #[test]
    fn plain_path_round_trips() {
        let encoded = encode_path("/a/b/c");
        assert_eq!(encoded, "a:b:c");
        assert_eq!(decode_path(&encoded), "/a/b/c");
    }

    #[test]
    fn reserved_characters_round_trip() {
        let path = "/a:weird;name/b";
        let encoded = encode_path(path);
        assert_eq!(decode_path(&encoded), path);
    }

    #[test]
    fn binary_round_trips_all_byte_values() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = encode_binary(&bytes);
        assert_eq!(decode_binary(&encoded), Some(bytes));
    }

    #[test]
    fn binary_round_trips_empty() {
        assert_eq!(encode_binary(&[]), "");
        assert_eq!(decode_binary(""), Some(Vec::new()));
    }

    #[test]
    fn decode_binary_rejects_non_latin1() {
        assert_eq!(decode_binary("\u{1F600}"), None);
    }
}
