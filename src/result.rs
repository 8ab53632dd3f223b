//! Result model (component F).
//!
//! Every operation delivers exactly one [`Resource`]; handlers are invoked
//! once. `Document` and `Collection` carry an `exists` flag because two PUT
//! conflict outcomes (`existingResource`, `existingCollection`) are reported
//! through the same two success shapes with `exists: false` rather than as
//! separate variants — see `DESIGN.md` for why that overload is preserved.

use crate::stream::ReadStream;

#[derive(Debug)]
pub enum Resource {
    NotFound,
    NotModified,
    NotEmpty,
    Rejected,
    Invalid(String),
    Error(String),
    Document {
        stream: ReadStream,
        len: usize,
        etag: String,
        exists: bool,
    },
    Collection {
        items: Vec<CollectionEntry>,
        exists: bool,
    },
}

/// One child name returned by a collection listing (GET) or embedded in a
/// `STORAGE_EXPAND` array-shaped sub-listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub name: String,
    pub is_collection: bool,
}

impl CollectionEntry {
    /// Parse a raw member as stored in a collection set: subcollection
    /// membership is marked by a trailing `:`.
    pub fn from_member(raw: &str) -> Self {
        match raw.strip_suffix(':') {
            Some(name) => CollectionEntry {
                name: name.to_string(),
                is_collection: true,
            },
            None => CollectionEntry {
                name: raw.to_string(),
                is_collection: false,
            },
        }
    }
}
