//! Object metadata as read from the metadata store.

use serde::{Deserialize, Serialize};

/// The subset of object metadata the byte calculator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Raw `content-length` value as stored.
    #[serde(rename = "content-length", default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<String>,
}

impl ObjectMetadata {
    /// Metadata for an object of `size` bytes.
    pub fn with_size(size: i64) -> Self {
        Self {
            content_length: Some(size.to_string()),
        }
    }

    /// Object size in bytes; absent, unparseable or negative values count
    /// as zero.
    pub fn size(&self) -> i64 {
        self.content_length
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map_or(0, |size| size.max(0))
    }

    /// Whether a `content-length` is recorded at all.
    pub fn has_size(&self) -> bool {
        self.content_length.is_some()
    }
}
