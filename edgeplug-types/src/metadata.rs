use crate::payload;

/// Descriptive information attached to a metric, used primarily for chunked
/// uploads of BYTES and FILE payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaData {
    pub is_multi_part: Option<bool>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    /// 0-indexed sequence number of this part of a multi-part metric.
    pub seq: Option<u64>,

    /// File metadata
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub md5: Option<String>,

    pub description: Option<String>,
}

impl From<MetaData> for payload::MetaData {
    fn from(value: MetaData) -> Self {
        payload::MetaData {
            is_multi_part: value.is_multi_part,
            content_type: value.content_type,
            size: value.size,
            seq: value.seq,
            file_name: value.file_name,
            file_type: value.file_type,
            md5: value.md5,
            description: value.description,
        }
    }
}

impl From<payload::MetaData> for MetaData {
    fn from(value: payload::MetaData) -> Self {
        MetaData {
            is_multi_part: value.is_multi_part,
            content_type: value.content_type,
            size: value.size,
            seq: value.seq,
            file_name: value.file_name,
            file_type: value.file_type,
            md5: value.md5,
            description: value.description,
        }
    }
}
