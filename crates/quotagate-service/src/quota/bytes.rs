//! Byte delta of a storage operation.

use quotagate_entity::bucket::BucketInfo;
use quotagate_entity::object::ObjectMetadata;

/// Compute the signed number of bytes `api_method` adds to (positive) or
/// removes from (negative) the bucket.
///
/// * `version_id` is the explicitly requested version, if any.
/// * `content_length` is the request payload size; `None` or `0` means the
///   request carries no payload.
/// * `obj_md` is the existing object (the copy source for copies).
/// * `dest_obj_md` is the object a copy would overwrite.
///
/// For copies `bucket` is the destination bucket.
pub fn process_bytes_to_write(
    api_method: &str,
    bucket: &dyn BucketInfo,
    version_id: Option<&str>,
    content_length: Option<i64>,
    obj_md: Option<&ObjectMetadata>,
    dest_obj_md: Option<&ObjectMetadata>,
) -> i64 {
    let versioned = bucket.is_versioning_enabled();
    let content_length = content_length.filter(|len| *len != 0);
    let has_version_id = version_id.is_some_and(|v| !v.is_empty());
    let source = obj_md.filter(|md| md.has_size());

    if api_method == "objectRestore" {
        return obj_md.map(ObjectMetadata::size).unwrap_or(0);
    }

    match (content_length, source) {
        (None, Some(source)) if is_copy(api_method) => match dest_obj_md {
            Some(dest) if !versioned => source.size().saturating_sub(dest.size()),
            _ => source.size(),
        },
        // Deletion, unless the bucket is versioned and only a delete marker is added.
        (None, Some(source)) if !versioned || has_version_id => source.size().saturating_neg(),
        // Replacement on an unversioned bucket: only the difference is new.
        (Some(len), Some(source)) if !versioned => len.saturating_sub(source.size()),
        (len, _) => len.unwrap_or(0),
    }
}

fn is_copy(api_method: &str) -> bool {
    matches!(api_method, "objectCopy" | "objectPutCopyPart")
}
