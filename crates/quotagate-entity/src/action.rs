//! Authorization action classification for quota purposes.
//!
//! An API call (`apiMethod`) is authorized as one or more fine-grained
//! action names; a copy, for instance, authorizes `objectGet` on the
//! source and `objectPut` on the destination.

/// Actions that add data and must be checked against quotas.
const QUOTA_CHECKED_ACTIONS: &[&str] = &[
    "objectPut",
    "objectPutPart",
    "objectRestore",
    "completeMultipartUpload",
];

/// Actions that release data.
const DATA_DELETION_ACTIONS: &[&str] = &[
    "objectDelete",
    "objectDeleteVersion",
    "multiObjectDelete",
    "multipartDelete",
];

/// API methods that copy an existing object.
const COPY_API_METHODS: &[&str] = &["objectCopy", "objectPutCopyPart"];

/// Whether `action` writes data and needs a quota check.
pub fn action_need_quota_check(action: &str) -> bool {
    QUOTA_CHECKED_ACTIONS.contains(&action)
}

/// Whether `action` is the source read of a copy performed by `api_method`.
///
/// The source read is what carries the copied bytes, so it is checked
/// like a write.
pub fn action_need_quota_check_copy(action: &str, api_method: &str) -> bool {
    action == "objectGet" && COPY_API_METHODS.contains(&api_method)
}

/// Whether `action` deletes data.
pub fn action_with_data_deletion(action: &str) -> bool {
    DATA_DELETION_ACTIONS.contains(&action)
}
