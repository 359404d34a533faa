//! # quotagate-entity
//!
//! Domain value objects for QuotaGate: quotas, the bucket and account
//! accessors the gate reads, object metadata, and the authorization
//! action classification tables.

pub mod account;
pub mod action;
pub mod bucket;
pub mod object;
pub mod quota;

pub use account::AccountInfo;
pub use action::{
    action_need_quota_check, action_need_quota_check_copy, action_with_data_deletion,
};
pub use bucket::{Bucket, BucketInfo};
pub use object::ObjectMetadata;
pub use quota::{Quota, QuotaScope};
