// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Normalizes write options before they are sent.
//!
//! Uploads accept [BlobWriteOption] values, which include the integrity
//! markers (`md5_match()`, `crc32c_match()`). The service only receives the
//! hashes in the object metadata, so the markers select which hashes are
//! sent, and are then dropped.

use crate::error::InvalidOption;
use crate::model::{Bucket, Object};
use crate::options::{
    BlobTargetOption, BlobWriteOption, BucketTargetOption, RpcOptions, StorageOption,
    to_rpc_options,
};

/// Splits the write options into the metadata and target options to send.
///
/// The returned metadata has no MD5 hash unless `md5_match()` is present, and
/// no CRC32C checksum unless `crc32c_match()` is present. All other options
/// are returned in their original order.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::model::Object;
/// # use google_cloud_storage_core::options::BlobWriteOption;
/// use google_cloud_storage_core::preconditions::resolve_write_options;
/// let object = Object::new("bucket", "object")
///     .set_md5_hash("XUFAKrxLKna5cZ2REBfFkg==")
///     .set_crc32c("mnG7TA==");
/// let (object, options) = resolve_write_options(&object, &[
///     BlobWriteOption::crc32c_match(),
///     BlobWriteOption::does_not_exist(),
/// ]);
/// assert_eq!(object.md5_hash, None);
/// assert_eq!(object.crc32c.as_deref(), Some("mnG7TA=="));
/// assert_eq!(options.len(), 1);
/// ```
pub fn resolve_write_options(
    object: &Object,
    options: &[BlobWriteOption],
) -> (Object, Vec<BlobTargetOption>) {
    let mut resolved = object.clone();
    resolved.md5_hash = None;
    resolved.crc32c = None;
    let mut forwarded = Vec::with_capacity(options.len());
    for option in options {
        match option.as_option() {
            StorageOption::IfMd5Match => resolved.md5_hash = object.md5_hash.clone(),
            StorageOption::IfCrc32cMatch => resolved.crc32c = object.crc32c.clone(),
            _ => forwarded.push(option.clone().into_target_option()),
        }
    }
    (resolved, forwarded)
}

/// Converts the target options for an object to the wire map.
///
/// Implicit preconditions take their value from `object`.
pub fn resolve_target_options(
    object: &Object,
    options: &[BlobTargetOption],
) -> Result<RpcOptions, InvalidOption> {
    to_rpc_options(options.iter().map(BlobTargetOption::as_option), Some(object))
}

/// Converts the target options for a bucket to the wire map.
pub fn resolve_bucket_options(
    bucket: &Bucket,
    options: &[BucketTargetOption],
) -> Result<RpcOptions, InvalidOption> {
    to_rpc_options(options.iter().map(BucketTargetOption::as_option), Some(bucket))
}

/// Resolves the write options into the metadata and wire options to send.
pub(crate) fn resolve_upload(
    object: &Object,
    options: &[BlobWriteOption],
) -> Result<(Object, RpcOptions), InvalidOption> {
    // Duplicates are rejected before the markers are dropped.
    to_rpc_options(options.iter().map(BlobWriteOption::as_option), Some(object))?;
    let (resolved, target) = resolve_write_options(object, options);
    let rpc = resolve_target_options(&resolved, &target)?;
    Ok((resolved, rpc))
}
