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

//! Data integrity helpers.
//!
//! The service reports hashes as base64-encoded strings. CRC32C values are
//! encoded in big-endian order.

use crate::error::ChecksumMismatch;
use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};

/// Incrementally computes the CRC32C checksum of a transfer.
///
/// Data resent after a partial failure is only counted once: `update()`
/// ignores any bytes before the current offset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Crc32c {
    checksum: u32,
    offset: u64,
}

impl Crc32c {
    pub fn update(&mut self, offset: u64, data: &[u8]) {
        let end = offset + data.len() as u64;
        if (offset..end).contains(&self.offset) {
            let skip = (self.offset - offset) as usize;
            self.checksum = crc32c::crc32c_append(self.checksum, &data[skip..]);
            self.offset = end;
        }
    }

    pub fn finalize(&self) -> u32 {
        self.checksum
    }

    /// Compares the computed value against the value reported by the
    /// service. Missing values are not compared.
    pub fn validate(&self, received: Option<&str>) -> Result<(), ChecksumMismatch> {
        let want = encode_crc32c(self.finalize());
        match received {
            Some(got) if got != want => Err(ChecksumMismatch::Crc32c {
                got: got.to_string(),
                want,
            }),
            _ => Ok(()),
        }
    }
}

pub(crate) fn encode_crc32c(value: u32) -> String {
    BASE64_STANDARD.encode(value.to_be_bytes())
}

/// The base64-encoded CRC32C checksum of `data`.
pub(crate) fn crc32c_base64(data: &[u8]) -> String {
    encode_crc32c(crc32c::crc32c(data))
}

/// The base64-encoded MD5 hash of `data`.
pub(crate) fn md5_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(md5::compute(data).0)
}

/// Compares the hashes computed for an upload against the object metadata
/// returned by the service.
pub(crate) fn validate(
    crc32c: &str,
    md5: &str,
    received: &crate::model::Object,
) -> Result<(), ChecksumMismatch> {
    if let Some(got) = received.crc32c.as_deref().filter(|got| *got != crc32c) {
        return Err(ChecksumMismatch::Crc32c {
            got: got.to_string(),
            want: crc32c.to_string(),
        });
    }
    // Composed objects do not have MD5 hashes.
    if let Some(got) = received.md5_hash.as_deref().filter(|got| *got != md5) {
        return Err(ChecksumMismatch::Md5 {
            got: got.to_string(),
            want: md5.to_string(),
        });
    }
    Ok(())
}
