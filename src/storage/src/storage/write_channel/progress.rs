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

use crate::error::WriteError;
use crate::storage::common_options::write_chunk_size;
use bytes::{Buf, Bytes, BytesMut};

/// Tracks the data sent and persisted in a resumable upload.
#[derive(Clone)]
pub struct UploadProgress {
    /// The size for each chunk.
    ///
    /// The final chunk may be smaller or larger. This is always a non-zero
    /// multiple of 256KiB.
    chunk_size: usize,
    /// The offset of the first byte in `pending`.
    ///
    /// All the data before this offset is persisted by the service.
    offset: u64,
    /// The data written by the application, but not persisted yet.
    pending: BytesMut,
    /// The persisted size, if known.
    ///
    /// Reset to `None` when a chunk fails, the actual value must be queried
    /// before sending more data.
    persisted_size: Option<u64>,
}

// The pending data can be large, just print a summary.
impl std::fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProgress")
            .field("chunk_size", &self.chunk_size)
            .field("offset", &self.offset)
            .field("pending.len()", &self.pending.len())
            .field("persisted_size", &self.persisted_size)
            .finish()
    }
}

impl UploadProgress {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: write_chunk_size(chunk_size),
            offset: 0,
            pending: BytesMut::new(),
            persisted_size: Some(0),
        }
    }

    /// Recreates the progress for a captured upload.
    ///
    /// The persisted size is unknown, it is queried before any data is sent.
    pub fn restore(chunk_size: usize, offset: u64, pending: &[u8]) -> Self {
        Self {
            chunk_size: write_chunk_size(chunk_size),
            offset,
            pending: BytesMut::from(pending),
            persisted_size: None,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = write_chunk_size(chunk_size);
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// The total number of bytes written by the application.
    pub fn total_size(&self) -> u64 {
        self.offset + self.pending.len() as u64
    }

    pub fn needs_query(&self) -> bool {
        self.persisted_size.is_none_or(|p| p != self.offset)
    }

    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Returns the next full chunk, if there is enough pending data.
    pub fn next_full_chunk(&self) -> Option<Bytes> {
        if self.pending.len() < self.chunk_size {
            return None;
        }
        Some(Bytes::copy_from_slice(&self.pending[..self.chunk_size]))
    }

    /// Returns all the pending data, for the final chunk.
    pub fn final_chunk(&self) -> Bytes {
        Bytes::copy_from_slice(&self.pending)
    }

    /// Updates the progress with the persisted size reported by the service.
    ///
    /// The persisted data is discarded, any data after the persisted size
    /// remains pending and is resent.
    pub fn handle_partial(&mut self, persisted_size: u64) -> Result<(), WriteError> {
        let sent = self.total_size();
        let consumed = match (self.offset, persisted_size) {
            (o, p) if p < o => {
                return Err(WriteError::UnexpectedRewind {
                    offset: o,
                    persisted: p,
                });
            }
            (_, p) if p > sent => {
                return Err(WriteError::TooMuchProgress {
                    sent,
                    persisted: p,
                });
            }
            (o, p) => (p - o) as usize,
        };
        self.pending.advance(consumed);
        self.offset = persisted_size;
        self.persisted_size = Some(persisted_size);
        Ok(())
    }

    pub fn handle_error(&mut self) {
        self.persisted_size = None;
    }
}
