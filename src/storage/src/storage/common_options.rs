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

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const DEFAULT_READ_CHUNK: usize = 2 * MIB;
const DEFAULT_WRITE_CHUNK: usize = 8 * MIB;
const DEFAULT_SIGNING_ENDPOINT: &str = "https://storage.googleapis.com";

/// Resumable uploads send data in multiples of this size, except for the
/// final chunk.
pub(crate) const RESUMABLE_UPLOAD_QUANTUM: usize = 256 * KIB;

/// Options shared by the client, the channels and requests.
#[derive(Clone, Debug)]
pub struct CommonOptions {
    pub read_chunk_size: usize,
    pub write_chunk_size: usize,
    pub signing_endpoint: String,
}

impl CommonOptions {
    pub fn new() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK,
            write_chunk_size: DEFAULT_WRITE_CHUNK,
            signing_endpoint: DEFAULT_SIGNING_ENDPOINT.to_string(),
        }
    }
}

/// Rounds `size` up to a non-zero multiple of [RESUMABLE_UPLOAD_QUANTUM].
pub(crate) fn write_chunk_size(size: usize) -> usize {
    let quanta = size.div_ceil(RESUMABLE_UPLOAD_QUANTUM).max(1);
    quanta * RESUMABLE_UPLOAD_QUANTUM
}

/// The read chunk size can be any non-zero value.
pub(crate) fn read_chunk_size(size: usize) -> usize {
    size.max(1)
}
