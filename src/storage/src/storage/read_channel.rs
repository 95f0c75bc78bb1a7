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

use crate::Result;
use crate::model::BlobId;
use crate::options::RpcOptions;
use crate::storage::common_options::read_chunk_size;
use crate::storage::stub::Storage;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reads the data of an object in bounded chunks.
///
/// Each fetch requests at most `chunk_size` bytes from the service. The data
/// is fetched lazily, only when the application reads past the buffered data.
///
/// The first fetch pins the object generation: if the object is overwritten
/// while the channel is in use, the channel keeps reading the original data.
///
/// A channel is used by a single reader, all the functions take `&mut self`.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::client::Storage;
/// # use google_cloud_storage_core::model::BlobId;
/// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
/// let mut reader = client.reader(BlobId::new("my-bucket", "my-object"), &[])?;
/// reader.seek(1024);
/// while let Some(chunk) = reader.next_chunk().await? {
///     println!("received {} bytes", chunk.len());
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct BlobReadChannel<S> {
    stub: Arc<S>,
    id: BlobId,
    options: RpcOptions,
    chunk_size: usize,
    // The offset of the first byte in `buffer`.
    position: u64,
    buffer: Bytes,
    end_of_stream: bool,
}

/// The serializable state of a [BlobReadChannel].
///
/// Use it to continue a download in a different process, or after the
/// channel is dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ReadChannelState {
    pub id: BlobId,
    pub options: RpcOptions,
    pub position: u64,
    pub chunk_size: usize,
}

impl<S> BlobReadChannel<S>
where
    S: Storage + 'static,
{
    pub(crate) fn new(stub: Arc<S>, id: BlobId, options: RpcOptions, chunk_size: usize) -> Self {
        Self {
            stub,
            id,
            options,
            chunk_size: read_chunk_size(chunk_size),
            position: 0,
            buffer: Bytes::new(),
            end_of_stream: false,
        }
    }

    /// Recreates a channel from its captured state.
    pub(crate) fn restore(stub: Arc<S>, state: ReadChannelState) -> Self {
        let mut channel = Self::new(stub, state.id, state.options, state.chunk_size);
        channel.position = state.position;
        channel
    }

    /// Captures the state of the channel.
    ///
    /// The buffered data is not captured, a restored channel fetches it
    /// again.
    pub fn capture(&self) -> ReadChannelState {
        ReadChannelState {
            id: self.id.clone(),
            options: self.options.clone(),
            position: self.position,
            chunk_size: self.chunk_size,
        }
    }

    /// The object being read, including the generation once it is known.
    pub fn id(&self) -> &BlobId {
        &self.id
    }

    /// The offset of the next byte returned by the channel.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Changes the size of the next fetches.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = read_chunk_size(chunk_size);
    }

    /// Moves the read position to `offset`.
    ///
    /// Any buffered data is discarded. Seeking past the end of the object is
    /// not an error, the next read returns the end of the stream.
    pub fn seek(&mut self, offset: u64) {
        self.position = offset;
        self.buffer = Bytes::new();
        self.end_of_stream = false;
    }

    /// Copies the next bytes into `buf`.
    ///
    /// Returns the number of bytes copied, or `None` at the end of the object.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        self.fill().await?;
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer.split_to(n));
        self.position += n as u64;
        Ok(Some(n))
    }

    /// Returns the next chunk of data, or `None` at the end of the object.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.fill().await?;
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let chunk = std::mem::take(&mut self.buffer);
        self.position += chunk.len() as u64;
        Ok(Some(chunk))
    }

    /// Reads all the remaining data.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut contents = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            contents.extend_from_slice(&chunk);
        }
        Ok(contents.freeze())
    }

    /// Converts the channel into a stream of chunks.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<Bytes>> + Unpin {
        Box::pin(futures::stream::unfold(Some(self), |state| async move {
            let mut channel = state?;
            match channel.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(channel))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }))
    }

    async fn fill(&mut self) -> Result<()> {
        if !self.buffer.is_empty() || self.end_of_stream {
            return Ok(());
        }
        let response = self
            .stub
            .read(
                self.id.clone(),
                self.options.clone(),
                self.position,
                self.chunk_size,
            )
            .await?;
        tracing::debug!(
            object = %self.id,
            offset = self.position,
            requested = self.chunk_size,
            received = response.data.len(),
            "read chunk"
        );
        if self.id.generation().is_none() {
            if let Some(generation) = response.generation {
                self.id = self.id.clone().with_generation(generation);
            }
        }
        self.end_of_stream = response.data.len() < self.chunk_size;
        self.buffer = response.data;
        Ok(())
    }
}
