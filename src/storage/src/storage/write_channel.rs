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

mod progress;

use crate::error::{ChannelError, WriteError};
use crate::model::{Object, UploadStatus};
use crate::options::BlobWriteOption;
use crate::storage::checksum::Crc32c;
use crate::storage::preconditions::resolve_upload;
use crate::storage::stub::Storage;
use crate::{Error, Result};
use bytes::Bytes;
use progress::UploadProgress;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Uploads the data of an object in chunks, using a resumable upload.
///
/// The channel buffers the data until it has a full chunk, and then sends
/// the chunk to the service. The object is created when the application calls
/// [finalize()][BlobWriteChannel::finalize]. Dropping or closing the channel
/// before that aborts the upload.
///
/// If sending a chunk fails, the channel returns the error and keeps the
/// data. The next call queries the service for the persisted size, and then
/// resends any data the service did not persist. The application can wait for
/// as long as the upload session is valid before calling the channel again.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::client::Storage;
/// # use google_cloud_storage_core::model::Object;
/// # use google_cloud_storage_core::options::BlobWriteOption;
/// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
/// let mut writer = client
///     .writer(
///         Object::new("my-bucket", "my-object").set_content_type("text/plain"),
///         &[BlobWriteOption::does_not_exist()],
///     )
///     .await?;
/// writer.write(b"hello ").await?;
/// writer.write(b"world").await?;
/// let object = writer.finalize().await?;
/// println!("created {object:?}");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct BlobWriteChannel<S> {
    stub: Arc<S>,
    session: String,
    object: Object,
    progress: UploadProgress,
    crc32c: Crc32c,
    result: Option<Object>,
    closed: bool,
}

/// The serializable state of a [BlobWriteChannel].
///
/// Includes the data written by the application but not persisted by the
/// service yet.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct WriteChannelState {
    pub session: String,
    pub object: Object,
    pub offset: u64,
    #[serde_as(as = "serde_with::base64::Base64")]
    pub pending: Vec<u8>,
    pub chunk_size: usize,
    pub result: Option<Object>,
    crc32c: Crc32c,
}

impl<S> BlobWriteChannel<S>
where
    S: Storage + 'static,
{
    /// Starts a resumable upload session for `object`.
    pub(crate) async fn open(
        stub: Arc<S>,
        object: &Object,
        options: &[BlobWriteOption],
        chunk_size: usize,
    ) -> Result<Self> {
        let (object, options) = resolve_upload(object, options)?;
        let session = stub
            .open_resumable_session(object.clone(), options)
            .await?;
        tracing::debug!(bucket = %object.bucket, name = %object.name, %session, "opened upload session");
        Ok(Self {
            stub,
            session,
            object,
            progress: UploadProgress::new(chunk_size),
            crc32c: Crc32c::default(),
            result: None,
            closed: false,
        })
    }

    /// Recreates a channel from its captured state.
    pub(crate) fn restore(stub: Arc<S>, state: WriteChannelState) -> Self {
        Self {
            stub,
            session: state.session,
            object: state.object,
            progress: UploadProgress::restore(state.chunk_size, state.offset, &state.pending),
            crc32c: state.crc32c,
            result: state.result,
            closed: false,
        }
    }

    /// Captures the state of the channel.
    pub fn capture(&self) -> WriteChannelState {
        WriteChannelState {
            session: self.session.clone(),
            object: self.object.clone(),
            offset: self.progress.offset(),
            pending: self.progress.pending().to_vec(),
            chunk_size: self.progress.chunk_size(),
            result: self.result.clone(),
            crc32c: self.crc32c.clone(),
        }
    }

    /// The upload session id.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// The object metadata sent to the service.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// The total number of bytes written to the channel.
    pub fn position(&self) -> u64 {
        self.progress.total_size()
    }

    /// Changes the size of the chunks sent after this call.
    ///
    /// The value is rounded up to a multiple of 256KiB.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.progress.set_chunk_size(chunk_size);
    }

    /// Appends `data` to the object.
    ///
    /// Sends any full chunks to the service. The data is accepted even if
    /// sending a chunk fails, the next call resends it.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.result.is_some() {
            return Err(Error::incomplete_transfer(ChannelError::AlreadyFinalized));
        }
        self.crc32c.update(self.progress.total_size(), data);
        self.progress.push(data);
        self.send_full_chunks().await?;
        Ok(data.len())
    }

    /// Sends the remaining data and finalizes the object.
    ///
    /// Returns the object metadata. Calling this function again after it
    /// succeeds returns the same object.
    pub async fn finalize(&mut self) -> Result<Object> {
        if self.progress.needs_query() {
            self.query().await?;
        }
        if let Some(object) = &self.result {
            return Ok(object.clone());
        }
        self.send_full_chunks().await?;
        let total = self.progress.total_size();
        loop {
            let offset = self.progress.offset();
            let chunk = self.progress.final_chunk();
            match self.send(chunk, Some(total)).await? {
                UploadStatus::Finalized(object) => return self.complete(*object),
                UploadStatus::Partial(p) => {
                    self.progress.handle_partial(p).map_err(Error::deser)?;
                    if p == total {
                        return Err(Error::deser(WriteError::NotFinalized { size: total }));
                    }
                    if p == offset {
                        return Err(Error::deser(WriteError::NoProgress { offset }));
                    }
                }
            }
        }
    }

    /// Closes the channel.
    ///
    /// Returns the object if the upload was finalized. Otherwise aborts the
    /// upload session and returns an error, the object is not created.
    pub async fn close(mut self) -> Result<Object> {
        self.closed = true;
        if let Some(object) = self.result.take() {
            return Ok(object);
        }
        let sent = self.progress.total_size();
        tracing::debug!(session = %self.session, sent, "cancel unfinalized upload");
        self.stub
            .cancel_resumable_session(self.session.clone())
            .await?;
        Err(Error::incomplete_transfer(ChannelError::NotFinalized {
            sent,
        }))
    }

    async fn send_full_chunks(&mut self) -> Result<()> {
        if self.progress.needs_query() {
            self.query().await?;
        }
        if self.result.is_some() {
            return Err(Error::deser(WriteError::UnexpectedFinalization {
                sent: self.progress.total_size(),
            }));
        }
        while let Some(chunk) = self.progress.next_full_chunk() {
            let offset = self.progress.offset();
            match self.send(chunk, None).await? {
                UploadStatus::Partial(p) => {
                    self.progress.handle_partial(p).map_err(Error::deser)?;
                    if p == offset {
                        return Err(Error::deser(WriteError::NoProgress { offset }));
                    }
                }
                UploadStatus::Finalized(_) => {
                    return Err(Error::deser(WriteError::UnexpectedFinalization {
                        sent: self.progress.total_size(),
                    }));
                }
            }
        }
        Ok(())
    }

    async fn send(&mut self, chunk: Bytes, total_size: Option<u64>) -> Result<UploadStatus> {
        let offset = self.progress.offset();
        tracing::debug!(
            session = %self.session,
            offset,
            len = chunk.len(),
            ?total_size,
            "send chunk"
        );
        self.stub
            .write_chunk(self.session.clone(), offset, chunk, total_size)
            .await
            .inspect_err(|_| self.progress.handle_error())
    }

    async fn query(&mut self) -> Result<()> {
        let status = self
            .stub
            .query_resumable_session(self.session.clone())
            .await?;
        tracing::debug!(session = %self.session, ?status, "queried upload session");
        match status {
            UploadStatus::Partial(p) => self.progress.handle_partial(p).map_err(Error::deser),
            // The final chunk was persisted, but the response was lost.
            UploadStatus::Finalized(object) => self.complete(*object).map(|_| ()),
        }
    }

    fn complete(&mut self, object: Object) -> Result<Object> {
        self.crc32c
            .validate(object.crc32c.as_deref())
            .map_err(|mismatch| {
                Error::deser(WriteError::ChecksumMismatch {
                    mismatch,
                    bucket: object.bucket.clone(),
                    object: object.name.clone(),
                })
            })?;
        self.result = Some(object.clone());
        Ok(object)
    }
}

impl<S> Drop for BlobWriteChannel<S> {
    fn drop(&mut self) {
        if !self.closed && self.result.is_none() {
            tracing::warn!(
                session = %self.session,
                bucket = %self.object.bucket,
                name = %self.object.name,
                "upload channel dropped before the object was finalized, the object is not created"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RpcOption;
    use crate::storage::checksum::crc32c_base64;
    use crate::storage::common_options::RESUMABLE_UPLOAD_QUANTUM;
    use crate::storage::tests::MockStorage;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    type Result = anyhow::Result<()>;

    const Q: usize = RESUMABLE_UPLOAD_QUANTUM;
    const SESSION: &str = "session-123";

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn target() -> Object {
        Object::new("bucket", "object").set_content_type("text/plain")
    }

    fn finalized(contents: &[u8]) -> UploadStatus {
        UploadStatus::Finalized(Box::new(
            target()
                .set_generation(1)
                .set_size(contents.len() as u64)
                .set_crc32c(crc32c_base64(contents)),
        ))
    }

    // Records all the chunks, finalizes when the total size is present.
    fn recording_mock(chunks: Arc<Mutex<Vec<(u64, usize, Option<u64>)>>>, contents: Vec<u8>) -> MockStorage {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .once()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .returning(move |session, offset, data, total| {
                assert_eq!(session, SESSION);
                chunks
                    .lock()
                    .expect("lock is not poisoned")
                    .push((offset, data.len(), total));
                match total {
                    Some(_) => Ok(finalized(&contents)),
                    None => Ok(UploadStatus::Partial(offset + data.len() as u64)),
                }
            });
        mock
    }

    #[tokio::test]
    async fn small_object() -> Result {
        let contents = b"hello world".to_vec();
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks.clone(), contents.clone());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(&contents).await?;
        assert_eq!(writer.position(), 11);
        let object = writer.finalize().await?;
        assert_eq!(object.size, Some(11));
        // Finalizing again returns the same object.
        assert_eq!(writer.finalize().await?, object);
        assert_eq!(*chunks.lock().unwrap(), vec![(0, 11, Some(11))]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_object() -> Result {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks.clone(), Vec::new());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        let object = writer.finalize().await?;
        assert_eq!(object.size, Some(0));
        assert_eq!(*chunks.lock().unwrap(), vec![(0, 0, Some(0))]);
        Ok(())
    }

    #[tokio::test]
    async fn chunks_are_full_quantums() -> Result {
        let contents = data(2 * Q + 1000);
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks.clone(), contents.clone());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        for piece in contents.chunks(1000) {
            writer.write(piece).await?;
        }
        writer.finalize().await?;
        let q = Q as u64;
        assert_eq!(
            *chunks.lock().unwrap(),
            vec![
                (0, Q, None),
                (q, Q, None),
                (2 * q, 1000, Some(2 * q + 1000))
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn open_resolves_options() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .once()
            .withf(|object, options| {
                object.md5_hash.is_none()
                    && object.crc32c.as_deref() == Some("crc")
                    && options.get_long(RpcOption::IfGenerationMatch) == Some(0)
                    && !options.contains(RpcOption::IfCrc32cMatch)
            })
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_cancel_resumable_session()
            .once()
            .with(eq(SESSION.to_string()))
            .returning(|_| Ok(()));
        let object = target().set_crc32c("crc").set_md5_hash("md5");
        let writer = BlobWriteChannel::open(
            Arc::new(mock),
            &object,
            &[BlobWriteOption::crc32c_match(), BlobWriteOption::does_not_exist()],
            Q,
        )
        .await?;
        assert_eq!(writer.session(), SESSION);
        assert_eq!(writer.object().md5_hash, None);
        let _ = writer.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn open_invalid_options() -> Result {
        let mock = MockStorage::new();
        let err = BlobWriteChannel::open(
            Arc::new(mock),
            &target(),
            &[BlobWriteOption::generation_match()],
            Q,
        )
        .await
        .unwrap_err();
        assert!(err.is_invalid_option(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn close_unfinalized() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk().never();
        mock.expect_cancel_resumable_session()
            .once()
            .with(eq(SESSION.to_string()))
            .returning(|_| Ok(()));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(b"partial").await?;
        let err = writer.close().await.unwrap_err();
        assert!(err.is_incomplete_transfer(), "{err:?}");
        let source = std::error::Error::source(&err)
            .and_then(|e| e.downcast_ref::<ChannelError>());
        assert!(
            matches!(source, Some(ChannelError::NotFinalized { sent: 7 })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn close_finalized() -> Result {
        let contents = b"abc".to_vec();
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mut mock = recording_mock(chunks, contents.clone());
        mock.expect_cancel_resumable_session().never();
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(&contents).await?;
        let object = writer.finalize().await?;
        let got = writer.close().await?;
        assert_eq!(got, object);
        Ok(())
    }

    #[tokio::test]
    async fn write_after_finalize() -> Result {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks, Vec::new());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.finalize().await?;
        let err = writer.write(b"more").await.unwrap_err();
        let source = std::error::Error::source(&err)
            .and_then(|e| e.downcast_ref::<ChannelError>());
        assert!(
            matches!(source, Some(ChannelError::AlreadyFinalized)),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn resend_after_error() -> Result {
        let contents = data(2 * Q);
        let mut seq = Sequence::new();
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .with(eq(SESSION.to_string()), eq(0_u64), mockall::predicate::always(), eq(None))
            .returning(|_, _, _, _| Err(Error::transport("connection reset")));
        // The service persisted half of the first chunk.
        let half = (Q / 2) as u64;
        mock.expect_query_resumable_session()
            .once()
            .in_sequence(&mut seq)
            .returning(move |_| Ok(UploadStatus::Partial(half)));
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(move |_, offset, data, total| *offset == half && data.len() == Q && total.is_none())
            .returning(|_, offset, data, _| Ok(UploadStatus::Partial(offset + data.len() as u64)));
        let expected = contents.clone();
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(move |_, offset, data, total| {
                *offset == half + Q as u64 && data.len() == Q / 2 && *total == Some(2 * Q as u64)
            })
            .returning(move |_, _, _, _| Ok(finalized(&expected)));

        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        let err = writer.write(&contents[..Q]).await.unwrap_err();
        assert!(err.is_transport(), "{err:?}");
        // The data is kept, the next write resumes.
        writer.write(&contents[Q..]).await?;
        let object = writer.finalize().await?;
        assert_eq!(object.size, Some(2 * Q as u64));
        Ok(())
    }

    #[tokio::test]
    async fn final_response_lost() -> Result {
        let contents = b"hello world".to_vec();
        let mut seq = Sequence::new();
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Err(Error::transport("timeout")));
        let expected = contents.clone();
        mock.expect_query_resumable_session()
            .once()
            .in_sequence(&mut seq)
            .returning(move |_| Ok(finalized(&expected)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(&contents).await?;
        let err = writer.finalize().await.unwrap_err();
        assert!(err.is_transport(), "{err:?}");
        let object = writer.finalize().await?;
        assert_eq!(object.size, Some(11));
        Ok(())
    }

    #[tokio::test]
    async fn unexpected_rewind() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .once()
            .returning(|_, _, _, _| Ok(UploadStatus::Partial(Q as u64)));
        mock.expect_write_chunk()
            .once()
            .returning(|_, _, _, _| Ok(UploadStatus::Partial(0)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        let err = writer.write(&data(2 * Q)).await.unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
        let source = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<WriteError>());
        assert!(
            matches!(source, Some(WriteError::UnexpectedRewind { .. })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn intermediate_chunk_without_progress() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .times(1)
            .returning(|_, offset, _, _| Ok(UploadStatus::Partial(offset)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        let err = writer.write(&data(Q)).await.unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
        let source = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<WriteError>());
        assert!(
            matches!(source, Some(WriteError::NoProgress { offset: 0 })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn too_much_progress() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .returning(|_, _, _, _| Ok(UploadStatus::Partial(2 * Q as u64)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        let err = writer.write(&data(Q)).await.unwrap_err();
        let source = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<WriteError>());
        assert!(
            matches!(source, Some(WriteError::TooMuchProgress { .. })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn not_finalized() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .returning(|_, offset, data, _| Ok(UploadStatus::Partial(offset + data.len() as u64)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(b"abc").await?;
        let err = writer.finalize().await.unwrap_err();
        let source = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<WriteError>());
        assert!(
            matches!(source, Some(WriteError::NotFinalized { size: 3 })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn final_chunk_partially_accepted() -> Result {
        let contents = b"hello world".to_vec();
        let mut seq = Sequence::new();
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(UploadStatus::Partial(6)));
        let expected = contents.clone();
        mock.expect_write_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, total| *offset == 6 && data.as_ref() == b"world" && *total == Some(11))
            .returning(move |_, _, _, _| Ok(finalized(&expected)));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(&contents).await?;
        let object = writer.finalize().await?;
        assert_eq!(object.size, Some(11));
        Ok(())
    }

    #[tokio::test]
    async fn checksum_mismatch() -> Result {
        let mut mock = MockStorage::new();
        mock.expect_open_resumable_session()
            .returning(|_, _| Ok(SESSION.to_string()));
        mock.expect_write_chunk()
            .returning(|_, _, _, _| Ok(finalized(b"something else")));
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(b"hello world").await?;
        let err = writer.finalize().await.unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
        let source = std::error::Error::source(&err).and_then(|e| e.downcast_ref::<WriteError>());
        assert!(
            matches!(source, Some(WriteError::ChecksumMismatch { .. })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn capture_and_restore() -> Result {
        let contents = data(Q + 10);
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks.clone(), contents.clone());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.write(&contents[..Q + 5]).await?;
        let state = writer.capture();
        assert_eq!(state.offset, Q as u64);
        assert_eq!(state.pending.len(), 5);
        let json = serde_json::to_string(&state)?;
        let state = serde_json::from_str::<WriteChannelState>(&json)?;
        drop(writer);

        let mut mock = MockStorage::new();
        mock.expect_query_resumable_session()
            .once()
            .returning(|_| Ok(UploadStatus::Partial(Q as u64)));
        let expected = contents.clone();
        mock.expect_write_chunk()
            .once()
            .withf(|_, offset, data, total| {
                *offset == Q as u64 && data.len() == 10 && *total == Some(Q as u64 + 10)
            })
            .returning(move |_, _, _, _| Ok(finalized(&expected)));
        let mut restored = BlobWriteChannel::restore(Arc::new(mock), state);
        restored.write(&contents[Q + 5..]).await?;
        let object = restored.finalize().await?;
        assert_eq!(object.size, Some(Q as u64 + 10));
        Ok(())
    }

    #[tokio::test]
    async fn set_chunk_size() -> Result {
        let contents = data(3 * Q);
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mock = recording_mock(chunks.clone(), contents.clone());
        let mut writer = BlobWriteChannel::open(Arc::new(mock), &target(), &[], Q).await?;
        writer.set_chunk_size(2 * Q - 1);
        writer.write(&contents).await?;
        writer.finalize().await?;
        let sizes = chunks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, len, _)| *len)
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![2 * Q, Q]);
        Ok(())
    }
}
