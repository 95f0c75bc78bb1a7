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

use super::batch::{BatchRequest, BatchResponse, BatchResult};
use super::checksum::{self, crc32c_base64, md5_base64};
use super::common_options::{CommonOptions, read_chunk_size, write_chunk_size};
use super::copy_writer::{CopyWriter, CopyWriterState, rewrite_request};
use super::paginator::{Page, Paginator};
use super::preconditions::{resolve_bucket_options, resolve_target_options, resolve_upload};
use super::read_channel::{BlobReadChannel, ReadChannelState};
use super::signed_url::{SignUrlOption, Signer, sign_url_at};
use super::write_channel::{BlobWriteChannel, WriteChannelState};
use crate::error::{SigningError, WriteError};
use crate::model::{BlobId, Bucket, Object, SourceBlob};
use crate::model_ext::{ComposeRequest, CopyRequest};
use crate::options::{
    BlobGetOption, BlobListOption, BlobSourceOption, BlobTargetOption, BlobWriteOption,
    BucketGetOption, BucketListOption, BucketSourceOption, BucketTargetOption, OptionValue,
    RpcOption, RpcOptions, to_rpc_options,
};
use crate::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;

/// Implements a client for the Cloud Storage API.
///
/// The client resolves options and preconditions, and runs the multi-RPC
/// protocols (chunked reads and writes, rewrites, batches) on top of a
/// transport. The transport is any implementation of [stub::Storage].
///
/// # Example
/// ```
/// # use google_cloud_storage_core::client::Storage;
/// # use google_cloud_storage_core::model::BlobId;
/// # use google_cloud_storage_core::options::BlobGetOption;
/// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(stub: S) -> anyhow::Result<()> {
/// let client = Storage::builder(stub)
///     .with_write_chunk_size(4 * 1024 * 1024)
///     .build();
/// let object = client
///     .get_object(BlobId::new("my-bucket", "my-object"), &[BlobGetOption::generation_match(1234)])
///     .await?;
/// println!("object={object:?}");
/// # Ok(()) }
/// ```
///
/// # Configuration
///
/// To configure `Storage` use the `with_*` methods in the type returned
/// by [builder()][Storage::builder]. The defaults work for most applications.
///
/// # Pooling and Cloning
///
/// `Storage` holds the transport in an [Arc], it is advised to create one and
/// then reuse it. Cloning the client is cheap, and all clones share the same
/// transport.
///
/// [stub::Storage]: crate::stub::Storage
pub struct Storage<S> {
    stub: Arc<S>,
    options: CommonOptions,
}

impl<S> Clone for Storage<S> {
    fn clone(&self) -> Self {
        Self {
            stub: self.stub.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Storage<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("stub", &self.stub)
            .field("options", &self.options)
            .finish()
    }
}

impl<S> Storage<S>
where
    S: crate::stub::Storage + 'static,
{
    /// Returns a builder for [Storage].
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_core::client::Storage;
    /// # fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(stub: S) {
    /// let client = Storage::builder(stub)
    ///     .with_read_chunk_size(512 * 1024)
    ///     .build();
    /// # }
    /// ```
    pub fn builder(stub: S) -> ClientBuilder<S> {
        ClientBuilder::new(stub)
    }

    /// Creates a client with the default configuration.
    pub fn from_stub(stub: S) -> Self {
        Self::builder(stub).build()
    }

    /// The configuration used by this client.
    pub fn options(&self) -> &CommonOptions {
        &self.options
    }

    /// Creates a new bucket.
    ///
    /// Implicit preconditions, such as
    /// [BucketTargetOption::metageneration_match()], take their value from
    /// `bucket`.
    pub async fn create_bucket(
        &self,
        bucket: Bucket,
        options: &[BucketTargetOption],
    ) -> Result<Bucket> {
        let options = resolve_bucket_options(&bucket, options)?;
        self.stub.create_bucket(bucket, options).await
    }

    /// Gets the bucket metadata, returns `None` if the bucket does not exist.
    pub async fn get_bucket<N>(&self, name: N, options: &[BucketGetOption]) -> Result<Option<Bucket>>
    where
        N: Into<String>,
    {
        let options = to_rpc_options(options.iter().map(BucketGetOption::as_option), None)?;
        not_found_as_none(self.stub.get_bucket(name.into(), options).await)
    }

    /// Lists one page of buckets.
    pub async fn list_buckets(&self, options: &[BucketListOption]) -> Result<Page<Bucket>> {
        let options = to_rpc_options(options.iter().map(BucketListOption::as_option), None)?;
        self.stub.list_buckets(options).await.map(Page::from)
    }

    /// Streams the buckets over all the pages.
    ///
    /// If `options` includes a page token the stream starts at that page.
    pub fn list_buckets_stream(&self, options: &[BucketListOption]) -> Result<Paginator<Bucket>> {
        let options = to_rpc_options(options.iter().map(BucketListOption::as_option), None)?;
        let stub = self.stub.clone();
        let (seed, options) = split_page_token(options);
        Ok(Paginator::new(seed, move |token| {
            let stub = stub.clone();
            let options = with_page_token(&options, token);
            async move { stub.list_buckets(options).await.map(Page::from) }
        }))
    }

    /// Updates the bucket metadata.
    pub async fn update_bucket(
        &self,
        bucket: Bucket,
        options: &[BucketTargetOption],
    ) -> Result<Bucket> {
        let options = resolve_bucket_options(&bucket, options)?;
        self.stub.patch_bucket(bucket, options).await
    }

    /// Deletes a bucket, returns `false` if the bucket does not exist.
    pub async fn delete_bucket<N>(&self, name: N, options: &[BucketSourceOption]) -> Result<bool>
    where
        N: Into<String>,
    {
        let options = to_rpc_options(options.iter().map(BucketSourceOption::as_option), None)?;
        not_found_as_false(self.stub.delete_bucket(name.into(), options).await)
    }

    /// Creates an object in a single request.
    ///
    /// The hashes in `object` are only sent if the corresponding integrity
    /// marker ([BlobWriteOption::md5_match()] or
    /// [BlobWriteOption::crc32c_match()]) is present.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_core::client::Storage;
    /// # use google_cloud_storage_core::model::Object;
    /// # use google_cloud_storage_core::options::BlobWriteOption;
    /// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
    /// let object = client
    ///     .create_object(
    ///         Object::new("my-bucket", "my-object").set_content_type("text/plain"),
    ///         "hello world",
    ///         &[BlobWriteOption::does_not_exist()],
    ///     )
    ///     .await?;
    /// println!("created {object:?}");
    /// # Ok(()) }
    /// ```
    pub async fn create_object<C>(
        &self,
        object: Object,
        content: C,
        options: &[BlobWriteOption],
    ) -> Result<Object>
    where
        C: Into<Bytes>,
    {
        let (object, options) = resolve_upload(&object, options)?;
        self.stub.create_object(object, content.into(), options).await
    }

    /// Creates an object, the service validates the content hashes.
    ///
    /// Computes the MD5 hash and the CRC32C checksum of `content`, sends both
    /// in the object metadata, and verifies that the created object reports
    /// the same values.
    #[tracing::instrument(level = "debug", skip_all, fields(bucket = %object.bucket, name = %object.name))]
    pub async fn create_object_with_content<C>(
        &self,
        object: Object,
        content: C,
        options: &[BlobTargetOption],
    ) -> Result<Object>
    where
        C: Into<Bytes>,
    {
        let content = content.into();
        let crc32c = crc32c_base64(&content);
        let md5 = md5_base64(&content);
        let object = object.set_crc32c(crc32c.clone()).set_md5_hash(md5.clone());
        let options = resolve_target_options(&object, options)?;
        let created = self.stub.create_object(object, content, options).await?;
        checksum::validate(&crc32c, &md5, &created).map_err(|mismatch| {
            Error::deser(WriteError::ChecksumMismatch {
                mismatch,
                bucket: created.bucket.clone(),
                object: created.name.clone(),
            })
        })?;
        Ok(created)
    }

    /// Gets the object metadata, returns `None` if the object does not exist.
    ///
    /// If `id` has a generation, gets that generation. Otherwise gets the
    /// latest generation.
    pub async fn get_object(&self, id: BlobId, options: &[BlobGetOption]) -> Result<Option<Object>> {
        let options = to_rpc_options(options.iter().map(BlobGetOption::as_option), None)?;
        not_found_as_none(self.stub.get_object(id, options).await)
    }

    /// Lists one page of objects in a bucket.
    pub async fn list_objects<B>(&self, bucket: B, options: &[BlobListOption]) -> Result<Page<Object>>
    where
        B: Into<String>,
    {
        let options = to_rpc_options(options.iter().map(BlobListOption::as_option), None)?;
        self.stub
            .list_objects(bucket.into(), options)
            .await
            .map(Page::from)
    }

    /// Streams the objects in a bucket over all the pages.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_core::client::Storage;
    /// # use google_cloud_storage_core::options::BlobListOption;
    /// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
    /// use futures::TryStreamExt;
    /// let mut objects = client
    ///     .list_objects_stream("my-bucket", &[BlobListOption::prefix("logs/")])?
    ///     .items();
    /// while let Some(object) = objects.try_next().await? {
    ///     println!("{}", object.name);
    /// }
    /// # Ok(()) }
    /// ```
    pub fn list_objects_stream<B>(
        &self,
        bucket: B,
        options: &[BlobListOption],
    ) -> Result<Paginator<Object>>
    where
        B: Into<String>,
    {
        let options = to_rpc_options(options.iter().map(BlobListOption::as_option), None)?;
        let stub = self.stub.clone();
        let bucket = bucket.into();
        let (seed, options) = split_page_token(options);
        Ok(Paginator::new(seed, move |token| {
            let stub = stub.clone();
            let bucket = bucket.clone();
            let options = with_page_token(&options, token);
            async move { stub.list_objects(bucket, options).await.map(Page::from) }
        }))
    }

    /// Updates the object metadata.
    ///
    /// Implicit preconditions take their value from `object`.
    pub async fn update_object(&self, object: Object, options: &[BlobTargetOption]) -> Result<Object> {
        let options = resolve_target_options(&object, options)?;
        self.stub.patch_object(object, options).await
    }

    /// Deletes an object, returns `false` if the object does not exist.
    pub async fn delete_object(&self, id: BlobId, options: &[BlobSourceOption]) -> Result<bool> {
        let options = to_rpc_options(options.iter().map(BlobSourceOption::as_option), None)?;
        not_found_as_false(self.stub.delete_object(id, options).await)
    }

    /// Concatenates the source objects into the target object.
    pub async fn compose(&self, request: ComposeRequest) -> Result<Object> {
        let options = resolve_target_options(request.target(), request.target_options())?;
        let sources: Vec<SourceBlob> = request.sources().to_vec();
        self.stub
            .compose(sources, request.target().clone(), options)
            .await
    }

    /// Starts copying an object.
    ///
    /// Issues the first rewrite call. Use the returned [CopyWriter] to
    /// continue the copy until it completes.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %request.source()))]
    pub async fn copy(&self, request: CopyRequest) -> Result<CopyWriter<S>> {
        let request = rewrite_request(&request)?;
        CopyWriter::start(self.stub.clone(), request).await
    }

    /// Continues a copy from its captured state.
    pub fn restore_copy(&self, state: CopyWriterState) -> CopyWriter<S> {
        CopyWriter::restore(self.stub.clone(), state)
    }

    /// Returns a channel to read the object data in chunks.
    ///
    /// No data is read until the application reads from the channel.
    pub fn reader(&self, id: BlobId, options: &[BlobSourceOption]) -> Result<BlobReadChannel<S>> {
        let options = to_rpc_options(options.iter().map(BlobSourceOption::as_option), None)?;
        Ok(BlobReadChannel::new(
            self.stub.clone(),
            id,
            options,
            self.options.read_chunk_size,
        ))
    }

    /// Continues a download from its captured state.
    pub fn restore_reader(&self, state: ReadChannelState) -> BlobReadChannel<S> {
        BlobReadChannel::restore(self.stub.clone(), state)
    }

    /// Reads all the object data.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %id))]
    pub async fn read_all_bytes(&self, id: BlobId, options: &[BlobSourceOption]) -> Result<Bytes> {
        self.reader(id, options)?.read_to_end().await
    }

    /// Starts a resumable upload and returns a channel to write the data.
    #[tracing::instrument(level = "debug", skip_all, fields(bucket = %object.bucket, name = %object.name))]
    pub async fn writer(
        &self,
        object: Object,
        options: &[BlobWriteOption],
    ) -> Result<BlobWriteChannel<S>> {
        BlobWriteChannel::open(
            self.stub.clone(),
            &object,
            options,
            self.options.write_chunk_size,
        )
        .await
    }

    /// Continues an upload from its captured state.
    pub fn restore_writer(&self, state: WriteChannelState) -> BlobWriteChannel<S> {
        BlobWriteChannel::restore(self.stub.clone(), state)
    }

    /// Sends all the operations in `request` in a single call.
    ///
    /// The results are in the same order as the operations. A failed
    /// operation does not fail the call, its result contains the error.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_core::client::Storage;
    /// # use google_cloud_storage_core::batch::BatchRequest;
    /// # use google_cloud_storage_core::model::BlobId;
    /// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
    /// let request = BatchRequest::new()
    ///     .get(BlobId::new("my-bucket", "a"), [])
    ///     .delete(BlobId::new("my-bucket", "b"), []);
    /// let response = client.apply(request).await?;
    /// for result in response.iter() {
    ///     println!("{result:?}");
    /// }
    /// # Ok(()) }
    /// ```
    #[tracing::instrument(level = "debug", skip_all, fields(count = request.len()))]
    pub async fn apply(&self, request: BatchRequest) -> Result<BatchResponse> {
        super::batch::apply(self.stub.as_ref(), request).await
    }

    /// Gets the metadata for several objects in a single call.
    ///
    /// Missing objects, and objects that could not be fetched, are `None`.
    pub async fn get_many<I>(&self, ids: I) -> Result<Vec<Option<Object>>>
    where
        I: IntoIterator<Item = BlobId>,
    {
        let request = ids
            .into_iter()
            .fold(BatchRequest::new(), |r, id| r.get(id, []));
        let response = self.apply(request).await?;
        Ok(response.into_iter().map(swallow_object).collect())
    }

    /// Updates the metadata for several objects in a single call.
    ///
    /// Objects that could not be updated are `None`.
    pub async fn update_many<I>(&self, objects: I) -> Result<Vec<Option<Object>>>
    where
        I: IntoIterator<Item = Object>,
    {
        let request = objects
            .into_iter()
            .fold(BatchRequest::new(), |r, o| r.update(o, []));
        let response = self.apply(request).await?;
        Ok(response.into_iter().map(swallow_object).collect())
    }

    /// Deletes several objects in a single call.
    ///
    /// Returns `true` for each deleted object.
    pub async fn delete_many<I>(&self, ids: I) -> Result<Vec<bool>>
    where
        I: IntoIterator<Item = BlobId>,
    {
        let request = ids
            .into_iter()
            .fold(BatchRequest::new(), |r, id| r.delete(id, []));
        let response = self.apply(request).await?;
        Ok(response
            .into_iter()
            .map(|result| match result {
                BatchResult::Deleted => true,
                BatchResult::Failed(e) => {
                    tracing::warn!("delete in batch failed: {e}");
                    false
                }
                _ => false,
            })
            .collect())
    }

    /// Creates a signed URL for the object.
    ///
    /// The URL is valid for `duration`, truncated to whole seconds, starting
    /// now. The URL uses the signing endpoint from the client configuration.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_core::client::Storage;
    /// # use google_cloud_storage_core::model::Object;
    /// # use google_cloud_storage_core::signed_url::{HttpMethod, SignUrlOption, Signer};
    /// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>, signer: &dyn Signer) -> anyhow::Result<()> {
    /// let url = client
    ///     .sign_url(
    ///         signer,
    ///         &Object::new("my-bucket", "my-object"),
    ///         std::time::Duration::from_secs(3600),
    ///         &[SignUrlOption::http_method(HttpMethod::Get)],
    ///     )
    ///     .await?;
    /// println!("signed URL: {url}");
    /// # Ok(()) }
    /// ```
    pub async fn sign_url(
        &self,
        signer: &dyn Signer,
        object: &Object,
        duration: std::time::Duration,
        options: &[SignUrlOption],
    ) -> std::result::Result<String, SigningError> {
        sign_url_at(
            signer,
            &self.options.signing_endpoint,
            object,
            duration,
            options,
            chrono::Utc::now(),
        )
        .await
    }
}

fn not_found_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn not_found_as_false(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

fn swallow_object(result: BatchResult) -> Option<Object> {
    match result {
        BatchResult::Object(o) => Some(o),
        BatchResult::Failed(e) => {
            tracing::warn!("operation in batch failed: {e}");
            None
        }
        _ => None,
    }
}

fn split_page_token(mut options: RpcOptions) -> (Option<String>, RpcOptions) {
    let seed = match options.remove(RpcOption::PageToken) {
        Some(OptionValue::String(token)) => Some(token),
        _ => None,
    };
    (seed, options)
}

fn with_page_token(options: &RpcOptions, token: Option<String>) -> RpcOptions {
    let mut options = options.clone();
    if let Some(token) = token {
        options.insert(RpcOption::PageToken, OptionValue::String(token));
    }
    options
}

/// A builder for [Storage].
///
/// ```
/// # use google_cloud_storage_core::client::Storage;
/// # fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(stub: S) {
/// let builder = Storage::builder(stub);
/// let client = builder
///     .with_signing_endpoint("https://private.googleapis.com")
///     .build();
/// # }
/// ```
pub struct ClientBuilder<S> {
    stub: S,
    options: CommonOptions,
}

impl<S> std::fmt::Debug for ClientBuilder<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("stub", &self.stub)
            .field("options", &self.options)
            .finish()
    }
}

impl<S> ClientBuilder<S>
where
    S: crate::stub::Storage + 'static,
{
    pub(crate) fn new(stub: S) -> Self {
        Self {
            stub,
            options: CommonOptions::new(),
        }
    }

    /// Creates a new client.
    pub fn build(self) -> Storage<S> {
        Storage {
            stub: Arc::new(self.stub),
            options: self.options,
        }
    }

    /// Sets the default chunk size for read channels.
    ///
    /// Zero is treated as one byte.
    pub fn with_read_chunk_size(mut self, v: usize) -> Self {
        self.options.read_chunk_size = read_chunk_size(v);
        self
    }

    /// Sets the default chunk size for write channels.
    ///
    /// The service requires chunks in multiples of 256 KiB, the value is
    /// rounded up to the next multiple.
    pub fn with_write_chunk_size(mut self, v: usize) -> Self {
        self.options.write_chunk_size = write_chunk_size(v);
        self
    }

    /// Sets the endpoint used in signed URLs.
    pub fn with_signing_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.options.signing_endpoint = v.into();
        self
    }
}
