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

use crate::model::{
    BatchItemResult, BatchOperation, BlobId, Bucket, ListResponse, Object, ReadResponse,
    RewriteRequest, RewriteResponse, SourceBlob, UploadStatus,
};
use crate::options::RpcOptions;
use crate::{Error, Result};
use bytes::Bytes;

const UNIMPLEMENTED: &str = "the transport does not implement this RPC";

/// Defines the trait used to implement [crate::client::Storage].
///
/// This is the RPC transport collaborator. Implementations send each request
/// to the service (or a test double) and report the outcome. The transport
/// owns authentication, retries, and the wire encoding, this crate owns the
/// options, the multi-RPC protocols, and the result correlation.
///
/// Implementations must report rejected requests with
/// [Error::service][crate::Error::service], in particular, missing resources
/// use HTTP status 404 and failed preconditions use HTTP status 412.
///
/// Services gain new RPCs routinely. Consequently, this trait gains new methods
/// too. To avoid breaking applications the trait provides a default
/// implementation of each method. These implementations just return an
/// error.
pub trait Storage: std::fmt::Debug + Send + Sync {
    /// Implements [crate::client::Storage::create_bucket].
    fn create_bucket(
        &self,
        _bucket: Bucket,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Bucket>> + Send {
        unimplemented_stub::<Bucket>()
    }

    /// Implements [crate::client::Storage::get_bucket].
    fn get_bucket(
        &self,
        _name: String,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Bucket>> + Send {
        unimplemented_stub::<Bucket>()
    }

    /// Implements [crate::client::Storage::list_buckets].
    fn list_buckets(
        &self,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<ListResponse<Bucket>>> + Send {
        unimplemented_stub::<ListResponse<Bucket>>()
    }

    /// Implements [crate::client::Storage::update_bucket].
    fn patch_bucket(
        &self,
        _bucket: Bucket,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Bucket>> + Send {
        unimplemented_stub::<Bucket>()
    }

    /// Implements [crate::client::Storage::delete_bucket].
    fn delete_bucket(
        &self,
        _name: String,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        unimplemented_stub::<()>()
    }

    /// Implements [crate::client::Storage::create_object] and
    /// [crate::client::Storage::create_object_with_content].
    fn create_object(
        &self,
        _object: Object,
        _content: Bytes,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Object>> + Send {
        unimplemented_stub::<Object>()
    }

    /// Implements [crate::client::Storage::get_object].
    fn get_object(
        &self,
        _id: BlobId,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Object>> + Send {
        unimplemented_stub::<Object>()
    }

    /// Implements [crate::client::Storage::list_objects].
    fn list_objects(
        &self,
        _bucket: String,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<ListResponse<Object>>> + Send {
        unimplemented_stub::<ListResponse<Object>>()
    }

    /// Implements [crate::client::Storage::update_object].
    fn patch_object(
        &self,
        _object: Object,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Object>> + Send {
        unimplemented_stub::<Object>()
    }

    /// Implements [crate::client::Storage::delete_object].
    fn delete_object(
        &self,
        _id: BlobId,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        unimplemented_stub::<()>()
    }

    /// Implements [crate::client::Storage::compose].
    fn compose(
        &self,
        _sources: Vec<SourceBlob>,
        _target: Object,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<Object>> + Send {
        unimplemented_stub::<Object>()
    }

    /// A single rewrite call, used by [crate::copy_writer::CopyWriter].
    fn rewrite(
        &self,
        _request: RewriteRequest,
    ) -> impl std::future::Future<Output = Result<RewriteResponse>> + Send {
        unimplemented_stub::<RewriteResponse>()
    }

    /// Starts a resumable upload, returns the session id.
    fn open_resumable_session(
        &self,
        _object: Object,
        _options: RpcOptions,
    ) -> impl std::future::Future<Output = Result<String>> + Send {
        unimplemented_stub::<String>()
    }

    /// Sends `data`, starting at `offset`, in a resumable upload session.
    ///
    /// `total_size` is set only for the final chunk, the service finalizes the
    /// object once it has received that many bytes.
    fn write_chunk(
        &self,
        _session: String,
        _offset: u64,
        _data: Bytes,
        _total_size: Option<u64>,
    ) -> impl std::future::Future<Output = Result<UploadStatus>> + Send {
        unimplemented_stub::<UploadStatus>()
    }

    /// Queries how many bytes the service persisted in a resumable upload.
    fn query_resumable_session(
        &self,
        _session: String,
    ) -> impl std::future::Future<Output = Result<UploadStatus>> + Send {
        unimplemented_stub::<UploadStatus>()
    }

    /// Aborts a resumable upload, the object is not created.
    fn cancel_resumable_session(
        &self,
        _session: String,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        unimplemented_stub::<()>()
    }

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only at the end of the object.
    fn read(
        &self,
        _id: BlobId,
        _options: RpcOptions,
        _offset: u64,
        _len: usize,
    ) -> impl std::future::Future<Output = Result<ReadResponse>> + Send {
        unimplemented_stub::<ReadResponse>()
    }

    /// Sends several requests in a single call.
    ///
    /// Returns one result per operation, in the same order. A per-operation
    /// error does not fail the call.
    fn batch(
        &self,
        _operations: Vec<BatchOperation>,
    ) -> impl std::future::Future<Output = Result<Vec<BatchItemResult>>> + Send {
        unimplemented_stub::<Vec<BatchItemResult>>()
    }
}

async fn unimplemented_stub<T>() -> Result<T> {
    Err(Error::transport(UNIMPLEMENTED))
}
