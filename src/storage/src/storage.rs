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

pub mod batch;
pub(crate) mod checksum;
pub(crate) mod client;
pub(crate) mod common_options;
pub mod copy_writer;
pub mod paginator;
pub mod preconditions;
pub(crate) mod read_channel;
pub mod signed_url;
pub mod stub;
pub(crate) mod write_channel;

#[cfg(test)]
pub(crate) mod tests {
    use crate::Result;
    use crate::model::{
        BatchItemResult, BatchOperation, BlobId, Bucket, ListResponse, Object, ReadResponse,
        RewriteRequest, RewriteResponse, SourceBlob, UploadStatus,
    };
    use crate::options::RpcOptions;
    use bytes::Bytes;

    mockall::mock! {
        #[derive(Debug)]
        pub Storage {}
        impl super::stub::Storage for Storage {
            async fn create_bucket(&self, bucket: Bucket, options: RpcOptions) -> Result<Bucket>;
            async fn get_bucket(&self, name: String, options: RpcOptions) -> Result<Bucket>;
            async fn list_buckets(&self, options: RpcOptions) -> Result<ListResponse<Bucket>>;
            async fn patch_bucket(&self, bucket: Bucket, options: RpcOptions) -> Result<Bucket>;
            async fn delete_bucket(&self, name: String, options: RpcOptions) -> Result<()>;
            async fn create_object(&self, object: Object, content: Bytes, options: RpcOptions) -> Result<Object>;
            async fn get_object(&self, id: BlobId, options: RpcOptions) -> Result<Object>;
            async fn list_objects(&self, bucket: String, options: RpcOptions) -> Result<ListResponse<Object>>;
            async fn patch_object(&self, object: Object, options: RpcOptions) -> Result<Object>;
            async fn delete_object(&self, id: BlobId, options: RpcOptions) -> Result<()>;
            async fn compose(&self, sources: Vec<SourceBlob>, target: Object, options: RpcOptions) -> Result<Object>;
            async fn rewrite(&self, request: RewriteRequest) -> Result<RewriteResponse>;
            async fn open_resumable_session(&self, object: Object, options: RpcOptions) -> Result<String>;
            async fn write_chunk(&self, session: String, offset: u64, data: Bytes, total_size: Option<u64>) -> Result<UploadStatus>;
            async fn query_resumable_session(&self, session: String) -> Result<UploadStatus>;
            async fn cancel_resumable_session(&self, session: String) -> Result<()>;
            async fn read(&self, id: BlobId, options: RpcOptions, offset: u64, len: usize) -> Result<ReadResponse>;
            async fn batch(&self, operations: Vec<BatchOperation>) -> Result<Vec<BatchItemResult>>;
        }
    }
}
