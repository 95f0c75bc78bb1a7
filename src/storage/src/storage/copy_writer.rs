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

use crate::error::{InvalidOption, RewriteError};
use crate::model::{Object, RewriteRequest, RewriteResponse};
use crate::model_ext::CopyRequest;
use crate::options::{BlobSourceOption, to_source_rpc_options};
use crate::storage::preconditions::resolve_target_options;
use crate::storage::stub::Storage;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MIB: i64 = 1024 * 1024;

/// The progress of a copy, as reported by the service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RewriteProgress {
    /// Continues the copy, only present while the copy is in progress.
    pub rewrite_token: Option<String>,
    pub bytes_copied: i64,
    pub total_bytes: i64,
    pub done: bool,
}

/// Drives a copy to completion.
///
/// Copies between locations or storage classes may require multiple calls to
/// the service, each call copies part of the data and returns a token to
/// continue. Copies within the same location and storage class complete in
/// the first call. The service decides, the application should not assume
/// either case.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::client::Storage;
/// # use google_cloud_storage_core::model::BlobId;
/// # use google_cloud_storage_core::model_ext::CopyRequest;
/// # async fn sample<S: google_cloud_storage_core::stub::Storage + 'static>(client: &Storage<S>) -> anyhow::Result<()> {
/// let request = CopyRequest::new(
///     BlobId::new("source-bucket", "object"),
///     BlobId::new("target-bucket", "object"),
/// )
/// .set_megabytes_copied_per_chunk(64);
/// let mut copy = client.copy(request).await?;
/// while !copy.is_done() {
///     copy.copy_chunk().await?;
///     println!("copied {} of {} bytes", copy.bytes_copied(), copy.total_bytes());
/// }
/// let object = copy.result().await?;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct CopyWriter<S> {
    stub: Arc<S>,
    request: RewriteRequest,
    progress: RewriteProgress,
    result: Option<Object>,
}

/// The serializable state of a [CopyWriter].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CopyWriterState {
    pub request: RewriteRequest,
    pub progress: RewriteProgress,
    pub result: Option<Object>,
}

/// Builds the first rewrite call for a copy.
pub(crate) fn rewrite_request(request: &CopyRequest) -> Result<RewriteRequest> {
    let source_options =
        to_source_rpc_options(request.source_options.iter().map(BlobSourceOption::as_option))?;
    let target = request.target();
    let target_options = resolve_target_options(&target, &request.target_options)?;
    Ok(RewriteRequest {
        source: request.source().clone(),
        source_options,
        target,
        target_options,
        override_info: request.override_info(),
        max_bytes_rewritten_per_call: request
            .megabytes_copied_per_chunk()
            .map(max_bytes_per_call)
            .transpose()?,
        rewrite_token: None,
    })
}

fn max_bytes_per_call(megabytes: i64) -> std::result::Result<i64, InvalidOption> {
    match megabytes.checked_mul(MIB) {
        Some(bytes) if bytes > 0 => Ok(bytes),
        _ => Err(InvalidOption::InvalidChunkSize(megabytes)),
    }
}

impl<S> CopyWriter<S>
where
    S: Storage + 'static,
{
    /// Issues the first rewrite call.
    pub(crate) async fn start(stub: Arc<S>, request: RewriteRequest) -> Result<Self> {
        let mut writer = Self {
            stub,
            request,
            progress: RewriteProgress::default(),
            result: None,
        };
        writer.step().await?;
        Ok(writer)
    }

    /// Recreates a writer from its captured state.
    pub(crate) fn restore(stub: Arc<S>, state: CopyWriterState) -> Self {
        Self {
            stub,
            request: state.request,
            progress: state.progress,
            result: state.result,
        }
    }

    pub fn capture(&self) -> CopyWriterState {
        CopyWriterState {
            request: self.request.clone(),
            progress: self.progress.clone(),
            result: self.result.clone(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.progress.done
    }

    pub fn bytes_copied(&self) -> i64 {
        self.progress.bytes_copied
    }

    pub fn total_bytes(&self) -> i64 {
        self.progress.total_bytes
    }

    pub fn progress(&self) -> &RewriteProgress {
        &self.progress
    }

    /// Copies the next chunk.
    ///
    /// Does nothing if the copy is done.
    pub async fn copy_chunk(&mut self) -> Result<()> {
        if self.progress.done {
            return Ok(());
        }
        self.step().await
    }

    /// Completes the copy and returns the new object.
    pub async fn result(&mut self) -> Result<Object> {
        while !self.progress.done {
            self.step().await?;
        }
        self.result
            .clone()
            .ok_or_else(|| Error::deser(RewriteError::MissingResource))
    }

    async fn step(&mut self) -> Result<()> {
        let mut request = self.request.clone();
        request.rewrite_token = self.progress.rewrite_token.clone();
        let response = self.stub.rewrite(request).await?;
        tracing::debug!(
            source = %self.request.source,
            target = %self.request.target.blob_id(),
            bytes_copied = response.total_bytes_rewritten,
            total_bytes = response.object_size,
            done = response.done,
            "rewrite step"
        );
        self.update(response).map_err(Error::deser)
    }

    fn update(&mut self, response: RewriteResponse) -> std::result::Result<(), RewriteError> {
        if response.total_bytes_rewritten < self.progress.bytes_copied {
            return Err(RewriteError::ProgressRewind {
                previous: self.progress.bytes_copied,
                current: response.total_bytes_rewritten,
            });
        }
        if response.done {
            let object = response.resource.ok_or(RewriteError::MissingResource)?;
            self.result = Some(object);
            self.progress.rewrite_token = None;
        } else {
            let token = response.rewrite_token.ok_or(RewriteError::MissingToken)?;
            self.progress.rewrite_token = Some(token);
        }
        self.progress.bytes_copied = response.total_bytes_rewritten;
        self.progress.total_bytes = response.object_size;
        self.progress.done = response.done;
        Ok(())
    }
}
