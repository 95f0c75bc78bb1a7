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

//! Extends [model][crate::model] with validated request types.
//!
//! The constructors check the request shape, an invalid request is never
//! built.

use crate::error::InvalidOption;
use crate::model::{BlobId, Object, SourceBlob};
use crate::options::{BlobSourceOption, BlobTargetOption};

/// A request to concatenate several objects into one.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::model::{Object, SourceBlob};
/// # use google_cloud_storage_core::model_ext::ComposeRequest;
/// let request = ComposeRequest::new(
///     [SourceBlob::new("part-1"), SourceBlob::new("part-2")],
///     Object::new("my-bucket", "joined").set_content_type("text/plain"),
/// )?;
/// assert_eq!(request.sources().len(), 2);
/// # Ok::<(), google_cloud_storage_core::error::InvalidOption>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ComposeRequest {
    sources: Vec<SourceBlob>,
    target: Object,
    target_options: Vec<BlobTargetOption>,
}

impl ComposeRequest {
    /// Creates a request, the sources are concatenated in the given order.
    ///
    /// The sources must be in the same bucket as the target. Fails if there
    /// are no sources.
    pub fn new<I>(sources: I, target: Object) -> Result<Self, InvalidOption>
    where
        I: IntoIterator<Item = SourceBlob>,
    {
        let sources = sources.into_iter().collect::<Vec<_>>();
        if sources.is_empty() {
            return Err(InvalidOption::EmptyComposeSources);
        }
        Ok(Self {
            sources,
            target,
            target_options: Vec::new(),
        })
    }

    pub fn set_target_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = BlobTargetOption>,
    {
        self.target_options = options.into_iter().collect();
        self
    }

    pub fn sources(&self) -> &[SourceBlob] {
        &self.sources
    }

    pub fn target(&self) -> &Object {
        &self.target
    }

    pub fn target_options(&self) -> &[BlobTargetOption] {
        &self.target_options
    }
}

/// The destination of a copy.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CopyTarget {
    /// Copy the metadata from the source.
    Id(BlobId),
    /// Replace the metadata with this value.
    Object(Object),
}

/// A request to copy an object.
///
/// The copy may require multiple calls, see
/// [CopyWriter][crate::copy_writer::CopyWriter].
///
/// # Example
/// ```
/// # use google_cloud_storage_core::model::{BlobId, Object};
/// # use google_cloud_storage_core::model_ext::CopyRequest;
/// let source = BlobId::new("source-bucket", "object");
/// let request = CopyRequest::new(source.clone(), BlobId::new("target-bucket", "object"))
///     .set_megabytes_copied_per_chunk(16);
///
/// // Replacing the metadata requires a content type.
/// let err = CopyRequest::with_metadata(source, Object::new("target-bucket", "object"));
/// assert!(err.is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CopyRequest {
    pub(crate) source: BlobId,
    pub(crate) source_options: Vec<BlobSourceOption>,
    pub(crate) target: CopyTarget,
    pub(crate) target_options: Vec<BlobTargetOption>,
    pub(crate) megabytes_copied_per_chunk: Option<i64>,
}

impl CopyRequest {
    /// Copies `source` to `target`, the target gets the source metadata.
    pub fn new(source: BlobId, target: BlobId) -> Self {
        Self {
            source,
            source_options: Vec::new(),
            target: CopyTarget::Id(target),
            target_options: Vec::new(),
            megabytes_copied_per_chunk: None,
        }
    }

    /// Copies `source` to `target`, replacing the metadata.
    ///
    /// Fails if `target` has no content type.
    pub fn with_metadata(source: BlobId, target: Object) -> Result<Self, InvalidOption> {
        if target.content_type.is_none() {
            return Err(InvalidOption::MissingContentType);
        }
        Ok(Self {
            source,
            source_options: Vec::new(),
            target: CopyTarget::Object(target),
            target_options: Vec::new(),
            megabytes_copied_per_chunk: None,
        })
    }

    pub fn set_source_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = BlobSourceOption>,
    {
        self.source_options = options.into_iter().collect();
        self
    }

    /// Sets the target options, implicit preconditions use the target
    /// generation and metageneration.
    pub fn set_target_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = BlobTargetOption>,
    {
        self.target_options = options.into_iter().collect();
        self
    }

    /// Limits how much data is copied in each rewrite call.
    ///
    /// The service ignores this value if the source and target are in the
    /// same location and have the same storage class, such copies complete in
    /// a single call. [Storage::copy][crate::client::Storage::copy] rejects
    /// values that are not positive.
    pub fn set_megabytes_copied_per_chunk(mut self, megabytes: i64) -> Self {
        self.megabytes_copied_per_chunk = Some(megabytes);
        self
    }

    pub fn source(&self) -> &BlobId {
        &self.source
    }

    /// The target metadata, as sent to the service.
    pub fn target(&self) -> Object {
        match &self.target {
            CopyTarget::Object(o) => o.clone(),
            CopyTarget::Id(id) => {
                let object = Object::new(id.bucket(), id.name());
                match id.generation() {
                    Some(g) => object.set_generation(g),
                    None => object,
                }
            }
        }
    }

    /// Returns true if the target metadata replaces the source metadata.
    pub fn override_info(&self) -> bool {
        matches!(self.target, CopyTarget::Object(_))
    }

    pub fn megabytes_copied_per_chunk(&self) -> Option<i64> {
        self.megabytes_copied_per_chunk
    }
}
