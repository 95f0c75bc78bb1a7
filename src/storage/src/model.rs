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

//! The resources and messages exchanged with the transport collaborator.

use crate::options::RpcOptions;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies an object, and optionally one of its generations.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::model::BlobId;
/// let id = BlobId::new("my-bucket", "path/to/object").with_generation(1234);
/// assert_eq!(id.bucket(), "my-bucket");
/// assert_eq!(id.generation(), Some(1234));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobId {
    bucket: String,
    name: String,
    generation: Option<i64>,
}

impl BlobId {
    pub fn new<B, N>(bucket: B, name: N) -> Self
    where
        B: Into<String>,
        N: Into<String>,
    {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
        }
    }

    /// Returns the same object, pinned to a specific generation.
    pub fn with_generation(self, generation: i64) -> Self {
        Self {
            generation: Some(generation),
            ..self
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> Option<i64> {
        self.generation
    }
}

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.generation {
            Some(g) => write!(f, "gs://{}/{}#{g}", self.bucket, self.name),
            None => write!(f, "gs://{}/{}", self.bucket, self.name),
        }
    }
}

/// An access control entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ObjectAccessControl {
    pub entity: String,
    pub role: String,
}

impl ObjectAccessControl {
    pub fn new<E: Into<String>, R: Into<String>>(entity: E, role: R) -> Self {
        Self {
            entity: entity.into(),
            role: role.into(),
        }
    }
}

/// The metadata for an object.
///
/// Only the bucket and name are required. The service populates the
/// remaining fields, an application sets some of them when creating or
/// updating an object.
///
/// The hashes are base64-encoded, as in the JSON API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Object {
    pub bucket: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metageneration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// User-provided metadata.
    ///
    /// `None` leaves the metadata unchanged in an update, an empty map clears
    /// it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc32c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<ObjectAccessControl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_count: Option<i32>,
}

impl Object {
    pub fn new<B, N>(bucket: B, name: N) -> Self
    where
        B: Into<String>,
        N: Into<String>,
    {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// The identifier for this object, including the generation if known.
    pub fn blob_id(&self) -> BlobId {
        let id = BlobId::new(&self.bucket, &self.name);
        match self.generation {
            Some(g) => id.with_generation(g),
            None => id,
        }
    }

    pub fn set_generation(mut self, v: i64) -> Self {
        self.generation = Some(v);
        self
    }

    pub fn clear_generation(mut self) -> Self {
        self.generation = None;
        self
    }

    pub fn set_metageneration(mut self, v: i64) -> Self {
        self.metageneration = Some(v);
        self
    }

    pub fn set_size(mut self, v: u64) -> Self {
        self.size = Some(v);
        self
    }

    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.content_type = Some(v.into());
        self
    }

    pub fn set_content_encoding<T: Into<String>>(mut self, v: T) -> Self {
        self.content_encoding = Some(v.into());
        self
    }

    pub fn set_content_language<T: Into<String>>(mut self, v: T) -> Self {
        self.content_language = Some(v.into());
        self
    }

    pub fn set_content_disposition<T: Into<String>>(mut self, v: T) -> Self {
        self.content_disposition = Some(v.into());
        self
    }

    pub fn set_cache_control<T: Into<String>>(mut self, v: T) -> Self {
        self.cache_control = Some(v.into());
        self
    }

    pub fn set_metadata<I, K, V>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata = Some(v.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn set_md5_hash<T: Into<String>>(mut self, v: T) -> Self {
        self.md5_hash = Some(v.into());
        self
    }

    pub fn set_crc32c<T: Into<String>>(mut self, v: T) -> Self {
        self.crc32c = Some(v.into());
        self
    }

    pub fn set_storage_class<T: Into<String>>(mut self, v: T) -> Self {
        self.storage_class = Some(v.into());
        self
    }

    pub fn set_acl<I>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = ObjectAccessControl>,
    {
        self.acl = Some(v.into_iter().collect());
        self
    }

    pub fn set_etag<T: Into<String>>(mut self, v: T) -> Self {
        self.etag = Some(v.into());
        self
    }

    pub fn set_component_count(mut self, v: i32) -> Self {
        self.component_count = Some(v);
        self
    }
}

/// The metadata for a bucket.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Bucket {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metageneration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<ObjectAccessControl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_object_acl: Option<Vec<ObjectAccessControl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Bucket {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_location<T: Into<String>>(mut self, v: T) -> Self {
        self.location = Some(v.into());
        self
    }

    pub fn set_storage_class<T: Into<String>>(mut self, v: T) -> Self {
        self.storage_class = Some(v.into());
        self
    }

    pub fn set_metageneration(mut self, v: i64) -> Self {
        self.metageneration = Some(v);
        self
    }

    pub fn set_versioning_enabled(mut self, v: bool) -> Self {
        self.versioning_enabled = Some(v);
        self
    }

    pub fn set_acl<I>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = ObjectAccessControl>,
    {
        self.acl = Some(v.into_iter().collect());
        self
    }

    pub fn set_default_object_acl<I>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = ObjectAccessControl>,
    {
        self.default_object_acl = Some(v.into_iter().collect());
        self
    }

    pub fn set_etag<T: Into<String>>(mut self, v: T) -> Self {
        self.etag = Some(v.into());
        self
    }
}

/// A source object in a compose request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SourceBlob {
    pub name: String,
    /// Only use this generation, fails if the live generation is different.
    pub generation: Option<i64>,
}

impl SourceBlob {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            generation: None,
        }
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }
}

/// A single rewrite RPC, as sent to the transport.
///
/// The first request in a copy has no token, follow up requests carry the
/// token from the previous response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RewriteRequest {
    pub source: BlobId,
    pub source_options: RpcOptions,
    pub target: Object,
    pub target_options: RpcOptions,
    /// If true, the metadata in `target` replaces the source metadata.
    pub override_info: bool,
    pub max_bytes_rewritten_per_call: Option<i64>,
    pub rewrite_token: Option<String>,
}

/// The response for a single rewrite RPC.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RewriteResponse {
    /// The resulting object, only present once the rewrite is done.
    pub resource: Option<Object>,
    pub done: bool,
    pub total_bytes_rewritten: i64,
    pub object_size: i64,
    pub rewrite_token: Option<String>,
}

impl RewriteResponse {
    /// A response for a rewrite that completed in this call.
    pub fn done(resource: Object) -> Self {
        let size = resource.size.unwrap_or_default() as i64;
        Self {
            resource: Some(resource),
            done: true,
            total_bytes_rewritten: size,
            object_size: size,
            rewrite_token: None,
        }
    }

    /// A response for a rewrite that needs more calls.
    pub fn in_progress<T: Into<String>>(token: T, total_bytes_rewritten: i64, object_size: i64) -> Self {
        Self {
            resource: None,
            done: false,
            total_bytes_rewritten,
            object_size,
            rewrite_token: Some(token.into()),
        }
    }
}

/// A page of results from a list RPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    /// Only present if there are more results.
    pub next_page_token: Option<String>,
    /// In object listings with a delimiter, the common prefixes found.
    pub prefixes: Vec<String>,
}

impl<T> ListResponse<T> {
    pub fn new<I: IntoIterator<Item = T>>(items: I) -> Self {
        Self {
            items: items.into_iter().collect(),
            next_page_token: None,
            prefixes: Vec::new(),
        }
    }

    pub fn set_next_page_token<V: Into<String>>(mut self, v: V) -> Self {
        self.next_page_token = Some(v.into());
        self
    }

    pub fn set_prefixes<I, V>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.prefixes = v.into_iter().map(Into::into).collect();
        self
    }
}

/// A range of object data, as returned by the transport.
///
/// The transport returns fewer bytes than requested only at the end of the
/// object. Reading at or past the end returns no data.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ReadResponse {
    pub data: Bytes,
    /// The generation of the object the data came from.
    pub generation: Option<i64>,
}

impl ReadResponse {
    pub fn new<D: Into<Bytes>>(data: D, generation: Option<i64>) -> Self {
        Self {
            data: data.into(),
            generation,
        }
    }
}

/// The state of a resumable upload session after a chunk is sent.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadStatus {
    /// The object is finalized, there is nothing left to upload.
    Finalized(Box<Object>),
    /// The service persisted this many bytes.
    Partial(u64),
}

/// A single request within a batch.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum BatchOperation {
    Get { id: BlobId, options: RpcOptions },
    Update { object: Object, options: RpcOptions },
    Delete { id: BlobId, options: RpcOptions },
}

impl BatchOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// The result of a single batch request, as returned by the transport.
///
/// Gets and updates return `Ok(Some(object))`, deletes return `Ok(None)`.
pub type BatchItemResult = crate::Result<Option<Object>>;
