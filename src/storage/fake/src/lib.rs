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

//! An in-memory Cloud Storage transport for end-to-end tests.
//!
//! Use this crate to test the `google-cloud-storage-core` client against a
//! transport that behaves like the service: objects have generations and
//! metagenerations, preconditions are evaluated, resumable uploads persist
//! data in 256 KiB multiples, and rewrites between buckets with different
//! locations or storage classes take multiple calls.
//!
//! # Example
//! ```
//! use google_cloud_storage_core::client::Storage;
//! use google_cloud_storage_core::model::{Bucket, Object};
//! use storage_core_fake::FakeStorage;
//!
//! # async fn test() -> anyhow::Result<()> {
//! let fake = FakeStorage::new().with_bucket(Bucket::new("my-bucket"));
//! let client = Storage::from_stub(fake);
//! let object = client
//!     .create_object(Object::new("my-bucket", "greeting"), "hello", &[])
//!     .await?;
//! assert_eq!(object.size, Some(5));
//! # Ok(()) }
//! ```

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use bytes::Bytes;
use google_cloud_storage_core::error::Status;
use google_cloud_storage_core::model::{
    BatchItemResult, BatchOperation, BlobId, Bucket, ListResponse, Object, ReadResponse,
    RewriteRequest, RewriteResponse, SourceBlob, UploadStatus,
};
use google_cloud_storage_core::options::{RpcOption, RpcOptions};
use google_cloud_storage_core::{Error, Result};
use http::StatusCode;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

const QUANTUM: u64 = 256 * 1024;
const DEFAULT_REWRITE_BYTES: i64 = 1024 * 1024;
const DEFAULT_MAX_RESULTS: usize = 1000;
const DEFAULT_LOCATION: &str = "US";
const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// An in-memory implementation of the Cloud Storage transport.
///
/// Each instance is an independent, empty service. Use
/// [with_bucket()][FakeStorage::with_bucket] to create buckets before the
/// test starts. Clones share the same service, keep a clone to inspect the
/// service state after the client takes ownership of the transport.
#[derive(Clone, Debug, Default)]
pub struct FakeStorage {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, Bucket>,
    objects: BTreeMap<(String, String), Stored>,
    sessions: HashMap<String, Session>,
    rewrites: HashMap<String, i64>,
    last_generation: i64,
    last_id: u64,
    calls: BTreeMap<&'static str, usize>,
    write_failures: VecDeque<WriteFailure>,
}

#[derive(Clone, Debug)]
struct Stored {
    object: Object,
    data: Bytes,
}

#[derive(Debug)]
struct Session {
    object: Object,
    options: RpcOptions,
    data: Vec<u8>,
    result: Option<Object>,
}

/// How the next resumable upload chunk fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteFailure {
    /// The request is lost, the service persists nothing.
    Request,
    /// The response is lost, the service persists the data.
    Response,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket.
    ///
    /// Buckets without a location or storage class get the defaults, `US`
    /// and `STANDARD`.
    pub fn with_bucket(self, bucket: Bucket) -> Self {
        self.lock().insert_bucket(bucket);
        self
    }

    /// Adds an object, bypassing any preconditions.
    pub fn insert_object<D: Into<Bytes>>(&self, object: Object, data: D) -> Result<Object> {
        self.lock().commit(object, data.into(), &RpcOptions::new())
    }

    /// The data of the latest generation of an object.
    pub fn object_data(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), name.to_string()))
            .map(|s| s.data.clone())
    }

    /// The number of calls to a transport method, by method name.
    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or_default()
    }

    /// The number of open resumable upload sessions.
    pub fn open_sessions(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|s| s.result.is_none())
            .count()
    }

    /// Makes the next call to `write_chunk()` fail with a transport error.
    pub fn fail_next_write(&self, failure: WriteFailure) {
        self.lock().write_failures.push_back(failure);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A test that panics while holding the lock already failed.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn call(&self, method: &'static str) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.lock();
        *state.calls.entry(method).or_default() += 1;
        state
    }
}

impl State {
    fn insert_bucket(&mut self, mut bucket: Bucket) -> Bucket {
        bucket.location.get_or_insert_with(|| DEFAULT_LOCATION.to_string());
        bucket
            .storage_class
            .get_or_insert_with(|| DEFAULT_STORAGE_CLASS.to_string());
        bucket.metageneration = Some(1);
        self.buckets.insert(bucket.name.clone(), bucket.clone());
        bucket
    }

    fn bucket(&self, name: &str) -> Result<&Bucket> {
        self.buckets
            .get(name)
            .ok_or_else(|| not_found(format!("bucket {name} not found")))
    }

    fn lookup(&self, id: &BlobId) -> Result<&Stored> {
        self.objects
            .get(&key(id.bucket(), id.name()))
            .filter(|s| id.generation().is_none() || s.object.generation == id.generation())
            .ok_or_else(|| not_found(format!("object {id} not found")))
    }

    fn current(&self, bucket: &str, name: &str) -> Option<&Object> {
        self.objects.get(&key(bucket, name)).map(|s| &s.object)
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.last_id += 1;
        format!("{prefix}-{}", self.last_id)
    }

    /// Creates a new generation of an object.
    fn commit(&mut self, mut object: Object, data: Bytes, options: &RpcOptions) -> Result<Object> {
        let storage_class = self.bucket(&object.bucket)?.storage_class.clone();
        check_preconditions(self.current(&object.bucket, &object.name), options, Target::Object)?;
        let crc32c = BASE64_STANDARD.encode(crc32c::crc32c(&data).to_be_bytes());
        let md5 = BASE64_STANDARD.encode(md5::compute(&data).0);
        if object.crc32c.as_ref().is_some_and(|v| *v != crc32c) {
            return Err(bad_request("the CRC32C checksum does not match the data"));
        }
        if object.md5_hash.as_ref().is_some_and(|v| *v != md5) {
            return Err(bad_request("the MD5 hash does not match the data"));
        }
        self.last_generation += 1;
        object.generation = Some(self.last_generation);
        object.metageneration = Some(1);
        object.size = Some(data.len() as u64);
        object.crc32c = Some(crc32c);
        object.md5_hash = Some(md5);
        object.etag = Some(format!("etag-{}", self.last_generation));
        if object.storage_class.is_none() {
            object.storage_class = storage_class;
        }
        tracing::debug!(bucket = %object.bucket, name = %object.name, generation = self.last_generation, "commit");
        self.objects.insert(
            key(&object.bucket, &object.name),
            Stored {
                object: object.clone(),
                data,
            },
        );
        Ok(object)
    }

    fn get_object(&self, id: &BlobId, options: &RpcOptions) -> Result<Object> {
        let stored = self.lookup(id)?;
        check_preconditions(Some(&stored.object), options, Target::Object)?;
        Ok(stored.object.clone())
    }

    fn patch_object(&mut self, patch: Object, options: &RpcOptions) -> Result<Object> {
        let id = patch.blob_id();
        let current = self.lookup(&id)?.object.clone();
        check_preconditions(Some(&current), options, Target::Object)?;
        let mut updated = current;
        macro_rules! merge {
            ($($field:ident),*) => {
                $( if patch.$field.is_some() { updated.$field = patch.$field.clone(); } )*
            };
        }
        merge!(
            content_type,
            content_encoding,
            content_language,
            content_disposition,
            cache_control,
            metadata,
            storage_class,
            acl
        );
        updated.metageneration = updated.metageneration.map(|m| m + 1);
        if let Some(stored) = self.objects.get_mut(&key(&updated.bucket, &updated.name)) {
            stored.object = updated.clone();
        }
        Ok(updated)
    }

    fn delete_object(&mut self, id: &BlobId, options: &RpcOptions) -> Result<()> {
        let stored = self.lookup(id)?;
        check_preconditions(Some(&stored.object), options, Target::Object)?;
        self.objects.remove(&key(id.bucket(), id.name()));
        Ok(())
    }
}

impl google_cloud_storage_core::stub::Storage for FakeStorage {
    async fn create_bucket(&self, bucket: Bucket, _options: RpcOptions) -> Result<Bucket> {
        let mut state = self.call("create_bucket");
        if state.buckets.contains_key(&bucket.name) {
            return Err(service(
                StatusCode::CONFLICT,
                format!("bucket {} already exists", bucket.name),
            ));
        }
        Ok(state.insert_bucket(bucket))
    }

    async fn get_bucket(&self, name: String, options: RpcOptions) -> Result<Bucket> {
        let state = self.call("get_bucket");
        let bucket = state.bucket(&name)?;
        check_bucket_preconditions(bucket, &options)?;
        Ok(bucket.clone())
    }

    async fn list_buckets(&self, options: RpcOptions) -> Result<ListResponse<Bucket>> {
        let state = self.call("list_buckets");
        let prefix = options.get_str(RpcOption::Prefix).unwrap_or_default();
        let entries = state
            .buckets
            .values()
            .filter(|b| b.name.starts_with(prefix))
            .cloned()
            .collect::<Vec<_>>();
        let (items, token) = paginate(entries, &options)?;
        let response = ListResponse::new(items);
        Ok(match token {
            Some(t) => response.set_next_page_token(t),
            None => response,
        })
    }

    async fn patch_bucket(&self, patch: Bucket, options: RpcOptions) -> Result<Bucket> {
        let mut state = self.call("patch_bucket");
        let mut updated = state.bucket(&patch.name)?.clone();
        check_bucket_preconditions(&updated, &options)?;
        if patch.storage_class.is_some() {
            updated.storage_class = patch.storage_class;
        }
        if patch.versioning_enabled.is_some() {
            updated.versioning_enabled = patch.versioning_enabled;
        }
        if patch.acl.is_some() {
            updated.acl = patch.acl;
        }
        if patch.default_object_acl.is_some() {
            updated.default_object_acl = patch.default_object_acl;
        }
        updated.metageneration = updated.metageneration.map(|m| m + 1);
        state.buckets.insert(updated.name.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete_bucket(&self, name: String, options: RpcOptions) -> Result<()> {
        let mut state = self.call("delete_bucket");
        check_bucket_preconditions(state.bucket(&name)?, &options)?;
        if state.objects.keys().any(|(b, _)| *b == name) {
            return Err(service(
                StatusCode::CONFLICT,
                format!("bucket {name} is not empty"),
            ));
        }
        state.buckets.remove(&name);
        Ok(())
    }

    async fn create_object(&self, object: Object, content: Bytes, options: RpcOptions) -> Result<Object> {
        self.call("create_object").commit(object, content, &options)
    }

    async fn get_object(&self, id: BlobId, options: RpcOptions) -> Result<Object> {
        self.call("get_object").get_object(&id, &options)
    }

    async fn list_objects(&self, bucket: String, options: RpcOptions) -> Result<ListResponse<Object>> {
        let state = self.call("list_objects");
        state.bucket(&bucket)?;
        let prefix = options.get_str(RpcOption::Prefix).unwrap_or_default();
        let delimiter = options.get_str(RpcOption::Delimiter).filter(|d| !d.is_empty());
        let mut entries = Vec::new();
        let mut seen = BTreeSet::new();
        for ((b, name), stored) in state.objects.iter() {
            if *b != bucket || !name.starts_with(prefix) {
                continue;
            }
            let rest = &name[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    let common = format!("{prefix}{}", &rest[..end]);
                    if seen.insert(common.clone()) {
                        entries.push(Entry::Prefix(common));
                    }
                }
                None => entries.push(Entry::Object(Box::new(stored.object.clone()))),
            }
        }
        let (page, token) = paginate(entries, &options)?;
        let mut items = Vec::new();
        let mut prefixes = Vec::new();
        for entry in page {
            match entry {
                Entry::Object(o) => items.push(*o),
                Entry::Prefix(p) => prefixes.push(p),
            }
        }
        let response = ListResponse::new(items).set_prefixes(prefixes);
        Ok(match token {
            Some(t) => response.set_next_page_token(t),
            None => response,
        })
    }

    async fn patch_object(&self, object: Object, options: RpcOptions) -> Result<Object> {
        self.call("patch_object").patch_object(object, &options)
    }

    async fn delete_object(&self, id: BlobId, options: RpcOptions) -> Result<()> {
        self.call("delete_object").delete_object(&id, &options)
    }

    async fn compose(&self, sources: Vec<SourceBlob>, mut target: Object, options: RpcOptions) -> Result<Object> {
        let mut state = self.call("compose");
        let mut data = Vec::new();
        for source in &sources {
            let mut id = BlobId::new(&target.bucket, &source.name);
            if let Some(g) = source.generation {
                id = id.with_generation(g);
            }
            data.extend_from_slice(&state.lookup(&id)?.data);
        }
        target.md5_hash = None;
        target.crc32c = None;
        let mut object = state.commit(target, Bytes::from(data), &options)?;
        object.component_count = Some(sources.len() as i32);
        // Composite objects do not have an MD5 hash.
        object.md5_hash = None;
        if let Some(stored) = state.objects.get_mut(&key(&object.bucket, &object.name)) {
            stored.object = object.clone();
        }
        Ok(object)
    }

    async fn rewrite(&self, request: RewriteRequest) -> Result<RewriteResponse> {
        let mut state = self.call("rewrite");
        let source = state.lookup(&request.source)?.clone();
        check_preconditions(Some(&source.object), &request.source_options, Target::Source)?;
        let source_bucket = state.bucket(request.source.bucket())?.clone();
        let target_bucket = state.bucket(&request.target.bucket)?.clone();
        check_preconditions(
            state.current(&request.target.bucket, &request.target.name),
            &request.target_options,
            Target::Object,
        )?;

        let total = source.data.len() as i64;
        let target_class = request
            .target
            .storage_class
            .clone()
            .or_else(|| target_bucket.storage_class.clone());
        let same_location = source_bucket.location == target_bucket.location
            && source.object.storage_class == target_class;
        let copied = match (&request.rewrite_token, same_location) {
            (_, true) => total,
            (None, false) => 0,
            (Some(token), false) => state
                .rewrites
                .remove(token)
                .ok_or_else(|| bad_request(format!("unknown rewrite token {token}")))?,
        };
        let step = request
            .max_bytes_rewritten_per_call
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_REWRITE_BYTES);
        let copied = copied.saturating_add(step).min(total).max(copied);
        if copied < total && !same_location {
            let token = state.next_id("rewrite");
            state.rewrites.insert(token.clone(), copied);
            return Ok(RewriteResponse::in_progress(token, copied, total));
        }

        let mut target = if request.override_info {
            request.target.clone()
        } else {
            let mut o = source.object.clone();
            o.bucket = request.target.bucket.clone();
            o.name = request.target.name.clone();
            o.storage_class = request.target.storage_class.clone();
            o
        };
        target.md5_hash = None;
        target.crc32c = None;
        if target.storage_class.is_none() {
            target.storage_class = target_bucket.storage_class.clone();
        }
        let object = state.commit(target, source.data, &request.target_options)?;
        Ok(RewriteResponse::done(object))
    }

    async fn open_resumable_session(&self, object: Object, options: RpcOptions) -> Result<String> {
        let mut state = self.call("open_resumable_session");
        state.bucket(&object.bucket)?;
        check_preconditions(state.current(&object.bucket, &object.name), &options, Target::Object)?;
        let id = state.next_id("session");
        state.sessions.insert(
            id.clone(),
            Session {
                object,
                options,
                data: Vec::new(),
                result: None,
            },
        );
        Ok(id)
    }

    async fn write_chunk(
        &self,
        session: String,
        offset: u64,
        data: Bytes,
        total_size: Option<u64>,
    ) -> Result<UploadStatus> {
        let mut state = self.call("write_chunk");
        let failure = state.write_failures.pop_front();
        if failure == Some(WriteFailure::Request) {
            return Err(Error::transport("injected failure, the request was lost"));
        }
        let status = {
            let current = state
                .sessions
                .get_mut(&session)
                .ok_or_else(|| not_found(format!("upload session {session} not found")))?;
            if let Some(object) = &current.result {
                UploadStatus::Finalized(Box::new(object.clone()))
            } else {
                let persisted = current.data.len() as u64;
                if offset > persisted {
                    return Err(bad_request(format!(
                        "offset {offset} is past the persisted size {persisted}"
                    )));
                }
                let end = offset + data.len() as u64;
                let skip = (persisted - offset).min(data.len() as u64) as usize;
                match total_size {
                    Some(total) if end == total => {
                        current.data.extend_from_slice(&data[skip..]);
                        UploadStatus::Partial(end)
                    }
                    Some(total) => {
                        return Err(bad_request(format!(
                            "final chunk ends at {end}, but the total size is {total}"
                        )));
                    }
                    None => {
                        // Intermediate chunks are persisted in quantum multiples.
                        let keep = (end / QUANTUM * QUANTUM).max(persisted);
                        let new = (keep - persisted) as usize;
                        current.data.extend_from_slice(&data[skip..skip + new]);
                        UploadStatus::Partial(keep)
                    }
                }
            }
        };
        let status = match (status, total_size) {
            (UploadStatus::Partial(_), Some(_)) => {
                let (object, content, options) = {
                    let s = &state.sessions[&session];
                    (s.object.clone(), Bytes::from(s.data.clone()), s.options.clone())
                };
                let object = state.commit(object, content, &options)?;
                if let Some(s) = state.sessions.get_mut(&session) {
                    s.result = Some(object.clone());
                }
                UploadStatus::Finalized(Box::new(object))
            }
            (status, _) => status,
        };
        if failure == Some(WriteFailure::Response) {
            return Err(Error::transport("injected failure, the response was lost"));
        }
        Ok(status)
    }

    async fn query_resumable_session(&self, session: String) -> Result<UploadStatus> {
        let state = self.call("query_resumable_session");
        let current = state
            .sessions
            .get(&session)
            .ok_or_else(|| not_found(format!("upload session {session} not found")))?;
        Ok(match &current.result {
            Some(object) => UploadStatus::Finalized(Box::new(object.clone())),
            None => UploadStatus::Partial(current.data.len() as u64),
        })
    }

    async fn cancel_resumable_session(&self, session: String) -> Result<()> {
        let mut state = self.call("cancel_resumable_session");
        state
            .sessions
            .remove(&session)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("upload session {session} not found")))
    }

    async fn read(&self, id: BlobId, options: RpcOptions, offset: u64, len: usize) -> Result<ReadResponse> {
        let state = self.call("read");
        let stored = state.lookup(&id)?;
        check_preconditions(Some(&stored.object), &options, Target::Object)?;
        let size = stored.data.len();
        let start = (offset as usize).min(size);
        let end = start.saturating_add(len).min(size);
        Ok(ReadResponse::new(
            stored.data.slice(start..end),
            stored.object.generation,
        ))
    }

    async fn batch(&self, operations: Vec<BatchOperation>) -> Result<Vec<BatchItemResult>> {
        let mut state = self.call("batch");
        let results = operations
            .into_iter()
            .map(|op| match op {
                BatchOperation::Get { id, options } => state.get_object(&id, &options).map(Some),
                BatchOperation::Update { object, options } => {
                    state.patch_object(object, &options).map(Some)
                }
                BatchOperation::Delete { id, options } => {
                    state.delete_object(&id, &options).map(|_| None)
                }
                _ => Err(bad_request("unsupported batch operation")),
            })
            .collect();
        Ok(results)
    }
}

enum Entry {
    Object(Box<Object>),
    Prefix(String),
}

#[derive(Clone, Copy)]
enum Target {
    Object,
    Source,
}

fn key(bucket: &str, name: &str) -> (String, String) {
    (bucket.to_string(), name.to_string())
}

/// Returns one page of `entries`, the page token is the index of the first
/// entry in the next page.
fn paginate<T>(entries: Vec<T>, options: &RpcOptions) -> Result<(Vec<T>, Option<String>)> {
    let start = match options.get_str(RpcOption::PageToken) {
        None => 0,
        Some(t) => t
            .parse::<usize>()
            .map_err(|_| bad_request(format!("invalid page token {t}")))?,
    };
    let max = options
        .get_long(RpcOption::MaxResults)
        .filter(|v| *v > 0)
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_MAX_RESULTS);
    let total = entries.len();
    let end = start.saturating_add(max).min(total);
    let page = entries.into_iter().skip(start).take(end.saturating_sub(start)).collect();
    let token = (end < total).then(|| end.to_string());
    Ok((page, token))
}

fn check_preconditions(current: Option<&Object>, options: &RpcOptions, target: Target) -> Result<()> {
    let [gm, gnm, mm, mnm] = match target {
        Target::Object => [
            RpcOption::IfGenerationMatch,
            RpcOption::IfGenerationNotMatch,
            RpcOption::IfMetagenerationMatch,
            RpcOption::IfMetagenerationNotMatch,
        ],
        Target::Source => [
            RpcOption::IfSourceGenerationMatch,
            RpcOption::IfSourceGenerationNotMatch,
            RpcOption::IfSourceMetagenerationMatch,
            RpcOption::IfSourceMetagenerationNotMatch,
        ],
    };
    // A missing object has generation 0.
    let generation = current.and_then(|o| o.generation).unwrap_or_default();
    let metageneration = current.and_then(|o| o.metageneration);
    let failed = |option: RpcOption| {
        Err(service(
            StatusCode::PRECONDITION_FAILED,
            format!("precondition {} failed", option.wire_name()),
        ))
    };
    if options.get_long(gm).is_some_and(|v| v != generation) {
        return failed(gm);
    }
    if options.get_long(gnm).is_some_and(|v| v == generation) {
        return failed(gnm);
    }
    if options.get_long(mm).is_some_and(|v| Some(v) != metageneration) {
        return failed(mm);
    }
    if options.get_long(mnm).is_some_and(|v| Some(v) == metageneration) {
        return failed(mnm);
    }
    Ok(())
}

fn check_bucket_preconditions(bucket: &Bucket, options: &RpcOptions) -> Result<()> {
    let metageneration = bucket.metageneration;
    if options
        .get_long(RpcOption::IfMetagenerationMatch)
        .is_some_and(|v| Some(v) != metageneration)
        || options
            .get_long(RpcOption::IfMetagenerationNotMatch)
            .is_some_and(|v| Some(v) == metageneration)
    {
        return Err(service(
            StatusCode::PRECONDITION_FAILED,
            format!("bucket {} metageneration precondition failed", bucket.name),
        ));
    }
    Ok(())
}

fn service<M: Into<String>>(code: StatusCode, message: M) -> Error {
    Error::service(Status::new(code, message))
}

fn not_found<M: Into<String>>(message: M) -> Error {
    Error::service(Status::not_found(message))
}

fn bad_request<M: Into<String>>(message: M) -> Error {
    service(StatusCode::BAD_REQUEST, message)
}
