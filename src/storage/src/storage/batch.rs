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

use crate::error::BatchError;
use crate::model::{BatchItemResult, BatchOperation, BlobId, Object};
use crate::options::{BlobGetOption, BlobSourceOption, BlobTargetOption, to_rpc_options};
use crate::storage::preconditions::resolve_target_options;
use crate::storage::stub::Storage;
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
enum BatchItem {
    Get(BlobId, Vec<BlobGetOption>),
    Update(Object, Vec<BlobTargetOption>),
    Delete(BlobId, Vec<BlobSourceOption>),
}

/// Several independent object operations, sent in a single call.
///
/// The results are returned in the same order as the operations. The same
/// object may appear more than once.
///
/// # Example
/// ```
/// # use google_cloud_storage_core::batch::BatchRequest;
/// # use google_cloud_storage_core::model::{BlobId, Object};
/// # use google_cloud_storage_core::options::{BlobGetOption, BlobSourceOption};
/// let request = BatchRequest::new()
///     .get(BlobId::new("bucket", "a"), [BlobGetOption::generation_match(1)])
///     .update(Object::new("bucket", "b").set_content_type("text/plain"), [])
///     .delete(BlobId::new("bucket", "c"), [BlobSourceOption::metageneration_match(2)]);
/// assert_eq!(request.len(), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchRequest {
    items: Vec<BatchItem>,
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a lookup.
    pub fn get<I>(mut self, id: BlobId, options: I) -> Self
    where
        I: IntoIterator<Item = BlobGetOption>,
    {
        self.items
            .push(BatchItem::Get(id, options.into_iter().collect()));
        self
    }

    /// Adds a metadata update.
    pub fn update<I>(mut self, object: Object, options: I) -> Self
    where
        I: IntoIterator<Item = BlobTargetOption>,
    {
        self.items
            .push(BatchItem::Update(object, options.into_iter().collect()));
        self
    }

    /// Adds a delete.
    pub fn delete<I>(mut self, id: BlobId, options: I) -> Self
    where
        I: IntoIterator<Item = BlobSourceOption>,
    {
        self.items
            .push(BatchItem::Delete(id, options.into_iter().collect()));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn into_operations(self) -> Result<Vec<BatchOperation>> {
        self.items
            .into_iter()
            .map(|item| {
                let op = match item {
                    BatchItem::Get(id, options) => BatchOperation::Get {
                        id,
                        options: to_rpc_options(options.iter().map(BlobGetOption::as_option), None)?,
                    },
                    BatchItem::Update(object, options) => {
                        let options = resolve_target_options(&object, &options)?;
                        BatchOperation::Update { object, options }
                    }
                    BatchItem::Delete(id, options) => BatchOperation::Delete {
                        id,
                        options: to_rpc_options(options.iter().map(BlobSourceOption::as_option), None)?,
                    },
                };
                Ok::<_, Error>(op)
            })
            .collect()
    }
}

/// The outcome of a single operation in a batch.
#[derive(Debug)]
#[non_exhaustive]
pub enum BatchResult {
    /// A lookup or update succeeded.
    Object(Object),
    /// A delete succeeded.
    Deleted,
    /// The object does not exist.
    NotFound,
    /// The operation failed, for example, a precondition did not hold or the
    /// caller does not have permission.
    Failed(Error),
}

impl BatchResult {
    pub fn object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// The results of a batch, one per operation, in the same order.
#[derive(Debug, Default)]
pub struct BatchResponse {
    results: Vec<BatchResult>,
}

impl BatchResponse {
    pub fn results(&self) -> &[BatchResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<BatchResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchResult> {
        self.results.iter()
    }
}

impl std::ops::Index<usize> for BatchResponse {
    type Output = BatchResult;
    fn index(&self, index: usize) -> &Self::Output {
        &self.results[index]
    }
}

impl IntoIterator for BatchResponse {
    type Item = BatchResult;
    type IntoIter = std::vec::IntoIter<BatchResult>;
    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Sends all the operations in a single call and correlates the results.
pub(crate) async fn apply<S>(stub: &S, request: BatchRequest) -> Result<BatchResponse>
where
    S: Storage,
{
    if request.is_empty() {
        return Ok(BatchResponse::default());
    }
    let operations = request.into_operations()?;
    let kinds = operations
        .iter()
        .map(|op| (op.kind(), matches!(op, BatchOperation::Delete { .. })))
        .collect::<Vec<_>>();
    tracing::debug!(count = operations.len(), "sending batch");
    let results = stub.batch(operations).await?;
    if results.len() != kinds.len() {
        return Err(Error::deser(BatchError::ResultCountMismatch {
            expected: kinds.len(),
            got: results.len(),
        }));
    }
    let results = results
        .into_iter()
        .zip(kinds)
        .enumerate()
        .map(|(index, (result, (kind, is_delete)))| correlate(index, kind, is_delete, result))
        .collect();
    Ok(BatchResponse { results })
}

fn correlate(index: usize, kind: &'static str, is_delete: bool, result: BatchItemResult) -> BatchResult {
    match result {
        Ok(Some(object)) if !is_delete => BatchResult::Object(object),
        Ok(None) if is_delete => BatchResult::Deleted,
        Ok(_) => BatchResult::Failed(Error::deser(BatchError::UnexpectedResult { index, kind })),
        Err(e) if e.is_not_found() => BatchResult::NotFound,
        Err(e) => BatchResult::Failed(e),
    }
}
