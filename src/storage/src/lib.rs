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

//! Google Cloud Storage - transfer and consistency options
//!
//! This crate contains the client-side engine to interact with [Google Cloud
//! Storage]: typed options and preconditions, chunked read and write
//! channels, multi-step copies, batches, and signed URLs. The engine sends
//! each request through a transport, any implementation of [stub::Storage].
//! Most applications will use the structs defined in the [client] module.
//! More specifically:
//!
//! * [Storage][client::Storage]
//! * [BlobReadChannel][channel::BlobReadChannel]
//! * [BlobWriteChannel][channel::BlobWriteChannel]
//! * [CopyWriter][copy_writer::CopyWriter]
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases.
//!
//! [Google Cloud Storage]: https://cloud.google.com/storage

pub mod error;
pub use error::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub mod model;
pub mod model_ext;
pub mod options;

mod storage;

/// Clients to interact with Google Cloud Storage.
pub mod client {
    pub use crate::storage::client::{ClientBuilder, Storage};
    pub use crate::storage::common_options::CommonOptions;
}

/// Transfer channels for object data.
pub mod channel {
    pub use crate::storage::read_channel::{BlobReadChannel, ReadChannelState};
    pub use crate::storage::write_channel::{BlobWriteChannel, WriteChannelState};
}

pub use storage::batch;
pub use storage::copy_writer;
pub use storage::paginator;
pub use storage::preconditions;
pub use storage::signed_url;
pub use storage::stub;

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    type Mock = crate::storage::tests::MockStorage;

    #[test]
    fn traits() {
        assert_impl_all!(Error: std::error::Error, Send, Sync);
        assert_impl_all!(client::Storage<Mock>: Clone, std::fmt::Debug, Send, Sync);
        assert_impl_all!(channel::BlobReadChannel<Mock>: std::fmt::Debug, Send, Sync);
        assert_impl_all!(channel::BlobWriteChannel<Mock>: std::fmt::Debug, Send, Sync);
        assert_impl_all!(copy_writer::CopyWriter<Mock>: std::fmt::Debug, Send, Sync);
        assert_impl_all!(paginator::Paginator<model::Object>: Send);
        assert_impl_all!(model::BlobId: Clone, std::hash::Hash, Eq, Send, Sync);
        assert_impl_all!(options::BlobWriteOption: Clone, Send, Sync);
        assert_impl_all!(batch::BatchResponse: Send, Sync);
    }
}
