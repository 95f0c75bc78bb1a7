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

//! Errors for the Cloud Storage transfer engine.
//!
//! All the operations in this crate return [Error]. The more specific types
//! in this module are often returned as the `source()` of an [Error].

use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The core error returned by all the operations in this crate.
///
/// The error reports problems from multiple sources: the application may
/// provide invalid or conflicting options, the service may reject a request
/// (for example, because a precondition did not hold), the transport may be
/// unable to reach the service, or the service may return responses that
/// violate the protocol.
///
/// Most applications will just return the error or log it. Applications that
/// need to react to specific conditions can use the predicates, such as
/// [is_not_found()][Error::is_not_found] or
/// [is_precondition_failed()][Error::is_precondition_failed].
///
/// # Example
/// ```
/// use google_cloud_storage_core::error::{Error, Status};
/// let error = Error::service(Status::new(http::StatusCode::PRECONDITION_FAILED, "generation mismatch"));
/// assert!(error.is_precondition_failed());
/// assert!(!error.is_not_found());
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

#[derive(Debug)]
enum ErrorKind {
    InvalidOption,
    Service(Box<Status>),
    Transport,
    IncompleteTransfer,
    Deserialization,
}

impl Error {
    /// Creates an error representing a malformed or conflicting option.
    pub fn invalid_option(source: InvalidOption) -> Self {
        Self {
            kind: ErrorKind::InvalidOption,
            source: Some(source.into()),
        }
    }

    /// The request was not sent because its options are invalid.
    ///
    /// This is always a client-side generated error, and indicates a bug in
    /// the application. Retrying the request will fail in the same way.
    pub fn is_invalid_option(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidOption)
    }

    /// Creates an error with the information returned by the service.
    pub fn service(status: Status) -> Self {
        Self {
            kind: ErrorKind::Service(Box::new(status)),
            source: None,
        }
    }

    /// The service status, if the service rejected the request.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// The service reports that a conditional-request option did not hold.
    pub fn is_precondition_failed(&self) -> bool {
        self.status()
            .is_some_and(|s| s.code == http::StatusCode::PRECONDITION_FAILED)
    }

    /// The service reports the bucket or object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status()
            .is_some_and(|s| s.code == http::StatusCode::NOT_FOUND)
    }

    /// The service denied access to the bucket or object.
    pub fn is_permission_denied(&self) -> bool {
        self.status().is_some_and(|s| {
            s.code == http::StatusCode::FORBIDDEN || s.code == http::StatusCode::UNAUTHORIZED
        })
    }

    /// Creates an error representing a transport problem.
    pub fn transport<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Transport,
            source: Some(source.into()),
        }
    }

    /// The request could not be completed because of a transport problem.
    ///
    /// The request may or may not have reached the service. This crate does
    /// not retry any requests, the transport collaborator owns the retry
    /// policy.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Creates an error representing a transfer channel closed too early.
    pub fn incomplete_transfer<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::IncompleteTransfer,
            source: Some(source.into()),
        }
    }

    /// A write channel was closed before the object was finalized.
    ///
    /// The upload session was aborted and the object was not created. Writing
    /// to a channel after the object is finalized also returns this error.
    pub fn is_incomplete_transfer(&self) -> bool {
        matches!(self.kind, ErrorKind::IncompleteTransfer)
    }

    /// Creates an error representing an unexpected response.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response from the service violates the protocol.
    ///
    /// # Troubleshooting
    ///
    /// These errors indicate a bug in the service, in the transport, or in
    /// this crate. The `source()` contains the details.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::InvalidOption, Some(e)) => write!(f, "invalid option: {e}"),
            (ErrorKind::Service(s), _) => write!(f, "the service reports an error: {s}"),
            (ErrorKind::Transport, Some(e)) => write!(f, "transport error: {e}"),
            (ErrorKind::IncompleteTransfer, Some(e)) => write!(f, "incomplete transfer: {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "unexpected response from the service: {e}")
            }
            (_, None) => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<InvalidOption> for Error {
    fn from(value: InvalidOption) -> Self {
        Self::invalid_option(value)
    }
}

/// The status reported by the service for a rejected request.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Status {
    /// The HTTP status code, as the JSON API reports it.
    pub code: http::StatusCode,
    /// A developer-facing message.
    pub message: String,
}

impl Status {
    pub fn new<M: Into<String>>(code: http::StatusCode, message: M) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::new(http::StatusCode::NOT_FOUND, message)
    }

    pub fn precondition_failed<M: Into<String>>(message: M) -> Self {
        Self::new(http::StatusCode::PRECONDITION_FAILED, message)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// A malformed or conflicting option.
///
/// These errors are detected before any request is sent to the service.
///
/// # Example
/// ```
/// use google_cloud_storage_core::options::PredefinedAcl;
/// use google_cloud_storage_core::error::InvalidOption;
/// let err = "not-an-acl".parse::<PredefinedAcl>().unwrap_err();
/// assert!(matches!(err, InvalidOption::UnknownValue { .. }));
/// ```
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum InvalidOption {
    /// A string could not be mapped to one of the values of a closed
    /// enumeration.
    #[error("`{value}` is not a valid {kind}")]
    UnknownValue { kind: &'static str, value: String },

    /// The same option kind was provided more than once in a single call.
    #[error("the `{0}` option was provided more than once")]
    DuplicateOption(&'static str),

    /// The option takes its value from the target metadata, which does not
    /// have it.
    #[error("the `{option}` option requires the target `{field}` to be set")]
    MissingValue {
        option: &'static str,
        field: &'static str,
    },

    /// Overriding the metadata in a copy requires a content type.
    #[error("the copy target must have a content type when overriding the metadata")]
    MissingContentType,

    /// The option kind is not valid for the operation.
    #[error("the `{option}` option is not a valid {operation}")]
    UnsupportedOption {
        option: &'static str,
        operation: &'static str,
    },

    /// A compose request needs at least one source.
    #[error("a compose request requires at least one source object")]
    EmptyComposeSources,

    /// The copy chunk size must be positive and fit in a byte count.
    #[error("{0} is not a valid number of megabytes copied per chunk")]
    InvalidChunkSize(i64),

    /// The expiration of a signed URL is too far in the future.
    #[error("a signed URL cannot be valid for {seconds} seconds")]
    DurationOutOfRange { seconds: u64 },
}

/// An unrecoverable problem in the resumable upload protocol.
///
/// # Troubleshoot
///
/// These errors indicate a bug in the resumable upload protocol
/// implementation, either in the service, the transport, or this crate.
/// There is little the application can do to recover from this problem.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum WriteError {
    /// The service has "uncommitted" previously persisted bytes.
    #[error(
        "the service previously persisted {offset} bytes, but now reports only {persisted} as persisted"
    )]
    UnexpectedRewind { offset: u64, persisted: u64 },

    /// The service reports more bytes persisted than sent.
    ///
    /// Most likely this indicates that two concurrent uploads are using the
    /// same session.
    #[error("the service reports {persisted} bytes as persisted, but we only sent {sent} bytes")]
    TooMuchProgress { sent: u64, persisted: u64 },

    /// The service accepted all the data and the final marker, but did not
    /// finalize the object.
    #[error("the service did not finalize the upload after receiving all {size} bytes")]
    NotFinalized { size: u64 },

    /// The service finalized the object before the final chunk was sent.
    #[error("the service finalized the upload after {sent} bytes, before the final chunk")]
    UnexpectedFinalization { sent: u64 },

    /// The service accepted none of the data in the final chunk.
    #[error("the service persisted no data after offset {offset} in the final chunk")]
    NoProgress { offset: u64 },

    /// The checksums reported by the service do not match the data sent.
    #[error("checksum mismatch {mismatch} when uploading {object} to {bucket}")]
    ChecksumMismatch {
        mismatch: ChecksumMismatch,
        bucket: String,
        object: String,
    },
}

/// Problems using a transfer channel.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ChannelError {
    /// The write channel was closed before the final chunk was sent.
    #[error("the upload session was closed after {sent} bytes, before the object was finalized")]
    NotFinalized { sent: u64 },

    /// Data was written after the object was finalized.
    #[error("cannot write to an upload session that is already finalized")]
    AlreadyFinalized,
}

/// An unexpected response in a rewrite (copy) operation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RewriteError {
    /// The service reports less progress than in a previous response.
    #[error("the rewrite progress went back from {previous} to {current} bytes")]
    ProgressRewind { previous: i64, current: i64 },

    /// The service did not return a token to continue an incomplete rewrite.
    #[error("the rewrite is not done, but the response is missing the rewrite token")]
    MissingToken,

    /// The service reports the rewrite as done without the resulting object.
    #[error("the rewrite is done, but the response is missing the resulting object")]
    MissingResource,
}

/// An unexpected response for a batch request.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BatchError {
    /// The number of results does not match the number of requests.
    #[error("the batch contains {expected} requests, but the service returned {got} results")]
    ResultCountMismatch { expected: usize, got: usize },

    /// A result does not have the shape its request requires.
    #[error("unexpected result for the {kind} request at position {index}")]
    UnexpectedResult { index: usize, kind: &'static str },
}

/// Indicates that a checksum mismatch was detected while writing a Cloud
/// Storage object.
///
/// Both values are base64-encoded, as the service reports them.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ChecksumMismatch {
    /// The CRC32C checksum sent by the service does not match the computed value.
    Crc32c { got: String, want: String },

    /// The MD5 hash sent by the service does not match the computed value.
    Md5 { got: String, want: String },
}

impl std::fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crc32c { got, want } => write!(
                f,
                "the CRC32C checksums do not match: got={got}, want={want}"
            ),
            Self::Md5 { got, want } => {
                write!(f, "the MD5 hashes do not match: got={got}, want={want}")
            }
        }
    }
}

/// Signed URL creation errors.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SigningError {
    /// The signing collaborator failed.
    #[error("signing failed: {0}")]
    Signing(#[source] BoxError),

    /// The endpoint used to build the URL is not valid.
    #[error("invalid signing endpoint: {0}")]
    InvalidEndpoint(#[source] BoxError),

    /// The options for the signed URL are invalid.
    #[error(transparent)]
    InvalidOption(#[from] InvalidOption),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn invalid_option() {
        let error = Error::invalid_option(InvalidOption::DuplicateOption("ifGenerationMatch"));
        assert!(error.is_invalid_option(), "{error:?}");
        assert!(error.status().is_none(), "{error:?}");
        let fmt = error.to_string();
        assert!(fmt.contains("ifGenerationMatch"), "{fmt}");
        let source = error
            .source()
            .and_then(|e| e.downcast_ref::<InvalidOption>());
        assert_eq!(
            source,
            Some(&InvalidOption::DuplicateOption("ifGenerationMatch"))
        );
    }

    #[test_case(http::StatusCode::NOT_FOUND, true, false, false)]
    #[test_case(http::StatusCode::PRECONDITION_FAILED, false, true, false)]
    #[test_case(http::StatusCode::FORBIDDEN, false, false, true)]
    #[test_case(http::StatusCode::UNAUTHORIZED, false, false, true)]
    #[test_case(http::StatusCode::INTERNAL_SERVER_ERROR, false, false, false)]
    fn service(code: http::StatusCode, not_found: bool, precondition: bool, denied: bool) {
        let error = Error::service(Status::new(code, "test-only"));
        assert_eq!(error.is_not_found(), not_found, "{error:?}");
        assert_eq!(error.is_precondition_failed(), precondition, "{error:?}");
        assert_eq!(error.is_permission_denied(), denied, "{error:?}");
        assert!(!error.is_transport(), "{error:?}");
        assert_eq!(error.status().map(|s| s.code), Some(code));
        assert!(error.to_string().contains("test-only"), "{error}");
    }

    #[test]
    fn transport() {
        let error = Error::transport("connection reset");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.status().is_none(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
    }

    #[test]
    fn incomplete_transfer() {
        let error = Error::incomplete_transfer(ChannelError::NotFinalized { sent: 42 });
        assert!(error.is_incomplete_transfer(), "{error:?}");
        assert!(error.to_string().contains("42"), "{error}");
    }

    #[test]
    fn deser() {
        let error = Error::deser(RewriteError::MissingToken);
        assert!(error.is_deserialization(), "{error:?}");
        let source = error
            .source()
            .and_then(|e| e.downcast_ref::<RewriteError>());
        assert!(matches!(source, Some(RewriteError::MissingToken)), "{error:?}");
    }

    #[test]
    fn mismatch_crc32c() {
        let value = ChecksumMismatch::Crc32c {
            got: "AAAAAA==".to_string(),
            want: "AQIDBA==".to_string(),
        };
        let fmt = value.to_string();
        assert!(fmt.contains("got=AAAAAA=="), "{value:?} => {fmt}");
        assert!(fmt.contains("want=AQIDBA=="), "{value:?} => {fmt}");
    }

    #[test]
    fn write_error() {
        let value = WriteError::TooMuchProgress {
            sent: 100,
            persisted: 200,
        };
        let fmt = value.to_string();
        assert!(fmt.contains("100"), "{fmt}");
        assert!(fmt.contains("200"), "{fmt}");
    }
}
