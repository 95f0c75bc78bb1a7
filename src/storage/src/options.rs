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

//! Typed modifiers for Cloud Storage operations.
//!
//! Each operation accepts a slice of options of a specific type, for example,
//! [Storage::get_object][crate::client::Storage::get_object] accepts
//! [BlobGetOption] values. All these types wrap a single [StorageOption], the
//! type determines which option kinds are valid for each operation.
//!
//! Options of different kinds compose freely and their order is irrelevant.
//! Providing the same kind more than once in a single call is an error.
//!
//! # Example
//! ```
//! use google_cloud_storage_core::options::{BlobField, BlobGetOption};
//! let options = [
//!     BlobGetOption::generation_match(1234),
//!     BlobGetOption::fields([BlobField::Size, BlobField::ContentType]),
//! ];
//! ```

use crate::error::InvalidOption;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod fields;
pub use fields::{BlobField, BucketField};

/// The wire parameters for an RPC.
///
/// The closed set of parameter names the transport collaborator understands.
/// Use [wire_name()][RpcOption::wire_name] to get the name used in the JSON
/// API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RpcOption {
    PredefinedAcl,
    PredefinedDefaultObjectAcl,
    IfGenerationMatch,
    IfGenerationNotMatch,
    IfMetagenerationMatch,
    IfMetagenerationNotMatch,
    IfSourceGenerationMatch,
    IfSourceGenerationNotMatch,
    IfSourceMetagenerationMatch,
    IfSourceMetagenerationNotMatch,
    IfMd5Match,
    IfCrc32cMatch,
    Fields,
    PageToken,
    Prefix,
    Delimiter,
    MaxResults,
}

impl RpcOption {
    /// The name of the parameter in the JSON API.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::PredefinedAcl => "predefinedAcl",
            Self::PredefinedDefaultObjectAcl => "predefinedDefaultObjectAcl",
            Self::IfGenerationMatch => "ifGenerationMatch",
            Self::IfGenerationNotMatch => "ifGenerationNotMatch",
            Self::IfMetagenerationMatch => "ifMetagenerationMatch",
            Self::IfMetagenerationNotMatch => "ifMetagenerationNotMatch",
            Self::IfSourceGenerationMatch => "ifSourceGenerationMatch",
            Self::IfSourceGenerationNotMatch => "ifSourceGenerationNotMatch",
            Self::IfSourceMetagenerationMatch => "ifSourceMetagenerationMatch",
            Self::IfSourceMetagenerationNotMatch => "ifSourceMetagenerationNotMatch",
            Self::IfMd5Match => "ifMd5Match",
            Self::IfCrc32cMatch => "ifCrc32cMatch",
            Self::Fields => "fields",
            Self::PageToken => "pageToken",
            Self::Prefix => "prefix",
            Self::Delimiter => "delimiter",
            Self::MaxResults => "maxResults",
        }
    }

    // The source object in a rewrite uses a different set of names.
    fn source_variant(self) -> Self {
        match self {
            Self::IfGenerationMatch => Self::IfSourceGenerationMatch,
            Self::IfGenerationNotMatch => Self::IfSourceGenerationNotMatch,
            Self::IfMetagenerationMatch => Self::IfSourceMetagenerationMatch,
            Self::IfMetagenerationNotMatch => Self::IfSourceMetagenerationNotMatch,
            other => other,
        }
    }
}

/// A primitive value for a wire parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Long(i64),
    Bool(bool),
    String(String),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

/// The option map sent with each RPC.
///
/// Contains at most one value per [RpcOption].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcOptions(BTreeMap<RpcOption, OptionValue>);

impl RpcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, option: RpcOption) -> Option<&OptionValue> {
        self.0.get(&option)
    }

    /// Returns the value of an integer parameter, if present.
    pub fn get_long(&self, option: RpcOption) -> Option<i64> {
        match self.0.get(&option) {
            Some(OptionValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value of a string parameter, if present.
    pub fn get_str(&self, option: RpcOption) -> Option<&str> {
        match self.0.get(&option) {
            Some(OptionValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn contains(&self, option: RpcOption) -> bool {
        self.0.contains_key(&option)
    }

    /// Sets the value for `option`, replacing any previous value.
    pub fn insert(&mut self, option: RpcOption, value: OptionValue) -> Option<OptionValue> {
        self.0.insert(option, value)
    }

    pub fn remove(&mut self, option: RpcOption) -> Option<OptionValue> {
        self.0.remove(&option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RpcOption, &OptionValue)> {
        self.0.iter()
    }

    /// The options as `(name, value)` query parameters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.wire_name(), v.to_string()))
            .collect()
    }
}

/// A predefined (or "canned") access control list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredefinedAcl {
    AuthenticatedRead,
    AllAuthenticatedUsers,
    Private,
    ProjectPrivate,
    PublicRead,
    PublicReadWrite,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl PredefinedAcl {
    const ALL: [PredefinedAcl; 8] = [
        Self::AuthenticatedRead,
        Self::AllAuthenticatedUsers,
        Self::Private,
        Self::ProjectPrivate,
        Self::PublicRead,
        Self::PublicReadWrite,
        Self::BucketOwnerRead,
        Self::BucketOwnerFullControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticatedRead => "authenticatedRead",
            Self::AllAuthenticatedUsers => "allAuthenticatedUsers",
            Self::Private => "private",
            Self::ProjectPrivate => "projectPrivate",
            Self::PublicRead => "publicRead",
            Self::PublicReadWrite => "publicReadWrite",
            Self::BucketOwnerRead => "bucketOwnerRead",
            Self::BucketOwnerFullControl => "bucketOwnerFullControl",
        }
    }
}

impl std::str::FromStr for PredefinedAcl {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| InvalidOption::UnknownValue {
                kind: "predefined ACL",
                value: s.to_string(),
            })
    }
}

/// A single option, as a `(kind, value)` pair.
///
/// The variant determines the shape of the value. Applications rarely use
/// this type directly, the typed wrappers such as [BlobGetOption] restrict
/// the kinds to those valid for each operation.
///
/// The precondition variants with a `None` value take their value from the
/// target metadata when the request is sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StorageOption {
    PredefinedAcl(PredefinedAcl),
    PredefinedDefaultObjectAcl(PredefinedAcl),
    IfGenerationMatch(Option<i64>),
    IfGenerationNotMatch(Option<i64>),
    IfMetagenerationMatch(Option<i64>),
    IfMetagenerationNotMatch(Option<i64>),
    IfMd5Match,
    IfCrc32cMatch,
    Fields(String),
    PageToken(String),
    Prefix(String),
    /// `None` removes the delimiter, listing all objects recursively.
    Delimiter(Option<String>),
    MaxResults(u64),
}

impl StorageOption {
    /// The wire parameter for this option.
    pub fn rpc_option(&self) -> RpcOption {
        match self {
            Self::PredefinedAcl(_) => RpcOption::PredefinedAcl,
            Self::PredefinedDefaultObjectAcl(_) => RpcOption::PredefinedDefaultObjectAcl,
            Self::IfGenerationMatch(_) => RpcOption::IfGenerationMatch,
            Self::IfGenerationNotMatch(_) => RpcOption::IfGenerationNotMatch,
            Self::IfMetagenerationMatch(_) => RpcOption::IfMetagenerationMatch,
            Self::IfMetagenerationNotMatch(_) => RpcOption::IfMetagenerationNotMatch,
            Self::IfMd5Match => RpcOption::IfMd5Match,
            Self::IfCrc32cMatch => RpcOption::IfCrc32cMatch,
            Self::Fields(_) => RpcOption::Fields,
            Self::PageToken(_) => RpcOption::PageToken,
            Self::Prefix(_) => RpcOption::Prefix,
            Self::Delimiter(_) => RpcOption::Delimiter,
            Self::MaxResults(_) => RpcOption::MaxResults,
        }
    }

    fn value(&self, target: Option<&dyn ImplicitValues>) -> Result<Option<OptionValue>, InvalidOption> {
        let implicit = |v: &Option<i64>, field: &'static str, get: fn(&dyn ImplicitValues) -> Option<i64>| {
            v.or_else(|| target.and_then(get))
                .map(|v| Some(OptionValue::Long(v)))
                .ok_or(InvalidOption::MissingValue {
                    option: self.rpc_option().wire_name(),
                    field,
                })
        };
        let value = match self {
            Self::PredefinedAcl(acl) | Self::PredefinedDefaultObjectAcl(acl) => {
                Some(OptionValue::String(acl.as_str().to_string()))
            }
            Self::IfGenerationMatch(v) | Self::IfGenerationNotMatch(v) => {
                implicit(v, "generation", |t| t.generation())?
            }
            Self::IfMetagenerationMatch(v) | Self::IfMetagenerationNotMatch(v) => {
                implicit(v, "metageneration", |t| t.metageneration())?
            }
            Self::IfMd5Match | Self::IfCrc32cMatch => Some(OptionValue::Bool(true)),
            Self::Fields(v) | Self::PageToken(v) | Self::Prefix(v) => {
                Some(OptionValue::String(v.clone()))
            }
            Self::Delimiter(v) => v.clone().map(OptionValue::String),
            Self::MaxResults(v) => Some(OptionValue::Long(i64::try_from(*v).unwrap_or(i64::MAX))),
        };
        Ok(value)
    }
}

/// Metadata that provides the values for implicit preconditions.
pub(crate) trait ImplicitValues {
    fn generation(&self) -> Option<i64>;
    fn metageneration(&self) -> Option<i64>;
}

impl ImplicitValues for crate::model::Object {
    fn generation(&self) -> Option<i64> {
        self.generation
    }
    fn metageneration(&self) -> Option<i64> {
        self.metageneration
    }
}

impl ImplicitValues for crate::model::Bucket {
    fn generation(&self) -> Option<i64> {
        None
    }
    fn metageneration(&self) -> Option<i64> {
        self.metageneration
    }
}

/// Converts a list of options to the wire map.
///
/// Fails if the same kind appears more than once, or if an implicit
/// precondition has no value in `target`.
pub(crate) fn to_rpc_options<'a, I>(
    options: I,
    target: Option<&dyn ImplicitValues>,
) -> Result<RpcOptions, InvalidOption>
where
    I: IntoIterator<Item = &'a StorageOption>,
{
    let mut map = BTreeMap::new();
    let mut seen = std::collections::BTreeSet::new();
    for option in options {
        let kind = option.rpc_option();
        if !seen.insert(kind) {
            return Err(InvalidOption::DuplicateOption(kind.wire_name()));
        }
        if let Some(value) = option.value(target)? {
            map.insert(kind, value);
        }
    }
    Ok(RpcOptions(map))
}

/// Converts the options for the source of a copy to the wire map.
pub(crate) fn to_source_rpc_options<'a, I>(options: I) -> Result<RpcOptions, InvalidOption>
where
    I: IntoIterator<Item = &'a StorageOption>,
{
    let map = to_rpc_options(options, None)?;
    Ok(RpcOptions(
        map.0
            .into_iter()
            .map(|(k, v)| (k.source_variant(), v))
            .collect(),
    ))
}

macro_rules! typed_option {
    ($(#[$attr:meta])* $name:ident, allowed = $allowed:pat) => {
        $(#[$attr])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(try_from = "StorageOption", into = "StorageOption")]
        pub struct $name(StorageOption);

        impl TryFrom<StorageOption> for $name {
            type Error = InvalidOption;

            fn try_from(value: StorageOption) -> Result<Self, Self::Error> {
                match value {
                    $allowed => Ok(Self(value)),
                    _ => Err(InvalidOption::UnsupportedOption {
                        option: value.rpc_option().wire_name(),
                        operation: stringify!($name),
                    }),
                }
            }
        }

        impl $name {
            /// The underlying `(kind, value)` pair.
            pub fn as_option(&self) -> &StorageOption {
                &self.0
            }
        }

        impl From<$name> for StorageOption {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_option!(
    /// Options for operations that create or modify a bucket.
    BucketTargetOption,
    allowed = StorageOption::PredefinedAcl(_)
        | StorageOption::PredefinedDefaultObjectAcl(_)
        | StorageOption::IfMetagenerationMatch(None)
        | StorageOption::IfMetagenerationNotMatch(None)
);

impl BucketTargetOption {
    pub fn predefined_acl(acl: PredefinedAcl) -> Self {
        Self(StorageOption::PredefinedAcl(acl))
    }

    pub fn predefined_default_object_acl(acl: PredefinedAcl) -> Self {
        Self(StorageOption::PredefinedDefaultObjectAcl(acl))
    }

    /// Only update the bucket if its metageneration matches the metageneration
    /// in the bucket metadata sent with the request.
    pub fn metageneration_match() -> Self {
        Self(StorageOption::IfMetagenerationMatch(None))
    }

    /// Only update the bucket if its metageneration does not match the
    /// metageneration in the bucket metadata sent with the request.
    pub fn metageneration_not_match() -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(None))
    }
}

typed_option!(
    /// Options for operations on an existing bucket, such as delete.
    BucketSourceOption,
    allowed = StorageOption::IfMetagenerationMatch(Some(_))
        | StorageOption::IfMetagenerationNotMatch(Some(_))
);

impl BucketSourceOption {
    pub fn metageneration_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationMatch(Some(metageneration)))
    }

    pub fn metageneration_not_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(Some(metageneration)))
    }
}

typed_option!(
    /// Options for bucket lookups.
    BucketGetOption,
    allowed = StorageOption::IfMetagenerationMatch(Some(_))
        | StorageOption::IfMetagenerationNotMatch(Some(_))
        | StorageOption::Fields(_)
);

impl BucketGetOption {
    pub fn metageneration_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationMatch(Some(metageneration)))
    }

    pub fn metageneration_not_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(Some(metageneration)))
    }

    /// Selects the bucket fields returned by the service.
    ///
    /// The bucket name is always returned, even if not requested.
    pub fn fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = BucketField>,
    {
        Self(StorageOption::Fields(BucketField::selector(fields)))
    }
}

typed_option!(
    /// Options for listing buckets.
    BucketListOption,
    allowed = StorageOption::MaxResults(_)
        | StorageOption::PageToken(_)
        | StorageOption::Prefix(_)
        | StorageOption::Fields(_)
);

impl BucketListOption {
    pub fn max_results(max_results: u64) -> Self {
        Self(StorageOption::MaxResults(max_results))
    }

    /// Starts the listing at the page identified by `token`.
    pub fn page_token<T: Into<String>>(token: T) -> Self {
        Self(StorageOption::PageToken(token.into()))
    }

    pub fn prefix<T: Into<String>>(prefix: T) -> Self {
        Self(StorageOption::Prefix(prefix.into()))
    }

    /// Selects the bucket fields returned for each item.
    pub fn fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = BucketField>,
    {
        Self(StorageOption::Fields(format!(
            "items({})",
            BucketField::selector(fields)
        )))
    }
}

typed_option!(
    /// Options for operations that create or modify an object.
    ///
    /// The generation and metageneration preconditions take their values from
    /// the object metadata sent with the request.
    BlobTargetOption,
    allowed = StorageOption::PredefinedAcl(_)
        | StorageOption::IfGenerationMatch(None | Some(0))
        | StorageOption::IfGenerationNotMatch(None)
        | StorageOption::IfMetagenerationMatch(None)
        | StorageOption::IfMetagenerationNotMatch(None)
);

impl BlobTargetOption {
    pub fn predefined_acl(acl: PredefinedAcl) -> Self {
        Self(StorageOption::PredefinedAcl(acl))
    }

    /// Only create the object if it does not exist already.
    pub fn does_not_exist() -> Self {
        Self(StorageOption::IfGenerationMatch(Some(0)))
    }

    pub fn generation_match() -> Self {
        Self(StorageOption::IfGenerationMatch(None))
    }

    pub fn generation_not_match() -> Self {
        Self(StorageOption::IfGenerationNotMatch(None))
    }

    pub fn metageneration_match() -> Self {
        Self(StorageOption::IfMetagenerationMatch(None))
    }

    pub fn metageneration_not_match() -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(None))
    }
}

typed_option!(
    /// Options for operations that upload object data.
    ///
    /// In addition to the [BlobTargetOption] kinds, these options control
    /// which hashes in the object metadata are sent to the service for
    /// validation. By default the hashes in the metadata are ignored.
    BlobWriteOption,
    allowed = StorageOption::PredefinedAcl(_)
        | StorageOption::IfGenerationMatch(None | Some(0))
        | StorageOption::IfGenerationNotMatch(None)
        | StorageOption::IfMetagenerationMatch(None)
        | StorageOption::IfMetagenerationNotMatch(None)
        | StorageOption::IfMd5Match
        | StorageOption::IfCrc32cMatch
);

impl BlobWriteOption {
    pub fn predefined_acl(acl: PredefinedAcl) -> Self {
        Self(StorageOption::PredefinedAcl(acl))
    }

    pub fn does_not_exist() -> Self {
        Self(StorageOption::IfGenerationMatch(Some(0)))
    }

    pub fn generation_match() -> Self {
        Self(StorageOption::IfGenerationMatch(None))
    }

    pub fn generation_not_match() -> Self {
        Self(StorageOption::IfGenerationNotMatch(None))
    }

    pub fn metageneration_match() -> Self {
        Self(StorageOption::IfMetagenerationMatch(None))
    }

    pub fn metageneration_not_match() -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(None))
    }

    /// Sends the MD5 hash in the object metadata, the service rejects the
    /// upload if the data does not match it.
    pub fn md5_match() -> Self {
        Self(StorageOption::IfMd5Match)
    }

    /// Sends the CRC32C checksum in the object metadata, the service rejects
    /// the upload if the data does not match it.
    pub fn crc32c_match() -> Self {
        Self(StorageOption::IfCrc32cMatch)
    }

    pub(crate) fn into_target_option(self) -> BlobTargetOption {
        BlobTargetOption(self.0)
    }
}

typed_option!(
    /// Options for operations on an existing object, such as reads and
    /// deletes.
    BlobSourceOption,
    allowed = StorageOption::IfGenerationMatch(Some(_))
        | StorageOption::IfGenerationNotMatch(Some(_))
        | StorageOption::IfMetagenerationMatch(Some(_))
        | StorageOption::IfMetagenerationNotMatch(Some(_))
);

impl BlobSourceOption {
    pub fn generation_match(generation: i64) -> Self {
        Self(StorageOption::IfGenerationMatch(Some(generation)))
    }

    pub fn generation_not_match(generation: i64) -> Self {
        Self(StorageOption::IfGenerationNotMatch(Some(generation)))
    }

    pub fn metageneration_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationMatch(Some(metageneration)))
    }

    pub fn metageneration_not_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(Some(metageneration)))
    }
}

typed_option!(
    /// Options for object lookups.
    BlobGetOption,
    allowed = StorageOption::IfGenerationMatch(Some(_))
        | StorageOption::IfGenerationNotMatch(Some(_))
        | StorageOption::IfMetagenerationMatch(Some(_))
        | StorageOption::IfMetagenerationNotMatch(Some(_))
        | StorageOption::Fields(_)
);

impl BlobGetOption {
    pub fn generation_match(generation: i64) -> Self {
        Self(StorageOption::IfGenerationMatch(Some(generation)))
    }

    pub fn generation_not_match(generation: i64) -> Self {
        Self(StorageOption::IfGenerationNotMatch(Some(generation)))
    }

    pub fn metageneration_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationMatch(Some(metageneration)))
    }

    pub fn metageneration_not_match(metageneration: i64) -> Self {
        Self(StorageOption::IfMetagenerationNotMatch(Some(metageneration)))
    }

    /// Selects the object fields returned by the service.
    ///
    /// The bucket and object names are always returned, even if not
    /// requested. Repeated fields are requested only once.
    ///
    /// # Example
    /// ```
    /// use google_cloud_storage_core::options::{BlobField, BlobGetOption, StorageOption};
    /// let option = BlobGetOption::fields([BlobField::Size, BlobField::Crc32c, BlobField::Size]);
    /// assert_eq!(option.as_option(), &StorageOption::Fields("bucket,crc32c,name,size".to_string()));
    /// ```
    pub fn fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = BlobField>,
    {
        Self(StorageOption::Fields(BlobField::selector(fields)))
    }
}

typed_option!(
    /// Options for listing objects.
    BlobListOption,
    allowed = StorageOption::MaxResults(_)
        | StorageOption::PageToken(_)
        | StorageOption::Prefix(_)
        | StorageOption::Delimiter(_)
        | StorageOption::Fields(_)
);

impl BlobListOption {
    pub fn max_results(max_results: u64) -> Self {
        Self(StorageOption::MaxResults(max_results))
    }

    /// Starts the listing at the page identified by `token`.
    pub fn page_token<T: Into<String>>(token: T) -> Self {
        Self(StorageOption::PageToken(token.into()))
    }

    pub fn prefix<T: Into<String>>(prefix: T) -> Self {
        Self(StorageOption::Prefix(prefix.into()))
    }

    /// Lists all the objects (`true`), or only the objects directly under the
    /// prefix, using `/` as the delimiter (`false`).
    pub fn recursive(recursive: bool) -> Self {
        let delimiter = (!recursive).then(|| "/".to_string());
        Self(StorageOption::Delimiter(delimiter))
    }

    pub fn delimiter<T: Into<String>>(delimiter: T) -> Self {
        Self(StorageOption::Delimiter(Some(delimiter.into())))
    }

    /// Selects the object fields returned for each item.
    pub fn fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = BlobField>,
    {
        Self(StorageOption::Fields(format!(
            "items({})",
            BlobField::selector(fields)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bucket, Object};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    type Result = anyhow::Result<()>;

    fn convert<'a, I>(options: I) -> std::result::Result<RpcOptions, InvalidOption>
    where
        I: IntoIterator<Item = &'a StorageOption>,
    {
        to_rpc_options(options, None)
    }

    #[test]
    fn max_results_saturates() -> Result {
        let got = convert([&StorageOption::MaxResults(u64::MAX)])?;
        assert_eq!(got.get_long(RpcOption::MaxResults), Some(i64::MAX));
        Ok(())
    }

    #[test]
    fn typed_options_round_trip() -> Result {
        let options = vec![
            BlobGetOption::generation_match(7),
            BlobGetOption::fields([BlobField::Size]),
        ];
        let json = serde_json::to_string(&options)?;
        let got = serde_json::from_str::<Vec<BlobGetOption>>(&json)?;
        assert_eq!(got, options);
        Ok(())
    }

    #[test_case(StorageOption::PageToken("abc".to_string()))]
    #[test_case(StorageOption::IfGenerationMatch(None))]
    #[test_case(StorageOption::IfMd5Match)]
    fn typed_options_reject_other_kinds(option: StorageOption) -> Result {
        let json = serde_json::to_string(&option)?;
        let err = serde_json::from_str::<BlobGetOption>(&json).unwrap_err();
        assert!(err.to_string().contains("not a valid BlobGetOption"), "{err}");

        let err = BlobGetOption::try_from(option).unwrap_err();
        assert!(matches!(err, InvalidOption::UnsupportedOption { operation: "BlobGetOption", .. }), "{err:?}");
        Ok(())
    }

    #[test]
    fn write_markers_are_not_target_options() {
        let err = BlobTargetOption::try_from(StorageOption::IfCrc32cMatch).unwrap_err();
        assert_eq!(
            err,
            InvalidOption::UnsupportedOption {
                option: RpcOption::IfCrc32cMatch.wire_name(),
                operation: "BlobTargetOption",
            }
        );
        assert!(BlobWriteOption::try_from(StorageOption::IfCrc32cMatch).is_ok());
    }

    #[test]
    fn wire_names_are_unique() {
        use std::collections::BTreeSet;
        let all = [
            RpcOption::PredefinedAcl,
            RpcOption::PredefinedDefaultObjectAcl,
            RpcOption::IfGenerationMatch,
            RpcOption::IfGenerationNotMatch,
            RpcOption::IfMetagenerationMatch,
            RpcOption::IfMetagenerationNotMatch,
            RpcOption::IfSourceGenerationMatch,
            RpcOption::IfSourceGenerationNotMatch,
            RpcOption::IfSourceMetagenerationMatch,
            RpcOption::IfSourceMetagenerationNotMatch,
            RpcOption::IfMd5Match,
            RpcOption::IfCrc32cMatch,
            RpcOption::Fields,
            RpcOption::PageToken,
            RpcOption::Prefix,
            RpcOption::Delimiter,
            RpcOption::MaxResults,
        ];
        let names = all.iter().map(RpcOption::wire_name).collect::<BTreeSet<_>>();
        assert_eq!(names.len(), all.len());
    }

    #[test_case("authenticatedRead", PredefinedAcl::AuthenticatedRead)]
    #[test_case("allAuthenticatedUsers", PredefinedAcl::AllAuthenticatedUsers)]
    #[test_case("private", PredefinedAcl::Private)]
    #[test_case("projectPrivate", PredefinedAcl::ProjectPrivate)]
    #[test_case("publicRead", PredefinedAcl::PublicRead)]
    #[test_case("publicReadWrite", PredefinedAcl::PublicReadWrite)]
    #[test_case("bucketOwnerRead", PredefinedAcl::BucketOwnerRead)]
    #[test_case("bucketOwnerFullControl", PredefinedAcl::BucketOwnerFullControl)]
    fn predefined_acl(input: &str, want: PredefinedAcl) -> Result {
        let got = input.parse::<PredefinedAcl>()?;
        assert_eq!(got, want);
        assert_eq!(got.as_str(), input);
        let json = serde_json::to_value(got)?;
        assert_eq!(json, serde_json::json!(input));
        Ok(())
    }

    #[test]
    fn predefined_acl_invalid() {
        let err = "PUBLIC".parse::<PredefinedAcl>().unwrap_err();
        assert_eq!(
            err,
            InvalidOption::UnknownValue {
                kind: "predefined ACL",
                value: "PUBLIC".to_string()
            }
        );
    }

    #[test]
    fn order_independent() -> Result {
        let a = [
            BlobGetOption::generation_match(7),
            BlobGetOption::metageneration_not_match(3),
        ];
        let b = [
            BlobGetOption::metageneration_not_match(3),
            BlobGetOption::generation_match(7),
        ];
        let a = convert(a.iter().map(BlobGetOption::as_option))?;
        let b = convert(b.iter().map(BlobGetOption::as_option))?;
        assert_eq!(a, b);
        assert_eq!(a.get_long(RpcOption::IfGenerationMatch), Some(7));
        assert_eq!(a.get_long(RpcOption::IfMetagenerationNotMatch), Some(3));
        Ok(())
    }

    #[test]
    fn duplicate_kind() {
        let options = [
            BlobSourceOption::metageneration_match(1),
            BlobSourceOption::metageneration_match(2),
        ];
        let err = convert(options.iter().map(BlobSourceOption::as_option)).unwrap_err();
        assert_eq!(err, InvalidOption::DuplicateOption("ifMetagenerationMatch"));
    }

    #[test]
    fn duplicate_kind_same_value() {
        let options = [BlobWriteOption::does_not_exist(), BlobWriteOption::generation_match()];
        let err = convert(options.iter().map(BlobWriteOption::as_option)).unwrap_err();
        assert_eq!(err, InvalidOption::DuplicateOption("ifGenerationMatch"));
    }

    #[test]
    fn implicit_from_object() -> Result {
        let object = Object::new("bucket", "object")
            .set_generation(123)
            .set_metageneration(4);
        let options = [
            BlobTargetOption::generation_match(),
            BlobTargetOption::metageneration_not_match(),
            BlobTargetOption::predefined_acl(PredefinedAcl::Private),
        ];
        let got = to_rpc_options(options.iter().map(BlobTargetOption::as_option), Some(&object))?;
        assert_eq!(got.get_long(RpcOption::IfGenerationMatch), Some(123));
        assert_eq!(got.get_long(RpcOption::IfMetagenerationNotMatch), Some(4));
        assert_eq!(got.get_str(RpcOption::PredefinedAcl), Some("private"));
        Ok(())
    }

    #[test]
    fn implicit_missing() {
        let object = Object::new("bucket", "object");
        let options = [BlobTargetOption::generation_not_match()];
        let err = to_rpc_options(options.iter().map(BlobTargetOption::as_option), Some(&object))
            .unwrap_err();
        assert_eq!(
            err,
            InvalidOption::MissingValue {
                option: "ifGenerationNotMatch",
                field: "generation"
            }
        );
    }

    #[test]
    fn implicit_from_bucket() -> Result {
        let bucket = Bucket::new("bucket").set_metageneration(9);
        let options = [
            BucketTargetOption::metageneration_match(),
            BucketTargetOption::predefined_default_object_acl(PredefinedAcl::PublicRead),
        ];
        let got = to_rpc_options(options.iter().map(BucketTargetOption::as_option), Some(&bucket))?;
        assert_eq!(got.get_long(RpcOption::IfMetagenerationMatch), Some(9));
        assert_eq!(
            got.get_str(RpcOption::PredefinedDefaultObjectAcl),
            Some("publicRead")
        );
        Ok(())
    }

    #[test]
    fn does_not_exist() -> Result {
        let object = Object::new("bucket", "object").set_generation(42);
        let options = [BlobTargetOption::does_not_exist()];
        let got = to_rpc_options(options.iter().map(BlobTargetOption::as_option), Some(&object))?;
        assert_eq!(got.get_long(RpcOption::IfGenerationMatch), Some(0));
        Ok(())
    }

    #[test]
    fn source_variants() -> Result {
        let options = [
            BlobSourceOption::generation_match(1),
            BlobSourceOption::generation_not_match(2),
            BlobSourceOption::metageneration_match(3),
            BlobSourceOption::metageneration_not_match(4),
        ];
        let got = to_source_rpc_options(options.iter().map(BlobSourceOption::as_option))?;
        let pairs = got.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("ifSourceGenerationMatch", "1".to_string()),
                ("ifSourceGenerationNotMatch", "2".to_string()),
                ("ifSourceMetagenerationMatch", "3".to_string()),
                ("ifSourceMetagenerationNotMatch", "4".to_string()),
            ]
        );
        Ok(())
    }

    #[test_case(true, None)]
    #[test_case(false, Some("/"))]
    fn recursive(recursive: bool, want: Option<&str>) -> Result {
        let options = [BlobListOption::recursive(recursive)];
        let got = convert(options.iter().map(BlobListOption::as_option))?;
        assert_eq!(got.get_str(RpcOption::Delimiter), want);
        Ok(())
    }

    #[test]
    fn list_options() -> Result {
        let options = [
            BlobListOption::max_results(10),
            BlobListOption::page_token("token-123"),
            BlobListOption::prefix("logs/"),
            BlobListOption::delimiter("|"),
            BlobListOption::fields([BlobField::Size]),
        ];
        let got = convert(options.iter().map(BlobListOption::as_option))?;
        assert_eq!(got.get_long(RpcOption::MaxResults), Some(10));
        assert_eq!(got.get_str(RpcOption::PageToken), Some("token-123"));
        assert_eq!(got.get_str(RpcOption::Prefix), Some("logs/"));
        assert_eq!(got.get_str(RpcOption::Delimiter), Some("|"));
        assert_eq!(
            got.get_str(RpcOption::Fields),
            Some("items(bucket,name,size)")
        );
        Ok(())
    }

    #[test]
    fn bucket_list_fields() -> Result {
        let options = [BucketListOption::fields([
            BucketField::Location,
            BucketField::Location,
        ])];
        let got = convert(options.iter().map(BucketListOption::as_option))?;
        assert_eq!(got.get_str(RpcOption::Fields), Some("items(location,name)"));
        Ok(())
    }

    #[test]
    fn integrity_markers() -> Result {
        let options = [BlobWriteOption::md5_match(), BlobWriteOption::crc32c_match()];
        let got = convert(options.iter().map(BlobWriteOption::as_option))?;
        assert_eq!(got.get(RpcOption::IfMd5Match), Some(&OptionValue::Bool(true)));
        assert_eq!(
            got.get(RpcOption::IfCrc32cMatch),
            Some(&OptionValue::Bool(true))
        );
        Ok(())
    }

    #[test]
    fn serde() -> Result {
        let option = BlobGetOption::generation_match(42);
        let json = serde_json::to_string(&option)?;
        let got = serde_json::from_str::<BlobGetOption>(&json)?;
        assert_eq!(got, option);

        let options = convert([option.as_option()])?;
        let json = serde_json::to_value(&options)?;
        assert_eq!(json, serde_json::json!({"IfGenerationMatch": 42}));
        Ok(())
    }
}
