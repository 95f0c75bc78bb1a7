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

use crate::error::InvalidOption;
use std::collections::BTreeSet;

macro_rules! selectable {
    ($(#[$attr:meta])* $name:ident, $kind:literal, required = [$($required:ident),*], { $($variant:ident => $wire:literal,)* }) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[non_exhaustive]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            const ALL: &'static [$name] = &[$(Self::$variant,)*];
            const REQUIRED: &'static [$name] = &[$(Self::$required,)*];

            /// The name of the field in the JSON API.
            pub fn wire_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)*
                }
            }

            /// Builds a comma-separated field selector.
            ///
            /// The result always includes the identifying fields, and each
            /// field appears once.
            pub(crate) fn selector<I>(fields: I) -> String
            where
                I: IntoIterator<Item = Self>,
            {
                fields
                    .into_iter()
                    .chain(Self::REQUIRED.iter().copied())
                    .map(|f| f.wire_name())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .find(|f| f.wire_name() == s)
                    .copied()
                    .ok_or_else(|| InvalidOption::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

selectable!(
    /// The object fields that can be selected in lookups and listings.
    BlobField, "object field", required = [Bucket, Name], {
        Acl => "acl",
        Bucket => "bucket",
        CacheControl => "cacheControl",
        ComponentCount => "componentCount",
        ContentDisposition => "contentDisposition",
        ContentEncoding => "contentEncoding",
        ContentLanguage => "contentLanguage",
        ContentType => "contentType",
        Crc32c => "crc32c",
        Etag => "etag",
        Generation => "generation",
        Id => "id",
        Kind => "kind",
        Md5Hash => "md5Hash",
        MediaLink => "mediaLink",
        Metadata => "metadata",
        Metageneration => "metageneration",
        Name => "name",
        Owner => "owner",
        SelfLink => "selfLink",
        Size => "size",
        StorageClass => "storageClass",
        TimeCreated => "timeCreated",
        TimeDeleted => "timeDeleted",
        Updated => "updated",
    }
);

selectable!(
    /// The bucket fields that can be selected in lookups and listings.
    BucketField, "bucket field", required = [Name], {
        Id => "id",
        SelfLink => "selfLink",
        Name => "name",
        TimeCreated => "timeCreated",
        Updated => "updated",
        Metageneration => "metageneration",
        Acl => "acl",
        DefaultObjectAcl => "defaultObjectAcl",
        Owner => "owner",
        Location => "location",
        Website => "website",
        Versioning => "versioning",
        Cors => "cors",
        StorageClass => "storageClass",
        Etag => "etag",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn blob_selector() {
        let got = BlobField::selector([BlobField::ContentType, BlobField::Size, BlobField::ContentType]);
        assert_eq!(got, "bucket,contentType,name,size");
    }

    #[test]
    fn blob_selector_empty() {
        let got = BlobField::selector([]);
        assert_eq!(got, "bucket,name");
    }

    #[test]
    fn blob_selector_includes_required() {
        let got = BlobField::selector([BlobField::Name, BlobField::Bucket]);
        assert_eq!(got, "bucket,name");
    }

    #[test]
    fn bucket_selector() {
        let got = BucketField::selector([BucketField::Versioning, BucketField::Acl]);
        assert_eq!(got, "acl,name,versioning");
    }

    #[test_case("md5Hash", BlobField::Md5Hash)]
    #[test_case("timeDeleted", BlobField::TimeDeleted)]
    #[test_case("crc32c", BlobField::Crc32c)]
    fn blob_parse(input: &str, want: BlobField) -> anyhow::Result<()> {
        assert_eq!(input.parse::<BlobField>()?, want);
        Ok(())
    }

    #[test]
    fn parse_all() -> anyhow::Result<()> {
        for f in BlobField::ALL {
            assert_eq!(f.wire_name().parse::<BlobField>()?, *f);
        }
        for f in BucketField::ALL {
            assert_eq!(f.wire_name().parse::<BucketField>()?, *f);
        }
        Ok(())
    }

    #[test]
    fn parse_unknown() {
        let err = "md5".parse::<BlobField>().unwrap_err();
        assert!(
            matches!(err, InvalidOption::UnknownValue { kind: "object field", ref value } if value == "md5"),
            "{err:?}"
        );
        let err = "cors ".parse::<BucketField>().unwrap_err();
        assert!(
            matches!(err, InvalidOption::UnknownValue { kind: "bucket field", .. }),
            "{err:?}"
        );
    }
}
