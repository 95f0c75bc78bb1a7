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

use crate::error::{InvalidOption, SigningError};
use crate::model::Object;
use base64::{Engine, prelude::BASE64_STANDARD};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::form_urlencoded;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// https://cloud.google.com/storage/docs/request-endpoints#encoding
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Signs the string-to-sign of a URL.
///
/// The cryptography lives outside this crate, implementations typically use
/// a service account key or the IAM credentials service.
#[async_trait::async_trait]
pub trait Signer: std::fmt::Debug + Send + Sync {
    /// The account used to sign, included in the URL.
    async fn client_email(&self) -> Result<String, BoxError>;

    /// Signs `content`, returns the raw signature bytes.
    async fn sign(&self, content: &[u8]) -> Result<Vec<u8>, BoxError>;
}

/// The HTTP methods a signed URL can authorize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Get, Self::Head, Self::Put, Self::Post, Self::Delete]
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InvalidOption::UnknownValue {
                kind: "HTTP method",
                value: s.to_string(),
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
enum SignUrlKind {
    HttpMethod(HttpMethod),
    ContentType,
    Md5,
    ClientEmail(String),
}

impl SignUrlKind {
    fn name(&self) -> &'static str {
        match self {
            Self::HttpMethod(_) => "httpMethod",
            Self::ContentType => "withContentType",
            Self::Md5 => "withMd5",
            Self::ClientEmail(_) => "clientEmail",
        }
    }
}

/// Options for [Storage::sign_url][crate::client::Storage::sign_url].
#[derive(Clone, Debug, PartialEq)]
pub struct SignUrlOption(SignUrlKind);

impl SignUrlOption {
    /// The HTTP method the URL authorizes, the default is `GET`.
    pub fn http_method(method: HttpMethod) -> Self {
        Self(SignUrlKind::HttpMethod(method))
    }

    /// The request must use the content type in the object metadata.
    pub fn with_content_type() -> Self {
        Self(SignUrlKind::ContentType)
    }

    /// The request must use the MD5 hash in the object metadata.
    pub fn with_md5() -> Self {
        Self(SignUrlKind::Md5)
    }

    /// Use this account instead of the one reported by the signer.
    pub fn with_client_email<T: Into<String>>(email: T) -> Self {
        Self(SignUrlKind::ClientEmail(email.into()))
    }
}

#[derive(Debug, Default)]
struct Resolved {
    method: HttpMethod,
    content_type: bool,
    md5: bool,
    client_email: Option<String>,
}

fn resolve(options: &[SignUrlOption]) -> Result<Resolved, InvalidOption> {
    let mut resolved = Resolved::default();
    let mut seen = std::collections::BTreeSet::new();
    for SignUrlOption(kind) in options {
        if !seen.insert(kind.name()) {
            return Err(InvalidOption::DuplicateOption(kind.name()));
        }
        match kind {
            SignUrlKind::HttpMethod(m) => resolved.method = *m,
            SignUrlKind::ContentType => resolved.content_type = true,
            SignUrlKind::Md5 => resolved.md5 = true,
            SignUrlKind::ClientEmail(e) => resolved.client_email = Some(e.clone()),
        }
    }
    Ok(resolved)
}

/// Creates a V2 signed URL, valid for `duration` after `now`.
///
/// The duration is truncated to whole seconds.
pub(crate) async fn sign_url_at(
    signer: &dyn Signer,
    endpoint: &str,
    object: &Object,
    duration: std::time::Duration,
    options: &[SignUrlOption],
    now: DateTime<Utc>,
) -> Result<String, SigningError> {
    let resolved = resolve(options)?;
    let endpoint_url =
        url::Url::parse(endpoint).map_err(|e| SigningError::InvalidEndpoint(e.into()))?;
    if endpoint_url.host_str().is_none() {
        return Err(SigningError::InvalidEndpoint(
            "invalid endpoint host".into(),
        ));
    }
    let seconds = duration.as_secs();
    let expires = i64::try_from(seconds)
        .ok()
        .and_then(|s| now.timestamp().checked_add(s))
        .ok_or(InvalidOption::DurationOutOfRange { seconds })?;

    let md5 = match resolved.md5 {
        false => "",
        true => object
            .md5_hash
            .as_deref()
            .ok_or(InvalidOption::MissingValue {
                option: "withMd5",
                field: "md5Hash",
            })?,
    };
    let content_type = match resolved.content_type {
        false => "",
        true => object
            .content_type
            .as_deref()
            .ok_or(InvalidOption::MissingValue {
                option: "withContentType",
                field: "contentType",
            })?,
    };
    let path = format!(
        "/{}/{}",
        object.bucket,
        utf8_percent_encode(&object.name, PATH_ENCODE_SET)
    );
    let string_to_sign = [
        resolved.method.as_str(),
        md5,
        content_type,
        &expires.to_string(),
        &path,
    ]
    .join("\n");

    let client_email = match resolved.client_email {
        Some(e) => e,
        None => signer.client_email().await.map_err(SigningError::Signing)?,
    };
    let signature = signer
        .sign(string_to_sign.as_bytes())
        .await
        .map_err(SigningError::Signing)?;
    tracing::debug!(%path, expires, method = resolved.method.as_str(), "signed URL");

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("GoogleAccessId", &client_email)
        .append_pair("Expires", &expires.to_string())
        .append_pair("Signature", &BASE64_STANDARD.encode(signature))
        .finish();
    Ok(format!(
        "{}{path}?{query}",
        endpoint.trim_end_matches('/')
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::time::Duration;

    type TestResult = anyhow::Result<()>;

    const ENDPOINT: &str = "https://storage.googleapis.com";

    #[derive(Debug, Default)]
    struct MockSigner {
        signed: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Signer for MockSigner {
        async fn client_email(&self) -> Result<String, BoxError> {
            Ok("test@example.com".to_string())
        }

        async fn sign(&self, content: &[u8]) -> Result<Vec<u8>, BoxError> {
            self.signed
                .lock()
                .expect("lock is not poisoned")
                .push(String::from_utf8_lossy(content).to_string());
            Ok(b"test-signature".to_vec())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[tokio::test]
    async fn basic() -> TestResult {
        let signer = MockSigner::default();
        let object = Object::new("test-bucket", "test-object");
        let url = sign_url_at(&signer, ENDPOINT, &object, Duration::from_secs(3600), &[], now()).await?;
        let expires = now().timestamp() + 3600;
        let signature = BASE64_STANDARD.encode(b"test-signature");
        let want = format!(
            "https://storage.googleapis.com/test-bucket/test-object?GoogleAccessId=test%40example.com&Expires={expires}&Signature={}",
            form_urlencoded::byte_serialize(signature.as_bytes()).collect::<String>()
        );
        assert_eq!(url, want);
        let signed = signer.signed.lock().unwrap().clone();
        assert_eq!(
            signed,
            vec![format!("GET\n\n\n{expires}\n/test-bucket/test-object")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn fourteen_days() -> TestResult {
        let signer = MockSigner::default();
        let object = Object::new("b", "o");
        let duration = Duration::from_secs(14 * 86400) + Duration::from_millis(999);
        let url = sign_url_at(&signer, ENDPOINT, &object, duration, &[], now()).await?;
        let parsed = url::Url::parse(&url)?;
        let expires = parsed
            .query_pairs()
            .find(|(k, _)| k == "Expires")
            .map(|(_, v)| v.to_string());
        assert_eq!(expires, Some((now().timestamp() + 14 * 86400).to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn method_content_type_md5() -> TestResult {
        let signer = MockSigner::default();
        let object = Object::new("b", "folder/test object.txt")
            .set_content_type("text/plain")
            .set_md5_hash("XrY7u+Ae7tCTyyK7j1rNww==");
        let url = sign_url_at(
            &signer,
            "https://example.com/",
            &object,
            Duration::from_secs(60),
            &[
                SignUrlOption::http_method(HttpMethod::Put),
                SignUrlOption::with_content_type(),
                SignUrlOption::with_md5(),
                SignUrlOption::with_client_email("other@example.com"),
            ],
            now(),
        )
        .await?;
        assert!(
            url.starts_with("https://example.com/b/folder/test%20object.txt?GoogleAccessId=other%40example.com&"),
            "{url}"
        );
        let expires = now().timestamp() + 60;
        let signed = signer.signed.lock().unwrap().clone();
        assert_eq!(
            signed,
            vec![format!(
                "PUT\nXrY7u+Ae7tCTyyK7j1rNww==\ntext/plain\n{expires}\n/b/folder/test%20object.txt"
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_md5() -> TestResult {
        let signer = MockSigner::default();
        let object = Object::new("b", "o");
        let err = sign_url_at(&signer, ENDPOINT, &object, Duration::from_secs(60), &[SignUrlOption::with_md5()], now())
            .await
            .unwrap_err();
        assert!(
            matches!(err, SigningError::InvalidOption(InvalidOption::MissingValue { .. })),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_option() -> TestResult {
        let signer = MockSigner::default();
        let object = Object::new("b", "o");
        let options = [
            SignUrlOption::http_method(HttpMethod::Get),
            SignUrlOption::http_method(HttpMethod::Put),
        ];
        let err = sign_url_at(&signer, ENDPOINT, &object, Duration::from_secs(60), &options, now())
            .await
            .unwrap_err();
        assert!(
            matches!(err, SigningError::InvalidOption(InvalidOption::DuplicateOption("httpMethod"))),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn error_signing() -> TestResult {
        #[derive(Debug)]
        struct FailSigner;
        #[async_trait::async_trait]
        impl Signer for FailSigner {
            async fn client_email(&self) -> Result<String, BoxError> {
                Ok("test@example.com".to_string())
            }
            async fn sign(&self, _content: &[u8]) -> Result<Vec<u8>, BoxError> {
                Err("cannot sign".into())
            }
        }
        let err = sign_url_at(&FailSigner, ENDPOINT, &Object::new("b", "o"), Duration::from_secs(1), &[], now())
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::Signing(_)), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn error_endpoint() -> TestResult {
        let signer = MockSigner::default();
        let err = sign_url_at(&signer, "invalid-url", &Object::new("b", "o"), Duration::from_secs(1), &[], now())
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::InvalidEndpoint(_)), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn error_duration() -> TestResult {
        let signer = MockSigner::default();
        let duration = Duration::from_secs(u64::MAX);
        let err = sign_url_at(&signer, "https://storage.googleapis.com", &Object::new("b", "o"), duration, &[], now())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                SigningError::InvalidOption(InvalidOption::DurationOutOfRange { seconds: u64::MAX })
            ),
            "{err:?}"
        );
        Ok(())
    }

    #[test]
    fn http_method() -> TestResult {
        for m in [
            HttpMethod::Get,
            HttpMethod::Head,
            HttpMethod::Put,
            HttpMethod::Post,
            HttpMethod::Delete,
        ] {
            assert_eq!(m.as_str().parse::<HttpMethod>()?, m);
        }
        let err = "get".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, InvalidOption::UnknownValue { kind: "HTTP method", .. }), "{err:?}");
        Ok(())
    }
}
