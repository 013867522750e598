//! OCI HTTP request signatures (draft-cavage, version 1, `rsa-sha256`).
//!
//! GET and DELETE requests carry no body, so only `date`,
//! `(request-target)` and `host` take part in the signing string.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey};
use reqwest::Method;
use url::Url;

use crate::SdkError;
use crate::profile::OciProfile;

const SIGNED_HEADERS: &str = "date (request-target) host";

pub struct RequestSigner {
    key_id: String,
    key: EncodingKey,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Read the profile's private key from disk.
    pub fn from_profile(profile: &OciProfile) -> Result<Self, SdkError> {
        let pem = std::fs::read(&profile.key_file).map_err(|e| {
            SdkError::Signing(format!(
                "cannot read key file {}: {e}",
                profile.key_file.display()
            ))
        })?;
        Self::from_pem(profile.key_id(), &pem)
    }

    pub fn from_pem(key_id: impl Into<String>, pem: &[u8]) -> Result<Self, SdkError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| SdkError::Signing(format!("invalid RSA private key: {e}")))?;
        Ok(Self {
            key_id: key_id.into(),
            key,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Build the `Authorization` header value for one request.
    pub fn authorization(
        &self,
        method: &Method,
        url: &Url,
        date: &str,
    ) -> Result<String, SdkError> {
        let signing_string = signing_string(method, url, date)?;

        // jsonwebtoken hands back unpadded base64url; OCI wants standard base64.
        let signature = jsonwebtoken::crypto::sign(
            signing_string.as_bytes(),
            &self.key,
            Algorithm::RS256,
        )
        .map_err(|e| SdkError::Signing(e.to_string()))?;
        let raw = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| SdkError::Signing(e.to_string()))?;

        Ok(format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{SIGNED_HEADERS}\",signature=\"{}\"",
            self.key_id,
            STANDARD.encode(raw)
        ))
    }
}

/// RFC 7231 date as required by the `date` header.
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) fn host_header(url: &Url) -> Result<String, SdkError> {
    let host = url
        .host_str()
        .ok_or_else(|| SdkError::Signing(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

pub(crate) fn signing_string(method: &Method, url: &Url, date: &str) -> Result<String, SdkError> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    Ok(format!(
        "date: {date}\n(request-target): {} {target}\nhost: {}",
        method.as_str().to_lowercase(),
        host_header(url)?
    ))
}
