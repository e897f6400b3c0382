//! AWS Signature Version 4 request signing.
//!
//! Only what the JSON-protocol APIs need: a canonical request built from
//! the method, path, query, a caller-chosen header set and the payload.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signing failure.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid HMAC key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),

    #[error("malformed x-amz-date '{0}'")]
    InvalidDate(String),
}

/// The parts of a request covered by the signature.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Already-canonical query string (sorted, encoded); empty for none
    pub query: &'a str,
    /// Headers to sign. Must include `host` and `x-amz-date`.
    pub headers: &'a [(&'a str, &'a str)],
    pub payload: &'a [u8],
}

/// Format a timestamp as `YYYYMMDD'T'HHMMSS'Z'`.
pub fn amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Derive the signing key for one day, region and service.
pub fn signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_access_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Lowercased, trimmed, sorted headers as (canonical block, signed list).
fn canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut normalized: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (name.trim().to_lowercase(), value)
        })
        .collect();
    normalized.sort();

    let block = normalized
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect::<String>();
    let signed = normalized
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (block, signed)
}

/// Build the `Authorization` header value for `input`.
///
/// `amz_date` must equal the `x-amz-date` header included in `input.headers`.
pub fn authorization_header(
    input: &SigningInput<'_>,
    credentials: &Credentials,
    region: &str,
    service: &str,
    amz_date: &str,
) -> Result<String, SigningError> {
    let date = amz_date
        .get(..8)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| SigningError::InvalidDate(amz_date.to_string()))?;

    let (header_block, signed_headers) = canonical_headers(input.headers);
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        input.method,
        input.path,
        input.query,
        header_block,
        signed_headers,
        sha256_hex(input.payload)
    );

    let scope = format!("{}/{}/{}/aws4_request", date, region, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(credentials.secret_access_key(), date, region, service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        credentials.access_key_id(),
        scope,
        signed_headers,
        signature
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_amz_date_format() {
        let time = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        assert_eq!(amz_date(time), "20150830T123600Z");
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(EXAMPLE_SECRET, "20150830", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_authorization_matches_published_example() {
        let credentials = Credentials::new("AKIDEXAMPLE", EXAMPLE_SECRET, None);
        let headers = [
            (
                "Content-Type",
                "application/x-www-form-urlencoded; charset=utf-8",
            ),
            ("Host", "iam.amazonaws.com"),
            ("X-Amz-Date", "20150830T123600Z"),
        ];
        let input = SigningInput {
            method: "GET",
            path: "/",
            query: "Action=ListUsers&Version=2010-05-08",
            headers: &headers,
            payload: b"",
        };

        let auth =
            authorization_header(&input, &credentials, "us-east-1", "iam", "20150830T123600Z")
                .unwrap();
        assert_eq!(
            auth,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
    }

    #[test]
    fn test_canonical_headers_sorted_and_trimmed() {
        let (block, signed) = canonical_headers(&[
            ("X-Amz-Target", "Comprehend_20171127.DetectSentiment"),
            ("Host", "comprehend.us-east-1.amazonaws.com"),
            ("Content-Type", "  application/x-amz-json-1.1 "),
        ]);
        assert_eq!(signed, "content-type;host;x-amz-target");
        assert!(block.starts_with("content-type:application/x-amz-json-1.1\n"));
        assert!(block.ends_with("x-amz-target:Comprehend_20171127.DetectSentiment\n"));
    }

    #[test]
    fn test_signature_depends_on_payload() {
        let credentials = Credentials::new("AKID", "secret", None);
        let headers = [("host", "example.com"), ("x-amz-date", "20261014T000000Z")];
        let sign = |payload: &'static [u8]| {
            let input = SigningInput {
                method: "POST",
                path: "/",
                query: "",
                headers: &headers,
                payload,
            };
            authorization_header(&input, &credentials, "us-east-1", "comprehend", "20261014T000000Z")
                .unwrap()
        };
        assert_eq!(sign(b"{}"), sign(b"{}"));
        assert_ne!(sign(b"{}"), sign(b"{\"Text\":\"hi\"}"));
    }

    #[test]
    fn test_invalid_date_rejected() {
        let credentials = Credentials::new("AKID", "secret", None);
        let input = SigningInput {
            method: "POST",
            path: "/",
            query: "",
            headers: &[("host", "example.com")],
            payload: b"",
        };
        assert!(matches!(
            authorization_header(&input, &credentials, "us-east-1", "comprehend", "today"),
            Err(SigningError::InvalidDate(_))
        ));
    }
}
