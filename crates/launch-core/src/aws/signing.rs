//! AWS Signature Version 4 for JSON-1.1 POST requests.

use super::credentials::Credentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// What gets signed: everything about the request that the signature covers.
#[derive(Debug, Clone, Copy)]
pub struct RequestToSign<'a> {
    pub host: &'a str,
    pub target: &'a str,
    pub body: &'a [u8],
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Headers to attach to the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{}", secret_access_key).as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

/// Canonical request over already sorted, lowercased headers.
fn canonical_request(method: &str, query: &str, headers: &[(&str, &str)], payload_hash: &str) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();

    format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        method,
        query,
        canonical_headers,
        signed_header_names(headers),
        payload_hash
    )
}

fn signed_header_names(headers: &[(&str, &str)]) -> String {
    headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";")
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}

pub fn sign(credentials: &Credentials, request: &RequestToSign<'_>) -> SignedHeaders {
    let amz_date = request.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = request.time.format("%Y%m%d").to_string();

    let mut headers: Vec<(&str, &str)> = vec![
        ("content-type", JSON_CONTENT_TYPE),
        ("host", request.host),
        ("x-amz-date", &amz_date),
        ("x-amz-target", request.target),
    ];
    if let Some(token) = credentials.session_token.as_deref() {
        headers.push(("x-amz-security-token", token));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical = canonical_request("POST", "", &headers, &sha256_hex(request.body));
    let scope = format!("{}/{}/{}/aws4_request", date, request.region, request.service);

    let key = signing_key(
        &credentials.secret_access_key,
        &date,
        request.region,
        request.service,
    );
    let signature = hex::encode(hmac(&key, string_to_sign(&amz_date, &scope, &canonical).as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            credentials.access_key_id,
            scope,
            signed_header_names(&headers),
            signature
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    }
}
