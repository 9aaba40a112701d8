//! Hardcoded sample identity for development mode.
//!
//! When the reverse proxy is not in front of the service (local development)
//! the principal headers are absent; this identity stands in so every code
//! path downstream of extraction behaves as in production.

use http::{HeaderMap, HeaderValue};

use crate::auth::principal::{
    AAD_ID_TOKEN_HEADER, CLIENT_PRINCIPAL_HEADER, PRINCIPAL_ID_HEADER, PRINCIPAL_IDP_HEADER,
    PRINCIPAL_NAME_HEADER,
};

/// Principal id of the sample identity.
pub const SAMPLE_PRINCIPAL_ID: &str = "00000000-0000-0000-0000-000000000000";
/// Principal name (sign-in email) of the sample identity.
pub const SAMPLE_PRINCIPAL_NAME: &str = "sample.user@contoso.com";
/// Display name carried by the sample client-principal claims.
pub const SAMPLE_FULL_NAME: &str = "Sample User";

/// Base64 client-principal blob for the sample identity. Decodes to a claims
/// array containing an email claim, a `name` claim with [`SAMPLE_FULL_NAME`],
/// and an object-identifier claim with [`SAMPLE_PRINCIPAL_ID`].
pub const SAMPLE_CLIENT_PRINCIPAL_B64: &str = "eyJhdXRoX3R5cCI6ImFhZCIsImNsYWltcyI6W3sidHlwIjoiaHR0cDovL3NjaGVtYXMueG1sc29hcC5vcmcvd3MvMjAwNS8wNS9pZGVudGl0eS9jbGFpbXMvZW1haWxhZGRyZXNzIiwidmFsIjoic2FtcGxlLnVzZXJAY29udG9zby5jb20ifSx7InR5cCI6Im5hbWUiLCJ2YWwiOiJTYW1wbGUgVXNlciJ9LHsidHlwIjoiaHR0cDovL3NjaGVtYXMubWljcm9zb2Z0LmNvbS9pZGVudGl0eS9jbGFpbXMvb2JqZWN0aWRlbnRpZmllciIsInZhbCI6IjAwMDAwMDAwLTAwMDAtMDAwMC0wMDAwLTAwMDAwMDAwMDAwMCJ9XSwibmFtZV90eXAiOiJodHRwOi8vc2NoZW1hcy54bWxzb2FwLm9yZy93cy8yMDA1LzA1L2lkZW50aXR5L2NsYWltcy9uYW1lIiwicm9sZV90eXAiOiJodHRwOi8vc2NoZW1hcy5taWNyb3NvZnQuY29tL3dzLzIwMDgvMDYvaWRlbnRpdHkvY2xhaW1zL3JvbGUifQ==";

/// Header mapping a reverse proxy would inject for the sample identity.
pub fn headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        PRINCIPAL_ID_HEADER,
        HeaderValue::from_static(SAMPLE_PRINCIPAL_ID),
    );
    headers.insert(
        PRINCIPAL_NAME_HEADER,
        HeaderValue::from_static(SAMPLE_PRINCIPAL_NAME),
    );
    headers.insert(PRINCIPAL_IDP_HEADER, HeaderValue::from_static("aad"));
    headers.insert(
        CLIENT_PRINCIPAL_HEADER,
        HeaderValue::from_static(SAMPLE_CLIENT_PRINCIPAL_B64),
    );
    headers.insert(
        AAD_ID_TOKEN_HEADER,
        HeaderValue::from_static("sample-aad-id-token"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_sample_blob_decodes_to_name_claim() {
        let bytes = STANDARD.decode(SAMPLE_CLIENT_PRINCIPAL_B64).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let claims = value["claims"].as_array().unwrap();
        let name = claims
            .iter()
            .find(|c| c["typ"] == "name")
            .and_then(|c| c["val"].as_str());
        assert_eq!(name, Some(SAMPLE_FULL_NAME));
    }

    #[test]
    fn test_sample_headers_are_complete() {
        let headers = headers();
        for name in [
            PRINCIPAL_ID_HEADER,
            PRINCIPAL_NAME_HEADER,
            PRINCIPAL_IDP_HEADER,
            CLIENT_PRINCIPAL_HEADER,
            AAD_ID_TOKEN_HEADER,
        ] {
            assert!(headers.contains_key(name), "missing header {}", name);
        }
    }
}
