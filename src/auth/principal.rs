//! Principal extraction from HTTP headers.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::sample_user;

/// Principal id header injected by the reverse proxy. Its presence is the
/// hosted-vs-development switch.
pub const PRINCIPAL_ID_HEADER: &str = "x-ms-client-principal-id";
/// Principal name header (usually the sign-in email).
pub const PRINCIPAL_NAME_HEADER: &str = "x-ms-client-principal-name";
/// Identity provider header (e.g. "aad").
pub const PRINCIPAL_IDP_HEADER: &str = "x-ms-client-principal-idp";
/// Base64-encoded JSON claims blob describing the client principal.
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal";
/// AAD id token header.
pub const AAD_ID_TOKEN_HEADER: &str = "x-ms-token-aad-id-token";

/// Flat identity extracted from the authentication headers.
///
/// All fields except `full_name` are verbatim header copies; `full_name`
/// comes from the decoded client-principal claims and defaults to an empty
/// string when it cannot be recovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrincipal {
    pub user_principal_id: Option<String>,
    pub user_name: Option<String>,
    pub auth_provider: Option<String>,
    pub auth_token: Option<String>,
    pub client_principal_b64: Option<String>,
    pub aad_id_token: Option<String>,
    pub full_name: String,
}

/// Decoded shape of the client-principal header payload.
#[derive(Debug, Deserialize)]
struct ClientPrincipal {
    #[serde(default)]
    claims: Vec<PrincipalClaim>,
}

#[derive(Debug, Deserialize)]
struct PrincipalClaim {
    #[serde(default)]
    typ: String,
    #[serde(default)]
    val: String,
}

/// Extract the authenticated user's details from the request headers.
///
/// When the principal-id header is missing the request is assumed to come
/// from a development environment and the [`sample_user`] identity is used
/// instead. This function never fails; see the module docs for the
/// degradation rules.
pub fn authenticated_user_details(headers: &HeaderMap) -> UserPrincipal {
    let sample;
    let source = if headers.contains_key(PRINCIPAL_ID_HEADER) {
        debug!("principal id header found, extracting user from headers");
        headers
    } else {
        info!("principal id header not found, assuming development mode");
        sample = sample_user::headers();
        &sample
    };

    let header_value = |name: &str| -> Option<String> {
        let value = source.get(name)?;
        match value.to_str() {
            Ok(s) => Some(s.to_string()),
            Err(_) => {
                warn!("header {} is not valid UTF-8, ignoring", name);
                None
            }
        }
    };

    let client_principal_b64 = header_value(CLIENT_PRINCIPAL_HEADER);
    let aad_id_token = header_value(AAD_ID_TOKEN_HEADER);

    let full_name = match client_principal_b64.as_deref() {
        Some(blob) => extract_full_name(blob),
        None => {
            warn!("client principal header is missing");
            String::new()
        }
    };

    UserPrincipal {
        user_principal_id: header_value(PRINCIPAL_ID_HEADER),
        user_name: header_value(PRINCIPAL_NAME_HEADER),
        auth_provider: header_value(PRINCIPAL_IDP_HEADER),
        auth_token: aad_id_token.clone(),
        client_principal_b64,
        aad_id_token,
        full_name,
    }
}

/// Decode the base64 client principal and pull the display name out of its
/// claims array. The first claim tagged `name` wins; anything that fails to
/// decode yields an empty string.
fn extract_full_name(client_principal_b64: &str) -> String {
    let bytes = match STANDARD.decode(client_principal_b64) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("could not base64-decode client principal: {}", e);
            return String::new();
        }
    };

    let principal: ClientPrincipal = match serde_json::from_slice(&bytes) {
        Ok(principal) => principal,
        Err(e) => {
            warn!("could not parse client principal JSON: {}", e);
            return String::new();
        }
    };

    for claim in principal.claims {
        if claim.typ == "name" {
            return claim.val;
        }
    }

    warn!("could not find name claim in client principal");
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn hosted_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            PRINCIPAL_ID_HEADER,
            HeaderValue::from_static("11111111-2222-3333-4444-555555555555"),
        );
        headers.insert(
            PRINCIPAL_NAME_HEADER,
            HeaderValue::from_static("jane@example.com"),
        );
        headers.insert(PRINCIPAL_IDP_HEADER, HeaderValue::from_static("aad"));
        headers.insert(AAD_ID_TOKEN_HEADER, HeaderValue::from_static("token-123"));
        headers
    }

    fn principal_blob(claims: serde_json::Value) -> String {
        STANDARD.encode(serde_json::json!({ "claims": claims }).to_string())
    }

    #[test]
    fn test_missing_principal_header_falls_back_to_sample_user() {
        let principal = authenticated_user_details(&HeaderMap::new());

        assert_eq!(
            principal.user_principal_id.as_deref(),
            Some(sample_user::SAMPLE_PRINCIPAL_ID)
        );
        assert_eq!(
            principal.user_name.as_deref(),
            Some(sample_user::SAMPLE_PRINCIPAL_NAME)
        );
        assert_eq!(principal.auth_provider.as_deref(), Some("aad"));
        assert_eq!(principal.full_name, sample_user::SAMPLE_FULL_NAME);
    }

    #[test]
    fn test_hosted_headers_are_copied_verbatim() {
        let mut headers = hosted_headers();
        let blob = principal_blob(serde_json::json!([
            { "typ": "name", "val": "Jane Doe" }
        ]));
        headers.insert(CLIENT_PRINCIPAL_HEADER, HeaderValue::from_str(&blob).unwrap());

        let principal = authenticated_user_details(&headers);
        assert_eq!(
            principal.user_principal_id.as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
        assert_eq!(principal.user_name.as_deref(), Some("jane@example.com"));
        assert_eq!(principal.auth_provider.as_deref(), Some("aad"));
        assert_eq!(principal.auth_token.as_deref(), Some("token-123"));
        assert_eq!(principal.aad_id_token.as_deref(), Some("token-123"));
        assert_eq!(principal.client_principal_b64.as_deref(), Some(blob.as_str()));
        assert_eq!(principal.full_name, "Jane Doe");
    }

    #[test]
    fn test_malformed_base64_degrades_to_empty_full_name() {
        let mut headers = hosted_headers();
        headers.insert(
            CLIENT_PRINCIPAL_HEADER,
            HeaderValue::from_static("%%%not-base64%%%"),
        );

        let principal = authenticated_user_details(&headers);
        assert_eq!(principal.full_name, "");
        // The raw header is still copied through.
        assert_eq!(
            principal.client_principal_b64.as_deref(),
            Some("%%%not-base64%%%")
        );
    }

    #[test]
    fn test_invalid_json_degrades_to_empty_full_name() {
        let mut headers = hosted_headers();
        let blob = STANDARD.encode("this is not json");
        headers.insert(CLIENT_PRINCIPAL_HEADER, HeaderValue::from_str(&blob).unwrap());

        let principal = authenticated_user_details(&headers);
        assert_eq!(principal.full_name, "");
    }

    #[test]
    fn test_missing_name_claim_degrades_to_empty_full_name() {
        let mut headers = hosted_headers();
        let blob = principal_blob(serde_json::json!([
            { "typ": "email", "val": "jane@example.com" }
        ]));
        headers.insert(CLIENT_PRINCIPAL_HEADER, HeaderValue::from_str(&blob).unwrap());

        let principal = authenticated_user_details(&headers);
        assert_eq!(principal.full_name, "");
    }

    #[test]
    fn test_first_name_claim_wins() {
        let mut headers = hosted_headers();
        let blob = principal_blob(serde_json::json!([
            { "typ": "name", "val": "First Match" },
            { "typ": "name", "val": "Second Match" }
        ]));
        headers.insert(CLIENT_PRINCIPAL_HEADER, HeaderValue::from_str(&blob).unwrap());

        let principal = authenticated_user_details(&headers);
        assert_eq!(principal.full_name, "First Match");
    }

    #[test]
    fn test_missing_client_principal_header_degrades() {
        // Hosted request without the claims blob: fields degrade, no panic.
        let headers = hosted_headers();
        let principal = authenticated_user_details(&headers);
        assert_eq!(principal.full_name, "");
        assert!(principal.client_principal_b64.is_none());
    }
}
