//! Identity extraction from reverse-proxy authentication headers.
//!
//! In hosted deployments a reverse proxy authenticates the caller and injects
//! `X-Ms-Client-Principal-*` headers before the request reaches this service.
//! This module turns that header mapping into a flat [`UserPrincipal`]:
//!
//! - **Hosted**: the principal-id header is present; fields are copied from
//!   the headers and the display name is decoded from the base64
//!   client-principal claims blob.
//! - **Development**: the principal-id header is absent; a hardcoded sample
//!   identity stands in so the rest of the stack behaves as in production.
//!
//! Extraction never fails. Every decode problem is logged and the output
//! degrades to partial or empty fields.

mod principal;
pub mod sample_user;

pub use principal::{
    AAD_ID_TOKEN_HEADER, CLIENT_PRINCIPAL_HEADER, PRINCIPAL_ID_HEADER, PRINCIPAL_IDP_HEADER,
    PRINCIPAL_NAME_HEADER, UserPrincipal, authenticated_user_details,
};
