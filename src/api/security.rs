/// Admin token check for the operator routes.
/// Reads the X-Admin-Token header and compares it to the token resolved at startup
/// (QUICKPAY_ADMIN_TOKEN). With no token configured the admin routes are open.
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{ApiError, SharedState};

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Check a presented token against the expected one
pub fn verify_admin_token(expected: Option<&str>, presented: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(want) => presented == Some(want),
    }
}

/// Extractor guarding every admin handler
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<SharedState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if verify_admin_token(state.admin_token.as_deref(), presented) {
            Ok(AdminAuth)
        } else {
            tracing::warn!(path = %parts.uri.path(), "[SECURITY] rejected admin request");
            Err(ApiError::Unauthorized)
        }
    }
}
