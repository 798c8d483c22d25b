use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use pinguin_core::PinguinError;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

use super::identity::CallerIdentity;
use super::tenant_resolution::resolve_tenant;

/// Constant-time comparison against the configured shared secret. Length is
/// compared first (non-constant-time, but leaking the secret's length is
/// not meaningfully different from leaking nothing).
fn tokens_match(presented: &str, expected: &SecretString) -> bool {
    let expected = expected.expose_secret().as_bytes();
    let presented = presented.as_bytes();
    presented.len() == expected.len() && bool::from(presented.ct_eq(expected))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

/// C7's RPC-JSON tenant-resolver middleware: bearer-token authentication
/// followed by the shared host/admin-membership precedence in
/// [`resolve_tenant`]. Since the `rpc/v1` surface has no TAuth cookie to
/// carry an identity, RPC callers assert one via `x-caller-email`.
pub async fn rpc_tenant_resolver(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let headers = req.headers().clone();

    let token = bearer_token(&headers).ok_or_else(|| PinguinError::unauthenticated("missing bearer token"))?;
    if !tokens_match(token, &state.grpc_auth_token) {
        return Err(PinguinError::unauthenticated("bearer token mismatch").into());
    }

    let caller_email = header_str(&headers, "x-caller-email").ok_or_else(|| PinguinError::unauthenticated("x-caller-email header required"))?;
    let explicit_tenant_id = header_str(&headers, "x-tenant-id");
    let host = header_str(&headers, axum::http::header::HOST.as_str()).unwrap_or_default();

    let identity: CallerIdentity = resolve_tenant(&state.tenant_store, caller_email, explicit_tenant_id, host).await?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_tokens_compare_equal() {
        let expected = SecretString::from("s3cr3t".to_owned());
        assert!(tokens_match("s3cr3t", &expected));
        assert!(!tokens_match("wrong", &expected));
        assert!(!tokens_match("s3cr3", &expected));
    }
}
