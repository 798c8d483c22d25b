use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use pinguin_core::PinguinError;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

use super::identity::CallerIdentity;
use super::tenant_resolution::resolve_tenant;

const SESSION_COOKIE: &str = "app_session";

/// TAuth's session cookie claims. Only the fields C9 needs are modeled;
/// TAuth itself is out of scope, so this is a consumer-side view of the
/// claims it's documented to issue, not a full replica of its token format.
#[derive(Debug, Deserialize)]
struct TauthClaims {
    /// The caller's verified email address.
    sub: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

/// C9's HTTP/UI tenant-resolver middleware: validates the `app_session`
/// TAuth cookie (HS256) instead of a bearer token, then runs the same
/// host/admin-membership precedence as the RPC surface.
pub async fn http_tenant_resolver(State(state): State<AppState>, jar: CookieJar, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()).ok_or_else(|| PinguinError::unauthenticated("missing session cookie"))?;

    let key = DecodingKey::from_secret(state.tauth_signing_key.expose_secret().as_bytes());
    let claims = decode::<TauthClaims>(&token, &key, &Validation::new(Algorithm::HS256))
        .map_err(|_| PinguinError::unauthenticated("invalid or expired session cookie"))?
        .claims;

    let headers = req.headers().clone();
    let explicit_tenant_id = header_str(&headers, "x-tenant-id");
    let host = header_str(&headers, axum::http::header::HOST.as_str()).unwrap_or_default();

    let identity: CallerIdentity = resolve_tenant(&state.tenant_store, &claims.sub, explicit_tenant_id, host).await?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
