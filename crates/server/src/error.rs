use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pinguin_core::{ErrorKind, PinguinError};
use thiserror::Error;

/// Errors that can occur while running the Pinguin server binary itself
/// (config loading, socket binding) — distinct from [`PinguinError`], which
/// is the request-scoped error taxonomy returned by the RPC/HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] pinguin_store::StoreError),

    #[error(transparent)]
    Crypto(#[from] pinguin_crypto::CryptoError),
}

/// Wraps [`PinguinError`] so handlers can `?`-propagate it directly and have
/// axum render the boundary mapping from §7's taxonomy table.
pub struct ApiError(pub PinguinError);

impl From<PinguinError> for ApiError {
    fn from(err: PinguinError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "kind": self.0.kind,
                "message": self.0.message,
                "rpcCode": rpc_code(self.0.kind),
            }
        }));
        (status, body).into_response()
    }
}

/// Maps any [`ErrorKind`] to its RPC-style numeric code, for the `rpc/v1`
/// surface, which carries both the numeric code and the HTTP status in its
/// envelope since it has no real gRPC transport underneath it.
#[must_use]
pub fn rpc_code(kind: ErrorKind) -> u16 {
    kind.rpc_code()
}
