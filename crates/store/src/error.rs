use pinguin_core::{ErrorKind, PinguinError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("invalid tenant id")]
    InvalidTenantId,

    /// A domain-level validation failure (e.g. a blank recipient rejected by
    /// `Notification::create`), carried through verbatim rather than
    /// collapsed into `NotFound` so it keeps its real `ErrorKind` at the
    /// boundary (spec.md §7: InvalidArgument -> 400, not NotFound -> 404).
    #[error(transparent)]
    Invalid(PinguinError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Crypto(#[from] pinguin_crypto::CryptoError),
}

impl From<StoreError> for PinguinError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PinguinError::not_found("not found"),
            StoreError::InvalidTenantId => PinguinError::invalid_argument("invalid tenant id"),
            StoreError::Invalid(e) => e,
            StoreError::Database(e) => {
                tracing::error!(error = %e, "store database error");
                PinguinError::new(ErrorKind::Internal, "internal error")
            }
            StoreError::Crypto(e) => {
                tracing::error!(error = %e, "store decryption error");
                PinguinError::new(ErrorKind::Internal, "internal error")
            }
        }
    }
}
