use pinguin_core::{ErrorKind, PinguinError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("notification not found")]
    NotFound,

    /// Another worker already moved the row before this one acquired the
    /// lease; the caller should treat this as a no-op, not an error.
    #[error("lease lost to a concurrent dispatch")]
    LeaseLost,

    #[error(transparent)]
    Store(#[from] pinguin_store::StoreError),

    #[error(transparent)]
    Provider(#[from] pinguin_provider::ProviderError),
}

impl From<DispatchError> for PinguinError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound => PinguinError::not_found("notification not found"),
            DispatchError::LeaseLost => {
                PinguinError::new(ErrorKind::Unavailable, "dispatch lease was lost, retry the request")
            }
            DispatchError::Store(e) => e.into(),
            DispatchError::Provider(e) => {
                tracing::error!(error = %e, "provider error escaped dispatch");
                PinguinError::new(ErrorKind::Internal, "internal error")
            }
        }
    }
}
