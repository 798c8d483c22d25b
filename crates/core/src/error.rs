use serde::Serialize;
use thiserror::Error;

/// Error taxonomy shared by every surface (RPC, HTTP, scheduler, dispatcher).
///
/// Each variant carries its own boundary mapping (RPC status code / HTTP
/// status) at the crate that terminates the request; this enum only carries
/// the kind and a caller-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    InvalidState,
    ResourceExhausted,
    Internal,
    Unavailable,
}

impl ErrorKind {
    /// gRPC-style status code, per the taxonomy table.
    #[must_use]
    pub fn rpc_code(self) -> u16 {
        match self {
            Self::Unauthenticated => 16,
            Self::PermissionDenied => 7,
            Self::InvalidArgument => 3,
            Self::NotFound => 5,
            Self::InvalidState => 9,
            Self::ResourceExhausted => 8,
            Self::Internal => 13,
            Self::Unavailable => 14,
        }
    }

    /// HTTP status code, per the taxonomy table.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::PermissionDenied => 403,
            Self::InvalidArgument => 400,
            Self::NotFound => 404,
            Self::InvalidState => 409,
            Self::ResourceExhausted => 429,
            Self::Internal => 500,
            Self::Unavailable => 503,
        }
    }
}

/// The crate-wide error type. `Internal` variants are expected to be logged
/// with a correlation id by the caller before the opaque message crosses a
/// surface boundary; this type itself never leaks internals into `message`.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct PinguinError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PinguinError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    #[must_use]
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }
}

pub type Result<T> = std::result::Result<T, PinguinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_documented_codes() {
        assert_eq!(ErrorKind::Unauthenticated.rpc_code(), 16);
        assert_eq!(ErrorKind::Unauthenticated.http_status(), 401);
        assert_eq!(ErrorKind::InvalidState.rpc_code(), 9);
        assert_eq!(ErrorKind::InvalidState.http_status(), 409);
        assert_eq!(ErrorKind::Unavailable.http_status(), 503);
    }

    #[test]
    fn constructors_set_kind() {
        let err = PinguinError::not_found("notification missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "notification missing");
    }
}
