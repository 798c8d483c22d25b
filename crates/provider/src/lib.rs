//! Provider trait pair shared by the SMTP and SMS dispatch adapters.

pub mod error;
pub mod outcome;
pub mod provider;

pub use error::ProviderError;
pub use outcome::Outcome;
pub use provider::{DynProvider, Provider};
