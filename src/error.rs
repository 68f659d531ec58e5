//! Unified error handling for the niward crate
//!
//! Domain errors live next to the code that raises them ([`ProbeError`],
//! [`FallbackError`], [`PlatformError`], [`StorageError`]) and are absorbed
//! inside the reconciliation loop. [`Error`] covers what reaches callers of
//! the command surface and the presenter constructor.
//!
//! # Usage
//!
//! ```rust
//! use niward::error::Error;
//!
//! fn reply(err: &Error) -> String {
//!     if err.is_user_error() {
//!         format!("Please check your input: {err}")
//!     } else {
//!         format!("Internal error: {err}")
//!     }
//! }
//! # assert!(reply(&Error::InvalidAddress("bad host".into())).starts_with("Please"));
//! ```

use thiserror::Error;

pub use crate::storage::StorageError;
pub use crate::utils::error::{FallbackError, PlatformError, ProbeError};

/// Unified error type for the niward crate
#[derive(Error, Debug)]
pub enum Error {
    /// A built-in template failed to compile
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// No registration exists for the owner
    #[error("No endpoint registered for owner {0}")]
    NotRegistered(String),

    /// Address is not `host:port` with a port in 1..=65535
    #[error("Invalid address {0}, expected host:port")]
    InvalidAddress(String),
}

impl Error {
    /// Whether the caller sent something that cannot be acted on
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::NotRegistered(_) | Self::InvalidAddress(_))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
