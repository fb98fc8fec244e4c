//! Error types for dnsblock-resolver.

use thiserror::Error;

/// Errors raised while setting up a resolver.
///
/// Lookup failures are not errors at this level; they are reported to the
/// policy engine as [`dnsblock_core::ResolveFailure`] values.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The system resolver configuration could not be read.
    #[error("failed to create resolver: {0}")]
    Build(#[from] hickory_resolver::ResolveError),

    /// The settings are unusable.
    #[error("invalid resolver settings: {0}")]
    Settings(String),
}

/// Result type for resolver setup.
pub type Result<T> = std::result::Result<T, ResolverError>;
